//! # Key Store
//!
//! Loads and generates the PEM key files of both principals.
//!
//! ## Layout on Disk
//!
//! ```text
//! keys/
//! ├── server_private_key.pem   PKCS#8, mode 0600   (server only)
//! ├── server_public_key.pem    SPKI                (given to clients)
//! ├── client_private_key.pem   PKCS#8, mode 0600   (client only)
//! └── client_public_key.pem    SPKI                (registered on server)
//! ```
//!
//! A process loads exactly the keys its role needs: the server loads its own
//! private key and the client's public key; a client loads its own private key
//! and the server's public key. A missing file is [`Error::KeyNotFound`],
//! which the server treats as fatal at startup.
//!
//! Only public keys are ever served, through [`PublicKeyDirectory`].

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::crypto::{KeyPair, Principal, PrivateKey, PublicKey, MIN_KEY_BITS};
use crate::error::{Error, Result};

/// Which half of a key pair a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    /// PKCS#8 private key
    Private,
    /// SubjectPublicKeyInfo public key
    Public,
}

impl KeyRole {
    fn as_str(&self) -> &'static str {
        match self {
            KeyRole::Private => "private",
            KeyRole::Public => "public",
        }
    }
}

/// Directory-backed store of principal key pairs
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    /// Create a store rooted at `dir`. Nothing is read until a key is loaded.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of `principal`'s key file for `role`
    pub fn path_for(&self, principal: Principal, role: KeyRole) -> PathBuf {
        self.dir
            .join(format!("{}_{}_key.pem", principal.as_str(), role.as_str()))
    }

    /// Whether either key file for `principal` already exists
    pub fn has_any(&self, principal: Principal) -> bool {
        self.path_for(principal, KeyRole::Private).exists()
            || self.path_for(principal, KeyRole::Public).exists()
    }

    /// Generate a 2048-bit pair for `principal` and persist both halves
    pub fn generate(&self, principal: Principal) -> Result<KeyPair> {
        self.generate_with_bits(principal, MIN_KEY_BITS)
    }

    /// Generate a pair with an explicit modulus size (at least 2048 bits)
    ///
    /// Existing files are overwritten; callers decide whether that is allowed.
    pub fn generate_with_bits(&self, principal: Principal, bits: usize) -> Result<KeyPair> {
        let pair = KeyPair::generate(principal, bits)?;

        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::KeyGeneration(format!("Cannot create {}: {}", self.dir.display(), e))
        })?;

        let private_pem = pair.private.to_pkcs8_pem()?;
        let public_pem = pair.public.to_pem()?;

        write_private(&self.path_for(principal, KeyRole::Private), private_pem.as_bytes())?;
        write_public(&self.path_for(principal, KeyRole::Public), public_pem.as_bytes())?;

        tracing::info!(
            principal = principal.as_str(),
            bits,
            dir = %self.dir.display(),
            "Generated key pair"
        );

        Ok(pair)
    }

    /// Load `principal`'s private key
    pub fn load_private(&self, principal: Principal) -> Result<PrivateKey> {
        let pem = self.read_pem(principal, KeyRole::Private)?;
        PrivateKey::from_pkcs8_pem(&pem)
    }

    /// Load `principal`'s public key
    pub fn load_public(&self, principal: Principal) -> Result<PublicKey> {
        let pem = self.read_pem(principal, KeyRole::Public)?;
        PublicKey::from_pem(&pem)
    }

    fn read_pem(&self, principal: Principal, role: KeyRole) -> Result<Zeroizing<String>> {
        let path = self.path_for(principal, role);
        match fs::read_to_string(&path) {
            Ok(pem) => Ok(Zeroizing::new(pem)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::KeyNotFound(path)),
            Err(e) => Err(Error::Io(format!("{}: {}", path.display(), e))),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| Error::KeyGeneration(format!("{}: {}", path.display(), e)))?;
    // mode() only applies on create
    file.set_permissions(fs::Permissions::from_mode(0o600))
        .and_then(|_| file.write_all(contents))
        .map_err(|e| Error::KeyGeneration(format!("{}: {}", path.display(), e)))
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    fs::File::create(path)
        .and_then(|mut file| file.write_all(contents))
        .map_err(|e| Error::KeyGeneration(format!("{}: {}", path.display(), e)))
}

fn write_public(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents)
        .map_err(|e| Error::KeyGeneration(format!("{}: {}", path.display(), e)))
}

// ============================================================================
// PUBLIC KEY DISTRIBUTION
// ============================================================================

/// PEM-encoded public keys of both principals, fixed at startup
///
/// This is the only key material a server hands out.
#[derive(Debug, Clone)]
pub struct PublicKeyDirectory {
    server_pem: String,
    client_pem: String,
}

impl PublicKeyDirectory {
    /// Build the directory from the two public keys
    pub fn new(server: &PublicKey, client: &PublicKey) -> Result<Self> {
        Ok(Self {
            server_pem: server.to_pem()?,
            client_pem: client.to_pem()?,
        })
    }

    /// PEM text of `principal`'s public key
    pub fn get_public_key(&self, principal: Principal) -> &str {
        match principal {
            Principal::Server => &self.server_pem,
            Principal::Client => &self.client_pem,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use tempfile::TempDir;

    #[test]
    fn test_file_names() {
        let store = KeyStore::new("keys");
        assert_eq!(
            store.path_for(Principal::Server, KeyRole::Private),
            PathBuf::from("keys/server_private_key.pem")
        );
        assert_eq!(
            store.path_for(Principal::Client, KeyRole::Public),
            PathBuf::from("keys/client_public_key.pem")
        );
    }

    #[test]
    fn test_load_fixture_keys() {
        let dir = TempDir::new().unwrap();
        test_support::write_fixture_dir(dir.path());
        let store = KeyStore::new(dir.path());

        let server_private = store.load_private(Principal::Server).unwrap();
        let server_public = store.load_public(Principal::Server).unwrap();
        let client_public = store.load_public(Principal::Client).unwrap();

        assert_eq!(server_private.public_key(), server_public);
        assert_eq!(client_public, test_support::client_public());
    }

    #[test]
    fn test_missing_key_is_key_not_found() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(dir.path());

        let err = store.load_private(Principal::Server).unwrap_err();
        match err {
            Error::KeyNotFound(path) => {
                assert!(path.ends_with("server_private_key.pem"));
            }
            other => panic!("expected KeyNotFound, got {:?}", other),
        }
        assert!(store.load_private(Principal::Server).unwrap_err().is_fatal());
    }

    #[test]
    fn test_corrupt_key_is_invalid_key() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("client_public_key.pem"), "garbage").unwrap();
        let store = KeyStore::new(dir.path());

        let err = store.load_public(Principal::Client).unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }

    #[test]
    fn test_generate_persists_both_halves() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(dir.path().join("nested"));
        assert!(!store.has_any(Principal::Client));

        let pair = store.generate(Principal::Client).unwrap();
        assert_eq!(pair.principal, Principal::Client);
        assert_eq!(pair.public.bits(), 2048);
        assert!(store.has_any(Principal::Client));

        let loaded_private = store.load_private(Principal::Client).unwrap();
        let loaded_public = store.load_public(Principal::Client).unwrap();
        assert_eq!(loaded_private.public_key(), pair.public);
        assert_eq!(loaded_public, pair.public);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(store.path_for(Principal::Client, KeyRole::Private))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_generate_refuses_weak_keys() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(dir.path());

        let err = store.generate_with_bits(Principal::Server, 1024).unwrap_err();
        assert!(matches!(err, Error::KeyGeneration(_)));
        assert!(!store.has_any(Principal::Server));
    }

    #[test]
    fn test_directory_serves_public_pems_only() {
        let directory = PublicKeyDirectory::new(
            &test_support::server_public(),
            &test_support::client_public(),
        )
        .unwrap();

        for principal in Principal::ALL {
            let pem = directory.get_public_key(principal);
            assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
            assert!(!pem.contains("PRIVATE"));
        }
        assert_eq!(
            PublicKey::from_pem(directory.get_public_key(Principal::Server)).unwrap(),
            test_support::server_public()
        );
    }
}
