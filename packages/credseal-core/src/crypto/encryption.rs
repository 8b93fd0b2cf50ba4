//! # Encryption Module
//!
//! RSA-OAEP encryption of credential plaintext to the server's public key.
//!
//! ## Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      CREDENTIAL ENCRYPTION FLOW                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  CLIENT                                                                │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  {"email":"...","password":"..."}   (<= 190 bytes)           │       │
//! │  │           ↓                                                  │       │
//! │  │  RSA-OAEP(                                                   │       │
//! │  │    key  = server public key,                                 │       │
//! │  │    hash = SHA-256,                                           │       │
//! │  │    mgf  = MGF1(SHA-256),                                     │       │
//! │  │    label = empty                                             │       │
//! │  │  )                                                          │       │
//! │  │           ↓                                                  │       │
//! │  │  Ciphertext (exactly key size: 256 bytes for RSA-2048)       │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  SERVER                                                                │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  Ciphertext → blinded RSA-OAEP decrypt → plaintext           │       │
//! │  │  Any failure → DecryptionFailed (no reason given)            │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Size Limit
//!
//! OAEP can carry at most `k - 2*hLen - 2` bytes, where `k` is the modulus
//! size and `hLen` the hash length. For RSA-2048 with SHA-256 that is
//! `256 - 64 - 2 = 190` bytes. Longer input is refused up front.

use rand::rngs::OsRng;
use rsa::Oaep;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::crypto::{PrivateKey, PublicKey};
use crate::error::{Error, Result};

/// Largest plaintext OAEP/SHA-256 can carry for a key of `key_size` bytes
pub fn max_plaintext_len(key_size: usize) -> usize {
    key_size.saturating_sub(2 * <Sha256 as Digest>::output_size() + 2)
}

/// Encrypt `plaintext` to `recipient`
///
/// ## Returns
///
/// Ciphertext whose length equals the recipient's modulus size
///
/// ## Errors
///
/// `EncryptionFailed` if the plaintext is longer than
/// [`max_plaintext_len`] for the recipient key.
pub fn encrypt(plaintext: &[u8], recipient: &PublicKey) -> Result<Vec<u8>> {
    let limit = max_plaintext_len(recipient.size());
    if plaintext.len() > limit {
        return Err(Error::EncryptionFailed(format!(
            "Plaintext is {} bytes; OAEP/SHA-256 limit for this key is {}",
            plaintext.len(),
            limit
        )));
    }

    recipient
        .as_rsa()
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| Error::EncryptionFailed(e.to_string()))
}

/// Decrypt `ciphertext` with our own private key
///
/// Every failure maps to [`Error::DecryptionFailed`] with no underlying reason.
pub fn decrypt(ciphertext: &[u8], own: &PrivateKey) -> Result<Zeroizing<Vec<u8>>> {
    if ciphertext.len() != own.size() {
        return Err(Error::DecryptionFailed);
    }

    own.as_rsa()
        .decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| Error::DecryptionFailed)
}

// ============================================================================
// TESTS
// ============================================================================
