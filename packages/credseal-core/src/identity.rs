//! # Identity Providers
//!
//! The collaborator that actually decides whether an email/password pair is
//! valid. The handshake only proves the credentials came from the registered
//! client; it hands them to an [`IdentityProvider`] for the password check.
//!
//! ```text
//! SecureLoginHandshake ──sign_in_with_password(email, password)──► IdentityProvider
//!                      ◄──────── SignIn { user, session } ─────────
//!                      ◄──────── AuthenticationFailed ─────────────
//!                      ◄──────── IdentityUnavailable ──────────────
//! ```
//!
//! The HTTP-backed provider lives with the server. This module carries the
//! trait and [`StaticIdentityProvider`], an in-memory account directory for
//! development and tests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Default lifetime of tokens issued by [`StaticIdentityProvider`]
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// An authenticated user as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityUser {
    /// Account email
    pub email: String,
    /// Free-form profile metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl IdentityUser {
    /// The `name` entry of the metadata, if it is a string
    pub fn display_name(&self) -> Option<&str> {
        self.metadata.get("name").and_then(|v| v.as_str())
    }
}

/// Session issued on a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySession {
    /// Opaque bearer token
    pub access_token: String,
    /// Expiry as a Unix timestamp (seconds)
    pub expires_at: i64,
}

/// Successful sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignIn {
    pub user: IdentityUser,
    pub session: IdentitySession,
}

/// Password authentication backend
///
/// Implementations return [`Error::AuthenticationFailed`] when the credentials
/// are wrong and [`Error::IdentityUnavailable`] when they cannot tell.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check a password and open a session
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SignIn>;
}

// ============================================================================
// STATIC PROVIDER
// ============================================================================

/// One entry of an accounts file
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredAccount {
    password_digest: [u8; 32],
    name: Option<String>,
}

/// In-memory account directory
///
/// Passwords are kept only as SHA-256 digests. Emails match case-insensitively.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    accounts: HashMap<String, StoredAccount>,
    token_ttl_secs: i64,
}

impl Default for StaticIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticIdentityProvider {
    /// Empty directory
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    /// Add an account
    pub fn with_account(mut self, email: &str, password: &str, name: Option<&str>) -> Self {
        self.accounts.insert(
            email.to_lowercase(),
            StoredAccount {
                password_digest: digest(password),
                name: name.map(str::to_string),
            },
        );
        self
    }

    /// Override the issued token lifetime
    pub fn with_token_ttl(mut self, secs: i64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    /// Build from parsed account records
    pub fn from_records(records: impl IntoIterator<Item = AccountRecord>) -> Self {
        records.into_iter().fold(Self::new(), |provider, record| {
            provider.with_account(&record.email, &record.password, record.name.as_deref())
        })
    }

    /// Load a JSON accounts file: `[{"email", "password", "name"?}, ...]`
    pub fn from_accounts_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
        let records: Vec<AccountRecord> = serde_json::from_slice(&raw)?;

        tracing::info!(accounts = records.len(), path = %path.display(), "Loaded static accounts");
        Ok(Self::from_records(records))
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no accounts are configured
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SignIn> {
        let email = email.to_lowercase();
        let account = self
            .accounts
            .get(&email)
            .filter(|account| account.password_digest == digest(password))
            .ok_or(Error::AuthenticationFailed)?;

        let mut metadata = serde_json::Map::new();
        if let Some(name) = &account.name {
            metadata.insert("name".into(), serde_json::Value::String(name.clone()));
        }

        let expires_at = chrono::Utc::now().timestamp() + self.token_ttl_secs;

        Ok(SignIn {
            user: IdentityUser { email, metadata },
            session: IdentitySession {
                access_token: uuid::Uuid::new_v4().simple().to_string(),
                expires_at,
            },
        })
    }
}

fn digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

// ============================================================================
// TESTS
// ============================================================================
