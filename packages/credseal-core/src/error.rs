//! # Error Handling
//!
//! This module provides the error taxonomy for the credential envelope
//! protocol.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Key Errors (startup)                                              │
//! │  │   ├── KeyNotFound           - Expected PEM file is absent           │
//! │  │   ├── KeyGeneration         - Entropy / IO failure while generating │
//! │  │   └── InvalidKey            - PEM does not parse or key too weak    │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── EncryptionFailed      - Plaintext too long / RSA failure      │
//! │  │   ├── DecryptionFailed      - Uniform, carries no detail            │
//! │  │   ├── VerificationFailed    - Signature does not match              │
//! │  │   ├── InvalidSignature      - Signature bytes are malformed         │
//! │  │   └── SigningFailed         - RSA private-key operation failed      │
//! │  │                                                                      │
//! │  ├── Envelope Errors                                                   │
//! │  │   ├── MalformedEnvelope     - Missing or non-string fields          │
//! │  │   └── Encoding              - Field text is not hex / base64        │
//! │  │                                                                      │
//! │  ├── Login Errors                                                      │
//! │  │   ├── InvalidCredentialShape - Decrypted JSON lacks email/password  │
//! │  │   ├── AuthenticationFailed  - Identity provider rejected login      │
//! │  │   └── IdentityUnavailable   - Identity provider unreachable         │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── Io                                                            │
//! │      └── Serialization                                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Crypto failures carry as little detail as possible. A
//! `DecryptionFailed` looks identical whether the key was wrong, the
//! ciphertext was corrupted, or the padding did not check out.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for credseal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for credseal
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key Errors (100-199)
    // ========================================================================

    /// A key file expected at startup does not exist
    #[error("Key file not found: {}", .0.display())]
    KeyNotFound(PathBuf),

    /// Key generation or persistence failed
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Key material could not be parsed or is too weak
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // ========================================================================
    // Crypto Errors (200-299)
    // ========================================================================

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Signature verification failed
    #[error("Signature verification failed")]
    VerificationFailed,

    /// Signature bytes are malformed (wrong length for the signer's key)
    #[error("Invalid signature")]
    InvalidSignature,

    /// Producing a signature failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    // ========================================================================
    // Envelope Errors (300-399)
    // ========================================================================

    /// Envelope is not a JSON object or lacks a required field
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Envelope field text is not valid in the configured wire encoding
    #[error("Invalid {field} encoding: {reason}")]
    Encoding {
        /// Name of the offending wire field
        field: &'static str,
        /// Decoder message
        reason: String,
    },

    // ========================================================================
    // Login Errors (400-499)
    // ========================================================================

    /// Decrypted credentials do not have the expected shape
    #[error("Invalid credentials: {0}")]
    InvalidCredentialShape(String),

    /// The identity provider rejected the credentials
    #[error("Invalid login credentials.")]
    AuthenticationFailed,

    /// The identity provider could not be reached or answered garbage
    #[error("Identity provider unavailable: {0}")]
    IdentityUnavailable(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Filesystem error outside of key lookup
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// - 100-199: Keys
    /// - 200-299: Crypto
    /// - 300-399: Envelope
    /// - 400-499: Login
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::KeyNotFound(_) => 100,
            Error::KeyGeneration(_) => 101,
            Error::InvalidKey(_) => 102,

            Error::EncryptionFailed(_) => 200,
            Error::DecryptionFailed => 201,
            Error::VerificationFailed => 202,
            Error::InvalidSignature => 203,
            Error::SigningFailed(_) => 204,

            Error::MalformedEnvelope(_) => 300,
            Error::Encoding { .. } => 301,

            Error::InvalidCredentialShape(_) => 400,
            Error::AuthenticationFailed => 401,
            Error::IdentityUnavailable(_) => 402,

            Error::Io(_) => 900,
            Error::Serialization(_) => 901,
        }
    }

    /// Whether this error came out of signature verification or decryption.
    ///
    /// These are reported to callers with one shared message so the response
    /// cannot distinguish a bad signature from a bad ciphertext.
    pub fn is_crypto_failure(&self) -> bool {
        matches!(
            self,
            Error::DecryptionFailed | Error::VerificationFailed | Error::InvalidSignature
        )
    }

    /// Whether this error must abort process startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::KeyNotFound(_) | Error::KeyGeneration(_) | Error::InvalidKey(_)
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::KeyNotFound(PathBuf::from("x")).code(), 100);
        assert_eq!(Error::EncryptionFailed("test".into()).code(), 200);
        assert_eq!(Error::MalformedEnvelope("test".into()).code(), 300);
        assert_eq!(Error::InvalidCredentialShape("test".into()).code(), 400);
        assert_eq!(Error::AuthenticationFailed.code(), 401);
        assert_eq!(Error::Serialization("test".into()).code(), 901);
    }

    #[test]
    fn test_crypto_failures_are_grouped() {
        assert!(Error::DecryptionFailed.is_crypto_failure());
        assert!(Error::VerificationFailed.is_crypto_failure());
        assert!(Error::InvalidSignature.is_crypto_failure());
        assert!(!Error::MalformedEnvelope("x".into()).is_crypto_failure());
        assert!(!Error::AuthenticationFailed.is_crypto_failure());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(Error::KeyNotFound(PathBuf::from("keys/server_private_key.pem")).is_fatal());
        assert!(Error::InvalidKey("weak".into()).is_fatal());
        assert!(!Error::DecryptionFailed.is_fatal());
    }

    #[test]
    fn test_decryption_error_carries_no_detail() {
        assert_eq!(Error::DecryptionFailed.to_string(), "Decryption failed");
    }

    #[test]
    fn test_key_not_found_names_path() {
        let err = Error::KeyNotFound(PathBuf::from("keys/client_public_key.pem"));
        assert!(err.to_string().contains("keys/client_public_key.pem"));
    }
}
