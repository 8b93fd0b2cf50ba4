//! # credseal Core
//!
//! Secure credential envelopes: a client encrypts login credentials to the
//! server's RSA key and signs the result with its own, so that the server only
//! ever accepts credentials that came from a registered client, and nothing
//! on the path can read them.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CREDSEAL CORE MODULES                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  CLIENT                                     SERVER                      │
//! │  ┌─────────────┐                            ┌───────────────────────┐  │
//! │  │ Credentials │                            │  SecureLoginHandshake │  │
//! │  └──────┬──────┘                            │                       │  │
//! │         ▼                                   │  decode ─► verify     │  │
//! │  ┌─────────────┐   {"payload","signature"}  │    ─► decrypt         │  │
//! │  │  Envelope   │───────────────────────────►│    ─► parse           │  │
//! │  │   ::seal    │                            │    ─► IdentityProvider│  │
//! │  └──────┬──────┘                            └──────────┬────────────┘  │
//! │         │                                              │               │
//! │         └──────────────┬───────────────────────────────┘               │
//! │                        ▼                                               │
//! │  ┌─────────────┐  ┌─────────────┐                                      │
//! │  │   Crypto    │  │  KeyStore   │                                      │
//! │  │ OAEP / PSS  │  │ PEM on disk │                                      │
//! │  └─────────────┘  └─────────────┘                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - RSA keys, OAEP encryption, PSS signatures
//! - [`keystore`] - PEM key files per principal, public key distribution
//! - [`credentials`] - The email/password plaintext
//! - [`envelope`] - Wire format and client-side sealing
//! - [`identity`] - Password authentication backends
//! - [`handshake`] - Server-side login state machine

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod credentials;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod handshake;
pub mod identity;
pub mod keystore;

#[cfg(test)]
mod test_support;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use credentials::LoginCredentials;
pub use crypto::{KeyPair, Principal, PrivateKey, PublicKey};
pub use envelope::{SecureEnvelope, WireEncoding, WireEnvelope};
pub use error::{Error, Result};
pub use handshake::{FailureKind, LoginOutcome, SecureLoginHandshake};
pub use identity::{IdentityProvider, SignIn, StaticIdentityProvider};
pub use keystore::{KeyStore, PublicKeyDirectory};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
