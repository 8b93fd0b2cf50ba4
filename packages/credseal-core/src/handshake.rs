//! # Secure Login Handshake
//!
//! The server side of the protocol: take a raw request body, prove it came
//! from the registered client, recover the credentials and hand them to the
//! identity provider.
//!
//! ## State Machine
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        HANDSHAKE STATES                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Received                                                              │
//! │     │ decode JSON + wire encoding        ──► MalformedEnvelope/Encoding│
//! │     ▼                                                                   │
//! │  Decoded                                                               │
//! │     │ PSS verify(ciphertext, client pub) ──► SignatureVerification     │
//! │     ▼                                                                   │
//! │  SignatureVerified                                                     │
//! │     │ OAEP decrypt(server priv)          ──► Decryption                │
//! │     ▼                                                                   │
//! │  Decrypted                                                             │
//! │     │ parse {email, password}            ──► InvalidCredentialShape    │
//! │     ▼                                                                   │
//! │  CredentialsParsed                                                     │
//! │     │ identity provider sign-in          ──► AuthenticationFailed      │
//! │     ▼                                        IdentityUnavailable       │
//! │  Delegated ──► Succeeded                                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each request runs the machine once, front to back. Nothing is retried and
//! nothing is remembered between requests.
//!
//! ## Oracle Resistance
//!
//! `SignatureVerification` and `Decryption` failures produce the same public
//! message. The precise kind and stage go to the log only.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::credentials::LoginCredentials;
use crate::crypto::{self, PrivateKey, PublicKey};
use crate::envelope::{SecureEnvelope, WireEncoding};
use crate::error::Error;
use crate::identity::{IdentityProvider, SignIn};

/// Public message shared by signature and decryption failures
pub const CRYPTO_FAILURE_MESSAGE: &str = "Secure payload could not be verified.";

/// Handshake state a failed transition was heading for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeStage {
    Decoded,
    SignatureVerified,
    Decrypted,
    CredentialsParsed,
    Delegated,
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandshakeStage::Decoded => "decoded",
            HandshakeStage::SignatureVerified => "signature_verified",
            HandshakeStage::Decrypted => "decrypted",
            HandshakeStage::CredentialsParsed => "credentials_parsed",
            HandshakeStage::Delegated => "delegated",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a failed login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MalformedEnvelope,
    Encoding,
    SignatureVerification,
    Decryption,
    InvalidCredentialShape,
    AuthenticationFailed,
    IdentityUnavailable,
}

impl FailureKind {
    /// Whether this kind is reported with [`CRYPTO_FAILURE_MESSAGE`]
    pub fn is_crypto(&self) -> bool {
        matches!(
            self,
            FailureKind::SignatureVerification | FailureKind::Decryption
        )
    }
}

/// A handshake that stopped before reaching the identity provider
#[derive(Debug)]
pub struct HandshakeFailure {
    pub stage: HandshakeStage,
    pub kind: FailureKind,
    pub error: Error,
}

impl HandshakeFailure {
    fn new(stage: HandshakeStage, kind: FailureKind, error: Error) -> Self {
        Self { stage, kind, error }
    }

    /// Message safe to return to the caller
    pub fn public_message(&self) -> String {
        if self.kind.is_crypto() {
            CRYPTO_FAILURE_MESSAGE.to_string()
        } else {
            match &self.error {
                Error::MalformedEnvelope(detail) | Error::InvalidCredentialShape(detail) => {
                    detail.clone()
                }
                Error::Encoding { field, .. } => format!("Field '{}' is not validly encoded.", field),
                other => other.to_string(),
            }
        }
    }
}

impl fmt::Display for HandshakeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {}: {}", self.kind, self.stage, self.error)
    }
}

impl std::error::Error for HandshakeFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Authenticated user returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginUser {
    pub email: String,
    #[serde(rename = "name")]
    pub display_name: Option<String>,
}

/// Session returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginSession {
    pub access_token: String,
    pub expires_at: i64,
}

/// Result of one login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success {
        user: LoginUser,
        session: LoginSession,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success { .. })
    }
}

impl From<SignIn> for LoginOutcome {
    fn from(sign_in: SignIn) -> Self {
        let display_name = sign_in.user.display_name().map(str::to_string);
        LoginOutcome::Success {
            user: LoginUser {
                email: sign_in.user.email,
                display_name,
            },
            session: LoginSession {
                access_token: sign_in.session.access_token,
                expires_at: sign_in.session.expires_at,
            },
        }
    }
}

// ============================================================================
// HANDSHAKE
// ============================================================================

/// Server-side login handshake
///
/// Holds the key material for the process lifetime; share it behind an `Arc`.
pub struct SecureLoginHandshake {
    own_private: PrivateKey,
    counterpart_public: PublicKey,
    encoding: WireEncoding,
    identity: Arc<dyn IdentityProvider>,
}

impl SecureLoginHandshake {
    /// Create a handshake from the server's private key and the client's
    /// public key
    pub fn new(
        own_private: PrivateKey,
        counterpart_public: PublicKey,
        encoding: WireEncoding,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            own_private,
            counterpart_public,
            encoding,
            identity,
        }
    }

    /// Wire encoding this handshake expects
    pub fn encoding(&self) -> WireEncoding {
        self.encoding
    }

    /// Run the cryptographic stages only: decode, verify, decrypt, parse
    pub fn open(&self, body: &[u8]) -> Result<LoginCredentials, HandshakeFailure> {
        let envelope = SecureEnvelope::from_json(body, self.encoding).map_err(|e| {
            let kind = match e {
                Error::Encoding { .. } => FailureKind::Encoding,
                _ => FailureKind::MalformedEnvelope,
            };
            HandshakeFailure::new(HandshakeStage::Decoded, kind, e)
        })?;

        crypto::verify(
            envelope.signed_message(),
            &envelope.signature,
            &self.counterpart_public,
        )
        .map_err(|e| {
            HandshakeFailure::new(
                HandshakeStage::SignatureVerified,
                FailureKind::SignatureVerification,
                e,
            )
        })?;

        let plaintext = crypto::decrypt(&envelope.ciphertext, &self.own_private).map_err(|e| {
            HandshakeFailure::new(HandshakeStage::Decrypted, FailureKind::Decryption, e)
        })?;

        LoginCredentials::from_json_bytes(&plaintext).map_err(|e| {
            HandshakeFailure::new(
                HandshakeStage::CredentialsParsed,
                FailureKind::InvalidCredentialShape,
                e,
            )
        })
    }

    /// Run the full handshake, including the identity provider call
    pub async fn login(&self, body: &[u8]) -> LoginOutcome {
        let credentials = match self.open(body) {
            Ok(credentials) => credentials,
            Err(failure) => {
                tracing::warn!(
                    kind = ?failure.kind,
                    stage = %failure.stage,
                    code = failure.error.code(),
                    "Secure login rejected"
                );
                return LoginOutcome::Failure {
                    kind: failure.kind,
                    message: failure.public_message(),
                };
            }
        };

        tracing::debug!("Envelope verified, delegating to identity provider");

        match self
            .identity
            .sign_in_with_password(credentials.email(), credentials.password())
            .await
        {
            Ok(sign_in) => {
                tracing::info!("Secure login succeeded");
                sign_in.into()
            }
            Err(Error::AuthenticationFailed) => {
                tracing::warn!(
                    kind = ?FailureKind::AuthenticationFailed,
                    stage = %HandshakeStage::Delegated,
                    "Secure login rejected"
                );
                LoginOutcome::Failure {
                    kind: FailureKind::AuthenticationFailed,
                    message: Error::AuthenticationFailed.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(
                    kind = ?FailureKind::IdentityUnavailable,
                    stage = %HandshakeStage::Delegated,
                    error = %e,
                    "Identity provider failed"
                );
                LoginOutcome::Failure {
                    kind: FailureKind::IdentityUnavailable,
                    message: "Identity service unavailable.".to_string(),
                }
            }
        }
    }
}

impl fmt::Debug for SecureLoginHandshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureLoginHandshake")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentitySession, IdentityUser, StaticIdentityProvider};
    use crate::test_support;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and delegates to a static directory, or fails outright
    struct RecordingProvider {
        calls: AtomicUsize,
        inner: StaticIdentityProvider,
        unavailable: bool,
    }

    impl RecordingProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                inner: StaticIdentityProvider::new().with_account("a@b.com", "pw123", Some("Alice")),
                unavailable: false,
            })
        }

        fn unavailable() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                inner: StaticIdentityProvider::new(),
                unavailable: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityProvider for RecordingProvider {
        async fn sign_in_with_password(&self, email: &str, password: &str) -> crate::Result<SignIn> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(Error::IdentityUnavailable("connection refused".into()));
            }
            self.inner.sign_in_with_password(email, password).await
        }
    }

    fn handshake(provider: Arc<RecordingProvider>, encoding: WireEncoding) -> SecureLoginHandshake {
        SecureLoginHandshake::new(
            test_support::server_private(),
            test_support::client_public(),
            encoding,
            provider,
        )
    }

    fn sealed_body(email: &str, password: &str, signer: &PrivateKey, encoding: WireEncoding) -> Vec<u8> {
        let creds = LoginCredentials::new(email, password).unwrap();
        let envelope = SecureEnvelope::seal(&creds, &test_support::server_public(), signer).unwrap();
        serde_json::to_vec(&envelope.encode(encoding)).unwrap()
    }

    fn envelope_of_plaintext(plaintext: &[u8]) -> Vec<u8> {
        let ciphertext = crypto::encrypt(plaintext, &test_support::server_public()).unwrap();
        let signature = crypto::sign(&ciphertext, &test_support::client_private()).unwrap();
        let envelope = SecureEnvelope {
            ciphertext,
            signature,
        };
        serde_json::to_vec(&envelope.encode(WireEncoding::Hex)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_envelope_logs_in() {
        let provider = RecordingProvider::new();
        let handshake = handshake(provider.clone(), WireEncoding::Hex);
        let body = sealed_body("a@b.com", "pw123", &test_support::client_private(), WireEncoding::Hex);

        match handshake.login(&body).await {
            LoginOutcome::Success { user, session } => {
                assert_eq!(user.email, "a@b.com");
                assert_eq!(user.display_name.as_deref(), Some("Alice"));
                assert!(!session.access_token.is_empty());
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_base64_deployment() {
        let provider = RecordingProvider::new();
        let handshake = handshake(provider, WireEncoding::Base64);
        let body = sealed_body("a@b.com", "pw123", &test_support::client_private(), WireEncoding::Base64);

        assert!(handshake.login(&body).await.is_success());
    }

    #[tokio::test]
    async fn test_foreign_signer_never_reaches_provider() {
        let provider = RecordingProvider::new();
        let handshake = handshake(provider.clone(), WireEncoding::Hex);
        let body = sealed_body("a@b.com", "pw123", &test_support::rogue_private(), WireEncoding::Hex);

        let failure = handshake.open(&body).unwrap_err();
        assert_eq!(failure.stage, HandshakeStage::SignatureVerified);
        assert_eq!(failure.kind, FailureKind::SignatureVerification);

        assert_eq!(
            handshake.login(&body).await,
            LoginOutcome::Failure {
                kind: FailureKind::SignatureVerification,
                message: CRYPTO_FAILURE_MESSAGE.to_string(),
            }
        );
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_password_is_credential_shape() {
        let provider = RecordingProvider::new();
        let handshake = handshake(provider.clone(), WireEncoding::Hex);
        let body = envelope_of_plaintext(br#"{"email":"a@b.com"}"#);

        match handshake.login(&body).await {
            LoginOutcome::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::InvalidCredentialShape);
                assert!(message.contains("password"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_garbage_payload_fails_at_decode() {
        let handshake = handshake(RecordingProvider::new(), WireEncoding::Hex);
        let body = br#"{"payload":"this is not hex","signature":"abcd"}"#;

        let failure = handshake.open(body).unwrap_err();
        assert_eq!(failure.stage, HandshakeStage::Decoded);
        assert_eq!(failure.kind, FailureKind::Encoding);
        assert!(failure.public_message().contains("payload"));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let handshake = handshake(RecordingProvider::new(), WireEncoding::Hex);

        let failure = handshake.open(br#"{"data":"abcd","signature":"abcd"}"#).unwrap_err();
        assert_eq!(failure.kind, FailureKind::MalformedEnvelope);
        assert_eq!(failure.stage, HandshakeStage::Decoded);
    }

    #[test]
    fn test_tampered_ciphertext_fails_signature() {
        let handshake = handshake(RecordingProvider::new(), WireEncoding::Hex);
        let creds = LoginCredentials::new("a@b.com", "pw123").unwrap();
        let mut envelope = SecureEnvelope::seal(
            &creds,
            &test_support::server_public(),
            &test_support::client_private(),
        )
        .unwrap();
        envelope.ciphertext[17] ^= 0x01;
        let body = serde_json::to_vec(&envelope.encode(WireEncoding::Hex)).unwrap();

        let failure = handshake.open(&body).unwrap_err();
        assert_eq!(failure.kind, FailureKind::SignatureVerification);
    }

    #[test]
    fn test_signed_garbage_fails_decryption_with_shared_message() {
        let handshake = handshake(RecordingProvider::new(), WireEncoding::Hex);
        // Correctly signed, but not an OAEP ciphertext for the server key
        let ciphertext = vec![0x42u8; 256];
        let signature = crypto::sign(&ciphertext, &test_support::client_private()).unwrap();
        let body = serde_json::to_vec(
            &SecureEnvelope {
                ciphertext,
                signature,
            }
            .encode(WireEncoding::Hex),
        )
        .unwrap();

        let failure = handshake.open(&body).unwrap_err();
        assert_eq!(failure.stage, HandshakeStage::Decrypted);
        assert_eq!(failure.kind, FailureKind::Decryption);
        assert_eq!(failure.public_message(), CRYPTO_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_wrong_password_is_authentication_failure() {
        let provider = RecordingProvider::new();
        let handshake = handshake(provider.clone(), WireEncoding::Hex);
        let body = sealed_body("a@b.com", "nope", &test_support::client_private(), WireEncoding::Hex);

        assert_eq!(
            handshake.login(&body).await,
            LoginOutcome::Failure {
                kind: FailureKind::AuthenticationFailed,
                message: "Invalid login credentials.".to_string(),
            }
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_outage_is_identity_unavailable() {
        let provider = RecordingProvider::unavailable();
        let handshake = handshake(provider.clone(), WireEncoding::Hex);
        let body = sealed_body("a@b.com", "pw123", &test_support::client_private(), WireEncoding::Hex);

        match handshake.login(&body).await {
            LoginOutcome::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::IdentityUnavailable);
                assert!(!message.contains("connection refused"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_sign_in_maps_to_outcome() {
        let sign_in = SignIn {
            user: IdentityUser {
                email: "a@b.com".into(),
                metadata: serde_json::Map::new(),
            },
            session: IdentitySession {
                access_token: "tok".into(),
                expires_at: 1_700_000_000,
            },
        };

        let outcome: LoginOutcome = sign_in.into();
        assert_eq!(
            outcome,
            LoginOutcome::Success {
                user: LoginUser {
                    email: "a@b.com".into(),
                    display_name: None,
                },
                session: LoginSession {
                    access_token: "tok".into(),
                    expires_at: 1_700_000_000,
                },
            }
        );
    }
}
