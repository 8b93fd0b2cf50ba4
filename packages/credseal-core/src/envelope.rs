//! # Secure Envelope
//!
//! The wire bundle of ciphertext + signature, and the codec that moves it in
//! and out of JSON.
//!
//! ## Wire Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ENVELOPE WIRE FORMAT                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  {                                                                      │
//! │    "payload":   <ciphertext, hex or base64>,                           │
//! │    "signature": <RSA-PSS signature over the ciphertext, same encoding> │
//! │  }                                                                      │
//! │                                                                         │
//! │  • The encoding is chosen per deployment (`WireEncoding`). It is not   │
//! │    announced on the wire; both ends must be configured alike.          │
//! │  • hex: lowercase on encode, either case accepted on decode            │
//! │  • base64: standard alphabet with `=` padding                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is Signed
//!
//! The signature always covers the **ciphertext bytes**, never the plaintext.
//! The client encrypts first and then signs what it encrypted, so the server
//! can reject a forged envelope before doing any private-key work.
//! [`SecureEnvelope::signed_message`] is the single place that defines this.
//!
//! ## Decode Before Crypto
//!
//! [`SecureEnvelope::from_json`] rejects bodies that are not JSON objects,
//! lack a field, or hold text that does not decode, all before any key is
//! touched.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::credentials::LoginCredentials;
use crate::crypto::{self, PrivateKey, PublicKey};
use crate::error::{Error, Result};

/// JSON field carrying the ciphertext
pub const PAYLOAD_FIELD: &str = "payload";

/// JSON field carrying the signature
pub const SIGNATURE_FIELD: &str = "signature";

/// Text encoding of the binary envelope fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireEncoding {
    /// Hexadecimal
    #[default]
    Hex,
    /// Standard padded base64
    Base64,
}

impl WireEncoding {
    /// Encode bytes as text
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            WireEncoding::Hex => hex::encode(bytes),
            WireEncoding::Base64 => STANDARD.encode(bytes),
        }
    }

    /// Decode text, attributing failures to `field`
    pub fn decode(&self, field: &'static str, text: &str) -> Result<Vec<u8>> {
        let decoded = match self {
            WireEncoding::Hex => hex::decode(text).map_err(|e| e.to_string()),
            WireEncoding::Base64 => STANDARD.decode(text).map_err(|e| e.to_string()),
        };
        decoded.map_err(|reason| Error::Encoding { field, reason })
    }
}

impl fmt::Display for WireEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireEncoding::Hex => f.write_str("hex"),
            WireEncoding::Base64 => f.write_str("base64"),
        }
    }
}

impl FromStr for WireEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hex" => Ok(WireEncoding::Hex),
            "base64" => Ok(WireEncoding::Base64),
            other => Err(Error::Serialization(format!("Unknown wire encoding: {}", other))),
        }
    }
}

/// Envelope as it appears in a request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Encoded ciphertext
    pub payload: String,
    /// Encoded signature
    pub signature: String,
}

/// Decoded envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureEnvelope {
    /// RSA-OAEP ciphertext of the credential JSON
    pub ciphertext: Vec<u8>,
    /// RSA-PSS signature over `ciphertext`
    pub signature: Vec<u8>,
}

impl SecureEnvelope {
    /// Build the envelope a client sends to log in
    ///
    /// ```text
    /// credentials ──JSON──► plaintext ──OAEP(server pub)──► ciphertext
    ///                                                          │
    ///                               PSS(client priv) ◄─────────┘
    ///                                      │
    ///                                      ▼
    ///                                  signature
    /// ```
    pub fn seal(
        credentials: &LoginCredentials,
        server_public: &PublicKey,
        client_private: &PrivateKey,
    ) -> Result<Self> {
        let plaintext = credentials.to_json_bytes()?;
        let ciphertext = crypto::encrypt(&plaintext, server_public)?;
        let signature = crypto::sign(&ciphertext, client_private)?;

        Ok(Self {
            ciphertext,
            signature,
        })
    }

    /// The bytes the signature covers
    pub fn signed_message(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Encode both fields for the wire
    pub fn encode(&self, encoding: WireEncoding) -> WireEnvelope {
        WireEnvelope {
            payload: encoding.encode(&self.ciphertext),
            signature: encoding.encode(&self.signature),
        }
    }

    /// Decode both fields from the wire
    pub fn decode(wire: &WireEnvelope, encoding: WireEncoding) -> Result<Self> {
        if wire.payload.is_empty() || wire.signature.is_empty() {
            return Err(missing_fields());
        }

        Ok(Self {
            ciphertext: encoding.decode(PAYLOAD_FIELD, wire.payload.trim())?,
            signature: encoding.decode(SIGNATURE_FIELD, wire.signature.trim())?,
        })
    }

    /// Parse a raw request body
    ///
    /// Field presence is checked before encoding so that a body with one
    /// field missing is always `MalformedEnvelope`, whatever the other holds.
    pub fn from_json(body: &[u8], encoding: WireEncoding) -> Result<Self> {
        let mut object = match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(object)) => object,
            Ok(_) => {
                return Err(Error::MalformedEnvelope(
                    "Request body must be a JSON object.".into(),
                ))
            }
            Err(_) => {
                return Err(Error::MalformedEnvelope(
                    "Request body is not valid JSON.".into(),
                ))
            }
        };

        let payload = take_string(&mut object, PAYLOAD_FIELD);
        let signature = take_string(&mut object, SIGNATURE_FIELD);

        match (payload, signature) {
            (Some(payload), Some(signature)) => {
                Self::decode(&WireEnvelope { payload, signature }, encoding)
            }
            _ => Err(missing_fields()),
        }
    }
}

fn take_string(object: &mut serde_json::Map<String, serde_json::Value>, field: &str) -> Option<String> {
    match object.remove(field) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn missing_fields() -> Error {
    Error::MalformedEnvelope(format!(
        "Both '{}' and '{}' are required.",
        PAYLOAD_FIELD, SIGNATURE_FIELD
    ))
}

// ============================================================================
// TESTS
// ============================================================================
