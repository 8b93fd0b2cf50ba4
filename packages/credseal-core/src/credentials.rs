//! Login credentials carried inside an envelope.
//!
//! The plaintext is the JSON object `{"email": "...", "password": "..."}`.
//! Both fields are required and must be non-empty strings. Values live only
//! in memory for the duration of a handshake and are wiped on drop.

use std::fmt;

use serde::Serialize;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

/// Email and password pair
#[derive(Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct LoginCredentials {
    email: String,
    password: String,
}

impl LoginCredentials {
    /// Build credentials, rejecting empty fields
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let credentials = Self {
            email: email.into(),
            password: password.into(),
        };
        if credentials.email.is_empty() || credentials.password.is_empty() {
            return Err(Error::InvalidCredentialShape(
                "Email and password are required.".into(),
            ));
        }
        Ok(credentials)
    }

    /// Account email
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Account password
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Serialize to the JSON plaintext that gets encrypted
    pub fn to_json_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(serde_json::to_vec(self)?))
    }

    /// Parse decrypted plaintext
    ///
    /// Anything other than a JSON object with two non-empty string fields is
    /// [`Error::InvalidCredentialShape`].
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        let not_an_object =
            || Error::InvalidCredentialShape("Decrypted payload is not a JSON object.".into());

        let mut object = match serde_json::from_slice::<serde_json::Value>(bytes) {
            Ok(serde_json::Value::Object(object)) => object,
            _ => return Err(not_an_object()),
        };

        let email = required_string(object.remove("email"), "email")?;
        let password = required_string(object.remove("password"), "password")?;
        Self::new(email, password)
    }
}

fn required_string(value: Option<serde_json::Value>, field: &str) -> Result<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s),
        Some(serde_json::Value::String(_)) | None | Some(serde_json::Value::Null) => Err(
            Error::InvalidCredentialShape(format!("Field '{}' is required.", field)),
        ),
        Some(_) => Err(Error::InvalidCredentialShape(format!(
            "Field '{}' must be a string.",
            field
        ))),
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
