//! Server configuration.
//!
//! Built from command-line arguments (with environment fallbacks) in
//! `main.rs`. Exactly one identity backend must be configured.

use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;
use credseal_core::WireEncoding;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5001;

/// Default identity request timeout in seconds.
pub const DEFAULT_IDENTITY_TIMEOUT_SECS: u64 = 10;

/// Where password checks are delegated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityBackend {
    /// Hosted auth service speaking the Supabase GoTrue password grant.
    Supabase { url: String, api_key: String },
    /// Local JSON accounts file, for development.
    Static { accounts_file: PathBuf },
}

impl IdentityBackend {
    /// Pick the backend from the optional settings.
    ///
    /// Supabase needs both URL and key. Configuring Supabase and an accounts
    /// file at once, or neither, is an error.
    pub fn resolve(
        supabase_url: Option<String>,
        supabase_key: Option<String>,
        accounts_file: Option<PathBuf>,
    ) -> Result<Self, String> {
        let supabase_url = supabase_url.filter(|s| !s.trim().is_empty());
        let supabase_key = supabase_key.filter(|s| !s.trim().is_empty());

        match (supabase_url, supabase_key, accounts_file) {
            (Some(url), Some(api_key), None) => Ok(IdentityBackend::Supabase {
                url: url.trim_end_matches('/').to_string(),
                api_key,
            }),
            (None, None, Some(accounts_file)) => Ok(IdentityBackend::Static { accounts_file }),
            (Some(_), None, None) | (None, Some(_), None) => {
                Err("Both --supabase-url and --supabase-key are required".to_string())
            }
            (None, None, None) => Err(
                "No identity backend configured: set --supabase-url/--supabase-key or --accounts-file"
                    .to_string(),
            ),
            _ => Err(
                "Configure either Supabase or an accounts file, not both".to_string(),
            ),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            IdentityBackend::Supabase { .. } => "supabase",
            IdentityBackend::Static { .. } => "static",
        }
    }
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Directory holding the principal PEM files.
    pub keys_dir: PathBuf,
    pub wire_encoding: WireEncoding,
    pub identity: IdentityBackend,
    pub identity_timeout: Duration,
    /// Offset used for the `real_time` response field.
    pub local_offset: FixedOffset,
}

impl ServerConfig {
    /// Socket address to listen on.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Convert a minute offset from UTC into a [`FixedOffset`].
pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, String> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| format!("UTC offset out of range: {} minutes", minutes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supabase_backend() {
        let backend = IdentityBackend::resolve(
            Some("https://abc.supabase.co/".into()),
            Some("anon-key".into()),
            None,
        )
        .unwrap();
        assert_eq!(
            backend,
            IdentityBackend::Supabase {
                url: "https://abc.supabase.co".into(),
                api_key: "anon-key".into(),
            }
        );
        assert_eq!(backend.name(), "supabase");
    }

    #[test]
    fn test_static_backend() {
        let backend =
            IdentityBackend::resolve(None, None, Some(PathBuf::from("accounts.json"))).unwrap();
        assert_eq!(backend.name(), "static");
    }

    #[test]
    fn test_backend_must_be_unambiguous() {
        assert!(IdentityBackend::resolve(None, None, None).is_err());
        assert!(IdentityBackend::resolve(Some("https://x".into()), None, None).is_err());
        assert!(IdentityBackend::resolve(Some("  ".into()), Some("k".into()), None).is_err());
        assert!(IdentityBackend::resolve(
            Some("https://x".into()),
            Some("k".into()),
            Some(PathBuf::from("accounts.json"))
        )
        .is_err());
    }

    #[test]
    fn test_offset_from_minutes() {
        assert_eq!(offset_from_minutes(0).unwrap().local_minus_utc(), 0);
        assert_eq!(offset_from_minutes(360).unwrap().local_minus_utc(), 6 * 3600);
        assert_eq!(offset_from_minutes(-300).unwrap().local_minus_utc(), -5 * 3600);
        assert!(offset_from_minutes(24 * 60).is_err());
    }
}
