//! Supabase identity provider.
//!
//! Password sign-in against a hosted GoTrue endpoint:
//!
//! ```text
//! POST {url}/auth/v1/token?grant_type=password
//! apikey: {key}
//! {"email": "...", "password": "..."}
//! ```
//!
//! 400/401 mean the credentials were rejected. Any other status, a transport
//! error, or a body we cannot read means the provider is unavailable.

use std::time::Duration;

use async_trait::async_trait;
use credseal_core::identity::{IdentitySession, IdentityUser};
use credseal_core::{Error, IdentityProvider, Result, SignIn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Token response from the password grant.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    email: String,
    #[serde(default)]
    user_metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl TokenResponse {
    fn into_sign_in(self, now: i64) -> SignIn {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now + secs))
            .unwrap_or(now);

        SignIn {
            user: IdentityUser {
                email: self.user.email,
                metadata: self.user.user_metadata.unwrap_or_default(),
            },
            session: IdentitySession {
                access_token: self.access_token,
                expires_at,
            },
        }
    }
}

/// Identity provider backed by Supabase auth.
#[derive(Debug, Clone)]
pub struct SupabaseIdentityProvider {
    client: Client,
    url: String,
    api_key: String,
}

impl SupabaseIdentityProvider {
    /// Create a provider whose requests give up after `timeout`.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::IdentityUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    fn token_url(&self) -> String {
        format!("{}/auth/v1/token?grant_type=password", self.url)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SignIn> {
        let response = self
            .client
            .post(self.token_url())
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Supabase request failed: {}", e);
                Error::IdentityUnavailable(e.to_string())
            })?;

        match response.status() {
            status if status.is_success() => {
                let token: TokenResponse = response.json().await.map_err(|e| {
                    tracing::error!("Failed to parse Supabase token response: {}", e);
                    Error::IdentityUnavailable(e.to_string())
                })?;
                Ok(token.into_sign_in(chrono::Utc::now().timestamp()))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(Error::AuthenticationFailed),
            status => {
                tracing::error!("Supabase sign-in failed: {}", status);
                Err(Error::IdentityUnavailable(format!("status {}", status)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::HeaderMap, routing::post, Json, Router};
    use std::collections::HashMap;

    /// Minimal GoTrue stand-in: a@b.com / pw123 succeeds, "boom" returns 500.
    async fn fake_token(
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<serde_json::Value>,
    ) -> axum::response::Response {
        use axum::response::IntoResponse;

        if headers.get("apikey").map(|v| v.as_bytes()) != Some(b"anon-key".as_slice())
            || query.get("grant_type").map(String::as_str) != Some("password")
        {
            return (axum::http::StatusCode::FORBIDDEN, "bad request shape").into_response();
        }

        match (body["email"].as_str(), body["password"].as_str()) {
            (Some("a@b.com"), Some("pw123")) => Json(json!({
                "access_token": "jwt-token",
                "token_type": "bearer",
                "expires_in": 3600,
                "expires_at": 1_900_000_000i64,
                "refresh_token": "r",
                "user": { "email": "a@b.com", "user_metadata": { "name": "Alice" } }
            }))
            .into_response(),
            (_, Some("boom")) => {
                (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response()
            }
            (_, Some("garbled")) => "not json".into_response(),
            _ => (
                axum::http::StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_grant" })),
            )
                .into_response(),
        }
    }

    async fn spawn_fake() -> String {
        let app = Router::new().route("/auth/v1/token", post(fake_token));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn provider(url: String) -> SupabaseIdentityProvider {
        SupabaseIdentityProvider::new(url, "anon-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_success() {
        let provider = provider(spawn_fake().await);
        let sign_in = provider.sign_in_with_password("a@b.com", "pw123").await.unwrap();

        assert_eq!(sign_in.user.email, "a@b.com");
        assert_eq!(sign_in.user.display_name(), Some("Alice"));
        assert_eq!(sign_in.session.access_token, "jwt-token");
        assert_eq!(sign_in.session.expires_at, 1_900_000_000);
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let provider = provider(spawn_fake().await);
        assert!(matches!(
            provider.sign_in_with_password("a@b.com", "nope").await,
            Err(Error::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let provider = provider(spawn_fake().await);
        assert!(matches!(
            provider.sign_in_with_password("a@b.com", "boom").await,
            Err(Error::IdentityUnavailable(_))
        ));
        assert!(matches!(
            provider.sign_in_with_password("a@b.com", "garbled").await,
            Err(Error::IdentityUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = provider(format!("http://{}", addr));
        assert!(matches!(
            provider.sign_in_with_password("a@b.com", "pw123").await,
            Err(Error::IdentityUnavailable(_))
        ));
    }

    #[test]
    fn test_expiry_falls_back_to_expires_in() {
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "t",
            "expires_in": 60,
            "user": { "email": "a@b.com" }
        }))
        .unwrap();

        let sign_in = token.into_sign_in(1_000);
        assert_eq!(sign_in.session.expires_at, 1_060);
        assert!(sign_in.user.metadata.is_empty());
    }
}
