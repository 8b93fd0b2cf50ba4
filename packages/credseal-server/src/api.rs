//! HTTP routes.
//!
//! ```text
//! GET  /, /home              service banner
//! GET  /health               liveness
//! POST /auth/secure/login    {"payload", "signature"} ──► handshake
//! GET  /keys/{principal}     public key PEM (server | client)
//! ```
//!
//! Handlers are thin: the handshake produces a [`LoginOutcome`] and this
//! module only maps it onto a status code and the uniform response shape.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use credseal_core::{FailureKind, LoginOutcome, Principal};
use serde_json::json;

use crate::response;
use crate::state::AppState;

/// Content type of served public keys.
pub const PEM_CONTENT_TYPE: &str = "application/x-pem-file";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/home", get(home_handler))
        .route("/health", get(health_handler))
        .route("/auth/secure/login", post(secure_login_handler))
        .route("/keys/:principal", get(public_key_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// HTTP status for a failed login.
pub fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::MalformedEnvelope
        | FailureKind::Encoding
        | FailureKind::SignatureVerification
        | FailureKind::Decryption
        | FailureKind::InvalidCredentialShape => StatusCode::BAD_REQUEST,
        FailureKind::AuthenticationFailed => StatusCode::UNAUTHORIZED,
        FailureKind::IdentityUnavailable => StatusCode::BAD_GATEWAY,
    }
}

// ── Route Handlers ────────────────────────────────────────────────────────────

/// Service banner.
async fn home_handler(State(state): State<AppState>) -> Response {
    response::success(
        StatusCode::OK,
        "The credseal API is running.",
        json!({
            "service": "credseal-server",
            "endpoints": {
                "login": "POST /auth/secure/login",
                "server_key": "GET /keys/server",
                "client_key": "GET /keys/client",
            },
            "wire_encoding": state.handshake.encoding().to_string(),
        }),
        state.local_offset,
    )
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "credseal-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Secure login: verify, decrypt, delegate.
///
/// The body is taken as raw bytes so that malformed JSON is reported in the
/// uniform error shape rather than by the extractor.
async fn secure_login_handler(State(state): State<AppState>, body: Bytes) -> Response {
    match state.handshake.login(&body).await {
        LoginOutcome::Success { user, session } => response::success(
            StatusCode::OK,
            "Login successful.",
            json!({
                "user": user,
                "auth": session,
            }),
            state.local_offset,
        ),
        LoginOutcome::Failure { kind, message } => {
            response::error(status_for(kind), &message, state.local_offset)
        }
    }
}

/// Public key distribution. Private keys have no route.
async fn public_key_handler(
    State(state): State<AppState>,
    Path(principal): Path<String>,
) -> Response {
    match principal.parse::<Principal>() {
        Ok(principal) => (
            [(header::CONTENT_TYPE, PEM_CONTENT_TYPE)],
            state.public_keys.get_public_key(principal).to_string(),
        )
            .into_response(),
        Err(_) => response::error(
            StatusCode::NOT_FOUND,
            &format!("No public key for '{}'.", principal),
            state.local_offset,
        ),
    }
}

async fn not_found_handler(State(state): State<AppState>) -> Response {
    response::error(StatusCode::NOT_FOUND, "Not found.", state.local_offset)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
