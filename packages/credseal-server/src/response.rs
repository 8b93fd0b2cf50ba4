//! Uniform JSON response envelopes.
//!
//! ```text
//! success: { success: true,  code, message, server_time, real_time, data }
//! error:   { success: false, code, error,   server_time, real_time }
//! ```
//!
//! `server_time` is always UTC; `real_time` is the same instant at the
//! configured local offset.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use serde_json::Value;

const SERVER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";
const REAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC%:z";

#[derive(Debug, Serialize)]
struct SuccessBody<'a> {
    success: bool,
    code: u16,
    message: &'a str,
    server_time: String,
    real_time: String,
    data: Value,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    code: u16,
    error: &'a str,
    server_time: String,
    real_time: String,
}

/// Render the `(server_time, real_time)` pair for `now`.
pub fn timestamps(now: DateTime<Utc>, local_offset: FixedOffset) -> (String, String) {
    (
        now.format(SERVER_TIME_FORMAT).to_string(),
        now.with_timezone(&local_offset)
            .format(REAL_TIME_FORMAT)
            .to_string(),
    )
}

/// Standard success response.
pub fn success(status: StatusCode, message: &str, data: Value, local_offset: FixedOffset) -> Response {
    let (server_time, real_time) = timestamps(Utc::now(), local_offset);
    let body = SuccessBody {
        success: true,
        code: status.as_u16(),
        message,
        server_time,
        real_time,
        data,
    };
    (status, Json(body)).into_response()
}

/// Standard error response.
pub fn error(status: StatusCode, message: &str, local_offset: FixedOffset) -> Response {
    let (server_time, real_time) = timestamps(Utc::now(), local_offset);
    let body = ErrorBody {
        success: false,
        code: status.as_u16(),
        error: message,
        server_time,
        real_time,
    };
    (status, Json(body)).into_response()
}
