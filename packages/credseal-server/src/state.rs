//! Shared application state.
//!
//! Everything here is built once at startup and read-only afterwards, so
//! handlers share it through `Arc` without locks.

use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use credseal_core::{PublicKeyDirectory, SecureLoginHandshake};

/// State handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub handshake: Arc<SecureLoginHandshake>,
    pub public_keys: Arc<PublicKeyDirectory>,
    /// Offset for the `real_time` field of responses.
    pub local_offset: FixedOffset,
}

impl AppState {
    pub fn new(
        handshake: SecureLoginHandshake,
        public_keys: PublicKeyDirectory,
        local_offset: FixedOffset,
    ) -> Self {
        Self {
            handshake: Arc::new(handshake),
            public_keys: Arc::new(public_keys),
            local_offset,
        }
    }

    /// State with `real_time` rendered in UTC.
    pub fn with_utc(handshake: SecureLoginHandshake, public_keys: PublicKeyDirectory) -> Self {
        Self::new(handshake, public_keys, Utc.fix())
    }
}
