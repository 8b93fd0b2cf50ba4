//! # Cryptography Module
//!
//! This module provides the cryptographic primitives of the credential
//! envelope protocol.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                     ┌─────────────────┐           │
//! │  │  Server KeyPair │                     │  Client KeyPair │           │
//! │  │  (RSA >= 2048)  │                     │  (RSA >= 2048)  │           │
//! │  │                 │                     │                 │           │
//! │  │ • Decrypt       │◄── OAEP-SHA256 ─────│ • Encrypt to    │           │
//! │  │   credentials   │                     │   server public │           │
//! │  │ • Verify client │◄── PSS-SHA256 ──────│ • Sign the      │           │
//! │  │   signature     │                     │   ciphertext    │           │
//! │  └─────────────────┘                     └─────────────────┘           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Parameters |
//! |-----------|---------|------------|
//! | RSA-OAEP | Encryption | SHA-256 hash, MGF1-SHA-256, empty label |
//! | RSA-PSS | Signatures | SHA-256 hash, MGF1-SHA-256, maximum salt |
//! | PKCS#1 v1.5 | none | Not supported, in either role |
//!
//! All four operations are pure functions of their inputs: keys are passed
//! in, nothing is cached, and randomness comes from `OsRng` per call.

mod encryption;
mod keys;
mod signing;

pub use encryption::{decrypt, encrypt, max_plaintext_len};
pub use keys::{KeyPair, Principal, PrivateKey, PublicKey, MIN_KEY_BITS, PUBLIC_EXPONENT};
pub use signing::{sign, verify};

/// Ciphertext and signature length for a 2048-bit key, in bytes
pub const RSA_2048_BLOCK_SIZE: usize = 256;
