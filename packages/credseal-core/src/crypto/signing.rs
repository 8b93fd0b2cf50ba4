//! # Digital Signatures Module
//!
//! RSA-PSS signatures proving an envelope came from the registered client.
//!
//! ## Signature Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SIGNING FLOW                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  CLIENT                                                                │
//! │  ┌──────────────┐                                                      │
//! │  │  Ciphertext  │                                                      │
//! │  └──────┬───────┘                                                      │
//! │         ▼                                                              │
//! │  ┌──────────────────────────────────────────┐                          │
//! │  │  1. SHA-256(message)                     │                          │
//! │  │  2. EMSA-PSS encode, MGF1(SHA-256),      │                          │
//! │  │     random salt of maximum length        │                          │
//! │  │  3. RSA private-key operation            │                          │
//! │  └──────────────┬───────────────────────────┘                          │
//! │                 ▼                                                      │
//! │  Signature (key size: 256 bytes for RSA-2048)                          │
//! │  Probabilistic: signing twice gives two different, valid signatures    │
//! │                                                                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                       VERIFICATION FLOW                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SERVER                                                                │
//! │  Message + Signature + Client Public Key                               │
//! │         │                                                              │
//! │         ├── wrong length ─────────► InvalidSignature                   │
//! │         ▼                                                              │
//! │  PSS verify (same salt length)                                         │
//! │         ├── mismatch ─────────────► VerificationFailed                 │
//! │         ▼                                                              │
//! │  ✓ Valid                                                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Salt Length
//!
//! The salt is as long as the encoding allows: `emLen - hLen - 2`, where
//! `emLen = ceil((modBits - 1) / 8)`. For RSA-2048 that is 222 bytes. Both
//! ends must agree on it, since PSS verification checks the exact length.

use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pss};
use sha2::{Digest, Sha256};

use crate::crypto::{PrivateKey, PublicKey};
use crate::error::{Error, Result};

/// Maximum PSS salt length for a modulus `n` with SHA-256
fn max_salt_len(n: &BigUint) -> usize {
    let em_bits = n.bits().saturating_sub(1);
    let em_len = (em_bits + 7) / 8;
    em_len.saturating_sub(<Sha256 as Digest>::output_size() + 2)
}

/// Sign `message` with our own private key
///
/// ## Example
///
/// ```ignore
/// let signature = sign(&ciphertext, &client_private)?;
/// ```
pub fn sign(message: &[u8], own: &PrivateKey) -> Result<Vec<u8>> {
    let rsa = own.as_rsa();
    let digest = Sha256::digest(message);
    let scheme = Pss::new_with_salt::<Sha256>(max_salt_len(rsa.n()));

    rsa.sign_with_rng(&mut OsRng, scheme, &digest)
        .map_err(|e| Error::SigningFailed(e.to_string()))
}

/// Verify an RSA-PSS signature over `message`
///
/// ## Returns
///
/// `Ok(())` if valid, `Err(VerificationFailed)` if the signature does not
/// match, `Err(InvalidSignature)` if the bytes cannot be a signature for this
/// key at all.
pub fn verify(message: &[u8], signature: &[u8], signer: &PublicKey) -> Result<()> {
    if signature.len() != signer.size() {
        return Err(Error::InvalidSignature);
    }

    let rsa = signer.as_rsa();
    let digest = Sha256::digest(message);
    let scheme = Pss::new_with_salt::<Sha256>(max_salt_len(rsa.n()));

    rsa.verify(scheme, &digest, signature)
        .map_err(|_| Error::VerificationFailed)
}

// ============================================================================
// TESTS
// ============================================================================
