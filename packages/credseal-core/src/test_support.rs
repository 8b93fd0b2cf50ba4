//! Fixed RSA-2048 fixtures shared by the unit tests.

use crate::crypto::{PrivateKey, PublicKey};

pub const SERVER_PRIVATE_PEM: &str = include_str!("../fixtures/server_private_key.pem");
pub const SERVER_PUBLIC_PEM: &str = include_str!("../fixtures/server_public_key.pem");
pub const CLIENT_PRIVATE_PEM: &str = include_str!("../fixtures/client_private_key.pem");
pub const CLIENT_PUBLIC_PEM: &str = include_str!("../fixtures/client_public_key.pem");
pub const ROGUE_PRIVATE_PEM: &str = include_str!("../fixtures/rogue_private_key.pem");

pub fn server_private() -> PrivateKey {
    PrivateKey::from_pkcs8_pem(SERVER_PRIVATE_PEM).unwrap()
}

pub fn server_public() -> PublicKey {
    PublicKey::from_pem(SERVER_PUBLIC_PEM).unwrap()
}

pub fn client_private() -> PrivateKey {
    PrivateKey::from_pkcs8_pem(CLIENT_PRIVATE_PEM).unwrap()
}

pub fn client_public() -> PublicKey {
    PublicKey::from_pem(CLIENT_PUBLIC_PEM).unwrap()
}

/// A second client key the server has never registered
pub fn rogue_private() -> PrivateKey {
    PrivateKey::from_pkcs8_pem(ROGUE_PRIVATE_PEM).unwrap()
}

/// Write the server/client fixture pair into `dir` with the keystore's file names
pub fn write_fixture_dir(dir: &std::path::Path) {
    std::fs::write(dir.join("server_private_key.pem"), SERVER_PRIVATE_PEM).unwrap();
    std::fs::write(dir.join("server_public_key.pem"), SERVER_PUBLIC_PEM).unwrap();
    std::fs::write(dir.join("client_private_key.pem"), CLIENT_PRIVATE_PEM).unwrap();
    std::fs::write(dir.join("client_public_key.pem"), CLIENT_PUBLIC_PEM).unwrap();
}
