// ABOUTME: Stable fingerprints for server public keys.
// ABOUTME: Base64 (standard, padded) SHA-256 of the key's SSH wire encoding.

use super::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use russh::keys::PublicKey;
use sha2::{Digest, Sha256};

/// Fingerprint of a server public key.
///
/// This is the same digest OpenSSH shows as `SHA256:...`, but rendered with
/// padded standard base64 so stored values are reproducible with
/// `base64 -d | sha256sum` style tooling.
pub fn fingerprint(key: &PublicKey) -> Result<String> {
    let wire = key.to_bytes()?;
    Ok(STANDARD.encode(Sha256::digest(&wire)))
}
