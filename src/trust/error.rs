// ABOUTME: Trust store error types.
// ABOUTME: Covers declined trust decisions, prompt failures, and store persistence.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("host {address} is not trusted: fingerprint was not accepted")]
    UntrustedHost { address: String },

    #[error(
        "host key for {address} has changed (expected {expected}, got {presented}) and the new key was rejected"
    )]
    FingerprintMismatch {
        address: String,
        expected: String,
        presented: String,
    },

    #[error("trust prompt failed: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("failed to encode server key: {0}")]
    Fingerprint(#[from] russh::keys::ssh_key::Error),

    #[error("failed to read fingerprint store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write fingerprint store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize fingerprint store: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
