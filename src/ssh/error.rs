// ABOUTME: SSH-specific error types.
// ABOUTME: Covers connection, host trust, authentication, and channel failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to connect to {address}: {reason}")]
    Connection { address: String, reason: String },

    #[error(transparent)]
    Trust(#[from] crate::trust::Error),

    #[error("authentication failed: server rejected the key for user {user}")]
    AuthenticationFailed { user: String },

    #[error("channel error: {0}")]
    Channel(String),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
