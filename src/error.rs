// ABOUTME: Application-wide error types for sshpin.
// ABOUTME: Wraps subsystem errors and maps every local failure to one exit code.

use thiserror::Error;

/// Exit code for failures on our side of the connection, as OpenSSH uses.
pub const LOCAL_FAILURE: u8 = 255;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Credential(#[from] crate::credential::Error),

    #[error(transparent)]
    Trust(#[from] crate::trust::Error),

    #[error(transparent)]
    Ssh(#[from] crate::ssh::Error),

    #[error("failed to read private key: {0}")]
    KeySource(#[source] std::io::Error),

    #[error("interactive session requires a terminal on stdin")]
    NotATerminal,

    #[error("cannot determine home directory for the fingerprint store; use --known-hosts")]
    NoHomeDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn exit_code(&self) -> u8 {
        LOCAL_FAILURE
    }
}

pub type Result<T> = std::result::Result<T, Error>;
