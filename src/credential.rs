// ABOUTME: Credential resolution from raw private key bytes.
// ABOUTME: Decodes (optionally encrypted) keys and scrubs key and passphrase buffers.

use russh::keys::{PrivateKey, PublicKey, decode_secret_key};
use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("failed to read passphrase: {0}")]
    Passphrase(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A signing credential derived from private key material.
///
/// The wrapped key zeroizes its secret material on drop.
#[derive(Clone)]
pub struct Identity {
    key: Arc<PrivateKey>,
}

impl Identity {
    fn new(key: PrivateKey) -> Self {
        Self { key: Arc::new(key) }
    }

    /// Public half of the identity, as offered to the server.
    pub fn public_key(&self) -> &PublicKey {
        self.key.public_key()
    }

    pub(crate) fn private_key(&self) -> Arc<PrivateKey> {
        Arc::clone(&self.key)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("algorithm", &self.key.algorithm())
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Source of passphrases for encrypted keys.
pub trait PassphrasePrompt {
    fn passphrase(&self) -> io::Result<Zeroizing<Vec<u8>>>;
}

/// Reads the passphrase from the controlling terminal with echo disabled.
///
/// There is no fallback to stdin: without a terminal the prompt fails.
pub struct TerminalPrompt;

impl PassphrasePrompt for TerminalPrompt {
    fn passphrase(&self) -> io::Result<Zeroizing<Vec<u8>>> {
        let pass = rpassword::prompt_password("Enter passphrase for encrypted private key: ")?;
        Ok(Zeroizing::new(pass.into_bytes()))
    }
}

/// Zeroes the borrowed buffer when dropped.
struct Scrubbed<'a>(&'a mut [u8]);

impl Deref for Scrubbed<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.0
    }
}

impl DerefMut for Scrubbed<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.0
    }
}

impl Drop for Scrubbed<'_> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

enum Decoded {
    Key(PrivateKey),
    Encrypted,
}

fn decode(key: &[u8], passphrase: Option<&str>) -> Result<Decoded> {
    let pem = std::str::from_utf8(key)
        .map_err(|_| Error::InvalidKey("key is not valid UTF-8 text".to_string()))?;

    match decode_secret_key(pem, passphrase) {
        Ok(key) => Ok(Decoded::Key(key)),
        Err(russh::keys::Error::KeyIsEncrypted) => Ok(Decoded::Encrypted),
        Err(e) => Err(Error::InvalidKey(e.to_string())),
    }
}

/// Resolve raw key bytes into an [`Identity`].
///
/// Encrypted keys trigger exactly one passphrase request. `key` is zeroed
/// before this returns, whatever the outcome.
pub fn resolve(key: &mut [u8], prompt: &dyn PassphrasePrompt) -> Result<Identity> {
    let mut key = Scrubbed(key);

    match decode(&key, None)? {
        Decoded::Key(decoded) => Ok(Identity::new(decoded)),
        Decoded::Encrypted => {
            tracing::debug!("private key is encrypted, requesting passphrase");
            let mut passphrase = prompt.passphrase().map_err(Error::Passphrase)?;
            decode_with_passphrase(&mut key, &mut passphrase)
        }
    }
}

/// Decode an encrypted key with the given passphrase.
///
/// Both buffers are zeroed before this returns, whatever the outcome.
pub fn decode_with_passphrase(key: &mut [u8], passphrase: &mut [u8]) -> Result<Identity> {
    let key = Scrubbed(key);
    let passphrase = Scrubbed(passphrase);

    let pass = std::str::from_utf8(&passphrase)
        .map_err(|_| Error::InvalidKey("passphrase is not valid UTF-8".to_string()))?;

    match decode(&key, Some(pass))? {
        Decoded::Key(decoded) => Ok(Identity::new(decoded)),
        Decoded::Encrypted => Err(Error::InvalidKey(
            "key could not be decrypted with the given passphrase".to_string(),
        )),
    }
}
