// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection, host key verification against the trust store, and key auth.

use super::error::{Error, Result};
use super::state::{Authenticated, Handshaken};
use crate::credential::Identity;
use crate::trust::{self, Verifier};
use parking_lot::Mutex;
use russh::Disconnect;
use russh::client::{self, Config, Handle};
use russh::keys::{PrivateKeyWithHashAlg, ssh_key};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Limit on establishing the TCP connection. Trust prompts are not
    /// covered, so a user deciding slowly never trips it.
    pub connect_timeout: Option<Duration>,
    /// Interval between keepalive requests once connected.
    pub keepalive_interval: Option<Duration>,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            connect_timeout: None,
            keepalive_interval: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = Some(interval);
        self
    }

    /// `host:port`, the key under which the host's fingerprint is pinned.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// SSH client handler for russh.
pub(crate) struct ClientHandler {
    address: String,
    verifier: Verifier,
    /// Why the host key was refused, if it was.
    rejection: Arc<Mutex<Option<trust::Error>>>,
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let verifier = self.verifier.clone();
        let address = self.address.clone();
        let key = server_public_key.clone();

        // The decider may wait on the user; keep it off the runtime threads
        // while the handshake waits for the answer.
        let outcome =
            tokio::task::spawn_blocking(move || verifier.verify(&address, &key)).await;

        let rejection = match outcome {
            Ok(Ok(verdict)) => {
                tracing::debug!(?verdict, "host key for {} accepted", self.address);
                return Ok(true);
            }
            Ok(Err(e)) => e,
            Err(e) => trust::Error::Prompt(std::io::Error::other(e.to_string())),
        };

        tracing::warn!("host key for {} rejected: {}", self.address, rejection);
        *self.rejection.lock() = Some(rejection);
        Ok(false)
    }
}

/// An SSH session in state `S`.
pub struct Session<S> {
    pub(super) config: SessionConfig,
    pub(super) handle: Handle<ClientHandler>,
    _state: PhantomData<S>,
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl<S> Session<S> {
    /// Disconnect, logging rather than failing if the peer is already gone.
    pub(super) async fn disconnect(self) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            tracing::warn!("SSH disconnect from {} failed: {}", self.config.address(), e);
        }
    }
}

impl Session<Handshaken> {
    /// Connect to the remote host and complete the key exchange.
    ///
    /// The server's host key is checked with `verifier` before the handshake
    /// is allowed to finish. Flushing the verifier is left to the caller so
    /// that it happens whatever this returns.
    pub async fn connect(config: SessionConfig, verifier: &Verifier) -> Result<Self> {
        let address = config.address();
        let stream = Self::open_stream(&config).await?;
        tracing::debug!("TCP connection to {} established", address);

        let russh_config = Config {
            inactivity_timeout: None,
            keepalive_interval: config.keepalive_interval,
            ..Default::default()
        };

        let rejection = Arc::new(Mutex::new(None));
        let handler = ClientHandler {
            address: address.clone(),
            verifier: verifier.clone(),
            rejection: Arc::clone(&rejection),
        };

        let handle = match client::connect_stream(Arc::new(russh_config), stream, handler).await
        {
            Ok(handle) => handle,
            Err(e) => {
                if let Some(refused) = rejection.lock().take() {
                    return Err(Error::Trust(refused));
                }
                return Err(Error::Connection {
                    address,
                    reason: e.to_string(),
                });
            }
        };

        Ok(Self {
            config,
            handle,
            _state: PhantomData,
        })
    }

    async fn open_stream(config: &SessionConfig) -> Result<TcpStream> {
        let address = config.address();
        let connect = TcpStream::connect((config.host.as_str(), config.port));

        let stream = match config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
                Error::Connection {
                    address: address.clone(),
                    reason: format!("timed out after {:?}", limit),
                }
            })?,
            None => connect.await,
        };

        stream.map_err(|e| Error::Connection {
            address,
            reason: e.to_string(),
        })
    }

    /// Authenticate with the identity's private key.
    pub async fn authenticate(mut self, identity: &Identity) -> Result<Session<Authenticated>> {
        let hash_alg = self
            .handle
            .best_supported_rsa_hash()
            .await
            .map_err(Error::Protocol)?
            .flatten();

        let result = self
            .handle
            .authenticate_publickey(
                &self.config.user,
                PrivateKeyWithHashAlg::new(identity.private_key(), hash_alg),
            )
            .await
            .map_err(Error::Protocol)?;

        if !result.success() {
            let user = self.config.user.clone();
            self.disconnect().await;
            return Err(Error::AuthenticationFailed { user });
        }

        tracing::debug!("authenticated to {} as {}", self.config.address(), self.config.user);

        Ok(Session {
            config: self.config,
            handle: self.handle,
            _state: PhantomData,
        })
    }
}
