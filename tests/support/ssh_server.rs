// ABOUTME: In-process SSH server for integration tests, built on russh's server side.
// ABOUTME: Serves scripted exec output and records PTY, resize, and signal requests.

use parking_lot::Mutex;
use russh::keys::{PrivateKey, PublicKey, decode_secret_key};
use russh::server::{self, Auth, Msg, Session};
use russh::{Channel, ChannelId, Pty, Sig};
use sshpin::ssh::SessionConfig;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const HOST_KEY_A: &str = include_str!("../fixtures/host_key_a");
pub const HOST_KEY_B: &str = include_str!("../fixtures/host_key_b");
pub const HOST_KEY_A_PUB: &str = include_str!("../fixtures/host_key_a.pub");
pub const HOST_KEY_B_PUB: &str = include_str!("../fixtures/host_key_b.pub");
pub const CLIENT_KEY: &str = include_str!("../fixtures/client_key");
pub const CLIENT_KEY_PUB: &str = include_str!("../fixtures/client_key.pub");
pub const STRANGER_KEY: &str = include_str!("../fixtures/stranger_key");

/// Fingerprints of the fixture host keys.
pub const HOST_KEY_A_FINGERPRINT: &str = "avVKCEDXp+gJEtx+8yY6EJOjPJF5LyewsPVS/nA/Aww=";
pub const HOST_KEY_B_FINGERPRINT: &str = "1a1UOGwbS3FLtCXB2vr92hYfA/43tnCNSgp3W5floTM=";

/// Output of `uptime` on the test server.
pub const UPTIME_OUTPUT: &[u8] = b" 12:00:00 up 3 days,  2:14,  1 user,  load average: 0.00, 0.01, 0.05\n";

/// Exec command that makes the server close the channel with no exit status.
pub const HANG_UP: &str = "hang-up";
/// Exec command that makes the server drop the whole connection.
pub const DROP_CONNECTION: &str = "drop-connection";
/// Shell resize to this width closes the channel with no exit status.
pub const HANG_UP_COLS: u32 = 1;

/// Greeting written when a shell starts.
pub const SHELL_GREETING: &[u8] = b"ready\r\n";

/// Requests the server saw, in arrival order.
#[derive(Debug, Default)]
pub struct Observed {
    pub commands: Vec<String>,
    /// `(term, cols, rows)` of each PTY request.
    pub ptys: Vec<(String, u32, u32)>,
    /// `(cols, rows)` of each window change.
    pub resizes: Vec<(u32, u32)>,
    pub signals: Vec<String>,
    pub shells: usize,
}

/// An SSH server on 127.0.0.1 with a random port.
///
/// Accepts public key auth for the `client_key` fixture only.
pub struct TestServer {
    pub addr: SocketAddr,
    pub observed: Arc<Mutex<Observed>>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Start a server presenting `host_key` (OpenSSH private key text).
    pub async fn start(host_key: &str) -> Self {
        let host_key = decode_secret_key(host_key, None).expect("fixture host key should decode");
        let authorized =
            PublicKey::from_openssh(CLIENT_KEY_PUB).expect("fixture client key should parse");

        let config = Arc::new(server::Config {
            keys: vec![host_key],
            auth_rejection_time: Duration::from_millis(10),
            auth_rejection_time_initial: Some(Duration::from_millis(0)),
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind test listener");
        let addr = listener.local_addr().expect("listener should have an address");
        let observed = Arc::new(Mutex::new(Observed::default()));

        let shared = Arc::clone(&observed);
        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let handler = ServerHandler {
                    authorized: authorized.clone(),
                    observed: Arc::clone(&shared),
                    channels: HashMap::new(),
                };
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    match server::run_stream(config, socket, handler).await {
                        Ok(session) => {
                            let _ = session.await;
                        }
                        Err(e) => tracing::debug!("test server session setup failed: {}", e),
                    }
                });
            }
        });

        Self {
            addr,
            observed,
            task,
        }
    }

    /// Session configuration pointing at this server.
    pub fn session_config(&self, user: &str) -> SessionConfig {
        SessionConfig::new("127.0.0.1", user).port(self.addr.port())
    }

    /// Trust store key for this server.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.addr.port())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Decode a fixture private key for use as a client identity.
pub fn private_key(text: &str) -> PrivateKey {
    decode_secret_key(text, None).expect("fixture key should decode")
}

/// Scripted results: `(stdout, stderr, exit status)`.
fn script(command: &str) -> (Vec<u8>, Vec<u8>, u32) {
    match command {
        "uptime" => (UPTIME_OUTPUT.to_vec(), Vec::new(), 0),
        "false" => (Vec::new(), Vec::new(), 1),
        "missing-command" => (
            Vec::new(),
            b"sh: missing-command: command not found\n".to_vec(),
            127,
        ),
        other => match other.strip_prefix("exit ") {
            Some(code) => (Vec::new(), Vec::new(), code.parse().unwrap_or(2)),
            None => (format!("{}\n", other).into_bytes(), Vec::new(), 0),
        },
    }
}

struct ServerHandler {
    authorized: PublicKey,
    observed: Arc<Mutex<Observed>>,
    channels: HashMap<ChannelId, Channel<Msg>>,
}

impl ServerHandler {
    fn check(&self, key: &PublicKey) -> Auth {
        if key.key_data() == self.authorized.key_data() {
            Auth::Accept
        } else {
            Auth::reject()
        }
    }

    /// Report `status`, then end and close the channel.
    fn finish(channel: ChannelId, status: u32, session: &mut Session) {
        let _ = session.exit_status_request(channel, status);
        let _ = session.eof(channel);
        let _ = session.close(channel);
    }
}

impl server::Handler for ServerHandler {
    type Error = russh::Error;

    async fn auth_publickey_offered(
        &mut self,
        _user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        Ok(self.check(public_key))
    }

    async fn auth_publickey(
        &mut self,
        _user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        Ok(self.check(public_key))
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        self.channels.insert(channel.id(), channel);
        Ok(true)
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let command = String::from_utf8_lossy(data).into_owned();
        self.observed.lock().commands.push(command.clone());

        let _ = session.channel_success(channel);
        match command.as_str() {
            HANG_UP => {
                let _ = session.data(channel, b"partial output\n".to_vec().into());
                let _ = session.close(channel);
                return Ok(());
            }
            DROP_CONNECTION => return Err(russh::Error::Disconnect),
            _ => {}
        }
        let (stdout, stderr, status) = script(&command);
        if !stdout.is_empty() {
            let _ = session.data(channel, stdout.into());
        }
        if !stderr.is_empty() {
            let _ = session.extended_data(channel, 1, stderr.into());
        }
        Self::finish(channel, status, session);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.observed
            .lock()
            .ptys
            .push((term.to_string(), col_width, row_height));
        let _ = session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.observed.lock().shells += 1;
        let _ = session.channel_success(channel);
        let _ = session.data(channel, SHELL_GREETING.to_vec().into());
        Ok(())
    }

    /// The scripted shell exits 0 on the first resize, or hangs up without a
    /// status when resized to [`HANG_UP_COLS`] columns.
    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.observed.lock().resizes.push((col_width, row_height));
        if col_width == HANG_UP_COLS {
            let _ = session.close(channel);
        } else {
            Self::finish(channel, 0, session);
        }
        Ok(())
    }

    /// The scripted shell dies like bash on SIGINT: status 128 + 2.
    async fn signal(
        &mut self,
        channel: ChannelId,
        signal: Sig,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.observed.lock().signals.push(format!("{:?}", signal));
        Self::finish(channel, 130, session);
        Ok(())
    }
}
