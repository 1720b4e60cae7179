// ABOUTME: The session's single channel: remote command execution or interactive shell.
// ABOUTME: Pumps bytes between local streams and the channel and forwards resize/interrupt.

use super::client::Session;
use super::error::{Error, Result};
use super::state::Authenticated;
use russh::client::Msg;
use russh::{Channel, ChannelMsg, Pty, Sig};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Terminal size used when the local one cannot be determined.
pub const DEFAULT_COLS: u32 = 80;
pub const DEFAULT_ROWS: u32 = 24;

const DEFAULT_TERM: &str = "xterm";
const TERMINAL_SPEED: u32 = 14400;
const BUFFER_SIZE: usize = 8192;

/// Pseudo-terminal parameters for an interactive shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyRequest {
    pub term: String,
    pub cols: u32,
    pub rows: u32,
}

impl PtyRequest {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self {
            term: DEFAULT_TERM.to_string(),
            cols,
            rows,
        }
    }

    /// Use the measured size when there is one, else 80x24.
    pub fn from_size(size: Option<(u32, u32)>) -> Self {
        match size {
            Some((cols, rows)) if cols > 0 && rows > 0 => Self::new(cols, rows),
            _ => Self::default(),
        }
    }
}

impl Default for PtyRequest {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS)
    }
}

/// Out-of-band requests for an open shell channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMsg {
    /// Local terminal now has this size.
    Resize { cols: u32, rows: u32 },
    /// Local interrupt, delivered to the remote process as SIGINT.
    Interrupt,
}

/// How the remote command or shell ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteExit {
    Status(u32),
    Signal {
        signal: String,
        core_dumped: bool,
        message: String,
    },
}

impl RemoteExit {
    pub fn success(&self) -> bool {
        matches!(self, RemoteExit::Status(0))
    }

    /// Exit code for the local process. Statuses above 255 and deaths by
    /// signal map to 255.
    pub fn code(&self) -> u8 {
        match self {
            RemoteExit::Status(status) => u8::try_from(*status).unwrap_or(u8::MAX),
            RemoteExit::Signal { .. } => u8::MAX,
        }
    }
}

impl Session<Authenticated> {
    /// Run `command` remotely, copying its stdout and stderr to the given
    /// writers byte for byte. The channel and connection are closed before
    /// this returns.
    pub async fn exec<O, E>(self, command: &str, mut stdout: O, mut stderr: E) -> Result<RemoteExit>
    where
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        let mut channel = self.open_channel().await?;
        let result = run_exec(&mut channel, command, &mut stdout, &mut stderr).await;
        self.close(channel).await;
        result
    }

    /// Start an interactive shell on a pseudo-terminal.
    ///
    /// `stdin` is forwarded until it ends; `control` carries resize and
    /// interrupt requests while the shell runs. The channel and connection are
    /// closed before this returns.
    pub async fn shell<I, O, E>(
        self,
        pty: &PtyRequest,
        stdin: I,
        mut stdout: O,
        mut stderr: E,
        control: Option<mpsc::Receiver<ControlMsg>>,
    ) -> Result<RemoteExit>
    where
        I: AsyncRead + Unpin,
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        let mut channel = self.open_channel().await?;
        let result =
            run_shell(&mut channel, pty, stdin, &mut stdout, &mut stderr, control).await;
        self.close(channel).await;
        result
    }

    async fn open_channel(&self) -> Result<Channel<Msg>> {
        self.handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Channel(format!("failed to open channel: {}", e)))
    }

    async fn close(self, channel: Channel<Msg>) {
        if let Err(e) = channel.close().await {
            tracing::debug!("channel close: {}", e);
        }
        self.disconnect().await;
    }
}

async fn run_exec<O, E>(
    channel: &mut Channel<Msg>,
    command: &str,
    stdout: &mut O,
    stderr: &mut E,
) -> Result<RemoteExit>
where
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    channel
        .exec(true, command)
        .await
        .map_err(|e| Error::Channel(format!("failed to exec command: {}", e)))?;
    // Nothing is forwarded to the command's stdin.
    channel.eof().await.map_err(send_failed)?;

    pump(channel, None::<tokio::io::Empty>, stdout, stderr, None).await
}

async fn run_shell<I, O, E>(
    channel: &mut Channel<Msg>,
    pty: &PtyRequest,
    stdin: I,
    stdout: &mut O,
    stderr: &mut E,
    control: Option<mpsc::Receiver<ControlMsg>>,
) -> Result<RemoteExit>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let modes = [
        (Pty::ECHO, 1),
        (Pty::TTY_OP_ISPEED, TERMINAL_SPEED),
        (Pty::TTY_OP_OSPEED, TERMINAL_SPEED),
    ];
    channel
        .request_pty(false, &pty.term, pty.cols, pty.rows, 0, 0, &modes)
        .await
        .map_err(|e| Error::Channel(format!("PTY request failed: {}", e)))?;
    tracing::debug!(cols = pty.cols, rows = pty.rows, "PTY requested");

    channel
        .request_shell(true)
        .await
        .map_err(|e| Error::Channel(format!("failed to start shell: {}", e)))?;

    pump(channel, Some(stdin), stdout, stderr, control).await
}

/// Move bytes until the remote side is done.
///
/// Ends on exit status plus EOF, on channel close, or when the channel goes
/// away. Returns `ChannelClosed` if no exit status was ever received.
async fn pump<I, O, E>(
    channel: &mut Channel<Msg>,
    mut stdin: Option<I>,
    stdout: &mut O,
    stderr: &mut E,
    mut control: Option<mpsc::Receiver<ControlMsg>>,
) -> Result<RemoteExit>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut exit: Option<RemoteExit> = None;
    let mut got_eof = false;

    loop {
        tokio::select! {
            // Local input
            read = read_input(&mut stdin, &mut buf) => {
                match read {
                    Ok(0) => {
                        stdin = None;
                        channel.eof().await.map_err(send_failed)?;
                    }
                    Ok(n) => channel.data(&buf[..n]).await.map_err(send_failed)?,
                    Err(e) => {
                        return Err(Error::Channel(format!("failed to read local input: {}", e)));
                    }
                }
            }

            // Resize and interrupt requests
            msg = next_control(&mut control) => {
                match msg {
                    Some(ControlMsg::Resize { cols, rows }) => {
                        if let Err(e) = channel.window_change(cols, rows, 0, 0).await {
                            tracing::debug!("window change request failed: {}", e);
                        }
                    }
                    Some(ControlMsg::Interrupt) => {
                        if let Err(e) = channel.signal(Sig::INT).await {
                            tracing::debug!("interrupt forwarding failed: {}", e);
                        }
                    }
                    None => control = None,
                }
            }

            // Remote output and lifecycle
            msg = channel.wait() => {
                match msg {
                    Some(ChannelMsg::Data { ref data }) => write_local(stdout, data).await?,
                    Some(ChannelMsg::ExtendedData { ref data, ext }) => {
                        // stderr
                        if ext == 1 {
                            write_local(stderr, data).await?;
                        }
                    }
                    Some(ChannelMsg::ExitStatus { exit_status }) => {
                        tracing::debug!(exit_status, "remote process exited");
                        exit = Some(RemoteExit::Status(exit_status));
                        if got_eof {
                            break;
                        }
                    }
                    Some(ChannelMsg::ExitSignal { signal_name, core_dumped, error_message, .. }) => {
                        tracing::debug!(signal = ?signal_name, "remote process killed by signal");
                        exit = Some(RemoteExit::Signal {
                            signal: format!("{:?}", signal_name),
                            core_dumped,
                            message: error_message,
                        });
                        if got_eof {
                            break;
                        }
                    }
                    Some(ChannelMsg::Eof) => {
                        got_eof = true;
                        if exit.is_some() {
                            break;
                        }
                    }
                    Some(ChannelMsg::Failure) => {
                        return Err(Error::Channel("remote rejected the channel request".to_string()));
                    }
                    Some(ChannelMsg::Close) => break,
                    Some(_) => {}
                    None => break,
                }
            }
        }
    }

    exit.ok_or(Error::ChannelClosed)
}

async fn read_input<I: AsyncRead + Unpin>(
    input: &mut Option<I>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match input {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}

async fn next_control(control: &mut Option<mpsc::Receiver<ControlMsg>>) -> Option<ControlMsg> {
    match control {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn write_local<W: AsyncWrite + Unpin>(out: &mut W, data: &[u8]) -> Result<()> {
    out.write_all(data).await.map_err(local_closed)?;
    out.flush().await.map_err(local_closed)
}

fn send_failed(e: russh::Error) -> Error {
    Error::Channel(format!("failed to send to channel: {}", e))
}

fn local_closed(e: std::io::Error) -> Error {
    Error::Channel(format!("local output closed: {}", e))
}
