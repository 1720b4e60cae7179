// ABOUTME: Local terminal control for interactive sessions.
// ABOUTME: Raw mode RAII guard, window size queries, and resize/interrupt signal forwarding.

use crate::ssh::ControlMsg;
use std::io;
use std::os::unix::io::RawFd;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Current size of the terminal on `fd` as `(cols, rows)`.
///
/// Returns `None` if `fd` is not a terminal or reports a zero dimension.
pub fn window_size(fd: RawFd) -> Option<(u32, u32)> {
    // SAFETY: winsize is plain old data and TIOCGWINSZ only writes into it.
    let ws = unsafe {
        let mut ws = std::mem::zeroed::<libc::winsize>();
        if libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) != 0 {
            return None;
        }
        ws
    };

    if ws.ws_col == 0 || ws.ws_row == 0 {
        return None;
    }
    Some((u32::from(ws.ws_col), u32::from(ws.ws_row)))
}

/// Puts a terminal into raw mode and puts it back.
///
/// The saved settings are restored at most once: by an explicit
/// [`RawMode::restore`] or, failing that, on drop. Dropping covers early
/// returns, errors, and a remote end that disappears mid-session.
pub struct RawMode {
    fd: RawFd,
    original: libc::termios,
    active: bool,
}

impl RawMode {
    /// Save the current settings of `fd` and switch it to raw mode.
    pub fn enable(fd: RawFd) -> io::Result<Self> {
        // SAFETY: termios is plain old data filled in by tcgetattr before use.
        let original = unsafe {
            let mut term = std::mem::MaybeUninit::<libc::termios>::uninit();
            if libc::tcgetattr(fd, term.as_mut_ptr()) != 0 {
                return Err(io::Error::last_os_error());
            }
            term.assume_init()
        };

        let mut raw = original;
        // SAFETY: raw is a valid termios copied from the terminal.
        unsafe {
            libc::cfmakeraw(&mut raw);
            if libc::tcsetattr(fd, libc::TCSANOW, &raw) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        tracing::debug!(fd, "terminal switched to raw mode");
        Ok(Self {
            fd,
            original,
            active: true,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Restore the saved settings. Returns `false` if they were already
    /// restored.
    pub fn restore(&mut self) -> io::Result<bool> {
        if !self.active {
            return Ok(false);
        }
        self.active = false;

        // SAFETY: original was obtained from tcgetattr on this fd.
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &self.original) } != 0 {
            return Err(io::Error::last_os_error());
        }
        tracing::debug!(fd = self.fd, "terminal mode restored");
        Ok(true)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!("failed to restore terminal mode: {}", e);
        }
    }
}

/// Forward terminal resizes and interrupts as channel control messages.
///
/// SIGWINCH becomes [`ControlMsg::Resize`] with the size of `fd`; SIGINT
/// becomes [`ControlMsg::Interrupt`] instead of terminating this process.
/// The task stops once the receiving side is dropped.
pub fn spawn_signal_forwarder(
    fd: RawFd,
    control: mpsc::Sender<ControlMsg>,
) -> io::Result<JoinHandle<()>> {
    let mut resize = signal(SignalKind::window_change())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                Some(()) = resize.recv() => match window_size(fd) {
                    Some((cols, rows)) => ControlMsg::Resize { cols, rows },
                    None => continue,
                },
                Some(()) = interrupt.recv() => ControlMsg::Interrupt,
                else => break,
            };

            if control.send(msg).await.is_err() {
                break;
            }
        }
    }))
}
