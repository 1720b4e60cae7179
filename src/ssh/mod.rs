// ABOUTME: SSH client transport: handshake with host key pinning, key auth, one channel.
// ABOUTME: Sessions move from handshaken to authenticated to a single exec or shell channel.

mod channel;
mod client;
mod error;
mod state;

pub use channel::{ControlMsg, PtyRequest, RemoteExit};
pub use client::{Session, SessionConfig};
pub use error::{Error, Result};
pub use state::{Authenticated, Handshaken};
