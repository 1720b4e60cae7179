// ABOUTME: Session state marker types for the type state pattern.
// ABOUTME: Zero-sized types keep channel operations behind authentication.

/// Key exchange done and the host key accepted; not yet authenticated.
/// Available actions: `authenticate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Handshaken;

/// Authenticated and ready to open the session's single channel.
/// Available actions: `exec()`, `shell()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;
