// ABOUTME: Library root for sshpin - exposes the client core for testing.
// ABOUTME: The main binary is in main.rs.

pub mod credential;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod ssh;
pub mod terminal;
pub mod trust;
