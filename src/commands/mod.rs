// ABOUTME: Command module aggregator for the sshpin CLI.
// ABOUTME: Re-exports the connect flow and private key source handling.

mod connect;
mod key_source;

pub use connect::connect;
