// ABOUTME: Host fingerprint trust store with trust-on-first-use policy.
// ABOUTME: Pins host:port to a key fingerprint and asks before trusting new or changed keys.

mod decider;
mod error;
mod fingerprint;
mod store;
mod verifier;

pub use decider::{TerminalDecider, TrustDecider};
pub use error::{Error, Result};
pub use fingerprint::fingerprint;
pub use store::{Flush, TrustStore, Verdict, default_path};
pub use verifier::Verifier;
