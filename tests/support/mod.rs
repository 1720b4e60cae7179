// ABOUTME: Test support utilities.
// ABOUTME: Provides the in-process SSH server, pseudo-terminals, and scripted trust deciders.

use sshpin::trust::TrustDecider;
use std::io;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

// Each test binary only uses some of these modules, so allow dead_code.
#[allow(dead_code)]
pub mod pty;
#[allow(dead_code)]
pub mod ssh_server;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("sshpin=debug".parse().unwrap())
            .add_directive("russh=info".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Trust decider with fixed answers that counts how often it was asked.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Scripted {
    pub trust_new: bool,
    pub trust_changed: bool,
    new_asked: Arc<AtomicUsize>,
    changed_asked: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl Scripted {
    pub fn new(trust_new: bool, trust_changed: bool) -> Self {
        Self {
            trust_new,
            trust_changed,
            ..Default::default()
        }
    }

    pub fn accepting() -> Self {
        Self::new(true, true)
    }

    pub fn declining() -> Self {
        Self::new(false, false)
    }

    pub fn new_host_prompts(&self) -> usize {
        self.new_asked.load(Ordering::SeqCst)
    }

    pub fn changed_host_prompts(&self) -> usize {
        self.changed_asked.load(Ordering::SeqCst)
    }
}

impl TrustDecider for Scripted {
    fn trust_new_host(&self, _address: &str, _fingerprint: &str) -> io::Result<bool> {
        self.new_asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.trust_new)
    }

    fn trust_changed_host(
        &self,
        _address: &str,
        _pinned: &str,
        _presented: &str,
    ) -> io::Result<bool> {
        self.changed_asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.trust_changed)
    }
}

/// Decider that must never be consulted.
#[allow(dead_code)]
pub struct NeverAsk;

impl TrustDecider for NeverAsk {
    fn trust_new_host(&self, address: &str, _fingerprint: &str) -> io::Result<bool> {
        panic!("unexpected first-contact prompt for {address}");
    }

    fn trust_changed_host(&self, address: &str, _pinned: &str, _presented: &str) -> io::Result<bool> {
        panic!("unexpected changed-key prompt for {address}");
    }
}

/// Decider whose terminal is gone.
#[allow(dead_code)]
pub struct NoTerminal;

impl TrustDecider for NoTerminal {
    fn trust_new_host(&self, _address: &str, _fingerprint: &str) -> io::Result<bool> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no controlling terminal"))
    }

    fn trust_changed_host(&self, _address: &str, _pinned: &str, _presented: &str) -> io::Result<bool> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no controlling terminal"))
    }
}
