// ABOUTME: Shareable handle pairing a trust store with its decision provider.
// ABOUTME: Handed to the SSH handler so host key checks run the store's policy.

use super::decider::TrustDecider;
use super::error::Result;
use super::store::{Flush, TrustStore, Verdict};
use parking_lot::Mutex;
use russh::keys::PublicKey;
use std::sync::Arc;

/// A trust store plus the provider that answers its trust questions.
///
/// Cloning shares the same store. The mutex serializes `verify` and `flush`
/// so one store can back several sessions.
#[derive(Clone)]
pub struct Verifier {
    store: Arc<Mutex<TrustStore>>,
    decider: Arc<dyn TrustDecider>,
}

impl Verifier {
    pub fn new(store: TrustStore, decider: impl TrustDecider + 'static) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            decider: Arc::new(decider),
        }
    }

    /// Run the trust policy for `key` presented by `address`. Blocks while
    /// the decider waits for an answer.
    pub fn verify(&self, address: &str, key: &PublicKey) -> Result<Verdict> {
        self.store.lock().verify(address, key, self.decider.as_ref())
    }

    pub fn flush(&self) -> Result<Flush> {
        self.store.lock().flush()
    }

    pub fn fingerprint_for(&self, address: &str) -> Option<String> {
        self.store.lock().fingerprint_for(address).map(str::to_string)
    }

    pub fn is_dirty(&self) -> bool {
        self.store.lock().is_dirty()
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("store", &*self.store.lock())
            .field("decider", &"<dyn TrustDecider>")
            .finish()
    }
}
