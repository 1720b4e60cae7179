// ABOUTME: In-memory fingerprint store hydrated from and flushed to a JSON file.
// ABOUTME: Implements the first-contact and changed-key trust policy.

use super::decider::TrustDecider;
use super::error::{Error, Result};
use super::fingerprint::fingerprint;
use crate::diagnostics::{Diagnostics, Warning};
use russh::keys::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{DirBuilder, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// File name of the fingerprint store inside `~/.ssh`.
pub const STORE_FILENAME: &str = "known_hosts.json";

/// Default location of the fingerprint store: `~/.ssh/known_hosts.json`.
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join(STORE_FILENAME))
}

/// On-disk shape: `{ "host:port": "<fingerprint>" }`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct KnownHosts(BTreeMap<String, String>);

/// Outcome of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Fingerprint matched the pinned record.
    Known,
    /// First contact; the user accepted the fingerprint.
    TrustedNew,
    /// Pinned fingerprint differed; the user accepted the replacement.
    Replaced,
}

/// Outcome of [`TrustStore::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    /// Nothing changed during this run.
    Unchanged,
    /// Changes were made but persistence is suppressed.
    Suppressed,
    /// The store was written to disk.
    Written,
}

/// Mapping of `host:port` to pinned fingerprint.
#[derive(Debug)]
pub struct TrustStore {
    path: Option<PathBuf>,
    records: BTreeMap<String, String>,
    dirty: bool,
    suppress: bool,
}

impl TrustStore {
    /// Create an empty store. With no `path` the store is memory-only.
    pub fn new(path: Option<PathBuf>, suppress: bool) -> Self {
        Self {
            path,
            records: BTreeMap::new(),
            dirty: false,
            suppress,
        }
    }

    /// Load the store from `path`.
    ///
    /// A missing file yields an empty store. A malformed file also yields an
    /// empty store and records a warning. Other read errors are fatal.
    pub fn load(path: impl Into<PathBuf>, suppress: bool, diag: &mut Diagnostics) -> Result<Self> {
        let path = path.into();
        let mut store = Self::new(Some(path.clone()), suppress);

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("fingerprint store {} does not exist yet", path.display());
                return Ok(store);
            }
            Err(source) => return Err(Error::Read { path, source }),
        };

        match serde_json::from_str::<KnownHosts>(&contents) {
            Ok(KnownHosts(records)) => {
                tracing::debug!(
                    "loaded {} pinned host(s) from {}",
                    records.len(),
                    path.display()
                );
                store.records = records;
            }
            Err(e) => {
                diag.warn(Warning::StoreUnreadable {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }

        Ok(store)
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppress
    }

    /// Whether a trust decision changed the store since it was loaded or flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn fingerprint_for(&self, address: &str) -> Option<&str> {
        self.records.get(address).map(String::as_str)
    }

    pub fn records(&self) -> &BTreeMap<String, String> {
        &self.records
    }

    /// Verify a server key presented for `address`.
    pub fn verify(
        &mut self,
        address: &str,
        key: &PublicKey,
        decider: &dyn TrustDecider,
    ) -> Result<Verdict> {
        let presented = fingerprint(key)?;
        self.verify_fingerprint(address, &presented, decider)
    }

    /// Verify an already computed fingerprint for `address`.
    ///
    /// Unknown and changed fingerprints are only accepted after the decider
    /// says so. A declined change leaves the pinned record untouched.
    pub fn verify_fingerprint(
        &mut self,
        address: &str,
        presented: &str,
        decider: &dyn TrustDecider,
    ) -> Result<Verdict> {
        let verdict = match self.records.get(address) {
            Some(pinned) if pinned == presented => return Ok(Verdict::Known),
            Some(pinned) => {
                tracing::warn!("host key for {} has changed", address);
                let accepted = decider
                    .trust_changed_host(address, pinned, presented)
                    .map_err(Error::Prompt)?;
                if !accepted {
                    return Err(Error::FingerprintMismatch {
                        address: address.to_string(),
                        expected: pinned.clone(),
                        presented: presented.to_string(),
                    });
                }
                Verdict::Replaced
            }
            None => {
                let accepted = decider
                    .trust_new_host(address, presented)
                    .map_err(Error::Prompt)?;
                if !accepted {
                    return Err(Error::UntrustedHost {
                        address: address.to_string(),
                    });
                }
                Verdict::TrustedNew
            }
        };

        self.records
            .insert(address.to_string(), presented.to_string());
        self.dirty = true;
        tracing::debug!("pinned {} to {}", address, presented);
        Ok(verdict)
    }

    /// Persist the store if it changed and persistence is not suppressed.
    ///
    /// The file is replaced in full, pretty-printed. Readers see either the
    /// old or the new contents, never a partial write.
    pub fn flush(&mut self) -> Result<Flush> {
        if !self.dirty {
            return Ok(Flush::Unchanged);
        }
        if self.suppress {
            return Ok(Flush::Suppressed);
        }
        let Some(path) = self.path.clone() else {
            return Ok(Flush::Suppressed);
        };

        let mut json = serde_json::to_string_pretty(&KnownHosts(self.records.clone()))?;
        json.push('\n');

        write_private(&path, json.as_bytes()).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;

        self.dirty = false;
        tracing::debug!("wrote {} pinned host(s) to {}", self.records.len(), path.display());
        Ok(Flush::Written)
    }
}

/// Replace `path` with `contents` through a private temp file in the same
/// directory, creating a private parent directory if needed.
///
/// The result is mode 0600 even when an older store was more permissive.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            DirBuilder::new().recursive(true).mode(0o700).create(parent)?;
            parent
        }
        None => Path::new("."),
    };

    let mut file = tempfile::Builder::new()
        .prefix(".known_hosts")
        .suffix(".tmp")
        .permissions(Permissions::from_mode(0o600))
        .tempfile_in(parent)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
