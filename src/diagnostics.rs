// ABOUTME: Non-fatal problems noticed during a run, reported once it ends.
// ABOUTME: Each warning renders its own user-facing wording.

use std::fmt;
use std::path::PathBuf;

/// Something went wrong that did not stop the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The fingerprint store could not be parsed and was treated as empty,
    /// so every host counts as first contact this run.
    StoreUnreadable { path: PathBuf, reason: String },
    /// A trust decision was made but could not be written.
    DecisionNotSaved { reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::StoreUnreadable { path, reason } => write!(
                f,
                "fingerprint store {} is not valid JSON ({}); all hosts were treated as new",
                path.display(),
                reason
            ),
            Warning::DecisionNotSaved { reason } => write!(
                f,
                "host fingerprint was trusted for this session only, saving it failed: {}",
                reason
            ),
        }
    }
}

/// Warnings collected over one run, in the order they happened.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Keep `warning` for the end-of-run report and log it now.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}
