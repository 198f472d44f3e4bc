//! Report-once diagnostic channel.
//!
//! Recoverable problems (overlapping merges, identity collisions, drag
//! configuration conflicts) are logged through `tracing` the first time
//! they are seen and kept in a drainable list the host can poll.

use std::collections::HashSet;

use crate::error::GridError;

/// Severity of a diagnostic record
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Warning,
    Error,
}

/// A single diagnostic record
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dedupe key, e.g. `merge-overlap` or `identity-collision:42`
    pub key: String,
    pub message: String,
}

/// Collects diagnostics, reporting each key at most once.
#[derive(Debug, Default)]
pub struct Diagnostics {
    seen: HashSet<String>,
    pending: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an error under `key`. Returns `true` if this is the first
    /// report for that key.
    pub fn report(&mut self, key: impl Into<String>, error: &GridError) -> bool {
        let severity = match error {
            GridError::Configuration(_) => Severity::Error,
            _ => Severity::Warning,
        };
        self.push(key.into(), severity, error.to_string())
    }

    /// Report a free-form warning under `key`.
    pub fn warn(&mut self, key: impl Into<String>, message: impl Into<String>) -> bool {
        self.push(key.into(), Severity::Warning, message.into())
    }

    fn push(&mut self, key: String, severity: Severity, message: String) -> bool {
        if !self.seen.insert(key.clone()) {
            return false;
        }
        match severity {
            Severity::Error => tracing::error!(target: "gridview", %key, "{message}"),
            Severity::Warning => tracing::warn!(target: "gridview", %key, "{message}"),
        }
        self.pending.push(Diagnostic {
            severity,
            key,
            message,
        });
        true
    }

    /// Whether `key` has been reported.
    pub fn has_reported(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// Take every diagnostic reported since the last drain.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.pending)
    }

    /// Forget dedupe keys (on dataset replacement, so a new dataset can
    /// report the same problem again).
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_each_key_once() {
        let mut diag = Diagnostics::new();
        let err = GridError::Configuration("overlap".into());
        assert!(diag.report("merge-overlap", &err));
        assert!(!diag.report("merge-overlap", &err));
        let drained = diag.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].severity, Severity::Error);
        assert!(diag.drain().is_empty());
    }

    #[test]
    fn test_reset_allows_rereport() {
        let mut diag = Diagnostics::new();
        assert!(diag.warn("k", "first"));
        diag.reset();
        assert!(diag.warn("k", "again"));
        assert_eq!(diag.drain().len(), 2);
    }
}
