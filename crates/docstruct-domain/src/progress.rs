//! Incremental progress protocol

use serde::{Deserialize, Serialize};

/// One event in the finite progress sequence of a run.
///
/// A run emits `Progress`/`SectionError` events in non-decreasing section
/// order and ends with exactly one `Completed` or `FatalError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Section `index` of `total` has a record on disk
    Progress {
        /// 1-based section index
        index: usize,
        /// Number of sections in the run
        total: usize,
    },

    /// The section just reported was degraded to a fallback record
    SectionError {
        /// Human-readable reason, prefixed with the section number
        message: String,
    },

    /// The archive is finalized
    Completed {
        /// Identifier to download the archive with
        archive_id: String,
        /// Every per-section error collected during the run
        errors: Vec<String>,
    },

    /// The run was aborted; no archive was produced
    FatalError {
        /// Reason for the abort
        message: String,
    },
}

impl ProgressEvent {
    /// True for `Completed` and `FatalError`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Completed { .. } | ProgressEvent::FatalError { .. }
        )
    }
}
