//! Per-task outcomes and the aggregated run report.

use std::fmt;
use std::path::PathBuf;

use crate::download::DownloadError;

/// Why a task failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server answered with a non-200 status.
    Download(u16),
    /// The fetch exceeded its timeout budget on every attempt.
    Timeout,
    /// Connection-level failure.
    Network,
    /// The URL could not be parsed.
    InvalidUrl,
    /// The file or its directory could not be written.
    Io,
    /// The task itself panicked or was cancelled.
    Task,
}

impl From<&DownloadError> for FailureKind {
    fn from(error: &DownloadError) -> Self {
        match error {
            DownloadError::HttpStatus { status, .. } => Self::Download(*status),
            DownloadError::Timeout { .. } => Self::Timeout,
            DownloadError::Network { .. } => Self::Network,
            DownloadError::InvalidUrl { .. } => Self::InvalidUrl,
            DownloadError::Io { .. } => Self::Io,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download(status) => write!(f, "http {status}"),
            Self::Timeout => f.write_str("timeout"),
            Self::Network => f.write_str("network"),
            Self::InvalidUrl => f.write_str("invalid url"),
            Self::Io => f.write_str("io"),
            Self::Task => f.write_str("task"),
        }
    }
}

/// Result of one acquisition task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was written.
    Success {
        /// Where it was written.
        path: PathBuf,
        /// How many bytes.
        bytes: u64,
    },
    /// The result was deliberately not downloaded.
    Skipped {
        /// Why.
        reason: String,
    },
    /// The task gave up.
    Failed {
        /// Failure category.
        kind: FailureKind,
        /// The error message, naming the URL or path involved.
        detail: String,
    },
}

impl DownloadOutcome {
    /// Creates a skipped outcome.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Creates a failed outcome from a fetch or write error.
    #[must_use]
    pub fn from_error(error: &DownloadError) -> Self {
        Self::Failed {
            kind: FailureKind::from(error),
            detail: error.to_string(),
        }
    }

    /// Whether the file was written.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Everything a run produced.
///
/// Holds one outcome per dispatched task; ordering is not significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Task outcomes.
    pub outcomes: Vec<DownloadOutcome>,
    /// Records processed.
    pub records: usize,
    /// Records whose result page could not be fetched.
    pub records_failed: usize,
}

impl RunReport {
    /// Tasks that wrote a file.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, DownloadOutcome::Success { .. }))
    }

    /// Tasks that were skipped.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DownloadOutcome::Skipped { .. }))
    }

    /// Tasks that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DownloadOutcome::Failed { .. }))
    }

    /// All task outcomes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Bytes written across successful tasks.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o {
                DownloadOutcome::Success { bytes, .. } => *bytes,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, predicate: impl Fn(&DownloadOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }
}
