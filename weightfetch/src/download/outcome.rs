//! Per-transfer and per-batch download results.

use std::path::PathBuf;

/// How a single transfer ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    /// Downloaded from byte zero.
    Downloaded,
    /// Appended to a partial file starting at `from`.
    Resumed { from: u64 },
    /// The server reported the range unsatisfiable: nothing left to fetch.
    AlreadyComplete,
    /// The transfer failed; any bytes written stay on disk for a later resume.
    Failed { reason: String },
    /// Stopped by an interrupt request.
    Interrupted,
}

/// Result of one [`TransferResumer`](super::TransferResumer) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub status: TransferStatus,
    /// Bytes written to disk during this call.
    pub bytes_written: u64,
}

impl TransferReport {
    pub(crate) fn new(status: TransferStatus, bytes_written: u64) -> Self {
        Self {
            status,
            bytes_written,
        }
    }

    pub(crate) fn failed(reason: impl Into<String>, bytes_written: u64) -> Self {
        Self::new(
            TransferStatus::Failed {
                reason: reason.into(),
            },
            bytes_written,
        )
    }

    /// Whether the destination now holds the complete artifact.
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            TransferStatus::Downloaded
                | TransferStatus::Resumed { .. }
                | TransferStatus::AlreadyComplete
        )
    }

    /// Human-readable summary for logs and the console.
    pub fn message(&self) -> String {
        match &self.status {
            TransferStatus::Downloaded => format!("downloaded {} bytes", self.bytes_written),
            TransferStatus::Resumed { from } => format!(
                "resumed at byte {}, downloaded {} bytes",
                from, self.bytes_written
            ),
            TransferStatus::AlreadyComplete => "complete file found, skipped".to_string(),
            TransferStatus::Failed { reason } => reason.clone(),
            TransferStatus::Interrupted => format!(
                "interrupted after {} bytes; run again to resume",
                self.bytes_written
            ),
        }
    }
}

/// Result of attempting one catalog asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Catalog identifier.
    pub id: String,
    pub success: bool,
    pub destination: PathBuf,
    /// Bytes transferred in this session (0 for an already-complete file).
    pub bytes_transferred: u64,
    pub message: String,
}

impl DownloadOutcome {
    /// Outcome from a transfer report.
    pub fn from_report(id: impl Into<String>, destination: PathBuf, report: &TransferReport) -> Self {
        Self {
            id: id.into(),
            success: report.is_success(),
            destination,
            bytes_transferred: report.bytes_written,
            message: report.message(),
        }
    }

    /// Failed outcome that never reached the network.
    pub fn rejected(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            destination: PathBuf::new(),
            bytes_transferred: 0,
            message: message.into(),
        }
    }
}

/// Aggregated outcomes of a batch, in attempt order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub outcomes: Vec<DownloadOutcome>,
}

impl BatchSummary {
    /// Create an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome.
    pub fn record(&mut self, outcome: DownloadOutcome) {
        self.outcomes.push(outcome);
    }

    /// Number of assets attempted.
    pub fn requested(&self) -> usize {
        self.outcomes.len()
    }

    /// Identifiers that downloaded successfully, in attempt order.
    pub fn succeeded(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.success)
            .map(|o| o.id.clone())
            .collect()
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    /// Number of failed assets.
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Fewer successes than requested.
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Every requested asset succeeded.
    pub fn is_complete(&self) -> bool {
        !self.has_failures()
    }

    /// Total bytes transferred in this session.
    pub fn bytes_transferred(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes_transferred).sum()
    }
}
