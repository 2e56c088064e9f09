//! Per-message results of a download run.

use std::fmt;
use std::path::PathBuf;

use super::TransferErrorKind;

/// Reason recorded when the message id does not exist.
pub const SKIP_NOT_FOUND: &str = "message not found";

/// Reason recorded when the message has no document attached.
pub const SKIP_NO_MEDIA: &str = "no downloadable media";

/// What happened to one requested message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    /// The payload was written completely.
    Success {
        /// Where it was written.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// Nothing to download.
    Skipped {
        /// Why the message was skipped.
        reason: String,
    },
    /// The transfer failed and was given up.
    Failed {
        /// Coarse failure kind.
        kind: TransferErrorKind,
        /// Error text of the last attempt.
        message: String,
    },
}

/// Outcome for one requested message id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// The requested message id.
    pub message_id: i64,
    /// What happened.
    pub status: TransferStatus,
    /// Attempts made, at least 1.
    pub attempts: u32,
}

impl TransferOutcome {
    /// Returns true for a completed transfer.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, TransferStatus::Success { .. })
    }

    /// Returns true for a skipped message.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, TransferStatus::Skipped { .. })
    }

    /// Returns true for a failed transfer.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, TransferStatus::Failed { .. })
    }

    /// The failure kind, if the transfer failed.
    #[must_use]
    pub fn failure_kind(&self) -> Option<TransferErrorKind> {
        match &self.status {
            TransferStatus::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            TransferStatus::Success { path, bytes } => write!(
                f,
                "message {}: saved {} ({bytes} bytes)",
                self.message_id,
                path.display()
            ),
            TransferStatus::Skipped { reason } => {
                write!(f, "message {}: skipped, {reason}", self.message_id)
            }
            TransferStatus::Failed { kind, message } => {
                write!(f, "message {}: failed ({kind}), {message}", self.message_id)
            }
        }
    }
}

/// Outcomes of a download run, one per requested id in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// Outcomes in request order.
    pub outcomes: Vec<TransferOutcome>,
}

impl DownloadReport {
    /// Number of completed transfers.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of skipped messages.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    /// Number of failed transfers.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// Total bytes written by successful transfers.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                TransferStatus::Success { bytes, .. } => bytes,
                _ => 0,
            })
            .sum()
    }
}

impl fmt::Display for DownloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} downloaded, {} skipped, {} failed ({} bytes)",
            self.succeeded(),
            self.skipped(),
            self.failed(),
            self.bytes_written()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> DownloadReport {
        DownloadReport {
            outcomes: vec![
                TransferOutcome {
                    message_id: 1,
                    status: TransferStatus::Success {
                        path: PathBuf::from("/d/a.bin"),
                        bytes: 10,
                    },
                    attempts: 1,
                },
                TransferOutcome {
                    message_id: 2,
                    status: TransferStatus::Skipped {
                        reason: SKIP_NO_MEDIA.to_string(),
                    },
                    attempts: 1,
                },
                TransferOutcome {
                    message_id: 3,
                    status: TransferStatus::Failed {
                        kind: TransferErrorKind::Io,
                        message: "disk full".to_string(),
                    },
                    attempts: 1,
                },
            ],
        }
    }

    #[test]
    fn test_report_counters() {
        let report = report();
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.bytes_written(), 10);
        assert_eq!(report.to_string(), "1 downloaded, 1 skipped, 1 failed (10 bytes)");
    }

    #[test]
    fn test_outcome_display() {
        let report = report();
        assert_eq!(
            report.outcomes[1].to_string(),
            "message 2: skipped, no downloadable media"
        );
        assert_eq!(
            report.outcomes[2].to_string(),
            "message 3: failed (io), disk full"
        );
        assert_eq!(report.outcomes[2].failure_kind(), Some(TransferErrorKind::Io));
        assert_eq!(report.outcomes[0].failure_kind(), None);
    }
}
