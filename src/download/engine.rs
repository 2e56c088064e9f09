//! Sequential download loop with retry support.
//!
//! [`RetryingDownloader::download`] processes the requested message ids one
//! at a time, in order. Every id ends with exactly one [`TransferOutcome`];
//! nothing a single transfer does can abort the run.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tgmedia_core::download::{NoopProgress, RetryPolicy, RetryingDownloader};
//! use tgmedia_core::service::{Entity, InMemoryService, MessageService};
//!
//! # async fn example() {
//! let service: Arc<dyn MessageService> = Arc::new(InMemoryService::new());
//! let downloader = RetryingDownloader::new(service, "./downloads")
//!     .with_policy(RetryPolicy::with_max_attempts(3));
//! let report = downloader
//!     .download(&Entity::new(1, "chat"), &[10, 11], &mut NoopProgress)
//!     .await;
//! println!("{report}");
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::constants::LOG_FILE_NAME;
use super::failure_log::FailureLog;
use super::filename::target_path;
use super::outcome::{SKIP_NO_MEDIA, SKIP_NOT_FOUND};
use super::progress::ProgressSink;
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::{DownloadReport, TransferError, TransferOutcome, TransferStatus};
use crate::service::{Entity, MediaStream, MessageService};

/// Result of one attempt that did not fail.
enum Attempt {
    Saved { path: PathBuf, bytes: u64 },
    Skipped(&'static str),
}

/// Downloads message payloads into a directory, one at a time.
pub struct RetryingDownloader {
    service: Arc<dyn MessageService>,
    root: PathBuf,
    policy: RetryPolicy,
}

impl RetryingDownloader {
    /// Creates a downloader writing into `root` with the default policy.
    pub fn new(service: Arc<dyn MessageService>, root: impl Into<PathBuf>) -> Self {
        Self {
            service,
            root: root.into(),
            policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The download root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the failure log inside the download root.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE_NAME)
    }

    /// Downloads the payloads of `ids` from `entity`, in order.
    ///
    /// Creates the download root if needed and truncates its failure log.
    /// The report has one outcome per id, in the order given.
    #[instrument(skip(self, ids, progress), fields(chat = entity.id, count = ids.len()))]
    pub async fn download(
        &self,
        entity: &Entity,
        ids: &[i64],
        progress: &mut dyn ProgressSink,
    ) -> DownloadReport {
        if let Err(error) = tokio::fs::create_dir_all(&self.root).await {
            warn!(root = %self.root.display(), error = %error, "cannot create download directory");
        }
        let mut log = FailureLog::create(self.log_path()).await;

        let mut report = DownloadReport::default();
        for &message_id in ids {
            let outcome = self
                .download_with_retry(entity, message_id, progress, &mut log)
                .await;
            debug!(%outcome, "transfer finished");
            report.outcomes.push(outcome);
        }

        info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            log_lines = log.lines(),
            "download run complete"
        );
        report
    }

    #[instrument(skip(self, entity, progress, log))]
    async fn download_with_retry(
        &self,
        entity: &Entity,
        message_id: i64,
        progress: &mut dyn ProgressSink,
        log: &mut FailureLog,
    ) -> TransferOutcome {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "attempting transfer");

            let error = match self.attempt(entity, message_id, progress).await {
                Ok(Attempt::Saved { path, bytes }) => {
                    info!(path = %path.display(), bytes, "media saved");
                    return TransferOutcome {
                        message_id,
                        status: TransferStatus::Success { path, bytes },
                        attempts: attempt,
                    };
                }
                Ok(Attempt::Skipped(reason)) => {
                    info!(reason, "message skipped");
                    return TransferOutcome {
                        message_id,
                        status: TransferStatus::Skipped {
                            reason: reason.to_string(),
                        },
                        attempts: attempt,
                    };
                }
                Err(error) => error,
            };

            if let TransferError::RateLimited { wait } = &error {
                warn!(wait_secs = wait.as_secs(), "rate limited, waiting");
                log.record_wait(message_id, *wait).await;
                tokio::time::sleep(*wait).await;
            }

            match self.policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        attempt = next_attempt,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying transfer"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(error = %error, %reason, attempts = attempt, "transfer failed");
                    if !matches!(error, TransferError::RateLimited { .. }) {
                        log.record_failure(message_id, &error.to_string()).await;
                    }
                    return TransferOutcome {
                        message_id,
                        status: TransferStatus::Failed {
                            kind: error.kind(),
                            message: error.to_string(),
                        },
                        attempts: attempt,
                    };
                }
            }
        }
    }

    async fn attempt(
        &self,
        entity: &Entity,
        message_id: i64,
        progress: &mut dyn ProgressSink,
    ) -> Result<Attempt, TransferError> {
        let Some(message) = self.service.get_message(entity, message_id).await? else {
            return Ok(Attempt::Skipped(SKIP_NOT_FOUND));
        };
        let Some(document) = message.document() else {
            return Ok(Attempt::Skipped(SKIP_NO_MEDIA));
        };

        let name = document.display_name();
        let path = target_path(&self.root, &name);
        let media = self.service.open_media(entity, &message).await?;
        let total = media.total_bytes.or(document.size);

        debug!(
            path = %path.display(),
            ?total,
            mime_type = document.mime_type.as_deref().unwrap_or("unknown"),
            "streaming media"
        );
        progress.start(&name, total);
        let result = stream_to_file(media, &path, progress).await;
        progress.finish(result.is_ok());

        match result {
            Ok(bytes) => Ok(Attempt::Saved { path, bytes }),
            Err(error) => {
                debug!(path = %path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&path).await;
                Err(error)
            }
        }
    }
}

impl fmt::Debug for RetryingDownloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingDownloader")
            .field("service", &self.service.name())
            .field("root", &self.root)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Streams the payload into `path`, overwriting it, and returns bytes written.
async fn stream_to_file(
    media: MediaStream,
    path: &Path,
    progress: &mut dyn ProgressSink,
) -> Result<u64, TransferError> {
    let file = File::create(path)
        .await
        .map_err(|e| TransferError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut chunks = media.chunks;
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| TransferError::io(path, e))?;
        bytes_written += chunk.len() as u64;
        progress.advance(bytes_written);
    }

    writer
        .flush()
        .await
        .map_err(|e| TransferError::io(path, e))?;

    Ok(bytes_written)
}
