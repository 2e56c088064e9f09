//! Media download: streaming payloads to disk with retry support.
//!
//! # Features
//!
//! - Strictly sequential transfers, one outcome per requested message
//! - Streaming writes (memory use independent of payload size)
//! - Sanitized file names, existing files overwritten
//! - Failure log (`log.txt`) in the download root, truncated per run
//! - Optional re-attempts for transient failures and rate limits

mod constants;
mod engine;
mod error;
mod failure_log;
mod filename;
mod outcome;
mod progress;
mod retry;

pub use constants::{FALLBACK_FILE_NAME, LOG_FILE_NAME, MAX_FILE_NAME_BYTES};
pub use engine::RetryingDownloader;
pub use error::{TransferError, TransferErrorKind};
pub use failure_log::FailureLog;
pub use filename::{sanitize_filename, target_path};
pub use outcome::{DownloadReport, SKIP_NO_MEDIA, SKIP_NOT_FOUND, TransferOutcome, TransferStatus};
pub use progress::{BarProgress, NoopProgress, ProgressSink};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureType, MAX_CONFIGURABLE_ATTEMPTS, RetryDecision, RetryPolicy,
    classify_error,
};
