//! Plain-text log of failures and rate-limit waits.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Append-only log truncated once per download run.
///
/// Logging is best effort: when the file cannot be created or written the
/// problem is reported through `tracing` and the download continues.
#[derive(Debug)]
pub struct FailureLog {
    path: PathBuf,
    file: Option<File>,
    lines: usize,
}

impl FailureLog {
    /// Creates (or truncates) the log at `path`.
    pub async fn create(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = match File::create(&path).await {
            Ok(file) => Some(file),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "cannot create failure log");
                None
            }
        };
        Self {
            path,
            file,
            lines: 0,
        }
    }

    /// Where the log lives.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines recorded so far.
    #[must_use]
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Records a rate-limit wait before continuing with `message_id`.
    ///
    /// The wait is rounded up to whole seconds.
    pub async fn record_wait(&mut self, message_id: i64, wait: Duration) {
        self.write_line(&format!(
            "Rate limited: waiting {} seconds before continuing with message {message_id}.",
            whole_seconds(wait)
        ))
        .await;
    }

    /// Records a failed transfer.
    pub async fn record_failure(&mut self, message_id: i64, error: &str) {
        self.write_line(&format!("Error downloading message {message_id}: {error}"))
            .await;
    }

    async fn write_line(&mut self, line: &str) {
        self.lines += 1;
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let result = async {
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
            file.flush().await
        }
        .await;
        if let Err(error) = result {
            warn!(path = %self.path.display(), error = %error, "cannot write failure log");
        }
    }
}

fn whole_seconds(wait: Duration) -> u64 {
    wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
}
