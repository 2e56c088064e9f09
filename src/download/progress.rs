//! Transfer progress reporting.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives progress of one transfer at a time.
///
/// Calls arrive in the order `start`, any number of `advance`, `finish`.
/// `written` in `advance` is cumulative and never decreases within a
/// transfer.
pub trait ProgressSink: Send {
    /// A transfer of `name` begins; `total` is the payload size when known.
    fn start(&mut self, name: &str, total: Option<u64>);

    /// `written` bytes of the current payload are on disk.
    fn advance(&mut self, written: u64);

    /// The current transfer ended.
    fn finish(&mut self, success: bool);
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn start(&mut self, _name: &str, _total: Option<u64>) {}

    fn advance(&mut self, _written: u64) {}

    fn finish(&mut self, _success: bool) {}
}

/// Draws one indicatif bar per transfer on stderr.
#[derive(Debug, Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
    hidden: bool,
}

impl BarProgress {
    /// Creates a sink that draws to stderr.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that tracks progress without drawing.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: None,
            hidden: true,
        }
    }

    fn style(known_total: bool) -> ProgressStyle {
        let template = if known_total {
            "{msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})"
        } else {
            "{spinner} {msg} {bytes} ({bytes_per_sec})"
        };
        ProgressStyle::with_template(template)
            .map(|style| style.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }

    /// Current position of the active bar, if any.
    #[must_use]
    pub fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(ProgressBar::position)
    }
}

impl ProgressSink for BarProgress {
    fn start(&mut self, name: &str, total: Option<u64>) {
        let bar = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        if self.hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_style(Self::style(total.is_some()));
        bar.set_message(name.to_string());
        self.bar = Some(bar);
    }

    fn advance(&mut self, written: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(written);
        }
    }

    fn finish(&mut self, success: bool) {
        if let Some(bar) = self.bar.take() {
            if success {
                bar.finish();
            } else {
                bar.abandon();
            }
        }
    }
}
