//! Progress display for a submission
//!
//! `ProgressReporter` owns the current text and fill percentage and forwards
//! changes to a `ProgressSink` (terminal bar, log lines, or memory in tests).
//! Reporting the state that is already displayed does nothing.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex, MutexGuard};

/// What the user currently sees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub message: String,
    pub percentage: Option<u8>,
}

/// A display surface.
pub trait ProgressSink: Send + Sync {
    fn render(&self, state: &ProgressState);

    fn finish(&self) {}
}

pub struct ProgressReporter {
    current: Mutex<Option<ProgressState>>,
    sink: Box<dyn ProgressSink>,
}

impl ProgressReporter {
    pub fn new(sink: impl ProgressSink + 'static) -> Self {
        Self {
            current: Mutex::new(None),
            sink: Box::new(sink),
        }
    }

    /// Set the text and, when given, the fill (clamped to 100).
    ///
    /// Returns whether the display changed.
    pub fn report(&self, message: &str, percentage: Option<u8>) -> bool {
        let mut current = self.lock();
        let next = ProgressState {
            message: message.to_string(),
            percentage: percentage
                .map(|p| p.min(100))
                .or_else(|| current.as_ref().and_then(|s| s.percentage)),
        };

        if current.as_ref() == Some(&next) {
            return false;
        }

        self.sink.render(&next);
        *current = Some(next);
        true
    }

    /// Clear the text and empty the bar at the start of a submission.
    pub fn reset(&self) {
        self.report("", Some(0));
    }

    pub fn state(&self) -> Option<ProgressState> {
        self.lock().clone()
    }

    pub fn finish(&self) {
        self.sink.finish();
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProgressState>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Terminal progress bar.
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{msg}\n[{bar:40.cyan/blue}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏ ");
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for BarSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarSink {
    fn render(&self, state: &ProgressState) {
        self.bar.set_message(state.message.clone());
        if let Some(pct) = state.percentage {
            self.bar.set_position(u64::from(pct));
        }
    }

    fn finish(&self) {
        self.bar.abandon();
    }
}

/// Emits one log line per change; used when stderr is not a terminal.
#[derive(Debug, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn render(&self, state: &ProgressState) {
        if state.message.is_empty() {
            return;
        }
        tracing::info!(percentage = ?state.percentage, "{}", state.message);
    }
}

/// Keeps every rendered state.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    history: Arc<Mutex<Vec<ProgressState>>>,
}

impl MemorySink {
    pub fn history(&self) -> Vec<ProgressState> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ProgressSink for MemorySink {
    fn render(&self, state: &ProgressState) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(state.clone());
    }
}
