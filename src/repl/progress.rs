//! Spinner shown while the shell waits on a session
//!
//! Statements, result fetching and tree expansion all block the prompt.
//! The spinner runs on its own tick thread and is cleared before anything
//! else is printed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Progress tracker for a blocking wait
pub struct ProgressTracker {
    /// Start time of the operation
    start_time: Instant,
    /// Spinner (optional, can be disabled)
    bar: Option<ProgressBar>,
    finished: AtomicBool,
}

impl ProgressTracker {
    /// Create a new tracker
    ///
    /// # Arguments
    /// * `message` - What is being waited on
    /// * `enable_bar` - Whether to draw a spinner
    pub fn new(message: impl Into<String>, enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg} [{elapsed}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.set_message(message.into());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        });

        Self {
            start_time: Instant::now(),
            bar,
            finished: AtomicBool::new(false),
        }
    }

    /// Report the number of rows received so far
    pub fn update(&self, rows: usize) {
        if let Some(ref bar) = self.bar {
            bar.set_message(format!("fetched {rows} rows"));
        }
    }

    /// Run `f` with the spinner hidden
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        match self.bar {
            Some(ref bar) => bar.suspend(f),
            None => f(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Finish and clear the spinner
    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}
