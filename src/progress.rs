//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal rendering of a session's progress percentages
#[derive(Debug)]
pub struct ProgressReporter {
    pub connect_pb: Option<ProgressBar>,
    pub rows_pb: Option<ProgressBar>,
    show_progress: bool,
    last_percent: Option<u8>,
}

impl ProgressReporter {
    /// Create progress reporter for a comparison
    pub fn new_for_compare(table: &str) -> Self {
        Self {
            connect_pb: Some(create_spinner(&format!("Opening sources for {}...", table))),
            rows_pb: None,
            show_progress: true,
            last_percent: None,
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self {
            connect_pb: None,
            rows_pb: None,
            show_progress: false,
            last_percent: None,
        }
    }

    /// Lazily create the percentage bar once the first row is compared
    fn ensure_rows_pb(&mut self) {
        if self.show_progress && self.rows_pb.is_none() {
            if let Some(pb) = self.connect_pb.take() {
                pb.finish_and_clear();
            }
            self.rows_pb = Some(create_percent_bar("Comparing rows"));
        }
    }

    /// Update with a new percentage; percentages never move backwards
    pub fn update(&mut self, percent: u8) {
        if self.last_percent.is_some_and(|last| percent < last) {
            return;
        }
        self.last_percent = Some(percent);

        self.ensure_rows_pb();
        if let Some(pb) = &self.rows_pb {
            pb.set_position(percent.min(100) as u64);
        }
    }

    pub fn last_percent(&self) -> Option<u8> {
        self.last_percent
    }

    /// Finish all progress bars
    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.connect_pb.take() {
            pb.finish_and_clear();
        }
        if let Some(pb) = self.rows_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        // Ensure all progress bars are cleaned up silently
        if let Some(pb) = self.connect_pb.take() {
            pb.finish_and_clear();
        }
        if let Some(pb) = self.rows_pb.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .expect("Invalid progress template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a 0-100 percentage bar
fn create_percent_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .expect("Invalid progress template")
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}
