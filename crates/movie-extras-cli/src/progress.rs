use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use movie_extras_core::ProgressReporter;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Spinner per folder; its message follows the current config and download.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    /// Clear whatever spinner is still showing.
    pub fn finish(&self) {
        if let Some(pb) = self.lock().take() {
            pb.finish_and_clear();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_message(&self, message: String) {
        if let Some(pb) = self.lock().as_ref() {
            pb.set_message(message);
        }
    }

    fn println(&self, line: String) {
        match self.lock().as_ref() {
            Some(pb) => pb.println(line),
            None => eprintln!("{}", line),
        }
    }
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(TICK_CHARS);
    pb.set_style(style);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

impl ProgressReporter for CliReporter {
    fn on_folder_start(&self, name: &str, index: usize, total: usize) {
        let pb = spinner(format!("[{}/{}] {}", index, total, name));
        if let Some(old) = self.lock().replace(pb) {
            old.finish_and_clear();
        }
    }

    fn on_config_start(&self, folder: &str, config_id: &str) {
        self.set_message(format!("{}: {}", folder, config_id));
    }

    fn on_candidates_found(&self, total: usize, after_filters: usize) {
        self.set_message(format!(
            "{} candidates, {} left after filtering",
            total, after_filters
        ));
    }

    fn on_download_start(&self, url: &str) {
        self.set_message(format!("Downloading {}", url));
    }

    fn on_download_complete(&self, url: &str, success: bool) {
        let mark = if success { "✓".green() } else { "✗".red() };
        self.println(format!("  {} {}", mark, url));
    }

    fn on_folder_complete(&self, name: &str, files_placed: usize) {
        self.finish();
        eprintln!(
            "  {} {}: {} new files",
            "✓".green(),
            name,
            files_placed.to_string().cyan()
        );
    }
}
