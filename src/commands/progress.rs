// src/commands/progress.rs
//! Progress display for repository fetches
//!
//! One spinner line per repository, finished with a short status.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinners for a batch of repository fetches
pub struct FetchProgress {
    multi: MultiProgress,
}

impl FetchProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
        }
    }

    /// Start a spinner for one repository
    pub fn start(&self, repository: &str) -> RepositorySpinner {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {prefix:.bold} {msg}") {
            bar.set_style(style);
        }
        bar.set_prefix(repository.to_string());
        bar.set_message("fetching metadata...");
        bar.enable_steady_tick(Duration::from_millis(100));

        RepositorySpinner {
            bar: self.multi.add(bar),
        }
    }
}

pub struct RepositorySpinner {
    bar: ProgressBar,
}

impl RepositorySpinner {
    pub fn succeed(&self, message: &str) {
        self.bar.finish_with_message(format!("[OK] {}", message));
    }

    pub fn fail(&self, message: &str) {
        self.bar.abandon_with_message(format!("[FAILED] {}", message));
    }
}
