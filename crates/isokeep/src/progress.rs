//! Download progress bars wired to the engine's per-task callbacks.

use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use isokeep_engine::{ProgressFactory, TaskId};
use isokeep_fetch::{DownloadPhase, Progress, ProgressFn};

const BAR_TEMPLATE: &str =
    "{prefix:>24.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

const BAR_CHARS: &str = "█▓▒░  ";

fn bar_style() -> ProgressStyle {
    match ProgressStyle::with_template(BAR_TEMPLATE) {
        Ok(style) => style.progress_chars(BAR_CHARS),
        Err(_) => ProgressStyle::default_bar(),
    }
}

/// Owns the terminal's bar area; hands one bar per downloading task to
/// the dispatcher.
pub struct Reporter {
    multi: MultiProgress,
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
        }
    }

    pub fn factory(&self) -> ProgressFactory {
        let multi = self.multi.clone();
        Arc::new(move |id: &TaskId| {
            let bar = multi.add(ProgressBar::no_length());
            bar.set_style(bar_style());
            bar.set_prefix(id.to_string());
            let callback: ProgressFn = Arc::new(move |progress: Progress| match progress.phase {
                DownloadPhase::Connecting => bar.tick(),
                DownloadPhase::Downloading => {
                    if let Some(total) = progress.total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(progress.bytes_downloaded);
                }
                DownloadPhase::Completed => bar.finish_and_clear(),
            });
            callback
        })
    }

    /// Remove any leftover bars before the summary prints.
    pub fn clear(&self) {
        let _ = self.multi.clear();
    }
}
