use std::{sync::Mutex, time::Duration};

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tabled::Table;

use crate::{
    download::{DownloadObserver, Outcome, QueueResult, TrackId},
    info, success, utils, warning,
};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(TICK_CHARS)
}

fn bytes_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.blue} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .tick_chars(TICK_CHARS)
    .progress_chars("=> ")
}

fn overall_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:.bold} [{bar:30.green/white}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Renders a running batch: an overall bar over all tracks, a bar for the
/// track being downloaded and one line per resolved track.
pub struct TerminalObserver {
    multi: MultiProgress,
    overall: ProgressBar,
    item: Mutex<Option<ProgressBar>>,
}

impl TerminalObserver {
    pub fn new(total: usize) -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total as u64));
        overall.set_style(overall_style());
        overall.set_prefix("Tracks");

        Self {
            multi,
            overall,
            item: Mutex::new(None),
        }
    }

    pub fn finish(&self) {
        self.clear_item();
        self.overall.finish_and_clear();
    }

    fn println(&self, line: String) {
        if self.multi.println(&line).is_err() {
            println!("{}", line);
        }
    }

    fn with_item(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.item.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }

    fn clear_item(&self) {
        if let Ok(mut guard) = self.item.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
                self.multi.remove(&pb);
            }
        }
    }
}

impl DownloadObserver for TerminalObserver {
    fn on_item_start(&self, track_id: &TrackId) {
        self.clear_item();

        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(spinner_style());
        pb.set_message(format!("Fetching {}...", track_id));
        pb.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut guard) = self.item.lock() {
            *guard = Some(pb);
        }
    }

    fn on_item_end(&self, _track_id: &TrackId) {
        self.clear_item();
    }

    fn on_download_progress(&self, downloaded_bytes: u64, total_bytes: Option<u64>, filename: &str) {
        self.with_item(|pb| {
            if let Some(total) = total_bytes {
                if pb.length() != Some(total) {
                    pb.set_style(bytes_style());
                    pb.set_length(total);
                }
            }
            pb.set_position(downloaded_bytes);
            pb.set_message(filename.to_string());
        });
    }

    fn on_stage_start(&self, name: &str) {
        self.with_item(|pb| {
            pb.set_style(spinner_style());
            pb.set_message(format!("{}...", name));
        });
    }

    fn on_stage_finish(&self, name: &str) {
        log::debug!("stage {} finished", name);
    }

    fn on_outcome(&self, outcome: &Outcome) {
        let marker = match outcome {
            Outcome::Downloaded(_) => "✓".green().bold(),
            Outcome::Filtered(_) => "-".blue().bold(),
            Outcome::Skipped(_) => "~".white().bold(),
            Outcome::Failed(_) => "!".red().bold(),
        };
        self.println(format!(
            "[{}] {}",
            marker,
            utils::describe_outcome(outcome)
        ));
        self.overall.inc(1);
    }
}

/// Prints the per-kind counts and, if any, the failed tracks.
pub fn print_summary(result: &QueueResult) {
    println!("{}", Table::new(utils::outcome_table_rows(result)));

    if !result.failed.is_empty() {
        warning!("{} tracks failed:", result.failed.len());
        println!("{}", Table::new(utils::failure_table_rows(result)));
    }

    if result.is_complete() {
        success!("Processed all {} tracks.", result.original.len());
    } else {
        info!(
            "Stopped early, {} tracks were not processed.",
            result.remaining.len()
        );
    }
}
