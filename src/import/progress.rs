//! Terminal progress display for imports

use super::source::{DumpCategory, ImportStats, ImportTick};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

/// Bar resolution; the bar tracks the progress fraction, not a record count
const BAR_LENGTH: u64 = 1_000;

/// Progress bar driven by [`ImportTick`]s
pub struct ImportProgress {
    /// Progress bar (None if running in quiet mode)
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
    /// Record count when the bar was created, for the rate of this run
    first_records: Option<u64>,
}

impl ImportProgress {
    /// Create a new progress display
    pub fn new(category: DumpCategory, quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::new(BAR_LENGTH);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{prefix:>8} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_prefix(category.as_str());
            Some(pb)
        } else {
            None
        };

        Self {
            progress_bar,
            start_time: Instant::now(),
            first_records: None,
        }
    }

    /// Update after a commit
    pub fn update(&mut self, tick: &ImportTick) {
        let first = *self.first_records.get_or_insert(tick.records);

        if let Some(ref pb) = self.progress_bar {
            pb.set_position((tick.progress.clamp(0.0, 1.0) * BAR_LENGTH as f64) as u64);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                tick.records.saturating_sub(first) as f64 / elapsed
            } else {
                0.0
            };
            pb.set_message(format!("{} records | {:.0} rec/s", tick.records, rate));
        }
    }

    /// Finish the bar after a successful import
    pub fn finish(&self, stats: &ImportStats) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_position(BAR_LENGTH);
            if stats.already_complete {
                pb.finish_with_message(format!("Up to date, {} records", stats.records_committed));
            } else {
                pb.finish_with_message(format!(
                    "Done! {} records, {} malformed, {:.0} rec/s",
                    stats.records_committed, stats.malformed_rows, stats.records_per_second
                ));
            }
        }
    }

    /// Leave the bar where it stopped
    pub fn abandon(&self, reason: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.abandon_with_message(reason.to_string());
        }
    }
}

/// Print an import summary to the console
pub fn print_summary(stats: &ImportStats) {
    println!("\nImport Summary ({})", stats.category);
    println!("==============");
    if stats.already_complete {
        println!("Already imported:    {} records", stats.records_committed);
        return;
    }
    if let Some(line) = stats.resumed_from_line {
        println!("Resumed after line:  {}", line);
    }
    println!("Lines processed:     {}", stats.lines_processed);
    println!("Records imported:    {}", stats.records_imported);
    println!("Records total:       {}", stats.records_committed);
    println!("Malformed rows:      {}", stats.malformed_rows);
    println!("Elapsed time:        {:.1}s", stats.elapsed_seconds);
    println!("Processing rate:     {:.1} records/s", stats.records_per_second);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_progress_tracks_first_count() {
        let mut progress = ImportProgress::new(DumpCategory::Works, true);
        assert!(progress.progress_bar.is_none());

        progress.update(&ImportTick {
            category: DumpCategory::Works,
            records: 50,
            lines: 60,
            progress: 0.2,
        });
        progress.update(&ImportTick {
            category: DumpCategory::Works,
            records: 80,
            lines: 90,
            progress: 0.4,
        });
        assert_eq!(progress.first_records, Some(50));

        progress.finish(&ImportStats::new(DumpCategory::Works));
    }
}
