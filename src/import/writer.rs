//! Single batched writer and the committed-line watermark

use super::parser::ParsedLine;
use super::source::{DumpCategory, ImportError, ImportTick};
use crate::config::{ImportConfig, SyncPolicy};
use crate::index::{CatalogStore, DumpTypeStatus};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Highest progress fraction reported before the import completes
const MAX_PARTIAL_PROGRESS: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineMark {
    offset: u64,
    /// `false` for malformed rows
    record: bool,
}

/// Tracks the largest line number below which every line is done.
///
/// Lines arrive out of order from the parser pool; a line is done once its
/// record is committed, or immediately if it was malformed.
#[derive(Debug, Default)]
struct Watermark {
    next: u64,
    /// Compressed offset of the last line in the contiguous run
    offset: u64,
    records: u64,
    malformed: u64,
    out_of_order: BTreeMap<u64, LineMark>,
}

impl Watermark {
    fn starting_at(line: u64, records: u64, malformed: u64) -> Self {
        Self {
            next: line,
            records,
            malformed,
            ..Default::default()
        }
    }

    fn complete(&mut self, number: u64, mark: LineMark) {
        if number < self.next {
            return;
        }
        self.out_of_order.insert(number, mark);
        while let Some(mark) = self.out_of_order.remove(&self.next) {
            self.offset = self.offset.max(mark.offset);
            if mark.record {
                self.records += 1;
            } else {
                self.malformed += 1;
            }
            self.next += 1;
        }
    }
}

/// Where a resumed run picks up
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WriterStart {
    pub line: u64,
    pub records: u64,
    pub malformed: u64,
    pub progress: f64,
}

/// Totals once the writer is done
#[derive(Debug, Clone, Copy)]
pub(crate) struct WriterSummary {
    pub records_total: u64,
    pub records_this_run: u64,
    pub lines_this_run: u64,
    pub malformed_total: u64,
}

/// Sole writer of an import: batches entries, commits them and persists
/// checkpoints that only ever describe committed data.
pub(crate) struct IndexWriter<'a, F> {
    store: &'a CatalogStore,
    category: DumpCategory,
    file_size: u64,
    batch_size: usize,
    checkpoint_interval: u64,
    sync: SyncPolicy,

    batch: sled::Batch,
    batch_records: usize,
    /// Lines whose records sit in the uncommitted batch
    pending: Vec<(u64, LineMark)>,
    watermark: Watermark,

    start: WriterStart,
    committed: u64,
    checkpointed_at: u64,
    last_progress: f64,
    on_progress: F,
}

impl<'a, F> IndexWriter<'a, F>
where
    F: FnMut(ImportTick) + Send,
{
    pub fn new(
        store: &'a CatalogStore,
        category: DumpCategory,
        file_size: u64,
        config: &ImportConfig,
        start: WriterStart,
        on_progress: F,
    ) -> Self {
        Self {
            store,
            category,
            file_size,
            batch_size: config.batch_size.max(1),
            checkpoint_interval: config.checkpoint_interval.max(1) as u64,
            sync: config.sync,
            batch: sled::Batch::default(),
            batch_records: 0,
            pending: Vec::new(),
            watermark: Watermark::starting_at(start.line, start.records, start.malformed),
            start,
            committed: 0,
            checkpointed_at: 0,
            last_progress: start.progress.min(MAX_PARTIAL_PROGRESS),
            on_progress,
        }
    }

    /// Records committed so far, including those of a resumed run
    pub fn records_total(&self) -> u64 {
        self.start.records + self.committed
    }

    /// Accept one parsed line, committing and checkpointing when due
    pub fn push(&mut self, line: ParsedLine) -> Result<(), ImportError> {
        let Some(entry) = line.entry else {
            self.watermark.complete(
                line.number,
                LineMark {
                    offset: line.offset,
                    record: false,
                },
            );
            return Ok(());
        };

        for (key, value) in entry.pairs {
            self.batch.insert(key, value);
        }
        self.batch_records += 1;
        self.pending.push((
            line.number,
            LineMark {
                offset: line.offset,
                record: true,
            },
        ));

        if self.batch_records >= self.batch_size {
            self.commit()?;
            if self.committed - self.checkpointed_at >= self.checkpoint_interval {
                self.checkpoint()?;
            }
        }
        Ok(())
    }

    /// Apply the current batch. No disk sync is forced.
    pub fn commit(&mut self) -> Result<(), ImportError> {
        if self.batch_records == 0 {
            return Ok(());
        }

        let batch = std::mem::take(&mut self.batch);
        self.store
            .db()
            .apply_batch(batch)
            .map_err(|source| ImportError::Commit {
                records: self.records_total(),
                source,
            })?;

        self.committed += self.batch_records as u64;
        debug!(
            "Committed {} {} records ({} total)",
            self.batch_records,
            self.category,
            self.records_total()
        );
        self.batch_records = 0;

        for (number, mark) in self.pending.drain(..) {
            self.watermark.complete(number, mark);
        }

        let progress = self.partial_progress();
        self.tick(progress);
        Ok(())
    }

    /// Persist a status row describing only committed lines
    pub fn checkpoint(&mut self) -> Result<(), ImportError> {
        let status = DumpTypeStatus {
            record_count: self.watermark.records,
            lines_processed: self.watermark.next,
            file_size: self.file_size,
            import_progress: self.partial_progress(),
            malformed_rows: self.watermark.malformed,
            last_updated: Some(Utc::now()),
        };

        self.store
            .write_category_status(self.category, status)
            .map_err(ImportError::Checkpoint)?;
        if self.sync == SyncPolicy::OnCheckpoint {
            self.store.flush().map_err(ImportError::Checkpoint)?;
        }

        self.checkpointed_at = self.committed;
        info!(
            "Checkpoint {}: {} lines, {} records",
            self.category, self.watermark.next, self.watermark.records
        );
        Ok(())
    }

    /// Commit the remainder and mark the category complete
    pub fn finish(mut self) -> Result<WriterSummary, ImportError> {
        self.commit()?;

        let status = DumpTypeStatus {
            record_count: self.watermark.records,
            lines_processed: self.watermark.next,
            file_size: self.file_size,
            import_progress: 1.0,
            malformed_rows: self.watermark.malformed,
            last_updated: Some(Utc::now()),
        };
        self.store
            .write_category_status(self.category, status)
            .map_err(ImportError::Checkpoint)?;
        if self.sync != SyncPolicy::Never {
            self.store.flush().map_err(ImportError::Checkpoint)?;
        }

        self.tick(1.0);
        Ok(self.summary())
    }

    pub fn summary(&self) -> WriterSummary {
        WriterSummary {
            records_total: self.records_total(),
            records_this_run: self.committed,
            lines_this_run: self.watermark.next - self.start.line,
            malformed_total: self.watermark.malformed,
        }
    }

    /// Progress fraction for a partial import: never `1.0`, never decreasing
    fn partial_progress(&mut self) -> f64 {
        if self.file_size > 0 {
            let fraction = self.watermark.offset as f64 / self.file_size as f64;
            self.last_progress = self.last_progress.max(fraction.min(MAX_PARTIAL_PROGRESS));
        }
        self.last_progress
    }

    fn tick(&mut self, progress: f64) {
        let tick = ImportTick {
            category: self.category,
            records: self.records_total(),
            lines: self.watermark.next,
            progress,
        };
        (self.on_progress)(tick);
    }
}
