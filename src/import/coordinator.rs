//! Import coordinator that orchestrates the reader, parser pool and writer

use super::cancel::CancelSignal;
use super::lines::LineSource;
use super::parser;
use super::source::{DumpCategory, ImportError, ImportStats, ImportTick};
use super::writer::{IndexWriter, WriterStart};
use crate::config::{ImportConfig, SyncPolicy};
use crate::index::{CatalogStore, DumpTypeStatus, ResumePlan};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// Runs dump imports against one catalog store
#[derive(Debug, Clone)]
pub struct ImportCoordinator {
    store: CatalogStore,
    config: ImportConfig,
}

impl ImportCoordinator {
    pub fn new(store: CatalogStore, config: ImportConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Import one dump file.
    ///
    /// Resumes a partial import of the same file, does nothing for a file
    /// that is already fully imported, and starts over for anything else.
    /// `on_progress` is called after every commit with the cumulative record
    /// count; the last call of a successful import has progress `1.0`.
    pub async fn import<F>(
        &self,
        category: DumpCategory,
        path: impl AsRef<Path>,
        cancel: CancelSignal,
        mut on_progress: F,
    ) -> Result<ImportStats, ImportError>
    where
        F: FnMut(ImportTick) + Send,
    {
        let started = Instant::now();
        let path = path.as_ref();
        let _guard = self.store.import_lock().lock().await;

        let source = LineSource::open(
            path,
            self.config.read_buffer_bytes,
            self.config.max_line_bytes,
        )?;
        let file_size = source.file_size();
        let previous = self.store.status()?.get(category).clone();
        let mut stats = ImportStats::new(category);

        let start = match ResumePlan::decide(&previous, file_size) {
            ResumePlan::AlreadyComplete { record_count } => {
                info!(
                    "{} dump {} already imported ({} records)",
                    category,
                    path.display(),
                    record_count
                );
                on_progress(ImportTick {
                    category,
                    records: record_count,
                    lines: previous.lines_processed,
                    progress: 1.0,
                });
                stats.records_committed = record_count;
                stats.malformed_rows = previous.malformed_rows;
                stats.already_complete = true;
                stats.elapsed_seconds = started.elapsed().as_secs_f64();
                return Ok(stats);
            }
            ResumePlan::Resume {
                skip_lines,
                record_count,
            } => {
                info!(
                    "Resuming {} import of {} after line {} ({} records)",
                    category,
                    path.display(),
                    skip_lines,
                    record_count
                );
                stats.resumed_from_line = Some(skip_lines);
                WriterStart {
                    line: skip_lines,
                    records: record_count,
                    malformed: previous.malformed_rows,
                    progress: previous.import_progress,
                }
            }
            ResumePlan::Fresh => {
                info!(
                    "Starting {} import of {} ({} bytes)",
                    category,
                    path.display(),
                    file_size
                );
                self.store
                    .write_category_status(category, DumpTypeStatus::started(file_size))?;
                WriterStart::default()
            }
        };

        let worker_count = self.config.worker_count();
        let (line_tx, line_rx) = mpsc::channel(self.config.line_queue_capacity.max(1));
        let (entry_tx, mut entry_rx) = mpsc::channel(self.config.entry_queue_capacity.max(1));

        let reader_cancel = cancel.clone();
        let reader =
            tokio::task::spawn_blocking(move || source.stream(start.line, line_tx, reader_cancel));

        let line_rx = Arc::new(Mutex::new(line_rx));
        let workers: Vec<_> = (0..worker_count)
            .map(|id| {
                tokio::spawn(parser::run_worker(
                    id,
                    category,
                    line_rx.clone(),
                    entry_tx.clone(),
                    cancel.clone(),
                ))
            })
            .collect();
        // Workers own the remaining ends; the entry queue closes when the last one exits
        drop(line_rx);
        drop(entry_tx);

        let mut writer = IndexWriter::new(
            &self.store,
            category,
            file_size,
            &self.config,
            start,
            on_progress,
        );

        let mut cancel_wait = cancel.clone();
        let mut cancelled = false;
        let mut write_result: Result<(), ImportError> = Ok(());
        loop {
            tokio::select! {
                biased;
                _ = cancel_wait.cancelled() => {
                    cancelled = true;
                    break;
                }
                parsed = entry_rx.recv() => match parsed {
                    Some(line) => {
                        if let Err(e) = writer.push(line) {
                            write_result = Err(e);
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        // Unblocks workers waiting to send, which in turn unblocks the reader
        drop(entry_rx);

        for worker in workers {
            worker.await?;
        }
        let reader_result = reader.await?;

        write_result?;

        if cancelled || cancel.is_cancelled() {
            writer.commit()?;
            writer.checkpoint()?;
            let records = writer.records_total();
            info!("{} import cancelled after {} records", category, records);
            return Err(ImportError::Cancelled { records });
        }

        if let Err(e) = reader_result {
            if let Err(commit_err) = writer.commit() {
                warn!("Failed to commit in-flight records after read error: {}", commit_err);
            }
            return Err(e);
        }

        let summary = writer.finish()?;

        stats.records_committed = summary.records_total;
        stats.records_imported = summary.records_this_run;
        stats.lines_processed = summary.lines_this_run;
        stats.malformed_rows = summary.malformed_total;
        stats.elapsed_seconds = started.elapsed().as_secs_f64();
        stats.update_rate();

        info!(
            "Imported {} {} records in {:.1}s ({} total, {} malformed rows, {:.0} records/s)",
            stats.records_imported,
            category,
            stats.elapsed_seconds,
            stats.records_committed,
            stats.malformed_rows,
            stats.records_per_second
        );

        Ok(stats)
    }
}

impl CatalogStore {
    /// Import a dump with the default pipeline configuration
    pub async fn import_dump<F>(
        &self,
        category: DumpCategory,
        path: impl AsRef<Path>,
        cancel: CancelSignal,
        on_progress: F,
    ) -> Result<ImportStats, ImportError>
    where
        F: FnMut(ImportTick) + Send,
    {
        ImportCoordinator::new(self.clone(), ImportConfig::default())
            .import(category, path, cancel, on_progress)
            .await
    }
}

/// Builder for ImportCoordinator with sensible defaults
pub struct ImportCoordinatorBuilder {
    store: CatalogStore,
    config: ImportConfig,
}

impl ImportCoordinatorBuilder {
    /// Create a new builder with default settings
    pub fn new(store: CatalogStore) -> Self {
        Self {
            store,
            config: ImportConfig::default(),
        }
    }

    /// Set import configuration
    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    /// Set batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Set checkpoint interval (records)
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.config.checkpoint_interval = interval;
        self
    }

    /// Set parser worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.workers = Some(workers);
        self
    }

    /// Set queue capacities for both pipeline queues
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.line_queue_capacity = capacity;
        self.config.entry_queue_capacity = capacity;
        self
    }

    /// Set maximum accepted line length
    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.config.max_line_bytes = max;
        self
    }

    /// Set disk sync policy
    pub fn with_sync(mut self, sync: SyncPolicy) -> Self {
        self.config.sync = sync;
        self
    }

    /// Build the coordinator
    pub fn build(self) -> ImportCoordinator {
        ImportCoordinator::new(self.store, self.config)
    }
}
