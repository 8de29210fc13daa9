//! Import pipeline tuning

use serde::{Deserialize, Serialize};

/// When the writer forces store contents to disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Flush after every checkpoint and at completion
    #[default]
    OnCheckpoint,
    /// Leave flushing to the store's background flusher
    Never,
}

/// Import pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Records per committed write batch
    pub batch_size: usize,
    /// Records between persisted checkpoints
    pub checkpoint_interval: usize,
    /// Parser workers; defaults to the host's available parallelism (at least 2)
    pub workers: Option<usize>,
    /// Capacity of the reader -> parser queue
    pub line_queue_capacity: usize,
    /// Capacity of the parser -> writer queue
    pub entry_queue_capacity: usize,
    /// Decompressed read buffer size
    pub read_buffer_bytes: usize,
    /// Longest accepted line; longer lines abort the import
    pub max_line_bytes: usize,
    pub sync: SyncPolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 5_000,
            checkpoint_interval: 50_000,
            workers: None,
            line_queue_capacity: 1_000,
            entry_queue_capacity: 1_000,
            read_buffer_bytes: 4 * 1024 * 1024,
            max_line_bytes: 16 * 1024 * 1024,
            sync: SyncPolicy::OnCheckpoint,
        }
    }
}

impl ImportConfig {
    /// Effective parser worker count
    pub fn worker_count(&self) -> usize {
        match self.workers {
            Some(n) => n.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .max(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count() {
        let mut config = ImportConfig::default();
        assert!(config.worker_count() >= 2);

        config.workers = Some(1);
        assert_eq!(config.worker_count(), 1);

        config.workers = Some(0);
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn test_sync_policy_names() {
        let config: ImportConfig = toml::from_str("sync = \"never\"").unwrap();
        assert_eq!(config.sync, SyncPolicy::Never);
        let config: ImportConfig = toml::from_str("sync = \"on_checkpoint\"").unwrap();
        assert_eq!(config.sync, SyncPolicy::OnCheckpoint);
        assert_eq!(config.batch_size, 5_000);
    }
}
