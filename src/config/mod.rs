//! Configuration for olindex

mod import;
mod logging;
mod store;

pub use import::{ImportConfig, SyncPolicy};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use store::{DumpsConfig, StoreConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for a single line; dump rows are far below this
const MAX_LINE_BYTES_LIMIT: usize = 1024 * 1024 * 1024;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog store location
    pub store: StoreConfig,
    /// Dump file location
    pub dumps: DumpsConfig,
    /// Import pipeline tuning
    pub import: ImportConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML, e.g. for `olindex init`
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Path of the catalog store
    pub fn store_path(&self) -> PathBuf {
        self.store.store_path()
    }

    /// Directory holding the dump files
    pub fn dump_dir(&self) -> PathBuf {
        self.dumps.resolve_dir(&self.store)
    }

    /// Validate all configuration fields, reporting every problem at once
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.store.data_dir.as_os_str().is_empty() {
            errors.push("store.data_dir must not be empty".to_string());
        }
        if let Some(dir) = &self.dumps.dir {
            if dir.as_os_str().is_empty() {
                errors.push("dumps.dir must not be empty when set".to_string());
            }
        }

        let import = &self.import;
        if import.batch_size == 0 {
            errors.push("import.batch_size must be positive".to_string());
        }
        if import.checkpoint_interval == 0 {
            errors.push("import.checkpoint_interval must be positive".to_string());
        }
        if import.checkpoint_interval < import.batch_size {
            errors.push(format!(
                "import.checkpoint_interval ({}) must be at least import.batch_size ({})",
                import.checkpoint_interval, import.batch_size
            ));
        }
        if import.workers == Some(0) {
            errors.push("import.workers must be positive when set".to_string());
        }
        if import.line_queue_capacity == 0 {
            errors.push("import.line_queue_capacity must be positive".to_string());
        }
        if import.entry_queue_capacity == 0 {
            errors.push("import.entry_queue_capacity must be positive".to_string());
        }
        if import.read_buffer_bytes == 0 {
            errors.push("import.read_buffer_bytes must be positive".to_string());
        }
        if import.max_line_bytes == 0 {
            errors.push("import.max_line_bytes must be positive".to_string());
        }
        if import.max_line_bytes > MAX_LINE_BYTES_LIMIT {
            errors.push(format!(
                "import.max_line_bytes must be <= {}",
                MAX_LINE_BYTES_LIMIT
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(valid_config().validate().is_ok(), "default config should be valid");
    }

    #[test]
    fn default_import_config_values() {
        let import = ImportConfig::default();
        assert_eq!(import.batch_size, 5_000);
        assert_eq!(import.checkpoint_interval, 50_000);
        assert_eq!(import.line_queue_capacity, 1_000);
        assert_eq!(import.entry_queue_capacity, 1_000);
        assert_eq!(import.read_buffer_bytes, 4 * 1024 * 1024);
        assert_eq!(import.max_line_bytes, 16 * 1024 * 1024);
        assert_eq!(import.sync, SyncPolicy::OnCheckpoint);
        assert!(import.workers.is_none());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut cfg = valid_config();
        cfg.import.batch_size = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("import.batch_size must be positive"));
    }

    #[test]
    fn validate_rejects_checkpoint_below_batch() {
        let mut cfg = valid_config();
        cfg.import.batch_size = 100;
        cfg.import.checkpoint_interval = 10;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("must be at least import.batch_size"));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut cfg = valid_config();
        cfg.import.workers = Some(0);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("import.workers must be positive"));
    }

    #[test]
    fn validate_rejects_empty_data_dir() {
        let mut cfg = valid_config();
        cfg.store.data_dir = PathBuf::from("");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("store.data_dir must not be empty"));
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut cfg = valid_config();
        cfg.import.line_queue_capacity = 0;
        cfg.import.entry_queue_capacity = 0;
        cfg.import.max_line_bytes = 0;
        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("import.line_queue_capacity must be positive"));
        assert!(msg.contains("import.entry_queue_capacity must be positive"));
        assert!(msg.contains("import.max_line_bytes must be positive"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [store]
            data_dir = "/var/lib/olindex"

            [import]
            workers = 4
            sync = "never"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.store_path(), PathBuf::from("/var/lib/olindex/catalog"));
        assert_eq!(cfg.dump_dir(), PathBuf::from("/var/lib/olindex/dumps"));
        assert_eq!(cfg.import.worker_count(), 4);
        assert_eq!(cfg.import.sync, SyncPolicy::Never);
        assert_eq!(cfg.import.batch_size, 5_000);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(cfg.logging.level, LogLevel::Info);
    }

    #[test]
    fn toml_round_trip_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = valid_config();
        cfg.store.data_dir = tmp.path().join("data");
        cfg.dumps.dir = Some(tmp.path().join("downloads"));

        let path = tmp.path().join("olindex.toml");
        std::fs::write(&path, cfg.to_toml().unwrap()).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.store.data_dir, cfg.store.data_dir);
        assert_eq!(loaded.dump_dir(), tmp.path().join("downloads"));
    }

    #[test]
    fn load_reports_invalid_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "[import]\nbatch_size = 0\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("import.batch_size must be positive"));
    }
}
