//! Per-category import status, persisted under `ol:meta:status`

use super::keys::META_STATUS;
use super::storage::{CatalogStore, StoreError};
use crate::import::DumpCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Import progress for one dump category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpTypeStatus {
    /// Records committed to the store
    pub record_count: u64,
    /// Every line below this number is committed or was malformed
    pub lines_processed: u64,
    /// Size of the compressed dump file this status describes
    pub file_size: u64,
    /// Fraction in `[0.0, 1.0]`; exactly `1.0` once the whole file is in
    pub import_progress: f64,
    pub malformed_rows: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl DumpTypeStatus {
    pub fn is_complete(&self) -> bool {
        self.import_progress >= 1.0
    }

    /// Status written at the start of a fresh import
    pub fn started(file_size: u64) -> Self {
        Self {
            file_size,
            last_updated: Some(Utc::now()),
            ..Default::default()
        }
    }
}

/// Status of all three categories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpStatus {
    pub editions: DumpTypeStatus,
    pub authors: DumpTypeStatus,
    pub works: DumpTypeStatus,
}

impl DumpStatus {
    pub fn get(&self, category: DumpCategory) -> &DumpTypeStatus {
        match category {
            DumpCategory::Editions => &self.editions,
            DumpCategory::Authors => &self.authors,
            DumpCategory::Works => &self.works,
        }
    }

    pub fn get_mut(&mut self, category: DumpCategory) -> &mut DumpTypeStatus {
        match category {
            DumpCategory::Editions => &mut self.editions,
            DumpCategory::Authors => &mut self.authors,
            DumpCategory::Works => &mut self.works,
        }
    }
}

/// What an import run should do given the recorded status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePlan {
    /// Same file, fully imported: nothing to do
    AlreadyComplete { record_count: u64 },
    /// Same file, partially imported: skip the already-committed lines
    Resume { skip_lines: u64, record_count: u64 },
    /// Different or unknown file: start over
    Fresh,
}

impl ResumePlan {
    pub fn decide(status: &DumpTypeStatus, file_size: u64) -> Self {
        if status.file_size != file_size {
            return Self::Fresh;
        }

        if status.is_complete() {
            Self::AlreadyComplete {
                record_count: status.record_count,
            }
        } else if status.lines_processed > 0 {
            Self::Resume {
                skip_lines: status.lines_processed,
                record_count: status.record_count,
            }
        } else {
            Self::Fresh
        }
    }
}

impl CatalogStore {
    /// Current import status; all zeros when nothing has been imported
    pub fn status(&self) -> Result<DumpStatus, StoreError> {
        match self.db().get(META_STATUS)? {
            Some(data) => Ok(serde_json::from_slice(&data)?),
            None => Ok(DumpStatus::default()),
        }
    }

    /// Replace the status of one category, leaving the others intact.
    ///
    /// Callers hold the import lock, which keeps this read-modify-write from
    /// racing another import.
    pub(crate) fn write_category_status(
        &self,
        category: DumpCategory,
        status: DumpTypeStatus,
    ) -> Result<(), StoreError> {
        let mut all = self.status()?;
        *all.get_mut(category) = status;
        let data = serde_json::to_vec(&all)?;
        self.db().insert(META_STATUS, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn partial(file_size: u64, lines: u64, progress: f64) -> DumpTypeStatus {
        DumpTypeStatus {
            record_count: lines,
            lines_processed: lines,
            file_size,
            import_progress: progress,
            ..Default::default()
        }
    }

    #[test]
    fn test_resume_plan() {
        assert_eq!(
            ResumePlan::decide(&partial(100, 10, 1.0), 100),
            ResumePlan::AlreadyComplete { record_count: 10 }
        );
        assert_eq!(
            ResumePlan::decide(&partial(100, 10, 0.4), 100),
            ResumePlan::Resume {
                skip_lines: 10,
                record_count: 10
            }
        );
        // Stale file: size changed
        assert_eq!(ResumePlan::decide(&partial(100, 10, 1.0), 101), ResumePlan::Fresh);
        assert_eq!(ResumePlan::decide(&partial(100, 10, 0.4), 99), ResumePlan::Fresh);
        // Started but nothing committed yet
        assert_eq!(ResumePlan::decide(&partial(100, 0, 0.0), 100), ResumePlan::Fresh);
        // Never imported
        assert_eq!(ResumePlan::decide(&DumpTypeStatus::default(), 100), ResumePlan::Fresh);
    }

    #[test]
    fn test_status_defaults_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_dir.path().join("db")).unwrap();

        let status = store.status().unwrap();
        assert_eq!(status, DumpStatus::default());
        assert_eq!(status.editions.import_progress, 0.0);
    }

    #[test]
    fn test_write_category_status_keeps_others() {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_dir.path().join("db")).unwrap();

        store
            .write_category_status(DumpCategory::Authors, partial(10, 5, 1.0))
            .unwrap();
        store
            .write_category_status(DumpCategory::Works, partial(20, 3, 0.5))
            .unwrap();

        let status = store.status().unwrap();
        assert_eq!(status.authors.record_count, 5);
        assert_eq!(status.works.file_size, 20);
        assert_eq!(status.editions, DumpTypeStatus::default());
    }

    #[test]
    fn test_status_json_field_names() {
        let json = serde_json::to_value(DumpStatus::default()).unwrap();
        for category in ["editions", "authors", "works"] {
            let entry = &json[category];
            for field in [
                "record_count",
                "lines_processed",
                "file_size",
                "import_progress",
                "last_updated",
                "malformed_rows",
            ] {
                assert!(entry.get(field).is_some(), "missing {category}.{field}");
            }
        }
    }
}
