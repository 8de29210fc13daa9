//! Catalog store and read-side lookups
//!
//! Uses a sled embedded database: lock-free concurrent readers alongside a
//! single writer, so lookups are served while an import is committing.

use super::keys;
use crate::types::{Author, Edition, Work};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of works resolved by a title search
pub const TITLE_SEARCH_LIMIT: usize = 10;

/// Errors opening or maintaining the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open catalog store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: sled::Error,
    },

    #[error("store error: {0}")]
    Db(#[from] sled::Error),

    #[error("corrupt status record: {0}")]
    Status(#[from] serde_json::Error),
}

/// Lookup failures. `NotFound` is an expected outcome and is kept apart
/// from store and decoding failures.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    #[error("failed to decode {kind} {key}: {source}")]
    Decode {
        kind: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("index entry {index_key} does not hold a UTF-8 key")]
    InvalidIndexEntry { index_key: String },
}

impl LookupError {
    /// Returns `true` when the lookup simply found nothing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Embedded key-value index of catalog dump records
#[derive(Clone)]
pub struct CatalogStore {
    db: sled::Db,
    /// Serializes imports so only one writer touches the store at a time
    import_lock: Arc<tokio::sync::Mutex<()>>,
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore").finish_non_exhaustive()
    }
}

impl CatalogStore {
    /// Open or create the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Opened catalog store at {}", path.display());

        Ok(Self {
            db,
            import_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Total number of keys (primary, secondary and meta)
    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Approximate on-disk size in bytes
    pub fn size_on_disk(&self) -> Result<u64, StoreError> {
        Ok(self.db.size_on_disk()?)
    }

    pub(crate) fn db(&self) -> &sled::Db {
        &self.db
    }

    pub(crate) fn import_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.import_lock
    }

    /// Find an edition by ISBN.
    ///
    /// A 10-character input tries the ISBN-10 index first; anything else tries
    /// ISBN-13 first. Either way the other index is the fallback.
    pub fn lookup_by_isbn(&self, isbn: &str) -> Result<Edition, LookupError> {
        let isbn = isbn.trim();

        let candidates = if isbn.chars().count() == 10 {
            [keys::isbn10(isbn), keys::isbn13(isbn)]
        } else {
            [keys::isbn13(isbn), keys::isbn10(isbn)]
        };

        for index_key in candidates {
            if let Some(edition_key) = self.resolve(&index_key)? {
                return self.lookup_edition(&edition_key);
            }
        }

        Err(LookupError::NotFound {
            kind: "ISBN",
            key: isbn.to_string(),
        })
    }

    /// Search works by normalized title prefix.
    ///
    /// Returns at most [`TITLE_SEARCH_LIMIT`] edition-shaped results built
    /// from the matching works. An empty query returns nothing.
    pub fn search_by_title(&self, title: &str) -> Result<Vec<Edition>, LookupError> {
        let normalized = keys::normalize_for_index(title);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        let (lower, upper) = keys::title_scan_bounds(&normalized);
        let mut results = Vec::new();

        for item in self.db.range(lower..upper) {
            if results.len() >= TITLE_SEARCH_LIMIT {
                break;
            }
            let (index_key, value) = item?;
            let work_key = decode_index_value(&index_key, &value)?;

            match self.lookup_work(&work_key) {
                Ok(work) => results.push(Edition::from_work(&work)),
                Err(e) if e.is_not_found() => {
                    debug!("Title index points at missing work {}", work_key);
                }
                Err(LookupError::Decode { key, source, .. }) => {
                    warn!("Skipping undecodable work {}: {}", key, source);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(results)
    }

    /// Fetch an edition by natural key
    pub fn lookup_edition(&self, key: &str) -> Result<Edition, LookupError> {
        self.get_record("edition", key, &keys::edition(key))
    }

    /// Fetch a work by natural key
    pub fn lookup_work(&self, key: &str) -> Result<Work, LookupError> {
        self.get_record("work", key, &keys::work(key))
    }

    /// Fetch an author by natural key
    pub fn lookup_author(&self, key: &str) -> Result<Author, LookupError> {
        self.get_record("author", key, &keys::author(key))
    }

    /// Fetch an author by display name (case and surrounding whitespace ignored)
    pub fn lookup_author_by_name(&self, name: &str) -> Result<Author, LookupError> {
        let normalized = keys::normalize_for_index(name);
        if !normalized.is_empty() {
            if let Some(author_key) = self.resolve(&keys::author_name(&normalized))? {
                return self.lookup_author(&author_key);
            }
        }

        Err(LookupError::NotFound {
            kind: "author name",
            key: name.trim().to_string(),
        })
    }

    /// Follow a secondary index entry to the natural key it points at
    fn resolve(&self, index_key: &[u8]) -> Result<Option<String>, LookupError> {
        match self.db.get(index_key)? {
            Some(value) => decode_index_value(index_key, &value).map(Some),
            None => Ok(None),
        }
    }

    fn get_record<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        key: &str,
        db_key: &[u8],
    ) -> Result<T, LookupError> {
        let data = self.db.get(db_key)?.ok_or_else(|| LookupError::NotFound {
            kind,
            key: key.to_string(),
        })?;

        serde_json::from_slice(&data).map_err(|source| LookupError::Decode {
            kind,
            key: key.to_string(),
            source,
        })
    }
}

fn decode_index_value(index_key: &[u8], value: &[u8]) -> Result<String, LookupError> {
    String::from_utf8(value.to_vec()).map_err(|_| LookupError::InvalidIndexEntry {
        index_key: String::from_utf8_lossy(index_key).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn put(store: &CatalogStore, key: Vec<u8>, value: &str) {
        store.db().insert(key, value.as_bytes()).unwrap();
    }

    #[test]
    fn test_isbn_lookup_order_and_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_dir.path().join("db")).unwrap();

        put(&store, keys::edition("/books/OL1M"), r#"{"key":"/books/OL1M","title":"Ten"}"#);
        put(&store, keys::edition("/books/OL2M"), r#"{"key":"/books/OL2M","title":"Thirteen"}"#);
        put(&store, keys::isbn10("0000000001"), "/books/OL1M");
        put(&store, keys::isbn13("0000000001"), "/books/OL2M");
        put(&store, keys::isbn10("9780000000003"), "/books/OL1M");

        // 10 characters: ISBN-10 index wins
        assert_eq!(store.lookup_by_isbn("0000000001").unwrap().title, "Ten");
        // Anything else falls back to ISBN-10 when the ISBN-13 index misses
        assert_eq!(store.lookup_by_isbn(" 9780000000003 ").unwrap().title, "Ten");

        let err = store.lookup_by_isbn("9999999999999").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_isbn_length_counts_characters() {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_dir.path().join("db")).unwrap();

        // 10 characters, 11 bytes
        let isbn = "000000000é";
        put(&store, keys::edition("/books/OL1M"), r#"{"key":"/books/OL1M","title":"Ten"}"#);
        put(&store, keys::edition("/books/OL2M"), r#"{"key":"/books/OL2M","title":"Thirteen"}"#);
        put(&store, keys::isbn10(isbn), "/books/OL1M");
        put(&store, keys::isbn13(isbn), "/books/OL2M");

        assert_eq!(store.lookup_by_isbn(isbn).unwrap().title, "Ten");
    }

    #[test]
    fn test_dangling_index_entry_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_dir.path().join("db")).unwrap();

        put(&store, keys::isbn13("9780000000009"), "/books/MISSING");
        let err = store.lookup_by_isbn("9780000000009").unwrap_err();
        assert!(matches!(err, LookupError::NotFound { kind: "edition", .. }));
    }

    #[test]
    fn test_corrupt_record_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_dir.path().join("db")).unwrap();

        put(&store, keys::work("/works/BAD"), "{not json");
        let err = store.lookup_work("/works/BAD").unwrap_err();
        assert!(!err.is_not_found());
        assert!(matches!(err, LookupError::Decode { kind: "work", .. }));
    }

    #[test]
    fn test_search_by_title_prefix_and_limit() {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_dir.path().join("db")).unwrap();

        for i in 0..15 {
            let key = format!("/works/OL{}W", i);
            let title = format!("Saga Volume {:02}", i);
            put(
                &store,
                keys::work(&key),
                &format!(r#"{{"key":"{}","title":"{}"}}"#, key, title),
            );
            put(&store, keys::work_title(&keys::normalize_for_index(&title)), &key);
        }
        put(&store, keys::work("/works/OTHER"), r#"{"key":"/works/OTHER","title":"Sagas"}"#);
        put(&store, keys::work_title("sagas"), "/works/OTHER");

        let results = store.search_by_title("  SAGA VOLUME ").unwrap();
        assert_eq!(results.len(), TITLE_SEARCH_LIMIT);
        assert!(results.iter().all(|e| e.title.starts_with("Saga Volume")));

        assert!(store.search_by_title("   ").unwrap().is_empty());
        assert!(store.search_by_title("nonexistent book xyz").unwrap().is_empty());
    }

    #[test]
    fn test_lookup_author_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_dir.path().join("db")).unwrap();

        put(&store, keys::author("/authors/OL1A"), r#"{"key":"/authors/OL1A","name":"Jane Doe"}"#);
        put(&store, keys::author_name("jane doe"), "/authors/OL1A");

        assert_eq!(store.lookup_author_by_name(" JANE doe").unwrap().key, "/authors/OL1A");
        assert!(store.lookup_author_by_name("John Roe").unwrap_err().is_not_found());
        assert!(store.lookup_author_by_name("").unwrap_err().is_not_found());
    }
}
