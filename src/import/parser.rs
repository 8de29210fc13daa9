//! Dump row parsing and the parser worker pool

use super::cancel::CancelSignal;
use super::lines::RawLine;
use super::source::DumpCategory;
use crate::index::keys;
use crate::types::{Author, Edition, Work};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};

/// Columns per dump row: type, key, revision, last_modified, json
const COLUMNS: usize = 5;

/// Why a row was skipped
#[derive(Debug, Error)]
pub enum MalformedRow {
    #[error("expected 5 tab-separated columns, found {0}")]
    ColumnCount(usize),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record has no key")]
    MissingKey,
}

/// Key/value writes produced by one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexEntry {
    /// Primary pair first, then secondary index pairs
    pub pairs: Vec<(Vec<u8>, Vec<u8>)>,
}

impl IndexEntry {
    fn with_primary(key: Vec<u8>, payload: &[u8]) -> Self {
        Self {
            pairs: vec![(key, payload.to_vec())],
        }
    }

    fn secondary(&mut self, index_key: Vec<u8>, natural_key: &str) {
        self.pairs.push((index_key, natural_key.as_bytes().to_vec()));
    }
}

/// A parsed line on its way to the writer; `entry` is `None` for malformed rows
#[derive(Debug)]
pub struct ParsedLine {
    pub number: u64,
    pub offset: u64,
    pub entry: Option<IndexEntry>,
}

/// Parse one dump row into the writes it produces
pub fn parse_line(category: DumpCategory, line: &[u8]) -> Result<IndexEntry, MalformedRow> {
    let columns: Vec<&[u8]> = line.splitn(COLUMNS, |b| *b == b'\t').collect();
    if columns.len() != COLUMNS {
        return Err(MalformedRow::ColumnCount(columns.len()));
    }
    let payload = columns[COLUMNS - 1];

    match category {
        DumpCategory::Editions => {
            let edition: Edition = serde_json::from_slice(payload)?;
            let key = non_empty_key(&edition.key)?;
            let mut entry = IndexEntry::with_primary(keys::edition(key), payload);
            for isbn in edition.isbn_10.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
                entry.secondary(keys::isbn10(isbn), key);
            }
            for isbn in edition.isbn_13.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
                entry.secondary(keys::isbn13(isbn), key);
            }
            Ok(entry)
        }
        DumpCategory::Works => {
            let work: Work = serde_json::from_slice(payload)?;
            let key = non_empty_key(&work.key)?;
            let mut entry = IndexEntry::with_primary(keys::work(key), payload);
            let title = keys::normalize_for_index(&work.title);
            if !title.is_empty() {
                entry.secondary(keys::work_title(&title), key);
            }
            Ok(entry)
        }
        DumpCategory::Authors => {
            let author: Author = serde_json::from_slice(payload)?;
            let key = non_empty_key(&author.key)?;
            let mut entry = IndexEntry::with_primary(keys::author(key), payload);
            let name = keys::normalize_for_index(&author.name);
            if !name.is_empty() {
                entry.secondary(keys::author_name(&name), key);
            }
            Ok(entry)
        }
    }
}

fn non_empty_key(key: &str) -> Result<&str, MalformedRow> {
    if key.is_empty() {
        Err(MalformedRow::MissingKey)
    } else {
        Ok(key)
    }
}

/// Parser worker: pull lines from the shared queue until it closes, the
/// writer goes away, or the import is cancelled.
pub async fn run_worker(
    id: usize,
    category: DumpCategory,
    lines: Arc<Mutex<mpsc::Receiver<RawLine>>>,
    entries: mpsc::Sender<ParsedLine>,
    mut cancel: CancelSignal,
) {
    let mut parsed = 0u64;

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = async { lines.lock().await.recv().await } => match line {
                Some(line) => line,
                None => break,
            },
        };

        let entry = match parse_line(category, &line.bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                trace!("Skipping malformed {} row {}: {}", category, line.number, e);
                None
            }
        };

        let out = ParsedLine {
            number: line.number,
            offset: line.offset,
            entry,
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = entries.send(out) => {
                if sent.is_err() {
                    break;
                }
            }
        }
        parsed += 1;
    }

    debug!("Parser worker {} finished after {} lines", id, parsed);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, key: &str, json: &str) -> Vec<u8> {
        format!("{kind}\t{key}\t1\t2024-01-01T00:00:00\t{json}").into_bytes()
    }

    fn keys_of(entry: &IndexEntry) -> Vec<String> {
        entry
            .pairs
            .iter()
            .map(|(k, _)| String::from_utf8(k.clone()).unwrap())
            .collect()
    }

    #[test]
    fn test_parse_edition() {
        let json = r#"{"key":"/books/OL1M","title":"Test Book","isbn_10":["0000000001"],"isbn_13":[" 9780000000001 ",""]}"#;
        let entry = parse_line(DumpCategory::Editions, &row("/type/edition", "/books/OL1M", json)).unwrap();

        assert_eq!(
            keys_of(&entry),
            vec![
                "ol:edition:/books/OL1M",
                "ol:edition:isbn10:0000000001",
                "ol:edition:isbn13:9780000000001",
            ]
        );
        // Primary value is the raw payload, secondaries point at the key
        assert_eq!(entry.pairs[0].1, json.as_bytes());
        assert_eq!(entry.pairs[1].1, b"/books/OL1M");
        assert_eq!(entry.pairs[2].1, b"/books/OL1M");
    }

    #[test]
    fn test_parse_work_and_author_secondaries() {
        let work = parse_line(
            DumpCategory::Works,
            &row("/type/work", "/works/OL1W", r#"{"key":"/works/OL1W","title":"  The Hobbit "}"#),
        )
        .unwrap();
        assert_eq!(keys_of(&work), vec!["ol:work:/works/OL1W", "ol:work:title:the hobbit"]);

        let author = parse_line(
            DumpCategory::Authors,
            &row("/type/author", "/authors/OL1A", r#"{"key":"/authors/OL1A","name":"Jane Doe"}"#),
        )
        .unwrap();
        assert_eq!(
            keys_of(&author),
            vec!["ol:author:/authors/OL1A", "ol:author:name:jane doe"]
        );

        let untitled = parse_line(
            DumpCategory::Works,
            &row("/type/work", "/works/OL2W", r#"{"key":"/works/OL2W"}"#),
        )
        .unwrap();
        assert_eq!(untitled.pairs.len(), 1);
    }

    #[test]
    fn test_json_with_tabs_stays_in_last_column() {
        let json = "{\"key\":\"/works/OL3W\",\t\"title\":\"Tabbed\"}";
        let entry = parse_line(DumpCategory::Works, &row("/type/work", "/works/OL3W", json)).unwrap();
        assert_eq!(entry.pairs[0].1, json.as_bytes());
    }

    #[test]
    fn test_malformed_rows() {
        assert!(matches!(
            parse_line(DumpCategory::Editions, b"only\tthree\tcolumns"),
            Err(MalformedRow::ColumnCount(3))
        ));
        assert!(matches!(
            parse_line(DumpCategory::Editions, &row("/type/edition", "/books/X", "{broken")),
            Err(MalformedRow::Json(_))
        ));
        assert!(matches!(
            parse_line(DumpCategory::Authors, &row("/type/author", "", r#"{"name":"No Key"}"#)),
            Err(MalformedRow::MissingKey)
        ));
        assert!(matches!(
            parse_line(DumpCategory::Works, b""),
            Err(MalformedRow::ColumnCount(1))
        ));
    }

    #[test]
    fn test_null_fields_are_not_malformed() {
        let json = r#"{"key":"/books/OL1M","title":null,"isbn_10":null,"isbn_13":["9780000000001",null],"covers":[null]}"#;
        let entry = parse_line(DumpCategory::Editions, &row("/type/edition", "/books/OL1M", json)).unwrap();
        assert_eq!(
            keys_of(&entry),
            vec!["ol:edition:/books/OL1M", "ol:edition:isbn13:9780000000001"]
        );

        let work = parse_line(
            DumpCategory::Works,
            &row("/type/work", "/works/OL1W", r#"{"key":"/works/OL1W","title":"Dune","authors":null}"#),
        )
        .unwrap();
        assert_eq!(keys_of(&work), vec!["ol:work:/works/OL1W", "ol:work:title:dune"]);

        let author = parse_line(
            DumpCategory::Authors,
            &row("/type/author", "/authors/OL1A", r#"{"key":"/authors/OL1A","name":null,"birth_date":null}"#),
        )
        .unwrap();
        assert_eq!(keys_of(&author), vec!["ol:author:/authors/OL1A"]);

        // A null key is still a missing key
        assert!(matches!(
            parse_line(DumpCategory::Works, &row("/type/work", "", r#"{"key":null,"title":"X"}"#)),
            Err(MalformedRow::MissingKey)
        ));
    }

    #[tokio::test]
    async fn test_worker_drains_queue() {
        let (line_tx, line_rx) = mpsc::channel(8);
        let (entry_tx, mut entry_rx) = mpsc::channel(8);
        let line_rx = Arc::new(Mutex::new(line_rx));

        let worker = tokio::spawn(run_worker(
            0,
            DumpCategory::Works,
            line_rx,
            entry_tx,
            CancelSignal::never(),
        ));

        line_tx
            .send(RawLine {
                number: 0,
                offset: 10,
                bytes: row("/type/work", "/works/OL1W", r#"{"key":"/works/OL1W","title":"A"}"#),
            })
            .await
            .unwrap();
        line_tx
            .send(RawLine {
                number: 1,
                offset: 20,
                bytes: b"garbage".to_vec(),
            })
            .await
            .unwrap();
        drop(line_tx);

        let first = entry_rx.recv().await.unwrap();
        assert_eq!(first.number, 0);
        assert!(first.entry.is_some());
        let second = entry_rx.recv().await.unwrap();
        assert_eq!(second.number, 1);
        assert!(second.entry.is_none());

        worker.await.unwrap();
        assert!(entry_rx.recv().await.is_none());
    }
}
