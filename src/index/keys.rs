//! Key layout of the flat ordered keyspace
//!
//! Every record lives in a single sled tree, namespaced by string prefix:
//!
//! ```text
//! ol:edition:<key>               -> edition JSON
//! ol:edition:isbn10:<isbn>       -> edition key
//! ol:edition:isbn13:<isbn>       -> edition key
//! ol:work:<key>                  -> work JSON
//! ol:work:title:<normalized>     -> work key
//! ol:author:<key>                -> author JSON
//! ol:author:name:<normalized>    -> author key
//! ol:meta:status                 -> import status JSON
//! ```
//!
//! Natural keys start with `/` (`/books/OL1M`), so primary keys never collide
//! with the secondary namespaces that share their prefix.

pub const PREFIX_EDITION: &str = "ol:edition:";
pub const PREFIX_EDITION_ISBN10: &str = "ol:edition:isbn10:";
pub const PREFIX_EDITION_ISBN13: &str = "ol:edition:isbn13:";
pub const PREFIX_WORK: &str = "ol:work:";
pub const PREFIX_WORK_TITLE: &str = "ol:work:title:";
pub const PREFIX_AUTHOR: &str = "ol:author:";
pub const PREFIX_AUTHOR_NAME: &str = "ol:author:name:";
pub const META_STATUS: &str = "ol:meta:status";

/// Normalize a title or name for secondary indexing (trim + lowercase)
pub fn normalize_for_index(s: &str) -> String {
    s.trim().to_lowercase()
}

fn prefixed(prefix: &str, suffix: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + suffix.len());
    key.extend_from_slice(prefix.as_bytes());
    key.extend_from_slice(suffix.as_bytes());
    key
}

pub fn edition(key: &str) -> Vec<u8> {
    prefixed(PREFIX_EDITION, key)
}

pub fn isbn10(isbn: &str) -> Vec<u8> {
    prefixed(PREFIX_EDITION_ISBN10, isbn)
}

pub fn isbn13(isbn: &str) -> Vec<u8> {
    prefixed(PREFIX_EDITION_ISBN13, isbn)
}

pub fn work(key: &str) -> Vec<u8> {
    prefixed(PREFIX_WORK, key)
}

/// Title index key; `normalized` must already be normalized
pub fn work_title(normalized: &str) -> Vec<u8> {
    prefixed(PREFIX_WORK_TITLE, normalized)
}

pub fn author(key: &str) -> Vec<u8> {
    prefixed(PREFIX_AUTHOR, key)
}

/// Author name index key; `normalized` must already be normalized
pub fn author_name(normalized: &str) -> Vec<u8> {
    prefixed(PREFIX_AUTHOR_NAME, normalized)
}

/// Half-open range covering every title key starting with `normalized`
pub fn title_scan_bounds(normalized: &str) -> (Vec<u8>, Vec<u8>) {
    let lower = work_title(normalized);
    let mut upper = lower.clone();
    upper.push(0xff);
    (lower, upper)
}
