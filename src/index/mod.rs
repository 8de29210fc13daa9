//! Catalog index over an embedded ordered key-value store
//!
//! Features:
//! - Flat prefix-namespaced keyspace (see [`keys`])
//! - ISBN, title-prefix, natural-key and author-name lookups
//! - Per-category import status ledger with resume decisions

pub mod keys;
mod status;
mod storage;

pub use status::*;
pub use storage::*;
