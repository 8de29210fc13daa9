//! olindex: offline index of bulk catalog dumps
//!
//! Imports the periodically published catalog exports (editions, works,
//! authors) into an embedded ordered key-value store and serves metadata
//! lookups from it without a network round-trip:
//! - Streaming gzip decompression with bounded memory
//! - Parallel record parsing feeding a single batched writer
//! - Crash-resumable checkpoints stored next to the data
//! - ISBN, title and natural-key lookups, safe during an import

pub mod config;
pub mod import;
pub mod index;
pub mod types;
pub mod util;

pub use config::Config;
pub use import::{
    CancelHandle, CancelSignal, DumpCategory, ImportCoordinator, ImportCoordinatorBuilder,
    ImportError, ImportStats, ImportTick,
};
pub use index::{CatalogStore, DumpStatus, DumpTypeStatus, LookupError, StoreError};
pub use types::*;
