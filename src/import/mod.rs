//! Bulk import of gzip-compressed catalog dumps
//!
//! # Example Usage
//!
//! ```no_run
//! use olindex::import::{CancelHandle, DumpCategory, ImportCoordinatorBuilder};
//! use olindex::index::CatalogStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CatalogStore::open("catalog")?;
//! let coordinator = ImportCoordinatorBuilder::new(store.clone())
//!     .with_batch_size(5_000)
//!     .build();
//!
//! let cancel = CancelHandle::new();
//! let category: DumpCategory = "editions".parse()?;
//! let stats = coordinator
//!     .import(category, category.dump_filename(), cancel.signal(), |tick| {
//!         println!("{} records ({:.0}%)", tick.records, tick.progress * 100.0);
//!     })
//!     .await?;
//! println!("Imported {} records", stats.records_imported);
//!
//! let edition = store.lookup_by_isbn("9780000000001")?;
//! println!("{}", edition.title);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  lines  ┌──────────────────┐ entries ┌──────────────┐
//! │ LineSource   │ ──────▶ │ parser workers   │ ──────▶ │ IndexWriter  │
//! │ (blocking,   │ bounded │ (N tasks, shared │ bounded │ (single,     │
//! │  gzip)       │  queue  │  receiver)       │  queue  │  batched)    │
//! └──────────────┘         └──────────────────┘         └──────────────┘
//!                                                              │
//!                                              commit, then checkpoint
//!                                                              ▼
//!                                                       ┌──────────────┐
//!                                                       │ CatalogStore │
//!                                                       └──────────────┘
//! ```
//!
//! Every stage observes the same [`CancelSignal`]. The writer only ever
//! checkpoints lines whose records are committed, so a crashed or cancelled
//! import resumes without losing data.

mod cancel;
pub mod coordinator;
pub mod lines;
pub mod parser;
pub mod progress;
pub mod source;
mod writer;

// Re-export main types
pub use cancel::{CancelHandle, CancelSignal};
pub use coordinator::{ImportCoordinator, ImportCoordinatorBuilder};
pub use lines::{LineSource, RawLine};
pub use parser::{parse_line, IndexEntry, MalformedRow};
pub use progress::{print_summary, ImportProgress};
pub use source::{DumpCategory, ImportError, ImportStats, ImportTick};
