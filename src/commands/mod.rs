//! Subcommand implementations

pub mod import;
pub mod init;
pub mod lookup;
pub mod status;

use anyhow::Result;
use olindex::{config::Config, CatalogStore};

/// Open the configured store for reading; refuses to create an empty one
pub(crate) fn open_existing_store(config: &Config) -> Result<CatalogStore> {
    let path = config.store_path();
    if !path.exists() {
        anyhow::bail!(
            "No catalog store at {}. Run `olindex import` first.",
            path.display()
        );
    }
    Ok(CatalogStore::open(&path)?)
}
