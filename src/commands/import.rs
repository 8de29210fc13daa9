use anyhow::{Context, Result};
use olindex::{
    config::Config,
    import::{print_summary, ImportProgress},
    CancelHandle, CatalogStore, DumpCategory, ImportCoordinator,
};
use std::path::PathBuf;
use tracing::{info, warn};

pub async fn import_dumps(
    config: Config,
    category: Option<String>,
    file: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    // Reject an unknown category before touching the store
    let explicit = category.is_some() || file.is_some();
    let categories = match category {
        Some(name) => vec![name.parse::<DumpCategory>()?],
        None => DumpCategory::ALL.to_vec(),
    };
    if file.is_some() && categories.len() != 1 {
        anyhow::bail!("--file needs an explicit category (editions, authors or works)");
    }

    std::fs::create_dir_all(&config.store.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.store.data_dir.display()
        )
    })?;
    let store = CatalogStore::open(config.store_path())?;
    let coordinator = ImportCoordinator::new(store, config.import.clone());
    let dump_dir = config.dump_dir();

    info!(
        "Importing into {} with {} parser workers",
        config.store_path().display(),
        config.import.worker_count()
    );

    let cancel = CancelHandle::new();
    let signal = cancel.signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current batch");
            cancel.cancel();
        }
    });

    for category in categories {
        let path = match &file {
            Some(path) => path.clone(),
            None => dump_dir.join(category.dump_filename()),
        };

        if !path.exists() {
            if explicit {
                anyhow::bail!("Dump file not found: {}", path.display());
            }
            warn!("Skipping {}: {} not found", category, path.display());
            continue;
        }

        let mut progress = ImportProgress::new(category, quiet);
        let result = coordinator
            .import(category, &path, signal.clone(), |tick| progress.update(&tick))
            .await;

        match result {
            Ok(stats) => {
                progress.finish(&stats);
                if !quiet {
                    print_summary(&stats);
                }
            }
            Err(e) if e.is_cancelled() => {
                progress.abandon("Cancelled");
                println!("\n{}. Run the same command again to resume.", e);
                return Ok(());
            }
            Err(e) => {
                progress.abandon("Failed");
                return Err(e).with_context(|| {
                    format!("Failed to import {} from {}", category, path.display())
                });
            }
        }
    }

    Ok(())
}
