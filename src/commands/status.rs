use super::open_existing_store;
use crate::OutputFormat;
use anyhow::Result;
use olindex::{config::Config, util::format_bytes, DumpCategory};

pub async fn show_status(config: Config, format: OutputFormat) -> Result<()> {
    let store = open_existing_store(&config)?;
    let status = store.status()?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("\nCatalog Status");
    println!("==============");
    println!("Store: {}", config.store_path().display());
    println!("Size on disk: {}", format_bytes(store.size_on_disk()?));

    for category in DumpCategory::ALL {
        let s = status.get(category);
        println!("\n{}:", category);
        if s.last_updated.is_none() {
            println!("  not imported");
            continue;
        }
        let state = if s.is_complete() { "complete" } else { "partial" };
        println!("  State:          {} ({:.1}%)", state, s.import_progress * 100.0);
        println!("  Records:        {}", s.record_count);
        println!("  Lines:          {}", s.lines_processed);
        println!("  Malformed rows: {}", s.malformed_rows);
        println!("  Dump size:      {}", format_bytes(s.file_size));
        if let Some(updated) = s.last_updated {
            println!("  Last updated:   {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }

    Ok(())
}
