use anyhow::{Context, Result};
use olindex::config::Config;
use std::path::PathBuf;

pub async fn init_config(path: PathBuf, force: bool) -> Result<()> {
    let config = Config::default();
    let config_path = path.join("olindex.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let toml_content = format!(
        r#"# olindex configuration

[store]
# The catalog store is created in <data_dir>/catalog
data_dir = "{data_dir}"

[dumps]
# Directory holding ol_dump_<category>_latest.txt.gz files
# (defaults to <data_dir>/dumps)
# dir = "/srv/dumps"

[import]
# Records per committed write batch
batch_size = {batch_size}
# Records between persisted checkpoints
checkpoint_interval = {checkpoint_interval}
# Parser workers (defaults to available parallelism, at least 2)
# workers = 4
line_queue_capacity = {line_queue}
entry_queue_capacity = {entry_queue}
read_buffer_bytes = {read_buffer}
# Longer lines abort the import
max_line_bytes = {max_line}
# "on_checkpoint" flushes to disk at every checkpoint, "never" leaves it to the store
sync = "on_checkpoint"

[logging]
# "text" or "json"
format = "text"
# trace, debug, info, warn, error
level = "info"
"#,
        data_dir = config.store.data_dir.display(),
        batch_size = config.import.batch_size,
        checkpoint_interval = config.import.checkpoint_interval,
        line_queue = config.import.line_queue_capacity,
        entry_queue = config.import.entry_queue_capacity,
        read_buffer = config.import.read_buffer_bytes,
        max_line = config.import.max_line_bytes,
    );

    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    std::fs::write(&config_path, toml_content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created configuration at {}", config_path.display());
    println!("\nNext steps:");
    println!(
        "  1. Place dump files in {}",
        config.dump_dir().display()
    );
    println!("  2. Import them: olindex import");
    println!("  3. Look something up: olindex isbn 9780261103344");

    Ok(())
}
