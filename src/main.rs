//! olindex: offline catalog dump index
//!
//! Imports bulk catalog dumps into a local store and answers lookups from it.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use olindex::config::{Config, LogFormat, LoggingConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "olindex")]
#[command(about = "Offline index of bulk catalog dumps (editions, works, authors)")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "olindex.toml")]
    config: PathBuf,

    /// Data directory (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Directory holding dump files (overrides the config file)
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Import dump files into the store
    Import {
        /// Category to import (editions, authors, works); all three when omitted
        category: Option<String>,

        /// Dump file path (defaults to the conventional name in the dump directory)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Parser worker count
        #[arg(short, long)]
        workers: Option<usize>,

        /// Records per write batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Quiet mode (no progress output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show import status
    Status {
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Look up an edition by ISBN-10 or ISBN-13
    Isbn {
        isbn: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Search works by title prefix
    Title {
        title: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Look up an author by key (e.g. /authors/OL1A) or by name
    Author {
        query: String,

        /// Treat the query as a display name
        #[arg(long)]
        by_name: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Look up a work by key (e.g. /works/OL1W)
    Work {
        key: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Look up an edition by key (e.g. /books/OL1M)
    Edition {
        key: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for lookups and status
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn init_logging(logging: &LoggingConfig, verbose: u8) -> Result<()> {
    let level = logging.level.raised_by(verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("olindex={level},warn")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = match logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing config file means defaults; a broken one is an error
    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    if let Some(data_dir) = cli.data_dir {
        config.store.data_dir = data_dir;
    }
    if let Some(dump_dir) = cli.dump_dir {
        config.dumps.dir = Some(dump_dir);
    }

    init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Init { path, force } => commands::init::init_config(path, force).await,
        Commands::Import {
            category,
            file,
            workers,
            batch_size,
            quiet,
        } => {
            if let Some(workers) = workers {
                config.import.workers = Some(workers);
            }
            if let Some(batch_size) = batch_size {
                config.import.batch_size = batch_size;
                config.import.checkpoint_interval =
                    config.import.checkpoint_interval.max(batch_size);
            }
            config.validate()?;
            commands::import::import_dumps(config, category, file, quiet).await
        }
        Commands::Status { format } => commands::status::show_status(config, format).await,
        Commands::Isbn { isbn, format } => commands::lookup::isbn(config, isbn, format).await,
        Commands::Title { title, format } => commands::lookup::title(config, title, format).await,
        Commands::Author {
            query,
            by_name,
            format,
        } => commands::lookup::author(config, query, by_name, format).await,
        Commands::Work { key, format } => commands::lookup::work(config, key, format).await,
        Commands::Edition { key, format } => commands::lookup::edition(config, key, format).await,
    }
}
