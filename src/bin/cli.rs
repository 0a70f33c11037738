//! QuillKV CLI
//!
//! Runs a single command against a local data directory.

use std::process;

use clap::{Parser, Subcommand};
use quillkv::{Config, Engine, QuillError};
use tracing_subscriber::{fmt, EnvFilter};

/// QuillKV CLI
#[derive(Parser, Debug)]
#[command(name = "quillkv-cli")]
#[command(about = "CLI for the QuillKV key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./quillkv_data")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Compact the log
    Merge,

    /// Show key count and log size
    Stats,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,quillkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> quillkv::Result<()> {
    let config = Config::builder().data_dir(&args.data_dir).build();
    let engine = Engine::open(config)?;

    match args.command {
        Commands::Get { key } => match engine.get(key.as_bytes()) {
            Ok(value) => println!("{}", String::from_utf8_lossy(&value)),
            Err(QuillError::KeyNotFound) => println!("(nil)"),
            Err(e) => return Err(e),
        },
        Commands::Put { key, value } => {
            engine.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            engine.delete(key.as_bytes())?;
            println!("OK");
        }
        Commands::Merge => {
            let stats = engine.merge()?;
            println!(
                "scanned {} records, kept {}, {} -> {} bytes",
                stats.records_scanned, stats.records_kept, stats.bytes_before, stats.bytes_after
            );
        }
        Commands::Stats => {
            println!("keys: {}", engine.key_count());
            println!("log bytes: {}", engine.log_size());
            println!("log path: {}", engine.log_path().display());
        }
    }

    engine.close()
}
