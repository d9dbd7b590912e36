//! mongoport - MongoDB collection import/export
//!
//! Streams CSV, JSON and JSON-lines files into MongoDB collections and
//! collections back out to files. Memory use stays flat regardless of
//! file size: records flow through a bounded pipeline from parser to
//! bulk writer.
//!
//! # Usage
//!
//! ```bash
//! # Import a CSV with typed fields
//! mongoport import pets.csv -d zoo -c pets --field _id:objectId --field age:int32
//!
//! # Export a collection as JSON lines
//! mongoport export pets.jsonl -d zoo -c pets
//! ```

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use mongoport::cli::{self, CliArgs};
use mongoport::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// Parses arguments, initializes logging, then hands off to the command
/// runner.
///
/// # Returns
/// * `Result<()>` - Success or error
async fn run() -> Result<()> {
    let args = CliArgs::parse();
    initialize_logging(&args);
    cli::run_command(args).await
}

/// Initialize logging system based on verbosity level
///
/// `RUST_LOG` takes precedence when set; otherwise the verbosity flags
/// pick the level.
///
/// # Arguments
/// * `args` - Parsed arguments with verbosity settings
fn initialize_logging(args: &CliArgs) {
    let level = if args.very_verbose {
        Level::TRACE
    } else if args.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
