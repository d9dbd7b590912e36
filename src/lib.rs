//! MongoDB Import/Export Library
//!
//! This library provides the core functionality for mongoport. It can be
//! used standalone to embed collection import/export in other tools.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `codec`: Flat-text to BSON type coercion
//! - `collection`: Bulk-write sink and query source over the driver
//! - `config`: Job configuration and validation
//! - `detect`: File format and delimiter sniffing
//! - `error`: Error types and handling
//! - `export`: Export pipeline and format writers
//! - `import`: Import pipeline, projection and preview sampling
//! - `job`: Job lifecycle, progress and orchestration
//! - `parser`: Streaming CSV/JSON/JSON-lines record parsers
//!
//! # Example
//!
//! ```no_run
//! use mongoport::config::{FileFormat, JobConfig};
//! use mongoport::collection::{MongoBulkSink, connect};
//! use mongoport::job::JobOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coll = connect("mongodb://localhost:27017", "zoo", "pets").await?;
//!     let config = JobConfig::import("pets.csv", FileFormat::Csv);
//!
//!     let orchestrator = JobOrchestrator::new();
//!     orchestrator.start_import(config, Box::new(MongoBulkSink::new(coll)))?;
//!     orchestrator.wait().await;
//!
//!     println!("{:?}", orchestrator.status());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod codec;
pub mod collection;
pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod import;
pub mod job;
pub mod parser;

// Re-export commonly used types
pub use codec::FieldType;
pub use config::{FieldSpec, FileFormat, JobConfig, JobDirection};
pub use error::{MongoportError, Result};
pub use job::{JobEvent, JobOrchestrator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
