//! Command-line interface for mongoport
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Field selection syntax (`path`, `path:type`, `!path`)
//! - Job configuration assembly with format auto-detection
//! - Progress display driven by job events
//! - Ctrl+C cancellation wiring

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use bson::Document;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use tracing::debug;

use crate::codec::FieldType;
use crate::collection::{MongoBulkSink, MongoDocumentSource, connect};
use crate::config::{FieldSpec, FileFormat, JobConfig};
use crate::detect;
use crate::error::{ConfigError, MongoportError, Result};
use crate::import::{Preview, preview_file};
use crate::job::{JobEvent, JobOrchestrator, JobState};

/// MongoDB collection import/export tool
#[derive(Parser, Debug)]
#[command(
    name = "mongoport",
    version,
    about = "Stream files into and out of MongoDB collections",
    long_about = "Imports CSV, JSON and JSON-lines files into MongoDB collections with \
per-field type coercion, and exports collections back out, streaming in both directions \
so memory use stays flat regardless of file size."
)]
pub struct CliArgs {
    /// MongoDB connection URI
    ///
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    #[arg(long, value_name = "URI", default_value = "mongodb://localhost:27017")]
    pub uri: String,

    /// Quiet mode (no progress bar)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (debug logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for mongoport
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a file into a collection
    Import {
        /// File to import
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Target database
        #[arg(short = 'd', long, value_name = "NAME")]
        database: String,

        /// Target collection
        #[arg(short = 'c', long, value_name = "NAME")]
        collection: String,

        /// File format (csv, json, jsonl); auto-detected when omitted
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,

        /// CSV delimiter (comma, tab, semicolon, space); auto-detected
        /// when omitted
        #[arg(long, value_name = "CHAR")]
        delimiter: Option<String>,

        /// Stop at the first malformed record instead of skipping it
        #[arg(long)]
        stop_on_errors: bool,

        /// Import empty cells as empty strings instead of dropping them
        #[arg(long)]
        keep_blanks: bool,

        /// Field selection, repeatable: `path` includes, `path:type`
        /// includes with a type cast, `!path` excludes
        #[arg(long = "field", value_name = "SPEC")]
        fields: Vec<String>,
    },

    /// Export a collection to a file
    Export {
        /// File to write
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Source database
        #[arg(short = 'd', long, value_name = "NAME")]
        database: String,

        /// Source collection
        #[arg(short = 'c', long, value_name = "NAME")]
        collection: String,

        /// File format (csv, json, jsonl)
        #[arg(long, value_name = "FORMAT", default_value = "jsonl")]
        format: String,

        /// CSV delimiter (comma, tab, semicolon, space)
        #[arg(long, value_name = "CHAR")]
        delimiter: Option<String>,

        /// Filter query as extended JSON, e.g. '{"year": {"$gte": 2020}}'
        #[arg(long, value_name = "QUERY")]
        filter: Option<String>,

        /// Field selection, repeatable: `path` fixes CSV column order,
        /// `!path` excludes
        #[arg(long = "field", value_name = "SPEC")]
        fields: Vec<String>,
    },

    /// Sample a file and suggest field types without importing
    Preview {
        /// File to sample
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// File format (csv, json, jsonl); auto-detected when omitted
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,

        /// CSV delimiter; auto-detected when omitted
        #[arg(long, value_name = "CHAR")]
        delimiter: Option<String>,

        /// Number of records to sample
        #[arg(long, value_name = "N", default_value_t = 10)]
        limit: usize,
    },
}

fn invalid(field: &str, value: &str) -> MongoportError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

/// Parse one `--field` value into a [`FieldSpec`].
///
/// # Arguments
/// * `spec` - `path`, `path:type`, or `!path`
/// * `order` - Position of this flag on the command line
fn parse_field(spec: &str, order: usize) -> Result<FieldSpec> {
    if let Some(path) = spec.strip_prefix('!') {
        if path.is_empty() {
            return Err(invalid("field", spec));
        }
        return Ok(FieldSpec::excluded(path, order));
    }
    match spec.split_once(':') {
        Some((path, type_name)) => {
            let field_type =
                FieldType::from_str(type_name).map_err(|_| invalid(path, type_name))?;
            Ok(FieldSpec::typed(path, field_type, order))
        }
        None => Ok(FieldSpec::included(spec, order)),
    }
}

fn parse_fields(specs: &[String]) -> Result<Vec<FieldSpec>> {
    specs
        .iter()
        .enumerate()
        .map(|(order, spec)| parse_field(spec, order))
        .collect()
}

/// Parse a delimiter name or literal character.
fn parse_delimiter(value: &str) -> Result<u8> {
    match value {
        "comma" | "," => Ok(b','),
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "semicolon" | ";" => Ok(b';'),
        "space" | " " => Ok(b' '),
        other => Err(invalid("delimiter", other)),
    }
}

/// Parse an extended JSON filter into a query document.
fn parse_filter(value: &str) -> Result<Document> {
    let json: serde_json::Value =
        serde_json::from_str(value).map_err(|_| invalid("filter", value))?;
    match bson::Bson::try_from(json) {
        Ok(bson::Bson::Document(doc)) => Ok(doc),
        _ => Err(invalid("filter", value)),
    }
}

/// Build a server-side exclusion projection from the field specs.
///
/// Inclusions are handled client-side (they also carry CSV column order),
/// but exclusions can be pushed down to save wire traffic.
fn server_projection(fields: &[FieldSpec]) -> Option<Document> {
    let mut projection = Document::new();
    for spec in fields.iter().filter(|f| !f.included) {
        projection.insert(spec.path.clone(), 0_i32);
    }
    if projection.is_empty() {
        None
    } else {
        Some(projection)
    }
}

/// Resolve format and delimiter, sniffing the file where not given.
fn resolve_input_format(
    file: &std::path::Path,
    format: Option<&str>,
    delimiter: Option<&str>,
) -> Result<(FileFormat, u8)> {
    let format = match format {
        Some(name) => Some(FileFormat::from_str(name).map_err(|_| invalid("format", name))?),
        None => None,
    };
    let delimiter = match delimiter {
        Some(value) => Some(parse_delimiter(value)?),
        None => None,
    };

    if let (Some(format), Some(delimiter)) = (format, delimiter) {
        return Ok((format, delimiter));
    }
    let (detected, _) = detect::detect_file(file)?;
    let format = format.unwrap_or(detected.format);
    let delimiter = delimiter.unwrap_or(detected.delimiter);
    debug!(
        "resolved format {} delimiter {:?}",
        format.as_str(),
        delimiter as char
    );
    Ok((format, delimiter))
}

/// Run the parsed command to completion.
///
/// # Returns
/// * `Result<()>` - Success, or the error that stopped the job
pub async fn run_command(args: CliArgs) -> Result<()> {
    match args.command {
        Commands::Import {
            ref file,
            ref database,
            ref collection,
            ref format,
            ref delimiter,
            stop_on_errors,
            keep_blanks,
            ref fields,
        } => {
            let (format, delimiter_byte) =
                resolve_input_format(file, format.as_deref(), delimiter.as_deref())?;
            let mut config = JobConfig::import(file, format);
            config.delimiter = delimiter_byte;
            config.stop_on_errors = stop_on_errors;
            config.ignore_blanks = !keep_blanks;
            config.fields = parse_fields(fields)?;

            let coll = connect(&args.uri, database, collection).await?;
            let sink = MongoBulkSink::new(coll);
            run_job(args.quiet, |orchestrator| {
                orchestrator.start_import(config, Box::new(sink))
            })
            .await
        }
        Commands::Export {
            ref file,
            ref database,
            ref collection,
            ref format,
            ref delimiter,
            ref filter,
            ref fields,
        } => {
            let format = FileFormat::from_str(format).map_err(|_| invalid("format", format))?;
            let mut config = JobConfig::export(file, format);
            if let Some(delimiter) = delimiter {
                config.delimiter = parse_delimiter(delimiter)?;
            }
            if let Some(filter) = filter {
                config.filter = Some(parse_filter(filter)?);
            }
            config.fields = parse_fields(fields)?;

            let coll = connect(&args.uri, database, collection).await?;
            let source = MongoDocumentSource::new(
                coll,
                config.filter.clone().unwrap_or_default(),
                server_projection(&config.fields),
            );
            run_job(args.quiet, |orchestrator| {
                orchestrator.start_export(config, Box::new(source))
            })
            .await
        }
        Commands::Preview {
            ref file,
            ref format,
            ref delimiter,
            limit,
        } => {
            let (format, delimiter_byte) =
                resolve_input_format(file, format.as_deref(), delimiter.as_deref())?;
            let preview = preview_file(file, format, delimiter_byte, limit)?;
            print_preview(&preview);
            Ok(())
        }
    }
}

/// Start a job, wire up progress and Ctrl+C, and wait for the verdict.
async fn run_job<F>(quiet: bool, start: F) -> Result<()>
where
    F: FnOnce(&JobOrchestrator) -> Result<()>,
{
    let orchestrator = Arc::new(JobOrchestrator::new());
    let events = orchestrator.subscribe();
    start(&orchestrator)?;

    let progress = if quiet {
        None
    } else {
        Some(tokio::spawn(drive_progress(events)))
    };

    // Ctrl+C cancels the running job; the pipeline drains and the
    // terminal state reflects the cancellation
    let canceller = Arc::clone(&orchestrator);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCanceling...");
            canceller.cancel();
        }
    });

    orchestrator.wait().await;
    ctrl_c.abort();
    if let Some(progress) = progress {
        let _ = progress.await;
    }

    let status = orchestrator.status();
    match status.state {
        JobState::Completed => {
            println!(
                "Done: {} written, {} failed",
                status.progress.docs_written, status.progress.docs_failed
            );
            Ok(())
        }
        JobState::Canceled => {
            println!("Canceled: {} written", status.progress.docs_written);
            Ok(())
        }
        JobState::Failed => Err(MongoportError::Generic(
            status.error.unwrap_or_else(|| "job failed".to_string()),
        )),
        other => Err(MongoportError::Generic(format!(
            "job ended in unexpected state {other:?}"
        ))),
    }
}

/// Render job events as a progress bar until a terminal event arrives.
async fn drive_progress(mut events: broadcast::Receiver<JobEvent>) {
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {percent:>3}% {msg}") {
        bar.set_style(style);
    }

    loop {
        match events.recv().await {
            Ok(JobEvent::Started) => {}
            Ok(JobEvent::Progress {
                percent,
                docs_written,
            }) => {
                bar.set_position(percent as u64);
                bar.set_message(format!("{docs_written} written"));
            }
            Ok(JobEvent::GuesstimatedTotal(total)) => {
                bar.set_message(format!("~{total} records"));
            }
            Ok(JobEvent::Completed { .. }) => {
                bar.set_position(100);
                bar.finish_and_clear();
                break;
            }
            Ok(JobEvent::Canceled { .. }) | Ok(JobEvent::Failed { .. }) => {
                bar.abandon();
                break;
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_preview(preview: &Preview) {
    println!("Sampled {} records", preview.records_sampled);
    for field in &preview.fields {
        println!(
            "  {} ({}) e.g. {}",
            field.path,
            field.suggested_type.as_str(),
            field
                .values
                .first()
                .map(String::as_str)
                .unwrap_or("<empty>")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_plain() {
        let spec = parse_field("name", 0).unwrap();
        assert!(spec.included);
        assert!(spec.field_type.is_none());
        assert_eq!(spec.path, "name");
    }

    #[test]
    fn test_parse_field_typed() {
        let spec = parse_field("stats.flufiness:double", 2).unwrap();
        assert_eq!(spec.field_type, Some(FieldType::Double));
        assert_eq!(spec.order, 2);
    }

    #[test]
    fn test_parse_field_excluded() {
        let spec = parse_field("!secret", 0).unwrap();
        assert!(!spec.included);
        assert_eq!(spec.path, "secret");
    }

    #[test]
    fn test_parse_field_bad_type() {
        assert!(parse_field("age:integer32", 0).is_err());
    }

    #[test]
    fn test_parse_delimiter_names() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert!(parse_delimiter("pipe").is_err());
    }

    #[test]
    fn test_parse_filter_requires_object() {
        assert!(parse_filter("{\"year\": {\"$gte\": 2020}}").is_ok());
        assert!(parse_filter("[1, 2]").is_err());
        assert!(parse_filter("not json").is_err());
    }

    #[test]
    fn test_server_projection_from_exclusions() {
        let fields = vec![
            FieldSpec::included("name", 0),
            FieldSpec::excluded("secret", 1),
        ];
        let projection = server_projection(&fields).unwrap();
        assert_eq!(projection, bson::doc! { "secret": 0_i32 });
        assert!(server_projection(&[FieldSpec::included("name", 0)]).is_none());
    }

    #[test]
    fn test_cli_parses_import_command() {
        let args = CliArgs::try_parse_from([
            "mongoport",
            "import",
            "pets.csv",
            "-d",
            "zoo",
            "-c",
            "pets",
            "--field",
            "_id:objectId",
            "--field",
            "!notes",
            "--stop-on-errors",
        ])
        .unwrap();
        match args.command {
            Commands::Import {
                ref fields,
                stop_on_errors,
                ..
            } => {
                assert_eq!(fields.len(), 2);
                assert!(stop_on_errors);
            }
            _ => panic!("expected import"),
        }
    }
}
