//! Job configuration for import and export.
//!
//! A [`JobConfig`] captures everything the orchestrator needs to run one
//! job: direction, file format and path, delimiter, error policy, blank
//! handling and the field projection. It is immutable for the lifetime of
//! a job; starting over requires a new config.
//!
//! Validation happens synchronously in [`JobConfig::validate`], before a
//! job ever transitions to running. Nothing in here fails mid-stream.

use std::path::{Path, PathBuf};

use bson::Document;
use serde::{Deserialize, Serialize};

use crate::codec::FieldType;
use crate::error::{ConfigError, Result};

/// Direction of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobDirection {
    /// File into a collection.
    Import,

    /// Collection into a file.
    Export,
}

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Delimited rows with a header line.
    Csv,

    /// A single JSON array of objects.
    Json,

    /// One JSON object per line.
    JsonLines,
}

impl FileFormat {
    /// Canonical name for logging and CLI parsing.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
            FileFormat::JsonLines => "jsonl",
        }
    }
}

impl std::str::FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            "jsonl" | "jsonlines" | "ndjson" => Ok(FileFormat::JsonLines),
            other => Err(format!("unknown file format: {other}")),
        }
    }
}

/// One field inclusion/type decision in the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Dotted path of the field, e.g. `stats.flufiness`.
    pub path: String,

    /// Whether the field is written at all.
    #[serde(default = "default_included")]
    pub included: bool,

    /// Target type for import coercion. `None` leaves values untouched
    /// (CSV cells stay strings).
    #[serde(default)]
    pub field_type: Option<FieldType>,

    /// Column position for CSV output; discovery order during preview.
    #[serde(default)]
    pub order: usize,
}

fn default_included() -> bool {
    true
}

impl FieldSpec {
    /// A field included with no type override.
    pub fn included(path: impl Into<String>, order: usize) -> Self {
        Self {
            path: path.into(),
            included: true,
            field_type: None,
            order,
        }
    }

    /// A field included and cast to `field_type` on import.
    pub fn typed(path: impl Into<String>, field_type: FieldType, order: usize) -> Self {
        Self {
            path: path.into(),
            included: true,
            field_type: Some(field_type),
            order,
        }
    }

    /// A field dropped from the projection.
    pub fn excluded(path: impl Into<String>, order: usize) -> Self {
        Self {
            path: path.into(),
            included: false,
            field_type: None,
            order,
        }
    }
}

/// Configuration for one import or export job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Import or export.
    pub direction: JobDirection,

    /// File format on the flat side of the pipeline.
    pub format: FileFormat,

    /// CSV field delimiter. Ignored for JSON formats.
    #[serde(default = "default_delimiter")]
    pub delimiter: u8,

    /// File to read (import) or write (export).
    pub file_path: PathBuf,

    /// Import policy: promote the first per-record failure to a fatal
    /// error instead of skipping it.
    #[serde(default)]
    pub stop_on_errors: bool,

    /// Import option: drop fields whose value is the empty string.
    #[serde(default = "default_ignore_blanks")]
    pub ignore_blanks: bool,

    /// Field projection. Empty means everything included, untyped.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    /// Export filter query. `None` exports the whole collection.
    #[serde(default)]
    pub filter: Option<Document>,
}

fn default_delimiter() -> u8 {
    b','
}

fn default_ignore_blanks() -> bool {
    true
}

impl JobConfig {
    /// Create an import config with defaults matching the interactive
    /// surface: comma delimiter, continue on errors, ignore blanks.
    pub fn import(file_path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            direction: JobDirection::Import,
            format,
            delimiter: b',',
            file_path: file_path.into(),
            stop_on_errors: false,
            ignore_blanks: true,
            fields: Vec::new(),
            filter: None,
        }
    }

    /// Create an export config.
    pub fn export(file_path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            direction: JobDirection::Export,
            format,
            delimiter: b',',
            file_path: file_path.into(),
            stop_on_errors: false,
            ignore_blanks: false,
            fields: Vec::new(),
            filter: None,
        }
    }

    /// Validate the configuration before the job starts.
    ///
    /// Checks everything that can be checked without running the
    /// pipeline: file presence and readability for imports, output
    /// directory existence for exports, delimiter sanity, and that at
    /// least one field is included when a field list was given.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.delimiter, b',' | b'\t' | b';' | b' ') {
            return Err(ConfigError::InvalidDelimiter(self.delimiter as char).into());
        }

        if !self.fields.is_empty() && !self.fields.iter().any(|f| f.included) {
            return Err(ConfigError::NoFieldsSelected.into());
        }

        match self.direction {
            JobDirection::Import => self.validate_input_file(),
            JobDirection::Export => self.validate_output_path(),
        }
    }

    fn validate_input_file(&self) -> Result<()> {
        let path = &self.file_path;
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }
        if std::fs::File::open(path).is_err() {
            return Err(ConfigError::UnreadableFile(path.display().to_string()).into());
        }
        Ok(())
    }

    fn validate_output_path(&self) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !Path::new(parent).exists() {
                return Err(
                    ConfigError::DirectoryNotFound(parent.display().to_string()).into(),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_import_validation_missing_file() {
        let config = JobConfig::import("/no/such/file.csv", FileFormat::Csv);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_import_validation_ok() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b\n1,2").unwrap();
        let config = JobConfig::import(file.path(), FileFormat::Csv);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_all_fields_excluded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b\n1,2").unwrap();
        let mut config = JobConfig::import(file.path(), FileFormat::Csv);
        config.fields = vec![
            FieldSpec::excluded("a", 0),
            FieldSpec::excluded("b", 1),
        ];
        assert!(matches!(
            config.validate(),
            Err(crate::error::MongoportError::Config(
                ConfigError::NoFieldsSelected
            ))
        ));
    }

    #[test]
    fn test_rejects_bad_delimiter() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a|b").unwrap();
        let mut config = JobConfig::import(file.path(), FileFormat::Csv);
        config.delimiter = b'|';
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_export_validation_missing_directory() {
        let config = JobConfig::export("/no/such/dir/out.csv", FileFormat::Csv);
        assert!(config.validate().is_err());
    }
}
