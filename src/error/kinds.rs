use std::{fmt, io};

/// Crate-wide `Result` type using [`MongoportError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, MongoportError>;

/// Top-level error type for import/export operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum MongoportError {
    /// Job configuration errors, rejected before the job starts.
    Config(ConfigError),

    /// File parsing errors (CSV or JSON).
    Parse(ParseError),

    /// Per-record type coercion errors.
    Cast(CastError),

    /// Job lifecycle errors.
    Job(JobError),

    /// I/O errors. Always fatal for a running pipeline.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Configuration-specific errors.
///
/// All of these are reported synchronously when a job is validated,
/// never mid-stream.
#[derive(Debug)]
pub enum ConfigError {
    /// Input file does not exist.
    FileNotFound(String),

    /// Input file exists but cannot be read.
    UnreadableFile(String),

    /// Output directory does not exist.
    DirectoryNotFound(String),

    /// A field list was given but every field is excluded.
    NoFieldsSelected,

    /// Delimiter is not one of comma, tab, semicolon or space.
    InvalidDelimiter(char),

    /// The file is empty or its format could not be determined.
    UndetectableFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/// Parsing-specific errors.
#[derive(Debug)]
pub enum ParseError {
    /// Malformed CSV input.
    Csv(String),

    /// Malformed JSON input, with the record number where it occurred.
    Json { record: u64, message: String },

    /// Input ended inside an unterminated JSON value.
    UnexpectedEof,

    /// CSV input had no header row.
    MissingHeader,
}

/// A per-record type coercion failure.
///
/// Produced by the type codec when flat text cannot be cast to the
/// declared field type. Never fatal on its own; the job's stop-on-errors
/// policy decides whether it halts the pipeline.
#[derive(Debug, Clone)]
pub struct CastError {
    /// The target type tag, e.g. `objectId`.
    pub type_tag: String,

    /// The offending input text (possibly truncated for display).
    pub text: String,

    /// Human-readable reason the cast failed.
    pub reason: String,
}

/// Job lifecycle errors.
///
/// Cancellation is a terminal state, not an error, so it does not appear
/// here.
#[derive(Debug)]
pub enum JobError {
    /// A job is already running against this target.
    AlreadyRunning,
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for MongoportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MongoportError::Config(e) => write!(f, "Configuration error: {e}"),
            MongoportError::Parse(e) => write!(f, "Parse error: {e}"),
            MongoportError::Cast(e) => write!(f, "{e}"),
            MongoportError::Job(e) => write!(f, "{e}"),
            MongoportError::Io(e) => write!(f, "I/O error: {e}"),
            MongoportError::MongoDb(e) => write!(f, "MongoDB error: {e}"),
            MongoportError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "File not found: {path}"),
            ConfigError::UnreadableFile(path) => write!(f, "File is not readable: {path}"),
            ConfigError::DirectoryNotFound(path) => {
                write!(f, "Directory does not exist: {path}")
            }
            ConfigError::NoFieldsSelected => write!(f, "No fields selected"),
            ConfigError::InvalidDelimiter(c) => write!(f, "Invalid delimiter: {c:?}"),
            ConfigError::UndetectableFormat(path) => {
                write!(f, "Cannot determine file format: {path}")
            }
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Csv(msg) => write!(f, "{msg}"),
            ParseError::Json { record, message } => {
                write!(f, "record {record}: {message}")
            }
            ParseError::UnexpectedEof => write!(f, "unexpected end of input"),
            ParseError::MissingHeader => write!(f, "missing CSV header row"),
        }
    }
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot cast '{}' to {}: {}",
            self.text, self.type_tag, self.reason
        )
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::AlreadyRunning => write!(f, "An import or export is already in progress"),
        }
    }
}

impl std::error::Error for MongoportError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for ParseError {}
impl std::error::Error for CastError {}
impl std::error::Error for JobError {}

/* ========================= Conversions to MongoportError ========================= */

impl From<io::Error> for MongoportError {
    fn from(err: io::Error) -> Self {
        MongoportError::Io(err)
    }
}

impl From<mongodb::error::Error> for MongoportError {
    fn from(err: mongodb::error::Error) -> Self {
        MongoportError::MongoDb(err)
    }
}

impl From<ConfigError> for MongoportError {
    fn from(err: ConfigError) -> Self {
        MongoportError::Config(err)
    }
}

impl From<ParseError> for MongoportError {
    fn from(err: ParseError) -> Self {
        MongoportError::Parse(err)
    }
}

impl From<CastError> for MongoportError {
    fn from(err: CastError) -> Self {
        MongoportError::Cast(err)
    }
}

impl From<JobError> for MongoportError {
    fn from(err: JobError) -> Self {
        MongoportError::Job(err)
    }
}

impl From<csv::Error> for MongoportError {
    fn from(err: csv::Error) -> Self {
        // CSV errors caused by the underlying reader are I/O, everything
        // else is malformed input.
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(e) => MongoportError::Io(e),
                other => MongoportError::Parse(ParseError::Csv(format!("{other:?}"))),
            }
        } else {
            MongoportError::Parse(ParseError::Csv(err.to_string()))
        }
    }
}

impl From<String> for MongoportError {
    fn from(msg: String) -> Self {
        MongoportError::Generic(msg)
    }
}

impl From<&str> for MongoportError {
    fn from(msg: &str) -> Self {
        MongoportError::Generic(msg.to_owned())
    }
}
