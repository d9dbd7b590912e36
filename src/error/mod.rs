//! Error handling module for import/export operations.
//!
//! This module provides the error taxonomy used throughout the crate:
//! - Configuration errors, rejected synchronously before a job starts
//! - Per-record errors (type coercion, single failed writes), which are
//!   counted and skipped or promoted to fatal depending on job policy
//! - Fatal I/O and driver errors, which always terminate the pipeline
//!
//! Cancellation is deliberately *not* an error: a canceled job reaches a
//! distinct terminal state and surfaces no error to the caller.

pub mod kinds;

// Re-export commonly used types
pub use kinds::{CastError, ConfigError, JobError, MongoportError, ParseError, Result};
