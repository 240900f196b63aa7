//! Global error handling for dumpundump
//!
//! This module provides a centralized error type that can represent errors
//! from all modules in the project.

use std::io;
use thiserror::Error;

use crate::diff::{DiffApplyError, DiffParseError};

/// Global error type for dumpundump operations
#[derive(Error, Debug)]
pub enum DumpUndumpError {
    /// Unified diff could not be parsed
    #[error("Diff parse error: {0}")]
    DiffParse(#[from] DiffParseError),

    /// Unified diff could not be applied
    #[error("Diff apply error: {0}")]
    DiffApply(#[from] DiffApplyError),

    /// File system errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A filesystem action on a specific path failed
    #[error("Failed to {action} {path}: {source}")]
    FileOp {
        action: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON processing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unexpected error
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl DumpUndumpError {
    /// Wrap an io error with the action and path it happened on
    pub fn file_op(action: &'static str, path: impl Into<String>, source: io::Error) -> Self {
        Self::FileOp {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Specialized Result type for dumpundump operations
pub type Result<T> = std::result::Result<T, DumpUndumpError>;

/// Creates a DumpUndumpError with a formatted message
#[macro_export]
macro_rules! error {
    ($error_type:ident, $($arg:tt)*) => {
        $crate::error::DumpUndumpError::$error_type(format!($($arg)*))
    };
}

/// Returns an error result with a formatted message
#[macro_export]
macro_rules! bail {
    ($error_type:ident, $($arg:tt)*) => {
        return Err($crate::error!($error_type, $($arg)*))
    };
}

/// Ensures a condition is true, otherwise returns an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error_type:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($error_type, $($arg)*)
        }
    };
}

/// Extension trait for adding context to errors
pub trait ResultExt<T, E> {
    /// Add additional context to an error
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E: std::error::Error + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        self.map_err(|e| {
            let context = f();
            DumpUndumpError::Unexpected(format!("{}: {}", context, e))
        })
    }
}

// main() returns io::Result, so errors must convert
impl From<DumpUndumpError> for io::Error {
    fn from(err: DumpUndumpError) -> Self {
        match err {
            DumpUndumpError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}
