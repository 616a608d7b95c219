//! Error types and exit codes for cife
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure
//! - 2: Usage error (bad flags/args, invalid configuration values)
//! - 3: Data error (missing input, missing column, malformed table)
//!
//! Per-row problems (unparseable judge text, malformed flags, misaligned
//! constraints) are not errors at this level. They are collected in a
//! [`crate::metrics::FailureReport`] so that one bad row never aborts a run.

mod macros;

use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
    /// Data error - missing input, malformed table (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur during cife operations
#[derive(Error, Debug)]
pub enum CifeError {
    // Usage errors (exit code 2)
    #[error("unknown format: {0} (expected: human or json)")]
    UnknownFormat(String),

    #[error("{0}")]
    UsageError(String),

    #[error("invalid {context}: {value}")]
    InvalidValue { context: String, value: String },

    #[error("unsupported {context}: {value} (supported: {supported})")]
    Unsupported {
        context: String,
        value: String,
        supported: String,
    },

    // Data errors (exit code 3)
    #[error("input not found: {path:?}")]
    InputNotFound { path: PathBuf },

    #[error("missing column `{column}` in {path:?}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("malformed table {path:?} at line {line}: {reason}")]
    MalformedTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{context} not found: {value}")]
    NotFound { context: String, value: String },

    // Generic failures (exit code 1)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to {operation}: {reason}")]
    FailedOperation { operation: String, reason: String },

    #[error("failed to {operation} {target}: {reason}")]
    FailedOperationWithTarget {
        operation: String,
        target: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl CifeError {
    /// Create an error for a failed IO operation with context
    pub fn io_operation(
        operation: &str,
        path: impl std::fmt::Display,
        error: impl std::fmt::Display,
    ) -> Self {
        CifeError::FailedOperationWithTarget {
            operation: operation.to_string(),
            target: path.to_string(),
            reason: error.to_string(),
        }
    }

    /// Create an error for a failed operation
    pub fn operation(operation: &str, error: impl std::fmt::Display) -> Self {
        CifeError::FailedOperation {
            operation: operation.to_string(),
            reason: error.to_string(),
        }
    }

    /// Create an error for an invalid value or configuration
    pub fn invalid_value(context: &str, value: impl std::fmt::Display) -> Self {
        CifeError::InvalidValue {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for an entity that was not found
    pub fn not_found(context: &str, value: impl std::fmt::Display) -> Self {
        CifeError::NotFound {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for an unsupported value
    pub fn unsupported(
        context: &str,
        value: impl std::fmt::Display,
        supported: impl std::fmt::Display,
    ) -> Self {
        CifeError::Unsupported {
            context: context.to_string(),
            value: value.to_string(),
            supported: supported.to_string(),
        }
    }

    /// Create an error for a column missing from every row of a table
    pub fn missing_column(column: &str, path: impl Into<PathBuf>) -> Self {
        CifeError::MissingColumn {
            column: column.to_string(),
            path: path.into(),
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CifeError::UnknownFormat(_)
            | CifeError::UsageError(_)
            | CifeError::InvalidValue { .. }
            | CifeError::Unsupported { .. } => ExitCode::Usage,

            CifeError::InputNotFound { .. }
            | CifeError::MissingColumn { .. }
            | CifeError::MalformedTable { .. }
            | CifeError::NotFound { .. } => ExitCode::Data,

            CifeError::Io(_)
            | CifeError::Json(_)
            | CifeError::Toml(_)
            | CifeError::Csv(_)
            | CifeError::Http(_)
            | CifeError::FailedOperation { .. }
            | CifeError::FailedOperationWithTarget { .. }
            | CifeError::Other(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            CifeError::UnknownFormat(_) => "unknown_format",
            CifeError::UsageError(_) => "usage_error",
            CifeError::InvalidValue { .. } => "invalid_value",
            CifeError::Unsupported { .. } => "unsupported",
            CifeError::InputNotFound { .. } => "input_not_found",
            CifeError::MissingColumn { .. } => "missing_column",
            CifeError::MalformedTable { .. } => "malformed_table",
            CifeError::NotFound { .. } => "not_found",
            CifeError::Io(_) => "io_error",
            CifeError::Json(_) => "json_error",
            CifeError::Toml(_) => "toml_error",
            CifeError::Csv(_) => "csv_error",
            CifeError::Http(_) => "http_error",
            CifeError::FailedOperation { .. } => "failed_operation",
            CifeError::FailedOperationWithTarget { .. } => "failed_operation_with_target",
            CifeError::Other(_) => "other",
        }
    }

    /// Convert error to JSON representation for structured error output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

/// Result type alias for cife operations
pub type Result<T> = std::result::Result<T, CifeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_group() {
        assert_eq!(
            CifeError::UsageError("bad".into()).exit_code(),
            ExitCode::Usage
        );
        assert_eq!(
            CifeError::missing_column("id", "a.jsonl").exit_code(),
            ExitCode::Data
        );
        assert_eq!(CifeError::Other("x".into()).exit_code(), ExitCode::Failure);
    }

    #[test]
    fn test_to_json_envelope() {
        let err = CifeError::invalid_value("drop-top", "-1");
        let json = err.to_json();
        assert_eq!(json["error"]["code"], 2);
        assert_eq!(json["error"]["type"], "invalid_value");
        assert_eq!(json["error"]["message"], "invalid drop-top: -1");
    }
}
