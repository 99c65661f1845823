//! Error types for the ETL pipeline.
//!
//! Validation failures (missing columns, empty inputs, duplicate keys, range
//! violations, join cardinality and row-count violations) are fatal and abort
//! the run. Coercion problems never show up here: they are absorbed into the
//! missing-value channel and only reported as counts.
//!
//! Errors serialize as `{ "code", "message" }` so the CLI can emit them in
//! JSON mode.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the ETL pipeline.
#[derive(Error, Debug)]
pub enum EtlError {
    /// One or more required columns are absent from a table.
    #[error("Table '{table}' is missing required columns: {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    /// A table has zero rows.
    #[error("Table '{0}' is empty")]
    EmptyTable(String),

    /// A key that must be unique is duplicated.
    #[error(
        "Column '{column}' in table '{table}' must be unique but has {duplicates} duplicated keys (e.g. {})",
        examples.join(", ")
    )]
    DuplicateKey {
        table: String,
        column: String,
        duplicates: usize,
        examples: Vec<String>,
    },

    /// Values fall outside an allowed range.
    #[error("Column '{column}' has {violations} values outside {bound}")]
    ValueOutOfRange {
        column: String,
        violations: usize,
        bound: String,
    },

    /// A join key is duplicated on a side that the validation requires unique.
    #[error(
        "Join on '{key}' violates {validation} validation: {duplicates} duplicated keys in the {side} table"
    )]
    JoinCardinality {
        key: String,
        validation: String,
        side: String,
        duplicates: usize,
    },

    /// The joined table does not have the same number of rows as the left input.
    #[error("Row count changed on left join (join explosion?): expected {expected}, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// A numeric argument is outside its domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A sample group is empty after dropping missing values.
    #[error("Group '{0}' is empty after cleaning")]
    EmptyGroup(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EtlError>,
    },
}

impl EtlError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EtlError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingColumns { .. } => "MISSING_COLUMNS",
            Self::EmptyTable(_) => "EMPTY_TABLE",
            Self::DuplicateKey { .. } => "DUPLICATE_KEY",
            Self::ValueOutOfRange { .. } => "VALUE_OUT_OF_RANGE",
            Self::JoinCardinality { .. } => "JOIN_CARDINALITY",
            Self::RowCountMismatch { .. } => "ROW_COUNT_MISMATCH",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::EmptyGroup(_) => "EMPTY_GROUP",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The innermost error, skipping any context wrappers.
    pub fn root(&self) -> &EtlError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error is a data-validation failure (bad input data or
    /// a join configuration bug) rather than an I/O or internal failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.root(),
            Self::MissingColumns { .. }
                | Self::EmptyTable(_)
                | Self::DuplicateKey { .. }
                | Self::ValueOutOfRange { .. }
                | Self::JoinCardinality { .. }
                | Self::RowCountMismatch { .. }
        )
    }
}

impl Serialize for EtlError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("EtlError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EtlError::Polars(e).with_context(context))
    }
}
