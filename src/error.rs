//! Error types for liftlab
//!
//! Normalization is all-or-nothing: a single cast failure aborts the whole
//! relation, so `TypeMismatch` carries enough context (column, offending
//! value, expected type) to find the bad source row without a debugger.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// liftlab error types
#[derive(Error, Debug)]
pub enum Error {
    /// A source field could not be cast to its declared canonical type.
    ///
    /// This is the only normalization failure mode. It is never downgraded
    /// to a warning and never retried; the relation that produced it is not
    /// published.
    #[error("type mismatch in column '{column}': cannot cast {value} to {expected}")]
    TypeMismatch {
        /// Column whose cast failed
        column: String,
        /// Offending source value, JSON-rendered
        value: String,
        /// Declared canonical type
        expected: &'static str,
    },

    /// A statistics routine was called with arguments outside its domain
    /// (e.g. non-positive totals, success counts above totals).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Relation store / columnar boundary error (Arrow/Parquet/CSV)
    #[error("storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// Build a `TypeMismatch` for `column`, rendering the raw JSON value.
    #[must_use]
    pub fn type_mismatch(
        column: &str,
        value: &serde_json::Value,
        expected: &'static str,
    ) -> Self {
        Self::TypeMismatch {
            column: column.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message_names_column_and_type() {
        let err = Error::type_mismatch("user_id", &serde_json::json!("abc"), "i64");
        let msg = err.to_string();
        assert!(msg.contains("user_id"));
        assert!(msg.contains("\"abc\""));
        assert!(msg.contains("i64"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing seed");
        let err: Error = io.into();
        assert!(err.to_string().contains("missing seed"));
    }
}
