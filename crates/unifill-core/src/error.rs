use thiserror::Error;

/// Core error type shared across unifill crates.
#[derive(Debug, Error)]
pub enum Error {
    /// A table or column name cannot be used in a statement.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// A write operation or key source was built with no columns.
    #[error("no columns given for '{0}'")]
    NoColumns(String),
    /// A record does not match the column list of its write operation.
    #[error("record for '{table}' has {actual} values, expected {expected}")]
    ArityMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
    /// A column is not part of the write operation.
    #[error("unknown column '{column}' for '{table}'")]
    UnknownColumn { table: String, column: String },
}

/// Convenience alias for results returned by unifill crates.
pub type Result<T> = std::result::Result<T, Error>;
