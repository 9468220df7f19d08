use async_trait::async_trait;
use thiserror::Error;

use unifill_core::{KeySource, Record, Value, WriteOperation};

/// How far the damage of a failed statement reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The content of a row was rejected (constraint, range, type).
    Row,
    /// The statement failed for a reason not tied to one row; the session is still usable.
    Statement,
    /// The session itself is gone or unusable.
    Connection,
}

/// Error reported by a [`Session`] primitive.
#[derive(Debug, Clone, Error)]
#[error("{kind:?} failure{}: {message}", code_suffix(.code))]
pub struct SessionError {
    pub kind: FailureKind,
    /// SQLSTATE when the database reported one.
    pub code: Option<String>,
    pub message: String,
}

impl SessionError {
    pub fn row(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Row,
            code: None,
            message: message.into(),
        }
    }

    pub fn statement(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Statement,
            code: None,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Connection,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Recoverable by skipping the single record that caused it.
    pub fn is_row_level(&self) -> bool {
        self.kind == FailureKind::Row
    }

    /// Nothing can be retried on this session any more.
    pub fn is_fatal(&self) -> bool {
        self.kind == FailureKind::Connection
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|code| format!(" [{code}]"))
        .unwrap_or_default()
}

/// Exclusively owned database session used by one generation-and-load run.
///
/// Writes open a transaction implicitly; `commit` and `rollback` close it.
/// Dropping a session with an open transaction discards the pending writes.
#[async_trait]
pub trait Session: Send {
    /// Engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Insert many records as one bulk write. All or none become pending.
    async fn insert_many(
        &mut self,
        op: &WriteOperation,
        records: &[Record],
    ) -> Result<u64, SessionError>;

    /// Insert a single record.
    async fn insert_one(&mut self, op: &WriteOperation, record: &Record)
    -> Result<(), SessionError>;

    async fn commit(&mut self) -> Result<(), SessionError>;

    async fn rollback(&mut self) -> Result<(), SessionError>;

    /// Read the current key tuples of a source, ordered by the key columns
    /// (NULLs last) before any limit applies.
    async fn fetch_keys(&mut self, source: &KeySource) -> Result<Vec<Vec<Value>>, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_when_present() {
        let err = SessionError::row("duplicate key").with_code("23505");
        assert_eq!(err.to_string(), "Row failure [23505]: duplicate key");
        let err = SessionError::connection("broken pipe");
        assert_eq!(err.to_string(), "Connection failure: broken pipe");
        assert!(err.is_fatal());
        assert!(!err.is_row_level());
    }
}
