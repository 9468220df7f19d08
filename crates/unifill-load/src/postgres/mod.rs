use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use unifill_core::{KeySource, Record, Value, WriteOperation};

use crate::session::{FailureKind, Session, SessionError};

mod queries;

/// Options used when opening a [`PostgresSession`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub acquire_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Postgres-backed session holding at most one open transaction.
///
/// The pool is capped at one connection so every statement of a run goes
/// through the same backend. Dropping the session with a transaction still
/// open rolls it back.
#[derive(Debug)]
pub struct PostgresSession {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresSession {
    /// Wrap a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    pub async fn connect(url: &str, options: &SessionOptions) -> Result<Self, SessionError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(options.acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn transaction(&mut self) -> Result<&mut Transaction<'static, Postgres>, SessionError> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };
        Ok(self.tx.insert(tx))
    }
}

#[async_trait]
impl Session for PostgresSession {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn insert_many(
        &mut self,
        op: &WriteOperation,
        records: &[Record],
    ) -> Result<u64, SessionError> {
        let tx = self.transaction().await?;
        let mut affected = 0;
        for statement in records.chunks(queries::rows_per_statement(op)) {
            affected += queries::insert_rows(&mut **tx, op, statement).await?;
        }
        Ok(affected)
    }

    async fn insert_one(
        &mut self,
        op: &WriteOperation,
        record: &Record,
    ) -> Result<(), SessionError> {
        let tx = self.transaction().await?;
        queries::insert_rows(&mut **tx, op, std::slice::from_ref(record)).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SessionError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SessionError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    async fn fetch_keys(&mut self, source: &KeySource) -> Result<Vec<Vec<Value>>, SessionError> {
        match self.tx.as_mut() {
            Some(tx) => queries::fetch_keys(&mut **tx, source).await,
            None => {
                let mut conn = self.pool.acquire().await?;
                queries::fetch_keys(&mut conn, source).await
            }
        }
    }
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        let kind = failure_kind(&err);
        let code = match &err {
            sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
            _ => None,
        };
        SessionError {
            kind,
            code,
            message: err.to_string(),
        }
    }
}

/// Classify a driver error by how much of the run it invalidates.
///
/// SQLSTATE classes 22 (data exception) and 23 (integrity constraint) are row
/// content problems. Class 08 and operator interventions (57P) end the session.
pub fn failure_kind(err: &sqlx::Error) -> FailureKind {
    match err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(code) if code.starts_with("22") || code.starts_with("23") => FailureKind::Row,
            Some(code) if code.starts_with("08") || code.starts_with("57P") => {
                FailureKind::Connection
            }
            _ => FailureKind::Statement,
        },
        sqlx::Error::Encode(_) => FailureKind::Row,
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::RowNotFound => FailureKind::Statement,
        _ => FailureKind::Connection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_and_pool_errors_are_fatal() {
        let io = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert_eq!(failure_kind(&io), FailureKind::Connection);
        assert_eq!(failure_kind(&sqlx::Error::PoolTimedOut), FailureKind::Connection);
        assert_eq!(failure_kind(&sqlx::Error::PoolClosed), FailureKind::Connection);
    }

    #[test]
    fn decode_errors_are_statement_level() {
        assert_eq!(failure_kind(&sqlx::Error::RowNotFound), FailureKind::Statement);
        let err = sqlx::Error::ColumnNotFound("keyword".to_string());
        assert_eq!(failure_kind(&err), FailureKind::Statement);
    }
}
