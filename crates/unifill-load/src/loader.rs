use std::num::NonZeroUsize;

use serde::Serialize;
use tracing::{debug, info, warn};

use unifill_core::{DEFAULT_BATCH_BOUND, Record, WriteOperation};

use crate::errors::LoadError;
use crate::session::{Session, SessionError};

/// Skipped records kept verbatim in a [`LoadReport`]; the rest are only counted and logged.
pub const MAX_SKIPPED_SAMPLES: usize = 100;

/// Maximum number of records in one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchBound(NonZeroUsize);

impl BatchBound {
    pub fn new(bound: usize) -> Result<Self, LoadError> {
        NonZeroUsize::new(bound)
            .map(Self)
            .ok_or(LoadError::ZeroBatchBound)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for BatchBound {
    fn default() -> Self {
        Self(NonZeroUsize::new(DEFAULT_BATCH_BOUND).unwrap_or(NonZeroUsize::MIN))
    }
}

/// A record the loader gave up on, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    /// Position of the record in the submitted sequence.
    pub index: u64,
    pub record: String,
    pub cause: String,
}

/// Outcome of loading one table.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub submitted: u64,
    pub written: u64,
    pub skipped: u64,
    pub chunks: u64,
    /// Chunks whose bulk write failed and were retried record by record.
    pub fallback_chunks: u64,
    pub skipped_samples: Vec<SkippedRecord>,
}

impl LoadReport {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            submitted: 0,
            written: 0,
            skipped: 0,
            chunks: 0,
            fallback_chunks: 0,
            skipped_samples: Vec::new(),
        }
    }

    /// Every submitted record was either written or skipped.
    pub fn is_conserved(&self) -> bool {
        self.written + self.skipped == self.submitted
    }
}

/// Persists records in bounded chunks, demoting failed chunks to per-record writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchedLoader {
    bound: BatchBound,
}

impl BatchedLoader {
    pub fn new(bound: BatchBound) -> Self {
        Self { bound }
    }

    pub fn bound(&self) -> BatchBound {
        self.bound
    }

    /// Load a fully materialized sequence.
    ///
    /// Arity is verified for every record before the first write.
    pub async fn load<S>(
        &self,
        session: &mut S,
        op: &WriteOperation,
        records: &[Record],
    ) -> Result<LoadReport, LoadError>
    where
        S: Session + ?Sized,
    {
        for record in records {
            op.check(record)?;
        }

        let mut sink = self.sink(session, op);
        for chunk in records.chunks(self.bound.get()) {
            sink.write_chunk(chunk).await?;
        }
        sink.finish().await
    }

    /// Open a streaming sink that flushes every time the bound is reached.
    pub fn sink<'s, S>(&self, session: &'s mut S, op: &'s WriteOperation) -> LoadSink<'s, S>
    where
        S: Session + ?Sized,
    {
        LoadSink {
            session,
            op,
            bound: self.bound.get(),
            buffer: Vec::with_capacity(self.bound.get()),
            report: LoadReport::new(op.table()),
        }
    }
}

/// Streaming side of [`BatchedLoader`]: records are buffered up to one chunk.
pub struct LoadSink<'s, S: Session + ?Sized> {
    session: &'s mut S,
    op: &'s WriteOperation,
    bound: usize,
    buffer: Vec<Record>,
    report: LoadReport,
}

impl<'s, S: Session + ?Sized> LoadSink<'s, S> {
    pub async fn push(&mut self, record: Record) -> Result<(), LoadError> {
        self.op.check(&record)?;
        self.buffer.push(record);
        if self.buffer.len() >= self.bound {
            self.flush().await?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), LoadError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.bound));
        self.write_chunk(&chunk).await
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Records accepted by `push` but not flushed yet.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub async fn finish(mut self) -> Result<LoadReport, LoadError> {
        self.flush().await?;
        info!(
            event = "load_finished",
            table = %self.report.table,
            submitted = self.report.submitted,
            written = self.report.written,
            skipped = self.report.skipped,
            chunks = self.report.chunks,
            fallback_chunks = self.report.fallback_chunks
        );
        Ok(self.report)
    }

    async fn write_chunk(&mut self, chunk: &[Record]) -> Result<(), LoadError> {
        let first_index = self.report.submitted;
        self.report.chunks += 1;
        self.report.submitted += chunk.len() as u64;

        let bulk = match self.session.insert_many(self.op, chunk).await {
            Ok(_) => self.session.commit().await,
            Err(err) => Err(err),
        };

        match bulk {
            Ok(()) => {
                self.report.written += chunk.len() as u64;
                self.log_progress(chunk.len(), false);
                Ok(())
            }
            Err(err) if err.is_fatal() => Err(self.abort(err).await),
            Err(err) => {
                warn!(
                    event = "chunk_failed",
                    table = %self.op.table(),
                    chunk = self.report.chunks,
                    size = chunk.len(),
                    error = %err,
                    "bulk write failed, retrying records one by one"
                );
                self.session.rollback().await?;
                self.report.fallback_chunks += 1;
                self.write_records(first_index, chunk).await?;
                self.log_progress(chunk.len(), true);
                Ok(())
            }
        }
    }

    async fn write_records(&mut self, first_index: u64, chunk: &[Record]) -> Result<(), LoadError> {
        for (offset, record) in chunk.iter().enumerate() {
            match self.write_one(record).await {
                Ok(()) => self.report.written += 1,
                Err(err) if err.is_row_level() => {
                    self.session.rollback().await?;
                    self.skip(first_index + offset as u64, record, &err);
                }
                Err(err) => return Err(self.abort(err).await),
            }
        }
        Ok(())
    }

    /// Release the open transaction before surfacing a fatal error.
    async fn abort(&mut self, err: SessionError) -> LoadError {
        if let Err(release) = self.session.rollback().await {
            debug!(
                event = "rollback_failed",
                table = %self.op.table(),
                error = %release
            );
        }
        err.into()
    }

    async fn write_one(&mut self, record: &Record) -> Result<(), SessionError> {
        self.session.insert_one(self.op, record).await?;
        self.session.commit().await
    }

    fn skip(&mut self, index: u64, record: &Record, cause: &SessionError) {
        self.report.skipped += 1;
        warn!(
            event = "record_skipped",
            table = %self.op.table(),
            index,
            record = %record,
            cause = %cause
        );
        if self.report.skipped_samples.len() < MAX_SKIPPED_SAMPLES {
            self.report.skipped_samples.push(SkippedRecord {
                index,
                record: record.to_string(),
                cause: cause.to_string(),
            });
        }
    }

    fn log_progress(&self, size: usize, fallback: bool) {
        info!(
            event = "chunk_committed",
            table = %self.op.table(),
            chunk = self.report.chunks,
            size,
            fallback,
            processed = self.report.submitted,
            written = self.report.written,
            skipped = self.report.skipped
        );
    }
}
