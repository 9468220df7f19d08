//! Batched bulk loading with per-record fallback.
//!
//! [`BatchedLoader`] splits a record sequence into chunks of at most
//! [`BatchBound`] records and writes each chunk as one bulk statement inside a
//! transaction. When a chunk fails on a recoverable error, it is rolled back and
//! retried one record at a time, so a single bad row only costs itself.

pub mod errors;
pub mod loader;
pub mod memory;
pub mod postgres;
pub mod session;

pub use errors::LoadError;
pub use loader::{BatchBound, BatchedLoader, LoadReport, LoadSink, MAX_SKIPPED_SAMPLES, SkippedRecord};
pub use memory::{MemorySession, MemoryStats};
pub use postgres::{PostgresSession, SessionOptions, failure_kind};
pub use session::{FailureKind, Session, SessionError};
