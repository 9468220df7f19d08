//! Core contracts shared by the unifill crates.
//!
//! Defines the value and record types handed to the loader, the write
//! operation that describes a target table, and the key sources used to read
//! parent populations.

pub mod error;
pub mod keys;
pub mod record;
pub mod sql;
pub mod value;

pub use error::{Error, Result};
pub use keys::{KeyFilter, KeySource};
pub use record::{Record, WriteOperation};
pub use sql::{quote_ident, quote_qualified};
pub use value::Value;

/// Default number of records submitted in one bulk write.
pub const DEFAULT_BATCH_BOUND: usize = 10_000;
