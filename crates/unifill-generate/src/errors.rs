use thiserror::Error;

use unifill_load::{LoadError, SessionError};

/// Errors emitted by the referential generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("cannot generate '{table}': required key population {keys} is empty")]
    EmptyPopulation { table: String, keys: String },
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Core(#[from] unifill_core::Error),
    #[error("reading existing keys failed: {0}")]
    Session(#[from] SessionError),
    #[error("load failed: {0}")]
    Load(#[from] LoadError),
}
