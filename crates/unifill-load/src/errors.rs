use thiserror::Error;

use crate::session::SessionError;

/// Errors that abort a load. Row-level failures never surface here.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid record: {0}")]
    Record(#[from] unifill_core::Error),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("batch bound must be at least 1")]
    ZeroBatchBound,
}
