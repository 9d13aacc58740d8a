//! Error taxonomy for factstore operations.
//!
//! Backend failures arrive as [`anyhow::Error`] from [`Store`](crate::store::Store)
//! implementations and are surfaced as [`Error::Storage`]. Per-element
//! shredding problems are not errors at this level; see
//! [`SchemaMismatch`](crate::shred::SchemaMismatch).

use thiserror::Error;

/// Main error type for factstore operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias for factstore.
pub type Result<T> = std::result::Result<T, Error>;
