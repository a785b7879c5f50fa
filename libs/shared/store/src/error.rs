// libs/shared/store/src/error.rs

use thiserror::Error;

use crate::document::DocumentKey;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Document not found: {0}")]
    NotFound(DocumentKey),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Transaction still conflicted after {0} attempts")]
    RetriesExhausted(u32),

    #[error("Malformed document {key}: {reason}")]
    Malformed { key: DocumentKey, reason: String },
}

/// Outcome of a failed transaction: either the body aborted with a domain
/// error (terminal, no retry) or the store itself failed.
#[derive(Error, Debug)]
pub enum TransactionError<E: std::error::Error> {
    #[error("{0}")]
    Aborted(E),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<E: std::error::Error> TransactionError<E> {
    /// Collapse into the domain error when it can absorb store failures.
    pub fn flatten(self) -> E
    where
        E: From<StoreError>,
    {
        match self {
            TransactionError::Aborted(err) => err,
            TransactionError::Store(err) => E::from(err),
        }
    }
}
