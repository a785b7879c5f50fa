// libs/shared/store/src/store.rs

use async_trait::async_trait;
use serde_json::Value;

use crate::document::{Document, DocumentKey, TransactionSnapshot, WriteOp};
use crate::error::{StoreError, TransactionError};

/// Default bound on optimistic-transaction attempts before the store gives
/// up and surfaces `StoreError::RetriesExhausted`.
pub const DEFAULT_TXN_ATTEMPTS: u32 = 5;

/// Contract every document store backing the scheduling engine must honor.
///
/// `run_transaction` is the only way engine code mutates shared documents:
/// the store snapshot-reads every key in `read_keys`, hands the snapshot to
/// `body`, and commits the returned write set only if none of the read
/// documents changed in the meantime. On a conflict the whole body is
/// re-executed against a fresh snapshot, up to a bounded number of attempts.
/// A body error aborts the transaction immediately with nothing written.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError>;

    /// All documents of a collection matching every field-equality filter.
    async fn list(
        &self,
        collection: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<Document>, StoreError>;

    /// Create or fully overwrite one document.
    async fn set(&self, key: &DocumentKey, fields: Value) -> Result<(), StoreError>;

    /// Merge fields into an existing document; `NotFound` if it is absent.
    async fn update(&self, key: &DocumentKey, fields: Value) -> Result<(), StoreError>;

    /// Remove one document. Deleting an absent document is a no-op.
    async fn delete(&self, key: &DocumentKey) -> Result<(), StoreError>;

    async fn run_transaction<T, E, F>(
        &self,
        read_keys: Vec<DocumentKey>,
        body: F,
    ) -> Result<T, TransactionError<E>>
    where
        T: Send,
        E: std::error::Error + Send,
        F: Fn(&TransactionSnapshot) -> Result<(T, Vec<WriteOp>), E> + Send + Sync;
}
