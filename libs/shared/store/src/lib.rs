pub mod document;
pub mod error;
pub mod memory;
pub mod rest;
pub mod store;

pub use document::{Document, DocumentKey, TransactionSnapshot, WriteOp};
pub use error::{StoreError, TransactionError};
pub use memory::MemoryStore;
pub use rest::RestDocumentStore;
pub use store::DocumentStore;
