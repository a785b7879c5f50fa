// libs/shared/store/src/memory.rs

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{Document, DocumentKey, TransactionSnapshot, WriteOp};
use crate::error::{StoreError, TransactionError};
use crate::store::{DocumentStore, DEFAULT_TXN_ATTEMPTS};

/// In-process reference implementation of [`DocumentStore`].
///
/// Documents live in one mutex-guarded map. A transaction snapshots its read
/// set, runs the body without holding the lock, then re-acquires it and
/// commits only if every read document still carries its snapshot version.
/// Contending transactions therefore behave exactly like they do against
/// the remote store: losers re-run their body against post-commit state.
pub struct MemoryStore {
    documents: Mutex<HashMap<DocumentKey, Document>>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_retry(DEFAULT_TXN_ATTEMPTS, Duration::from_millis(10))
    }

    pub fn with_retry(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            max_attempts,
            retry_delay,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DocumentKey, Document>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_writes(
        map: &mut HashMap<DocumentKey, Document>,
        writes: Vec<WriteOp>,
    ) -> Result<(), StoreError> {
        for op in writes {
            match op {
                WriteOp::Set { key, fields } => {
                    let version = map.get(&key).map(|doc| doc.version + 1).unwrap_or(1);
                    map.insert(key, Document { fields, version });
                }
                WriteOp::Update { key, fields } => {
                    let doc = map
                        .get_mut(&key)
                        .ok_or_else(|| StoreError::NotFound(key.clone()))?;
                    merge_fields(&mut doc.fields, fields);
                    doc.version += 1;
                }
                WriteOp::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn list(
        &self,
        collection: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<Document>, StoreError> {
        let map = self.lock();
        let mut matches: Vec<Document> = map
            .iter()
            .filter(|(key, _)| key.collection == collection)
            .filter(|(_, doc)| {
                filters.iter().all(|(field, expected)| {
                    doc.fields.get(*field).and_then(Value::as_str) == Some(*expected)
                })
            })
            .map(|(_, doc)| doc.clone())
            .collect();
        // Stable output order for callers and tests.
        matches.sort_by_key(|doc| doc.fields.get("id").and_then(Value::as_str).map(String::from));
        Ok(matches)
    }

    async fn set(&self, key: &DocumentKey, fields: Value) -> Result<(), StoreError> {
        let mut map = self.lock();
        let version = map.get(key).map(|doc| doc.version + 1).unwrap_or(1);
        map.insert(key.clone(), Document { fields, version });
        Ok(())
    }

    async fn update(&self, key: &DocumentKey, fields: Value) -> Result<(), StoreError> {
        let mut map = self.lock();
        let doc = map
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        merge_fields(&mut doc.fields, fields);
        doc.version += 1;
        Ok(())
    }

    async fn delete(&self, key: &DocumentKey) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn run_transaction<T, E, F>(
        &self,
        read_keys: Vec<DocumentKey>,
        body: F,
    ) -> Result<T, TransactionError<E>>
    where
        T: Send,
        E: std::error::Error + Send,
        F: Fn(&TransactionSnapshot) -> Result<(T, Vec<WriteOp>), E> + Send + Sync,
    {
        for attempt in 1..=self.max_attempts {
            let (snapshot, observed) = {
                let map = self.lock();
                let mut snapshot = TransactionSnapshot::default();
                let mut observed: HashMap<DocumentKey, Option<u64>> = HashMap::new();
                for key in &read_keys {
                    match map.get(key) {
                        Some(doc) => {
                            observed.insert(key.clone(), Some(doc.version));
                            snapshot.insert(key.clone(), doc.clone());
                        }
                        None => {
                            observed.insert(key.clone(), None);
                        }
                    }
                }
                (snapshot, observed)
            };

            let (value, writes) = match body(&snapshot) {
                Ok(plan) => plan,
                Err(e) => return Err(TransactionError::Aborted(e)),
            };

            {
                let mut map = self.lock();
                let conflicted = read_keys.iter().any(|key| {
                    map.get(key).map(|doc| doc.version) != observed.get(key).copied().flatten()
                });
                if !conflicted {
                    Self::apply_writes(&mut map, writes)?;
                    return Ok(value);
                }
            }

            debug!("Transaction conflict on attempt {}, retrying", attempt);
            if attempt < self.max_attempts {
                tokio::time::sleep(self.retry_delay * attempt).await;
            }
        }

        warn!(
            "Transaction still conflicted after {} attempts, giving up",
            self.max_attempts
        );
        Err(StoreError::RetriesExhausted(self.max_attempts).into())
    }
}

fn merge_fields(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (field, value) in incoming {
                existing.insert(field, value);
            }
        }
        (slot, other) => *slot = other,
    }
}
