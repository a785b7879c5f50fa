// libs/shared/store/src/document.rs

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Address of one document: a collection name plus a document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    pub collection: String,
    pub id: String,
}

impl DocumentKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A stored document: its JSON fields plus the per-document version the
/// store bumps on every write. Versions drive conflict detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub fields: Value,
    pub version: u64,
}

impl Document {
    pub fn new(fields: Value) -> Self {
        Self { fields, version: 1 }
    }

    /// Deserialize the document fields into a typed value.
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.fields.clone())
    }
}

/// One write inside a transaction commit.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOp {
    Set {
        #[serde(flatten)]
        key: DocumentKey,
        fields: Value,
    },
    Update {
        #[serde(flatten)]
        key: DocumentKey,
        fields: Value,
    },
    Delete {
        #[serde(flatten)]
        key: DocumentKey,
    },
}

impl WriteOp {
    pub fn set(key: DocumentKey, fields: Value) -> Self {
        WriteOp::Set { key, fields }
    }

    pub fn update(key: DocumentKey, fields: Value) -> Self {
        WriteOp::Update { key, fields }
    }

    pub fn delete(key: DocumentKey) -> Self {
        WriteOp::Delete { key }
    }

    pub fn key(&self) -> &DocumentKey {
        match self {
            WriteOp::Set { key, .. } => key,
            WriteOp::Update { key, .. } => key,
            WriteOp::Delete { key } => key,
        }
    }
}

/// Consistent view of the documents a transaction declared as its read set.
/// Keys that were absent at snapshot time are simply not present.
#[derive(Debug, Default)]
pub struct TransactionSnapshot {
    docs: HashMap<DocumentKey, Document>,
}

impl TransactionSnapshot {
    pub(crate) fn insert(&mut self, key: DocumentKey, doc: Document) {
        self.docs.insert(key, doc);
    }

    pub fn get(&self, key: &DocumentKey) -> Option<&Document> {
        self.docs.get(key)
    }

    pub fn contains(&self, key: &DocumentKey) -> bool {
        self.docs.contains_key(key)
    }
}
