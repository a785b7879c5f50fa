// libs/shared/store/src/rest.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::document::{Document, DocumentKey, TransactionSnapshot, WriteOp};
use crate::error::{StoreError, TransactionError};
use crate::store::{DocumentStore, DEFAULT_TXN_ATTEMPTS};

/// HTTP client for the remote document store.
///
/// Documents live under `/v1/{collection}/{id}`. Transactions follow the
/// begin/commit protocol: `POST /v1/transactions/begin` yields a token,
/// reads carry it as a `transaction` query parameter so the server pins them
/// to one snapshot, and `POST /v1/transactions/commit` applies the write
/// set. A 409 from commit means a concurrent writer won; the client backs
/// off and re-runs the transaction body against a fresh snapshot.
#[derive(Debug, Clone)]
pub struct RestDocumentStore {
    client: Client,
    base_url: String,
    api_key: String,
    max_attempts: u32,
    retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct BeginTransactionResponse {
    transaction: String,
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    transaction: &'a str,
    writes: &'a [WriteOp],
}

enum CommitOutcome {
    Committed,
    Conflict,
}

impl RestDocumentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_retry(config, DEFAULT_TXN_ATTEMPTS, Duration::from_millis(100))
    }

    pub fn with_retry(config: &AppConfig, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: config.docstore_url.clone(),
            api_key: config.docstore_api_key.clone(),
            max_attempts,
            retry_delay,
        }
    }

    fn doc_url(&self, key: &DocumentKey) -> String {
        format!("{}/v1/{}/{}", self.base_url, key.collection, key.id)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/v1/{}", self.base_url, collection)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Invalid response body: {}", e)))
    }

    async fn status_error(status: StatusCode, response: Response) -> StoreError {
        let detail = response.text().await.unwrap_or_default();
        error!("Document store request failed with status {}: {}", status, detail);
        StoreError::Unavailable(format!("{}: {}", status, detail))
    }

    async fn begin_transaction(&self) -> Result<String, StoreError> {
        let url = format!("{}/v1/transactions/begin", self.base_url);
        let response = self.execute(self.request(Method::POST, &url)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, response).await);
        }
        let begun: BeginTransactionResponse = Self::parse_json(response).await?;
        debug!("Began store transaction {}", begun.transaction);
        Ok(begun.transaction)
    }

    async fn get_in_transaction(
        &self,
        key: &DocumentKey,
        transaction: &str,
    ) -> Result<Option<Document>, StoreError> {
        let request = self
            .request(Method::GET, &self.doc_url(key))
            .query(&[("transaction", transaction)]);
        let response = self.execute(request).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(Self::parse_json(response).await?)),
            status => Err(Self::status_error(status, response).await),
        }
    }

    async fn commit_transaction(
        &self,
        transaction: &str,
        writes: &[WriteOp],
    ) -> Result<CommitOutcome, StoreError> {
        let url = format!("{}/v1/transactions/commit", self.base_url);
        let request = self
            .request(Method::POST, &url)
            .json(&CommitRequest { transaction, writes });
        let response = self.execute(request).await?;
        match response.status() {
            StatusCode::CONFLICT => Ok(CommitOutcome::Conflict),
            status if status.is_success() => Ok(CommitOutcome::Committed),
            status => Err(Self::status_error(status, response).await),
        }
    }

    /// Best effort: the server expires abandoned transactions on its own.
    async fn rollback_transaction(&self, transaction: &str) {
        let url = format!("{}/v1/transactions/rollback", self.base_url);
        let request = self
            .request(Method::POST, &url)
            .json(&json!({ "transaction": transaction }));
        if let Err(e) = self.execute(request).await {
            debug!("Transaction rollback failed: {}", e);
        }
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError> {
        debug!("Fetching document {}", key);
        let response = self.execute(self.request(Method::GET, &self.doc_url(key))).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(Self::parse_json(response).await?)),
            status => Err(Self::status_error(status, response).await),
        }
    }

    async fn list(
        &self,
        collection: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<Document>, StoreError> {
        let request = self
            .request(Method::GET, &self.collection_url(collection))
            .query(filters);
        let response = self.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, response).await);
        }
        Self::parse_json(response).await
    }

    async fn set(&self, key: &DocumentKey, fields: Value) -> Result<(), StoreError> {
        let request = self
            .request(Method::PUT, &self.doc_url(key))
            .json(&json!({ "fields": fields }));
        let response = self.execute(request).await?;
        match response.status() {
            StatusCode::CONFLICT => Err(StoreError::Conflict(key.to_string())),
            status if status.is_success() => Ok(()),
            status => Err(Self::status_error(status, response).await),
        }
    }

    async fn update(&self, key: &DocumentKey, fields: Value) -> Result<(), StoreError> {
        let request = self
            .request(Method::PATCH, &self.doc_url(key))
            .json(&json!({ "fields": fields }));
        let response = self.execute(request).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(key.clone())),
            StatusCode::CONFLICT => Err(StoreError::Conflict(key.to_string())),
            status if status.is_success() => Ok(()),
            status => Err(Self::status_error(status, response).await),
        }
    }

    async fn delete(&self, key: &DocumentKey) -> Result<(), StoreError> {
        let response = self
            .execute(self.request(Method::DELETE, &self.doc_url(key)))
            .await?;
        match response.status() {
            // Deleting an absent document is a no-op, same as the in-memory store.
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => Err(Self::status_error(status, response).await),
        }
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
            let transaction = self.begin_transaction().await?;

            let mut snapshot = TransactionSnapshot::default();
            for key in &read_keys {
                if let Some(doc) = self.get_in_transaction(key, &transaction).await? {
                    snapshot.insert(key.clone(), doc);
                }
            }

            let (value, writes) = match body(&snapshot) {
                Ok(plan) => plan,
                Err(e) => {
                    self.rollback_transaction(&transaction).await;
                    return Err(TransactionError::Aborted(e));
                }
            };

            match self.commit_transaction(&transaction, &writes).await? {
                CommitOutcome::Committed => return Ok(value),
                CommitOutcome::Conflict => {
                    debug!("Transaction commit conflicted on attempt {}, retrying", attempt);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        error!(
            "Transaction still conflicted after {} attempts, giving up",
            self.max_attempts
        );
        Err(StoreError::RetriesExhausted(self.max_attempts).into())
    }
}
