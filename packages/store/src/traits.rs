//! The document-store trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use objectdoc_core::{Document, Selector};

use crate::StoreError;

/// Per-document outcome of a bulk write.
///
/// Mirrors the store's bulk-write response: a succeeding entry carries the
/// new revision, a failing one carries the error name and reason. A failing
/// entry does not fail the bulk call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResult {
    pub id: String,

    #[serde(default)]
    pub ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The minimal operation set the translation engine needs from a document
/// store.
///
/// Implementations own all durable state and all transport concerns
/// (timeouts, retries, connection handling). The engine constructs fresh
/// request bodies per call and holds no state between calls.
///
/// # Object Safety
///
/// The trait is object-safe: `Box<dyn DocumentStore>` works, and blanket
/// implementations cover `&T`, `Box<T>` and `Arc<T>`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by identity.
    ///
    /// Returns `Ok(None)` when the document does not exist or has been
    /// tombstoned - absence is not an error condition.
    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Store a new document.
    ///
    /// Returns the stored document with identity and revision filled in.
    /// Fails with [`StoreError::Conflict`] when a live document already
    /// holds the identity.
    async fn create(&self, doc: Document) -> Result<Document, StoreError>;

    /// Overwrite an existing document.
    ///
    /// The document must carry identity and revision; a stale revision fails
    /// with [`StoreError::Conflict`] (the store's optimistic concurrency).
    async fn update(&self, doc: Document) -> Result<Document, StoreError>;

    /// Write many documents in one round-trip, with per-document outcomes.
    async fn bulk_update(&self, docs: Vec<Document>) -> Result<Vec<BulkResult>, StoreError>;

    /// Run a selector and return the matching documents.
    async fn query(&self, selector: &Selector) -> Result<Vec<Document>, StoreError>;

    /// Tombstone a document by identity.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

// Blanket implementations for references and smart pointers.

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        (**self).get(id).await
    }

    async fn create(&self, doc: Document) -> Result<Document, StoreError> {
        (**self).create(doc).await
    }

    async fn update(&self, doc: Document) -> Result<Document, StoreError> {
        (**self).update(doc).await
    }

    async fn bulk_update(&self, docs: Vec<Document>) -> Result<Vec<BulkResult>, StoreError> {
        (**self).bulk_update(docs).await
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<Document>, StoreError> {
        (**self).query(selector).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Box<T> {
    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.as_ref().get(id).await
    }

    async fn create(&self, doc: Document) -> Result<Document, StoreError> {
        self.as_ref().create(doc).await
    }

    async fn update(&self, doc: Document) -> Result<Document, StoreError> {
        self.as_ref().update(doc).await
    }

    async fn bulk_update(&self, docs: Vec<Document>) -> Result<Vec<BulkResult>, StoreError> {
        self.as_ref().bulk_update(docs).await
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<Document>, StoreError> {
        self.as_ref().query(selector).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.as_ref().delete(id).await
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.as_ref().get(id).await
    }

    async fn create(&self, doc: Document) -> Result<Document, StoreError> {
        self.as_ref().create(doc).await
    }

    async fn update(&self, doc: Document) -> Result<Document, StoreError> {
        self.as_ref().update(doc).await
    }

    async fn bulk_update(&self, docs: Vec<Document>) -> Result<Vec<BulkResult>, StoreError> {
        self.as_ref().bulk_update(docs).await
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<Document>, StoreError> {
        self.as_ref().query(selector).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.as_ref().delete(id).await
    }
}
