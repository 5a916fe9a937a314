//! CouchDB-flavoured document store over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use url::Url;

use objectdoc_core::{document, fields, Document, Selector};
use objectdoc_store::{BulkResult, DocumentStore, StoreError};

/// Error body the store attaches to failing responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Acknowledgement of a single-document write.
#[derive(Debug, Deserialize)]
struct WriteAck {
    id: String,
    rev: String,
}

/// Response body of the find endpoint.
#[derive(Debug, Deserialize)]
struct FindResponse {
    docs: Option<Vec<Document>>,
    #[serde(default)]
    warning: Option<String>,
}

/// A [`DocumentStore`] over the CouchDB HTTP API.
///
/// The base URL names the database (`http://host:5984/app`). The client is
/// decided once at construction and held as an immutable dependency.
pub struct CouchStore {
    client: Client,
    base: Url,
    auth: Option<(String, String)>,
}

impl CouchStore {
    /// Create a store against the given database URL.
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let base = Url::parse(base_url).map_err(|e| StoreError::InvalidEndpoint {
            message: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(StoreError::InvalidEndpoint {
                message: format!("not a usable database URL: {}", base),
            });
        }

        Ok(CouchStore {
            client: Client::new(),
            base,
            auth: None,
        })
    }

    /// Replace the HTTP client with one using the given request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, StoreError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StoreError::unavailable)?;
        Ok(self)
    }

    /// Send basic-auth credentials with every request.
    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((user.into(), password.into()));
        self
    }

    /// URL of a document or endpoint under the database.
    ///
    /// Built through path segments rather than `Url::join`, so identities
    /// containing `:` (schema documents) cannot reparse as a URL scheme.
    fn url_for(&self, segment: &str) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidEndpoint {
                message: format!("not a usable database URL: {}", self.base),
            })?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    /// Map a failing response onto the store error taxonomy.
    async fn error_from(response: reqwest::Response) -> StoreError {
        let status = response.status();
        let body = response.json::<ErrorBody>().await.ok();

        if status == StatusCode::CONFLICT
            || body.as_ref().map(|b| b.error == "conflict").unwrap_or(false)
        {
            return StoreError::Conflict;
        }

        let detail = body
            .map(|b| format!("{}: {}", b.error, b.reason.unwrap_or_default()))
            .unwrap_or_default();
        StoreError::Unavailable(format!("HTTP {} {}", status, detail).into())
    }

    async fn write_ack(response: reqwest::Response, mut doc: Document) -> Result<Document, StoreError> {
        let ack: WriteAck = response
            .json()
            .await
            .map_err(|e| StoreError::malformed(format!("write acknowledgement: {}", e)))?;

        doc.insert(fields::ID.to_string(), ack.id.into());
        doc.insert(fields::REV.to_string(), ack.rev.into());
        Ok(doc)
    }
}

#[async_trait]
impl DocumentStore for CouchStore {
    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let response = self
            .request(Method::GET, self.url_for(id)?)
            .send()
            .await
            .map_err(StoreError::unavailable)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let doc = response
                    .json::<Document>()
                    .await
                    .map_err(|e| StoreError::malformed(format!("document body: {}", e)))?;
                Ok(Some(doc))
            }
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn create(&self, doc: Document) -> Result<Document, StoreError> {
        let response = self
            .request(Method::POST, self.base.clone())
            .json(&doc)
            .send()
            .await
            .map_err(StoreError::unavailable)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Self::write_ack(response, doc).await
    }

    async fn update(&self, doc: Document) -> Result<Document, StoreError> {
        let id = document::id(&doc)
            .ok_or_else(|| StoreError::malformed("update without document identity"))?
            .to_string();

        let response = self
            .request(Method::PUT, self.url_for(&id)?)
            .json(&doc)
            .send()
            .await
            .map_err(StoreError::unavailable)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound { id }),
            status if status.is_success() => Self::write_ack(response, doc).await,
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn bulk_update(&self, docs: Vec<Document>) -> Result<Vec<BulkResult>, StoreError> {
        let body = serde_json::json!({ "docs": docs });
        let response = self
            .request(Method::POST, self.url_for("_bulk_docs")?)
            .json(&body)
            .send()
            .await
            .map_err(StoreError::unavailable)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        response
            .json::<Vec<BulkResult>>()
            .await
            .map_err(|e| StoreError::malformed(format!("bulk outcomes: {}", e)))
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<Document>, StoreError> {
        let response = self
            .request(Method::POST, self.url_for("_find")?)
            .json(selector)
            .send()
            .await
            .map_err(StoreError::unavailable)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let body: FindResponse = response
            .json()
            .await
            .map_err(|e| StoreError::malformed(format!("find response: {}", e)))?;

        if let Some(warning) = body.warning {
            log::debug!("store warning for selector: {}", warning);
        }

        body.docs
            .ok_or_else(|| StoreError::malformed("find response without docs member"))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut doc = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        document::tombstone(&mut doc);
        self.update(doc).await?;
        Ok(())
    }
}
