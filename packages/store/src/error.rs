//! Error types for the store seam.
//!
//! Errors here are transport- and conflict-focused. Semantic errors (an
//! unsupported field type, a duplicate field) belong to the layers above.

/// Errors surfaced by a [`crate::DocumentStore`] implementation.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The store rejected a write because of an identity or revision
    /// conflict. Benign for idempotent class creation; surfaced everywhere
    /// else.
    #[error("document store reported a write conflict")]
    Conflict,

    /// A document required by the operation does not exist.
    #[error("document not found: {id}")]
    NotFound { id: String },

    /// Transport-level failure; surfaced unchanged, no retry policy at this
    /// layer.
    #[error("document store unavailable: {0}")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The store answered with a shape this layer does not recognize.
    /// Validated at the response boundary so type confusion never
    /// propagates upward.
    #[error("malformed store response: {message}")]
    Malformed { message: String },

    /// The store endpoint configuration is unusable (bad URL, bad
    /// credentials format). Raised at construction, never mid-operation.
    #[error("invalid store endpoint: {message}")]
    InvalidEndpoint { message: String },
}

impl StoreError {
    /// Wrap a transport error.
    pub fn unavailable(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Unavailable(Box::new(source))
    }

    /// Flag an unexpected response shape.
    pub fn malformed(message: impl Into<String>) -> Self {
        StoreError::Malformed {
            message: message.into(),
        }
    }
}
