//! Error types for the lifecycle layer.

use objectdoc_codec::CodecError;
use objectdoc_query::QueryError;
use objectdoc_store::StoreError;

/// Errors surfaced by [`crate::StorageAdapter`] operations.
///
/// Store conflicts are treated as benign only inside class creation; every
/// other error surfaces unchanged. Fan-out operations surface the first
/// failing leg with no rollback of the other - callers must be idempotent
/// on retry.
#[derive(thiserror::Error, Debug)]
pub enum AdapterError {
    #[error("class not found: {class_name}")]
    ClassNotFound { class_name: String },

    #[error("attempted to add a field that already exists: {class_name}.{field_name}")]
    DuplicateField {
        class_name: String,
        field_name: String,
    },

    #[error("no object matches the query")]
    ObjectNotFound,

    #[error("schema document for class {class_name} has an unusable shape")]
    InvalidSchema { class_name: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
