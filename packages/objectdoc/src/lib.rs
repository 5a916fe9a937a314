//! ObjectDoc: a typed object-schema to document-store translation layer.
//!
//! ObjectDoc converts typed queries, class schemas and permission metadata
//! into the selectors and flat documents of a schemaless HTTP document
//! store, and converts store results back into typed objects. The layers,
//! bottom up:
//!
//! - [`objectdoc_core`]: the shared data model (field types, schemas,
//!   documents, selectors)
//! - [`objectdoc_codec`]: permission-alias renames and type coercion
//! - [`objectdoc_query`]: pointer normalization and selector building
//! - [`objectdoc_store`]: the document-store seam and an in-memory store
//! - [`objectdoc_http`]: the CouchDB-flavoured HTTP store
//! - [`objectdoc_adapter`]: the class/document lifecycle operations
//!
//! ```ignore
//! use objectdoc::{ClassSchema, CouchStore, FieldType, StorageAdapter};
//!
//! let store = CouchStore::new("http://localhost:5984/app")?;
//! let adapter = StorageAdapter::new(store);
//!
//! let schema = ClassSchema::new("Note").with_field("title", FieldType::String);
//! adapter.create_class(schema).await?;
//! ```

pub use objectdoc_adapter::{AdapterError, StorageAdapter};
pub use objectdoc_core::{
    document, fields, ClassLevelPermissions, ClassSchema, Document, FieldMap, FieldType,
    PermissionMap, Selector, SortDirection,
};
pub use objectdoc_codec::CodecError;
pub use objectdoc_http::CouchStore;
pub use objectdoc_query::{FindOptions, QueryError};
pub use objectdoc_store::{BulkResult, DocumentStore, MemoryStore, StoreError};

pub use objectdoc_codec as codec;
pub use objectdoc_query as query;
