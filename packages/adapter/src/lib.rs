//! Class and document lifecycle operations.
//!
//! [`StorageAdapter`] is the adapter-facing surface of the translation
//! engine: schema management (create class, add/delete fields) and object
//! management (create, find, update, delete, upsert, count), each
//! orchestrating the permission codec, the type coercer and the query
//! builder around calls through the [`objectdoc_store::DocumentStore`]
//! seam.
//!
//! The adapter owns no durable state; every operation builds fresh request
//! bodies from its arguments and leaves everything else to the store.

mod adapter;
mod error;

pub use adapter::StorageAdapter;
pub use error::AdapterError;
