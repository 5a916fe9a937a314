//! The document-store seam.
//!
//! Everything above this layer shapes data; everything below it moves bytes.
//! [`DocumentStore`] is the black-box transport boundary the lifecycle
//! operations are written against: six operations over a collection of flat
//! JSON documents with identity, revision and tombstone semantics.
//!
//! [`MemoryStore`] is an in-process implementation with the same conflict
//! and tombstone behavior, used to exercise the layers above without a
//! running store.

pub mod memory;

mod error;
mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{BulkResult, DocumentStore};
