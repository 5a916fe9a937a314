//! Core ObjectDoc: the shared data model.
//!
//! This layer defines the vocabulary every other package speaks:
//! - `FieldType`: the tagged union of declared field types
//! - `ClassSchema`: a named class with typed fields and class-level permissions
//! - `Document`: the flat JSON shape the document store holds
//! - `Selector`: the store-native query expression sent to the store
//! - `fields`: the reserved member names shared by both data models
//!
//! Nothing here talks to a store. Translation logic lives in the codec and
//! query packages; transport lives behind the store seam.

pub mod document;
pub mod fields;
mod field_type;
mod schema;
mod selector;

pub use document::Document;
pub use field_type::FieldType;
pub use schema::{ClassLevelPermissions, ClassSchema, FieldMap, PermissionMap};
pub use selector::{Selector, SortDirection};
