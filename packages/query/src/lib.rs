//! Typed-query to store-selector translation.
//!
//! - [`normalize`]: the pointer/reference normalizer - a depth-bounded,
//!   pure rewrite of a constraint tree with an explicit mode, run once to
//!   keep a clean copy for result rehydration and once to produce the form
//!   the store understands.
//! - [`builder`]: assembles a complete [`objectdoc_core::Selector`] from a
//!   typed query - class discriminator injection, permission-selector
//!   expansion, pagination, sort and projection.

pub mod builder;
pub mod normalize;

mod error;

pub use builder::{build, expand_permission_selectors, existing_fields_selector, FindOptions, DEFAULT_LIMIT};
pub use error::QueryError;
pub use normalize::{normalize, reattach_pointers, Mode, MAX_DEPTH};
