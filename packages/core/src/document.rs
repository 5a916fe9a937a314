//! The store-native document shape.

use serde_json::Value;

use crate::fields;

/// A flat JSON document as the store holds it.
///
/// Documents carry the class discriminator, identity/revision members and
/// permission-alias members alongside ordinary fields. The translation
/// engine constructs them per call and never retains them.
pub type Document = serde_json::Map<String, Value>;

/// Read the store identity of a document, if set.
pub fn id(doc: &Document) -> Option<&str> {
    doc.get(fields::ID).and_then(Value::as_str)
}

/// Mark a document as logically deleted.
///
/// The store performs physical removal when the tombstone is written back.
pub fn tombstone(doc: &mut Document) {
    doc.insert(fields::DELETED.to_string(), Value::Bool(true));
}
