//! Renames between reserved permission/credential members and their
//! storage-safe aliases.
//!
//! The store reserves the `_` prefix, so `_rperm`, `_wperm` and
//! `_hashed_password` cannot be stored under their typed-layer names. A
//! stored document carries exactly one spelling of each member, never both.

use objectdoc_core::{fields, Document, FieldMap};

const RENAMES: [(&str, &str); 3] = [
    (fields::READ_ACL, fields::READ_ACL_ALIAS),
    (fields::WRITE_ACL, fields::WRITE_ACL_ALIAS),
    (fields::HASHED_PASSWORD, fields::HASHED_PASSWORD_ALIAS),
];

/// Rename reserved members to their storage aliases.
///
/// Accepts the members in any representation (sequence, mapping, or a plain
/// string for the credential); members absent from the document are left
/// untouched. Mutates in place and returns the document for call chaining.
pub fn to_storage(doc: &mut Document) -> &mut Document {
    for (reserved, alias) in RENAMES {
        if let Some(value) = doc.remove(reserved) {
            doc.insert(alias.to_string(), value);
        }
    }
    doc
}

/// Rename the hashed-credential alias back to its typed-layer name.
///
/// ACL aliases are not renamed back here - they are consumed under their
/// storage names further up the stack.
pub fn from_storage(doc: &mut Document) -> &mut Document {
    if let Some(value) = doc.remove(fields::HASHED_PASSWORD_ALIAS) {
        doc.insert(fields::HASHED_PASSWORD.to_string(), value);
    }
    doc
}

/// Rename reserved field declarations in a schema's field map, so the
/// coercer can look up aliased members of an already-renamed object.
pub fn alias_declarations(declared: &mut FieldMap) {
    for (reserved, alias) in RENAMES {
        if let Some(field_type) = declared.remove(reserved) {
            declared.insert(alias.to_string(), field_type);
        }
    }
}
