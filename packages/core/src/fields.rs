//! Reserved member names shared by the typed layer and the document store.
//!
//! The store reserves the `_` prefix for its own members (`_id`, `_rev`,
//! `_deleted`) and treats leading-`$` keys in selectors as operators, so the
//! class discriminator uses a trailing sigil that is valid in both positions.

/// Store-native document identity.
pub const ID: &str = "_id";

/// Store-native document revision.
pub const REV: &str = "_rev";

/// Tombstone flag; the store performs physical removal.
pub const DELETED: &str = "_deleted";

/// Typed-layer object identity.
pub const OBJECT_ID: &str = "objectId";

/// Class discriminator member on every stored document.
pub const CLASS: &str = "t$";

/// Discriminator value marking schema documents.
pub const SCHEMA_CLASS: &str = "_SCHEMA";

/// Document id prefix for schema documents.
pub const SCHEMA_ID_PREFIX: &str = "class:";

/// Read-ACL as the typed layer spells it, and its storage-safe alias.
pub const READ_ACL: &str = "_rperm";
pub const READ_ACL_ALIAS: &str = "rperm";

/// Write-ACL as the typed layer spells it, and its storage-safe alias.
pub const WRITE_ACL: &str = "_wperm";
pub const WRITE_ACL_ALIAS: &str = "wperm";

/// Hashed credential as the typed layer spells it, and its storage-safe alias.
pub const HASHED_PASSWORD: &str = "_hashed_password";
pub const HASHED_PASSWORD_ALIAS: &str = "hashed_password";

/// Marker key of typed wrapper values (`{"__type": "Pointer", ...}`).
pub const TYPE_MARKER: &str = "__type";

/// ISO-8601 instant member of a typed date wrapper.
pub const ISO: &str = "iso";

/// Folded per-provider authentication data.
pub const AUTH_DATA: &str = "authData";

/// ACL wildcard principal denoting public access.
pub const WILDCARD: &str = "*";

/// Document id of the schema document for `class_name`.
pub fn schema_doc_id(class_name: &str) -> String {
    format!("{}{}", SCHEMA_ID_PREFIX, class_name)
}
