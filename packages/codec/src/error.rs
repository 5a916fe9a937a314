//! Error types for the codec layer.

/// Errors produced while encoding a typed object for storage.
///
/// Decoding is total: a stored document always maps back to some typed
/// shape, so only the encode direction can fail.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("type {type_name} of field {field} is not supported")]
    UnsupportedType { field: String, type_name: String },

    #[error("field {field} is not declared in the class schema")]
    UndeclaredField { field: String },

    #[error("value of field {field} does not match its declared {expected} type")]
    InvalidValue {
        field: String,
        expected: &'static str,
    },
}
