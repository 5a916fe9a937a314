//! Declared field types.

use serde::{Deserialize, Serialize};

/// The declared type of a schema field.
///
/// Serializes to the shape schema documents store: `{"type": "String"}`,
/// `{"type": "Pointer", "targetClass": "..."}`. The tagged union makes the
/// type coercer's dispatch an exhaustive match instead of a string switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
    Pointer {
        #[serde(rename = "targetClass")]
        target_class: String,
    },
    Relation {
        #[serde(rename = "targetClass")]
        target_class: String,
    },
    GeoPoint,
    File,
}

impl FieldType {
    /// Create a pointer declaration to `target_class`.
    pub fn pointer(target_class: impl Into<String>) -> Self {
        FieldType::Pointer {
            target_class: target_class.into(),
        }
    }

    /// Create a relation declaration to `target_class`.
    pub fn relation(target_class: impl Into<String>) -> Self {
        FieldType::Relation {
            target_class: target_class.into(),
        }
    }

    /// The type name as schema documents spell it.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "String",
            FieldType::Number => "Number",
            FieldType::Boolean => "Boolean",
            FieldType::Date => "Date",
            FieldType::Object => "Object",
            FieldType::Array => "Array",
            FieldType::Pointer { .. } => "Pointer",
            FieldType::Relation { .. } => "Relation",
            FieldType::GeoPoint => "GeoPoint",
            FieldType::File => "File",
        }
    }
}
