//! Class schemas and class-level permissions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fields;
use crate::FieldType;

/// Field declarations of a class.
///
/// Uses `BTreeMap` for deterministic ordering of the serialized schema
/// document.
pub type FieldMap = BTreeMap<String, FieldType>;

/// Principal (`"*"`, user id, `"role:..."`) to permission flag.
pub type PermissionMap = BTreeMap<String, bool>;

/// Per-operation class-level permission matrix.
///
/// A missing operation entry means "nobody" - the public default is filled in
/// by [`ClassSchema::normalized`] only when the whole matrix is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassLevelPermissions {
    pub find: PermissionMap,
    pub get: PermissionMap,
    pub create: PermissionMap,
    pub update: PermissionMap,
    pub delete: PermissionMap,
    pub add_field: PermissionMap,
}

impl ClassLevelPermissions {
    /// The matrix granting every operation to the wildcard principal.
    pub fn public_default() -> Self {
        fn wildcard() -> PermissionMap {
            let mut map = PermissionMap::new();
            map.insert(fields::WILDCARD.to_string(), true);
            map
        }

        ClassLevelPermissions {
            find: wildcard(),
            get: wildcard(),
            create: wildcard(),
            update: wildcard(),
            delete: wildcard(),
            add_field: wildcard(),
        }
    }
}

/// A named class: typed field declarations plus a permission matrix.
///
/// Serializes to the body of a schema document (`className`, `fields`,
/// `classLevelPermissions`); the adapter adds the document identity and the
/// schema marker on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchema {
    pub class_name: String,

    #[serde(default)]
    pub fields: FieldMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_level_permissions: Option<ClassLevelPermissions>,
}

impl ClassSchema {
    /// Create a schema with no fields and no explicit permissions.
    pub fn new(class_name: impl Into<String>) -> Self {
        ClassSchema {
            class_name: class_name.into(),
            fields: FieldMap::new(),
            class_level_permissions: None,
        }
    }

    /// Add a field declaration.
    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    /// Set the class-level permission matrix.
    pub fn with_permissions(mut self, clps: ClassLevelPermissions) -> Self {
        self.class_level_permissions = Some(clps);
        self
    }

    /// The typed-layer view of a stored schema.
    ///
    /// Strips the identity/revision declarations injected at class creation
    /// and any permission-alias declarations (in either spelling), and fills
    /// the public-default permission matrix when none was stored.
    pub fn normalized(mut self) -> Self {
        for name in [
            fields::ID,
            fields::REV,
            fields::READ_ACL,
            fields::READ_ACL_ALIAS,
            fields::WRITE_ACL,
            fields::WRITE_ACL_ALIAS,
            fields::HASHED_PASSWORD,
            fields::HASHED_PASSWORD_ALIAS,
        ] {
            self.fields.remove(name);
        }

        if self.class_level_permissions.is_none() {
            self.class_level_permissions = Some(ClassLevelPermissions::public_default());
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_serializes_camel_case() {
        let schema = ClassSchema::new("Note").with_field("title", FieldType::String);
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({
                "className": "Note",
                "fields": {"title": {"type": "String"}},
            })
        );
    }

    #[test]
    fn schema_parses_from_stored_body() {
        let schema: ClassSchema = serde_json::from_value(json!({
            "className": "Post",
            "fields": {
                "author": {"type": "Pointer", "targetClass": "_User"},
                "tags": {"type": "Array"},
            },
            "classLevelPermissions": {"find": {"*": true}},
        }))
        .unwrap();

        assert_eq!(schema.class_name, "Post");
        assert_eq!(
            schema.fields.get("author"),
            Some(&FieldType::pointer("_User"))
        );
        let clps = schema.class_level_permissions.unwrap();
        assert_eq!(clps.find.get("*"), Some(&true));
        // Operations absent from the stored matrix stay empty.
        assert!(clps.delete.is_empty());
    }

    #[test]
    fn normalized_strips_reserved_declarations() {
        let schema = ClassSchema::new("Note")
            .with_field("_id", FieldType::String)
            .with_field("_rev", FieldType::String)
            .with_field("_rperm", FieldType::Array)
            .with_field("wperm", FieldType::Array)
            .with_field("title", FieldType::String)
            .normalized();

        assert_eq!(schema.fields.len(), 1);
        assert!(schema.fields.contains_key("title"));
    }

    #[test]
    fn normalized_fills_public_default_permissions() {
        let schema = ClassSchema::new("Note").normalized();
        let clps = schema.class_level_permissions.unwrap();
        assert_eq!(clps, ClassLevelPermissions::public_default());
    }

    #[test]
    fn normalized_keeps_explicit_permissions() {
        let mut clps = ClassLevelPermissions::default();
        clps.find.insert("role:admin".to_string(), true);
        let schema = ClassSchema::new("Note")
            .with_permissions(clps.clone())
            .normalized();
        assert_eq!(schema.class_level_permissions, Some(clps));
    }
}
