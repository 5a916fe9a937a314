//! The pointer/reference normalizer.
//!
//! A typed query may reference documents through `objectId` members and
//! through full pointer wrappers (`{"__type": "Pointer", ...}`); the store
//! understands neither. The normalizer rewrites a constraint tree into the
//! flat form the store accepts, and runs in two modes because the caller
//! still expects pointer wrappers in results for fields it constrained:
//! the [`Mode::Identity`] pass keeps a clean copy used to re-attach wrappers
//! on read, the [`Mode::Pointers`] pass produces the tree sent to the store.
//!
//! Both passes are pure - they build a new tree and never mutate the input -
//! and depth-bounded, so the walk is total over arbitrarily nested input.

use serde_json::{Map, Value};

use objectdoc_core::{fields, Document};

use crate::QueryError;

/// Maximum nesting the normalizer will descend into.
pub const MAX_DEPTH: usize = 32;

/// Which rewrites a normalization pass applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Rewrite `objectId` equalities to the identity field; leave pointer
    /// wrappers intact.
    Identity,
    /// Everything `Identity` does, plus flatten pointer wrappers to bare
    /// identifier equalities.
    Pointers,
}

/// Normalize a constraint tree, producing a new tree.
pub fn normalize(constraints: &Map<String, Value>, mode: Mode) -> Result<Map<String, Value>, QueryError> {
    normalize_map(constraints, mode, 0)
}

fn normalize_map(
    map: &Map<String, Value>,
    mode: Mode,
    depth: usize,
) -> Result<Map<String, Value>, QueryError> {
    if depth > MAX_DEPTH {
        return Err(QueryError::DepthExceeded { max: MAX_DEPTH });
    }

    let mut normalized = Map::new();
    for (key, value) in map {
        if key == fields::OBJECT_ID && value.is_string() {
            normalized.insert(fields::ID.to_string(), value.clone());
            continue;
        }
        normalized.insert(key.clone(), normalize_value(value, mode, depth + 1)?);
    }
    Ok(normalized)
}

fn normalize_value(value: &Value, mode: Mode, depth: usize) -> Result<Value, QueryError> {
    if depth > MAX_DEPTH {
        return Err(QueryError::DepthExceeded { max: MAX_DEPTH });
    }

    match value {
        Value::Array(items) => {
            let normalized = items
                .iter()
                .map(|item| normalize_value(item, mode, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(normalized))
        }
        Value::Object(map) => {
            if let Some(object_id) = pointer_target(map) {
                return match mode {
                    Mode::Pointers => Ok(Value::String(object_id.to_string())),
                    Mode::Identity => Ok(value.clone()),
                };
            }
            Ok(Value::Object(normalize_map(map, mode, depth)?))
        }
        _ => Ok(value.clone()),
    }
}

/// The referenced identifier of a pointer-shaped wrapper, if `map` is one.
fn pointer_target(map: &Map<String, Value>) -> Option<&str> {
    let marker = map.get(fields::TYPE_MARKER)?.as_str()?;
    if marker != "Pointer" {
        return None;
    }
    map.get(fields::OBJECT_ID)?.as_str()
}

/// Re-attach pointer wrappers to one result row.
///
/// For every field the caller constrained with a pointer wrapper (found in
/// the clean `Mode::Identity` copy of the query), a bare identifier in the
/// result is replaced by that wrapper, restoring the typed shape the store
/// could not hold.
pub fn reattach_pointers(doc: &mut Document, clean_constraints: &Map<String, Value>) {
    for (field, constraint) in clean_constraints {
        let is_pointer = matches!(constraint, Value::Object(map) if pointer_target(map).is_some());
        if is_pointer && doc.get(field).map(Value::is_string).unwrap_or(false) {
            doc.insert(field.clone(), constraint.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn object_id_rewrites_to_identity_field() {
        let query = map(json!({"objectId": "n1", "title": "hi"}));
        let normalized = normalize(&query, Mode::Identity).unwrap();
        assert_eq!(
            Value::Object(normalized),
            json!({"_id": "n1", "title": "hi"})
        );
    }

    #[test]
    fn object_id_rewrites_inside_logical_operators() {
        let query = map(json!({
            "$or": [{"objectId": "n1"}, {"objectId": "n2"}],
        }));
        let normalized = normalize(&query, Mode::Identity).unwrap();
        assert_eq!(
            Value::Object(normalized),
            json!({"$or": [{"_id": "n1"}, {"_id": "n2"}]})
        );
    }

    #[test]
    fn non_string_object_id_is_left_alone() {
        let query = map(json!({"objectId": {"$in": ["n1", "n2"]}}));
        let normalized = normalize(&query, Mode::Identity).unwrap();
        assert_eq!(
            Value::Object(normalized),
            json!({"objectId": {"$in": ["n1", "n2"]}})
        );
    }

    #[test]
    fn pointers_flatten_only_in_pointer_mode() {
        let query = map(json!({
            "author": {"__type": "Pointer", "className": "_User", "objectId": "u1"},
        }));

        let clean = normalize(&query, Mode::Identity).unwrap();
        assert_eq!(Value::Object(clean), Value::Object(query.clone()));

        let flattened = normalize(&query, Mode::Pointers).unwrap();
        assert_eq!(Value::Object(flattened), json!({"author": "u1"}));
    }

    #[test]
    fn input_tree_is_never_mutated() {
        let query = map(json!({"objectId": "n1", "nested": {"objectId": "n2"}}));
        let before = query.clone();
        normalize(&query, Mode::Pointers).unwrap();
        assert_eq!(query, before);
    }

    #[test]
    fn depth_bound_makes_the_walk_total() {
        let mut nested = json!("leaf");
        for _ in 0..(MAX_DEPTH + 2) {
            nested = json!({"inner": nested});
        }
        let err = normalize(&map(nested), Mode::Pointers).unwrap_err();
        assert_eq!(err, QueryError::DepthExceeded { max: MAX_DEPTH });
    }

    #[test]
    fn reattach_restores_constrained_pointer_fields() {
        let clean = map(json!({
            "author": {"__type": "Pointer", "className": "_User", "objectId": "u1"},
            "title": "hi",
        }));
        let mut row = map(json!({"author": "u1", "title": "hi"}));
        reattach_pointers(&mut row, &clean);

        assert_eq!(
            row.get("author"),
            Some(&json!({"__type": "Pointer", "className": "_User", "objectId": "u1"}))
        );
        // Non-pointer constraints leave the row untouched.
        assert_eq!(row.get("title"), Some(&json!("hi")));
    }
}
