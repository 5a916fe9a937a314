//! Assembles store-native selectors from typed queries.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use objectdoc_core::{fields, Document, Selector, SortDirection};

use crate::normalize::{normalize, Mode};
use crate::QueryError;

/// Cap applied when a caller leaves the result limit unspecified, so an
/// unbounded query never asks the store for an unbounded answer.
pub const DEFAULT_LIMIT: u64 = 1000;

/// Pagination, sort and projection of a find call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    /// Sort keys in order of significance.
    pub sort: Vec<(String, SortDirection)>,
    /// Field projection; `None` or an empty list projects everything.
    pub keys: Option<Vec<String>>,
}

/// Build the selector for a typed query against `class_name`.
///
/// The class discriminator is inserted after the caller's constraints are
/// merged, so a caller-supplied value for it can never win. Pointer
/// constraints are flattened, permission constraints expanded, pagination
/// and projection folded in.
pub fn build(
    query: &Document,
    class_name: &str,
    options: &FindOptions,
) -> Result<Selector, QueryError> {
    let mut constraints = normalize(query, Mode::Pointers)?;
    constraints.insert(
        fields::CLASS.to_string(),
        Value::String(class_name.to_string()),
    );
    expand_permission_selectors(&mut constraints);

    let mut selector = Selector {
        selector: constraints,
        ..Selector::default()
    };

    selector.skip = options.skip.filter(|skip| *skip > 0);
    selector.limit = Some(options.limit.unwrap_or(DEFAULT_LIMIT));

    if !options.sort.is_empty() {
        let sort = options
            .sort
            .iter()
            .map(|(field, direction)| {
                let mut key = BTreeMap::new();
                key.insert(field.clone(), *direction);
                key
            })
            .collect();
        selector.sort = Some(sort);
    }

    if let Some(keys) = &options.keys {
        // Exclude empty keys; an empty projection means "everything".
        let keys: Vec<String> = keys.iter().filter(|key| !key.is_empty()).cloned().collect();
        if !keys.is_empty() {
            selector.fields = Some(keys);
        }
    }

    Ok(selector)
}

/// Expand wildcard ACL constraints so public documents match.
///
/// "Public" is represented by the ACL field's absence, not by a wildcard
/// entry on every document. A membership test whose set contains the
/// wildcard therefore becomes `field is absent OR field matches the
/// original constraint`, attached as an `$and` clause so multiple expanded
/// fields compose.
pub fn expand_permission_selectors(constraints: &mut Map<String, Value>) {
    for alias in [fields::READ_ACL_ALIAS, fields::WRITE_ACL_ALIAS] {
        if !contains_wildcard_membership(constraints.get(alias)) {
            continue;
        }

        let original = match constraints.remove(alias) {
            Some(original) => original,
            None => continue,
        };
        let mut absent = Map::new();
        absent.insert(alias.to_string(), Value::Null);
        let mut matching = Map::new();
        matching.insert(alias.to_string(), original);
        let clause = json!({ "$or": [absent, matching] });

        match constraints.get_mut("$and") {
            Some(Value::Array(clauses)) => clauses.push(clause),
            _ => {
                constraints.insert("$and".to_string(), Value::Array(vec![clause]));
            }
        }
    }
}

fn contains_wildcard_membership(constraint: Option<&Value>) -> bool {
    constraint
        .and_then(|value| value.get("$in"))
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .any(|member| member.as_str() == Some(fields::WILDCARD))
        })
        .unwrap_or(false)
}

/// A selector matching the documents of `class_name` that actually have any
/// of the given fields set.
///
/// "Field is set to any non-null value" is expressed as a greater-than-null
/// comparison per field, OR'd across the target fields.
pub fn existing_fields_selector(class_name: &str, field_names: &[String]) -> Selector {
    let clauses: Vec<Value> = field_names
        .iter()
        .map(|field| {
            let mut is_set = Map::new();
            is_set.insert(field.clone(), json!({"$gt": Value::Null}));
            Value::Object(is_set)
        })
        .collect();

    let mut selector = Selector::for_class(class_name).with_limit(DEFAULT_LIMIT);
    selector
        .selector
        .insert("$or".to_string(), Value::Array(clauses));
    selector
}
