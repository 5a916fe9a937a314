//! The store-native query expression.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fields;

/// Sort direction of a single sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// A complete query body as the store's find endpoint accepts it.
///
/// `selector` is a constraint tree in the closed grammar (field equality,
/// comparison operators, set membership, `$and`/`$or`); the remaining members
/// carry pagination, sort order and field projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Selector {
    pub selector: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Sort keys in order of significance; each entry is a single-key map as
    /// the store's wire format requires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<BTreeMap<String, SortDirection>>>,

    /// Field projection; absent means "project everything".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl Selector {
    /// A selector matching every document of `class_name`.
    pub fn for_class(class_name: &str) -> Self {
        let mut selector = Map::new();
        selector.insert(fields::CLASS.to_string(), Value::String(class_name.to_string()));
        Selector {
            selector,
            ..Selector::default()
        }
    }

    /// A selector matching every document in the store.
    pub fn everything() -> Self {
        Selector::default()
    }

    /// Restrict the projection to the given fields.
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Cap the number of returned documents.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `skip` matches.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_members_are_omitted() {
        let body = serde_json::to_value(Selector::for_class("Note")).unwrap();
        assert_eq!(body, json!({"selector": {"t$": "Note"}}));
    }

    #[test]
    fn full_body_serializes() {
        let mut sort_key = BTreeMap::new();
        sort_key.insert("title".to_string(), SortDirection::Descending);

        let mut selector = Selector::for_class("Note")
            .with_skip(10)
            .with_limit(5)
            .with_fields(vec!["title".to_string()]);
        selector.sort = Some(vec![sort_key]);

        let body = serde_json::to_value(&selector).unwrap();
        assert_eq!(
            body,
            json!({
                "selector": {"t$": "Note"},
                "skip": 10,
                "limit": 5,
                "sort": [{"title": "desc"}],
                "fields": ["title"],
            })
        );
    }

    #[test]
    fn everything_is_an_empty_selector() {
        let body = serde_json::to_value(Selector::everything()).unwrap();
        assert_eq!(body, json!({"selector": {}}));
    }
}
