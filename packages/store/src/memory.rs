//! In-memory document store.
//!
//! Implements the same identity, revision, conflict and tombstone semantics
//! as the HTTP-backed store, plus a selector evaluator over the closed
//! constraint grammar, so the layers above can be exercised without a
//! running store.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use objectdoc_core::{document, fields, Document, Selector, SortDirection};

use crate::{BulkResult, DocumentStore, StoreError};

/// An in-memory [`DocumentStore`].
///
/// Revisions are `"{generation}-{sequence}"` strings; a write must present
/// the current revision or it fails with [`StoreError::Conflict`].
/// Tombstoned documents stay in the map (the typed layer only ever sees
/// their absence) so revision checks keep working across deletion.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Document>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn next_rev(&self, current: Option<&str>) -> String {
        let generation = current
            .and_then(|rev| rev.split('-').next())
            .and_then(|generation| generation.parse::<u64>().ok())
            .unwrap_or(0);
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        format!("{}-{:08x}", generation + 1, sequence)
    }

    fn next_id(&self) -> String {
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        format!("mem:{:08x}", sequence)
    }

    fn is_live(doc: &Document) -> bool {
        doc.get(fields::DELETED).and_then(Value::as_bool) != Some(true)
    }

    fn write_locked(
        &self,
        docs: &mut BTreeMap<String, Document>,
        mut doc: Document,
    ) -> Result<Document, StoreError> {
        let id = match document::id(&doc) {
            Some(id) => id.to_string(),
            None => {
                let id = self.next_id();
                doc.insert(fields::ID.to_string(), Value::String(id.clone()));
                id
            }
        };

        let current_rev = docs
            .get(&id)
            .and_then(|current| current.get(fields::REV))
            .and_then(Value::as_str)
            .map(str::to_string);

        match (current_rev.as_deref(), doc.get(fields::REV).and_then(Value::as_str)) {
            // New document, no revision expected.
            (None, None) => {}
            (None, Some(_)) => return Err(StoreError::Conflict),
            (Some(_), None) => return Err(StoreError::Conflict),
            (Some(current), Some(presented)) if current != presented => {
                return Err(StoreError::Conflict)
            }
            (Some(_), Some(_)) => {}
        }

        let rev = self.next_rev(current_rev.as_deref());
        doc.insert(fields::REV.to_string(), Value::String(rev));
        docs.insert(id, doc.clone());
        Ok(doc)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Document>> {
        // A poisoned lock means a panic mid-write in another test thread;
        // the map itself is still coherent for our purposes.
        self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self.lock();
        Ok(docs.get(id).filter(|doc| Self::is_live(doc)).cloned())
    }

    async fn create(&self, mut doc: Document) -> Result<Document, StoreError> {
        let mut docs = self.lock();

        if let Some(id) = document::id(&doc).map(str::to_string) {
            match docs.get(&id) {
                Some(current) if Self::is_live(current) => return Err(StoreError::Conflict),
                // Re-creating over a tombstone replaces it.
                Some(_) => {
                    docs.remove(&id);
                }
                None => {}
            }
        }

        doc.remove(fields::REV);
        self.write_locked(&mut docs, doc)
    }

    async fn update(&self, doc: Document) -> Result<Document, StoreError> {
        let id = document::id(&doc)
            .ok_or_else(|| StoreError::malformed("update without document identity"))?
            .to_string();

        let mut docs = self.lock();
        if !docs.contains_key(&id) {
            return Err(StoreError::NotFound { id });
        }
        self.write_locked(&mut docs, doc)
    }

    async fn bulk_update(&self, batch: Vec<Document>) -> Result<Vec<BulkResult>, StoreError> {
        let mut docs = self.lock();
        let mut outcomes = Vec::with_capacity(batch.len());

        for doc in batch {
            let id = document::id(&doc).unwrap_or_default().to_string();
            match self.write_locked(&mut docs, doc) {
                Ok(written) => outcomes.push(BulkResult {
                    id: document::id(&written).unwrap_or_default().to_string(),
                    ok: true,
                    rev: written
                        .get(fields::REV)
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    error: None,
                    reason: None,
                }),
                Err(StoreError::Conflict) => outcomes.push(BulkResult {
                    id,
                    ok: false,
                    rev: None,
                    error: Some("conflict".to_string()),
                    reason: Some("Document update conflict.".to_string()),
                }),
                Err(other) => return Err(other),
            }
        }

        Ok(outcomes)
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<Document>, StoreError> {
        let docs = self.lock();
        let mut matched: Vec<Document> = docs
            .values()
            .filter(|doc| Self::is_live(doc))
            .filter(|doc| matches(doc, &selector.selector))
            .cloned()
            .collect();
        drop(docs);

        if let Some(sort) = &selector.sort {
            matched.sort_by(|a, b| {
                for key in sort {
                    for (field, direction) in key {
                        let ordering = collate(
                            a.get(field).unwrap_or(&Value::Null),
                            b.get(field).unwrap_or(&Value::Null),
                        );
                        let ordering = match direction {
                            SortDirection::Ascending => ordering,
                            SortDirection::Descending => ordering.reverse(),
                        };
                        if ordering != Ordering::Equal {
                            return ordering;
                        }
                    }
                }
                Ordering::Equal
            });
        }

        let skip = selector.skip.unwrap_or(0) as usize;
        let matched = matched.into_iter().skip(skip);
        let mut matched: Vec<Document> = match selector.limit {
            Some(limit) => matched.take(limit as usize).collect(),
            None => matched.collect(),
        };

        if let Some(projection) = &selector.fields {
            for doc in &mut matched {
                doc.retain(|key, _| projection.iter().any(|field| field == key));
            }
        }

        Ok(matched)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut docs = self.lock();
        let mut doc = match docs.get(id).filter(|doc| Self::is_live(doc)) {
            Some(doc) => doc.clone(),
            None => {
                return Err(StoreError::NotFound { id: id.to_string() })
            }
        };
        document::tombstone(&mut doc);
        self.write_locked(&mut docs, doc)?;
        Ok(())
    }
}

/// Evaluate a constraint tree against one document.
fn matches(doc: &Document, constraints: &Map<String, Value>) -> bool {
    constraints.iter().all(|(key, constraint)| match key.as_str() {
        "$and" => sub_selectors(constraint)
            .map(|mut subs| subs.all(|sub| matches(doc, sub)))
            .unwrap_or(false),
        "$or" => sub_selectors(constraint)
            .map(|mut subs| subs.any(|sub| matches(doc, sub)))
            .unwrap_or(false),
        field => field_matches(doc.get(field), constraint),
    })
}

fn sub_selectors(value: &Value) -> Option<impl Iterator<Item = &Map<String, Value>>> {
    let subs = value.as_array()?;
    if subs.iter().any(|sub| !sub.is_object()) {
        return None;
    }
    Some(subs.iter().filter_map(Value::as_object))
}

fn field_matches(value: Option<&Value>, constraint: &Value) -> bool {
    match constraint {
        Value::Object(operators) if is_operator_map(operators) => operators
            .iter()
            .all(|(op, operand)| operator_matches(value, op, operand)),
        // Equality against null matches documents lacking the field -
        // "public" ACLs are represented by the field's absence.
        Value::Null => value.map(Value::is_null).unwrap_or(true),
        other => value == Some(other),
    }
}

fn is_operator_map(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.starts_with('$'))
}

fn operator_matches(value: Option<&Value>, op: &str, operand: &Value) -> bool {
    match op {
        "$eq" => field_matches(value, operand),
        "$ne" => !field_matches(value, operand),
        "$in" => membership(value, operand),
        "$nin" => !membership(value, operand),
        // Comparisons require the field to exist; null collates below
        // everything, which is exactly what `$gt: null` ("field is set")
        // relies on.
        "$gt" => value.map(|v| collate(v, operand) == Ordering::Greater).unwrap_or(false),
        "$gte" => value.map(|v| collate(v, operand) != Ordering::Less).unwrap_or(false),
        "$lt" => value.map(|v| collate(v, operand) == Ordering::Less).unwrap_or(false),
        "$lte" => value.map(|v| collate(v, operand) != Ordering::Greater).unwrap_or(false),
        other => {
            log::debug!("unsupported selector operator {}, matching nothing", other);
            false
        }
    }
}

/// Set membership; an array-valued field matches when any of its elements
/// is in the operand set.
fn membership(value: Option<&Value>, operand: &Value) -> bool {
    let set = match operand.as_array() {
        Some(set) => set,
        None => return false,
    };
    match value {
        Some(Value::Array(elements)) => elements.iter().any(|element| set.contains(element)),
        Some(scalar) => set.contains(scalar),
        None => false,
    }
}

/// Total order over JSON values in the store's collation:
/// null < bool < number < string < array < object.
fn collate(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ordering = collate(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        // Object collation approximated via the serialized form.
        (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    fn selector(value: Value) -> Selector {
        Selector {
            selector: value.as_object().unwrap().clone(),
            ..Selector::default()
        }
    }

    #[tokio::test]
    async fn create_get_round_trip() {
        let store = MemoryStore::new();
        let stored = store
            .create(doc(json!({"_id": "n1", "title": "hi"})))
            .await
            .unwrap();
        assert!(stored.get("_rev").is_some());

        let fetched = store.get("n1").await.unwrap().unwrap();
        assert_eq!(fetched.get("title"), Some(&json!("hi")));
    }

    #[tokio::test]
    async fn create_conflicts_on_live_identity() {
        let store = MemoryStore::new();
        store.create(doc(json!({"_id": "n1"}))).await.unwrap();
        let err = store.create(doc(json!({"_id": "n1"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn update_requires_current_revision() {
        let store = MemoryStore::new();
        let stored = store.create(doc(json!({"_id": "n1", "title": "a"}))).await.unwrap();

        let mut stale = stored.clone();
        stale.insert("_rev".to_string(), json!("1-stale"));
        let err = store.update(stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        let mut fresh = stored.clone();
        fresh.insert("title".to_string(), json!("b"));
        let updated = store.update(fresh).await.unwrap();
        assert_ne!(updated.get("_rev"), stored.get("_rev"));

        let fetched = store.get("n1").await.unwrap().unwrap();
        assert_eq!(fetched.get("title"), Some(&json!("b")));
    }

    #[tokio::test]
    async fn delete_hides_the_document() {
        let store = MemoryStore::new();
        store.create(doc(json!({"_id": "n1"}))).await.unwrap();
        store.delete("n1").await.unwrap();

        assert!(store.get("n1").await.unwrap().is_none());
        let rows = store.query(&selector(json!({}))).await.unwrap();
        assert!(rows.is_empty());

        let err = store.delete("n1").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn bulk_update_reports_per_document_outcomes() {
        let store = MemoryStore::new();
        let stored = store.create(doc(json!({"_id": "n1", "title": "a"}))).await.unwrap();

        let mut fresh = stored;
        fresh.insert("title".to_string(), json!("b"));
        let mut stale = doc(json!({"_id": "n1", "_rev": "9-stale"}));
        stale.insert("title".to_string(), json!("c"));

        let outcomes = store
            .bulk_update(vec![fresh, stale, doc(json!({"_id": "n2"}))])
            .await
            .unwrap();

        assert!(outcomes[0].ok);
        assert_eq!(outcomes[1].error.as_deref(), Some("conflict"));
        assert!(outcomes[2].ok);
    }

    #[tokio::test]
    async fn query_evaluates_operators() {
        let store = MemoryStore::new();
        for (id, stars) in [("n1", 1), ("n2", 3), ("n3", 5)] {
            store
                .create(doc(json!({"_id": id, "t$": "Note", "stars": stars})))
                .await
                .unwrap();
        }

        let rows = store
            .query(&selector(json!({"t$": "Note", "stars": {"$gte": 3}})))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = store
            .query(&selector(json!({"stars": {"$in": [1, 5]}})))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = store
            .query(&selector(json!({"$or": [{"stars": 1}, {"stars": 5}]})))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn null_equality_matches_absent_fields() {
        let store = MemoryStore::new();
        store.create(doc(json!({"_id": "n1"}))).await.unwrap();
        store
            .create(doc(json!({"_id": "n2", "rperm": ["*"]})))
            .await
            .unwrap();

        let rows = store.query(&selector(json!({"rperm": null}))).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("_id"), Some(&json!("n1")));
    }

    #[tokio::test]
    async fn gt_null_means_field_is_set() {
        let store = MemoryStore::new();
        store.create(doc(json!({"_id": "n1"}))).await.unwrap();
        store
            .create(doc(json!({"_id": "n2", "title": "hi"})))
            .await
            .unwrap();
        store
            .create(doc(json!({"_id": "n3", "title": 0})))
            .await
            .unwrap();

        let rows = store
            .query(&selector(json!({"title": {"$gt": null}})))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn membership_inspects_array_elements() {
        let store = MemoryStore::new();
        store
            .create(doc(json!({"_id": "n1", "rperm": ["*", "u1"]})))
            .await
            .unwrap();
        store
            .create(doc(json!({"_id": "n2", "rperm": ["role:admin"]})))
            .await
            .unwrap();

        let rows = store
            .query(&selector(json!({"rperm": {"$in": ["*"]}})))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("_id"), Some(&json!("n1")));
    }

    #[tokio::test]
    async fn pagination_sort_and_projection_apply() {
        let store = MemoryStore::new();
        for (id, stars) in [("n1", 3), ("n2", 1), ("n3", 2)] {
            store
                .create(doc(json!({"_id": id, "t$": "Note", "stars": stars})))
                .await
                .unwrap();
        }

        let mut sort_key = BTreeMap::new();
        sort_key.insert("stars".to_string(), SortDirection::Ascending);
        let mut sel = selector(json!({"t$": "Note"}));
        sel.sort = Some(vec![sort_key]);
        sel.skip = Some(1);
        sel.limit = Some(1);
        sel.fields = Some(vec!["_id".to_string(), "stars".to_string()]);

        let rows = store.query(&sel).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            serde_json::Value::Object(rows[0].clone()),
            json!({"_id": "n3", "stars": 2})
        );
    }
}
