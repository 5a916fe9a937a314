//! The storage adapter.

use serde_json::Value;
use uuid::Uuid;

use objectdoc_codec::{coerce, perms};
use objectdoc_core::{document, fields, ClassLevelPermissions, ClassSchema, Document, FieldType, Selector};
use objectdoc_query::{
    build, existing_fields_selector, normalize, reattach_pointers, FindOptions, Mode, DEFAULT_LIMIT,
};
use objectdoc_store::{DocumentStore, StoreError};

use crate::AdapterError;

/// Attempts for a schema read-modify-write before giving up on the
/// optimistic-concurrency race.
const SCHEMA_WRITE_RETRIES: usize = 3;

/// The adapter-facing surface of the translation engine.
///
/// Holds the injected store as an immutable dependency decided once at
/// construction.
pub struct StorageAdapter<S> {
    store: S,
}

impl<S: DocumentStore> StorageAdapter<S> {
    pub fn new(store: S) -> Self {
        StorageAdapter { store }
    }

    // ---- class operations ----

    /// Whether a schema document exists for `class_name`.
    pub async fn class_exists(&self, class_name: &str) -> Result<bool, AdapterError> {
        let doc = self.store.get(&fields::schema_doc_id(class_name)).await?;
        Ok(doc.is_some())
    }

    /// Register a class.
    ///
    /// The stored schema gains identity and revision field declarations and
    /// the schema marker. A store conflict means the class already exists
    /// and resolves to the supplied schema rather than an error.
    pub async fn create_class(&self, schema: ClassSchema) -> Result<ClassSchema, AdapterError> {
        log::debug!("create_class {}", schema.class_name);

        let mut stored = schema.clone();
        stored
            .fields
            .insert(fields::ID.to_string(), FieldType::String);
        stored
            .fields
            .insert(fields::REV.to_string(), FieldType::String);

        let mut doc = schema_document(&stored)?;
        doc.insert(
            fields::ID.to_string(),
            Value::String(fields::schema_doc_id(&schema.class_name)),
        );
        doc.insert(
            fields::CLASS.to_string(),
            Value::String(fields::SCHEMA_CLASS.to_string()),
        );

        match self.store.create(doc).await {
            Ok(_) | Err(StoreError::Conflict) => Ok(schema.normalized()),
            Err(e) => Err(e.into()),
        }
    }

    /// The schema of `class_name`, in its typed-layer view.
    pub async fn get_class(&self, class_name: &str) -> Result<ClassSchema, AdapterError> {
        log::debug!("get_class {}", class_name);
        let doc = self.schema_doc(class_name).await?;
        Ok(parse_schema(doc)?.normalized())
    }

    /// All schemas known to the store, in their typed-layer view.
    pub async fn get_all_classes(&self) -> Result<Vec<ClassSchema>, AdapterError> {
        log::debug!("get_all_classes");
        let selector = Selector::for_class(fields::SCHEMA_CLASS).with_limit(DEFAULT_LIMIT);
        let docs = self.store.query(&selector).await?;

        docs.into_iter()
            .map(|doc| parse_schema(doc).map(ClassSchema::normalized))
            .collect()
    }

    /// Replace the class-level permission matrix of `class_name`.
    pub async fn set_class_level_permissions(
        &self,
        class_name: &str,
        clps: ClassLevelPermissions,
    ) -> Result<(), AdapterError> {
        log::debug!("set_class_level_permissions {}", class_name);
        let clps = serde_json::to_value(&clps).map_err(|_| AdapterError::InvalidSchema {
            class_name: class_name.to_string(),
        })?;

        self.update_schema_doc(class_name, |doc| {
            doc.insert("classLevelPermissions".to_string(), clps.clone());
            Ok(())
        })
        .await
    }

    /// Declare a field on `class_name`, failing if it is already declared.
    ///
    /// The write is revision-conditioned: losing the race against a
    /// concurrent schema writer re-reads and retries instead of silently
    /// dropping the other writer's change.
    pub async fn add_field_if_not_exists(
        &self,
        class_name: &str,
        field_name: &str,
        field_type: FieldType,
    ) -> Result<(), AdapterError> {
        log::debug!("add_field_if_not_exists {}.{}", class_name, field_name);
        let declaration =
            serde_json::to_value(&field_type).map_err(|_| AdapterError::InvalidSchema {
                class_name: class_name.to_string(),
            })?;

        self.update_schema_doc(class_name, |doc| {
            let declared = declared_fields(doc, class_name)?;
            if declared.contains_key(field_name) {
                return Err(AdapterError::DuplicateField {
                    class_name: class_name.to_string(),
                    field_name: field_name.to_string(),
                });
            }
            declared.insert(field_name.to_string(), declaration.clone());
            Ok(())
        })
        .await
    }

    /// Drop a class: its schema document and every data document.
    ///
    /// Both legs run concurrently; a failure in either surfaces as the
    /// operation's failure, and whatever the other leg already committed
    /// stays committed.
    pub async fn delete_class(&self, class_name: &str) -> Result<(), AdapterError> {
        log::debug!("delete_class {}", class_name);

        let data_leg = async {
            let selector = Selector::for_class(class_name)
                .with_fields(vec![fields::ID.to_string(), fields::REV.to_string()])
                .with_limit(DEFAULT_LIMIT);
            self.tombstone_matching(&selector).await?;
            Ok::<_, AdapterError>(())
        };

        let schema_leg = async {
            let mut doc = self.schema_doc(class_name).await?;
            document::tombstone(&mut doc);
            self.store.update(doc).await?;
            Ok::<_, AdapterError>(())
        };

        tokio::try_join!(data_leg, schema_leg)?;
        Ok(())
    }

    /// Remove field declarations and strip the field values from every
    /// document that has them.
    ///
    /// Identity and revision members are never removable; names that were
    /// never declared are silently ignored, and a repeated call is a no-op.
    pub async fn delete_fields(
        &self,
        class_name: &str,
        field_names: &[String],
    ) -> Result<(), AdapterError> {
        log::debug!("delete_fields {} {:?}", class_name, field_names);

        let field_names: Vec<String> = field_names
            .iter()
            .filter(|name| name.as_str() != fields::ID && name.as_str() != fields::REV)
            .cloned()
            .collect();
        if field_names.is_empty() {
            return Ok(());
        }

        let schema_leg = self.update_schema_doc(class_name, |doc| {
            let declared = declared_fields(doc, class_name)?;
            for name in &field_names {
                declared.remove(name);
            }
            Ok(())
        });

        let data_leg = async {
            let selector = existing_fields_selector(class_name, &field_names);
            loop {
                let mut page = self.store.query(&selector).await?;
                if page.is_empty() {
                    break;
                }
                let full = page.len() as u64 >= selector.limit.unwrap_or(DEFAULT_LIMIT);
                for doc in &mut page {
                    for name in &field_names {
                        doc.remove(name);
                    }
                }
                self.store.bulk_update(page).await?;
                if !full {
                    break;
                }
            }
            Ok::<_, AdapterError>(())
        };

        tokio::try_join!(schema_leg, data_leg)?;
        Ok(())
    }

    // ---- object operations ----

    /// Store a new object of `class_name`.
    ///
    /// Applies the permission codec and the type coercer, injects the
    /// identity (generated when the object carries none) and the class
    /// discriminator, and persists with a single create call.
    pub async fn create_object(
        &self,
        class_name: &str,
        schema: &ClassSchema,
        object: Document,
    ) -> Result<Document, AdapterError> {
        log::debug!("create_object {}", class_name);

        let mut object = object;
        perms::to_storage(&mut object);
        let mut doc = coerce::encode(&object, &aliased_fields(schema))?;

        let object_id = doc
            .get(fields::OBJECT_ID)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        doc.insert(
            fields::OBJECT_ID.to_string(),
            Value::String(object_id.clone()),
        );
        doc.insert(fields::ID.to_string(), Value::String(object_id));
        doc.insert(
            fields::CLASS.to_string(),
            Value::String(class_name.to_string()),
        );

        Ok(self.store.create(doc).await?)
    }

    /// Run a typed query and decode each result row.
    pub async fn find(
        &self,
        class_name: &str,
        schema: &ClassSchema,
        query: Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>, AdapterError> {
        log::debug!("find {}", class_name);

        let mut query = query;
        perms::to_storage(&mut query);

        // The clean pass keeps pointer wrappers so they can be re-attached
        // to rows the store hands back as bare identifiers.
        let clean = normalize(&query, Mode::Identity)?;
        let selector = build(&query, class_name, options)?;

        let rows = self.store.query(&selector).await?;
        let mut results = Vec::with_capacity(rows.len());
        for mut row in rows {
            coerce::decode(&mut row, schema);
            perms::from_storage(&mut row);
            reattach_pointers(&mut row, &clean);
            results.push(row);
        }
        Ok(results)
    }

    /// Apply `update` to every object matching `query`; returns how many
    /// documents were written. Matching nothing is not an error.
    pub async fn update_objects_by_query(
        &self,
        class_name: &str,
        schema: &ClassSchema,
        query: Document,
        update: Document,
    ) -> Result<usize, AdapterError> {
        log::debug!("update_objects_by_query {}", class_name);

        let update = encode_update(schema, update)?;
        let mut query = query;
        perms::to_storage(&mut query);
        let selector = build(&query, class_name, &FindOptions::default())?;

        let mut docs = self.store.query(&selector).await?;
        if docs.is_empty() {
            return Ok(0);
        }
        for doc in &mut docs {
            merge(doc, &update);
        }
        let count = docs.len();
        self.store.bulk_update(docs).await?;
        Ok(count)
    }

    /// Apply `update` to the first object matching `query` and return the
    /// decoded result; fails with [`AdapterError::ObjectNotFound`] when
    /// nothing matches.
    pub async fn find_one_and_update(
        &self,
        class_name: &str,
        schema: &ClassSchema,
        query: Document,
        update: Document,
    ) -> Result<Document, AdapterError> {
        log::debug!("find_one_and_update {}", class_name);

        let update = encode_update(schema, update)?;
        let mut query = query;
        perms::to_storage(&mut query);
        let clean = normalize(&query, Mode::Identity)?;
        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::default()
        };
        let selector = build(&query, class_name, &options)?;

        let rows = self.store.query(&selector).await?;
        let mut doc = rows.into_iter().next().ok_or(AdapterError::ObjectNotFound)?;
        merge(&mut doc, &update);

        let mut updated = self.store.update(doc).await?;
        coerce::decode(&mut updated, schema);
        perms::from_storage(&mut updated);
        reattach_pointers(&mut updated, &clean);
        Ok(updated)
    }

    /// Tombstone every object matching `query`; returns how many were
    /// removed. Matching nothing fails with
    /// [`AdapterError::ObjectNotFound`].
    pub async fn delete_objects_by_query(
        &self,
        class_name: &str,
        _schema: &ClassSchema,
        query: Document,
    ) -> Result<usize, AdapterError> {
        log::debug!("delete_objects_by_query {}", class_name);

        let mut query = query;
        perms::to_storage(&mut query);
        let mut selector = build(&query, class_name, &FindOptions::default())?;
        selector.fields = Some(vec![fields::ID.to_string(), fields::REV.to_string()]);

        let deleted = self.tombstone_matching(&selector).await?;
        if deleted == 0 {
            return Err(AdapterError::ObjectNotFound);
        }
        Ok(deleted)
    }

    /// Update the first object matching `query`, or create `query` merged
    /// with `update` when nothing matches.
    pub async fn upsert_one_object(
        &self,
        class_name: &str,
        schema: &ClassSchema,
        query: Document,
        update: Document,
    ) -> Result<Document, AdapterError> {
        log::debug!("upsert_one_object {}", class_name);

        let mut raw_query = query.clone();
        perms::to_storage(&mut raw_query);
        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::default()
        };
        let selector = build(&raw_query, class_name, &options)?;

        match self.store.query(&selector).await?.into_iter().next() {
            Some(mut doc) => {
                let update = encode_update(schema, update)?;
                merge(&mut doc, &update);
                Ok(self.store.update(doc).await?)
            }
            None => {
                let mut object = query;
                merge(&mut object, &update);
                self.create_object(class_name, schema, object).await
            }
        }
    }

    /// Count the objects matching `query`.
    ///
    /// Pages through identity-only projections until the result set is
    /// exhausted.
    pub async fn count(
        &self,
        class_name: &str,
        _schema: &ClassSchema,
        query: Document,
    ) -> Result<u64, AdapterError> {
        log::debug!("count {}", class_name);

        let mut query = query;
        perms::to_storage(&mut query);
        let mut selector = build(&query, class_name, &FindOptions::default())?;
        selector.fields = Some(vec![fields::ID.to_string()]);

        let page_size = selector.limit.unwrap_or(DEFAULT_LIMIT);
        let mut total = 0u64;
        let mut skip = 0u64;
        loop {
            selector.skip = (skip > 0).then_some(skip);
            let page = self.store.query(&selector).await?;
            total += page.len() as u64;
            if (page.len() as u64) < page_size {
                break;
            }
            skip += page_size;
        }
        Ok(total)
    }

    /// Tombstone every document in the store, schemas included. A testing
    /// aid; not part of the serving surface.
    pub async fn delete_all_classes(&self) -> Result<(), AdapterError> {
        log::debug!("delete_all_classes");
        let selector = Selector::everything()
            .with_fields(vec![fields::ID.to_string(), fields::REV.to_string()])
            .with_limit(DEFAULT_LIMIT);
        self.tombstone_matching(&selector).await?;
        Ok(())
    }

    // ---- helpers ----

    async fn schema_doc(&self, class_name: &str) -> Result<Document, AdapterError> {
        self.store
            .get(&fields::schema_doc_id(class_name))
            .await?
            .ok_or_else(|| AdapterError::ClassNotFound {
                class_name: class_name.to_string(),
            })
    }

    /// Revision-conditioned schema read-modify-write with bounded retries.
    async fn update_schema_doc<F>(&self, class_name: &str, mutate: F) -> Result<(), AdapterError>
    where
        F: Fn(&mut Document) -> Result<(), AdapterError>,
    {
        for _ in 0..SCHEMA_WRITE_RETRIES {
            let mut doc = self.schema_doc(class_name).await?;
            mutate(&mut doc)?;
            match self.store.update(doc).await {
                Ok(_) => return Ok(()),
                // Lost the race against another schema writer; re-read and
                // apply the mutation to their result.
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(AdapterError::Store(StoreError::Conflict))
    }

    /// Tombstone every document the selector matches, page by page;
    /// returns how many were tombstoned.
    async fn tombstone_matching(&self, selector: &Selector) -> Result<usize, AdapterError> {
        let page_size = selector.limit.unwrap_or(DEFAULT_LIMIT);
        let mut total = 0;
        loop {
            let mut page = self.store.query(selector).await?;
            if page.is_empty() {
                break;
            }
            let full = page.len() as u64 >= page_size;
            for doc in &mut page {
                document::tombstone(doc);
            }
            total += page.len();
            self.store.bulk_update(page).await?;
            if !full {
                break;
            }
        }
        Ok(total)
    }
}

/// The schema's field declarations with permission names renamed to their
/// storage aliases, matching an object that went through
/// [`perms::to_storage`].
fn aliased_fields(schema: &ClassSchema) -> objectdoc_core::FieldMap {
    let mut declared = schema.fields.clone();
    perms::alias_declarations(&mut declared);
    declared
}

/// Encode an update fragment the same way a full object is encoded.
fn encode_update(schema: &ClassSchema, mut update: Document) -> Result<Document, AdapterError> {
    perms::to_storage(&mut update);
    Ok(coerce::encode(&update, &aliased_fields(schema))?)
}

fn merge(doc: &mut Document, update: &Document) {
    for (key, value) in update {
        doc.insert(key.clone(), value.clone());
    }
}

fn schema_document(schema: &ClassSchema) -> Result<Document, AdapterError> {
    match serde_json::to_value(schema) {
        Ok(Value::Object(doc)) => Ok(doc),
        _ => Err(AdapterError::InvalidSchema {
            class_name: schema.class_name.clone(),
        }),
    }
}

fn parse_schema(doc: Document) -> Result<ClassSchema, AdapterError> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| StoreError::malformed(format!("schema document: {}", e)).into())
}

/// The mutable `fields` member of a schema document.
fn declared_fields<'a>(
    doc: &'a mut Document,
    class_name: &str,
) -> Result<&'a mut serde_json::Map<String, Value>, AdapterError> {
    doc.get_mut("fields")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| AdapterError::InvalidSchema {
            class_name: class_name.to_string(),
        })
}
