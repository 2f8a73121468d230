//! In-memory storage backend.
//!
//! Stores documents as BSON values in nested maps behind async-aware
//! read-write locks. Intended for tests and prototyping: queries scan the
//! whole collection and index specifications are registered but never
//! consulted.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::Bson;
use mea::rwlock::RwLock;

use docrepo_core::{
    backend::{IndexSpec, StoreBackend, StoreBackendBuilder},
    entity::ID_FIELD,
    error::{RepositoryError, RepositoryResult},
    query::{Expr, Query, SortDirection},
    update::{UpdateOp, UpdateSpec},
};

use crate::evaluator::{DocumentEvaluator, compare_field};

type CollectionMap = HashMap<String, Bson>;
type StoreMap = HashMap<String, CollectionMap>;
type IndexMap = HashMap<String, Vec<IndexSpec>>;

/// Thread-safe in-memory document storage backend.
///
/// Cloneable; clones share the same underlying data. Every write the store
/// applies is acknowledged (`Ok(true)`), matching the acknowledgment contract
/// of the backend trait: matching zero documents is still an acknowledged
/// write.
///
/// # Example
///
/// ```ignore
/// use docrepo_memory::InMemoryStore;
/// use docrepo_core::repository::Repository;
///
/// let store = InMemoryStore::new();
/// let users: Repository<_, User> = Repository::new(store);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (identity hex -> document)
    store: Arc<RwLock<StoreMap>>,
    /// collection name -> registered index specifications
    indexes: Arc<RwLock<IndexMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing an [`InMemoryStore`].
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }

    /// Returns the index specifications registered for a collection.
    pub async fn registered_indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.indexes
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn identity_key(document: &Bson) -> RepositoryResult<String> {
        let id = document
            .as_document()
            .and_then(|doc| doc.get(ID_FIELD))
            .ok_or_else(|| {
                RepositoryError::InvalidDocument(format!(
                    "document is missing its {ID_FIELD} field"
                ))
            })?;

        match id {
            Bson::ObjectId(oid) => Ok(oid.to_hex()),
            other => Err(RepositoryError::InvalidDocument(format!(
                "unsupported identity value: {other}"
            ))),
        }
    }

    fn matching_keys(collection: &CollectionMap, filter: Option<&Expr>) -> Vec<String> {
        collection
            .iter()
            .filter(|(_, doc)| match filter {
                Some(expr) => DocumentEvaluator::new(doc)
                    .matches(expr)
                    .unwrap_or(false),
                None => true,
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn apply_update(document: &mut Bson, update: &UpdateSpec) {
        let Some(doc) = document.as_document_mut() else {
            return;
        };

        for op in update.ops() {
            match op {
                UpdateOp::Set { field, value } => {
                    doc.insert(field.clone(), value.clone());
                }
                UpdateOp::Unset { field } => {
                    doc.remove(field);
                }
                UpdateOp::CurrentTimestamp { field } => {
                    doc.insert(field.clone(), bson::DateTime::now());
                }
            }
        }
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find_many(&self, collection: &str, query: Query) -> RepositoryResult<Vec<Bson>> {
        let store = self.store.read().await;
        let Some(collection) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut documents = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(collection.values(), filter),
            None => collection.values().cloned().collect(),
        };

        // Unsorted map iteration order is meaningless, so an absent sort
        // falls back to identity order to keep results deterministic.
        let (field, direction) = match &query.sort {
            Some(sort) => (sort.field.as_str(), sort.direction),
            None => (ID_FIELD, SortDirection::Asc),
        };

        documents.sort_by(|a, b| {
            let ordering = compare_field(a, b, field);

            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        Ok(documents
            .into_iter()
            .skip(query.skip.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn insert_one(&self, collection: &str, document: Bson) -> RepositoryResult<()> {
        self.insert_many(collection, vec![document]).await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Bson>) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        let map = store.entry(collection.to_string()).or_default();

        for document in documents {
            let key = Self::identity_key(&document)?;

            if map.contains_key(&key) {
                return Err(RepositoryError::DuplicateIdentity(
                    key,
                    collection.to_string(),
                ));
            }

            map.insert(key, document);
        }

        Ok(())
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Expr,
        document: Bson,
    ) -> RepositoryResult<bool> {
        let mut store = self.store.write().await;
        let Some(map) = store.get_mut(collection) else {
            return Ok(true);
        };

        if let Some(key) = Self::matching_keys(map, Some(&filter)).into_iter().next() {
            map.insert(key, document);
        }

        Ok(true)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: UpdateSpec,
    ) -> RepositoryResult<bool> {
        let mut store = self.store.write().await;
        let Some(map) = store.get_mut(collection) else {
            return Ok(true);
        };

        for key in Self::matching_keys(map, filter.as_ref()) {
            if let Some(document) = map.get_mut(&key) {
                Self::apply_update(document, &update);
            }
        }

        Ok(true)
    }

    async fn delete_many(&self, collection: &str, filter: Option<Expr>) -> RepositoryResult<bool> {
        let mut store = self.store.write().await;
        let Some(map) = store.get_mut(collection) else {
            return Ok(true);
        };

        match filter {
            None => map.clear(),
            Some(expr) => {
                for key in Self::matching_keys(map, Some(&expr)) {
                    map.remove(&key);
                }
            }
        }

        Ok(true)
    }

    async fn count(&self, collection: &str, filter: Option<Expr>) -> RepositoryResult<u64> {
        let store = self.store.read().await;
        let Some(map) = store.get(collection) else {
            return Ok(0);
        };

        Ok(Self::matching_keys(map, filter.as_ref()).len() as u64)
    }

    async fn estimated_count(&self, collection: &str) -> RepositoryResult<u64> {
        // No metadata to estimate from; the exact size is free here.
        let store = self.store.read().await;

        Ok(store.get(collection).map_or(0, |map| map.len() as u64))
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> RepositoryResult<()> {
        let mut indexes = self.indexes.write().await;
        let specs = indexes.entry(collection.to_string()).or_default();

        specs.retain(|existing| existing.field != index.field);
        specs.push(index);

        Ok(())
    }

    async fn drop_index(&self, collection: &str, field: &str) -> RepositoryResult<()> {
        let mut indexes = self.indexes.write().await;

        if let Some(specs) = indexes.get_mut(collection) {
            specs.retain(|existing| existing.field != field);
        }

        Ok(())
    }

    async fn drop_all_indexes(&self, collection: &str) -> RepositoryResult<()> {
        self.indexes.write().await.remove(collection);

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// Construction cannot fail; the builder exists to satisfy the common
/// [`StoreBackendBuilder`] seam.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> RepositoryResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};
    use docrepo_core::query::Filter;
    use futures::executor::block_on;

    use super::*;

    fn person(name: &str, age: i32) -> Bson {
        Bson::Document(doc! { "_id": ObjectId::new(), "name": name, "age": age })
    }

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        block_on(store.insert_many(
            "people",
            vec![person("alice", 30), person("bob", 25), person("carol", 41)],
        ))
        .unwrap();

        store
    }

    fn names(documents: &[Bson]) -> Vec<&str> {
        documents
            .iter()
            .map(|doc| doc.as_document().unwrap().get_str("name").unwrap())
            .collect()
    }

    #[test]
    fn unsorted_find_returns_identity_order() {
        let store = seeded();
        let found = block_on(store.find_many("people", Query::new())).unwrap();

        assert_eq!(names(&found), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn filter_sort_skip_and_limit_compose() {
        let store = seeded();
        let query = Query::builder()
            .filter(Filter::gt("age", 20))
            .sort("age", SortDirection::Desc)
            .skip(1)
            .limit(1)
            .build();
        let found = block_on(store.find_many("people", query)).unwrap();

        assert_eq!(names(&found), vec!["alice"]);
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let store = InMemoryStore::new();
        let document = person("dave", 50);

        block_on(store.insert_one("people", document.clone())).unwrap();
        let result = block_on(store.insert_one("people", document));

        assert!(matches!(result, Err(RepositoryError::DuplicateIdentity(..))));
    }

    #[test]
    fn document_without_identity_is_rejected() {
        let store = InMemoryStore::new();
        let result = block_on(store.insert_one("people", Bson::Document(doc! { "name": "eve" })));

        assert!(matches!(result, Err(RepositoryError::InvalidDocument(_))));
    }

    #[test]
    fn update_many_applies_ops_and_stamps_modified_at() {
        let store = seeded();
        let acknowledged = block_on(store.update_many(
            "people",
            Some(Filter::eq("name", "bob")),
            UpdateSpec::set("age", 26),
        ))
        .unwrap();
        assert!(acknowledged);

        let found = block_on(
            store.find_many("people", Query::builder().filter(Filter::eq("name", "bob")).build()),
        )
        .unwrap();
        let bob = found[0].as_document().unwrap();

        assert_eq!(bob.get_i32("age").unwrap(), 26);
        assert!(bob.get_datetime("modified_at").is_ok());
    }

    #[test]
    fn write_against_missing_collection_is_acknowledged() {
        let store = InMemoryStore::new();

        assert!(block_on(store.delete_many("ghosts", None)).unwrap());
        assert!(
            block_on(store.update_many("ghosts", None, UpdateSpec::touch())).unwrap()
        );
    }

    #[test]
    fn delete_many_with_filter_removes_only_matches() {
        let store = seeded();

        block_on(store.delete_many("people", Some(Filter::lt("age", 35)))).unwrap();

        assert_eq!(block_on(store.count("people", None)).unwrap(), 1);
        assert_eq!(block_on(store.estimated_count("people")).unwrap(), 1);
    }

    #[test]
    fn index_registry_tracks_create_and_drop() {
        let store = InMemoryStore::new();

        block_on(store.create_index("people", IndexSpec::unique("email"))).unwrap();
        block_on(store.create_index("people", IndexSpec::new("age"))).unwrap();
        assert_eq!(block_on(store.registered_indexes("people")).len(), 2);

        block_on(store.drop_index("people", "age")).unwrap();
        assert_eq!(block_on(store.registered_indexes("people")).len(), 1);

        block_on(store.drop_all_indexes("people")).unwrap();
        assert!(block_on(store.registered_indexes("people")).is_empty());
    }
}
