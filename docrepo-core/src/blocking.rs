//! Blocking facade over [`Repository`].
//!
//! Each [`BlockingRepository`] owns a private current-thread runtime and
//! drives the async facade to completion on the calling thread, so the two
//! surfaces cannot drift: every blocking operation *is* the async operation,
//! retry semantics included.
//!
//! Must not be used from within an async context; blocking a runtime thread
//! on another runtime panics by design in tokio.

use bson::oid::ObjectId;
use tokio::runtime::{Builder, Runtime};

use crate::{
    backend::{IndexSpec, StoreBackend},
    entity::Entity,
    error::{RepositoryError, RepositoryResult},
    page::{Page, PageRequest},
    query::Expr,
    repository::{FindOptions, Repository},
    retry::RetryPolicy,
    update::UpdateOp,
};

/// A synchronous repository over one named collection.
///
/// Semantically identical to [`Repository`]; see that type for the behavior
/// of each operation.
#[derive(Debug)]
pub struct BlockingRepository<B: StoreBackend, E: Entity> {
    inner: Repository<B, E>,
    runtime: Runtime,
}

impl<B: StoreBackend, E: Entity> BlockingRepository<B, E> {
    /// Creates a blocking repository bound to the entity type's default
    /// collection.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Initialization`] when the internal runtime
    /// cannot be constructed.
    pub fn new(backend: B) -> RepositoryResult<Self> {
        Self::from_async(Repository::new(backend))
    }

    /// Creates a blocking repository bound to an explicitly named collection.
    pub fn with_collection_name(
        backend: B,
        collection: impl Into<String>,
    ) -> RepositoryResult<Self> {
        Self::from_async(Repository::with_collection_name(backend, collection))
    }

    /// Wraps an existing async repository, keeping its collection binding and
    /// retry policy.
    pub fn from_async(inner: Repository<B, E>) -> RepositoryResult<Self> {
        let runtime = Builder::new_current_thread()
            .build()
            .map_err(|err| RepositoryError::Initialization(err.to_string()))?;

        Ok(Self { inner, runtime })
    }

    /// Replaces the retry policy of the underlying async repository.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.inner = self.inner.with_retry_policy(retry);
        self
    }

    /// Returns the name of the bound collection.
    pub fn collection_name(&self) -> &str {
        self.inner.collection_name()
    }

    /// See [`Repository::find`].
    pub fn find(&self, filter: Option<Expr>, options: FindOptions) -> RepositoryResult<Vec<E>> {
        self.runtime.block_on(self.inner.find(filter, options))
    }

    /// See [`Repository::find_all`].
    pub fn find_all(&self) -> RepositoryResult<Vec<E>> {
        self.runtime.block_on(self.inner.find_all())
    }

    /// See [`Repository::find_page`].
    pub fn find_page(
        &self,
        filter: Option<Expr>,
        options: FindOptions,
        page: PageRequest,
    ) -> RepositoryResult<Page<E>> {
        self.runtime
            .block_on(self.inner.find_page(filter, options, page))
    }

    /// See [`Repository::first`].
    pub fn first(&self) -> RepositoryResult<Option<E>> {
        self.runtime.block_on(self.inner.first())
    }

    /// See [`Repository::first_where`].
    pub fn first_where(
        &self,
        filter: Option<Expr>,
        sort_field: Option<&str>,
        descending: bool,
    ) -> RepositoryResult<Option<E>> {
        self.runtime
            .block_on(self.inner.first_where(filter, sort_field, descending))
    }

    /// See [`Repository::last`].
    pub fn last(&self) -> RepositoryResult<Option<E>> {
        self.runtime.block_on(self.inner.last())
    }

    /// See [`Repository::last_where`].
    pub fn last_where(
        &self,
        filter: Option<Expr>,
        sort_field: Option<&str>,
        descending: bool,
    ) -> RepositoryResult<Option<E>> {
        self.runtime
            .block_on(self.inner.last_where(filter, sort_field, descending))
    }

    /// See [`Repository::get`].
    pub fn get(&self, id: ObjectId) -> RepositoryResult<Option<E>> {
        self.runtime.block_on(self.inner.get(id))
    }

    /// See [`Repository::insert`].
    pub fn insert(&self, entity: &E) -> RepositoryResult<()> {
        self.runtime.block_on(self.inner.insert(entity))
    }

    /// See [`Repository::insert_many`].
    pub fn insert_many(&self, entities: &[E]) -> RepositoryResult<()> {
        self.runtime.block_on(self.inner.insert_many(entities))
    }

    /// See [`Repository::replace`].
    pub fn replace(&self, entity: &E) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.replace(entity))
    }

    /// See [`Repository::replace_many`].
    pub fn replace_many(&self, entities: &[E]) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.replace_many(entities))
    }

    /// See [`Repository::update`].
    pub fn update(
        &self,
        id: ObjectId,
        ops: impl IntoIterator<Item = UpdateOp>,
    ) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.update(id, ops))
    }

    /// See [`Repository::update_entity`].
    pub fn update_entity(
        &self,
        entity: &E,
        ops: impl IntoIterator<Item = UpdateOp>,
    ) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.update_entity(entity, ops))
    }

    /// See [`Repository::update_where`].
    pub fn update_where(
        &self,
        filter: Expr,
        ops: impl IntoIterator<Item = UpdateOp>,
    ) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.update_where(filter, ops))
    }

    /// See [`Repository::update_field`].
    pub fn update_field(
        &self,
        id: ObjectId,
        field: impl Into<String>,
        value: impl Into<bson::Bson>,
    ) -> RepositoryResult<bool> {
        self.runtime
            .block_on(self.inner.update_field(id, field, value))
    }

    /// See [`Repository::touch`].
    pub fn touch(&self, id: ObjectId) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.touch(id))
    }

    /// See [`Repository::delete`].
    pub fn delete(&self, id: ObjectId) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.delete(id))
    }

    /// See [`Repository::delete_entity`].
    pub fn delete_entity(&self, entity: &E) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.delete_entity(entity))
    }

    /// See [`Repository::delete_where`].
    pub fn delete_where(&self, filter: Expr) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.delete_where(filter))
    }

    /// See [`Repository::delete_all`].
    pub fn delete_all(&self) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.delete_all())
    }

    /// See [`Repository::count`].
    pub fn count(&self) -> RepositoryResult<u64> {
        self.runtime.block_on(self.inner.count())
    }

    /// See [`Repository::count_where`].
    pub fn count_where(&self, filter: Option<Expr>) -> RepositoryResult<u64> {
        self.runtime.block_on(self.inner.count_where(filter))
    }

    /// See [`Repository::estimated_count`].
    pub fn estimated_count(&self) -> RepositoryResult<u64> {
        self.runtime.block_on(self.inner.estimated_count())
    }

    /// See [`Repository::any`].
    pub fn any(&self) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.any())
    }

    /// See [`Repository::any_where`].
    pub fn any_where(&self, filter: Option<Expr>) -> RepositoryResult<bool> {
        self.runtime.block_on(self.inner.any_where(filter))
    }

    /// See [`Repository::create_index`].
    pub fn create_index(&self, index: IndexSpec) -> RepositoryResult<()> {
        self.runtime.block_on(self.inner.create_index(index))
    }

    /// See [`Repository::create_indexes`].
    pub fn create_indexes(&self, indexes: &[IndexSpec]) -> RepositoryResult<()> {
        self.runtime.block_on(self.inner.create_indexes(indexes))
    }

    /// See [`Repository::drop_index`].
    pub fn drop_index(&self, field: &str) -> RepositoryResult<()> {
        self.runtime.block_on(self.inner.drop_index(field))
    }

    /// See [`Repository::drop_all_indexes`].
    pub fn drop_all_indexes(&self) -> RepositoryResult<()> {
        self.runtime.block_on(self.inner.drop_all_indexes())
    }
}
