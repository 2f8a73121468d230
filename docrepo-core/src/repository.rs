//! The repository facade: the public CRUD, paging, counting, and indexing
//! surface over one named collection.
//!
//! Every public operation is a composition of the same three layers: build a
//! [`Query`] or [`UpdateSpec`], hand the composed operation to the bound
//! [`StoreBackend`], and run the store round-trip through the [`RetryPolicy`]
//! exactly once at the outermost layer. Composed calls never double-wrap.
//!
//! A repository holds no mutable state: the collection binding is fixed at
//! construction and every operation is a pure function of its arguments plus
//! the store round-trip, so one instance is safe to share across concurrent
//! calls.

use std::{future::Future, marker::PhantomData};

use bson::oid::ObjectId;
use log::debug;

use crate::{
    backend::{IndexSpec, StoreBackend},
    entity::{Entity, EntityExt, ID_FIELD},
    error::RepositoryResult,
    page::{Page, PageRequest},
    query::{Expr, Filter, Query, SortDirection},
    retry::RetryPolicy,
    update::{UpdateOp, UpdateSpec},
};

/// Optional ordering and paging for find operations.
///
/// A sort field without a stated direction sorts descending; an absent sort
/// field falls back to the identity field ascending, which keeps unordered
/// fetches and their pages stable.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    sort_field: Option<String>,
    ascending: Option<bool>,
    page: Option<PageRequest>,
}

impl FindOptions {
    /// Creates empty options: identity-ascending order, no paging.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sort field.
    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_field = Some(field.into());
        self
    }

    /// Forces ascending order.
    pub fn ascending(mut self) -> Self {
        self.ascending = Some(true);
        self
    }

    /// Forces descending order.
    pub fn descending(mut self) -> Self {
        self.ascending = Some(false);
        self
    }

    /// Restricts the result to one page.
    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }

    fn resolved_sort(&self) -> (String, SortDirection) {
        match &self.sort_field {
            // Directionless explicit sort defaults to descending.
            Some(field) => (
                field.clone(),
                if self.ascending.unwrap_or(false) {
                    SortDirection::Asc
                } else {
                    SortDirection::Desc
                },
            ),
            // Implicit identity sort defaults to ascending.
            None => (
                ID_FIELD.to_string(),
                if self.ascending.unwrap_or(true) {
                    SortDirection::Asc
                } else {
                    SortDirection::Desc
                },
            ),
        }
    }
}

/// A generic repository over one named collection of a document store.
///
/// # Type Parameters
///
/// * `B` - The storage backend type
/// * `E` - The entity type stored in the bound collection
///
/// # Example
///
/// ```ignore
/// use docrepo_core::repository::Repository;
///
/// let repo: Repository<_, User> = Repository::new(backend);
/// let user = repo.get(id).await?;
/// ```
#[derive(Debug)]
pub struct Repository<B: StoreBackend, E: Entity> {
    backend: B,
    collection: String,
    retry: RetryPolicy,
    _entity: PhantomData<E>,
}

impl<B: StoreBackend, E: Entity> Repository<B, E> {
    /// Creates a repository bound to the entity type's default collection.
    pub fn new(backend: B) -> Self {
        Self::with_collection_name(backend, E::collection_name())
    }

    /// Creates a repository bound to an explicitly named collection.
    ///
    /// The binding is immutable for the lifetime of the repository.
    pub fn with_collection_name(backend: B, collection: impl Into<String>) -> Self {
        Self {
            backend,
            collection: collection.into(),
            retry: RetryPolicy::transient(),
            _entity: PhantomData,
        }
    }

    /// Replaces the retry policy (e.g. to supply a backend-specific transient
    /// classifier).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the name of the bound collection.
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Returns a reference to the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs one composed store operation through the retry policy.
    ///
    /// This is the single wrapping point; public operations call it exactly
    /// once per store round-trip.
    async fn run<T, F, Fut>(&self, op: F) -> RepositoryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RepositoryResult<T>>,
    {
        self.retry.run(op).await
    }

    fn build_query(&self, filter: Option<Expr>, options: &FindOptions) -> Query {
        let (field, direction) = options.resolved_sort();
        let mut builder = Query::builder()
            .maybe_filter(filter)
            .sort(field, direction);

        if let Some(page) = options.page {
            builder = builder.page(page);
        }

        builder.build()
    }

    async fn fetch(&self, query: Query) -> RepositoryResult<Vec<E>> {
        self.run(|| self.backend.find_many(&self.collection, query.clone()))
            .await?
            .into_iter()
            .map(E::from_bson)
            .collect()
    }

    async fn head(
        &self,
        filter: Option<Expr>,
        sort_field: Option<&str>,
        direction: SortDirection,
    ) -> RepositoryResult<Option<E>> {
        let query = Query::builder()
            .maybe_filter(filter)
            .sort(sort_field.unwrap_or(ID_FIELD), direction)
            .limit(1)
            .build();

        Ok(self.fetch(query).await?.into_iter().next())
    }

    fn identity_filter(id: ObjectId) -> Expr {
        Filter::eq(ID_FIELD, id)
    }

    // ---- reads ----

    /// Finds entities matching `filter` (or all, for `None`), with optional
    /// ordering and paging.
    ///
    /// The result is finite and re-executed on every call; it is not a live
    /// cursor over the collection.
    pub async fn find(
        &self,
        filter: Option<Expr>,
        options: FindOptions,
    ) -> RepositoryResult<Vec<E>> {
        let query = self.build_query(filter, &options);

        self.fetch(query).await
    }

    /// Finds all entities in the collection, identity ascending.
    pub async fn find_all(&self) -> RepositoryResult<Vec<E>> {
        self.find(None, FindOptions::new()).await
    }

    /// Finds one page of matching entities together with the total match
    /// count and navigation metadata.
    ///
    /// Runs one count and one find round-trip; each is retried
    /// independently.
    pub async fn find_page(
        &self,
        filter: Option<Expr>,
        options: FindOptions,
        page: PageRequest,
    ) -> RepositoryResult<Page<E>> {
        let total = self.count_where(filter.clone()).await?;
        let items = self.find(filter, options.page(page)).await?;

        Ok(Page::assemble(items, total, page))
    }

    /// Returns the first entity in identity-ascending order, or `None` for an
    /// empty collection.
    pub async fn first(&self) -> RepositoryResult<Option<E>> {
        self.head(None, None, SortDirection::Asc).await
    }

    /// Returns the first matching entity under the given order.
    ///
    /// Without an explicit sort field the identity is used; `descending`
    /// defaults the scan direction to ascending when `false`.
    pub async fn first_where(
        &self,
        filter: Option<Expr>,
        sort_field: Option<&str>,
        descending: bool,
    ) -> RepositoryResult<Option<E>> {
        let direction = if descending { SortDirection::Desc } else { SortDirection::Asc };

        self.head(filter, sort_field, direction).await
    }

    /// Returns the last entity in identity-ascending order, or `None` for an
    /// empty collection.
    pub async fn last(&self) -> RepositoryResult<Option<E>> {
        self.head(None, None, SortDirection::Desc).await
    }

    /// Returns the last matching entity under the given order.
    ///
    /// Defined as [`Repository::first_where`] with the direction inverted:
    /// the head of the flipped sort, never a reversed result set.
    pub async fn last_where(
        &self,
        filter: Option<Expr>,
        sort_field: Option<&str>,
        descending: bool,
    ) -> RepositoryResult<Option<E>> {
        self.first_where(filter, sort_field, !descending)
            .await
    }

    /// Retrieves one entity by identity, or `None` when absent.
    ///
    /// Absence is a result, not an error.
    pub async fn get(&self, id: ObjectId) -> RepositoryResult<Option<E>> {
        self.head(Some(Self::identity_filter(id)), None, SortDirection::Asc)
            .await
    }

    // ---- writes ----

    /// Inserts one entity.
    ///
    /// Identity and creation time were assigned at entity construction;
    /// insert mutates no timestamps.
    pub async fn insert(&self, entity: &E) -> RepositoryResult<()> {
        let document = entity.to_bson()?;

        self.run(|| self.backend.insert_one(&self.collection, document.clone()))
            .await
    }

    /// Inserts a batch of entities in one store round-trip.
    pub async fn insert_many(&self, entities: &[E]) -> RepositoryResult<()> {
        let documents = entities
            .iter()
            .map(EntityExt::to_bson)
            .collect::<RepositoryResult<Vec<_>>>()?;

        self.run(|| self.backend.insert_many(&self.collection, documents.clone()))
            .await
    }

    /// Overwrites the stored document with this entity, keyed by identity.
    pub async fn replace(&self, entity: &E) -> RepositoryResult<bool> {
        let filter = Self::identity_filter(entity.id());
        let document = entity.to_bson()?;

        self.run(|| {
            self.backend
                .replace_one(&self.collection, filter.clone(), document.clone())
        })
        .await
    }

    /// Replaces a batch of entities sequentially, one store round-trip per
    /// entity, and returns the conjunction of their acknowledgments.
    ///
    /// Not a single atomic bulk operation: concurrent writers may interleave
    /// with a bulk replace.
    pub async fn replace_many(&self, entities: &[E]) -> RepositoryResult<bool> {
        let mut acknowledged = true;

        for entity in entities {
            acknowledged &= self.replace(entity).await?;
        }

        Ok(acknowledged)
    }

    /// Applies field updates to the entity with the given identity.
    pub async fn update(
        &self,
        id: ObjectId,
        ops: impl IntoIterator<Item = UpdateOp>,
    ) -> RepositoryResult<bool> {
        self.update_where(Self::identity_filter(id), ops)
            .await
    }

    /// Applies field updates to the stored document of this entity.
    pub async fn update_entity(
        &self,
        entity: &E,
        ops: impl IntoIterator<Item = UpdateOp>,
    ) -> RepositoryResult<bool> {
        self.update_where(Self::identity_filter(entity.id()), ops)
            .await
    }

    /// Applies field updates to every entity matching `filter` (bulk update).
    ///
    /// All update addressing modes terminate here: build the predicate,
    /// combine the operations, execute one many-update. The combined
    /// specification always advances the modification timestamp, even when
    /// `ops` is empty.
    pub async fn update_where(
        &self,
        filter: Expr,
        ops: impl IntoIterator<Item = UpdateOp>,
    ) -> RepositoryResult<bool> {
        let update = UpdateSpec::combine(ops);

        self.run(|| {
            self.backend
                .update_many(&self.collection, Some(filter.clone()), update.clone())
        })
        .await
    }

    /// Single-field convenience: set one field on the entity with the given
    /// identity. Sugar over [`Repository::update`].
    pub async fn update_field(
        &self,
        id: ObjectId,
        field: impl Into<String>,
        value: impl Into<bson::Bson>,
    ) -> RepositoryResult<bool> {
        self.update(id, [UpdateOp::set(field, value)])
            .await
    }

    /// Touches the entity with the given identity: a zero-field update that
    /// only advances the modification timestamp.
    pub async fn touch(&self, id: ObjectId) -> RepositoryResult<bool> {
        self.update(id, []).await
    }

    /// Deletes the entity with the given identity.
    pub async fn delete(&self, id: ObjectId) -> RepositoryResult<bool> {
        self.delete_where(Self::identity_filter(id)).await
    }

    /// Deletes the stored document of this entity.
    pub async fn delete_entity(&self, entity: &E) -> RepositoryResult<bool> {
        self.delete(entity.id()).await
    }

    /// Deletes every entity matching `filter`; may affect zero, one, or many
    /// records.
    pub async fn delete_where(&self, filter: Expr) -> RepositoryResult<bool> {
        self.run(|| {
            self.backend
                .delete_many(&self.collection, Some(filter.clone()))
        })
        .await
    }

    /// Clears the collection.
    pub async fn delete_all(&self) -> RepositoryResult<bool> {
        self.run(|| self.backend.delete_many(&self.collection, None))
            .await
    }

    // ---- counts ----

    /// Returns the exact number of entities in the collection.
    pub async fn count(&self) -> RepositoryResult<u64> {
        self.count_where(None).await
    }

    /// Returns the exact number of entities matching `filter`.
    pub async fn count_where(&self, filter: Option<Expr>) -> RepositoryResult<u64> {
        self.run(|| self.backend.count(&self.collection, filter.clone()))
            .await
    }

    /// Returns an approximate entity count from collection metadata.
    pub async fn estimated_count(&self) -> RepositoryResult<u64> {
        self.run(|| self.backend.estimated_count(&self.collection))
            .await
    }

    /// Returns `true` when the collection holds at least one entity.
    pub async fn any(&self) -> RepositoryResult<bool> {
        self.any_where(None).await
    }

    /// Returns `true` when at least one entity matches `filter`.
    ///
    /// Defined as `count(filter) > 0`; the store's execution engine decides
    /// whether that short-circuits.
    pub async fn any_where(&self, filter: Option<Expr>) -> RepositoryResult<bool> {
        Ok(self.count_where(filter).await? > 0)
    }

    // ---- index administration ----

    /// Creates one index on the bound collection.
    pub async fn create_index(&self, index: IndexSpec) -> RepositoryResult<()> {
        debug!("creating index on {}.{}", self.collection, index.field);

        self.run(|| self.backend.create_index(&self.collection, index.clone()))
            .await
    }

    /// Creates several indexes, one store round-trip each.
    pub async fn create_indexes(&self, indexes: &[IndexSpec]) -> RepositoryResult<()> {
        for index in indexes {
            self.create_index(index.clone()).await?;
        }

        Ok(())
    }

    /// Drops the index on one field of the bound collection.
    pub async fn drop_index(&self, field: &str) -> RepositoryResult<()> {
        debug!("dropping index on {}.{field}", self.collection);

        self.run(|| self.backend.drop_index(&self.collection, field))
            .await
    }

    /// Drops every index on the bound collection.
    pub async fn drop_all_indexes(&self) -> RepositoryResult<()> {
        debug!("dropping all indexes on {}", self.collection);

        self.run(|| self.backend.drop_all_indexes(&self.collection))
            .await
    }
}
