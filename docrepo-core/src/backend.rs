//! Storage backend abstraction for the repository layer.
//!
//! The [`StoreBackend`] trait is the seam between the repository facade and a
//! concrete document store. It exposes, per named collection, exactly the
//! operations the facade composes: find, insert, replace, many-update,
//! many-delete, counting, and index administration.
//!
//! Implementations are required to be thread-safe (`Send + Sync`) and support
//! concurrent access; the repository never serializes calls on their behalf.
//! Retry is *not* a backend concern: backends report failures once and the
//! facade's retry layer decides what to do with them. Backends are expected to
//! map their native connectivity failures onto
//! [`RepositoryError::Connection`](crate::error::RepositoryError::Connection)
//! so the default transient classifier can recognize them.

use async_trait::async_trait;
use bson::Bson;
use std::{fmt::Debug, sync::Arc};

use crate::{error::RepositoryResult, query::{Expr, Query}, update::UpdateSpec};

/// An index over one field of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// The field to index.
    pub field: String,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

impl IndexSpec {
    /// Creates a non-unique index specification.
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into(), unique: false }
    }

    /// Creates a unique index specification.
    pub fn unique(field: impl Into<String>) -> Self {
        Self { field: field.into(), unique: true }
    }
}

/// Abstract interface for document storage backends.
///
/// A filter of `None` always means "match all documents". Boolean returns on
/// write operations are the store's durability acknowledgment: an
/// unacknowledged write surfaces as `Ok(false)`, never as an error.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Queries documents in a collection using a structured query.
    ///
    /// Applies the query's filter, sort, skip, and limit and returns the
    /// matching documents in order.
    async fn find_many(&self, collection: &str, query: Query) -> RepositoryResult<Vec<Bson>>;

    /// Inserts one document into a collection.
    ///
    /// The document carries its own identity field; the backend assigns
    /// nothing.
    async fn insert_one(&self, collection: &str, document: Bson) -> RepositoryResult<()>;

    /// Inserts a batch of documents into a collection.
    async fn insert_many(&self, collection: &str, documents: Vec<Bson>) -> RepositoryResult<()>;

    /// Replaces the single document matching `filter` with `document`,
    /// returning the store's acknowledgment.
    async fn replace_one(
        &self,
        collection: &str,
        filter: Expr,
        document: Bson,
    ) -> RepositoryResult<bool>;

    /// Applies a combined update specification to every document matching
    /// `filter`, returning the store's acknowledgment.
    async fn update_many(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: UpdateSpec,
    ) -> RepositoryResult<bool>;

    /// Deletes every document matching `filter`, returning the store's
    /// acknowledgment. May affect zero, one, or many documents.
    async fn delete_many(&self, collection: &str, filter: Option<Expr>) -> RepositoryResult<bool>;

    /// Returns the exact number of documents matching `filter`.
    async fn count(&self, collection: &str, filter: Option<Expr>) -> RepositoryResult<u64>;

    /// Returns an approximate document count from collection metadata,
    /// without scanning.
    async fn estimated_count(&self, collection: &str) -> RepositoryResult<u64>;

    /// Creates an index on a field in a collection.
    async fn create_index(
        &self,
        collection: &str,
        index: IndexSpec,
    ) -> RepositoryResult<()>;

    /// Removes the index on a field from a collection.
    async fn drop_index(&self, collection: &str, field: &str) -> RepositoryResult<()>;

    /// Removes every index from a collection.
    async fn drop_all_indexes(&self, collection: &str) -> RepositoryResult<()>;
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn find_many(&self, collection: &str, query: Query) -> RepositoryResult<Vec<Bson>> {
        (*self).find_many(collection, query).await
    }

    async fn insert_one(&self, collection: &str, document: Bson) -> RepositoryResult<()> {
        (*self)
            .insert_one(collection, document)
            .await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Bson>) -> RepositoryResult<()> {
        (*self)
            .insert_many(collection, documents)
            .await
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Expr,
        document: Bson,
    ) -> RepositoryResult<bool> {
        (*self)
            .replace_one(collection, filter, document)
            .await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: UpdateSpec,
    ) -> RepositoryResult<bool> {
        (*self)
            .update_many(collection, filter, update)
            .await
    }

    async fn delete_many(&self, collection: &str, filter: Option<Expr>) -> RepositoryResult<bool> {
        (*self)
            .delete_many(collection, filter)
            .await
    }

    async fn count(&self, collection: &str, filter: Option<Expr>) -> RepositoryResult<u64> {
        (*self).count(collection, filter).await
    }

    async fn estimated_count(&self, collection: &str) -> RepositoryResult<u64> {
        (*self).estimated_count(collection).await
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> RepositoryResult<()> {
        (*self)
            .create_index(collection, index)
            .await
    }

    async fn drop_index(&self, collection: &str, field: &str) -> RepositoryResult<()> {
        (*self)
            .drop_index(collection, field)
            .await
    }

    async fn drop_all_indexes(&self, collection: &str) -> RepositoryResult<()> {
        (*self).drop_all_indexes(collection).await
    }
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend,
{
    async fn find_many(&self, collection: &str, query: Query) -> RepositoryResult<Vec<Bson>> {
        (**self).find_many(collection, query).await
    }

    async fn insert_one(&self, collection: &str, document: Bson) -> RepositoryResult<()> {
        (**self)
            .insert_one(collection, document)
            .await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Bson>) -> RepositoryResult<()> {
        (**self)
            .insert_many(collection, documents)
            .await
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Expr,
        document: Bson,
    ) -> RepositoryResult<bool> {
        (**self)
            .replace_one(collection, filter, document)
            .await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: UpdateSpec,
    ) -> RepositoryResult<bool> {
        (**self)
            .update_many(collection, filter, update)
            .await
    }

    async fn delete_many(&self, collection: &str, filter: Option<Expr>) -> RepositoryResult<bool> {
        (**self)
            .delete_many(collection, filter)
            .await
    }

    async fn count(&self, collection: &str, filter: Option<Expr>) -> RepositoryResult<u64> {
        (**self).count(collection, filter).await
    }

    async fn estimated_count(&self, collection: &str) -> RepositoryResult<u64> {
        (**self).estimated_count(collection).await
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> RepositoryResult<()> {
        (**self)
            .create_index(collection, index)
            .await
    }

    async fn drop_index(&self, collection: &str, field: &str) -> RepositoryResult<()> {
        (**self)
            .drop_index(collection, field)
            .await
    }

    async fn drop_all_indexes(&self, collection: &str) -> RepositoryResult<()> {
        (**self).drop_all_indexes(collection).await
    }
}

/// Factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> RepositoryResult<Self::Backend>;
}
