//! MongoDB storage backend.
//!
//! Documents are stored as-is: the entity's serialized form is the stored
//! form, identity field included, so the collection remains readable by other
//! MongoDB tooling.

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use log::info;
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions, IndexOptions},
};
use serde::{Deserialize, Serialize};

use docrepo_core::{
    backend::{IndexSpec, StoreBackend, StoreBackendBuilder},
    error::{RepositoryError, RepositoryResult},
    query::{Expr, Query, QueryVisitor, SortDirection},
    update::UpdateSpec,
};

use crate::query::{MongoQueryTranslator, translate_update};

/// Connection configuration for a [`MongoStore`].
///
/// Deserializable so it can live in an application's configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`.
    pub uri: String,
    /// Database holding the repository collections.
    pub database: String,
    /// Application name reported to the server, visible in server logs.
    #[serde(default)]
    pub app_name: Option<String>,
}

impl MongoConfig {
    /// Creates a configuration with the given connection string and database.
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            app_name: None,
        }
    }
}

/// MongoDB-backed document storage.
///
/// Wraps a driver [`Client`], which is internally pooled; clone the store (or
/// share it behind an `Arc`) rather than building one per repository.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    database: String,
}

impl MongoStore {
    /// Creates a store over an already-connected client.
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self { client, database: database.into() }
    }

    /// Creates a builder that connects using the given configuration.
    pub fn builder(config: MongoConfig) -> MongoStoreBuilder {
        MongoStoreBuilder { config }
    }

    /// Terminates the underlying client's connections.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }

    fn collection(&self, name: &str) -> MongoCollection<Document> {
        self.client.database(&self.database).collection(name)
    }

    fn filter_document(filter: Option<&Expr>) -> RepositoryResult<Document> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }
}

/// Maps a driver error onto the repository error taxonomy.
///
/// Connectivity failures land on [`RepositoryError::Connection`] so the
/// default transient classifier retries them; everything else is terminal.
fn map_error(err: MongoError, collection: &str) -> RepositoryError {
    match err.kind.as_ref() {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => RepositoryError::Connection(err.to_string()),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == 11000 => {
            RepositoryError::DuplicateIdentity(write.message.clone(), collection.to_string())
        }
        _ => RepositoryError::Store(err.to_string()),
    }
}

fn as_document(value: Bson) -> RepositoryResult<Document> {
    match value {
        Bson::Document(doc) => Ok(doc),
        other => Err(RepositoryError::InvalidDocument(format!(
            "expected a document, got {other}"
        ))),
    }
}

#[async_trait]
impl StoreBackend for MongoStore {
    async fn find_many(&self, collection: &str, query: Query) -> RepositoryResult<Vec<Bson>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.skip {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(doc! {
                sort.field.clone(): match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                }
            });
        }

        Ok(self
            .collection(collection)
            .find(Self::filter_document(query.filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(|err| map_error(err, collection))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|err| map_error(err, collection))?
            .into_iter()
            .map(Bson::Document)
            .collect())
    }

    async fn insert_one(&self, collection: &str, document: Bson) -> RepositoryResult<()> {
        self.collection(collection)
            .insert_one(as_document(document)?)
            .await
            .map_err(|err| map_error(err, collection))?;

        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Bson>) -> RepositoryResult<()> {
        self.collection(collection)
            .insert_many(
                documents
                    .into_iter()
                    .map(as_document)
                    .collect::<RepositoryResult<Vec<_>>>()?,
            )
            .await
            .map_err(|err| map_error(err, collection))?;

        Ok(())
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Expr,
        document: Bson,
    ) -> RepositoryResult<bool> {
        self.collection(collection)
            .replace_one(Self::filter_document(Some(&filter))?, as_document(document)?)
            .await
            .map_err(|err| map_error(err, collection))?;

        // The driver only yields a result for acknowledged writes; matching
        // zero documents is still an acknowledged round-trip.
        Ok(true)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: UpdateSpec,
    ) -> RepositoryResult<bool> {
        self.collection(collection)
            .update_many(
                Self::filter_document(filter.as_ref())?,
                translate_update(&update),
            )
            .await
            .map_err(|err| map_error(err, collection))?;

        Ok(true)
    }

    async fn delete_many(&self, collection: &str, filter: Option<Expr>) -> RepositoryResult<bool> {
        self.collection(collection)
            .delete_many(Self::filter_document(filter.as_ref())?)
            .await
            .map_err(|err| map_error(err, collection))?;

        Ok(true)
    }

    async fn count(&self, collection: &str, filter: Option<Expr>) -> RepositoryResult<u64> {
        Ok(self
            .collection(collection)
            .count_documents(Self::filter_document(filter.as_ref())?)
            .await
            .map_err(|err| map_error(err, collection))?)
    }

    async fn estimated_count(&self, collection: &str) -> RepositoryResult<u64> {
        Ok(self
            .collection(collection)
            .estimated_document_count()
            .await
            .map_err(|err| map_error(err, collection))?)
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> RepositoryResult<()> {
        // Named after the field so drop_index can address it symmetrically.
        let model = IndexModel::builder()
            .keys(doc! { index.field.clone(): 1 })
            .options(
                IndexOptions::builder()
                    .unique(index.unique)
                    .name(index.field)
                    .build(),
            )
            .build();

        self.collection(collection)
            .create_index(model)
            .await
            .map_err(|err| map_error(err, collection))?;

        Ok(())
    }

    async fn drop_index(&self, collection: &str, field: &str) -> RepositoryResult<()> {
        self.collection(collection)
            .drop_index(field)
            .await
            .map_err(|err| map_error(err, collection))?;

        Ok(())
    }

    async fn drop_all_indexes(&self, collection: &str) -> RepositoryResult<()> {
        self.collection(collection)
            .drop_indexes()
            .await
            .map_err(|err| map_error(err, collection))?;

        Ok(())
    }
}

/// Builder that parses the connection string and connects a [`MongoStore`].
pub struct MongoStoreBuilder {
    config: MongoConfig,
}

#[async_trait]
impl StoreBackendBuilder for MongoStoreBuilder {
    type Backend = MongoStore;

    async fn build(self) -> RepositoryResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.config.uri)
            .await
            .map_err(|err| RepositoryError::Initialization(err.to_string()))?;
        options.app_name = self.config.app_name.clone();

        let client = Client::with_options(options)
            .map_err(|err| RepositoryError::Initialization(err.to_string()))?;

        info!("connected to mongodb database {}", self.config.database);

        Ok(MongoStore::new(client, self.config.database))
    }
}
