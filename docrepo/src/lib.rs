//! Main docrepo crate providing a unified interface for entity repositories
//! over document stores.
//!
//! This crate is the primary entry point for users of the docrepo framework.
//! It re-exports the core types and functionality from various sub-crates and
//! provides convenient access to different storage backends.
//!
//! # Features
//!
//! - **Type-safe repositories** - Define your entities with Serde and store them safely
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//! - **Flexible querying** - Composable filters, sorting, and zero-based paging
//! - **Audit timestamps** - Creation time derived from the identity, modification
//!   time advanced by every mutating operation
//! - **Transient-failure retry** - Every store round-trip retries connectivity
//!   failures up to three attempts
//! - **Blocking mirror** - A synchronous facade with identical semantics
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
//! #[entity(collection = "users")]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub created_at: Option<DateTime>,
//!     pub modified_at: DateTime,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let users: Repository<_, User> = Repository::new(InMemoryStore::new());
//!
//!     let user = User {
//!         id: ObjectId::new(),
//!         created_at: None,
//!         modified_at: DateTime::now(),
//!         name: "Alice".to_string(),
//!     };
//!
//!     users.insert(&user).await.unwrap();
//!
//!     let found = users
//!         .find(Some(Filter::eq("name", "Alice")), FindOptions::new())
//!         .await
//!         .unwrap();
//!
//!     println!("Queried users: {found:?}");
//! }
//! ```
//!
//! # Blocking Usage
//!
//! Synchronous codebases use [`BlockingRepository`](prelude::BlockingRepository),
//! which drives the same async facade on a private runtime:
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryStore};
//!
//! let users: BlockingRepository<_, User> =
//!     BlockingRepository::new(InMemoryStore::new()).unwrap();
//!
//! users.insert(&user).unwrap();
//! let page = users.find_page(None, FindOptions::new(), PageRequest::new(0, 25)).unwrap();
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docrepo_core::{backend, blocking, entity, error, page, query, repository, retry, update};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docrepo_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docrepo_mongodb::{MongoConfig, MongoStore, MongoStoreBuilder};
}
