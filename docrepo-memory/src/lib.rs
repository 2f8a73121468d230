//! In-memory storage backend for docrepo.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StoreBackend` trait. It uses async-aware read-write locks for concurrent
//! access and is ideal for development, testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Full query support** - Filtering, sorting, and pagination over scans
//! - **Faithful update semantics** - Field set/unset and server-time stamping
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::prelude::*;
//! use docrepo::memory::InMemoryStore;
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
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::new();
//!     let users: Repository<_, User> = Repository::new(store);
//!
//!     let user = User {
//!         id: ObjectId::new(),
//!         created_at: None,
//!         modified_at: DateTime::now(),
//!         name: "Alice".to_string(),
//!     };
//!     users.insert(&user).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_memory;

pub mod store;
mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
