//! MongoDB backend implementation for docrepo.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend`
//! trait, enabling persistent entity storage with full query support using
//! MongoDB's querying capabilities.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docrepo = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Full query support** - Filters translate to native MongoDB query documents
//! - **Server-side timestamps** - Modification stamps use `$currentDate`
//! - **Indexing** - Field indexes created and dropped by field name
//!
//! # Example
//!
//! ```ignore
//! use docrepo::backend::StoreBackendBuilder;
//! use docrepo::mongodb::{MongoConfig, MongoStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MongoConfig::new("mongodb://localhost:27017", "my_database");
//!     let store = MongoStore::builder(config).build().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_mongodb;

pub mod store;
mod query;

pub use store::{MongoConfig, MongoStore, MongoStoreBuilder};
