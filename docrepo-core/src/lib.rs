//! A generic repository layer over document stores: CRUD, paged and ordered
//! queries, counting, indexing, and transient-failure retry for any entity
//! carrying an identity and audit timestamps.
//!
//! This crate is the core of the docrepo project and provides:
//!
//! - **Entity contract** ([`entity`]) - The minimal shape every stored record must satisfy
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Query construction** ([`query`]) - Type-safe filter, sort, and paging composition
//! - **Update combination** ([`update`]) - Field-level update operations merged into one atomic document
//! - **Resilient execution** ([`retry`]) - Bounded retry of transient connectivity failures
//! - **Repository facade** ([`repository`]) - The public CRUD/paging/counting/indexing surface
//! - **Blocking facade** ([`blocking`]) - Synchronous mirror of the repository surface
//! - **Error handling** ([`error`]) - Error types and result aliases
//! - **Paging types** ([`page`]) - Page requests and page results
//!
//! # Example
//!
//! ```ignore
//! use docrepo_core::{entity::Entity, repository::Repository};
//! use bson::{DateTime, oid::ObjectId};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub created_at: Option<DateTime>,
//!     pub modified_at: DateTime,
//!     pub name: String,
//! }
//!
//! impl Entity for User {
//!     fn id(&self) -> ObjectId {
//!         self.id
//!     }
//!
//!     fn set_id(&mut self, id: ObjectId) {
//!         self.id = id;
//!     }
//!
//!     fn created_at(&self) -> Option<DateTime> {
//!         self.created_at
//!     }
//!
//!     fn modified_at(&self) -> DateTime {
//!         self.modified_at
//!     }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_core;

pub use bson;

pub mod backend;
pub mod blocking;
pub mod entity;
pub mod error;
pub mod page;
pub mod query;
pub mod repository;
pub mod retry;
pub mod update;
