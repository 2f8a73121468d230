//! Convenient re-exports of commonly used types from docrepo.
//!
//! Import this prelude module to quickly access the most frequently used
//! types and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docrepo::prelude::*;
//! ```
//!
//! This provides access to:
//! - The entity contract and its derive macro
//! - Repository facades (async and blocking) and find options
//! - Store backends, builders, and index specifications
//! - Query construction and filtering
//! - Update operations
//! - Paging and error types

pub use bson::{DateTime, oid::ObjectId};

pub use docrepo_core::{
    backend::{IndexSpec, StoreBackend, StoreBackendBuilder},
    blocking::BlockingRepository,
    entity::{Entity, EntityExt},
    error::{RepositoryError, RepositoryResult},
    page::{Page, PageRequest},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    repository::{FindOptions, Repository},
    retry::RetryPolicy,
    update::{UpdateOp, UpdateSpec},
};

pub use docrepo_macros::Entity;
