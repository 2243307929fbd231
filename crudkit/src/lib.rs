#![forbid(unsafe_code)]
//! Facade crate re-exporting the core types and macros of the `crudkit`
//! library.
//!
//! This crate provides the main public API. It re-exports the repository
//! facade, the pagination types and the `Entity` derive so applications only
//! need a single dependency.
//!
//! # Example: Deriving `Entity`
//!
//! The `#[derive(Entity)]` macro generates compile-time metadata about your
//! entity, including the table name and the column list the repository needs.
//! ```
//! use crudkit::{Entity, EntityMeta, Identifiable};
//!
//! // The table name (`users`) is deduced by pluralizing the snake_case
//! // version of the struct name; `#[entity(table = "...")]` overrides it.
//! #[derive(Entity, Clone, Debug)]
//! pub struct User {
//!     // Mark the key field. The key type (`i64`) and column name ("id")
//!     // are deduced from the field.
//!     #[entity(id)]
//!     pub id: Option<i64>,
//!     // Column names can be overridden per field.
//!     #[entity(column = "email_address")]
//!     pub email: String,
//! }
//!
//! assert_eq!(User::TABLE, "users");
//! assert_eq!(User::ID_COLUMN, "id");
//! assert_eq!(User::column_names(), vec!["id", "email_address"]);
//! ```
//!
//! # Example: Using a repository
//!
//! A [`Repository`] wraps any [`StorageBackend`] and exposes the CRUD and
//! paginated-search operations:
//! ```ignore
//! let repo = Repository::<User, _>::new(backend)?;
//! let page = repo.search(&PageRequest::new(1, 25), &Filter::all()).await?;
//! ```

// Re-export all core types.
pub use crudkit_core::{
    resolve_primary_key, ColumnMeta, EntityMeta, Filter, Identifiable, Page, PageRequest,
    ParamValue, Persistable, RepoError, RepoResult, Repository, RowAdapter, StorageBackend,
};

// Re-export the derive macro.
pub use crudkit_macros::Entity;

// Backend adapters re-exported under a neutral namespace, so end-users don't
// have to depend on backend crates directly. These are feature-gated.
pub mod backends {
    #[cfg(feature = "libsql-backend")]
    pub use crudkit_libsql::LibsqlBackend;
}
