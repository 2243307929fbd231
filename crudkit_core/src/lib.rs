#![forbid(unsafe_code)]
//! Core traits for the crudkit repository library.
//! This crate is database-agnostic and should not contain any backend-specific logic.

// Re-export for downstream macro expansions (used by crudkit_macros::Entity)
pub use async_trait::async_trait;

pub mod page;
mod repository;

pub use page::{Page, PageRequest};
pub use repository::{resolve_primary_key, Repository};

/// Storage-level description of one mapped column of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMeta {
    /// The column name as the storage backend sees it (snake_case by convention).
    pub name: &'static str,
    /// Whether this column is the table's primary key.
    pub primary_key: bool,
}

/// Compile-time schema metadata for a mapped entity.
/// Implemented via `#[derive(Entity)]` in `crudkit_macros`; the column list is
/// what the primary-key resolver scans at repository construction.
pub trait EntityMeta {
    const TABLE: &'static str;
    const COLUMNS: &'static [ColumnMeta];

    /// Column names in declaration order, for SELECT lists.
    fn column_names() -> Vec<&'static str> {
        Self::COLUMNS.iter().map(|c| c.name).collect()
    }
}

/// Trait for entities that have an identifiable key.
pub trait Identifiable {
    /// The type of the primary key (e.g., `i64`).
    type Key;

    /// The name of the primary key column in the database.
    const ID_COLUMN: &'static str;

    /// Returns a copy of the entity's ID, if it has one.
    fn id(&self) -> Option<Self::Key>;
}

/// Trait for types whose field values can be extracted for write statements.
/// Implemented by the `#[derive(Entity)]` macro.
pub trait Persistable {
    /// The columns used in an INSERT statement, excluding an auto-generated key.
    const INSERT_COLUMNS: &'static [&'static str];

    /// The values corresponding to `INSERT_COLUMNS`.
    fn insert_values(&self) -> Vec<ParamValue>;

    /// The values for every mapped column, in `EntityMeta::COLUMNS` order.
    /// Used by upsert-by-primary-key writes.
    fn column_values(&self) -> Vec<ParamValue>;
}

/// A backend-agnostic representation of a database parameter value.
/// This is used to pass filter arguments and entity field values to backend
/// adapters without making `crudkit_core` dependent on a specific driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    I32(i32),
    I64(i64),
    F64(f64),
    Bool(bool),
    Null,
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}
impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}
impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::I32(v)
    }
}
impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::I64(v)
    }
}
impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::F64(v)
    }
}
impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

/// A filter condition passed through to the storage backend: a condition
/// clause with positional placeholders plus its arguments.
///
/// The clause syntax is owned by the backend (e.g. `email = ?` for SQLite
/// flavors); this layer never interprets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clause: String,
    params: Vec<ParamValue>,
}

impl Filter {
    pub fn new<C, P>(clause: C, params: P) -> Self
    where
        C: Into<String>,
        P: IntoIterator<Item = ParamValue>,
    {
        Self {
            clause: clause.into(),
            params: params.into_iter().collect(),
        }
    }

    /// A filter that matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// An equality filter on a single column.
    pub fn by_column(column: &str, value: ParamValue) -> Self {
        Self {
            clause: format!("{} = ?", column),
            params: vec![value],
        }
    }

    /// True when the filter matches every row (no condition clause).
    pub fn is_empty(&self) -> bool {
        self.clause.trim().is_empty()
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn params(&self) -> &[ParamValue] {
        &self.params
    }
}

/// Lightweight, backend-agnostic error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A required argument was null or missing.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The entity was not found (zero rows returned or affected).
    #[error("entity not found")]
    NotFound,
    /// The entity's primary key could not be resolved from its metadata.
    #[error("schema error: {0}")]
    Schema(&'static str),
    /// Error while mapping a backend row into an entity.
    #[error("mapping error")]
    Mapping {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Opaque backend error from the underlying driver or adapter.
    #[error("backend error")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RepoError {
    /// Wrap a backend/driver error.
    pub fn backend<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Backend {
            source: Box::new(e),
        }
    }
    /// Wrap a row-mapping error.
    pub fn mapping<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Mapping {
            source: Box::new(e),
        }
    }
}

/// Convenience alias for results returned by repository methods.
pub type RepoResult<T> = Result<T, RepoError>;

/// The capability set a storage backend must provide for an entity `T`.
/// Every repository operation is a thin pass-through to one of these.
/// Concrete backends (libsql, in-memory test doubles) implement this trait.
#[async_trait]
pub trait StorageBackend<T: EntityMeta> {
    /// Insert a new entity. The returned entity may differ if the database
    /// generates some fields (e.g., auto-incrementing keys).
    async fn create(&self, entity: &T) -> RepoResult<T>;

    /// Upsert by primary key: insert the entity, or replace the existing row
    /// carrying the same key.
    async fn save(&self, entity: &T) -> RepoResult<T>;

    /// Fetch the first row matching the filter. `Ok(None)` when no row matches.
    async fn find_first(&self, filter: &Filter) -> RepoResult<Option<T>>;

    /// Fetch the rows matching the filter. A negative `offset` or `limit` is
    /// the unbounded sentinel (no OFFSET / no LIMIT).
    async fn find_many(&self, filter: &Filter, offset: i64, limit: i64) -> RepoResult<Vec<T>>;

    /// Count the rows matching the filter, independent of any pagination.
    async fn count(&self, filter: &Filter) -> RepoResult<i64>;

    /// Delete the rows matching the filter. Returns the number of rows affected.
    async fn delete(&self, filter: &Filter) -> RepoResult<u64>;
}

/// A tiny adapter for mapping a backend-specific row type into an entity `T`.
/// Backends implement this for their row representations.
#[allow(clippy::wrong_self_convention)]
pub trait RowAdapter<T> {
    type Row;
    fn from_row(&self, row: &Self::Row) -> RepoResult<T>;
}
