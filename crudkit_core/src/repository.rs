//! The generic repository facade: thin pass-throughs to a `StorageBackend`
//! plus argument checks and the one-time primary-key lookup.

use std::marker::PhantomData;

use crate::page::{Page, PageRequest, UNBOUNDED};
use crate::{
    ColumnMeta, EntityMeta, Filter, Identifiable, ParamValue, RepoError, RepoResult,
    StorageBackend,
};

/// Scan column metadata for the primary key and return its storage-level name.
///
/// First match wins; composite keys are not supported. Derived entities are
/// checked at compile time, but hand-written `EntityMeta` impls can still
/// present a key-less or empty column set, which surfaces here.
pub fn resolve_primary_key(columns: &'static [ColumnMeta]) -> RepoResult<&'static str> {
    if columns.is_empty() {
        return Err(RepoError::Schema("entity declares no mapped columns"));
    }
    columns
        .iter()
        .find(|c| c.primary_key)
        .map(|c| c.name)
        .ok_or(RepoError::Schema("no primary key found"))
}

/// A generic repository binding a storage backend to one entity type.
///
/// Immutable after construction: the resolved primary-key column is cached for
/// the repository's lifetime, and pagination is carried per call in a
/// [`PageRequest`] rather than as repository state.
///
/// # Example
///
/// ```ignore
/// let repo: Repository<User, LibsqlBackend<User, UserRowAdapter>> =
///     Repository::new(backend)?;
/// let page = repo
///     .search(&PageRequest::new(1, 10), &Filter::new("active = ?", [true.into()]))
///     .await?;
/// ```
pub struct Repository<T, B> {
    backend: B,
    pk_column: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T, B> Repository<T, B>
where
    T: EntityMeta + Identifiable + Send + Sync,
    B: StorageBackend<T> + Send + Sync,
{
    /// Bind a backend to the entity type. Resolves the primary-key column from
    /// the entity's metadata exactly once; a key-less entity is rejected here.
    pub fn new(backend: B) -> RepoResult<Self> {
        let pk_column = resolve_primary_key(T::COLUMNS)?;
        Ok(Self {
            backend,
            pk_column,
            _marker: PhantomData,
        })
    }

    /// The primary-key column name resolved at construction.
    pub fn primary_key_column(&self) -> &'static str {
        self.pk_column
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Insert a new entity.
    pub async fn create(&self, entity: &T) -> RepoResult<T> {
        self.backend.create(entity).await
    }

    /// Fetch the first entity matching the filter. Not-found is an error.
    pub async fn get(&self, filter: &Filter) -> RepoResult<T> {
        self.backend
            .find_first(filter)
            .await?
            .ok_or(RepoError::NotFound)
    }

    /// Fetch one entity by primary key.
    pub async fn get_by_id(&self, id: ParamValue) -> RepoResult<T> {
        if id.is_null() {
            return Err(RepoError::InvalidArgument("id must not be null"));
        }
        self.get(&Filter::by_column(self.pk_column, id)).await
    }

    /// Upsert an existing entity by primary key. An entity without an id
    /// cannot address a row and is rejected.
    pub async fn update(&self, entity: &T) -> RepoResult<T> {
        if entity.id().is_none() {
            return Err(RepoError::InvalidArgument("entity has no id"));
        }
        self.backend.save(entity).await
    }

    /// Delete one entity by primary key. Zero rows affected is reported as
    /// not-found rather than silent success.
    pub async fn delete_by_id(&self, id: ParamValue) -> RepoResult<()> {
        if id.is_null() {
            return Err(RepoError::InvalidArgument("id must not be null"));
        }
        let affected = self
            .backend
            .delete(&Filter::by_column(self.pk_column, id))
            .await?;
        if affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    /// Delete every entity matching the filter. Returns rows affected; zero is
    /// not an error for a bulk delete.
    pub async fn delete(&self, filter: &Filter) -> RepoResult<u64> {
        self.backend.delete(filter).await
    }

    /// Paginated search: a filtered page read plus a filtered count, executed
    /// as two independent reads. The count may race concurrent writes; the
    /// page totals are point-in-time. An empty page is not an error.
    pub async fn search(&self, request: &PageRequest, filter: &Filter) -> RepoResult<Page<T>> {
        let entities = self
            .backend
            .find_many(filter, request.offset(), request.limit())
            .await?;
        let total_count = self.backend.count(filter).await?;
        Ok(Page::assemble(entities, request, total_count))
    }

    /// Fetch every entity matching the filter, unpaginated.
    pub async fn search_all(&self, filter: &Filter) -> RepoResult<Vec<T>> {
        self.backend.find_many(filter, UNBOUNDED, UNBOUNDED).await
    }
}
