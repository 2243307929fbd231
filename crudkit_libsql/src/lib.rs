#![forbid(unsafe_code)]
#![cfg_attr(
    not(feature = "libsql-backend"),
    doc = "Enable feature `libsql-backend` to use this adapter."
)]

pub mod sql;

#[cfg(feature = "libsql-backend")]
mod backend {
    use std::marker::PhantomData;
    use std::sync::Arc;
    use std::time::Instant;

    use async_trait::async_trait;
    use libsql::{Connection, Database, Row, Value};
    use tracing::debug;

    use crudkit_core::{
        resolve_primary_key, EntityMeta, Filter, Identifiable, ParamValue, Persistable, RepoError,
        RepoResult, RowAdapter, StorageBackend,
    };

    use crate::sql;

    // Helper function to convert ParamValue to libsql::Value.
    fn to_libsql_value(p: ParamValue) -> Value {
        match p {
            ParamValue::String(s) => s.into(),
            ParamValue::I32(i) => (i as i64).into(), // libsql uses i64 for integers
            ParamValue::I64(i) => i.into(),
            ParamValue::F64(f) => f.into(),
            ParamValue::Bool(b) => (b as i64).into(), // SQLite bools are 0/1
            ParamValue::Null => Value::Null,
        }
    }

    #[inline]
    fn trace_op(op: &str, table: &str, start: Instant, rows: usize) {
        debug!(
            table = table,
            op = op,
            rows = rows,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "backend op"
        );
    }

    /// A fully asynchronous, `libsql`-backed storage backend for one entity
    /// type. Rows are decoded through an injected [`RowAdapter`].
    pub struct LibsqlBackend<T, A>
    where
        T: EntityMeta + 'static,
        A: RowAdapter<T> + Send + Sync + 'static,
    {
        db: Arc<Database>,
        adapter: A,
        pk_column: &'static str,
        insert_sql: String,
        upsert_sql: String,
        _marker: PhantomData<fn() -> T>,
    }

    impl<T, A> LibsqlBackend<T, A>
    where
        T: EntityMeta + Persistable + Identifiable + 'static,
        A: RowAdapter<T, Row = Row> + Send + Sync + 'static,
    {
        /// Creates a backend from an existing `libsql::Database` object.
        /// The write statements are prebuilt once per entity type; an entity
        /// without a primary-key column is rejected here.
        pub fn new(db: Arc<Database>, adapter: A) -> RepoResult<Self> {
            let pk_column = resolve_primary_key(T::COLUMNS)?;
            Ok(Self {
                db,
                adapter,
                pk_column,
                insert_sql: sql::insert::<T>(),
                upsert_sql: sql::upsert::<T>(pk_column),
                _marker: PhantomData,
            })
        }

        /// Creates a backend by connecting to a database URL.
        pub async fn from_url(database_url: &str, adapter: A) -> RepoResult<Self> {
            // Database::open is deprecated upstream; keep a narrow allow here
            // until the Builder migration.
            #[allow(deprecated)]
            let db = Arc::new(Database::open(database_url).map_err(RepoError::backend)?);
            Self::new(db, adapter)
        }

        fn connect(&self) -> RepoResult<Connection> {
            self.db.connect().map_err(RepoError::backend)
        }

        fn bind(filter: &Filter) -> Vec<Value> {
            filter
                .params()
                .iter()
                .cloned()
                .map(to_libsql_value)
                .collect()
        }

        /// Re-read one row by primary key on the same connection, so a write
        /// returns the row as the database stored it.
        async fn fetch_by_pk(&self, conn: &Connection, key: ParamValue) -> RepoResult<T> {
            let filter = Filter::by_column(self.pk_column, key);
            let stmt = sql::select_where::<T>(&filter, -1, 1);
            let mut rows = conn
                .query(&stmt, Self::bind(&filter))
                .await
                .map_err(RepoError::backend)?;
            match rows.next().await.map_err(RepoError::backend)? {
                Some(row) => self.adapter.from_row(&row),
                None => Err(RepoError::backend(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "row not visible after write",
                ))),
            }
        }
    }

    #[async_trait]
    impl<T, A> StorageBackend<T> for LibsqlBackend<T, A>
    where
        T: EntityMeta + Persistable + Identifiable + Send + Sync + 'static,
        T::Key: Into<ParamValue> + Clone + Send + Sync,
        A: RowAdapter<T, Row = Row> + Send + Sync + 'static,
    {
        async fn create(&self, entity: &T) -> RepoResult<T> {
            let start = Instant::now();
            let conn = self.connect()?;
            let values: Vec<Value> = entity
                .insert_values()
                .into_iter()
                .map(to_libsql_value)
                .collect();
            conn.execute(&self.insert_sql, values)
                .await
                .map_err(RepoError::backend)?;

            // Fetch using the same connection to avoid any visibility issues.
            let new_id = conn.last_insert_rowid();
            let created = self.fetch_by_pk(&conn, ParamValue::I64(new_id)).await?;
            trace_op("create", T::TABLE, start, 1);
            Ok(created)
        }

        async fn save(&self, entity: &T) -> RepoResult<T> {
            let start = Instant::now();
            let conn = self.connect()?;
            let values: Vec<Value> = entity
                .column_values()
                .into_iter()
                .map(to_libsql_value)
                .collect();
            conn.execute(&self.upsert_sql, values)
                .await
                .map_err(RepoError::backend)?;

            let key = match entity.id() {
                Some(k) => k.into(),
                None => ParamValue::I64(conn.last_insert_rowid()),
            };
            let saved = self.fetch_by_pk(&conn, key).await?;
            trace_op("save", T::TABLE, start, 1);
            Ok(saved)
        }

        async fn find_first(&self, filter: &Filter) -> RepoResult<Option<T>> {
            let start = Instant::now();
            let stmt = sql::select_where::<T>(filter, -1, 1);
            let conn = self.connect()?;
            let mut rows = conn
                .query(&stmt, Self::bind(filter))
                .await
                .map_err(RepoError::backend)?;
            match rows.next().await.map_err(RepoError::backend)? {
                Some(row) => {
                    let entity = self.adapter.from_row(&row)?;
                    trace_op("find_first", T::TABLE, start, 1);
                    Ok(Some(entity))
                }
                None => {
                    trace_op("find_first", T::TABLE, start, 0);
                    Ok(None)
                }
            }
        }

        async fn find_many(&self, filter: &Filter, offset: i64, limit: i64) -> RepoResult<Vec<T>> {
            let start = Instant::now();
            let stmt = sql::select_where::<T>(filter, offset, limit);
            let conn = self.connect()?;
            let mut rows = conn
                .query(&stmt, Self::bind(filter))
                .await
                .map_err(RepoError::backend)?;

            let mut entities = Vec::new();
            while let Some(row) = rows.next().await.map_err(RepoError::backend)? {
                entities.push(self.adapter.from_row(&row)?);
            }
            trace_op("find_many", T::TABLE, start, entities.len());
            Ok(entities)
        }

        async fn count(&self, filter: &Filter) -> RepoResult<i64> {
            let start = Instant::now();
            let stmt = sql::count_where::<T>(filter);
            let conn = self.connect()?;
            let mut rows = conn
                .query(&stmt, Self::bind(filter))
                .await
                .map_err(RepoError::backend)?;
            let row = rows
                .next()
                .await
                .map_err(RepoError::backend)?
                .ok_or_else(|| {
                    RepoError::backend(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "COUNT returned no row",
                    ))
                })?;
            let total: i64 = row.get(0).map_err(RepoError::backend)?;
            trace_op("count", T::TABLE, start, total as usize);
            Ok(total)
        }

        async fn delete(&self, filter: &Filter) -> RepoResult<u64> {
            let start = Instant::now();
            let stmt = sql::delete_where::<T>(filter);
            let conn = self.connect()?;
            let affected = conn
                .execute(&stmt, Self::bind(filter))
                .await
                .map_err(RepoError::backend)?;
            trace_op("delete", T::TABLE, start, affected as usize);
            Ok(affected)
        }
    }
}

#[cfg(feature = "libsql-backend")]
pub use backend::LibsqlBackend;

#[cfg(all(test, feature = "libsql-backend"))]
mod tests {
    use super::backend::LibsqlBackend;
    use libsql::Database;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crudkit_core::{
        EntityMeta, Filter, ParamValue, RepoError, Repository, RowAdapter, StorageBackend,
    };

    #[derive(crudkit_macros::Entity, Clone, Debug, PartialEq)]
    #[entity(table = "users")]
    struct U {
        #[entity(id)]
        id: Option<i64>,
        email: String,
        active: bool,
    }

    struct A;
    impl RowAdapter<U> for A {
        type Row = libsql::Row;
        fn from_row(&self, row: &Self::Row) -> crudkit_core::RepoResult<U> {
            let id: i64 = row.get(0).map_err(crudkit_core::RepoError::mapping)?;
            let email: String = row.get(1).map_err(crudkit_core::RepoError::mapping)?;
            let active: i64 = row.get(2).map_err(crudkit_core::RepoError::mapping)?;
            Ok(U {
                id: Some(id),
                email,
                active: active != 0,
            })
        }
    }

    async fn setup_db(dir: &TempDir) -> Arc<Database> {
        let path = dir.path().join("crudkit_libsql_tests.sqlite3");
        #[allow(deprecated)]
        let db = Database::open(format!("file:{}?mode=rwc", path.display())).expect("open db");
        let conn = db.connect().expect("connect");
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY AUTOINCREMENT, email TEXT NOT NULL UNIQUE, active INTEGER NOT NULL);",
            (),
        )
        .await
        .expect("apply schema");
        Arc::new(db)
    }

    fn backend(db: Arc<Database>) -> LibsqlBackend<U, A> {
        LibsqlBackend::new(db, A).expect("backend")
    }

    #[tokio::test]
    async fn create_assigns_key_and_returns_stored_row() {
        let dir = TempDir::new().unwrap();
        let be = backend(setup_db(&dir).await);
        let created = be
            .create(&U {
                id: None,
                email: "a@x".into(),
                active: true,
            })
            .await
            .expect("create");
        assert!(created.id.is_some());
        assert_eq!(created.email, "a@x");
        assert!(created.active);
    }

    #[tokio::test]
    async fn save_upserts_by_primary_key() {
        let dir = TempDir::new().unwrap();
        let be = backend(setup_db(&dir).await);
        let created = be
            .create(&U {
                id: None,
                email: "b@x".into(),
                active: true,
            })
            .await
            .expect("create");

        let mut changed = created.clone();
        changed.active = false;
        let saved = be.save(&changed).await.expect("save");
        assert_eq!(saved.id, created.id);
        assert!(!saved.active);

        // Still a single row for that key.
        let total = be.count(&Filter::all()).await.expect("count");
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn find_first_distinguishes_not_found() {
        let dir = TempDir::new().unwrap();
        let be = backend(setup_db(&dir).await);
        let missing = be
            .find_first(&Filter::by_column(
                "email",
                ParamValue::String("nobody@x".into()),
            ))
            .await
            .expect("query");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_reports_rows_affected() {
        let dir = TempDir::new().unwrap();
        let be = backend(setup_db(&dir).await);
        let created = be
            .create(&U {
                id: None,
                email: "c@x".into(),
                active: true,
            })
            .await
            .expect("create");

        let affected = be
            .delete(&Filter::by_column(
                "id",
                ParamValue::I64(created.id.unwrap()),
            ))
            .await
            .expect("delete");
        assert_eq!(affected, 1);

        let affected = be
            .delete(&Filter::by_column("id", ParamValue::I64(999)))
            .await
            .expect("delete");
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn find_many_with_unknown_column_surfaces_query_error() {
        let dir = TempDir::new().unwrap();
        let be = backend(setup_db(&dir).await);
        let err = be
            .find_many(
                &Filter::by_column("does_not_exist", ParamValue::String("x".into())),
                -1,
                -1,
            )
            .await
            .expect_err("expected query to fail");
        assert!(matches!(err, RepoError::Backend { .. }));
    }

    // Adapter that intentionally requests a missing column index to force a mapping error
    struct BadAdapter;
    impl RowAdapter<U> for BadAdapter {
        type Row = libsql::Row;
        fn from_row(&self, row: &Self::Row) -> crudkit_core::RepoResult<U> {
            let _: String = row.get(999).map_err(crudkit_core::RepoError::mapping)?;
            unreachable!("should have failed before");
        }
    }

    #[tokio::test]
    async fn row_adapter_mapping_error_surfaces() {
        let dir = TempDir::new().unwrap();
        let db = setup_db(&dir).await;
        let good = backend(db.clone());
        let created = good
            .create(&U {
                id: None,
                email: "map@x".into(),
                active: true,
            })
            .await
            .expect("insert ok");

        let bad: LibsqlBackend<U, BadAdapter> =
            LibsqlBackend::new(db, BadAdapter).expect("backend");
        let err = bad
            .find_first(&Filter::by_column(
                "id",
                ParamValue::I64(created.id.unwrap()),
            ))
            .await
            .expect_err("expected mapping error");
        assert!(matches!(err, RepoError::Mapping { .. }));
    }

    // Adapter for the shared test entity, so the scenario functions from
    // tests_common run unchanged against this backend.
    struct CommonUserAdapter;
    impl RowAdapter<tests_common::User> for CommonUserAdapter {
        type Row = libsql::Row;
        fn from_row(&self, row: &Self::Row) -> crudkit_core::RepoResult<tests_common::User> {
            let id: i64 = row.get(0).map_err(crudkit_core::RepoError::mapping)?;
            let email: String = row.get(1).map_err(crudkit_core::RepoError::mapping)?;
            let active: i64 = row.get(2).map_err(crudkit_core::RepoError::mapping)?;
            Ok(tests_common::User {
                id: Some(id),
                email,
                active: active != 0,
            })
        }
    }

    async fn shared_repo(
        dir: &TempDir,
    ) -> Repository<tests_common::User, LibsqlBackend<tests_common::User, CommonUserAdapter>> {
        let db = setup_db(dir).await;
        let be = LibsqlBackend::new(db, CommonUserAdapter).expect("backend");
        Repository::new(be).expect("repo")
    }

    #[tokio::test]
    async fn shared_crud_roundtrip_scenario() {
        let dir = TempDir::new().unwrap();
        tests_common::crud_roundtrip_scenario(&shared_repo(&dir).await).await;
    }

    #[tokio::test]
    async fn shared_paginated_search_scenario() {
        let dir = TempDir::new().unwrap();
        tests_common::paginated_search_scenario(&shared_repo(&dir).await).await;
    }

    #[tokio::test]
    async fn shared_search_all_and_bulk_delete_scenario() {
        let dir = TempDir::new().unwrap();
        tests_common::search_all_scenario(&shared_repo(&dir).await).await;
    }

    #[tokio::test]
    async fn repository_reports_not_found_after_delete() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::<U, _>::new(backend(setup_db(&dir).await)).expect("repo");
        assert_eq!(repo.primary_key_column(), "id");

        let created = repo
            .create(&U {
                id: None,
                email: "cycle@x".into(),
                active: true,
            })
            .await
            .expect("create");
        let id = created.id.unwrap();

        repo.delete_by_id(ParamValue::I64(id)).await.expect("delete");
        let err = repo.get_by_id(ParamValue::I64(id)).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound));

        // Deleting again reports not-found instead of silent success.
        let err = repo.delete_by_id(ParamValue::I64(id)).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound));
    }

    #[test]
    fn entity_metadata_reaches_statement_assembly() {
        assert_eq!(U::TABLE, "users");
        let names: Vec<_> = U::COLUMNS.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["id", "email", "active"]);
        assert_eq!(
            crate::sql::select_where::<U>(&Filter::all(), -1, -1),
            "SELECT id, email, active FROM users"
        );
    }
}

#[cfg(all(test, feature = "libsql-backend", feature = "backend-adapters"))]
mod generated_adapter_tests {
    use super::backend::LibsqlBackend;
    use libsql::Database;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crudkit_core::{Filter, ParamValue, StorageBackend};

    // A skipped field sits between mapped ones, so the generated positional
    // mapping has to shift column indexes past it.
    #[derive(crudkit_macros::Entity, Clone, Debug, PartialEq)]
    #[entity(table = "articles")]
    struct Article {
        #[entity(id)]
        id: Option<i64>,
        title: String,
        #[entity(skip)]
        view_count: i64,
        published: bool,
    }

    async fn setup_db(dir: &TempDir) -> Arc<Database> {
        let path = dir.path().join("crudkit_generated_adapter_tests.sqlite3");
        #[allow(deprecated)]
        let db = Database::open(format!("file:{}?mode=rwc", path.display())).expect("open db");
        let conn = db.connect().expect("connect");
        conn.execute(
            "CREATE TABLE IF NOT EXISTS articles (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL, published INTEGER NOT NULL);",
            (),
        )
        .await
        .expect("apply schema");
        Arc::new(db)
    }

    #[tokio::test]
    async fn generated_adapter_maps_columns_and_defaults_skipped_fields() {
        let dir = TempDir::new().unwrap();
        let be: LibsqlBackend<Article, ArticleRowAdapter> =
            LibsqlBackend::new(setup_db(&dir).await, ArticleRowAdapter).expect("backend");

        let created = be
            .create(&Article {
                id: None,
                title: "Pagination in depth".into(),
                view_count: 9000,
                published: true,
            })
            .await
            .expect("create");
        assert!(created.id.is_some());
        assert_eq!(created.title, "Pagination in depth");
        assert!(created.published);
        // Skipped fields never round-trip; they come back as defaults.
        assert_eq!(created.view_count, 0);

        let found = be
            .find_first(&Filter::by_column("published", ParamValue::Bool(true)))
            .await
            .expect("query")
            .expect("row");
        assert_eq!(found, created);
    }
}
