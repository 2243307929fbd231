//! Shared fixtures for the workspace's own tests: a small `User` entity, an
//! in-memory [`StorageBackend`] and scenario functions that exercise a
//! repository end to end. Backend crates run the same scenarios against their
//! real storage.

use std::sync::Mutex;

use async_trait::async_trait;
use crudkit_core::{
    Filter, PageRequest, ParamValue, RepoError, RepoResult, Repository, StorageBackend,
};
use crudkit_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "users")]
pub struct User {
    #[entity(id)]
    pub id: Option<i64>,
    pub email: String,
    pub active: bool,
}

impl User {
    pub fn new(email: impl Into<String>, active: bool) -> Self {
        User {
            id: None,
            email: email.into(),
            active,
        }
    }
}

/// In-memory backend for `User`. Understands the filter clauses the facade
/// and the scenarios actually emit; anything else is a backend error, which
/// doubles as a test for error propagation.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    rows: Vec<User>,
    next_id: i64,
}

fn unsupported(clause: &str) -> RepoError {
    RepoError::backend(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("unsupported filter clause: {clause:?}"),
    ))
}

// Checked before touching any rows, so an unsupported clause errors even on
// an empty store.
fn validate(filter: &Filter) -> RepoResult<()> {
    if filter.is_empty() {
        return Ok(());
    }
    let param = filter
        .params()
        .first()
        .ok_or_else(|| unsupported(filter.clause()))?;
    match (filter.clause(), param) {
        ("id = ?", ParamValue::I64(_))
        | ("email = ?", ParamValue::String(_))
        | ("active = ?", ParamValue::Bool(_)) => Ok(()),
        (clause, _) => Err(unsupported(clause)),
    }
}

fn matches(user: &User, filter: &Filter) -> bool {
    if filter.is_empty() {
        return true;
    }
    match (filter.clause(), filter.params().first()) {
        ("id = ?", Some(ParamValue::I64(id))) => user.id == Some(*id),
        ("email = ?", Some(ParamValue::String(email))) => &user.email == email,
        ("active = ?", Some(ParamValue::Bool(active))) => user.active == *active,
        _ => false,
    }
}

fn window(rows: Vec<User>, offset: i64, limit: i64) -> Vec<User> {
    let skip = if offset > 0 { offset as usize } else { 0 };
    let take = if limit >= 0 { limit as usize } else { usize::MAX };
    rows.into_iter().skip(skip).take(take).collect()
}

#[async_trait]
impl StorageBackend<User> for MemoryBackend {
    async fn create(&self, entity: &User) -> RepoResult<User> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let mut stored = entity.clone();
        stored.id = Some(state.next_id);
        state.rows.push(stored.clone());
        Ok(stored)
    }

    async fn save(&self, entity: &User) -> RepoResult<User> {
        let mut state = self.state.lock().unwrap();
        match entity.id {
            Some(id) => {
                if let Some(existing) = state.rows.iter_mut().find(|u| u.id == Some(id)) {
                    *existing = entity.clone();
                } else {
                    state.rows.push(entity.clone());
                    if id > state.next_id {
                        state.next_id = id;
                    }
                }
                Ok(entity.clone())
            }
            None => {
                state.next_id += 1;
                let mut stored = entity.clone();
                stored.id = Some(state.next_id);
                state.rows.push(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn find_first(&self, filter: &Filter) -> RepoResult<Option<User>> {
        validate(filter)?;
        let state = self.state.lock().unwrap();
        Ok(state.rows.iter().find(|u| matches(u, filter)).cloned())
    }

    async fn find_many(&self, filter: &Filter, offset: i64, limit: i64) -> RepoResult<Vec<User>> {
        validate(filter)?;
        let state = self.state.lock().unwrap();
        let hits: Vec<User> = state
            .rows
            .iter()
            .filter(|u| matches(u, filter))
            .cloned()
            .collect();
        Ok(window(hits, offset, limit))
    }

    async fn count(&self, filter: &Filter) -> RepoResult<i64> {
        validate(filter)?;
        let state = self.state.lock().unwrap();
        Ok(state.rows.iter().filter(|u| matches(u, filter)).count() as i64)
    }

    async fn delete(&self, filter: &Filter) -> RepoResult<u64> {
        validate(filter)?;
        let mut state = self.state.lock().unwrap();
        let before = state.rows.len();
        state.rows.retain(|u| !matches(u, filter));
        Ok((before - state.rows.len()) as u64)
    }
}

/// Create, fetch, update and delete one entity through the repository facade.
pub async fn crud_roundtrip_scenario<B>(repo: &Repository<User, B>)
where
    B: StorageBackend<User> + Send + Sync,
{
    let created = repo
        .create(&User::new("roundtrip@example.com", true))
        .await
        .expect("create should succeed");
    let id = created.id.expect("create should assign a key");

    let fetched = repo
        .get_by_id(ParamValue::I64(id))
        .await
        .expect("get_by_id should find the created row");
    assert_eq!(fetched, created);

    let by_email = repo
        .get(&Filter::by_column(
            "email",
            ParamValue::String("roundtrip@example.com".into()),
        ))
        .await
        .expect("get should find the row by email");
    assert_eq!(by_email.id, Some(id));

    let mut changed = fetched;
    changed.active = false;
    let updated = repo.update(&changed).await.expect("update should succeed");
    assert!(!updated.active);

    repo.delete_by_id(ParamValue::I64(id))
        .await
        .expect("delete_by_id should succeed");
    let err = repo.get_by_id(ParamValue::I64(id)).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
}

/// Seed 100 users and walk the paginated search from both ends.
pub async fn paginated_search_scenario<B>(repo: &Repository<User, B>)
where
    B: StorageBackend<User> + Send + Sync,
{
    for i in 0..100 {
        repo.create(&User::new(format!("user{i:03}@example.com"), i % 2 == 0))
            .await
            .expect("seeding should succeed");
    }

    let first = repo
        .search(&PageRequest::new(1, 10), &Filter::all())
        .await
        .expect("first page");
    assert_eq!(first.entities.len(), 10);
    assert_eq!(first.total_count, 100);
    assert_eq!(first.total_pages, 10);
    assert_eq!(first.page, 1);
    assert!(first.has_next_page);
    assert!(!first.has_prev_page);

    let middle = repo
        .search(&PageRequest::new(5, 10), &Filter::all())
        .await
        .expect("middle page");
    assert!(middle.has_next_page);
    assert!(middle.has_prev_page);

    let last = repo
        .search(&PageRequest::new(10, 10), &Filter::all())
        .await
        .expect("last page");
    assert_eq!(last.entities.len(), 10);
    assert!(!last.has_next_page);
    assert!(last.has_prev_page);

    let beyond = repo
        .search(&PageRequest::new(11, 10), &Filter::all())
        .await
        .expect("page past the end");
    assert!(beyond.is_empty());
    assert_eq!(beyond.total_count, 100);

    let actives = repo
        .search(
            &PageRequest::new(1, 10),
            &Filter::by_column("active", ParamValue::Bool(true)),
        )
        .await
        .expect("filtered page");
    assert_eq!(actives.total_count, 50);
    assert_eq!(actives.total_pages, 5);
    assert!(actives.entities.iter().all(|u| u.active));
}

/// `search_all` returns every matching row regardless of volume.
pub async fn search_all_scenario<B>(repo: &Repository<User, B>)
where
    B: StorageBackend<User> + Send + Sync,
{
    for i in 0..25 {
        repo.create(&User::new(format!("bulk{i:02}@example.com"), true))
            .await
            .expect("seeding should succeed");
    }
    let everyone = repo.search_all(&Filter::all()).await.expect("search_all");
    assert_eq!(everyone.len(), 25);

    let affected = repo
        .delete(&Filter::by_column("active", ParamValue::Bool(true)))
        .await
        .expect("bulk delete");
    assert_eq!(affected, 25);
    assert!(repo.search_all(&Filter::all()).await.unwrap().is_empty());
}
