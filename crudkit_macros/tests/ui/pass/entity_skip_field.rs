use crudkit_core::{EntityMeta, Persistable};
use crudkit_macros::Entity;

#[derive(Entity)]
struct Cached {
    #[entity(id)]
    id: i64,
    payload: String,
    #[entity(skip)]
    checksum: u64,
}

fn main() {
    // Skipped fields are invisible to the schema metadata and writes.
    let names: Vec<_> = Cached::COLUMNS.iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["id", "payload"]);
    assert_eq!(Cached::INSERT_COLUMNS, &["payload"]);
}
