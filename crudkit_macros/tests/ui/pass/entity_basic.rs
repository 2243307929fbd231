use crudkit_core::{EntityMeta, Identifiable, Persistable};
use crudkit_macros::Entity;

#[derive(Entity)]
struct User {
    #[entity(id)]
    id: i64,
    email: String,
    active: bool,
}

fn main() {
    assert_eq!(User::TABLE, "users");
    assert_eq!(User::COLUMNS.len(), 3);
    assert!(User::COLUMNS[0].primary_key);
    assert_eq!(User::ID_COLUMN, "id");
    assert_eq!(User::INSERT_COLUMNS, &["email", "active"]);

    let u = User {
        id: 7,
        email: "a@x".to_string(),
        active: true,
    };
    assert_eq!(u.id(), Some(7));
    assert_eq!(u.insert_values().len(), 2);
    assert_eq!(u.column_values().len(), 3);
}
