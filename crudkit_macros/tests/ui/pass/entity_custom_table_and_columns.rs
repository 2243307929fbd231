use crudkit_core::EntityMeta;
use crudkit_macros::Entity;

#[derive(Entity)]
#[entity(table = "people")]
struct Person {
    #[entity(id)]
    id: i64,
    #[entity(column = "email_address")]
    email: String,
    #[entity(column = "full_name")]
    name: String,
}

fn main() {
    assert_eq!(Person::TABLE, "people");
    let names: Vec<_> = Person::COLUMNS.iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["id", "email_address", "full_name"]);
}
