use crudkit_macros::Entity;

#[derive(Entity)]
struct Sneaky {
    #[entity(id)]
    id: i64,
    #[entity(column = "email; DROP TABLE users")]
    email: String,
}

fn main() {}
