use crudkit_macros::Entity;

#[derive(Entity)]
struct Odd {
    #[entity(id)]
    id: i64,
    tags: Vec<String>,
}

fn main() {}
