use crudkit_macros::Entity;

// No field carries #[entity(id)]: the derive must reject the shape.
#[derive(Entity)]
struct NoKey {
    email: String,
    active: bool,
}

fn main() {}
