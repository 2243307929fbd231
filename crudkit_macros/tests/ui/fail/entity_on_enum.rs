use crudkit_macros::Entity;

#[derive(Entity)]
enum Shape {
    Circle,
    Square,
}

fn main() {}
