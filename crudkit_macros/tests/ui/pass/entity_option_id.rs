use crudkit_core::Identifiable;
use crudkit_macros::Entity;

#[derive(Entity)]
struct Note {
    #[entity(id)]
    id: Option<i64>,
    body: String,
}

fn main() {
    let fresh = Note {
        id: None,
        body: "draft".to_string(),
    };
    assert_eq!(fresh.id(), None);

    let stored = Note {
        id: Some(3),
        body: "saved".to_string(),
    };
    assert_eq!(stored.id(), Some(3));
}
