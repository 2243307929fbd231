use crudkit_macros::Entity;

// Composite keys are unsupported: two #[entity(id)] fields must be rejected.
#[derive(Entity)]
struct TwoKeys {
    #[entity(id)]
    tenant_id: i64,
    #[entity(id)]
    user_id: i64,
}

fn main() {}
