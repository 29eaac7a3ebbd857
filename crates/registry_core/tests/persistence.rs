use registry_core::session::{self, SessionUser};
use registry_core::{DraftSlot, EntityKind, KeyValueStore, MemoryStore};
use serde::{Deserialize, Serialize};

fn init_logging() {
    registry_logging::initialize_for_tests();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EmployeeDraft {
    first_name: String,
    last_name: String,
    email: String,
    department_id: Option<String>,
}

#[test]
fn drafts_and_session_share_one_store_without_interference() {
    init_logging();
    let store = MemoryStore::new();
    let draft = DraftSlot::for_entity(EntityKind::Employee);
    let value = EmployeeDraft {
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        email: "grace@example.com".into(),
        department_id: Some("4".into()),
    };

    draft.save(&store, &value);
    session::sign_in(
        &store,
        "token",
        &SessionUser {
            email: "admin@example.com".into(),
            name: "Admin".into(),
        },
    );
    assert_eq!(store.len(), 3);

    session::logout(&store);
    assert_eq!(draft.load::<EmployeeDraft>(&store), Some(value));

    draft.clear(&store);
    assert!(store.is_empty());
}

#[test]
fn store_trait_is_object_safe_and_last_writer_wins() {
    init_logging();
    let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
    store.set("k", "one");
    store.set("k", "two");
    assert_eq!(store.get("k").as_deref(), Some("two"));
    store.remove("k");
    store.remove("k");
    assert_eq!(store.get("k"), None);
}
