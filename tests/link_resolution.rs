//! End-to-end link resolution scenarios against the in-memory executor.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use doclink::{
    fetch_list, fetch_many, get_by_id, register_entity, BackReference, Entity, EntityId,
    EntityQuery, FetchPlan, FieldShape, FieldSpec, Handle, MemoryExecutor, OdmError, Reference,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Window {
    #[serde(rename = "_id")]
    id: String,
    panes: u32,
}

impl Entity for Window {
    fn entity_name() -> &'static str {
        "Window"
    }

    fn collection_name() -> &'static str {
        "windows"
    }

    fn id(&self) -> EntityId {
        EntityId::from(self.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Door {
    #[serde(rename = "_id")]
    id: String,
    window: Reference<Window>,
}

impl Entity for Door {
    fn entity_name() -> &'static str {
        "Door"
    }

    fn collection_name() -> &'static str {
        "doors"
    }

    fn id(&self) -> EntityId {
        EntityId::from(self.id.as_str())
    }

    fn relation_fields() -> Vec<FieldSpec> {
        vec![FieldSpec::new("window", FieldShape::direct("Window"))]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct House {
    #[serde(rename = "_id")]
    id: String,
    windows: Vec<Reference<Window>>,
}

impl Entity for House {
    fn entity_name() -> &'static str {
        "House"
    }

    fn collection_name() -> &'static str {
        "houses"
    }

    fn id(&self) -> EntityId {
        EntityId::from(self.id.as_str())
    }

    fn relation_fields() -> Vec<FieldSpec> {
        vec![FieldSpec::new("windows", FieldShape::list("Window"))]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    #[serde(rename = "_id")]
    id: String,
    label: String,
    owner: Reference<Container>,
}

impl Entity for Item {
    fn entity_name() -> &'static str {
        "Item"
    }

    fn collection_name() -> &'static str {
        "items"
    }

    fn id(&self) -> EntityId {
        EntityId::from(self.id.as_str())
    }

    fn relation_fields() -> Vec<FieldSpec> {
        vec![FieldSpec::new("owner", FieldShape::direct("Container"))]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Container {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    items: Vec<BackReference<Item>>,
}

impl Entity for Container {
    fn entity_name() -> &'static str {
        "Container"
    }

    fn collection_name() -> &'static str {
        "containers"
    }

    fn id(&self) -> EntityId {
        EntityId::from(self.id.as_str())
    }

    fn relation_fields() -> Vec<FieldSpec> {
        vec![FieldSpec::new(
            "items",
            FieldShape::back_list("Item", Some("owner")),
        )]
    }
}

fn register_all() {
    register_entity::<Window>().unwrap();
    register_entity::<Door>().unwrap();
    register_entity::<House>().unwrap();
    register_entity::<Item>().unwrap();
    register_entity::<Container>().unwrap();
}

fn window(id: &str, panes: u32) -> Window {
    Window {
        id: id.to_string(),
        panes,
    }
}

fn door_store() -> MemoryExecutor {
    let executor = MemoryExecutor::new();
    executor.insert_entity(&window("W1", 4)).unwrap();
    executor.insert_entity(&window("W2", 2)).unwrap();
    executor
        .insert_entity(&Door {
            id: "D1".to_string(),
            window: Reference::with_id("W1"),
        })
        .unwrap();
    executor
}

#[tokio::test]
async fn eager_fetch_materializes_direct_relation() {
    register_all();
    let executor = door_store();

    let door = EntityQuery::<Door>::new()
        .filter_eq("_id", "D1")
        .eager(7)
        .one(&executor)
        .await
        .unwrap()
        .unwrap();

    let resolved = door.window.get().expect("window should be materialized");
    assert_eq!(resolved, &window("W1", 4));
}

#[tokio::test]
async fn lazy_fetch_leaves_handle_and_fetch_resolves_it() {
    register_all();
    let executor = door_store();

    let door = EntityQuery::<Door>::new()
        .filter_eq("_id", "D1")
        .one(&executor)
        .await
        .unwrap()
        .unwrap();

    assert!(!door.window.is_resolved());
    assert_eq!(
        door.window.handle(),
        Some(&Handle::new("windows", "W1"))
    );

    let fetched = door.window.fetch(&executor, false).await.unwrap();
    assert_eq!(fetched.get(), Some(&window("W1", 4)));
}

#[tokio::test]
async fn eager_and_lazy_resolution_agree() {
    register_all();
    let executor = door_store();

    let eager = EntityQuery::<Door>::new()
        .filter_eq("_id", "D1")
        .eager(7)
        .one(&executor)
        .await
        .unwrap()
        .unwrap();

    let lazy = EntityQuery::<Door>::new()
        .filter_eq("_id", "D1")
        .one(&executor)
        .await
        .unwrap()
        .unwrap();
    let fetched = lazy.window.fetch(&executor, false).await.unwrap();

    assert_eq!(eager.window.get(), fetched.get());
}

#[tokio::test]
async fn both_join_forms_produce_identical_results() {
    register_all();
    let executor = door_store();

    // Engine 4 forces the pipeline-with-let form; engine 7 takes the plain
    // equality join. Results must be logically identical.
    let via_pipeline = EntityQuery::<Door>::new()
        .eager(4)
        .all(&executor)
        .await
        .unwrap();
    let via_equality = EntityQuery::<Door>::new()
        .eager(7)
        .all(&executor)
        .await
        .unwrap();

    assert_eq!(via_pipeline, via_equality);
}

#[tokio::test]
async fn missing_target_is_indistinguishable_from_unresolved() {
    register_all();
    let executor = door_store();
    executor.remove("windows", &EntityId::from("W1"));

    let original: Reference<Window> = Reference::with_id("W1");
    let fetched = original.fetch(&executor, false).await.unwrap();

    assert_eq!(fetched, original);
    assert!(!fetched.is_resolved());
}

#[tokio::test]
async fn fetch_many_preserves_input_order_under_shuffled_arrival() {
    register_all();
    let executor = door_store();
    executor.insert_entity(&window("W3", 6)).unwrap();

    // First lookup completes last, second completes first.
    executor.set_delays(vec![
        Duration::from_millis(30),
        Duration::from_millis(1),
        Duration::from_millis(10),
    ]);

    let refs: Vec<Reference<Window>> = vec![
        Reference::with_id("W1"),
        Reference::with_id("W2"),
        Reference::with_id("W3"),
    ];
    let resolved = fetch_many(&refs, &executor).await.unwrap();

    let ids: Vec<_> = resolved.iter().map(|r| r.id()).collect();
    assert_eq!(
        ids,
        vec![
            EntityId::from("W1"),
            EntityId::from("W2"),
            EntityId::from("W3")
        ]
    );
    assert!(resolved.iter().all(Reference::is_resolved));
    assert_eq!(executor.find_by_id_calls(), 3);
}

#[tokio::test]
async fn fetch_list_deduplicates_and_preserves_order() {
    register_all();
    let executor = door_store();

    // Three handles, two pointing at the same window.
    let refs: Vec<Reference<Window>> = vec![
        Reference::with_id("W1"),
        Reference::with_id("W2"),
        Reference::with_id("W1"),
    ];
    let resolved = fetch_list(refs, &executor, false).await.unwrap();

    assert_eq!(resolved.len(), 3);
    assert_eq!(resolved[0].get(), Some(&window("W1", 4)));
    assert_eq!(resolved[1].get(), Some(&window("W2", 2)));
    assert_eq!(resolved[2].id(), resolved[0].id());

    // One batched lookup covering the two distinct identities.
    assert_eq!(executor.batch_sizes(), vec![2]);
    assert_eq!(executor.find_by_id_calls(), 0);
}

#[tokio::test]
async fn fetch_list_is_idempotent() {
    register_all();
    let executor = door_store();

    let refs: Vec<Reference<Window>> =
        vec![Reference::with_id("W1"), Reference::with_id("W2")];
    let first = fetch_list(refs.clone(), &executor, false).await.unwrap();
    let second = fetch_list(refs, &executor, false).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(executor.batch_sizes(), vec![2, 2]);
}

#[tokio::test]
async fn fetch_list_passes_through_resolved_and_skips_round_trip() {
    register_all();
    let executor = door_store();

    let items: Vec<Reference<Window>> = vec![
        Reference::to(window("W1", 4)),
        Reference::to(window("W2", 2)),
    ];
    let out = fetch_list(items.clone(), &executor, false).await.unwrap();

    assert_eq!(out, items);
    assert!(executor.batch_sizes().is_empty());
}

#[tokio::test]
async fn fetch_list_rejects_mixed_collections() {
    register_all();
    let executor = door_store();

    let refs: Vec<Reference<Window>> = vec![
        Reference::with_id("W1"),
        Reference::Unresolved(Handle::new("doors", "D1")),
    ];
    let result = fetch_list(refs, &executor, false).await;

    match result {
        Err(OdmError::Configuration(msg)) => {
            assert!(msg.contains("windows"));
            assert!(msg.contains("doors"));
        }
        other => panic!("expected configuration error, got {:?}", other),
    }
}

#[tokio::test]
async fn house_with_duplicate_window_references() {
    register_all();
    let executor = door_store();

    let house = House {
        id: "H1".to_string(),
        windows: vec![
            Reference::with_id("W1"),
            Reference::with_id("W1"),
            Reference::with_id("W2"),
        ],
    };
    executor.insert_entity(&house).unwrap();

    let found = EntityQuery::<House>::new()
        .filter_eq("_id", "H1")
        .one(&executor)
        .await
        .unwrap()
        .unwrap();

    let resolved = fetch_list(found.windows, &executor, false).await.unwrap();

    // Work equivalent to two distinct lookups, three elements out, the two
    // duplicated ones equal by identity.
    assert_eq!(executor.batch_sizes(), vec![2]);
    assert_eq!(resolved.len(), 3);
    assert_eq!(resolved[0].id(), resolved[1].id());
    assert_eq!(resolved[0].get(), resolved[1].get());
    assert_eq!(resolved[2].get(), Some(&window("W2", 2)));
}

#[tokio::test]
async fn back_reference_symmetry() {
    register_all();
    let executor = MemoryExecutor::new();

    executor
        .insert_entity(&Container {
            id: "C1".to_string(),
            items: vec![],
        })
        .unwrap();
    executor
        .insert_entity(&Container {
            id: "C2".to_string(),
            items: vec![],
        })
        .unwrap();
    for (id, owner) in [("I1", "C1"), ("I2", "C2"), ("I3", "C1")] {
        executor
            .insert_entity(&Item {
                id: id.to_string(),
                label: format!("item {}", id),
                owner: Reference::with_id(owner),
            })
            .unwrap();
    }

    let container = get_by_id::<Container, _>(
        &executor,
        &EntityId::from("C1"),
        FetchPlan::Eager {
            engine_major_version: 7,
        },
        None,
    )
    .await
    .unwrap()
    .unwrap();

    // Exactly the items whose owner handle names C1.
    let ids: Vec<_> = container
        .items
        .iter()
        .map(|back| back.get().unwrap().id.as_str())
        .collect();
    assert_eq!(ids, vec!["I1", "I3"]);
}

#[tokio::test]
async fn lazy_back_reference_carries_only_the_collection() {
    register_all();
    let executor = MemoryExecutor::new();
    executor.insert(
        "containers",
        json!({"_id": "C1"}).as_object().unwrap().clone(),
    );

    let container = get_by_id::<Container, _>(
        &executor,
        &EntityId::from("C1"),
        FetchPlan::Lazy,
        None,
    )
    .await
    .unwrap()
    .unwrap();

    assert!(container.items.is_empty());

    let pending: BackReference<Item> = BackReference::Pending;
    assert_eq!(pending.collection(), "items");
}

#[tokio::test]
async fn expand_nested_fetch_runs_the_compiled_pipeline() {
    register_all();
    let executor = door_store();

    let door_ref: Reference<Door> = Reference::with_id("D1");
    let fetched = door_ref.fetch(&executor, true).await.unwrap();

    let door = fetched.get().expect("door should resolve");
    // The nested window came back materialized in the same round trip.
    assert_eq!(door.window.get(), Some(&window("W1", 4)));
}

#[tokio::test]
async fn eager_list_relation_materializes_in_place() {
    register_all();
    let executor = door_store();
    executor
        .insert_entity(&House {
            id: "H2".to_string(),
            windows: vec![Reference::with_id("W1"), Reference::with_id("W2")],
        })
        .unwrap();

    let house = EntityQuery::<House>::new()
        .filter_eq("_id", "H2")
        .eager(7)
        .one(&executor)
        .await
        .unwrap()
        .unwrap();

    let panes: Vec<_> = house
        .windows
        .iter()
        .map(|w| w.get().unwrap().panes)
        .collect();
    assert_eq!(panes, vec![4, 2]);
}

#[tokio::test]
async fn transport_faults_propagate_unchanged() {
    register_all();
    let executor = door_store();
    executor.fail_next_with("connection reset");

    let reference: Reference<Window> = Reference::with_id("W1");
    match reference.fetch(&executor, false).await {
        Err(OdmError::Transport(msg)) => assert_eq!(msg, "connection reset"),
        other => panic!("expected transport fault, got {:?}", other),
    }
}

#[tokio::test]
async fn get_by_id_honors_the_fetch_plan() {
    register_all();
    let executor = door_store();

    let lazy = get_by_id::<Door, _>(&executor, &EntityId::from("D1"), FetchPlan::Lazy, None)
        .await
        .unwrap()
        .unwrap();
    assert!(!lazy.window.is_resolved());

    let eager = get_by_id::<Door, _>(
        &executor,
        &EntityId::from("D1"),
        FetchPlan::Eager {
            engine_major_version: 7,
        },
        None,
    )
    .await
    .unwrap()
    .unwrap();
    assert!(eager.window.is_resolved());
}
