use crate::{
    clock::ManualClock,
    index::{IndexCatalog, IndexStore, MemoryIndexStore, RangeBound, ScanAnchor},
    types::{EntityId, IdGenerator, Scope},
    value::Value,
};
use std::sync::Arc;

fn scope() -> Scope {
    Scope::new("app-1")
}

fn mint(n: usize) -> Vec<EntityId> {
    let ids = IdGenerator::new(Arc::new(ManualClock::new(1_000)));
    (0..n).map(|_| ids.next("game")).collect()
}

fn seed_scores(store: &MemoryIndexStore, ids: &[EntityId]) {
    for (i, id) in ids.iter().enumerate() {
        let score = i64::try_from(i).unwrap();
        store
            .put(&scope(), "game", "score", &Value::Int(score), id, 1)
            .unwrap();
    }
}

#[test]
fn equality_scan_returns_ids_in_creation_order() {
    let store = MemoryIndexStore::new();
    let ids = mint(3);

    for id in &ids {
        store
            .put(&scope(), "game", "league", &Value::from("gold"), id, 1)
            .unwrap();
    }

    let page = store
        .scan_equals(
            &scope(),
            "game",
            "league",
            &Value::from("gold"),
            None,
            10,
            false,
        )
        .unwrap();

    let hit_ids: Vec<_> = page.hits.iter().map(|h| h.id.clone()).collect();
    assert_eq!(hit_ids, ids);
    assert!(page.exhausted);
}

#[test]
fn equality_scan_resumes_after_anchor() {
    let store = MemoryIndexStore::new();
    let ids = mint(5);

    for id in &ids {
        store
            .put(&scope(), "game", "league", &Value::from("gold"), id, 1)
            .unwrap();
    }

    let first = store
        .scan_equals(
            &scope(),
            "game",
            "league",
            &Value::from("gold"),
            None,
            2,
            false,
        )
        .unwrap();
    assert_eq!(first.hits.len(), 2);
    assert!(!first.exhausted);

    let anchor = first.last_anchor().cloned().unwrap();
    let rest = store
        .scan_equals(
            &scope(),
            "game",
            "league",
            &Value::from("gold"),
            Some(&anchor),
            10,
            false,
        )
        .unwrap();

    let hit_ids: Vec<_> = rest.hits.iter().map(|h| h.id.clone()).collect();
    assert_eq!(hit_ids, ids[2..]);
    assert!(rest.exhausted);
}

#[test]
fn range_scan_honors_bound_inclusivity() {
    let store = MemoryIndexStore::new();
    let ids = mint(5);
    seed_scores(&store, &ids);

    // 1 < score <= 3
    let page = store
        .scan_range(
            &scope(),
            "game",
            "score",
            Some(&RangeBound::exclusive(Value::Int(1))),
            Some(&RangeBound::inclusive(Value::Int(3))),
            None,
            10,
            false,
        )
        .unwrap();

    let values: Vec<_> = page.hits.iter().map(|h| h.anchor.value.clone()).collect();
    assert_eq!(values, vec![Value::Int(2), Value::Int(3)]);
}

#[test]
fn reversed_range_scan_walks_backwards() {
    let store = MemoryIndexStore::new();
    let ids = mint(4);
    seed_scores(&store, &ids);

    let page = store
        .scan_range(&scope(), "game", "score", None, None, None, 10, true)
        .unwrap();

    let values: Vec<_> = page.hits.iter().map(|h| h.anchor.value.clone()).collect();
    assert_eq!(
        values,
        vec![Value::Int(3), Value::Int(2), Value::Int(1), Value::Int(0)]
    );
}

#[test]
fn retired_rows_disappear_from_scans() {
    let store = MemoryIndexStore::new();
    let ids = mint(3);
    seed_scores(&store, &ids);

    store
        .remove(&scope(), "game", "score", &Value::Int(1), &ids[1], 2)
        .unwrap();

    let page = store
        .scan_range(&scope(), "game", "score", None, None, None, 10, false)
        .unwrap();

    let hit_ids: Vec<_> = page.hits.iter().map(|h| h.id.clone()).collect();
    assert_eq!(hit_ids, vec![ids[0].clone(), ids[2].clone()]);
}

#[test]
fn stale_remove_is_a_no_op() {
    let store = MemoryIndexStore::new();
    let ids = mint(1);

    store
        .put(&scope(), "game", "score", &Value::Int(9), &ids[0], 5)
        .unwrap();
    // an older writer's retire must not clobber the live row
    store
        .remove(&scope(), "game", "score", &Value::Int(9), &ids[0], 3)
        .unwrap();

    let page = store
        .scan_equals(&scope(), "game", "score", &Value::Int(9), None, 10, false)
        .unwrap();
    assert_eq!(page.hits.len(), 1);
}

#[test]
fn contains_scan_matches_tokens_case_insensitively() {
    let store = MemoryIndexStore::new();
    let ids = mint(2);

    store
        .put(
            &scope(),
            "game",
            "tags",
            &Value::from("Hot, Space Invaders, Classic"),
            &ids[0],
            1,
        )
        .unwrap();
    store
        .put(&scope(), "game", "tags", &Value::from("cold war"), &ids[1], 1)
        .unwrap();

    let page = store
        .scan_contains(&scope(), "game", "tags", "Invaders", None, 10, false)
        .unwrap();
    let hit_ids: Vec<_> = page.hits.iter().map(|h| h.id.clone()).collect();
    assert_eq!(hit_ids, vec![ids[0].clone()]);

    let none = store
        .scan_contains(&scope(), "game", "tags", "invader", None, 10, false)
        .unwrap();
    assert!(none.hits.is_empty());
    assert!(none.exhausted);
}

#[test]
fn scopes_are_fully_isolated() {
    let store = MemoryIndexStore::new();
    let ids = mint(1);

    store
        .put(&scope(), "game", "score", &Value::Int(1), &ids[0], 1)
        .unwrap();

    let other = Scope::new("app-2");
    let page = store
        .scan_equals(&other, "game", "score", &Value::Int(1), None, 10, false)
        .unwrap();
    assert!(page.hits.is_empty());
}

#[test]
fn anchors_survive_interleaved_deletes() {
    let store = MemoryIndexStore::new();
    let ids = mint(6);

    for id in &ids {
        store
            .put(&scope(), "game", "league", &Value::from("gold"), id, 1)
            .unwrap();
    }

    let first = store
        .scan_equals(
            &scope(),
            "game",
            "league",
            &Value::from("gold"),
            None,
            3,
            false,
        )
        .unwrap();
    let anchor: ScanAnchor = first.last_anchor().cloned().unwrap();

    // retire the anchor row itself plus the next row
    store
        .remove(&scope(), "game", "league", &Value::from("gold"), &ids[2], 2)
        .unwrap();
    store
        .remove(&scope(), "game", "league", &Value::from("gold"), &ids[3], 2)
        .unwrap();

    let rest = store
        .scan_equals(
            &scope(),
            "game",
            "league",
            &Value::from("gold"),
            Some(&anchor),
            10,
            false,
        )
        .unwrap();

    let hit_ids: Vec<_> = rest.hits.iter().map(|h| h.id.clone()).collect();
    assert_eq!(hit_ids, vec![ids[4].clone(), ids[5].clone()]);
}

#[test]
fn catalog_rejects_opted_out_and_empty_properties() {
    let catalog = IndexCatalog::new();
    assert!(catalog.ensure_indexed("user", "username").is_ok());

    catalog.mark_unindexed("user", "bio");
    let err = catalog.ensure_indexed("user", "bio").unwrap_err();
    assert_eq!(err.entity_type, "user");
    assert_eq!(err.property, "bio");

    // the malformed-sort case: an empty property name is never indexed
    let err = catalog.ensure_indexed("user", "").unwrap_err();
    assert_eq!(err.property, "");

    // the opt-out is per entity type
    assert!(catalog.ensure_indexed("game", "bio").is_ok());
}
