use crate::{
    error::EngineError,
    query::{FilterExpr, Query},
    response::ResultRow,
    test_fixtures::Harness,
    types::EntityId,
    value::Value,
};
use proptest::prelude::*;

fn seed_games(h: &Harness) -> (EntityId, EntityId) {
    let one = h.create(
        "games",
        &[
            ("title", Value::from("Random 1")),
            ("keywords", Value::from("blah,test,game")),
        ],
    );
    let two = h.create(
        "games",
        &[
            ("title", Value::from("Random 2")),
            ("keywords", Value::from("random,test,game")),
        ],
    );

    (one.id().clone(), two.id().clone())
}

#[test]
fn or_query_unions_branches_in_creation_order() {
    let h = Harness::new();
    let (one, two) = seed_games(&h);

    let query = Query::from_ql(
        "select * where keywords contains 'random' or keywords contains 'test'",
    )
    .unwrap();
    let results = h.search("games", &query);

    let ids: Vec<_> = results.entities().map(|e| e.id().clone()).collect();
    assert_eq!(ids, vec![one, two]);
    assert!(results.cursor().is_none());
}

#[test]
fn and_query_intersects_branches() {
    let h = Harness::new();
    let (_, two) = seed_games(&h);

    let query = Query::from_ql(
        "select * where keywords contains 'random' and keywords contains 'test'",
    )
    .unwrap();
    let results = h.search("games", &query);

    let ids: Vec<_> = results.entities().map(|e| e.id().clone()).collect();
    assert_eq!(ids, vec![two]);
}

#[test]
fn not_query_complements_within_the_collection() {
    let h = Harness::new();
    let (one, _) = seed_games(&h);

    let query = Query::from_ql("select * where not keywords contains 'random'").unwrap();
    let results = h.search("games", &query);

    let ids: Vec<_> = results.entities().map(|e| e.id().clone()).collect();
    assert_eq!(ids, vec![one]);
}

#[test]
fn equality_query_via_ql_and_builder_agree() {
    let h = Harness::new();
    for color in ["tabby", "black", "tabby", "orange"] {
        h.create("cats", &[("color", Value::from(color))]);
    }

    let from_ql = h.search("cats", &Query::from_ql("where color = 'tabby'").unwrap());
    let from_builder = h.search("cats", &Query::new().add_equality_filter("color", "tabby"));

    let ql_ids: Vec<_> = from_ql.entities().map(|e| e.id().clone()).collect();
    let builder_ids: Vec<_> = from_builder.entities().map(|e| e.id().clone()).collect();
    assert_eq!(ql_ids.len(), 2);
    assert_eq!(ql_ids, builder_ids);
}

#[test]
fn range_query_with_mixed_bounds() {
    let h = Harness::new();
    let mut made = Vec::new();
    for score in 0..6i64 {
        made.push(h.create("games", &[("score", Value::Int(score))]));
    }

    let results = h.search(
        "games",
        &Query::from_ql("where score >= 2 and score < 5").unwrap(),
    );
    let scores: Vec<_> = results
        .entities()
        .filter_map(|e| e.property("score").and_then(Value::as_int))
        .collect();
    assert_eq!(scores, vec![2, 3, 4]);
}

#[test]
fn paging_after_delete_skips_removed_rows() {
    let h = Harness::new();
    let entities: Vec<_> = (0..20)
        .map(|i| h.create("pages", &[("index", Value::Int(i))]))
        .collect();

    for entity in &entities[5..10] {
        h.delete(entity);
    }

    let query = Query::new().set_limit(10);
    let first = h.search("pages", &query);
    assert_eq!(first.len(), 10);
    let first_ids: Vec<_> = first.entities().map(|e| e.id().clone()).collect();
    let expected_first: Vec<_> = entities[..5]
        .iter()
        .chain(&entities[10..15])
        .map(|e| e.id().clone())
        .collect();
    assert_eq!(first_ids, expected_first);

    let cursor = first.cursor().expect("more rows remain").to_string();
    let second = h.search("pages", &query.clone().set_cursor(cursor));
    assert_eq!(second.len(), 5);
    let second_ids: Vec<_> = second.entities().map(|e| e.id().clone()).collect();
    let expected_second: Vec<_> = entities[15..].iter().map(|e| e.id().clone()).collect();
    assert_eq!(second_ids, expected_second);
    assert!(second.cursor().is_none());
}

#[test]
fn equality_paging_resumes_across_interleaved_deletes() {
    let h = Harness::new();
    let gold: Vec<_> = (0..8)
        .map(|_| h.create("games", &[("league", Value::from("gold"))]))
        .collect();
    h.create("games", &[("league", Value::from("silver"))]);

    let query = Query::new()
        .add_equality_filter("league", "gold")
        .set_limit(3);
    let first = h.search("games", &query);
    assert_eq!(first.len(), 3);
    let cursor = first.cursor().expect("more rows").to_string();

    // delete one already-served row and one not yet served
    h.delete(&gold[1]);
    h.delete(&gold[4]);

    let mut served: Vec<_> = first.entities().map(|e| e.id().clone()).collect();
    let rest = h.drain("games", &query.clone().set_cursor(cursor));
    served.extend(rest);

    let expected: Vec<_> = gold
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 4)
        .map(|(_, e)| e.id().clone())
        .collect();
    assert_eq!(served, expected);
}

#[test]
fn unfiltered_query_returns_creation_order_and_reversed_flips_it() {
    let h = Harness::new();
    let made: Vec<_> = (0..5)
        .map(|i| h.create("items", &[("n", Value::Int(i))]))
        .collect();
    let forward: Vec<_> = made.iter().map(|e| e.id().clone()).collect();

    let results = h.search("items", &Query::new());
    let ids: Vec<_> = results.entities().map(|e| e.id().clone()).collect();
    assert_eq!(ids, forward);

    let results = h.search("items", &Query::new().set_reversed(true));
    let ids: Vec<_> = results.entities().map(|e| e.id().clone()).collect();
    let mut backward = forward;
    backward.reverse();
    assert_eq!(ids, backward);
}

#[test]
fn reversed_query_on_empty_collection_is_empty_not_an_error() {
    let h = Harness::new();
    let results = h.search("ghosts", &Query::new().set_reversed(true));

    assert!(results.is_empty());
    assert!(results.cursor().is_none());
}

#[test]
fn order_by_sorts_with_id_tiebreak_and_nulls_first() {
    let h = Harness::new();
    let a = h.create("users", &[("age", Value::Int(30))]);
    let b = h.create("users", &[("name", Value::from("no-age"))]);
    let c = h.create("users", &[("age", Value::Int(20))]);
    let d = h.create("users", &[("age", Value::Int(30))]);

    let results = h.search("users", &Query::from_ql("order by age").unwrap());
    let ids: Vec<_> = results.entities().map(|e| e.id().clone()).collect();

    // missing sort key sorts first; equal keys fall back to creation order
    assert_eq!(
        ids,
        vec![
            b.id().clone(),
            c.id().clone(),
            a.id().clone(),
            d.id().clone()
        ]
    );
}

#[test]
fn order_by_created_desc_pages_consistently() {
    let h = Harness::new();
    let made: Vec<_> = (0..7)
        .map(|i| h.create("posts", &[("n", Value::Int(i))]))
        .collect();

    let query = Query::from_ql("order by created desc").unwrap().set_limit(3);
    let ids = h.drain("posts", &query);

    let mut expected: Vec<_> = made.iter().map(|e| e.id().clone()).collect();
    expected.reverse();
    assert_eq!(ids, expected);
}

#[test]
fn bad_order_by_reports_the_entity_type_with_empty_property() {
    let h = Harness::new();
    h.create("users", &[("username", Value::from("bob"))]);

    let query = Query::from_ql("select * where username = 'bob' order by asc").unwrap();
    let err = h
        .engine
        .search_collection(&h.scope, &h.app, "users", &query)
        .unwrap_err();

    let EngineError::NotIndexed(inner) = err else {
        panic!("expected NotIndexed, got {err:?}");
    };
    assert_eq!(inner.entity_type, "user");
    assert_eq!(inner.property, "");
}

#[test]
fn unindexed_property_fails_the_whole_query() {
    let h = Harness::new();
    h.create("users", &[("bio", Value::from("hello"))]);
    h.engine.catalog().mark_unindexed("user", "bio");

    let err = h
        .engine
        .search_collection(
            &h.scope,
            &h.app,
            "users",
            &Query::from_ql("where bio = 'hello'").unwrap(),
        )
        .unwrap_err();

    let EngineError::NotIndexed(inner) = err else {
        panic!("expected NotIndexed");
    };
    assert_eq!(inner.property, "bio");
}

#[test]
fn select_terms_project_in_declaration_order_with_nulls() {
    let h = Harness::new();
    h.create(
        "users",
        &[
            ("username", Value::from("edanuff")),
            ("email", Value::from("ed@example.com")),
        ],
    );

    let results = h.search(
        "users",
        &Query::from_ql("select username, email, missing where username = 'edanuff'").unwrap(),
    );

    assert_eq!(results.len(), 1);
    let ResultRow::Projected(map) = &results.rows()[0] else {
        panic!("expected projected row");
    };
    let names: Vec<&str> = map.iter().map(|(k, _)| k).collect();
    assert_eq!(names, vec!["username", "email", "missing"]);
    assert_eq!(map.get("username"), Some(&Value::from("edanuff")));
    assert_eq!(map.get("missing"), Some(&Value::Null));
}

#[test]
fn redefined_terms_rename_projected_properties() {
    let h = Harness::new();
    h.create(
        "users",
        &[
            ("username", Value::from("edanuff")),
            ("email", Value::from("ed@example.com")),
        ],
    );

    let results = h.search(
        "users",
        &Query::from_ql("select {name: username, addr: email} where username = 'edanuff'")
            .unwrap(),
    );

    let ResultRow::Projected(map) = &results.rows()[0] else {
        panic!("expected projected row");
    };
    assert_eq!(map.get("name"), Some(&Value::from("edanuff")));
    assert_eq!(map.get("addr"), Some(&Value::from("ed@example.com")));
    assert_eq!(map.get("username"), None);
}

#[test]
fn subproperty_queries_traverse_nested_maps() {
    let h = Harness::new();
    let activity = h.create(
        "activities",
        &[
            ("verb", Value::from("post")),
            (
                "actor",
                Value::Map(vec![
                    ("displayName".into(), Value::from("Ed Anuff")),
                    ("objectType".into(), Value::from("person")),
                ]),
            ),
        ],
    );
    h.create(
        "activities",
        &[
            ("verb", Value::from("post")),
            (
                "actor",
                Value::Map(vec![("displayName".into(), Value::from("Someone Else"))]),
            ),
        ],
    );

    let results = h.search(
        "activities",
        &Query::from_ql("where actor.displayName = 'Ed Anuff'").unwrap(),
    );
    let ids: Vec<_> = results.entities().map(|e| e.id().clone()).collect();
    assert_eq!(ids, vec![activity.id().clone()]);
}

#[test]
fn array_properties_match_any_element() {
    let h = Harness::new();
    let cat = h.create(
        "cats",
        &[(
            "colors",
            Value::List(vec![Value::from("black"), Value::from("white")]),
        )],
    );
    h.create("cats", &[("colors", Value::List(vec![Value::from("orange")]))]);

    let results = h.search("cats", &Query::from_ql("where colors = 'white'").unwrap());
    let ids: Vec<_> = results.entities().map(|e| e.id().clone()).collect();
    assert_eq!(ids, vec![cat.id().clone()]);
}

#[test]
fn contains_matches_tokens_from_list_elements() {
    let h = Harness::new();
    let game = h.create(
        "games",
        &[(
            "tags",
            Value::List(vec![Value::from("val1"), Value::from("val3 with spaces")]),
        )],
    );

    let results = h.search("games", &Query::from_ql("where tags contains 'spaces'").unwrap());
    let ids: Vec<_> = results.entities().map(|e| e.id().clone()).collect();
    assert_eq!(ids, vec![game.id().clone()]);
}

#[test]
fn connection_search_filters_and_orders_targets() {
    let h = Harness::new();
    let me = h.create("users", &[("username", Value::from("me"))]);
    let liked: Vec<_> = (0..4)
        .map(|i| h.create("restaurants", &[("stars", Value::Int(i))]))
        .collect();
    for target in &liked {
        h.connect(&me, "likes", target);
    }
    // an unconnected restaurant never shows up
    h.create("restaurants", &[("stars", Value::Int(9))]);

    let results = h
        .engine
        .search_connected_entities(
            &h.scope,
            me.id(),
            "likes",
            &Query::from_ql("where stars >= 2").unwrap(),
        )
        .unwrap();

    let ids: Vec<_> = results.entities().map(|e| e.id().clone()).collect();
    assert_eq!(
        ids,
        vec![liked[2].id().clone(), liked[3].id().clone()]
    );
}

#[test]
fn connection_search_pages_with_cursors() {
    let h = Harness::new();
    let me = h.create("users", &[("username", Value::from("me"))]);
    let targets: Vec<_> = (0..5)
        .map(|_| h.create("things", &[]))
        .collect();
    for target in &targets {
        h.connect(&me, "owns", target);
    }

    let query = Query::new().set_limit(2);
    let mut collected = Vec::new();
    let mut current = query.clone();
    loop {
        let results = h
            .engine
            .search_connected_entities(&h.scope, me.id(), "owns", &current)
            .unwrap();
        collected.extend(results.entities().map(|e| e.id().clone()));
        match results.cursor() {
            Some(cursor) => current = query.clone().set_cursor(cursor),
            None => break,
        }
    }

    let expected: Vec<_> = targets.iter().map(|e| e.id().clone()).collect();
    assert_eq!(collected, expected);
}

#[test]
fn bad_order_by_fails_connection_searches_too() {
    let h = Harness::new();
    let me = h.create("users", &[("username", Value::from("me"))]);
    let other = h.create("users", &[("username", Value::from("other"))]);
    h.connect(&me, "likes", &other);

    let query = Query::from_ql("order by asc").unwrap();
    let err = h
        .engine
        .search_connected_entities(&h.scope, me.id(), "likes", &query)
        .unwrap_err();

    let EngineError::NotIndexed(inner) = err else {
        panic!("expected not-indexed error");
    };
    assert_eq!(inner.entity_type, "like");
    assert_eq!(inner.property, "");
}

#[test]
fn unique_conflicts_show_up_in_engine_counters() {
    let h = Harness::new();
    let holder = h.ids.next("user");
    let rival = h.ids.next("user");

    h.engine
        .unique()
        .write(&h.scope, "user", "username", Value::from("ed"), holder, 1)
        .unwrap();
    assert!(
        h.engine
            .unique()
            .write(&h.scope, "user", "username", Value::from("ed"), rival, 1)
            .is_err()
    );

    assert_eq!(h.engine.counters().unique_conflicts, 1);
}

#[test]
fn cursor_minted_for_one_query_is_rejected_by_another() {
    let h = Harness::new();
    for i in 0..5 {
        h.create("items", &[("n", Value::Int(i))]);
    }

    let query = Query::from_ql("where n >= 0").unwrap().set_limit(2);
    let first = h.search("items", &query);
    let cursor = first.cursor().expect("more rows").to_string();

    let other = Query::from_ql("where n >= 1").unwrap().set_limit(2).set_cursor(cursor);
    let err = h
        .engine
        .search_collection(&h.scope, &h.app, "items", &other)
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidCursor(_)));
    assert_eq!(h.engine.counters().invalid_cursors, 1);
}

#[test]
fn garbage_cursor_is_invalid_not_empty() {
    let h = Harness::new();
    h.create("items", &[]);

    let query = Query::new().set_cursor("zz-not-a-cursor");
    let err = h
        .engine
        .search_collection(&h.scope, &h.app, "items", &query)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCursor(_)));
}

#[test]
fn updated_property_leaves_no_stale_index_row() {
    let h = Harness::new();
    let mut cat = h.create("cats", &[("color", Value::from("tabby"))]);
    h.update(&mut cat, "color", Value::from("black"));

    let stale = h.search("cats", &Query::from_ql("where color = 'tabby'").unwrap());
    assert!(stale.is_empty());

    let fresh = h.search("cats", &Query::from_ql("where color = 'black'").unwrap());
    assert_eq!(fresh.len(), 1);
}

#[test]
fn default_limit_applies_and_counters_move() {
    let h = Harness::new();
    for i in 0..15 {
        h.create("items", &[("n", Value::Int(i))]);
    }

    let results = h.search("items", &Query::new());
    assert_eq!(results.len(), crate::DEFAULT_QUERY_LIMIT);
    assert!(results.cursor().is_some());

    let snap = h.engine.counters();
    assert!(snap.queries >= 1);
    assert!(snap.pages_served >= 1);
    assert!(snap.index_writes >= 15);
}

//
// property-based laws over the boolean algebra
//

fn color_value(tag: u8) -> Value {
    match tag % 3 {
        0 => Value::from("red"),
        1 => Value::from("green"),
        _ => Value::from("blue"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn or_and_are_commutative_as_sets(colors in prop::collection::vec(0u8..3, 1..20)) {
        let h = Harness::new();
        for tag in &colors {
            h.create("dots", &[("color", color_value(*tag))]);
        }

        let a = FilterExpr::eq("color", "red");
        let b = FilterExpr::eq("color", "green");

        let big = Query::new().set_limit(100);
        let left = h.search("dots", &big.clone().add_filter(a.clone().or(b.clone())));
        let right = h.search("dots", &big.clone().add_filter(b.clone().or(a.clone())));
        let left_ids: Vec<_> = left.entities().map(|e| e.id().clone()).collect();
        let right_ids: Vec<_> = right.entities().map(|e| e.id().clone()).collect();
        prop_assert_eq!(left_ids, right_ids);

        let left = h.search("dots", &big.clone().add_filter(a.clone().and(b.clone())));
        let right = h.search("dots", &big.clone().add_filter(b.and(a)));
        prop_assert_eq!(left.len(), right.len());
    }

    #[test]
    fn not_is_an_exact_complement(colors in prop::collection::vec(0u8..3, 1..20)) {
        let h = Harness::new();
        for tag in &colors {
            h.create("dots", &[("color", color_value(*tag))]);
        }

        let big = Query::new().set_limit(100);
        let matched = h.search("dots", &big.clone().add_filter(FilterExpr::eq("color", "red")));
        let complement =
            h.search("dots", &big.clone().add_filter(FilterExpr::eq("color", "red").negate()));

        prop_assert_eq!(matched.len() + complement.len(), colors.len());

        // complement and match never share an id
        let matched_ids: std::collections::BTreeSet<_> =
            matched.entities().map(|e| e.id().clone()).collect();
        for entity in complement.entities() {
            prop_assert!(!matched_ids.contains(entity.id()));
        }
    }
}
