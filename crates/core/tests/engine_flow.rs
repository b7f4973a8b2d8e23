use orgtree_core::{
    FlatRecord, Forest, MetricSpec, MutationErrorKind, MutationService, NodeStore, ParentChange,
    RatioMetric, RollupCalculator, RowKind, TreeBuilder, TreeConfig, VisibilityFlattener,
};
use pretty_assertions::assert_eq;
use std::collections::{BTreeSet, HashSet};

const SNAPSHOT: &str = r#"[
    { "id": "company", "kind": "team" },
    { "id": "west", "parentId": "company", "kind": "team" },
    { "id": "ana", "parentId": "west", "kind": "member", "ownMetrics": { "sales": 100, "gp": 10 } },
    { "id": "bo", "parentId": "west", "kind": "member", "ownMetrics": { "sales": 300, "gp": 60 } },
    { "id": "key-accounts", "parentId": "company", "kind": "superTeam", "ownMetrics": { "sales": 500, "gp": 50 } },
    { "id": "cy", "parentId": "key-accounts", "kind": "member", "ownMetrics": { "sales": 100, "gp": 5 } },
    { "id": "di", "parentId": "key-accounts", "kind": "member", "ownMetrics": { "sales": 200, "gp": null } },
    { "id": "house", "parentId": "retired-team", "kind": "member", "ownMetrics": { "sales": 40 } }
]"#;

fn spec() -> MetricSpec {
    MetricSpec::new()
        .additive("sales")
        .additive("gp")
        .ratio(RatioMetric::percentage("marginPct", "gp", "sales"))
}

fn forest() -> Forest {
    let records: Vec<FlatRecord> = serde_json::from_str(SNAPSHOT).expect("valid snapshot");
    TreeBuilder::default().build(&records)
}

fn set(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn parent_links(forest: &Forest) -> BTreeSet<(String, Option<String>)> {
    forest
        .to_records()
        .into_iter()
        .map(|r| (r.id, r.parent_id))
        .collect()
}

#[test]
fn snapshot_rolls_up_without_double_counting() {
    let forest = forest();
    let rolled = RollupCalculator::new(spec()).unwrap().rollup(&forest);

    let west = rolled.rolled_by_id("west").unwrap();
    assert_eq!(west.value("sales"), Some(400.0));
    assert_eq!(west.ratio("marginPct"), Some(17.5));

    let key = rolled.rolled_by_id("key-accounts").unwrap();
    assert_eq!(key.value("sales"), Some(500.0));
    assert_eq!(key.value("gp"), Some(50.0));

    // 400 from west + 500 entered by the super team; its members are not added
    let company = rolled.rolled_by_id("company").unwrap();
    assert_eq!(company.value("sales"), Some(900.0));
    assert_eq!(company.value("gp"), Some(120.0));

    // Dangling house account still counted, as its own root
    assert_eq!(forest.report().dangling, vec!["house"]);
    assert_eq!(rolled.totals().value("sales"), Some(940.0));
}

#[test]
fn flatten_follows_expansion_state() {
    let forest = forest();
    let rolled = RollupCalculator::new(spec()).unwrap().rollup(&forest);

    let rows = VisibilityFlattener::flatten(&rolled, &set(&["company", "key-accounts"]));
    let shown: Vec<(&str, usize, RowKind)> = rows
        .iter()
        .map(|r| (r.node.id.as_str(), r.depth, r.kind))
        .collect();
    assert_eq!(
        shown,
        vec![
            ("company", 0, RowKind::Team),
            ("west", 1, RowKind::Team),
            ("key-accounts", 1, RowKind::SuperTeam),
            ("cy", 2, RowKind::Member),
            ("di", 2, RowKind::Member),
            ("house", 0, RowKind::Member),
        ]
    );

    // Collapsing the top hides everything below, whatever else is expanded
    let rows = VisibilityFlattener::flatten(&rolled, &set(&["west", "key-accounts"]));
    let shown: Vec<&str> = rows.iter().map(|r| r.node.id.as_str()).collect();
    assert_eq!(shown, vec!["company", "house"]);
}

#[test]
fn move_then_rollup_reflects_new_position() {
    let forest = forest();
    let moved = MutationService::reparent(&forest, "bo", Some("key-accounts")).unwrap();
    assert_eq!(moved.ancestry, vec!["company", "key-accounts"]);

    let calc = RollupCalculator::new(spec()).unwrap();
    let rolled = calc.rollup(&moved.forest);
    assert_eq!(rolled.rolled_by_id("west").unwrap().value("sales"), Some(100.0));
    // Super team total is still its entered value
    assert_eq!(rolled.rolled_by_id("key-accounts").unwrap().value("sales"), Some(500.0));
    assert_eq!(rolled.rolled_by_id("company").unwrap().value("sales"), Some(600.0));

    // The original forest still rolls up the old way
    let original = calc.rollup(&forest);
    assert_eq!(original.rolled_by_id("company").unwrap().value("sales"), Some(900.0));
}

#[test]
fn rejected_move_reports_and_changes_nothing() {
    let forest = forest();
    let before = parent_links(&forest);

    let err = MutationService::reparent(&forest, "company", Some("west")).unwrap_err();
    assert_eq!(err.kind(), MutationErrorKind::CycleDetected);

    let report = serde_json::to_value(err.report()).unwrap();
    assert_eq!(report["kind"], "CycleDetected");
    assert_eq!(report["nodeId"], "company");

    assert_eq!(parent_links(&forest), before);
}

#[test]
fn store_apply_and_forest_move_agree() {
    let records: Vec<FlatRecord> = serde_json::from_str(SNAPSHOT).unwrap();
    let store = NodeStore::new(records);
    let forest = TreeBuilder::default().build_store(&store);

    let moved = MutationService::reparent(&forest, "west", Some("key-accounts")).unwrap();
    let applied = store.apply(&moved.change, &TreeConfig::default()).unwrap();
    let rebuilt = TreeBuilder::default().build_store(&applied);

    assert_eq!(parent_links(&rebuilt), parent_links(&moved.forest));
    for (_, node) in rebuilt.nodes() {
        assert_eq!(moved.forest.depth_of(&node.id), Some(node.depth));
    }
}

#[test]
fn store_apply_and_forest_move_reject_alike() {
    let records: Vec<FlatRecord> = serde_json::from_str(SNAPSHOT).unwrap();
    let store = NodeStore::new(records);
    // company > key-accounts > cy sits at depth 2
    let config = TreeConfig {
        max_depth: 2,
        ..TreeConfig::default()
    };
    let forest = TreeBuilder::new(config.clone()).build_store(&store);

    let moves = [
        ("west", Some("cy")),
        ("company", Some("key-accounts")),
        ("west", Some("west")),
        ("west", Some("retired-team")),
        ("west", Some("key-accounts")),
    ];
    for (node, parent) in moves {
        let change = ParentChange::new(node, parent);
        let by_forest = MutationService::reparent(&forest, node, parent).map(|m| m.change);
        let by_store = store.apply(&change, &config).map(|_| change.clone());
        assert_eq!(
            by_forest.as_ref().map_err(|e| e.kind()),
            by_store.as_ref().map_err(|e| e.kind()),
            "{node} -> {parent:?}"
        );
    }

    // Depth cap: west (with two members) under key-accounts reaches depth 3
    let err = store
        .apply(&ParentChange::new("west", Some("key-accounts")), &config)
        .unwrap_err();
    assert_eq!(err.kind(), MutationErrorKind::DepthLimitExceeded);
}

#[test]
fn reveal_moved_node() {
    let forest = forest();
    let moved = MutationService::reparent(&forest, "cy", Some("west")).unwrap();
    let expanded: HashSet<String> = moved.ancestry.iter().cloned().collect();

    assert!(VisibilityFlattener::is_visible(&moved.forest, "cy", &expanded));
    assert!(!VisibilityFlattener::is_visible(&moved.forest, "di", &expanded));
}

#[test]
fn engine_types_are_thread_safe() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Forest>();
    assert_send_sync::<TreeBuilder>();
    assert_send_sync::<RollupCalculator>();
    assert_send_sync::<orgtree_core::RolledForest<'static>>();
    assert_send_sync::<orgtree_core::FlatRow<'static>>();
}
