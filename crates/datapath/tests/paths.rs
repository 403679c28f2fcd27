//! End-to-end tests through the public API.

use datapath::{
    Component, ErrorKind, Key, PathDict, UnfoldOptions, UnfoldProcessor, Unfolded, discard, fold,
    get, iterate, parse, parse_iterable, put, render, unfold, unfold_root, unfold_with,
};
use serde_json::{Value, json};

fn table(value: Value) -> PathDict {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a map, got {other}"),
    }
}

fn pairs(root: &Value, path: &str) -> Vec<(String, Value)> {
    iterate(root, path, None)
        .map(|item| item.map(|(path, value)| (path, value.clone())))
        .collect::<Result<_, _>>()
        .expect("iteration should succeed")
}

#[test]
fn test_split_examples() {
    assert!(parse("", false).unwrap().is_empty());
    assert_eq!(
        parse("test[1].test[2].test[3][4].test", false).unwrap(),
        [
            Component::name("test"),
            Component::index(1),
            Component::name("test"),
            Component::index(2),
            Component::name("test"),
            Component::index(3),
            Component::index(4),
            Component::name("test"),
        ]
    );
    assert_eq!(
        parse("1234567[1]", false).unwrap(),
        [Component::name("1234567"), Component::index(1)]
    );
}

#[test]
fn test_parse_render_round_trip() {
    for path in [
        "",
        "a",
        "a.b[3].c",
        "[0][1]",
        ",%$^%^!@#$%",
        "users[].name",
        "rows[1:-1:2]",
        "env.*_URL",
        "[::]",
    ] {
        let split = parse_iterable(path).unwrap();
        assert_eq!(render(&split).unwrap(), path);
    }
}

#[test]
fn test_iterate_list_example() {
    assert_eq!(
        pairs(&json!({"a": [1, 2, 3]}), "a[]"),
        [
            ("a[0]".to_string(), json!(1)),
            ("a[1]".to_string(), json!(2)),
            ("a[2]".to_string(), json!(3)),
        ]
    );
}

#[test]
fn test_iterate_nested_example() {
    assert_eq!(
        pairs(&json!({"a": [{"b": [1, 2]}, {"b": [3]}]}), "a[].b[]"),
        [
            ("a[0].b[0]".to_string(), json!(1)),
            ("a[0].b[1]".to_string(), json!(2)),
            ("a[1].b[0]".to_string(), json!(3)),
        ]
    );
}

#[test]
fn test_iterate_mixed_points() {
    let root = json!({
        "services": {
            "web_1": {"ports": [80, 443, 8080]},
            "db": {"ports": [5432]},
            "web_2": {"ports": [81]}
        }
    });
    let paths: Vec<String> = pairs(&root, "services.web_*.ports[:2]")
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    assert_eq!(
        paths,
        [
            "services.web_1.ports[0]",
            "services.web_1.ports[1]",
            "services.web_2.ports[0]"
        ]
    );
}

#[test]
fn test_iterated_paths_resolve_to_their_values() {
    let root = json!({"a": [{"b": {"x": 1, "y": 2}}, {"b": {"x": 3}}]});
    for (path, value) in pairs(&root, "a[].b.*") {
        assert_eq!(get(&root, &path, None).unwrap(), &value, "path {path}");
    }
}

#[test]
fn test_fold_example() {
    let root = json!({"a": {"b": [1, 2]}, "c": "x"});
    assert_eq!(
        fold(&root).unwrap(),
        table(json!({"a.b[0]": 1, "a.b[1]": 2, "c": "x"}))
    );
}

#[test]
fn test_unfold_example() {
    let paths = table(json!({"a.b[1]": 2, "a.b[0]": 1, "c": "x"}));
    assert_eq!(
        unfold(&paths).unwrap(),
        table(json!({"": {"a": {"b": [1, 2]}, "c": "x"}}))
    );
}

#[test]
fn test_unfold_inconsistent_parent_example() {
    let err = unfold(&table(json!({"key1.key2": 5, "key1[0]": 17}))).unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(err.kind, ErrorKind::Validation { .. }));
    assert_eq!(err.path, "key1");
}

#[test]
fn test_unfold_gap_example() {
    let err = unfold(&table(json!({"a[0]": 1, "a[2]": 3}))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Format { missing: 1 });
}

#[test]
fn test_discard_on_missing_leaf() {
    let mut root = json!({"a": 1});
    assert_eq!(discard(&mut root, "b").unwrap(), None);
    assert_eq!(root, json!({"a": 1}));
}

#[test]
fn test_fold_edit_unfold() {
    let root = json!({"db": {"hosts": ["a", "b"], "port": 5432}});
    let mut flat = fold(&root).unwrap();
    flat.insert("db.hosts[2]".into(), json!("c"));
    flat.insert("db.user".into(), json!("admin"));

    let mut rebuilt = unfold_root(&flat).unwrap();
    assert_eq!(
        rebuilt,
        json!({"db": {"hosts": ["a", "b", "c"], "port": 5432, "user": "admin"}})
    );

    put(&mut rebuilt, "db.port", json!(6543)).unwrap();
    assert_eq!(get(&rebuilt, "db.port", None).unwrap(), &json!(6543));
}

#[test]
fn test_unfold_with_counting_processor() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let lists = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&lists);
    let processor = UnfoldProcessor::new().on_list(move |list| {
        counter.fetch_add(1, Ordering::SeqCst);
        list
    });
    let options = UnfoldOptions::new().processor(processor);

    let paths = table(json!({"a[0][0]": 1, "a[1][0]": 2, "b[0]": 3}));
    let unfolded = unfold_with(&paths, &options).unwrap();
    assert_eq!(
        unfolded,
        Unfolded::Table(table(json!({"": {"a": [[1], [2]], "b": [3]}})))
    );
    // a[0], a[1], a and b
    assert_eq!(lists.load(Ordering::SeqCst), 4);
}

#[test]
fn test_key_accessors() {
    let split = parse("a[2]", false).unwrap();
    assert_eq!(split[0].as_key().and_then(Key::as_name), Some("a"));
    assert_eq!(split[1].as_key().and_then(Key::as_index), Some(2));
}
