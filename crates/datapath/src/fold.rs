//! Flatten a tree into a table of `path -> leaf` entries.

use datapath_parse::{Component, DisplayPath, parse, render};
use serde_json::Value;

use crate::PathDict;
use crate::error::Error;
use crate::tracing_macros::trace;

/// Fold `root` into a table mapping every leaf path to its value.
///
/// Empty lists and maps below the root are kept as leaves, so [`unfold`]
/// restores them. An empty root folds to `{"": root}`.
///
/// [`unfold`]: crate::unfold
pub fn fold(root: &Value) -> Result<PathDict, Error> {
    fold_at(root, "")
}

/// Fold `root` as if it were found at `base`, which prefixes every path.
///
/// With an empty `base` the root must be a list or map; otherwise a leaf
/// root folds to the single entry `{base: root}`.
pub fn fold_at(root: &Value, base: &str) -> Result<PathDict, Error> {
    let mut at = parse(base, false)?;
    if at.is_empty() && !matches!(root, Value::Array(_) | Value::Object(_)) {
        return Err(Error::validation("", "root must be list/map"));
    }

    let mut table = PathDict::new();
    fold_into(&mut table, &mut at, root)?;
    trace!("folded {} entries", table.len());
    Ok(table)
}

fn fold_into(table: &mut PathDict, at: &mut Vec<Component>, value: &Value) -> Result<(), Error> {
    match value {
        Value::Array(items) if !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                at.push(Component::index(index));
                fold_into(table, at, item)?;
                at.pop();
            }
        }
        Value::Object(map) if !map.is_empty() => {
            for (key, item) in map {
                at.push(Component::name(key.as_str()));
                fold_into(table, at, item)?;
                at.pop();
            }
        }
        leaf => {
            // map keys like "a.b" have no path form
            let path = render(at)
                .map_err(|err| Error::from(err).within(|| DisplayPath(at).to_string()))?;
            table.insert(path, leaf.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use facet_testhelpers::test;
    use serde_json::json;

    fn table(value: Value) -> PathDict {
        match value {
            Value::Object(map) => map,
            other => panic!("expected a map, got {other}"),
        }
    }

    #[test]
    fn test_fold() {
        let root = json!({"a": {"b": [1, {"c": 2}]}, "d": "x"});
        assert_eq!(
            fold(&root).unwrap(),
            table(json!({"a.b[0]": 1, "a.b[1].c": 2, "d": "x"}))
        );
        let keys: Vec<_> = fold(&root).unwrap().keys().cloned().collect();
        assert_eq!(keys, ["a.b[0]", "a.b[1].c", "d"]);
    }

    #[test]
    fn test_fold_root_list() {
        assert_eq!(
            fold(&json!([[5], 6])).unwrap(),
            table(json!({"[0][0]": 5, "[1]": 6}))
        );
    }

    #[test]
    fn test_fold_keeps_empty_collections() {
        assert_eq!(
            fold(&json!({"a": [], "b": {}, "c": [{}]})).unwrap(),
            table(json!({"a": [], "b": {}, "c[0]": {}}))
        );
        assert_eq!(fold(&json!({})).unwrap(), table(json!({"": {}})));
        assert_eq!(fold(&json!([])).unwrap(), table(json!({"": []})));
    }

    #[test]
    fn test_fold_at() {
        assert_eq!(
            fold_at(&json!({"b": [1]}), "a").unwrap(),
            table(json!({"a.b[0]": 1}))
        );
        assert_eq!(fold_at(&json!(3), "x[2]").unwrap(), table(json!({"x[2]": 3})));
    }

    #[test]
    fn test_fold_leaf_root_is_rejected() {
        let err = fold(&json!(3)).unwrap_err();
        assert!(err.is_validation());
        insta::assert_snapshot!(err.to_string(), @"root must be list/map");
    }

    #[test]
    fn test_fold_unrepresentable_key() {
        let err = fold(&json!({"a": {"b.c": 1}})).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidComponent(_)));
        assert_eq!(err.path, "a.b.c");
    }

    #[test]
    fn test_fold_bad_base() {
        assert!(fold_at(&json!({}), "a[").unwrap_err().is_validation());
        assert!(fold_at(&json!({}), "a[]").unwrap_err().is_iteration_not_allowed());
    }
}
