//! Lazy expansion of iterating paths (`a[].b`, `rows[1:]`, `env.*_URL`).
//!
//! The walk is depth-first with one frame per active iteration point.
//! Each frame enumerates the concrete keys its point selects; every concrete
//! key either finishes the path (a pair is yielded) or opens the next frame
//! for the remaining suffix.

use datapath_parse::{
    Component, DisplayPath, IterationPoint, Key, Slice, SliceIndices, SplitPath, Wildcard,
    parse_iterable,
};
use serde_json::{Value, map};

use crate::error::{Error, ErrorKind};
use crate::resolve::{get_within, lookup_error, root_or_path};
use crate::tracing_macros::{debug, trace};

/// Iterate over every `(path, value)` pair matched by `path`.
///
/// A path without iteration points yields the single pair for that path,
/// using `default` when only its final key is missing. The same `default`
/// applies to the suffix after the last iteration point.
///
/// Parse errors are yielded as the first item. After the first error the
/// iterator is exhausted.
pub fn iterate<'a>(root: &'a Value, path: &str, default: Option<&'a Value>) -> Iter<'a> {
    match parse_iterable(path) {
        Ok(split) => Iter::new(root, split, default),
        Err(err) => Iter::failed(err.into()),
    }
}

/// Iterator returned by [`iterate`].
pub struct Iter<'a> {
    path: SplitPath,
    default: Option<&'a Value>,
    stack: Vec<Frame<'a>>,
    pending: Option<Result<(String, &'a Value), Error>>,
    fused: bool,
}

/// One active iteration point.
struct Frame<'a> {
    /// Concrete path to the collection being enumerated.
    base: Vec<Component>,
    matches: Matches<'a>,
    /// Offset into the full path just after this iteration point.
    rest: usize,
}

enum Matches<'a> {
    List {
        items: &'a [Value],
        indices: SliceIndices,
    },
    Map {
        entries: map::Iter<'a>,
        pattern: Wildcard,
    },
}

impl<'a> Matches<'a> {
    fn next_child(&mut self) -> Option<(Key, &'a Value)> {
        match self {
            Matches::List { items, indices } => {
                let items: &'a [Value] = *items;
                let index = indices.next()?;
                items.get(index).map(|item| (Key::Index(index), item))
            }
            Matches::Map { entries, pattern } => entries
                .find(|(key, _)| pattern.matches(key))
                .map(|(key, value)| (Key::Name(key.clone()), value)),
        }
    }
}

impl<'a> Iter<'a> {
    /// Iterate an already-split path.
    pub fn new(root: &'a Value, path: SplitPath, default: Option<&'a Value>) -> Self {
        let mut iter = Iter {
            path,
            default,
            stack: Vec::new(),
            pending: None,
            fused: false,
        };
        iter.descend(root, Vec::new(), 0);
        iter
    }

    fn failed(err: Error) -> Self {
        Iter {
            path: Vec::new(),
            default: None,
            stack: Vec::new(),
            pending: Some(Err(err)),
            fused: false,
        }
    }

    /// Continue the walk from `value`, found at `base`, with the path from `start` on.
    fn descend(&mut self, value: &'a Value, base: Vec<Component>, start: usize) {
        let rest = &self.path[start..];
        let next_point = rest
            .iter()
            .enumerate()
            .find_map(|(offset, component)| component.as_iteration().map(|point| (offset, point)));

        let Some((offset, point)) = next_point else {
            let item = get_within(value, &base, rest, self.default).map(|found| {
                let mut full = base;
                full.extend_from_slice(rest);
                (DisplayPath(&full).to_string(), found)
            });
            self.pending = Some(item);
            return;
        };

        let prefix = &rest[..offset];
        let mut at = base;
        let container = match get_within(value, &at, prefix, None) {
            Ok(container) => container,
            Err(err) if err.is_leaf_not_found() => {
                at.extend_from_slice(prefix);
                self.pending = Some(Err(lookup_error(&at)));
                return;
            }
            Err(err) => {
                self.pending = Some(Err(err));
                return;
            }
        };
        at.extend_from_slice(prefix);

        let matches = match (point, container) {
            (IterationPoint::List, Value::Array(items)) => Matches::List {
                items,
                indices: Slice::default().indices(items.len()),
            },
            (IterationPoint::Slice(slice), Value::Array(items)) => Matches::List {
                items,
                indices: slice.indices(items.len()),
            },
            (IterationPoint::Wildcard(pattern), Value::Object(map)) => Matches::Map {
                entries: map.iter(),
                pattern: pattern.clone(),
            },
            (point, _) => {
                let kind = if point.requires_list() { "list" } else { "map" };
                let reason = format!("{} must be preceded by a {}", point.describe(), kind);
                let err = Error::new(
                    root_or_path(&at),
                    ErrorKind::IterationNotAllowed { reason },
                );
                self.pending = Some(Err(err));
                return;
            }
        };

        debug!(
            "iterating {} at {}",
            point.describe(),
            root_or_path(&at)
        );
        self.stack.push(Frame {
            base: at,
            matches,
            rest: start + offset + 1,
        });
    }
}

impl std::fmt::Debug for Iter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Iter")
            .field("path", &DisplayPath(&self.path).to_string())
            .field("depth", &self.stack.len())
            .field("fused", &self.fused)
            .finish()
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Result<(String, &'a Value), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.fused {
                return None;
            }
            if let Some(item) = self.pending.take() {
                if item.is_err() {
                    self.fused = true;
                    self.stack.clear();
                }
                return Some(item);
            }

            let frame = self.stack.last_mut()?;
            match frame.matches.next_child() {
                Some((key, child)) => {
                    let mut base = frame.base.clone();
                    base.push(Component::Key(key));
                    let rest = frame.rest;
                    trace!("descending into {}", DisplayPath(&base));
                    self.descend(child, base, rest);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

impl std::iter::FusedIterator for Iter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;
    use serde_json::json;

    fn collect<'a>(root: &'a Value, path: &str) -> Vec<(String, &'a Value)> {
        iterate(root, path, None)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn paths(root: &Value, path: &str) -> Vec<String> {
        collect(root, path).into_iter().map(|(path, _)| path).collect()
    }

    #[test]
    fn test_iterate_list() {
        let root = json!({"a": [1, 2, 3]});
        assert_eq!(
            collect(&root, "a[]"),
            [
                ("a[0]".to_string(), &json!(1)),
                ("a[1]".to_string(), &json!(2)),
                ("a[2]".to_string(), &json!(3)),
            ]
        );
    }

    #[test]
    fn test_iterate_nested() {
        let root = json!({"a": [{"b": [1, 2]}, {"b": [3]}]});
        assert_eq!(
            collect(&root, "a[].b[]"),
            [
                ("a[0].b[0]".to_string(), &json!(1)),
                ("a[0].b[1]".to_string(), &json!(2)),
                ("a[1].b[0]".to_string(), &json!(3)),
            ]
        );
    }

    #[test]
    fn test_iterate_without_iteration_points() {
        let root = json!({"a": {"b": 7}});
        assert_eq!(collect(&root, "a.b"), [("a.b".to_string(), &json!(7))]);
        assert_eq!(collect(&root, ""), [(String::new(), &root)]);
    }

    #[test]
    fn test_iterate_root_list() {
        let root = json!([[1], [2, 3]]);
        assert_eq!(paths(&root, "[][]"), ["[0][0]", "[1][0]", "[1][1]"]);
    }

    #[test]
    fn test_iterate_slices() {
        let root = json!({"a": [0, 1, 2, 3, 4]});
        assert_eq!(paths(&root, "a[1:3]"), ["a[1]", "a[2]"]);
        assert_eq!(paths(&root, "a[::2]"), ["a[0]", "a[2]", "a[4]"]);
        assert_eq!(paths(&root, "a[-2:]"), ["a[3]", "a[4]"]);
        assert_eq!(paths(&root, "a[::-2]"), ["a[4]", "a[2]", "a[0]"]);
        assert_eq!(paths(&root, "a[3:100]"), ["a[3]", "a[4]"]);
        assert!(paths(&root, "a[10:]").is_empty());
    }

    #[test]
    fn test_iterate_wildcard() {
        let root = json!({
            "env": {"DB_URL": "x", "PORT": 80, "CACHE_URL": "y", "URL": "z"}
        });
        assert_eq!(paths(&root, "env.*_URL"), ["env.DB_URL", "env.CACHE_URL"]);
        assert_eq!(
            paths(&root, "env.*"),
            ["env.DB_URL", "env.PORT", "env.CACHE_URL", "env.URL"]
        );
        assert_eq!(paths(&root, "env.*URL"), ["env.DB_URL", "env.CACHE_URL", "env.URL"]);
    }

    #[test]
    fn test_iterate_wildcard_then_list() {
        let root = json!({"x1": [1], "y": [2], "x2": [3, 4]});
        assert_eq!(paths(&root, "x*[]"), ["x1[0]", "x2[0]", "x2[1]"]);
    }

    #[test]
    fn test_empty_collections_yield_nothing() {
        assert!(collect(&json!({"a": []}), "a[]").is_empty());
        assert!(collect(&json!({"a": {}}), "a.*").is_empty());
    }

    #[test]
    fn test_default_applies_to_suffix() {
        let root = json!({"a": [{"b": 1}, {}]});
        let default = json!(0);
        let pairs: Vec<_> = iterate(&root, "a[].b", Some(&default))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            pairs,
            [("a[0].b".to_string(), &json!(1)), ("a[1].b".to_string(), &default)]
        );

        let mut iter = iterate(&root, "a[].b", None);
        assert!(iter.next().unwrap().is_ok());
        let err = iter.next().unwrap().unwrap_err();
        assert!(err.is_leaf_not_found());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_missing_prefix_is_path_lookup() {
        let root = json!({"a": {}});
        let default = json!(0);
        let err = iterate(&root, "a.b[]", Some(&default))
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::PathLookup { .. }));
        insta::assert_snapshot!(err.to_string(), @"a: could not find key/index 'b'");

        let err = iterate(&root, "x[]", None).next().unwrap().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"<root>: could not find key/index 'x'");
    }

    #[test]
    fn test_wrong_collection_kind() {
        let root = json!({"a": {"b": 1}, "l": [1]});

        let err = iterate(&root, "a[]", None).next().unwrap().unwrap_err();
        assert!(err.is_iteration_not_allowed());
        insta::assert_snapshot!(err.to_string(), @"a: list iteration must be preceded by a list");

        let err = iterate(&root, "l.*", None).next().unwrap().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"l: wildcard key must be preceded by a map");

        let err = iterate(&root, "a.b[1:]", None).next().unwrap().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"a.b: slice iteration must be preceded by a list");
    }

    #[test]
    fn test_nested_errors_carry_concrete_path() {
        let root = json!({"a": [{"b": [1]}, {"b": 5}]});
        let results: Vec<_> = iterate(&root, "a[].b[]", None).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"a[1].b: list iteration must be preceded by a list");

        let root = json!({"a": [{"b": {"c": 1}}, 3]});
        let err = iterate(&root, "a[].b.c", None)
            .find_map(Result::err)
            .unwrap();
        insta::assert_snapshot!(err.to_string(), @"a[1].b: object must be list/map, got number");
    }

    #[test]
    fn test_parse_error_is_first_item() {
        let root = json!({});
        let mut iter = iterate(&root, "a[1", None);
        let err = iter.next().unwrap().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Grammar(_)));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_iteration_is_lazy() {
        let root = json!({"a": [[1, 2], 3]});
        let mut iter = iterate(&root, "a[][]", None);
        assert_eq!(iter.next().unwrap().unwrap().0, "a[0][0]");
        assert_eq!(iter.next().unwrap().unwrap().0, "a[0][1]");
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }
}
