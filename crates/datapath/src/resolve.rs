//! Resolve a single-location path to the collection and key it names.
//!
//! Every step checks that the key kind fits the collection kind (an index
//! needs a list, a name needs a map) before stepping into it. Type errors and
//! missing intermediate keys report the path walked so far.

use datapath_parse::{Component, DisplayPath, Key, parse};
use serde_json::{Map, Value};

use crate::error::{Error, ErrorKind, kind_name};
use crate::tracing_macros::trace;

/// Mutable handle on the last step of a path: a collection and a key in it.
#[derive(Debug)]
pub enum Slot<'a> {
    /// An index into a list.
    Index(&'a mut Vec<Value>, usize),
    /// A key in a map.
    Name(&'a mut Map<String, Value>, String),
}

impl<'a> Slot<'a> {
    /// Pair `container` with `key`, if their kinds fit.
    pub fn new(container: &'a mut Value, key: &Key) -> Result<Self, ErrorKind> {
        match (container, key) {
            (Value::Array(items), Key::Index(index)) => Ok(Slot::Index(items, *index)),
            (Value::Object(map), Key::Name(name)) => Ok(Slot::Name(map, name.clone())),
            (container, key) => Err(mismatch(container, key)),
        }
    }

    /// The key this slot refers to.
    pub fn key(&self) -> Key {
        match self {
            Slot::Index(_, index) => Key::Index(*index),
            Slot::Name(_, name) => Key::Name(name.clone()),
        }
    }

    /// The current value, if present.
    pub fn get(&self) -> Option<&Value> {
        match self {
            Slot::Index(items, index) => items.get(*index),
            Slot::Name(map, name) => map.get(name.as_str()),
        }
    }

    /// Turn the slot into a reference to its value, or the leaf lookup failure.
    pub fn into_mut(self) -> Result<&'a mut Value, ErrorKind> {
        match self {
            Slot::Index(items, index) => {
                let len = items.len();
                items
                    .get_mut(index)
                    .ok_or(ErrorKind::IndexOutOfRange { index, len })
            }
            Slot::Name(map, name) => match map.get_mut(name.as_str()) {
                Some(value) => Ok(value),
                None => Err(ErrorKind::KeyNotFound {
                    key: format!("'{}'", name),
                }),
            },
        }
    }

    /// Store `value`, returning the previous one.
    ///
    /// Lists never grow: an index past the end is an error.
    pub fn put(self, value: Value) -> Result<Option<Value>, ErrorKind> {
        match self {
            Slot::Index(items, index) => {
                let len = items.len();
                let target = items
                    .get_mut(index)
                    .ok_or(ErrorKind::IndexOutOfRange { index, len })?;
                Ok(Some(std::mem::replace(target, value)))
            }
            Slot::Name(map, name) => Ok(map.insert(name, value)),
        }
    }

    /// Remove the value, shifting later list elements down.
    pub fn remove(self) -> Result<Value, ErrorKind> {
        match self {
            Slot::Index(items, index) => {
                if index < items.len() {
                    Ok(items.remove(index))
                } else {
                    Err(ErrorKind::IndexOutOfRange {
                        index,
                        len: items.len(),
                    })
                }
            }
            Slot::Name(map, name) => map
                .shift_remove(name.as_str())
                .ok_or_else(|| ErrorKind::KeyNotFound {
                    key: Key::Name(name).to_string(),
                }),
        }
    }
}

/// Shared handle on the last step of a path.
#[derive(Debug, Clone)]
pub enum SlotRef<'a> {
    /// An index into a list.
    Index(&'a [Value], usize),
    /// A key in a map.
    Name(&'a Map<String, Value>, String),
}

impl<'a> SlotRef<'a> {
    /// Pair `container` with `key`, if their kinds fit.
    pub fn new(container: &'a Value, key: &Key) -> Result<Self, ErrorKind> {
        match (container, key) {
            (Value::Array(items), Key::Index(index)) => Ok(SlotRef::Index(items, *index)),
            (Value::Object(map), Key::Name(name)) => Ok(SlotRef::Name(map, name.clone())),
            (container, key) => Err(mismatch(container, key)),
        }
    }

    /// The value, or the leaf lookup failure.
    pub fn get(&self) -> Result<&'a Value, ErrorKind> {
        match self {
            SlotRef::Index(items, index) => {
                let items: &'a [Value] = *items;
                items.get(*index).ok_or(ErrorKind::IndexOutOfRange {
                    index: *index,
                    len: items.len(),
                })
            }
            SlotRef::Name(map, name) => {
                let map: &'a Map<String, Value> = *map;
                map.get(name.as_str()).ok_or_else(|| ErrorKind::KeyNotFound {
                    key: format!("'{}'", name),
                })
            }
        }
    }
}

fn mismatch(container: &Value, key: &Key) -> ErrorKind {
    let got = kind_name(container);
    match (container, key) {
        (Value::Array(_) | Value::Object(_), Key::Index(_)) => ErrorKind::TypeMismatch {
            key: "int",
            expected: "list",
            got,
        },
        (Value::Array(_) | Value::Object(_), Key::Name(_)) => ErrorKind::TypeMismatch {
            key: "str",
            expected: "map",
            got,
        },
        _ => ErrorKind::TypeValidation { got },
    }
}

fn key_of(component: &Component) -> Result<&Key, ErrorKind> {
    match component {
        Component::Key(key) => Ok(key),
        Component::Iterate(point) => Err(ErrorKind::IterationNotAllowed {
            reason: format!("{} is not allowed here", point.describe()),
        }),
    }
}

/// Record `component` in `at` and attach `at` to any failure.
fn contextual<T>(
    at: &mut Vec<Component>,
    component: &Component,
    check: impl FnOnce() -> Result<T, ErrorKind>,
) -> Result<T, Error> {
    at.push(component.clone());
    check().map_err(|kind| Error::new(DisplayPath(at).to_string(), kind))
}

/// Missing intermediate step: `at` ends with the key that was not found.
pub(crate) fn lookup_error(at: &[Component]) -> Error {
    let (missing, parent) = match at.split_last() {
        Some((missing, parent)) => (missing, parent),
        None => return Error::bare(ErrorKind::PathLookup { key: String::new() }),
    };
    let key = match missing {
        Component::Key(key) => key.to_string(),
        other => DisplayPath(std::slice::from_ref(other)).to_string(),
    };
    Error::new(root_or_path(parent), ErrorKind::PathLookup { key })
}

pub(crate) fn root_or_path(path: &[Component]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        DisplayPath(path).to_string()
    }
}

fn empty_path() -> Error {
    Error::validation(
        "",
        "path cannot be empty; the root has no parent collection",
    )
}

/// Walk an already-split path and return a mutable handle on its last step.
pub fn leaf_at<'a>(root: &'a mut Value, path: &[Component]) -> Result<Slot<'a>, Error> {
    trace!("leaf {}", DisplayPath(path));
    let Some((last, init)) = path.split_last() else {
        return Err(empty_path());
    };

    let mut at = Vec::with_capacity(path.len());
    let mut value = root;
    for component in init {
        let slot = contextual(&mut at, component, move || {
            Slot::new(value, key_of(component)?)
        })?;
        value = slot.into_mut().map_err(|_| lookup_error(&at))?;
    }
    contextual(&mut at, last, move || Slot::new(value, key_of(last)?))
}

/// Walk an already-split path and return a shared handle on its last step.
pub fn leaf_ref_at<'a>(root: &'a Value, path: &[Component]) -> Result<SlotRef<'a>, Error> {
    leaf_ref_within(root, &[], path)
}

/// [`leaf_ref_at`] for a tree found at `base`, which prefixes error paths.
pub(crate) fn leaf_ref_within<'a>(
    root: &'a Value,
    base: &[Component],
    path: &[Component],
) -> Result<SlotRef<'a>, Error> {
    let Some((last, init)) = path.split_last() else {
        return Err(empty_path());
    };

    let mut at = base.to_vec();
    let mut value = root;
    for component in init {
        let slot = contextual(&mut at, component, || SlotRef::new(value, key_of(component)?))?;
        value = slot.get().map_err(|_| lookup_error(&at))?;
    }
    contextual(&mut at, last, || SlotRef::new(value, key_of(last)?))
}

/// Find the collection and key at the right side of `path`.
pub fn leaf<'a>(root: &'a mut Value, path: &str) -> Result<Slot<'a>, Error> {
    let split = parse(path, false)?;
    leaf_at(root, &split)
}

/// Find the collection and key at the right side of `path`, without mutating.
pub fn leaf_ref<'a>(root: &'a Value, path: &str) -> Result<SlotRef<'a>, Error> {
    let split = parse(path, false)?;
    leaf_ref_at(root, &split)
}

/// Get the value at `path`.
///
/// - the empty path returns `root` itself
/// - a missing intermediate key or index is always an error
/// - a missing final key or index returns `default` when one is given
pub fn get<'a>(root: &'a Value, path: &str, default: Option<&'a Value>) -> Result<&'a Value, Error> {
    let split = parse(path, false)?;
    get_at(root, &split, default)
}

/// [`get`] on an already-split path.
pub fn get_at<'a>(
    root: &'a Value,
    path: &[Component],
    default: Option<&'a Value>,
) -> Result<&'a Value, Error> {
    get_within(root, &[], path, default)
}

pub(crate) fn get_within<'a>(
    root: &'a Value,
    base: &[Component],
    path: &[Component],
    default: Option<&'a Value>,
) -> Result<&'a Value, Error> {
    if path.is_empty() {
        return Ok(root);
    }
    let slot = leaf_ref_within(root, base, path)?;
    match (slot.get(), default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default),
        (Err(kind), None) => Err(Error::bare(kind)),
    }
}

/// Get a mutable reference to the value at `path`.
pub fn get_mut<'a>(root: &'a mut Value, path: &str) -> Result<&'a mut Value, Error> {
    let split = parse(path, false)?;
    if split.is_empty() {
        return Ok(root);
    }
    let slot = leaf_at(root, &split)?;
    slot.into_mut().map_err(Error::bare)
}

/// Set the value at `path`.
///
/// Map keys are created as needed; list indices must already exist.
pub fn put(root: &mut Value, path: &str, value: Value) -> Result<(), Error> {
    let slot = leaf(root, path)?;
    slot.put(value).map_err(Error::bare)?;
    Ok(())
}

/// Remove and return the value at `path`; it must exist.
pub fn delete(root: &mut Value, path: &str) -> Result<Value, Error> {
    let slot = leaf(root, path)?;
    slot.remove().map_err(Error::bare)
}

/// Ensure nothing exists at `path`, returning what was removed.
///
/// Only a missing final key or index is tolerated; missing intermediate
/// steps and type errors still fail.
pub fn discard(root: &mut Value, path: &str) -> Result<Option<Value>, Error> {
    match delete(root, path) {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_leaf_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn tree() -> Value {
        json!({
            "users": [
                {"name": "ann", "tags": ["a", "b"]},
                {"name": "bob", "tags": []}
            ],
            "meta": {"count": 2, "nested": {"deep": [[1], [2, 3]]}}
        })
    }

    fn existing_path() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "users",
            "users[0]",
            "users[0].name",
            "users[0].tags[1]",
            "users[1].tags",
            "meta.count",
            "meta.nested.deep[1][0]",
            "meta.new_key",
        ])
    }

    fn leaf_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            Just(Value::Null),
        ]
    }

    proptest! {
        /// Whatever is put at a path is what get returns
        #[test]
        fn put_then_get(path in existing_path(), value in leaf_value()) {
            let mut root = tree();
            put(&mut root, path, value.clone()).unwrap();
            prop_assert_eq!(get(&root, path, None).unwrap(), &value);
        }

        /// Discarding twice leaves the same tree as discarding once
        #[test]
        fn discard_is_idempotent(path in existing_path()) {
            let mut once = tree();
            discard(&mut once, path).unwrap();
            let mut twice = once.clone();
            let second = discard(&mut twice, path).unwrap();
            // list elements shift down, so only map keys are gone for good
            if !path.ends_with(']') {
                prop_assert_eq!(second, None);
                prop_assert_eq!(twice, once);
            }
        }
    }
}
