//! Rebuild a tree from a table of `path -> leaf` entries.
//!
//! Entries are consumed bottom-up by path length. Every entry of the current
//! length is inserted into a partial container for its parent path; once a
//! length is done, the partial containers one level up are completed (lists
//! must have a contiguous `0..n` run of indices) and become entries of that
//! shorter length themselves, until only the root is left.

use std::collections::HashMap;
use std::fmt;

use datapath_parse::{Component, Key, parse};
use serde_json::{Map, Value};

use crate::PathDict;
use crate::error::{Error, ErrorKind, kind_name};
use crate::resolve::root_or_path;
use crate::tracing_macros::{debug, trace};

type Hook = Box<dyn Fn(Value) -> Value + Send + Sync>;

/// Hooks applied to values while a tree is rebuilt.
///
/// Each hook defaults to the identity.
#[derive(Default)]
pub struct UnfoldProcessor {
    leaf: Option<Hook>,
    list: Option<Hook>,
    map: Option<Hook>,
}

impl UnfoldProcessor {
    /// Create a processor that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform every leaf value (anything but a list or map) before it is
    /// placed in its parent.
    pub fn on_leaf(mut self, hook: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.leaf = Some(Box::new(hook));
        self
    }

    /// Transform every completed list.
    pub fn on_list(mut self, hook: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.list = Some(Box::new(hook));
        self
    }

    /// Transform every completed map.
    pub fn on_map(mut self, hook: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.map = Some(Box::new(hook));
        self
    }

    fn leaf(&self, value: Value) -> Value {
        apply(&self.leaf, value)
    }

    /// A table row with no children: lists and maps stored as row values
    /// (such as the empty containers `fold` records) are completed containers.
    fn row(&self, value: Value) -> Value {
        match value {
            Value::Array(items) => self.list(items),
            Value::Object(map) => self.map(map),
            leaf => self.leaf(leaf),
        }
    }

    fn list(&self, items: Vec<Value>) -> Value {
        apply(&self.list, Value::Array(items))
    }

    fn map(&self, map: Map<String, Value>) -> Value {
        apply(&self.map, Value::Object(map))
    }
}

fn apply(hook: &Option<Hook>, value: Value) -> Value {
    match hook {
        Some(hook) => hook(value),
        None => value,
    }
}

impl fmt::Debug for UnfoldProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnfoldProcessor")
            .field("leaf", &self.leaf.is_some())
            .field("list", &self.list.is_some())
            .field("map", &self.map.is_some())
            .finish()
    }
}

/// Options for [`unfold_with`].
#[derive(Debug)]
pub struct UnfoldOptions {
    /// Return the table `{"": root}` rather than the bare root (default: true)
    pub wrap_root: bool,

    /// Hooks applied during reconstruction (default: identity)
    pub processor: UnfoldProcessor,
}

impl Default for UnfoldOptions {
    fn default() -> Self {
        Self {
            wrap_root: true,
            processor: UnfoldProcessor::default(),
        }
    }
}

impl UnfoldOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the bare root instead of a `{"": root}` table.
    pub fn unwrapped(mut self) -> Self {
        self.wrap_root = false;
        self
    }

    /// Set the hooks applied during reconstruction.
    pub fn processor(mut self, processor: UnfoldProcessor) -> Self {
        self.processor = processor;
        self
    }
}

/// Result of [`unfold_with`].
#[derive(Debug, Clone, PartialEq)]
pub enum Unfolded {
    /// The table `{"": root}`.
    Table(PathDict),
    /// The bare root.
    Root(Value),
}

impl Unfolded {
    /// The root, whichever form was produced.
    pub fn into_root(self) -> Value {
        match self {
            Unfolded::Table(mut table) => table.shift_remove("").unwrap_or(Value::Null),
            Unfolded::Root(root) => root,
        }
    }
}

/// Rebuild the tree described by `paths`, returned as the table `{"": root}`.
pub fn unfold(paths: &PathDict) -> Result<PathDict, Error> {
    let root = unfold_root(paths)?;
    let mut table = PathDict::new();
    table.insert(String::new(), root);
    Ok(table)
}

/// Rebuild the tree described by `paths` and return its root.
pub fn unfold_root(paths: &PathDict) -> Result<Value, Error> {
    rebuild(paths, &UnfoldProcessor::default())
}

/// Rebuild the tree described by `paths` with explicit options.
pub fn unfold_with(paths: &PathDict, options: &UnfoldOptions) -> Result<Unfolded, Error> {
    let root = rebuild(paths, &options.processor)?;
    if options.wrap_root {
        let mut table = PathDict::new();
        table.insert(String::new(), root);
        Ok(Unfolded::Table(table))
    } else {
        Ok(Unfolded::Root(root))
    }
}

/// Order the rows of a partial list and check that the indices run `0..n`.
///
/// Duplicate indices leave a gap, so they are reported the same way.
pub fn complete_partial_list(mut items: Vec<(usize, Value)>) -> Result<Vec<Value>, Error> {
    items.sort_by_key(|(index, _)| *index);
    let mut complete = Vec::with_capacity(items.len());
    for (expected, (index, value)) in items.into_iter().enumerate() {
        if index != expected {
            return Err(Error::bare(ErrorKind::Format { missing: expected }));
        }
        complete.push(value);
    }
    Ok(complete)
}

/// A table row, or a container completed from longer rows.
struct Entry {
    value: Value,
    /// Position of the earliest table row that contributed, to keep map keys
    /// in table order.
    rank: usize,
    /// Completed containers already went through their hook.
    raw: bool,
}

enum Partial {
    List(Vec<(usize, Value)>),
    Map(Map<String, Value>),
}

impl Partial {
    fn for_key(key: &Key) -> Self {
        match key {
            Key::Index(_) => Partial::List(Vec::new()),
            Key::Name(_) => Partial::Map(Map::new()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Partial::List(_) => "list",
            Partial::Map(_) => "map",
        }
    }
}

fn keys_of(path: &str) -> Result<Vec<Key>, Error> {
    parse(path, false)?
        .into_iter()
        .map(|component| match component {
            Component::Key(key) => Ok(key),
            Component::Iterate(point) => Err(Error::new(
                path,
                ErrorKind::IterationNotAllowed {
                    reason: format!("{} is not allowed here", point.describe()),
                },
            )),
        })
        .collect()
}

fn display_keys(keys: &[Key]) -> String {
    let components: Vec<Component> = keys.iter().cloned().map(Component::Key).collect();
    root_or_path(&components)
}

fn rebuild(paths: &PathDict, processor: &UnfoldProcessor) -> Result<Value, Error> {
    if paths.is_empty() {
        return Err(Error::validation("", "paths cannot be empty"));
    }
    if matches!(paths.get(""), Some(root) if !matches!(root, Value::Array(_) | Value::Object(_))) {
        return Err(Error::validation(
            "",
            "existing root path must be list/map",
        ));
    }

    // rows bucketed by path length
    let mut levels: Vec<HashMap<Vec<Key>, Entry>> = Vec::new();
    for (rank, (path, value)) in paths.iter().enumerate() {
        let keys = keys_of(path)?;
        let len = keys.len();
        if levels.len() <= len {
            levels.resize_with(len + 1, HashMap::new);
        }
        levels[len].insert(
            keys,
            Entry {
                value: value.clone(),
                rank,
                raw: true,
            },
        );
    }

    let mut completed: Vec<(Vec<Key>, Entry)> = Vec::new();
    for len in (1..levels.len()).rev() {
        let mut current: Vec<(Vec<Key>, Entry)> = levels[len].drain().collect();
        current.append(&mut completed);
        current.sort_by_key(|(_, entry)| entry.rank);
        debug!("unfolding {} entries of length {}", current.len(), len);

        let mut order: Vec<Vec<Key>> = Vec::new();
        let mut partials: HashMap<Vec<Key>, (Partial, usize)> = HashMap::new();
        for (mut keys, entry) in current {
            let Some(key) = keys.pop() else { continue };
            let value = if entry.raw {
                processor.row(entry.value)
            } else {
                entry.value
            };

            let (partial, _) = partials.entry(keys.clone()).or_insert_with(|| {
                order.push(keys.clone());
                (Partial::for_key(&key), entry.rank)
            });
            match (partial, key) {
                (Partial::List(items), Key::Index(index)) => items.push((index, value)),
                (Partial::Map(map), Key::Name(name)) => {
                    map.insert(name, value);
                }
                (partial, key) => {
                    return Err(Error::validation(
                        display_keys(&keys),
                        format!(
                            "inconsistent types: parent has type {} but key/index {} needs {}",
                            partial.kind(),
                            key,
                            Partial::for_key(&key).kind()
                        ),
                    ));
                }
            }
        }

        for keys in order {
            let Some((partial, rank)) = partials.remove(&keys) else {
                continue;
            };
            let seed = levels[len - 1].remove(&keys);
            let rank = seed.as_ref().map_or(rank, |seed| seed.rank.min(rank));
            let value = complete(&keys, partial, seed.map(|seed| seed.value), processor)?;
            trace!("completed {}", display_keys(&keys));
            completed.push((
                keys,
                Entry {
                    value,
                    rank,
                    raw: false,
                },
            ));
        }
    }

    match completed.pop() {
        Some((_, root)) => Ok(root.value),
        None => {
            // only the root row was given
            let seed = levels
                .first_mut()
                .and_then(|level| level.remove(&Vec::new()))
                .map(|entry| entry.value);
            let partial = match seed {
                Some(Value::Array(_)) => Partial::List(Vec::new()),
                _ => Partial::Map(Map::new()),
            };
            complete(&[], partial, seed, processor)
        }
    }
}

/// Merge `partial` with an existing row at the same path, then close it.
fn complete(
    keys: &[Key],
    partial: Partial,
    seed: Option<Value>,
    processor: &UnfoldProcessor,
) -> Result<Value, Error> {
    match (partial, seed) {
        (Partial::List(mut items), seed) => {
            match seed {
                None => {}
                Some(Value::Array(existing)) => items.extend(existing.into_iter().enumerate()),
                Some(other) => return Err(inconsistent_seed(keys, "list", &other)),
            }
            let items = complete_partial_list(items).map_err(|err| err.within(|| display_keys(keys)))?;
            Ok(processor.list(items))
        }
        (Partial::Map(children), seed) => {
            let mut map = match seed {
                None => Map::new(),
                Some(Value::Object(existing)) => existing,
                Some(other) => return Err(inconsistent_seed(keys, "map", &other)),
            };
            for (name, value) in children {
                map.insert(name, value);
            }
            Ok(processor.map(map))
        }
    }
}

fn inconsistent_seed(keys: &[Key], needed: &'static str, seed: &Value) -> Error {
    Error::validation(
        display_keys(keys),
        format!(
            "inconsistent types: parent has type {} but its children need {}",
            kind_name(seed),
            needed
        ),
    )
}
