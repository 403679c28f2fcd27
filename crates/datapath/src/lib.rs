#![doc = include_str!("../README.md")]
//! Path access for nested list/map trees.
//!
//! Trees are [`serde_json::Value`]s: arrays are lists, objects are maps
//! (insertion ordered) and everything else is a leaf.
//!
//! # Resolving
//!
//! ```
//! use datapath::{delete, get, put};
//! use serde_json::json;
//!
//! let mut root = json!({"server": {"ports": [80, 443]}});
//! assert_eq!(get(&root, "server.ports[1]", None).unwrap(), &json!(443));
//!
//! put(&mut root, "server.host", json!("example.com")).unwrap();
//! assert_eq!(delete(&mut root, "server.ports[0]").unwrap(), json!(80));
//! assert_eq!(root, json!({"server": {"ports": [443], "host": "example.com"}}));
//! ```
//!
//! # Iterating
//!
//! ```
//! use datapath::iterate;
//! use serde_json::json;
//!
//! let root = json!({"a": [{"b": [1, 2]}, {"b": [3]}]});
//! let paths: Vec<String> = iterate(&root, "a[].b[]", None)
//!     .map(|item| item.map(|(path, _)| path))
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(paths, ["a[0].b[0]", "a[0].b[1]", "a[1].b[0]"]);
//! ```
//!
//! # Folding
//!
//! ```
//! use datapath::{fold, unfold_root};
//! use serde_json::json;
//!
//! let root = json!({"a": {"b": [1, 2]}});
//! let table = fold(&root).unwrap();
//! assert_eq!(table["a.b[1]"], json!(2));
//! assert_eq!(unfold_root(&table).unwrap(), root);
//! ```

mod error;
mod fold;
mod iterate;
mod resolve;
mod tracing_macros;
mod unfold;

pub use datapath_parse::{
    Component, DisplayPath, IterationPoint, Key, ParseError, ParseErrorKind, RenderError, Slice,
    SplitPath, Wildcard, is_path, parse, parse_iterable, render, validate,
};
pub use error::{Error, ErrorKind};
pub use fold::{fold, fold_at};
pub use iterate::{Iter, iterate};
pub use resolve::{
    Slot, SlotRef, delete, discard, get, get_at, get_mut, leaf, leaf_at, leaf_ref, leaf_ref_at,
    put,
};
pub use unfold::{
    UnfoldOptions, UnfoldProcessor, Unfolded, complete_partial_list, unfold, unfold_root,
    unfold_with,
};

/// A flat table mapping path strings to leaf values.
pub type PathDict = serde_json::Map<String, serde_json::Value>;
