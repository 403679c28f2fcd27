//! Path components produced by the parser.
//!
//! A parsed path is an ordered list of [`Component`]s. Each component is
//! either a concrete [`Key`] (a list index or a map key) or an
//! [`IterationPoint`] that expands to zero or more concrete keys when the
//! path is resolved against a tree:
//!
//! - `a` is `Component::Key(Key::Name("a"))`
//! - `[3]` is `Component::Key(Key::Index(3))`
//! - `[]` is `Component::Iterate(IterationPoint::List)`
//! - `[1:-1:2]` is `Component::Iterate(IterationPoint::Slice(..))`
//! - `user_*` is `Component::Iterate(IterationPoint::Wildcard(..))`

use std::fmt;

/// A parsed path: the empty path denotes the root itself.
pub type SplitPath = Vec<Component>;

/// A concrete step into a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// A list index.
    Index(usize),
    /// A map key.
    Name(String),
}

impl Key {
    /// Get the index, if this is a list index.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Name(_) => None,
        }
    }

    /// Get the name, if this is a map key.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name),
            Key::Index(_) => None,
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// A list slice `[start:stop:step]`.
///
/// Bounds resolve like conventional sequence slicing: negative values count
/// from the end of the list and out-of-range bounds are clamped, so a slice
/// never fails against a list of any length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Slice {
    /// First index (default: 0, or the last index when stepping backwards).
    pub start: Option<i64>,
    /// Exclusive end (default: unbounded).
    pub stop: Option<i64>,
    /// Step between indices (default: 1). Never zero.
    pub step: Option<i64>,
    /// Whether the second `:` was written, so `[::]` renders back as written.
    pub explicit_step: bool,
}

impl Slice {
    /// Create a `[start:stop]` slice.
    pub fn new(start: Option<i64>, stop: Option<i64>) -> Self {
        Self {
            start,
            stop,
            step: None,
            explicit_step: false,
        }
    }

    /// Add a step field, making this a `[start:stop:step]` slice.
    pub fn with_step(mut self, step: Option<i64>) -> Self {
        self.step = step;
        self.explicit_step = true;
        self
    }

    /// Resolve the slice against a list of `len` elements.
    pub fn indices(&self, len: usize) -> SliceIndices {
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return SliceIndices {
                next: 0,
                stop: 0,
                step: 1,
            };
        }

        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
        let clamp = |bound: Option<i64>, default: i64| match bound {
            None => default,
            Some(bound) if bound < 0 => (bound + len).max(lower),
            Some(bound) => bound.min(upper),
        };

        let (start, stop) = if step < 0 {
            (clamp(self.start, upper), clamp(self.stop, lower))
        } else {
            (clamp(self.start, lower), clamp(self.stop, upper))
        };

        SliceIndices {
            next: start,
            stop,
            step,
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn bound(f: &mut fmt::Formatter<'_>, bound: Option<i64>) -> fmt::Result {
            match bound {
                Some(value) => write!(f, "{value}"),
                None => Ok(()),
            }
        }

        f.write_str("[")?;
        bound(f, self.start)?;
        f.write_str(":")?;
        bound(f, self.stop)?;
        if self.explicit_step || self.step.is_some() {
            f.write_str(":")?;
            bound(f, self.step)?;
        }
        f.write_str("]")
    }
}

/// Iterator over the list indices selected by a [`Slice`].
#[derive(Debug, Clone)]
pub struct SliceIndices {
    next: i64,
    stop: i64,
    step: i64,
}

impl Iterator for SliceIndices {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let in_range = if self.step > 0 {
            self.next < self.stop
        } else {
            self.next > self.stop
        };
        if !in_range {
            return None;
        }

        let current = self.next;
        self.next = current.checked_add(self.step).unwrap_or(self.stop);
        usize::try_from(current).ok()
    }
}

/// A map key pattern where `*` matches any substring.
///
/// The match is anchored to the whole key; a bare `*` matches every key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Wildcard(String);

impl Wildcard {
    /// Create a wildcard from its literal pattern text.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// The pattern as written.
    pub fn pattern(&self) -> &str {
        &self.0
    }

    /// Check whether `key` matches this pattern.
    pub fn matches(&self, key: &str) -> bool {
        let Some((head, tail)) = self.0.split_once('*') else {
            return key == self.0;
        };
        let Some(mut rest) = key.strip_prefix(head) else {
            return false;
        };

        let mut literals: Vec<&str> = tail.split('*').collect();
        let last = literals.pop().unwrap_or("");

        // leftmost placement of each literal keeps the most room for the rest
        for literal in literals {
            match rest.find(literal) {
                Some(at) => rest = &rest[at + literal.len()..],
                None => return false,
            }
        }

        rest.ends_with(last)
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A component that expands to many concrete keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IterationPoint {
    /// `[]`: every index of a list, ascending.
    List,
    /// `[start:stop:step]`: the indices selected by a slice.
    Slice(Slice),
    /// `pat*tern`: every map key matching the pattern.
    Wildcard(Wildcard),
}

impl IterationPoint {
    /// Whether this iteration point walks a list (as opposed to a map).
    pub fn requires_list(&self) -> bool {
        matches!(self, IterationPoint::List | IterationPoint::Slice(_))
    }

    /// Human readable name, used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            IterationPoint::List => "list iteration",
            IterationPoint::Slice(_) => "slice iteration",
            IterationPoint::Wildcard(_) => "wildcard key",
        }
    }
}

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Component {
    /// A concrete index or key.
    Key(Key),
    /// A point that expands to many keys.
    Iterate(IterationPoint),
}

impl Component {
    /// Create an index component.
    pub fn index(index: usize) -> Self {
        Component::Key(Key::Index(index))
    }

    /// Create a map key component.
    pub fn name(name: impl Into<String>) -> Self {
        Component::Key(Key::Name(name.into()))
    }

    /// Create a wildcard component.
    pub fn wildcard(pattern: impl Into<String>) -> Self {
        Component::Iterate(IterationPoint::Wildcard(Wildcard::new(pattern)))
    }

    /// Get the concrete key, if this is not an iteration point.
    pub fn as_key(&self) -> Option<&Key> {
        match self {
            Component::Key(key) => Some(key),
            Component::Iterate(_) => None,
        }
    }

    /// Get the iteration point, if this is one.
    pub fn as_iteration(&self) -> Option<&IterationPoint> {
        match self {
            Component::Iterate(point) => Some(point),
            Component::Key(_) => None,
        }
    }

    /// Whether this is an iteration point.
    pub fn is_iteration(&self) -> bool {
        matches!(self, Component::Iterate(_))
    }

    /// Check that the grammar could have produced this component.
    fn check(&self) -> Result<(), &'static str> {
        match self {
            Component::Key(Key::Index(_)) | Component::Iterate(IterationPoint::List) => Ok(()),
            Component::Key(Key::Name(name)) => {
                check_key_text(name)?;
                if name.contains('*') {
                    return Err("map keys cannot contain '*' (use a wildcard)");
                }
                Ok(())
            }
            Component::Iterate(IterationPoint::Wildcard(wildcard)) => {
                check_key_text(wildcard.pattern())?;
                if !wildcard.pattern().contains('*') {
                    return Err("wildcard patterns must contain '*'");
                }
                Ok(())
            }
            Component::Iterate(IterationPoint::Slice(slice)) => {
                if slice.step == Some(0) {
                    return Err("slice step cannot be zero");
                }
                if slice.step.is_some() && !slice.explicit_step {
                    return Err("slice step is set but not marked explicit");
                }
                Ok(())
            }
        }
    }
}

fn check_key_text(text: &str) -> Result<(), &'static str> {
    if text.is_empty() {
        return Err("map keys cannot be empty");
    }
    if text.contains(['[', ']', '.']) {
        return Err("map keys cannot contain '[', ']' or '.'");
    }
    Ok(())
}

impl From<Key> for Component {
    fn from(key: Key) -> Self {
        Component::Key(key)
    }
}

impl From<IterationPoint> for Component {
    fn from(point: IterationPoint) -> Self {
        Component::Iterate(point)
    }
}

/// Error returned by [`render`] for a component the grammar cannot express.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    /// Position of the offending component.
    pub index: usize,
    /// Why it cannot be rendered.
    pub reason: &'static str,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index {} is invalid: {}", self.index, self.reason)
    }
}

impl std::error::Error for RenderError {}

/// Render components back to their canonical path string.
///
/// This is the inverse of [`parse`](crate::parse): `render(&parse(s)?)` gives
/// back `s` for every valid path.
pub fn render(path: &[Component]) -> Result<String, RenderError> {
    for (index, component) in path.iter().enumerate() {
        component
            .check()
            .map_err(|reason| RenderError { index, reason })?;
    }
    Ok(DisplayPath(path).to_string())
}

/// Renders components without validating them, for messages and logs.
#[derive(Debug, Clone, Copy)]
pub struct DisplayPath<'a>(pub &'a [Component]);

impl fmt::Display for DisplayPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, component) in self.0.iter().enumerate() {
            match component {
                Component::Key(Key::Name(name)) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                Component::Iterate(IterationPoint::Wildcard(wildcard)) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(wildcard.pattern())?;
                }
                Component::Key(Key::Index(index)) => write!(f, "[{index}]")?,
                Component::Iterate(IterationPoint::List) => f.write_str("[]")?,
                Component::Iterate(IterationPoint::Slice(slice)) => write!(f, "{slice}")?,
            }
        }
        Ok(())
    }
}
