//! Error types.

use std::fmt;

use datapath_parse::{ParseError, ParseErrorKind, RenderError};

/// An error from resolving, iterating, folding or unfolding a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    /// Path walked up to the point of failure (e.g. "server.ports[2]").
    ///
    /// Empty for failures that are not tied to a location, and for plain
    /// leaf lookups, which callers usually handle themselves.
    pub path: String,
    /// Error kind.
    pub kind: ErrorKind,
}

/// Kinds of errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// The path string does not match the grammar.
    Grammar(ParseError),
    /// An iteration component where a single location was required, or an
    /// iteration component applied to the wrong collection kind.
    IterationNotAllowed { reason: String },
    /// A value that should be a list or map is neither.
    TypeValidation { got: &'static str },
    /// A key whose kind does not fit the collection it is applied to.
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
        got: &'static str,
    },
    /// An intermediate key or index was not found.
    PathLookup { key: String },
    /// The final map key was not found.
    KeyNotFound { key: String },
    /// The final list index is past the end of the list.
    IndexOutOfRange { index: usize, len: usize },
    /// A component that cannot be rendered as a path.
    InvalidComponent(RenderError),
    /// Inconsistent or unusable arguments.
    Validation { reason: String },
    /// A list rebuilt by unfold is missing an index.
    Format { missing: usize },
}

impl Error {
    /// Create a new error at `path`.
    pub fn new(path: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Create an error that is not tied to a location.
    pub fn bare(kind: ErrorKind) -> Self {
        Self::new(String::new(), kind)
    }

    pub(crate) fn validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            path,
            ErrorKind::Validation {
                reason: reason.into(),
            },
        )
    }

    /// Prefix the error's path with `context`, unless it already has one.
    pub(crate) fn within(mut self, context: impl FnOnce() -> String) -> Self {
        if self.path.is_empty() {
            self.path = context();
        }
        self
    }

    /// Whether a key or index could not be found, at the leaf or on the way to it.
    pub fn is_lookup(&self) -> bool {
        matches!(self.kind, ErrorKind::PathLookup { .. }) || self.is_leaf_not_found()
    }

    /// Whether only the final key or index was missing.
    ///
    /// This is the failure that a `default` replaces and that `discard` ignores.
    pub fn is_leaf_not_found(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::KeyNotFound { .. } | ErrorKind::IndexOutOfRange { .. }
        )
    }

    /// Whether the path, the components or the tree shape were invalid.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Grammar(_)
                | ErrorKind::TypeValidation { .. }
                | ErrorKind::TypeMismatch { .. }
                | ErrorKind::InvalidComponent(_)
                | ErrorKind::Validation { .. }
                | ErrorKind::Format { .. }
        )
    }

    /// Whether iteration was used where it is not supported.
    pub fn is_iteration_not_allowed(&self) -> bool {
        matches!(self.kind, ErrorKind::IterationNotAllowed { .. })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Grammar(err) => write!(f, "{}", err),
            ErrorKind::IterationNotAllowed { reason } => write!(f, "{}", reason),
            ErrorKind::TypeValidation { got } => {
                write!(f, "object must be list/map, got {}", got)
            }
            ErrorKind::TypeMismatch { key, expected, got } => write!(
                f,
                "key and collection type mismatch; {} key requires {}, got {}",
                key, expected, got
            ),
            ErrorKind::PathLookup { key } => write!(f, "could not find key/index {}", key),
            ErrorKind::KeyNotFound { key } => write!(f, "key {} not found", key),
            ErrorKind::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range for list of length {}", index, len)
            }
            ErrorKind::InvalidComponent(err) => write!(f, "{}", err),
            ErrorKind::Validation { reason } => write!(f, "{}", reason),
            ErrorKind::Format { missing } => write!(f, "did not find index {}", missing),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Grammar(err) => Some(err),
            ErrorKind::InvalidComponent(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        if let ParseErrorKind::IterationNotAllowed { what } = err.kind {
            let reason = format!("{} is not allowed at offset {}", what, err.span.start);
            return Error::bare(ErrorKind::IterationNotAllowed { reason });
        }
        Error::bare(ErrorKind::Grammar(err))
    }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Error::bare(ErrorKind::InvalidComponent(err))
    }
}

/// Name of a value's kind, as used in messages.
pub(crate) fn kind_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Array(_) => "list",
        Value::Object(_) => "map",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "bool",
        Value::Null => "null",
    }
}
