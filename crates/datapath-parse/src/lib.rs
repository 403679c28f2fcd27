#![doc = include_str!("../README.md")]
//! Grammar for dotted and bracketed paths into list/map trees.
//!
//! A path is empty (the root), or `.`-separated parts where each part is a
//! map key optionally followed by bracketed segments, or bracketed segments
//! alone: `a.b[3].c`, `[0][1]`, `users[].name`, `rows[1:-1:2]`, `env.*_URL`.

mod component;
mod diagnostic;
mod parser;
mod span;

pub use component::{
    Component, DisplayPath, IterationPoint, Key, RenderError, Slice, SliceIndices, SplitPath,
    Wildcard, render,
};
pub use diagnostic::{ParseError, ParseErrorKind};
pub use parser::Parser;
pub use span::Span;

/// Split a path string into its components.
///
/// When `iterable` is false, `[]`, slices and wildcard keys are rejected
/// with [`ParseErrorKind::IterationNotAllowed`].
pub fn parse(path: &str, iterable: bool) -> Result<SplitPath, ParseError> {
    Parser::new(path).iterable(iterable).parse()
}

/// Split a path string that may contain iteration points.
pub fn parse_iterable(path: &str) -> Result<SplitPath, ParseError> {
    parse(path, true)
}

/// Validate a path string that names a single location.
pub fn validate(path: &str) -> Result<(), ParseError> {
    parse(path, false).map(|_| ())
}

/// Whether `path` is a valid path naming a single location.
pub fn is_path(path: &str) -> bool {
    validate(path).is_ok()
}
