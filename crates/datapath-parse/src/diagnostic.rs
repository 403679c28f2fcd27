//! Diagnostic rendering for path grammar errors.

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::Span;

/// Get ariadne config, respecting NO_COLOR env var.
fn ariadne_config() -> Config {
    let no_color = std::env::var("NO_COLOR").is_ok();
    if no_color {
        Config::default().with_color(false)
    } else {
        Config::default()
    }
}

/// What went wrong while parsing a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A character that cannot appear at this position.
    UnexpectedChar(char),
    /// A `.` with no key on one side of it.
    EmptyKey,
    /// A `[` with no matching `]`.
    UnclosedBracket,
    /// Bracket content that is not a number.
    InvalidNumber,
    /// A number written with leading zeros (or as `-0`).
    LeadingZero,
    /// A plain index with a minus sign.
    NegativeIndex,
    /// A slice with a step of zero.
    ZeroStep,
    /// A slice with more than two `:`.
    TooManyColons,
    /// An iteration component in a path that must name a single location.
    IterationNotAllowed {
        /// The kind of iteration that was found (e.g. "list iteration").
        what: &'static str,
    },
}

/// A path grammar error with its location in the path string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// Location in the path string.
    pub span: Span,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Whether this error only rejects iteration (the path is otherwise valid).
    pub fn is_iteration_not_allowed(&self) -> bool {
        matches!(self.kind, ParseErrorKind::IterationNotAllowed { .. })
    }

    /// Render this error with ariadne.
    ///
    /// `source` must be the path string that produced the error.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let report = self.build_report(filename);
        let _ = report
            .with_config(ariadne_config())
            .finish()
            .write((filename, Source::from(source)), writer);
    }

    fn build_report<'a>(
        &self,
        filename: &'a str,
    ) -> ariadne::ReportBuilder<'static, (&'a str, std::ops::Range<usize>)> {
        let range: std::ops::Range<usize> = self.span.into();
        // ariadne needs something to point at, even for end-of-input errors
        let range = if range.is_empty() {
            range.start..range.start + 1
        } else {
            range
        };

        let report = Report::build(ReportKind::Error, (filename, range.clone()))
            .with_message(self.message());

        match &self.kind {
            ParseErrorKind::UnexpectedChar(c) => report
                .with_label(
                    Label::new((filename, range))
                        .with_message(format!("'{}' is not allowed here", c))
                        .with_color(Color::Red),
                )
                .with_help("keys cannot contain '[', ']' or '.'; brackets hold an index or slice"),

            ParseErrorKind::EmptyKey => report
                .with_label(
                    Label::new((filename, range))
                        .with_message("expected a key here")
                        .with_color(Color::Red),
                )
                .with_help("'.' must separate two non-empty parts"),

            ParseErrorKind::UnclosedBracket => report
                .with_label(
                    Label::new((filename, range))
                        .with_message("bracket opened here")
                        .with_color(Color::Red),
                )
                .with_help("add a closing ']'"),

            ParseErrorKind::InvalidNumber => report.with_label(
                Label::new((filename, range))
                    .with_message("not an integer")
                    .with_color(Color::Red),
            ),

            ParseErrorKind::LeadingZero => report
                .with_label(
                    Label::new((filename, range))
                        .with_message("non-canonical number")
                        .with_color(Color::Red),
                )
                .with_help("write numbers without leading zeros"),

            ParseErrorKind::NegativeIndex => report
                .with_label(
                    Label::new((filename, range))
                        .with_message("negative index")
                        .with_color(Color::Red),
                )
                .with_help("list indices are non-negative; use a slice like [-1:] to count from the end"),

            ParseErrorKind::ZeroStep => report.with_label(
                Label::new((filename, range))
                    .with_message("step of zero")
                    .with_color(Color::Red),
            ),

            ParseErrorKind::TooManyColons => report
                .with_label(
                    Label::new((filename, range))
                        .with_message("too many fields")
                        .with_color(Color::Red),
                )
                .with_help("slices take the form [start:stop] or [start:stop:step]"),

            ParseErrorKind::IterationNotAllowed { what } => report
                .with_label(
                    Label::new((filename, range))
                        .with_message(format!("{} here", what))
                        .with_color(Color::Red),
                )
                .with_help("this operation needs a path to exactly one location"),
        }
    }

    fn message(&self) -> String {
        match &self.kind {
            ParseErrorKind::UnexpectedChar(c) => format!("unexpected character '{}'", c),
            ParseErrorKind::EmptyKey => "empty key".to_string(),
            ParseErrorKind::UnclosedBracket => "unclosed bracket".to_string(),
            ParseErrorKind::InvalidNumber => "invalid number".to_string(),
            ParseErrorKind::LeadingZero => "number has leading zeros".to_string(),
            ParseErrorKind::NegativeIndex => "list index must be non-negative".to_string(),
            ParseErrorKind::ZeroStep => "slice step cannot be zero".to_string(),
            ParseErrorKind::TooManyColons => "slice has more than three fields".to_string(),
            ParseErrorKind::IterationNotAllowed { what } => format!("{} is not allowed", what),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid path string: {} at offset {}", self.message(), self.span.start)
    }
}

impl std::error::Error for ParseError {}
