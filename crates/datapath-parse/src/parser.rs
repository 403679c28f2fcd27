//! Scanner and parser for path strings.

use tracing::trace;

use crate::{Component, IterationPoint, Key, ParseError, ParseErrorKind, Slice, Span, Wildcard};

/// A parser that turns a path string into components.
#[derive(Clone)]
pub struct Parser<'src> {
    /// The path being parsed.
    source: &'src str,
    /// The remaining text (suffix of `source`).
    remaining: &'src str,
    /// Current byte position in `source`.
    pos: u32,
    /// Whether iteration components are accepted.
    iterable: bool,
}

impl<'src> Parser<'src> {
    /// Create a parser that rejects iteration components.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            remaining: source,
            pos: 0,
            iterable: false,
        }
    }

    /// Allow (or forbid) `[]`, slices and wildcard keys.
    pub fn iterable(mut self, iterable: bool) -> Self {
        self.iterable = iterable;
        self
    }

    /// Parse the whole path.
    pub fn parse(mut self) -> Result<Vec<Component>, ParseError> {
        let mut components = Vec::new();
        if self.source.is_empty() {
            return Ok(components);
        }

        loop {
            self.parse_part(&mut components)?;

            match self.peek() {
                None => break,
                Some('.') => {
                    let dot = self.pos;
                    self.advance();
                    if self.is_eof() {
                        return Err(self.error(ParseErrorKind::EmptyKey, dot, dot + 1));
                    }
                    // brackets attach to the preceding part, never after a dot
                    if self.peek() == Some('[') {
                        return Err(self.unexpected('['));
                    }
                }
                Some(c) => return Err(self.unexpected(c)),
            }
        }

        Ok(components)
    }

    /// Parse one `.`-separated part: `key`, `key[..]..` or `[..]..`.
    fn parse_part(&mut self, components: &mut Vec<Component>) -> Result<(), ParseError> {
        match self.peek() {
            Some('[') => {}
            Some('.') => {
                // a part can only be empty when two dots meet, or at the very start
                return Err(self.error(ParseErrorKind::EmptyKey, self.pos, self.pos + 1));
            }
            Some(']') => return Err(self.unexpected(']')),
            Some(_) => components.push(self.parse_key()?),
            None => return Err(self.error(ParseErrorKind::EmptyKey, self.pos, self.pos)),
        }

        while self.peek() == Some('[') {
            components.push(self.parse_bracket()?);
        }
        Ok(())
    }

    fn parse_key(&mut self) -> Result<Component, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '[' | '.') {
                break;
            }
            if c == ']' {
                return Err(self.unexpected(c));
            }
            self.advance();
        }

        let source = self.source;
        let text = &source[start as usize..self.pos as usize];
        trace!("Key {:?} at {}..{}", text, start, self.pos);
        if text.contains('*') {
            let point = IterationPoint::Wildcard(Wildcard::new(text));
            return self.iteration(point, start);
        }
        Ok(Component::Key(Key::Name(text.to_string())))
    }

    fn parse_bracket(&mut self) -> Result<Component, ParseError> {
        let start = self.pos;
        self.advance();
        let content_start = self.pos;

        loop {
            match self.peek() {
                None => return Err(self.error(ParseErrorKind::UnclosedBracket, start, self.pos)),
                Some(']') => break,
                Some(c) if c.is_ascii_digit() || c == '-' || c == ':' => {
                    self.advance();
                }
                Some(c) => return Err(self.unexpected(c)),
            }
        }

        let source = self.source;
        let content = &source[content_start as usize..self.pos as usize];
        self.advance();
        trace!("Bracket {:?} at {}..{}", content, start, self.pos);

        if content.is_empty() {
            return self.iteration(IterationPoint::List, start);
        }

        if !content.contains(':') {
            if content.starts_with('-') {
                return Err(self.error(ParseErrorKind::NegativeIndex, content_start, self.pos - 1));
            }
            let index = self.number(content, content_start)?;
            let index = usize::try_from(index).map_err(|_| {
                self.error(ParseErrorKind::InvalidNumber, content_start, self.pos - 1)
            })?;
            return Ok(Component::Key(Key::Index(index)));
        }

        let mut fields = Vec::with_capacity(3);
        let mut offset = content_start;
        for field in content.split(':') {
            if fields.len() == 3 {
                return Err(self.error(ParseErrorKind::TooManyColons, start, self.pos));
            }
            let bound = if field.is_empty() {
                None
            } else {
                Some(self.number(field, offset)?)
            };
            fields.push(bound);
            offset += field.len() as u32 + 1;
        }

        let mut slice = Slice::new(fields[0], fields[1]);
        if let Some(&step) = fields.get(2) {
            if step == Some(0) {
                let step_start = offset - 2;
                return Err(self.error(ParseErrorKind::ZeroStep, step_start, step_start + 1));
            }
            slice = slice.with_step(step);
        }
        self.iteration(IterationPoint::Slice(slice), start)
    }

    /// Parse a canonical `-?digits` number found at `start`.
    fn number(&self, text: &str, start: u32) -> Result<i64, ParseError> {
        let end = start + text.len() as u32;
        let digits = text.strip_prefix('-').unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.error(ParseErrorKind::InvalidNumber, start, end));
        }
        if (digits.len() > 1 && digits.starts_with('0')) || text == "-0" {
            return Err(self.error(ParseErrorKind::LeadingZero, start, end));
        }
        text.parse()
            .map_err(|_| self.error(ParseErrorKind::InvalidNumber, start, end))
    }

    /// Accept an iteration point, or reject it when iteration is forbidden.
    fn iteration(&self, point: IterationPoint, start: u32) -> Result<Component, ParseError> {
        if !self.iterable {
            let kind = ParseErrorKind::IterationNotAllowed {
                what: point.describe(),
            };
            return Err(self.error(kind, start, self.pos));
        }
        Ok(Component::Iterate(point))
    }

    /// Peek at the next character without consuming it.
    #[inline]
    fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    /// Check if we're at the end of input.
    #[inline]
    fn is_eof(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Advance by one character.
    #[inline]
    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8() as u32;
            self.remaining = &self.remaining[c.len_utf8()..];
        }
    }

    fn unexpected(&self, c: char) -> ParseError {
        self.error(
            ParseErrorKind::UnexpectedChar(c),
            self.pos,
            self.pos + c.len_utf8() as u32,
        )
    }

    fn error(&self, kind: ParseErrorKind, start: u32, end: u32) -> ParseError {
        ParseError::new(kind, Span::new(start, end))
    }
}
