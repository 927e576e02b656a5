//! Source positions and ranges.
//!
//! Lines are 1-based, columns are 0-based and counted in characters. A span
//! is half-open: it starts at `(line, start_col)` and ends just before
//! `(end_line, end_col)`.

use serde::Serialize;

/// A point in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    pub fn new(line: u32, col: u32) -> Self {
        Position { line, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Span {
            line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A zero-width span, used for ERROR nodes synthesized at end of input.
    pub fn empty_at(at: Position) -> Self {
        Span::new(at.line, at.col, at.line, at.col)
    }

    pub fn start(&self) -> Position {
        Position::new(self.line, self.start_col)
    }

    pub fn end(&self) -> Position {
        Position::new(self.end_line, self.end_col)
    }

    /// The span running from the start of `self` to the end of `other`.
    pub fn to(&self, other: &Span) -> Span {
        Span::new(self.line, self.start_col, other.end_line, other.end_col)
    }

    pub fn is_multiline(&self) -> bool {
        self.end_line > self.line
    }

    /// Whether `at` falls inside this span: on an interior line, or on the
    /// first/last line within the column bound.
    pub fn contains(&self, at: Position) -> bool {
        if at.line < self.line || at.line > self.end_line {
            return false;
        }
        if at.line == self.line && at.col < self.start_col {
            return false;
        }
        if at.line == self.end_line && at.col >= self.end_col {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_span_is_half_open() {
        let span = Span::new(3, 2, 3, 5);
        assert!(!span.contains(Position::new(3, 1)));
        assert!(span.contains(Position::new(3, 2)));
        assert!(span.contains(Position::new(3, 4)));
        assert!(!span.contains(Position::new(3, 5)));
        assert!(!span.contains(Position::new(2, 3)));
    }

    #[test]
    fn multiline_span_contains_interior_lines() {
        let span = Span::new(1, 4, 3, 1);
        assert!(span.contains(Position::new(1, 10)));
        assert!(span.contains(Position::new(2, 0)));
        assert!(span.contains(Position::new(3, 0)));
        assert!(!span.contains(Position::new(3, 1)));
        assert!(!span.contains(Position::new(1, 3)));
    }

    #[test]
    fn empty_span_contains_nothing() {
        let span = Span::empty_at(Position::new(2, 4));
        assert!(!span.contains(Position::new(2, 4)));
    }
}
