//! Column conversion between analysis positions and the client.
//!
//! Analysis columns count chars. LSP positions count UTF-16 code units
//! unless the client offers UTF-32, in which case chars go out unchanged.

use epilog_core::Range;
use lsp_types::{ClientCapabilities, PositionEncodingKind};

/// Position encoding agreed with the client during initialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf16,
    Utf32,
}

impl Encoding {
    /// UTF-32 when the client lists it, otherwise the mandatory UTF-16.
    pub fn negotiate(capabilities: &ClientCapabilities) -> Self {
        let offered = capabilities
            .general
            .as_ref()
            .and_then(|g| g.position_encodings.as_ref());
        match offered {
            Some(kinds) if kinds.contains(&PositionEncodingKind::UTF32) => Encoding::Utf32,
            _ => Encoding::Utf16,
        }
    }

    pub fn kind(self) -> PositionEncodingKind {
        match self {
            Encoding::Utf16 => PositionEncodingKind::UTF16,
            Encoding::Utf32 => PositionEncodingKind::UTF32,
        }
    }
}

/// Per-line column mapping for one document. Lines are 0-based.
pub struct LineIndex<'a> {
    lines: Vec<&'a str>,
    encoding: Encoding,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str, encoding: Encoding) -> Self {
        LineIndex {
            lines: text.split('\n').collect(),
            encoding,
        }
    }

    /// Client column for the char column `col` on `line`.
    pub fn to_client(&self, line: u32, col: u32) -> u32 {
        match (self.encoding, self.lines.get(line as usize)) {
            (Encoding::Utf16, Some(text)) => {
                let head = text.chars().take(col as usize);
                let units: usize = head.clone().map(char::len_utf16).sum();
                // Columns past the end of the line stay one unit per char.
                let past_end = (col as usize).saturating_sub(head.count());
                (units + past_end) as u32
            }
            _ => col,
        }
    }

    /// Char column for the client column `col` on `line`. A column inside
    /// a surrogate pair maps to the char it splits.
    pub fn from_client(&self, line: u32, col: u32) -> u32 {
        let (Encoding::Utf16, Some(text)) = (self.encoding, self.lines.get(line as usize)) else {
            return col;
        };
        let mut units = 0;
        let mut chars = 0;
        for c in text.chars() {
            let next = units + c.len_utf16() as u32;
            if next > col {
                return chars;
            }
            units = next;
            chars += 1;
        }
        chars + (col - units)
    }

    pub fn range(&self, range: Range) -> lsp_types::Range {
        lsp_types::Range::new(
            lsp_types::Position::new(
                range.start_line,
                self.to_client(range.start_line, range.start_col),
            ),
            lsp_types::Position::new(
                range.end_line,
                self.to_client(range.end_line, range.end_col),
            ),
        )
    }
}
