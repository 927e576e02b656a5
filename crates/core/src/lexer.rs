//! Tokenizer for both Epilog grammars.
//!
//! The lexer is total: every character of the input ends up in exactly one
//! token, whitespace and comments included, so concatenating the token
//! texts reproduces the source. Malformed input yields `TokenKind::Error`
//! tokens inline and lexing carries on.

use serde::Serialize;

use crate::dialect::Grammar;
use crate::span::Span;

pub const UNTERMINATED_STRING: &str = "Unterminated string";
pub const ANONYMOUS_VARIABLE: &str = "Anonymous variable found where a term was expected";
pub const LEADING_UNDERSCORE: &str = "Constants cannot start with underscore";
pub const UNEXPECTED_CHARACTER: &str = "Unexpected character";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Whitespace,
    Comment,
    /// Constants and functor names
    Symbol,
    Number,
    Str,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    /// `!`
    ListSeparator,
    Comma,
    Period,
    /// `&`
    Ampersand,
    /// `~`
    Negation,
    // Ruleset only
    Variable,
    AnonymousVariable,
    /// `:-`
    RuleNeck,
    /// `::`
    DoubleColon,
    /// `:=`
    DefinitionSeparator,
    /// `==>`
    Arrow,
    Error,
}

impl TokenKind {
    /// Whitespace and comments.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Token {
    /// True for a whitespace token that ends a source line.
    pub fn contains_newline(&self) -> bool {
        self.span.is_multiline()
    }
}

pub fn lex(src: &str, grammar: Grammar) -> Vec<Token> {
    let mut lexer = Lexer {
        chars: src.chars().collect(),
        pos: 0,
        line: 1,
        line_start: 0,
        grammar,
        tokens: Vec::new(),
    };
    lexer.run();
    lexer.tokens
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    line_start: usize,
    grammar: Grammar,
    tokens: Vec<Token>,
}

/// Where the token currently being scanned began.
#[derive(Clone, Copy)]
struct Mark {
    pos: usize,
    line: u32,
    col: u32,
}

impl Lexer {
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            col: (self.pos - self.line_start) as u32,
        }
    }

    fn emit(&mut self, kind: TokenKind, start: Mark, error: Option<String>) {
        let text: String = self.chars[start.pos..self.pos].iter().collect();
        let span = Span::new(
            start.line,
            start.col,
            self.line,
            (self.pos - self.line_start) as u32,
        );
        self.tokens.push(Token {
            kind,
            span,
            text,
            error,
        });
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek_at(0).is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn run(&mut self) {
        while let Some(c) = self.peek_at(0) {
            let start = self.mark();

            if c.is_whitespace() {
                self.whitespace();
                self.emit(TokenKind::Whitespace, start, None);
                continue;
            }

            if c == '%' {
                self.eat_while(|c| c != '\n');
                self.emit(TokenKind::Comment, start, None);
                continue;
            }

            if c == '"' {
                self.string(start);
                continue;
            }

            if c.is_ascii_digit()
                || (c == '-' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()))
            {
                self.number();
                self.emit(TokenKind::Number, start, None);
                continue;
            }

            if c.is_ascii_lowercase() {
                self.constant();
                self.emit(TokenKind::Symbol, start, None);
                continue;
            }

            if let Some(kind) = punctuation(c) {
                self.pos += 1;
                self.emit(kind, start, None);
                continue;
            }

            match self.grammar {
                Grammar::Ruleset => {
                    if c == '_' || c.is_ascii_uppercase() {
                        self.variable(start);
                        continue;
                    }
                    if c == ':' || c == '=' {
                        self.operator(start);
                        continue;
                    }
                }
                Grammar::Dataset => {
                    if c == '_' {
                        self.underscore_constant(start);
                        continue;
                    }
                }
            }

            self.pos += 1;
            self.emit(
                TokenKind::Error,
                start,
                Some(format!("{} '{}'", UNEXPECTED_CHARACTER, c)),
            );
        }
    }

    /// Consume whitespace, including at most one newline.
    fn whitespace(&mut self) {
        let mut seen_newline = false;
        while let Some(c) = self.peek_at(0) {
            if !c.is_whitespace() {
                break;
            }
            self.pos += 1;
            if c == '\n' {
                if seen_newline {
                    self.pos -= 1;
                    break;
                }
                seen_newline = true;
                self.line += 1;
                self.line_start = self.pos;
            }
        }
    }

    fn number(&mut self) {
        if self.peek_at(0) == Some('-') {
            self.pos += 1;
        }
        self.eat_while(|c| c.is_ascii_digit());
        if self.peek_at(0) == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            self.eat_while(|c| c.is_ascii_digit());
        }
    }

    /// `[a-z0-9][a-z0-9_.]*`, where a `.` only continues the constant when
    /// another constant character follows it.
    fn constant(&mut self) {
        self.pos += 1;
        loop {
            match self.peek_at(0) {
                Some(c) if is_constant_char(c) => self.pos += 1,
                Some('.') if self.peek_at(1).is_some_and(is_constant_char) => self.pos += 1,
                _ => break,
            }
        }
    }

    fn underscore_constant(&mut self, start: Mark) {
        self.pos += 1;
        if self.peek_at(0).is_some_and(is_word_char) {
            self.eat_while(is_word_char);
            self.emit(TokenKind::Error, start, Some(LEADING_UNDERSCORE.to_owned()));
        } else {
            self.emit(TokenKind::Error, start, Some(ANONYMOUS_VARIABLE.to_owned()));
        }
    }

    fn variable(&mut self, start: Mark) {
        let anonymous = self.peek_at(0) == Some('_') && !self.peek_at(1).is_some_and(is_word_char);
        self.pos += 1;
        if anonymous {
            self.emit(TokenKind::AnonymousVariable, start, None);
        } else {
            self.eat_while(is_word_char);
            self.emit(TokenKind::Variable, start, None);
        }
    }

    fn string(&mut self, start: Mark) {
        self.pos += 1;
        self.eat_while(|c| c != '"' && c != '\n');
        if self.peek_at(0) == Some('"') {
            self.pos += 1;
            self.emit(TokenKind::Str, start, None);
        } else {
            self.emit(
                TokenKind::Error,
                start,
                Some(UNTERMINATED_STRING.to_owned()),
            );
        }
    }

    /// `:-`, `::`, `:=` and `==>`.
    fn operator(&mut self, start: Mark) {
        let first = self.peek_at(0);
        let second = self.peek_at(1);
        let (kind, width) = match (first, second) {
            (Some(':'), Some('-')) => (Some(TokenKind::RuleNeck), 2),
            (Some(':'), Some(':')) => (Some(TokenKind::DoubleColon), 2),
            (Some(':'), Some('=')) => (Some(TokenKind::DefinitionSeparator), 2),
            (Some('='), Some('=')) if self.peek_at(2) == Some('>') => (Some(TokenKind::Arrow), 3),
            (Some('='), Some('=')) => (None, 2),
            _ => (None, 1),
        };
        self.pos += width;
        match kind {
            Some(kind) => self.emit(kind, start, None),
            None => {
                let message = if first == Some(':') {
                    "Expected ':-', '::' or ':=' after ':'"
                } else {
                    "Expected '==>'"
                };
                self.emit(TokenKind::Error, start, Some(message.to_owned()));
            }
        }
    }
}

fn is_constant_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn punctuation(c: char) -> Option<TokenKind> {
    let kind = match c {
        '(' => TokenKind::OpenParen,
        ')' => TokenKind::CloseParen,
        '[' => TokenKind::OpenBracket,
        ']' => TokenKind::CloseBracket,
        '!' => TokenKind::ListSeparator,
        ',' => TokenKind::Comma,
        '.' => TokenKind::Period,
        '&' => TokenKind::Ampersand,
        '~' => TokenKind::Negation,
        _ => return None,
    };
    Some(kind)
}
