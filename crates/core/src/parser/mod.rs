//! Error-tolerant recursive-descent parser for both Epilog grammars.
//!
//! Productions are functions from a [`Cursor`] to `Option<(Node, Cursor)>`.
//! `None` means "this alternative does not start here" and leaves the
//! caller's cursor untouched, so trying the next alternative is just a
//! matter of reusing the cursor it already holds. When a construct has
//! started but a required piece is missing, the parser recovers by turning
//! the rest of the current source line into an ERROR node.

use std::cell::Cell;

use crate::ast::{Branch, ErrorNode, Node};
use crate::dialect::Grammar;
use crate::lexer::{self, Token, TokenKind};
use crate::span::{Position, Span};

mod dataset;
mod ruleset;
mod terms;

pub const EXPECTED_FACT: &str = "Expected a fact";
pub const EXPECTED_STATEMENT: &str = "Expected a rule, definition or operation";
pub const EXPECTED_TERM: &str = "Expected a term";
pub const AT_LEAST_ONE_LITERAL: &str = "At least one literal was expected";
pub const NESTED_TOO_DEEPLY: &str = "Term is nested too deeply";

/// Deepest term nesting the parser descends into. Anything below it on the
/// same line becomes an ERROR node, which keeps recursion off the end of
/// the stack.
pub const MAX_TERM_DEPTH: usize = 128;

/// A position in the token buffer. Cheap to copy; restoring a cursor is
/// all the backtracking the grammar needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    pos: usize,
}

impl Cursor {
    pub fn start() -> Self {
        Cursor { pos: 0 }
    }

    fn next(self) -> Cursor {
        Cursor { pos: self.pos + 1 }
    }
}

/// Parse a token sequence into a single `DATASET` or `RULESET` root.
pub fn parse(tokens: &[Token], grammar: Grammar) -> Node {
    let parser = Parser {
        tokens,
        grammar,
        depth: Cell::new(0),
    };
    match grammar {
        Grammar::Dataset => parser.dataset(),
        Grammar::Ruleset => parser.ruleset(),
    }
}

/// Lex and parse in one step.
pub fn parse_source(src: &str, grammar: Grammar) -> Node {
    let tokens = lexer::lex(src, grammar);
    parse(&tokens, grammar)
}

struct Parser<'a> {
    tokens: &'a [Token],
    grammar: Grammar,
    /// Terms currently open on the call stack.
    depth: Cell<usize>,
}

impl<'a> Parser<'a> {
    fn token(&self, at: Cursor) -> Option<&'a Token> {
        self.tokens.get(at.pos)
    }

    fn kind(&self, at: Cursor) -> Option<TokenKind> {
        self.token(at).map(|t| t.kind)
    }

    fn at_end(&self, at: Cursor) -> bool {
        at.pos >= self.tokens.len()
    }

    /// The first non-trivia cursor at or after `at`.
    fn skip_trivia(&self, at: Cursor) -> Cursor {
        let mut cur = at;
        while self.kind(cur).is_some_and(TokenKind::is_trivia) {
            cur = cur.next();
        }
        cur
    }

    /// Kind of the next significant token, looking past trivia.
    fn peek_significant(&self, at: Cursor) -> Option<TokenKind> {
        self.kind(self.skip_trivia(at))
    }

    /// Leaf nodes for the tokens in `[from, to)`.
    fn leaves(&self, from: Cursor, to: Cursor) -> impl Iterator<Item = Node> + 'a {
        let tokens: &'a [Token] = self.tokens;
        tokens[from.pos..to.pos.min(tokens.len())]
            .iter()
            .cloned()
            .map(Node::Token)
    }

    /// Append the trivia before the next significant token to `children`
    /// and return the cursor of that token.
    fn take_trivia(&self, children: &mut Vec<Node>, at: Cursor) -> Cursor {
        let sig = self.skip_trivia(at);
        children.extend(self.leaves(at, sig));
        sig
    }

    /// If the next significant token is `kind`, append it (with the trivia
    /// before it) to `children` and return the cursor after it.
    fn eat(&self, children: &mut Vec<Node>, at: Cursor, kind: TokenKind) -> Option<Cursor> {
        let sig = self.skip_trivia(at);
        if self.kind(sig) != Some(kind) {
            return None;
        }
        children.extend(self.leaves(at, sig.next()));
        Some(sig.next())
    }

    /// Where a zero-width error at end of input is placed.
    fn end_position(&self) -> Position {
        self.tokens
            .last()
            .map(|t| t.span.end())
            .unwrap_or(Position::new(1, 0))
    }

    /// End of the recovery region starting at `at`: every remaining token
    /// on the same source line, never a token that carries a newline, and
    /// always at least one token.
    fn line_end(&self, at: Cursor) -> Cursor {
        let Some(first) = self.token(at) else {
            return at;
        };
        let line = first.span.line;
        let mut cur = at.next();
        while let Some(tok) = self.token(cur) {
            if tok.span.line != line || tok.contains_newline() {
                break;
            }
            cur = cur.next();
        }
        cur
    }

    /// The first cursor in `[from, to]` that shares `to`'s line: the one
    /// after the last token in between that carries a newline.
    fn line_start(&self, from: Cursor, to: Cursor) -> Cursor {
        let mut start = from;
        let mut cur = from;
        while cur < to {
            if self.token(cur).is_some_and(Token::contains_newline) {
                start = cur.next();
            }
            cur = cur.next();
        }
        start
    }

    /// Build an ERROR node from the rest of the line at `at`. A lexer error
    /// token at the front keeps its own message.
    fn recover(&self, at: Cursor, message: &str) -> (Node, Cursor) {
        if self.at_end(at) {
            let node = Node::Error(ErrorNode {
                span: Span::empty_at(self.end_position()),
                message: message.to_owned(),
                tokens: Vec::new(),
            });
            return (node, at);
        }
        let end = self.line_end(at);
        (self.error_between(at, end, message), end)
    }

    /// An ERROR node owning the raw tokens in `[from, to)`. The first token
    /// decides the message when it is itself a lexer error.
    fn error_between(&self, from: Cursor, to: Cursor, message: &str) -> Node {
        let tokens: Vec<Token> = self.tokens[from.pos..to.pos].to_vec();
        let message = match tokens.first() {
            Some(Token {
                kind: TokenKind::Error,
                error: Some(lexed),
                ..
            }) => lexed.clone(),
            _ => message.to_owned(),
        };
        let span = match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => first.span.to(&last.span),
            _ => Span::empty_at(self.end_position()),
        };
        tracing::trace!(%message, ?span, "recovered from parse error");
        Node::Error(ErrorNode {
            span,
            message,
            tokens,
        })
    }

    /// Top-level loop shared by both grammars: trivia become leaves,
    /// `item` parses one construct, and anything else is a line error.
    fn top_level(
        &self,
        item: impl Fn(&Self, Cursor) -> Option<(Node, Cursor)>,
        message: &str,
    ) -> Vec<Node> {
        let mut children = Vec::new();
        let mut cur = Cursor::start();
        while let Some(tok) = self.token(cur) {
            if tok.kind.is_trivia() {
                children.push(Node::Token(tok.clone()));
                cur = cur.next();
                continue;
            }
            let (node, next) = item(self, cur).unwrap_or_else(|| self.recover(cur, message));
            debug_assert!(next > cur, "parser must always make progress");
            children.push(node);
            cur = next;
        }
        children
    }

    fn dataset(&self) -> Node {
        Node::Dataset(Branch::new(self.top_level(Self::fact, EXPECTED_FACT)))
    }

    fn ruleset(&self) -> Node {
        Node::Ruleset(Branch::new(
            self.top_level(Self::statement, EXPECTED_STATEMENT),
        ))
    }
}
