//! Lossless syntax tree produced by the parser.
//!
//! Every token of the source, trivia included, is a leaf somewhere in the
//! tree, so a node's text is the concatenation of its children's text and
//! its span runs from its first child to its last. Malformed regions are
//! kept in place as [`ErrorNode`]s holding the raw tokens they swallowed.

use serde::Serialize;

use crate::lexer::{Token, TokenKind};
use crate::span::{Position, Span};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "node", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Node {
    Dataset(Branch),
    Ruleset(Branch),
    Fact(Branch),
    Rule(Branch),
    Definition(Branch),
    Operation(Branch),
    Atom(Branch),
    Literal(Branch),
    CompoundTerm(Branch),
    ListTerm(Branch),
    SimpleTerm(Branch),
    Variable(Branch),
    Token(Token),
    Error(ErrorNode),
}

/// An interior node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub span: Span,
    /// Set when a child is an ERROR node or itself invalid.
    pub invalid: bool,
    pub children: Vec<Node>,
}

impl Branch {
    pub fn new(children: Vec<Node>) -> Self {
        let span = match (children.first(), children.last()) {
            (Some(first), Some(last)) => first.span().to(&last.span()),
            _ => Span::empty_at(Position::new(1, 0)),
        };
        let invalid = children.iter().any(|c| c.is_error() || c.is_invalid());
        Branch {
            span,
            invalid,
            children,
        }
    }

    /// Children that are not whitespace or comments.
    pub fn significant(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(|c| !c.is_trivia())
    }
}

/// A region of source that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNode {
    pub span: Span,
    pub message: String,
    /// Raw tokens consumed while recovering; empty for errors synthesized
    /// at end of input.
    pub tokens: Vec<Token>,
}

impl ErrorNode {
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

impl Node {
    pub fn name(&self) -> &'static str {
        match self {
            Node::Dataset(_) => "DATASET",
            Node::Ruleset(_) => "RULESET",
            Node::Fact(_) => "FACT",
            Node::Rule(_) => "RULE",
            Node::Definition(_) => "DEFINITION",
            Node::Operation(_) => "OPERATION",
            Node::Atom(_) => "ATOM",
            Node::Literal(_) => "LITERAL",
            Node::CompoundTerm(_) => "COMPOUND_TERM",
            Node::ListTerm(_) => "LIST_TERM",
            Node::SimpleTerm(_) => "SIMPLE_TERM",
            Node::Variable(_) => "VARIABLE",
            Node::Token(_) => "TOKEN",
            Node::Error(_) => "ERROR",
        }
    }

    pub fn as_branch(&self) -> Option<&Branch> {
        match self {
            Node::Dataset(b)
            | Node::Ruleset(b)
            | Node::Fact(b)
            | Node::Rule(b)
            | Node::Definition(b)
            | Node::Operation(b)
            | Node::Atom(b)
            | Node::Literal(b)
            | Node::CompoundTerm(b)
            | Node::ListTerm(b)
            | Node::SimpleTerm(b)
            | Node::Variable(b) => Some(b),
            Node::Token(_) | Node::Error(_) => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Node::Token(t) => t.span,
            Node::Error(e) => e.span,
            Node::Dataset(b)
            | Node::Ruleset(b)
            | Node::Fact(b)
            | Node::Rule(b)
            | Node::Definition(b)
            | Node::Operation(b)
            | Node::Atom(b)
            | Node::Literal(b)
            | Node::CompoundTerm(b)
            | Node::ListTerm(b)
            | Node::SimpleTerm(b)
            | Node::Variable(b) => b.span,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Node::Error(_))
    }

    pub fn is_invalid(&self) -> bool {
        self.as_branch().is_some_and(|b| b.invalid)
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self, Node::Token(t) if t.kind.is_trivia())
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Node::Token(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_token(&self, kind: TokenKind) -> bool {
        matches!(self, Node::Token(t) if t.kind == kind)
    }

    /// The exact source text covered by this node.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) {
        match self {
            Node::Token(t) => out.push_str(&t.text),
            Node::Error(e) => {
                for t in &e.tokens {
                    out.push_str(&t.text);
                }
            }
            other => {
                if let Some(b) = other.as_branch() {
                    for child in &b.children {
                        child.write_text(out);
                    }
                }
            }
        }
    }

    /// Every token under this node in source order, including the raw
    /// tokens held by ERROR nodes.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        match self {
            Node::Token(t) => out.push(t),
            Node::Error(e) => out.extend(e.tokens.iter()),
            other => {
                if let Some(b) = other.as_branch() {
                    for child in &b.children {
                        child.collect_tokens(out);
                    }
                }
            }
        }
    }

    /// The leading symbol of an atom, compound term, simple term or fact,
    /// i.e. the predicate or function name.
    pub fn functor(&self) -> Option<&Token> {
        match self {
            Node::Token(t) if t.kind == TokenKind::Symbol => Some(t),
            Node::Atom(b) | Node::Fact(b) | Node::SimpleTerm(b) => {
                b.significant().next().and_then(Node::functor)
            }
            Node::Literal(b) => b
                .children
                .iter()
                .find(|c| matches!(c, Node::Atom(_)))
                .and_then(Node::functor),
            Node::CompoundTerm(b) => b.children.first().and_then(Node::as_token),
            _ => None,
        }
    }

    /// The head of a rule or operation, or the left-hand term of a
    /// definition.
    pub fn head(&self) -> Option<&Node> {
        match self {
            Node::Rule(b) | Node::Operation(b) | Node::Definition(b) => b.significant().next(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Grammar;
    use crate::parser::parse_source;

    #[test]
    fn branch_span_runs_from_first_to_last_child() {
        let root = parse_source("p(a).\nq(b).", Grammar::Dataset);
        assert_eq!(root.span(), Span::new(1, 0, 2, 5));
        assert_eq!(root.text(), "p(a).\nq(b).");
    }

    #[test]
    fn empty_document_has_empty_root() {
        let root = parse_source("", Grammar::Ruleset);
        let Node::Ruleset(b) = &root else {
            panic!("expected RULESET, got {}", root.name());
        };
        assert!(b.children.is_empty());
        assert_eq!(root.span(), Span::empty_at(Position::new(1, 0)));
    }

    #[test]
    fn functor_of_compound_fact() {
        let root = parse_source("parent(art, bob).", Grammar::Dataset);
        let fact = root.as_branch().and_then(|b| b.children.first());
        let name = fact.and_then(Node::functor).map(|t| t.text.as_str());
        assert_eq!(name, Some("parent"));
    }
}
