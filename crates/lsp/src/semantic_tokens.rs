//! Semantic token provider for dialect-aware highlighting.
//!
//! Walks the syntax tree of a dataset or ruleset and classifies every
//! meaningful leaf by its role: predicate names, constants, head
//! parameters and body variables. ERROR nodes are skipped, so highlighting
//! degrades gracefully on incomplete files.

use std::collections::HashSet;

use epilog_core::{Analysis, Node, Token, TokenKind};
use lsp_types::{SemanticToken, SemanticTokenModifier, SemanticTokenType};

use crate::position::{Encoding, LineIndex};

/// Semantic token types registered with the client.
pub static TOKEN_TYPES: &[SemanticTokenType] = &[
    SemanticTokenType::FUNCTION,    // 0
    SemanticTokenType::PARAMETER,   // 1
    SemanticTokenType::VARIABLE,    // 2
    SemanticTokenType::ENUM_MEMBER, // 3
    SemanticTokenType::STRING,      // 4
    SemanticTokenType::NUMBER,      // 5
    SemanticTokenType::COMMENT,     // 6
    SemanticTokenType::OPERATOR,    // 7
];

/// Semantic token modifiers.
pub static TOKEN_MODIFIERS: &[SemanticTokenModifier] = &[
    SemanticTokenModifier::DECLARATION,     // bit 0
    SemanticTokenModifier::READONLY,        // bit 1
    SemanticTokenModifier::DEFAULT_LIBRARY, // bit 2
];

const FUNCTION: &str = "function";
const PARAMETER: &str = "parameter";
const VARIABLE: &str = "variable";
const ENUM_MEMBER: &str = "enumMember";
const STRING: &str = "string";
const NUMBER: &str = "number";
const COMMENT: &str = "comment";
const OPERATOR: &str = "operator";

const DECLARATION: &str = "declaration";
const READONLY: &str = "readonly";
const DEFAULT_LIBRARY: &str = "defaultLibrary";

/// Constants with a fixed meaning.
static BUILTIN_VALUES: &[&str] = &["nil", "true", "false"];

/// Predicates provided by the evaluator.
static BUILTIN_PREDICATES: &[&str] = &["member", "same", "distinct", "evaluate"];

/// A classified token with its absolute position, before encoding.
/// Lines are 0-based; columns and lengths count chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken {
    pub line: u32,
    pub start_col: u32,
    pub length: u32,
    pub type_name: &'static str,
    pub modifier_names: Vec<&'static str>,
}

/// Legend index of a token type. Unknown names land one past the legend.
pub fn type_index(name: &str) -> u32 {
    TOKEN_TYPES
        .iter()
        .position(|t| t.as_str() == name)
        .unwrap_or(TOKEN_TYPES.len()) as u32
}

/// Modifier bitset. Unknown names set the bit one past the legend.
pub fn modifier_bits(names: &[&str]) -> u32 {
    names.iter().fold(0, |bits, name| {
        let idx = TOKEN_MODIFIERS
            .iter()
            .position(|m| m.as_str() == *name)
            .unwrap_or(TOKEN_MODIFIERS.len());
        bits | (1 << idx)
    })
}

/// Compute the encoded semantic tokens of an analyzed document, with
/// columns in the client's encoding.
pub fn compute_semantic_tokens(analysis: &Analysis, encoding: Encoding) -> Vec<SemanticToken> {
    let lines = LineIndex::new(&analysis.text, encoding);
    let tokens: Vec<ParsedToken> = classify(analysis)
        .into_iter()
        .map(|t| {
            let start = lines.to_client(t.line, t.start_col);
            let end = lines.to_client(t.line, t.start_col + t.length);
            ParsedToken {
                start_col: start,
                length: end - start,
                ..t
            }
        })
        .collect();
    encode(&tokens)
}

/// Classify the leaves of a document's tree. Documents without a tree
/// produce nothing.
pub fn classify(analysis: &Analysis) -> Vec<ParsedToken> {
    let Some(root) = analysis.ast.as_ref() else {
        return Vec::new();
    };
    let mut walker = Walker::default();
    if let Some(branch) = root.as_branch() {
        for child in &branch.children {
            walker.top_level(child);
        }
    }
    let mut tokens = walker.out;
    tokens.sort_by_key(|t| (t.line, t.start_col));
    tokens
}

/// Encode classified tokens against the legend.
pub fn encode(tokens: &[ParsedToken]) -> Vec<SemanticToken> {
    let raw: Vec<RawSemanticToken> = tokens
        .iter()
        .map(|t| RawSemanticToken {
            line: t.line,
            col: t.start_col,
            length: t.length,
            token_type: type_index(t.type_name),
            modifiers: modifier_bits(&t.modifier_names),
        })
        .collect();
    delta_encode(&raw)
}

/// Where a leaf sits within its statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Head,
    Body,
}

#[derive(Default)]
struct Walker<'a> {
    out: Vec<ParsedToken>,
    /// Variables declared by the current statement's head.
    params: HashSet<&'a str>,
    /// Variables first seen in the current statement's body.
    locals: HashSet<&'a str>,
}

impl<'a> Walker<'a> {
    fn push(&mut self, tok: &Token, type_name: &'static str, modifier_names: Vec<&'static str>) {
        self.out.push(ParsedToken {
            line: tok.span.line.saturating_sub(1),
            start_col: tok.span.start_col,
            length: tok.text.chars().count() as u32,
            type_name,
            modifier_names,
        });
    }

    fn top_level(&mut self, node: &'a Node) {
        self.params.clear();
        self.locals.clear();
        match node {
            Node::Fact(b) => {
                for child in &b.children {
                    self.predicate_term(child, Side::Body, false);
                }
            }
            Node::Rule(b) | Node::Operation(b) => {
                let mut head_seen = false;
                for child in &b.children {
                    match child {
                        Node::Atom(_) if !head_seen => {
                            head_seen = true;
                            self.atom(child, Side::Head);
                        }
                        Node::Literal(lit) => {
                            for part in &lit.children {
                                match part {
                                    Node::Atom(_) => self.atom(part, Side::Body),
                                    other => self.term(other, Side::Body),
                                }
                            }
                        }
                        other => self.term(other, Side::Body),
                    }
                }
            }
            Node::Definition(b) => {
                let mut head_seen = false;
                for child in &b.children {
                    if !head_seen && !child.is_trivia() {
                        head_seen = true;
                        self.predicate_term(child, Side::Head, true);
                    } else {
                        self.term(child, Side::Body);
                    }
                }
            }
            other => self.term(other, Side::Body),
        }
    }

    /// An atom: a bare predicate symbol or a compound term.
    fn atom(&mut self, node: &'a Node, side: Side) {
        if let Node::Atom(b) = node {
            for child in &b.children {
                self.predicate_term(child, side, side == Side::Head);
            }
        }
    }

    /// A term in predicate position, whose leading symbol names a
    /// predicate rather than a constant.
    fn predicate_term(&mut self, node: &'a Node, side: Side, declaration: bool) {
        match node {
            Node::Token(tok) if tok.kind == TokenKind::Symbol => {
                self.predicate(tok, declaration);
            }
            Node::SimpleTerm(b) => match b.children.as_slice() {
                [Node::Token(tok)] if tok.kind == TokenKind::Symbol => {
                    self.predicate(tok, declaration);
                }
                _ => self.term(node, side),
            },
            Node::CompoundTerm(b) => self.compound(b.children.as_slice(), side, declaration),
            other => self.term(other, side),
        }
    }

    fn predicate(&mut self, tok: &Token, declaration: bool) {
        if BUILTIN_PREDICATES.contains(&tok.text.as_str()) {
            self.push(tok, FUNCTION, vec![DEFAULT_LIBRARY]);
        } else if declaration {
            self.push(tok, FUNCTION, vec![DECLARATION]);
        } else {
            self.push(tok, FUNCTION, Vec::new());
        }
    }

    /// Compound term children: the functor first, then arguments and
    /// punctuation.
    fn compound(&mut self, children: &'a [Node], side: Side, declaration: bool) {
        let mut rest = children.iter();
        if let Some(Node::Token(functor)) = rest.next() {
            self.predicate(functor, declaration);
        }
        for child in rest {
            self.term(child, side);
        }
    }

    fn term(&mut self, node: &'a Node, side: Side) {
        match node {
            Node::Token(tok) => self.leaf(tok, side),
            Node::Error(_) => {}
            Node::CompoundTerm(b) => self.compound(b.children.as_slice(), side, false),
            other => {
                if let Some(b) = other.as_branch() {
                    for child in &b.children {
                        self.term(child, side);
                    }
                }
            }
        }
    }

    fn leaf(&mut self, tok: &'a Token, side: Side) {
        match tok.kind {
            TokenKind::Comment => self.push(tok, COMMENT, Vec::new()),
            TokenKind::Number => self.push(tok, NUMBER, Vec::new()),
            TokenKind::Str => self.push(tok, STRING, Vec::new()),
            TokenKind::Symbol if BUILTIN_VALUES.contains(&tok.text.as_str()) => {
                self.push(tok, ENUM_MEMBER, vec![READONLY, DEFAULT_LIBRARY]);
            }
            TokenKind::Symbol => self.push(tok, ENUM_MEMBER, Vec::new()),
            TokenKind::Variable => self.variable(tok, side),
            TokenKind::AnonymousVariable => self.push(tok, VARIABLE, Vec::new()),
            TokenKind::Negation | TokenKind::DefinitionSeparator => {
                self.push(tok, OPERATOR, Vec::new());
            }
            _ => {}
        }
    }

    fn variable(&mut self, tok: &'a Token, side: Side) {
        let name = tok.text.as_str();
        match side {
            Side::Head => {
                self.params.insert(name);
                self.push(tok, PARAMETER, vec![DECLARATION]);
            }
            Side::Body if self.params.contains(name) => self.push(tok, PARAMETER, Vec::new()),
            Side::Body if self.locals.insert(name) => {
                self.push(tok, VARIABLE, vec![DECLARATION]);
            }
            Side::Body => self.push(tok, VARIABLE, Vec::new()),
        }
    }
}

/// A raw token with absolute position before delta-encoding.
struct RawSemanticToken {
    line: u32,
    col: u32,
    length: u32,
    token_type: u32,
    modifiers: u32,
}

/// Delta-encode raw tokens into LSP SemanticToken format.
fn delta_encode(raw: &[RawSemanticToken]) -> Vec<SemanticToken> {
    let mut result = Vec::with_capacity(raw.len());
    let mut prev_line: u32 = 0;
    let mut prev_col: u32 = 0;

    for tok in raw {
        let delta_line = tok.line - prev_line;
        let delta_start = if delta_line == 0 {
            tok.col - prev_col
        } else {
            tok.col
        };

        result.push(SemanticToken {
            delta_line,
            delta_start,
            length: tok.length,
            token_type: tok.token_type,
            token_modifiers_bitset: tok.modifiers,
        });

        prev_line = tok.line;
        prev_col = tok.col;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use epilog_core::{analyze, Dialect};

    fn classified(text: &str, dialect: Dialect) -> Vec<(String, &'static str, Vec<&'static str>)> {
        let analysis = analyze(text, dialect);
        let lines: Vec<&str> = text.lines().collect();
        classify(&analysis)
            .into_iter()
            .map(|t| {
                let line: Vec<char> = lines[t.line as usize].chars().collect();
                let start = t.start_col as usize;
                let text: String = line[start..start + t.length as usize].iter().collect();
                (text, t.type_name, t.modifier_names)
            })
            .collect()
    }

    #[test]
    fn legend_lookup_saturates() {
        assert_eq!(type_index("function"), 0);
        assert_eq!(type_index("operator"), 7);
        assert_eq!(type_index("macro"), TOKEN_TYPES.len() as u32);
        assert_eq!(modifier_bits(&["declaration", "defaultLibrary"]), 0b101);
        assert_eq!(modifier_bits(&["deprecated"]), 1 << TOKEN_MODIFIERS.len());
        assert_eq!(modifier_bits(&[]), 0);
    }

    #[test]
    fn rule_head_and_body_variables() {
        let tokens = classified("q(X) :- p(X).", Dialect::Ruleset);
        assert_eq!(
            tokens,
            vec![
                ("q".to_string(), FUNCTION, vec![DECLARATION]),
                ("X".to_string(), PARAMETER, vec![DECLARATION]),
                ("p".to_string(), FUNCTION, vec![]),
                ("X".to_string(), PARAMETER, vec![]),
            ]
        );
    }

    #[test]
    fn body_locals_are_declared_once() {
        let tokens = classified("q(X) :- p(X, Y) & ~r(Y, _, nil).", Dialect::Ruleset);
        let ys: Vec<&Vec<&str>> = tokens
            .iter()
            .filter(|(text, _, _)| text == "Y")
            .map(|(_, _, m)| m)
            .collect();
        assert_eq!(ys, vec![&vec![DECLARATION], &vec![]]);
        assert!(tokens.contains(&("~".to_string(), OPERATOR, vec![])));
        assert!(tokens.contains(&("_".to_string(), VARIABLE, vec![])));
        assert!(tokens.contains(&("nil".to_string(), ENUM_MEMBER, vec![READONLY, DEFAULT_LIBRARY])));
    }

    #[test]
    fn scope_resets_per_statement() {
        let tokens = classified("a(X) :- b(X).\nc :- d(X).", Dialect::Ruleset);
        let last = tokens.last().unwrap();
        assert_eq!((last.0.as_str(), last.1), ("X", VARIABLE));
        assert_eq!(last.2, vec![DECLARATION]);
    }

    #[test]
    fn definitions_and_operations() {
        let tokens = classified(
            "double(X) := plus(X, X).\nmove :: at(a) ==> ~at(a) & at(\"b\").",
            Dialect::Ruleset,
        );
        assert_eq!(tokens[0], ("double".to_string(), FUNCTION, vec![DECLARATION]));
        assert_eq!(tokens[1], ("X".to_string(), PARAMETER, vec![DECLARATION]));
        assert_eq!(tokens[2], (":=".to_string(), OPERATOR, vec![]));
        assert_eq!(tokens[3], ("plus".to_string(), FUNCTION, vec![]));
        assert!(tokens.contains(&("move".to_string(), FUNCTION, vec![DECLARATION])));
        assert!(tokens.contains(&("\"b\"".to_string(), STRING, vec![])));
        assert!(!tokens.iter().any(|(t, _, _)| t == "::" || t == "==>" || t == "&"));
    }

    #[test]
    fn builtin_predicates_use_default_library() {
        let tokens = classified("q(X) :- member(X, [1, 2]) & same(X, 1).", Dialect::Ruleset);
        assert!(tokens.contains(&("member".to_string(), FUNCTION, vec![DEFAULT_LIBRARY])));
        assert!(tokens.contains(&("same".to_string(), FUNCTION, vec![DEFAULT_LIBRARY])));
        assert!(tokens.contains(&("1".to_string(), NUMBER, vec![])));
    }

    #[test]
    fn dataset_facts_and_comments() {
        let tokens = classified("% family\nparent(art, f(true)).\nsunny.", Dialect::Dataset);
        assert_eq!(
            tokens,
            vec![
                ("% family".to_string(), COMMENT, vec![]),
                ("parent".to_string(), FUNCTION, vec![]),
                ("art".to_string(), ENUM_MEMBER, vec![]),
                ("f".to_string(), FUNCTION, vec![]),
                ("true".to_string(), ENUM_MEMBER, vec![READONLY, DEFAULT_LIBRARY]),
                ("sunny".to_string(), FUNCTION, vec![]),
            ]
        );
    }

    #[test]
    fn error_regions_emit_nothing() {
        let tokens = classified("p(X).\nq(a).", Dialect::Dataset);
        assert_eq!(
            tokens,
            vec![
                ("p".to_string(), FUNCTION, vec![]),
                ("q".to_string(), FUNCTION, vec![]),
                ("a".to_string(), ENUM_MEMBER, vec![]),
            ]
        );
    }

    #[test]
    fn encoding_is_relative() {
        let analysis = analyze("q(X) :- p(X).\n  r.", Dialect::Ruleset);
        let data = compute_semantic_tokens(&analysis, Encoding::Utf16);
        let quint: Vec<(u32, u32, u32, u32, u32)> = data
            .iter()
            .map(|t| {
                (
                    t.delta_line,
                    t.delta_start,
                    t.length,
                    t.token_type,
                    t.token_modifiers_bitset,
                )
            })
            .collect();
        assert_eq!(
            quint,
            vec![
                (0, 0, 1, 0, 1),
                (0, 2, 1, 1, 1),
                (0, 6, 1, 0, 0),
                (0, 2, 1, 1, 0),
                (1, 2, 1, 0, 1),
            ]
        );
    }

    #[test]
    fn structural_dialects_have_no_tokens() {
        let analysis = analyze("load a.hdf\n", Dialect::RunScript);
        assert!(compute_semantic_tokens(&analysis, Encoding::Utf16).is_empty());
    }

    #[test]
    fn astral_strings_shift_utf16_columns() {
        let analysis = analyze("p(\"🦀\", x).", Dialect::Dataset);
        let starts_and_lengths = |encoding| -> Vec<(u32, u32)> {
            compute_semantic_tokens(&analysis, encoding)
                .iter()
                .map(|t| (t.delta_start, t.length))
                .collect()
        };
        assert_eq!(
            starts_and_lengths(Encoding::Utf16),
            vec![(0, 1), (2, 4), (6, 1)]
        );
        assert_eq!(
            starts_and_lengths(Encoding::Utf32),
            vec![(0, 1), (2, 3), (5, 1)]
        );
    }
}
