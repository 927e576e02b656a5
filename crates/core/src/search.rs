//! Read-only queries over a finished tree: position lookup and the
//! predicate definition index.

use std::collections::HashMap;

use serde::Serialize;

use crate::ast::Node;
use crate::lexer::Token;
use crate::span::{Position, Span};

/// The innermost token whose span contains `at`, descending into the raw
/// tokens of ERROR nodes. `None` when `at` is outside the tree or falls in
/// a gap between children.
pub fn find_token_at(node: &Node, at: Position) -> Option<&Token> {
    if !node.span().contains(at) {
        return None;
    }
    match node {
        Node::Token(t) => Some(t),
        Node::Error(e) => e.tokens.iter().find(|t| t.span.contains(at)),
        other => other
            .as_branch()?
            .children
            .iter()
            .find_map(|child| find_token_at(child, at)),
    }
}

/// Where each view predicate is defined: head functor name to the ranges
/// of its rules, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PredicateIndex {
    definitions: HashMap<String, Vec<Span>>,
}

impl PredicateIndex {
    /// Index the RULE children of a RULESET root. Any other root yields an
    /// empty index.
    pub fn build(root: &Node) -> Self {
        let mut index = PredicateIndex::default();
        let Node::Ruleset(branch) = root else {
            return index;
        };
        for rule in branch.children.iter().filter(|c| matches!(c, Node::Rule(_))) {
            let Some(name) = rule.head().and_then(Node::functor) else {
                continue;
            };
            index
                .definitions
                .entry(name.text.clone())
                .or_default()
                .push(rule.span());
        }
        tracing::debug!(predicates = index.definitions.len(), "built predicate index");
        index
    }

    /// Rule ranges defining `name`; empty for base predicates.
    pub fn definitions(&self, name: &str) -> &[Span] {
        self.definitions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `name` has at least one rule.
    pub fn is_view(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
