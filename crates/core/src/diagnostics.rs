//! Diagnostic records and the AST-derived generators.
//!
//! Every maximal ERROR node in the tree becomes exactly one diagnostic
//! whose range is the node's span. The dataset generator relabels stray
//! variables; the ruleset generator reports parser messages as they are.

use serde::Serialize;

use crate::ast::{ErrorNode, Node};
use crate::lexer::{ANONYMOUS_VARIABLE, UNEXPECTED_CHARACTER};
use crate::span::Span;

/// Tag attached to every diagnostic this crate produces.
pub const SOURCE: &str = "epilog";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A 0-based, end-exclusive range, as editors expect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Range {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Range {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    pub fn from_span(span: Span) -> Self {
        Range::new(
            span.line.saturating_sub(1),
            span.start_col,
            span.end_line.saturating_sub(1),
            span.end_col,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub range: Range,
    pub message: String,
    pub source: &'static str,
}

impl Diagnostic {
    pub fn error(range: Range, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            range,
            message: message.into(),
            source: SOURCE,
        }
    }

    pub fn warning(range: Range, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            range,
            message: message.into(),
            source: SOURCE,
        }
    }
}

/// Every ERROR node that has no ERROR ancestor, in pre-order. ERROR nodes
/// are never descended into: their contents are raw tokens.
pub fn error_roots(root: &Node) -> Vec<&ErrorNode> {
    let mut out = Vec::new();
    collect_error_roots(root, &mut out);
    out
}

fn collect_error_roots<'a>(node: &'a Node, out: &mut Vec<&'a ErrorNode>) {
    match node {
        Node::Error(e) => out.push(e),
        Node::Token(_) => {}
        other => {
            if let Some(b) = other.as_branch() {
                for child in &b.children {
                    collect_error_roots(child, out);
                }
            }
        }
    }
}

pub fn validate_dataset(root: &Node) -> Vec<Diagnostic> {
    error_roots(root)
        .into_iter()
        .map(|err| {
            let message = match stray_variable(err) {
                Some(name) => format!("Variables are not allowed in datasets: '{}'", name),
                None => err.message.clone(),
            };
            Diagnostic::error(Range::from_span(err.span), message)
        })
        .collect()
}

pub fn validate_ruleset(root: &Node) -> Vec<Diagnostic> {
    error_roots(root)
        .into_iter()
        .map(|err| Diagnostic::error(Range::from_span(err.span), err.message.clone()))
        .collect()
}

/// The variable a dataset error was caused by, if any: either an
/// anonymous variable, or an unexpected-character error whose text starts
/// like a variable name.
fn stray_variable(err: &ErrorNode) -> Option<String> {
    if err.message == ANONYMOUS_VARIABLE {
        return Some("_".to_owned());
    }
    if !err.message.starts_with(UNEXPECTED_CHARACTER) {
        return None;
    }
    let text = err.text();
    let first = text.chars().next()?;
    if !(first.is_ascii_uppercase() || first == '_') {
        return None;
    }
    Some(
        text.chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect(),
    )
}
