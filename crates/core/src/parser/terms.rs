use super::{Cursor, Parser, EXPECTED_TERM, MAX_TERM_DEPTH, NESTED_TOO_DEEPLY};
use crate::ast::{Branch, Node};
use crate::dialect::Grammar;
use crate::lexer::TokenKind;

/// Nil is both a constant and the empty list.
const NIL: &str = "nil";

/// True once the last child is an ERROR or carries one: recovery already
/// consumed the rest of the line, so enclosing constructs stop there.
pub(super) fn halted(children: &[Node]) -> bool {
    children
        .last()
        .is_some_and(|c| c.is_error() || c.is_invalid())
}

impl<'a> Parser<'a> {
    /// term := compound_term | list_term | SYMBOL | NUMBER | STRING
    ///       | VARIABLE (ruleset only)
    ///
    /// Past [`MAX_TERM_DEPTH`] open terms the rest of the line is an ERROR.
    pub(super) fn term(&self, at: Cursor) -> Option<(Node, Cursor)> {
        let depth = self.depth.get();
        if depth >= MAX_TERM_DEPTH {
            self.token(at)?;
            return Some(self.recover(at, NESTED_TOO_DEEPLY));
        }
        self.depth.set(depth + 1);
        let parsed = self
            .primary_term(at)
            .map(|(first, next)| self.cons_list(first, next));
        self.depth.set(depth);
        parsed
    }

    /// A term without a trailing `! …` chain.
    fn primary_term(&self, at: Cursor) -> Option<(Node, Cursor)> {
        let tok = self.token(at)?;
        match tok.kind {
            TokenKind::Symbol if self.kind(at.next()) == Some(TokenKind::OpenParen) => {
                Some(self.compound_term(at))
            }
            TokenKind::Symbol if tok.text == NIL => Some((
                Node::ListTerm(Branch::new(vec![Node::Token(tok.clone())])),
                at.next(),
            )),
            TokenKind::Symbol | TokenKind::Number | TokenKind::Str => Some((
                Node::SimpleTerm(Branch::new(vec![Node::Token(tok.clone())])),
                at.next(),
            )),
            TokenKind::OpenBracket => Some(self.bracket_list(at)),
            TokenKind::Variable | TokenKind::AnonymousVariable
                if self.grammar == Grammar::Ruleset =>
            {
                Some((
                    Node::Variable(Branch::new(vec![Node::Token(tok.clone())])),
                    at.next(),
                ))
            }
            _ => None,
        }
    }

    /// compound_term := SYMBOL '(' term (',' term)* ')'
    ///
    /// Called with `at` on the functor, which is directly followed by `(`.
    pub(super) fn compound_term(&self, at: Cursor) -> (Node, Cursor) {
        let children: Vec<Node> = self.leaves(at, at.next().next()).collect();
        let (children, cur) = self.sequence(
            children,
            at.next().next(),
            TokenKind::CloseParen,
            "Expected ',' or ')'",
        );
        (Node::CompoundTerm(Branch::new(children)), cur)
    }

    /// '[' (term (',' term)*)? ']'
    fn bracket_list(&self, at: Cursor) -> (Node, Cursor) {
        let children: Vec<Node> = self.leaves(at, at.next()).collect();
        let (children, cur) = self.sequence(
            children,
            at.next(),
            TokenKind::CloseBracket,
            "Expected ',' or ']'",
        );
        (Node::ListTerm(Branch::new(children)), cur)
    }

    /// Comma-separated terms up to `close`. Whether a term or a separator
    /// comes next is read off the last significant child: after the
    /// opening delimiter or a comma a term is due, otherwise a comma or
    /// the closing delimiter.
    fn sequence(
        &self,
        mut children: Vec<Node>,
        mut cur: Cursor,
        close: TokenKind,
        separator_message: &str,
    ) -> (Vec<Node>, Cursor) {
        loop {
            let sig = self.take_trivia(&mut children, cur);
            let last = children.iter().rev().find(|c| !c.is_trivia());
            let after_open = last.is_some_and(|c| {
                c.is_token(TokenKind::OpenParen) || c.is_token(TokenKind::OpenBracket)
            });
            let expecting_term = after_open || last.is_some_and(|c| c.is_token(TokenKind::Comma));

            if expecting_term {
                // `[]` is the only empty sequence.
                if after_open
                    && close == TokenKind::CloseBracket
                    && self.kind(sig) == Some(TokenKind::CloseBracket)
                {
                    children.extend(self.leaves(sig, sig.next()));
                    return (children, sig.next());
                }
                match self.term(sig) {
                    Some((term, next)) => {
                        children.push(term);
                        cur = next;
                        if halted(&children) {
                            return (children, cur);
                        }
                    }
                    None => {
                        let (err, next) = self.recover(sig, EXPECTED_TERM);
                        children.push(err);
                        return (children, next);
                    }
                }
            } else {
                match self.kind(sig) {
                    Some(TokenKind::Comma) => {
                        children.extend(self.leaves(sig, sig.next()));
                        cur = sig.next();
                    }
                    Some(kind) if kind == close => {
                        children.extend(self.leaves(sig, sig.next()));
                        return (children, sig.next());
                    }
                    _ => {
                        let (err, next) = self.recover(sig, separator_message);
                        children.push(err);
                        return (children, next);
                    }
                }
            }
        }
    }

    /// term ('!' term)+: folds a chain of `!`-separated terms after
    /// `first` into one LIST_TERM. Returns `first` unchanged when no `!`
    /// follows.
    fn cons_list(&self, first: Node, after: Cursor) -> (Node, Cursor) {
        if first.is_invalid() || self.peek_significant(after) != Some(TokenKind::ListSeparator) {
            return (first, after);
        }
        let mut children = vec![first];
        let mut cur = after;
        while let Some(next) = self.eat(&mut children, cur, TokenKind::ListSeparator) {
            let sig = self.take_trivia(&mut children, next);
            match self.primary_term(sig) {
                Some((term, after_term)) => {
                    children.push(term);
                    cur = after_term;
                    if halted(&children) {
                        break;
                    }
                }
                None => {
                    let (err, after_err) = self.recover(sig, "Expected a term after '!'");
                    children.push(err);
                    cur = after_err;
                    break;
                }
            }
        }
        (Node::ListTerm(Branch::new(children)), cur)
    }
}
