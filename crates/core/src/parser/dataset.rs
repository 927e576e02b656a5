use super::terms::halted;
use super::{Cursor, Parser};
use crate::ast::{Branch, Node};
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    /// fact := (compound_term | SYMBOL | NUMBER | STRING) '.'?
    pub(super) fn fact(&self, at: Cursor) -> Option<(Node, Cursor)> {
        let tok = self.token(at)?;
        let (head, mut cur) = match tok.kind {
            TokenKind::Symbol if self.kind(at.next()) == Some(TokenKind::OpenParen) => {
                self.compound_term(at)
            }
            TokenKind::Symbol | TokenKind::Number | TokenKind::Str => (
                Node::SimpleTerm(Branch::new(vec![Node::Token(tok.clone())])),
                at.next(),
            ),
            _ => return None,
        };
        let mut children = vec![head];
        if !halted(&children) {
            if let Some(next) = self.eat(&mut children, cur, TokenKind::Period) {
                cur = next;
            }
        }
        Some((Node::Fact(Branch::new(children)), cur))
    }
}
