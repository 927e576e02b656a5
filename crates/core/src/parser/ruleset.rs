use super::terms::halted;
use super::{Cursor, Parser, AT_LEAST_ONE_LITERAL};
use crate::ast::{Branch, Node};
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    /// One top-level ruleset construct, tried as operation, then
    /// definition, then rule. Each alternative starts again from `at`.
    pub(super) fn statement(&self, at: Cursor) -> Option<(Node, Cursor)> {
        self.operation(at)
            .or_else(|| self.definition(at))
            .or_else(|| self.rule(at))
    }

    /// atom := compound_term | SYMBOL
    fn atom(&self, at: Cursor) -> Option<(Node, Cursor)> {
        let tok = self.token(at)?;
        if tok.kind != TokenKind::Symbol {
            return None;
        }
        let (inner, cur) = if self.kind(at.next()) == Some(TokenKind::OpenParen) {
            self.compound_term(at)
        } else {
            (Node::Token(tok.clone()), at.next())
        };
        Some((Node::Atom(Branch::new(vec![inner])), cur))
    }

    /// literal := '~'? atom
    ///
    /// A negation that is not followed by an atom comes back as an ERROR
    /// node in place of the literal.
    fn literal(&self, at: Cursor) -> Option<(Node, Cursor)> {
        if self.kind(at) != Some(TokenKind::Negation) {
            let (atom, cur) = self.atom(at)?;
            return Some((Node::Literal(Branch::new(vec![atom])), cur));
        }
        let mut children: Vec<Node> = self.leaves(at, at.next()).collect();
        let sig = self.take_trivia(&mut children, at.next());
        match self.atom(sig) {
            Some((atom, cur)) => {
                children.push(atom);
                Some((Node::Literal(Branch::new(children)), cur))
            }
            None => Some(self.recover(at, "Expected an atom after '~'")),
        }
    }

    /// literal ('&' literal)*, with at least one literal required.
    fn literals(&self, children: &mut Vec<Node>, at: Cursor) -> Cursor {
        let sig = self.take_trivia(children, at);
        let mut cur = match self.literal(sig) {
            Some((lit, next)) => {
                children.push(lit);
                next
            }
            None => {
                let (err, next) = self.recover(sig, AT_LEAST_ONE_LITERAL);
                children.push(err);
                return next;
            }
        };
        while !halted(children) {
            let Some(next) = self.eat(children, cur, TokenKind::Ampersand) else {
                break;
            };
            let sig = self.take_trivia(children, next);
            match self.literal(sig) {
                Some((lit, after)) => {
                    children.push(lit);
                    cur = after;
                }
                None => {
                    let (err, after) = self.recover(sig, "Expected a literal after '&'");
                    children.push(err);
                    return after;
                }
            }
        }
        cur
    }

    /// Optional statement terminator, skipped once recovery has run.
    fn period(&self, children: &mut Vec<Node>, at: Cursor) -> Cursor {
        if halted(children) {
            return at;
        }
        self.eat(children, at, TokenKind::Period).unwrap_or(at)
    }

    /// rule := atom (':-' literal ('&' literal)*)? '.'?
    fn rule(&self, at: Cursor) -> Option<(Node, Cursor)> {
        let (head, mut cur) = self.atom(at)?;
        let mut children = vec![head];
        if !halted(&children) {
            if let Some(next) = self.eat(&mut children, cur, TokenKind::RuleNeck) {
                cur = self.literals(&mut children, next);
            }
        }
        cur = self.period(&mut children, cur);
        Some((Node::Rule(Branch::new(children)), cur))
    }

    /// operation := atom '::' literals ('==>' literals)? '.'?
    fn operation(&self, at: Cursor) -> Option<(Node, Cursor)> {
        let (head, cur) = self.atom(at)?;
        if head.is_invalid() || self.peek_significant(cur) != Some(TokenKind::DoubleColon) {
            return None;
        }
        let mut children = vec![head];
        let next = self.eat(&mut children, cur, TokenKind::DoubleColon)?;
        let mut cur = self.literals(&mut children, next);
        if !halted(&children) {
            if let Some(next) = self.eat(&mut children, cur, TokenKind::Arrow) {
                cur = self.literals(&mut children, next);
            }
        }
        cur = self.period(&mut children, cur);
        Some((Node::Operation(Branch::new(children)), cur))
    }

    /// definition := term ':=' term '.'?
    ///
    /// A separator without a right-hand term turns the whole construct,
    /// through the end of the separator's line, into one ERROR node. When
    /// the left-hand term starts on an earlier line, the ERROR begins on
    /// the separator's line and the earlier tokens stay as plain leaves of
    /// an invalid DEFINITION.
    fn definition(&self, at: Cursor) -> Option<(Node, Cursor)> {
        let (lhs, cur) = self.term(at)?;
        if lhs.is_invalid() || self.peek_significant(cur) != Some(TokenKind::DefinitionSeparator) {
            return None;
        }
        let mut children = vec![lhs];
        let separator = self.skip_trivia(cur);
        let next = self.eat(&mut children, cur, TokenKind::DefinitionSeparator)?;
        let sig = self.take_trivia(&mut children, next);
        let Some((rhs, mut cur)) = self.term(sig) else {
            let start = self.line_start(at, separator);
            let end = self.line_end(separator);
            let err = self.error_between(start, end, "Expected a term after ':='");
            if start == at {
                return Some((err, end));
            }
            let mut children: Vec<Node> = self.leaves(at, start).collect();
            children.push(err);
            return Some((Node::Definition(Branch::new(children)), end));
        };
        children.push(rhs);
        cur = self.period(&mut children, cur);
        Some((Node::Definition(Branch::new(children)), cur))
    }
}
