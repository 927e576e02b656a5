//! epilog-core: lexer, error-tolerant parser and analyses for the Epilog
//! logic-programming language.
//!
//! Nothing in this crate fails on malformed input. Lexical and syntax
//! problems are kept in the tree as ERROR nodes and surface as
//! [`Diagnostic`]s; only IO at the edges returns [`EpilogError`].
//!
//! # Public API
//!
//! - [`analyze()`] -- lex, parse and index a document in one step
//! - [`lex()`] / [`parse()`] -- the individual stages
//! - [`Node`] -- the lossless syntax tree
//! - [`PredicateIndex`] -- view predicate definitions of a ruleset
//! - [`Diagnostic`] -- editor-facing problem reports

pub mod analysis;
pub mod ast;
pub mod diagnostics;
pub mod dialect;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod search;
pub mod source;
pub mod span;
pub mod structure;

pub use analysis::{analyze, Analysis};
pub use ast::{Branch, ErrorNode, Node};
pub use diagnostics::{Diagnostic, Range, Severity};
pub use dialect::{Dialect, Grammar};
pub use error::EpilogError;
pub use lexer::{lex, Token, TokenKind};
pub use parser::{parse, parse_source};
pub use search::{find_token_at, PredicateIndex};
pub use source::{FileSystemProvider, InMemoryProvider, SourceProvider};
pub use span::{Position, Span};
