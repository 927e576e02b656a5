//! One-shot analysis of a document: everything the editor features need,
//! recomputed from scratch on every change.

use std::path::Path;

use crate::ast::Node;
use crate::diagnostics::{self, Diagnostic};
use crate::dialect::{Dialect, Grammar};
use crate::lexer::{self, Token};
use crate::parser;
use crate::search::PredicateIndex;
use crate::source::SourceProvider;
use crate::structure;

/// The result of analyzing one document.
///
/// `tokens` and `ast` are empty for the line-oriented dialects, which
/// are validated straight from `text`.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub dialect: Dialect,
    pub text: String,
    pub tokens: Vec<Token>,
    pub ast: Option<Node>,
    pub index: PredicateIndex,
}

pub fn analyze(text: &str, dialect: Dialect) -> Analysis {
    let (tokens, ast) = match dialect.grammar() {
        Some(grammar) => {
            let tokens = lexer::lex(text, grammar);
            let ast = parser::parse(&tokens, grammar);
            (tokens, Some(ast))
        }
        None => (Vec::new(), None),
    };
    let index = match (&ast, dialect.grammar()) {
        (Some(root), Some(Grammar::Ruleset)) => PredicateIndex::build(root),
        _ => PredicateIndex::default(),
    };
    tracing::debug!(
        ?dialect,
        tokens = tokens.len(),
        predicates = index.len(),
        "analyzed document"
    );
    Analysis {
        dialect,
        text: text.to_owned(),
        tokens,
        ast,
        index,
    }
}

impl Analysis {
    /// Diagnostics for this document. `base_dir` is the directory that
    /// relative paths in manifests and scripts resolve against.
    pub fn diagnostics(&self, base_dir: &Path, provider: &dyn SourceProvider) -> Vec<Diagnostic> {
        match (self.dialect, &self.ast) {
            (Dialect::Dataset, Some(root)) => diagnostics::validate_dataset(root),
            (Dialect::Ruleset, Some(root)) => diagnostics::validate_ruleset(root),
            (Dialect::BuildManifest, _) => {
                structure::validate_build_manifest(&self.text, base_dir, provider)
            }
            (Dialect::RunScript, _) => structure::validate_run_script(&self.text, base_dir, provider),
            (Dialect::Dataset | Dialect::Ruleset, None) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryProvider;

    #[test]
    fn ruleset_analysis_builds_index() {
        let analysis = analyze("q(X) :- p(X).", Dialect::Ruleset);
        assert!(analysis.ast.is_some());
        assert!(analysis.index.is_view("q"));
        assert!(!analysis.tokens.is_empty());
    }

    #[test]
    fn dataset_analysis_has_no_index() {
        let analysis = analyze("q(a).", Dialect::Dataset);
        assert!(analysis.index.is_empty());
    }

    #[test]
    fn structural_dialects_have_no_tree() {
        let analysis = analyze("load missing.hdf\n", Dialect::RunScript);
        assert!(analysis.ast.is_none());
        assert!(analysis.tokens.is_empty());
        let diags = analysis.diagnostics(Path::new("/kb"), &InMemoryProvider::default());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "File not found: missing.hdf");
    }

    #[test]
    fn diagnostics_dispatch_by_dialect() {
        let provider = InMemoryProvider::default();
        let dataset = analyze("p(X).", Dialect::Dataset);
        assert_eq!(
            dataset.diagnostics(Path::new("."), &provider)[0].message,
            "Variables are not allowed in datasets: 'X'"
        );
        let ruleset = analyze("p(X).", Dialect::Ruleset);
        assert!(ruleset.diagnostics(Path::new("."), &provider).is_empty());
    }
}
