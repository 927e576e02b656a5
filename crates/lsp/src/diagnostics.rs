//! Conversion of analysis diagnostics into `lsp_types::Diagnostic`.

use std::path::Path;

use epilog_core::{Diagnostic, Severity, SourceProvider};
use lsp_types::DiagnosticSeverity;

use crate::document::DocumentInfo;
use crate::position::{Encoding, LineIndex};

pub fn to_lsp(diag: &Diagnostic, lines: &LineIndex) -> lsp_types::Diagnostic {
    let severity = match diag.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    };
    lsp_types::Diagnostic {
        range: lines.range(diag.range),
        severity: Some(severity),
        source: Some(diag.source.to_string()),
        message: diag.message.clone(),
        ..Default::default()
    }
}

/// Diagnostics for an open document, at most `limit` of them. Paths in
/// manifests and scripts resolve against the document's directory.
pub fn compute_diagnostics(
    doc: &DocumentInfo,
    provider: &dyn SourceProvider,
    limit: usize,
    encoding: Encoding,
) -> Vec<lsp_types::Diagnostic> {
    let base_dir = doc.path.parent().unwrap_or(Path::new("."));
    let diags = doc.analysis.diagnostics(base_dir, provider);
    if diags.len() > limit {
        tracing::debug!(
            total = diags.len(),
            limit,
            path = %doc.path.display(),
            "truncating diagnostics"
        );
    }
    let lines = LineIndex::new(&doc.analysis.text, encoding);
    diags.iter().take(limit).map(|d| to_lsp(d, &lines)).collect()
}
