//! Epilog Language Server Protocol implementation for IDE integration.
//!
//! Provides diagnostics, semantic token highlighting and go-to-definition
//! for datasets, rulesets, build manifests and run scripts. Connects to
//! editors via the `epilog lsp` CLI subcommand over stdio.

pub mod config;
pub mod diagnostics;
pub mod document;
pub mod navigation;
pub mod position;
pub mod semantic_tokens;
pub mod server;

/// Run the LSP server over stdio. This is the public entry point
/// called by `epilog lsp`.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    server::run()
}
