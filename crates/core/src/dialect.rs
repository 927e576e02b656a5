//! The Epilog file kinds and the grammar each one is parsed with.

use std::path::Path;

use serde::Serialize;

use crate::error::EpilogError;

/// The two AST-bearing grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Grammar {
    /// Ground facts only; variables are rejected by the lexer.
    Dataset,
    /// Rules, definitions and operations over variables.
    Ruleset,
}

/// Every file kind the tooling understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dialect {
    Dataset,
    Ruleset,
    BuildManifest,
    RunScript,
}

impl Dialect {
    /// Resolve an editor language id, e.g. `epilog-ruleset`.
    pub fn from_language_id(id: &str) -> Result<Dialect, EpilogError> {
        match id {
            "epilog-dataset" => Ok(Dialect::Dataset),
            "epilog-ruleset" => Ok(Dialect::Ruleset),
            "epilog-build" => Ok(Dialect::BuildManifest),
            "epilog-script" => Ok(Dialect::RunScript),
            other => Err(EpilogError::UnknownDialect(other.to_owned())),
        }
    }

    /// Resolve a file by its extension.
    pub fn from_path(path: &Path) -> Result<Dialect, EpilogError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match ext {
            "hdf" => Ok(Dialect::Dataset),
            "hrf" => Ok(Dialect::Ruleset),
            "epbuild" => Ok(Dialect::BuildManifest),
            "epscript" => Ok(Dialect::RunScript),
            _ => Err(EpilogError::UnknownDialect(path.display().to_string())),
        }
    }

    /// The grammar used to build an AST, if this dialect has one.
    pub fn grammar(self) -> Option<Grammar> {
        match self {
            Dialect::Dataset => Some(Grammar::Dataset),
            Dialect::Ruleset => Some(Grammar::Ruleset),
            Dialect::BuildManifest | Dialect::RunScript => None,
        }
    }
}
