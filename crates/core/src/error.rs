use std::path::PathBuf;

/// Errors raised at the IO-bearing edges of the toolchain.
///
/// Lexing, parsing and validation never fail: malformed input is
/// represented as ERROR nodes and diagnostics. Only loading documents and
/// resolving their dialect can go wrong.
#[derive(Debug, thiserror::Error)]
pub enum EpilogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither the language id nor the file extension names a known dialect.
    #[error("unknown Epilog dialect: {0}")]
    UnknownDialect(String),
}

impl EpilogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EpilogError::Io {
            path: path.into(),
            source,
        }
    }
}
