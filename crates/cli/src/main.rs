use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use epilog_core::{
    analyze, Analysis, Diagnostic, Dialect, EpilogError, FileSystemProvider, Severity,
    SourceProvider,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `EPILOG_LOG=debug`.
const LOG_ENV: &str = "EPILOG_LOG";

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Epilog language tooling.
#[derive(Parser)]
#[command(name = "epilog", version, about = "Epilog language tooling")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Log filter for stderr, e.g. `debug` or `epilog_lsp=trace`.
    /// Overrides EPILOG_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report diagnostics for datasets, rulesets, build manifests and run scripts
    Check {
        /// Files to check; the dialect comes from the extension
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the token stream of a dataset or ruleset
    Tokens {
        /// Path to a .hdf or .hrf file
        file: PathBuf,
    },

    /// Print the syntax tree of a dataset or ruleset as JSON
    Ast {
        /// Path to a .hdf or .hrf file
        file: PathBuf,
    },

    /// Start the Language Server Protocol server over stdio
    Lsp,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Check { files } => cmd_check(&files, cli.output),
        Commands::Tokens { file } => cmd_tokens(&file, cli.output),
        Commands::Ast { file } => cmd_ast(&file),
        Commands::Lsp => {
            if let Err(e) = epilog_lsp::run() {
                eprintln!("LSP server error: {}", e);
                process::exit(1);
            }
        }
    }
}

/// Log to stderr; stdout carries command output and the LSP protocol.
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(file: &Path) -> Result<Analysis, EpilogError> {
    let dialect = Dialect::from_path(file)?;
    let text = FileSystemProvider.read_source(file)?;
    Ok(analyze(&text, dialect))
}

/// Like [`load`], but only for dialects with a syntax tree.
fn load_tree(file: &Path) -> Analysis {
    let analysis = load(file).unwrap_or_else(|e| fail(&e));
    if analysis.ast.is_none() {
        eprintln!(
            "error: {} has no syntax tree; expected a .hdf or .hrf file",
            file.display()
        );
        process::exit(1);
    }
    analysis
}

fn fail(e: &EpilogError) -> ! {
    eprintln!("error: {}", e);
    process::exit(1);
}

#[derive(Serialize)]
struct FileReport<'a> {
    path: &'a Path,
    diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn cmd_check(files: &[PathBuf], output: OutputFormat) {
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let report = match load(file) {
            Ok(analysis) => {
                let base_dir = file.parent().unwrap_or(Path::new("."));
                FileReport {
                    path: file,
                    diagnostics: analysis.diagnostics(base_dir, &FileSystemProvider),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "skipping file");
                FileReport {
                    path: file,
                    diagnostics: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        reports.push(report);
    }

    match output {
        OutputFormat::Json => print_json(&reports),
        OutputFormat::Text => {
            for report in &reports {
                if let Some(error) = &report.error {
                    eprintln!("error: {}", error);
                }
                for d in &report.diagnostics {
                    println!(
                        "{}:{}:{}: {}: {}",
                        report.path.display(),
                        d.range.start_line + 1,
                        d.range.start_col + 1,
                        severity_label(d.severity),
                        d.message
                    );
                }
            }
        }
    }

    let failed = reports.iter().any(|r| {
        r.error.is_some()
            || r.diagnostics
                .iter()
                .any(|d| d.severity == Severity::Error)
    });
    if failed {
        process::exit(1);
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    }
}

fn cmd_tokens(file: &Path, output: OutputFormat) {
    let analysis = load_tree(file);
    match output {
        OutputFormat::Json => print_json(&analysis.tokens),
        OutputFormat::Text => {
            for tok in &analysis.tokens {
                let mut line = format!(
                    "{}:{} {:?} {:?}",
                    tok.span.line, tok.span.start_col, tok.kind, tok.text
                );
                if let Some(error) = &tok.error {
                    line.push_str(&format!(" ({})", error));
                }
                println!("{}", line);
            }
        }
    }
}

fn cmd_ast(file: &Path) {
    let analysis = load_tree(file);
    print_json(&analysis.ast);
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("serialization error: {}", e);
            process::exit(1);
        }
    }
}
