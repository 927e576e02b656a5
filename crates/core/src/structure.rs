//! Line-oriented checks for build manifests and run scripts.
//!
//! These formats have no grammar worth a parser: each non-blank,
//! non-comment line is a whitespace-separated list of fields. The checks
//! produce the same [`Diagnostic`] records as the AST-derived generators.

use std::collections::HashMap;
use std::path::Path;

use crate::diagnostics::{Diagnostic, Range};
use crate::source::SourceProvider;

/// A field and the column it starts at.
#[derive(Debug, Clone, Copy)]
struct Field<'t> {
    col: u32,
    text: &'t str,
}

impl Field<'_> {
    fn range(&self, line: u32) -> Range {
        Range::new(
            line,
            self.col,
            line,
            self.col + self.text.chars().count() as u32,
        )
    }
}

fn fields(line: &str) -> Vec<Field<'_>> {
    let mut out = Vec::new();
    let mut start: Option<(usize, u32)> = None;
    let mut col = 0u32;
    for (byte, c) in line.char_indices() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some((byte, col)),
            (true, Some((from, from_col))) => {
                out.push(Field {
                    col: from_col,
                    text: &line[from..byte],
                });
                start = None;
            }
            _ => {}
        }
        col += 1;
    }
    if let Some((from, from_col)) = start {
        out.push(Field {
            col: from_col,
            text: &line[from..],
        });
    }
    out
}

/// Range from the first to the last field of a line.
fn line_range(line: u32, fields: &[Field<'_>]) -> Range {
    match (fields.first(), fields.last()) {
        (Some(first), Some(last)) => {
            let end = last.range(line);
            Range::new(line, first.col, line, end.end_col)
        }
        _ => Range::new(line, 0, line, 0),
    }
}

/// Lines that carry content, with their 0-based numbers and fields.
fn entries(text: &str) -> impl Iterator<Item = (u32, Vec<Field<'_>>)> {
    text.lines().enumerate().filter_map(|(i, line)| {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            None
        } else {
            Some((i as u32, fields(line)))
        }
    })
}

fn field_count(line: u32, fields: &[Field<'_>], expected: usize) -> Option<Diagnostic> {
    (fields.len() != expected).then(|| {
        Diagnostic::error(
            line_range(line, fields),
            format!(
                "Expected {} fields but found {}",
                expected,
                fields.len()
            ),
        )
    })
}

/// Extension and existence checks for a referenced file.
fn check_file(
    line: u32,
    field: Field<'_>,
    allowed: &[&str],
    base_dir: &Path,
    provider: &dyn SourceProvider,
) -> Option<Diagnostic> {
    let ext = Path::new(field.text)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !allowed.contains(&ext) {
        let expected: Vec<String> = allowed.iter().map(|e| format!(".{}", e)).collect();
        return Some(Diagnostic::error(
            field.range(line),
            format!(
                "Expected a {} file but found '{}'",
                expected.join(" or "),
                field.text
            ),
        ));
    }
    let path = provider.resolve(base_dir, field.text);
    if !provider.is_file(&path) {
        return Some(Diagnostic::error(
            field.range(line),
            format!("File not found: {}", field.text),
        ));
    }
    None
}

/// Check a build manifest: `name <id>`, `dataset <file.hdf>` and
/// `ruleset <file.hrf>` entries, paths relative to `base_dir`.
pub fn validate_build_manifest(
    text: &str,
    base_dir: &Path,
    provider: &dyn SourceProvider,
) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let mut name_line: Option<u32> = None;
    let mut seen_paths: HashMap<&str, u32> = HashMap::new();

    for (line, fields) in entries(text) {
        if let Some(d) = field_count(line, &fields, 2) {
            diags.push(d);
            continue;
        }
        let (key, value) = (fields[0], fields[1]);
        match key.text {
            "name" => match name_line {
                Some(first) => diags.push(Diagnostic::error(
                    key.range(line),
                    format!("Field 'name' is already defined on line {}", first + 1),
                )),
                None => name_line = Some(line),
            },
            "dataset" | "ruleset" => {
                let ext = if key.text == "dataset" { "hdf" } else { "hrf" };
                if let Some(d) = check_file(line, value, &[ext], base_dir, provider) {
                    diags.push(d);
                }
                if let Some(first) = seen_paths.get(value.text) {
                    diags.push(Diagnostic::warning(
                        value.range(line),
                        format!(
                            "Duplicate entry: '{}' is already listed on line {}",
                            value.text,
                            first + 1
                        ),
                    ));
                } else {
                    seen_paths.insert(value.text, line);
                }
            }
            other => diags.push(Diagnostic::error(
                key.range(line),
                format!("Unknown field '{}'", other),
            )),
        }
    }
    diags
}

/// Check a run script: `load <file>`, `query <expr…>` and
/// `flag <name> <true|false>` commands.
pub fn validate_run_script(
    text: &str,
    base_dir: &Path,
    provider: &dyn SourceProvider,
) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let mut loaded: HashMap<&str, u32> = HashMap::new();
    let mut flags: HashMap<&str, u32> = HashMap::new();

    for (line, fields) in entries(text) {
        let command = fields[0];
        match command.text {
            "load" => {
                if let Some(d) = field_count(line, &fields, 2) {
                    diags.push(d);
                    continue;
                }
                let file = fields[1];
                if let Some(d) = check_file(line, file, &["hdf", "hrf"], base_dir, provider) {
                    diags.push(d);
                }
                if let Some(first) = loaded.get(file.text) {
                    diags.push(Diagnostic::warning(
                        file.range(line),
                        format!(
                            "'{}' is already loaded on line {}",
                            file.text,
                            first + 1
                        ),
                    ));
                } else {
                    loaded.insert(file.text, line);
                }
            }
            "query" => {
                if fields.len() < 2 {
                    diags.push(Diagnostic::error(
                        command.range(line),
                        "Expected a query after 'query'",
                    ));
                }
            }
            "flag" => {
                if let Some(d) = field_count(line, &fields, 3) {
                    diags.push(d);
                    continue;
                }
                let (name, value) = (fields[1], fields[2]);
                if value.text != "true" && value.text != "false" {
                    diags.push(Diagnostic::error(
                        value.range(line),
                        format!("Expected 'true' or 'false' but found '{}'", value.text),
                    ));
                }
                if let Some(first) = flags.get(name.text) {
                    diags.push(Diagnostic::warning(
                        name.range(line),
                        format!(
                            "Flag '{}' is already set on line {}",
                            name.text,
                            first + 1
                        ),
                    ));
                } else {
                    flags.insert(name.text, line);
                }
            }
            other => diags.push(Diagnostic::error(
                command.range(line),
                format!("Unknown command '{}'", other),
            )),
        }
    }
    diags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::source::InMemoryProvider;

    fn provider() -> InMemoryProvider {
        InMemoryProvider::default()
            .with_file("/kb/family.hdf", "parent(art, bob).")
            .with_file("/kb/family.hrf", "grandparent(X, Z) :- parent(X, Y) & parent(Y, Z).")
    }

    #[test]
    fn fields_track_columns() {
        let f = fields("  load   family.hdf ");
        assert_eq!(f.len(), 2);
        assert_eq!((f[0].col, f[0].text), (2, "load"));
        assert_eq!((f[1].col, f[1].text), (9, "family.hdf"));
    }

    #[test]
    fn valid_manifest() {
        let text = "% family knowledge base\nname family\n\ndataset family.hdf\nruleset family.hrf\n";
        let diags = validate_build_manifest(text, Path::new("/kb"), &provider());
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn manifest_problems() {
        let text = "name family\nname other\ndataset family.hrf\nruleset missing.hrf\nruleset family.hrf\nruleset family.hrf\nextra a b\noutput x\n";
        let diags = validate_build_manifest(text, Path::new("/kb"), &provider());
        let messages: Vec<&str> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Field 'name' is already defined on line 1",
                "Expected a .hdf file but found 'family.hrf'",
                "File not found: missing.hrf",
                "Duplicate entry: 'family.hrf' is already listed on line 3",
                "Expected 2 fields but found 3",
                "Unknown field 'output'",
            ]
        );
        assert_eq!(diags[0].range, Range::new(1, 0, 1, 4));
        assert_eq!(diags[3].severity, Severity::Warning);
        assert_eq!(diags[4].range, Range::new(6, 0, 6, 9));
    }

    #[test]
    fn duplicate_manifest_path_listed_once_per_repeat() {
        let text = "dataset family.hdf\ndataset family.hdf\ndataset family.hdf\n";
        let diags = validate_build_manifest(text, Path::new("/kb"), &provider());
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.severity == Severity::Warning));
    }

    #[test]
    fn valid_script() {
        let text = "load family.hdf\nload family.hrf\nflag trace true\nquery grandparent(art, X)\n";
        let diags = validate_run_script(text, Path::new("/kb"), &provider());
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn script_problems() {
        let text = "load family.txt\nload family.hdf\nload family.hdf\nflag trace yes\nflag trace false\nflag x\nquery\nrun all\n";
        let diags = validate_run_script(text, Path::new("/kb"), &provider());
        let messages: Vec<&str> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Expected a .hdf or .hrf file but found 'family.txt'",
                "'family.hdf' is already loaded on line 2",
                "Expected 'true' or 'false' but found 'yes'",
                "Flag 'trace' is already set on line 4",
                "Expected 3 fields but found 2",
                "Expected a query after 'query'",
                "Unknown command 'run'",
            ]
        );
        assert_eq!(diags[2].range, Range::new(3, 11, 3, 14));
    }
}
