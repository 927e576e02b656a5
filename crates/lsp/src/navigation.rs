//! Go-to-definition for view predicates.
//!
//! A predicate name resolves to every rule that defines it, in source
//! order. Only rulesets carry rules, so other dialects never resolve.

use epilog_core::{find_token_at, Analysis, Dialect, Range, TokenKind};
use lsp_types::{Location, Position, Uri};

use crate::position::{Encoding, LineIndex};

/// Resolve the symbol at `position` (0-based, as sent by the client) to
/// its defining rules. `None` when the dialect has no definitions, the
/// position is not on a symbol, or the symbol is a base predicate.
pub fn goto_definition(
    analysis: &Analysis,
    uri: &Uri,
    position: Position,
    encoding: Encoding,
) -> Option<Vec<Location>> {
    if analysis.dialect != Dialect::Ruleset {
        return None;
    }
    let root = analysis.ast.as_ref()?;
    let lines = LineIndex::new(&analysis.text, encoding);
    let col = lines.from_client(position.line, position.character);
    let at = epilog_core::Position::new(position.line + 1, col);
    let token = find_token_at(root, at)?;
    if token.kind != TokenKind::Symbol {
        return None;
    }
    let sites = analysis.index.definitions(&token.text);
    if sites.is_empty() {
        tracing::debug!(name = %token.text, "no definition for symbol");
        return None;
    }
    Some(
        sites
            .iter()
            .map(|span| Location {
                uri: uri.clone(),
                range: lines.range(Range::from_span(*span)),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use epilog_core::analyze;

    fn uri() -> Uri {
        "file:///kb/family.hrf".parse().unwrap()
    }

    const FAMILY: &str = "anc(X, Y) :- parent(X, Y).\nanc(X, Z) :- parent(X, Y) & anc(Y, Z).\n";

    #[test]
    fn resolves_every_clause() {
        let analysis = analyze(FAMILY, Dialect::Ruleset);
        let locations = goto_definition(&analysis, &uri(), Position::new(1, 30), Encoding::Utf16).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].range.start, Position::new(0, 0));
        assert_eq!(locations[0].range.end, Position::new(0, 26));
        assert_eq!(locations[1].range.start, Position::new(1, 0));
        assert_eq!(locations[1].uri, uri());
    }

    #[test]
    fn base_predicates_and_variables_do_not_resolve() {
        let analysis = analyze(FAMILY, Dialect::Ruleset);
        // `parent`
        assert!(goto_definition(&analysis, &uri(), Position::new(0, 14), Encoding::Utf16).is_none());
        // `X`
        assert!(goto_definition(&analysis, &uri(), Position::new(0, 4), Encoding::Utf16).is_none());
        // past the end
        assert!(goto_definition(&analysis, &uri(), Position::new(9, 0), Encoding::Utf16).is_none());
    }

    #[test]
    fn utf16_columns_map_back_to_chars() {
        let text = "s(\"🦀\") :- t.\nu :- s(\"🦀\") & s(a).";
        let analysis = analyze(text, Dialect::Ruleset);
        // The last `s` is at char 14 and UTF-16 unit 15 of line 1.
        let locations =
            goto_definition(&analysis, &uri(), Position::new(1, 15), Encoding::Utf16).unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].range.end, Position::new(0, 13));
        let locations =
            goto_definition(&analysis, &uri(), Position::new(1, 14), Encoding::Utf32).unwrap();
        assert_eq!(locations[0].range.end, Position::new(0, 12));
    }

    #[test]
    fn datasets_never_resolve() {
        let analysis = analyze("anc(a, b).", Dialect::Dataset);
        assert!(goto_definition(&analysis, &uri(), Position::new(0, 1), Encoding::Utf16).is_none());
    }
}
