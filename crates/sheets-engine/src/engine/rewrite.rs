//! Formula text rewriting.
//!
//! Formulas are stored as the text the user typed. When cells are moved,
//! copied or sorted, or a sheet is renamed, the references inside that text
//! are patched in place using the lexer's spans, so spacing and the case of
//! untouched text survive.
//!
//! - **Offsetting**: `A1` moved by (+1 col, +2 rows) becomes `B3`; `$`-anchored
//!   components stay put; references pushed off the grid become `#REF!`
//! - **Renaming**: `Old!A1` becomes `New!A1`, quoted when the new name needs it

use regex::Regex;
use std::sync::OnceLock;

use super::parser::{CellToken, Span, TokenKind, lex};

fn apply_edits(formula: &str, mut edits: Vec<(Span, String)>) -> String {
    edits.sort_by_key(|(span, _)| span.start);
    let mut out = String::with_capacity(formula.len());
    let mut cursor = 0;
    for (span, replacement) in edits {
        out.push_str(&formula[cursor..span.start]);
        out.push_str(&replacement);
        cursor = span.end;
    }
    out.push_str(&formula[cursor..]);
    out
}

/// Split `=body` into the prefix to keep and the body to lex.
fn formula_body(contents: &str) -> Option<(usize, &str)> {
    let trimmed = contents.trim_start();
    let lead = contents.len() - trimmed.len();
    trimmed.strip_prefix('=').map(|body| (lead + 1, body))
}

/// Offset all cell references in a formula by a relative column/row delta.
/// Used by move/copy/sort so relocated formulas keep relative references.
///
/// `contents` is the full cell contents including the leading `=`. Text that
/// is not a formula, or that does not lex, is returned unchanged.
pub fn offset_formula_references(contents: &str, delta_col: isize, delta_row: isize) -> String {
    if delta_col == 0 && delta_row == 0 {
        return contents.to_string();
    }
    let Some((offset, body)) = formula_body(contents) else {
        return contents.to_string();
    };
    let Ok(tokens) = lex(body) else {
        return contents.to_string();
    };

    let edits = tokens
        .iter()
        .filter_map(|tok| match &tok.kind {
            TokenKind::Cell(cell) => Some((tok.span, cell)),
            _ => None,
        })
        .filter_map(|(span, cell)| {
            let location = cell.location?;
            let shifted = location.offset(delta_col, delta_row);
            let (span, replacement) = match shifted {
                Some(shifted) => (cell.location_span, shifted.to_string()),
                None => (span, "#REF!".to_string()),
            };
            Some((
                Span::new(span.start + offset, span.end + offset),
                replacement,
            ))
        })
        .collect();

    apply_edits(contents, edits)
}

/// Whether a sheet name must be quoted to appear in a formula.
pub fn sheet_name_needs_quotes(name: &str) -> bool {
    static BARE_RE: OnceLock<Regex> = OnceLock::new();
    let re = BARE_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_]+$").expect("bare sheet name regex must compile")
    });
    !re.is_match(name)
}

/// Render a sheet name as it should appear before `!`.
pub fn quote_sheet_name(name: &str) -> String {
    if sheet_name_needs_quotes(name) {
        format!("'{}'", name)
    } else {
        name.to_string()
    }
}

fn sheet_edit(cell: &CellToken, old: &str, new: &str) -> Option<(Span, String, bool)> {
    let sheet = cell.sheet.as_ref()?;
    let renamed = sheet.name.eq_ignore_ascii_case(old);
    let name = if renamed { new } else { sheet.name.as_str() };
    Some((sheet.span, quote_sheet_name(name), renamed))
}

/// Rewrite references to sheet `old` so they name `new` instead.
///
/// Returns `None` when the formula does not mention `old`. Formulas that do
/// are also normalised: sheet names that don't need quotes lose them.
pub fn rename_sheet_references(contents: &str, old: &str, new: &str) -> Option<String> {
    let (offset, body) = formula_body(contents)?;
    let tokens = lex(body).ok()?;

    let mut mentioned = false;
    let mut edits = Vec::new();
    for tok in &tokens {
        let TokenKind::Cell(cell) = &tok.kind else {
            continue;
        };
        let Some((span, text, renamed)) = sheet_edit(cell, old, new) else {
            continue;
        };
        mentioned |= renamed;
        if body[span.start..span.end] != text {
            edits.push((Span::new(span.start + offset, span.end + offset), text));
        }
    }

    mentioned.then(|| apply_edits(contents, edits))
}
