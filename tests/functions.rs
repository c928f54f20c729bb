//! Formula evaluation through the workbook: operators, coercions and functions.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sheets::CellErrorType::{self, *};
use sheets::{EngineConfig, Workbook};

/// Sheet1 with a few inputs: A1=5, A2="text", A3=#DIV/0!, A4=TRUE, A5=" 12 ".
fn inputs() -> Workbook {
    let mut wb = workbook();
    set(&mut wb, "A1", "5");
    set(&mut wb, "A2", "text");
    set(&mut wb, "A3", "=1/0");
    set(&mut wb, "A4", "true");
    set(&mut wb, "A5", "=\" 12 \"");
    wb
}

fn eval(formula: &str) -> sheets::CellValue {
    let mut wb = inputs();
    set(&mut wb, "Z1", formula);
    value(&wb, "Z1")
}

#[rstest]
#[case("=A1 + A5", "17")]
#[case("=A1 * A4", "5")]
#[case("=A9 + 1", "1")]
#[case("=A9", "0")]
#[case("=-A1 / 4", "-1.25")]
#[case("=0.1 + 0.2", "0.3")]
#[case("=2.50 * 2", "5")]
#[case("=A1 & A9 & A4", "5TRUE")]
#[case("=A2 = \"TEXT\"", "TRUE")]
#[case("=A1 < A2", "TRUE")]
#[case("=A2 < A4", "TRUE")]
#[case("=A9 = 0", "TRUE")]
#[case("=A9 = \"\"", "TRUE")]
#[case("=A1 <> 5", "FALSE")]
#[case("=A1 != 4", "TRUE")]
#[case("=A1 == 5", "TRUE")]
#[case("=AND(A4, A1 > 3)", "TRUE")]
#[case("=or(FALSE, A9)", "FALSE")]
#[case("=XOR(TRUE, FALSE, TRUE)", "FALSE")]
#[case("=NOT(A9)", "TRUE")]
#[case("=EXACT(A2, \"Text\")", "FALSE")]
#[case("=ISBLANK(A9)", "TRUE")]
#[case("=ISERROR(A3)", "TRUE")]
#[case("=IF(A1 > 3, \"big\", \"small\")", "big")]
#[case("=IF(A9, 1)", "FALSE")]
#[case("=IFERROR(A3, \"none\")", "none")]
#[case("=CHOOSE(2, A1, A2, A3)", "text")]
#[case("=INDIRECT(\"A\" & 1) * 2", "10")]
#[case("=VERSION()", "1.2")]
fn test_formula_values(#[case] formula: &str, #[case] expected: &str) {
    assert_eq!(eval(formula).to_string(), expected, "{}", formula);
}

#[rstest]
#[case("=A2 + 1", TypeError)]
#[case("=A3 + A2", DivideByZero)]
#[case("=A2 + A3", DivideByZero)]
#[case("=A1 / (A1 - 5)", DivideByZero)]
#[case("=NOPE(1)", BadName)]
#[case("=NOT(1, 2)", TypeError)]
#[case("=CHOOSE(9, 1)", TypeError)]
#[case("=INDIRECT(\"not a ref\")", BadReference)]
#[case("=Missing!A1", BadReference)]
#[case("=A1 +", ParseError)]
#[case("=\"unterminated", ParseError)]
#[case("=#REF! + 1", BadReference)]
#[case("=A3 & \"x\"", DivideByZero)]
#[case("=A3 > 1", DivideByZero)]
fn test_formula_errors(#[case] formula: &str, #[case] expected: CellErrorType) {
    assert_eq!(eval(formula).error_type(), Some(expected), "{}", formula);
}

#[rstest]
#[case("#ref!", BadReference)]
#[case("#NAME?", BadName)]
#[case("#CIRCREF!", CircularReference)]
#[case("#ERROR!", ParseError)]
#[case("#VALUE!", TypeError)]
fn test_error_literals(#[case] contents: &str, #[case] expected: CellErrorType) {
    let mut wb = workbook();
    set(&mut wb, "A1", contents);
    set(&mut wb, "B1", "=A1");
    assert_eq!(error_at(&wb, "Sheet1", "A1"), Some(expected));
    assert_eq!(error_at(&wb, "Sheet1", "B1"), Some(expected));
}

#[test]
fn test_literal_contents() {
    let mut wb = workbook();
    set(&mut wb, "A1", "'=not a formula");
    set(&mut wb, "A2", "  007  ");
    set(&mut wb, "A3", "False");
    assert_eq!(value(&wb, "A1"), text("=not a formula"));
    assert_eq!(value(&wb, "A2"), num("7"));
    assert_eq!(value(&wb, "A3"), sheets::CellValue::Boolean(false));
    assert_eq!(
        wb.get_cell_contents("Sheet1", "A2").unwrap().as_deref(),
        Some("007")
    );
}

#[test]
fn test_configured_version() {
    let config = EngineConfig::from_toml_str("version = \"2.0-beta\"").unwrap();
    let mut wb = Workbook::with_config(config);
    wb.new_sheet(None).unwrap();
    set(&mut wb, "A1", "=VERSION()");
    assert_eq!(value(&wb, "A1"), text("2.0-beta"));
}

#[test]
fn test_deep_formulas_are_parse_errors() {
    let mut wb = inputs();
    let sum = |terms: usize| format!("={}", vec!["A1"; terms].join(" + "));

    set(&mut wb, "B1", &sum(400));
    assert_eq!(value(&wb, "B1"), num("2000"));

    set(&mut wb, "B2", &sum(2000));
    assert_eq!(error_at(&wb, "Sheet1", "B2"), Some(ParseError));

    set(&mut wb, "B3", &format!("={}A1{}", "(".repeat(300), ")".repeat(300)));
    assert_eq!(value(&wb, "B3"), num("5"));

    set(&mut wb, "B4", &format!("={}1{}", "(".repeat(1000), ")".repeat(1000)));
    assert_eq!(error_at(&wb, "Sheet1", "B4"), Some(ParseError));

    set(&mut wb, "B5", &format!("={}TRUE{}", "NOT(".repeat(1000), ")".repeat(1000)));
    assert_eq!(error_at(&wb, "Sheet1", "B5"), Some(ParseError));

    // Rejected cells still read like any other error.
    set(&mut wb, "C1", "=ISERROR(B2)");
    assert_eq!(value(&wb, "C1"), sheets::CellValue::Boolean(true));
}
