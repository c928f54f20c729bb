//! Circular references: detection, repair and the cells around a loop.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use sheets::CellErrorType::CircularReference;
use sheets::Workbook;

#[test]
fn test_self_reference_is_circular() {
    let mut wb = workbook();
    set(&mut wb, "A1", "=A1");
    assert_eq!(error_at(&wb, "Sheet1", "A1"), Some(CircularReference));

    set(&mut wb, "A1", "=A1 + 1");
    assert_eq!(error_at(&wb, "Sheet1", "A1"), Some(CircularReference));

    set(&mut wb, "A1", "3");
    assert_eq!(value(&wb, "A1"), num("3"));
}

#[test]
fn test_three_cycle_then_repair() {
    let mut wb = workbook();
    set(&mut wb, "A1", "=A2");
    set(&mut wb, "A2", "=A3");
    set(&mut wb, "A3", "=A1");
    for loc in ["A1", "A2", "A3"] {
        assert_eq!(error_at(&wb, "Sheet1", loc), Some(CircularReference), "{}", loc);
    }

    set(&mut wb, "A2", "5");
    for loc in ["A1", "A2", "A3"] {
        assert_eq!(value(&wb, loc), num("5"), "{}", loc);
    }
}

#[test]
fn test_disjoint_cycles_are_independent() {
    let mut wb = workbook();
    set(&mut wb, "A1", "=B1");
    set(&mut wb, "B1", "=A1");
    set(&mut wb, "C1", "=D1");
    set(&mut wb, "D1", "=C1");

    set(&mut wb, "A1", "1");
    assert_eq!(value(&wb, "A1"), num("1"));
    assert_eq!(value(&wb, "B1"), num("1"));
    assert_eq!(error_at(&wb, "Sheet1", "C1"), Some(CircularReference));
    assert_eq!(error_at(&wb, "Sheet1", "D1"), Some(CircularReference));
}

#[test]
fn test_cells_downstream_of_a_loop() {
    let mut wb = workbook();
    set(&mut wb, "A1", "=B1");
    set(&mut wb, "B1", "=A1");
    set(&mut wb, "C1", "=A1 + 1");
    set(&mut wb, "D1", "=ISERROR(C1)");

    // C1 only reads the loop; it carries the error without being part of it.
    assert_eq!(error_at(&wb, "Sheet1", "C1"), Some(CircularReference));
    assert_eq!(value(&wb, "D1"), sheets::CellValue::Boolean(true));

    set(&mut wb, "B1", "3");
    assert_eq!(value(&wb, "A1"), num("3"));
    assert_eq!(value(&wb, "C1"), num("4"));
    assert_eq!(value(&wb, "D1"), sheets::CellValue::Boolean(false));
}

#[test]
fn test_cell_joining_an_existing_loop() {
    let mut wb = workbook();
    set(&mut wb, "A1", "=B1");
    set(&mut wb, "B1", "=A1");
    set(&mut wb, "C1", "7");

    // C1 now reads the loop and the loop reads C1.
    set(&mut wb, "C1", "=A1");
    set(&mut wb, "A1", "=B1 + C1");
    for loc in ["A1", "B1", "C1"] {
        assert_eq!(error_at(&wb, "Sheet1", loc), Some(CircularReference), "{}", loc);
    }

    set(&mut wb, "C1", "2");
    assert_eq!(error_at(&wb, "Sheet1", "A1"), Some(CircularReference));
    assert_eq!(value(&wb, "C1"), num("2"));
}

#[test]
fn test_if_branch_can_open_and_close_a_loop() {
    let mut wb = workbook();
    set(&mut wb, "A2", "FALSE");
    set(&mut wb, "A1", "=IF(A2, A1, 5)");
    assert_eq!(value(&wb, "A1"), num("5"));

    set(&mut wb, "A2", "TRUE");
    assert_eq!(error_at(&wb, "Sheet1", "A1"), Some(CircularReference));

    set(&mut wb, "A2", "FALSE");
    assert_eq!(value(&wb, "A1"), num("5"));
}

#[test]
fn test_iferror_does_not_hide_its_own_loop() {
    let mut wb = workbook();
    set(&mut wb, "A1", "=IFERROR(A1, 0)");
    assert_eq!(error_at(&wb, "Sheet1", "A1"), Some(CircularReference));
}

#[test]
fn test_choose_loop_through_another_cell() {
    let mut wb = workbook();
    set(&mut wb, "A2", "1");
    set(&mut wb, "B1", "=A1");
    set(&mut wb, "A1", "=CHOOSE(A2, B1, C1)");
    assert_eq!(error_at(&wb, "Sheet1", "A1"), Some(CircularReference));
    assert_eq!(error_at(&wb, "Sheet1", "B1"), Some(CircularReference));

    set(&mut wb, "A2", "2");
    assert_eq!(value(&wb, "A1"), num("0"));
    assert_eq!(value(&wb, "B1"), num("0"));

    set(&mut wb, "C1", "8");
    assert_eq!(value(&wb, "B1"), num("8"));
}

#[test]
fn test_long_chain_recomputes_and_loops() {
    let mut wb = workbook();
    set(&mut wb, "A1", "1");
    for row in 2..=3000 {
        set(&mut wb, &format!("A{}", row), &format!("=A{} + 1", row - 1));
    }
    assert_eq!(value(&wb, "A3000"), num("3000"));

    set(&mut wb, "A1", "10");
    assert_eq!(value(&wb, "A3000"), num("3009"));

    set(&mut wb, "A1", "=A3000");
    assert_eq!(error_at(&wb, "Sheet1", "A1"), Some(CircularReference));
    assert_eq!(error_at(&wb, "Sheet1", "A1500"), Some(CircularReference));

    set(&mut wb, "A1", "0");
    assert_eq!(value(&wb, "A3000"), num("2999"));
}

fn replay() -> Workbook {
    let mut wb = workbook();
    let edits = [
        ("A1", "=B1 + C1"),
        ("B1", "=C1 * 2"),
        ("C1", "4"),
        ("D1", "=IF(A1 > 10, A1, B1)"),
        ("E1", "=E2"),
        ("E2", "=E1"),
        ("C1", "1"),
        ("E2", "=D1"),
    ];
    for (loc, contents) in edits {
        set(&mut wb, loc, contents);
    }
    wb
}

#[test]
fn test_replaying_edits_is_deterministic() {
    let (first, second) = (replay(), replay());
    for loc in ["A1", "B1", "C1", "D1", "E1", "E2"] {
        assert_eq!(value(&first, loc), value(&second, loc), "{}", loc);
    }
    assert_eq!(value(&first, "A1"), num("3"));
    assert_eq!(value(&first, "D1"), num("2"));
    assert_eq!(value(&first, "E1"), num("2"));
}
