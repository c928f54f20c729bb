//! Change notification: exactly the cells whose values changed, once per edit.

mod common;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use common::*;
use pretty_assertions::assert_eq;

#[test]
fn test_exact_change_set() {
    let mut wb = workbook();
    set(&mut wb, "A1", "1");
    set(&mut wb, "B1", "=A1");
    set(&mut wb, "C1", "5");
    let log = record_changes(&mut wb);

    set(&mut wb, "A1", "2");
    assert_eq!(*log.lock().unwrap(), vec![changes("Sheet1", &["A1", "B1"])]);
}

#[test]
fn test_resetting_same_contents_reports_nothing() {
    let mut wb = workbook();
    set(&mut wb, "A1", "2");
    set(&mut wb, "B1", "=A1 * 2");
    let log = record_changes(&mut wb);

    set(&mut wb, "A1", "2");
    set(&mut wb, "A1", " 2.0 ");
    set(&mut wb, "B1", "=A1*2");
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_unchanged_dependents_are_not_reported() {
    let mut wb = workbook();
    set(&mut wb, "A1", "1");
    set(&mut wb, "B1", "=A1 > 0");
    set(&mut wb, "C1", "=B1");
    let log = record_changes(&mut wb);

    set(&mut wb, "A1", "7");
    assert_eq!(*log.lock().unwrap(), vec![changes("Sheet1", &["A1"])]);
}

#[test]
fn test_dynamic_dependencies_narrow_to_taken_branch() {
    let mut wb = workbook();
    set(&mut wb, "A2", "TRUE");
    set(&mut wb, "A3", "1");
    set(&mut wb, "A4", "2");
    set(&mut wb, "A1", "=IF(A2, A3, A4)");
    assert_eq!(value(&wb, "A1"), num("1"));
    let log = record_changes(&mut wb);

    set(&mut wb, "A4", "3");
    assert_eq!(value(&wb, "A1"), num("1"));
    assert_eq!(log.lock().unwrap().last(), Some(&changes("Sheet1", &["A4"])));

    set(&mut wb, "A2", "FALSE");
    assert_eq!(value(&wb, "A1"), num("3"));
    assert_eq!(
        log.lock().unwrap().last(),
        Some(&changes("Sheet1", &["A2", "A1"]))
    );

    set(&mut wb, "A3", "100");
    assert_eq!(value(&wb, "A1"), num("3"));
    assert_eq!(log.lock().unwrap().last(), Some(&changes("Sheet1", &["A3"])));

    set(&mut wb, "A4", "4");
    assert_eq!(value(&wb, "A1"), num("4"));
    assert_eq!(
        log.lock().unwrap().last(),
        Some(&changes("Sheet1", &["A4", "A1"]))
    );
}

#[test]
fn test_listeners_run_in_order_and_survive_panics() {
    let mut wb = workbook();
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&order);
    wb.notify_cells_changed(move |_, _| first.lock().unwrap().push("first"));
    wb.notify_cells_changed(|_, _| panic!("listener failure"));
    let third = Arc::clone(&order);
    wb.notify_cells_changed(move |_, _| third.lock().unwrap().push("third"));

    set(&mut wb, "A1", "1");
    set(&mut wb, "A1", "2");
    assert_eq!(*order.lock().unwrap(), vec!["first", "third", "first", "third"]);
    assert_eq!(value(&wb, "A1"), num("2"));
}

#[test]
fn test_listener_sees_updated_values() {
    let mut wb = workbook();
    set(&mut wb, "B1", "=A1 + 1");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    wb.notify_cells_changed(move |wb, changes| {
        for (sheet, loc) in changes {
            let value = wb.get_cell_value(sheet, loc).expect("changed cell exists");
            sink.lock().unwrap().push(format!("{}={}", loc, value));
        }
    });

    set(&mut wb, "A1", "41");
    assert_eq!(*seen.lock().unwrap(), vec!["A1=41", "B1=42"]);
}

#[test]
fn test_cycle_members_reported_once() {
    let mut wb = workbook();
    set(&mut wb, "A1", "=B1");
    let log = record_changes(&mut wb);

    set(&mut wb, "B1", "=A1");
    let batches = log.lock().unwrap();
    assert_eq!(batches.len(), 1);
    let mut cells = batches[0].clone();
    cells.sort();
    assert_eq!(cells, changes("Sheet1", &["A1", "B1"]));
}

#[test]
fn test_bulk_operations_notify_once() -> Result<()> {
    let mut wb = workbook();
    set(&mut wb, "A1", "1");
    set(&mut wb, "A2", "2");
    set(&mut wb, "C1", "=A1 + A2");
    let log = record_changes(&mut wb);

    wb.move_cells("Sheet1", "A1", "A2", "B1", None)?;
    let batches = log.lock().unwrap().clone();
    assert_eq!(batches.len(), 1);
    let mut cells = batches[0].clone();
    cells.sort();
    assert_eq!(cells, changes("Sheet1", &["A1", "A2", "B1", "B2", "C1"]));
    Ok(())
}

#[test]
fn test_deleted_sheet_cells_not_reported() -> Result<()> {
    let mut wb = workbook();
    wb.new_sheet(Some("Data"))?;
    wb.set_cell_contents("Data", "A1", Some("4"))?;
    wb.set_cell_contents("Data", "A2", Some("=A1"))?;
    set(&mut wb, "A1", "=Data!A2");
    let log = record_changes(&mut wb);

    wb.del_sheet("Data")?;
    assert_eq!(*log.lock().unwrap(), vec![changes("Sheet1", &["A1"])]);
    Ok(())
}

#[test]
fn test_new_sheet_reports_resolved_cells() -> Result<()> {
    let mut wb = workbook();
    set(&mut wb, "A1", "=Next!A1");
    set(&mut wb, "A2", "=7");
    let log = record_changes(&mut wb);

    wb.new_sheet(Some("Next"))?;
    assert_eq!(*log.lock().unwrap(), vec![changes("Sheet1", &["A1"])]);

    wb.new_sheet(None)?;
    assert_eq!(log.lock().unwrap().len(), 1);
    Ok(())
}
