//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sheets::engine::parse_decimal;
use sheets::{CellErrorType, CellValue, Workbook};

pub type Changes = Vec<(String, String)>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A workbook with a single empty `Sheet1`.
pub fn workbook() -> Workbook {
    init_logging();
    let mut wb = Workbook::new();
    wb.new_sheet(None).expect("fresh workbook accepts Sheet1");
    wb
}

pub fn num(text: &str) -> CellValue {
    CellValue::number(parse_decimal(text).expect("test number"))
}

pub fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

pub fn set(wb: &mut Workbook, loc: &str, contents: &str) {
    wb.set_cell_contents("Sheet1", loc, Some(contents))
        .expect("set_cell_contents on Sheet1");
}

pub fn value(wb: &Workbook, loc: &str) -> CellValue {
    wb.get_cell_value("Sheet1", loc)
        .expect("get_cell_value on Sheet1")
}

pub fn error_at(wb: &Workbook, sheet: &str, loc: &str) -> Option<CellErrorType> {
    wb.get_cell_value(sheet, loc)
        .expect("get_cell_value")
        .error_type()
}

/// Register a listener that records every batch it is called with.
pub fn record_changes(wb: &mut Workbook) -> Arc<Mutex<Vec<Changes>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    wb.notify_cells_changed(move |_, changes| {
        sink.lock().expect("change log lock").push(changes.to_vec());
    });
    log
}

pub fn changes(sheet: &str, locs: &[&str]) -> Changes {
    locs.iter()
        .map(|loc| (sheet.to_string(), loc.to_string()))
        .collect()
}
