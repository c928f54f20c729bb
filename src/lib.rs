//! sheets - a reactive spreadsheet workbook.
//!
//! Cells hold literal values or formulas. Editing a cell recomputes exactly
//! the cells that depend on it, reports circular references as
//! `#CIRCREF!` values and tells registered listeners which values changed.
//!
//! ```
//! use sheets::{CellValue, Workbook};
//!
//! let mut wb = Workbook::new();
//! wb.new_sheet(None).unwrap();
//! wb.set_cell_contents("Sheet1", "A1", Some("2")).unwrap();
//! wb.set_cell_contents("Sheet1", "B1", Some("=A1 * 21")).unwrap();
//! assert_eq!(wb.get_cell_value("Sheet1", "B1").unwrap().to_string(), "42");
//! assert!(matches!(wb.get_cell_value("Sheet1", "C1").unwrap(), CellValue::Empty));
//! ```

pub use sheets_core::{
    CellChangeListener, CellError, CellErrorType, CellRef, CellValue, EngineConfig, Result,
    SheetExtent, SheetsError, Workbook,
};

/// Formula front end, evaluator and dependency graph.
pub use sheets_engine::engine;
