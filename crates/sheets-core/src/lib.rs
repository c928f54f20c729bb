//! sheets-core - workbook model: cell store, sheets, recalculation and change notification.

pub mod config;
pub mod error;
pub mod workbook;

pub use config::EngineConfig;
pub use error::{Result, SheetsError};
pub use workbook::{CellChangeListener, SheetExtent, Workbook};

pub use sheets_engine::engine::{CellError, CellErrorType, CellRef, CellValue};
