//! Workbook state and logic.
//!
//! A [`Workbook`] owns the cell arena, the dependency graph between cells
//! and the registered change listeners. Every public mutation writes its
//! new contents first, then recomputes and notifies once.

mod ops;
mod sheets;
mod state;
mod store;
mod update;

pub use state::{CellChangeListener, SheetExtent, Workbook, is_valid_sheet_name};
