//! Spreadsheet engine API.
//!
//! This module provides the core computation engine for the spreadsheet:
//!
//! - [`CellRef`], [`AnchoredRef`] - Cell reference parsing (A1 notation ↔ row/col indices)
//! - [`CellValue`], [`CellError`] - The value model and its coercion rules
//! - [`parse_formula`] - Formula text → [`Expr`]
//! - [`extract_dependencies`] - Static references of a formula
//! - [`Evaluator`] - Evaluate a formula against a [`CellResolver`]
//! - [`DependencyGraph`] - Static/dynamic edges, waitlist and cycle detection
//! - [`offset_formula_references`], [`rename_sheet_references`] - Formula text rewriting
//! - [`compare_rows`] - Row ordering for sorts
//! - [`format_value`] - Format values for display

mod ast;
mod cell_ref;
mod cycle;
mod deps;
pub(crate) mod eval;
mod format;
mod graph;
mod parser;
mod rewrite;
mod sort;
mod value;

pub use ast::{ArithOp, CompareOp, Expr, Reference};
pub use cell_ref::{AnchoredRef, CellRef, MAX_COL, MAX_ROW};
pub use deps::{extract_dependencies, has_dynamic_calls};
pub use eval::{CellResolver, Evaluator};
pub use format::{format_number, format_value};
pub use graph::{CellId, DependencyGraph};
pub use parser::{MAX_NESTING, ParseError, parse_formula, parse_reference};
pub use rewrite::{
    offset_formula_references, quote_sheet_name, rename_sheet_references, sheet_name_needs_quotes,
};
pub use sort::{SortKey, compare_for_sort, compare_rows};
pub use value::{CellError, CellErrorType, CellValue, parse_decimal};
