use log::info;
use std::fmt;

use super::store::{CellStore, SheetId};
use crate::config::EngineConfig;
use crate::error::{Result, SheetsError};
use sheets_engine::engine::{CellRef, DependencyGraph};

/// Callback invoked once per batch with the `(sheet, location)` of every
/// cell whose value changed.
pub type CellChangeListener = Box<dyn FnMut(&Workbook, &[(String, String)]) + Send>;

/// Number of columns and rows spanned by a sheet's non-blank cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SheetExtent {
    pub cols: usize,
    pub rows: usize,
}

impl SheetExtent {
    pub(crate) fn include(&mut self, loc: CellRef) {
        self.cols = self.cols.max(loc.col + 1);
        self.rows = self.rows.max(loc.row + 1);
    }

    /// Whether `loc` sits on the right or bottom edge of the extent.
    pub(crate) fn is_bound(&self, loc: CellRef) -> bool {
        loc.col + 1 == self.cols || loc.row + 1 == self.rows
    }
}

#[derive(Debug)]
pub(crate) struct Sheet {
    pub id: SheetId,
    pub name: String,
    pub extent: SheetExtent,
}

/// A collection of named sheets whose cells recompute as their inputs change.
pub struct Workbook {
    pub(crate) config: EngineConfig,
    /// Sheets in display order.
    pub(crate) sheets: Vec<Sheet>,
    pub(crate) next_sheet_id: u32,
    pub(crate) store: CellStore,
    pub(crate) graph: DependencyGraph,
    pub(crate) listeners: Vec<CellChangeListener>,
}

impl Workbook {
    /// Create an empty workbook with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        info!("creating workbook (version {})", config.version);
        Workbook {
            config,
            sheets: Vec::new(),
            next_sheet_id: 0,
            store: CellStore::new(),
            graph: DependencyGraph::new(),
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheet_index(name)
            .map(|i| &self.sheets[i])
            .ok_or_else(|| SheetsError::SheetNotFound(name.to_string()))
    }

    pub(crate) fn sheet_by_id(&self, id: SheetId) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.id == id)
    }

    pub(crate) fn sheet_by_id_mut(&mut self, id: SheetId) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.id == id)
    }

    pub(crate) fn allocate_sheet_id(&mut self) -> SheetId {
        let id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        id
    }

    /// Check `name` is usable for a sheet, ignoring the sheet at `except`.
    pub(crate) fn validate_sheet_name(&self, name: &str, except: Option<SheetId>) -> Result<()> {
        if !is_valid_sheet_name(name) {
            return Err(SheetsError::InvalidSheetName(name.to_string()));
        }
        let clash = self
            .sheets
            .iter()
            .any(|s| Some(s.id) != except && s.name.eq_ignore_ascii_case(name));
        if clash {
            return Err(SheetsError::DuplicateSheetName(name.to_string()));
        }
        Ok(())
    }

    /// First `SheetN` not already taken.
    pub(crate) fn default_sheet_name(&self) -> String {
        (1..)
            .map(|n| format!("Sheet{}", n))
            .find(|name| self.sheet_index(name).is_none())
            .unwrap_or_default()
    }

    /// Parse a host-supplied location such as `B12`.
    pub(crate) fn parse_location(loc: &str) -> Result<CellRef> {
        CellRef::from_str(loc.trim()).ok_or_else(|| SheetsError::InvalidLocation(loc.to_string()))
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Workbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workbook")
            .field("sheets", &self.sheets)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

const FORBIDDEN_SHEET_CHARS: &[char] = &['\'', '"', '/', '<', '=', '>', '[', ']', '+'];

/// Sheet names are non-empty, carry no surrounding whitespace and avoid
/// characters that would confuse the formula lexer.
pub fn is_valid_sheet_name(name: &str) -> bool {
    !name.is_empty()
        && name.trim() == name
        && !name.contains(FORBIDDEN_SHEET_CHARS)
        && !name.chars().any(char::is_control)
}
