//! Cell arena.
//!
//! Cells live in a flat `Vec` and are addressed by [`CellId`]. A per-sheet
//! index maps locations to ids. Ids are never reused: when a sheet is
//! deleted its cells are detached from the index and left in the arena as
//! tombstones, so stale ids held by the graph can never alias a new cell.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use sheets_engine::engine::{CellId, CellRef, CellValue, Expr};

/// Stable identity of a sheet, independent of its name and position.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SheetId(pub u32);

/// What a cell's contents were classified as.
#[derive(Clone, Debug)]
pub enum Parsed {
    /// A constant (including blank, text and parse failures).
    Literal(CellValue),
    Formula(Arc<Expr>),
}

impl Default for Parsed {
    fn default() -> Self {
        Parsed::Literal(CellValue::Empty)
    }
}

#[derive(Clone, Debug)]
pub struct Cell {
    pub sheet: SheetId,
    pub loc: CellRef,
    /// Trimmed contents; `None` when blank.
    pub contents: Option<String>,
    pub value: CellValue,
    pub parsed: Parsed,
    pub in_cycle: bool,
    pub has_dynamic: bool,
    /// Cleared once the owning sheet is deleted.
    pub live: bool,
}

impl Cell {
    fn placeholder(sheet: SheetId, loc: CellRef) -> Cell {
        Cell {
            sheet,
            loc,
            contents: None,
            value: CellValue::Empty,
            parsed: Parsed::default(),
            in_cycle: false,
            has_dynamic: false,
            live: true,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self.parsed, Parsed::Formula(_))
    }
}

#[derive(Debug, Default)]
pub struct CellStore {
    cells: Vec<Cell>,
    index: HashMap<SheetId, BTreeMap<CellRef, CellId>>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the cell at `loc`, creating an empty placeholder if needed.
    pub fn get_or_create(&mut self, sheet: SheetId, loc: CellRef) -> CellId {
        let cells = &mut self.cells;
        *self
            .index
            .entry(sheet)
            .or_default()
            .entry(loc)
            .or_insert_with(|| {
                cells.push(Cell::placeholder(sheet, loc));
                CellId(cells.len() - 1)
            })
    }

    pub fn lookup(&self, sheet: SheetId, loc: CellRef) -> Option<CellId> {
        self.index.get(&sheet)?.get(&loc).copied()
    }

    pub fn get(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    pub fn get_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.0]
    }

    /// Every cell known on `sheet`, in row-major order.
    pub fn cells_on(&self, sheet: SheetId) -> Vec<CellId> {
        self.index
            .get(&sheet)
            .map(|cells| cells.values().copied().collect())
            .unwrap_or_default()
    }

    /// Drop `sheet` from the index and mark its cells dead.
    pub fn detach_sheet(&mut self, sheet: SheetId) -> Vec<CellId> {
        let ids: Vec<CellId> = self
            .index
            .remove(&sheet)
            .map(|cells| cells.into_values().collect())
            .unwrap_or_default();
        for &id in &ids {
            self.cells[id.0].live = false;
        }
        ids
    }

    /// Live cells that hold a formula.
    pub fn formula_cells(&self) -> Vec<CellId> {
        self.index
            .values()
            .flat_map(|cells| cells.values().copied())
            .filter(|&id| self.get(id).is_formula())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(name: &str) -> CellRef {
        CellRef::from_str(name).unwrap()
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut store = CellStore::new();
        let a = store.get_or_create(SheetId(0), loc("A1"));
        let b = store.get_or_create(SheetId(0), loc("B1"));
        assert_ne!(a, b);
        assert_eq!(store.get_or_create(SheetId(0), loc("A1")), a);
        assert_eq!(store.lookup(SheetId(0), loc("B1")), Some(b));
        assert_eq!(store.lookup(SheetId(1), loc("B1")), None);
        assert_eq!(store.get(a).value, CellValue::Empty);
    }

    #[test]
    fn test_cells_on_is_row_major() {
        let mut store = CellStore::new();
        let b2 = store.get_or_create(SheetId(0), loc("B2"));
        let c1 = store.get_or_create(SheetId(0), loc("C1"));
        let a2 = store.get_or_create(SheetId(0), loc("A2"));
        assert_eq!(store.cells_on(SheetId(0)), vec![c1, a2, b2]);
    }

    #[test]
    fn test_detach_sheet_leaves_tombstones() {
        let mut store = CellStore::new();
        let a = store.get_or_create(SheetId(0), loc("A1"));
        assert_eq!(store.detach_sheet(SheetId(0)), vec![a]);
        assert!(!store.get(a).live);
        assert!(store.cells_on(SheetId(0)).is_empty());

        let again = store.get_or_create(SheetId(0), loc("A1"));
        assert_ne!(again, a);
    }
}
