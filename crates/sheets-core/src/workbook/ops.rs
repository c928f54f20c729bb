use std::collections::{BTreeMap, HashSet};

use super::Workbook;
use super::store::SheetId;
use crate::error::{Result, SheetsError};
use sheets_engine::engine::{
    CellRef, CellValue, SortKey, compare_rows, offset_formula_references,
};

/// Inclusive rectangle of cells on one sheet.
#[derive(Clone, Copy, Debug)]
struct Region {
    left: usize,
    top: usize,
    right: usize,
    bottom: usize,
}

impl Region {
    fn spanning(a: CellRef, b: CellRef) -> Region {
        Region {
            left: a.col.min(b.col),
            top: a.row.min(b.row),
            right: a.col.max(b.col),
            bottom: a.row.max(b.row),
        }
    }

    fn width(&self) -> usize {
        self.right - self.left + 1
    }

    fn height(&self) -> usize {
        self.bottom - self.top + 1
    }

    fn contains(&self, loc: CellRef) -> bool {
        (self.left..=self.right).contains(&loc.col) && (self.top..=self.bottom).contains(&loc.row)
    }
}

/// Pending writes for one batch, keyed so later writes win.
type Plan = BTreeMap<(SheetId, CellRef), Option<String>>;

impl Workbook {
    /// Set (or with `None`, clear) a cell's contents and recompute.
    pub fn set_cell_contents(&mut self, sheet: &str, loc: &str, contents: Option<&str>) -> Result<()> {
        let sheet_id = self.sheet(sheet)?.id;
        let loc = Self::parse_location(loc)?;
        let id = self.store.get_or_create(sheet_id, loc);
        self.write_contents(id, contents);
        self.commit([id]);
        Ok(())
    }

    /// The trimmed contents of a cell, or `None` when it is blank.
    pub fn get_cell_contents(&self, sheet: &str, loc: &str) -> Result<Option<String>> {
        let sheet_id = self.sheet(sheet)?.id;
        let loc = Self::parse_location(loc)?;
        Ok(self
            .store
            .lookup(sheet_id, loc)
            .and_then(|id| self.store.get(id).contents.clone()))
    }

    pub fn get_cell_value(&self, sheet: &str, loc: &str) -> Result<CellValue> {
        let sheet_id = self.sheet(sheet)?.id;
        let loc = Self::parse_location(loc)?;
        Ok(self.value_at(sheet_id, loc))
    }

    /// Register a callback for value changes.
    ///
    /// Listeners run in registration order after every batch that changed at
    /// least one value. A panicking listener is logged and skipped.
    pub fn notify_cells_changed<F>(&mut self, listener: F)
    where
        F: FnMut(&Workbook, &[(String, String)]) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Move the block between `start` and `end` so its top-left corner lands
    /// on `to`, shifting relative references in moved formulas.
    pub fn move_cells(
        &mut self,
        sheet: &str,
        start: &str,
        end: &str,
        to: &str,
        to_sheet: Option<&str>,
    ) -> Result<()> {
        self.transfer_cells(sheet, start, end, to, to_sheet, true)
    }

    /// Like [`Workbook::move_cells`], but the source block is left intact.
    pub fn copy_cells(
        &mut self,
        sheet: &str,
        start: &str,
        end: &str,
        to: &str,
        to_sheet: Option<&str>,
    ) -> Result<()> {
        self.transfer_cells(sheet, start, end, to, to_sheet, false)
    }

    fn transfer_cells(
        &mut self,
        sheet: &str,
        start: &str,
        end: &str,
        to: &str,
        to_sheet: Option<&str>,
        clear_source: bool,
    ) -> Result<()> {
        let source_sheet = self.sheet(sheet)?.id;
        let target_sheet = match to_sheet {
            Some(name) => self.sheet(name)?.id,
            None => source_sheet,
        };
        let source = Region::spanning(Self::parse_location(start)?, Self::parse_location(end)?);
        let dest = Self::parse_location(to)?;
        let target_corner = CellRef::new(dest.col + source.width() - 1, dest.row + source.height() - 1);
        if !CellRef::in_bounds(target_corner.col, target_corner.row) {
            return Err(SheetsError::InvalidLocation(format!(
                "{}: block of {}x{} does not fit",
                to,
                source.width(),
                source.height()
            )));
        }
        let target = Region::spanning(dest, target_corner);
        let delta_col = dest.col as isize - source.left as isize;
        let delta_row = dest.row as isize - source.top as isize;

        let moved = self.contents_in(source_sheet, source);
        let mut plan = Plan::new();
        if clear_source {
            for (loc, _) in &moved {
                plan.insert((source_sheet, *loc), None);
            }
        }
        for (loc, _) in self.contents_in(target_sheet, target) {
            plan.insert((target_sheet, loc), None);
        }
        for (loc, contents) in moved {
            let Some(shifted) = loc.offset(delta_col, delta_row) else {
                continue;
            };
            let contents = offset_formula_references(&contents, delta_col, delta_row);
            plan.insert((target_sheet, shifted), Some(contents));
        }

        self.apply_plan(plan);
        Ok(())
    }

    /// Sort the rows of a region.
    ///
    /// `sort_cols` holds 1-based column offsets within the region; a negative
    /// offset sorts that column descending. Earlier keys take precedence and
    /// rows that tie on every key keep their order.
    pub fn sort_region(&mut self, sheet: &str, start: &str, end: &str, sort_cols: &[i32]) -> Result<()> {
        let sheet_id = self.sheet(sheet)?.id;
        let region = Region::spanning(Self::parse_location(start)?, Self::parse_location(end)?);
        let keys = sort_keys(sort_cols, region.width())?;

        let rows: Vec<Vec<CellValue>> = (region.top..=region.bottom)
            .map(|row| {
                keys.iter()
                    .map(|key| self.value_at(sheet_id, CellRef::new(region.left + key.column, row)))
                    .collect()
            })
            .collect();
        let mut order: Vec<usize> = (0..region.height()).collect();
        order.sort_by(|&a, &b| compare_rows(&rows[a], &rows[b], &keys));

        let mut by_row: BTreeMap<usize, Vec<(usize, String)>> = BTreeMap::new();
        let mut plan = Plan::new();
        for (loc, contents) in self.contents_in(sheet_id, region) {
            plan.insert((sheet_id, loc), None);
            by_row
                .entry(loc.row - region.top)
                .or_default()
                .push((loc.col, contents));
        }
        for (new_row, &old_row) in order.iter().enumerate() {
            let Some(cells) = by_row.get(&old_row) else {
                continue;
            };
            let delta_row = new_row as isize - old_row as isize;
            for (col, contents) in cells {
                let loc = CellRef::new(*col, region.top + new_row);
                let contents = offset_formula_references(contents, 0, delta_row);
                plan.insert((sheet_id, loc), Some(contents));
            }
        }

        self.apply_plan(plan);
        Ok(())
    }

    fn value_at(&self, sheet: SheetId, loc: CellRef) -> CellValue {
        self.store
            .lookup(sheet, loc)
            .map(|id| self.store.get(id).value.clone())
            .unwrap_or_default()
    }

    /// Non-blank contents inside `region`, row-major.
    fn contents_in(&self, sheet: SheetId, region: Region) -> Vec<(CellRef, String)> {
        self.store
            .cells_on(sheet)
            .into_iter()
            .map(|id| self.store.get(id))
            .filter(|cell| region.contains(cell.loc))
            .filter_map(|cell| Some((cell.loc, cell.contents.clone()?)))
            .collect()
    }

    /// Write every planned change that differs from the current contents,
    /// then recompute once.
    fn apply_plan(&mut self, plan: Plan) {
        let mut seeds = Vec::new();
        for ((sheet, loc), contents) in plan {
            let current = self
                .store
                .lookup(sheet, loc)
                .and_then(|id| self.store.get(id).contents.as_deref());
            if current == contents.as_deref().map(str::trim) {
                continue;
            }
            let id = self.store.get_or_create(sheet, loc);
            self.write_contents(id, contents.as_deref());
            seeds.push(id);
        }
        self.commit(seeds);
    }
}

fn sort_keys(sort_cols: &[i32], width: usize) -> Result<Vec<SortKey>> {
    if sort_cols.is_empty() {
        return Err(SheetsError::InvalidSortColumns("no sort columns given".into()));
    }
    let mut seen = HashSet::new();
    sort_cols
        .iter()
        .map(|&col| {
            let column = col.unsigned_abs() as usize;
            if column == 0 || column > width {
                return Err(SheetsError::InvalidSortColumns(format!(
                    "column {} is outside a region {} wide",
                    col, width
                )));
            }
            if !seen.insert(column) {
                return Err(SheetsError::InvalidSortColumns(format!(
                    "column {} listed twice",
                    column
                )));
            }
            Ok(SortKey {
                column: column - 1,
                descending: col < 0,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_keys_validation() {
        assert_eq!(
            sort_keys(&[2, -1], 3).unwrap(),
            vec![
                SortKey {
                    column: 1,
                    descending: false
                },
                SortKey {
                    column: 0,
                    descending: true
                },
            ]
        );
        assert!(sort_keys(&[], 3).is_err());
        assert!(sort_keys(&[0], 3).is_err());
        assert!(sort_keys(&[4], 3).is_err());
        assert!(sort_keys(&[1, -1], 3).is_err());
    }

    #[test]
    fn test_region_normalizes_corners() {
        let region = Region::spanning(CellRef::new(3, 1), CellRef::new(1, 4));
        assert_eq!((region.left, region.top, region.right, region.bottom), (1, 1, 3, 4));
        assert_eq!((region.width(), region.height()), (3, 4));
        assert!(region.contains(CellRef::new(2, 2)));
        assert!(!region.contains(CellRef::new(0, 2)));
    }

    #[test]
    fn test_set_and_get_round_trip() {
        let mut wb = Workbook::new();
        wb.new_sheet(None).unwrap();
        wb.set_cell_contents("sheet1", "a1", Some("  =1+2  ")).unwrap();
        assert_eq!(
            wb.get_cell_contents("Sheet1", "A1").unwrap().as_deref(),
            Some("=1+2")
        );
        assert_eq!(wb.get_cell_value("Sheet1", "A1").unwrap().to_string(), "3");
        assert_eq!(wb.get_cell_contents("Sheet1", "B7").unwrap(), None);
        assert!(matches!(
            wb.get_cell_value("Sheet1", "1A"),
            Err(SheetsError::InvalidLocation(_))
        ));
    }

    #[test]
    fn test_unchanged_plan_entries_are_skipped() {
        let mut wb = Workbook::new();
        wb.new_sheet(None).unwrap();
        wb.set_cell_contents("Sheet1", "A1", Some("1")).unwrap();
        wb.set_cell_contents("Sheet1", "A2", Some("2")).unwrap();
        wb.sort_region("Sheet1", "A1", "A2", &[1]).unwrap();
        assert_eq!(
            wb.get_cell_contents("Sheet1", "A1").unwrap().as_deref(),
            Some("1")
        );
    }
}
