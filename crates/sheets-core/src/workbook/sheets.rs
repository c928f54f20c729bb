use log::info;
use std::collections::BTreeSet;

use super::Workbook;
use super::state::{Sheet, SheetExtent};
use super::store::Parsed;
use crate::error::{Result, SheetsError};
use sheets_engine::engine::{CellValue, rename_sheet_references};

impl Workbook {
    pub fn num_sheets(&self) -> usize {
        self.sheets.len()
    }

    /// Sheet names in display order, with the case they were created with.
    pub fn list_sheets(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Add a sheet at the end of the list.
    ///
    /// Without a name the first free `SheetN` is used. Formulas that were
    /// already referring to the new name start resolving immediately.
    pub fn new_sheet(&mut self, name: Option<&str>) -> Result<(usize, String)> {
        let name = match name {
            Some(name) => {
                self.validate_sheet_name(name, None)?;
                name.to_string()
            }
            None => self.default_sheet_name(),
        };
        let index = self.push_sheet(&name);
        info!("created sheet {:?} at index {}", name, index);

        let waiting = self.resolve_waiting(&name);
        self.commit(waiting);
        Ok((index, name))
    }

    fn push_sheet(&mut self, name: &str) -> usize {
        let id = self.allocate_sheet_id();
        self.sheets.push(Sheet {
            id,
            name: name.to_string(),
            extent: SheetExtent::default(),
        });
        self.sheets.len() - 1
    }

    /// Remove a sheet and every cell on it.
    ///
    /// Cells on other sheets that read it become `#REF!` and wait for a sheet
    /// of the same name to come back.
    pub fn del_sheet(&mut self, name: &str) -> Result<()> {
        let index = self
            .sheet_index(name)
            .ok_or_else(|| SheetsError::SheetNotFound(name.to_string()))?;
        let sheet = self.sheets.remove(index);
        let cells = self.store.detach_sheet(sheet.id);

        let mut dependents = BTreeSet::new();
        for &id in &cells {
            dependents.extend(
                self.graph
                    .get_children(id)
                    .into_iter()
                    .filter(|&child| self.store.get(child).live),
            );
        }

        for &id in &cells {
            self.graph.purge_node(id);
            let cell = self.store.get_mut(id);
            cell.contents = None;
            cell.parsed = Parsed::default();
            cell.value = CellValue::Empty;
        }
        for &id in &dependents {
            self.graph.defer(&sheet.name, id);
        }
        info!(
            "deleted sheet {:?} ({} cells, {} dependents elsewhere)",
            sheet.name,
            cells.len(),
            dependents.len()
        );

        self.commit(dependents);
        Ok(())
    }

    pub fn get_sheet_extent(&self, name: &str) -> Result<SheetExtent> {
        Ok(self.sheet(name)?.extent)
    }

    /// Rename a sheet and rewrite every formula that names it.
    ///
    /// Rewritten formulas quote the new name when it needs quoting and drop
    /// quotes other sheet names don't need.
    pub fn rename_sheet(&mut self, old: &str, new: &str) -> Result<()> {
        let index = self
            .sheet_index(old)
            .ok_or_else(|| SheetsError::SheetNotFound(old.to_string()))?;
        let sheet_id = self.sheets[index].id;
        self.validate_sheet_name(new, Some(sheet_id))?;
        let old_name = std::mem::replace(&mut self.sheets[index].name, new.to_string());

        let mut seeds = Vec::new();
        for id in self.store.formula_cells() {
            let rewritten = self
                .store
                .get(id)
                .contents
                .as_deref()
                .and_then(|contents| rename_sheet_references(contents, &old_name, new));
            if let Some(rewritten) = rewritten {
                self.write_contents(id, Some(&rewritten));
                seeds.push(id);
            }
        }

        // INDIRECT may spell the sheet name inside a string.
        for id in self.store.cells_on(sheet_id) {
            seeds.extend(self.graph.get_children(id));
        }
        seeds.extend(self.resolve_waiting(new));
        info!("renamed sheet {:?} to {:?}", old_name, new);

        self.commit(seeds);
        Ok(())
    }

    /// Move a sheet to position `index` in the sheet list.
    pub fn move_sheet(&mut self, name: &str, index: usize) -> Result<()> {
        let from = self
            .sheet_index(name)
            .ok_or_else(|| SheetsError::SheetNotFound(name.to_string()))?;
        let len = self.sheets.len();
        if index >= len {
            return Err(SheetsError::IndexOutOfRange { index, len });
        }
        let sheet = self.sheets.remove(from);
        self.sheets.insert(index, sheet);
        Ok(())
    }

    /// Duplicate a sheet's contents into a new sheet named `<name>_N`.
    pub fn copy_sheet(&mut self, name: &str) -> Result<(usize, String)> {
        let source = self.sheet(name)?;
        let (source_id, source_name) = (source.id, source.name.clone());
        let copy_name = (1..)
            .map(|n| format!("{}_{}", source_name, n))
            .find(|candidate| self.sheet_index(candidate).is_none())
            .unwrap_or_default();

        let index = self.push_sheet(&copy_name);
        let copy_id = self.sheets[index].id;

        let mut seeds = Vec::new();
        for id in self.store.cells_on(source_id) {
            let cell = self.store.get(id);
            let Some(contents) = cell.contents.clone() else {
                continue;
            };
            let loc = cell.loc;
            let target = self.store.get_or_create(copy_id, loc);
            self.write_contents(target, Some(&contents));
            seeds.push(target);
        }
        seeds.extend(self.resolve_waiting(&copy_name));
        info!("copied sheet {:?} to {:?}", source_name, copy_name);

        self.commit(seeds);
        Ok((index, copy_name))
    }
}
