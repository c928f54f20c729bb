//! The update pipeline.
//!
//! Every mutation runs in two phases. First the new contents are written with
//! [`Workbook::write_contents`], which reparses the text and rebuilds the
//! cell's static edges but leaves values alone. Then [`Workbook::commit`]
//! recomputes everything downstream of the written cells and notifies the
//! listeners once.
//!
//! Recomputation is a FIFO worklist rather than a topological sort. A cell
//! whose inputs change again after it was evaluated is simply queued again,
//! so the process settles on a fixpoint. Cells found in a cycle are pinned
//! to `#CIRCREF!`, which keeps cyclic regions from oscillating.

use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::state::{Sheet, SheetExtent, Workbook};
use super::store::{CellStore, Parsed, SheetId};
use sheets_engine::engine::{
    CellError, CellErrorType, CellId, CellRef, CellResolver, CellValue, DependencyGraph,
    Evaluator, extract_dependencies, has_dynamic_calls, parse_decimal, parse_formula,
};

/// Classify trimmed, non-empty contents.
///
/// Returns the parsed form and whether the formula calls a function with
/// dynamic dependencies.
pub(crate) fn classify(text: &str) -> (Parsed, bool) {
    if let Some(body) = text.strip_prefix('=') {
        return match parse_formula(body) {
            Ok(expr) => {
                let dynamic = has_dynamic_calls(&expr);
                (Parsed::Formula(Arc::new(expr)), dynamic)
            }
            Err(err) => (
                Parsed::Literal(CellValue::error(CellErrorType::ParseError, err.to_string())),
                false,
            ),
        };
    }
    (Parsed::Literal(literal_value(text)), false)
}

fn literal_value(text: &str) -> CellValue {
    if let Some(rest) = text.strip_prefix('\'') {
        return CellValue::Text(rest.to_string());
    }
    if let Some(kind) = CellErrorType::from_code(text) {
        return CellValue::error(kind, "error literal");
    }
    if text.eq_ignore_ascii_case("true") {
        return CellValue::Boolean(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return CellValue::Boolean(false);
    }
    match parse_decimal(text) {
        Some(n) => CellValue::number(n),
        None => CellValue::Text(text.to_string()),
    }
}

/// Resolves formula reads against the workbook, recording dynamic edges.
struct WorkbookResolver<'a> {
    sheets: &'a [Sheet],
    store: &'a mut CellStore,
    graph: &'a mut DependencyGraph,
    version: &'a str,
    owner: CellId,
    owner_sheet: SheetId,
}

impl CellResolver for WorkbookResolver<'_> {
    fn read_cell(&mut self, sheet: Option<&str>, cell: CellRef, dynamic: bool) -> CellValue {
        let sheet_id = match sheet {
            None => self.owner_sheet,
            Some(name) => match self.sheets.iter().find(|s| s.name.eq_ignore_ascii_case(name)) {
                Some(sheet) => sheet.id,
                None => {
                    self.graph.defer(name, self.owner);
                    return CellValue::error(
                        CellErrorType::BadReference,
                        format!("no sheet named {}", name),
                    );
                }
            },
        };
        let target = self.store.get_or_create(sheet_id, cell);
        if dynamic {
            self.graph.add_dynamic_edge(self.owner, target);
        }
        self.store.get(target).value.clone()
    }

    fn version(&self) -> &str {
        self.version
    }
}

/// Seed count from which a batch scans the whole graph for cycles.
const GLOBAL_SCC_BATCH: usize = 256;

/// FIFO queue where re-queuing a waiting cell moves it to the back.
///
/// A requeue pushes a fresh entry and bumps the cell's generation; entries
/// with an older generation are skipped when popped.
#[derive(Default)]
struct Worklist {
    queue: VecDeque<(CellId, u64)>,
    latest: HashMap<CellId, u64>,
    generation: u64,
}

impl Worklist {
    fn push(&mut self, id: CellId) {
        self.generation += 1;
        self.latest.insert(id, self.generation);
        self.queue.push_back((id, self.generation));
    }

    fn pop(&mut self) -> Option<CellId> {
        while let Some((id, generation)) = self.queue.pop_front() {
            if self.latest.get(&id) == Some(&generation) {
                self.latest.remove(&id);
                return Some(id);
            }
        }
        None
    }
}

impl Workbook {
    /// Replace the contents of `id` and rebuild its static edges.
    ///
    /// The cell's value is not touched; pass the id to [`Workbook::commit`].
    pub(crate) fn write_contents(&mut self, id: CellId, contents: Option<&str>) {
        let contents = contents.map(str::trim).filter(|text| !text.is_empty());
        self.graph.remove_node(id);
        self.graph.clear_dynamic_edges(id);

        let (parsed, has_dynamic) = match contents {
            Some(text) => classify(text),
            None => (Parsed::default(), false),
        };
        let cell = self.store.get_mut(id);
        let was_set = cell.contents.is_some();
        cell.contents = contents.map(str::to_string);
        cell.parsed = parsed;
        cell.has_dynamic = has_dynamic;

        self.link_static(id);
        self.update_extent(id, was_set, contents.is_some());
    }

    /// Add static edges for every reference in the cell's formula.
    ///
    /// References to sheets that don't exist are parked on the waitlist.
    pub(crate) fn link_static(&mut self, id: CellId) {
        let cell = self.store.get(id);
        let Parsed::Formula(expr) = &cell.parsed else {
            return;
        };
        let expr = Arc::clone(expr);
        let owner = cell.sheet;

        for reference in extract_dependencies(&expr) {
            let Some(location) = reference.location else {
                continue;
            };
            let sheet = match &reference.sheet {
                None => owner,
                Some(name) => match self.sheet_index(name) {
                    Some(index) => self.sheets[index].id,
                    None => {
                        self.graph.defer(name, id);
                        continue;
                    }
                },
            };
            let target = self.store.get_or_create(sheet, location.cell);
            self.graph.add_edge(id, target);
        }
    }

    /// Take the cells waiting on `name` and link them against it.
    pub(crate) fn resolve_waiting(&mut self, name: &str) -> Vec<CellId> {
        let waiting: Vec<CellId> = self
            .graph
            .take_waiting(name)
            .into_iter()
            .filter(|&id| self.store.get(id).live)
            .collect();
        for &id in &waiting {
            self.graph.remove_node(id);
            self.link_static(id);
        }
        if !waiting.is_empty() {
            debug!("{} cell(s) were waiting on sheet {:?}", waiting.len(), name);
        }
        waiting
    }

    fn update_extent(&mut self, id: CellId, was_set: bool, is_set: bool) {
        let (sheet_id, loc) = {
            let cell = self.store.get(id);
            (cell.sheet, cell.loc)
        };
        let Some(current) = self.sheet_by_id(sheet_id).map(|s| s.extent) else {
            return;
        };

        let extent = if is_set {
            let mut grown = current;
            grown.include(loc);
            grown
        } else if was_set && current.is_bound(loc) {
            self.scan_extent(sheet_id)
        } else {
            return;
        };

        if let Some(sheet) = self.sheet_by_id_mut(sheet_id) {
            sheet.extent = extent;
        }
    }

    fn scan_extent(&self, sheet: SheetId) -> SheetExtent {
        let mut extent = SheetExtent::default();
        for id in self.store.cells_on(sheet) {
            let cell = self.store.get(id);
            if cell.contents.is_some() {
                extent.include(cell.loc);
            }
        }
        extent
    }

    /// Evaluate a cell's contents, rebuilding its dynamic edges.
    fn evaluate_cell(&mut self, id: CellId) -> CellValue {
        self.graph.clear_dynamic_edges(id);
        let cell = self.store.get(id);
        let expr = match &cell.parsed {
            Parsed::Literal(value) => return value.clone(),
            Parsed::Formula(expr) => Arc::clone(expr),
        };
        let owner_sheet = cell.sheet;

        let mut resolver = WorkbookResolver {
            sheets: &self.sheets,
            store: &mut self.store,
            graph: &mut self.graph,
            version: &self.config.version,
            owner: id,
            owner_sheet,
        };
        Evaluator::new(&mut resolver).evaluate(&expr)
    }

    /// Recompute cycle membership for everything reachable from `seeds`.
    ///
    /// Batches of at least [`GLOBAL_SCC_BATCH`] seeds (sheet copies, large
    /// moves) refresh the whole graph in one pass instead.
    ///
    /// Returns the cells whose flag changed.
    fn refresh_cycle_flags(&mut self, seeds: &[CellId]) -> Vec<CellId> {
        let components = if seeds.len() >= GLOBAL_SCC_BATCH {
            debug!("global cycle scan for {} seed(s)", seeds.len());
            self.graph.global_scc()
        } else {
            self.graph.local_scc(seeds)
        };
        let cyclic = self.graph.cyclic_members(&components);
        if !cyclic.is_empty() {
            debug!("{} cell(s) in cycles", cyclic.len());
        }

        let mut flipped = Vec::new();
        for id in components.into_iter().flatten() {
            if !self.store.get(id).live {
                continue;
            }
            let cell = self.store.get_mut(id);
            let now = cyclic.contains(&id);
            if cell.in_cycle != now {
                cell.in_cycle = now;
                flipped.push(id);
            }
        }
        flipped
    }

    /// Recompute `seeds` and everything downstream of them.
    ///
    /// Returns the cells whose value differs from before, in the order they
    /// were first reached.
    pub(crate) fn recalculate(&mut self, seeds: impl IntoIterator<Item = CellId>) -> Vec<CellId> {
        let seeds: Vec<CellId> = seeds
            .into_iter()
            .filter(|&id| self.store.get(id).live)
            .collect();
        if seeds.is_empty() {
            return Vec::new();
        }

        let mut worklist = Worklist::default();
        for &id in &seeds {
            worklist.push(id);
        }
        for id in self.refresh_cycle_flags(&seeds) {
            worklist.push(id);
        }

        let mut originals: HashMap<CellId, CellValue> = HashMap::new();
        let mut touched = Vec::new();
        let mut evaluations = 0usize;

        while let Some(id) = worklist.pop() {
            if !self.store.get(id).live {
                continue;
            }
            if !originals.contains_key(&id) {
                originals.insert(id, self.store.get(id).value.clone());
                touched.push(id);
            }

            let computed = self.evaluate_cell(id);
            evaluations += 1;

            if self.store.get(id).has_dynamic {
                for other in self.refresh_cycle_flags(&[id]) {
                    if other != id {
                        worklist.push(other);
                    }
                }
            }

            let cell = self.store.get_mut(id);
            let value = if cell.in_cycle {
                CellValue::Error(CellError::circular())
            } else {
                computed
            };
            if cell.value != value {
                cell.value = value;
                for child in self.graph.get_children(id) {
                    worklist.push(child);
                }
            }
        }

        debug!(
            "recalculated {} cell(s) in {} evaluation(s) from {} seed(s)",
            touched.len(),
            evaluations,
            seeds.len()
        );

        touched
            .into_iter()
            .filter(|id| originals.get(id) != Some(&self.store.get(*id).value))
            .collect()
    }

    /// Recompute from `seeds`, then tell every listener what changed.
    pub(crate) fn commit(&mut self, seeds: impl IntoIterator<Item = CellId>) {
        let changed = self.recalculate(seeds);
        let changes: Vec<(String, String)> = changed
            .into_iter()
            .filter_map(|id| {
                let cell = self.store.get(id);
                let sheet = self.sheet_by_id(cell.sheet)?;
                Some((sheet.name.clone(), cell.loc.to_string()))
            })
            .collect();
        if !changes.is_empty() {
            self.notify(&changes);
        }
    }

    fn notify(&mut self, changes: &[(String, String)]) {
        let mut listeners = std::mem::take(&mut self.listeners);
        let workbook: &Workbook = self;
        for (i, listener) in listeners.iter_mut().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(workbook, changes)));
            if outcome.is_err() {
                warn!("change listener #{} panicked; continuing", i);
            }
        }
        self.listeners = listeners;
    }
}
