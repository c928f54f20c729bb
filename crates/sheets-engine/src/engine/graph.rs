//! Dependency graph between cells.
//!
//! Nodes are [`CellId`] arena indices handed out by the workbook's cell
//! store; the graph never owns cell data. An edge `u -> v` means "u's formula
//! reads v". Both directions are indexed so dependents can be found quickly.
//!
//! Static edges come from the formula text and live until the cell's contents
//! change. Dynamic edges come from the branches a conditional function took
//! on its last evaluation and are rebuilt on every evaluation.
//!
//! References to sheets that do not exist yet are parked in a waitlist keyed
//! by the uppercased sheet name.

use std::collections::{BTreeMap, BTreeSet};

/// Stable index of a cell in the workbook's arena.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CellId(pub usize);

#[derive(Debug, Default)]
struct EdgeSet {
    /// cell -> cells it reads
    forward: BTreeMap<CellId, BTreeSet<CellId>>,
    /// cell -> cells that read it
    backward: BTreeMap<CellId, BTreeSet<CellId>>,
}

impl EdgeSet {
    fn insert(&mut self, dependent: CellId, dependency: CellId) {
        self.forward.entry(dependent).or_default().insert(dependency);
        self.backward.entry(dependency).or_default().insert(dependent);
    }

    /// Drop every edge leaving `dependent`.
    fn clear_outgoing(&mut self, dependent: CellId) {
        let Some(targets) = self.forward.remove(&dependent) else {
            return;
        };
        for target in targets {
            if let Some(sources) = self.backward.get_mut(&target) {
                sources.remove(&dependent);
                if sources.is_empty() {
                    self.backward.remove(&target);
                }
            }
        }
    }

    /// Drop every edge arriving at `dependency`.
    fn clear_incoming(&mut self, dependency: CellId) {
        let Some(sources) = self.backward.remove(&dependency) else {
            return;
        };
        for source in sources {
            if let Some(targets) = self.forward.get_mut(&source) {
                targets.remove(&dependency);
                if targets.is_empty() {
                    self.forward.remove(&source);
                }
            }
        }
    }

    fn dependents(&self, cell: CellId) -> impl Iterator<Item = CellId> + '_ {
        self.backward.get(&cell).into_iter().flatten().copied()
    }

    fn contains(&self, dependent: CellId, dependency: CellId) -> bool {
        self.forward
            .get(&dependent)
            .is_some_and(|targets| targets.contains(&dependency))
    }
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    static_edges: EdgeSet,
    dynamic_edges: EdgeSet,
    waitlist: BTreeMap<String, BTreeSet<CellId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, dependent: CellId, dependency: CellId) {
        self.static_edges.insert(dependent, dependency);
    }

    pub fn add_dynamic_edge(&mut self, dependent: CellId, dependency: CellId) {
        self.dynamic_edges.insert(dependent, dependency);
    }

    pub fn clear_dynamic_edges(&mut self, dependent: CellId) {
        self.dynamic_edges.clear_outgoing(dependent);
    }

    /// Forget a cell's static edges and any waitlist entries it owns.
    ///
    /// Edges pointing *at* the cell are kept: other formulas still read it.
    pub fn remove_node(&mut self, cell: CellId) {
        self.static_edges.clear_outgoing(cell);
        self.waitlist.retain(|_, waiting| {
            waiting.remove(&cell);
            !waiting.is_empty()
        });
    }

    /// Remove every trace of a cell, in both directions.
    pub fn purge_node(&mut self, cell: CellId) {
        self.remove_node(cell);
        self.dynamic_edges.clear_outgoing(cell);
        self.static_edges.clear_incoming(cell);
        self.dynamic_edges.clear_incoming(cell);
    }

    /// Cells that read `cell` through a static or dynamic edge, ascending.
    pub fn get_children(&self, cell: CellId) -> Vec<CellId> {
        let children: BTreeSet<CellId> = self
            .static_edges
            .dependents(cell)
            .chain(self.dynamic_edges.dependents(cell))
            .collect();
        children.into_iter().collect()
    }

    pub fn has_self_loop(&self, cell: CellId) -> bool {
        self.static_edges.contains(cell, cell) || self.dynamic_edges.contains(cell, cell)
    }

    /// Every cell that participates in at least one edge.
    pub fn nodes(&self) -> BTreeSet<CellId> {
        let mut nodes = BTreeSet::new();
        for edges in [&self.static_edges, &self.dynamic_edges] {
            nodes.extend(edges.forward.keys().copied());
            nodes.extend(edges.backward.keys().copied());
        }
        nodes
    }

    /// Park `cell` until a sheet called `sheet` appears.
    pub fn defer(&mut self, sheet: &str, cell: CellId) {
        self.waitlist
            .entry(sheet.to_uppercase())
            .or_default()
            .insert(cell);
    }

    /// Remove and return the cells waiting on `sheet`.
    pub fn take_waiting(&mut self, sheet: &str) -> BTreeSet<CellId> {
        self.waitlist.remove(&sheet.to_uppercase()).unwrap_or_default()
    }

    pub fn is_waiting(&self, sheet: &str, cell: CellId) -> bool {
        self.waitlist
            .get(&sheet.to_uppercase())
            .is_some_and(|waiting| waiting.contains(&cell))
    }
}
