//! Circular dependency detection for formula cells.
//!
//! Cycles are found with Tarjan's strongly-connected-components algorithm,
//! following edges from a cell to the cells that read it. Dependency chains
//! can be thousands of cells deep, so the DFS keeps its own stack of
//! resumable frames instead of recursing.
//!
//! A cell is cyclic when its component has more than one member, or when it
//! is a singleton that reads itself.

use log::trace;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::graph::{CellId, DependencyGraph};

struct Frame {
    node: CellId,
    children: Vec<CellId>,
    next: usize,
}

#[derive(Default)]
struct Tarjan {
    index_counter: usize,
    indices: HashMap<CellId, usize>,
    lowlinks: HashMap<CellId, usize>,
    stack: Vec<CellId>,
    on_stack: HashSet<CellId>,
    components: Vec<Vec<CellId>>,
}

impl Tarjan {
    fn visit(&mut self, graph: &DependencyGraph, node: CellId) -> Frame {
        self.indices.insert(node, self.index_counter);
        self.lowlinks.insert(node, self.index_counter);
        self.index_counter += 1;
        self.stack.push(node);
        self.on_stack.insert(node);
        Frame {
            node,
            children: graph.get_children(node),
            next: 0,
        }
    }

    fn lower(&mut self, node: CellId, candidate: usize) {
        if let Some(low) = self.lowlinks.get_mut(&node) {
            *low = (*low).min(candidate);
        }
    }

    fn strongconnect(&mut self, graph: &DependencyGraph, root: CellId) {
        let mut frames = vec![self.visit(graph, root)];

        while let Some(frame) = frames.last_mut() {
            if let Some(&child) = frame.children.get(frame.next) {
                frame.next += 1;
                let node = frame.node;
                if !self.indices.contains_key(&child) {
                    let child_frame = self.visit(graph, child);
                    frames.push(child_frame);
                } else if self.on_stack.contains(&child) {
                    let child_index = self.indices[&child];
                    self.lower(node, child_index);
                }
                continue;
            }

            let node = frame.node;
            frames.pop();
            let low = self.lowlinks[&node];
            if let Some(parent) = frames.last() {
                self.lower(parent.node, low);
            }
            if low == self.indices[&node] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.remove(&member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                component.sort();
                self.components.push(component);
            }
        }
    }

    fn run(
        mut self,
        graph: &DependencyGraph,
        roots: impl IntoIterator<Item = CellId>,
    ) -> Vec<Vec<CellId>> {
        for root in roots {
            if !self.indices.contains_key(&root) {
                self.strongconnect(graph, root);
            }
        }
        self.components
    }
}

impl DependencyGraph {
    /// Strongly connected components of the whole graph.
    pub fn global_scc(&self) -> Vec<Vec<CellId>> {
        let components = Tarjan::default().run(self, self.nodes());
        trace!("global scc: {} component(s)", components.len());
        components
    }

    /// Strongly connected components of the region reachable from `seeds`.
    ///
    /// Every reachable cell, seeds included, appears in exactly one component.
    pub fn local_scc(&self, seeds: &[CellId]) -> Vec<Vec<CellId>> {
        let components = Tarjan::default().run(self, seeds.iter().copied());
        trace!(
            "local scc from {} seed(s): {} component(s)",
            seeds.len(),
            components.len()
        );
        components
    }

    /// Members of the given components that are in a cycle.
    pub fn cyclic_members(&self, components: &[Vec<CellId>]) -> BTreeSet<CellId> {
        components
            .iter()
            .filter(|c| c.len() > 1 || c.first().is_some_and(|&n| self.has_self_loop(n)))
            .flatten()
            .copied()
            .collect()
    }
}
