//! Dependency tracking for formula calculation
//!
//! The graph keeps two maps that are exact inverses of each other:
//! - `affects[P]`: cells whose formula reads `P`
//! - `uses[P]`: cells that `P`'s formula reads
//!
//! Entries whose set becomes empty are removed.

use std::collections::{BTreeMap, BTreeSet};

use ahash::{AHashMap, AHashSet};
use tabula_core::CellPosition;

use crate::ast::Expression;
use crate::error::ParseResult;

/// Position-keyed adjacency map
pub type Adjacency = AHashMap<CellPosition, AHashSet<CellPosition>>;

/// Dependency graph for formula cells
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Cell → Cells whose formula reads it
    affects: Adjacency,
    /// Cell → Cells its formula reads
    uses: Adjacency,
    /// Record an edge when a formula names its own cell
    record_self_references: bool,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph that records self references as edges
    ///
    /// By default a formula naming its own cell records no edge. With this
    /// enabled the edge is kept and later reported as a cycle of length one.
    pub fn with_self_references(record: bool) -> Self {
        Self {
            record_self_references: record,
            ..Self::default()
        }
    }

    /// Whether self references are recorded
    pub fn records_self_references(&self) -> bool {
        self.record_self_references
    }

    /// Rebuild the outgoing edges of `pos` from its latest parse result
    ///
    /// A parse error leaves the cell with no dependencies.
    pub fn update(&mut self, pos: CellPosition, parsed: &ParseResult<Expression>) {
        self.clear_dependencies(pos);

        let Ok(expr) = parsed else {
            log::trace!("{} has no dependencies: parse error", pos);
            return;
        };

        for used in extract_references(expr) {
            if used == pos && !self.record_self_references {
                log::trace!("{} reads itself, no edge recorded", pos);
                continue;
            }
            self.add_dependency(used, pos);
        }
    }

    /// Add a dependency: `affected`'s formula reads `used`
    pub fn add_dependency(&mut self, used: CellPosition, affected: CellPosition) {
        self.affects.entry(used).or_default().insert(affected);
        self.uses.entry(affected).or_default().insert(used);
    }

    /// Remove every edge from `pos` to the cells its formula reads
    pub fn clear_dependencies(&mut self, pos: CellPosition) {
        let Some(used) = self.uses.remove(&pos) else {
            return;
        };

        for used_pos in used {
            if let Some(affected) = self.affects.get_mut(&used_pos) {
                affected.remove(&pos);
                if affected.is_empty() {
                    self.affects.remove(&used_pos);
                }
            }
        }
    }

    /// Find every position that lies on a dependency cycle
    ///
    /// A cycle is a set of positions mutually reachable through `affects`
    /// edges, so the result is the union of the strongly connected components
    /// with more than one member, plus positions with an edge to themselves.
    /// Every member of a cycle is reported, not just the closing edge.
    pub fn catch_circling_cells(&self) -> BTreeSet<CellPosition> {
        let mut cyclic = BTreeSet::new();
        for component in self.strongly_connected_components() {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .map_or(false, |p| self.affects.get(p).map_or(false, |a| a.contains(p)));
            if is_cycle {
                cyclic.extend(component);
            }
        }
        cyclic
    }

    /// Sever every cyclic position from the graph
    pub fn filter_cyclic_dependencies<'a, I>(&mut self, cyclic: I)
    where
        I: IntoIterator<Item = &'a CellPosition>,
    {
        for pos in cyclic {
            log::debug!("severing cyclic cell {}", pos);
            self.clear_dependencies(*pos);
        }
    }

    /// Cells whose formula reads `pos`, in row-major order
    pub fn affected_positions(&self, pos: CellPosition) -> Vec<CellPosition> {
        sorted(self.affects.get(&pos))
    }

    /// Cells that `pos`'s formula reads, in row-major order
    pub fn used_positions(&self, pos: CellPosition) -> Vec<CellPosition> {
        sorted(self.uses.get(&pos))
    }

    /// The raw `affects` map
    pub fn affects(&self) -> &Adjacency {
        &self.affects
    }

    /// The raw `uses` map
    pub fn uses(&self) -> &Adjacency {
        &self.uses
    }

    /// Ordered copy of the `affects` map
    pub fn affects_snapshot(&self) -> BTreeMap<CellPosition, BTreeSet<CellPosition>> {
        snapshot(&self.affects)
    }

    /// Ordered copy of the `uses` map
    pub fn uses_snapshot(&self) -> BTreeMap<CellPosition, BTreeSet<CellPosition>> {
        snapshot(&self.uses)
    }

    /// Check whether `pos` takes part in any edge
    pub fn contains(&self, pos: CellPosition) -> bool {
        self.affects.contains_key(&pos) || self.uses.contains_key(&pos)
    }

    /// Check if the graph has no edges
    pub fn is_empty(&self) -> bool {
        self.affects.is_empty() && self.uses.is_empty()
    }

    /// Get the given cells and everything they affect, dependencies first
    ///
    /// Cells on a cycle are emitted once, at the point the cycle is entered.
    pub fn recalc_order(&self, changed: &[CellPosition]) -> Vec<CellPosition> {
        let mut finished = Vec::new();
        let mut visited = AHashSet::new();

        for &start in changed {
            if !visited.insert(start) {
                continue;
            }
            let mut stack = vec![(start, self.affected_positions(start), 0usize)];
            while let Some(frame) = stack.last_mut() {
                if let Some(&next) = frame.1.get(frame.2) {
                    frame.2 += 1;
                    if visited.insert(next) {
                        stack.push((next, self.affected_positions(next), 0));
                    }
                } else {
                    finished.push(frame.0);
                    stack.pop();
                }
            }
        }

        finished.reverse();
        finished
    }

    /// Drop every edge
    pub fn flush(&mut self) {
        self.affects.clear();
        self.uses.clear();
    }

    /// Verify that `affects` and `uses` are exact inverses with no empty sets
    pub fn is_consistent(&self) -> bool {
        let mirrored = |from: &Adjacency, to: &Adjacency| {
            from.iter().all(|(key, values)| {
                !values.is_empty()
                    && values
                        .iter()
                        .all(|v| to.get(v).map_or(false, |back| back.contains(key)))
            })
        };
        mirrored(&self.affects, &self.uses) && mirrored(&self.uses, &self.affects)
    }

    /// Tarjan's algorithm over `affects`, with an explicit stack
    fn strongly_connected_components(&self) -> Vec<Vec<CellPosition>> {
        let mut nodes: Vec<CellPosition> = self.affects.keys().copied().collect();
        nodes.sort();

        let mut index: AHashMap<CellPosition, usize> = AHashMap::new();
        let mut low: AHashMap<CellPosition, usize> = AHashMap::new();
        let mut on_stack: AHashSet<CellPosition> = AHashSet::new();
        let mut component_stack: Vec<CellPosition> = Vec::new();
        let mut components = Vec::new();
        let mut counter = 0usize;

        for root in nodes {
            if index.contains_key(&root) {
                continue;
            }

            let mut frames = vec![(root, self.affected_positions(root), 0usize)];
            index.insert(root, counter);
            low.insert(root, counter);
            counter += 1;
            component_stack.push(root);
            on_stack.insert(root);

            while let Some(frame) = frames.last_mut() {
                let node = frame.0;
                if let Some(&next) = frame.1.get(frame.2) {
                    frame.2 += 1;
                    match index.get(&next) {
                        None => {
                            index.insert(next, counter);
                            low.insert(next, counter);
                            counter += 1;
                            component_stack.push(next);
                            on_stack.insert(next);
                            frames.push((next, self.affected_positions(next), 0));
                        }
                        Some(&next_index) if on_stack.contains(&next) => {
                            let entry = low.entry(node).or_insert(next_index);
                            *entry = (*entry).min(next_index);
                        }
                        Some(_) => {}
                    }
                    continue;
                }

                frames.pop();
                let node_low = low.get(&node).copied().unwrap_or_default();
                if let Some(parent) = frames.last() {
                    let entry = low.entry(parent.0).or_insert(node_low);
                    *entry = (*entry).min(node_low);
                }

                if index.get(&node) == Some(&node_low) {
                    let mut component = Vec::new();
                    while let Some(member) = component_stack.pop() {
                        on_stack.remove(&member);
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    component.sort();
                    components.push(component);
                }
            }
        }

        components
    }
}

/// Every position an expression reads, ranges expanded
///
/// A range past [`MAX_RANGE_CELLS`](crate::ast::MAX_RANGE_CELLS) contributes
/// nothing; it evaluates to an error without reading any cell.
pub fn extract_references(expr: &Expression) -> BTreeSet<CellPosition> {
    let mut refs = BTreeSet::new();
    extract_references_recursive(expr, &mut refs);
    refs
}

fn extract_references_recursive(expr: &Expression, refs: &mut BTreeSet<CellPosition>) {
    match expr {
        Expression::Cell(pos) => {
            refs.insert(*pos);
        }
        Expression::CellRange { begin, end } => match expr.range_positions() {
            Some(Ok(range)) => refs.extend(range.positions),
            Some(Err(_)) => {}
            None => {
                extract_references_recursive(begin, refs);
                extract_references_recursive(end, refs);
            }
        },
        Expression::Prefix { operand, .. } => extract_references_recursive(operand, refs),
        Expression::Infix { lhs, rhs, .. } => {
            extract_references_recursive(lhs, refs);
            extract_references_recursive(rhs, refs);
        }
        Expression::FnCall { callee, arguments } => {
            extract_references_recursive(callee, refs);
            for arg in arguments {
                extract_references_recursive(arg, refs);
            }
        }
        Expression::Literal(_) | Expression::Identifier(_) => {}
    }
}

fn sorted(set: Option<&AHashSet<CellPosition>>) -> Vec<CellPosition> {
    let mut positions: Vec<CellPosition> = set.into_iter().flatten().copied().collect();
    positions.sort();
    positions
}

fn snapshot(map: &Adjacency) -> BTreeMap<CellPosition, BTreeSet<CellPosition>> {
    map.iter()
        .map(|(key, values)| (*key, values.iter().copied().collect()))
        .collect()
}
