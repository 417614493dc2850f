//! Sheet recalculation
//!
//! Options and statistics for re-evaluating the cells that depend on an
//! edited cell, plus the propagation burst that does the work. Both
//! propagation strategies walk an explicit stack, so a long dependency chain
//! never grows the call stack.
//!
//! # Example
//!
//! ```rust
//! use tabula::{CalculationOptions, Propagation, Sheet};
//!
//! let mut sheet = Sheet::with_options(CalculationOptions {
//!     propagation: Propagation::Worklist,
//!     ..Default::default()
//! });
//! sheet.edit(1, 1, "=2");
//! let stats = sheet.edit(1, 2, "=A1 * 21");
//! assert_eq!(stats.cells_evaluated, 1);
//! assert_eq!(sheet.display_value(1, 2), "42");
//! ```

use std::collections::BTreeSet;

use ahash::AHashMap;
use log::{debug, warn};
use tabula_core::{CellPosition, CellStore, Value};
use tabula_formula::{evaluate, DependencyGraph, EvaluationContext, Expression, ParseResult};

/// How dependents of an edited cell are re-evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Depth-first outward from the edited cell. A cell reached through
    /// several paths is re-evaluated once per path.
    #[default]
    Recursive,
    /// Each dependent is re-evaluated at most once per edit, after everything
    /// it reads.
    Worklist,
}

/// Options for sheet calculation
#[derive(Debug, Clone)]
pub struct CalculationOptions {
    /// Propagation strategy (default: recursive)
    pub propagation: Propagation,
    /// Maximum cell evaluations in one edit (default: 100 000)
    pub max_evaluations_per_edit: usize,
    /// Record an edge when a formula names its own cell (default: false)
    pub record_self_references: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            propagation: Propagation::Recursive,
            max_evaluations_per_edit: 100_000,
            record_self_references: false,
        }
    }
}

/// Statistics from one edit or recalculation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculationStats {
    /// Number of formulas evaluated
    pub cells_evaluated: usize,
    /// Cells flagged as part of a reference cycle
    pub cyclic_cells: BTreeSet<CellPosition>,
    /// Cells whose stored value was replaced, in update order
    pub changed: Vec<CellPosition>,
    /// Whether propagation stopped at `max_evaluations_per_edit`
    pub truncated: bool,
}

impl CalculationStats {
    /// Whether any reference cycle was found
    pub fn has_cycles(&self) -> bool {
        !self.cyclic_cells.is_empty()
    }
}

/// Change notification callback
pub(crate) type Observer = Box<dyn FnMut(CellPosition)>;

/// Parsed form of every cell that received text
pub(crate) type Formulas = AHashMap<CellPosition, ParseResult<Expression>>;

/// Error value stamped on every member of a reference cycle
pub(crate) fn cycle_error(cyclic: &BTreeSet<CellPosition>) -> Value {
    let members: Vec<String> = cyclic.iter().map(CellPosition::to_string).collect();
    Value::error(format!("CYCLE: ({})", members.join(", ")))
}

/// A single run of evaluations triggered by one sheet operation
pub(crate) struct Burst<'a> {
    pub(crate) cells: &'a mut CellStore,
    pub(crate) dependencies: &'a DependencyGraph,
    pub(crate) formulas: &'a Formulas,
    pub(crate) observer: &'a mut Option<Observer>,
    pub(crate) options: &'a CalculationOptions,
    pub(crate) stats: CalculationStats,
}

impl<'a> Burst<'a> {
    /// Evaluate the stored formula of `pos`
    pub(crate) fn evaluate_cell(&mut self, pos: CellPosition) -> Value {
        self.stats.cells_evaluated += 1;
        match self.formulas.get(&pos) {
            Some(parsed) => evaluate(parsed, &EvaluationContext::new(self.cells)),
            None => Value::Nil,
        }
    }

    /// Store a value, replacing the raw text too when given, and notify
    pub(crate) fn store(&mut self, pos: CellPosition, raw: Option<&str>, value: Value) {
        match raw {
            Some(raw) => self.cells.set(pos, raw, value),
            None => self.cells.set_value(pos, value),
        }
        self.notify(pos);
    }

    /// Reset a cell to empty text and `Nil`
    pub(crate) fn reset(&mut self, pos: CellPosition) {
        if self.cells.reset(pos) {
            self.notify(pos);
        }
    }

    fn notify(&mut self, pos: CellPosition) {
        self.stats.changed.push(pos);
        if let Some(observer) = self.observer.as_mut() {
            observer(pos);
        }
    }

    /// Check the evaluation budget, warning the first time it runs out
    pub(crate) fn budget_exhausted(&mut self) -> bool {
        if self.stats.cells_evaluated < self.options.max_evaluations_per_edit {
            return false;
        }
        if !self.stats.truncated {
            warn!(
                "propagation stopped after {} evaluations",
                self.stats.cells_evaluated
            );
            self.stats.truncated = true;
        }
        true
    }

    /// Re-evaluate everything that depends on `sources`
    ///
    /// The sources themselves are not re-evaluated.
    pub(crate) fn propagate(&mut self, sources: &[CellPosition]) {
        match self.options.propagation {
            Propagation::Recursive => self.propagate_depth_first(sources),
            Propagation::Worklist => self.propagate_in_order(sources),
        }
    }

    fn propagate_depth_first(&mut self, sources: &[CellPosition]) {
        let mut stack = Vec::new();
        for &source in sources.iter().rev() {
            stack.extend(self.dependencies.affected_positions(source).into_iter().rev());
        }

        while let Some(pos) = stack.pop() {
            if self.budget_exhausted() {
                break;
            }
            debug!("re-evaluating {}", pos);
            let value = self.evaluate_cell(pos);
            self.store(pos, None, value);
            stack.extend(self.dependencies.affected_positions(pos).into_iter().rev());
        }
    }

    fn propagate_in_order(&mut self, sources: &[CellPosition]) {
        for pos in self.dependencies.recalc_order(sources) {
            if sources.contains(&pos) || !self.formulas.contains_key(&pos) {
                continue;
            }
            if self.budget_exhausted() {
                break;
            }
            debug!("re-evaluating {}", pos);
            let value = self.evaluate_cell(pos);
            self.store(pos, None, value);
        }
    }

    pub(crate) fn finish(self) -> CalculationStats {
        self.stats
    }
}
