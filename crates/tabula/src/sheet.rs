//! The sheet: cell store, dependency graph and the edit contract
//!
//! Every mutation goes through [`Sheet::edit`] (or [`Sheet::clear`]). An
//! edit re-parses the cell, rebuilds its dependencies, breaks any reference
//! cycle and re-evaluates the cells that depend on it.

use std::collections::BTreeSet;
use std::fmt;

use log::{debug, warn};
use tabula_core::{CellPosition, CellStore, DataCell, Value};
use tabula_formula::{parse, tokenize, DependencyGraph};

use crate::calculation::{
    cycle_error, Burst, CalculationOptions, CalculationStats, Formulas, Observer,
};

/// A single sheet of cells
pub struct Sheet {
    cells: CellStore,
    dependencies: DependencyGraph,
    formulas: Formulas,
    options: CalculationOptions,
    observer: Option<Observer>,
}

impl Sheet {
    /// Create an empty sheet with default options
    pub fn new() -> Self {
        Self::with_options(CalculationOptions::default())
    }

    /// Create an empty sheet with custom options
    pub fn with_options(options: CalculationOptions) -> Self {
        Self {
            cells: CellStore::new(),
            dependencies: DependencyGraph::with_self_references(options.record_self_references),
            formulas: Formulas::default(),
            options,
            observer: None,
        }
    }

    /// Calculation options in effect
    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    /// Register the callback invoked whenever a cell's stored value changes
    pub fn set_observer<F>(&mut self, observer: F)
    where
        F: FnMut(CellPosition) + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    /// Remove the change callback
    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    // === Edit contract ===

    /// Replace the text of the cell at (`column`, `row`)
    ///
    /// # Panics
    ///
    /// Panics if `column` or `row` is zero.
    pub fn edit(&mut self, column: u16, row: u16, raw: &str) -> CalculationStats {
        self.edit_position(CellPosition::new(column, row), raw)
    }

    /// Replace the text of the cell at an A1-style position
    pub fn edit_at(&mut self, position: &str, raw: &str) -> tabula_core::Result<CalculationStats> {
        let pos: CellPosition = position.parse()?;
        Ok(self.edit_position(pos, raw))
    }

    /// Replace the text of the cell at `pos`
    pub fn edit_position(&mut self, pos: CellPosition, raw: &str) -> CalculationStats {
        debug!("edit {} = {:?}", pos, raw);

        let parsed = parse(&tokenize(raw));
        self.dependencies.update(pos, &parsed);
        self.formulas.insert(pos, parsed);
        debug!(
            "dependencies of {} rebuilt: {:?}",
            pos,
            self.dependencies.used_positions(pos)
        );

        let cyclic = self.dependencies.catch_circling_cells();
        if cyclic.is_empty() {
            let mut burst = self.burst();
            let value = burst.evaluate_cell(pos);
            burst.store(pos, Some(raw), value);
            burst.propagate(&[pos]);
            return burst.finish();
        }

        self.break_cycles(&cyclic);
        let stamp = cycle_error(&cyclic);

        let mut burst = self.burst();
        for &member in &cyclic {
            let raw = (member == pos).then_some(raw);
            burst.store(member, raw, stamp.clone());
        }

        let mut sources: Vec<CellPosition> = cyclic.iter().copied().collect();
        if !cyclic.contains(&pos) {
            let value = burst.evaluate_cell(pos);
            burst.store(pos, Some(raw), value);
            sources.push(pos);
        }
        burst.propagate(&sources);

        let mut stats = burst.finish();
        stats.cyclic_cells = cyclic;
        stats
    }

    /// Delete the content of the cell at (`column`, `row`)
    ///
    /// The cell is reset to empty text and `Nil`, and its dependents are
    /// re-evaluated.
    ///
    /// # Panics
    ///
    /// Panics if `column` or `row` is zero.
    pub fn clear(&mut self, column: u16, row: u16) -> CalculationStats {
        let pos = CellPosition::new(column, row);
        debug!("clear {}", pos);

        self.dependencies.clear_dependencies(pos);
        self.formulas.remove(&pos);

        let mut burst = self.burst();
        burst.reset(pos);
        burst.propagate(&[pos]);
        burst.finish()
    }

    /// Re-evaluate the whole sheet from its raw text
    ///
    /// Rebuilds every dependency, breaks cycles, then evaluates each cell
    /// after the cells it reads. Cells left out of dependency tracking by an
    /// earlier cycle are picked up again.
    pub fn recalculate(&mut self) -> CalculationStats {
        let positions: Vec<CellPosition> = self
            .cells
            .iter()
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(pos, _)| pos)
            .collect();
        debug!("recalculating {} cells", positions.len());

        self.dependencies.flush();
        self.formulas.clear();
        for &pos in &positions {
            let parsed = parse(&tokenize(self.cells.raw(pos)));
            self.dependencies.update(pos, &parsed);
            self.formulas.insert(pos, parsed);
        }

        let cyclic = self.dependencies.catch_circling_cells();
        if !cyclic.is_empty() {
            self.break_cycles(&cyclic);
        }
        let order = self.dependencies.recalc_order(&positions);

        let mut burst = self.burst();
        if !cyclic.is_empty() {
            let stamp = cycle_error(&cyclic);
            for &member in &cyclic {
                burst.store(member, None, stamp.clone());
            }
        }
        for pos in order {
            if cyclic.contains(&pos) || !burst.formulas.contains_key(&pos) {
                continue;
            }
            let value = burst.evaluate_cell(pos);
            burst.store(pos, None, value);
        }

        let mut stats = burst.finish();
        stats.cyclic_cells = cyclic;
        stats
    }

    // === Read access ===

    /// Evaluated form of the cell, empty for absent cells
    ///
    /// # Panics
    ///
    /// Panics if `column` or `row` is zero.
    pub fn display_value(&self, column: u16, row: u16) -> String {
        self.cells
            .get(CellPosition::new(column, row))
            .map(DataCell::display_value)
            .unwrap_or_default()
    }

    /// Text as entered, empty for absent cells
    ///
    /// # Panics
    ///
    /// Panics if `column` or `row` is zero.
    pub fn raw_value(&self, column: u16, row: u16) -> String {
        self.cells.raw(CellPosition::new(column, row)).to_string()
    }

    /// Evaluated value at `pos`, `Nil` for absent cells
    pub fn value(&self, pos: CellPosition) -> Value {
        self.cells.value(pos)
    }

    /// Get a cell, if it ever received content
    pub fn get(&self, pos: CellPosition) -> Option<&DataCell> {
        self.cells.get(pos)
    }

    /// Iterate over stored cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (CellPosition, &DataCell)> + '_ {
        self.cells.iter()
    }

    /// The underlying cell store
    pub fn store(&self) -> &CellStore {
        &self.cells
    }

    /// The dependency graph, read only
    pub fn dependencies(&self) -> &DependencyGraph {
        &self.dependencies
    }

    fn break_cycles(&mut self, cyclic: &BTreeSet<CellPosition>) {
        let members: Vec<String> = cyclic.iter().map(CellPosition::to_string).collect();
        warn!("reference cycle detected: {}", members.join(", "));
        self.dependencies.filter_cyclic_dependencies(cyclic);
    }

    fn burst(&mut self) -> Burst<'_> {
        Burst {
            cells: &mut self.cells,
            dependencies: &self.dependencies,
            formulas: &self.formulas,
            observer: &mut self.observer,
            options: &self.options,
            stats: CalculationStats::default(),
        }
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sheet")
            .field("cells", &self.cells)
            .field("dependencies", &self.dependencies)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::calculation::Propagation;

    fn pos(s: &str) -> CellPosition {
        s.parse().unwrap()
    }

    fn sheet_with(edits: &[(&str, &str)]) -> Sheet {
        let mut sheet = Sheet::new();
        for (at, raw) in edits {
            sheet.edit_at(at, raw).unwrap();
        }
        sheet
    }

    #[test]
    fn test_edit_and_read_back() {
        let mut sheet = Sheet::new();
        sheet.edit(1, 1, "=1 + 2");
        assert_eq!(sheet.display_value(1, 1), "3");
        assert_eq!(sheet.raw_value(1, 1), "=1 + 2");
        assert_eq!(sheet.value(pos("A1")), Value::Int(3));
    }

    #[test]
    fn test_absent_cells_are_empty() {
        let sheet = Sheet::new();
        assert_eq!(sheet.display_value(3, 7), "");
        assert_eq!(sheet.raw_value(3, 7), "");
        assert_eq!(sheet.value(pos("C7")), Value::Nil);
    }

    #[test]
    fn test_plain_text() {
        let sheet = sheet_with(&[("A1", "hello   world")]);
        assert_eq!(sheet.display_value(1, 1), "hello world");
        assert_eq!(sheet.raw_value(1, 1), "hello   world");
    }

    #[test]
    fn test_parse_error_is_stored_as_value() {
        let sheet = sheet_with(&[("A1", "=1 +")]);
        assert!(sheet.value(pos("A1")).is_error());
        assert_eq!(sheet.raw_value(1, 1), "=1 +");
    }

    #[test]
    fn test_oversized_range_is_an_error_value() {
        let mut sheet = sheet_with(&[("A1", "=B1 + C1")]);
        let stats = sheet.edit(1, 1, "=Sum(B1:CRXO65535)");
        assert_eq!(stats.cells_evaluated, 1);
        assert_eq!(
            sheet.value(pos("A1")),
            Value::error("Cell range too large: `B1:CRXO65535`")
        );
        assert_eq!(sheet.raw_value(1, 1), "=Sum(B1:CRXO65535)");
        assert!(sheet.dependencies().is_empty());

        // A full column is still fine
        sheet.edit_at("A5", "=7").unwrap();
        sheet.edit_at("B1", "=Sum(A1:A65535)").unwrap();
        assert_eq!(sheet.value(pos("B1")), Value::Int(7));
    }

    #[test]
    fn test_deep_nesting_is_an_error_value() {
        let raw = format!("={}1", "-".repeat(2000));
        let mut sheet = Sheet::new();
        sheet.edit(1, 1, &raw);
        assert_eq!(sheet.value(pos("A1")), Value::error("Formula nested too deeply"));
        assert_eq!(sheet.raw_value(1, 1), raw);

        let chain = format!("={}", vec!["A1"; 20_000].join(" + "));
        sheet.edit(2, 1, &chain);
        assert_eq!(sheet.value(pos("B1")), Value::error("Formula nested too deeply"));
        assert!(sheet.dependencies().is_empty());
    }

    #[test]
    #[should_panic(expected = "column index must be >= 1")]
    fn test_edit_zero_column_panics() {
        Sheet::new().edit(0, 1, "=1");
    }

    #[test]
    fn test_edit_at_invalid_position() {
        let mut sheet = Sheet::new();
        assert!(sheet.edit_at("A0", "=1").is_err());
        assert!(sheet.edit_at("a1", "=1").is_err());
        assert_eq!(sheet.store().len(), 0);
    }

    #[test]
    fn test_dependents_follow_edits() {
        let mut sheet = sheet_with(&[("B2", "=5"), ("A1", "=B2 * 2")]);
        assert_eq!(sheet.display_value(1, 1), "10");

        let stats = sheet.edit_at("B2", "=7").unwrap();
        assert_eq!(sheet.display_value(1, 1), "14");
        assert_eq!(stats.changed, vec![pos("B2"), pos("A1")]);
        assert_eq!(stats.cells_evaluated, 2);
    }

    #[test]
    fn test_chain_propagates() {
        let mut sheet = sheet_with(&[("A1", "=1"), ("A2", "=A1 + 1"), ("A3", "=A2 + 1")]);
        sheet.edit_at("A1", "=10").unwrap();
        assert_eq!(sheet.value(pos("A3")), Value::Int(12));
    }

    #[test]
    fn test_cycle_is_flagged_and_severed() {
        let mut sheet = sheet_with(&[("A1", "=B2"), ("B2", "=5")]);
        assert_eq!(sheet.display_value(1, 1), "5");

        let stats = sheet.edit_at("B2", "=A1").unwrap();
        let cycle = Value::error("CYCLE: (A1, B2)");
        assert_eq!(sheet.value(pos("A1")), cycle);
        assert_eq!(sheet.value(pos("B2")), cycle);
        assert_eq!(sheet.raw_value(1, 1), "=B2");
        assert_eq!(sheet.raw_value(2, 2), "=A1");
        assert!(sheet.dependencies().is_empty());
        assert_eq!(
            stats.cyclic_cells,
            [pos("A1"), pos("B2")].into_iter().collect()
        );
    }

    #[test]
    fn test_cycle_dependents_see_the_error() {
        let mut sheet = sheet_with(&[("A1", "=B1"), ("C1", "=A1 + 1"), ("B1", "=1")]);
        assert_eq!(sheet.value(pos("C1")), Value::Int(2));

        sheet.edit_at("B1", "=A1").unwrap();
        assert!(sheet.value(pos("C1")).is_error());
    }

    #[test]
    fn test_recalculate_after_fixing_a_cycle() {
        let mut sheet = sheet_with(&[("A1", "=B1"), ("B1", "=A1")]);
        assert!(sheet.value(pos("A1")).is_error());

        // Fixing one member leaves the other flagged until a full rebuild
        sheet.edit_at("B1", "=3").unwrap();
        assert_eq!(sheet.value(pos("B1")), Value::Int(3));
        assert!(sheet.value(pos("A1")).is_error());

        let stats = sheet.recalculate();
        assert!(!stats.has_cycles());
        assert_eq!(sheet.value(pos("A1")), Value::Int(3));
        assert_eq!(sheet.dependencies().used_positions(pos("A1")), vec![pos("B1")]);
    }

    #[test]
    fn test_recalculate_keeps_cycles_flagged() {
        let mut sheet = sheet_with(&[("A1", "=B1"), ("B1", "=A1"), ("C1", "=2")]);
        let stats = sheet.recalculate();
        assert_eq!(
            stats.cyclic_cells,
            [pos("A1"), pos("B1")].into_iter().collect()
        );
        assert_eq!(sheet.value(pos("C1")), Value::Int(2));
        assert!(sheet.dependencies().is_empty());
    }

    #[test]
    fn test_clear_resets_and_propagates() {
        let mut sheet = sheet_with(&[("B1", "=4"), ("A1", "=Sum(B1, 1)")]);
        assert_eq!(sheet.value(pos("A1")), Value::Int(5));

        let stats = sheet.clear(2, 1);
        assert_eq!(sheet.raw_value(2, 1), "");
        assert_eq!(sheet.value(pos("B1")), Value::Nil);
        assert_eq!(sheet.value(pos("A1")), Value::Int(1));
        assert_eq!(stats.changed, vec![pos("B1"), pos("A1")]);
    }

    #[test]
    fn test_observer_sees_every_update() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut sheet = Sheet::new();
        let sink = Rc::clone(&seen);
        sheet.set_observer(move |pos| sink.borrow_mut().push(pos));

        sheet.edit_at("A1", "=1").unwrap();
        sheet.edit_at("A2", "=A1").unwrap();
        sheet.edit_at("A1", "=2").unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![pos("A1"), pos("A2"), pos("A1"), pos("A2")]
        );
    }

    // Diamond: A1 feeds B1 and B2, both feed C1
    fn diamond(propagation: Propagation) -> (Sheet, CalculationStats) {
        let mut sheet = Sheet::with_options(CalculationOptions {
            propagation,
            ..Default::default()
        });
        for (at, raw) in [
            ("A1", "=1"),
            ("B1", "=A1 + 1"),
            ("B2", "=A1 * 10"),
            ("C1", "=B1 + B2"),
        ] {
            sheet.edit_at(at, raw).unwrap();
        }
        let stats = sheet.edit_at("A1", "=2").unwrap();
        (sheet, stats)
    }

    #[test]
    fn test_recursive_propagation_revisits_diamonds() {
        let (sheet, stats) = diamond(Propagation::Recursive);
        assert_eq!(sheet.value(pos("C1")), Value::Int(23));
        assert_eq!(
            stats.changed,
            vec![pos("A1"), pos("B1"), pos("C1"), pos("B2"), pos("C1")]
        );
    }

    #[test]
    fn test_worklist_propagation_visits_once() {
        let (sheet, stats) = diamond(Propagation::Worklist);
        assert_eq!(sheet.value(pos("C1")), Value::Int(23));
        assert_eq!(stats.changed.len(), 4);
        assert_eq!(stats.changed.last(), Some(&pos("C1")));
        assert_eq!(stats.changed.iter().filter(|p| **p == pos("C1")).count(), 1);
    }

    #[test]
    fn test_evaluation_budget() {
        let mut sheet = Sheet::with_options(CalculationOptions {
            max_evaluations_per_edit: 3,
            ..Default::default()
        });
        sheet.edit(1, 1, "=0");
        for row in 2..=10u16 {
            sheet.edit(1, row, &format!("=A{} + 1", row - 1));
        }
        let stats = sheet.edit(1, 1, "=100");
        assert!(stats.truncated);
        assert_eq!(stats.cells_evaluated, 3);
        assert_eq!(sheet.value(pos("A3")), Value::Int(102));
        // Past the budget the old values remain
        assert_eq!(sheet.value(pos("A4")), Value::Int(3));
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let mut sheet = Sheet::new();
        for row in 2..=2000u16 {
            sheet.edit(1, row, &format!("=A{} + 1", row - 1));
        }
        sheet.edit(1, 1, "=0");
        assert_eq!(sheet.value(CellPosition::new(1, 2000)), Value::Int(1999));
    }

    #[test]
    fn test_self_reference_default() {
        let sheet = sheet_with(&[("A1", "=Sqrt(9)")]);
        assert_eq!(sheet.value(pos("A1")), Value::Float(3.0));

        let mut sheet = sheet;
        let stats = sheet.edit_at("A1", "=Sqrt(A1)").unwrap();
        assert!(!stats.has_cycles());
        assert!(sheet.dependencies().is_empty());
    }

    #[test]
    fn test_self_reference_recorded() {
        let mut sheet = Sheet::with_options(CalculationOptions {
            record_self_references: true,
            ..Default::default()
        });
        let stats = sheet.edit_at("A1", "=A1 + 1").unwrap();
        assert_eq!(stats.cyclic_cells, [pos("A1")].into_iter().collect());
        assert_eq!(sheet.value(pos("A1")), Value::error("CYCLE: (A1)"));
        assert!(sheet.dependencies().is_empty());
    }
}
