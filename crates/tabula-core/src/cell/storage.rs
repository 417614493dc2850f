//! Cell storage implementation
//!
//! Only cells that received content are stored. The store is keyed by
//! [`CellPosition`] in a `BTreeMap`, so iteration is row-major.

use std::collections::BTreeMap;

use super::{CellPosition, Value};

/// Raw text of a cell paired with its evaluated value
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataCell {
    /// Text exactly as entered
    pub raw: String,
    /// Value produced by evaluating `raw`
    pub evaluated: Value,
}

impl DataCell {
    /// Create a new data cell
    pub fn new<S: Into<String>>(raw: S, evaluated: Value) -> Self {
        Self {
            raw: raw.into(),
            evaluated,
        }
    }

    /// Reset to empty text and a `Nil` value
    pub fn reset(&mut self) {
        self.raw.clear();
        self.evaluated = Value::Nil;
    }

    /// Check if this cell has no text and no value
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.evaluated.is_nil()
    }

    /// Text shown to the user
    pub fn display_value(&self) -> String {
        self.evaluated.to_string()
    }
}

/// Sparse position-keyed storage for data cells
#[derive(Debug, Clone, Default)]
pub struct CellStore {
    cells: BTreeMap<CellPosition, DataCell>,
}

impl CellStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cell, if it was ever written
    pub fn get(&self, pos: CellPosition) -> Option<&DataCell> {
        self.cells.get(&pos)
    }

    /// Check whether a cell exists at `pos`
    pub fn contains(&self, pos: CellPosition) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Evaluated value at `pos`, `Nil` when absent
    pub fn value(&self, pos: CellPosition) -> Value {
        self.cells
            .get(&pos)
            .map(|cell| cell.evaluated.clone())
            .unwrap_or_default()
    }

    /// Raw text at `pos`, empty when absent
    pub fn raw(&self, pos: CellPosition) -> &str {
        self.cells.get(&pos).map(|cell| cell.raw.as_str()).unwrap_or("")
    }

    /// Replace both the raw text and the evaluated value at `pos`
    pub fn set<S: Into<String>>(&mut self, pos: CellPosition, raw: S, evaluated: Value) {
        self.cells.insert(pos, DataCell::new(raw, evaluated));
    }

    /// Replace only the evaluated value at `pos`, keeping its raw text
    pub fn set_value(&mut self, pos: CellPosition, evaluated: Value) {
        self.cells.entry(pos).or_default().evaluated = evaluated;
    }

    /// Reset the cell at `pos` to `("", Nil)`; returns false if it was absent
    pub fn reset(&mut self, pos: CellPosition) -> bool {
        match self.cells.get_mut(&pos) {
            Some(cell) => {
                cell.reset();
                true
            }
            None => false,
        }
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if no cell is stored
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over stored cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (CellPosition, &DataCell)> + '_ {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    /// Iterate over stored positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = CellPosition> + '_ {
        self.cells.keys().copied()
    }
}
