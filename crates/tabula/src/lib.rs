//! # tabula
//!
//! A spreadsheet formula engine.
//!
//! Raw cell text goes in, evaluated values come out. Formulas start with `=`
//! and may reference other cells (`B2`), ranges (`B2:D4`) and built-in
//! functions (`Sum`, `Sqrt`, `Pi`, ...). The [`Sheet`] tracks which cells
//! read which others, re-evaluates dependents after every edit and flags
//! reference cycles as errors.
//!
//! ## Example
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! let mut sheet = Sheet::new();
//! sheet.edit(2, 2, "=5");
//! sheet.edit(1, 1, "=B2 * 2");
//! assert_eq!(sheet.display_value(1, 1), "10");
//!
//! // Dependents follow their inputs
//! sheet.edit(2, 2, "=7.5");
//! assert_eq!(sheet.display_value(1, 1), "15.0");
//!
//! // Cycles are broken and flagged on every member
//! let stats = sheet.edit(2, 2, "=A1");
//! assert!(stats.has_cycles());
//! assert_eq!(sheet.display_value(1, 1), "Error: `CYCLE: (A1, B2)`");
//! assert_eq!(sheet.raw_value(2, 2), "=A1");
//! ```

pub mod calculation;
pub mod prelude;
pub mod sheet;

pub use calculation::{CalculationOptions, CalculationStats, Propagation};
pub use sheet::Sheet;

// Re-export core types
pub use tabula_core::{
    CellPosition, CellStore, DataCell, Error, Result, Value, MAX_COLUMN, MAX_ROW,
};

// Re-export formula types
pub use tabula_formula::{
    evaluate, parse, parse_formula, tokenize, tokens_to_string, DependencyGraph,
    EvaluationContext, Expression, ParseError, ParseResult, Token, TokenKind, MAX_NESTING_DEPTH,
    MAX_RANGE_CELLS,
};
