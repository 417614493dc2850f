//! # tabula-core
//!
//! Core data structures for the tabula formula engine.
//!
//! This crate provides the fundamental types used throughout tabula:
//! - [`CellPosition`] - A column/row coordinate (e.g., "A1", "AA256")
//! - [`Value`] - Runtime values produced by formula evaluation, with arithmetic dispatch
//! - [`DataCell`] and [`CellStore`] - Raw text plus evaluated value, keyed by position
//!
//! ## Example
//!
//! ```rust
//! use tabula_core::{CellPosition, CellStore, Value};
//!
//! let mut store = CellStore::new();
//! let pos: CellPosition = "B2".parse().unwrap();
//! store.set(pos, "=2", Value::Int(2));
//!
//! assert_eq!(store.value(pos), Value::Int(2));
//! assert_eq!(Value::Int(2).add(&Value::Float(0.5)), Value::Float(2.5));
//! ```

pub mod cell;
pub mod error;

// Re-exports for convenience
pub use cell::{CellPosition, CellStore, DataCell, Value};
pub use error::{Error, Result};

/// Maximum column index (columns are 1-based)
pub const MAX_COLUMN: u16 = u16::MAX;

/// Maximum row index (rows are 1-based)
pub const MAX_ROW: u16 = u16::MAX;
