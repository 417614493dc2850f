//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellPosition`] - A cell's location (e.g., "A1")
//! - [`Value`] - The evaluated value of a cell
//! - [`DataCell`] - Raw text paired with its evaluated value
//! - [`CellStore`] - Position-keyed storage of data cells

mod position;
mod storage;
mod value;

pub use position::CellPosition;
pub use storage::{CellStore, DataCell};
pub use value::Value;
