//! Prelude module - common imports for tabula users
//!
//! ```rust
//! use tabula::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationOptions,
    CalculationStats,
    // Cell types
    CellPosition,
    DataCell,
    // Error types
    Error,
    Propagation,
    Result,
    // Main types
    Sheet,
    Value,
};
