//! # tabula-formula
//!
//! Formula pipeline for tabula.
//!
//! This crate provides:
//! - Lexing (raw cell text → tokens)
//! - Parsing (tokens → AST), Pratt style
//! - Evaluation (AST → [`Value`](tabula_core::Value))
//! - Built-in functions (`Pi`, `Sqrt`, `Sum`, ...)
//! - Dependency tracking and cycle detection
//!
//! ## Example
//!
//! ```rust
//! use tabula_core::{CellStore, Value};
//! use tabula_formula::{evaluate, parse_formula, EvaluationContext};
//!
//! let mut cells = CellStore::new();
//! cells.set("B2".parse().unwrap(), "=4", Value::Int(4));
//!
//! let ast = parse_formula("=Sum(B2, 1.5)");
//! let result = evaluate(&ast, &EvaluationContext::new(&cells));
//! assert_eq!(result, Value::Float(5.5));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{
    Expression, InfixOperator, Literal, PrefixOperator, RangePositions, MAX_RANGE_CELLS,
};
pub use dependency::{extract_references, DependencyGraph};
pub use error::{ParseError, ParseResult};
pub use evaluator::{evaluate, evaluate_expression, EvaluationContext};
pub use lexer::{tokenize, tokens_to_string};
pub use parser::{parse, parse_formula, MAX_NESTING_DEPTH};
pub use token::{Precedence, Token, TokenKind};
