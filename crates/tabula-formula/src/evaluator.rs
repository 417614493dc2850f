//! Formula evaluator
//!
//! Walks an [`Expression`] against a cell store and produces a [`Value`].
//! Evaluation never fails with a Rust error: every problem becomes a
//! `Value::Error` that absorbs through the rest of the expression.

use std::cmp::Ordering;

use tabula_core::{CellPosition, CellStore, Value};

use crate::ast::{Expression, InfixOperator, PrefixOperator};
use crate::error::ParseResult;
use crate::functions::get_function_registry;

/// Context for formula evaluation
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationContext<'a> {
    /// Cells that references resolve against; `None` resolves every reference to `Nil`
    pub cells: Option<&'a CellStore>,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context that resolves references against `cells`
    pub fn new(cells: &'a CellStore) -> Self {
        Self { cells: Some(cells) }
    }

    /// Create a simple context with no cells (for testing)
    pub fn simple() -> Self {
        Self { cells: None }
    }

    /// Stored value at `pos`, `Nil` when absent
    pub fn value_at(&self, pos: CellPosition) -> Value {
        self.cells.map(|cells| cells.value(pos)).unwrap_or_default()
    }
}

/// Evaluate a parse result
///
/// A parse error becomes an error value carrying the parse message.
///
/// # Example
/// ```rust
/// use tabula_core::Value;
/// use tabula_formula::{evaluate, parse_formula, EvaluationContext};
///
/// let parsed = parse_formula("=1 + 2.5");
/// assert_eq!(evaluate(&parsed, &EvaluationContext::simple()), Value::Float(3.5));
/// ```
pub fn evaluate(parsed: &ParseResult<Expression>, ctx: &EvaluationContext) -> Value {
    match parsed {
        Ok(expr) => evaluate_expression(expr, ctx),
        Err(err) => Value::Error(err.to_string()),
    }
}

/// Evaluate a single expression node
pub fn evaluate_expression(expr: &Expression, ctx: &EvaluationContext) -> Value {
    match expr {
        Expression::Literal(lit) => lit.to_value(),

        Expression::Identifier(name) => Value::Identifier(name.clone()),

        Expression::Cell(pos) => ctx.value_at(*pos),

        Expression::CellRange { .. } => evaluate_cell_range(expr, ctx),

        Expression::Prefix { operator, operand } => {
            let value = evaluate_expression(operand, ctx);
            match operator {
                PrefixOperator::Negate => value.negate(),
                PrefixOperator::Not => value.not(),
            }
        }

        Expression::Infix { lhs, operator, rhs } => {
            let left = evaluate_expression(lhs, ctx);
            let right = evaluate_expression(rhs, ctx);
            evaluate_infix(*operator, &left, &right)
        }

        Expression::FnCall { callee, arguments } => evaluate_fn_call(callee, arguments, ctx),
    }
}

fn evaluate_infix(op: InfixOperator, left: &Value, right: &Value) -> Value {
    match op {
        InfixOperator::Add => left.add(right),
        InfixOperator::Subtract => left.sub(right),
        InfixOperator::Multiply => left.mul(right),
        InfixOperator::Divide => left.div(right),
        InfixOperator::Equal => compare(op, left, right, Ordering::is_eq),
        InfixOperator::NotEqual => compare(op, left, right, Ordering::is_ne),
        InfixOperator::Greater => compare(op, left, right, Ordering::is_gt),
        InfixOperator::GreaterEqual => compare(op, left, right, Ordering::is_ge),
        InfixOperator::Less => compare(op, left, right, Ordering::is_lt),
        InfixOperator::LessEqual => compare(op, left, right, Ordering::is_le),
    }
}

fn compare(
    op: InfixOperator,
    left: &Value,
    right: &Value,
    holds: fn(Ordering) -> bool,
) -> Value {
    match left.compare(right, op.symbol()) {
        Ok(ordering) => Value::Bool(holds(ordering)),
        Err(err) => err,
    }
}

fn evaluate_cell_range(expr: &Expression, ctx: &EvaluationContext) -> Value {
    let range = match expr.range_positions() {
        Some(Ok(range)) => range,
        Some(Err(err)) => return Value::Error(err.to_string()),
        None => return Value::error("Wrong type, cell range requires `CellRow:CellCol`"),
    };

    let mut values = Vec::with_capacity(range.positions.len());
    for pos in &range.positions {
        let value = ctx.value_at(*pos);
        if matches!(value, Value::CellRange { .. }) {
            return Value::error("Invalid expression: nested cell ranges are not supported yet");
        }
        values.push(value);
    }

    Value::CellRange {
        range: range.range_string(),
        values,
    }
}

fn evaluate_fn_call(callee: &Expression, arguments: &[Expression], ctx: &EvaluationContext) -> Value {
    let callee = evaluate_expression(callee, ctx);
    if callee.is_error() {
        return callee;
    }

    let args: Vec<Value> = arguments
        .iter()
        .map(|arg| evaluate_expression(arg, ctx))
        .collect();

    match callee {
        Value::Identifier(name) => get_function_registry().call(&name, &args),
        other => Value::error(format!("Fn: `{}` not implemented", other)),
    }
}
