//! Formula Abstract Syntax Tree types

use std::fmt;

use tabula_core::{CellPosition, Value};

use crate::error::{ParseError, ParseResult};
use crate::token::TokenKind;

/// Largest number of cells a single range may enclose
pub const MAX_RANGE_CELLS: u64 = 1 << 20;

/// Formula expression AST
///
/// Equality is structural: two trees are equal when every node matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // === Leaves ===
    /// Literal value
    Literal(Literal),
    /// Bare name; only meaningful as the callee of a function call
    Identifier(String),
    /// Single cell reference
    Cell(CellPosition),

    // === Operators ===
    /// `begin:end`
    CellRange {
        begin: Box<Expression>,
        end: Box<Expression>,
    },
    /// Unary operation
    Prefix {
        operator: PrefixOperator,
        operand: Box<Expression>,
    },
    /// Binary operation
    Infix {
        lhs: Box<Expression>,
        operator: InfixOperator,
        rhs: Box<Expression>,
    },

    // === Function call ===
    FnCall {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// Wrap the literal in the matching runtime value
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Int(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    /// `-x`
    Negate,
    /// `!x`
    Not,
}

impl PrefixOperator {
    /// Get the operator symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            PrefixOperator::Negate => "-",
            PrefixOperator::Not => "!",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,

    // Comparison
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl InfixOperator {
    /// Map an operator token kind to its operator
    pub fn from_token_kind(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Plus => InfixOperator::Add,
            TokenKind::Minus => InfixOperator::Subtract,
            TokenKind::Asterisk => InfixOperator::Multiply,
            TokenKind::Slash => InfixOperator::Divide,
            TokenKind::Eq => InfixOperator::Equal,
            TokenKind::NotEq => InfixOperator::NotEqual,
            TokenKind::Gt => InfixOperator::Greater,
            TokenKind::Ge => InfixOperator::GreaterEqual,
            TokenKind::Lt => InfixOperator::Less,
            TokenKind::Le => InfixOperator::LessEqual,
            _ => return None,
        })
    }

    /// Get the operator symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            InfixOperator::Add => "+",
            InfixOperator::Subtract => "-",
            InfixOperator::Multiply => "*",
            InfixOperator::Divide => "/",
            InfixOperator::Equal => "==",
            InfixOperator::NotEqual => "!=",
            InfixOperator::Greater => ">",
            InfixOperator::GreaterEqual => ">=",
            InfixOperator::Less => "<",
            InfixOperator::LessEqual => "<=",
        }
    }

    /// Check if this is a comparison operator
    pub fn is_comparison(&self) -> bool {
        !matches!(
            self,
            InfixOperator::Add
                | InfixOperator::Subtract
                | InfixOperator::Multiply
                | InfixOperator::Divide
        )
    }
}

/// Positions enclosed by a cell range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePositions {
    /// The smaller endpoint by position ordering
    pub begin: CellPosition,
    /// The larger endpoint by position ordering
    pub end: CellPosition,
    /// Every enclosed position, columns outer and rows inner
    pub positions: Vec<CellPosition>,
}

impl RangePositions {
    /// Number of cells in the rectangle spanned by two corners
    pub fn cell_count(a: CellPosition, b: CellPosition) -> u64 {
        let columns = u64::from(a.column().abs_diff(b.column())) + 1;
        let rows = u64::from(a.row().abs_diff(b.row())) + 1;
        columns * rows
    }

    /// Expand the rectangle spanned by two corners
    ///
    /// Fails with [`ParseError::RangeTooLarge`] when the rectangle holds more
    /// than [`MAX_RANGE_CELLS`] cells; nothing is allocated in that case.
    pub fn between(a: CellPosition, b: CellPosition) -> ParseResult<Self> {
        let (begin, end) = if a <= b { (a, b) } else { (b, a) };

        let count = Self::cell_count(a, b);
        if count > MAX_RANGE_CELLS {
            return Err(ParseError::RangeTooLarge(format!("{}:{}", begin, end)));
        }

        let (first_col, last_col) = (a.column().min(b.column()), a.column().max(b.column()));
        let (first_row, last_row) = (a.row().min(b.row()), a.row().max(b.row()));

        let mut positions = Vec::with_capacity(count as usize);
        for column in first_col..=last_col {
            for row in first_row..=last_row {
                positions.push(CellPosition::new(column, row));
            }
        }

        Ok(Self {
            begin,
            end,
            positions,
        })
    }

    /// Canonical `"<begin>:<end>"` text
    pub fn range_string(&self) -> String {
        format!("{}:{}", self.begin, self.end)
    }
}

impl Expression {
    /// Create a literal int expression
    pub fn int(i: i64) -> Self {
        Expression::Literal(Literal::Int(i))
    }

    /// Create a literal string expression
    pub fn string<S: Into<String>>(s: S) -> Self {
        Expression::Literal(Literal::String(s.into()))
    }

    /// Create a single cell reference
    pub fn cell(pos: CellPosition) -> Self {
        Expression::Cell(pos)
    }

    /// Positions enclosed by a `CellRange` whose endpoints are both cells
    ///
    /// `None` for any other expression; `Some(Err(_))` for a range past
    /// [`MAX_RANGE_CELLS`].
    pub fn range_positions(&self) -> Option<ParseResult<RangePositions>> {
        match self {
            Expression::CellRange { begin, end } => match (begin.as_ref(), end.as_ref()) {
                (Expression::Cell(a), Expression::Cell(b)) => Some(RangePositions::between(*a, *b)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "\"{}\"", s),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::Cell(pos) => write!(f, "{}", pos),
            Expression::CellRange { begin, end } => write!(f, "{}:{}", begin, end),
            Expression::Prefix { operator, operand } => {
                write!(f, "({}{})", operator.symbol(), operand)
            }
            Expression::Infix { lhs, operator, rhs } => {
                write!(f, "({} {} {})", lhs, operator.symbol(), rhs)
            }
            Expression::FnCall { callee, arguments } => {
                let args: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", callee, args.join(", "))
            }
        }
    }
}
