//! Runtime value types and arithmetic dispatch

use std::cmp::Ordering;
use std::fmt;

/// The result of evaluating a cell's formula
///
/// `Error` and `Nil` are absorbing: any arithmetic applied to them, or with
/// them as the right-hand operand, yields a new `Error`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value"))]
pub enum Value {
    /// Integer value
    Int(i64),

    /// Floating point value
    Float(f64),

    /// Boolean value (`true`/`false`)
    Bool(bool),

    /// String value
    String(String),

    /// A function name that has not been called yet
    Identifier(String),

    /// The values enclosed by a cell range, with the range's source text
    CellRange {
        /// Canonical `"<begin>:<end>"` text
        range: String,
        /// Enclosed values, columns outer and rows inner
        values: Vec<Value>,
    },

    /// Value of an empty cell
    #[default]
    Nil,

    /// Error value carrying a message
    Error(String),
}

/// Arithmetic operator selector for [`Value`] dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
}

impl Arith {
    fn verb(self) -> &'static str {
        match self {
            Arith::Add => "add",
            Arith::Sub => "sub",
            Arith::Mul => "mul",
            Arith::Div => "div",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Arith::Add => "+",
            Arith::Sub => "-",
            Arith::Mul => "*",
            Arith::Div => "/",
        }
    }

    fn on_ints(self, a: i64, b: i64) -> Option<i64> {
        match self {
            Arith::Add => a.checked_add(b),
            Arith::Sub => a.checked_sub(b),
            Arith::Mul => a.checked_mul(b),
            Arith::Div => a.checked_div(b),
        }
    }

    fn on_floats(self, a: f64, b: f64) -> f64 {
        match self {
            Arith::Add => a + b,
            Arith::Sub => a - b,
            Arith::Mul => a * b,
            Arith::Div => a / b,
        }
    }
}

impl Value {
    /// Create a new error value
    pub fn error<S: Into<String>>(message: S) -> Self {
        Value::Error(message.into())
    }

    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::String(s.into())
    }

    /// Name of the value's variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::Identifier(_) => "Identifier",
            Value::CellRange { .. } => "CellRange",
            Value::Nil => "Nil",
            Value::Error(_) => "Error",
        }
    }

    /// Check if the value is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Check if the value is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check if the value is an int or a float
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Try to get the value as a float, promoting ints
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the error message, if this is an error
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Value::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// `self + other`; two strings concatenate, numbers promote
    pub fn add(&self, other: &Value) -> Value {
        if let (Value::String(a), Value::String(b)) = (self, other) {
            return Value::String(format!("{}{}", a, b));
        }
        self.arithmetic(other, Arith::Add)
    }

    /// `self - other`
    pub fn sub(&self, other: &Value) -> Value {
        self.arithmetic(other, Arith::Sub)
    }

    /// `self * other`
    pub fn mul(&self, other: &Value) -> Value {
        self.arithmetic(other, Arith::Mul)
    }

    /// `self / other`; a numeric zero divisor is always an error
    pub fn div(&self, other: &Value) -> Value {
        match other {
            Value::Int(0) => return Value::error("Can't divide by 0"),
            Value::Float(f) if *f == 0.0 => return Value::error("Can't divide by 0"),
            _ => {}
        }
        self.arithmetic(other, Arith::Div)
    }

    fn arithmetic(&self, other: &Value, op: Arith) -> Value {
        match self {
            Value::Error(_) | Value::Nil => {
                return Value::error(format!("Can't {} {}", op.verb(), self.type_name()));
            }
            Value::CellRange { .. } => {
                return Value::error(match op {
                    Arith::Add => "Cell range add not supported yet",
                    Arith::Sub => "Cell range sub not supported yet",
                    Arith::Mul => "Can't mul cells range",
                    Arith::Div => "Can't div cells range",
                });
            }
            _ => {}
        }

        if matches!(other, Value::Error(_) | Value::Nil) {
            return Value::error(format!("Can't {} {}", op.verb(), other.type_name()));
        }

        match (self, other) {
            (Value::Int(a), Value::Int(b)) => match op.on_ints(*a, *b) {
                Some(result) => Value::Int(result),
                None => Value::error(format!("Integer overflow in `{}`", op.symbol())),
            },
            (Value::Int(a), Value::Float(b)) => Value::Float(op.on_floats(*a as f64, *b)),
            (Value::Float(a), Value::Int(b)) => Value::Float(op.on_floats(*a, *b as f64)),
            (Value::Float(a), Value::Float(b)) => Value::Float(op.on_floats(*a, *b)),
            _ => Value::error(format!("Invalid types for `{}`", op.symbol())),
        }
    }

    /// Unary minus; only ints and floats can be negated
    pub fn negate(&self) -> Value {
        match self {
            Value::Int(i) => match i.checked_neg() {
                Some(n) => Value::Int(n),
                None => Value::error("Integer overflow in `-`"),
            },
            Value::Float(f) => Value::Float(-f),
            _ => Value::error("Invalid prefix `-` argument"),
        }
    }

    /// Logical not; only bools can be negated
    pub fn not(&self) -> Value {
        match self {
            Value::Bool(b) => Value::Bool(!b),
            _ => Value::error("Invalid prefix `!` argument"),
        }
    }

    /// Order two values for a comparison operator
    ///
    /// Numbers compare numerically (ints promote to floats when mixed),
    /// strings compare lexicographically and bools order `false < true`.
    /// Any other pairing returns the error value to report.
    pub fn compare(&self, other: &Value, op: &str) -> Result<Ordering, Value> {
        for side in [self, other] {
            if matches!(side, Value::Error(_) | Value::Nil) {
                return Err(Value::error(format!("Can't compare {}", side.type_name())));
            }
        }

        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x
                    .partial_cmp(&y)
                    .ok_or_else(|| Value::error(format!("Can't compare NaN with `{}`", op))),
                _ => Err(Value::error(format!("Invalid types for `{}`", op))),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => {
                let s = v.to_string();
                if v.is_finite() && !s.contains('.') {
                    write!(f, "{}.0", s)
                } else {
                    write!(f, "{}", s)
                }
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Identifier(name) => write!(f, "{}", name),
            Value::CellRange { range, values } => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{} ( {} )", range, items.join("; "))
            }
            Value::Nil => Ok(()),
            Value::Error(msg) => write!(f, "Error: `{}`", msg),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(values: Vec<Value>) -> Value {
        Value::CellRange {
            range: "B2:B4".into(),
            values,
        }
    }

    #[test]
    fn test_int_arithmetic_stays_int() {
        assert_eq!(Value::Int(2).add(&Value::Int(3)), Value::Int(5));
        assert_eq!(Value::Int(2).sub(&Value::Int(3)), Value::Int(-1));
        assert_eq!(Value::Int(2).mul(&Value::Int(3)), Value::Int(6));
        assert_eq!(Value::Int(7).div(&Value::Int(2)), Value::Int(3));
        assert_eq!(Value::Int(-7).div(&Value::Int(2)), Value::Int(-3));
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(Value::Int(8).mul(&Value::Float(5.0)), Value::Float(40.0));
        assert_eq!(Value::Float(1.5).add(&Value::Int(1)), Value::Float(2.5));
        assert_eq!(Value::Float(1.0).div(&Value::Float(4.0)), Value::Float(0.25));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            Value::string("ab").add(&Value::string("cd")),
            Value::string("abcd")
        );
        assert_eq!(
            Value::string("ab").add(&Value::Int(1)),
            Value::error("Invalid types for `+`")
        );
        assert_eq!(
            Value::string("ab").sub(&Value::string("cd")),
            Value::error("Invalid types for `-`")
        );
    }

    #[test]
    fn test_invalid_operand_types() {
        assert_eq!(
            Value::Bool(true).add(&Value::Int(1)),
            Value::error("Invalid types for `+`")
        );
        assert_eq!(
            Value::Int(1).mul(&Value::Bool(true)),
            Value::error("Invalid types for `*`")
        );
        assert_eq!(
            Value::Int(1).add(&range(vec![Value::Int(1)])),
            Value::error("Invalid types for `+`")
        );
    }

    #[test]
    fn test_error_and_nil_absorb() {
        let err = Value::error("boom");
        assert_eq!(err.add(&Value::Int(1)), Value::error("Can't add Error"));
        assert_eq!(Value::Nil.sub(&Value::Int(1)), Value::error("Can't sub Nil"));
        assert_eq!(Value::Int(1).mul(&Value::Nil), Value::error("Can't mul Nil"));
        assert_eq!(Value::Int(1).div(&err), Value::error("Can't div Error"));
        assert_eq!(
            Value::string("a").add(&Value::Nil),
            Value::error("Can't add Nil")
        );
    }

    #[test]
    fn test_cell_range_rejects_arithmetic() {
        let r = range(vec![Value::Int(1)]);
        assert_eq!(
            r.add(&Value::Int(1)),
            Value::error("Cell range add not supported yet")
        );
        assert_eq!(
            r.sub(&Value::Int(1)),
            Value::error("Cell range sub not supported yet")
        );
        assert_eq!(r.mul(&Value::Int(1)), Value::error("Can't mul cells range"));
        assert_eq!(r.div(&Value::Int(1)), Value::error("Can't div cells range"));
    }

    #[test]
    fn test_divide_by_zero() {
        let expected = Value::error("Can't divide by 0");
        assert_eq!(Value::Int(4).div(&Value::Int(0)), expected);
        assert_eq!(Value::Float(4.0).div(&Value::Float(0.0)), expected);
        assert_eq!(Value::Int(4).div(&Value::Float(-0.0)), expected);
        assert_eq!(Value::Float(4.0).div(&Value::Int(0)), expected);
    }

    #[test]
    fn test_integer_overflow() {
        assert_eq!(
            Value::Int(i64::MAX).add(&Value::Int(1)),
            Value::error("Integer overflow in `+`")
        );
        assert_eq!(
            Value::Int(i64::MIN).div(&Value::Int(-1)),
            Value::error("Integer overflow in `/`")
        );
        assert_eq!(
            Value::Int(i64::MIN).negate(),
            Value::error("Integer overflow in `-`")
        );
    }

    #[test]
    fn test_prefix_operators() {
        assert_eq!(Value::Int(3).negate(), Value::Int(-3));
        assert_eq!(Value::Float(2.5).negate(), Value::Float(-2.5));
        assert_eq!(
            Value::Bool(true).negate(),
            Value::error("Invalid prefix `-` argument")
        );
        assert_eq!(Value::Bool(true).not(), Value::Bool(false));
        assert_eq!(Value::Int(1).not(), Value::error("Invalid prefix `!` argument"));
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2), "<"), Ok(Ordering::Less));
        assert_eq!(
            Value::Int(2).compare(&Value::Float(2.0), "=="),
            Ok(Ordering::Equal)
        );
        assert_eq!(
            Value::string("b").compare(&Value::string("a"), ">"),
            Ok(Ordering::Greater)
        );
        assert_eq!(
            Value::Bool(false).compare(&Value::Bool(true), "<"),
            Ok(Ordering::Less)
        );
        assert_eq!(
            Value::Int(1).compare(&Value::Nil, "<"),
            Err(Value::error("Can't compare Nil"))
        );
        assert_eq!(
            Value::error("x").compare(&Value::Int(1), "<"),
            Err(Value::error("Can't compare Error"))
        );
        assert_eq!(
            Value::Int(1).compare(&Value::string("1"), "=="),
            Err(Value::error("Invalid types for `==`"))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(5).to_string(), "5");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Float(-12.0).to_string(), "-12.0");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::string("hello").to_string(), "hello");
        assert_eq!(Value::Identifier("Sum".into()).to_string(), "Sum");
        assert_eq!(Value::Nil.to_string(), "");
        assert_eq!(
            Value::error("Can't divide by 0").to_string(),
            "Error: `Can't divide by 0`"
        );
        assert_eq!(
            range(vec![Value::Int(4), Value::Int(5), Value::Int(6)]).to_string(),
            "B2:B4 ( 4; 5; 6 )"
        );
    }

    #[test]
    fn test_default_is_nil() {
        assert_eq!(Value::default(), Value::Nil);
    }
}
