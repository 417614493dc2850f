//! Math functions

use std::cmp::Ordering;

use tabula_core::Value;

/// Pi() - The constant π as a float
pub fn fn_pi(_args: &[Value]) -> Value {
    Value::Float(std::f64::consts::PI)
}

/// Sqrt(number) - Square root, always a float
pub fn fn_sqrt(args: &[Value]) -> Value {
    let [value] = args else {
        return wrong_arity("Sqrt", args);
    };
    match value.as_number() {
        Some(n) if n < 0.0 => Value::error("Can't take square root of negative number"),
        Some(n) => Value::Float(n.sqrt()),
        None => wrong_type("Sqrt", value),
    }
}

/// Abs(number) - Absolute value, keeping int/float
pub fn fn_abs(args: &[Value]) -> Value {
    let [value] = args else {
        return wrong_arity("Abs", args);
    };
    match value {
        Value::Int(i) => match i.checked_abs() {
            Some(n) => Value::Int(n),
            None => Value::error("Integer overflow in `Abs`"),
        },
        Value::Float(f) => Value::Float(f.abs()),
        other => wrong_type("Abs", other),
    }
}

/// Sum(values...) - Folds left to right
///
/// Ints accumulate as an int until the first float, after which the total is
/// a float. Cell ranges are summed recursively with the same rule and
/// non-numeric values are skipped.
pub fn fn_sum(args: &[Value]) -> Value {
    let mut total = Value::Int(0);

    for arg in args {
        let term = match arg {
            Value::Int(_) | Value::Float(_) => arg.clone(),
            Value::CellRange { values, .. } => fn_sum(values),
            _ => continue,
        };
        if !term.is_numeric() {
            // Propagate overflow from a nested range
            return term;
        }
        total = match (&total, &term) {
            (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
                Some(n) => Value::Int(n),
                None => return Value::error("Integer overflow in `Sum`"),
            },
            _ => {
                let a = total.as_number().unwrap_or_default();
                let b = term.as_number().unwrap_or_default();
                Value::Float(a + b)
            }
        };
    }

    total
}

/// Min(values...) - Smallest numeric value
pub fn fn_min(args: &[Value]) -> Value {
    extreme("Min", args, Ordering::Less)
}

/// Max(values...) - Largest numeric value
pub fn fn_max(args: &[Value]) -> Value {
    extreme("Max", args, Ordering::Greater)
}

/// Average(values...) - Mean of the numeric values, always a float
pub fn fn_average(args: &[Value]) -> Value {
    let numbers = numeric_values(args);
    if numbers.is_empty() {
        return no_numbers("Average");
    }
    let sum: f64 = numbers.iter().filter_map(Value::as_number).sum();
    Value::Float(sum / numbers.len() as f64)
}

fn extreme(name: &str, args: &[Value], wanted: Ordering) -> Value {
    let numbers = numeric_values(args);

    if numbers.iter().all(|v| matches!(v, Value::Int(_))) {
        let best = numbers
            .iter()
            .filter_map(|v| match v {
                Value::Int(i) => Some(*i),
                _ => None,
            })
            .reduce(|best, n| if n.cmp(&best) == wanted { n } else { best });
        return best.map(Value::Int).unwrap_or_else(|| no_numbers(name));
    }

    let best = numbers
        .iter()
        .filter_map(Value::as_number)
        .reduce(|best, n| if n.partial_cmp(&best) == Some(wanted) { n } else { best });
    best.map(Value::Float).unwrap_or_else(|| no_numbers(name))
}

/// Flatten cell ranges and keep only ints and floats, in order
fn numeric_values(args: &[Value]) -> Vec<Value> {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            Value::Int(_) | Value::Float(_) => numbers.push(arg.clone()),
            Value::CellRange { values, .. } => numbers.extend(numeric_values(values)),
            _ => {}
        }
    }
    numbers
}

fn wrong_type(name: &str, got: &Value) -> Value {
    Value::error(format!(
        "Wrong type in function: `{}` wants: `int/float` got: `{}`",
        name, got
    ))
}

fn wrong_arity(name: &str, args: &[Value]) -> Value {
    Value::error(format!(
        "Function: `{}` takes: 1 arguments, got: {}",
        name,
        args.len()
    ))
}

fn no_numbers(name: &str) -> Value {
    Value::error(format!("Function: `{}` got no numeric arguments", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(values: Vec<Value>) -> Value {
        Value::CellRange {
            range: "A1:A3".into(),
            values,
        }
    }

    #[test]
    fn test_pi() {
        assert_eq!(fn_pi(&[]), Value::Float(std::f64::consts::PI));
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(fn_sqrt(&[Value::Int(9)]), Value::Float(3.0));
        assert_eq!(fn_sqrt(&[Value::Float(2.25)]), Value::Float(1.5));
        assert_eq!(
            fn_sqrt(&[Value::Int(-4)]),
            Value::error("Can't take square root of negative number")
        );
        assert_eq!(
            fn_sqrt(&[Value::string("x")]),
            Value::error("Wrong type in function: `Sqrt` wants: `int/float` got: `x`")
        );
        assert!(fn_sqrt(&[Value::Nil]).is_error());
    }

    #[test]
    fn test_single_argument_functions_check_arity() {
        assert_eq!(
            fn_sqrt(&[]),
            Value::error("Function: `Sqrt` takes: 1 arguments, got: 0")
        );
        assert_eq!(
            fn_abs(&[Value::Int(1), Value::Int(2)]),
            Value::error("Function: `Abs` takes: 1 arguments, got: 2")
        );
    }

    #[test]
    fn test_abs() {
        assert_eq!(fn_abs(&[Value::Int(-3)]), Value::Int(3));
        assert_eq!(fn_abs(&[Value::Float(-2.5)]), Value::Float(2.5));
        assert!(fn_abs(&[Value::Bool(true)]).is_error());
        assert!(fn_abs(&[Value::Int(i64::MIN)]).is_error());
    }

    #[test]
    fn test_sum_stays_int() {
        assert_eq!(
            fn_sum(&[Value::Int(1), Value::Int(2), Value::Int(3)]),
            Value::Int(6)
        );
    }

    #[test]
    fn test_sum_promotes_to_float() {
        assert_eq!(
            fn_sum(&[Value::Int(1), Value::Float(0.5), Value::Int(2)]),
            Value::Float(3.5)
        );
        assert_eq!(
            fn_sum(&[Value::Int(1), range(vec![Value::Int(1), Value::Float(1.5)])]),
            Value::Float(3.5)
        );
    }

    #[test]
    fn test_sum_skips_non_numeric() {
        assert_eq!(
            fn_sum(&[
                Value::Int(1),
                Value::string("x"),
                Value::Nil,
                Value::error("boom"),
                Value::Bool(true),
                range(vec![Value::Int(2), Value::Nil, Value::Int(3)]),
            ]),
            Value::Int(6)
        );
    }

    #[test]
    fn test_sum_overflow() {
        assert_eq!(
            fn_sum(&[Value::Int(i64::MAX), Value::Int(1)]),
            Value::error("Integer overflow in `Sum`")
        );
        assert_eq!(
            fn_sum(&[range(vec![Value::Int(i64::MAX), Value::Int(1)])]),
            Value::error("Integer overflow in `Sum`")
        );
    }

    #[test]
    fn test_min_max() {
        let args = [
            Value::Int(4),
            range(vec![Value::Int(-2), Value::Nil, Value::Int(9)]),
            Value::string("skip"),
        ];
        assert_eq!(fn_min(&args), Value::Int(-2));
        assert_eq!(fn_max(&args), Value::Int(9));
        assert_eq!(
            fn_max(&[Value::Int(1), Value::Float(0.5)]),
            Value::Float(1.0)
        );
        assert_eq!(
            fn_min(&[Value::Nil]),
            Value::error("Function: `Min` got no numeric arguments")
        );
    }

    #[test]
    fn test_average() {
        assert_eq!(
            fn_average(&[Value::Int(1), Value::Int(2)]),
            Value::Float(1.5)
        );
        assert_eq!(
            fn_average(&[range(vec![Value::Int(3), Value::string("x"), Value::Float(6.0)])]),
            Value::Float(4.5)
        );
        assert_eq!(
            fn_average(&[Value::string("x")]),
            Value::error("Function: `Average` got no numeric arguments")
        );
    }
}
