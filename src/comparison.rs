use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::errors::{EvalError, Result};

/// `null`, `false`, `0`, `NaN` and `""` are falsy; everything else is truthy.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Structural equality where `1` and `1.0` are the same number.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => match (na.as_i64(), nb.as_i64()) {
            (Some(ia), Some(ib)) => ia == ib,
            _ => na.as_f64() == nb.as_f64(),
        },
        (Value::Array(xa), Value::Array(xb)) => {
            xa.len() == xb.len() && xa.iter().zip(xb).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(ma), Value::Object(mb)) => {
            ma.len() == mb.len()
                && ma
                    .iter()
                    .all(|(k, v)| mb.get(k).is_some_and(|w| loose_eq(v, w)))
        }
        _ => a == b,
    }
}

/// Ordering for relational operators. Numbers compare numerically, strings
/// lexically, a number against a numeric string numerically. Anything else
/// is unordered and every relational operator yields `false`.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(sa), Value::String(sb)) => Some(sa.cmp(sb)),
        (Value::Number(na), Value::Number(nb)) => match (na.as_i64(), nb.as_i64()) {
            (Some(ia), Some(ib)) => Some(ia.cmp(&ib)),
            _ => na.as_f64()?.partial_cmp(&nb.as_f64()?),
        },
        (Value::Bool(ba), Value::Bool(bb)) => Some(ba.cmp(bb)),
        (Value::Number(na), Value::String(sb)) => na.as_f64()?.partial_cmp(&sb.trim().parse::<f64>().ok()?),
        (Value::String(sa), Value::Number(nb)) => sa.trim().parse::<f64>().ok()?.partial_cmp(&nb.as_f64()?),
        _ => None,
    }
}

/// Text used when a value is concatenated onto a string.
pub fn to_display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

pub fn add(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            Ok(Value::String(format!("{}{}", to_display(a), to_display(b))))
        }
        (Value::Number(na), Value::Number(nb)) => {
            numeric(na, nb, i64::checked_add, |x, y| x + y)
        }
        _ => Err(type_mismatch("+", a, b)),
    }
}

pub fn arith(op: char, a: &Value, b: &Value) -> Result<Value> {
    let (Value::Number(na), Value::Number(nb)) = (a, b) else {
        return Err(type_mismatch(&op.to_string(), a, b));
    };
    match op {
        '-' => numeric(na, nb, i64::checked_sub, |x, y| x - y),
        '*' => numeric(na, nb, i64::checked_mul, |x, y| x * y),
        '/' | '%' => {
            if nb.as_f64() == Some(0.0) {
                return Err(EvalError::Range("division by zero".into()));
            }
            if op == '/' {
                // exact integer quotients stay integers
                match (na.as_i64(), nb.as_i64()) {
                    (Some(x), Some(y)) if x.checked_rem(y) == Some(0) => {
                        numeric(na, nb, i64::checked_div, |x, y| x / y)
                    }
                    _ => float(na.as_f64().unwrap_or(f64::NAN) / nb.as_f64().unwrap_or(f64::NAN)),
                }
            } else {
                numeric(na, nb, i64::checked_rem, |x, y| x % y)
            }
        }
        _ => Err(EvalError::Syntax(format!("unknown operator '{op}'"))),
    }
}

pub fn negate(v: &Value) -> Result<Value> {
    match v {
        Value::Number(n) => match n.as_i64().and_then(i64::checked_neg) {
            Some(i) => Ok(Value::from(i)),
            None => float(-n.as_f64().unwrap_or(f64::NAN)),
        },
        other => Err(EvalError::Type(format!(
            "cannot negate a value of type {}",
            type_name(other)
        ))),
    }
}

pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Levels of arrays and objects in `v`; scalars are 0.
pub fn nesting_depth(v: &Value) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(v, 0)];
    while let Some((v, depth)) = pending.pop() {
        match v {
            Value::Array(items) => {
                deepest = deepest.max(depth + 1);
                pending.extend(items.iter().map(|item| (item, depth + 1)));
            }
            Value::Object(map) => {
                deepest = deepest.max(depth + 1);
                pending.extend(map.values().map(|item| (item, depth + 1)));
            }
            _ => {}
        }
    }
    deepest
}

fn numeric(
    a: &Number,
    b: &Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(r) = int_op(x, y) {
            return Ok(Value::from(r));
        }
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => float(float_op(x, y)),
        _ => Err(EvalError::Range("numeric operand out of range".into())),
    }
}

fn float(f: f64) -> Result<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| EvalError::Range(format!("result {f} is not a finite number")))
}

fn type_mismatch(op: &str, a: &Value, b: &Value) -> EvalError {
    EvalError::Type(format!(
        "unsupported operand types for {op}: {} and {}",
        type_name(a),
        type_name(b)
    ))
}
