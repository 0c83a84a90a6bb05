use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use crate::errors::Result;

/// Trait for builtin functions callable from evaluated code.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn arity(&self) -> std::ops::RangeInclusive<usize>;
    fn call(&self, args: &[Value]) -> Result<Value>;
}

/// Thread-safe function registry. Cloning shares the table.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<BTreeMap<&'static str, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(builtins::Lower);
        reg.register(builtins::Upper);
        reg.register(builtins::Len);
        reg.register(builtins::Keys);
        reg.register(builtins::Values);
        reg.register(builtins::First);
        reg.register(builtins::Unique);
        reg.register(builtins::Str);
        reg.register(builtins::Num);
        reg.register(builtins::TypeOf);
        reg.register(builtins::Json);
        reg.register(builtins::ParseJson);
        reg.register(builtins::Rounding::ABS);
        reg.register(builtins::Rounding::FLOOR);
        reg.register(builtins::Rounding::CEIL);
        reg.register(builtins::Rounding::ROUND);
        reg.register(builtins::Extremum::MIN);
        reg.register(builtins::Extremum::MAX);
        reg
    }

    pub fn register<F: Function + 'static>(&mut self, f: F) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Function names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.inner.keys().copied()
    }
}

pub mod builtins {
    use super::*;
    use crate::comparison::{compare, to_display, type_name};
    use crate::errors::EvalError;
    use itertools::Itertools;
    use serde_json::{Number, Value};
    use std::cmp::Ordering;

    fn arg(args: &[Value], i: usize) -> &Value {
        args.get(i).unwrap_or(&Value::Null)
    }

    fn number_arg(name: &str, v: &Value) -> Result<f64> {
        v.as_f64().ok_or_else(|| {
            EvalError::Type(format!("{name} expects a number, got {}", type_name(v)))
        })
    }

    fn from_f64(f: f64) -> Result<Value> {
        // whole floats fold back to integers so `floor(2.5)` prints as `2`
        if f.fract() == 0.0 && f.abs() < 9.0e15 {
            return Ok(Value::from(f as i64));
        }
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| EvalError::Range(format!("result {f} is not a finite number")))
    }

    pub struct Lower;
    impl Function for Lower {
        fn name(&self) -> &'static str { "lower" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(match arg(args, 0) {
                Value::String(t) => Value::String(t.to_lowercase()),
                other => other.clone(),
            })
        }
    }

    pub struct Upper;
    impl Function for Upper {
        fn name(&self) -> &'static str { "upper" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(match arg(args, 0) {
                Value::String(t) => Value::String(t.to_uppercase()),
                other => other.clone(),
            })
        }
    }

    pub struct Len;
    impl Function for Len {
        fn name(&self) -> &'static str { "len" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            match arg(args, 0) {
                Value::String(s) => Ok(Value::from(s.chars().count())),
                Value::Array(a) => Ok(Value::from(a.len())),
                Value::Object(m) => Ok(Value::from(m.len())),
                other => Err(EvalError::Type(format!("len of {} is undefined", type_name(other)))),
            }
        }
    }

    pub struct Keys;
    impl Function for Keys {
        fn name(&self) -> &'static str { "keys" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            match arg(args, 0) {
                Value::Object(m) => Ok(Value::Array(m.keys().cloned().map(Value::String).collect())),
                Value::Array(a) => Ok(Value::Array((0..a.len()).map(Value::from).collect())),
                other => Err(EvalError::Type(format!("keys of {} is undefined", type_name(other)))),
            }
        }
    }

    pub struct Values;
    impl Function for Values {
        fn name(&self) -> &'static str { "values" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            match arg(args, 0) {
                Value::Object(m) => Ok(Value::Array(m.values().cloned().collect())),
                Value::Array(a) => Ok(Value::Array(a.clone())),
                other => Err(EvalError::Type(format!("values of {} is undefined", type_name(other)))),
            }
        }
    }

    /// First element of an array; null otherwise.
    pub struct First;
    impl Function for First {
        fn name(&self) -> &'static str { "first" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(match arg(args, 0) {
                Value::Array(a) => a.first().cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            })
        }
    }

    /// Deduplicates an array, keeping first occurrences; identity for non-arrays.
    pub struct Unique;
    impl Function for Unique {
        fn name(&self) -> &'static str { "unique" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(match arg(args, 0) {
                Value::Array(a) => Value::Array(
                    a.iter()
                        .cloned()
                        .unique_by(|x| serde_json::to_string(x).unwrap_or_default())
                        .collect(),
                ),
                other => other.clone(),
            })
        }
    }

    pub struct Str;
    impl Function for Str {
        fn name(&self) -> &'static str { "str" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(to_display(arg(args, 0))))
        }
    }

    pub struct Num;
    impl Function for Num {
        fn name(&self) -> &'static str { "num" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            match arg(args, 0) {
                Value::Number(n) => Ok(Value::Number(n.clone())),
                Value::Bool(b) => Ok(Value::from(u8::from(*b))),
                Value::String(s) => {
                    let s = s.trim();
                    if let Ok(i) = s.parse::<i64>() {
                        return Ok(Value::from(i));
                    }
                    let f: f64 = s
                        .parse()
                        .map_err(|_| EvalError::Type(format!("cannot convert {s:?} to a number")))?;
                    from_f64(f)
                }
                other => Err(EvalError::Type(format!("cannot convert {} to a number", type_name(other)))),
            }
        }
    }

    pub struct TypeOf;
    impl Function for TypeOf {
        fn name(&self) -> &'static str { "type" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(type_name(arg(args, 0)).to_string()))
        }
    }

    pub struct Json;
    impl Function for Json {
        fn name(&self) -> &'static str { "json" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(arg(args, 0).to_string()))
        }
    }

    pub struct ParseJson;
    impl Function for ParseJson {
        fn name(&self) -> &'static str { "parse_json" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let Value::String(s) = arg(args, 0) else {
                return Err(EvalError::Type("parse_json expects a string".into()));
            };
            serde_json::from_str(s).map_err(|e| EvalError::Syntax(format!("invalid JSON: {e}")))
        }
    }

    /// One-argument numeric rounding functions.
    pub struct Rounding {
        name: &'static str,
        op: fn(f64) -> f64,
    }

    impl Rounding {
        pub const ABS: Self = Self { name: "abs", op: f64::abs };
        pub const FLOOR: Self = Self { name: "floor", op: f64::floor };
        pub const CEIL: Self = Self { name: "ceil", op: f64::ceil };
        pub const ROUND: Self = Self { name: "round", op: f64::round };
    }

    impl Function for Rounding {
        fn name(&self) -> &'static str { self.name }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let v = arg(args, 0);
            if let Some(i) = v.as_i64() {
                return Ok(Value::from(if self.name == "abs" { i.saturating_abs() } else { i }));
            }
            from_f64((self.op)(number_arg(self.name, v)?))
        }
    }

    /// `min`/`max` over arguments, or over a single array argument.
    pub struct Extremum {
        name: &'static str,
        keep: Ordering,
    }

    impl Extremum {
        pub const MIN: Self = Self { name: "min", keep: Ordering::Less };
        pub const MAX: Self = Self { name: "max", keep: Ordering::Greater };
    }

    impl Function for Extremum {
        fn name(&self) -> &'static str { self.name }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=usize::MAX }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let items = match args {
                [Value::Array(a)] => a.as_slice(),
                _ => args,
            };
            let mut best: Option<&Value> = None;
            for item in items {
                number_arg(self.name, item)?;
                best = match best {
                    Some(b) if compare(item, b) != Some(self.keep) => Some(b),
                    _ => Some(item),
                };
            }
            Ok(best.cloned().unwrap_or(Value::Null))
        }
    }
}
