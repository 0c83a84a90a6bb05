use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::trace;

use crate::comparison::{add, arith, compare, loose_eq, negate, nesting_depth, truthy, type_name};
use crate::errors::{EvalError, Result};
use crate::expression::{self, BinaryOp, ENode, LogicalOp, Statement, UnaryOp};
use crate::functions::Registry;

/// Deepest array/object nesting a program may build.
pub const MAX_VALUE_DEPTH: usize = 128;

/// Result of evaluating code in a context.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Error(String),
    SyntaxError(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl From<Result<Value>> for Outcome {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(v) => Outcome::Success(v),
            Err(e) if e.is_syntax() => Outcome::SyntaxError(e.to_string()),
            Err(e) => Outcome::Error(e.to_string()),
        }
    }
}

/// Runs `code` against `bindings`.
///
/// The input is first tried as a single expression, so `{a: 1}` is an object
/// literal. When that does not parse, it is run as `;`-separated statements
/// and the value of the last one is returned.
pub fn run(bindings: &mut BTreeMap<String, Value>, functions: &Registry, code: &str) -> Outcome {
    let mut interp = Interpreter { bindings, functions };
    let result = match expression::parse_expr(code) {
        Ok(ast) => interp.eval(&ast),
        Err(e) if e.is_syntax() => {
            trace!(error = %e, "not an expression, retrying as statements");
            expression::parse_program(code).and_then(|program| interp.exec(&program))
        }
        Err(e) => Err(e),
    };
    result.into()
}

struct Interpreter<'a> {
    bindings: &'a mut BTreeMap<String, Value>,
    functions: &'a Registry,
}

impl Interpreter<'_> {
    fn exec(&mut self, program: &[Statement]) -> Result<Value> {
        let mut last = Value::Null;
        for statement in program {
            last = match statement {
                Statement::Declare { name, value } => {
                    let v = self.eval(value)?;
                    self.bindings.insert(name.clone(), v);
                    Value::Null
                }
                Statement::Expr(node) => self.eval(node)?,
            };
        }
        Ok(last)
    }

    fn eval(&mut self, node: &ENode) -> Result<Value> {
        match node {
            ENode::Literal(v) => Ok(v.clone()),
            ENode::Ident(name) => self.lookup(name),
            ENode::Array(items) => within_depth(Value::Array(
                items.iter().map(|n| self.eval(n)).collect::<Result<_>>()?,
            )),
            ENode::Object(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    let v = self.eval(value)?;
                    map.insert(key.clone(), v);
                }
                within_depth(Value::Object(map))
            }
            ENode::Member { target, name } => {
                let target = self.eval(target)?;
                member(&target, name)
            }
            ENode::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                element(&target, &index)
            }
            ENode::Call { callee, args } => self.call(callee, args),
            ENode::Unary { op, operand } => {
                let v = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => negate(&v),
                    UnaryOp::Not => Ok(Value::Bool(!truthy(&v))),
                }
            }
            ENode::Binary { op, lhs, rhs } => {
                let a = self.eval(lhs)?;
                let b = self.eval(rhs)?;
                binary(*op, &a, &b)
            }
            ENode::Logical { op, lhs, rhs } => {
                let a = self.eval(lhs)?;
                match (op, truthy(&a)) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(a),
                    _ => self.eval(rhs),
                }
            }
            ENode::Assign { name, value } => {
                let v = self.eval(value)?;
                self.bindings.insert(name.clone(), v.clone());
                Ok(v)
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value> {
        if let Some(v) = self.bindings.get(name) {
            return Ok(v.clone());
        }
        if self.functions.contains(name) {
            return Err(EvalError::Type(format!(
                "{name} is a builtin function and can only be called"
            )));
        }
        Err(EvalError::Reference(format!("{name} is not defined")))
    }

    fn call(&mut self, callee: &ENode, args: &[ENode]) -> Result<Value> {
        let ENode::Ident(name) = callee else {
            return Err(EvalError::Type("expression is not a function".into()));
        };
        if self.bindings.contains_key(name) {
            return Err(EvalError::Type(format!("{name} is not a function")));
        }
        let Some(function) = self.functions.get(name) else {
            return Err(EvalError::Reference(format!("{name} is not defined")));
        };
        let arity = function.arity();
        if !arity.contains(&args.len()) {
            let expected = if arity.start() == arity.end() {
                arity.start().to_string()
            } else if *arity.end() == usize::MAX {
                format!("at least {}", arity.start())
            } else {
                format!("{} to {}", arity.start(), arity.end())
            };
            return Err(EvalError::Type(format!(
                "{name} expects {expected} argument(s), got {}",
                args.len()
            )));
        }
        let values = args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>>>()?;
        function.call(&values)
    }
}

fn within_depth(value: Value) -> Result<Value> {
    if nesting_depth(&value) > MAX_VALUE_DEPTH {
        return Err(EvalError::Range(format!(
            "value nesting exceeds {MAX_VALUE_DEPTH} levels"
        )));
    }
    Ok(value)
}

fn binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    let ordered = |want: fn(Ordering) -> bool| -> Result<Value> {
        Ok(Value::Bool(compare(a, b).is_some_and(want)))
    };
    match op {
        BinaryOp::Add => add(a, b),
        BinaryOp::Sub => arith('-', a, b),
        BinaryOp::Mul => arith('*', a, b),
        BinaryOp::Div => arith('/', a, b),
        BinaryOp::Rem => arith('%', a, b),
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(a, b))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(a, b))),
        BinaryOp::Lt => ordered(Ordering::is_lt),
        BinaryOp::Le => ordered(Ordering::is_le),
        BinaryOp::Gt => ordered(Ordering::is_gt),
        BinaryOp::Ge => ordered(Ordering::is_ge),
    }
}

/// `target.name`; missing members are null.
pub fn member(target: &Value, name: &str) -> Result<Value> {
    match target {
        Value::Null => Err(EvalError::Type(format!(
            "Cannot read properties of null (reading '{name}')"
        ))),
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        Value::Array(items) if name == "length" => Ok(Value::from(items.len())),
        Value::String(s) if name == "length" => Ok(Value::from(s.chars().count())),
        _ => Ok(Value::Null),
    }
}

/// `target[index]`; out-of-range indices are null.
fn element(target: &Value, index: &Value) -> Result<Value> {
    match (target, index) {
        (Value::Null, _) => Err(EvalError::Type(format!(
            "Cannot read properties of null (reading '{}')",
            crate::comparison::to_display(index)
        ))),
        (Value::Array(items), Value::Number(n)) => Ok(n
            .as_u64()
            .and_then(|i| items.get(usize::try_from(i).ok()?))
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::String(s), Value::Number(n)) => Ok(n
            .as_u64()
            .and_then(|i| s.chars().nth(usize::try_from(i).ok()?))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null)),
        (Value::Object(map), Value::String(key)) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
        (Value::Object(map), Value::Number(n)) => Ok(map.get(&n.to_string()).cloned().unwrap_or(Value::Null)),
        (_, Value::String(key)) => member(target, key),
        (_, other) => Err(EvalError::Type(format!(
            "cannot index {} with {}",
            type_name(target),
            type_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn eval_fresh(code: &str) -> Outcome {
        run(&mut BTreeMap::new(), &Registry::with_builtins(), code)
    }

    #[test]
    fn object_literal_is_an_expression() {
        assert_eq!(eval_fresh("{a: 1}"), Outcome::Success(json!({"a": 1})));
    }

    #[test]
    fn statements_yield_last_value() {
        let mut bindings = BTreeMap::new();
        let out = run(&mut bindings, &Registry::with_builtins(), "let x = 2; let y = x * 5; y + 1");
        assert_eq!(out, Outcome::Success(json!(11)));
        assert_eq!(bindings["y"], json!(10));
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(eval_fresh("null || 'fallback'"), Outcome::Success(json!("fallback")));
        assert_eq!(eval_fresh("0 && missing"), Outcome::Success(json!(0)));
    }

    #[test]
    fn unknown_name_is_a_reference_error() {
        assert_eq!(
            eval_fresh("nope + 1"),
            Outcome::Error("ReferenceError: nope is not defined".into())
        );
    }

    #[test]
    fn incomplete_code_is_a_syntax_error() {
        assert!(matches!(eval_fresh("[1, 2"), Outcome::SyntaxError(_)));
    }

    #[test]
    fn builtin_arity_is_checked() {
        let Outcome::Error(msg) = eval_fresh("len(1, 2)") else {
            panic!("expected error");
        };
        assert_eq!(msg, "TypeError: len expects 1 argument(s), got 2");
    }

    #[test]
    fn members_and_indexing() {
        assert_eq!(eval_fresh("{a: [10, 20]}.a[1]"), Outcome::Success(json!(20)));
        assert_eq!(eval_fresh("'abc'.length"), Outcome::Success(json!(3)));
        assert_eq!(eval_fresh("[1][5]"), Outcome::Success(Value::Null));
        assert!(matches!(eval_fresh("null.a"), Outcome::Error(_)));
    }

    #[test]
    fn long_chains_are_syntax_errors() {
        let sum = format!("1{}", "+1".repeat(100_000));
        assert!(matches!(eval_fresh(&sum), Outcome::SyntaxError(_)));
        let path = format!("x = {{}}; x{}", ".a".repeat(50_000));
        assert!(matches!(eval_fresh(&path), Outcome::SyntaxError(_)));
    }

    #[test]
    fn values_cannot_nest_without_bound() {
        let mut bindings = BTreeMap::new();
        let code = format!("a = []{}", "; a = [a]".repeat(50_000));
        let Outcome::Error(msg) = run(&mut bindings, &Registry::with_builtins(), &code) else {
            panic!("expected a range error");
        };
        assert!(msg.starts_with("RangeError"), "{msg}");
        assert_eq!(nesting_depth(&bindings["a"]), MAX_VALUE_DEPTH);
    }

    #[test]
    fn nesting_below_the_cap_is_fine() {
        let code = format!("a = {{}}{}; a", "; a = {k: a}".repeat(MAX_VALUE_DEPTH - 1));
        let Outcome::Success(v) = eval_fresh(&code) else {
            panic!("expected success");
        };
        assert_eq!(nesting_depth(&v), MAX_VALUE_DEPTH);
    }

    #[test]
    fn empty_input_is_null() {
        assert_eq!(eval_fresh("   "), Outcome::Success(Value::Null));
    }
}
