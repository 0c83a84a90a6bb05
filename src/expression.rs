// src/expression.rs
use serde_json::Value;

use crate::errors::{EvalError, Result};
use crate::parser::Parser;

/// Deepest nesting accepted before parsing gives up. Every bracket, unary
/// operator and every operator or accessor in a chain counts as one level.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ENode {
    Literal(Value),
    Ident(String),
    Array(Vec<ENode>),
    Object(Vec<(String, ENode)>),
    Member { target: Box<ENode>, name: String },
    Index { target: Box<ENode>, index: Box<ENode> },
    Call { callee: Box<ENode>, args: Vec<ENode> },
    Unary { op: UnaryOp, operand: Box<ENode> },
    Binary { op: BinaryOp, lhs: Box<ENode>, rhs: Box<ENode> },
    Logical { op: LogicalOp, lhs: Box<ENode>, rhs: Box<ENode> },
    Assign { name: String, value: Box<ENode> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Declare { name: String, value: ENode },
    Expr(ENode),
}

/// Parses `input` as exactly one expression.
pub fn parse_expr(input: &str) -> Result<ENode> {
    let mut p = EParser::new(input);
    let node = p.parse_node()?;
    p.skip_ws();
    if !p.eof() {
        return Err(p.parser.error("trailing input"));
    }
    Ok(node)
}

/// Parses `input` as `;`-separated statements. Empty statements are skipped.
pub fn parse_program(input: &str) -> Result<Vec<Statement>> {
    let mut p = EParser::new(input);
    let mut out = Vec::new();
    loop {
        p.skip_ws();
        while p.parser.consume_char(';') {
            p.skip_ws();
        }
        if p.eof() {
            return Ok(out);
        }
        out.push(p.parse_statement()?);
        p.skip_ws();
        if !p.eof() && !p.parser.consume_char(';') {
            return Err(p.parser.error("expected ';'"));
        }
    }
}

struct EParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> EParser<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            parser: Parser::new(s),
            depth: 0,
        }
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        for keyword in ["let", "var", "const"] {
            if self.parser.consume_keyword(keyword) {
                self.skip_ws();
                let name = self.parser.parse_identifier()?;
                self.skip_ws();
                let value = if self.parser.consume_char('=') {
                    self.parse_node()?
                } else {
                    ENode::Literal(Value::Null)
                };
                return Ok(Statement::Declare { name, value });
            }
        }
        Ok(Statement::Expr(self.parse_node()?))
    }

    fn parse_node(&mut self) -> Result<ENode> {
        self.enter()?;
        let node = self.parse_assignment();
        self.depth -= 1;
        node
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::Syntax("expression nested too deeply".into()));
        }
        Ok(())
    }

    fn parse_assignment(&mut self) -> Result<ENode> {
        let lhs = self.parse_or()?;
        self.skip_ws();
        if self.parser.peek_char() == Some('=') && !self.parser.peek_str("==") {
            self.parser.expect('=')?;
            let ENode::Ident(name) = lhs else {
                return Err(EvalError::Syntax("Invalid left-hand side in assignment".into()));
            };
            let value = self.parse_node()?;
            return Ok(ENode::Assign {
                name,
                value: Box::new(value),
            });
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<ENode> {
        let mark = self.depth;
        let mut lhs = self.parse_and()?;
        loop {
            self.skip_ws();
            if !self.parser.consume_str("||") {
                break;
            }
            self.enter()?;
            let rhs = self.parse_and()?;
            lhs = logical(LogicalOp::Or, lhs, rhs);
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<ENode> {
        let mark = self.depth;
        let mut lhs = self.parse_equality()?;
        loop {
            self.skip_ws();
            if !self.parser.consume_str("&&") {
                break;
            }
            self.enter()?;
            let rhs = self.parse_equality()?;
            lhs = logical(LogicalOp::And, lhs, rhs);
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<ENode> {
        let mark = self.depth;
        let mut lhs = self.parse_comparison()?;
        loop {
            self.skip_ws();
            let op = if self.parser.consume_str("===") || self.parser.consume_str("==") {
                BinaryOp::Eq
            } else if self.parser.consume_str("!==") || self.parser.consume_str("!=") {
                BinaryOp::Ne
            } else {
                break;
            };
            self.enter()?;
            let rhs = self.parse_comparison()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<ENode> {
        let mark = self.depth;
        let mut lhs = self.parse_additive()?;
        loop {
            self.skip_ws();
            let op = if self.parser.consume_str("<=") {
                BinaryOp::Le
            } else if self.parser.consume_str(">=") {
                BinaryOp::Ge
            } else if self.parser.consume_char('<') {
                BinaryOp::Lt
            } else if self.parser.consume_char('>') {
                BinaryOp::Gt
            } else {
                break;
            };
            self.enter()?;
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<ENode> {
        let mark = self.depth;
        let mut lhs = self.parse_multiplicative()?;
        loop {
            self.skip_ws();
            let op = if self.parser.consume_char('+') {
                BinaryOp::Add
            } else if self.parser.consume_char('-') {
                BinaryOp::Sub
            } else {
                break;
            };
            self.enter()?;
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<ENode> {
        let mark = self.depth;
        let mut lhs = self.parse_unary()?;
        loop {
            self.skip_ws();
            let op = if self.parser.consume_char('*') {
                BinaryOp::Mul
            } else if self.parser.consume_char('/') {
                BinaryOp::Div
            } else if self.parser.consume_char('%') {
                BinaryOp::Rem
            } else {
                break;
            };
            self.enter()?;
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ENode> {
        self.skip_ws();
        let op = if self.parser.peek_str("!=") {
            None
        } else if self.parser.consume_char('!') {
            Some(UnaryOp::Not)
        } else if self.parser.consume_char('-') {
            Some(UnaryOp::Neg)
        } else {
            None
        };
        match op {
            Some(op) => {
                self.enter()?;
                let operand = self.parse_unary();
                self.depth -= 1;
                Ok(ENode::Unary {
                    op,
                    operand: Box::new(operand?),
                })
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<ENode> {
        let mark = self.depth;
        let mut node = self.parse_primary()?;
        loop {
            self.skip_ws();
            if self.parser.peek_char().is_some_and(|c| matches!(c, '.' | '[' | '(')) {
                self.enter()?;
            }
            if self.parser.consume_char('.') {
                self.skip_ws();
                let name = self.parser.parse_identifier()?;
                node = ENode::Member {
                    target: Box::new(node),
                    name,
                };
            } else if self.parser.consume_char('[') {
                let index = self.parse_node()?;
                self.skip_ws();
                self.parser.expect(']')?;
                node = ENode::Index {
                    target: Box::new(node),
                    index: Box::new(index),
                };
            } else if self.parser.consume_char('(') {
                let args = self.parse_list(')')?;
                node = ENode::Call {
                    callee: Box::new(node),
                    args,
                };
            } else {
                break;
            }
        }
        self.depth = mark;
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<ENode> {
        self.skip_ws();
        match self.parser.peek_char() {
            Some('"' | '\'') => Ok(ENode::Literal(Value::String(self.parser.parse_quoted_string()?))),
            Some(c) if c.is_ascii_digit() => Ok(ENode::Literal(self.parser.parse_number_literal()?)),
            Some('(') => {
                self.parser.expect('(')?;
                let node = self.parse_node()?;
                self.skip_ws();
                self.parser.expect(')')?;
                Ok(node)
            }
            Some('[') => {
                self.parser.expect('[')?;
                Ok(ENode::Array(self.parse_list(']')?))
            }
            Some('{') => {
                self.parser.expect('{')?;
                self.parse_object()
            }
            _ => {
                let name = self.parser.parse_identifier()?;
                Ok(match name.as_str() {
                    "true" => ENode::Literal(Value::Bool(true)),
                    "false" => ENode::Literal(Value::Bool(false)),
                    "null" | "undefined" => ENode::Literal(Value::Null),
                    _ => ENode::Ident(name),
                })
            }
        }
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn parse_list(&mut self, close: char) -> Result<Vec<ENode>> {
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            if self.parser.consume_char(close) {
                return Ok(out);
            }
            out.push(self.parse_node()?);
            self.skip_ws();
            if self.parser.consume_char(',') {
                continue;
            }
            self.parser.expect(close)?;
            return Ok(out);
        }
    }

    fn parse_object(&mut self) -> Result<ENode> {
        let mut fields = Vec::new();
        loop {
            self.skip_ws();
            if self.parser.consume_char('}') {
                return Ok(ENode::Object(fields));
            }
            let key = match self.parser.peek_char() {
                Some('"' | '\'') => self.parser.parse_quoted_string()?,
                _ => self.parser.parse_identifier()?,
            };
            self.skip_ws();
            self.parser.expect(':')?;
            let value = self.parse_node()?;
            fields.push((key, value));
            self.skip_ws();
            if self.parser.consume_char(',') {
                continue;
            }
            self.parser.expect('}')?;
            return Ok(ENode::Object(fields));
        }
    }

    fn skip_ws(&mut self) {
        self.parser.skip_ws();
    }

    fn eof(&self) -> bool {
        self.parser.eof()
    }
}

fn binary(op: BinaryOp, lhs: ENode, rhs: ENode) -> ENode {
    ENode::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn logical(op: LogicalOp, lhs: ENode, rhs: ENode) -> ENode {
    ENode::Logical {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let ast = parse_expr("1 + 2 * 3").unwrap();
        assert_eq!(
            ast,
            binary(
                BinaryOp::Add,
                ENode::Literal(json!(1)),
                binary(BinaryOp::Mul, ENode::Literal(json!(2)), ENode::Literal(json!(3))),
            )
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        let ast = parse_expr("a = b = 1").unwrap();
        let ENode::Assign { name, value } = ast else {
            panic!("expected assignment");
        };
        assert_eq!(name, "a");
        assert!(matches!(*value, ENode::Assign { .. }));
    }

    #[test]
    fn assignment_needs_identifier_target() {
        let err = parse_expr("a.b = 1").unwrap_err();
        assert!(err.to_string().contains("left-hand side"));
    }

    #[test]
    fn declarations_only_parse_as_statements() {
        assert!(parse_expr("let x = 1").is_err());
        let program = parse_program("let x = 1; x").unwrap();
        assert_eq!(program.len(), 2);
        assert!(matches!(&program[0], Statement::Declare { name, .. } if name == "x"));
    }

    #[test]
    fn object_literals_accept_quoted_keys() {
        let ast = parse_expr("{a: 1, 'b c': [2, 3,]}").unwrap();
        let ENode::Object(fields) = ast else {
            panic!("expected object");
        };
        assert_eq!(fields[1].0, "b c");
    }

    #[test]
    fn incomplete_input_mentions_end_of_input() {
        let err = parse_expr("(1 +").unwrap_err();
        assert!(err.is_syntax());
        assert!(err.to_string().contains("end of input"), "{err}");
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let src = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(parse_expr(&src).is_err());
    }

    #[test]
    fn long_operator_chains_count_as_nesting() {
        let sum = format!("1{}", "+1".repeat(100_000));
        let err = parse_expr(&sum).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"), "{err}");

        let path = format!("x{}", ".a".repeat(50_000));
        assert!(parse_expr(&path).unwrap_err().is_syntax());

        let calls = format!("f{}", "()".repeat(50_000));
        assert!(parse_expr(&calls).is_err());
    }

    #[test]
    fn chains_within_the_limit_still_parse() {
        let sum = format!("1{}", "+1".repeat(MAX_DEPTH - 10));
        assert!(parse_expr(&sum).is_ok());
        // sibling chains do not add up
        let pair = format!("[{0}, {0}]", format!("x{}", ".a".repeat(60)));
        assert!(parse_expr(&pair).is_ok());
    }
}
