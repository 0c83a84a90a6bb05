// src/parser.rs
use serde_json::Value;

use crate::errors::EvalError;

/// Character cursor shared by the statement and expression parsers.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Syntax error at the current position. Reaching the end of input is
    /// reported as such, so clients can tell incomplete code from bad code.
    pub fn error(&self, what: &str) -> EvalError {
        match self.peek_char() {
            None => EvalError::Syntax(format!("Unexpected end of input ({what})")),
            Some(c) => EvalError::Syntax(format!(
                "Unexpected token '{c}' at offset {} ({what})",
                self.i
            )),
        }
    }

    pub fn parse_identifier(&mut self) -> Result<String, EvalError> {
        let start = self.i;
        match self.peek_char() {
            Some(c) if is_ident_start(c) => self.i += c.len_utf8(),
            _ => return Err(self.error("identifier expected")),
        }
        while let Some(c) = self.peek_char() {
            if is_ident_char(c) {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
        Ok(self.s[start..self.i].to_string())
    }

    /// Unsigned number literal; integers that fit in i64 stay integers.
    pub fn parse_number_literal(&mut self) -> Result<Value, EvalError> {
        let start = self.i;
        self.skip_digits();
        if self.peek_char() == Some('.') && self.s[self.i + 1..].starts_with(|c: char| c.is_ascii_digit()) {
            self.i += 1;
            self.skip_digits();
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let mark = self.i;
            self.i += 1;
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.i += 1;
            }
            if self.skip_digits() == 0 {
                self.i = mark;
            }
        }
        let s = &self.s[start..self.i];
        if s.is_empty() {
            return Err(self.error("number expected"));
        }
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Value::from(i));
        }
        let f: f64 = s
            .parse()
            .map_err(|_| EvalError::Syntax(format!("Invalid number literal '{s}'")))?;
        Ok(Value::from(f))
    }

    pub fn parse_quoted_string(&mut self) -> Result<String, EvalError> {
        let quote = match self.peek_char() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected quoted string")),
        };
        self.i += 1;
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                if let Some(nc) = self.peek_char() {
                    self.i += nc.len_utf8();
                    match nc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\\' => out.push('\\'),
                        '"' => out.push('"'),
                        '\'' => out.push('\''),
                        _ => out.push(nc),
                    }
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        Err(EvalError::Syntax("Unexpected end of input (unterminated string)".into()))
    }

    pub fn expect(&mut self, c: char) -> Result<(), EvalError> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn consume_str(&mut self, lit: &str) -> bool {
        if self.peek_str(lit) {
            self.i += lit.len();
            true
        } else {
            false
        }
    }

    /// Consumes `word` only when it is not the start of a longer identifier.
    pub fn consume_keyword(&mut self, word: &str) -> bool {
        if !self.peek_str(word) {
            return false;
        }
        let rest = &self.s[self.i + word.len()..];
        if rest.starts_with(is_ident_char) {
            return false;
        }
        self.i += word.len();
        true
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    fn skip_digits(&mut self) -> usize {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
        self.i - start
    }
}

pub fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

pub fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}
