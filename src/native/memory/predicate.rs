// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Evaluator for the filter grammar, used by the in-memory engine.
//!
//! Parses once into a small tree, then evaluates per record.

use super::Value;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Operand {
    Field(String),
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum TextOp {
    Prefix,
    Suffix,
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Predicate {
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    Compare(Operand, CmpOp, Operand),
    IsNull(Operand, bool),
    Text(Operand, TextOp, Operand),
    Truthy(Operand),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Cmp(CmpOp),
    Ident(String),
    Str(String),
    Number(f64),
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Cmp(CmpOp::Ne));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Cmp(CmpOp::Eq));
                i += 2;
            }
            '>' | '<' => {
                let op = match (c, next == Some('=')) {
                    ('>', true) => CmpOp::Ge,
                    ('>', false) => CmpOp::Gt,
                    ('<', true) => CmpOp::Le,
                    _ => CmpOp::Lt,
                };
                tokens.push(Token::Cmp(op));
                i += if next == Some('=') { 2 } else { 1 };
            }
            '\'' => {
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err("unterminated string literal".to_string()),
                        Some('\\') if chars.get(i + 1) == Some(&'\'') => {
                            value.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            value.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() || (c == '-' && next.map_or(false, |n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while let Some(ch) = chars.get(i) {
                    let exponent_sign = (*ch == '+' || *ch == '-') && matches!(chars[i - 1], 'e' | 'E');
                    if ch.is_ascii_digit() || *ch == '.' || *ch == 'e' || *ch == 'E' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number literal '{}'", text))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while let Some(ch) = chars.get(i) {
                    if ch.is_alphanumeric() || *ch == '_' || *ch == '.' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{}' at {}", other, i)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(word)) if word == keyword)
    }

    fn or(&mut self) -> Result<Predicate, String> {
        let mut left = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            left = Predicate::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Predicate, String> {
        let mut left = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            left = Predicate::And(Box::new(left), Box::new(self.unary()?));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Predicate, String> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Predicate::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Predicate, String> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.or()?;
            return match self.next() {
                Some(Token::RParen) => Ok(inner),
                other => Err(format!("expected ')', found {:?}", other)),
            };
        }

        let left = self.operand()?;
        match self.peek().cloned() {
            Some(Token::Cmp(op)) => {
                self.pos += 1;
                Ok(Predicate::Compare(left, op, self.operand()?))
            }
            Some(Token::Ident(word)) if word == "IS" => {
                self.pos += 1;
                let negated = self.peek_keyword("NOT");
                if negated {
                    self.pos += 1;
                }
                if !self.peek_keyword("NULL") {
                    return Err("expected NULL after IS".to_string());
                }
                self.pos += 1;
                Ok(Predicate::IsNull(left, negated))
            }
            Some(Token::Ident(word)) if word == "HAS_PREFIX" || word == "HAS_SUFFIX" || word == "CONTAIN_ANY" => {
                self.pos += 1;
                let op = match word.as_str() {
                    "HAS_PREFIX" => TextOp::Prefix,
                    "HAS_SUFFIX" => TextOp::Suffix,
                    _ => TextOp::Contains,
                };
                Ok(Predicate::Text(left, op, self.operand()?))
            }
            _ => Ok(Predicate::Truthy(left)),
        }
    }

    fn operand(&mut self) -> Result<Operand, String> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Operand::Str(s)),
            Some(Token::Number(n)) => Ok(Operand::Number(n)),
            Some(Token::Ident(word)) => Ok(match word.as_str() {
                "true" => Operand::Bool(true),
                "false" => Operand::Bool(false),
                "null" => Operand::Null,
                _ => Operand::Field(word),
            }),
            other => Err(format!("expected an operand, found {:?}", other)),
        }
    }
}

/// Parses a filter string.
pub(super) fn parse(filter: &str) -> Result<Predicate, String> {
    let mut parser = Parser {
        tokens: tokenize(filter)?,
        pos: 0,
    };
    let predicate = parser.or()?;
    match parser.peek() {
        None => Ok(predicate),
        Some(token) => Err(format!("unexpected trailing token {:?}", token)),
    }
}

enum Resolved<'a> {
    Null,
    Str(&'a str),
    Number(f64),
    Bool(bool),
}

fn resolve<'a>(operand: &'a Operand, lookup: &impl Fn(&str) -> Option<&'a Value>) -> Resolved<'a> {
    match operand {
        Operand::Str(s) => Resolved::Str(s),
        Operand::Number(n) => Resolved::Number(*n),
        Operand::Bool(b) => Resolved::Bool(*b),
        Operand::Null => Resolved::Null,
        Operand::Field(name) => match lookup(name) {
            Some(Value::String(s)) => Resolved::Str(s),
            Some(Value::Bool(b)) => Resolved::Bool(*b),
            Some(Value::Int32(v)) => Resolved::Number(f64::from(*v)),
            Some(Value::Int64(v)) => Resolved::Number(*v as f64),
            Some(Value::Float(v)) => Resolved::Number(f64::from(*v)),
            Some(Value::Double(v)) => Resolved::Number(*v),
            _ => Resolved::Null,
        },
    }
}

impl Predicate {
    /// Evaluates against one record. Comparisons involving null are false.
    pub(super) fn matches<'a>(&'a self, lookup: &impl Fn(&str) -> Option<&'a Value>) -> bool {
        match self {
            Predicate::And(a, b) => a.matches(lookup) && b.matches(lookup),
            Predicate::Or(a, b) => a.matches(lookup) || b.matches(lookup),
            Predicate::Not(inner) => !inner.matches(lookup),
            Predicate::IsNull(operand, negated) => {
                let is_null = matches!(resolve(operand, lookup), Resolved::Null);
                is_null != *negated
            }
            Predicate::Truthy(operand) => matches!(resolve(operand, lookup), Resolved::Bool(true)),
            Predicate::Text(left, op, right) => match (resolve(left, lookup), resolve(right, lookup)) {
                (Resolved::Str(l), Resolved::Str(r)) => match op {
                    TextOp::Prefix => l.starts_with(r),
                    TextOp::Suffix => l.ends_with(r),
                    TextOp::Contains => l.contains(r),
                },
                _ => false,
            },
            Predicate::Compare(left, op, right) => {
                let ordering = match (resolve(left, lookup), resolve(right, lookup)) {
                    (Resolved::Number(l), Resolved::Number(r)) => l.partial_cmp(&r),
                    (Resolved::Str(l), Resolved::Str(r)) => Some(l.cmp(r)),
                    (Resolved::Bool(l), Resolved::Bool(r)) => Some(l.cmp(&r)),
                    _ => None,
                };
                match ordering {
                    None => false,
                    Some(ord) => match op {
                        CmpOp::Eq => ord.is_eq(),
                        CmpOp::Ne => ord.is_ne(),
                        CmpOp::Gt => ord.is_gt(),
                        CmpOp::Ge => ord.is_ge(),
                        CmpOp::Lt => ord.is_lt(),
                        CmpOp::Le => ord.is_le(),
                    },
                }
            }
        }
    }
}
