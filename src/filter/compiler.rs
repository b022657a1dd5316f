// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Filter compiler
//!
//! Translates an [`Expr`] into the engine's filter grammar in a single
//! recursive pass:
//!
//! | Node | Output |
//! |------|--------|
//! | comparison / connective | `(` left ` op ` right `)` |
//! | `== null` / `!= null` | `(` left ` IS NULL` / ` IS NOT NULL` `)` |
//! | field | its name |
//! | string literal | `'...'` with `'` escaped as `\'` |
//! | `starts_with` / `ends_with` / `contains` | receiver ` HAS_PREFIX ` / ` HAS_SUFFIX ` / ` CONTAIN_ANY ` argument |
//! | not | `!` operand |
//! | convert | operand |

use crate::core::error::{Result, ZvecError};
use crate::filter::expr::{BinaryOp, Expr, Literal, StringMethod, UnaryOp};

const SUPPORTED_OPERATORS: &str = "==, !=, <, <=, >, >=, &&, ||";

/// Compiles a predicate to a filter string.
///
/// # Errors
///
/// `UnsupportedExpression` for any operator, method or operand outside the grammar.
pub fn compile(expr: &Expr) -> Result<String> {
    let mut compiler = FilterCompiler::default();
    compiler.visit(expr)?;
    Ok(compiler.out)
}

/// Quotes a string literal for the filter grammar.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "\\'"))
}

#[derive(Default)]
struct FilterCompiler {
    out: String,
}

impl FilterCompiler {
    fn visit(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Field(name) => {
                self.out.push_str(name);
                Ok(())
            }
            Expr::Literal(literal) => {
                self.out.push_str(&format_literal(literal));
                Ok(())
            }
            Expr::Binary { op, left, right } => self.visit_binary(*op, left, right),
            Expr::Unary { op, operand } => self.visit_unary(*op, operand),
            Expr::Method {
                method,
                receiver,
                argument,
            } => self.visit_method(method, receiver, argument),
        }
    }

    fn visit_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<()> {
        let token = match op {
            BinaryOp::Equal if right.is_null_literal() => " IS NULL",
            BinaryOp::NotEqual if right.is_null_literal() => " IS NOT NULL",
            BinaryOp::Equal => " == ",
            BinaryOp::NotEqual => " != ",
            BinaryOp::GreaterThan => " > ",
            BinaryOp::GreaterThanOrEqual => " >= ",
            BinaryOp::LessThan => " < ",
            BinaryOp::LessThanOrEqual => " <= ",
            BinaryOp::AndAlso => " && ",
            BinaryOp::OrElse => " || ",
            other => {
                return Err(ZvecError::UnsupportedExpression(format!(
                    "Binary operator '{}' is not supported in filter expressions. \
                     Supported operators: {}",
                    other, SUPPORTED_OPERATORS
                )))
            }
        };

        self.out.push('(');
        self.visit(left)?;
        self.out.push_str(token);
        if !token.starts_with(" IS") {
            self.visit(right)?;
        }
        self.out.push(')');
        Ok(())
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<()> {
        match op {
            UnaryOp::Convert => self.visit(operand),
            UnaryOp::Not => {
                self.out.push('!');
                self.visit(operand)
            }
            other => Err(ZvecError::UnsupportedExpression(format!(
                "Unary operator '{}' is not supported in filter expressions.",
                other
            ))),
        }
    }

    fn visit_method(&mut self, method: &StringMethod, receiver: &Expr, argument: &Expr) -> Result<()> {
        let token = match method {
            StringMethod::StartsWith => " HAS_PREFIX ",
            StringMethod::EndsWith => " HAS_SUFFIX ",
            StringMethod::Contains => " CONTAIN_ANY ",
            StringMethod::Other(_) => return Err(unsupported_method(method)),
        };
        if !is_string_operand(receiver) {
            return Err(ZvecError::UnsupportedExpression(format!(
                "Method '{}' requires a field or string receiver, got {:?}",
                method, receiver
            )));
        }

        self.visit(receiver)?;
        self.out.push_str(token);
        self.visit(argument)
    }
}

fn unsupported_method(method: &StringMethod) -> ZvecError {
    ZvecError::UnsupportedExpression(format!(
        "Method '{}' is not supported in filter expressions.\n\
         Supported string methods: StartsWith, EndsWith, Contains\n\
         Supported operators: {}, null checks",
        method, SUPPORTED_OPERATORS
    ))
}

fn is_string_operand(expr: &Expr) -> bool {
    match expr {
        Expr::Field(_) | Expr::Literal(Literal::String(_)) => true,
        Expr::Unary {
            op: UnaryOp::Convert,
            operand,
        } => is_string_operand(operand),
        _ => false,
    }
}

fn format_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "null".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Int(v) => v.to_string(),
        Literal::UInt(v) => v.to_string(),
        Literal::Float(v) => format_general(f64::from(*v), v.to_string(), format!("{:E}", v), 7),
        Literal::Double(v) => format_general(*v, v.to_string(), format!("{:E}", v), 15),
        Literal::String(s) => quote(s),
    }
}

/// Shortest round-trip formatting, switching to `E+XX` notation for very
/// large or small magnitudes.
fn format_general(value: f64, plain: String, scientific: String, precision: i32) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "NaN".to_string()
        } else if value > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let Some((mantissa, exp)) = scientific.split_once('E') else {
        return plain;
    };
    let exponent: i32 = match exp.parse() {
        Ok(exponent) => exponent,
        Err(_) => return scientific,
    };
    if exponent > -5 && exponent < precision {
        return plain;
    }

    let (sign, digits) = match exp.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exp),
    };
    format!("{}E{}{:0>2}", mantissa, sign, digits)
}
