// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Filter expression tree
//!
//! Predicates over document fields are built with combinators and compiled to
//! the engine's filter grammar by [`crate::filter::compiler`].
//!
//! # Examples
//!
//! ```
//! use zvec_client::filter::field;
//!
//! let predicate = field("Category").eq("tech").and(field("Year").ge(2020));
//! assert_eq!(
//!     predicate.compile().unwrap(),
//!     "((Category == 'tech') && (Year >= 2020))"
//! );
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops;

/// Constant operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    String(String),
}

/// Binary operators of the expression tree. Only comparisons and the logical
/// connectives compile; the arithmetic and bitwise ones are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitAnd,
    BitOr,
    ExclusiveOr,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    /// Type conversion, compiled transparently.
    Convert,
    Negate,
    OnesComplement,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Methods invoked on a string operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StringMethod {
    StartsWith,
    EndsWith,
    Contains,
    Other(String),
}

impl fmt::Display for StringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringMethod::StartsWith => write!(f, "StartsWith"),
            StringMethod::EndsWith => write!(f, "EndsWith"),
            StringMethod::Contains => write!(f, "Contains"),
            StringMethod::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A node of a filter predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Reference to a document field by name.
    Field(String),
    Literal(Literal),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Method {
        method: StringMethod,
        receiver: Box<Expr>,
        argument: Box<Expr>,
    },
}

/// Reference to a document field.
pub fn field(name: impl Into<String>) -> Expr {
    Expr::Field(name.into())
}

/// Constant operand.
pub fn lit(value: impl Into<Expr>) -> Expr {
    value.into()
}

/// The null literal.
pub fn null() -> Expr {
    Expr::Literal(Literal::Null)
}

impl Expr {
    pub fn binary(self, op: BinaryOp, right: impl Into<Expr>) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right.into()),
        }
    }

    pub fn unary(self, op: UnaryOp) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(self),
        }
    }

    pub fn call(self, method: StringMethod, argument: impl Into<Expr>) -> Expr {
        Expr::Method {
            method,
            receiver: Box::new(self),
            argument: Box::new(argument.into()),
        }
    }

    pub fn eq(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Equal, right)
    }

    pub fn ne(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::NotEqual, right)
    }

    pub fn gt(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::GreaterThan, right)
    }

    pub fn ge(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::GreaterThanOrEqual, right)
    }

    pub fn lt(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::LessThan, right)
    }

    pub fn le(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::LessThanOrEqual, right)
    }

    pub fn and(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::AndAlso, right)
    }

    pub fn or(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::OrElse, right)
    }

    /// Logical negation.
    pub fn negate(self) -> Expr {
        self.unary(UnaryOp::Not)
    }

    pub fn is_null(self) -> Expr {
        self.eq(null())
    }

    pub fn is_not_null(self) -> Expr {
        self.ne(null())
    }

    pub fn starts_with(self, prefix: impl Into<Expr>) -> Expr {
        self.call(StringMethod::StartsWith, prefix)
    }

    pub fn ends_with(self, suffix: impl Into<Expr>) -> Expr {
        self.call(StringMethod::EndsWith, suffix)
    }

    pub fn contains(self, needle: impl Into<Expr>) -> Expr {
        self.call(StringMethod::Contains, needle)
    }

    /// True for the null literal.
    pub fn is_null_literal(&self) -> bool {
        matches!(self, Expr::Literal(Literal::Null))
    }

    /// Compiles to the engine's filter grammar.
    pub fn compile(&self) -> crate::core::error::Result<String> {
        crate::filter::compiler::compile(self)
    }
}

impl ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        self.negate()
    }
}

impl ops::BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        self.and(rhs)
    }
}

impl ops::BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        self.or(rhs)
    }
}

impl From<Literal> for Expr {
    fn from(value: Literal) -> Self {
        Expr::Literal(value)
    }
}

macro_rules! literal_from {
    ($($ty:ty => $variant:ident via $conv:expr),* $(,)?) => {
        $(
            impl From<$ty> for Literal {
                fn from(value: $ty) -> Self {
                    Literal::$variant($conv(value))
                }
            }

            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Expr::Literal(Literal::from(value))
                }
            }
        )*
    };
}

literal_from! {
    bool => Bool via |v| v,
    i32 => Int via i64::from,
    i64 => Int via |v| v,
    u32 => UInt via u64::from,
    u64 => UInt via |v| v,
    f32 => Float via |v| v,
    f64 => Double via |v| v,
    String => String via |v| v,
    &str => String via |v: &str| v.to_string(),
}
