// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Filter predicates and their compilation to the engine's filter grammar.

pub mod compiler;
pub mod expr;

pub use compiler::{compile, quote};
pub use expr::{field, lit, null, BinaryOp, Expr, Literal, StringMethod, UnaryOp};
