// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Error taxonomy for the client layer.

use thiserror::Error;

use crate::core::status::StatusCode;

/// Every failure the client can report. Each variant maps onto a `StatusCode`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZvecError {
    /// Non-Ok status returned by the engine.
    #[error("[{code}] {message}")]
    Engine { code: StatusCode, message: String },

    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("Invalid argument '{param}': {message}")]
    InvalidArgument {
        param: &'static str,
        message: String,
    },

    #[error("{0}")]
    InvalidOperation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Collection has been disposed.")]
    Disposed,

    #[error("Operation was cancelled before it started")]
    Cancelled,

    #[error("Failed to load native library '{path}': {reason}")]
    LibraryLoad { path: String, reason: String },

    #[error("Background task failed: {0}")]
    Task(String),
}

impl ZvecError {
    pub(crate) fn invalid_argument(param: &'static str, message: impl Into<String>) -> Self {
        ZvecError::InvalidArgument {
            param,
            message: message.into(),
        }
    }

    /// Status code carried by this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ZvecError::Engine { code, .. } => *code,
            ZvecError::SchemaValidation(_) => StatusCode::InvalidSchema,
            ZvecError::UnsupportedExpression(_)
            | ZvecError::InvalidArgument { .. }
            | ZvecError::InvalidOperation(_)
            | ZvecError::Disposed => StatusCode::InvalidArgument,
            ZvecError::NotFound(_) => StatusCode::NotFound,
            ZvecError::Cancelled => StatusCode::Unknown,
            ZvecError::LibraryLoad { .. } | ZvecError::Task(_) => StatusCode::InternalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, ZvecError>;
