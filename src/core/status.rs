// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Engine status codes and the status value returned by boundary calls.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::{Result, ZvecError};

/// Status codes surfaced by the engine. `Ok` is the only non-error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StatusCode {
    #[default]
    Ok = 0,
    Unknown = 1,
    InvalidArgument = 2,
    NotFound = 3,
    AlreadyExists = 4,
    InternalError = 5,
    IOError = 6,
    InvalidSchema = 7,
    IndexError = 8,
}

impl StatusCode {
    /// Maps a raw engine code. Codes outside the known range become `Unknown`.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => StatusCode::Ok,
            2 => StatusCode::InvalidArgument,
            3 => StatusCode::NotFound,
            4 => StatusCode::AlreadyExists,
            5 => StatusCode::InternalError,
            6 => StatusCode::IOError,
            7 => StatusCode::InvalidSchema,
            8 => StatusCode::IndexError,
            _ => StatusCode::Unknown,
        }
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of an engine call: a code paired with a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Builds a status from a raw code and an engine message that may be missing.
    pub fn from_raw(code: i32, message: Option<String>) -> Self {
        let code = StatusCode::from_raw(code);
        let message = match message {
            Some(message) => message,
            None if code == StatusCode::Ok => String::new(),
            None => format!("engine returned {} without a message", code),
        };
        Self { code, message }
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }

    pub fn is_error(&self) -> bool {
        !self.is_ok()
    }

    /// Converts a non-Ok status into `ZvecError::Engine`.
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ZvecError::Engine {
                code: self.code,
                message: self.message,
            })
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            write!(f, "OK")
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl From<&ZvecError> for Status {
    fn from(error: &ZvecError) -> Self {
        Status::new(error.status_code(), error.to_string())
    }
}
