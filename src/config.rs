// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Client configuration
//!
//! `ClientConfig::from_env` reads:
//!
//! * `ZVEC_ENGINE` - `native` (default) or `memory`
//! * `ZVEC_LIBRARY_PATH` - engine library, required for `native`
//! * `ZVEC_SEGMENT_MAX_DOCS`, `ZVEC_INDEX_BUILD_PARALLEL`, `ZVEC_AUTO_FLUSH`

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::error::{Result, ZvecError};
use crate::native::engine::NativeCollectionOptions;

pub const DEFAULT_SEGMENT_MAX_DOCS: u32 = 1_000_000;

/// Options passed to the engine when a collection is created or opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOptions {
    pub segment_max_docs: u32,
    /// 0 lets the engine choose.
    pub index_build_parallel: u32,
    pub auto_flush: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            segment_max_docs: DEFAULT_SEGMENT_MAX_DOCS,
            index_build_parallel: 0,
            auto_flush: true,
        }
    }
}

impl CollectionOptions {
    pub fn is_valid(&self) -> bool {
        self.segment_max_docs > 0
            && i32::try_from(self.segment_max_docs).is_ok()
            && i32::try_from(self.index_build_parallel).is_ok()
    }

    /// Fixed-layout form handed to the engine.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when a value does not fit the engine's 32-bit fields
    /// or the segment cap is zero.
    pub fn to_native(&self) -> Result<NativeCollectionOptions> {
        if !self.is_valid() {
            return Err(ZvecError::invalid_argument(
                "options",
                format!(
                    "Invalid collection options: segment_max_docs={}, index_build_parallel={}",
                    self.segment_max_docs, self.index_build_parallel
                ),
            ));
        }
        Ok(NativeCollectionOptions {
            segment_max_docs: self.segment_max_docs as i32,
            index_build_parallel: self.index_build_parallel as i32,
            auto_flush: i32::from(self.auto_flush),
        })
    }
}

/// Which engine implementation a `Client` talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// The engine's shared library, loaded at runtime.
    #[default]
    Native,
    /// The in-process engine.
    Memory,
}

impl FromStr for EngineMode {
    type Err = ZvecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(EngineMode::Native),
            "memory" | "mock" => Ok(EngineMode::Memory),
            other => Err(ZvecError::invalid_argument(
                "ZVEC_ENGINE",
                format!("Unknown engine mode '{}': expected 'native' or 'memory'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    pub engine: EngineMode,
    pub library_path: Option<PathBuf>,
    pub collection: CollectionOptions,
}

impl ClientConfig {
    /// Configuration for the in-process engine with default options.
    pub fn memory() -> Self {
        Self {
            engine: EngineMode::Memory,
            ..Self::default()
        }
    }

    /// Configuration for the native engine at `path`.
    pub fn native(path: impl Into<PathBuf>) -> Self {
        Self {
            engine: EngineMode::Native,
            library_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Reads the configuration from `ZVEC_*` environment variables.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed value, or a missing
    /// `ZVEC_LIBRARY_PATH` in native mode.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let engine = match lookup("ZVEC_ENGINE") {
            Some(value) => value.parse()?,
            None => EngineMode::default(),
        };

        let library_path = lookup("ZVEC_LIBRARY_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        if engine == EngineMode::Native && library_path.is_none() {
            return Err(ZvecError::invalid_argument(
                "ZVEC_LIBRARY_PATH",
                "ZVEC_LIBRARY_PATH required for native engine mode",
            ));
        }

        let defaults = CollectionOptions::default();
        let collection = CollectionOptions {
            segment_max_docs: parse_var(&lookup, "ZVEC_SEGMENT_MAX_DOCS")?.unwrap_or(defaults.segment_max_docs),
            index_build_parallel: parse_var(&lookup, "ZVEC_INDEX_BUILD_PARALLEL")?
                .unwrap_or(defaults.index_build_parallel),
            auto_flush: parse_flag(&lookup, "ZVEC_AUTO_FLUSH")?.unwrap_or(defaults.auto_flush),
        };
        if !collection.is_valid() {
            return Err(ZvecError::invalid_argument(
                "ZVEC_SEGMENT_MAX_DOCS",
                "Collection options out of range",
            ));
        }

        Ok(Self {
            engine,
            library_path,
            collection,
        })
    }

    pub fn log_summary(&self) {
        info!(
            engine = ?self.engine,
            library = ?self.library_path,
            segment_max_docs = self.collection.segment_max_docs,
            index_build_parallel = self.collection.index_build_parallel,
            auto_flush = self.collection.auto_flush,
            "zvec client configuration"
        );
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ZvecError::invalid_argument(key, format!("Invalid value for {}: '{}'", key, raw))
        }),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<bool>> {
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(None),
        Some("1") | Some("true") | Some("on") | Some("yes") => Ok(Some(true)),
        Some("0") | Some("false") | Some("off") | Some("no") => Ok(Some(false)),
        Some(other) => Err(ZvecError::invalid_argument(
            key,
            format!("Invalid value for {}: '{}'", key, other),
        )),
    }
}
