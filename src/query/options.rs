// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, ZvecError};
use crate::query::reranker::ReRanker;

pub const DEFAULT_TOPK: usize = 10;

/// Per-execution query settings. Each `with_*` call returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    topk: usize,
    filter: Option<String>,
    include_vectors: bool,
    output_fields: Option<Vec<String>>,
    reranker: Option<ReRanker>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            topk: DEFAULT_TOPK,
            filter: None,
            include_vectors: false,
            output_fields: None,
            reranker: None,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// `InvalidArgument` when `topk` is zero.
    pub fn with_topk(&self, topk: usize) -> Result<Self> {
        if topk == 0 {
            return Err(ZvecError::invalid_argument("k", "TopK must be positive"));
        }
        Ok(Self { topk, ..self.clone() })
    }

    pub fn with_filter(&self, filter: Option<String>) -> Self {
        Self {
            filter,
            ..self.clone()
        }
    }

    pub fn with_include_vectors(&self, include_vectors: bool) -> Self {
        Self {
            include_vectors,
            ..self.clone()
        }
    }

    /// An empty list means "all fields".
    pub fn with_output_fields(&self, fields: Vec<String>) -> Self {
        Self {
            output_fields: (!fields.is_empty()).then_some(fields),
            ..self.clone()
        }
    }

    pub fn with_reranker(&self, reranker: Option<ReRanker>) -> Self {
        Self {
            reranker,
            ..self.clone()
        }
    }

    pub fn topk(&self) -> usize {
        self.topk
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn include_vectors(&self) -> bool {
        self.include_vectors
    }

    pub fn output_fields(&self) -> Option<&[String]> {
        self.output_fields.as_deref()
    }

    pub fn reranker(&self) -> Option<&ReRanker> {
        self.reranker.as_ref()
    }
}
