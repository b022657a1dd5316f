// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Index build parameters and query-time index parameters.

use serde::{Deserialize, Serialize};

use crate::core::types::{IndexType, MetricType, QuantizeType};

pub const DEFAULT_HNSW_M: i32 = 16;
pub const DEFAULT_HNSW_EF_CONSTRUCTION: i32 = 200;
pub const DEFAULT_HNSW_EF_SEARCH: i32 = 64;
pub const DEFAULT_IVF_N_LISTS: i32 = 1024;
pub const DEFAULT_IVF_N_PROBE: i32 = 64;

fn positive_or(value: i32, default: i32) -> i32 {
    if value > 0 {
        value
    } else {
        default
    }
}

/// Build parameters of a vector index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IndexParams {
    Hnsw {
        m: i32,
        ef_construction: i32,
        metric: MetricType,
        quantize: QuantizeType,
    },
    Ivf {
        n_lists: i32,
        n_probe: i32,
        metric: MetricType,
        quantize: QuantizeType,
    },
    Flat {
        metric: MetricType,
        quantize: QuantizeType,
    },
}

impl IndexParams {
    /// HNSW parameters. Non-positive values fall back to M=16, EfConstruction=200.
    pub fn hnsw(m: i32, ef_construction: i32) -> Self {
        IndexParams::Hnsw {
            m: positive_or(m, DEFAULT_HNSW_M),
            ef_construction: positive_or(ef_construction, DEFAULT_HNSW_EF_CONSTRUCTION),
            metric: MetricType::Cosine,
            quantize: QuantizeType::Undefined,
        }
    }

    /// IVF parameters. Non-positive values fall back to NLists=1024, NProbe=64.
    pub fn ivf(n_lists: i32, n_probe: i32) -> Self {
        IndexParams::Ivf {
            n_lists: positive_or(n_lists, DEFAULT_IVF_N_LISTS),
            n_probe: positive_or(n_probe, DEFAULT_IVF_N_PROBE),
            metric: MetricType::Cosine,
            quantize: QuantizeType::Undefined,
        }
    }

    pub fn flat() -> Self {
        IndexParams::Flat {
            metric: MetricType::Cosine,
            quantize: QuantizeType::Undefined,
        }
    }

    /// Replaces the metric. `Undefined` keeps the current one.
    pub fn with_metric(mut self, value: MetricType) -> Self {
        if value != MetricType::Undefined {
            match &mut self {
                IndexParams::Hnsw { metric, .. }
                | IndexParams::Ivf { metric, .. }
                | IndexParams::Flat { metric, .. } => *metric = value,
            }
        }
        self
    }

    pub fn with_quantize(mut self, value: QuantizeType) -> Self {
        match &mut self {
            IndexParams::Hnsw { quantize, .. }
            | IndexParams::Ivf { quantize, .. }
            | IndexParams::Flat { quantize, .. } => *quantize = value,
        }
        self
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            IndexParams::Hnsw { .. } => IndexType::Hnsw,
            IndexParams::Ivf { .. } => IndexType::Ivf,
            IndexParams::Flat { .. } => IndexType::Flat,
        }
    }

    pub fn metric(&self) -> MetricType {
        match self {
            IndexParams::Hnsw { metric, .. }
            | IndexParams::Ivf { metric, .. }
            | IndexParams::Flat { metric, .. } => *metric,
        }
    }

    pub fn quantize(&self) -> QuantizeType {
        match self {
            IndexParams::Hnsw { quantize, .. }
            | IndexParams::Ivf { quantize, .. }
            | IndexParams::Flat { quantize, .. } => *quantize,
        }
    }
}

impl Default for IndexParams {
    fn default() -> Self {
        Self::flat()
    }
}

/// Inverted index parameters for scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvertIndexParams {
    pub enable_range_optimization: bool,
}

impl InvertIndexParams {
    pub fn new(enable_range_optimization: bool) -> Self {
        Self {
            enable_range_optimization,
        }
    }
}

/// Query-time tuning for the index behind a vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexQueryParam {
    /// Size of the dynamic candidate list during HNSW search.
    Hnsw { ef: i32 },
    /// Number of IVF partitions probed.
    Ivf { n_probe: i32 },
}

impl IndexQueryParam {
    pub fn hnsw(ef: i32) -> Self {
        IndexQueryParam::Hnsw {
            ef: positive_or(ef, DEFAULT_HNSW_EF_SEARCH),
        }
    }

    pub fn ivf(n_probe: i32) -> Self {
        IndexQueryParam::Ivf {
            n_probe: positive_or(n_probe, DEFAULT_IVF_N_PROBE),
        }
    }
}
