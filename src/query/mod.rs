// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod builder;
pub mod options;
pub mod reranker;
pub mod vector_query;

pub use builder::{QueryBuilder, Selector};
pub use options::{QueryOptions, DEFAULT_TOPK};
pub use reranker::{Hit, RankedList, ReRanker, RrfReRanker, WeightedReRanker, DEFAULT_RRF_K};
pub use vector_query::{VectorQuery, VectorValue};
