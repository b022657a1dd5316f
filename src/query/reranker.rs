// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Result fusion for multi-vector queries.
//!
//! Each vector clause is searched on its own and the ranked lists are merged
//! here. Reciprocal rank fusion scores an id as `Σ weight / (k + rank)` over
//! the lists it appears in (ranks start at 1). Weighted fusion scores it as
//! `Σ w(field) · score`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, ZvecError};

pub const DEFAULT_RRF_K: f64 = 60.0;
const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

/// Reciprocal rank fusion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RrfReRankerData")]
pub struct RrfReRanker {
    k: f64,
}

impl RrfReRanker {
    /// # Errors
    ///
    /// `InvalidArgument` when `k` is not positive.
    pub fn new(k: f64) -> Result<Self> {
        if k.is_nan() || k <= 0.0 {
            return Err(ZvecError::invalid_argument("k", "K must be positive"));
        }
        Ok(Self { k })
    }

    pub fn k(&self) -> f64 {
        self.k
    }
}

impl Default for RrfReRanker {
    fn default() -> Self {
        Self { k: DEFAULT_RRF_K }
    }
}

/// Linear combination of per-field scores. Weights must sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WeightedReRankerData")]
pub struct WeightedReRanker {
    weights: Vec<(String, f64)>,
}

#[derive(Deserialize)]
struct RrfReRankerData {
    k: f64,
}

impl TryFrom<RrfReRankerData> for RrfReRanker {
    type Error = ZvecError;

    fn try_from(data: RrfReRankerData) -> Result<Self> {
        Self::new(data.k)
    }
}

#[derive(Deserialize)]
struct WeightedReRankerData {
    weights: Vec<(String, f64)>,
}

impl TryFrom<WeightedReRankerData> for WeightedReRanker {
    type Error = ZvecError;

    fn try_from(data: WeightedReRankerData) -> Result<Self> {
        Self::new(data.weights)
    }
}

impl WeightedReRanker {
    /// # Errors
    ///
    /// `InvalidArgument` when `weights` is empty, names a field twice, holds a
    /// non-finite weight or does not sum to 1.0 within 0.001.
    pub fn new<I, S>(weights: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let weights: Vec<(String, f64)> = weights.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if weights.is_empty() {
            return Err(ZvecError::invalid_argument(
                "weights",
                "Weights cannot be null or empty",
            ));
        }
        for (index, (name, weight)) in weights.iter().enumerate() {
            if !weight.is_finite() {
                return Err(ZvecError::invalid_argument(
                    "weights",
                    format!("Weight for '{}' must be a finite number, got {}", name, weight),
                ));
            }
            if weights[..index].iter().any(|(other, _)| other == name) {
                return Err(ZvecError::invalid_argument(
                    "weights",
                    format!("Duplicate weight for field '{}'", name),
                ));
            }
        }
        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ZvecError::invalid_argument(
                "weights",
                format!("Weights must sum to 1.0, but sum is {}", sum),
            ));
        }
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &[(String, f64)] {
        &self.weights
    }

    pub fn weight_for(&self, field: &str) -> Option<f64> {
        self.weights.iter().find(|(name, _)| name == field).map(|(_, w)| *w)
    }
}

/// Fusion strategy for queries with more than one vector clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReRanker {
    Rrf(RrfReRanker),
    Weighted(WeightedReRanker),
}

impl ReRanker {
    pub fn rrf(k: f64) -> Result<Self> {
        RrfReRanker::new(k).map(ReRanker::Rrf)
    }

    pub fn weighted<I, S>(weights: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        WeightedReRanker::new(weights).map(ReRanker::Weighted)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReRanker::Rrf(_) => "RRF",
            ReRanker::Weighted(_) => "Weighted",
        }
    }

    /// Directive form: `rrf(k=60)` or `weighted(a:0.7000,b:0.3000)`.
    pub fn to_directive(&self) -> String {
        self.to_string()
    }

    /// Merges ranked lists into one list of at most `topk` hits, best first.
    ///
    /// Each hit keeps the first document seen for its id and carries the fused
    /// score. Ties keep first-seen order.
    pub fn fuse<D>(&self, lists: Vec<RankedList<D>>, topk: usize) -> Vec<Hit<D>> {
        let mut fused: HashMap<String, (f64, usize)> = HashMap::new();
        let mut docs: Vec<Option<D>> = Vec::new();
        let mut ids: Vec<String> = Vec::new();

        for list in lists {
            let field_weight = match self {
                ReRanker::Rrf(_) => list.weight,
                ReRanker::Weighted(w) => w.weight_for(&list.field).unwrap_or(list.weight),
            };
            for (position, hit) in list.hits.into_iter().enumerate() {
                let contribution = match self {
                    ReRanker::Rrf(rrf) => field_weight / (rrf.k + (position + 1) as f64),
                    ReRanker::Weighted(_) => field_weight * hit.score,
                };
                match fused.get_mut(&hit.id) {
                    Some((score, _)) => *score += contribution,
                    None => {
                        fused.insert(hit.id.clone(), (contribution, docs.len()));
                        ids.push(hit.id);
                        docs.push(Some(hit.doc));
                    }
                }
            }
        }

        let mut order: Vec<(f64, usize)> = fused.into_values().collect();
        order.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        order.truncate(topk);

        order
            .into_iter()
            .filter_map(|(score, slot)| {
                let doc = docs[slot].take()?;
                Some(Hit {
                    id: std::mem::take(&mut ids[slot]),
                    score,
                    doc,
                })
            })
            .collect()
    }
}

impl Default for ReRanker {
    fn default() -> Self {
        ReRanker::Rrf(RrfReRanker::default())
    }
}

impl fmt::Display for ReRanker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReRanker::Rrf(rrf) => write!(f, "rrf(k={})", rrf.k),
            ReRanker::Weighted(w) => {
                let parts: Vec<String> = w
                    .weights
                    .iter()
                    .map(|(name, weight)| format!("{}:{:.4}", name, weight))
                    .collect();
                write!(f, "weighted({})", parts.join(","))
            }
        }
    }
}

impl From<RrfReRanker> for ReRanker {
    fn from(value: RrfReRanker) -> Self {
        ReRanker::Rrf(value)
    }
}

impl From<WeightedReRanker> for ReRanker {
    fn from(value: WeightedReRanker) -> Self {
        ReRanker::Weighted(value)
    }
}

/// A scored document in a ranked list.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<D> {
    pub id: String,
    pub score: f64,
    pub doc: D,
}

/// Results of one vector clause, best first.
#[derive(Debug, Clone)]
pub struct RankedList<D> {
    pub field: String,
    pub weight: f64,
    pub hits: Vec<Hit<D>>,
}
