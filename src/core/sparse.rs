// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sparse vector value type.
//!
//! Stores only the non-zero entries as parallel `indices`/`values` arrays with
//! indices in strictly ascending order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::core::error::{Result, ZvecError};

/// Absolute tolerance used when comparing sparse values.
const VALUE_TOLERANCE: f32 = 1e-6;

/// A sparse vector of `(index, value)` pairs sorted by index.
///
/// # Examples
///
/// ```
/// use zvec_client::core::sparse::SparseVector;
///
/// let sparse = SparseVector::new(vec![3, 10, 42], vec![0.5, 0.25, 1.0]).unwrap();
/// assert_eq!(sparse.get(10), 0.25);
/// assert_eq!(sparse.get(11), 0.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    /// Creates a sparse vector from parallel arrays.
    ///
    /// # Arguments
    ///
    /// * `indices` - Positions of the non-zero entries, strictly ascending
    /// * `values` - Entry values, one per index
    ///
    /// # Errors
    ///
    /// Fails when the arrays differ in length or the indices are not strictly ascending.
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(ZvecError::invalid_argument(
                "indices",
                format!(
                    "Indices and values must have the same length ({} != {})",
                    indices.len(),
                    values.len()
                ),
            ));
        }

        if let Some(pos) = indices.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ZvecError::invalid_argument(
                "indices",
                format!(
                    "Indices must be strictly ascending, found {} followed by {}",
                    indices[pos],
                    indices[pos + 1]
                ),
            ));
        }

        Ok(Self { indices, values })
    }

    /// The empty sparse vector.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a sparse vector from an index → value map, sorting by index.
    pub fn from_map(entries: &HashMap<u32, f32>) -> Self {
        let sorted: BTreeMap<u32, f32> = entries.iter().map(|(&k, &v)| (k, v)).collect();
        Self {
            indices: sorted.keys().copied().collect(),
            values: sorted.values().copied().collect(),
        }
    }

    pub fn to_map(&self) -> HashMap<u32, f32> {
        self.iter().collect()
    }

    /// Value at `index`, or 0 when the index is not stored.
    pub fn get(&self, index: u32) -> f32 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

impl PartialEq for SparseVector {
    fn eq(&self, other: &Self) -> bool {
        self.indices == other.indices
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| (a - b).abs() <= VALUE_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_uses_binary_search_with_zero_default() {
        let sparse = SparseVector::new(vec![1, 5, 9], vec![0.1, 0.5, 0.9]).unwrap();
        assert_eq!(sparse.len(), 3);
        assert_eq!(sparse.get(5), 0.5);
        assert_eq!(sparse.get(0), 0.0);
        assert_eq!(sparse.get(100), 0.0);
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let err = SparseVector::new(vec![1, 2], vec![0.5]).unwrap_err();
        assert!(err.to_string().contains("same length"));
    }

    #[test]
    fn test_rejects_unsorted_indices() {
        assert!(SparseVector::new(vec![5, 1], vec![0.5, 0.1]).is_err());
        assert!(SparseVector::new(vec![1, 1], vec![0.5, 0.1]).is_err());
    }

    #[test]
    fn test_from_map_sorts_indices() {
        let mut map = HashMap::new();
        map.insert(30, 3.0);
        map.insert(10, 1.0);
        map.insert(20, 2.0);

        let sparse = SparseVector::from_map(&map);
        assert_eq!(sparse.indices(), &[10, 20, 30]);
        assert_eq!(sparse.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(sparse.to_map(), map);
    }

    #[test]
    fn test_equality_tolerates_rounding() {
        let a = SparseVector::new(vec![1, 2], vec![0.1, 0.2]).unwrap();
        let b = SparseVector::new(vec![1, 2], vec![0.1 + 1e-8, 0.2]).unwrap();
        let c = SparseVector::new(vec![1, 3], vec![0.1, 0.2]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(SparseVector::empty().is_empty());
    }
}
