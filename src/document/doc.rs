// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Schema-less document used by untyped collections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::sparse::SparseVector;
use crate::document::value::{FieldType, FieldValue};

/// A document held as name → value maps.
///
/// # Examples
///
/// ```
/// use zvec_client::document::Doc;
///
/// let doc = Doc::new("doc1")
///     .with_field("Title", "Test")
///     .with_field("Year", 2024)
///     .with_vector("Embedding", vec![0.1, 0.2, 0.3, 0.4]);
///
/// assert_eq!(doc.get::<i32>("Year"), Some(2024));
/// assert_eq!(doc.vector("Embedding").map(|v| v.len()), Some(4));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    id: String,
    score: f64,
    fields: BTreeMap<String, FieldValue>,
    vectors: BTreeMap<String, Vec<f32>>,
    sparse_vectors: BTreeMap<String, SparseVector>,
}

impl Doc {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn with_vector(mut self, name: impl Into<String>, vector: Vec<f32>) -> Self {
        self.set_vector(name, vector);
        self
    }

    pub fn with_sparse_vector(mut self, name: impl Into<String>, vector: SparseVector) -> Self {
        self.sparse_vectors.insert(name.into(), vector);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Similarity score of a query hit; 0 for fetched documents.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = score;
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn set_vector(&mut self, name: impl Into<String>, vector: Vec<f32>) {
        self.vectors.insert(name.into(), vector);
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Field converted to `F`. `None` when absent or not convertible.
    pub fn get<F: FieldType>(&self, name: &str) -> Option<F> {
        self.fields.get(name).cloned().and_then(F::from_field_value)
    }

    pub fn vector(&self, name: &str) -> Option<&[f32]> {
        self.vectors.get(name).map(Vec::as_slice)
    }

    pub fn sparse_vector(&self, name: &str) -> Option<&SparseVector> {
        self.sparse_vectors.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn vectors(&self) -> &BTreeMap<String, Vec<f32>> {
        &self.vectors
    }
}
