// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! One vector-similarity clause of a query.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, ZvecError};
use crate::core::index_params::IndexQueryParam;
use crate::core::sparse::SparseVector;

/// Query vector supplied by the caller. `F64` is narrowed to fp32.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorValue {
    F32(Vec<f32>),
    F64(Vec<f64>),
    Sparse(SparseVector),
}

impl From<Vec<f32>> for VectorValue {
    fn from(value: Vec<f32>) -> Self {
        VectorValue::F32(value)
    }
}

impl From<&[f32]> for VectorValue {
    fn from(value: &[f32]) -> Self {
        VectorValue::F32(value.to_vec())
    }
}

impl<const N: usize> From<[f32; N]> for VectorValue {
    fn from(value: [f32; N]) -> Self {
        VectorValue::F32(value.to_vec())
    }
}

impl From<Vec<f64>> for VectorValue {
    fn from(value: Vec<f64>) -> Self {
        VectorValue::F64(value)
    }
}

impl From<&[f64]> for VectorValue {
    fn from(value: &[f64]) -> Self {
        VectorValue::F64(value.to_vec())
    }
}

impl From<SparseVector> for VectorValue {
    fn from(value: SparseVector) -> Self {
        VectorValue::Sparse(value)
    }
}

/// A nearest-neighbour clause against one vector field.
///
/// Exactly one of `document_id`, `vector` and `sparse` must be set; `validate`
/// checks this before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorQuery {
    pub field_name: String,
    pub document_id: Option<String>,
    pub vector: Option<Vec<f32>>,
    pub sparse: Option<SparseVector>,
    pub weight: f64,
    pub param: Option<IndexQueryParam>,
}

impl VectorQuery {
    fn empty(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            document_id: None,
            vector: None,
            sparse: None,
            weight: 1.0,
            param: None,
        }
    }

    /// Searches with the stored vector of another document.
    pub fn by_id(field_name: impl Into<String>, document_id: impl Into<String>) -> Result<Self> {
        let document_id = document_id.into();
        if document_id.is_empty() {
            return Err(ZvecError::invalid_argument(
                "document_id",
                "Document ID cannot be null or empty",
            ));
        }
        Ok(Self {
            document_id: Some(document_id),
            ..Self::empty(field_name)
        })
    }

    /// Searches with a dense fp32 vector.
    pub fn by_vector(field_name: impl Into<String>, vector: Vec<f32>) -> Result<Self> {
        if vector.is_empty() {
            return Err(ZvecError::invalid_argument("vector", "Vector cannot be null or empty"));
        }
        Ok(Self {
            vector: Some(vector),
            ..Self::empty(field_name)
        })
    }

    pub fn by_sparse(field_name: impl Into<String>, sparse: SparseVector) -> Self {
        Self {
            sparse: Some(sparse),
            ..Self::empty(field_name)
        }
    }

    /// Builds the clause for whatever shape `value` has.
    pub fn from_value(field_name: impl Into<String>, value: VectorValue) -> Result<Self> {
        match value {
            VectorValue::F32(v) => Self::by_vector(field_name, v),
            VectorValue::F64(v) => Self::by_vector(field_name, v.into_iter().map(|x| x as f32).collect()),
            VectorValue::Sparse(s) => Ok(Self::by_sparse(field_name, s)),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_param(mut self, param: Option<IndexQueryParam>) -> Self {
        self.param = param;
        self
    }

    pub fn has_id(&self) -> bool {
        self.document_id.as_deref().map_or(false, |id| !id.is_empty())
    }

    pub fn has_vector(&self) -> bool {
        self.vector.is_some() || self.sparse.is_some()
    }

    pub fn is_sparse(&self) -> bool {
        self.sparse.is_some()
    }

    /// Checks the one-of invariant.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the field name is empty, or when zero or two of
    /// {id, vector} are set.
    pub fn validate(&self) -> Result<()> {
        if self.field_name.is_empty() {
            return Err(ZvecError::invalid_argument("field_name", "Field name cannot be empty"));
        }
        if self.vector.is_some() && self.sparse.is_some() {
            return Err(ZvecError::invalid_argument(
                "vector",
                "Cannot specify both dense and sparse vectors",
            ));
        }
        match (self.has_id(), self.has_vector()) {
            (true, true) => Err(ZvecError::invalid_argument(
                "document_id",
                "Cannot specify both document ID and vector",
            )),
            (false, false) => Err(ZvecError::invalid_argument(
                "vector",
                "Must specify either document ID or vector",
            )),
            _ => Ok(()),
        }
    }
}
