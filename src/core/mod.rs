// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod error;
pub mod index_params;
pub mod sparse;
pub mod status;
pub mod types;

pub use error::{Result, ZvecError};
pub use index_params::{IndexParams, IndexQueryParam, InvertIndexParams};
pub use sparse::SparseVector;
pub use status::{Status, StatusCode};
pub use types::{DataType, IndexType, MetricType, QuantizeType, VectorPrecision};
