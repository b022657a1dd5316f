// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Engine enumerations shared by schemas, index parameters and the native boundary.
//!
//! Discriminants are the engine's wire values and must not be renumbered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage type of a field or vector column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Undefined = 0,

    Binary = 1,
    String = 2,
    Bool = 3,
    Int32 = 4,
    Int64 = 5,
    UInt32 = 6,
    UInt64 = 7,
    Float = 8,
    Double = 9,

    VectorBinary32 = 20,
    VectorBinary64 = 21,
    VectorFp16 = 22,
    VectorFp32 = 23,
    VectorFp64 = 24,
    VectorInt4 = 25,
    VectorInt8 = 26,
    VectorInt16 = 27,

    SparseVectorFp16 = 30,
    SparseVectorFp32 = 31,

    ArrayBinary = 40,
    ArrayString = 41,
    ArrayBool = 42,
    ArrayInt32 = 43,
    ArrayInt64 = 44,
    ArrayUInt32 = 45,
    ArrayUInt64 = 46,
    ArrayFloat = 47,
    ArrayDouble = 48,
}

impl DataType {
    const ALL: [DataType; 29] = [
        DataType::Undefined,
        DataType::Binary,
        DataType::String,
        DataType::Bool,
        DataType::Int32,
        DataType::Int64,
        DataType::UInt32,
        DataType::UInt64,
        DataType::Float,
        DataType::Double,
        DataType::VectorBinary32,
        DataType::VectorBinary64,
        DataType::VectorFp16,
        DataType::VectorFp32,
        DataType::VectorFp64,
        DataType::VectorInt4,
        DataType::VectorInt8,
        DataType::VectorInt16,
        DataType::SparseVectorFp16,
        DataType::SparseVectorFp32,
        DataType::ArrayBinary,
        DataType::ArrayString,
        DataType::ArrayBool,
        DataType::ArrayInt32,
        DataType::ArrayInt64,
        DataType::ArrayUInt32,
        DataType::ArrayUInt64,
        DataType::ArrayFloat,
        DataType::ArrayDouble,
    ];

    /// Wire value passed across the native boundary.
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Maps a wire value back to a data type. Unknown values yield `None`.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_raw() == raw)
    }

    pub fn is_dense_vector(self) -> bool {
        (20..=27).contains(&self.as_raw())
    }

    pub fn is_sparse_vector(self) -> bool {
        matches!(self, DataType::SparseVectorFp16 | DataType::SparseVectorFp32)
    }

    pub fn is_vector(self) -> bool {
        self.is_dense_vector() || self.is_sparse_vector()
    }

    pub fn is_array(self) -> bool {
        (40..=48).contains(&self.as_raw())
    }

    /// True for the scalar and array kinds a `FieldSchema` may hold.
    pub fn is_scalar_kind(self) -> bool {
        self != DataType::Undefined && !self.is_vector()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Index structure backing a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexType {
    Undefined = 0,
    Hnsw = 1,
    Ivf = 3,
    Flat = 4,
    Invert = 10,
}

impl IndexType {
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(IndexType::Undefined),
            1 => Some(IndexType::Hnsw),
            3 => Some(IndexType::Ivf),
            4 => Some(IndexType::Flat),
            10 => Some(IndexType::Invert),
            _ => None,
        }
    }
}

/// Distance metric for vector similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MetricType {
    Undefined = 0,
    L2 = 1,
    /// Inner product
    Ip = 2,
    #[default]
    Cosine = 3,
}

impl MetricType {
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(MetricType::Undefined),
            1 => Some(MetricType::L2),
            2 => Some(MetricType::Ip),
            3 => Some(MetricType::Cosine),
            _ => None,
        }
    }
}

/// Vector quantization applied by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum QuantizeType {
    /// No quantization
    #[default]
    Undefined = 0,
    Fp16 = 1,
    Int8 = 2,
    Int4 = 3,
}

impl QuantizeType {
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(QuantizeType::Undefined),
            1 => Some(QuantizeType::Fp16),
            2 => Some(QuantizeType::Int8),
            3 => Some(QuantizeType::Int4),
            _ => None,
        }
    }
}

/// Element precision a vector field is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VectorPrecision {
    Float64,
    #[default]
    Float32,
    Float16,
    Int8,
    SparseFloat32,
    SparseFloat16,
}

impl VectorPrecision {
    pub fn to_data_type(self) -> DataType {
        match self {
            VectorPrecision::Float64 => DataType::VectorFp64,
            VectorPrecision::Float32 => DataType::VectorFp32,
            VectorPrecision::Float16 => DataType::VectorFp16,
            VectorPrecision::Int8 => DataType::VectorInt8,
            VectorPrecision::SparseFloat32 => DataType::SparseVectorFp32,
            VectorPrecision::SparseFloat16 => DataType::SparseVectorFp16,
        }
    }

    pub fn is_sparse(self) -> bool {
        matches!(
            self,
            VectorPrecision::SparseFloat32 | VectorPrecision::SparseFloat16
        )
    }
}

impl fmt::Display for VectorPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_raw_values_round_trip() {
        for raw in [0, 1, 9, 20, 23, 27, 30, 31, 40, 48] {
            let data_type = DataType::from_raw(raw).unwrap();
            assert_eq!(data_type.as_raw(), raw);
        }
        assert_eq!(DataType::from_raw(10), None);
        assert_eq!(DataType::from_raw(49), None);
    }

    #[test]
    fn test_data_type_classification() {
        assert!(DataType::VectorFp32.is_dense_vector());
        assert!(DataType::SparseVectorFp16.is_sparse_vector());
        assert!(DataType::ArrayDouble.is_array());
        assert!(DataType::Int64.is_scalar_kind());
        assert!(DataType::ArrayString.is_scalar_kind());
        assert!(!DataType::VectorInt8.is_scalar_kind());
        assert!(!DataType::Undefined.is_scalar_kind());
    }

    #[test]
    fn test_precision_mapping() {
        assert_eq!(VectorPrecision::Float32.to_data_type(), DataType::VectorFp32);
        assert_eq!(VectorPrecision::Int8.to_data_type(), DataType::VectorInt8);
        assert_eq!(
            VectorPrecision::SparseFloat16.to_data_type(),
            DataType::SparseVectorFp16
        );
        assert!(VectorPrecision::SparseFloat32.is_sparse());
        assert!(!VectorPrecision::Float64.is_sparse());
    }

    #[test]
    fn test_index_enums_from_raw() {
        assert_eq!(IndexType::from_raw(3), Some(IndexType::Ivf));
        assert_eq!(IndexType::from_raw(2), None);
        assert_eq!(MetricType::from_raw(2), Some(MetricType::Ip));
        assert_eq!(QuantizeType::from_raw(3), Some(QuantizeType::Int4));
        assert_eq!(MetricType::default(), MetricType::Cosine);
    }
}
