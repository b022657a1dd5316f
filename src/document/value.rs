// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Value shapes and the conversions between Rust field types and engine values.
//!
//! `FieldType` is implemented for every Rust type a document field may have. It
//! reports the field's shape (used for schema inference), lends the value out
//! for encoding as a `FieldRef`, and rebuilds it from a decoded `FieldValue`.

use half::f16;
use serde::{Deserialize, Serialize};

use crate::core::sparse::SparseVector;
use crate::core::types::{DataType, VectorPrecision};

/// Scalar kinds a field value can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Bool,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float,
    Double,
}

/// Element kinds of one-dimensional arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    String,
    Bool,
    Int8,
    UInt8,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Half,
    Float,
    Double,
}

/// Structural shape of a field's Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    Scalar(ScalarKind),
    Array(ElementKind),
    Sparse,
    /// Any type the engine has no column kind for.
    Opaque,
}

impl ValueShape {
    /// Column type for a scalar field of this shape, if one exists.
    pub fn infer_data_type(self) -> Option<DataType> {
        let data_type = match self {
            ValueShape::Scalar(kind) => match kind {
                ScalarKind::String => DataType::String,
                ScalarKind::Bool => DataType::Bool,
                ScalarKind::Int32 => DataType::Int32,
                ScalarKind::Int64 => DataType::Int64,
                ScalarKind::UInt32 => DataType::UInt32,
                ScalarKind::UInt64 => DataType::UInt64,
                ScalarKind::Float => DataType::Float,
                ScalarKind::Double => DataType::Double,
            },
            ValueShape::Array(kind) => match kind {
                ElementKind::UInt8 => DataType::Binary,
                ElementKind::String => DataType::ArrayString,
                ElementKind::Bool => DataType::ArrayBool,
                ElementKind::Int32 => DataType::ArrayInt32,
                ElementKind::Int64 => DataType::ArrayInt64,
                ElementKind::UInt32 => DataType::ArrayUInt32,
                ElementKind::UInt64 => DataType::ArrayUInt64,
                ElementKind::Float => DataType::ArrayFloat,
                ElementKind::Double => DataType::ArrayDouble,
                ElementKind::Int8 | ElementKind::Half => return None,
            },
            ValueShape::Sparse | ValueShape::Opaque => return None,
        };
        Some(data_type)
    }

    /// Shape a vector field of the given precision must have.
    pub fn for_precision(precision: VectorPrecision) -> Self {
        match precision {
            VectorPrecision::Float64 => ValueShape::Array(ElementKind::Double),
            VectorPrecision::Float32 => ValueShape::Array(ElementKind::Float),
            VectorPrecision::Float16 => ValueShape::Array(ElementKind::Half),
            VectorPrecision::Int8 => ValueShape::Array(ElementKind::Int8),
            VectorPrecision::SparseFloat32 | VectorPrecision::SparseFloat16 => ValueShape::Sparse,
        }
    }

    /// Rust spelling of the shape, used in validation messages.
    pub fn rust_type(self) -> &'static str {
        match self {
            ValueShape::Scalar(kind) => match kind {
                ScalarKind::String => "String",
                ScalarKind::Bool => "bool",
                ScalarKind::Int32 => "i32",
                ScalarKind::Int64 => "i64",
                ScalarKind::UInt32 => "u32",
                ScalarKind::UInt64 => "u64",
                ScalarKind::Float => "f32",
                ScalarKind::Double => "f64",
            },
            ValueShape::Array(kind) => match kind {
                ElementKind::String => "Vec<String>",
                ElementKind::Bool => "Vec<bool>",
                ElementKind::Int8 => "Vec<i8>",
                ElementKind::UInt8 => "Vec<u8>",
                ElementKind::Int32 => "Vec<i32>",
                ElementKind::Int64 => "Vec<i64>",
                ElementKind::UInt32 => "Vec<u32>",
                ElementKind::UInt64 => "Vec<u64>",
                ElementKind::Half => "Vec<half::f16>",
                ElementKind::Float => "Vec<f32>",
                ElementKind::Double => "Vec<f64>",
            },
            ValueShape::Sparse => "SparseVector",
            ValueShape::Opaque => "<opaque>",
        }
    }
}

/// Borrowed array payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArrayRef<'a> {
    String(&'a [String]),
    Bool(&'a [bool]),
    Int8(&'a [i8]),
    UInt8(&'a [u8]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    UInt32(&'a [u32]),
    UInt64(&'a [u64]),
    Half(&'a [f16]),
    Float(&'a [f32]),
    Double(&'a [f64]),
}

/// A field value borrowed from a document for encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    Null,
    String(&'a str),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Array(ArrayRef<'a>),
    Sparse(&'a SparseVector),
    Opaque,
}

/// An owned value decoded from a native record, or held by an untyped `Doc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    String(String),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Binary(Vec<u8>),
    VectorF32(Vec<f32>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_field_ref(&self) -> FieldRef<'_> {
        match self {
            FieldValue::Null => FieldRef::Null,
            FieldValue::String(v) => FieldRef::String(v),
            FieldValue::Bool(v) => FieldRef::Bool(*v),
            FieldValue::Int32(v) => FieldRef::Int32(*v),
            FieldValue::Int64(v) => FieldRef::Int64(*v),
            FieldValue::UInt32(v) => FieldRef::UInt32(*v),
            FieldValue::UInt64(v) => FieldRef::UInt64(*v),
            FieldValue::Float(v) => FieldRef::Float(*v),
            FieldValue::Double(v) => FieldRef::Double(*v),
            FieldValue::Binary(v) => FieldRef::Array(ArrayRef::UInt8(v)),
            FieldValue::VectorF32(v) => FieldRef::Array(ArrayRef::Float(v)),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int32(v) => Some(i64::from(*v)),
            FieldValue::Int64(v) => Some(*v),
            FieldValue::UInt32(v) => Some(i64::from(*v)),
            FieldValue::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(f64::from(*v)),
            FieldValue::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int32(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int64(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Rust types usable as document fields.
pub trait FieldType: Send + Sync + 'static {
    /// Structural shape, used for schema inference and vector validation.
    fn shape() -> ValueShape;

    /// Whether the Rust type can hold "no value".
    fn nullable() -> bool {
        false
    }

    /// Lends the value for encoding.
    fn to_field_ref(&self) -> FieldRef<'_>;

    /// Rebuilds a value from a decoded engine value. `None` leaves the field untouched.
    fn from_field_value(value: FieldValue) -> Option<Self>
    where
        Self: Sized;
}

impl FieldType for String {
    fn shape() -> ValueShape {
        ValueShape::Scalar(ScalarKind::String)
    }

    fn to_field_ref(&self) -> FieldRef<'_> {
        FieldRef::String(self)
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl FieldType for bool {
    fn shape() -> ValueShape {
        ValueShape::Scalar(ScalarKind::Bool)
    }

    fn to_field_ref(&self) -> FieldRef<'_> {
        FieldRef::Bool(*self)
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! integer_field_type {
    ($ty:ty, $kind:ident) => {
        impl FieldType for $ty {
            fn shape() -> ValueShape {
                ValueShape::Scalar(ScalarKind::$kind)
            }

            fn to_field_ref(&self) -> FieldRef<'_> {
                FieldRef::$kind(*self)
            }

            fn from_field_value(value: FieldValue) -> Option<Self> {
                match value {
                    FieldValue::UInt64(v) => <$ty>::try_from(v).ok(),
                    other => other.as_i64().and_then(|v| <$ty>::try_from(v).ok()),
                }
            }
        }
    };
}

integer_field_type!(i32, Int32);
integer_field_type!(i64, Int64);
integer_field_type!(u32, UInt32);
integer_field_type!(u64, UInt64);

impl FieldType for f32 {
    fn shape() -> ValueShape {
        ValueShape::Scalar(ScalarKind::Float)
    }

    fn to_field_ref(&self) -> FieldRef<'_> {
        FieldRef::Float(*self)
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }
}

impl FieldType for f64 {
    fn shape() -> ValueShape {
        ValueShape::Scalar(ScalarKind::Double)
    }

    fn to_field_ref(&self) -> FieldRef<'_> {
        FieldRef::Double(*self)
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        value.as_f64()
    }
}

macro_rules! array_field_type {
    ($elem:ty, $kind:ident) => {
        impl FieldType for Vec<$elem> {
            fn shape() -> ValueShape {
                ValueShape::Array(ElementKind::$kind)
            }

            fn to_field_ref(&self) -> FieldRef<'_> {
                FieldRef::Array(ArrayRef::$kind(self))
            }

            fn from_field_value(_value: FieldValue) -> Option<Self> {
                None
            }
        }
    };
}

array_field_type!(String, String);
array_field_type!(bool, Bool);
array_field_type!(i8, Int8);
array_field_type!(i32, Int32);
array_field_type!(i64, Int64);
array_field_type!(u32, UInt32);
array_field_type!(u64, UInt64);
array_field_type!(f16, Half);
array_field_type!(f64, Double);

impl FieldType for Vec<u8> {
    fn shape() -> ValueShape {
        ValueShape::Array(ElementKind::UInt8)
    }

    fn to_field_ref(&self) -> FieldRef<'_> {
        FieldRef::Array(ArrayRef::UInt8(self))
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Binary(v) => Some(v),
            _ => None,
        }
    }
}

impl FieldType for Vec<f32> {
    fn shape() -> ValueShape {
        ValueShape::Array(ElementKind::Float)
    }

    fn to_field_ref(&self) -> FieldRef<'_> {
        FieldRef::Array(ArrayRef::Float(self))
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::VectorF32(v) => Some(v),
            _ => None,
        }
    }
}

impl FieldType for SparseVector {
    fn shape() -> ValueShape {
        ValueShape::Sparse
    }

    fn to_field_ref(&self) -> FieldRef<'_> {
        FieldRef::Sparse(self)
    }

    fn from_field_value(_value: FieldValue) -> Option<Self> {
        None
    }
}

impl FieldType for serde_json::Value {
    fn shape() -> ValueShape {
        ValueShape::Opaque
    }

    fn nullable() -> bool {
        true
    }

    fn to_field_ref(&self) -> FieldRef<'_> {
        FieldRef::Opaque
    }

    fn from_field_value(_value: FieldValue) -> Option<Self> {
        None
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn shape() -> ValueShape {
        T::shape()
    }

    fn nullable() -> bool {
        true
    }

    fn to_field_ref(&self) -> FieldRef<'_> {
        match self {
            Some(value) => value.to_field_ref(),
            None => FieldRef::Null,
        }
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => Some(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_inference() {
        assert_eq!(String::shape().infer_data_type(), Some(DataType::String));
        assert_eq!(bool::shape().infer_data_type(), Some(DataType::Bool));
        assert_eq!(u64::shape().infer_data_type(), Some(DataType::UInt64));
        assert_eq!(f32::shape().infer_data_type(), Some(DataType::Float));
        assert_eq!(
            <Option<i32>>::shape().infer_data_type(),
            Some(DataType::Int32)
        );
        assert!(<Option<i32>>::nullable());
        assert!(!i32::nullable());
    }

    #[test]
    fn test_array_inference() {
        assert_eq!(
            <Vec<String>>::shape().infer_data_type(),
            Some(DataType::ArrayString)
        );
        assert_eq!(<Vec<u8>>::shape().infer_data_type(), Some(DataType::Binary));
        assert_eq!(<Vec<f64>>::shape().infer_data_type(), Some(DataType::ArrayDouble));
        assert_eq!(<Vec<i8>>::shape().infer_data_type(), None);
        assert_eq!(SparseVector::shape().infer_data_type(), None);
        assert_eq!(serde_json::Value::shape().infer_data_type(), None);
    }

    #[test]
    fn test_precision_shapes() {
        assert_eq!(
            ValueShape::for_precision(VectorPrecision::Float32),
            <Vec<f32>>::shape()
        );
        assert_eq!(
            ValueShape::for_precision(VectorPrecision::Float16),
            <Vec<f16>>::shape()
        );
        assert_eq!(
            ValueShape::for_precision(VectorPrecision::SparseFloat16),
            SparseVector::shape()
        );
        assert_eq!(ValueShape::Array(ElementKind::Half).rust_type(), "Vec<half::f16>");
    }

    #[test]
    fn test_integer_decoding_widens_and_checks_range() {
        assert_eq!(i32::from_field_value(FieldValue::Int64(2024)), Some(2024));
        assert_eq!(i32::from_field_value(FieldValue::Int64(i64::MAX)), None);
        assert_eq!(u32::from_field_value(FieldValue::Int64(-1)), None);
        assert_eq!(u64::from_field_value(FieldValue::UInt64(u64::MAX)), Some(u64::MAX));
        assert_eq!(i64::from_field_value(FieldValue::String("1".into())), None);
    }

    #[test]
    fn test_float_decoding_narrows_double() {
        assert_eq!(f32::from_field_value(FieldValue::Double(1.5)), Some(1.5));
        assert_eq!(f64::from_field_value(FieldValue::Float(0.25)), Some(0.25));
    }

    #[test]
    fn test_option_round_trip_through_null() {
        let none: Option<String> = None;
        assert_eq!(none.to_field_ref(), FieldRef::Null);
        assert_eq!(
            <Option<String>>::from_field_value(FieldValue::Null),
            Some(None)
        );
        assert_eq!(
            <Option<String>>::from_field_value(FieldValue::String("a".into())),
            Some(Some("a".to_string()))
        );
    }

    #[test]
    fn test_field_value_conversions() {
        assert_eq!(FieldValue::from("tech"), FieldValue::String("tech".into()));
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
        assert_eq!(FieldValue::from(Some(3_i64)), FieldValue::Int64(3));
        assert_eq!(FieldValue::from(2.5_f64).as_field_ref(), FieldRef::Double(2.5));
    }
}
