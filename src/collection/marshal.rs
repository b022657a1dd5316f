// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Document marshaling
//!
//! Encoding turns one record into an owned native document: the key is set,
//! every schema scalar is either written through the setter for its column
//! type or explicitly marked null, and dense fp32 and sparse fp32 vectors are
//! transferred. Unsigned, binary and array scalars, and other vector
//! precisions, are part of the schema but have no setter and are skipped.
//!
//! Decoding reads key and score, then every populated scalar through the getter
//! for its column type, then dense fp32 vectors sized by the schema dimension.

use std::ffi::CString;

use tracing::{debug, warn};

use crate::core::error::{Result, ZvecError};
use crate::core::types::DataType;
use crate::document::value::{ArrayRef, FieldRef, FieldValue};
use crate::native::engine::{DocHandle, Engine};
use crate::native::handles::OwnedDoc;
use crate::native::schema_io::c_name;
use crate::schema::types::CollectionSchema;

/// One schema column with its name prepared for the engine.
#[derive(Debug, Clone)]
pub(crate) struct Column {
    pub(crate) name: String,
    pub(crate) c_name: CString,
    pub(crate) data_type: DataType,
    pub(crate) dimension: usize,
}

/// Columns of a schema in declaration order. Built once per collection.
#[derive(Debug, Clone)]
pub(crate) struct RecordLayout {
    pub(crate) scalars: Vec<Column>,
    pub(crate) vectors: Vec<Column>,
}

impl RecordLayout {
    pub(crate) fn new(schema: &CollectionSchema) -> Result<Self> {
        let scalars = schema
            .fields()
            .iter()
            .map(|f| {
                Ok(Column {
                    name: f.name().to_string(),
                    c_name: c_name("field", f.name())?,
                    data_type: f.data_type(),
                    dimension: 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let vectors = schema
            .vectors()
            .iter()
            .map(|v| {
                Ok(Column {
                    name: v.name().to_string(),
                    c_name: c_name("field", v.name())?,
                    data_type: v.data_type(),
                    dimension: v.dimension() as usize,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { scalars, vectors })
    }

    pub(crate) fn vector(&self, name: &str) -> Option<&Column> {
        self.vectors.iter().find(|c| c.name == name)
    }
}

/// A record being written.
pub(crate) trait RecordSource {
    fn key(&self) -> &str;
    /// Value of the `index`-th scalar column.
    fn scalar(&self, index: usize, column: &Column) -> FieldRef<'_>;
    /// Value of the `index`-th vector column.
    fn vector(&self, index: usize, column: &Column) -> FieldRef<'_>;
}

/// A record being read.
pub(crate) trait RecordSink {
    fn set_key(&mut self, key: String);
    fn set_score(&mut self, score: f64);
    fn set_scalar(&mut self, index: usize, column: &Column, value: FieldValue);
    fn set_vector(&mut self, index: usize, column: &Column, value: Vec<f32>);
}

fn mismatch(column: &Column, value: &FieldRef<'_>) -> ZvecError {
    ZvecError::SchemaValidation(format!(
        "Field '{}' is declared as {} but the value is {:?}",
        column.name, column.data_type, value
    ))
}

fn write_scalar(engine: &dyn Engine, doc: DocHandle, column: &Column, value: FieldRef<'_>) -> Result<()> {
    let name = column.c_name.as_c_str();
    match (column.data_type, value) {
        (_, FieldRef::Null) => engine.doc_set_null(doc, name)?,
        (DataType::String, FieldRef::String(v)) => {
            engine.doc_set_string(doc, name, &c_name("value", v)?)?
        }
        (DataType::Bool, FieldRef::Bool(v)) => engine.doc_set_bool(doc, name, v)?,
        (DataType::Int32, FieldRef::Int32(v)) => engine.doc_set_int32(doc, name, v)?,
        (DataType::Int64, FieldRef::Int32(v)) => engine.doc_set_int64(doc, name, i64::from(v))?,
        (DataType::Int64, FieldRef::Int64(v)) => engine.doc_set_int64(doc, name, v)?,
        (DataType::Float, FieldRef::Float(v)) => engine.doc_set_float(doc, name, v)?,
        (DataType::Double, FieldRef::Float(v)) => engine.doc_set_double(doc, name, f64::from(v))?,
        (DataType::Double, FieldRef::Double(v)) => engine.doc_set_double(doc, name, v)?,
        (DataType::UInt32 | DataType::UInt64 | DataType::Binary, _) => {
            debug!(field = %column.name, data_type = %column.data_type, "no native setter, field not transmitted");
        }
        (data_type, _) if data_type.is_array() => {
            debug!(field = %column.name, data_type = %data_type, "no native setter, field not transmitted");
        }
        (_, other) => return Err(mismatch(column, &other)),
    }
    Ok(())
}

fn write_vector(engine: &dyn Engine, doc: DocHandle, column: &Column, value: FieldRef<'_>) -> Result<()> {
    let name = column.c_name.as_c_str();
    match (column.data_type, value) {
        (_, FieldRef::Null) => {}
        (DataType::VectorFp32, FieldRef::Array(ArrayRef::Float(v))) => engine.doc_set_vector_f32(doc, name, v)?,
        (DataType::SparseVectorFp32, FieldRef::Sparse(s)) => {
            engine.doc_set_sparse_vector_f32(doc, name, s.indices(), s.values())?
        }
        (data_type, _) => {
            warn!(
                field = %column.name,
                data_type = %data_type,
                "vector precision is not transmitted on write"
            );
        }
    }
    Ok(())
}

/// Encodes `record` into a new native document.
///
/// # Errors
///
/// `InvalidArgument` on an empty key, `SchemaValidation` when a value does
/// not fit its column, or the engine's status from a setter.
pub(crate) fn encode<'e, S: RecordSource + ?Sized>(
    engine: &'e dyn Engine,
    layout: &RecordLayout,
    record: &S,
) -> Result<OwnedDoc<'e>> {
    if record.key().is_empty() {
        return Err(ZvecError::invalid_argument(
            "id",
            "Document ID cannot be null or empty",
        ));
    }
    let key = c_name("id", record.key())?;
    let doc = OwnedDoc::adopt(engine, engine.doc_create())?;
    engine.doc_set_pk(doc.handle(), &key);

    for (index, column) in layout.scalars.iter().enumerate() {
        write_scalar(engine, doc.handle(), column, record.scalar(index, column))?;
    }
    for (index, column) in layout.vectors.iter().enumerate() {
        write_vector(engine, doc.handle(), column, record.vector(index, column))?;
    }
    Ok(doc)
}

fn read_scalar(engine: &dyn Engine, doc: DocHandle, column: &Column) -> Option<FieldValue> {
    let name = column.c_name.as_c_str();
    let value = match column.data_type {
        DataType::String => engine
            .doc_get_string(doc, name)
            .map_or(FieldValue::Null, FieldValue::String),
        DataType::Bool => FieldValue::Bool(engine.doc_get_bool(doc, name)),
        DataType::Int32 => {
            let raw = engine.doc_get_int64(doc, name);
            i32::try_from(raw).map_or(FieldValue::Int64(raw), FieldValue::Int32)
        }
        DataType::Int64 => FieldValue::Int64(engine.doc_get_int64(doc, name)),
        DataType::UInt32 => {
            let raw = engine.doc_get_int64(doc, name);
            u32::try_from(raw).map_or(FieldValue::Int64(raw), FieldValue::UInt32)
        }
        DataType::UInt64 => {
            let raw = engine.doc_get_int64(doc, name);
            u64::try_from(raw).map_or(FieldValue::Int64(raw), FieldValue::UInt64)
        }
        DataType::Float => FieldValue::Float(engine.doc_get_double(doc, name) as f32),
        DataType::Double => FieldValue::Double(engine.doc_get_double(doc, name)),
        _ => return None,
    };
    Some(value)
}

/// Reads one native record into `sink`.
pub(crate) fn decode<K: RecordSink + ?Sized>(engine: &dyn Engine, layout: &RecordLayout, doc: DocHandle, sink: &mut K) {
    sink.set_key(engine.doc_get_pk(doc).unwrap_or_default());
    sink.set_score(engine.doc_get_score(doc));

    for (index, column) in layout.scalars.iter().enumerate() {
        if !engine.doc_has_field(doc, &column.c_name) {
            continue;
        }
        if let Some(value) = read_scalar(engine, doc, column) {
            sink.set_scalar(index, column, value);
        }
    }

    for (index, column) in layout.vectors.iter().enumerate() {
        if column.data_type != DataType::VectorFp32 || column.dimension == 0 {
            continue;
        }
        if !engine.doc_has_field(doc, &column.c_name) {
            continue;
        }
        let mut buffer = vec![0.0_f32; column.dimension];
        let copied = engine.doc_get_vector_f32(doc, &column.c_name, &mut buffer);
        if copied > 0 {
            buffer.truncate(copied);
            sink.set_vector(index, column, buffer);
        }
    }
}
