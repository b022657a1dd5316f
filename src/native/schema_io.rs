// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Conversions between `CollectionSchema` and the engine's field definitions.

use std::ffi::CString;

use tracing::debug;

use crate::core::error::{Result, ZvecError};
use crate::core::index_params::{IndexParams, InvertIndexParams};
use crate::core::types::{DataType, IndexType, MetricType, QuantizeType};
use crate::native::engine::{Engine, FieldDef, SchemaHandle};
use crate::native::handles::OwnedSchema;
use crate::schema::types::{CollectionSchema, FieldSchema, VectorSchema};

/// Converts a name for the engine, rejecting interior NUL bytes.
pub(crate) fn c_name(param: &'static str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| {
        ZvecError::invalid_argument(param, format!("'{}' contains a NUL byte", value.escape_debug()))
    })
}

/// Index part of a definition for `params`. The name is left empty.
pub(crate) fn index_def(params: &IndexParams) -> FieldDef {
    let mut def = FieldDef {
        index_type: params.index_type().as_raw(),
        metric_type: params.metric().as_raw(),
        quantize_type: params.quantize().as_raw(),
        ..FieldDef::default()
    };
    match *params {
        IndexParams::Hnsw { m, ef_construction, .. } => {
            def.m = m;
            def.ef_construction = ef_construction;
        }
        IndexParams::Ivf { n_lists, .. } => def.n_lists = n_lists,
        IndexParams::Flat { .. } => {}
    }
    def
}

/// Inverted index definition for a scalar field.
pub(crate) fn invert_def(_params: InvertIndexParams) -> FieldDef {
    FieldDef {
        index_type: IndexType::Invert.as_raw(),
        ..FieldDef::default()
    }
}

pub(crate) fn scalar_def(field: &FieldSchema) -> FieldDef {
    let index = field.index_params().map(|p| invert_def(*p)).unwrap_or_default();
    FieldDef {
        name: field.name().to_string(),
        data_type: field.data_type().as_raw(),
        nullable: field.nullable(),
        ..index
    }
}

pub(crate) fn vector_def(vector: &VectorSchema) -> FieldDef {
    FieldDef {
        name: vector.name().to_string(),
        data_type: vector.data_type().as_raw(),
        dimension: vector.dimension() as i32,
        nullable: vector.nullable(),
        ..index_def(vector.index_params())
    }
}

/// Builds a native schema for `schema`. The handle is released when the guard drops.
pub(crate) fn build_schema<'e>(engine: &'e dyn Engine, schema: &CollectionSchema) -> Result<OwnedSchema<'e>> {
    let name = c_name("name", schema.name())?;
    let handle = OwnedSchema::adopt(engine, engine.schema_create(&name))?;

    for field in schema.fields() {
        engine.schema_add_field(handle.handle(), &scalar_def(field))?;
    }
    for vector in schema.vectors() {
        engine.schema_add_vector_field(handle.handle(), &vector_def(vector))?;
    }

    debug!(
        collection = schema.name(),
        fields = schema.fields().len(),
        vectors = schema.vectors().len(),
        "built native schema"
    );
    Ok(handle)
}

fn params_from_def(def: &FieldDef) -> IndexParams {
    let params = match IndexType::from_raw(def.index_type) {
        Some(IndexType::Hnsw) => IndexParams::hnsw(def.m, def.ef_construction),
        Some(IndexType::Ivf) => IndexParams::ivf(def.n_lists, 0),
        _ => IndexParams::flat(),
    };
    params
        .with_metric(MetricType::from_raw(def.metric_type).unwrap_or_default())
        .with_quantize(QuantizeType::from_raw(def.quantize_type).unwrap_or_default())
}

fn data_type_of(def: &FieldDef) -> Result<DataType> {
    DataType::from_raw(def.data_type).ok_or_else(|| {
        ZvecError::SchemaValidation(format!(
            "Field '{}' has unknown data type {}",
            def.name, def.data_type
        ))
    })
}

/// Reads a native schema back into a `CollectionSchema`.
///
/// # Errors
///
/// `SchemaValidation` when the engine reports a data type this client does not know.
pub(crate) fn read_schema(engine: &dyn Engine, handle: SchemaHandle) -> Result<CollectionSchema> {
    let name = engine.schema_get_name(handle).unwrap_or_default();

    let mut fields = Vec::new();
    for index in 0..engine.schema_field_count(handle) {
        let def = engine.schema_get_field(handle, index);
        let field = FieldSchema::new(def.name.clone(), data_type_of(&def)?, def.nullable)?;
        fields.push(if def.index_type == IndexType::Invert.as_raw() {
            field.with_index(InvertIndexParams::default())
        } else {
            field
        });
    }

    let mut vectors = Vec::new();
    for index in 0..engine.schema_vector_count(handle) {
        let def = engine.schema_get_vector(handle, index);
        vectors.push(VectorSchema::new(
            def.name.clone(),
            data_type_of(&def)?,
            def.dimension.max(0) as u32,
            Some(params_from_def(&def)),
            def.nullable,
        )?);
    }

    CollectionSchema::new(name, fields, vectors)
}
