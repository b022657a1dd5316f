// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! The engine boundary
//!
//! `Engine` mirrors the engine's C surface call for call. Handles are opaque,
//! non-null and typed per category; names are passed as `&CStr` so callers can
//! build them once and reuse them across a batch. Fallible calls return
//! `EngineResult`, whose error carries the raw code and a copy of the engine's
//! message.
//!
//! Documents returned by `result_get_doc` belong to the result set and are
//! released with it. Every other handle is released by its matching
//! `*_destroy` call.

use std::ffi::{c_int, CStr};
use std::fmt;
use std::num::NonZeroUsize;

use crate::core::error::ZvecError;
use crate::core::status::{Status, StatusCode};

/// Opaque, non-null engine pointer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonZeroUsize);

impl RawHandle {
    pub fn from_ptr<P>(ptr: *mut P) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(RawHandle)
    }

    pub fn from_usize(value: usize) -> Option<Self> {
        NonZeroUsize::new(value).map(RawHandle)
    }

    pub fn as_ptr<P>(self) -> *mut P {
        self.0.get() as *mut P
    }

    pub fn as_usize(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

macro_rules! handle_types {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub RawHandle);

            impl $name {
                pub fn raw(self) -> RawHandle {
                    self.0
                }
            }
        )*
    };
}

handle_types! {
    /// Native document.
    DocHandle,
    /// Native schema under construction or read back from a collection.
    SchemaHandle,
    /// Native query.
    QueryHandle,
    /// Open collection.
    CollectionHandle,
    /// Result set of a query or fetch.
    ResultHandle,
}

/// Error half of a fallible engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeStatus {
    pub code: i32,
    pub message: Option<String>,
}

impl NativeStatus {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_raw(),
            message: Some(message.into()),
        }
    }

    pub fn status(&self) -> Status {
        Status::from_raw(self.code, self.message.clone())
    }
}

impl From<NativeStatus> for ZvecError {
    fn from(status: NativeStatus) -> Self {
        let status = Status::from_raw(status.code, status.message);
        ZvecError::Engine {
            code: status.code,
            message: status.message,
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, NativeStatus>;

/// Column or index definition exchanged with the engine.
///
/// Enumerations are kept as wire values; `native::schema_io` converts them.
/// Metric, quantization and the index parameters are meaningful only for
/// vector columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldDef {
    pub name: String,
    pub data_type: i32,
    pub dimension: i32,
    pub nullable: bool,
    pub index_type: i32,
    pub metric_type: i32,
    pub m: i32,
    pub ef_construction: i32,
    pub n_lists: i32,
    pub quantize_type: i32,
}

/// Fixed-layout collection options passed at create/open time.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeCollectionOptions {
    pub segment_max_docs: i32,
    pub index_build_parallel: i32,
    pub auto_flush: c_int,
}

/// The engine's C surface.
pub trait Engine: Send + Sync {
    fn version(&self) -> String;

    // ── Documents ────────────────────────────────────────────────────────────

    fn doc_create(&self) -> Option<DocHandle>;
    fn doc_destroy(&self, doc: DocHandle);
    fn doc_set_pk(&self, doc: DocHandle, pk: &CStr);
    fn doc_get_pk(&self, doc: DocHandle) -> Option<String>;
    fn doc_get_score(&self, doc: DocHandle) -> f64;

    fn doc_set_string(&self, doc: DocHandle, field: &CStr, value: &CStr) -> EngineResult<()>;
    fn doc_set_int32(&self, doc: DocHandle, field: &CStr, value: i32) -> EngineResult<()>;
    fn doc_set_int64(&self, doc: DocHandle, field: &CStr, value: i64) -> EngineResult<()>;
    fn doc_set_float(&self, doc: DocHandle, field: &CStr, value: f32) -> EngineResult<()>;
    fn doc_set_double(&self, doc: DocHandle, field: &CStr, value: f64) -> EngineResult<()>;
    fn doc_set_bool(&self, doc: DocHandle, field: &CStr, value: bool) -> EngineResult<()>;
    fn doc_set_null(&self, doc: DocHandle, field: &CStr) -> EngineResult<()>;
    fn doc_set_vector_f32(&self, doc: DocHandle, field: &CStr, data: &[f32]) -> EngineResult<()>;
    fn doc_set_sparse_vector_f32(
        &self,
        doc: DocHandle,
        field: &CStr,
        indices: &[u32],
        values: &[f32],
    ) -> EngineResult<()>;

    /// Copies up to `out.len()` elements and returns how many were copied.
    fn doc_get_vector_f32(&self, doc: DocHandle, field: &CStr, out: &mut [f32]) -> usize;
    /// True when the document carries a non-null value for the field. A field
    /// marked with `doc_set_null` reports false so it decodes as absent.
    fn doc_has_field(&self, doc: DocHandle, field: &CStr) -> bool;
    fn doc_get_string(&self, doc: DocHandle, field: &CStr) -> Option<String>;
    fn doc_get_int64(&self, doc: DocHandle, field: &CStr) -> i64;
    fn doc_get_double(&self, doc: DocHandle, field: &CStr) -> f64;
    fn doc_get_bool(&self, doc: DocHandle, field: &CStr) -> bool;

    // ── Schemas ──────────────────────────────────────────────────────────────

    fn schema_create(&self, name: &CStr) -> Option<SchemaHandle>;
    fn schema_destroy(&self, schema: SchemaHandle);
    fn schema_add_field(&self, schema: SchemaHandle, def: &FieldDef) -> EngineResult<()>;
    fn schema_add_vector_field(&self, schema: SchemaHandle, def: &FieldDef) -> EngineResult<()>;
    fn schema_get_name(&self, schema: SchemaHandle) -> Option<String>;
    fn schema_field_count(&self, schema: SchemaHandle) -> usize;
    fn schema_vector_count(&self, schema: SchemaHandle) -> usize;
    fn schema_get_field(&self, schema: SchemaHandle, index: usize) -> FieldDef;
    fn schema_get_vector(&self, schema: SchemaHandle, index: usize) -> FieldDef;

    // ── Queries ──────────────────────────────────────────────────────────────

    fn query_create(&self) -> Option<QueryHandle>;
    fn query_destroy(&self, query: QueryHandle);
    fn query_set_topk(&self, query: QueryHandle, topk: i32);
    fn query_set_field_name(&self, query: QueryHandle, field: &CStr);
    fn query_set_vector(&self, query: QueryHandle, data: &[f32]);
    fn query_set_filter(&self, query: QueryHandle, filter: &CStr);
    fn query_set_include_vector(&self, query: QueryHandle, include: bool);
    fn query_set_output_fields(&self, query: QueryHandle, fields: &[&CStr]);
    fn query_set_ef_search(&self, query: QueryHandle, ef: i32);
    fn query_set_n_probe(&self, query: QueryHandle, n_probe: i32);

    // ── Collections ──────────────────────────────────────────────────────────

    fn collection_create_and_open(
        &self,
        path: &CStr,
        schema: SchemaHandle,
        options: &NativeCollectionOptions,
    ) -> EngineResult<CollectionHandle>;
    fn collection_open(&self, path: &CStr, options: &NativeCollectionOptions) -> EngineResult<CollectionHandle>;
    fn collection_destroy(&self, collection: CollectionHandle);
    fn collection_destroy_data(&self, collection: CollectionHandle) -> EngineResult<()>;
    fn collection_flush(&self, collection: CollectionHandle) -> EngineResult<()>;
    fn collection_optimize(&self, collection: CollectionHandle) -> EngineResult<()>;
    fn collection_create_index(&self, collection: CollectionHandle, field: &CStr, def: &FieldDef) -> EngineResult<()>;
    fn collection_drop_index(&self, collection: CollectionHandle, field: &CStr) -> EngineResult<()>;
    fn collection_insert(&self, collection: CollectionHandle, docs: &[DocHandle]) -> EngineResult<()>;
    fn collection_upsert(&self, collection: CollectionHandle, docs: &[DocHandle]) -> EngineResult<()>;
    fn collection_update(&self, collection: CollectionHandle, docs: &[DocHandle]) -> EngineResult<()>;
    fn collection_delete(&self, collection: CollectionHandle, ids: &[&CStr]) -> EngineResult<()>;
    fn collection_delete_by_filter(&self, collection: CollectionHandle, filter: &CStr) -> EngineResult<()>;
    fn collection_query(&self, collection: CollectionHandle, query: QueryHandle) -> EngineResult<ResultHandle>;
    fn collection_fetch(&self, collection: CollectionHandle, ids: &[&CStr]) -> EngineResult<ResultHandle>;
    fn collection_get_schema(&self, collection: CollectionHandle) -> Option<SchemaHandle>;
    fn collection_get_path(&self, collection: CollectionHandle) -> Option<String>;

    // ── Results ──────────────────────────────────────────────────────────────

    fn result_destroy(&self, result: ResultHandle);
    fn result_count(&self, result: ResultHandle) -> usize;
    /// Document owned by the result set; never destroy it separately.
    fn result_get_doc(&self, result: ResultHandle, index: usize) -> Option<DocHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_handle_rejects_null() {
        assert!(RawHandle::from_ptr(std::ptr::null_mut::<u8>()).is_none());
        assert!(RawHandle::from_usize(0).is_none());
        let handle = RawHandle::from_usize(0x40).unwrap();
        assert_eq!(handle.as_usize(), 0x40);
        assert_eq!(handle.as_ptr::<u8>() as usize, 0x40);
        assert_eq!(format!("{:?}", handle), "0x40");
    }

    #[test]
    fn test_native_status_converts_to_engine_error() {
        let err: ZvecError = NativeStatus::new(StatusCode::NotFound, "no such collection").into();
        assert_eq!(err.to_string(), "[NotFound] no such collection");

        let silent: ZvecError = NativeStatus {
            code: 5,
            message: None,
        }
        .into();
        assert_eq!(silent.status_code(), StatusCode::InternalError);
        assert!(silent.to_string().contains("without a message"));
    }
}
