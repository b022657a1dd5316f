// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! `Engine` over the engine's shared library, resolved at runtime.
//!
//! The library is loaded through `libloading`, so the crate builds without the
//! engine installed. Every symbol is resolved once in `NativeEngine::load` and
//! the `Library` is kept alive for as long as the engine.
//!
//! All unsafe code of the crate is contained in this module.

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::path::Path;
use std::ptr;

use libloading::{Library, Symbol};
use tracing::info;

use crate::core::error::{Result, ZvecError};
use crate::core::status::StatusCode;
use crate::native::engine::{
    CollectionHandle, DocHandle, Engine, EngineResult, FieldDef, NativeCollectionOptions, NativeStatus,
    QueryHandle, RawHandle, ResultHandle, SchemaHandle,
};

/// Platform file name of the engine library.
pub fn default_library_name() -> String {
    libloading::library_filename("zvec_c").to_string_lossy().into_owned()
}

// ── C layouts ────────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Clone, Copy)]
struct RawStatus {
    code: i32,
    message: *const c_char,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawFieldDef {
    name: *const c_char,
    data_type: i32,
    dimension: i32,
    nullable: c_int,
    index_type: i32,
    metric_type: i32,
    m: i32,
    ef_construction: i32,
    n_lists: i32,
    quantize_type: i32,
}

type Ptr = *mut c_void;

// ── Function signatures ──────────────────────────────────────────────────────

type FnVersion = unsafe extern "C" fn() -> *const c_char;
type FnCreate = unsafe extern "C" fn() -> Ptr;
type FnDestroy = unsafe extern "C" fn(Ptr);
type FnGetStr = unsafe extern "C" fn(Ptr) -> *const c_char;
type FnCount = unsafe extern "C" fn(Ptr) -> usize;
type FnStatus = unsafe extern "C" fn(Ptr) -> RawStatus;

type FnDocSetPk = unsafe extern "C" fn(Ptr, *const c_char);
type FnDocGetScore = unsafe extern "C" fn(Ptr) -> f64;
type FnDocSetString = unsafe extern "C" fn(Ptr, *const c_char, *const c_char) -> RawStatus;
type FnDocSetInt32 = unsafe extern "C" fn(Ptr, *const c_char, i32) -> RawStatus;
type FnDocSetInt64 = unsafe extern "C" fn(Ptr, *const c_char, i64) -> RawStatus;
type FnDocSetFloat = unsafe extern "C" fn(Ptr, *const c_char, f32) -> RawStatus;
type FnDocSetDouble = unsafe extern "C" fn(Ptr, *const c_char, f64) -> RawStatus;
type FnDocSetBool = unsafe extern "C" fn(Ptr, *const c_char, c_int) -> RawStatus;
type FnDocSetNull = unsafe extern "C" fn(Ptr, *const c_char) -> RawStatus;
type FnDocSetVector = unsafe extern "C" fn(Ptr, *const c_char, *const f32, usize) -> RawStatus;
type FnDocSetSparse = unsafe extern "C" fn(Ptr, *const c_char, *const u32, *const f32, usize) -> RawStatus;
type FnDocGetVector = unsafe extern "C" fn(Ptr, *const c_char, *mut f32, usize) -> usize;
type FnDocHasField = unsafe extern "C" fn(Ptr, *const c_char) -> c_int;
type FnDocGetString = unsafe extern "C" fn(Ptr, *const c_char) -> *const c_char;
type FnDocGetInt64 = unsafe extern "C" fn(Ptr, *const c_char) -> i64;
type FnDocGetDouble = unsafe extern "C" fn(Ptr, *const c_char) -> f64;
type FnDocGetBool = unsafe extern "C" fn(Ptr, *const c_char) -> c_int;

type FnSchemaCreate = unsafe extern "C" fn(*const c_char) -> Ptr;
type FnSchemaAdd = unsafe extern "C" fn(Ptr, *const RawFieldDef) -> RawStatus;
type FnSchemaGetDef = unsafe extern "C" fn(Ptr, usize) -> RawFieldDef;
type FnGetSchema = unsafe extern "C" fn(Ptr) -> Ptr;

type FnQuerySetI32 = unsafe extern "C" fn(Ptr, i32);
type FnQuerySetStr = unsafe extern "C" fn(Ptr, *const c_char);
type FnQuerySetVector = unsafe extern "C" fn(Ptr, *const f32, usize);
type FnQuerySetBool = unsafe extern "C" fn(Ptr, c_int);
type FnQuerySetFields = unsafe extern "C" fn(Ptr, *const *const c_char, usize);

type FnCreateAndOpen =
    unsafe extern "C" fn(*const c_char, Ptr, *const NativeCollectionOptions, *mut Ptr) -> RawStatus;
type FnOpen = unsafe extern "C" fn(*const c_char, *const NativeCollectionOptions, *mut Ptr) -> RawStatus;
type FnCreateIndex = unsafe extern "C" fn(Ptr, *const c_char, *const RawFieldDef) -> RawStatus;
type FnDropIndex = unsafe extern "C" fn(Ptr, *const c_char) -> RawStatus;
type FnWriteDocs = unsafe extern "C" fn(Ptr, *mut Ptr, usize) -> RawStatus;
type FnDeleteIds = unsafe extern "C" fn(Ptr, *const *const c_char, usize) -> RawStatus;
type FnDeleteByFilter = unsafe extern "C" fn(Ptr, *const c_char) -> RawStatus;
type FnQuery = unsafe extern "C" fn(Ptr, Ptr, *mut Ptr) -> RawStatus;
type FnFetch = unsafe extern "C" fn(Ptr, *const *const c_char, usize, *mut Ptr) -> RawStatus;
type FnResultGetDoc = unsafe extern "C" fn(Ptr, usize) -> Ptr;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Copies an engine-owned string. The engine keeps ownership of `ptr`.
unsafe fn copy_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

fn check(raw: RawStatus) -> EngineResult<()> {
    if raw.code == StatusCode::Ok.as_raw() {
        return Ok(());
    }
    Err(NativeStatus {
        code: raw.code,
        // Engine-owned; copied, never freed here.
        message: unsafe { copy_str(raw.message) },
    })
}

fn null_handle(what: &str) -> NativeStatus {
    NativeStatus::new(
        StatusCode::InternalError,
        format!("engine reported success but returned a null {} handle", what),
    )
}

fn raw(handle: RawHandle) -> Ptr {
    handle.as_ptr()
}

fn c_ptrs(values: &[&CStr]) -> Vec<*const c_char> {
    values.iter().map(|v| v.as_ptr()).collect()
}

/// `FieldDef` lowered to the C layout. Holds the name buffer alive for the call.
struct LoweredDef {
    _name: CString,
    raw: RawFieldDef,
}

impl LoweredDef {
    fn new(def: &FieldDef) -> EngineResult<Self> {
        let name = CString::new(def.name.as_str()).map_err(|_| {
            NativeStatus::new(
                StatusCode::InvalidArgument,
                format!("field name '{}' contains a NUL byte", def.name.escape_debug()),
            )
        })?;
        let raw = RawFieldDef {
            name: name.as_ptr(),
            data_type: def.data_type,
            dimension: def.dimension,
            nullable: c_int::from(def.nullable),
            index_type: def.index_type,
            metric_type: def.metric_type,
            m: def.m,
            ef_construction: def.ef_construction,
            n_lists: def.n_lists,
            quantize_type: def.quantize_type,
        };
        Ok(Self { _name: name, raw })
    }
}

fn lift_def(raw: RawFieldDef) -> FieldDef {
    FieldDef {
        // Borrowed from the schema handle; copied before the handle can go away.
        name: unsafe { copy_str(raw.name) }.unwrap_or_default(),
        data_type: raw.data_type,
        dimension: raw.dimension,
        nullable: raw.nullable != 0,
        index_type: raw.index_type,
        metric_type: raw.metric_type,
        m: raw.m,
        ef_construction: raw.ef_construction,
        n_lists: raw.n_lists,
        quantize_type: raw.quantize_type,
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// The engine library with every symbol resolved.
pub struct NativeEngine {
    _lib: Library, // keep alive
    path: String,

    fn_version: FnVersion,

    fn_doc_create: FnCreate,
    fn_doc_destroy: FnDestroy,
    fn_doc_set_pk: FnDocSetPk,
    fn_doc_get_pk: FnGetStr,
    fn_doc_get_score: FnDocGetScore,
    fn_doc_set_string: FnDocSetString,
    fn_doc_set_int32: FnDocSetInt32,
    fn_doc_set_int64: FnDocSetInt64,
    fn_doc_set_float: FnDocSetFloat,
    fn_doc_set_double: FnDocSetDouble,
    fn_doc_set_bool: FnDocSetBool,
    fn_doc_set_null: FnDocSetNull,
    fn_doc_set_vector_f32: FnDocSetVector,
    fn_doc_set_sparse_vector_f32: FnDocSetSparse,
    fn_doc_get_vector_f32: FnDocGetVector,
    fn_doc_has_field: FnDocHasField,
    fn_doc_get_string: FnDocGetString,
    fn_doc_get_int64: FnDocGetInt64,
    fn_doc_get_double: FnDocGetDouble,
    fn_doc_get_bool: FnDocGetBool,

    fn_schema_create: FnSchemaCreate,
    fn_schema_destroy: FnDestroy,
    fn_schema_add_field: FnSchemaAdd,
    fn_schema_add_vector_field: FnSchemaAdd,
    fn_schema_get_name: FnGetStr,
    fn_schema_field_count: FnCount,
    fn_schema_vector_count: FnCount,
    fn_schema_get_field: FnSchemaGetDef,
    fn_schema_get_vector: FnSchemaGetDef,

    fn_query_create: FnCreate,
    fn_query_destroy: FnDestroy,
    fn_query_set_topk: FnQuerySetI32,
    fn_query_set_field_name: FnQuerySetStr,
    fn_query_set_vector: FnQuerySetVector,
    fn_query_set_filter: FnQuerySetStr,
    fn_query_set_include_vector: FnQuerySetBool,
    fn_query_set_output_fields: FnQuerySetFields,
    fn_query_set_ef_search: FnQuerySetI32,
    fn_query_set_n_probe: FnQuerySetI32,

    fn_collection_create_and_open: FnCreateAndOpen,
    fn_collection_open: FnOpen,
    fn_collection_destroy: FnDestroy,
    fn_collection_destroy_data: FnStatus,
    fn_collection_flush: FnStatus,
    fn_collection_optimize: FnStatus,
    fn_collection_create_index: FnCreateIndex,
    fn_collection_drop_index: FnDropIndex,
    fn_collection_insert: FnWriteDocs,
    fn_collection_upsert: FnWriteDocs,
    fn_collection_update: FnWriteDocs,
    fn_collection_delete: FnDeleteIds,
    fn_collection_delete_by_filter: FnDeleteByFilter,
    fn_collection_query: FnQuery,
    fn_collection_fetch: FnFetch,
    fn_collection_get_schema: FnGetSchema,
    fn_collection_get_path: FnGetStr,

    fn_result_destroy: FnDestroy,
    fn_result_count: FnCount,
    fn_result_get_doc: FnResultGetDoc,
}

impl NativeEngine {
    /// Loads the engine library and resolves every entry point.
    ///
    /// # Errors
    ///
    /// `LibraryLoad` when the library cannot be opened or a symbol is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().display().to_string();
        // Safety: loading runs the library's initializers; the path is caller-chosen.
        let lib = unsafe {
            Library::new(&path).map_err(|e| ZvecError::LibraryLoad {
                path: path.clone(),
                reason: e.to_string(),
            })?
        };

        macro_rules! sym {
            ($name:literal, $ty:ty) => {
                unsafe {
                    let s: Symbol<$ty> = lib.get($name).map_err(|e| ZvecError::LibraryLoad {
                        path: format!("{}::{}", path, String::from_utf8_lossy(&$name[..$name.len() - 1])),
                        reason: e.to_string(),
                    })?;
                    *s // copy the fn pointer out of Symbol
                }
            };
        }

        let engine = Self {
            fn_version: sym!(b"zvec_version\0", FnVersion),

            fn_doc_create: sym!(b"zvec_doc_create\0", FnCreate),
            fn_doc_destroy: sym!(b"zvec_doc_destroy\0", FnDestroy),
            fn_doc_set_pk: sym!(b"zvec_doc_set_pk\0", FnDocSetPk),
            fn_doc_get_pk: sym!(b"zvec_doc_get_pk\0", FnGetStr),
            fn_doc_get_score: sym!(b"zvec_doc_get_score\0", FnDocGetScore),
            fn_doc_set_string: sym!(b"zvec_doc_set_string\0", FnDocSetString),
            fn_doc_set_int32: sym!(b"zvec_doc_set_int32\0", FnDocSetInt32),
            fn_doc_set_int64: sym!(b"zvec_doc_set_int64\0", FnDocSetInt64),
            fn_doc_set_float: sym!(b"zvec_doc_set_float\0", FnDocSetFloat),
            fn_doc_set_double: sym!(b"zvec_doc_set_double\0", FnDocSetDouble),
            fn_doc_set_bool: sym!(b"zvec_doc_set_bool\0", FnDocSetBool),
            fn_doc_set_null: sym!(b"zvec_doc_set_null\0", FnDocSetNull),
            fn_doc_set_vector_f32: sym!(b"zvec_doc_set_vector_f32\0", FnDocSetVector),
            fn_doc_set_sparse_vector_f32: sym!(b"zvec_doc_set_sparse_vector_f32\0", FnDocSetSparse),
            fn_doc_get_vector_f32: sym!(b"zvec_doc_get_vector_f32\0", FnDocGetVector),
            fn_doc_has_field: sym!(b"zvec_doc_has_field\0", FnDocHasField),
            fn_doc_get_string: sym!(b"zvec_doc_get_string\0", FnDocGetString),
            fn_doc_get_int64: sym!(b"zvec_doc_get_int64\0", FnDocGetInt64),
            fn_doc_get_double: sym!(b"zvec_doc_get_double\0", FnDocGetDouble),
            fn_doc_get_bool: sym!(b"zvec_doc_get_bool\0", FnDocGetBool),

            fn_schema_create: sym!(b"zvec_schema_create\0", FnSchemaCreate),
            fn_schema_destroy: sym!(b"zvec_schema_destroy\0", FnDestroy),
            fn_schema_add_field: sym!(b"zvec_schema_add_field\0", FnSchemaAdd),
            fn_schema_add_vector_field: sym!(b"zvec_schema_add_vector_field\0", FnSchemaAdd),
            fn_schema_get_name: sym!(b"zvec_schema_get_name\0", FnGetStr),
            fn_schema_field_count: sym!(b"zvec_schema_get_field_count\0", FnCount),
            fn_schema_vector_count: sym!(b"zvec_schema_get_vector_count\0", FnCount),
            fn_schema_get_field: sym!(b"zvec_schema_get_field\0", FnSchemaGetDef),
            fn_schema_get_vector: sym!(b"zvec_schema_get_vector\0", FnSchemaGetDef),

            fn_query_create: sym!(b"zvec_query_create\0", FnCreate),
            fn_query_destroy: sym!(b"zvec_query_destroy\0", FnDestroy),
            fn_query_set_topk: sym!(b"zvec_query_set_topk\0", FnQuerySetI32),
            fn_query_set_field_name: sym!(b"zvec_query_set_field_name\0", FnQuerySetStr),
            fn_query_set_vector: sym!(b"zvec_query_set_vector\0", FnQuerySetVector),
            fn_query_set_filter: sym!(b"zvec_query_set_filter\0", FnQuerySetStr),
            fn_query_set_include_vector: sym!(b"zvec_query_set_include_vector\0", FnQuerySetBool),
            fn_query_set_output_fields: sym!(b"zvec_query_set_output_fields\0", FnQuerySetFields),
            fn_query_set_ef_search: sym!(b"zvec_query_set_ef_search\0", FnQuerySetI32),
            fn_query_set_n_probe: sym!(b"zvec_query_set_n_probe\0", FnQuerySetI32),

            fn_collection_create_and_open: sym!(b"zvec_collection_create_and_open\0", FnCreateAndOpen),
            fn_collection_open: sym!(b"zvec_collection_open\0", FnOpen),
            fn_collection_destroy: sym!(b"zvec_collection_destroy\0", FnDestroy),
            fn_collection_destroy_data: sym!(b"zvec_collection_destroy_data\0", FnStatus),
            fn_collection_flush: sym!(b"zvec_collection_flush\0", FnStatus),
            fn_collection_optimize: sym!(b"zvec_collection_optimize\0", FnStatus),
            fn_collection_create_index: sym!(b"zvec_collection_create_index\0", FnCreateIndex),
            fn_collection_drop_index: sym!(b"zvec_collection_drop_index\0", FnDropIndex),
            fn_collection_insert: sym!(b"zvec_collection_insert\0", FnWriteDocs),
            fn_collection_upsert: sym!(b"zvec_collection_upsert\0", FnWriteDocs),
            fn_collection_update: sym!(b"zvec_collection_update\0", FnWriteDocs),
            fn_collection_delete: sym!(b"zvec_collection_delete\0", FnDeleteIds),
            fn_collection_delete_by_filter: sym!(b"zvec_collection_delete_by_filter\0", FnDeleteByFilter),
            fn_collection_query: sym!(b"zvec_collection_query\0", FnQuery),
            fn_collection_fetch: sym!(b"zvec_collection_fetch\0", FnFetch),
            fn_collection_get_schema: sym!(b"zvec_collection_get_schema\0", FnGetSchema),
            fn_collection_get_path: sym!(b"zvec_collection_get_path\0", FnGetStr),

            fn_result_destroy: sym!(b"zvec_result_destroy\0", FnDestroy),
            fn_result_count: sym!(b"zvec_result_count\0", FnCount),
            fn_result_get_doc: sym!(b"zvec_result_get_doc\0", FnResultGetDoc),

            path: path.clone(),
            _lib: lib,
        };

        info!(library = %engine.path, version = %engine.version(), "Loaded zvec engine");
        Ok(engine)
    }

    pub fn library_path(&self) -> &str {
        &self.path
    }

    fn write_docs(&self, f: FnWriteDocs, collection: CollectionHandle, docs: &[DocHandle]) -> EngineResult<()> {
        let mut ptrs: Vec<Ptr> = docs.iter().map(|d| raw(d.0)).collect();
        check(unsafe { f(raw(collection.0), ptrs.as_mut_ptr(), ptrs.len()) })
    }

    fn adopt_out<H>(status: RawStatus, out: Ptr, what: &str, wrap: fn(RawHandle) -> H) -> EngineResult<H> {
        check(status)?;
        RawHandle::from_ptr(out).map(wrap).ok_or_else(|| null_handle(what))
    }
}

impl std::fmt::Debug for NativeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEngine").field("path", &self.path).finish()
    }
}

impl Engine for NativeEngine {
    fn version(&self) -> String {
        unsafe { copy_str((self.fn_version)()) }.unwrap_or_default()
    }

    fn doc_create(&self) -> Option<DocHandle> {
        RawHandle::from_ptr(unsafe { (self.fn_doc_create)() }).map(DocHandle)
    }

    fn doc_destroy(&self, doc: DocHandle) {
        unsafe { (self.fn_doc_destroy)(raw(doc.0)) }
    }

    fn doc_set_pk(&self, doc: DocHandle, pk: &CStr) {
        unsafe { (self.fn_doc_set_pk)(raw(doc.0), pk.as_ptr()) }
    }

    fn doc_get_pk(&self, doc: DocHandle) -> Option<String> {
        unsafe { copy_str((self.fn_doc_get_pk)(raw(doc.0))) }
    }

    fn doc_get_score(&self, doc: DocHandle) -> f64 {
        unsafe { (self.fn_doc_get_score)(raw(doc.0)) }
    }

    fn doc_set_string(&self, doc: DocHandle, field: &CStr, value: &CStr) -> EngineResult<()> {
        check(unsafe { (self.fn_doc_set_string)(raw(doc.0), field.as_ptr(), value.as_ptr()) })
    }

    fn doc_set_int32(&self, doc: DocHandle, field: &CStr, value: i32) -> EngineResult<()> {
        check(unsafe { (self.fn_doc_set_int32)(raw(doc.0), field.as_ptr(), value) })
    }

    fn doc_set_int64(&self, doc: DocHandle, field: &CStr, value: i64) -> EngineResult<()> {
        check(unsafe { (self.fn_doc_set_int64)(raw(doc.0), field.as_ptr(), value) })
    }

    fn doc_set_float(&self, doc: DocHandle, field: &CStr, value: f32) -> EngineResult<()> {
        check(unsafe { (self.fn_doc_set_float)(raw(doc.0), field.as_ptr(), value) })
    }

    fn doc_set_double(&self, doc: DocHandle, field: &CStr, value: f64) -> EngineResult<()> {
        check(unsafe { (self.fn_doc_set_double)(raw(doc.0), field.as_ptr(), value) })
    }

    fn doc_set_bool(&self, doc: DocHandle, field: &CStr, value: bool) -> EngineResult<()> {
        check(unsafe { (self.fn_doc_set_bool)(raw(doc.0), field.as_ptr(), c_int::from(value)) })
    }

    fn doc_set_null(&self, doc: DocHandle, field: &CStr) -> EngineResult<()> {
        check(unsafe { (self.fn_doc_set_null)(raw(doc.0), field.as_ptr()) })
    }

    fn doc_set_vector_f32(&self, doc: DocHandle, field: &CStr, data: &[f32]) -> EngineResult<()> {
        // `data` stays borrowed, and therefore fixed in place, for the whole call.
        check(unsafe { (self.fn_doc_set_vector_f32)(raw(doc.0), field.as_ptr(), data.as_ptr(), data.len()) })
    }

    fn doc_set_sparse_vector_f32(
        &self,
        doc: DocHandle,
        field: &CStr,
        indices: &[u32],
        values: &[f32],
    ) -> EngineResult<()> {
        if indices.len() != values.len() {
            return Err(NativeStatus::new(
                StatusCode::InvalidArgument,
                "sparse indices and values differ in length",
            ));
        }
        check(unsafe {
            (self.fn_doc_set_sparse_vector_f32)(
                raw(doc.0),
                field.as_ptr(),
                indices.as_ptr(),
                values.as_ptr(),
                indices.len(),
            )
        })
    }

    fn doc_get_vector_f32(&self, doc: DocHandle, field: &CStr, out: &mut [f32]) -> usize {
        let copied = unsafe { (self.fn_doc_get_vector_f32)(raw(doc.0), field.as_ptr(), out.as_mut_ptr(), out.len()) };
        copied.min(out.len())
    }

    fn doc_has_field(&self, doc: DocHandle, field: &CStr) -> bool {
        unsafe { (self.fn_doc_has_field)(raw(doc.0), field.as_ptr()) != 0 }
    }

    fn doc_get_string(&self, doc: DocHandle, field: &CStr) -> Option<String> {
        unsafe { copy_str((self.fn_doc_get_string)(raw(doc.0), field.as_ptr())) }
    }

    fn doc_get_int64(&self, doc: DocHandle, field: &CStr) -> i64 {
        unsafe { (self.fn_doc_get_int64)(raw(doc.0), field.as_ptr()) }
    }

    fn doc_get_double(&self, doc: DocHandle, field: &CStr) -> f64 {
        unsafe { (self.fn_doc_get_double)(raw(doc.0), field.as_ptr()) }
    }

    fn doc_get_bool(&self, doc: DocHandle, field: &CStr) -> bool {
        unsafe { (self.fn_doc_get_bool)(raw(doc.0), field.as_ptr()) != 0 }
    }

    fn schema_create(&self, name: &CStr) -> Option<SchemaHandle> {
        RawHandle::from_ptr(unsafe { (self.fn_schema_create)(name.as_ptr()) }).map(SchemaHandle)
    }

    fn schema_destroy(&self, schema: SchemaHandle) {
        unsafe { (self.fn_schema_destroy)(raw(schema.0)) }
    }

    fn schema_add_field(&self, schema: SchemaHandle, def: &FieldDef) -> EngineResult<()> {
        let lowered = LoweredDef::new(def)?;
        check(unsafe { (self.fn_schema_add_field)(raw(schema.0), &lowered.raw) })
    }

    fn schema_add_vector_field(&self, schema: SchemaHandle, def: &FieldDef) -> EngineResult<()> {
        let lowered = LoweredDef::new(def)?;
        check(unsafe { (self.fn_schema_add_vector_field)(raw(schema.0), &lowered.raw) })
    }

    fn schema_get_name(&self, schema: SchemaHandle) -> Option<String> {
        unsafe { copy_str((self.fn_schema_get_name)(raw(schema.0))) }
    }

    fn schema_field_count(&self, schema: SchemaHandle) -> usize {
        unsafe { (self.fn_schema_field_count)(raw(schema.0)) }
    }

    fn schema_vector_count(&self, schema: SchemaHandle) -> usize {
        unsafe { (self.fn_schema_vector_count)(raw(schema.0)) }
    }

    fn schema_get_field(&self, schema: SchemaHandle, index: usize) -> FieldDef {
        lift_def(unsafe { (self.fn_schema_get_field)(raw(schema.0), index) })
    }

    fn schema_get_vector(&self, schema: SchemaHandle, index: usize) -> FieldDef {
        lift_def(unsafe { (self.fn_schema_get_vector)(raw(schema.0), index) })
    }

    fn query_create(&self) -> Option<QueryHandle> {
        RawHandle::from_ptr(unsafe { (self.fn_query_create)() }).map(QueryHandle)
    }

    fn query_destroy(&self, query: QueryHandle) {
        unsafe { (self.fn_query_destroy)(raw(query.0)) }
    }

    fn query_set_topk(&self, query: QueryHandle, topk: i32) {
        unsafe { (self.fn_query_set_topk)(raw(query.0), topk) }
    }

    fn query_set_field_name(&self, query: QueryHandle, field: &CStr) {
        unsafe { (self.fn_query_set_field_name)(raw(query.0), field.as_ptr()) }
    }

    fn query_set_vector(&self, query: QueryHandle, data: &[f32]) {
        unsafe { (self.fn_query_set_vector)(raw(query.0), data.as_ptr(), data.len()) }
    }

    fn query_set_filter(&self, query: QueryHandle, filter: &CStr) {
        unsafe { (self.fn_query_set_filter)(raw(query.0), filter.as_ptr()) }
    }

    fn query_set_include_vector(&self, query: QueryHandle, include: bool) {
        unsafe { (self.fn_query_set_include_vector)(raw(query.0), c_int::from(include)) }
    }

    fn query_set_output_fields(&self, query: QueryHandle, fields: &[&CStr]) {
        let ptrs = c_ptrs(fields);
        unsafe { (self.fn_query_set_output_fields)(raw(query.0), ptrs.as_ptr(), ptrs.len()) }
    }

    fn query_set_ef_search(&self, query: QueryHandle, ef: i32) {
        unsafe { (self.fn_query_set_ef_search)(raw(query.0), ef) }
    }

    fn query_set_n_probe(&self, query: QueryHandle, n_probe: i32) {
        unsafe { (self.fn_query_set_n_probe)(raw(query.0), n_probe) }
    }

    fn collection_create_and_open(
        &self,
        path: &CStr,
        schema: SchemaHandle,
        options: &NativeCollectionOptions,
    ) -> EngineResult<CollectionHandle> {
        let mut out: Ptr = ptr::null_mut();
        let status = unsafe { (self.fn_collection_create_and_open)(path.as_ptr(), raw(schema.0), options, &mut out) };
        Self::adopt_out(status, out, "collection", CollectionHandle)
    }

    fn collection_open(&self, path: &CStr, options: &NativeCollectionOptions) -> EngineResult<CollectionHandle> {
        let mut out: Ptr = ptr::null_mut();
        let status = unsafe { (self.fn_collection_open)(path.as_ptr(), options, &mut out) };
        Self::adopt_out(status, out, "collection", CollectionHandle)
    }

    fn collection_destroy(&self, collection: CollectionHandle) {
        unsafe { (self.fn_collection_destroy)(raw(collection.0)) }
    }

    fn collection_destroy_data(&self, collection: CollectionHandle) -> EngineResult<()> {
        check(unsafe { (self.fn_collection_destroy_data)(raw(collection.0)) })
    }

    fn collection_flush(&self, collection: CollectionHandle) -> EngineResult<()> {
        check(unsafe { (self.fn_collection_flush)(raw(collection.0)) })
    }

    fn collection_optimize(&self, collection: CollectionHandle) -> EngineResult<()> {
        check(unsafe { (self.fn_collection_optimize)(raw(collection.0)) })
    }

    fn collection_create_index(&self, collection: CollectionHandle, field: &CStr, def: &FieldDef) -> EngineResult<()> {
        let lowered = LoweredDef::new(def)?;
        check(unsafe { (self.fn_collection_create_index)(raw(collection.0), field.as_ptr(), &lowered.raw) })
    }

    fn collection_drop_index(&self, collection: CollectionHandle, field: &CStr) -> EngineResult<()> {
        check(unsafe { (self.fn_collection_drop_index)(raw(collection.0), field.as_ptr()) })
    }

    fn collection_insert(&self, collection: CollectionHandle, docs: &[DocHandle]) -> EngineResult<()> {
        self.write_docs(self.fn_collection_insert, collection, docs)
    }

    fn collection_upsert(&self, collection: CollectionHandle, docs: &[DocHandle]) -> EngineResult<()> {
        self.write_docs(self.fn_collection_upsert, collection, docs)
    }

    fn collection_update(&self, collection: CollectionHandle, docs: &[DocHandle]) -> EngineResult<()> {
        self.write_docs(self.fn_collection_update, collection, docs)
    }

    fn collection_delete(&self, collection: CollectionHandle, ids: &[&CStr]) -> EngineResult<()> {
        let ptrs = c_ptrs(ids);
        check(unsafe { (self.fn_collection_delete)(raw(collection.0), ptrs.as_ptr(), ptrs.len()) })
    }

    fn collection_delete_by_filter(&self, collection: CollectionHandle, filter: &CStr) -> EngineResult<()> {
        check(unsafe { (self.fn_collection_delete_by_filter)(raw(collection.0), filter.as_ptr()) })
    }

    fn collection_query(&self, collection: CollectionHandle, query: QueryHandle) -> EngineResult<ResultHandle> {
        let mut out: Ptr = ptr::null_mut();
        let status = unsafe { (self.fn_collection_query)(raw(collection.0), raw(query.0), &mut out) };
        Self::adopt_out(status, out, "result", ResultHandle)
    }

    fn collection_fetch(&self, collection: CollectionHandle, ids: &[&CStr]) -> EngineResult<ResultHandle> {
        let ptrs = c_ptrs(ids);
        let mut out: Ptr = ptr::null_mut();
        let status = unsafe { (self.fn_collection_fetch)(raw(collection.0), ptrs.as_ptr(), ptrs.len(), &mut out) };
        Self::adopt_out(status, out, "result", ResultHandle)
    }

    fn collection_get_schema(&self, collection: CollectionHandle) -> Option<SchemaHandle> {
        RawHandle::from_ptr(unsafe { (self.fn_collection_get_schema)(raw(collection.0)) }).map(SchemaHandle)
    }

    fn collection_get_path(&self, collection: CollectionHandle) -> Option<String> {
        unsafe { copy_str((self.fn_collection_get_path)(raw(collection.0))) }
    }

    fn result_destroy(&self, result: ResultHandle) {
        unsafe { (self.fn_result_destroy)(raw(result.0)) }
    }

    fn result_count(&self, result: ResultHandle) -> usize {
        unsafe { (self.fn_result_count)(raw(result.0)) }
    }

    fn result_get_doc(&self, result: ResultHandle, index: usize) -> Option<DocHandle> {
        RawHandle::from_ptr(unsafe { (self.fn_result_get_doc)(raw(result.0), index) }).map(DocHandle)
    }
}
