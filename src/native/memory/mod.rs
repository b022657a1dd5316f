// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! In-process engine
//!
//! `MemoryEngine` implements the full `Engine` contract without the native
//! library: collections live in a map keyed by path, queries are brute-force
//! over dense fp32 vectors under the field's metric, and filters are evaluated
//! with the same grammar the compiler emits.
//!
//! It also keeps a call log, counts live handles per category, counts releases
//! of unknown or result-owned handles, and accepts one-shot faults so tests can
//! drive error paths.

mod predicate;

use std::collections::{BTreeMap, HashMap};
use std::ffi::CStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::status::StatusCode;
use crate::core::types::{DataType, IndexType, MetricType};
use crate::native::engine::{
    CollectionHandle, DocHandle, Engine, EngineResult, FieldDef, NativeCollectionOptions, NativeStatus,
    QueryHandle, RawHandle, ResultHandle, SchemaHandle,
};

pub const MEMORY_ENGINE_VERSION: &str = "0.2.0-memory";

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Null,
    String(String),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    VectorF32(Vec<f32>),
    SparseF32(Vec<u32>, Vec<f32>),
}

impl Value {
    fn is_vector(&self) -> bool {
        matches!(self, Value::VectorF32(_) | Value::SparseF32(..))
    }
}

#[derive(Debug, Clone, Default)]
struct Record {
    pk: String,
    score: f64,
    fields: BTreeMap<String, Value>,
}

struct DocSlot {
    record: Record,
    result_owned: bool,
}

#[derive(Debug, Clone, Default)]
struct SchemaState {
    name: String,
    fields: Vec<FieldDef>,
    vectors: Vec<FieldDef>,
}

impl SchemaState {
    fn column(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().chain(self.vectors.iter()).find(|f| f.name == name)
    }
}

/// Query settings as received by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedQuery {
    pub topk: i32,
    pub field_name: Option<String>,
    pub vector: Vec<f32>,
    pub filter: Option<String>,
    pub include_vector: bool,
    pub output_fields: Vec<String>,
    pub ef_search: i32,
    pub n_probe: i32,
}

struct Store {
    schema: SchemaState,
    records: BTreeMap<String, Record>,
    options: NativeCollectionOptions,
}

/// Handles currently alive, per category. Documents owned by result sets are
/// not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveHandles {
    pub docs: usize,
    pub schemas: usize,
    pub queries: usize,
    pub results: usize,
    pub collections: usize,
}

impl LiveHandles {
    pub fn is_empty(&self) -> bool {
        *self == LiveHandles::default()
    }
}

#[derive(Default)]
struct State {
    docs: HashMap<usize, DocSlot>,
    schemas: HashMap<usize, SchemaState>,
    queries: HashMap<usize, RecordedQuery>,
    results: HashMap<usize, Vec<usize>>,
    collections: HashMap<usize, String>,
    stores: HashMap<String, Store>,
    calls: Vec<String>,
    faults: Vec<(String, NativeStatus)>,
    last_query: Option<RecordedQuery>,
    last_delete_filter: Option<String>,
    invalid_releases: usize,
}

impl State {
    fn take_fault(&mut self, op: &str) -> EngineResult<()> {
        match self.faults.iter().position(|(name, _)| name == op) {
            Some(index) => Err(self.faults.remove(index).1),
            None => Ok(()),
        }
    }

    fn store_for(&mut self, collection: CollectionHandle) -> EngineResult<&mut Store> {
        let path = self
            .collections
            .get(&collection.0.as_usize())
            .ok_or_else(|| invalid("unknown collection handle"))?
            .clone();
        self.stores
            .get_mut(&path)
            .ok_or_else(|| NativeStatus::new(StatusCode::NotFound, format!("collection data at '{}' was destroyed", path)))
    }

    fn doc_mut(&mut self, doc: DocHandle) -> EngineResult<&mut DocSlot> {
        self.docs
            .get_mut(&doc.0.as_usize())
            .ok_or_else(|| invalid("unknown document handle"))
    }

    fn field_of(&self, doc: DocHandle, field: &CStr) -> Option<&Value> {
        let slot = self.docs.get(&doc.0.as_usize())?;
        slot.record.fields.get(field.to_string_lossy().as_ref())
    }
}

fn invalid(message: impl Into<String>) -> NativeStatus {
    NativeStatus::new(StatusCode::InvalidArgument, message)
}

fn lossy(value: &CStr) -> String {
    value.to_string_lossy().into_owned()
}

/// In-process implementation of the engine contract.
pub struct MemoryEngine {
    state: Mutex<State>,
    next_handle: AtomicUsize,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            next_handle: AtomicUsize::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate(&self) -> RawHandle {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and never wraps in practice.
        RawHandle::from_usize(id.max(1)).unwrap_or_else(|| unreachable!("handle ids start at 1"))
    }

    /// Names of the calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of calls named `op`.
    pub fn call_count(&self, op: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.as_str() == op).count()
    }

    pub fn live_handles(&self) -> LiveHandles {
        let state = self.lock();
        LiveHandles {
            docs: state.docs.values().filter(|d| !d.result_owned).count(),
            schemas: state.schemas.len(),
            queries: state.queries.len(),
            results: state.results.len(),
            collections: state.collections.len(),
        }
    }

    /// Releases of handles that were unknown, already released, or owned by a result set.
    pub fn invalid_releases(&self) -> usize {
        self.lock().invalid_releases
    }

    /// Makes the next call named `op` fail with `code` and `message`.
    pub fn fail_next(&self, op: &str, code: StatusCode, message: &str) {
        self.lock()
            .faults
            .push((op.to_string(), NativeStatus::new(code, message)));
    }

    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.lock().last_query.clone()
    }

    pub fn last_delete_filter(&self) -> Option<String> {
        self.lock().last_delete_filter.clone()
    }

    /// Number of documents stored at `path`, if the collection exists.
    pub fn stored_count(&self, path: &str) -> Option<usize> {
        self.lock().stores.get(path).map(|s| s.records.len())
    }

    pub fn collection_options(&self, path: &str) -> Option<NativeCollectionOptions> {
        self.lock().stores.get(path).map(|s| s.options)
    }

    fn record_call(&self, op: &str) -> MutexGuard<'_, State> {
        let mut state = self.lock();
        state.calls.push(op.to_string());
        state
    }

    fn set_value(&self, op: &str, doc: DocHandle, field: &CStr, value: Value) -> EngineResult<()> {
        let mut state = self.record_call(op);
        state.take_fault(op)?;
        let slot = state.doc_mut(doc)?;
        slot.record.fields.insert(lossy(field), value);
        Ok(())
    }

    fn write_docs(&self, op: &str, collection: CollectionHandle, docs: &[DocHandle]) -> EngineResult<()> {
        let mut state = self.record_call(op);
        state.take_fault(op)?;

        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            let slot = state
                .docs
                .get(&doc.0.as_usize())
                .ok_or_else(|| invalid("unknown document handle in batch"))?;
            records.push(slot.record.clone());
        }

        let store = state.store_for(collection)?;
        for record in &records {
            validate_record(&store.schema, record)?;
            let exists = store.records.contains_key(&record.pk);
            match op {
                "collection_insert" if exists => {
                    return Err(NativeStatus::new(
                        StatusCode::AlreadyExists,
                        format!("document '{}' already exists", record.pk),
                    ))
                }
                "collection_update" if !exists => {
                    return Err(NativeStatus::new(
                        StatusCode::NotFound,
                        format!("document '{}' does not exist", record.pk),
                    ))
                }
                _ => {}
            }
        }

        for mut record in records {
            record.score = 0.0;
            if op == "collection_update" {
                if let Some(existing) = store.records.get_mut(&record.pk) {
                    existing.fields.extend(record.fields);
                    continue;
                }
            }
            store.records.insert(record.pk.clone(), record);
        }
        Ok(())
    }

    fn publish(&self, state: &mut State, records: Vec<Record>) -> ResultHandle {
        let mut owned = Vec::with_capacity(records.len());
        for record in records {
            let id = self.allocate().as_usize();
            state.docs.insert(
                id,
                DocSlot {
                    record,
                    result_owned: true,
                },
            );
            owned.push(id);
        }
        let handle = self.allocate();
        state.results.insert(handle.as_usize(), owned);
        ResultHandle(handle)
    }
}

fn validate_record(schema: &SchemaState, record: &Record) -> EngineResult<()> {
    if record.pk.is_empty() {
        return Err(invalid("document has no primary key"));
    }
    for (name, value) in &record.fields {
        let column = schema
            .column(name)
            .ok_or_else(|| invalid(format!("field '{}' is not in the schema", name)))?;
        if *value == Value::Null && !column.nullable {
            return Err(invalid(format!("field '{}' is not nullable", name)));
        }
        if let Value::VectorF32(v) = value {
            if v.len() != column.dimension as usize {
                return Err(invalid(format!(
                    "vector '{}' has dimension {}, expected {}",
                    name,
                    v.len(),
                    column.dimension
                )));
            }
        }
    }
    Ok(())
}

fn similarity(metric: MetricType, query: &[f32], candidate: &[f32]) -> f64 {
    let dot: f64 = query.iter().zip(candidate).map(|(a, b)| f64::from(*a) * f64::from(*b)).sum();
    match metric {
        MetricType::L2 => query
            .iter()
            .zip(candidate)
            .map(|(a, b)| {
                let d = f64::from(*a) - f64::from(*b);
                d * d
            })
            .sum(),
        MetricType::Ip => dot,
        MetricType::Cosine | MetricType::Undefined => {
            let norm = |v: &[f32]| v.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
            let denominator = norm(query) * norm(candidate);
            if denominator == 0.0 {
                0.0
            } else {
                dot / denominator
            }
        }
    }
}

fn project(mut record: Record, output_fields: &[String], include_vector: bool) -> Record {
    record.fields.retain(|name, value| {
        if value.is_vector() {
            include_vector
        } else {
            output_fields.is_empty() || output_fields.iter().any(|f| f == name)
        }
    });
    record
}

impl Engine for MemoryEngine {
    fn version(&self) -> String {
        MEMORY_ENGINE_VERSION.to_string()
    }

    fn doc_create(&self) -> Option<DocHandle> {
        let handle = self.allocate();
        let mut state = self.record_call("doc_create");
        state.docs.insert(
            handle.as_usize(),
            DocSlot {
                record: Record::default(),
                result_owned: false,
            },
        );
        Some(DocHandle(handle))
    }

    fn doc_destroy(&self, doc: DocHandle) {
        let mut state = self.record_call("doc_destroy");
        let key = doc.0.as_usize();
        match state.docs.get(&key) {
            Some(slot) if !slot.result_owned => {
                state.docs.remove(&key);
            }
            _ => state.invalid_releases += 1,
        }
    }

    fn doc_set_pk(&self, doc: DocHandle, pk: &CStr) {
        let mut state = self.record_call("doc_set_pk");
        if let Ok(slot) = state.doc_mut(doc) {
            slot.record.pk = lossy(pk);
        }
    }

    fn doc_get_pk(&self, doc: DocHandle) -> Option<String> {
        let state = self.lock();
        state.docs.get(&doc.0.as_usize()).map(|d| d.record.pk.clone())
    }

    fn doc_get_score(&self, doc: DocHandle) -> f64 {
        let state = self.lock();
        state.docs.get(&doc.0.as_usize()).map_or(0.0, |d| d.record.score)
    }

    fn doc_set_string(&self, doc: DocHandle, field: &CStr, value: &CStr) -> EngineResult<()> {
        self.set_value("doc_set_string", doc, field, Value::String(lossy(value)))
    }

    fn doc_set_int32(&self, doc: DocHandle, field: &CStr, value: i32) -> EngineResult<()> {
        self.set_value("doc_set_int32", doc, field, Value::Int32(value))
    }

    fn doc_set_int64(&self, doc: DocHandle, field: &CStr, value: i64) -> EngineResult<()> {
        self.set_value("doc_set_int64", doc, field, Value::Int64(value))
    }

    fn doc_set_float(&self, doc: DocHandle, field: &CStr, value: f32) -> EngineResult<()> {
        self.set_value("doc_set_float", doc, field, Value::Float(value))
    }

    fn doc_set_double(&self, doc: DocHandle, field: &CStr, value: f64) -> EngineResult<()> {
        self.set_value("doc_set_double", doc, field, Value::Double(value))
    }

    fn doc_set_bool(&self, doc: DocHandle, field: &CStr, value: bool) -> EngineResult<()> {
        self.set_value("doc_set_bool", doc, field, Value::Bool(value))
    }

    fn doc_set_null(&self, doc: DocHandle, field: &CStr) -> EngineResult<()> {
        self.set_value("doc_set_null", doc, field, Value::Null)
    }

    fn doc_set_vector_f32(&self, doc: DocHandle, field: &CStr, data: &[f32]) -> EngineResult<()> {
        self.set_value("doc_set_vector_f32", doc, field, Value::VectorF32(data.to_vec()))
    }

    fn doc_set_sparse_vector_f32(
        &self,
        doc: DocHandle,
        field: &CStr,
        indices: &[u32],
        values: &[f32],
    ) -> EngineResult<()> {
        if indices.len() != values.len() {
            return Err(invalid("sparse indices and values differ in length"));
        }
        self.set_value(
            "doc_set_sparse_vector_f32",
            doc,
            field,
            Value::SparseF32(indices.to_vec(), values.to_vec()),
        )
    }

    fn doc_get_vector_f32(&self, doc: DocHandle, field: &CStr, out: &mut [f32]) -> usize {
        let state = self.lock();
        match state.field_of(doc, field) {
            Some(Value::VectorF32(v)) => {
                let n = v.len().min(out.len());
                out[..n].copy_from_slice(&v[..n]);
                n
            }
            _ => 0,
        }
    }

    fn doc_has_field(&self, doc: DocHandle, field: &CStr) -> bool {
        !matches!(self.lock().field_of(doc, field), None | Some(Value::Null))
    }

    fn doc_get_string(&self, doc: DocHandle, field: &CStr) -> Option<String> {
        match self.lock().field_of(doc, field) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn doc_get_int64(&self, doc: DocHandle, field: &CStr) -> i64 {
        match self.lock().field_of(doc, field) {
            Some(Value::Int32(v)) => i64::from(*v),
            Some(Value::Int64(v)) => *v,
            _ => 0,
        }
    }

    fn doc_get_double(&self, doc: DocHandle, field: &CStr) -> f64 {
        match self.lock().field_of(doc, field) {
            Some(Value::Float(v)) => f64::from(*v),
            Some(Value::Double(v)) => *v,
            _ => 0.0,
        }
    }

    fn doc_get_bool(&self, doc: DocHandle, field: &CStr) -> bool {
        matches!(self.lock().field_of(doc, field), Some(Value::Bool(true)))
    }

    fn schema_create(&self, name: &CStr) -> Option<SchemaHandle> {
        let handle = self.allocate();
        let mut state = self.record_call("schema_create");
        state.schemas.insert(
            handle.as_usize(),
            SchemaState {
                name: lossy(name),
                ..SchemaState::default()
            },
        );
        Some(SchemaHandle(handle))
    }

    fn schema_destroy(&self, schema: SchemaHandle) {
        let mut state = self.record_call("schema_destroy");
        if state.schemas.remove(&schema.0.as_usize()).is_none() {
            state.invalid_releases += 1;
        }
    }

    fn schema_add_field(&self, schema: SchemaHandle, def: &FieldDef) -> EngineResult<()> {
        let mut state = self.record_call("schema_add_field");
        state.take_fault("schema_add_field")?;
        let kind = DataType::from_raw(def.data_type).filter(|t| t.is_scalar_kind());
        if kind.is_none() {
            return Err(NativeStatus::new(
                StatusCode::InvalidSchema,
                format!("field '{}' has unsupported data type {}", def.name, def.data_type),
            ));
        }
        let target = state
            .schemas
            .get_mut(&schema.0.as_usize())
            .ok_or_else(|| invalid("unknown schema handle"))?;
        target.fields.push(def.clone());
        Ok(())
    }

    fn schema_add_vector_field(&self, schema: SchemaHandle, def: &FieldDef) -> EngineResult<()> {
        let mut state = self.record_call("schema_add_vector_field");
        state.take_fault("schema_add_vector_field")?;
        match DataType::from_raw(def.data_type) {
            Some(t) if t.is_dense_vector() && def.dimension > 0 => {}
            Some(t) if t.is_sparse_vector() => {}
            _ => {
                return Err(NativeStatus::new(
                    StatusCode::InvalidSchema,
                    format!(
                        "vector '{}' has unsupported type {} or dimension {}",
                        def.name, def.data_type, def.dimension
                    ),
                ))
            }
        }
        let target = state
            .schemas
            .get_mut(&schema.0.as_usize())
            .ok_or_else(|| invalid("unknown schema handle"))?;
        target.vectors.push(def.clone());
        Ok(())
    }

    fn schema_get_name(&self, schema: SchemaHandle) -> Option<String> {
        self.lock().schemas.get(&schema.0.as_usize()).map(|s| s.name.clone())
    }

    fn schema_field_count(&self, schema: SchemaHandle) -> usize {
        self.lock().schemas.get(&schema.0.as_usize()).map_or(0, |s| s.fields.len())
    }

    fn schema_vector_count(&self, schema: SchemaHandle) -> usize {
        self.lock().schemas.get(&schema.0.as_usize()).map_or(0, |s| s.vectors.len())
    }

    fn schema_get_field(&self, schema: SchemaHandle, index: usize) -> FieldDef {
        self.lock()
            .schemas
            .get(&schema.0.as_usize())
            .and_then(|s| s.fields.get(index).cloned())
            .unwrap_or_default()
    }

    fn schema_get_vector(&self, schema: SchemaHandle, index: usize) -> FieldDef {
        self.lock()
            .schemas
            .get(&schema.0.as_usize())
            .and_then(|s| s.vectors.get(index).cloned())
            .unwrap_or_default()
    }

    fn query_create(&self) -> Option<QueryHandle> {
        let handle = self.allocate();
        let mut state = self.record_call("query_create");
        state.queries.insert(
            handle.as_usize(),
            RecordedQuery {
                topk: 10,
                ..RecordedQuery::default()
            },
        );
        Some(QueryHandle(handle))
    }

    fn query_destroy(&self, query: QueryHandle) {
        let mut state = self.record_call("query_destroy");
        if state.queries.remove(&query.0.as_usize()).is_none() {
            state.invalid_releases += 1;
        }
    }

    fn query_set_topk(&self, query: QueryHandle, topk: i32) {
        if let Some(q) = self.record_call("query_set_topk").queries.get_mut(&query.0.as_usize()) {
            q.topk = topk;
        }
    }

    fn query_set_field_name(&self, query: QueryHandle, field: &CStr) {
        if let Some(q) = self.record_call("query_set_field_name").queries.get_mut(&query.0.as_usize()) {
            q.field_name = Some(lossy(field));
        }
    }

    fn query_set_vector(&self, query: QueryHandle, data: &[f32]) {
        if let Some(q) = self.record_call("query_set_vector").queries.get_mut(&query.0.as_usize()) {
            q.vector = data.to_vec();
        }
    }

    fn query_set_filter(&self, query: QueryHandle, filter: &CStr) {
        if let Some(q) = self.record_call("query_set_filter").queries.get_mut(&query.0.as_usize()) {
            q.filter = Some(lossy(filter));
        }
    }

    fn query_set_include_vector(&self, query: QueryHandle, include: bool) {
        if let Some(q) = self.record_call("query_set_include_vector").queries.get_mut(&query.0.as_usize()) {
            q.include_vector = include;
        }
    }

    fn query_set_output_fields(&self, query: QueryHandle, fields: &[&CStr]) {
        if let Some(q) = self.record_call("query_set_output_fields").queries.get_mut(&query.0.as_usize()) {
            q.output_fields = fields.iter().map(|f| lossy(f)).collect();
        }
    }

    fn query_set_ef_search(&self, query: QueryHandle, ef: i32) {
        if let Some(q) = self.record_call("query_set_ef_search").queries.get_mut(&query.0.as_usize()) {
            q.ef_search = ef;
        }
    }

    fn query_set_n_probe(&self, query: QueryHandle, n_probe: i32) {
        if let Some(q) = self.record_call("query_set_n_probe").queries.get_mut(&query.0.as_usize()) {
            q.n_probe = n_probe;
        }
    }

    fn collection_create_and_open(
        &self,
        path: &CStr,
        schema: SchemaHandle,
        options: &NativeCollectionOptions,
    ) -> EngineResult<CollectionHandle> {
        let mut state = self.record_call("collection_create_and_open");
        state.take_fault("collection_create_and_open")?;
        let path = lossy(path);
        if state.stores.contains_key(&path) {
            return Err(NativeStatus::new(
                StatusCode::AlreadyExists,
                format!("collection already exists at '{}'", path),
            ));
        }
        let schema = state
            .schemas
            .get(&schema.0.as_usize())
            .cloned()
            .ok_or_else(|| invalid("unknown schema handle"))?;
        state.stores.insert(
            path.clone(),
            Store {
                schema,
                records: BTreeMap::new(),
                options: *options,
            },
        );
        let handle = self.allocate();
        state.collections.insert(handle.as_usize(), path);
        Ok(CollectionHandle(handle))
    }

    fn collection_open(&self, path: &CStr, _options: &NativeCollectionOptions) -> EngineResult<CollectionHandle> {
        let mut state = self.record_call("collection_open");
        state.take_fault("collection_open")?;
        let path = lossy(path);
        if !state.stores.contains_key(&path) {
            return Err(NativeStatus::new(
                StatusCode::NotFound,
                format!("no collection at '{}'", path),
            ));
        }
        let handle = self.allocate();
        state.collections.insert(handle.as_usize(), path);
        Ok(CollectionHandle(handle))
    }

    fn collection_destroy(&self, collection: CollectionHandle) {
        let mut state = self.record_call("collection_destroy");
        if state.collections.remove(&collection.0.as_usize()).is_none() {
            state.invalid_releases += 1;
        }
    }

    fn collection_destroy_data(&self, collection: CollectionHandle) -> EngineResult<()> {
        let mut state = self.record_call("collection_destroy_data");
        state.take_fault("collection_destroy_data")?;
        let path = state
            .collections
            .get(&collection.0.as_usize())
            .cloned()
            .ok_or_else(|| invalid("unknown collection handle"))?;
        state.stores.remove(&path);
        Ok(())
    }

    fn collection_flush(&self, collection: CollectionHandle) -> EngineResult<()> {
        let mut state = self.record_call("collection_flush");
        state.take_fault("collection_flush")?;
        state.store_for(collection).map(|_| ())
    }

    fn collection_optimize(&self, collection: CollectionHandle) -> EngineResult<()> {
        let mut state = self.record_call("collection_optimize");
        state.take_fault("collection_optimize")?;
        state.store_for(collection).map(|_| ())
    }

    fn collection_create_index(&self, collection: CollectionHandle, field: &CStr, def: &FieldDef) -> EngineResult<()> {
        let mut state = self.record_call("collection_create_index");
        state.take_fault("collection_create_index")?;
        let name = lossy(field);
        let store = state.store_for(collection)?;
        if let Some(vector) = store.schema.vectors.iter_mut().find(|v| v.name == name) {
            vector.index_type = def.index_type;
            vector.metric_type = def.metric_type;
            vector.quantize_type = def.quantize_type;
            vector.m = def.m;
            vector.ef_construction = def.ef_construction;
            vector.n_lists = def.n_lists;
            return Ok(());
        }
        match store.schema.fields.iter_mut().find(|f| f.name == name) {
            Some(scalar) => {
                scalar.index_type = def.index_type;
                Ok(())
            }
            None => Err(NativeStatus::new(
                StatusCode::NotFound,
                format!("field '{}' not found", name),
            )),
        }
    }

    fn collection_drop_index(&self, collection: CollectionHandle, field: &CStr) -> EngineResult<()> {
        let mut state = self.record_call("collection_drop_index");
        state.take_fault("collection_drop_index")?;
        let name = lossy(field);
        let store = state.store_for(collection)?;
        if let Some(vector) = store.schema.vectors.iter_mut().find(|v| v.name == name) {
            vector.index_type = IndexType::Flat.as_raw();
            return Ok(());
        }
        match store.schema.fields.iter_mut().find(|f| f.name == name) {
            Some(scalar) => {
                scalar.index_type = IndexType::Undefined.as_raw();
                Ok(())
            }
            None => Err(NativeStatus::new(
                StatusCode::NotFound,
                format!("field '{}' not found", name),
            )),
        }
    }

    fn collection_insert(&self, collection: CollectionHandle, docs: &[DocHandle]) -> EngineResult<()> {
        self.write_docs("collection_insert", collection, docs)
    }

    fn collection_upsert(&self, collection: CollectionHandle, docs: &[DocHandle]) -> EngineResult<()> {
        self.write_docs("collection_upsert", collection, docs)
    }

    fn collection_update(&self, collection: CollectionHandle, docs: &[DocHandle]) -> EngineResult<()> {
        self.write_docs("collection_update", collection, docs)
    }

    fn collection_delete(&self, collection: CollectionHandle, ids: &[&CStr]) -> EngineResult<()> {
        let mut state = self.record_call("collection_delete");
        state.take_fault("collection_delete")?;
        let store = state.store_for(collection)?;
        for id in ids {
            store.records.remove(lossy(id).as_str());
        }
        Ok(())
    }

    fn collection_delete_by_filter(&self, collection: CollectionHandle, filter: &CStr) -> EngineResult<()> {
        let mut state = self.record_call("collection_delete_by_filter");
        state.take_fault("collection_delete_by_filter")?;
        let filter = lossy(filter);
        let predicate = predicate::parse(&filter).map_err(invalid)?;
        state.last_delete_filter = Some(filter);
        let store = state.store_for(collection)?;
        store
            .records
            .retain(|_, record| !predicate.matches(&|name: &str| record.fields.get(name)));
        Ok(())
    }

    fn collection_query(&self, collection: CollectionHandle, query: QueryHandle) -> EngineResult<ResultHandle> {
        let mut state = self.record_call("collection_query");
        state.take_fault("collection_query")?;
        let query = state
            .queries
            .get(&query.0.as_usize())
            .cloned()
            .ok_or_else(|| invalid("unknown query handle"))?;
        state.last_query = Some(query.clone());

        let field = query
            .field_name
            .clone()
            .ok_or_else(|| invalid("query has no vector field"))?;
        let predicate = match query.filter.as_deref() {
            Some(filter) if !filter.is_empty() => Some(predicate::parse(filter).map_err(invalid)?),
            _ => None,
        };

        let store = state.store_for(collection)?;
        let column = store
            .schema
            .vectors
            .iter()
            .find(|v| v.name == field)
            .ok_or_else(|| invalid(format!("vector field '{}' not found", field)))?;
        if query.vector.len() != column.dimension as usize {
            return Err(invalid(format!(
                "query vector has dimension {}, expected {}",
                query.vector.len(),
                column.dimension
            )));
        }
        let metric = MetricType::from_raw(column.metric_type).unwrap_or_default();

        let mut scored: Vec<Record> = store
            .records
            .values()
            .filter(|record| {
                predicate
                    .as_ref()
                    .map_or(true, |p| p.matches(&|name: &str| record.fields.get(name)))
            })
            .filter_map(|record| match record.fields.get(&field) {
                Some(Value::VectorF32(v)) => {
                    let mut hit = record.clone();
                    hit.score = similarity(metric, &query.vector, v);
                    Some(hit)
                }
                _ => None,
            })
            .collect();

        if metric == MetricType::L2 {
            scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        } else {
            scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        }
        scored.truncate(query.topk.max(0) as usize);

        let hits = scored
            .into_iter()
            .map(|r| project(r, &query.output_fields, query.include_vector))
            .collect();
        Ok(self.publish(&mut state, hits))
    }

    fn collection_fetch(&self, collection: CollectionHandle, ids: &[&CStr]) -> EngineResult<ResultHandle> {
        let mut state = self.record_call("collection_fetch");
        state.take_fault("collection_fetch")?;
        let store = state.store_for(collection)?;
        let found: Vec<Record> = ids
            .iter()
            .filter_map(|id| store.records.get(lossy(id).as_str()).cloned())
            .collect();
        Ok(self.publish(&mut state, found))
    }

    fn collection_get_schema(&self, collection: CollectionHandle) -> Option<SchemaHandle> {
        let mut state = self.record_call("collection_get_schema");
        let schema = state.store_for(collection).ok()?.schema.clone();
        let handle = self.allocate();
        state.schemas.insert(handle.as_usize(), schema);
        Some(SchemaHandle(handle))
    }

    fn collection_get_path(&self, collection: CollectionHandle) -> Option<String> {
        self.lock().collections.get(&collection.0.as_usize()).cloned()
    }

    fn result_destroy(&self, result: ResultHandle) {
        let mut state = self.record_call("result_destroy");
        match state.results.remove(&result.0.as_usize()) {
            Some(docs) => {
                for doc in docs {
                    state.docs.remove(&doc);
                }
            }
            None => state.invalid_releases += 1,
        }
    }

    fn result_count(&self, result: ResultHandle) -> usize {
        self.lock().results.get(&result.0.as_usize()).map_or(0, Vec::len)
    }

    fn result_get_doc(&self, result: ResultHandle, index: usize) -> Option<DocHandle> {
        let state = self.lock();
        let id = *state.results.get(&result.0.as_usize())?.get(index)?;
        RawHandle::from_usize(id).map(DocHandle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn options() -> NativeCollectionOptions {
        NativeCollectionOptions {
            segment_max_docs: 1_000_000,
            index_build_parallel: 0,
            auto_flush: 1,
        }
    }

    fn open_collection(engine: &MemoryEngine, path: &str) -> CollectionHandle {
        let schema = engine.schema_create(&c("Items")).unwrap();
        engine
            .schema_add_field(
                schema,
                &FieldDef {
                    name: "Title".into(),
                    data_type: DataType::String.as_raw(),
                    nullable: true,
                    ..FieldDef::default()
                },
            )
            .unwrap();
        engine
            .schema_add_vector_field(
                schema,
                &FieldDef {
                    name: "Embedding".into(),
                    data_type: DataType::VectorFp32.as_raw(),
                    dimension: 2,
                    nullable: true,
                    index_type: IndexType::Flat.as_raw(),
                    metric_type: MetricType::Ip.as_raw(),
                    ..FieldDef::default()
                },
            )
            .unwrap();
        let collection = engine
            .collection_create_and_open(&c(path), schema, &options())
            .unwrap();
        engine.schema_destroy(schema);
        collection
    }

    fn insert(engine: &MemoryEngine, collection: CollectionHandle, pk: &str, title: &str, v: [f32; 2]) {
        let doc = engine.doc_create().unwrap();
        engine.doc_set_pk(doc, &c(pk));
        engine.doc_set_string(doc, &c("Title"), &c(title)).unwrap();
        engine.doc_set_vector_f32(doc, &c("Embedding"), &v).unwrap();
        engine.collection_insert(collection, &[doc]).unwrap();
        engine.doc_destroy(doc);
    }

    #[test]
    fn test_query_ranks_by_inner_product_and_filters() {
        let engine = MemoryEngine::new();
        let collection = open_collection(&engine, "/mem/items");
        insert(&engine, collection, "a", "alpha", [1.0, 0.0]);
        insert(&engine, collection, "b", "beta", [0.5, 0.5]);
        insert(&engine, collection, "c", "gamma", [0.0, 1.0]);

        let query = engine.query_create().unwrap();
        engine.query_set_field_name(query, &c("Embedding"));
        engine.query_set_vector(query, &[1.0, 0.2]);
        engine.query_set_topk(query, 2);
        let result = engine.collection_query(collection, query).unwrap();
        let ids: Vec<String> = (0..engine.result_count(result))
            .filter_map(|i| engine.result_get_doc(result, i))
            .filter_map(|d| engine.doc_get_pk(d))
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        engine.result_destroy(result);

        engine.query_set_filter(query, &c("(Title != 'alpha')"));
        let result = engine.collection_query(collection, query).unwrap();
        let first = engine.result_get_doc(result, 0).unwrap();
        assert_eq!(engine.doc_get_pk(first).as_deref(), Some("b"));
        assert!(!engine.doc_has_field(first, &c("Embedding")));
        engine.result_destroy(result);
        engine.query_destroy(query);

        engine.collection_destroy(collection);
        assert!(engine.live_handles().is_empty());
        assert_eq!(engine.invalid_releases(), 0);
    }

    #[test]
    fn test_insert_conflicts_and_update_requires_existing() {
        let engine = MemoryEngine::new();
        let collection = open_collection(&engine, "/mem/conflicts");
        insert(&engine, collection, "a", "alpha", [1.0, 0.0]);

        let doc = engine.doc_create().unwrap();
        engine.doc_set_pk(doc, &c("a"));
        let err = engine.collection_insert(collection, &[doc]).unwrap_err();
        assert_eq!(err.code, StatusCode::AlreadyExists.as_raw());

        engine.doc_set_pk(doc, &c("zzz"));
        let err = engine.collection_update(collection, &[doc]).unwrap_err();
        assert_eq!(err.code, StatusCode::NotFound.as_raw());
        engine.doc_destroy(doc);
        engine.collection_destroy(collection);
    }

    #[test]
    fn test_vector_dimension_is_checked() {
        let engine = MemoryEngine::new();
        let collection = open_collection(&engine, "/mem/dims");
        let doc = engine.doc_create().unwrap();
        engine.doc_set_pk(doc, &c("a"));
        engine.doc_set_vector_f32(doc, &c("Embedding"), &[1.0, 2.0, 3.0]).unwrap();
        let err = engine.collection_upsert(collection, &[doc]).unwrap_err();
        assert!(err.message.unwrap().contains("dimension 3"));
        engine.doc_destroy(doc);
        engine.collection_destroy(collection);
    }

    #[test]
    fn test_fault_injection_is_one_shot() {
        let engine = MemoryEngine::new();
        let collection = open_collection(&engine, "/mem/faults");
        engine.fail_next("collection_flush", StatusCode::IOError, "disk full");
        let err = engine.collection_flush(collection).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("disk full"));
        assert!(engine.collection_flush(collection).is_ok());
        engine.collection_destroy(collection);
    }

    #[test]
    fn test_null_marked_field_reads_as_absent() {
        let engine = MemoryEngine::new();
        let doc = engine.doc_create().unwrap();
        engine.doc_set_null(doc, &c("Rating")).unwrap();
        engine.doc_set_double(doc, &c("Price"), 2.5).unwrap();

        assert!(!engine.doc_has_field(doc, &c("Rating")));
        assert!(engine.doc_has_field(doc, &c("Price")));
        assert!(!engine.doc_has_field(doc, &c("Missing")));
        engine.doc_destroy(doc);
    }

    #[test]
    fn test_releasing_result_owned_document_is_flagged() {
        let engine = MemoryEngine::new();
        let collection = open_collection(&engine, "/mem/owned");
        insert(&engine, collection, "a", "alpha", [1.0, 0.0]);
        let result = engine.collection_fetch(collection, &[c("a").as_c_str()]).unwrap();
        let doc = engine.result_get_doc(result, 0).unwrap();
        engine.doc_destroy(doc);
        assert_eq!(engine.invalid_releases(), 1);
        engine.result_destroy(result);
        engine.collection_destroy(collection);
    }

    #[test]
    fn test_reopen_and_destroy_data() {
        let engine = MemoryEngine::new();
        let collection = open_collection(&engine, "/mem/reopen");
        insert(&engine, collection, "a", "alpha", [1.0, 0.0]);
        engine.collection_destroy(collection);

        let reopened = engine.collection_open(&c("/mem/reopen"), &options()).unwrap();
        assert_eq!(engine.stored_count("/mem/reopen"), Some(1));
        engine.collection_destroy_data(reopened).unwrap();
        engine.collection_destroy(reopened);
        assert_eq!(engine.stored_count("/mem/reopen"), None);
        assert!(engine.collection_open(&c("/mem/reopen"), &options()).is_err());
    }
}
