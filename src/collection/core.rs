// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared collection machinery
//!
//! `CollectionCore` owns the long-lived collection handle and implements every
//! operation in terms of `RecordSource`/`RecordSink`, so typed and untyped
//! collections differ only in how records are bound.
//!
//! The handle sits behind an `RwLock<Option<_>>`. Operations hold the read
//! lock for their whole duration; `close` takes the write lock, so it waits
//! for in-flight calls and every later call fails with `Disposed`.

use std::ffi::CString;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::collection::marshal::{encode, RecordLayout, RecordSource};
use crate::config::CollectionOptions;
use crate::core::error::{Result, ZvecError};
use crate::core::index_params::{IndexParams, IndexQueryParam, InvertIndexParams};
use crate::core::types::DataType;
use crate::native::engine::{CollectionHandle, DocHandle, Engine};
use crate::native::handles::{DocBatch, OwnedQuery, OwnedSchema, ResultSet};
use crate::native::schema_io::{build_schema, c_name, index_def, invert_def, read_schema};
use crate::query::options::QueryOptions;
use crate::query::reranker::{Hit, RankedList};
use crate::query::vector_query::VectorQuery;
use crate::schema::types::CollectionSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteOp {
    Insert,
    Upsert,
    Update,
}

impl WriteOp {
    fn name(self) -> &'static str {
        match self {
            WriteOp::Insert => "insert",
            WriteOp::Upsert => "upsert",
            WriteOp::Update => "update",
        }
    }
}

/// A vector clause ready for the engine.
struct ResolvedQuery {
    field: CString,
    field_name: String,
    vector: Vec<f32>,
    weight: f64,
    param: Option<IndexQueryParam>,
}

pub(crate) struct CollectionCore {
    engine: Arc<dyn Engine>,
    handle: RwLock<Option<CollectionHandle>>,
    path: String,
    schema: CollectionSchema,
    layout: RecordLayout,
}

fn check_path(path: &str) -> Result<CString> {
    if path.trim().is_empty() {
        return Err(ZvecError::invalid_argument(
            "path",
            "Collection path cannot be null or empty",
        ));
    }
    c_name("path", path)
}

impl CollectionCore {
    /// Creates a collection at `path` and opens it.
    pub(crate) fn create(
        engine: Arc<dyn Engine>,
        path: &str,
        schema: CollectionSchema,
        options: &CollectionOptions,
    ) -> Result<Self> {
        let c_path = check_path(path)?;
        let native_options = options.to_native()?;
        let layout = RecordLayout::new(&schema)?;

        let handle = {
            let native_schema = build_schema(engine.as_ref(), &schema)?;
            engine.collection_create_and_open(&c_path, native_schema.handle(), &native_options)?
        };

        info!(
            path,
            collection = schema.name(),
            fields = schema.fields().len(),
            vectors = schema.vectors().len(),
            "Created collection"
        );
        Ok(Self {
            engine,
            handle: RwLock::new(Some(handle)),
            path: path.to_string(),
            schema,
            layout,
        })
    }

    /// Opens an existing collection.
    ///
    /// With `expected`, the stored schema must contain every vector of
    /// `expected` with the same type and dimension, and `expected` is used for
    /// marshaling. Without it, the stored schema is used.
    pub(crate) fn open(
        engine: Arc<dyn Engine>,
        path: &str,
        options: &CollectionOptions,
        expected: Option<CollectionSchema>,
    ) -> Result<Self> {
        let c_path = check_path(path)?;
        let native_options = options.to_native()?;
        let handle = engine.collection_open(&c_path, &native_options)?;

        let opened = Self::read_back(engine.as_ref(), handle).and_then(|stored| {
            let schema = match expected {
                Some(expected) => {
                    check_compatible(&expected, &stored)?;
                    expected
                }
                None => stored,
            };
            let layout = RecordLayout::new(&schema)?;
            Ok((schema, layout))
        });
        let (schema, layout) = match opened {
            Ok(parts) => parts,
            Err(err) => {
                engine.collection_destroy(handle);
                return Err(err);
            }
        };

        info!(path, collection = schema.name(), "Opened collection");
        Ok(Self {
            engine,
            handle: RwLock::new(Some(handle)),
            path: path.to_string(),
            schema,
            layout,
        })
    }

    fn read_back(engine: &dyn Engine, handle: CollectionHandle) -> Result<CollectionSchema> {
        let native = OwnedSchema::adopt(engine, engine.collection_get_schema(handle))?;
        read_schema(engine, native.handle())
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    /// Path reported by the engine for the open handle.
    pub(crate) fn native_path(&self) -> Result<String> {
        self.with_handle(|engine, handle| Ok(engine.collection_get_path(handle).unwrap_or_else(|| self.path.clone())))
    }

    pub(crate) fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.handle.read().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// Runs `f` against the open handle.
    fn with_handle<R>(&self, f: impl FnOnce(&dyn Engine, CollectionHandle) -> Result<R>) -> Result<R> {
        let guard = self.handle.read().unwrap_or_else(PoisonError::into_inner);
        match *guard {
            Some(handle) => f(self.engine.as_ref(), handle),
            None => Err(ZvecError::Disposed),
        }
    }

    pub(crate) fn write<S: RecordSource>(&self, op: WriteOp, records: &[S]) -> Result<()> {
        self.with_handle(|engine, handle| {
            if records.is_empty() {
                return Ok(());
            }
            let mut batch = DocBatch::with_capacity(records.len());
            for record in records {
                batch.push(encode(engine, &self.layout, record)?);
            }
            let docs = batch.handles();
            debug!(op = op.name(), count = docs.len(), path = %self.path, "writing documents");
            match op {
                WriteOp::Insert => engine.collection_insert(handle, &docs)?,
                WriteOp::Upsert => engine.collection_upsert(handle, &docs)?,
                WriteOp::Update => engine.collection_update(handle, &docs)?,
            }
            Ok(())
        })
    }

    pub(crate) fn delete<I: AsRef<str>>(&self, ids: &[I]) -> Result<()> {
        self.with_handle(|engine, handle| {
            if ids.is_empty() {
                return Ok(());
            }
            let owned = ids
                .iter()
                .map(|id| c_name("ids", id.as_ref()))
                .collect::<Result<Vec<_>>>()?;
            let names: Vec<&std::ffi::CStr> = owned.iter().map(CString::as_c_str).collect();
            debug!(count = names.len(), path = %self.path, "deleting documents");
            engine.collection_delete(handle, &names)?;
            Ok(())
        })
    }

    pub(crate) fn delete_by_filter(&self, filter: &str) -> Result<()> {
        if filter.trim().is_empty() {
            return Err(ZvecError::invalid_argument(
                "filter",
                "Filter cannot be null or empty",
            ));
        }
        let c_filter = c_name("filter", filter)?;
        self.with_handle(|engine, handle| {
            debug!(filter, path = %self.path, "deleting documents by filter");
            engine.collection_delete_by_filter(handle, &c_filter)?;
            Ok(())
        })
    }

    /// Fetches documents by id in request order. Missing ids are skipped.
    pub(crate) fn fetch<I, R, F>(&self, ids: &[I], mut make: F) -> Result<Vec<R>>
    where
        I: AsRef<str>,
        F: FnMut(&dyn Engine, &RecordLayout, DocHandle) -> R,
    {
        self.with_handle(|engine, handle| {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let owned = ids
                .iter()
                .map(|id| c_name("ids", id.as_ref()))
                .collect::<Result<Vec<_>>>()?;
            let names: Vec<&std::ffi::CStr> = owned.iter().map(CString::as_c_str).collect();
            let result = ResultSet::new(engine, engine.collection_fetch(handle, &names)?);
            let docs = result
                .docs()
                .map(|doc| make(engine, &self.layout, doc))
                .collect::<Vec<_>>();
            debug!(requested = ids.len(), found = docs.len(), "fetched documents");
            Ok(docs)
        })
    }

    /// Runs one or more vector clauses and returns hits, best first.
    ///
    /// A single clause is dispatched as is. Several clauses are dispatched one
    /// by one and fused with the configured reranker, RRF(k=60) by default,
    /// and every hit's score is the fused score.
    pub(crate) fn query<R, F>(&self, queries: &[VectorQuery], options: &QueryOptions, mut make: F) -> Result<Vec<Hit<R>>>
    where
        F: FnMut(&dyn Engine, &RecordLayout, DocHandle) -> R,
    {
        if queries.is_empty() {
            return Err(ZvecError::InvalidOperation(
                "At least one vector query is required".to_string(),
            ));
        }
        for query in queries {
            query.validate()?;
        }
        let filter = options.filter().map(|f| c_name("filter", f)).transpose()?;
        let output_fields = options
            .output_fields()
            .map(|fields| fields.iter().map(|f| c_name("output_fields", f)).collect::<Result<Vec<_>>>())
            .transpose()?;

        self.with_handle(|engine, handle| {
            let resolved = queries
                .iter()
                .map(|q| self.resolve(engine, handle, q))
                .collect::<Result<Vec<_>>>()?;

            let mut lists = Vec::with_capacity(resolved.len());
            for query in &resolved {
                let hits = self.run_one(
                    engine,
                    handle,
                    query,
                    options,
                    filter.as_deref(),
                    output_fields.as_deref(),
                    &mut make,
                )?;
                lists.push(RankedList {
                    field: query.field_name.clone(),
                    weight: query.weight,
                    hits,
                });
            }

            if lists.len() == 1 {
                return Ok(lists.pop().map(|l| l.hits).unwrap_or_default());
            }
            let reranker = options.reranker().cloned().unwrap_or_default();
            debug!(lists = lists.len(), reranker = %reranker, "fusing ranked lists");
            Ok(reranker.fuse(lists, options.topk()))
        })
    }

    fn resolve(&self, engine: &dyn Engine, handle: CollectionHandle, query: &VectorQuery) -> Result<ResolvedQuery> {
        let vector_schema = self.schema.vector(&query.field_name).ok_or_else(|| {
            ZvecError::invalid_argument(
                "field",
                format!(
                    "Vector field '{}' not found. Available vector fields: {}",
                    query.field_name,
                    self.schema.vector_names().join(", ")
                ),
            )
        })?;
        let field_name = vector_schema.name().to_string();
        let field = c_name("field", &field_name)?;

        if query.is_sparse() {
            return Err(ZvecError::invalid_argument(
                "query",
                format!(
                    "Sparse vector queries are not supported by the engine (field '{}')",
                    field_name
                ),
            ));
        }

        let vector = match (&query.vector, &query.document_id) {
            (Some(vector), _) => {
                let dimension = vector_schema.dimension() as usize;
                if vector_schema.data_type().is_dense_vector() && vector.len() != dimension {
                    return Err(ZvecError::invalid_argument(
                        "vector",
                        format!(
                            "Vector for field '{}' has {} elements, expected {}",
                            field_name,
                            vector.len(),
                            dimension
                        ),
                    ));
                }
                vector.clone()
            }
            (None, Some(id)) => {
                if vector_schema.data_type() != DataType::VectorFp32 {
                    return Err(ZvecError::invalid_argument(
                        "field",
                        format!(
                            "Query by id needs a {} field, '{}' is {}",
                            DataType::VectorFp32,
                            field_name,
                            vector_schema.data_type()
                        ),
                    ));
                }
                stored_vector(engine, handle, id, &field, vector_schema.dimension() as usize)?
            }
            (None, None) => {
                return Err(ZvecError::invalid_argument(
                    "query",
                    "Must specify either document ID or vector",
                ))
            }
        };

        Ok(ResolvedQuery {
            field,
            field_name,
            vector,
            weight: query.weight,
            param: query.param,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn run_one<R, F>(
        &self,
        engine: &dyn Engine,
        handle: CollectionHandle,
        query: &ResolvedQuery,
        options: &QueryOptions,
        filter: Option<&std::ffi::CStr>,
        output_fields: Option<&[CString]>,
        make: &mut F,
    ) -> Result<Vec<Hit<R>>>
    where
        F: FnMut(&dyn Engine, &RecordLayout, DocHandle) -> R,
    {
        let native = OwnedQuery::adopt(engine, engine.query_create())?;
        let q = native.handle();
        engine.query_set_topk(q, i32::try_from(options.topk()).unwrap_or(i32::MAX));
        engine.query_set_field_name(q, &query.field);
        engine.query_set_vector(q, &query.vector);
        if let Some(filter) = filter {
            engine.query_set_filter(q, filter);
        }
        engine.query_set_include_vector(q, options.include_vectors());
        if let Some(fields) = output_fields {
            let names: Vec<&std::ffi::CStr> = fields.iter().map(CString::as_c_str).collect();
            engine.query_set_output_fields(q, &names);
        }
        match query.param {
            Some(IndexQueryParam::Hnsw { ef }) => engine.query_set_ef_search(q, ef),
            Some(IndexQueryParam::Ivf { n_probe }) => engine.query_set_n_probe(q, n_probe),
            None => {}
        }

        debug!(
            field = %query.field_name,
            dimension = query.vector.len(),
            topk = options.topk(),
            filtered = filter.is_some(),
            "dispatching query"
        );
        let result = ResultSet::new(engine, engine.collection_query(handle, q)?);
        let hits = result
            .docs()
            .map(|doc| Hit {
                id: engine.doc_get_pk(doc).unwrap_or_default(),
                score: engine.doc_get_score(doc),
                doc: make(engine, &self.layout, doc),
            })
            .collect();
        Ok(hits)
    }

    pub(crate) fn flush(&self) -> Result<()> {
        self.with_handle(|engine, handle| Ok(engine.collection_flush(handle)?))
    }

    pub(crate) fn optimize(&self) -> Result<()> {
        self.with_handle(|engine, handle| {
            info!(path = %self.path, "Optimizing collection");
            Ok(engine.collection_optimize(handle)?)
        })
    }

    pub(crate) fn create_index(&self, field: &str, params: &IndexParams) -> Result<()> {
        let vector = self.schema.vector(field).ok_or_else(|| {
            ZvecError::invalid_argument("field", format!("Vector field '{}' not found", field))
        })?;
        let name = c_name("field", vector.name())?;
        let mut def = index_def(params);
        def.name = vector.name().to_string();
        def.data_type = vector.data_type().as_raw();
        def.dimension = vector.dimension() as i32;
        def.nullable = vector.nullable();
        self.with_handle(|engine, handle| {
            info!(field = %def.name, index = ?params.index_type(), "Creating vector index");
            Ok(engine.collection_create_index(handle, &name, &def)?)
        })
    }

    pub(crate) fn create_scalar_index(&self, field: &str, params: InvertIndexParams) -> Result<()> {
        let scalar = self.schema.field(field).ok_or_else(|| {
            ZvecError::invalid_argument("field", format!("Scalar field '{}' not found", field))
        })?;
        let name = c_name("field", scalar.name())?;
        let mut def = invert_def(params);
        def.name = scalar.name().to_string();
        def.data_type = scalar.data_type().as_raw();
        def.nullable = scalar.nullable();
        self.with_handle(|engine, handle| {
            info!(field = %def.name, "Creating inverted index");
            Ok(engine.collection_create_index(handle, &name, &def)?)
        })
    }

    pub(crate) fn drop_index(&self, field: &str) -> Result<()> {
        let name = self
            .schema
            .vector(field)
            .map(|v| v.name())
            .or_else(|| self.schema.field(field).map(|f| f.name()))
            .ok_or_else(|| ZvecError::invalid_argument("field", format!("Field '{}' not found", field)))?;
        let c_field = c_name("field", name)?;
        self.with_handle(|engine, handle| {
            info!(field = name, "Dropping index");
            Ok(engine.collection_drop_index(handle, &c_field)?)
        })
    }

    /// Deletes the collection's data, then closes it.
    pub(crate) fn destroy(&self) -> Result<()> {
        self.with_handle(|engine, handle| Ok(engine.collection_destroy_data(handle)?))?;
        info!(path = %self.path, "Destroyed collection data");
        self.close();
        Ok(())
    }

    /// Releases the collection handle. Later calls fail with `Disposed`.
    pub(crate) fn close(&self) {
        let mut guard = self.handle.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = guard.take() {
            self.engine.collection_destroy(handle);
            info!(path = %self.path, "Closed collection");
        }
    }
}

impl Drop for CollectionCore {
    fn drop(&mut self) {
        self.close();
    }
}

fn stored_vector(
    engine: &dyn Engine,
    handle: CollectionHandle,
    id: &str,
    field: &std::ffi::CStr,
    dimension: usize,
) -> Result<Vec<f32>> {
    let c_id = c_name("document_id", id)?;
    let result = ResultSet::new(engine, engine.collection_fetch(handle, &[c_id.as_c_str()])?);
    let doc = result
        .docs()
        .next()
        .ok_or_else(|| ZvecError::NotFound(format!("Document '{}' not found", id)))?;

    let mut buffer = vec![0.0_f32; dimension];
    let copied = engine.doc_get_vector_f32(doc, field, &mut buffer);
    if copied == 0 {
        return Err(ZvecError::NotFound(format!(
            "Document '{}' has no vector for field '{}'",
            id,
            field.to_string_lossy()
        )));
    }
    buffer.truncate(copied);
    Ok(buffer)
}

fn check_compatible(expected: &CollectionSchema, stored: &CollectionSchema) -> Result<()> {
    for vector in expected.vectors() {
        match stored.vector(vector.name()) {
            Some(found) if found.data_type() == vector.data_type() && found.dimension() == vector.dimension() => {}
            Some(found) => {
                return Err(ZvecError::SchemaValidation(format!(
                    "Vector field '{}' is stored as {} (dimension {}) but declared as {} (dimension {})",
                    vector.name(),
                    found.data_type(),
                    found.dimension(),
                    vector.data_type(),
                    vector.dimension()
                )))
            }
            None => {
                return Err(ZvecError::SchemaValidation(format!(
                    "Vector field '{}' is not present in the stored collection",
                    vector.name()
                )))
            }
        }
    }
    for field in expected.fields() {
        if !stored.has_field(field.name()) {
            warn!(field = field.name(), "declared field is not present in the stored collection");
        }
    }
    Ok(())
}
