// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Collections without a document type.
//!
//! Records are `Doc` values keyed by column name; the schema drives how each
//! value is written.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::collection::core::{CollectionCore, WriteOp};
use crate::collection::marshal::{decode, Column, RecordSink, RecordSource};
use crate::collection::offload::offload;
use crate::config::CollectionOptions;
use crate::core::error::Result;
use crate::core::index_params::{IndexParams, InvertIndexParams};
use crate::document::doc::Doc;
use crate::document::value::{ArrayRef, FieldRef, FieldValue};
use crate::native::engine::Engine;
use crate::query::options::QueryOptions;
use crate::query::vector_query::VectorQuery;
use crate::schema::types::CollectionSchema;

impl RecordSource for Doc {
    fn key(&self) -> &str {
        self.id()
    }

    fn scalar(&self, _index: usize, column: &Column) -> FieldRef<'_> {
        self.field(&column.name).map_or(FieldRef::Null, FieldValue::as_field_ref)
    }

    fn vector(&self, _index: usize, column: &Column) -> FieldRef<'_> {
        if let Some(dense) = self.vector(&column.name) {
            return FieldRef::Array(ArrayRef::Float(dense));
        }
        self.sparse_vector(&column.name).map_or(FieldRef::Null, FieldRef::Sparse)
    }
}

impl RecordSink for Doc {
    fn set_key(&mut self, key: String) {
        self.set_id(key);
    }

    fn set_score(&mut self, score: f64) {
        Doc::set_score(self, score);
    }

    fn set_scalar(&mut self, _index: usize, column: &Column, value: FieldValue) {
        self.set_field(column.name.clone(), value);
    }

    fn set_vector(&mut self, _index: usize, column: &Column, value: Vec<f32>) {
        Doc::set_vector(self, column.name.clone(), value);
    }
}

/// A collection addressed through an explicit `CollectionSchema`.
#[derive(Clone)]
pub struct UntypedCollection {
    core: Arc<CollectionCore>,
}

impl std::fmt::Debug for UntypedCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UntypedCollection")
            .field("collection", &self.core.schema().name())
            .field("path", &self.core.path())
            .field("closed", &self.core.is_closed())
            .finish()
    }
}

impl UntypedCollection {
    pub(crate) fn create(
        engine: Arc<dyn Engine>,
        path: &str,
        schema: CollectionSchema,
        options: &CollectionOptions,
    ) -> Result<Self> {
        Ok(Self {
            core: Arc::new(CollectionCore::create(engine, path, schema, options)?),
        })
    }

    /// Opens with the schema read back from the engine.
    pub(crate) fn open(engine: Arc<dyn Engine>, path: &str, options: &CollectionOptions) -> Result<Self> {
        Ok(Self {
            core: Arc::new(CollectionCore::open(engine, path, options, None)?),
        })
    }

    /// # Errors
    ///
    /// `Disposed` once the collection has been closed.
    pub fn path(&self) -> Result<String> {
        self.core.native_path()
    }

    pub fn schema(&self) -> &CollectionSchema {
        self.core.schema()
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    pub fn insert(&self, docs: &[Doc]) -> Result<()> {
        self.core.write(WriteOp::Insert, docs)
    }

    pub fn upsert(&self, docs: &[Doc]) -> Result<()> {
        self.core.write(WriteOp::Upsert, docs)
    }

    pub fn update(&self, docs: &[Doc]) -> Result<()> {
        self.core.write(WriteOp::Update, docs)
    }

    pub fn delete<I: AsRef<str>>(&self, ids: &[I]) -> Result<()> {
        self.core.delete(ids)
    }

    pub fn delete_by_filter(&self, filter: &str) -> Result<()> {
        self.core.delete_by_filter(filter)
    }

    pub fn fetch<I: AsRef<str>>(&self, ids: &[I]) -> Result<Vec<Doc>> {
        self.core.fetch(ids, |engine, layout, handle| {
            let mut doc = Doc::default();
            decode(engine, layout, handle, &mut doc);
            doc
        })
    }

    /// Runs vector queries. Each returned `Doc` carries its engine or fused score.
    pub fn query(&self, queries: &[VectorQuery], options: &QueryOptions) -> Result<Vec<Doc>> {
        let hits = self.core.query(queries, options, |engine, layout, handle| {
            let mut doc = Doc::default();
            decode(engine, layout, handle, &mut doc);
            doc
        })?;
        Ok(hits
            .into_iter()
            .map(|mut hit| {
                Doc::set_score(&mut hit.doc, hit.score);
                hit.doc
            })
            .collect())
    }

    pub fn flush(&self) -> Result<()> {
        self.core.flush()
    }

    pub fn optimize(&self) -> Result<()> {
        self.core.optimize()
    }

    pub fn create_index(&self, field: &str, params: &IndexParams) -> Result<()> {
        self.core.create_index(field, params)
    }

    pub fn create_scalar_index(&self, field: &str, params: InvertIndexParams) -> Result<()> {
        self.core.create_scalar_index(field, params)
    }

    pub fn drop_index(&self, field: &str) -> Result<()> {
        self.core.drop_index(field)
    }

    pub fn destroy(&self) -> Result<()> {
        self.core.destroy()
    }

    pub fn close(&self) {
        self.core.close()
    }

    pub async fn insert_async(&self, docs: Vec<Doc>, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.insert(&docs)).await
    }

    pub async fn upsert_async(&self, docs: Vec<Doc>, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.upsert(&docs)).await
    }

    pub async fn update_async(&self, docs: Vec<Doc>, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.update(&docs)).await
    }

    pub async fn delete_async(&self, ids: Vec<String>, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.delete(&ids)).await
    }

    pub async fn fetch_async(&self, ids: Vec<String>, cancel: Option<CancellationToken>) -> Result<Vec<Doc>> {
        let this = self.clone();
        offload(cancel, move || this.fetch(&ids)).await
    }

    pub async fn query_async(
        &self,
        queries: Vec<VectorQuery>,
        options: QueryOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<Vec<Doc>> {
        let this = self.clone();
        offload(cancel, move || this.query(&queries, &options)).await
    }

    pub async fn flush_async(&self, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.flush()).await
    }

    pub async fn optimize_async(&self, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.optimize()).await
    }
}
