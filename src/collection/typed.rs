// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Typed collections
//!
//! `Collection<T>` reads and writes documents of one `Document` type through
//! its cached `DocumentModel`. Clones share the same open handle; closing any
//! clone closes them all.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::collection::core::{CollectionCore, WriteOp};
use crate::collection::marshal::{decode, RecordLayout};
use crate::collection::offload::offload;
use crate::config::CollectionOptions;
use crate::core::error::Result;
use crate::core::index_params::{IndexParams, InvertIndexParams};
use crate::document::descriptor::Document;
use crate::document::registry::DocumentModel;
use crate::filter::expr::Expr;
use crate::native::engine::{DocHandle, Engine};
use crate::query::builder::QueryBuilder;
use crate::query::options::QueryOptions;
use crate::query::vector_query::VectorQuery;
use crate::schema::types::CollectionSchema;

pub struct Collection<T: Document> {
    core: Arc<CollectionCore>,
    model: Arc<DocumentModel<T>>,
}

impl<T: Document> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            model: Arc::clone(&self.model),
        }
    }
}

impl<T: Document> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("document", &self.model.descriptor().name())
            .field("path", &self.core.path())
            .field("closed", &self.core.is_closed())
            .finish()
    }
}

impl<T: Document> Collection<T> {
    pub(crate) fn create(
        engine: Arc<dyn Engine>,
        model: Arc<DocumentModel<T>>,
        path: &str,
        options: &CollectionOptions,
    ) -> Result<Self> {
        let core = CollectionCore::create(engine, path, model.schema().clone(), options)?;
        Ok(Self {
            core: Arc::new(core),
            model,
        })
    }

    pub(crate) fn open(
        engine: Arc<dyn Engine>,
        model: Arc<DocumentModel<T>>,
        path: &str,
        options: &CollectionOptions,
    ) -> Result<Self> {
        let core = CollectionCore::open(engine, path, options, Some(model.schema().clone()))?;
        Ok(Self {
            core: Arc::new(core),
            model,
        })
    }

    /// # Errors
    ///
    /// `Disposed` once the collection has been closed.
    pub fn path(&self) -> Result<String> {
        self.core.native_path()
    }

    /// Schema generated from `T`.
    pub fn schema(&self) -> &CollectionSchema {
        self.core.schema()
    }

    pub fn model(&self) -> &DocumentModel<T> {
        &self.model
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    fn read(&self, engine: &dyn Engine, layout: &RecordLayout, handle: DocHandle) -> T {
        let mut doc = T::default();
        decode(engine, layout, handle, &mut self.model.sink(&mut doc));
        doc
    }

    fn write(&self, op: WriteOp, docs: &[T]) -> Result<()> {
        let sources: Vec<_> = docs.iter().map(|d| self.model.source(d)).collect();
        self.core.write(op, &sources)
    }

    /// Inserts new documents.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty id, `SchemaValidation` for a value that
    /// does not fit its column, or the engine's status (for example
    /// `AlreadyExists`).
    pub fn insert(&self, docs: &[T]) -> Result<()> {
        self.write(WriteOp::Insert, docs)
    }

    /// Inserts or replaces documents.
    pub fn upsert(&self, docs: &[T]) -> Result<()> {
        self.write(WriteOp::Upsert, docs)
    }

    /// Updates existing documents.
    pub fn update(&self, docs: &[T]) -> Result<()> {
        self.write(WriteOp::Update, docs)
    }

    pub fn delete<I: AsRef<str>>(&self, ids: &[I]) -> Result<()> {
        self.core.delete(ids)
    }

    /// Deletes every document matching a raw filter string.
    pub fn delete_by_filter(&self, filter: &str) -> Result<()> {
        self.core.delete_by_filter(filter)
    }

    /// Deletes every document matching a compiled predicate.
    pub fn delete_where(&self, predicate: &Expr) -> Result<()> {
        self.core.delete_by_filter(&predicate.compile()?)
    }

    /// Fetches documents by id, in request order. Unknown ids are skipped.
    pub fn fetch<I: AsRef<str>>(&self, ids: &[I]) -> Result<Vec<T>> {
        self.core.fetch(ids, |engine, layout, handle| self.read(engine, layout, handle))
    }

    /// Runs vector queries and returns the matching documents, best first.
    ///
    /// Each document's score member receives the engine score, or the fused
    /// score when several queries were given.
    pub fn query(&self, queries: &[VectorQuery], options: &QueryOptions) -> Result<Vec<T>> {
        let hits = self
            .core
            .query(queries, options, |engine, layout, handle| self.read(engine, layout, handle))?;
        Ok(hits
            .into_iter()
            .map(|mut hit| {
                self.model.descriptor().set_score(&mut hit.doc, hit.score);
                hit.doc
            })
            .collect())
    }

    /// Starts a query against this collection.
    pub fn query_builder(&self) -> QueryBuilder<T> {
        QueryBuilder::new(self.clone())
    }

    pub fn flush(&self) -> Result<()> {
        self.core.flush()
    }

    pub fn optimize(&self) -> Result<()> {
        self.core.optimize()
    }

    /// Builds a vector index on `field`.
    pub fn create_index(&self, field: &str, params: &IndexParams) -> Result<()> {
        self.core.create_index(field, params)
    }

    /// Builds an inverted index on the scalar `field`.
    pub fn create_scalar_index(&self, field: &str, params: InvertIndexParams) -> Result<()> {
        self.core.create_scalar_index(field, params)
    }

    pub fn drop_index(&self, field: &str) -> Result<()> {
        self.core.drop_index(field)
    }

    /// Deletes the collection's data and closes it.
    pub fn destroy(&self) -> Result<()> {
        self.core.destroy()
    }

    /// Releases the native collection. Every later call fails with `Disposed`.
    pub fn close(&self) {
        self.core.close()
    }

    pub async fn insert_async(&self, docs: Vec<T>, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.insert(&docs)).await
    }

    pub async fn upsert_async(&self, docs: Vec<T>, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.upsert(&docs)).await
    }

    pub async fn update_async(&self, docs: Vec<T>, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.update(&docs)).await
    }

    pub async fn delete_async(&self, ids: Vec<String>, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.delete(&ids)).await
    }

    pub async fn delete_by_filter_async(&self, filter: String, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.delete_by_filter(&filter)).await
    }

    pub async fn fetch_async(&self, ids: Vec<String>, cancel: Option<CancellationToken>) -> Result<Vec<T>> {
        let this = self.clone();
        offload(cancel, move || this.fetch(&ids)).await
    }

    pub async fn query_async(
        &self,
        queries: Vec<VectorQuery>,
        options: QueryOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<Vec<T>> {
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

    pub async fn create_index_async(
        &self,
        field: String,
        params: IndexParams,
        cancel: Option<CancellationToken>,
    ) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.create_index(&field, &params)).await
    }

    pub async fn drop_index_async(&self, field: String, cancel: Option<CancellationToken>) -> Result<()> {
        let this = self.clone();
        offload(cancel, move || this.drop_index(&field)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ZvecError;
    use crate::core::status::StatusCode;
    use crate::document::descriptor::{DescriptorBuilder, VectorField};
    use crate::filter::expr::field;
    use crate::native::memory::MemoryEngine;
    use crate::query::reranker::ReRanker;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Article {
        id: String,
        title: String,
        year: i32,
        embedding: Vec<f32>,
        score: f64,
    }

    impl Document for Article {
        fn describe(builder: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            builder
                .key("id", |a| &a.id, |a, v| a.id = v)
                .score(|a, s| a.score = s)
                .member("Title", |a| &a.title, |a, v| a.title = v)
                .member("Year", |a| &a.year, |a, v| a.year = v)
                .vector("Embedding", VectorField::new(4), |a| &a.embedding, |a, v| a.embedding = v)
        }
    }

    fn article(id: &str, title: &str, year: i32, embedding: [f32; 4]) -> Article {
        Article {
            id: id.to_string(),
            title: title.to_string(),
            year,
            embedding: embedding.to_vec(),
            score: 0.0,
        }
    }

    fn setup() -> (Arc<MemoryEngine>, Collection<Article>) {
        let engine = Arc::new(MemoryEngine::new());
        let model = Arc::new(DocumentModel::<Article>::build().unwrap());
        let collection = Collection::create(engine.clone(), model, "/tmp/articles", &CollectionOptions::default()).unwrap();
        (engine, collection)
    }

    #[test]
    fn test_insert_then_fetch() {
        let (engine, collection) = setup();
        collection
            .insert(&[article("doc1", "Test", 2024, [0.1, 0.2, 0.3, 0.4])])
            .unwrap();

        let docs = collection.fetch(&["doc1"]).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "doc1");
        assert_eq!(docs[0].title, "Test");
        assert_eq!(docs[0].year, 2024);
        assert_eq!(docs[0].embedding, vec![0.1, 0.2, 0.3, 0.4]);

        let live = engine.live_handles();
        assert_eq!(live.docs, 0);
        assert_eq!(live.results, 0);
        assert_eq!(live.schemas, 0);
    }

    #[test]
    fn test_fetch_skips_missing_ids() {
        let (_engine, collection) = setup();
        collection
            .insert(&[
                article("a", "First", 2020, [1.0, 0.0, 0.0, 0.0]),
                article("b", "Second", 2021, [0.0, 1.0, 0.0, 0.0]),
            ])
            .unwrap();
        let docs = collection.fetch(&["b", "missing", "a"]).unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_query_with_filter_sets_scores() {
        let (_engine, collection) = setup();
        collection
            .insert(&[
                article("old", "Old", 2010, [1.0, 0.0, 0.0, 0.0]),
                article("new", "New", 2024, [0.9, 0.1, 0.0, 0.0]),
                article("far", "Far", 2024, [0.0, 0.0, 0.0, 1.0]),
            ])
            .unwrap();

        let options = QueryOptions::new()
            .with_filter(Some(field("Year").ge(2020).compile().unwrap()))
            .with_topk(2)
            .unwrap();
        let query = VectorQuery::by_vector("Embedding", vec![1.0, 0.0, 0.0, 0.0]).unwrap();
        let docs = collection.query(&[query], &options).unwrap();

        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "far"]);
        assert!(docs[0].score > docs[1].score);
    }

    #[test]
    fn test_query_by_id_uses_stored_vector() {
        let (_engine, collection) = setup();
        collection
            .insert(&[
                article("a", "A", 2020, [1.0, 0.0, 0.0, 0.0]),
                article("b", "B", 2020, [0.8, 0.2, 0.0, 0.0]),
                article("c", "C", 2020, [0.0, 0.0, 1.0, 0.0]),
            ])
            .unwrap();
        let query = VectorQuery::by_id("Embedding", "a").unwrap();
        let docs = collection.query(&[query], &QueryOptions::new()).unwrap();
        assert_eq!(docs[0].id, "a");
        assert_eq!(docs[1].id, "b");

        let missing = VectorQuery::by_id("Embedding", "nope").unwrap();
        let err = collection.query(&[missing], &QueryOptions::new()).unwrap_err();
        assert!(matches!(err, ZvecError::NotFound(_)));
    }

    #[test]
    fn test_query_rejects_unknown_field_and_wrong_dimension() {
        let (_engine, collection) = setup();
        let unknown = VectorQuery::by_vector("Image", vec![1.0; 4]).unwrap();
        let err = collection.query(&[unknown], &QueryOptions::new()).unwrap_err();
        assert!(err.to_string().contains("Embedding"));

        let short = VectorQuery::by_vector("Embedding", vec![1.0; 3]).unwrap();
        assert!(matches!(
            collection.query(&[short], &QueryOptions::new()),
            Err(ZvecError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_several_queries_are_fused() {
        let (engine, collection) = setup();
        collection
            .insert(&[
                article("x", "X", 2020, [1.0, 0.0, 0.0, 0.0]),
                article("y", "Y", 2020, [0.0, 1.0, 0.0, 0.0]),
                article("xy", "XY", 2020, [0.7, 0.7, 0.0, 0.0]),
            ])
            .unwrap();

        let queries = vec![
            VectorQuery::by_vector("Embedding", vec![1.0, 0.0, 0.0, 0.0]).unwrap(),
            VectorQuery::by_vector("Embedding", vec![0.0, 1.0, 0.0, 0.0]).unwrap(),
        ];
        let options = QueryOptions::new()
            .with_topk(3)
            .unwrap()
            .with_reranker(Some(ReRanker::rrf(60.0).unwrap()));
        let docs = collection.query(&queries, &options).unwrap();

        assert_eq!(engine.call_count("collection_query"), 2);
        assert_eq!(docs.len(), 3);
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "xy"]);
        let expected = 1.0 / 61.0 + 1.0 / 63.0;
        assert!((docs[0].score - expected).abs() < 1e-12);
        assert!((docs[2].score - 2.0 / 62.0).abs() < 1e-12);
    }

    #[test]
    fn test_engine_error_is_surfaced_and_handles_released() {
        let (engine, collection) = setup();
        let doc = article("dup", "Dup", 2020, [1.0, 0.0, 0.0, 0.0]);
        collection.insert(&[doc.clone()]).unwrap();

        let err = collection.insert(&[doc]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::AlreadyExists);
        assert_eq!(engine.live_handles().docs, 0);
    }

    #[test]
    fn test_calls_after_close_fail_fast() {
        let (engine, collection) = setup();
        let clone = collection.clone();
        collection.close();
        collection.close();

        assert!(clone.is_closed());
        assert_eq!(clone.fetch(&["a"]).unwrap_err(), ZvecError::Disposed);
        assert_eq!(clone.flush().unwrap_err(), ZvecError::Disposed);
        assert_eq!(engine.call_count("collection_destroy"), 1);
        assert!(engine.live_handles().is_empty());
    }

    #[test]
    fn test_delete_where_compiles_predicate() {
        let (engine, collection) = setup();
        collection
            .insert(&[
                article("a", "Keep", 2024, [1.0, 0.0, 0.0, 0.0]),
                article("b", "Drop", 2001, [0.0, 1.0, 0.0, 0.0]),
            ])
            .unwrap();
        collection.delete_where(&field("Year").lt(2010)).unwrap();
        assert_eq!(engine.last_delete_filter().as_deref(), Some("(Year < 2010)"));
        assert_eq!(collection.fetch(&["a", "b"]).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_async_twins() {
        let (_engine, collection) = setup();
        collection
            .insert_async(vec![article("a", "A", 2020, [1.0, 0.0, 0.0, 0.0])], None)
            .await
            .unwrap();
        let docs = collection.fetch_async(vec!["a".to_string()], None).await.unwrap();
        assert_eq!(docs[0].title, "A");

        let token = CancellationToken::new();
        token.cancel();
        let err = collection.flush_async(Some(token)).await.unwrap_err();
        assert_eq!(err, ZvecError::Cancelled);
    }
}
