// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use approx::assert_relative_eq;
use tempfile::TempDir;
use zvec_client::filter::field;
use zvec_client::{IndexQueryParam, ReRanker, RrfReRanker, SparseVector, WeightedReRanker, ZvecError};

use crate::common::{collection_path, memory_client, seed, Article};

#[test]
fn test_rrf_construction_and_directive() {
    assert!(RrfReRanker::new(0.0).is_err());
    assert!(RrfReRanker::new(-3.0).is_err());
    let rrf = ReRanker::from(RrfReRanker::new(60.0).unwrap());
    assert_eq!(rrf.to_directive(), "rrf(k=60)");
}

#[test]
fn test_weighted_construction_and_directive() {
    assert!(WeightedReRanker::new([("text", 0.5), ("image", 0.3)]).is_err());
    let weighted = ReRanker::weighted([("text", 0.7), ("image", 0.3)]).unwrap();
    let directive = weighted.to_directive();
    assert!(directive.contains("text:0.7000"));
    assert!(directive.contains("image:0.3000"));
}

#[test]
fn test_execute_without_vector_clause_lists_fields() {
    let dir = TempDir::new().unwrap();
    let (_engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "a")).unwrap();

    let err = articles.query_builder().top_k(3).unwrap().execute().unwrap_err();
    assert!(matches!(err, ZvecError::InvalidOperation(_)));
    assert!(err.to_string().contains("Embedding"));
}

#[test]
fn test_builder_argument_checks() {
    let dir = TempDir::new().unwrap();
    let (_engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "a")).unwrap();

    assert!(articles.query_builder().top_k(0).is_err());
    assert!(articles
        .query_builder()
        .vector_nearest(field("Year").gt(1), vec![0.0_f32; 4])
        .is_err());
    assert!(articles.query_builder().vector_nearest_by_id("Embedding", "").is_err());
}

#[test]
fn test_builder_dispatches_filter_projection_and_param() {
    let dir = TempDir::new().unwrap();
    let (engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "a")).unwrap();
    seed(&articles);

    let hits = articles
        .query_builder()
        .vector_nearest_with("Embedding", vec![1.0_f64, 0.0, 0.0, 0.0], 1.0, Some(IndexQueryParam::hnsw(128)))
        .unwrap()
        .where_raw("Year < 2000")
        .where_expr(&field("Year").ge(2000))
        .unwrap()
        .include_fields(["Title"])
        .unwrap()
        .top_k(2)
        .unwrap()
        .execute()
        .unwrap();

    let recorded = engine.last_query().unwrap();
    assert_eq!(recorded.filter.as_deref(), Some("(Year >= 2000)"));
    assert_eq!(recorded.topk, 2);
    assert_eq!(recorded.output_fields, vec!["Title".to_string()]);
    assert_eq!(recorded.ef_search, 128);
    assert!(!recorded.include_vector);

    let ids: Vec<&str> = hits.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["recent", "mid"]);
    assert_eq!(hits[0].title, "Rust in production");
    assert_eq!(hits[0].year, 0, "projected out");
    assert!(hits[0].embedding.is_empty());
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn test_include_vectors_reads_embeddings_back() {
    let dir = TempDir::new().unwrap();
    let (_engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "a")).unwrap();
    seed(&articles);

    let hits = articles
        .query_builder()
        .vector_nearest("Embedding", [0.0_f32, 0.0, 0.0, 1.0])
        .unwrap()
        .include_vectors(true)
        .top_k(1)
        .unwrap()
        .execute()
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "far");
    assert_eq!(hits[0].embedding, vec![0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn test_query_by_id_and_vector_fused_with_rrf() {
    let dir = TempDir::new().unwrap();
    let (engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "a")).unwrap();
    seed(&articles);

    let hits = articles
        .query_builder()
        .vector_nearest_by_id("Embedding", "old")
        .unwrap()
        .vector_nearest("Embedding", vec![0.0_f32, 0.0, 0.0, 1.0])
        .unwrap()
        .top_k(4)
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(engine.call_count("collection_query"), 2);
    assert_eq!(hits.len(), 4);
    // "old" ranks first for the first clause and third for the second.
    let old = hits.iter().find(|a| a.id == "old").unwrap();
    assert_relative_eq!(old.score, 1.0 / 61.0 + 1.0 / 63.0, epsilon = 1e-12);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_weighted_fusion_uses_field_weights() {
    let dir = TempDir::new().unwrap();
    let (_engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "a")).unwrap();
    seed(&articles);

    let hits = articles
        .query_builder()
        .vector_nearest("Embedding", vec![1.0_f32, 0.0, 0.0, 0.0])
        .unwrap()
        .vector_nearest("Embedding", vec![0.0_f32, 0.0, 0.0, 1.0])
        .unwrap()
        .reranker(ReRanker::weighted([("Embedding", 1.0)]).unwrap())
        .top_k(1)
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(hits.len(), 1);
    // "far" scores 0 + 1 and "old" scores 1 + 0; "old" was seen first.
    assert_eq!(hits[0].id, "old");
    assert_relative_eq!(hits[0].score, 1.0, epsilon = 1e-6);
}

#[test]
fn test_sparse_query_is_rejected_at_dispatch() {
    let dir = TempDir::new().unwrap();
    let (engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "a")).unwrap();

    let sparse = SparseVector::new(vec![1, 3], vec![0.5, 0.25]).unwrap();
    let err = articles
        .query_builder()
        .vector_nearest("Embedding", sparse)
        .unwrap()
        .execute()
        .unwrap_err();
    assert!(matches!(err, ZvecError::InvalidArgument { .. }));
    assert_eq!(engine.call_count("collection_query"), 0);
}

#[tokio::test]
async fn test_execute_async_matches_execute() {
    let dir = TempDir::new().unwrap();
    let (_engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "a")).unwrap();
    seed(&articles);

    let builder = || {
        articles
            .query_builder()
            .vector_nearest("Embedding", vec![1.0_f32, 0.0, 0.0, 0.0])
            .unwrap()
            .top_k(2)
            .unwrap()
    };
    let sync_ids: Vec<String> = builder().execute().unwrap().into_iter().map(|a| a.id).collect();
    let async_ids: Vec<String> = builder()
        .execute_async(None)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(sync_ids, async_ids);
}
