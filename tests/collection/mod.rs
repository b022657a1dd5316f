// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use zvec_client::{
    CollectionSchema, DataType, Doc, FieldSchema, IndexParams, IndexType, InvertIndexParams, MetricType, StatusCode,
    VectorSchema, ZvecError,
};

use crate::common::{article, collection_path, memory_client, seed, Article};

#[test]
fn test_insert_then_fetch_round_trip() {
    let dir = TempDir::new().unwrap();
    let (engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "articles")).unwrap();

    articles
        .insert(&[article("doc1", "Test", 2024, [0.1, 0.2, 0.3, 0.4])])
        .unwrap();
    let fetched = articles.fetch(&["doc1"]).unwrap();

    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, "doc1");
    assert_eq!(fetched[0].title, "Test");
    assert_eq!(fetched[0].year, 2024);
    assert_eq!(fetched[0].rating, None);

    let live = engine.live_handles();
    assert_eq!((live.docs, live.schemas, live.queries, live.results), (0, 0, 0, 0));
    assert_eq!(live.collections, 1);
    assert_eq!(engine.invalid_releases(), 0);
}

#[test]
fn test_upsert_update_and_delete() {
    let dir = TempDir::new().unwrap();
    let (_engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "articles")).unwrap();
    seed(&articles);

    let mut changed = article("mid", "Intro to Rust, 2nd ed.", 2016, [0.5, 0.5, 0.0, 0.0]);
    changed.rating = Some(5.0);
    articles.update(&[changed]).unwrap();
    let mid = &articles.fetch(&["mid"]).unwrap()[0];
    assert_eq!(mid.title, "Intro to Rust, 2nd ed.");
    assert_eq!(mid.rating, Some(5.0));

    let missing = articles.update(&[article("ghost", "Ghost", 2000, [1.0, 0.0, 0.0, 0.0])]);
    assert_eq!(missing.unwrap_err().status_code(), StatusCode::NotFound);

    articles
        .upsert(&[article("ghost", "Ghost", 2000, [1.0, 0.0, 0.0, 0.0])])
        .unwrap();
    articles.delete(&["ghost", "old"]).unwrap();
    articles.delete_by_filter("(Year < 2016)").unwrap();

    let remaining: Vec<String> = articles
        .fetch(&["old", "recent", "mid", "far", "ghost"])
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(remaining, vec!["recent", "mid", "far"]);
}

#[test]
fn test_write_validation_happens_before_engine_calls() {
    let dir = TempDir::new().unwrap();
    let (engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "articles")).unwrap();

    let err = articles.insert(&[article("", "No id", 2024, [0.0; 4])]).unwrap_err();
    assert!(matches!(err, ZvecError::InvalidArgument { .. }));
    assert!(err.to_string().contains("Document ID cannot be null or empty"));
    assert_eq!(engine.call_count("collection_insert"), 0);

    articles.insert(&[]).unwrap();
    assert_eq!(engine.call_count("collection_insert"), 0);
    assert!(articles.delete_by_filter(" ").is_err());
}

#[test]
fn test_engine_faults_surface_and_release_handles() {
    let dir = TempDir::new().unwrap();
    let (engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "articles")).unwrap();
    seed(&articles);

    engine.fail_next("collection_insert", StatusCode::IOError, "disk full");
    let err = articles
        .insert(&[article("new", "New", 2024, [0.0, 1.0, 0.0, 0.0])])
        .unwrap_err();
    assert_eq!(err, ZvecError::Engine {
        code: StatusCode::IOError,
        message: "disk full".to_string()
    });

    engine.fail_next("collection_query", StatusCode::IndexError, "index corrupt");
    let err = articles
        .query_builder()
        .vector_nearest("Embedding", vec![1.0_f32, 0.0, 0.0, 0.0])
        .unwrap()
        .vector_nearest("Embedding", vec![0.0_f32, 1.0, 0.0, 0.0])
        .unwrap()
        .execute()
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::IndexError);

    let live = engine.live_handles();
    assert_eq!((live.docs, live.queries, live.results), (0, 0, 0));
}

#[test]
fn test_failed_create_releases_schema() {
    let dir = TempDir::new().unwrap();
    let (engine, client) = memory_client();
    engine.fail_next("schema_add_vector_field", StatusCode::InvalidSchema, "bad vector");

    let err = client
        .create_collection::<Article>(&collection_path(&dir, "articles"))
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::InvalidSchema);
    assert!(engine.live_handles().is_empty());

    let err = client.create_collection::<Article>("").unwrap_err();
    assert!(matches!(err, ZvecError::InvalidArgument { .. }));
}

#[test]
fn test_disposed_collection_fails_fast() {
    let dir = TempDir::new().unwrap();
    let (engine, client) = memory_client();
    let path = collection_path(&dir, "articles");
    let articles = client.create_collection::<Article>(&path).unwrap();
    let other = articles.clone();
    drop(articles);
    assert!(!other.is_closed());
    assert_eq!(other.path().unwrap(), path);

    other.close();
    assert_eq!(other.path().unwrap_err(), ZvecError::Disposed);
    assert_eq!(other.fetch(&["doc1"]).unwrap_err(), ZvecError::Disposed);
    assert_eq!(other.insert(&[]).unwrap_err(), ZvecError::Disposed);
    assert_eq!(
        other
            .query_builder()
            .vector_nearest("Embedding", vec![0.0_f32; 4])
            .unwrap()
            .execute()
            .unwrap_err(),
        ZvecError::Disposed
    );
    assert_eq!(engine.call_count("collection_destroy"), 1);
    assert!(engine.live_handles().is_empty());
}

#[test]
fn test_reopen_reads_schema_and_keeps_data() {
    let dir = TempDir::new().unwrap();
    let path = collection_path(&dir, "articles");
    let (engine, client) = memory_client();
    {
        let articles = client.create_collection::<Article>(&path).unwrap();
        seed(&articles);
        articles.flush().unwrap();
    }
    assert_eq!(engine.live_handles().collections, 0);

    let reopened = client.open_collection::<Article>(&path).unwrap();
    assert_eq!(reopened.fetch(&["recent"]).unwrap()[0].rating, Some(4.5));

    let untyped = client.open_untyped(&path).unwrap();
    assert_eq!(untyped.schema().name(), "Article");
    assert_eq!(untyped.schema().vector("Embedding").unwrap().dimension(), 4);
    let doc = &untyped.fetch(&["recent"]).unwrap()[0];
    assert_eq!(doc.get::<i32>("Year"), Some(2024));
    assert_eq!(engine.stored_count(&path), Some(4));
}

#[test]
fn test_destroy_removes_data() {
    let dir = TempDir::new().unwrap();
    let path = collection_path(&dir, "articles");
    let (engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&path).unwrap();
    seed(&articles);

    articles.destroy().unwrap();
    assert!(articles.is_closed());
    assert_eq!(engine.stored_count(&path), None);
    assert!(client.open_collection::<Article>(&path).is_err());
}

#[test]
fn test_index_management() {
    let dir = TempDir::new().unwrap();
    let (engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "articles")).unwrap();

    articles
        .create_index("Embedding", &IndexParams::ivf(256, 16).with_metric(MetricType::L2))
        .unwrap();
    articles.create_scalar_index("Year", InvertIndexParams::new(true)).unwrap();
    assert!(articles.create_index("Year", &IndexParams::flat()).is_err());
    assert!(articles.create_scalar_index("Embedding", InvertIndexParams::default()).is_err());
    articles.optimize().unwrap();
    articles.drop_index("Year").unwrap();
    assert_eq!(engine.call_count("collection_create_index"), 2);
    assert_eq!(engine.call_count("collection_drop_index"), 1);

    let stored = client.open_untyped(&articles.path().unwrap()).unwrap();
    let embedding = stored.schema().vector("Embedding").unwrap();
    assert_eq!(embedding.index_params().index_type(), IndexType::Ivf);
    assert_eq!(embedding.index_params().metric(), MetricType::L2);
}

#[test]
fn test_untyped_collection_with_explicit_schema() {
    let dir = TempDir::new().unwrap();
    let (_engine, client) = memory_client();
    let schema = CollectionSchema::new(
        "products",
        vec![
            FieldSchema::new("name", DataType::String, false).unwrap(),
            FieldSchema::new("price", DataType::Double, true).unwrap(),
        ],
        vec![VectorSchema::float32("embedding", 2, Some(IndexParams::flat())).unwrap()],
    )
    .unwrap();
    let products = client.create_untyped(&collection_path(&dir, "products"), schema).unwrap();

    products
        .insert(&[
            Doc::new("p1").with_field("name", "lamp").with_field("price", 20.0).with_vector("embedding", vec![1.0, 0.0]),
            Doc::new("p2").with_field("name", "desk").with_field("price", 120.0).with_vector("embedding", vec![0.0, 1.0]),
        ])
        .unwrap();

    let query = zvec_client::VectorQuery::by_vector("embedding", vec![1.0, 0.1]).unwrap();
    let options = zvec_client::QueryOptions::new().with_filter(Some("(price < 100)".to_string()));
    let hits = products.query(&[query], &options).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id(), "p1");
    assert!(hits[0].score() > 0.9);
}

#[tokio::test]
async fn test_async_operations_and_cancellation() {
    let dir = TempDir::new().unwrap();
    let (engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "articles")).unwrap();

    articles
        .upsert_async(vec![article("a1", "Async", 2024, [1.0, 0.0, 0.0, 0.0])], None)
        .await
        .unwrap();
    let fetched = articles.fetch_async(vec!["a1".to_string()], None).await.unwrap();
    assert_eq!(fetched[0].title, "Async");

    let token = CancellationToken::new();
    token.cancel();
    let err = articles
        .insert_async(vec![article("a2", "Never", 2024, [0.0; 4])], Some(token))
        .await
        .unwrap_err();
    assert_eq!(err, ZvecError::Cancelled);
    assert_eq!(engine.call_count("collection_insert"), 0);
    assert_eq!(engine.stored_count(&articles.path().unwrap()), Some(1));
}

#[tokio::test]
async fn test_concurrent_async_writers() {
    let dir = TempDir::new().unwrap();
    let (engine, client) = memory_client();
    let articles = client.create_collection::<Article>(&collection_path(&dir, "articles")).unwrap();

    let writes = (0..8).map(|i| {
        let articles = articles.clone();
        async move {
            let doc = article(&format!("w{}", i), "Writer", 2000 + i, [i as f32, 1.0, 0.0, 0.0]);
            articles.upsert_async(vec![doc], None).await
        }
    });
    futures::future::try_join_all(writes).await.unwrap();

    assert_eq!(engine.stored_count(&articles.path().unwrap()), Some(8));
    assert_eq!(engine.live_handles().docs, 0);
}
