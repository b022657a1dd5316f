// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use zvec_client::document::DescriptorBuilder;
use zvec_client::{
    generate_schema, CollectionSchema, DataType, FieldSchema, IndexParams, IndexType, MetricType, VectorField,
    VectorSchema, ZvecError,
};

use crate::common::Article;

#[derive(Default)]
struct Mismatched {
    id: String,
    embedding: Vec<f64>,
}

#[derive(Default)]
struct Duplicated {
    id: String,
    title: String,
    other_title: String,
}

#[test]
fn test_article_schema_has_one_entry_per_member() {
    let descriptor = DescriptorBuilder::<Article>::new();
    let descriptor = <Article as zvec_client::Document>::describe(descriptor).build().unwrap();
    let schema = generate_schema(&descriptor).unwrap();

    assert_eq!(schema.name(), "Article");
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["Title", "Category", "Year", "Rating"]);
    assert_eq!(schema.vector_names(), vec!["Embedding"]);

    assert_eq!(schema.field("year").unwrap().data_type(), DataType::Int32);
    assert!(schema.field("Rating").unwrap().nullable());
    assert!(!schema.field("Title").unwrap().nullable());

    let embedding = schema.vector("Embedding").unwrap();
    assert_eq!(embedding.data_type(), DataType::VectorFp32);
    assert_eq!(embedding.dimension(), 4);
    assert_eq!(embedding.index_params().index_type(), IndexType::Hnsw);
    assert_eq!(embedding.index_params().metric(), MetricType::Cosine);
}

#[test]
fn test_precision_mismatch_names_both_sides() {
    let descriptor = DescriptorBuilder::<Mismatched>::new()
        .key("id", |d| &d.id, |d, v| d.id = v)
        .vector("Embedding", VectorField::new(8), |d| &d.embedding, |d, v| d.embedding = v)
        .build()
        .unwrap();

    let err = generate_schema(&descriptor).unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, ZvecError::SchemaValidation(_)));
    assert!(message.contains("Embedding"));
    assert!(message.contains("f64"));
    assert!(message.contains("Solution"));
}

#[test]
fn test_duplicate_names_ignore_case() {
    let descriptor = DescriptorBuilder::<Duplicated>::new()
        .key("id", |d| &d.id, |d, v| d.id = v)
        .member("Title", |d| &d.title, |d, v| d.title = v)
        .member("TITLE", |d| &d.other_title, |d, v| d.other_title = v)
        .build()
        .unwrap();
    assert!(matches!(generate_schema(&descriptor), Err(ZvecError::SchemaValidation(_))));

    let clash = CollectionSchema::new(
        "clash",
        vec![FieldSchema::new("embedding", DataType::String, true).unwrap()],
        vec![VectorSchema::float32("Embedding", 4, None).unwrap()],
    );
    assert!(clash.is_err());
}

#[test]
fn test_dense_and_sparse_dimension_rules() {
    assert!(VectorSchema::float32("v", 0, None).is_err());
    assert!(VectorSchema::sparse_float32("terms", None).is_ok());
    assert!(VectorSchema::new("terms", DataType::SparseVectorFp32, 16, None, false).is_err());
    assert!(FieldSchema::new("v", DataType::VectorFp32, false).is_err());
}

#[test]
fn test_index_defaults_apply_to_non_positive_overrides() {
    match IndexParams::hnsw(0, -1) {
        IndexParams::Hnsw { m, ef_construction, .. } => {
            assert_eq!(m, 16);
            assert_eq!(ef_construction, 200);
        }
        other => panic!("unexpected params {:?}", other),
    }
    match IndexParams::ivf(0, 0) {
        IndexParams::Ivf { n_lists, n_probe, .. } => {
            assert_eq!(n_lists, 1024);
            assert_eq!(n_probe, 64);
        }
        other => panic!("unexpected params {:?}", other),
    }
}
