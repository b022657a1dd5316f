// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for the integration tests.

use std::sync::Arc;

use tempfile::TempDir;
use zvec_client::native::MemoryEngine;
use zvec_client::{Client, CollectionOptions, DescriptorBuilder, Document, IndexType, VectorField};

pub const DIM: usize = 4;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub category: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub embedding: Vec<f32>,
    pub score: f64,
}

impl Document for Article {
    fn describe(builder: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        builder
            .key("id", |a| &a.id, |a, v| a.id = v)
            .score(|a, s| a.score = s)
            .member("Title", |a| &a.title, |a, v| a.title = v)
            .member("Category", |a| &a.category, |a, v| a.category = v)
            .member("Year", |a| &a.year, |a, v| a.year = v)
            .member("Rating", |a| &a.rating, |a, v| a.rating = v)
            .vector(
                "Embedding",
                VectorField::new(DIM as u32).index(IndexType::Hnsw),
                |a| &a.embedding,
                |a, v| a.embedding = v,
            )
    }
}

pub fn article(id: &str, title: &str, year: i32, embedding: [f32; DIM]) -> Article {
    Article {
        id: id.to_string(),
        title: title.to_string(),
        category: "tech".to_string(),
        year,
        embedding: embedding.to_vec(),
        ..Article::default()
    }
}

/// A client over an in-process engine the test can inspect.
pub fn memory_client() -> (Arc<MemoryEngine>, Client) {
    let engine = Arc::new(MemoryEngine::new());
    let client = Client::with_engine(engine.clone(), CollectionOptions::default());
    (engine, client)
}

/// A unique collection path inside a temporary directory.
pub fn collection_path(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}

pub fn seed(collection: &zvec_client::Collection<Article>) {
    let mut recent = article("recent", "Rust in production", 2024, [0.9, 0.1, 0.0, 0.0]);
    recent.rating = Some(4.5);
    collection
        .insert(&[
            article("old", "Intro to C", 1999, [1.0, 0.0, 0.0, 0.0]),
            recent,
            article("mid", "Intro to Rust", 2015, [0.5, 0.5, 0.0, 0.0]),
            article("far", "Gardening", 2024, [0.0, 0.0, 0.0, 1.0]),
        ])
        .unwrap();
}
