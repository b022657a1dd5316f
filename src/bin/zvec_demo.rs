// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;
use zvec_client::config::ClientConfig;
use zvec_client::filter::field;
use zvec_client::logging::{init_tracing, DEFAULT_DIRECTIVE};
use zvec_client::{Client, DescriptorBuilder, Document, MetricType, VectorField};

#[derive(Debug, Default, Clone)]
struct Article {
    id: String,
    title: String,
    category: String,
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
            .member("Category", |a| &a.category, |a, v| a.category = v)
            .member("Year", |a| &a.year, |a, v| a.year = v)
            .vector(
                "Embedding",
                VectorField::new(4).metric(MetricType::Cosine),
                |a| &a.embedding,
                |a, v| a.embedding = v,
            )
    }
}

fn main() -> Result<()> {
    init_tracing(DEFAULT_DIRECTIVE);

    let config = ClientConfig::from_env().context("reading ZVEC_* configuration")?;
    config.log_summary();

    let client = Client::from_config(&config).context("starting zvec client")?;
    info!("Engine version {}", client.version());

    let path = std::env::temp_dir().join(format!("zvec-demo-{}", Uuid::new_v4()));
    let path = path.to_string_lossy().into_owned();
    let articles = client.create_collection::<Article>(&path)?;

    articles.insert(&[
        Article {
            id: "doc1".to_string(),
            title: "Intro to vector search".to_string(),
            category: "tech".to_string(),
            year: 2024,
            embedding: vec![0.1, 0.2, 0.3, 0.4],
            ..Article::default()
        },
        Article {
            id: "doc2".to_string(),
            title: "Gardening basics".to_string(),
            category: "home".to_string(),
            year: 2019,
            embedding: vec![0.4, 0.3, 0.2, 0.1],
            ..Article::default()
        },
    ])?;
    articles.flush()?;

    let hits = articles
        .query_builder()
        .vector_nearest("Embedding", vec![0.1_f32, 0.2, 0.3, 0.35])?
        .where_expr(&field("Category").eq("tech").and(field("Year").ge(2020)))?
        .top_k(5)?
        .execute()?;
    for hit in &hits {
        info!(id = %hit.id, title = %hit.title, score = hit.score, "query hit");
    }

    for article in articles.fetch(&["doc1"])? {
        info!(id = %article.id, title = %article.title, year = article.year, "fetched");
    }

    articles.destroy()?;
    info!("Demo complete");
    Ok(())
}
