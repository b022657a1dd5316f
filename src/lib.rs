// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Typed client for the zvec vector engine.
//!
//! Document types describe themselves once through [`Document`]; the client
//! derives a collection schema from that description, marshals documents to
//! and from the engine's native records, compiles filter predicates to the
//! engine's grammar and composes vector queries with optional fusion.
//!
//! ```
//! use zvec_client::{Client, DescriptorBuilder, Document, VectorField};
//!
//! #[derive(Default)]
//! struct Article {
//!     id: String,
//!     title: String,
//!     year: i32,
//!     embedding: Vec<f32>,
//! }
//!
//! impl Document for Article {
//!     fn describe(builder: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
//!         builder
//!             .key("id", |a| &a.id, |a, v| a.id = v)
//!             .member("Title", |a| &a.title, |a, v| a.title = v)
//!             .member("Year", |a| &a.year, |a, v| a.year = v)
//!             .vector("Embedding", VectorField::new(4), |a| &a.embedding, |a, v| a.embedding = v)
//!     }
//! }
//!
//! let client = Client::memory();
//! let articles = client.create_collection::<Article>("/data/articles").unwrap();
//! articles
//!     .insert(&[Article {
//!         id: "doc1".into(),
//!         title: "Test".into(),
//!         year: 2024,
//!         embedding: vec![0.1, 0.2, 0.3, 0.4],
//!     }])
//!     .unwrap();
//!
//! let fetched = articles.fetch(&["doc1"]).unwrap();
//! assert_eq!(fetched[0].title, "Test");
//! ```

pub mod client;
pub mod collection;
pub mod config;
pub mod core;
pub mod document;
pub mod filter;
pub mod logging;
pub mod native;
pub mod query;
pub mod schema;

pub use crate::client::Client;
pub use crate::collection::{Collection, UntypedCollection};
pub use crate::config::{ClientConfig, CollectionOptions, EngineMode};
pub use crate::core::{
    DataType, IndexParams, IndexQueryParam, IndexType, InvertIndexParams, MetricType, QuantizeType, Result,
    SparseVector, Status, StatusCode, VectorPrecision, ZvecError,
};
pub use crate::document::{DescriptorBuilder, Doc, Document, FieldOptions, FieldValue, VectorField};
pub use crate::filter::{field, lit, null, Expr};
pub use crate::query::{QueryBuilder, QueryOptions, ReRanker, RrfReRanker, VectorQuery, WeightedReRanker};
pub use crate::schema::{generate_schema, CollectionSchema, FieldSchema, VectorSchema};
