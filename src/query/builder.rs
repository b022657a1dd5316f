// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Fluent query construction
//!
//! `QueryBuilder` only accumulates state. Nothing reaches the engine until
//! `execute`, which assembles a fresh `QueryOptions` and hands every vector
//! clause to the collection.
//!
//! # Examples
//!
//! ```no_run
//! # use zvec_client::collection::Collection;
//! # use zvec_client::document::{DescriptorBuilder, Document, VectorField};
//! # #[derive(Default)]
//! # struct Article { id: String, year: i32, embedding: Vec<f32> }
//! # impl Document for Article {
//! #     fn describe(b: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
//! #         b.key("id", |a| &a.id, |a, v| a.id = v)
//! #             .member("Year", |a| &a.year, |a, v| a.year = v)
//! #             .vector("Embedding", VectorField::new(4), |a| &a.embedding, |a, v| a.embedding = v)
//! #     }
//! # }
//! # fn run(collection: &Collection<Article>) -> zvec_client::Result<()> {
//! use zvec_client::filter::field;
//!
//! let recent = collection
//!     .query_builder()
//!     .vector_nearest("Embedding", vec![0.1_f32, 0.2, 0.3, 0.4])?
//!     .where_expr(&field("Year").ge(2020))?
//!     .top_k(5)?
//!     .execute()?;
//! # Ok(())
//! # }
//! ```

use tokio_util::sync::CancellationToken;

use crate::collection::typed::Collection;
use crate::core::error::{Result, ZvecError};
use crate::core::index_params::IndexQueryParam;
use crate::document::descriptor::Document;
use crate::filter::expr::{Expr, UnaryOp};
use crate::query::options::{QueryOptions, DEFAULT_TOPK};
use crate::query::reranker::ReRanker;
use crate::query::vector_query::{VectorQuery, VectorValue};

/// Names a document field: a plain name, or a field expression optionally
/// wrapped in a conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Name(String),
    Expr(Expr),
}

impl Selector {
    /// The field name this selector refers to.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for anything other than a simple field access.
    pub fn resolve(&self) -> Result<String> {
        match self {
            Selector::Name(name) if !name.trim().is_empty() => Ok(name.clone()),
            Selector::Name(_) => Err(ZvecError::invalid_argument("field", "Field name cannot be empty")),
            Selector::Expr(expr) => field_of(expr).map(str::to_string).ok_or_else(|| {
                ZvecError::invalid_argument(
                    "field",
                    format!("Selector must be a simple field access, got {:?}", expr),
                )
            }),
        }
    }
}

fn field_of(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Field(name) => Some(name),
        Expr::Unary {
            op: UnaryOp::Convert,
            operand,
        } => field_of(operand),
        _ => None,
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Selector::Name(value.to_string())
    }
}

impl From<String> for Selector {
    fn from(value: String) -> Self {
        Selector::Name(value)
    }
}

impl From<Expr> for Selector {
    fn from(value: Expr) -> Self {
        Selector::Expr(value)
    }
}

impl From<&Expr> for Selector {
    fn from(value: &Expr) -> Self {
        Selector::Expr(value.clone())
    }
}

/// Accumulates vector clauses, filter, projection and fusion for one query.
pub struct QueryBuilder<T: Document> {
    collection: Collection<T>,
    queries: Vec<VectorQuery>,
    filter: Option<String>,
    topk: usize,
    include_vectors: bool,
    output_fields: Option<Vec<String>>,
    reranker: Option<ReRanker>,
}

impl<T: Document> QueryBuilder<T> {
    pub fn new(collection: Collection<T>) -> Self {
        Self {
            collection,
            queries: Vec::new(),
            filter: None,
            topk: DEFAULT_TOPK,
            include_vectors: false,
            output_fields: None,
            reranker: None,
        }
    }

    /// Adds a nearest-neighbour clause with weight 1.0.
    pub fn vector_nearest(self, field: impl Into<Selector>, value: impl Into<VectorValue>) -> Result<Self> {
        self.vector_nearest_with(field, value, 1.0, None)
    }

    /// Adds a nearest-neighbour clause.
    ///
    /// # Arguments
    ///
    /// * `value` - dense f32 or f64 (narrowed to f32) or sparse vector
    /// * `weight` - contribution of this clause when several are fused
    /// * `param` - index search parameter for this clause
    pub fn vector_nearest_with(
        mut self,
        field: impl Into<Selector>,
        value: impl Into<VectorValue>,
        weight: f64,
        param: Option<IndexQueryParam>,
    ) -> Result<Self> {
        let name = field.into().resolve()?;
        let query = VectorQuery::from_value(name, value.into())?
            .with_weight(weight)
            .with_param(param);
        self.queries.push(query);
        Ok(self)
    }

    /// Adds a clause searching with the stored vector of `document_id`.
    pub fn vector_nearest_by_id(self, field: impl Into<Selector>, document_id: impl Into<String>) -> Result<Self> {
        self.vector_nearest_by_id_with(field, document_id, 1.0, None)
    }

    pub fn vector_nearest_by_id_with(
        mut self,
        field: impl Into<Selector>,
        document_id: impl Into<String>,
        weight: f64,
        param: Option<IndexQueryParam>,
    ) -> Result<Self> {
        let name = field.into().resolve()?;
        let query = VectorQuery::by_id(name, document_id)?
            .with_weight(weight)
            .with_param(param);
        self.queries.push(query);
        Ok(self)
    }

    /// Compiles `predicate` and replaces the current filter.
    pub fn where_expr(mut self, predicate: &Expr) -> Result<Self> {
        self.filter = Some(predicate.compile()?);
        Ok(self)
    }

    /// Replaces the current filter with a raw filter string.
    pub fn where_raw(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// # Errors
    ///
    /// `InvalidArgument` when `k` is zero.
    pub fn top_k(mut self, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(ZvecError::invalid_argument("topk", "TopK must be greater than 0"));
        }
        self.topk = k;
        Ok(self)
    }

    pub fn include_vectors(mut self, include: bool) -> Self {
        self.include_vectors = include;
        self
    }

    /// Restricts the returned scalar fields. Repeated calls accumulate.
    pub fn include_fields<I, S>(mut self, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        let names = fields
            .into_iter()
            .map(|f| f.into().resolve())
            .collect::<Result<Vec<_>>>()?;
        self.output_fields.get_or_insert_with(Vec::new).extend(names);
        Ok(self)
    }

    pub fn reranker(mut self, reranker: impl Into<ReRanker>) -> Self {
        self.reranker = Some(reranker.into());
        self
    }

    pub fn queries(&self) -> &[VectorQuery] {
        &self.queries
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Options the next `execute` would run with.
    pub fn options(&self) -> Result<QueryOptions> {
        let mut options = QueryOptions::new()
            .with_topk(self.topk)?
            .with_filter(self.filter.clone())
            .with_include_vectors(self.include_vectors)
            .with_reranker(self.reranker.clone());
        if let Some(fields) = &self.output_fields {
            options = options.with_output_fields(fields.clone());
        }
        Ok(options)
    }

    fn check(&self) -> Result<()> {
        if self.queries.is_empty() {
            let names = self.collection.schema().vector_names();
            let example = names.first().copied().unwrap_or("Embedding");
            return Err(ZvecError::InvalidOperation(format!(
                "No vector query specified. Call vector_nearest or vector_nearest_by_id before execute. \
                 Available vector fields: [{}]. Example: .vector_nearest(\"{}\", embedding)?.execute()",
                names.join(", "),
                example
            )));
        }
        self.queries.iter().try_for_each(VectorQuery::validate)
    }

    /// Runs the query and returns documents, best first.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` when no vector clause was added, `InvalidArgument`
    /// for an invalid clause, or any collection error.
    pub fn execute(&self) -> Result<Vec<T>> {
        self.check()?;
        let options = self.options()?;
        self.collection.query(&self.queries, &options)
    }

    /// `execute` on the blocking pool. `cancel` is honoured only before the
    /// query starts.
    pub async fn execute_async(self, cancel: Option<CancellationToken>) -> Result<Vec<T>> {
        self.check()?;
        let options = self.options()?;
        self.collection.query_async(self.queries, options, cancel).await
    }
}
