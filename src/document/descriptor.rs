// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Per-type document descriptors
//!
//! A document type declares its key, optional score slot, scalar fields and
//! vector fields once through `DescriptorBuilder`. The resulting descriptor is
//! the single source of field metadata for schema generation and marshaling.

use std::fmt;

use crate::core::error::{Result, ZvecError};
use crate::core::index_params::{IndexParams, InvertIndexParams};
use crate::core::types::{IndexType, MetricType, QuantizeType, VectorPrecision};
use crate::document::value::{FieldRef, FieldType, FieldValue, ValueShape};

/// A typed document stored in a collection.
///
/// # Examples
///
/// ```
/// use zvec_client::document::{DescriptorBuilder, Document, VectorField};
/// use zvec_client::core::IndexType;
///
/// #[derive(Default)]
/// struct Article {
///     id: String,
///     title: String,
///     year: i32,
///     embedding: Option<Vec<f32>>,
///     score: Option<f64>,
/// }
///
/// impl Document for Article {
///     fn describe(builder: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
///         builder
///             .key("id", |d| &d.id, |d, v| d.id = v)
///             .score(|d, s| d.score = Some(s))
///             .member("Title", |d| &d.title, |d, v| d.title = v)
///             .member("Year", |d| &d.year, |d, v| d.year = v)
///             .vector(
///                 "Embedding",
///                 VectorField::new(4).index(IndexType::Hnsw),
///                 |d| &d.embedding,
///                 |d, v| d.embedding = v,
///             )
///     }
/// }
/// ```
pub trait Document: Default + Send + Sync + Sized + 'static {
    /// Declares the document's fields on `builder`. Called once per type and cached.
    fn describe(builder: DescriptorBuilder<Self>) -> DescriptorBuilder<Self>;
}

/// Hints for an explicitly declared scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldOptions {
    nullable: Option<bool>,
    indexed: bool,
    range_optimization: bool,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the nullability inferred from the Rust type.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Builds an inverted index over the field.
    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn range_optimization(mut self, enabled: bool) -> Self {
        self.range_optimization = enabled;
        self
    }

    pub fn nullable_hint(&self) -> Option<bool> {
        self.nullable
    }

    pub fn invert_index(&self) -> Option<InvertIndexParams> {
        self.indexed
            .then(|| InvertIndexParams::new(self.range_optimization))
    }
}

/// Declaration of a vector field: precision, dimension and index hints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorField {
    dimension: u32,
    precision: VectorPrecision,
    index_type: IndexType,
    metric: MetricType,
    quantize: QuantizeType,
    nullable: bool,
    m: i32,
    ef_construction: i32,
    n_lists: i32,
    n_probe: i32,
}

impl VectorField {
    /// Dense fp32 vector of `dimension` elements on a flat cosine index.
    pub fn new(dimension: u32) -> Self {
        Self {
            dimension,
            precision: VectorPrecision::Float32,
            index_type: IndexType::Flat,
            metric: MetricType::Cosine,
            quantize: QuantizeType::Undefined,
            nullable: true,
            m: 0,
            ef_construction: 0,
            n_lists: 0,
            n_probe: 0,
        }
    }

    /// Sparse vector with the given sparse precision. Dimension is 0.
    pub fn sparse(precision: VectorPrecision) -> Self {
        Self::new(0).precision(precision)
    }

    pub fn precision(mut self, precision: VectorPrecision) -> Self {
        self.precision = precision;
        self
    }

    pub fn index(mut self, index_type: IndexType) -> Self {
        self.index_type = index_type;
        self
    }

    pub fn metric(mut self, metric: MetricType) -> Self {
        self.metric = metric;
        self
    }

    pub fn quantize(mut self, quantize: QuantizeType) -> Self {
        self.quantize = quantize;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn m(mut self, m: i32) -> Self {
        self.m = m;
        self
    }

    pub fn ef_construction(mut self, ef_construction: i32) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    pub fn n_lists(mut self, n_lists: i32) -> Self {
        self.n_lists = n_lists;
        self
    }

    pub fn n_probe(mut self, n_probe: i32) -> Self {
        self.n_probe = n_probe;
        self
    }

    pub fn dimension_hint(&self) -> u32 {
        self.dimension
    }

    pub fn precision_hint(&self) -> VectorPrecision {
        self.precision
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Index parameters for the declared index kind, with defaults for unset values.
    pub fn index_params(&self) -> IndexParams {
        let params = match self.index_type {
            IndexType::Hnsw => IndexParams::hnsw(self.m, self.ef_construction),
            IndexType::Ivf => IndexParams::ivf(self.n_lists, self.n_probe),
            _ => IndexParams::flat(),
        };
        params.with_metric(self.metric).with_quantize(self.quantize)
    }
}

/// How a member takes part in the schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemberRole {
    /// Declared with `field`/`field_with`.
    Explicit(FieldOptions),
    /// Declared with `member`; kept only when its shape is a primitive or string.
    Implicit,
    Vector(VectorField),
}

pub(crate) trait ValueAccess<T>: Send + Sync {
    fn read<'a>(&self, doc: &'a T) -> FieldRef<'a>;
    fn write(&self, doc: &mut T, value: FieldValue) -> bool;
}

struct Accessor<T, F> {
    get: fn(&T) -> &F,
    set: fn(&mut T, F),
}

impl<T, F: FieldType> ValueAccess<T> for Accessor<T, F> {
    fn read<'a>(&self, doc: &'a T) -> FieldRef<'a> {
        (self.get)(doc).to_field_ref()
    }

    fn write(&self, doc: &mut T, value: FieldValue) -> bool {
        match F::from_field_value(value) {
            Some(value) => {
                (self.set)(doc, value);
                true
            }
            None => false,
        }
    }
}

/// One declared field of a document type.
pub struct Member<T> {
    name: String,
    role: MemberRole,
    shape: ValueShape,
    nullable: bool,
    type_name: &'static str,
    access: Box<dyn ValueAccess<T>>,
}

impl<T> Member<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> MemberRole {
        self.role
    }

    pub fn shape(&self) -> ValueShape {
        self.shape
    }

    /// Nullability of the Rust type.
    pub fn type_nullable(&self) -> bool {
        self.nullable
    }

    /// Rust type name of the field.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn read<'a>(&self, doc: &'a T) -> FieldRef<'a> {
        self.access.read(doc)
    }

    pub(crate) fn write(&self, doc: &mut T, value: FieldValue) -> bool {
        self.access.write(doc, value)
    }
}

impl<T> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("shape", &self.shape)
            .field("type_name", &self.type_name)
            .finish()
    }
}

struct KeyAccess<T> {
    name: String,
    get: fn(&T) -> &String,
    set: fn(&mut T, String),
}

/// Accumulates a document type's field declarations.
pub struct DescriptorBuilder<T> {
    name: String,
    keys: Vec<KeyAccess<T>>,
    score: Option<fn(&mut T, f64)>,
    members: Vec<Member<T>>,
}

impl<T: 'static> DescriptorBuilder<T> {
    /// Starts a descriptor named after the Rust type.
    pub fn new() -> Self {
        Self {
            name: short_type_name::<T>(),
            keys: Vec::new(),
            score: None,
            members: Vec::new(),
        }
    }

    /// Overrides the collection name derived from the type name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declares the document's identity key.
    pub fn key(mut self, name: impl Into<String>, get: fn(&T) -> &String, set: fn(&mut T, String)) -> Self {
        self.keys.push(KeyAccess {
            name: name.into(),
            get,
            set,
        });
        self
    }

    /// Declares where the similarity score of a query hit is stored.
    pub fn score(mut self, set: fn(&mut T, f64)) -> Self {
        self.score = Some(set);
        self
    }

    /// Declares an explicit scalar field with default options.
    pub fn field<F: FieldType>(self, name: impl Into<String>, get: fn(&T) -> &F, set: fn(&mut T, F)) -> Self {
        self.field_with(name, FieldOptions::default(), get, set)
    }

    /// Declares an explicit scalar field.
    pub fn field_with<F: FieldType>(
        self,
        name: impl Into<String>,
        options: FieldOptions,
        get: fn(&T) -> &F,
        set: fn(&mut T, F),
    ) -> Self {
        self.push(name.into(), MemberRole::Explicit(options), get, set)
    }

    /// Declares a plain member. It becomes a scalar field when its type is a
    /// primitive or a string and is ignored otherwise.
    pub fn member<F: FieldType>(self, name: impl Into<String>, get: fn(&T) -> &F, set: fn(&mut T, F)) -> Self {
        self.push(name.into(), MemberRole::Implicit, get, set)
    }

    /// Declares a vector field.
    pub fn vector<F: FieldType>(
        self,
        name: impl Into<String>,
        field: VectorField,
        get: fn(&T) -> &F,
        set: fn(&mut T, F),
    ) -> Self {
        self.push(name.into(), MemberRole::Vector(field), get, set)
    }

    fn push<F: FieldType>(mut self, name: String, role: MemberRole, get: fn(&T) -> &F, set: fn(&mut T, F)) -> Self {
        self.members.push(Member {
            name,
            role,
            shape: F::shape(),
            nullable: F::nullable(),
            type_name: std::any::type_name::<F>(),
            access: Box::new(Accessor { get, set }),
        });
        self
    }

    /// Finishes the descriptor.
    ///
    /// # Errors
    ///
    /// Fails unless exactly one key is declared and every name is non-empty.
    pub fn build(mut self) -> Result<DocumentDescriptor<T>> {
        if self.name.is_empty() {
            return Err(ZvecError::invalid_argument(
                "name",
                "Document type name cannot be empty",
            ));
        }
        let key = match (self.keys.pop(), self.keys.is_empty()) {
            (Some(key), true) => key,
            (None, _) => {
                return Err(ZvecError::SchemaValidation(format!(
                    "Document type '{}' declares no key field",
                    self.name
                )))
            }
            (Some(_), false) => {
                return Err(ZvecError::SchemaValidation(format!(
                    "Document type '{}' declares more than one key field",
                    self.name
                )))
            }
        };
        if let Some(member) = self.members.iter().find(|m| m.name.is_empty()) {
            return Err(ZvecError::SchemaValidation(format!(
                "Document type '{}' declares a field of type '{}' with an empty name",
                self.name, member.type_name
            )));
        }

        Ok(DocumentDescriptor {
            name: self.name,
            key,
            score: self.score,
            members: self.members,
        })
    }
}

impl<T: 'static> Default for DescriptorBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Built field metadata of one document type.
pub struct DocumentDescriptor<T> {
    name: String,
    key: KeyAccess<T>,
    score: Option<fn(&mut T, f64)>,
    members: Vec<Member<T>>,
}

impl<T> DocumentDescriptor<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_name(&self) -> &str {
        &self.key.name
    }

    pub fn members(&self) -> &[Member<T>] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&Member<T>> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn key_of<'a>(&self, doc: &'a T) -> &'a str {
        (self.key.get)(doc)
    }

    pub fn set_key(&self, doc: &mut T, key: String) {
        (self.key.set)(doc, key)
    }

    /// Stores a hit's score. A no-op when the type has no score slot.
    pub fn set_score(&self, doc: &mut T, score: f64) {
        if let Some(set) = self.score {
            set(doc, score);
        }
    }
}

impl<T> fmt::Debug for DocumentDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentDescriptor")
            .field("name", &self.name)
            .field("key", &self.key.name)
            .field("members", &self.members)
            .finish()
    }
}

fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
