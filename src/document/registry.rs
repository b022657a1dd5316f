// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Per-type document models, built once and shared.
//!
//! A `DocumentModel` pairs a type's descriptor with its generated schema and
//! the mapping from schema columns back to descriptor members. The
//! `DescriptorRegistry` caches one model per `TypeId`. Concurrent first use
//! may build a model twice; only the first insert is kept.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::collection::marshal::{Column, RecordSink, RecordSource};
use crate::core::error::{Result, ZvecError};
use crate::document::descriptor::{DescriptorBuilder, Document, DocumentDescriptor};
use crate::document::value::{FieldRef, FieldValue};
use crate::schema::generator::generate_schema;
use crate::schema::types::CollectionSchema;

/// Descriptor, schema and column bindings of one document type.
pub struct DocumentModel<T> {
    descriptor: DocumentDescriptor<T>,
    schema: CollectionSchema,
    scalar_members: Vec<usize>,
    vector_members: Vec<usize>,
}

impl<T: Document> DocumentModel<T> {
    /// Describes `T`, generates its schema and binds columns to members.
    ///
    /// # Errors
    ///
    /// Any descriptor or schema validation failure.
    pub fn build() -> Result<Self> {
        let descriptor = T::describe(DescriptorBuilder::new()).build()?;
        let schema = generate_schema(&descriptor)?;

        let bind = |name: &str| {
            descriptor
                .members()
                .iter()
                .position(|m| m.name() == name)
                .ok_or_else(|| {
                    ZvecError::SchemaValidation(format!(
                        "Column '{}' has no member on document type '{}'",
                        name,
                        descriptor.name()
                    ))
                })
        };
        let scalar_members = schema
            .fields()
            .iter()
            .map(|f| bind(f.name()))
            .collect::<Result<Vec<_>>>()?;
        let vector_members = schema
            .vectors()
            .iter()
            .map(|v| bind(v.name()))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            document = descriptor.name(),
            fields = scalar_members.len(),
            vectors = vector_members.len(),
            "built document model"
        );
        Ok(Self {
            descriptor,
            schema,
            scalar_members,
            vector_members,
        })
    }
}

impl<T> DocumentModel<T> {
    pub fn descriptor(&self) -> &DocumentDescriptor<T> {
        &self.descriptor
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    pub(crate) fn source<'a>(&'a self, doc: &'a T) -> Bound<'a, T> {
        Bound { model: self, doc }
    }

    pub(crate) fn sink<'a>(&'a self, doc: &'a mut T) -> BoundMut<'a, T> {
        BoundMut { model: self, doc }
    }
}

/// A typed document read through its model.
pub(crate) struct Bound<'a, T> {
    model: &'a DocumentModel<T>,
    doc: &'a T,
}

impl<T> RecordSource for Bound<'_, T> {
    fn key(&self) -> &str {
        self.model.descriptor.key_of(self.doc)
    }

    fn scalar(&self, index: usize, _column: &Column) -> FieldRef<'_> {
        let member = self.model.scalar_members[index];
        self.model.descriptor.members()[member].read(self.doc)
    }

    fn vector(&self, index: usize, _column: &Column) -> FieldRef<'_> {
        let member = self.model.vector_members[index];
        self.model.descriptor.members()[member].read(self.doc)
    }
}

/// A typed document written through its model.
pub(crate) struct BoundMut<'a, T> {
    model: &'a DocumentModel<T>,
    doc: &'a mut T,
}

impl<T> RecordSink for BoundMut<'_, T> {
    fn set_key(&mut self, key: String) {
        self.model.descriptor.set_key(self.doc, key);
    }

    fn set_score(&mut self, score: f64) {
        self.model.descriptor.set_score(self.doc, score);
    }

    fn set_scalar(&mut self, index: usize, column: &Column, value: FieldValue) {
        let member = &self.model.descriptor.members()[self.model.scalar_members[index]];
        if !member.write(self.doc, value) {
            debug!(field = %column.name, member_type = member.type_name(), "decoded value left at default");
        }
    }

    fn set_vector(&mut self, index: usize, _column: &Column, value: Vec<f32>) {
        let member = &self.model.descriptor.members()[self.model.vector_members[index]];
        member.write(self.doc, FieldValue::VectorF32(value));
    }
}

/// Process-wide cache of document models keyed by type.
#[derive(Default)]
pub struct DescriptorRegistry {
    models: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model for `T`, built on first use.
    ///
    /// # Errors
    ///
    /// The descriptor or schema error of `T` on first use.
    pub fn model<T: Document>(&self) -> Result<Arc<DocumentModel<T>>> {
        let id = TypeId::of::<T>();
        let cached = self.models.get(&id).map(|entry| Arc::clone(entry.value()));
        if let Some(model) = cached {
            return downcast(model);
        }

        let built: Arc<dyn Any + Send + Sync> = Arc::new(DocumentModel::<T>::build()?);
        let stored = Arc::clone(self.models.entry(id).or_insert(built).value());
        downcast(stored)
    }

    pub fn contains<T: Document>(&self) -> bool {
        self.models.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn downcast<T: Document>(model: Arc<dyn Any + Send + Sync>) -> Result<Arc<DocumentModel<T>>> {
    model.downcast::<DocumentModel<T>>().map_err(|_| {
        ZvecError::InvalidOperation(format!(
            "Descriptor registry entry for '{}' has the wrong type",
            std::any::type_name::<T>()
        ))
    })
}

impl std::fmt::Debug for DescriptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorRegistry")
            .field("models", &self.models.len())
            .finish()
    }
}
