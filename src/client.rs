// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Entry point of the crate.
//!
//! A `Client` owns one engine, the descriptor registry and the default
//! collection options. Collections are created and opened through it so the
//! per-type models are built once and shared.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::collection::typed::Collection;
use crate::collection::untyped::UntypedCollection;
use crate::config::{ClientConfig, CollectionOptions, EngineMode};
use crate::core::error::{Result, ZvecError};
use crate::document::descriptor::Document;
use crate::document::registry::DescriptorRegistry;
use crate::native::engine::Engine;
use crate::native::library::{default_library_name, NativeEngine};
use crate::native::memory::MemoryEngine;
use crate::schema::types::CollectionSchema;

#[derive(Clone)]
pub struct Client {
    engine: Arc<dyn Engine>,
    registry: Arc<DescriptorRegistry>,
    options: CollectionOptions,
}

impl Client {
    /// Builds a client for `config`, loading the native library when needed.
    ///
    /// # Errors
    ///
    /// `LibraryLoad` when the engine library or one of its symbols cannot be
    /// resolved, `InvalidArgument` for invalid collection options.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        if !config.collection.is_valid() {
            return Err(ZvecError::invalid_argument(
                "collection",
                "Collection options out of range",
            ));
        }
        let engine: Arc<dyn Engine> = match config.engine {
            EngineMode::Native => {
                let path = config
                    .library_path
                    .clone()
                    .unwrap_or_else(|| default_library_name().into());
                Arc::new(NativeEngine::load(&path)?)
            }
            EngineMode::Memory => Arc::new(MemoryEngine::new()),
        };
        let client = Self::with_engine(engine, config.collection);
        info!(engine = ?config.engine, version = %client.version(), "zvec client ready");
        Ok(client)
    }

    /// Client over an already constructed engine.
    pub fn with_engine(engine: Arc<dyn Engine>, options: CollectionOptions) -> Self {
        Self {
            engine,
            registry: Arc::new(DescriptorRegistry::new()),
            options,
        }
    }

    /// Client over a fresh in-process engine with default options.
    pub fn memory() -> Self {
        Self::with_engine(Arc::new(MemoryEngine::new()), CollectionOptions::default())
    }

    pub fn version(&self) -> String {
        self.engine.version()
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    /// Creates a collection for `T` at `path`, using the schema generated from `T`.
    ///
    /// # Errors
    ///
    /// `SchemaValidation` when `T`'s descriptor is invalid, `InvalidArgument`
    /// for an empty path, or the engine's status.
    pub fn create_collection<T: Document>(&self, path: &str) -> Result<Collection<T>> {
        let model = self.registry.model::<T>()?;
        Collection::create(Arc::clone(&self.engine), model, path, &self.options)
    }

    /// Opens the collection at `path` for `T`.
    ///
    /// # Errors
    ///
    /// `SchemaValidation` when the stored schema lacks one of `T`'s vector
    /// fields or stores it with a different type or dimension.
    pub fn open_collection<T: Document>(&self, path: &str) -> Result<Collection<T>> {
        let model = self.registry.model::<T>()?;
        Collection::open(Arc::clone(&self.engine), model, path, &self.options)
    }

    pub fn create_untyped(&self, path: &str, schema: CollectionSchema) -> Result<UntypedCollection> {
        UntypedCollection::create(Arc::clone(&self.engine), path, schema, &self.options)
    }

    /// Opens the collection at `path` with the schema stored by the engine.
    pub fn open_untyped(&self, path: &str) -> Result<UntypedCollection> {
        UntypedCollection::open(Arc::clone(&self.engine), path, &self.options)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("version", &self.engine.version())
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}
