// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod engine;
pub(crate) mod handles;
pub mod library;
pub mod memory;
pub(crate) mod schema_io;

pub use engine::{
    CollectionHandle, DocHandle, Engine, EngineResult, FieldDef, NativeCollectionOptions, NativeStatus, QueryHandle,
    RawHandle, ResultHandle, SchemaHandle,
};
pub use library::{default_library_name, NativeEngine};
pub use memory::{LiveHandles, MemoryEngine, RecordedQuery};
