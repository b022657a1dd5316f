// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Scope-bound ownership of native handles.
//!
//! Every handle created inside an operation is wrapped in a guard as soon as
//! the engine returns it and released when the guard drops, on success and on
//! every error path. Documents borrowed from a result set are exposed as bare
//! `DocHandle`s tied to the `ResultSet` borrow and are never released
//! individually.

use std::fmt;
use std::marker::PhantomData;

use crate::core::error::{Result, ZvecError};
use crate::native::engine::{DocHandle, Engine, QueryHandle, ResultHandle, SchemaHandle};

pub(crate) trait HandleKind {
    type Handle: Copy + fmt::Debug;
    const NAME: &'static str;

    fn release(engine: &dyn Engine, handle: Self::Handle);
}

pub(crate) struct DocKind;
pub(crate) struct SchemaKind;
pub(crate) struct QueryKind;
pub(crate) struct ResultKind;

impl HandleKind for DocKind {
    type Handle = DocHandle;
    const NAME: &'static str = "document";

    fn release(engine: &dyn Engine, handle: DocHandle) {
        engine.doc_destroy(handle)
    }
}

impl HandleKind for SchemaKind {
    type Handle = SchemaHandle;
    const NAME: &'static str = "schema";

    fn release(engine: &dyn Engine, handle: SchemaHandle) {
        engine.schema_destroy(handle)
    }
}

impl HandleKind for QueryKind {
    type Handle = QueryHandle;
    const NAME: &'static str = "query";

    fn release(engine: &dyn Engine, handle: QueryHandle) {
        engine.query_destroy(handle)
    }
}

impl HandleKind for ResultKind {
    type Handle = ResultHandle;
    const NAME: &'static str = "result";

    fn release(engine: &dyn Engine, handle: ResultHandle) {
        engine.result_destroy(handle)
    }
}

/// Owns one native handle and releases it on drop.
pub(crate) struct Owned<'e, K: HandleKind> {
    engine: &'e dyn Engine,
    handle: K::Handle,
    _kind: PhantomData<K>,
}

impl<K: HandleKind> fmt::Debug for Owned<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned")
            .field("kind", &K::NAME)
            .field("handle", &self.handle)
            .finish()
    }
}

impl<'e, K: HandleKind> Owned<'e, K> {
    pub(crate) fn new(engine: &'e dyn Engine, handle: K::Handle) -> Self {
        Self {
            engine,
            handle,
            _kind: PhantomData,
        }
    }

    /// Wraps the result of a factory call, failing when it returned null.
    pub(crate) fn adopt(engine: &'e dyn Engine, handle: Option<K::Handle>) -> Result<Self> {
        handle
            .map(|h| Self::new(engine, h))
            .ok_or_else(|| ZvecError::Engine {
                code: crate::core::status::StatusCode::InternalError,
                message: format!("engine failed to create a {} handle", K::NAME),
            })
    }

    pub(crate) fn handle(&self) -> K::Handle {
        self.handle
    }
}

impl<K: HandleKind> Drop for Owned<'_, K> {
    fn drop(&mut self) {
        K::release(self.engine, self.handle);
    }
}

pub(crate) type OwnedDoc<'e> = Owned<'e, DocKind>;
pub(crate) type OwnedSchema<'e> = Owned<'e, SchemaKind>;
pub(crate) type OwnedQuery<'e> = Owned<'e, QueryKind>;

/// Documents created for one batch call. All are released together.
pub(crate) struct DocBatch<'e> {
    docs: Vec<OwnedDoc<'e>>,
}

impl<'e> DocBatch<'e> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            docs: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, doc: OwnedDoc<'e>) {
        self.docs.push(doc);
    }

    pub(crate) fn handles(&self) -> Vec<DocHandle> {
        self.docs.iter().map(Owned::handle).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.docs.len()
    }
}

/// Owned result set.
pub(crate) struct ResultSet<'e> {
    inner: Owned<'e, ResultKind>,
}

impl<'e> ResultSet<'e> {
    pub(crate) fn new(engine: &'e dyn Engine, handle: ResultHandle) -> Self {
        Self {
            inner: Owned::new(engine, handle),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.engine.result_count(self.inner.handle)
    }

    /// Documents of the result, valid while `self` is borrowed.
    pub(crate) fn docs(&self) -> impl Iterator<Item = DocHandle> + '_ {
        (0..self.len()).filter_map(move |i| self.inner.engine.result_get_doc(self.inner.handle, i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::memory::MemoryEngine;

    #[test]
    fn test_guards_release_on_drop() {
        let engine = MemoryEngine::new();
        {
            let _doc = OwnedDoc::adopt(&engine, engine.doc_create()).unwrap();
            let _query = OwnedQuery::adopt(&engine, engine.query_create()).unwrap();
            assert_eq!(engine.live_handles().docs, 1);
            assert_eq!(engine.live_handles().queries, 1);
        }
        assert!(engine.live_handles().is_empty());
    }

    #[test]
    fn test_batch_releases_every_document_on_early_return() {
        let engine = MemoryEngine::new();

        fn fill(engine: &MemoryEngine, fail_at: usize) -> Result<usize> {
            let mut batch = DocBatch::with_capacity(4);
            for i in 0..4 {
                if i == fail_at {
                    return Err(ZvecError::invalid_argument("doc", "bad document"));
                }
                batch.push(OwnedDoc::adopt(engine, engine.doc_create())?);
            }
            Ok(batch.len())
        }

        assert_eq!(fill(&engine, 10).unwrap(), 4);
        assert!(fill(&engine, 2).is_err());
        assert_eq!(engine.live_handles().docs, 0);
    }

    #[test]
    fn test_adopt_null_handle_fails() {
        let engine = MemoryEngine::new();
        let err = OwnedSchema::adopt(&engine, None).unwrap_err();
        assert!(err.to_string().contains("schema handle"));

        let schema = OwnedSchema::adopt(&engine, engine.schema_create(&std::ffi::CString::new("Items").unwrap())).unwrap();
        assert!(format!("{:?}", schema).contains("schema"));
    }
}
