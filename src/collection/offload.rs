// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Runs blocking collection calls on tokio's blocking pool.
//!
//! The engine offers no asynchronous I/O. An `_async` method is its
//! synchronous twin moved onto a worker thread. The cancellation token is
//! checked before the call starts; a started call always runs to completion.

use tokio_util::sync::CancellationToken;

use crate::core::error::{Result, ZvecError};

pub(crate) async fn offload<R, F>(cancel: Option<CancellationToken>, work: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce() -> Result<R> + Send + 'static,
{
    if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
        return Err(ZvecError::Cancelled);
    }

    tokio::task::spawn_blocking(move || {
        // The worker may start late; this is the last point a cancel is seen.
        if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(ZvecError::Cancelled);
        }
        work()
    })
    .await
    .map_err(|e| ZvecError::Task(e.to_string()))?
}
