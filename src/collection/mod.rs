// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub(crate) mod core;
pub(crate) mod marshal;
pub(crate) mod offload;
pub mod typed;
pub mod untyped;

pub use typed::Collection;
pub use untyped::UntypedCollection;
