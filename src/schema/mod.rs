// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod generator;
pub mod types;

pub use generator::generate_schema;
pub use types::{CollectionSchema, FieldSchema, VectorSchema};
