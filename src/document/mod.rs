// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod descriptor;
pub mod doc;
pub mod registry;
pub mod value;

pub use descriptor::{DescriptorBuilder, Document, DocumentDescriptor, FieldOptions, Member, MemberRole, VectorField};
pub use doc::Doc;
pub use registry::{DescriptorRegistry, DocumentModel};
pub use value::{FieldRef, FieldType, FieldValue, ValueShape};
