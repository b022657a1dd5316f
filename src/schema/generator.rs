// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Derives a `CollectionSchema` from a document descriptor.
//!
//! All validation happens here, before any engine call: vector shape and
//! precision must agree, dense vectors need a dimension, and scalar fields need
//! a type the engine has a column kind for.

use tracing::debug;

use crate::core::error::{Result, ZvecError};
use crate::document::descriptor::{DocumentDescriptor, FieldOptions, Member, MemberRole, VectorField};
use crate::document::value::ValueShape;
use crate::schema::types::{CollectionSchema, FieldSchema, VectorSchema};

/// Generates the schema for a described document type.
///
/// # Arguments
///
/// * `descriptor` - Built descriptor of the document type
///
/// # Returns
///
/// One `VectorSchema` per vector member and one `FieldSchema` per kept scalar
/// member, in declaration order.
///
/// # Errors
///
/// `SchemaValidation` on a shape/precision mismatch, a bad dimension, an
/// uninferrable scalar type, or a duplicate name.
pub fn generate_schema<T>(descriptor: &DocumentDescriptor<T>) -> Result<CollectionSchema> {
    let mut fields = Vec::new();
    let mut vectors = Vec::new();

    for member in descriptor.members() {
        match member.role() {
            MemberRole::Vector(options) => {
                vectors.push(vector_schema(descriptor.name(), member, &options)?);
            }
            MemberRole::Explicit(options) => {
                fields.push(field_schema(member, Some(options))?);
            }
            MemberRole::Implicit => {
                if matches!(member.shape(), ValueShape::Scalar(_)) {
                    fields.push(field_schema(member, None)?);
                } else {
                    debug!(
                        document = descriptor.name(),
                        member = member.name(),
                        "skipping non-primitive member"
                    );
                }
            }
        }
    }

    CollectionSchema::new(descriptor.name(), fields, vectors)
}

fn vector_schema<T>(type_name: &str, member: &Member<T>, options: &VectorField) -> Result<VectorSchema> {
    let precision = options.precision_hint();
    let expected = ValueShape::for_precision(precision);

    if member.shape() != expected {
        return Err(ZvecError::SchemaValidation(format!(
            "Type mismatch on field '{}.{}':\n  \
             VectorField precision {} requires field type '{}'\n  \
             but the field is declared as '{}'\n  \
             Solution: change the field type to 'Option<{}>' or update the declared precision.",
            type_name,
            member.name(),
            precision,
            expected.rust_type(),
            member.type_name(),
            expected.rust_type()
        )));
    }

    let dimension = options.dimension_hint();
    if precision.is_sparse() {
        if dimension != 0 {
            return Err(ZvecError::SchemaValidation(format!(
                "Field '{}.{}' has invalid dimension {}.\n  \
                 Sparse vectors ({}) must be declared with dimension 0.",
                type_name,
                member.name(),
                dimension,
                precision
            )));
        }
    } else if dimension == 0 {
        return Err(ZvecError::SchemaValidation(format!(
            "Field '{}.{}' has invalid dimension.\n  \
             VectorField(dimension: 0, precision: {})\n  \
             Dimension must be > 0 for dense vectors. Use dimension 0 only for sparse vectors.",
            type_name,
            member.name(),
            precision
        )));
    }

    VectorSchema::new(
        member.name(),
        precision.to_data_type(),
        dimension,
        Some(options.index_params()),
        options.is_nullable(),
    )
}

fn field_schema<T>(member: &Member<T>, options: Option<FieldOptions>) -> Result<FieldSchema> {
    let data_type = member.shape().infer_data_type().ok_or_else(|| {
        ZvecError::SchemaValidation(format!(
            "Cannot infer DataType for field '{}' of type '{}'. \
             Declare it with a supported scalar type or as a vector field explicitly.",
            member.name(),
            member.type_name()
        ))
    })?;

    let nullable = options
        .and_then(|o| o.nullable_hint())
        .unwrap_or_else(|| member.type_nullable());

    let schema = FieldSchema::new(member.name(), data_type, nullable)?;
    Ok(match options.and_then(|o| o.invert_index()) {
        Some(params) => schema.with_index(params),
        None => schema,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::index_params::{IndexParams, InvertIndexParams};
    use crate::core::sparse::SparseVector;
    use crate::core::types::{DataType, IndexType, MetricType, VectorPrecision};
    use crate::document::descriptor::DescriptorBuilder;
    use half::f16;

    #[derive(Default)]
    struct Product {
        id: String,
        name: String,
        price: Option<f64>,
        stock: u32,
        raw: serde_json::Value,
        labels: Vec<String>,
        image: Option<Vec<f32>>,
        thumb: Option<Vec<f16>>,
        terms: Option<SparseVector>,
    }

    fn product() -> DescriptorBuilder<Product> {
        DescriptorBuilder::<Product>::new()
            .key("id", |p| &p.id, |p, v| p.id = v)
            .field_with("Name", FieldOptions::new().indexed(true), |p| &p.name, |p, v| p.name = v)
            .member("Price", |p| &p.price, |p, v| p.price = v)
            .member("Stock", |p| &p.stock, |p, v| p.stock = v)
            .member("Raw", |p| &p.raw, |p, v| p.raw = v)
            .member("Labels", |p| &p.labels, |p, v| p.labels = v)
            .vector(
                "Image",
                VectorField::new(512).index(IndexType::Hnsw).metric(MetricType::Ip),
                |p| &p.image,
                |p, v| p.image = v,
            )
            .vector(
                "Thumb",
                VectorField::new(64).precision(VectorPrecision::Float16),
                |p| &p.thumb,
                |p, v| p.thumb = v,
            )
            .vector(
                "Terms",
                VectorField::sparse(VectorPrecision::SparseFloat32),
                |p| &p.terms,
                |p, v| p.terms = v,
            )
    }

    #[test]
    fn test_generates_fields_and_vectors_in_order() {
        let schema = generate_schema(&product().build().unwrap()).unwrap();

        assert_eq!(schema.name(), "Product");
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["Name", "Price", "Stock"]);
        assert_eq!(schema.vector_names(), vec!["Image", "Thumb", "Terms"]);
    }

    #[test]
    fn test_scalar_types_and_nullability() {
        let schema = generate_schema(&product().build().unwrap()).unwrap();

        let name = schema.field("Name").unwrap();
        assert_eq!(name.data_type(), DataType::String);
        assert!(!name.nullable());
        assert_eq!(name.index_params(), Some(&InvertIndexParams::new(false)));

        let price = schema.field("Price").unwrap();
        assert_eq!(price.data_type(), DataType::Double);
        assert!(price.nullable());
        assert_eq!(price.index_params(), None);

        assert_eq!(schema.field("Stock").unwrap().data_type(), DataType::UInt32);
    }

    #[test]
    fn test_vector_index_params() {
        let schema = generate_schema(&product().build().unwrap()).unwrap();

        let image = schema.vector("Image").unwrap();
        assert_eq!(image.data_type(), DataType::VectorFp32);
        assert_eq!(image.dimension(), 512);
        assert_eq!(
            image.index_params(),
            &IndexParams::hnsw(16, 200).with_metric(MetricType::Ip)
        );
        assert!(image.nullable());

        let thumb = schema.vector("Thumb").unwrap();
        assert_eq!(thumb.data_type(), DataType::VectorFp16);
        assert_eq!(thumb.index_params(), &IndexParams::flat());

        let terms = schema.vector("Terms").unwrap();
        assert!(terms.is_sparse());
        assert_eq!(terms.dimension(), 0);
    }

    #[test]
    fn test_precision_mismatch_names_both_sides() {
        let descriptor = DescriptorBuilder::<Product>::new()
            .key("id", |p| &p.id, |p, v| p.id = v)
            .vector(
                "Image",
                VectorField::new(8).precision(VectorPrecision::Float64),
                |p| &p.image,
                |p, v| p.image = v,
            )
            .build()
            .unwrap();

        let err = generate_schema(&descriptor).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Type mismatch on field 'Product.Image'"));
        assert!(message.contains("Float64"));
        assert!(message.contains("Vec<f64>"));
        assert!(message.contains("Solution"));
    }

    #[test]
    fn test_dense_vector_requires_dimension() {
        let descriptor = DescriptorBuilder::<Product>::new()
            .key("id", |p| &p.id, |p, v| p.id = v)
            .vector("Image", VectorField::new(0), |p| &p.image, |p, v| p.image = v)
            .build()
            .unwrap();

        let err = generate_schema(&descriptor).unwrap_err();
        assert!(err.to_string().contains("Dimension must be > 0 for dense vectors"));
    }

    #[test]
    fn test_explicit_opaque_field_is_rejected() {
        let descriptor = DescriptorBuilder::<Product>::new()
            .key("id", |p| &p.id, |p, v| p.id = v)
            .field("Raw", |p| &p.raw, |p, v| p.raw = v)
            .build()
            .unwrap();

        let err = generate_schema(&descriptor).unwrap_err();
        assert!(matches!(err, ZvecError::SchemaValidation(_)));
        assert!(err.to_string().contains("Cannot infer DataType for field 'Raw'"));
    }

    #[test]
    fn test_duplicate_names_fail() {
        let descriptor = product()
            .member("name", |p| &p.name, |p, v| p.name = v)
            .build()
            .unwrap();
        let err = generate_schema(&descriptor).unwrap_err();
        assert!(err.to_string().contains("Duplicate field name: 'name'"));
    }
}
