// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Collection schema definition and validation
//!
//! A `CollectionSchema` is an ordered list of scalar fields and vector fields.
//! Names are unique case-insensitively across both lists.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::core::error::{Result, ZvecError};
use crate::core::index_params::{IndexParams, InvertIndexParams};
use crate::core::types::{DataType, VectorPrecision};

/// Scalar (or scalar array) column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldSchemaData")]
pub struct FieldSchema {
    name: String,
    data_type: DataType,
    nullable: bool,
    index_params: Option<InvertIndexParams>,
}

impl FieldSchema {
    /// Creates a scalar field.
    ///
    /// # Errors
    ///
    /// Fails on an empty name or a data type that is not a scalar or array kind.
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ZvecError::invalid_argument(
                "name",
                "Field name cannot be null or empty",
            ));
        }
        if !data_type.is_scalar_kind() {
            return Err(ZvecError::invalid_argument(
                "data_type",
                format!(
                    "DataType.{} is not a valid scalar type. Use VectorSchema for vector fields.",
                    data_type
                ),
            ));
        }

        Ok(Self {
            name,
            data_type,
            nullable,
            index_params: None,
        })
    }

    /// Attaches inverted-index parameters.
    pub fn with_index(mut self, params: InvertIndexParams) -> Self {
        self.index_params = Some(params);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn index_params(&self) -> Option<&InvertIndexParams> {
        self.index_params.as_ref()
    }
}

impl fmt::Display for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FieldSchema[{}, {}, Nullable={}]",
            self.name, self.data_type, self.nullable
        )
    }
}

/// Dense or sparse vector column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VectorSchemaData")]
pub struct VectorSchema {
    name: String,
    data_type: DataType,
    dimension: u32,
    index_params: IndexParams,
    nullable: bool,
}

impl VectorSchema {
    /// Creates a vector field.
    ///
    /// # Arguments
    ///
    /// * `name` - Field name
    /// * `data_type` - A dense or sparse vector kind
    /// * `dimension` - Must be > 0 for dense kinds and 0 for sparse kinds
    /// * `index_params` - Defaults to a flat index when `None`
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        dimension: u32,
        index_params: Option<IndexParams>,
        nullable: bool,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ZvecError::invalid_argument(
                "name",
                "Vector field name cannot be null or empty",
            ));
        }
        if !data_type.is_vector() {
            return Err(ZvecError::invalid_argument(
                "data_type",
                format!("DataType.{} is not a valid vector type.", data_type),
            ));
        }
        if data_type.is_dense_vector() && dimension == 0 {
            return Err(ZvecError::invalid_argument(
                "dimension",
                format!("Dimension must be > 0 for dense vector type {}", data_type),
            ));
        }
        if data_type.is_sparse_vector() && dimension != 0 {
            return Err(ZvecError::invalid_argument(
                "dimension",
                format!(
                    "Dimension must be 0 for sparse vector type {}, got {}",
                    data_type, dimension
                ),
            ));
        }

        Ok(Self {
            name,
            data_type,
            dimension,
            index_params: index_params.unwrap_or_default(),
            nullable,
        })
    }

    /// Vector field for the given precision.
    pub fn with_precision(
        name: impl Into<String>,
        precision: VectorPrecision,
        dimension: u32,
        index_params: Option<IndexParams>,
    ) -> Result<Self> {
        Self::new(name, precision.to_data_type(), dimension, index_params, false)
    }

    pub fn float32(name: impl Into<String>, dimension: u32, index_params: Option<IndexParams>) -> Result<Self> {
        Self::with_precision(name, VectorPrecision::Float32, dimension, index_params)
    }

    pub fn float64(name: impl Into<String>, dimension: u32, index_params: Option<IndexParams>) -> Result<Self> {
        Self::with_precision(name, VectorPrecision::Float64, dimension, index_params)
    }

    pub fn float16(name: impl Into<String>, dimension: u32, index_params: Option<IndexParams>) -> Result<Self> {
        Self::with_precision(name, VectorPrecision::Float16, dimension, index_params)
    }

    pub fn int8(name: impl Into<String>, dimension: u32, index_params: Option<IndexParams>) -> Result<Self> {
        Self::with_precision(name, VectorPrecision::Int8, dimension, index_params)
    }

    pub fn sparse_float32(name: impl Into<String>, index_params: Option<IndexParams>) -> Result<Self> {
        Self::with_precision(name, VectorPrecision::SparseFloat32, 0, index_params)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    pub fn index_params(&self) -> &IndexParams {
        &self.index_params
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_sparse(&self) -> bool {
        self.data_type.is_sparse_vector()
    }
}

impl fmt::Display for VectorSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VectorSchema[{}, {}, Dim={}, Index={:?}]",
            self.name,
            self.data_type,
            self.dimension,
            self.index_params.index_type()
        )
    }
}

/// Ordered schema of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CollectionSchemaData")]
pub struct CollectionSchema {
    name: String,
    fields: Vec<FieldSchema>,
    vectors: Vec<VectorSchema>,
}

impl CollectionSchema {
    /// Assembles a schema, rejecting duplicate names across fields and vectors.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` - empty collection name
    /// * `SchemaValidation` - two entries share a name, ignoring case
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldSchema>,
        vectors: Vec<VectorSchema>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ZvecError::invalid_argument(
                "name",
                "Collection name cannot be null or empty",
            ));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.to_lowercase()) {
                return Err(ZvecError::SchemaValidation(format!(
                    "Duplicate field name: '{}'",
                    field.name
                )));
            }
        }
        for vector in &vectors {
            if !seen.insert(vector.name.to_lowercase()) {
                return Err(ZvecError::SchemaValidation(format!(
                    "Duplicate field/vector name: '{}'",
                    vector.name
                )));
            }
        }

        Ok(Self {
            name,
            fields,
            vectors,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn vectors(&self) -> &[VectorSchema] {
        &self.vectors
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        let name = name.to_lowercase();
        self.fields.iter().find(|f| f.name.to_lowercase() == name)
    }

    /// Case-insensitive vector lookup.
    pub fn vector(&self, name: &str) -> Option<&VectorSchema> {
        let name = name.to_lowercase();
        self.vectors.iter().find(|v| v.name.to_lowercase() == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn has_vector(&self, name: &str) -> bool {
        self.vector(name).is_some()
    }

    pub fn vector_names(&self) -> Vec<&str> {
        self.vectors.iter().map(|v| v.name()).collect()
    }
}

impl fmt::Display for CollectionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CollectionSchema[{}, Fields={}, Vectors={}]",
            self.name,
            self.fields.len(),
            self.vectors.len()
        )
    }
}

// Deserialized schemas pass through the same constructors as built ones.

#[derive(Deserialize)]
struct FieldSchemaData {
    name: String,
    data_type: DataType,
    nullable: bool,
    #[serde(default)]
    index_params: Option<InvertIndexParams>,
}

impl TryFrom<FieldSchemaData> for FieldSchema {
    type Error = ZvecError;

    fn try_from(data: FieldSchemaData) -> Result<Self> {
        let field = FieldSchema::new(data.name, data.data_type, data.nullable)?;
        Ok(match data.index_params {
            Some(params) => field.with_index(params),
            None => field,
        })
    }
}

#[derive(Deserialize)]
struct VectorSchemaData {
    name: String,
    data_type: DataType,
    dimension: u32,
    #[serde(default)]
    index_params: Option<IndexParams>,
    #[serde(default)]
    nullable: bool,
}

impl TryFrom<VectorSchemaData> for VectorSchema {
    type Error = ZvecError;

    fn try_from(data: VectorSchemaData) -> Result<Self> {
        VectorSchema::new(data.name, data.data_type, data.dimension, data.index_params, data.nullable)
    }
}

#[derive(Deserialize)]
struct CollectionSchemaData {
    name: String,
    #[serde(default)]
    fields: Vec<FieldSchema>,
    #[serde(default)]
    vectors: Vec<VectorSchema>,
}

impl TryFrom<CollectionSchemaData> for CollectionSchema {
    type Error = ZvecError;

    fn try_from(data: CollectionSchemaData) -> Result<Self> {
        CollectionSchema::new(data.name, data.fields, data.vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::index_params::IndexParams;

    #[test]
    fn test_field_schema_rejects_vector_types() {
        assert!(FieldSchema::new("title", DataType::String, false).is_ok());
        let err = FieldSchema::new("emb", DataType::VectorFp32, false).unwrap_err();
        assert!(err.to_string().contains("not a valid scalar type"));
        assert!(FieldSchema::new("", DataType::Int32, false).is_err());
    }

    #[test]
    fn test_vector_schema_dimension_rules() {
        assert!(VectorSchema::float32("emb", 0, None).is_err());
        assert!(VectorSchema::float32("emb", 4, None).is_ok());
        assert!(VectorSchema::sparse_float32("sparse", None).is_ok());
        assert!(VectorSchema::new("sparse", DataType::SparseVectorFp32, 8, None, false).is_err());
        assert!(VectorSchema::new("emb", DataType::Int64, 8, None, false).is_err());
    }

    #[test]
    fn test_vector_schema_defaults_to_flat_index() {
        let vector = VectorSchema::float16("emb", 128, None).unwrap();
        assert_eq!(vector.index_params(), &IndexParams::flat());
        assert_eq!(vector.data_type(), DataType::VectorFp16);
        assert!(!vector.is_sparse());
    }

    #[test]
    fn test_collection_schema_rejects_case_insensitive_duplicates() {
        let fields = vec![
            FieldSchema::new("Title", DataType::String, false).unwrap(),
            FieldSchema::new("title", DataType::String, false).unwrap(),
        ];
        let err = CollectionSchema::new("docs", fields, vec![]).unwrap_err();
        assert_eq!(
            err,
            ZvecError::SchemaValidation("Duplicate field name: 'title'".to_string())
        );

        let fields = vec![FieldSchema::new("Embedding", DataType::String, false).unwrap()];
        let vectors = vec![VectorSchema::float32("EMBEDDING", 4, None).unwrap()];
        let err = CollectionSchema::new("docs", fields, vectors).unwrap_err();
        assert!(err.to_string().contains("Duplicate field/vector name: 'EMBEDDING'"));
    }

    #[test]
    fn test_collection_schema_lookup_ignores_case() {
        let schema = CollectionSchema::new(
            "docs",
            vec![FieldSchema::new("Category", DataType::String, true).unwrap()],
            vec![VectorSchema::float32("Embedding", 4, None).unwrap()],
        )
        .unwrap();

        assert!(schema.has_field("category"));
        assert!(schema.has_vector("EMBEDDING"));
        assert!(!schema.has_vector("category"));
        assert_eq!(schema.vector_names(), vec!["Embedding"]);
        assert_eq!(schema.to_string(), "CollectionSchema[docs, Fields=1, Vectors=1]");
    }

    #[test]
    fn test_collection_schema_requires_name() {
        assert!(CollectionSchema::new("", vec![], vec![]).is_err());
    }

    #[test]
    fn test_deserialize_revalidates_schema() {
        let schema = CollectionSchema::new(
            "articles",
            vec![FieldSchema::new("Title", DataType::String, false).unwrap()],
            vec![VectorSchema::float32("Embedding", 4, Some(IndexParams::flat())).unwrap()],
        )
        .unwrap();
        let json = serde_json::to_value(&schema).unwrap();
        let decoded: CollectionSchema = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(decoded, schema);

        let mut duplicate = json.clone();
        duplicate["vectors"][0]["name"] = serde_json::json!("title");
        let err = serde_json::from_value::<CollectionSchema>(duplicate).unwrap_err();
        assert!(err.to_string().contains("Duplicate field/vector name"));

        let mut flat = json;
        flat["vectors"][0]["dimension"] = serde_json::json!(0);
        assert!(serde_json::from_value::<CollectionSchema>(flat).is_err());
    }
}
