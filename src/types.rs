//! Storage scalar types and the primitive type mapper

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::field::{FieldMap, FieldType};
use crate::node::{NodeKind, ObjectNode, SchemaNode};

/// Scalar types understood by the storage engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    Date,
    Buffer,
    Mixed,
    ObjectId,
    Decimal128,
    Map,
    #[serde(rename = "UUID")]
    Uuid,
    BigInt,
}

impl ScalarType {
    /// All engine scalar types
    pub const ALL: [ScalarType; 11] = [
        ScalarType::String,
        ScalarType::Number,
        ScalarType::Boolean,
        ScalarType::Date,
        ScalarType::Buffer,
        ScalarType::Mixed,
        ScalarType::ObjectId,
        ScalarType::Decimal128,
        ScalarType::Map,
        ScalarType::Uuid,
        ScalarType::BigInt,
    ];

    /// Engine-side type name
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::String => "String",
            ScalarType::Number => "Number",
            ScalarType::Boolean => "Boolean",
            ScalarType::Date => "Date",
            ScalarType::Buffer => "Buffer",
            ScalarType::Mixed => "Mixed",
            ScalarType::ObjectId => "ObjectId",
            ScalarType::Decimal128 => "Decimal128",
            ScalarType::Map => "Map",
            ScalarType::Uuid => "UUID",
            ScalarType::BigInt => "BigInt",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named types an extension override may refer to.
///
/// Starts out with every [`ScalarType`] under its engine name; aliases can be
/// layered on top from configuration.
#[derive(Debug, Clone)]
pub struct TypeTable {
    names: BTreeMap<String, ScalarType>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self {
            names: ScalarType::ALL
                .iter()
                .map(|scalar| (scalar.name().to_string(), *scalar))
                .collect(),
        }
    }
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extra name for a scalar type
    pub fn with_alias(mut self, name: impl Into<String>, scalar: ScalarType) -> Self {
        self.names.insert(name.into(), scalar);
        self
    }

    /// Look up a named type (case-sensitive)
    pub fn resolve(&self, name: &str) -> Option<ScalarType> {
        self.names.get(name).copied()
    }

    /// All registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}

/// Map a `type`/`format` pair to a scalar type.
///
/// `node` is the raw JSON, only used for error messages.
pub fn map_primitive(
    type_name: &str,
    format: Option<&str>,
    node: &serde_json::Value,
) -> Result<ScalarType> {
    match type_name {
        "integer" | "long" | "float" | "double" => Ok(ScalarType::Number),
        "password" => Ok(ScalarType::String),
        "boolean" => Ok(ScalarType::Boolean),
        "date" | "dateTime" => Ok(ScalarType::Date),
        "number" => match format {
            Some("integer" | "long" | "float" | "double") => Ok(ScalarType::Number),
            other => Err(SchemaError::UnrecognizedFormat {
                format: other.unwrap_or("undefined").to_string(),
                node: node.to_string(),
            }),
        },
        "string" => match format {
            Some("date-time" | "date") => Ok(ScalarType::Date),
            _ => Ok(ScalarType::String),
        },
        other => Err(SchemaError::UnrecognizedType {
            type_name: other.to_string(),
            node: node.to_string(),
        }),
    }
}

/// Map a node to a field type.
///
/// Arrays recurse into their items, so arrays of arrays work. Items declared
/// `type: object` are handed to `embed`, which is expected to build their
/// field map; a bare `properties` map without a `type` is not a type.
pub fn map_type<F>(node: &SchemaNode, embed: &mut F) -> Result<FieldType>
where
    F: FnMut(&ObjectNode) -> Result<FieldMap>,
{
    match &node.kind {
        NodeKind::Primitive { type_name, format } => {
            map_primitive(type_name, format.as_deref(), &node.raw).map(FieldType::Scalar)
        }
        NodeKind::Array(items) => Ok(FieldType::Array(Box::new(map_type(items, embed)?))),
        NodeKind::Object(obj) if node.declared_type() == Some("object") => {
            embed(obj).map(FieldType::Embedded)
        }
        NodeKind::Object(_) | NodeKind::Reference(_) | NodeKind::Untyped => {
            Err(SchemaError::UnrecognizedType {
                type_name: "undefined".to_string(),
                node: node.raw.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(raw: serde_json::Value) -> Result<FieldType> {
        let node = SchemaNode::parse(&raw, "x-swaggering-mongoose");
        map_type(&node, &mut |_| Ok(FieldMap::new()))
    }

    #[test]
    fn test_numeric_types_collapse_to_number() {
        for t in ["integer", "long", "float", "double"] {
            assert_eq!(map(json!({"type": t})).unwrap(), FieldType::Scalar(ScalarType::Number));
        }
        for f in ["integer", "long", "float", "double"] {
            assert_eq!(
                map(json!({"type": "number", "format": f})).unwrap(),
                FieldType::Scalar(ScalarType::Number)
            );
        }
    }

    #[test]
    fn test_number_without_known_format_fails() {
        let err = map(json!({"type": "number"})).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnrecognizedFormat { ref format, .. } if format == "undefined"
        ));

        let err = map(json!({"type": "number", "format": "int64"})).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnrecognizedFormat { ref format, .. } if format == "int64"
        ));
    }

    #[test]
    fn test_string_formats() {
        assert_eq!(map(json!({"type": "string"})).unwrap(), FieldType::Scalar(ScalarType::String));
        assert_eq!(
            map(json!({"type": "string", "format": "email"})).unwrap(),
            FieldType::Scalar(ScalarType::String)
        );
        assert_eq!(
            map(json!({"type": "string", "format": "date"})).unwrap(),
            FieldType::Scalar(ScalarType::Date)
        );
        assert_eq!(
            map(json!({"type": "string", "format": "date-time"})).unwrap(),
            FieldType::Scalar(ScalarType::Date)
        );
    }

    #[test]
    fn test_other_primitives() {
        assert_eq!(map(json!({"type": "password"})).unwrap(), FieldType::Scalar(ScalarType::String));
        assert_eq!(map(json!({"type": "boolean"})).unwrap(), FieldType::Scalar(ScalarType::Boolean));
        assert_eq!(map(json!({"type": "date"})).unwrap(), FieldType::Scalar(ScalarType::Date));
        assert_eq!(map(json!({"type": "dateTime"})).unwrap(), FieldType::Scalar(ScalarType::Date));
    }

    #[test]
    fn test_type_names_are_case_sensitive() {
        let err = map(json!({"type": "Integer"})).unwrap_err();
        match err {
            SchemaError::UnrecognizedType { type_name, node } => {
                assert_eq!(type_name, "Integer");
                assert!(node.contains("Integer"));
            }
            other => panic!("Expected UnrecognizedType, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_arrays() {
        let ty = map(json!({
            "type": "array",
            "items": {"type": "array", "items": {"type": "integer"}}
        }))
        .unwrap();
        let number = FieldType::Scalar(ScalarType::Number);
        assert_eq!(
            ty,
            FieldType::Array(Box::new(FieldType::Array(Box::new(number))))
        );
    }

    #[test]
    fn test_array_of_refs_is_not_a_type() {
        let err = map(json!({"type": "array", "items": {"$ref": "#/definitions/Car"}})).unwrap_err();
        assert!(matches!(err, SchemaError::UnrecognizedType { .. }));
    }

    #[test]
    fn test_untyped_object_items_are_not_a_type() {
        let node = SchemaNode::parse(
            &json!({"type": "array", "items": {"properties": {"a": {"type": "string"}}}}),
            "x-swaggering-mongoose",
        );
        let mut calls = 0;
        let err = map_type(&node, &mut |_| {
            calls += 1;
            Ok(FieldMap::new())
        })
        .unwrap_err();
        assert_eq!(calls, 0);
        match err {
            SchemaError::UnrecognizedType { type_name, node } => {
                assert_eq!(type_name, "undefined");
                assert!(node.contains("properties"));
            }
            other => panic!("Expected UnrecognizedType, got {:?}", other),
        }
    }

    #[test]
    fn test_objects_are_delegated() {
        let node = SchemaNode::parse(
            &json!({"type": "array", "items": {"type": "object", "properties": {"a": {"type": "string"}}}}),
            "x-swaggering-mongoose",
        );
        let mut calls = 0;
        let ty = map_type(&node, &mut |obj| {
            calls += 1;
            assert!(obj.properties.contains_key("a"));
            Ok(FieldMap::new())
        })
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(ty, FieldType::Array(Box::new(FieldType::Embedded(FieldMap::new()))));
    }

    #[test]
    fn test_type_table_aliases() {
        let table = TypeTable::new().with_alias("Objectid", ScalarType::ObjectId);
        assert_eq!(table.resolve("Mixed"), Some(ScalarType::Mixed));
        assert_eq!(table.resolve("UUID"), Some(ScalarType::Uuid));
        assert_eq!(table.resolve("Objectid"), Some(ScalarType::ObjectId));
        assert_eq!(table.resolve("mixed"), None);
        assert!(table.names().any(|n| n == "Decimal128"));
    }
}
