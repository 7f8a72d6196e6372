//! Normalized schema nodes
//!
//! Raw definition JSON is probed once here and turned into a closed
//! [`NodeKind`] variant. Everything downstream matches on the variant
//! instead of poking at `$ref`, `items`, `type` and `properties` again.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::extension::ExtensionMeta;

/// Raw definitions by name, as found in the source document
pub type Definitions = BTreeMap<String, Value>;

/// Shape of a schema node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A scalar `type` with an optional `format`
    Primitive {
        type_name: String,
        format: Option<String>,
    },
    /// `type: array`; a missing `items` normalizes to [`NodeKind::Untyped`]
    Array(Box<SchemaNode>),
    /// `type: object`, or no `type` but a `properties` map
    Object(ObjectNode),
    /// A `$ref` pointer (not yet validated)
    Reference(String),
    /// None of the above, e.g. an extension-only property
    Untyped,
}

/// Properties and required set of an object node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectNode {
    pub properties: BTreeMap<String, SchemaNode>,
    pub required: BTreeSet<String>,
}

/// A normalized schema node
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: NodeKind,
    /// Vendor-extension payload attached to this node
    pub extension: Option<ExtensionMeta>,
    /// Declared `default` value, as written
    pub default: Option<Value>,
    /// Original JSON, kept for diagnostics
    pub raw: Value,
}

impl SchemaNode {
    /// Normalize a raw JSON node, reading vendor extensions from `extension_key`
    pub fn parse(raw: &Value, extension_key: &str) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self {
                kind: NodeKind::Untyped,
                extension: None,
                default: None,
                raw: raw.clone(),
            };
        };

        let kind = if let Some(pointer) = obj.get("$ref").and_then(Value::as_str) {
            NodeKind::Reference(pointer.to_string())
        } else {
            match obj.get("type") {
                Some(Value::String(t)) if t == "array" => {
                    let items = obj
                        .get("items")
                        .map(|items| SchemaNode::parse(items, extension_key))
                        .unwrap_or_else(SchemaNode::untyped);
                    NodeKind::Array(Box::new(items))
                }
                Some(Value::String(t)) if t == "object" => {
                    NodeKind::Object(ObjectNode::parse(
                        obj.get("properties"),
                        obj.get("required"),
                        extension_key,
                    ))
                }
                Some(Value::String(t)) => NodeKind::Primitive {
                    type_name: t.clone(),
                    format: obj.get("format").and_then(Value::as_str).map(str::to_string),
                },
                // e.g. OpenAPI 3.1 `type: ["string", "null"]`; fails in the type mapper
                Some(other) => NodeKind::Primitive {
                    type_name: other.to_string(),
                    format: None,
                },
                None if obj.contains_key("properties") => {
                    NodeKind::Object(ObjectNode::parse(
                        obj.get("properties"),
                        obj.get("required"),
                        extension_key,
                    ))
                }
                None => NodeKind::Untyped,
            }
        };

        Self {
            kind,
            extension: obj.get(extension_key).and_then(ExtensionMeta::from_value),
            default: obj.get("default").cloned(),
            raw: raw.clone(),
        }
    }

    fn untyped() -> Self {
        Self {
            kind: NodeKind::Untyped,
            extension: None,
            default: None,
            raw: Value::Null,
        }
    }

    /// The `type` string exactly as declared on the node, if any
    pub fn declared_type(&self) -> Option<&str> {
        self.raw.get("type").and_then(Value::as_str)
    }

    /// Items node of an array, if this is one
    pub fn items(&self) -> Option<&SchemaNode> {
        match &self.kind {
            NodeKind::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The `default` value if it is set to something truthy.
    ///
    /// `null`, `false`, `0` and `""` count as absent.
    pub fn truthy_default(&self) -> Option<&Value> {
        self.default.as_ref().filter(|v| is_truthy(v))
    }
}

impl ObjectNode {
    fn parse(properties: Option<&Value>, required: Option<&Value>, extension_key: &str) -> Self {
        let properties = properties
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(key, value)| (key.clone(), SchemaNode::parse(value, extension_key)))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            properties,
            required: required_set(required),
        }
    }

    pub fn is_required(&self, key: &str) -> bool {
        self.required.contains(key)
    }
}

fn required_set(value: Option<&Value>) -> BTreeSet<String> {
    value
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
