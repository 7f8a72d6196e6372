//! Compiled field specifications
//!
//! The compiler's output is a tree of [`FieldSpec`] values. They render to
//! the JSON shape document engines expect: `{"type": "Number", "required":
//! true}` for a typed field, a nested object for an embedded document and a
//! one-element array for "list of this schema".

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::types::ScalarType;

/// Field name to compiled field
pub type FieldMap = BTreeMap<String, FieldSpec>;

/// Opaque options passed through to the storage engine
pub type Options = Map<String, Value>;

/// Resolved value of a field's `type` key
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Scalar(ScalarType),
    /// `[T]`
    Array(Box<FieldType>),
    /// An anonymous sub-document used as a type, e.g. array items of type object
    Embedded(FieldMap),
}

/// Whether a reference points back at its owner or at another collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Circular,
    External,
}

/// A by-id link to another named collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceSpec {
    pub kind: ReferenceKind,
    /// Owner name for circular references, target name otherwise
    pub target: String,
    /// The reference came from an array's items
    pub is_array: bool,
}

/// A single field: typed leaf, embedded document, or both after an extension merge
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldDef {
    /// Resolved top-level `type`; `None` for plain embedded documents
    pub field_type: Option<FieldType>,
    pub reference: Option<ReferenceSpec>,
    pub required: bool,
    pub default: Option<Value>,
    /// Sub-fields of an embedded document
    pub fields: FieldMap,
    pub options: Options,
}

/// Compiled description of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    Field(FieldDef),
    /// Array whose elements conform to the inner spec
    List(Box<FieldSpec>),
}

impl FieldSpec {
    /// A field with a resolved `type`
    pub fn typed(field_type: FieldType) -> Self {
        FieldSpec::Field(FieldDef {
            field_type: Some(field_type),
            ..FieldDef::default()
        })
    }

    pub fn scalar(scalar: ScalarType) -> Self {
        Self::typed(FieldType::Scalar(scalar))
    }

    /// An embedded document
    pub fn document(fields: FieldMap) -> Self {
        FieldSpec::Field(FieldDef {
            fields,
            ..FieldDef::default()
        })
    }

    pub fn list(inner: FieldSpec) -> Self {
        FieldSpec::List(Box::new(inner))
    }

    /// Terminal stub for a reference back to the definition being compiled
    pub fn circular(owner: impl Into<String>, is_array: bool) -> Self {
        FieldSpec::Field(FieldDef {
            field_type: Some(FieldType::Scalar(ScalarType::ObjectId)),
            reference: Some(ReferenceSpec {
                kind: ReferenceKind::Circular,
                target: owner.into(),
                is_array,
            }),
            ..FieldDef::default()
        })
    }

    /// Whether the field carries a top-level `type` key
    pub fn has_resolved_type(&self) -> bool {
        matches!(self, FieldSpec::Field(def) if def.field_type.is_some())
    }

    pub fn as_field(&self) -> Option<&FieldDef> {
        match self {
            FieldSpec::Field(def) => Some(def),
            FieldSpec::List(_) => None,
        }
    }

    pub fn is_required(&self) -> bool {
        self.as_field().map(|def| def.required).unwrap_or(false)
    }

    /// Mark the field required. Returns false, leaving the spec untouched,
    /// when there is no top-level `type` to attach the flag to.
    pub fn set_required(&mut self) -> bool {
        match self {
            FieldSpec::Field(def) if def.field_type.is_some() => {
                def.required = true;
                true
            }
            _ => false,
        }
    }

    /// Attach a default value (lists carry no defaults of their own)
    pub fn set_default(&mut self, value: Value) {
        if let FieldSpec::Field(def) = self {
            def.default = Some(value);
        }
    }

    /// Render as an engine-style JSON definition
    pub fn to_json(&self) -> Value {
        match self {
            FieldSpec::List(inner) => Value::Array(vec![inner.to_json()]),
            FieldSpec::Field(def) => {
                let mut out = fields_to_json(&def.fields);
                if let Some(field_type) = &def.field_type {
                    out.insert("type".to_string(), field_type.to_json());
                }
                if let Some(reference) = &def.reference {
                    out.insert("ref".to_string(), Value::String(reference.target.clone()));
                }
                if def.required {
                    out.insert("required".to_string(), Value::Bool(true));
                }
                if let Some(default) = &def.default {
                    out.insert("default".to_string(), default.clone());
                }
                for (key, value) in &def.options {
                    out.insert(key.clone(), value.clone());
                }
                Value::Object(out)
            }
        }
    }
}

impl FieldType {
    pub fn to_json(&self) -> Value {
        match self {
            FieldType::Scalar(scalar) => Value::String(scalar.name().to_string()),
            FieldType::Array(inner) => Value::Array(vec![inner.to_json()]),
            FieldType::Embedded(fields) => Value::Object(fields_to_json(fields)),
        }
    }
}

/// Render a field map as a JSON object
pub fn fields_to_json(fields: &FieldMap) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, spec)| (name.clone(), spec.to_json()))
        .collect()
}

impl Serialize for FieldSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
