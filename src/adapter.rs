//! Engine Adapter
//!
//! The compiler stops at [`CompiledSchema`]. Turning a schema into a live
//! collection is the job of an [`EngineAdapter`]. [`ModelRegistry`] is an
//! in-memory adapter: it keeps one [`Model`] per name and can check
//! documents against the registered schema.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::builder::{is_reserved, SchemaBody};
use crate::checksum::Checksum;
use crate::compiler::CompiledSchema;
use crate::error::{Result, SchemaError};
use crate::field::{FieldMap, FieldSpec, FieldType};
use crate::types::ScalarType;

/// Registers compiled schemas with a storage engine
pub trait EngineAdapter {
    /// Handle to a registered collection
    type Model;

    fn register(&mut self, schema: &CompiledSchema) -> Result<Self::Model>;
}

// =============================================================================
// Model
// =============================================================================

/// A registered named collection
#[derive(Debug, Clone, Serialize)]
pub struct Model {
    pub name: String,
    pub schema: CompiledSchema,
    pub checksum: Checksum,
    pub registered_at: DateTime<Utc>,
}

/// A way in which a document does not fit its model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    MissingRequired { path: String },
    UnknownField { path: String },
    TypeMismatch { path: String, expected: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingRequired { path } => write!(f, "{}: required", path),
            Violation::UnknownField { path } => write!(f, "{}: not in schema", path),
            Violation::TypeMismatch { path, expected } => {
                write!(f, "{}: expected {}", path, expected)
            }
        }
    }
}

impl Model {
    /// Strict schemas reject unknown fields; a schema opts out with `strict: false`
    pub fn is_strict(&self) -> bool {
        self.schema.options.get("strict") != Some(&Value::Bool(false))
    }

    /// Check a document against the schema.
    ///
    /// Engine-owned fields (`_id`, `__v`) are always accepted.
    pub fn validate(&self, document: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        let checker = Checker {
            strict: self.is_strict(),
            out: &mut violations,
        };
        checker.check_body(&self.schema.fields, document);
        violations
    }
}

struct Checker<'v> {
    strict: bool,
    out: &'v mut Vec<Violation>,
}

impl Checker<'_> {
    fn check_body(mut self, body: &SchemaBody, document: &Value) {
        match body {
            SchemaBody::Fields(fields) => self.check_document(fields, document, ""),
            SchemaBody::Single(spec) => self.check_spec(spec, document, "$"),
        }
    }

    fn check_document(&mut self, fields: &FieldMap, value: &Value, path: &str) {
        let Some(doc) = value.as_object() else {
            self.mismatch(path_or_root(path), "object");
            return;
        };

        for (name, spec) in fields {
            let field_path = join(path, name);
            match doc.get(name) {
                None | Some(Value::Null) => {
                    if spec.is_required() {
                        self.out.push(Violation::MissingRequired { path: field_path });
                    }
                }
                Some(v) => self.check_spec(spec, v, &field_path),
            }
        }

        if self.strict {
            self.check_unknown(fields, doc, path);
        }
    }

    fn check_unknown(&mut self, fields: &FieldMap, doc: &Map<String, Value>, path: &str) {
        for key in doc.keys() {
            if !fields.contains_key(key) && !is_reserved(key) {
                self.out.push(Violation::UnknownField { path: join(path, key) });
            }
        }
    }

    fn check_spec(&mut self, spec: &FieldSpec, value: &Value, path: &str) {
        match spec {
            FieldSpec::List(inner) => self.check_items(value, path, |checker, item, item_path| {
                checker.check_spec(inner, item, item_path)
            }),
            FieldSpec::Field(def) => match &def.field_type {
                Some(field_type) => self.check_type(field_type, value, path),
                None => self.check_document(&def.fields, value, path),
            },
        }
    }

    fn check_type(&mut self, field_type: &FieldType, value: &Value, path: &str) {
        match field_type {
            FieldType::Scalar(scalar) => {
                if !accepts(*scalar, value) {
                    self.mismatch(path, scalar.name());
                }
            }
            FieldType::Array(inner) => self.check_items(value, path, |checker, item, item_path| {
                checker.check_type(inner, item, item_path)
            }),
            FieldType::Embedded(fields) => self.check_document(fields, value, path),
        }
    }

    fn check_items<F>(&mut self, value: &Value, path: &str, mut check: F)
    where
        F: FnMut(&mut Self, &Value, &str),
    {
        let Some(items) = value.as_array() else {
            self.mismatch(path, "array");
            return;
        };
        for (i, item) in items.iter().enumerate() {
            check(self, item, &format!("{}[{}]", path, i));
        }
    }

    fn mismatch(&mut self, path: &str, expected: &str) {
        self.out.push(Violation::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
        });
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn path_or_root(path: &str) -> &str {
    if path.is_empty() {
        "$"
    } else {
        path
    }
}

/// Whether a JSON value can be stored as `scalar`
fn accepts(scalar: ScalarType, value: &Value) -> bool {
    match scalar {
        ScalarType::String | ScalarType::Uuid => value.is_string(),
        ScalarType::Number => value.is_number(),
        ScalarType::Boolean => value.is_boolean(),
        ScalarType::Date => match value {
            Value::String(s) => {
                DateTime::parse_from_rfc3339(s).is_ok()
                    || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
            }
            Value::Number(_) => true,
            _ => false,
        },
        ScalarType::ObjectId => value
            .as_str()
            .map(|s| s.len() == 24 && s.chars().all(|c| c.is_ascii_hexdigit()))
            .unwrap_or(false),
        ScalarType::Decimal128 | ScalarType::BigInt => match value {
            Value::Number(_) => true,
            Value::String(s) => s.parse::<f64>().is_ok(),
            _ => false,
        },
        ScalarType::Buffer => value.is_string() || value.is_array(),
        ScalarType::Map => value.is_object(),
        ScalarType::Mixed => true,
    }
}

// =============================================================================
// Registry
// =============================================================================

/// In-memory model registry
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Model>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Registered model names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Drop a model so the name can be registered again
    pub fn remove(&mut self, name: &str) -> Option<Model> {
        self.models.remove(name)
    }
}

impl EngineAdapter for ModelRegistry {
    type Model = Model;

    /// Registering an identical schema again returns the existing model;
    /// a different schema under a taken name is a conflict.
    fn register(&mut self, schema: &CompiledSchema) -> Result<Model> {
        let checksum = Checksum::from_json(&schema.to_json());

        if let Some(existing) = self.models.get(&schema.name) {
            if existing.checksum == checksum {
                return Ok(existing.clone());
            }
            return Err(SchemaError::ModelConflict {
                name: schema.name.clone(),
            });
        }

        tracing::info!(model = %schema.name, checksum = %checksum.short(), "registered model");
        let model = Model {
            name: schema.name.clone(),
            schema: schema.clone(),
            checksum,
            registered_at: Utc::now(),
        };
        self.models.insert(schema.name.clone(), model.clone());
        Ok(model)
    }
}
