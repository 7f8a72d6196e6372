//! Compiler pipeline
//!
//! `compile(document)` = `register_models(build_schemas(extract_definitions(document)))`.
//!
//! Each call starts from scratch: nothing is cached between calls, so
//! compiling the same document twice gives equal results.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::{json, Value};

use crate::adapter::{EngineAdapter, Model, ModelRegistry};
use crate::builder::{SchemaBody, SchemaBuilder};
use crate::config::{CompilerConfig, CompilerSettings};
use crate::error::{Result, SchemaError};
use crate::field::{FieldSpec, Options};
use crate::graph::ReferenceGraph;
use crate::node::Definitions;
use crate::types::TypeTable;

// =============================================================================
// Input
// =============================================================================

/// A source document in one of the accepted forms
#[derive(Debug, Clone)]
pub enum Document {
    /// Already-parsed JSON
    Json(Value),
    /// Serialized JSON bytes
    Bytes(Vec<u8>),
    /// Serialized JSON text
    Text(String),
}

impl Document {
    /// Read a document from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Document::Bytes(std::fs::read(path)?))
    }

    /// Parse into a JSON tree
    pub fn into_json(self) -> Result<Value> {
        let value = match self {
            Document::Json(value) => value,
            Document::Bytes(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                return Err(SchemaError::MissingSpec)
            }
            Document::Text(text) if text.trim().is_empty() => return Err(SchemaError::MissingSpec),
            Document::Bytes(bytes) => serde_json::from_slice(&bytes)?,
            Document::Text(text) => serde_json::from_str(&text)?,
        };

        match value {
            Value::Null => Err(SchemaError::MissingSpec),
            Value::Object(_) => Ok(value),
            other => Err(SchemaError::InvalidSpec(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Document::Json(value)
    }
}

/// `None` is an absent document
impl From<Option<Value>> for Document {
    fn from(value: Option<Value>) -> Self {
        Document::Json(value.unwrap_or(Value::Null))
    }
}

impl From<Vec<u8>> for Document {
    fn from(bytes: Vec<u8>) -> Self {
        Document::Bytes(bytes)
    }
}

impl From<&[u8]> for Document {
    fn from(bytes: &[u8]) -> Self {
        Document::Bytes(bytes.to_vec())
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Document::Text(text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Document::Text(text.to_string())
    }
}

// =============================================================================
// Output
// =============================================================================

/// One compiled definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledSchema {
    pub name: String,
    pub fields: SchemaBody,
    /// Definition-level extension payload, passed through to the engine
    pub options: Options,
}

impl CompiledSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.field(name)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "fields": self.fields.to_json(),
            "options": self.options,
        })
    }
}

/// Compiled schemas and the models registered for them
#[derive(Debug, Clone)]
pub struct CompileOutput<M = Model> {
    pub schemas: BTreeMap<String, CompiledSchema>,
    pub models: BTreeMap<String, M>,
}

// =============================================================================
// Compiler
// =============================================================================

/// Schema compiler with explicit settings and named-type table
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    settings: CompilerSettings,
    types: TypeTable,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            settings: config.compiler.clone(),
            types: config.type_table(),
        }
    }

    pub fn with_types(mut self, types: TypeTable) -> Self {
        self.types = types;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.settings.max_depth = max_depth;
        self
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Pull the definitions map out of a document.
    ///
    /// Swagger 2 `definitions` is tried first, then OpenAPI 3 `components.schemas`.
    pub fn extract_definitions(&self, document: impl Into<Document>) -> Result<Definitions> {
        let json = document.into().into_json()?;

        let definitions = json
            .get("definitions")
            .filter(|d| d.is_object())
            .or_else(|| json.pointer("/components/schemas").filter(|d| d.is_object()))
            .ok_or(SchemaError::MissingDefinitions)?;

        Ok(serde_json::from_value(definitions.clone())?)
    }

    /// Compile one named definition
    pub fn build_schema(&self, definitions: &Definitions, name: &str) -> Result<CompiledSchema> {
        let builder = SchemaBuilder::new(definitions, &self.types, &self.settings);
        let fields = builder.build_definition(name)?;
        let options = definitions
            .get(name)
            .and_then(|definition| definition.get(&self.settings.extension_key))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Ok(CompiledSchema {
            name: name.to_string(),
            fields,
            options,
        })
    }

    /// Compile every definition
    pub fn build_schemas(
        &self,
        definitions: &Definitions,
    ) -> Result<BTreeMap<String, CompiledSchema>> {
        let graph = ReferenceGraph::from_definitions(definitions, &self.settings.extension_key);
        for cycle in graph.indirect_cycles() {
            tracing::warn!(
                cycle = %cycle.join(" -> "),
                max_depth = self.settings.max_depth,
                "indirect reference cycle; compilation will hit the depth limit"
            );
        }

        definitions
            .keys()
            .map(|name| {
                tracing::debug!(definition = %name, "building schema");
                self.build_schema(definitions, name)
                    .map(|schema| (name.clone(), schema))
            })
            .collect()
    }

    /// Run the whole pipeline against `adapter`
    pub fn compile_with<A: EngineAdapter>(
        &self,
        document: impl Into<Document>,
        adapter: &mut A,
    ) -> Result<CompileOutput<A::Model>> {
        let definitions = self.extract_definitions(document)?;
        let schemas = self.build_schemas(&definitions)?;
        let models = register_models(&schemas, adapter)?;
        Ok(CompileOutput { schemas, models })
    }

    /// Run the whole pipeline against a fresh in-memory registry
    pub fn compile(&self, document: impl Into<Document>) -> Result<CompileOutput> {
        self.compile_with(document, &mut ModelRegistry::new())
    }
}

// =============================================================================
// Default pipeline
// =============================================================================

/// Extract definitions with default settings
pub fn extract_definitions(document: impl Into<Document>) -> Result<Definitions> {
    Compiler::new().extract_definitions(document)
}

/// Build schemas with default settings
pub fn build_schemas(definitions: &Definitions) -> Result<BTreeMap<String, CompiledSchema>> {
    Compiler::new().build_schemas(definitions)
}

/// Hand each compiled schema to the engine adapter
pub fn register_models<A: EngineAdapter>(
    schemas: &BTreeMap<String, CompiledSchema>,
    adapter: &mut A,
) -> Result<BTreeMap<String, A::Model>> {
    schemas
        .iter()
        .map(|(name, schema)| adapter.register(schema).map(|model| (name.clone(), model)))
        .collect()
}

/// Compile with default settings into a fresh in-memory registry
pub fn compile(document: impl Into<Document>) -> Result<CompileOutput> {
    Compiler::new().compile(document)
}
