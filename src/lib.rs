//! Docstore Schemas
//!
//! Compiles the `definitions` of a Swagger 2 / OpenAPI 3 document into
//! document-store schema descriptions, then registers one model per
//! definition with an engine adapter.
//!
//! ## Pipeline
//!
//! ```text
//! document ──► extract_definitions ──► build_schemas ──► register_models
//!  (JSON /        definitions map        name -> schema     name -> model
//!   bytes /
//!   text)
//! ```
//!
//! ## Field shapes
//!
//! - **Scalars**: `{"type": "String"}`, `{"type": "Number", "required": true}`
//! - **Lists**: `{"type": ["String"]}` or `[{...}]` for lists of documents
//! - **Embedded documents**: a nested field map
//! - **References**: `{"type": "ObjectId", "ref": "Car"}` for by-id links,
//!   otherwise the target definition is expanded in place
//!
//! The `x-swaggering-mongoose` extension (configurable) overrides types and
//! attaches engine options at both field and definition level.

pub mod adapter;
pub mod builder;
pub mod checksum;
pub mod compiler;
pub mod config;
pub mod error;
pub mod extension;
pub mod field;
pub mod graph;
pub mod node;
pub mod reference;
pub mod types;

pub use adapter::{EngineAdapter, Model, ModelRegistry, Violation};
pub use builder::{SchemaBody, SchemaBuilder, RESERVED_FIELDS};
pub use checksum::Checksum;
pub use compiler::{
    build_schemas, compile, extract_definitions, register_models, CompileOutput, CompiledSchema,
    Compiler, Document,
};
pub use config::{CompilerConfig, CompilerSettings, OutputFormat};
pub use error::{Result, SchemaError};
pub use extension::ExtensionMeta;
pub use field::{FieldDef, FieldMap, FieldSpec, FieldType, ReferenceKind, ReferenceSpec};
pub use graph::ReferenceGraph;
pub use node::{Definitions, SchemaNode};
pub use types::{ScalarType, TypeTable};
