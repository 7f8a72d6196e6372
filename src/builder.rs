//! Schema Builder
//!
//! Walks one definition and produces its field map. Per property the
//! dispatch order is:
//!
//! 1. reserved names (`_id`, `__v`) are skipped outright;
//! 2. an array whose items carry an extension becomes a list of the
//!    extension-defined type;
//! 3. a reference (direct or through array items) is resolved;
//! 4. a declared `type` is mapped (`object` recurses as an embedded document);
//! 5. the `required` flag is applied if the field has a resolved `type`;
//! 6. the property's own extension is merged on top.
//!
//! Errors raised for a property are wrapped with its key and raw JSON.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::config::CompilerSettings;
use crate::error::{Result, SchemaError};
use crate::extension::ExtensionMerger;
use crate::field::{fields_to_json, FieldMap, FieldSpec, FieldType};
use crate::node::{Definitions, NodeKind, ObjectNode, SchemaNode};
use crate::types::{self, TypeTable};

/// Field names owned by the storage engine (identity and revision counter)
pub const RESERVED_FIELDS: [&str; 2] = ["_id", "__v"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// Result of building one node
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaBody {
    /// Field name -> field, the usual case
    Fields(FieldMap),
    /// A bare single-type node (`{"type": "string"}`) compiles to one field
    Single(FieldSpec),
}

impl SchemaBody {
    /// Use the body as the value of a field: field maps become embedded documents
    pub fn into_field_spec(self) -> FieldSpec {
        match self {
            SchemaBody::Fields(fields) => FieldSpec::document(fields),
            SchemaBody::Single(spec) => spec,
        }
    }

    pub fn fields(&self) -> Option<&FieldMap> {
        match self {
            SchemaBody::Fields(fields) => Some(fields),
            SchemaBody::Single(_) => None,
        }
    }

    /// Look up a top-level field
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields().and_then(|fields| fields.get(name))
    }

    pub fn to_json(&self) -> Value {
        match self {
            SchemaBody::Fields(fields) => Value::Object(fields_to_json(fields)),
            SchemaBody::Single(spec) => spec.to_json(),
        }
    }
}

impl Serialize for SchemaBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Builds field maps for the definitions of one document
pub struct SchemaBuilder<'a> {
    definitions: &'a Definitions,
    types: &'a TypeTable,
    settings: &'a CompilerSettings,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(
        definitions: &'a Definitions,
        types: &'a TypeTable,
        settings: &'a CompilerSettings,
    ) -> Self {
        Self {
            definitions,
            types,
            settings,
        }
    }

    /// Build a named definition
    pub fn build_definition(&self, name: &str) -> Result<SchemaBody> {
        let raw = self.lookup(name)?;
        self.build_schema(&self.parse(raw), name)
    }

    /// Build `node`, treating references to `own_name` as circular
    pub fn build_schema(&self, node: &SchemaNode, own_name: &str) -> Result<SchemaBody> {
        self.build_at(node, own_name, 0)
    }

    pub(crate) fn build_at(
        &self,
        node: &SchemaNode,
        own_name: &str,
        depth: usize,
    ) -> Result<SchemaBody> {
        self.guard(own_name, depth)?;

        // Definition-level payloads are schema options; only the items' payload applies
        if let Some(list) = self.merger().items_extension(node)? {
            return Ok(SchemaBody::Single(list));
        }

        match &node.kind {
            NodeKind::Object(obj) => {
                Ok(SchemaBody::Fields(self.build_fields(obj, own_name, depth)?))
            }
            NodeKind::Reference(pointer) => Ok(SchemaBody::Single(
                self.resolve_reference(node, pointer, false, own_name, depth)?,
            )),
            NodeKind::Array(items) => match &items.kind {
                NodeKind::Reference(pointer) => Ok(SchemaBody::Single(
                    self.resolve_reference(node, pointer, true, own_name, depth)?,
                )),
                _ => Ok(SchemaBody::Single(FieldSpec::typed(
                    self.map_type(node, own_name, depth)?,
                ))),
            },
            NodeKind::Primitive { .. } => Ok(SchemaBody::Single(FieldSpec::typed(
                self.map_type(node, own_name, depth)?,
            ))),
            NodeKind::Untyped => Ok(SchemaBody::Fields(FieldMap::new())),
        }
    }

    fn build_fields(&self, obj: &ObjectNode, own_name: &str, depth: usize) -> Result<FieldMap> {
        let mut fields = FieldMap::new();

        for (key, property) in &obj.properties {
            if is_reserved(key) {
                continue;
            }

            let spec = self
                .build_property(obj, key, property, own_name, depth)
                .map_err(|e| e.in_property(key.as_str(), &property.raw))?;

            if let Some(spec) = spec {
                fields.insert(key.clone(), spec);
            }
        }

        Ok(fields)
    }

    fn build_property(
        &self,
        parent: &ObjectNode,
        key: &str,
        property: &SchemaNode,
        own_name: &str,
        depth: usize,
    ) -> Result<Option<FieldSpec>> {
        let merger = self.merger();

        if let Some(list) = merger.array_extension(property)? {
            return Ok(Some(list));
        }

        let mut spec = match &property.kind {
            NodeKind::Reference(pointer) => {
                Some(self.resolve_reference(property, pointer, false, own_name, depth)?)
            }
            NodeKind::Array(items) => match &items.kind {
                NodeKind::Reference(pointer) => {
                    Some(self.resolve_reference(property, pointer, true, own_name, depth)?)
                }
                _ => Some(self.typed_field(property, key, depth)?),
            },
            NodeKind::Primitive { .. } => Some(self.typed_field(property, key, depth)?),
            // Anonymous embedded object, compiled under the property's own name
            NodeKind::Object(_) if property.declared_type().is_some() => {
                let mut spec = self.build_at(property, key, depth + 1)?.into_field_spec();
                if let Some(default) = property.truthy_default() {
                    spec.set_default(default.clone());
                }
                Some(spec)
            }
            NodeKind::Object(_) | NodeKind::Untyped => None,
        };

        if parent.is_required(key) {
            let applied = spec.as_mut().map(FieldSpec::set_required).unwrap_or(false);
            if !applied {
                tracing::warn!(
                    field = key,
                    definition = own_name,
                    "required flag dropped: no resolved type"
                );
            }
        }

        merger.merge(spec, property)
    }

    fn typed_field(&self, property: &SchemaNode, context: &str, depth: usize) -> Result<FieldSpec> {
        let mut spec = FieldSpec::typed(self.map_type(property, context, depth)?);
        if let Some(default) = property.truthy_default() {
            spec.set_default(default.clone());
        }
        Ok(spec)
    }

    /// Map a node's type; object items are built as embedded documents named
    /// after `context`
    fn map_type(&self, node: &SchemaNode, context: &str, depth: usize) -> Result<FieldType> {
        types::map_type(node, &mut |obj: &ObjectNode| {
            self.guard(context, depth + 1)?;
            self.build_fields(obj, context, depth + 1)
        })
    }

    fn merger(&self) -> ExtensionMerger<'_> {
        ExtensionMerger::new(
            self.types,
            &self.settings.extension_key,
            &self.settings.reference_type,
        )
    }

    fn guard(&self, name: &str, depth: usize) -> Result<()> {
        if depth > self.settings.max_depth {
            return Err(SchemaError::RecursionLimitExceeded {
                name: name.to_string(),
                limit: self.settings.max_depth,
            });
        }
        Ok(())
    }

    pub(crate) fn parse(&self, raw: &Value) -> SchemaNode {
        SchemaNode::parse(raw, &self.settings.extension_key)
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<&'a Value> {
        self.definitions
            .get(name)
            .ok_or_else(|| SchemaError::UnknownDefinition {
                name: name.to_string(),
                suggestion: closest_name(self.definitions.keys().map(String::as_str), name),
            })
    }
}

/// Best fuzzy match for `query` among `candidates`
pub(crate) fn closest_name<'c>(
    candidates: impl Iterator<Item = &'c str>,
    query: &str,
) -> Option<String> {
    use fuzzy_matcher::skim::SkimMatcherV2;
    use fuzzy_matcher::FuzzyMatcher;

    let matcher = SkimMatcherV2::default();
    candidates
        .filter_map(|candidate| {
            matcher
                .fuzzy_match(candidate, query)
                .or_else(|| matcher.fuzzy_match(query, candidate))
                .map(|score| (score, candidate))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, candidate)| candidate.to_string())
}
