//! Vendor-extension metadata
//!
//! A property may carry engine-specific overrides under the extension key:
//!
//! ```json
//! "cars": {
//!   "type": "array",
//!   "items": {
//!     "$ref": "#/definitions/Car",
//!     "x-swaggering-mongoose": { "type": "ObjectId" }
//!   }
//! }
//! ```
//!
//! The payload's `type` names an engine scalar (or the reference sentinel),
//! `ref` names a target collection, and every other key is passed through to
//! the engine untouched. Extension keys always win over computed ones.

use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::field::{FieldDef, FieldSpec, FieldType, Options, ReferenceKind, ReferenceSpec};
use crate::node::{NodeKind, SchemaNode};
use crate::reference::strip_roots;
use crate::types::{ScalarType, TypeTable};

/// Parsed extension payload
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtensionMeta {
    /// Override type name
    pub type_name: Option<String>,
    /// Override reference target
    pub reference: Option<String>,
    /// Everything else in the payload
    pub options: Map<String, Value>,
}

impl ExtensionMeta {
    /// Parse a payload; anything but a JSON object is ignored
    pub fn from_value(value: &Value) -> Option<Self> {
        let Some(obj) = value.as_object() else {
            tracing::warn!(payload = %value, "ignoring non-object extension payload");
            return None;
        };

        let mut meta = ExtensionMeta::default();
        for (key, value) in obj {
            match (key.as_str(), value) {
                ("type", Value::String(name)) => meta.type_name = Some(name.clone()),
                // Non-string types cannot name anything; keep them so resolution fails loudly
                ("type", other) => meta.type_name = Some(other.to_string()),
                ("ref", Value::String(target)) => meta.reference = Some(target.clone()),
                _ => {
                    meta.options.insert(key.clone(), value.clone());
                }
            }
        }
        Some(meta)
    }
}

/// Resolved payload, ready to be laid over a computed field
#[derive(Debug, Clone, Default)]
struct Overlay {
    field_type: Option<ScalarType>,
    reference: Option<ReferenceSpec>,
    required: Option<bool>,
    default: Option<Value>,
    options: Options,
}

/// Resolves extension payloads and merges them into computed fields
pub struct ExtensionMerger<'a> {
    types: &'a TypeTable,
    extension_key: &'a str,
    reference_type: &'a str,
}

impl<'a> ExtensionMerger<'a> {
    pub fn new(types: &'a TypeTable, extension_key: &'a str, reference_type: &'a str) -> Self {
        Self {
            types,
            extension_key,
            reference_type,
        }
    }

    /// Array property whose items carry an extension: the whole field is a
    /// list of the extension-defined type.
    ///
    /// Returns `None` when `property` is not such an array.
    pub fn array_extension(&self, property: &SchemaNode) -> Result<Option<FieldSpec>> {
        let Some(items) = property.items() else {
            return Ok(None);
        };
        let Some(items_meta) = &items.extension else {
            return Ok(None);
        };

        // The property's own payload wins, but its pointer (if any) is its own
        let overlay = match &property.extension {
            Some(meta) => self.resolve(meta, pointer(property), true, &property.raw)?,
            None => self.resolve(items_meta, pointer(items), true, &property.raw)?,
        };
        Ok(Some(FieldSpec::list(apply(overlay, None))))
    }

    /// Like [`array_extension`](Self::array_extension), but reads only the
    /// items' payload. Used for array definitions, whose own payload is
    /// schema options rather than a field override.
    pub fn items_extension(&self, array: &SchemaNode) -> Result<Option<FieldSpec>> {
        let Some(items) = array.items() else {
            return Ok(None);
        };
        let Some(items_meta) = &items.extension else {
            return Ok(None);
        };
        let overlay = self.resolve(items_meta, pointer(items), true, &array.raw)?;
        Ok(Some(FieldSpec::list(apply(overlay, None))))
    }

    /// Merge the property's own extension over `computed`.
    ///
    /// Returns `computed` unchanged when there is no extension.
    pub fn merge(
        &self,
        computed: Option<FieldSpec>,
        property: &SchemaNode,
    ) -> Result<Option<FieldSpec>> {
        let Some(meta) = &property.extension else {
            return Ok(computed);
        };
        let overlay = self.resolve(meta, pointer(property), false, &property.raw)?;
        Ok(Some(apply(overlay, computed)))
    }

    fn resolve(
        &self,
        meta: &ExtensionMeta,
        pointer: Option<&str>,
        is_array: bool,
        node: &Value,
    ) -> Result<Overlay> {
        let mut overlay = Overlay::default();

        match meta.type_name.as_deref() {
            Some(name) if name == self.reference_type => {
                overlay.field_type = Some(ScalarType::ObjectId);
                if meta.reference.is_none() {
                    overlay.reference = pointer.map(|p| ReferenceSpec {
                        kind: ReferenceKind::External,
                        target: strip_roots(p),
                        is_array,
                    });
                }
            }
            Some(name) => {
                let scalar = self.types.resolve(name).ok_or_else(|| {
                    SchemaError::UnrecognizedExtensionType {
                        extension_key: self.extension_key.to_string(),
                        type_name: name.to_string(),
                        node: node.to_string(),
                    }
                })?;
                overlay.field_type = Some(scalar);
            }
            None => {}
        }

        if let Some(target) = &meta.reference {
            overlay.reference = Some(ReferenceSpec {
                kind: ReferenceKind::External,
                target: target.clone(),
                is_array,
            });
        }

        for (key, value) in &meta.options {
            match (key.as_str(), value) {
                ("required", Value::Bool(required)) => overlay.required = Some(*required),
                ("default", value) => overlay.default = Some(value.clone()),
                _ => {
                    overlay.options.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(overlay)
    }
}

fn pointer(node: &SchemaNode) -> Option<&str> {
    match &node.kind {
        NodeKind::Reference(pointer) => Some(pointer),
        _ => None,
    }
}

fn apply(overlay: Overlay, computed: Option<FieldSpec>) -> FieldSpec {
    match computed {
        Some(FieldSpec::List(inner)) => FieldSpec::list(apply(overlay, Some(*inner))),
        Some(FieldSpec::Field(mut def)) => {
            if let Some(scalar) = overlay.field_type {
                def.field_type = Some(FieldType::Scalar(scalar));
            }
            if overlay.reference.is_some() {
                def.reference = overlay.reference;
            }
            if let Some(required) = overlay.required {
                def.required = required;
            }
            if overlay.default.is_some() {
                def.default = overlay.default;
            }
            def.options.extend(overlay.options);
            FieldSpec::Field(def)
        }
        None => FieldSpec::Field(FieldDef {
            field_type: overlay.field_type.map(FieldType::Scalar),
            reference: overlay.reference,
            required: overlay.required.unwrap_or(false),
            default: overlay.default,
            fields: Default::default(),
            options: overlay.options,
        }),
    }
}
