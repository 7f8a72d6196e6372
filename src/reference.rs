//! Reference pointers and their resolution
//!
//! Two pointer roots are recognized and resolve identically:
//! `#/definitions/<name>` (Swagger 2) and `#/components/schemas/<name>`
//! (OpenAPI 3). A reference back to the definition being compiled becomes an
//! `ObjectId` stub; any other reference is expanded in place.
//!
//! Only direct self-references are caught. An indirect cycle (A -> B -> A)
//! keeps expanding until the builder's depth limit trips.

use std::sync::OnceLock;

use regex::Regex;

use crate::builder::{is_reserved, SchemaBuilder};
use crate::error::{Result, SchemaError};
use crate::field::FieldSpec;
use crate::node::{NodeKind, SchemaNode};

/// Swagger 2 pointer root
pub const LEGACY_ROOT: &str = "#/definitions/";

/// OpenAPI 3 pointer root
pub const COMPONENTS_ROOT: &str = "#/components/schemas/";

fn pointer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#/(?:definitions|components/schemas)/([A-Za-z0-9_]*)$")
            .expect("pointer pattern is a valid regex")
    })
}

/// Extract the definition name from a pointer, if it has one of the two
/// recognized shapes
pub fn parse_pointer(pointer: &str) -> Option<&str> {
    pointer_pattern()
        .captures(pointer)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Strip either pointer root, without validating what remains
pub fn strip_roots(pointer: &str) -> String {
    pointer
        .replacen(LEGACY_ROOT, "", 1)
        .replacen(COMPONENTS_ROOT, "", 1)
}

/// Pointers the builder follows when compiling `node`: direct references,
/// array items (unless the items carry an extension, which turns them into
/// by-id links) and properties of typed nested objects.
pub fn collect_pointers<'n>(node: &'n SchemaNode, out: &mut Vec<&'n str>) {
    match &node.kind {
        NodeKind::Reference(pointer) => out.push(pointer),
        NodeKind::Array(items) if items.extension.is_none() => collect_pointers(items, out),
        NodeKind::Object(obj) => {
            for (key, property) in &obj.properties {
                let untyped_object = matches!(property.kind, NodeKind::Object(_))
                    && property.declared_type().is_none();
                if is_reserved(key) || untyped_object {
                    continue;
                }
                collect_pointers(property, out);
            }
        }
        NodeKind::Array(_) | NodeKind::Primitive { .. } | NodeKind::Untyped => {}
    }
}

impl SchemaBuilder<'_> {
    /// Resolve `pointer`, found on `property` (or on its items when
    /// `via_items` is set), while compiling `own_name`.
    pub(crate) fn resolve_reference(
        &self,
        property: &SchemaNode,
        pointer: &str,
        via_items: bool,
        own_name: &str,
        depth: usize,
    ) -> Result<FieldSpec> {
        let target = parse_pointer(pointer).ok_or_else(|| SchemaError::UnrecognizedReference {
            pointer: pointer.to_string(),
            node: property.raw.to_string(),
        })?;

        if target == own_name {
            tracing::debug!(definition = own_name, "circular reference replaced by id stub");
            return Ok(FieldSpec::circular(own_name, via_items));
        }

        let raw = self.lookup(target)?;
        let mut node = self.parse(raw);
        // Only the target's `properties` are expanded; its required list stays behind
        if raw.get("properties").is_some() {
            if let NodeKind::Object(obj) = &mut node.kind {
                obj.required.clear();
            }
        }

        tracing::debug!(definition = own_name, target, depth, "expanding reference");
        let expansion = self.build_at(&node, target, depth + 1)?.into_field_spec();

        Ok(if via_items {
            FieldSpec::list(expansion)
        } else {
            expansion
        })
    }
}
