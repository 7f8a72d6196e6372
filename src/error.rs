//! Error types for the schema compiler

use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema compilation errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Swagger spec not supplied")]
    MissingSpec,

    #[error("Unknown or invalid spec object: {0}")]
    InvalidSpec(String),

    #[error("Definitions not found under `definitions` or `components.schemas`")]
    MissingDefinitions,

    #[error("Unrecognised schema format: {format}")]
    UnrecognizedFormat { format: String, node: String },

    #[error("Unrecognised property type: {type_name} at: {node}")]
    UnrecognizedType { type_name: String, node: String },

    #[error("Unrecognised reference \"{pointer}\" at: {node}")]
    UnrecognizedReference { pointer: String, node: String },

    #[error("Unrecognised {extension_key} type: {type_name} at: {node}")]
    UnrecognizedExtensionType {
        extension_key: String,
        type_name: String,
        node: String,
    },

    #[error("Unknown definition \"{name}\"{}", suggestion.as_ref().map(|s| format!(" (did you mean \"{}\"?)", s)).unwrap_or_default())]
    UnknownDefinition {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Recursion limit of {limit} exceeded while compiling \"{name}\" (indirect reference cycle?)")]
    RecursionLimitExceeded { name: String, limit: usize },

    #[error("Exception processing key \"{key}\" at: {node}")]
    PropertyProcessing {
        key: String,
        node: String,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("Model \"{name}\" already registered with a different schema")]
    ModelConflict { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    /// Wrap an error with the property key and raw node it was raised for
    pub fn in_property(self, key: impl Into<String>, node: &serde_json::Value) -> Self {
        SchemaError::PropertyProcessing {
            key: key.into(),
            node: node.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping property context wrappers
    pub fn root_cause(&self) -> &SchemaError {
        match self {
            SchemaError::PropertyProcessing { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Property keys from the outermost wrapper down to the failing property
    pub fn property_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self;
        while let SchemaError::PropertyProcessing { key, source, .. } = current {
            path.push(key.as_str());
            current = source.as_ref();
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::error::Error as _;

    #[test]
    fn test_property_wrapper_keeps_cause() {
        let inner = SchemaError::UnrecognizedType {
            type_name: "uuid".to_string(),
            node: "{\"type\":\"uuid\"}".to_string(),
        };
        let err = inner
            .in_property("id", &json!({"type": "uuid"}))
            .in_property("owner", &json!({"type": "object"}));

        assert_eq!(err.property_path(), vec!["owner", "id"]);
        assert!(matches!(err.root_cause(), SchemaError::UnrecognizedType { .. }));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("\"owner\""));
    }

    #[test]
    fn test_unknown_definition_suggestion() {
        let err = SchemaError::UnknownDefinition {
            name: "Adress".to_string(),
            suggestion: Some("Address".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Unknown definition \"Adress\" (did you mean \"Address\"?)"
        );
    }
}
