//! Configuration management for the schema compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (docstore.toml)
//! - Environment variables (DOCSTORE__*)
//!
//! ## Example config file (docstore.toml):
//! ```toml
//! [compiler]
//! extension_key = "x-swaggering-mongoose"
//! reference_type = "ObjectId"
//! max_depth = 32
//!
//! [types.aliases]
//! Objectid = "ObjectId"
//! Json = "Mixed"
//!
//! [output]
//! format = "pretty"
//! ```

use std::collections::BTreeMap;

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ScalarType, TypeTable};

/// Vendor-extension key read from property, items and definition nodes
pub const DEFAULT_EXTENSION_KEY: &str = "x-swaggering-mongoose";

/// Extension type name that marks a by-id reference
pub const DEFAULT_REFERENCE_TYPE: &str = "ObjectId";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompilerConfig {
    /// Compilation settings
    #[serde(default)]
    pub compiler: CompilerSettings,

    /// Named-type table extensions
    #[serde(default)]
    pub types: TypesConfig,

    /// Output settings (CLI)
    #[serde(default)]
    pub output: OutputConfig,
}

/// Settings that change how definitions compile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Vendor-extension key
    #[serde(default = "default_extension_key")]
    pub extension_key: String,

    /// Extension type name treated as a reference to another collection
    #[serde(default = "default_reference_type")]
    pub reference_type: String,

    /// Maximum nesting of reference expansions and embedded objects
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Extra names for engine scalar types
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TypesConfig {
    /// Alias name -> scalar type
    #[serde(default)]
    pub aliases: BTreeMap<String, ScalarType>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_extension_key() -> String {
    DEFAULT_EXTENSION_KEY.to_string()
}

fn default_reference_type() -> String {
    DEFAULT_REFERENCE_TYPE.to_string()
}

fn default_max_depth() -> usize {
    32
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            extension_key: default_extension_key(),
            reference_type: default_reference_type(),
            max_depth: default_max_depth(),
        }
    }
}

impl CompilerConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["docstore.toml", ".docstore.toml", "config/docstore.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "docstore", "schemas") {
            let xdg_config = config_dir.config_dir().join("docstore.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // DOCSTORE__COMPILER__MAX_DEPTH=64 etc.
        builder = builder.add_source(
            Environment::with_prefix("DOCSTORE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Named-type table with the configured aliases applied
    pub fn type_table(&self) -> TypeTable {
        self.types
            .aliases
            .iter()
            .fold(TypeTable::new(), |table, (name, scalar)| table.with_alias(name.clone(), *scalar))
    }
}
