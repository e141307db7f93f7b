//! Configuration management for request types
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (request-types.toml)
//! - Environment variables (REQUEST_TYPES__*)
//!
//! ## Example config file (request-types.toml):
//! ```toml
//! [schemas]
//! dir = "./schemas"
//! cache_documents = true
//!
//! [validation]
//! raise_response_validation_errors = false
//! trim_whitespace = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::types::{StringType, TypeBuilder, TypeDefinition};

/// Environment switch that makes response validation failures fatal
pub const RAISE_RESPONSE_VALIDATION_ERRORS: &str = "RAISE_RESPONSE_VALIDATION_ERRORS";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypesConfig {
    /// Schema document settings
    #[serde(default)]
    pub schemas: SchemasConfig,

    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Schema document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemasConfig {
    /// Directory schema files are loaded from
    #[serde(default = "default_schemas_dir")]
    pub dir: PathBuf,

    /// Cache documents loaded while resolving references
    #[serde(default = "default_true")]
    pub cache_documents: bool,
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Return response validation failures instead of only logging them
    #[serde(default)]
    pub raise_response_validation_errors: bool,

    /// Default whitespace trimming of String definitions built from this config
    #[serde(default = "default_true")]
    pub trim_whitespace: bool,
}

// Default value functions
fn default_schemas_dir() -> PathBuf {
    PathBuf::from("schemas")
}

fn default_true() -> bool {
    true
}

impl Default for SchemasConfig {
    fn default() -> Self {
        Self {
            dir: default_schemas_dir(),
            cache_documents: true,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            raise_response_validation_errors: false,
            trim_whitespace: true,
        }
    }
}

impl TypesConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "request-types.toml",
            ".request-types.toml",
            "config/request-types.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "request-types", "request-types") {
            let xdg_config = config_dir.config_dir().join("request-types.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (REQUEST_TYPES__*)
        builder = builder.add_source(
            Environment::with_prefix("REQUEST_TYPES")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get the schema directory (resolves relative paths)
    pub fn schemas_dir(&self) -> PathBuf {
        if self.schemas.dir.is_absolute() {
            self.schemas.dir.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.schemas.dir)
        }
    }

    /// Whether response validation failures are returned to the caller.
    ///
    /// Enabled by the config file, or by a non-empty
    /// `RAISE_RESPONSE_VALIDATION_ERRORS` environment variable.
    pub fn raise_response_validation_errors(&self) -> bool {
        self.raises_response_errors(std::env::var_os(RAISE_RESPONSE_VALIDATION_ERRORS))
    }

    /// Same decision given the value of the environment switch
    pub(crate) fn raises_response_errors(&self, switch: Option<OsString>) -> bool {
        self.validation.raise_response_validation_errors || switch.is_some_and(|v| !v.is_empty())
    }

    /// Start a String definition with this configuration's defaults
    pub fn string(&self, description: impl Into<String>) -> TypeBuilder<StringType> {
        TypeDefinition::string(description).trim_whitespace(self.validation.trim_whitespace)
    }
}
