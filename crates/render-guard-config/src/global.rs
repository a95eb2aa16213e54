//! Global Configuration (~/.render-guard/config.toml)
//!
//! Handles user-level defaults stored in `~/.render-guard/config.toml`. Project files
//! override anything set here.

use crate::project::{validate_absolute, validate_names};
use crate::project::{AuditConfig, NativeConfig, PropertiesConfig};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.render-guard/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Machine-wide sandbox defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Native library allow-list shared by every project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native: Option<NativeConfig>,

    /// Property write allow-list shared by every project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertiesConfig>,

    /// Default audit backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditConfig>,
}

/// Machine-wide defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Enforce the policy at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Check file reads as well as writes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrict_reads: Option<bool>,

    /// SDK install root used when a project does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_path: Option<PathBuf>,

    /// Runtime home used when a project does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_home: Option<PathBuf>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(defaults) = &self.defaults {
            validate_absolute("defaults.sdk_path", defaults.sdk_path.as_deref())?;
            validate_absolute("defaults.runtime_home", defaults.runtime_home.as_deref())?;
        }
        if let Some(native) = &self.native {
            validate_names("native.allowed_libraries", &native.allowed_libraries)?;
        }
        if let Some(properties) = &self.properties {
            validate_names("properties.writable", &properties.writable)?;
        }
        Ok(())
    }

    /// Get the global config directory (~/.render-guard)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".render-guard"))
    }

    /// Get the global config file path (~/.render-guard/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        Ok(Self::global_config_dir()?.join("config.toml"))
    }

    /// Merge another global config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &GlobalConfig) {
        if other.defaults.is_some() {
            self.defaults = other.defaults.clone();
        }
        if other.native.is_some() {
            self.native = other.native.clone();
        }
        if other.properties.is_some() {
            self.properties = other.properties.clone();
        }
        if other.audit.is_some() {
            self.audit = other.audit.clone();
        }
    }
}
