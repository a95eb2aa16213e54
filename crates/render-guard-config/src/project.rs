//! Project Configuration (render-guard.toml)
//!
//! Handles project-level sandbox configuration stored in `render-guard.toml` at the
//! project root.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the project configuration
pub const PROJECT_CONFIG_FILE: &str = "render-guard.toml";

/// Project configuration from render-guard.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Sandbox scope: which paths the rendering code may touch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxConfig>,

    /// Native library allow-list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native: Option<NativeConfig>,

    /// Property write allow-list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertiesConfig>,

    /// Audit logging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditConfig>,
}

/// Sandbox scope configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SandboxConfig {
    /// Enforce the policy at all (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Check file reads as well as writes (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrict_reads: Option<bool>,

    /// Read-only SDK install root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_path: Option<PathBuf>,

    /// Project root (defaults to the directory holding render-guard.toml)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<PathBuf>,

    /// Extra directories the rendering code may write beneath
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_write_paths: Vec<PathBuf>,

    /// Application-specific temp directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_temp_dir: Option<PathBuf>,

    /// Home of the runtime hosting the rendering engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_home: Option<PathBuf>,
}

/// Native library allow-list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct NativeConfig {
    /// Library names (without `lib` prefix or extension) that may always be linked
    #[serde(default)]
    pub allowed_libraries: Vec<String>,
}

/// Property write allow-list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PropertiesConfig {
    /// Property names that rendering code may set
    #[serde(default)]
    pub writable: Vec<String>,
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Where audit events go
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<AuditBackend>,
}

/// Audit logger backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditBackend {
    /// Emit events through `tracing`
    #[default]
    Tracing,
    /// Keep events in memory
    Memory,
    /// Drop events
    None,
}

impl ProjectConfig {
    /// Load project configuration from a file
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

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(sandbox) = &self.sandbox {
            sandbox.validate()?;
        }
        if let Some(native) = &self.native {
            validate_names("native.allowed_libraries", &native.allowed_libraries)?;
        }
        if let Some(properties) = &self.properties {
            validate_names("properties.writable", &properties.writable)?;
        }
        Ok(())
    }

    /// Merge another project config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &ProjectConfig) {
        if other.sandbox.is_some() {
            self.sandbox = other.sandbox.clone();
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

    /// Sandbox section, created on demand
    pub fn sandbox_mut(&mut self) -> &mut SandboxConfig {
        self.sandbox.get_or_insert_with(SandboxConfig::default)
    }
}

impl SandboxConfig {
    /// Validate paths in the sandbox section
    pub fn validate(&self) -> ConfigResult<()> {
        validate_absolute("sandbox.sdk_path", self.sdk_path.as_deref())?;
        validate_absolute("sandbox.project_path", self.project_path.as_deref())?;
        validate_absolute("sandbox.app_temp_dir", self.app_temp_dir.as_deref())?;
        validate_absolute("sandbox.runtime_home", self.runtime_home.as_deref())?;

        for path in &self.allowed_write_paths {
            validate_absolute("sandbox.allowed_write_paths", Some(path))?;
            // A root entry would make every write legal
            if path.parent().is_none() {
                return Err(ConfigError::InvalidPath {
                    field: "sandbox.allowed_write_paths".to_string(),
                    path: path.clone(),
                });
            }
        }

        Ok(())
    }
}

pub(crate) fn validate_absolute(field: &str, path: Option<&Path>) -> ConfigResult<()> {
    match path {
        Some(path) if !path.is_absolute() => Err(ConfigError::InvalidPath {
            field: field.to_string(),
            path: path.to_path_buf(),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn validate_names(field: &str, names: &[String]) -> ConfigResult<()> {
    if let Some(bad) = names.iter().find(|n| n.trim().is_empty()) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("entries cannot be empty, got '{}'", bad),
        });
    }
    Ok(())
}
