//! Render Guard Configuration System
//!
//! Provides configuration management for the render sandbox:
//! - Project configuration (render-guard.toml)
//! - Global user configuration (~/.render-guard/config.toml)
//! - Environment overrides, including the sandbox kill switch
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.render-guard/config.toml)
//! 2. Project config (./render-guard.toml)
//! 3. Environment variables (ANDROID_RENDER_SANDBOX, RENDER_GUARD_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use render_guard_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("sandbox enabled: {}", config.enabled());
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid path for '{field}': {path}")]
    InvalidPath { field: String, path: PathBuf },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{sandbox_enabled_from_env, Config, ConfigLoader};
pub use project::{
    AuditBackend, AuditConfig, NativeConfig, ProjectConfig, PropertiesConfig, SandboxConfig,
};
