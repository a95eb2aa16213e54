//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{AuditBackend, ProjectConfig, PROJECT_CONFIG_FILE};
use crate::{ConfigError, ConfigResult};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};

/// Kill switch, in property form
pub const SANDBOX_PROPERTY: &str = "android.render.sandbox";

/// Kill switch, in environment variable form
pub const SANDBOX_ENV: &str = "ANDROID_RENDER_SANDBOX";

/// Overrides `sandbox.restrict_reads`
pub const RESTRICT_READS_ENV: &str = "RENDER_GUARD_RESTRICT_READS";

/// Overrides `sandbox.sdk_path`
pub const SDK_PATH_ENV: &str = "RENDER_GUARD_SDK_PATH";

/// Read the sandbox kill switch from the environment.
///
/// Returns `Some(false)` only when the switch is set to exactly `false`; any other value
/// keeps enforcement on. `None` when neither form is set.
pub fn sandbox_enabled_from_env() -> Option<bool> {
    [SANDBOX_PROPERTY, SANDBOX_ENV]
        .iter()
        .find_map(|name| env::var(name).ok())
        .map(|value| value != "false")
}

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.render-guard/config.toml) - lowest priority
/// 2. Project config (./render-guard.toml) - overrides global
/// 3. Environment variables - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where render-guard.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use a specific global config file instead of ~/.render-guard/config.toml
    pub fn with_global_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find render-guard.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;

        // Global config is optional
        let global_config = self.load_global_config().unwrap_or_default();

        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config().unwrap_or_default();
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                // Reached the filesystem root: no project
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.render-guard/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = GlobalConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Some(enabled) = sandbox_enabled_from_env() {
            config.sandbox_mut().enabled = Some(enabled);
        }

        if let Ok(restrict) = env::var(RESTRICT_READS_ENV) {
            let restrict = matches!(restrict.to_lowercase().as_str(), "true" | "1" | "yes");
            config.sandbox_mut().restrict_reads = Some(restrict);
        }

        if let Ok(sdk) = env::var(SDK_PATH_ENV) {
            let sdk = PathBuf::from(sdk);
            if !sdk.is_absolute() {
                return Err(ConfigError::InvalidPath {
                    field: SDK_PATH_ENV.to_string(),
                    path: sdk,
                });
            }
            config.sandbox_mut().sdk_path = Some(sdk);
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Whether enforcement is on (project > global > default `true`)
    pub fn enabled(&self) -> bool {
        self.project
            .sandbox
            .as_ref()
            .and_then(|s| s.enabled)
            .or_else(|| self.global.defaults.as_ref().and_then(|d| d.enabled))
            .unwrap_or(true)
    }

    /// Whether reads are checked (project > global > default `false`)
    pub fn restrict_reads(&self) -> bool {
        self.project
            .sandbox
            .as_ref()
            .and_then(|s| s.restrict_reads)
            .or_else(|| self.global.defaults.as_ref().and_then(|d| d.restrict_reads))
            .unwrap_or(false)
    }

    /// SDK root (project > global)
    pub fn sdk_path(&self) -> Option<&Path> {
        self.project
            .sandbox
            .as_ref()
            .and_then(|s| s.sdk_path.as_deref())
            .or_else(|| {
                self.global
                    .defaults
                    .as_ref()
                    .and_then(|d| d.sdk_path.as_deref())
            })
    }

    /// Project root: explicit `sandbox.project_path`, else the config file's directory
    pub fn project_path(&self) -> Option<&Path> {
        self.project
            .sandbox
            .as_ref()
            .and_then(|s| s.project_path.as_deref())
            .or(self.project_root.as_deref())
    }

    /// Extra writable directories
    pub fn allowed_write_paths(&self) -> &[PathBuf] {
        self.project
            .sandbox
            .as_ref()
            .map(|s| s.allowed_write_paths.as_slice())
            .unwrap_or(&[])
    }

    /// Application temp directory
    pub fn app_temp_dir(&self) -> Option<&Path> {
        self.project
            .sandbox
            .as_ref()
            .and_then(|s| s.app_temp_dir.as_deref())
    }

    /// Runtime home (project > global)
    pub fn runtime_home(&self) -> Option<&Path> {
        self.project
            .sandbox
            .as_ref()
            .and_then(|s| s.runtime_home.as_deref())
            .or_else(|| {
                self.global
                    .defaults
                    .as_ref()
                    .and_then(|d| d.runtime_home.as_deref())
            })
    }

    /// Native libraries allowed by configuration (global and project combined)
    pub fn allowed_native_libraries(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for native in [self.global.native.as_ref(), self.project.native.as_ref()]
            .into_iter()
            .flatten()
        {
            for name in &native.allowed_libraries {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Property names allowed by configuration (global and project combined)
    pub fn writable_properties(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for props in [self.global.properties.as_ref(), self.project.properties.as_ref()]
            .into_iter()
            .flatten()
        {
            for name in &props.writable {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Audit backend (project > global > default)
    pub fn audit_backend(&self) -> AuditBackend {
        self.project
            .audit
            .as_ref()
            .and_then(|a| a.backend)
            .or_else(|| self.global.audit.as_ref().and_then(|a| a.backend))
            .unwrap_or_default()
    }

    /// Check if this is a project (has render-guard.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}
