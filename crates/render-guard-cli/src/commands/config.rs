//! Config command - print the effective configuration

use anyhow::Result;
use render_guard_config::{AuditBackend, Config};
use std::path::Path;

pub fn run(path: Option<&Path>, json: bool) -> Result<()> {
    let config = super::load_config(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", summary(&config));
    }
    Ok(())
}

fn display(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Human-readable summary, one setting per line
fn summary(config: &Config) -> String {
    let writable: Vec<String> = config
        .allowed_write_paths()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let backend = match config.audit_backend() {
        AuditBackend::Tracing => "tracing",
        AuditBackend::Memory => "memory",
        AuditBackend::None => "none",
    };

    let mut out = String::new();
    out.push_str(&format!("enabled:              {}\n", config.enabled()));
    out.push_str(&format!("restrict_reads:       {}\n", config.restrict_reads()));
    out.push_str(&format!("sdk_path:             {}\n", display(config.sdk_path())));
    out.push_str(&format!("project_path:         {}\n", display(config.project_path())));
    out.push_str(&format!("allowed_write_paths:  {}\n", writable.join(", ")));
    out.push_str(&format!("app_temp_dir:         {}\n", display(config.app_temp_dir())));
    out.push_str(&format!("runtime_home:         {}\n", display(config.runtime_home())));
    out.push_str(&format!(
        "native_libraries:     {}\n",
        config.allowed_native_libraries().join(", ")
    ));
    out.push_str(&format!(
        "writable_properties:  {}\n",
        config.writable_properties().join(", ")
    ));
    out.push_str(&format!("audit_backend:        {}\n", backend));
    out
}
