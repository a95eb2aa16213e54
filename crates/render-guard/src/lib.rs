//! Render Guard - sandbox for untrusted code running inside a layout renderer
//!
//! This library provides:
//! - A per-session security policy with an explicit activation lifecycle
//! - Path rules for reads and writes that resist traversal and symlink tricks
//! - Scoped render-thread and safe-region guards
//! - Guarded wrappers for filesystem, network, process, environment and native-library access

/// Render Guard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod guarded;
pub mod security;

// Re-export commonly used types
pub use security::{
    Credential, Operation, PolicyViolation, RenderScope, RenderSecurityPolicy, Resource,
    SafeRegionToken, SecurityHook, SecurityHost,
};
