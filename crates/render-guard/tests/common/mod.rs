//! Shared helpers for render-guard integration tests
#![allow(dead_code)]

use render_guard::security::{
    Credential, MemoryAuditLogger, PolicyViolation, RenderSecurityPolicy, SecurityHost,
};
use std::path::PathBuf;
use std::sync::Arc;

pub use pretty_assertions::{assert_eq, assert_ne};

/// A policy on a private host with an in-memory audit log
pub struct Session {
    pub policy: Arc<RenderSecurityPolicy>,
    pub host: Arc<SecurityHost>,
    pub audit: MemoryAuditLogger,
    pub credential: Credential,
}

impl Session {
    /// Wrap `policy`, treating every thread as the render thread
    pub fn new(policy: RenderSecurityPolicy) -> Self {
        Self::with_host(policy.with_render_thread(|| true), Arc::new(SecurityHost::new()))
    }

    /// Wrap `policy` without touching its render-thread predicate
    pub fn with_host(policy: RenderSecurityPolicy, host: Arc<SecurityHost>) -> Self {
        let audit = MemoryAuditLogger::new();
        let policy = policy
            .on_host(host.clone())
            .with_runtime_home(None)
            .with_audit_logger(Arc::new(audit.clone()));
        Self {
            policy: Arc::new(policy),
            host,
            audit,
            credential: Credential::new(),
        }
    }

    pub fn activate(&self) {
        self.policy
            .activate(&self.credential)
            .expect("activation should succeed");
    }

    pub fn dispose(&self) {
        self.policy
            .dispose(&self.credential)
            .expect("disposal should succeed");
    }
}

/// A policy without SDK or project roots and no extra writable paths
pub fn bare_policy() -> RenderSecurityPolicy {
    RenderSecurityPolicy::new(None, None, false, vec![])
}

/// The policy used by the read and write tables
pub fn project_policy(restrict_reads: bool, allowed_write_paths: Vec<PathBuf>) -> RenderSecurityPolicy {
    RenderSecurityPolicy::new(
        Some(PathBuf::from("/Users/userHome/Sdk")),
        Some(PathBuf::from("/Users/userHome/Projects/project1")),
        restrict_reads,
        allowed_write_paths,
    )
}

/// Assert a check was refused with exactly `message`
pub fn assert_denied(result: Result<(), PolicyViolation>, message: &str) {
    match result {
        Err(violation) => assert_eq!(violation.to_string(), message),
        Ok(()) => panic!("expected denial: {}", message),
    }
}
