//! Security audit logging
//!
//! Records policy lifecycle changes and denials as structured events. The policy writes its
//! warnings here too, so tests can assert on them through [`MemoryAuditLogger::warnings`].

use chrono::{DateTime, Utc};
use render_guard_config::AuditBackend;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Severity of an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Info,
    Warning,
}

/// Security audit event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Policy installed as the process hook
    Activated,
    /// Policy removed and the previous hook restored
    Deactivated,
    /// An operation was refused
    Denied { operation: String, violation: String },
    /// Deactivation was attempted with the wrong credential
    CredentialRejected,
    /// The process hook was swapped by code that is not the active policy
    PolicyReplaced { detail: String },
}

impl AuditEvent {
    pub fn level(&self) -> AuditLevel {
        match self {
            AuditEvent::CredentialRejected | AuditEvent::PolicyReplaced { .. } => {
                AuditLevel::Warning
            }
            _ => AuditLevel::Info,
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::Activated => write!(f, "Render security policy activated"),
            AuditEvent::Deactivated => write!(f, "Render security policy deactivated"),
            AuditEvent::Denied {
                operation,
                violation,
            } => write!(f, "Denied {}: {}", operation, violation),
            AuditEvent::CredentialRejected => write!(f, "Invalid credential presented"),
            AuditEvent::PolicyReplaced { detail } => write!(f, "{}", detail),
        }
    }
}

/// Audit log entry with timestamp
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub level: AuditLevel,
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditEntry {
    /// Create a new audit entry with current timestamp
    pub fn new(event: AuditEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            level: event.level(),
            event,
        }
    }

    /// Format as log line
    pub fn to_log_line(&self) -> String {
        format!(
            "[{}] {:?}: {}",
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            self.level,
            self.event
        )
    }

    /// Format as a single JSON object
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Audit logger trait for customizable logging backends
pub trait AuditLogger: Send + Sync {
    /// Log an audit event
    fn log(&self, event: AuditEvent);

    /// Get all logged entries (for testing)
    fn entries(&self) -> Vec<AuditEntry>;

    /// Clear all logged entries (for testing)
    fn clear(&self);
}

/// In-memory audit logger
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLogger {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of every warning-level entry, in order
    pub fn warnings(&self) -> Vec<String> {
        self.entries()
            .iter()
            .filter(|entry| entry.level == AuditLevel::Warning)
            .map(|entry| entry.event.to_string())
            .collect()
    }
}

impl AuditLogger for MemoryAuditLogger {
    fn log(&self, event: AuditEvent) {
        let entry = AuditEntry::new(event);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Null audit logger (no-op, for performance)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditLogger;

impl NullAuditLogger {
    pub fn new() -> Self {
        Self
    }
}

impl AuditLogger for NullAuditLogger {
    fn log(&self, _event: AuditEvent) {}

    fn entries(&self) -> Vec<AuditEntry> {
        Vec::new()
    }

    fn clear(&self) {}
}

/// Forwards events to `tracing` under the `render_guard::audit` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

impl AuditLogger for TracingAuditLogger {
    fn log(&self, event: AuditEvent) {
        match event.level() {
            AuditLevel::Warning => tracing::warn!(target: "render_guard::audit", "{}", event),
            AuditLevel::Info => tracing::debug!(target: "render_guard::audit", "{}", event),
        }
    }

    fn entries(&self) -> Vec<AuditEntry> {
        Vec::new()
    }

    fn clear(&self) {}
}

/// Build the logger selected in configuration
pub fn logger_for(backend: AuditBackend) -> Arc<dyn AuditLogger> {
    match backend {
        AuditBackend::Tracing => Arc::new(TracingAuditLogger),
        AuditBackend::Memory => Arc::new(MemoryAuditLogger::new()),
        AuditBackend::None => Arc::new(NullAuditLogger),
    }
}
