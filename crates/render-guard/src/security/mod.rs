//! Render Security Policy
//!
//! Confines untrusted rendering code for the duration of a render session.
//!
//! # Overview
//!
//! A [`RenderSecurityPolicy`] is installed on a [`SecurityHost`] for one session. While it is
//! active, operations requested from the render thread are checked against a fixed rule table
//! and refused with a [`PolicyViolation`] when they could escape the session. Operations from
//! other threads are never restricted.
//!
//! # Architecture
//!
//! - **SecurityHost**: the installation slot plus state shared by every policy on it
//! - **RenderSecurityPolicy**: activation state machine and interception rules
//! - **Operation**: the closed set of intercepted operations
//! - **RenderScope**: marks the current thread as the render thread
//! - **Safe regions**: trusted code suspending enforcement with the activation credential
//!
//! # Example
//!
//! ```
//! use render_guard::security::{Credential, RenderScope, RenderSecurityPolicy, SecurityHost};
//! use std::sync::Arc;
//!
//! let host = Arc::new(SecurityHost::new());
//! let policy = Arc::new(RenderSecurityPolicy::new(None, None, false, vec![]).on_host(host));
//! let credential = Credential::new();
//!
//! policy.activate(&credential).unwrap();
//! RenderScope::run(|| {
//!     assert!(policy.check_exec("/bin/ls").is_err());
//!     assert!(policy.check_write("/etc/passwd").is_err());
//! });
//! // Other threads are unaffected
//! assert!(policy.check_exec("/bin/ls").is_ok());
//! policy.dispose(&credential).unwrap();
//! ```

pub mod audit;
pub mod context;
pub mod host;
pub mod operation;
pub mod paths;
pub mod policy;
pub mod safe_region;
pub mod violation;

pub use audit::{
    AuditEntry, AuditEvent, AuditLevel, AuditLogger, MemoryAuditLogger, NullAuditLogger,
    TracingAuditLogger,
};
pub use context::{in_logger_scope, is_render_thread, LoggerScope, RenderScope};
pub use host::{Credential, SecurityHook, SecurityHost};
pub use operation::{Actions, Operation};
pub use policy::{PropertiesAccessOverride, RenderSecurityPolicy, RenderThreadPredicate};
pub use safe_region::SafeRegionToken;
pub use violation::{PolicyViolation, Resource};
