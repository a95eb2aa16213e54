//! The error raised when rendering code attempts a forbidden operation.

use std::fmt;
use std::io;
use thiserror::Error;

/// Category of resource a rendering operation tried to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Resource {
    Read,
    Write,
    Delete,
    Socket,
    Exit,
    Link,
    Security,
    Exec,
    Package,
    Print,
    Event,
    Clipboard,
    Window,
    SymbolicLinks,
    Property,
}

impl Resource {
    /// Label used in violation messages
    pub fn label(self) -> &'static str {
        match self {
            Resource::Read => "Read",
            Resource::Write => "Write",
            Resource::Delete => "Delete",
            Resource::Socket => "Socket",
            Resource::Exit => "Exit",
            Resource::Link => "Link",
            Resource::Security => "Security",
            Resource::Exec => "Exec",
            Resource::Package => "Package",
            Resource::Print => "Print",
            Resource::Event => "Event",
            Resource::Clipboard => "Clipboard",
            Resource::Window => "Window",
            Resource::SymbolicLinks => "SymbolicLinks",
            Resource::Property => "Property",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A denied operation.
///
/// The `Display` form is the whole user-facing message, e.g.
/// `Read access not allowed during rendering (/etc/passwd)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{resource} access not allowed during rendering{}", parenthesized(.context))]
pub struct PolicyViolation {
    resource: Resource,
    context: Option<String>,
}

impl PolicyViolation {
    /// Create a violation for `resource`, optionally naming the offending target
    pub fn new(resource: Resource, context: Option<String>) -> Self {
        Self { resource, context }
    }

    /// Create a violation with context text
    pub fn with_context(resource: Resource, context: impl Into<String>) -> Self {
        Self::new(resource, Some(context.into()))
    }

    /// Create a violation without context
    pub fn bare(resource: Resource) -> Self {
        Self::new(resource, None)
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Render the message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Recover a violation carried inside an I/O error produced by the guarded wrappers
    pub fn from_io_error(error: &io::Error) -> Option<&PolicyViolation> {
        error
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<PolicyViolation>())
    }
}

fn parenthesized(context: &Option<String>) -> String {
    match context {
        Some(context) => format!(" ({})", context),
        None => String::new(),
    }
}

impl From<PolicyViolation> for io::Error {
    fn from(violation: PolicyViolation) -> Self {
        io::Error::new(io::ErrorKind::PermissionDenied, violation)
    }
}
