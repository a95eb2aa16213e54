//! The closed set of operations the render policy intercepts.

use std::fmt;

/// Parsed action list of a file or generic permission request (e.g. `"read,write"`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Actions {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
    pub delete: bool,
    pub readlink: bool,
    /// Any action name that is not one of the above
    pub other: bool,
}

impl Actions {
    /// Parse a comma separated action list. Whitespace and case are ignored.
    pub fn parse(actions: &str) -> Self {
        let mut parsed = Actions::default();
        for action in actions.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            match action.to_ascii_lowercase().as_str() {
                "read" => parsed.read = true,
                "write" => parsed.write = true,
                "execute" => parsed.execute = true,
                "delete" => parsed.delete = true,
                "readlink" => parsed.readlink = true,
                _ => parsed.other = true,
            }
        }
        parsed
    }

    pub fn read() -> Self {
        Actions {
            read: true,
            ..Default::default()
        }
    }

    pub fn read_write() -> Self {
        Actions {
            read: true,
            write: true,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Actions::default()
    }

    /// True when the request asks for reading and nothing else
    pub fn is_read_only(&self) -> bool {
        *self == Actions::read()
    }
}

impl fmt::Display for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (self.read, "read"),
            (self.write, "write"),
            (self.execute, "execute"),
            (self.delete, "delete"),
            (self.readlink, "readlink"),
            (self.other, "other"),
        ];
        let joined: Vec<&str> = names
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&joined.join(","))
    }
}

/// A security-sensitive operation requested by rendering code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Terminate the process
    Exit { status: i32 },
    /// Link a native library
    Link { library: String },
    /// Create a class/code loader
    CreateClassLoader,
    /// Read a file
    Read { path: String },
    /// Write a file
    Write { path: String },
    /// Delete a file
    Delete { path: String },
    /// Write through a raw file descriptor
    WriteDescriptor,
    /// Open an outgoing connection
    Connect { host: String, port: Option<u16> },
    /// Listen on a local port
    Listen { port: u16 },
    /// Accept an incoming connection
    Accept { host: String, port: u16 },
    /// Join or send to a multicast group
    Multicast { address: String },
    /// Replace the process socket factory
    SetSocketFactory,
    /// Spawn a process
    Exec { command: String },
    /// Define classes in a package
    PackageDefinition { package: String },
    /// Start a print job
    PrintJobAccess,
    /// Read a single property
    PropertyRead { key: String },
    /// Enumerate every property
    PropertiesAccess,
    /// Set a property
    PropertyWrite { key: String },
    /// Modify a thread
    ThreadAccess,
    /// Modify a thread group
    ThreadGroupAccess,
    /// Install or remove the process-wide security hook
    SetPolicy,
    /// Access the UI event queue
    AccessEventQueue,
    /// Access the system clipboard
    AccessClipboard,
    /// Show a top-level window without the untrusted-window banner
    ShowWindowWithoutWarningBanner,
    /// Create a symbolic link
    CreateSymbolicLink { link: String },
    /// File permission request with an explicit action list
    FileAccess { path: String, actions: Actions },
    /// Any other named permission request
    Other { name: String, actions: Actions },
}

impl Operation {
    pub fn read(path: impl Into<String>) -> Self {
        Operation::Read { path: path.into() }
    }

    pub fn write(path: impl Into<String>) -> Self {
        Operation::Write { path: path.into() }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Operation::Delete { path: path.into() }
    }

    /// File permission request, e.g. `Operation::file("/tmp/x", "read,write")`
    pub fn file(path: impl Into<String>, actions: &str) -> Self {
        Operation::FileAccess {
            path: path.into(),
            actions: Actions::parse(actions),
        }
    }

    /// Short name used in audit records
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Exit { .. } => "exit",
            Operation::Link { .. } => "link",
            Operation::CreateClassLoader => "create-class-loader",
            Operation::Read { .. } => "read",
            Operation::Write { .. } => "write",
            Operation::Delete { .. } => "delete",
            Operation::WriteDescriptor => "write-descriptor",
            Operation::Connect { .. } => "connect",
            Operation::Listen { .. } => "listen",
            Operation::Accept { .. } => "accept",
            Operation::Multicast { .. } => "multicast",
            Operation::SetSocketFactory => "set-socket-factory",
            Operation::Exec { .. } => "exec",
            Operation::PackageDefinition { .. } => "package-definition",
            Operation::PrintJobAccess => "print-job",
            Operation::PropertyRead { .. } => "property-read",
            Operation::PropertiesAccess => "properties-access",
            Operation::PropertyWrite { .. } => "property-write",
            Operation::ThreadAccess => "thread-access",
            Operation::ThreadGroupAccess => "thread-group-access",
            Operation::SetPolicy => "set-policy",
            Operation::AccessEventQueue => "event-queue",
            Operation::AccessClipboard => "clipboard",
            Operation::ShowWindowWithoutWarningBanner => "window-banner",
            Operation::CreateSymbolicLink { .. } => "symbolic-link",
            Operation::FileAccess { .. } => "file",
            Operation::Other { .. } => "permission",
        }
    }

    /// The target of the operation, when it names one
    pub fn target(&self) -> Option<String> {
        match self {
            Operation::Exit { status } => Some(status.to_string()),
            Operation::Link { library } => Some(library.clone()),
            Operation::Read { path }
            | Operation::Write { path }
            | Operation::Delete { path }
            | Operation::FileAccess { path, .. } => Some(path.clone()),
            Operation::Connect { host, port } => Some(match port {
                Some(port) => format!("{}:{}", host, port),
                None => host.clone(),
            }),
            Operation::Listen { port } => Some(port.to_string()),
            Operation::Accept { host, port } => Some(format!("{}:{}", host, port)),
            Operation::Multicast { address } => Some(address.clone()),
            Operation::Exec { command } => Some(command.clone()),
            Operation::PackageDefinition { package } => Some(package.clone()),
            Operation::PropertyRead { key } | Operation::PropertyWrite { key } => {
                Some(key.clone())
            }
            Operation::CreateSymbolicLink { link } => Some(link.clone()),
            Operation::Other { name, .. } => Some(name.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.target()) {
            (Operation::FileAccess { actions, .. }, Some(target))
            | (Operation::Other { actions, .. }, Some(target)) => {
                write!(f, "{} {} [{}]", self.kind(), target, actions)
            }
            (_, Some(target)) => write!(f, "{} {}", self.kind(), target),
            (_, None) => f.write_str(self.kind()),
        }
    }
}
