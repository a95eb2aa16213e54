//! The render security policy: activation state machine and interception rules.
//!
//! A [`RenderSecurityPolicy`] is built once per rendering session, activated on a
//! [`SecurityHost`] with a [`Credential`] and deactivated with the same credential when rendering
//! ends. While active it refuses operations requested from the render thread that could escape
//! the session: spawning processes, opening sockets, exiting the process, writing outside the
//! temp and cache directories, and so on. Operations from other threads pass through.

use crate::security::audit::{logger_for, AuditEvent, AuditLogger, TracingAuditLogger};
use crate::security::context;
use crate::security::host::{lock, same_hook, Credential, SecurityHook, SecurityHost};
use crate::security::operation::{Actions, Operation};
use crate::security::paths::{self, TempDirs};
use crate::security::violation::{PolicyViolation, Resource};
use render_guard_config::Config;
use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Native libraries rendering code may link by name
pub const DEFAULT_NATIVE_LIBRARIES: &[&str] = &["jsound"];

/// Properties rendering code may set; toolkit and font initialization writes these
pub const DEFAULT_WRITABLE_PROPERTIES: &[&str] = &[
    "user.timezone",
    "sun.font.fontmanager",
    "sun.awt.fontconfig",
    "java.awt.headless",
    "sun.java2d.fontpath",
    "awt.toolkit",
    "sun.awt.noerasebackground",
];

const RUNTIME_HOME_ENV: &str = "JAVA_HOME";

/// Decides whether the calling thread is executing rendering code
pub type RenderThreadPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Exempts trusted callers from the bulk property enumeration check
pub trait PropertiesAccessOverride: Send + Sync {
    fn allows_properties_access(&self) -> bool;
}

impl<F> PropertiesAccessOverride for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn allows_properties_access(&self) -> bool {
        self()
    }
}

pub struct RenderSecurityPolicy {
    host: Arc<SecurityHost>,
    sdk_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
    allowed_write_paths: Vec<PathBuf>,
    temp_dirs: TempDirs,
    app_temp_dir: Option<PathBuf>,
    runtime_home: Option<PathBuf>,
    allowed_native_libraries: Vec<String>,
    writable_properties: Vec<String>,
    restrict_reads: bool,
    enforce: bool,
    render_thread: RenderThreadPredicate,
    properties_access: Option<Arc<dyn PropertiesAccessOverride>>,
    audit: Arc<dyn AuditLogger>,
    disabled: AtomicBool,
    allow_set_policy_change: AtomicBool,
    previous: Mutex<Option<Arc<dyn SecurityHook>>>,
}

/// Configured roots are compared against canonical candidates, so resolve them up front
fn resolve_root(path: PathBuf) -> PathBuf {
    paths::canonicalize_lenient(&path).unwrap_or(path)
}

impl RenderSecurityPolicy {
    /// Create a policy for one rendering session on the global host.
    ///
    /// Reads under `sdk_path` and `project_path` are permitted; reads elsewhere are only
    /// checked when `restrict_reads` is set. Writes are permitted in the temp directory and
    /// strictly beneath `allowed_write_paths`.
    pub fn new(
        sdk_path: Option<PathBuf>,
        project_path: Option<PathBuf>,
        restrict_reads: bool,
        allowed_write_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            host: SecurityHost::global(),
            sdk_path: sdk_path.map(resolve_root),
            project_path: project_path.map(resolve_root),
            allowed_write_paths: allowed_write_paths.into_iter().map(resolve_root).collect(),
            temp_dirs: TempDirs::system(),
            app_temp_dir: None,
            runtime_home: std::env::var_os(RUNTIME_HOME_ENV)
                .map(PathBuf::from)
                .filter(|home| home.is_absolute())
                .map(resolve_root),
            allowed_native_libraries: DEFAULT_NATIVE_LIBRARIES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            writable_properties: DEFAULT_WRITABLE_PROPERTIES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            restrict_reads,
            enforce: true,
            render_thread: Arc::new(context::is_render_thread),
            properties_access: None,
            audit: Arc::new(TracingAuditLogger),
            disabled: AtomicBool::new(false),
            allow_set_policy_change: AtomicBool::new(false),
            previous: Mutex::new(None),
        }
    }

    /// Build a policy from merged configuration
    pub fn from_config(config: &Config) -> Self {
        let mut policy = Self::new(
            config.sdk_path().map(Path::to_path_buf),
            config.project_path().map(Path::to_path_buf),
            config.restrict_reads(),
            config.allowed_write_paths().to_vec(),
        )
        .with_enforcement(config.enabled())
        .with_audit_logger(logger_for(config.audit_backend()))
        .with_allowed_native_libraries(config.allowed_native_libraries())
        .with_writable_properties(config.writable_properties());

        if let Some(dir) = config.app_temp_dir() {
            policy = policy.with_app_temp_dir(dir);
        }
        if let Some(home) = config.runtime_home() {
            policy = policy.with_runtime_home(Some(home.to_path_buf()));
        }
        policy
    }

    /// Activate on `host` instead of the global host
    pub fn on_host(mut self, host: Arc<SecurityHost>) -> Self {
        self.host = host;
        self
    }

    /// Additional writable directory for the application's own temp files
    pub fn with_app_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.app_temp_dir = Some(resolve_root(dir.into()));
        self
    }

    pub fn with_audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit = logger;
        self
    }

    /// Replace the render-thread predicate (default: inside a `RenderScope`)
    pub fn with_render_thread(
        mut self,
        predicate: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        self.render_thread = Arc::new(predicate);
        self
    }

    /// Home of the runtime hosting the renderer; defaults to `JAVA_HOME`
    pub fn with_runtime_home(mut self, home: Option<PathBuf>) -> Self {
        self.runtime_home = home.map(resolve_root);
        self
    }

    pub fn with_properties_access(
        mut self,
        predicate: impl PropertiesAccessOverride + 'static,
    ) -> Self {
        self.properties_access = Some(Arc::new(predicate));
        self
    }

    /// Allow linking these native libraries by name, in addition to the defaults
    pub fn with_allowed_native_libraries(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        for name in names {
            let name = name.into();
            if !self.allowed_native_libraries.contains(&name) {
                self.allowed_native_libraries.push(name);
            }
        }
        self
    }

    /// Allow writing these properties, in addition to the defaults
    pub fn with_writable_properties(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        for name in names {
            let name = name.into();
            if !self.writable_properties.contains(&name) {
                self.writable_properties.push(name);
            }
        }
        self
    }

    /// Turn enforcement off entirely (the configuration-level kill switch)
    pub fn with_enforcement(mut self, enforce: bool) -> Self {
        self.enforce = enforce;
        self
    }

    pub fn host(&self) -> &Arc<SecurityHost> {
        &self.host
    }

    /// The policy installed on the global host, if relevant to the calling thread
    pub fn current() -> Option<Arc<RenderSecurityPolicy>> {
        SecurityHost::global().current_policy()
    }

    // ========================================================================
    // Activation
    // ========================================================================

    pub fn set_active(
        self: &Arc<Self>,
        active: bool,
        credential: &Credential,
    ) -> Result<(), PolicyViolation> {
        if active {
            self.activate(credential)
        } else {
            self.deactivate(credential)
        }
    }

    /// Install this policy on its host.
    ///
    /// Activating an already active policy is a no-op. Activating while a different render
    /// policy is installed is a programming error.
    pub fn activate(self: &Arc<Self>, credential: &Credential) -> Result<(), PolicyViolation> {
        if self.is_active() {
            return Ok(());
        }

        let previous = self.host.installed();
        if previous
            .as_ref()
            .is_some_and(|hook| hook.as_any().is::<RenderSecurityPolicy>())
        {
            return Err(PolicyViolation::with_context(
                Resource::Security,
                "Another render security policy is already active",
            ));
        }

        let hook: Arc<dyn SecurityHook> = self.clone();
        self.host.install(Some(hook))?;
        *lock(&self.previous) = previous;
        self.disabled.store(false, Ordering::SeqCst);
        self.host.set_credential(credential.clone());

        tracing::info!("render security policy activated");
        self.audit.log(AuditEvent::Activated);
        Ok(())
    }

    /// Remove this policy from its host and restore whatever was installed before.
    ///
    /// A no-op when the policy is not installed. After deactivation the policy stays disabled
    /// until it is activated again.
    pub fn deactivate(self: &Arc<Self>, credential: &Credential) -> Result<(), PolicyViolation> {
        if !self.is_active() {
            return Ok(());
        }
        if !self.host.credential_matches(credential) {
            self.audit.log(AuditEvent::CredentialRejected);
            return Err(PolicyViolation::with_context(
                Resource::Security,
                "Invalid credential",
            ));
        }

        let _disable = DisableOnExit(self);
        self.allow_set_policy_change.store(true, Ordering::SeqCst);
        let previous = lock(&self.previous).take();
        if !self.host.replace_if_installed(self, previous)? {
            self.warn("render security policy was replaced during rendering");
        }

        tracing::info!("render security policy deactivated");
        self.audit.log(AuditEvent::Deactivated);
        Ok(())
    }

    /// Release the policy at the end of a session
    pub fn dispose(self: &Arc<Self>, credential: &Credential) -> Result<(), PolicyViolation> {
        self.deactivate(credential)
    }

    /// Whether this policy is the hook installed on its host
    pub fn is_active(self: &Arc<Self>) -> bool {
        self.host
            .installed()
            .is_some_and(|hook| same_hook(&hook, self))
    }

    /// Whether checks apply to the calling thread right now
    pub fn is_relevant(&self) -> bool {
        self.enforce
            && self.host.is_enabled()
            && !self.disabled.load(Ordering::SeqCst)
            && (self.render_thread)()
    }

    fn warn(&self, detail: &str) {
        tracing::warn!("{}", detail);
        self.audit.log(AuditEvent::PolicyReplaced {
            detail: detail.to_string(),
        });
    }

    // ========================================================================
    // Checks
    // ========================================================================

    /// Allow `operation` or return the violation it commits
    pub fn check(&self, operation: &Operation) -> Result<(), PolicyViolation> {
        // Policy replacement is judged even off the render thread
        let result = if matches!(operation, Operation::SetPolicy) || self.is_relevant() {
            self.evaluate(operation)
        } else {
            Ok(())
        };

        if let Err(violation) = &result {
            tracing::debug!(operation = %operation, "{}", violation);
            self.audit.log(AuditEvent::Denied {
                operation: operation.to_string(),
                violation: violation.to_string(),
            });
        }
        result
    }

    pub fn check_read(&self, path: &str) -> Result<(), PolicyViolation> {
        self.check(&Operation::read(path))
    }

    pub fn check_write(&self, path: &str) -> Result<(), PolicyViolation> {
        self.check(&Operation::write(path))
    }

    pub fn check_delete(&self, path: &str) -> Result<(), PolicyViolation> {
        self.check(&Operation::delete(path))
    }

    pub fn check_exit(&self, status: i32) -> Result<(), PolicyViolation> {
        self.check(&Operation::Exit { status })
    }

    pub fn check_exec(&self, command: &str) -> Result<(), PolicyViolation> {
        self.check(&Operation::Exec {
            command: command.to_string(),
        })
    }

    pub fn check_connect(&self, host: &str, port: Option<u16>) -> Result<(), PolicyViolation> {
        self.check(&Operation::Connect {
            host: host.to_string(),
            port,
        })
    }

    pub fn check_listen(&self, port: u16) -> Result<(), PolicyViolation> {
        self.check(&Operation::Listen { port })
    }

    pub fn check_accept(&self, host: &str, port: u16) -> Result<(), PolicyViolation> {
        self.check(&Operation::Accept {
            host: host.to_string(),
            port,
        })
    }

    pub fn check_link(&self, library: &str) -> Result<(), PolicyViolation> {
        self.check(&Operation::Link {
            library: library.to_string(),
        })
    }

    pub fn check_package_definition(&self, package: &str) -> Result<(), PolicyViolation> {
        self.check(&Operation::PackageDefinition {
            package: package.to_string(),
        })
    }

    pub fn check_properties_access(&self) -> Result<(), PolicyViolation> {
        self.check(&Operation::PropertiesAccess)
    }

    pub fn check_property_write(&self, key: &str) -> Result<(), PolicyViolation> {
        self.check(&Operation::PropertyWrite {
            key: key.to_string(),
        })
    }

    fn check_set_policy(&self) -> Result<(), PolicyViolation> {
        if self.allow_set_policy_change.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.is_relevant() {
            return Err(PolicyViolation::bare(Resource::Security));
        }
        self.warn("render security policy being replaced by another thread");
        Ok(())
    }

    fn evaluate(&self, operation: &Operation) -> Result<(), PolicyViolation> {
        let deny = |resource: Resource| -> Result<(), PolicyViolation> {
            Err(PolicyViolation::new(resource, operation.target()))
        };

        match operation {
            Operation::Exit { .. } => deny(Resource::Exit),
            Operation::Link { library } => {
                if self.is_library_allowed(library) {
                    Ok(())
                } else {
                    deny(Resource::Link)
                }
            }
            // Class loaders and thread manipulation are needed by the renderer itself
            Operation::CreateClassLoader
            | Operation::ThreadAccess
            | Operation::ThreadGroupAccess
            | Operation::PropertyRead { .. } => Ok(()),
            Operation::Read { path } => self.require_read(path),
            Operation::Write { path } => self.require_write(path, Resource::Write),
            Operation::Delete { path } => self.require_write(path, Resource::Delete),
            Operation::WriteDescriptor => {
                Err(PolicyViolation::with_context(Resource::Write, "fd"))
            }
            Operation::Connect { .. }
            | Operation::Listen { .. }
            | Operation::Accept { .. }
            | Operation::Multicast { .. }
            | Operation::SetSocketFactory => deny(Resource::Socket),
            Operation::Exec { .. } => deny(Resource::Exec),
            Operation::PackageDefinition { .. } => deny(Resource::Package),
            Operation::PrintJobAccess => deny(Resource::Print),
            Operation::PropertiesAccess => {
                let exempt = context::in_logger_scope()
                    || self
                        .properties_access
                        .as_ref()
                        .is_some_and(|o| o.allows_properties_access());
                if exempt {
                    Ok(())
                } else {
                    deny(Resource::Property)
                }
            }
            Operation::PropertyWrite { key } => {
                if self.writable_properties.iter().any(|name| name == key) {
                    Ok(())
                } else {
                    deny(Resource::Write)
                }
            }
            Operation::SetPolicy => self.check_set_policy(),
            Operation::AccessEventQueue => deny(Resource::Event),
            Operation::AccessClipboard => deny(Resource::Clipboard),
            Operation::ShowWindowWithoutWarningBanner => deny(Resource::Window),
            Operation::CreateSymbolicLink { .. } => deny(Resource::SymbolicLinks),
            Operation::FileAccess { path, actions } => self.check_file_access(path, actions),
            Operation::Other { name, actions } => {
                if actions.is_empty() {
                    Ok(())
                } else if actions.is_read_only() {
                    self.require_read(name)
                } else if self.writable_properties.iter().any(|key| key == name) {
                    Ok(())
                } else {
                    deny(Resource::Write)
                }
            }
        }
    }

    fn check_file_access(&self, path: &str, actions: &Actions) -> Result<(), PolicyViolation> {
        if actions.is_empty() {
            Ok(())
        } else if actions.is_read_only() {
            self.require_read(path)
        } else {
            self.require_write(path, Resource::Write)
        }
    }

    fn require_read(&self, path: &str) -> Result<(), PolicyViolation> {
        if self.is_read_allowed(path) {
            Ok(())
        } else {
            Err(self.deny_path(Resource::Read, path))
        }
    }

    fn require_write(&self, path: &str, resource: Resource) -> Result<(), PolicyViolation> {
        if self.is_write_allowed(path) {
            Ok(())
        } else {
            Err(self.deny_path(resource, path))
        }
    }

    fn deny_path(&self, resource: Resource, path: &str) -> PolicyViolation {
        self.host.record_denied_path(path);
        PolicyViolation::with_context(resource, path)
    }

    // ========================================================================
    // Path rules
    // ========================================================================

    fn is_read_allowed(&self, path: &str) -> bool {
        if !self.restrict_reads {
            return true;
        }
        // Resource pseudo-paths such as "#res"
        if path.starts_with('#') && !path.chars().any(std::path::is_separator) {
            return true;
        }
        // Code loading goes through the class loader, which is trusted
        if path.ends_with(".class") || path.ends_with(".jar") {
            return true;
        }

        let candidate = Path::new(path);
        let resolved = match paths::canonicalize_lenient(candidate) {
            Ok(resolved) => resolved,
            Err(_) => return false,
        };

        let under_root = [self.sdk_path.as_deref(), self.project_path.as_deref()]
            .into_iter()
            .flatten()
            .chain(self.runtime_read_roots())
            .any(|root| paths::is_under(&resolved, root));

        under_root || self.temp_dirs.contains(&resolved)
    }

    fn runtime_read_roots(&self) -> impl Iterator<Item = &Path> {
        let home = self.runtime_home.as_deref();
        // Bundle layout: <bundle>/Contents/Home, with native libraries in <bundle>/Contents
        let contents = home
            .filter(|home| home.ends_with("Contents/Home"))
            .and_then(Path::parent);
        home.into_iter().chain(contents)
    }

    fn is_write_allowed(&self, path: &str) -> bool {
        let candidate = Path::new(path);
        if !candidate.is_absolute() {
            return false;
        }

        let normalized = paths::normalize(candidate);
        // Following a planted link would redirect the write anywhere
        if paths::is_symlink(&normalized) {
            return false;
        }
        let resolved = match paths::canonicalize_lenient(&normalized) {
            Ok(resolved) => resolved,
            Err(_) => return false,
        };

        if self.temp_dirs.contains(&resolved) {
            return true;
        }
        if self
            .app_temp_dir
            .as_deref()
            .is_some_and(|dir| paths::is_under(&resolved, dir))
        {
            return true;
        }
        self.allowed_write_paths
            .iter()
            .any(|root| paths::is_strictly_under(&resolved, root))
    }

    fn is_library_allowed(&self, library: &str) -> bool {
        let path = Path::new(library);
        // A path names a file rendering code may have written; only the runtime's own count
        if library.chars().any(std::path::is_separator) {
            if !path.is_absolute() {
                return false;
            }
            return paths::canonicalize_lenient(path).is_ok_and(|resolved| {
                self.runtime_read_roots()
                    .any(|root| paths::is_under(&resolved, root))
            });
        }

        let stem = match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) => stem,
            None => return false,
        };
        let name = stem.strip_prefix("lib").unwrap_or(stem);
        self.allowed_native_libraries
            .iter()
            .any(|allowed| allowed == name || allowed == stem)
    }
}

struct DisableOnExit<'a>(&'a RenderSecurityPolicy);

impl Drop for DisableOnExit<'_> {
    fn drop(&mut self) {
        self.0.disabled.store(true, Ordering::SeqCst);
        self.0.allow_set_policy_change.store(false, Ordering::SeqCst);
    }
}

impl SecurityHook for RenderSecurityPolicy {
    fn check(&self, operation: &Operation) -> Result<(), PolicyViolation> {
        RenderSecurityPolicy::check(self, operation)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl fmt::Debug for RenderSecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSecurityPolicy")
            .field("sdk_path", &self.sdk_path)
            .field("project_path", &self.project_path)
            .field("allowed_write_paths", &self.allowed_write_paths)
            .field("app_temp_dir", &self.app_temp_dir)
            .field("runtime_home", &self.runtime_home)
            .field("restrict_reads", &self.restrict_reads)
            .field("enforce", &self.enforce)
            .field("disabled", &self.disabled.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
