//! The installation slot a render policy is activated on.
//!
//! A [`SecurityHost`] holds at most one [`SecurityHook`]. Guarded call sites ask the host to
//! check an [`Operation`] before performing it. The host also carries the state shared by every
//! policy activated on it: the enable flag (kill switch and safe regions), the activation
//! credential and the last denied path.

use crate::security::operation::Operation;
use crate::security::policy::RenderSecurityPolicy;
use crate::security::violation::PolicyViolation;
use render_guard_config::sandbox_enabled_from_env;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// A security hook consulted before sensitive operations
pub trait SecurityHook: Send + Sync + 'static {
    /// Allow the operation or explain why it is refused
    fn check(&self, operation: &Operation) -> Result<(), PolicyViolation>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Opaque token proving the right to deactivate a policy or enter a safe region.
///
/// Clones compare equal; separately created credentials never do.
#[derive(Clone)]
pub struct Credential(Arc<CredentialId>);

struct CredentialId;

impl Credential {
    pub fn new() -> Self {
        Credential(Arc::new(CredentialId))
    }
}

impl Default for Credential {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({:p})", Arc::as_ptr(&self.0))
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn same_hook<T: ?Sized>(hook: &Arc<dyn SecurityHook>, other: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(hook), Arc::as_ptr(other))
}

pub struct SecurityHost {
    installed: Mutex<Option<Arc<dyn SecurityHook>>>,
    enabled: AtomicBool,
    credential: Mutex<Option<Credential>>,
    last_denied_path: Mutex<Option<String>>,
}

impl SecurityHost {
    /// Create an enforcing host with nothing installed
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// Create a host with the given enable flag
    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            installed: Mutex::new(None),
            enabled: AtomicBool::new(enabled),
            credential: Mutex::new(None),
            last_denied_path: Mutex::new(None),
        }
    }

    /// Create a host honoring the sandbox kill switch in the environment
    pub fn from_env() -> Self {
        let enabled = sandbox_enabled_from_env().unwrap_or(true);
        if !enabled {
            tracing::warn!("render sandbox disabled by environment");
        }
        Self::with_enabled(enabled)
    }

    /// The process-wide host. The kill switch is read once, on first use.
    pub fn global() -> Arc<SecurityHost> {
        static GLOBAL: OnceLock<Arc<SecurityHost>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(SecurityHost::from_env()))
            .clone()
    }

    /// The currently installed hook
    pub fn installed(&self) -> Option<Arc<dyn SecurityHook>> {
        lock(&self.installed).clone()
    }

    /// Replace the installed hook.
    ///
    /// The hook being replaced is asked first and may refuse with a violation.
    pub fn install(&self, hook: Option<Arc<dyn SecurityHook>>) -> Result<(), PolicyViolation> {
        if let Some(current) = self.installed() {
            current.check(&Operation::SetPolicy)?;
        }
        *lock(&self.installed) = hook;
        Ok(())
    }

    /// Install `replacement` only while `expected` is still the installed hook.
    ///
    /// Returns `false` without touching the slot when something else was installed meanwhile.
    pub(crate) fn replace_if_installed<T: ?Sized>(
        &self,
        expected: &Arc<T>,
        replacement: Option<Arc<dyn SecurityHook>>,
    ) -> Result<bool, PolicyViolation> {
        let current = match self.installed() {
            Some(current) if same_hook(&current, expected) => current,
            _ => return Ok(false),
        };
        current.check(&Operation::SetPolicy)?;

        let mut slot = lock(&self.installed);
        match slot.as_ref() {
            Some(installed) if same_hook(installed, expected) => {
                *slot = replacement;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Check `operation` against the installed hook; allowed when nothing is installed
    pub fn check(&self, operation: &Operation) -> Result<(), PolicyViolation> {
        match self.installed() {
            Some(hook) => hook.check(operation),
            None => Ok(()),
        }
    }

    /// The installed render policy, if it is relevant to the calling thread
    pub fn current_policy(&self) -> Option<Arc<RenderSecurityPolicy>> {
        let hook = self.installed()?;
        let policy = hook.into_any().downcast::<RenderSecurityPolicy>().ok()?;
        policy.is_relevant().then_some(policy)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub(crate) fn set_credential(&self, credential: Credential) {
        *lock(&self.credential) = Some(credential);
    }

    pub(crate) fn credential_matches(&self, credential: &Credential) -> bool {
        lock(&self.credential).as_ref() == Some(credential)
    }

    /// The path of the most recent denied read, write or delete
    pub fn last_failed_path(&self) -> Option<String> {
        lock(&self.last_denied_path).clone()
    }

    pub(crate) fn record_denied_path(&self, path: &str) {
        *lock(&self.last_denied_path) = Some(path.to_string());
    }
}

impl Default for SecurityHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecurityHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityHost")
            .field("installed", &self.installed().is_some())
            .field("enabled", &self.is_enabled())
            .field("last_denied_path", &self.last_failed_path())
            .finish()
    }
}
