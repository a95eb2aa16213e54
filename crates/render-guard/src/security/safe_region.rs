//! Safe regions: trusted code running on the render thread with enforcement suspended.

use crate::security::host::{Credential, SecurityHost};

/// The enable flag as it was before a safe region was entered.
///
/// Pass it back to [`SecurityHost::exit_safe_region`] to restore that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the token restores enforcement when passed to exit_safe_region"]
pub struct SafeRegionToken(bool);

impl SafeRegionToken {
    /// Whether enforcement was on when the region was entered
    pub fn was_enabled(self) -> bool {
        self.0
    }
}

struct RestoreOnDrop<'a> {
    host: &'a SecurityHost,
    token: SafeRegionToken,
}

impl Drop for RestoreOnDrop<'_> {
    fn drop(&mut self) {
        self.host.exit_safe_region(self.token);
    }
}

impl SecurityHost {
    /// Suspend enforcement if `credential` is the activation credential.
    ///
    /// A wrong credential leaves enforcement untouched; the returned token restores the flag
    /// either way.
    pub fn enter_safe_region(&self, credential: &Credential) -> SafeRegionToken {
        let token = SafeRegionToken(self.is_enabled());
        if self.credential_matches(credential) {
            self.set_enabled(false);
        } else {
            tracing::debug!("safe region requested with a foreign credential");
        }
        token
    }

    pub fn exit_safe_region(&self, token: SafeRegionToken) {
        self.set_enabled(token.0);
    }

    /// Run `f` inside a safe region, restoring the enable flag on return or panic
    pub fn run_in_safe_region<T>(&self, credential: &Credential, f: impl FnOnce() -> T) -> T {
        let _restore = RestoreOnDrop {
            host: self,
            token: self.enter_safe_region(credential),
        };
        f()
    }
}
