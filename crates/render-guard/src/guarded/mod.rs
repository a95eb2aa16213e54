//! Guarded I/O
//!
//! Thin wrappers around the sensitive call sites rendering code reaches: each asks the
//! [`SecurityHost`](crate::security::SecurityHost) first and only performs the real operation
//! when the installed hook allows it. A refusal surfaces as an [`std::io::Error`] of kind
//! `PermissionDenied` carrying the [`PolicyViolation`](crate::security::PolicyViolation).

pub mod env;
pub mod fs;
pub mod native;
pub mod net;
pub mod process;

use std::path::Path;

pub(crate) fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
