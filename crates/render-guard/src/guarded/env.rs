//! Environment variables, the renderer's equivalent of process-wide properties

use crate::security::{Operation, SecurityHost};
use std::env;
use std::io;

/// Read one variable; `None` when unset or not valid unicode
pub fn var(host: &SecurityHost, key: &str) -> io::Result<Option<String>> {
    host.check(&Operation::PropertyRead {
        key: key.to_string(),
    })?;
    Ok(env::var(key).ok())
}

pub fn set_var(host: &SecurityHost, key: &str, value: &str) -> io::Result<()> {
    host.check(&Operation::PropertyWrite {
        key: key.to_string(),
    })?;
    env::set_var(key, value);
    Ok(())
}

pub fn remove_var(host: &SecurityHost, key: &str) -> io::Result<()> {
    host.check(&Operation::PropertyWrite {
        key: key.to_string(),
    })?;
    env::remove_var(key);
    Ok(())
}

/// Enumerate every variable.
///
/// Refused on the render thread unless the caller is inside a
/// [`LoggerScope`](crate::security::LoggerScope) or the policy's override allows it.
pub fn vars(host: &SecurityHost) -> io::Result<Vec<(String, String)>> {
    host.check(&Operation::PropertiesAccess)?;
    Ok(env::vars().collect())
}
