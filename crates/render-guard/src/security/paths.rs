//! Path resolution used by the read and write rules.
//!
//! Candidate paths usually do not exist yet (a write target, a probe for a resource), so
//! resolution is lenient: the path is made absolute and normalized lexically, the longest
//! existing ancestor is resolved through the filesystem and the rest is appended as is.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Make `path` absolute against the current directory without touching the filesystem
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the parent.
///
/// `..` never climbs above the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() && !path.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Absolute, normalized form of `path`
pub fn absolute_normalized(path: &Path) -> io::Result<PathBuf> {
    Ok(normalize(&absolute(path)?))
}

/// Resolve `path` the way a canonical-path lookup would, tolerating missing tails.
///
/// Errors other than a missing component are returned so callers can fail closed.
pub fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let normalized = absolute_normalized(path)?;

    let mut existing = normalized.as_path();
    let mut tail: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        match fs::symlink_metadata(existing) {
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name);
                existing = parent;
            }
            // Nothing on this path exists, not even the root
            _ => return Ok(normalized.clone()),
        }
    }

    let mut resolved = match fs::canonicalize(existing) {
        Ok(resolved) => resolved,
        // A dangling link at the end of the existing prefix
        Err(e) if e.kind() == io::ErrorKind::NotFound => existing.to_path_buf(),
        Err(e) => return Err(e),
    };
    for name in tail.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

/// True if `path` itself (not its target) is a symbolic link, dangling or not
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|metadata| metadata.file_type().is_symlink())
        .unwrap_or(false)
}

/// `path` is `root` or lies beneath it, compared component by component
pub fn is_under(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

/// `path` lies strictly beneath `root`
pub fn is_strictly_under(path: &Path, root: &Path) -> bool {
    path != root && path.starts_with(root)
}

/// The process temp directory in its three textual forms.
///
/// The raw and normalized forms are fixed at construction. The canonical form needs a
/// filesystem lookup and is computed on first use.
#[derive(Debug)]
pub struct TempDirs {
    raw: PathBuf,
    normalized: PathBuf,
    canonical: OnceLock<Option<PathBuf>>,
}

impl TempDirs {
    pub fn new(raw: PathBuf) -> Self {
        let normalized = normalize(&raw);
        Self {
            raw,
            normalized,
            canonical: OnceLock::new(),
        }
    }

    /// Temp directory of the current process
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn raw(&self) -> &Path {
        &self.raw
    }

    pub fn normalized(&self) -> &Path {
        &self.normalized
    }

    pub fn canonical(&self) -> Option<&Path> {
        self.canonical
            .get_or_init(|| fs::canonicalize(&self.raw).ok())
            .as_deref()
    }

    /// Check whether `resolved`, an already canonicalized candidate, lies in the temp directory.
    ///
    /// Only the resolved form is compared: a lexical prefix would accept a directory link
    /// inside temp that points elsewhere.
    pub fn contains(&self, resolved: &Path) -> bool {
        if is_under(resolved, &self.raw) || is_under(resolved, &self.normalized) {
            return true;
        }
        self.canonical()
            .is_some_and(|canonical| is_under(resolved, canonical))
    }
}
