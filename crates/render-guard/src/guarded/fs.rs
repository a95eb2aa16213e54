//! Filesystem access

use crate::guarded::display_path;
use crate::security::{Operation, SecurityHost};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

pub fn read(host: &SecurityHost, path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
    let path = path.as_ref();
    host.check(&Operation::read(display_path(path)))?;
    fs::read(path)
}

pub fn read_to_string(host: &SecurityHost, path: impl AsRef<Path>) -> io::Result<String> {
    let path = path.as_ref();
    host.check(&Operation::read(display_path(path)))?;
    fs::read_to_string(path)
}

/// Create or truncate `path` and write `contents`.
///
/// The final component is opened without following links (`O_NOFOLLOW` on unix), so a link
/// planted after the check fails with an error instead of redirecting the write. Links in
/// parent directories are only caught by the check itself and can still race it.
pub fn write(
    host: &SecurityHost,
    path: impl AsRef<Path>,
    contents: impl AsRef<[u8]>,
) -> io::Result<()> {
    let path = path.as_ref();
    host.check(&Operation::write(display_path(path)))?;
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    no_follow(&mut options).open(path)?.write_all(contents.as_ref())
}

#[cfg(unix)]
fn no_follow(options: &mut OpenOptions) -> &mut OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;
    options.custom_flags(libc::O_NOFOLLOW)
}

#[cfg(not(unix))]
fn no_follow(options: &mut OpenOptions) -> &mut OpenOptions {
    options
}

/// Create a directory and its missing parents
pub fn create_dir_all(host: &SecurityHost, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    host.check(&Operation::write(display_path(path)))?;
    fs::create_dir_all(path)
}

pub fn remove_file(host: &SecurityHost, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    host.check(&Operation::delete(display_path(path)))?;
    fs::remove_file(path)
}

/// Create a symbolic link at `link` pointing to `original`
pub fn symlink(
    host: &SecurityHost,
    original: impl AsRef<Path>,
    link: impl AsRef<Path>,
) -> io::Result<()> {
    let link = link.as_ref();
    host.check(&Operation::CreateSymbolicLink {
        link: display_path(link),
    })?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(original, link)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(original, link)
    }
}
