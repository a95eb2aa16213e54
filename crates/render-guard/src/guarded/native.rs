//! Native library loading

use crate::security::{Operation, SecurityHost};
use libloading::Library;
use std::ffi::OsStr;
use std::io;

/// Load a native library by path.
///
/// # Safety
///
/// Loading a dynamic library runs its initialization code in this process. The caller must
/// ensure the library is trusted; the link check only narrows which libraries are reachable.
pub unsafe fn load_library(host: &SecurityHost, path: impl AsRef<OsStr>) -> io::Result<Library> {
    let path = path.as_ref();
    host.check(&Operation::Link {
        library: path.to_string_lossy().into_owned(),
    })?;
    Library::new(path).map_err(io::Error::other)
}

/// Load a native library by short name, e.g. `jsound` for `libjsound.so`.
///
/// # Safety
///
/// See [`load_library`].
pub unsafe fn load_system_library(host: &SecurityHost, name: &str) -> io::Result<Library> {
    host.check(&Operation::Link {
        library: name.to_string(),
    })?;
    Library::new(libloading::library_filename(name)).map_err(io::Error::other)
}
