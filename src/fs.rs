//! Capability-scoped filesystem helpers.

use std::io;

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;

/// Creates `directory` (and any missing parents) and returns a handle to it.
///
/// Relative paths are resolved against the current directory, absolute paths
/// against `/`.
///
/// # Errors
///
/// Returns the underlying I/O error when a directory cannot be opened or
/// created.
pub fn ensure_dir(directory: &Utf8Path) -> io::Result<Dir> {
    if directory.as_str().is_empty() || directory == Utf8Path::new(".") {
        return Dir::open_ambient_dir(".", ambient_authority());
    }

    let (base, relative) = match directory.strip_prefix("/") {
        Ok(relative) => (Dir::open_ambient_dir("/", ambient_authority())?, relative),
        Err(_) => (Dir::open_ambient_dir(".", ambient_authority())?, directory),
    };

    if relative.as_str().is_empty() {
        return Ok(base);
    }

    base.create_dir_all(relative)?;
    base.open_dir(relative)
}

/// Splits `path` into a directory handle (created on demand) and file name.
///
/// # Errors
///
/// Returns an error when `path` has no file name or its parent cannot be
/// created.
pub fn parent_dir_and_name(path: &Utf8Path) -> io::Result<(Dir, &str)> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{path}' has no file name"),
        )
    })?;
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    Ok((ensure_dir(parent)?, file_name))
}
