//! Shared test utilities.

use camino::Utf8PathBuf;
use tempfile::TempDir;

/// Creates a temporary directory for cache tests.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
pub fn create_temp_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|error| panic!("failed to create temporary directory: {error}"))
}

/// Returns the cache file path inside `temp_dir`.
///
/// # Panics
///
/// Panics if the temporary path is not valid UTF-8.
pub fn cache_path(temp_dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp_dir.path().join("cache").join("pullman.sqlite"))
        .unwrap_or_else(|path| panic!("non-UTF-8 temporary path: {}", path.display()))
}

/// Strips the quotes feature files put around free-text step arguments.
pub fn unquote(text: &str) -> String {
    text.trim_matches('"').to_owned()
}
