//! Path utilities: platform path limits, normalization and scoped filesystem helpers.

use crate::error::{GenAbcError, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// Maximum file path length accepted on the current platform.
///
/// Returns `None` on platforms where the limit is unknown; callers treat that
/// as an error rather than guessing.
///
/// - Windows: 259 (`MAX_PATH` minus the terminating NUL)
/// - Linux: 4095 (`PATH_MAX` minus the terminating NUL)
/// - macOS: 1016
pub const fn max_file_path_length() -> Option<usize> {
    if cfg!(target_os = "windows") {
        Some(259)
    } else if cfg!(target_os = "linux") {
        Some(4095)
    } else if cfg!(target_os = "macos") {
        Some(1016)
    } else {
        None
    }
}

/// Validate a path against the platform maximum path length.
///
/// # Examples
///
/// ```
/// use genabc::paths::validate_file_path_length;
///
/// assert!(validate_file_path_length("/tmp/out/app.temp.js").is_ok());
/// assert!(validate_file_path_length("").is_err());
/// ```
pub fn validate_file_path_length<P: AsRef<Path>>(path: P) -> Result<()> {
    let max = max_file_path_length().ok_or(GenAbcError::UnknownPlatform)?;
    validate_path_length_with(path, max)
}

/// Validate a path against an explicit maximum length (in characters).
///
/// Empty paths are rejected; a path of exactly `max` characters is accepted.
pub fn validate_path_length_with<P: AsRef<Path>>(path: P, max: usize) -> Result<()> {
    let path = path.as_ref().to_string_lossy();
    let len = path.chars().count();
    if len == 0 {
        return Err(GenAbcError::InvalidPath("path is empty".to_string()));
    }
    if len > max {
        return Err(GenAbcError::PathLength {
            path: path.into_owned(),
            len,
            max,
        });
    }
    Ok(())
}

/// Normalize path separators to `/`.
///
/// Only rewrites on Windows; other platforms already use `/`.
pub fn to_unix_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if cfg!(windows) {
        PathBuf::from(path.to_string_lossy().replace('\\', "/"))
    } else {
        path.to_path_buf()
    }
}

/// Expands a leading `~` in a path to the user's home directory.
///
/// This handles the common case where shell tilde expansion doesn't occur,
/// such as when using `--output=~/path` syntax instead of `--output ~/path`.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use genabc::paths::expand_tilde;
///
/// let path = PathBuf::from("/tmp/foo");
/// assert_eq!(expand_tilde(&path), path);
/// ```
pub fn expand_tilde<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if let Ok(stripped) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    path.to_path_buf()
}

/// Ensure a directory exists, creating it and any missing parents.
///
/// Idempotent: an existing directory is not an error.
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Remove a file, ignoring a file that is already gone.
///
/// Returns `true` if the file was removed by this call. Other I/O errors are
/// logged and swallowed so cleanup can continue with the remaining files.
pub fn remove_file_best_effort<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    match std::fs::remove_file(path) {
        Ok(()) => {
            trace!(path = %path.display(), "Removed file");
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove file");
            false
        }
    }
}
