//! Shared audio utilities.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Generate a simple unique id based on current time in nanoseconds.
/// Sufficient for naming short-lived audio files.
#[inline]
pub(crate) fn gen_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{:x}", nanos)
}

/// Player binary named by `env_key`, falling back to `default_bin` on PATH.
/// An override that does not exist on disk is ignored.
pub(crate) fn get_from_env_or_path(env_key: &str, default_bin: &str) -> Option<PathBuf> {
    std::env::var_os(env_key)
        .map(PathBuf::from)
        .filter(|p| p.is_file())
        .or_else(|| get_from_path(default_bin))
}

/// Resolves `bin` as a path when it has a separator, else searches PATH.
pub(crate) fn get_from_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return p.is_file().then_some(p);
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.is_file())
}
