// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where Libra keeps its own files. Everything lives in one
//! configuration directory, which callers may override entirely.

use std::path::{Path, PathBuf};

/// Determine default absolute path to configuration directory.
///
/// Uses `$XDG_CONFIG_HOME/libra` or the platform equivalent. Does not check
/// if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("libra"))
        .ok_or(NoWayHome)
}

/// Path to user settings inside configuration directory.
pub fn settings_path(config_dir: impl AsRef<Path>) -> PathBuf {
    config_dir.as_ref().join("settings.toml")
}

/// Path to folder registry inside configuration directory.
pub fn registry_path(config_dir: impl AsRef<Path>) -> PathBuf {
    config_dir.as_ref().join("registry.toml")
}

/// Candidate version files, in order of preference.
///
/// A `VERSION.txt` shipped next to the executable wins over one placed in
/// the configuration directory.
pub fn version_file_candidates(config_dir: impl AsRef<Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join("VERSION.txt"));
    }
    candidates.push(config_dir.as_ref().join("VERSION.txt"));

    candidates
}

/// No way to determine user's configuration directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
