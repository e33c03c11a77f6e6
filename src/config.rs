// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for configuration files that Libra uses to simplify
//! the process of serialization and deserialization. Libra keeps two files in
//! its configuration directory:
//!
//! - `settings.toml`: user preferences, e.g., the name recorded as the author
//!   of new revisions, and extra ignore rules for folder listings.
//! - `registry.toml`: the folders Libra watches.
//!
//! Both files are optional. A missing file yields default values.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

/// User settings layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Name recorded as author of new revisions.
    pub user_name: Option<String>,

    /// Extra gitignore-style rules applied to folder listings.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Folder watching settings.
    #[serde(default)]
    pub watch: WatchSettings,
}

impl Settings {
    /// Load settings from file, or defaults if file does not exist.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if settings file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if settings file is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_or_default(path.as_ref())
    }

    /// Determine author name for new revisions.
    ///
    /// Falls back to the login name of the current user, then "unknown".
    pub fn author(&self) -> String {
        self.user_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .unwrap_or_else(|| "unknown".into())
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data).map_err(ConfigError::Deserialize)
    }
}

/// Folder watching settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct WatchSettings {
    /// Quiet period before a burst of file events triggers a rescan.
    pub debounce_ms: u64,
}

impl WatchSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

/// Registry of watched folders.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Registry {
    /// Watched folders in registration order.
    #[serde(default)]
    pub folders: Vec<PathBuf>,
}

impl Registry {
    /// Load registry from file, or empty registry if file does not exist.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if registry file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if registry file is malformed.
    /// - Return [`ConfigError::ShellExpansion`] if a folder cannot be
    ///   expanded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_or_default(path.as_ref())
    }

    /// Save registry to file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::CreateDir`] if parent directory cannot be made.
    /// - Return [`ConfigError::Write`] if registry file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            mkdirp::mkdirp(parent).map_err(|err| ConfigError::CreateDir {
                source: err,
                path: parent.to_path_buf(),
            })?;
        }

        write(path, self.to_string()).map_err(|err| ConfigError::Write {
            source: err,
            path: path.to_path_buf(),
        })
    }

    /// Register folder. Returns false if folder was already registered.
    pub fn add(&mut self, folder: impl Into<PathBuf>) -> bool {
        let folder = folder.into();
        if self.contains(&folder) {
            return false;
        }

        self.folders.push(folder);
        true
    }

    /// Unregister folder. Returns false if folder was not registered.
    pub fn remove(&mut self, folder: impl AsRef<Path>) -> bool {
        let before = self.folders.len();
        self.folders.retain(|entry| entry != folder.as_ref());
        before != self.folders.len()
    }

    pub fn contains(&self, folder: impl AsRef<Path>) -> bool {
        self.folders.iter().any(|entry| entry == folder.as_ref())
    }
}

impl FromStr for Registry {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut registry: Registry = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every folder.
        registry.folders = registry
            .folders
            .iter()
            .map(|folder| expand_path(folder.to_string_lossy().as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(registry)
    }
}

impl Display for Registry {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Perform shell expansion on a path, e.g., `~/Documents` or `$DOCS/specs`.
///
/// # Errors
///
/// - Return [`ConfigError::ShellExpansion`] if a variable cannot be expanded.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    Ok(PathBuf::from(shellexpand::full(path)?.into_owned()))
}

fn load_or_default<T>(path: &Path) -> Result<T>
where
    T: Default + FromStr<Err = ConfigError>,
{
    if !path.exists() {
        return Ok(T::default());
    }

    read_to_string(path)
        .map_err(|err| ConfigError::Read {
            source: err,
            path: path.to_path_buf(),
        })?
        .parse()
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Configuration file cannot be read from.
    #[error("failed to read configuration at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Configuration file cannot be written to.
    #[error("failed to write configuration at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Configuration directory cannot be created when missing.
    #[error("failed to create configuration directory at {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
