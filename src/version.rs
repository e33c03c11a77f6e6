// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Revision versioning.
//!
//! Every revision of a tracked document is named by a __revision token__ of
//! the form `rev{major}.{minor}.{patch}_{YYYYMMDD}`, e.g.,
//! `rev1.2.3_20260210`. The version part is a plain three-part [`Version`]
//! that orders lexicographically by position. The date part only records
//! when the revision was committed, and plays no role in ordering.
//!
//! # Bulk Selection
//!
//! The history clearing flow pre-selects old revisions through two
//! predicates:
//!
//! - [`should_select_patch`] picks strictly older patch releases inside the
//!   exact same minor line as the latest revision.
//! - [`should_select_minor`] picks any older minor line inside the same major
//!   version, regardless of patch.
//!
//! Neither predicate ever selects the latest revision itself, or anything
//! from another major version.

use chrono::NaiveDate;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::read_to_string,
    num::ParseIntError,
    path::Path,
    str::FromStr,
};
use tracing::debug;

/// Three-part semantic version of a revision.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Version given to the first revision of a newly tracked document.
    pub const INITIAL: Version = Version::new(1, 0, 0);

    /// Construct new version.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Produce next version for given bump level.
    ///
    /// Lower components reset to zero when a higher component is bumped.
    ///
    /// # Errors
    ///
    /// - Return [`VersionError::Overflow`] if bumped component is already at
    ///   its maximum.
    pub fn bump(self, level: BumpLevel) -> Result<Self> {
        let bumped = |component: u64| {
            component
                .checked_add(1)
                .ok_or(VersionError::Overflow { version: self })
        };
        let next = match level {
            BumpLevel::Patch => Self::new(self.major, self.minor, bumped(self.patch)?),
            BumpLevel::Minor => Self::new(self.major, bumped(self.minor)?, 0),
            BumpLevel::Major => Self::new(bumped(self.major)?, 0, 0),
        };

        Ok(next)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let parts = data.split('.').collect::<Vec<_>>();
        if parts.len() != 3 {
            return Err(VersionError::ComponentCount {
                version: data.into(),
                count: parts.len(),
            });
        }

        let component = |part: &str| {
            // INVARIANT: Plain decimal digits without sign or leading zeros.
            let digits = !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit());
            if !digits || (part.len() > 1 && part.starts_with('0')) {
                return Err(VersionError::NonCanonical {
                    component: part.into(),
                    version: data.into(),
                });
            }

            part.parse::<u64>()
                .map_err(|err| VersionError::Component {
                    source: err,
                    version: data.into(),
                })
        };

        Ok(Self::new(
            component(parts[0])?,
            component(parts[1])?,
            component(parts[2])?,
        ))
    }
}

impl Display for Version {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Which component of a [`Version`] to bump.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpLevel {
    #[default]
    Patch,
    Minor,
    Major,
}

/// Revision token naming one specific revision of a tracked document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevisionToken {
    pub version: Version,
    pub date: NaiveDate,
}

impl RevisionToken {
    /// Construct new revision token.
    pub fn new(version: Version, date: NaiveDate) -> Self {
        Self { version, date }
    }
}

impl FromStr for RevisionToken {
    type Err = VersionError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let rest = data
            .strip_prefix("rev")
            .ok_or_else(|| VersionError::MissingPrefix { token: data.into() })?;
        let (version, date) = rest
            .split_once('_')
            .ok_or_else(|| VersionError::MissingDate { token: data.into() })?;
        let date = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|err| {
            VersionError::InvalidDate {
                source: err,
                token: data.into(),
            }
        })?;

        Ok(Self::new(version.parse()?, date))
    }
}

impl Display for RevisionToken {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "rev{}_{}", self.version, self.date.format("%Y%m%d"))
    }
}

/// Check if candidate is an older patch release in the latest minor line.
pub fn should_select_patch(latest: Version, candidate: Version) -> bool {
    candidate.major == latest.major
        && candidate.minor == latest.minor
        && candidate.patch < latest.patch
}

/// Check if candidate belongs to an older minor line of the latest major.
pub fn should_select_minor(latest: Version, candidate: Version) -> bool {
    candidate.major == latest.major && candidate.minor < latest.minor
}

/// Determine application version.
///
/// Walks through candidate version files in order, and picks the trimmed
/// contents of the first one that exists and is not blank. Unreadable files
/// are skipped. Falls back to `fallback` when no candidate qualifies.
pub fn resolve_app_version(
    candidates: impl IntoIterator<Item = impl AsRef<Path>>,
    fallback: impl Into<String>,
) -> String {
    candidates
        .into_iter()
        .find_map(|path| read_version_file(path.as_ref()))
        .unwrap_or_else(|| fallback.into())
}

fn read_version_file(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }

    match read_to_string(path) {
        Ok(content) => {
            let content = content.trim();
            (!content.is_empty()).then(|| content.to_owned())
        }
        Err(error) => {
            debug!("skip unreadable version file {:?}: {error}", path.display());
            None
        }
    }
}

/// Version and revision token parsing error types.
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    /// Version does not have exactly three components.
    #[error("version {version:?} has {count} components, expected 3")]
    ComponentCount { version: String, count: usize },

    /// Version component is not a non-negative integer.
    #[error("version {version:?} has non-integer component")]
    Component {
        #[source]
        source: ParseIntError,
        version: String,
    },

    /// Version component is not written in plain decimal digits.
    #[error("version {version:?} has non-canonical component {component:?}")]
    NonCanonical { component: String, version: String },

    /// Bumping version would overflow a component.
    #[error("version {version} cannot be bumped any further")]
    Overflow { version: Version },

    /// Revision token does not start with "rev".
    #[error("revision token {token:?} does not start with \"rev\"")]
    MissingPrefix { token: String },

    /// Revision token has no date suffix.
    #[error("revision token {token:?} has no date suffix")]
    MissingDate { token: String },

    /// Revision token date suffix is not a valid YYYYMMDD date.
    #[error("revision token {token:?} has invalid date")]
    InvalidDate {
        #[source]
        source: chrono::ParseError,
        token: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = VersionError> = std::result::Result<T, E>;
