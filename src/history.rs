// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Revision history clearing.
//!
//! History of a tracked document grows with every committed revision. Users
//! prune it by picking entries to clear. To make that less tedious, two
//! presets pre-select entries relative to the current revision:
//!
//! - [`SelectionPreset::Patch`] selects older patch releases of the current
//!   minor line.
//! - [`SelectionPreset::Minor`] selects every older minor line of the current
//!   major version.
//!
//! Entries whose revision token cannot be parsed are never pre-selected.

use crate::{
    meta::{HistoryEntry, TrackedDocument},
    version::{should_select_minor, should_select_patch, RevisionToken, Version},
};

use std::{
    collections::HashSet,
    fs::remove_file,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Bulk selection preset for history clearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPreset {
    Patch,
    Minor,
}

impl SelectionPreset {
    /// Check if candidate version should be selected against latest version.
    pub fn selects(self, latest: Version, candidate: Version) -> bool {
        match self {
            Self::Patch => should_select_patch(latest, candidate),
            Self::Minor => should_select_minor(latest, candidate),
        }
    }
}

fn version_of(rev: &str) -> Option<Version> {
    rev.parse::<RevisionToken>()
        .map(|token| token.version)
        .map_err(|err| debug!("unparsable revision {rev:?}: {err}"))
        .ok()
}

/// Pre-select history entries for a preset.
///
/// Yields one flag per history entry, in order. Nothing is selected when the
/// latest revision itself cannot be parsed.
pub fn preselect(history: &[HistoryEntry], latest_rev: &str, preset: SelectionPreset) -> Vec<bool> {
    let Some(latest) = version_of(latest_rev) else {
        return vec![false; history.len()];
    };

    history
        .iter()
        .map(|entry| {
            version_of(&entry.rev)
                .map(|candidate| preset.selects(latest, candidate))
                .unwrap_or(false)
        })
        .collect()
}

/// Revisions of history entries selected by a preset.
pub fn preselected_revs(document: &TrackedDocument, preset: SelectionPreset) -> Vec<String> {
    document
        .history
        .iter()
        .zip(preselect(&document.history, &document.current_rev, preset))
        .filter_map(|(entry, selected)| selected.then(|| entry.rev.clone()))
        .collect()
}

/// Remove history entries by revision.
///
/// Keeps the order of the remaining entries, and returns removed entries in
/// their original order. The current revision is never part of history, so
/// it is never touched.
pub fn clear_history(
    document: &mut TrackedDocument,
    revs: impl IntoIterator<Item = impl AsRef<str>>,
) -> Vec<HistoryEntry> {
    let revs = revs
        .into_iter()
        .map(|rev| rev.as_ref().to_owned())
        .collect::<HashSet<_>>();

    let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut document.history)
        .into_iter()
        .partition(|entry| revs.contains(&entry.rev));
    document.history = kept;

    info!(
        "clear {} history entries of {:?}",
        removed.len(),
        document.name
    );
    removed
}

/// Delete files of cleared history entries from folder.
///
/// Files that are already gone are skipped. Files still serving as the
/// current revision are never deleted. Returns paths actually deleted.
///
/// # Errors
///
/// - Return [`HistoryError::Delete`] if an existing file cannot be deleted.
pub fn delete_entry_files(
    folder: impl AsRef<Path>,
    document: &TrackedDocument,
    removed: &[HistoryEntry],
) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    for entry in removed {
        if entry.file.is_empty() || entry.file == document.current_file {
            continue;
        }

        let path = folder.as_ref().join(&entry.file);
        if !path.is_file() {
            warn!("history file {:?} is already gone", path.display());
            continue;
        }

        remove_file(&path).map_err(|err| HistoryError::Delete {
            source: err,
            path: path.clone(),
        })?;
        deleted.push(path);
    }

    Ok(deleted)
}

/// History clearing error types.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// History file cannot be deleted.
    #[error("failed to delete history file {:?}", path.display())]
    Delete {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = HistoryError> = std::result::Result<T, E>;
