// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Folder scanning.
//!
//! A scan ties the pieces together for one folder: detect a missing folder,
//! load its metadata document, list its files, reconcile, and write the
//! metadata document back only when reconciliation pruned something.
//!
//! Scans of the same folder must not overlap. Reconciliation mutates the
//! loaded metadata document, and two overlapping scans would race on the
//! write back. Callers serialize scans themselves. Writes from other
//! processes are covered by the store lock: a scan that needs to prune
//! reloads and reconciles again under [`MetaStore::lock`] before saving.

use crate::{
    listing::{safe_list_files, IgnoreSet},
    meta::{MetaDocument, MetaStore, TomlMetaStore},
    reconcile::{reconcile, DisplayRow},
};

use std::path::Path;
use tracing::{info, instrument, warn};

/// Result of scanning one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderScan {
    /// Folder itself does not exist.
    Missing,

    /// Folder exists and was reconciled.
    Present {
        meta: MetaDocument,
        rows: Vec<DisplayRow>,
        pruned: Vec<String>,
    },
}

impl FolderScan {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Display rows of scan, empty for a missing folder.
    pub fn rows(&self) -> &[DisplayRow] {
        match self {
            Self::Missing => &[],
            Self::Present { rows, .. } => rows,
        }
    }
}

/// Folder scanner over some metadata store.
#[derive(Debug, Clone)]
pub struct Scanner<S = TomlMetaStore>
where
    S: MetaStore,
{
    store: S,
    ignore_patterns: Vec<String>,
}

impl Scanner<TomlMetaStore> {
    /// Construct new scanner persisting through [`TomlMetaStore`].
    pub fn with_patterns(ignore_patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(TomlMetaStore, ignore_patterns)
    }
}

impl<S> Scanner<S>
where
    S: MetaStore,
{
    /// Construct new scanner.
    ///
    /// The ignore patterns extend the built-in ignore set of every folder
    /// scanned.
    pub fn new(store: S, ignore_patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            store,
            ignore_patterns: ignore_patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Access underlying metadata store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build ignore set of target folder.
    ///
    /// # Errors
    ///
    /// - Return [`ScanError::Listing`] if an ignore pattern is invalid.
    pub fn ignore_set(&self, folder: impl AsRef<Path>) -> Result<IgnoreSet> {
        Ok(IgnoreSet::new(folder, &self.ignore_patterns)?)
    }

    /// Scan a folder.
    ///
    /// # Errors
    ///
    /// - Return [`ScanError::Meta`] if metadata cannot be loaded or saved.
    /// - Return [`ScanError::Listing`] if folder cannot be listed.
    #[instrument(skip(self, folder), level = "debug")]
    pub fn scan(&self, folder: impl AsRef<Path>) -> Result<FolderScan> {
        let folder = folder.as_ref();
        if !folder.is_dir() {
            warn!("folder {:?} is missing", folder.display());
            return Ok(FolderScan::Missing);
        }

        let mut meta = self.store.load(folder)?;
        let files = safe_list_files(folder, &self.ignore_set(folder)?)?;
        let mut outcome = reconcile(folder, &mut meta, &files);

        if outcome.needs_save() {
            // INVARIANT: Prune the latest metadata under lock, so edits saved
            // since the first load survive.
            let _lock = self.store.lock(folder)?;
            meta = self.store.load(folder)?;
            outcome = reconcile(folder, &mut meta, &files);
            if outcome.needs_save() {
                info!(
                    "prune {} untracked documents from {:?}",
                    outcome.pruned.len(),
                    folder.display()
                );
                self.store.save(folder, &meta)?;
            }
        }

        for row in outcome.rows.iter().filter(|row| row.missing) {
            warn!("{:?} is missing from {:?}", row.filename, folder.display());
        }

        Ok(FolderScan::Present {
            meta,
            rows: outcome.rows,
            pruned: outcome.pruned,
        })
    }
}

impl<S> Scanner<S>
where
    S: MetaStore,
{
    /// Scan each folder in turn.
    ///
    /// A folder that fails to scan does not stop the others. Outcomes come
    /// back in folder order.
    pub fn scan_all<P>(&self, folders: impl IntoIterator<Item = P>) -> Vec<(P, Result<FolderScan>)>
    where
        P: AsRef<Path>,
    {
        folders
            .into_iter()
            .map(|folder| {
                let result = self.scan(&folder);
                if let Err(error) = &result {
                    warn!("failed to scan {:?}: {error}", folder.as_ref().display());
                }
                (folder, result)
            })
            .collect()
    }
}

impl Default for Scanner<TomlMetaStore> {
    fn default() -> Self {
        Self::with_patterns(Vec::<String>::new())
    }
}

/// Folder scanning error types.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Metadata persistence fails.
    #[error(transparent)]
    Meta(#[from] crate::meta::MetaError),

    /// Folder listing fails.
    #[error(transparent)]
    Listing(#[from] crate::listing::ListingError),
}

/// Friendly result alias :3
pub type Result<T, E = ScanError> = std::result::Result<T, E>;
