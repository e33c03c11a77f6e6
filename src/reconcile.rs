// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Folder reconciliation.
//!
//! __Reconciliation__ aligns a folder's metadata document with what is
//! physically present in that folder. It is pure: the caller lists the folder
//! and loads the metadata, then hands both over here.
//!
//! Two rules drive it:
//!
//! 1. A tracked document with no current file has no live revision, so its
//!    record is pruned from the metadata document.
//! 2. A tracked document whose current file is absent from the listing stays
//!    tracked, and is merely flagged as missing. Only a human decides to stop
//!    tracking a document.
//!
//! The metadata document only needs to be written back when rule 1 fired.

use crate::meta::{MetaDocument, TrackedDocument};

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

/// Presentation row for one tracked document.
///
/// Rebuilt on every scan, never persisted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    /// Tracked document name.
    pub name: String,

    /// Current revision file name.
    pub filename: String,

    /// Full path to current revision file.
    pub path: PathBuf,

    pub current_rev: String,
    pub updated_at: String,
    pub updated_by: String,
    pub last_memo: String,

    /// Current revision file is absent from the folder.
    pub missing: bool,
}

impl DisplayRow {
    fn new(folder: &Path, document: &TrackedDocument, missing: bool) -> Self {
        Self {
            name: document.name.clone(),
            filename: document.current_file.clone(),
            path: folder.join(&document.current_file),
            current_rev: document.current_rev.clone(),
            updated_at: document.updated_at.clone(),
            updated_by: document.updated_by.clone(),
            last_memo: document.last_memo.clone(),
            missing,
        }
    }
}

/// Outcome of reconciling one folder.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Rows of surviving documents in metadata order.
    pub rows: Vec<DisplayRow>,

    /// Names of pruned documents.
    pub pruned: Vec<String>,
}

impl Reconciliation {
    /// Check if metadata document changed and must be persisted.
    pub fn needs_save(&self) -> bool {
        !self.pruned.is_empty()
    }
}

/// Reconcile metadata document against folder listing.
///
/// Prunes documents without a current file from `meta` in place, and
/// produces one [`DisplayRow`] per surviving document. Reconciling an
/// already reconciled document against the same listing changes nothing.
pub fn reconcile(
    folder: impl AsRef<Path>,
    meta: &mut MetaDocument,
    actual_files: &[String],
) -> Reconciliation {
    let folder = folder.as_ref();
    let present = actual_files.iter().map(String::as_str).collect::<HashSet<_>>();

    let mut pruned = Vec::new();
    meta.documents.retain(|document| {
        if !document.is_live() {
            pruned.push(document.name.clone());
        }
        document.is_live()
    });

    let rows = meta
        .iter()
        .map(|document| {
            let missing = !present.contains(document.current_file.as_str());
            DisplayRow::new(folder, document, missing)
        })
        .collect();

    Reconciliation { rows, pruned }
}
