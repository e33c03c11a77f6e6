// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Document tracking operations.
//!
//! A tracked document is known by a stable __document name__, e.g.,
//! `report.docx`, while each of its revisions lives in a file that carries
//! the revision token in its stem, e.g., `report_rev1.2.0_20260301.docx`.
//!
//! Operations here only mutate the in-memory metadata document and the files
//! of the folder. Persisting the metadata document afterwards is left to the
//! caller.

use crate::{
    listing::IgnoreSet,
    meta::{HistoryEntry, MetaDocument, TrackedDocument},
    version::{BumpLevel, RevisionToken, Version},
};

use chrono::NaiveDateTime;
use std::{
    fs::{copy, rename},
    path::{Component, Path, PathBuf},
};
use tracing::{info, instrument};

/// Format of [`TrackedDocument::updated_at`].
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATE_LEN: usize = "YYYYMMDD".len();

/// Split file name into document name and revision token.
///
/// Files without a revision token in their stem come back unchanged, with no
/// token.
pub fn split_revision(file_name: &str) -> (String, Option<RevisionToken>) {
    let unchanged = || (file_name.to_owned(), None);
    let Some(index) = file_name.rfind("_rev") else {
        return unchanged();
    };

    // INVARIANT: Token ends right after its YYYYMMDD date.
    let rest = &file_name[index + 1..];
    let Some(split) = rest.find('_') else {
        return unchanged();
    };
    let end = split + 1 + DATE_LEN;
    let (Some(token), Some(suffix)) = (rest.get(..end), rest.get(end..)) else {
        return unchanged();
    };
    if !(suffix.is_empty() || suffix.starts_with('.')) {
        return unchanged();
    }

    match token.parse::<RevisionToken>() {
        Ok(token) => (format!("{}{suffix}", &file_name[..index]), Some(token)),
        Err(_) => unchanged(),
    }
}

/// Determine document name of a file.
pub fn document_name(file_name: &str) -> String {
    split_revision(file_name).0
}

/// Determine file name of a document revision.
pub fn revision_file_name(document: &str, token: &RevisionToken) -> String {
    let (stem, extension) = split_extension(document);
    join_extension(&format!("{stem}_{token}"), extension)
}

fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rfind('.') {
        Some(0) | None => (file_name, None),
        Some(index) => (&file_name[..index], Some(&file_name[index + 1..])),
    }
}

fn join_extension(stem: &str, extension: Option<&str>) -> String {
    match extension {
        Some(extension) => format!("{stem}.{extension}"),
        None => stem.to_owned(),
    }
}

/// Who and why a tracking operation happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub author: String,
    pub memo: String,
    pub at: NaiveDateTime,
}

impl Provenance {
    pub fn new(author: impl Into<String>, memo: impl Into<String>, at: NaiveDateTime) -> Self {
        Self {
            author: author.into(),
            memo: memo.into(),
            at,
        }
    }

    fn stamp(&self, document: &mut TrackedDocument) {
        document.updated_at = self.at.format(TIMESTAMP_FORMAT).to_string();
        document.updated_by = self.author.clone();
        document.last_memo = self.memo.clone();
    }
}

/// Start tracking a file inside a folder.
///
/// A file that already carries a revision token becomes the current
/// revision as is. Any other file is renamed to the initial revision of its
/// document. History of a previously untracked document of the same name is
/// kept.
///
/// # Errors
///
/// - Return [`TrackError::InvalidName`] if file name is not a plain name
///   directly inside folder.
/// - Return [`TrackError::Ignored`] if file is hidden by ignore rules.
/// - Return [`TrackError::FileMissing`] if file is not in folder.
/// - Return [`TrackError::AlreadyTracked`] if document already has a live
///   revision.
/// - Return [`TrackError::Collision`] if initial revision file already exists.
/// - Return [`TrackError::Rename`] if file cannot be renamed.
#[instrument(skip(meta, folder, ignore, provenance), level = "debug")]
pub fn track_file(
    meta: &mut MetaDocument,
    folder: impl AsRef<Path>,
    file_name: &str,
    ignore: &IgnoreSet,
    provenance: &Provenance,
) -> Result<TrackedDocument> {
    let folder = folder.as_ref();
    let mut components = Path::new(file_name).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        return Err(TrackError::InvalidName {
            name: file_name.into(),
        });
    }

    let path = folder.join(file_name);
    if ignore.is_ignored(&path, false) {
        return Err(TrackError::Ignored { path });
    }
    if !path.is_file() {
        return Err(TrackError::FileMissing { path });
    }

    let (name, token) = split_revision(file_name);
    let mut document = match meta.get(&name) {
        Some(existing) if existing.is_live() => {
            return Err(TrackError::AlreadyTracked { name });
        }
        Some(existing) => existing.clone(),
        None => TrackedDocument::new(&name),
    };

    match token {
        Some(token) => {
            document.current_file = file_name.to_owned();
            document.current_rev = token.to_string();
        }
        None => {
            let token = RevisionToken::new(Version::INITIAL, provenance.at.date());
            let current_file = revision_file_name(&name, &token);
            let target = folder.join(&current_file);
            if target.exists() {
                return Err(TrackError::Collision { path: target });
            }
            rename(&path, &target).map_err(|err| TrackError::Rename {
                source: err,
                path: path.clone(),
            })?;
            document.current_file = current_file;
            document.current_rev = token.to_string();
        }
    }
    provenance.stamp(&mut document);

    info!("track {name:?} at {}", document.current_rev);
    meta.insert(document.clone());

    Ok(document)
}

/// Commit new revision of a tracked document.
///
/// Copies the current revision file to the file of the next revision, moves
/// the current revision into history, and points the document at the new
/// revision.
///
/// # Errors
///
/// - Return [`TrackError::NotTracked`] if document has no live revision.
/// - Return [`TrackError::FileMissing`] if current revision file is gone.
/// - Return [`TrackError::Version`] if current revision token is malformed,
///   or its version cannot be bumped.
/// - Return [`TrackError::Collision`] if next revision file already exists.
/// - Return [`TrackError::Copy`] if current revision file cannot be copied.
#[instrument(skip(meta, folder, provenance), level = "debug")]
pub fn commit_revision(
    meta: &mut MetaDocument,
    folder: impl AsRef<Path>,
    name: &str,
    level: BumpLevel,
    provenance: &Provenance,
) -> Result<TrackedDocument> {
    let folder = folder.as_ref();
    let document = meta
        .get_mut(name)
        .filter(|document| document.is_live())
        .ok_or_else(|| TrackError::NotTracked { name: name.into() })?;

    let current = folder.join(&document.current_file);
    if !current.is_file() {
        return Err(TrackError::FileMissing { path: current });
    }

    let token = document.current_rev.parse::<RevisionToken>()?;
    let next = RevisionToken::new(token.version.bump(level)?, provenance.at.date());
    let next_file = revision_file_name(name, &next);
    let target = folder.join(&next_file);
    if target.exists() {
        return Err(TrackError::Collision { path: target });
    }

    copy(&current, &target).map_err(|err| TrackError::Copy {
        source: err,
        from: current.clone(),
        to: target.clone(),
    })?;

    let previous = HistoryEntry::new(
        std::mem::take(&mut document.current_rev),
        std::mem::replace(&mut document.current_file, next_file),
    );
    document.history.push(previous);
    document.current_rev = next.to_string();
    provenance.stamp(document);

    info!("commit {name:?} at {}", document.current_rev);

    Ok(document.clone())
}

/// Stop tracking a document.
///
/// Clears the current revision, so the next reconciliation prunes the
/// document from the metadata document. Files are left alone.
///
/// # Errors
///
/// - Return [`TrackError::NotTracked`] if document is unknown.
pub fn untrack(meta: &mut MetaDocument, name: &str) -> Result<()> {
    let document = meta
        .get_mut(name)
        .ok_or_else(|| TrackError::NotTracked { name: name.into() })?;
    document.current_file.clear();
    info!("untrack {name:?}");

    Ok(())
}

/// Tracking operation error types.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// File name is not a plain name inside folder.
    #[error("{name:?} is not a file name inside folder")]
    InvalidName { name: String },

    /// File is hidden by ignore rules, and would never be listed.
    #[error("file {:?} is ignored", path.display())]
    Ignored { path: PathBuf },

    /// File expected in folder does not exist.
    #[error("file {:?} does not exist", path.display())]
    FileMissing { path: PathBuf },

    /// Document already has a live revision.
    #[error("document {name:?} is already tracked")]
    AlreadyTracked { name: String },

    /// Document has no live revision.
    #[error("document {name:?} is not tracked")]
    NotTracked { name: String },

    /// Revision file to be created already exists.
    #[error("revision file {:?} already exists", path.display())]
    Collision { path: PathBuf },

    /// File cannot be renamed into a revision file.
    #[error("failed to rename {:?}", path.display())]
    Rename {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Revision file cannot be copied.
    #[error("failed to copy {:?} to {:?}", from.display(), to.display())]
    Copy {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Revision token is malformed.
    #[error(transparent)]
    Version(#[from] crate::version::VersionError),
}

/// Friendly result alias :3
pub type Result<T, E = TrackError> = std::result::Result<T, E>;
