// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Metadata document layout and persistence.
//!
//! Each watched folder owns one __metadata document__ describing every
//! tracked document inside it: which file is the current revision, what that
//! revision is called, who touched it last, and the history of past
//! revisions.
//!
//! # Metadata Document Layout
//!
//! The metadata document lives at `<folder>/.libra/meta.toml`. It is a plain
//! array of `[[document]]` tables, so insertion order of tracked documents is
//! preserved across loads and saves:
//!
//! ```toml
//! [[document]]
//! name = "sample.docx"
//! current_file = "sample_rev1.0.1_20260211.docx"
//! current_rev = "rev1.0.1_20260211"
//! updated_at = "2026-02-11 09:12:44"
//! updated_by = "alice"
//! last_memo = "fix typos"
//!
//! [[document.history]]
//! rev = "rev1.0.0_20260210"
//! file = "sample_rev1.0.0_20260210.docx"
//! ```
//!
//! Fields other than `name` may be left out, in which case they default to
//! empty values.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::{read_to_string, rename, write, File, OpenOptions},
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument};

/// Name of the hidden directory holding metadata inside a watched folder.
pub const META_DIR: &str = ".libra";

/// Name of the metadata document file inside [`META_DIR`].
pub const META_FILE: &str = "meta.toml";

/// Name of the lock file guarding the metadata document.
pub const META_LOCK: &str = "meta.lock";

/// Determine path to metadata document of a folder.
pub fn meta_path(folder: impl AsRef<Path>) -> PathBuf {
    folder.as_ref().join(META_DIR).join(META_FILE)
}

/// Metadata document of a watched folder.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct MetaDocument {
    /// Tracked documents in insertion order.
    #[serde(rename = "document", default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<TrackedDocument>,
}

impl MetaDocument {
    /// Construct new empty metadata document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get tracked document by name.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&TrackedDocument> {
        self.documents.iter().find(|doc| doc.name == name.as_ref())
    }

    /// Get mutable tracked document by name.
    pub fn get_mut(&mut self, name: impl AsRef<str>) -> Option<&mut TrackedDocument> {
        self.documents.iter_mut().find(|doc| doc.name == name.as_ref())
    }

    /// Insert tracked document.
    ///
    /// Replaces an existing entry of the same name in place, keeping its
    /// position. New names are appended.
    pub fn insert(&mut self, document: TrackedDocument) {
        match self.get_mut(&document.name) {
            Some(existing) => *existing = document,
            None => self.documents.push(document),
        }
    }

    /// Remove tracked document by name.
    pub fn remove(&mut self, name: impl AsRef<str>) -> Option<TrackedDocument> {
        let index = self
            .documents
            .iter()
            .position(|doc| doc.name == name.as_ref())?;
        Some(self.documents.remove(index))
    }

    /// Iterate through tracked documents in order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedDocument> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl FromStr for MetaDocument {
    type Err = MetaError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let meta: MetaDocument = toml::de::from_str(data)?;

        // INVARIANT: Document names are unique keys.
        let duplicate = {
            let mut names = HashSet::new();
            meta.iter()
                .find(|doc| !names.insert(doc.name.as_str()))
                .map(|doc| doc.name.clone())
        };
        if let Some(name) = duplicate {
            return Err(MetaError::DuplicateDocument { name });
        }

        Ok(meta)
    }
}

impl Display for MetaDocument {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(MetaError::Serialize)?
                .as_str(),
        )
    }
}

/// One logical document followed across its revisions.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct TrackedDocument {
    /// Stable document name, free of revision suffixes.
    pub name: String,

    /// File holding the active revision. Empty means no active revision.
    #[serde(default)]
    pub current_file: String,

    /// Revision token of [`Self::current_file`].
    #[serde(default)]
    pub current_rev: String,

    #[serde(default)]
    pub updated_at: String,

    #[serde(default)]
    pub updated_by: String,

    #[serde(default)]
    pub last_memo: String,

    /// Past revisions, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
}

impl TrackedDocument {
    /// Construct new tracked document without an active revision.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Check if document has an active revision.
    pub fn is_live(&self) -> bool {
        !self.current_file.is_empty()
    }
}

/// Past revision of a tracked document.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct HistoryEntry {
    /// Revision token.
    pub rev: String,

    /// File that held the revision.
    pub file: String,
}

impl HistoryEntry {
    pub fn new(rev: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            rev: rev.into(),
            file: file.into(),
        }
    }
}

/// Layer of indirection for metadata persistence.
pub trait MetaStore {
    /// Load metadata document of a folder.
    fn load(&self, folder: &Path) -> Result<MetaDocument>;

    /// Save metadata document of a folder.
    fn save(&self, folder: &Path, meta: &MetaDocument) -> Result<()>;

    /// Take exclusive access to metadata document of a folder.
    ///
    /// Access lasts until the returned lock is dropped. Hold it across a
    /// load, edit, and save, so edits from other processes are not lost.
    fn lock(&self, _folder: &Path) -> Result<MetaLock> {
        Ok(MetaLock::default())
    }
}

/// Exclusive access to a metadata document, released on drop.
#[derive(Debug, Default)]
pub struct MetaLock {
    _file: Option<File>,
}

/// Metadata persistence through TOML files inside each folder.
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlMetaStore;

impl MetaStore for TomlMetaStore {
    /// Load metadata document from `<folder>/.libra/meta.toml`.
    ///
    /// A folder without a metadata document yields an empty one.
    ///
    /// # Errors
    ///
    /// - Return [`MetaError::Read`] if metadata file cannot be read.
    /// - Return [`MetaError::Malformed`] if metadata file is malformed.
    #[instrument(skip(self), level = "debug")]
    fn load(&self, folder: &Path) -> Result<MetaDocument> {
        let path = meta_path(folder);
        if !path.exists() {
            debug!("no metadata at {:?}", path.display());
            return Ok(MetaDocument::default());
        }

        read_to_string(&path)
            .map_err(|err| MetaError::Read {
                source: err,
                path: path.clone(),
            })?
            .parse()
            .map_err(|err| MetaError::Malformed {
                source: Box::new(err),
                path,
            })
    }

    /// Save metadata document to `<folder>/.libra/meta.toml`.
    ///
    /// Writes into a sibling temporary file first, then renames it over the
    /// target so readers never observe a partial document.
    ///
    /// # Errors
    ///
    /// - Return [`MetaError::CreateDir`] if metadata directory cannot be made.
    /// - Return [`MetaError::Serialize`] if metadata cannot be serialized.
    /// - Return [`MetaError::Write`] if metadata file cannot be written.
    #[instrument(skip(self, meta), level = "debug")]
    fn save(&self, folder: &Path, meta: &MetaDocument) -> Result<()> {
        let dir = folder.join(META_DIR);
        mkdirp::mkdirp(&dir).map_err(|err| MetaError::CreateDir {
            source: err,
            path: dir.clone(),
        })?;

        let content = toml::ser::to_string_pretty(meta)?;
        let path = dir.join(META_FILE);
        let temp = dir.join(format!(".{META_FILE}.{}.tmp", std::process::id()));
        write(&temp, content.as_bytes()).map_err(|err| MetaError::Write {
            source: err,
            path: temp.clone(),
        })?;
        rename(&temp, &path).map_err(|err| MetaError::Write {
            source: err,
            path: path.clone(),
        })?;
        debug!("saved {} documents to {:?}", meta.len(), path.display());

        Ok(())
    }

    /// Lock `<folder>/.libra/meta.lock` exclusively.
    ///
    /// Blocks while another process holds the lock.
    ///
    /// # Errors
    ///
    /// - Return [`MetaError::CreateDir`] if metadata directory cannot be made.
    /// - Return [`MetaError::Lock`] if lock file cannot be opened or locked.
    #[instrument(skip(self), level = "debug")]
    fn lock(&self, folder: &Path) -> Result<MetaLock> {
        let dir = folder.join(META_DIR);
        mkdirp::mkdirp(&dir).map_err(|err| MetaError::CreateDir {
            source: err,
            path: dir.clone(),
        })?;

        let path = dir.join(META_LOCK);
        let lock_err = |err: std::io::Error| MetaError::Lock {
            source: err,
            path: path.clone(),
        };
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(lock_err)?;
        file.lock_exclusive().map_err(lock_err)?;

        Ok(MetaLock { _file: Some(file) })
    }
}

/// Load metadata document of a folder through [`TomlMetaStore`].
pub fn load_meta(folder: impl AsRef<Path>) -> Result<MetaDocument> {
    TomlMetaStore.load(folder.as_ref())
}

/// Save metadata document of a folder through [`TomlMetaStore`].
pub fn save_meta(folder: impl AsRef<Path>, meta: &MetaDocument) -> Result<()> {
    TomlMetaStore.save(folder.as_ref(), meta)
}

/// Lock metadata document of a folder through [`TomlMetaStore`].
pub fn lock_meta(folder: impl AsRef<Path>) -> Result<MetaLock> {
    TomlMetaStore.lock(folder.as_ref())
}

/// Metadata persistence error types.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// Metadata file cannot be read from.
    #[error("failed to read metadata at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Metadata file cannot be written to.
    #[error("failed to write metadata at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Metadata directory cannot be created when missing.
    #[error("failed to create metadata directory at {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Metadata lock file cannot be opened or locked.
    #[error("failed to lock metadata at {:?}", path.display())]
    Lock {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Metadata file holds a malformed document.
    #[error("malformed metadata at {:?}", path.display())]
    Malformed {
        #[source]
        source: Box<MetaError>,
        path: PathBuf,
    },

    /// Two tracked documents share a name.
    #[error("document {name:?} is listed more than once")]
    DuplicateDocument { name: String },

    /// Failed to deserialize metadata.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize metadata.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
}

impl From<MetaError> for FmtError {
    fn from(_: MetaError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = MetaError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn sample() -> MetaDocument {
        MetaDocument {
            documents: vec![
                TrackedDocument {
                    name: "sample.docx".into(),
                    current_file: "sample_rev1.0.1_20260211.docx".into(),
                    current_rev: "rev1.0.1_20260211".into(),
                    updated_at: "2026-02-11 09:12:44".into(),
                    updated_by: "alice".into(),
                    last_memo: "fix typos".into(),
                    history: vec![HistoryEntry::new(
                        "rev1.0.0_20260210",
                        "sample_rev1.0.0_20260210.docx",
                    )],
                },
                TrackedDocument {
                    name: "budget.xlsx".into(),
                    current_file: "budget_rev2.0.0_20260101.xlsx".into(),
                    current_rev: "rev2.0.0_20260101".into(),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn deserialize_meta_document() -> anyhow::Result<()> {
        let result: MetaDocument = indoc! {r#"
            [[document]]
            name = "sample.docx"
            current_file = "sample_rev1.0.1_20260211.docx"
            current_rev = "rev1.0.1_20260211"
            updated_at = "2026-02-11 09:12:44"
            updated_by = "alice"
            last_memo = "fix typos"

            [[document.history]]
            rev = "rev1.0.0_20260210"
            file = "sample_rev1.0.0_20260210.docx"

            [[document]]
            name = "budget.xlsx"
            current_file = "budget_rev2.0.0_20260101.xlsx"
            current_rev = "rev2.0.0_20260101"
        "#}
        .parse()?;

        assert_eq!(result, sample());

        Ok(())
    }

    #[test]
    fn serialized_meta_document_parses_back() -> anyhow::Result<()> {
        let result: MetaDocument = sample().to_string().parse()?;
        assert_eq!(result, sample());

        Ok(())
    }

    #[test]
    fn empty_meta_document_parses() -> anyhow::Result<()> {
        let result: MetaDocument = "".parse()?;
        assert_eq!(result, MetaDocument::default());

        Ok(())
    }

    #[test]
    fn reject_document_without_name() {
        let result = indoc! {r#"
            [[document]]
            current_file = "orphan.docx"
        "#}
        .parse::<MetaDocument>();
        assert!(result.is_err());
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut meta = sample();
        let mut replacement = TrackedDocument::new("sample.docx");
        replacement.current_file = "sample_rev1.1.0_20260301.docx".into();
        meta.insert(replacement.clone());
        meta.insert(TrackedDocument::new("notes.txt"));

        let names = meta.iter().map(|doc| doc.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["sample.docx", "budget.xlsx", "notes.txt"]);
        assert_eq!(meta.get("sample.docx"), Some(&replacement));
    }

    #[test]
    fn remove_returns_document() {
        let mut meta = sample();
        let removed = meta.remove("budget.xlsx").map(|doc| doc.name);
        assert_eq!(removed, Some("budget.xlsx".to_string()));
        assert_eq!(meta.remove("budget.xlsx"), None);
        assert_eq!(meta.len(), 1);
    }

    #[sealed_test]
    fn load_missing_meta_is_empty() -> anyhow::Result<()> {
        let folder = std::env::current_dir()?;
        assert_eq!(load_meta(&folder)?, MetaDocument::default());

        Ok(())
    }

    #[sealed_test]
    fn save_then_load_meta() -> anyhow::Result<()> {
        let folder = std::env::current_dir()?;
        save_meta(&folder, &sample())?;

        assert!(meta_path(&folder).is_file());
        assert_eq!(load_meta(&folder)?, sample());

        Ok(())
    }

    #[sealed_test]
    fn load_malformed_meta_fails() -> anyhow::Result<()> {
        let folder = std::env::current_dir()?;
        std::fs::create_dir(folder.join(META_DIR))?;
        std::fs::write(meta_path(&folder), "[[document]\nname = ")?;

        let Err(MetaError::Malformed { source, path }) = load_meta(&folder) else {
            panic!("malformed metadata should fail to load");
        };
        assert!(matches!(*source, MetaError::Deserialize(_)));
        assert_eq!(path, meta_path(&folder));

        Ok(())
    }

    #[test]
    fn reject_duplicate_document_names() {
        let result = indoc! {r#"
            [[document]]
            name = "a.docx"
            current_file = "a_rev1.0.0_20260210.docx"

            [[document]]
            name = "b.docx"
            current_file = "b_rev1.0.0_20260210.docx"

            [[document]]
            name = "a.docx"
            current_file = "a_rev1.0.1_20260211.docx"
        "#}
        .parse::<MetaDocument>();

        assert!(matches!(
            result,
            Err(MetaError::DuplicateDocument { name }) if name == "a.docx"
        ));
    }

    #[sealed_test]
    fn load_duplicate_documents_names_file() -> anyhow::Result<()> {
        let folder = std::env::current_dir()?;
        std::fs::create_dir(folder.join(META_DIR))?;
        std::fs::write(
            meta_path(&folder),
            "[[document]]\nname = \"a.docx\"\n\n[[document]]\nname = \"a.docx\"\n",
        )?;

        let Err(error) = load_meta(&folder) else {
            panic!("duplicate documents should fail to load");
        };
        assert!(error.to_string().contains("meta.toml"));

        Ok(())
    }

    #[sealed_test]
    fn lock_is_exclusive_until_dropped() -> anyhow::Result<()> {
        let folder = std::env::current_dir()?;
        let lock = lock_meta(&folder)?;

        let other = File::open(folder.join(META_DIR).join(META_LOCK))?;
        assert!(other.try_lock_exclusive().is_err());

        drop(lock);
        assert!(other.try_lock_exclusive().is_ok());

        Ok(())
    }
}
