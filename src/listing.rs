// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Folder listing with ignore rules.
//!
//! Office suites litter document folders with owner files, lock files, and
//! temporary saves that come and go while a document is open. None of these
//! are revisions, so they must never reach reconciliation. An [`IgnoreSet`]
//! filters them out using gitignore syntax, relative to the folder being
//! listed.
//!
//! Listing is shallow: only regular files directly inside the folder count.

use crate::meta::META_DIR;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::{
    fs::read_dir,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Ignore rules that always apply.
pub const BUILTIN_IGNORE: &[&str] = &[
    "/.libra/",
    "~$*",
    ".~lock.*#",
    "*.tmp",
    "Thumbs.db",
    ".DS_Store",
];

/// Set of ignore rules for one folder.
#[derive(Clone, Debug)]
pub struct IgnoreSet {
    root: PathBuf,
    matcher: Gitignore,
}

impl IgnoreSet {
    /// Construct new ignore set for target folder.
    ///
    /// Combines [`BUILTIN_IGNORE`] with user supplied patterns.
    ///
    /// # Errors
    ///
    /// - Return [`ListingError::Pattern`] if a pattern is not valid gitignore
    ///   syntax.
    pub fn new(
        folder: impl AsRef<Path>,
        patterns: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self> {
        let root = folder.as_ref().to_path_buf();
        let mut builder = GitignoreBuilder::new(&root);
        for rule in BUILTIN_IGNORE {
            builder.add_line(None, rule)?;
        }
        for rule in patterns {
            builder.add_line(None, rule.as_ref())?;
        }

        Ok(Self {
            matcher: builder.build()?,
            root,
        })
    }

    /// Check if path should be ignored.
    ///
    /// Paths inside the metadata directory of the folder are always
    /// ignored. Directories above the folder play no part in matching.
    pub fn is_ignored(&self, path: impl AsRef<Path>, is_dir: bool) -> bool {
        let path = path.as_ref();
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if relative.components().next().is_some_and(|part| part.as_os_str() == META_DIR) {
            return true;
        }

        self.matcher.matched(path, is_dir).is_ignore()
    }
}

/// List names of files directly inside folder.
///
/// Skips directories, ignored files, and names that are not valid UTF-8.
/// Names come back sorted.
///
/// # Errors
///
/// - Return [`ListingError::ReadDir`] if folder cannot be read.
pub fn safe_list_files(folder: impl AsRef<Path>, ignore: &IgnoreSet) -> Result<Vec<String>> {
    let folder = folder.as_ref();
    let read_err = |err: std::io::Error| ListingError::ReadDir {
        source: err,
        path: folder.to_path_buf(),
    };

    let mut files = Vec::new();
    for entry in read_dir(folder).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if !entry.file_type().map_err(read_err)?.is_file() {
            continue;
        }

        let path = entry.path();
        if ignore.is_ignored(&path, false) {
            debug!("ignore {:?}", path.display());
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) => files.push(name),
            Err(name) => warn!("skip file with non-UTF-8 name {name:?}"),
        }
    }
    files.sort();

    Ok(files)
}

/// Folder listing error types.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    /// Folder cannot be read.
    #[error("failed to read folder at {:?}", path.display())]
    ReadDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Ignore pattern is invalid.
    #[error(transparent)]
    Pattern(#[from] ignore::Error),
}

/// Friendly result alias :3
pub type Result<T, E = ListingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs::{create_dir, write};

    #[sealed_test]
    fn list_skips_ignored_files_and_directories() -> anyhow::Result<()> {
        let folder = std::env::current_dir()?;
        write(folder.join("report_rev1.0.0_20260210.docx"), "a")?;
        write(folder.join("~$report_rev1.0.0_20260210.docx"), "lock")?;
        write(folder.join(".~lock.plan.odt#"), "lock")?;
        write(folder.join("scratch.tmp"), "tmp")?;
        write(folder.join("plan.odt"), "b")?;
        write(folder.join("notes.bak"), "c")?;
        create_dir(folder.join("archive"))?;
        create_dir(folder.join(META_DIR))?;
        write(folder.join(META_DIR).join("meta.toml"), "")?;

        let ignore = IgnoreSet::new(&folder, ["*.bak"])?;
        let result = safe_list_files(&folder, &ignore)?;
        let expect = vec![
            "plan.odt".to_string(),
            "report_rev1.0.0_20260210.docx".to_string(),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[sealed_test]
    fn list_missing_folder_fails() -> anyhow::Result<()> {
        let folder = std::env::current_dir()?.join("gone");
        let ignore = IgnoreSet::new(&folder, Vec::<String>::new())?;
        assert!(matches!(
            safe_list_files(&folder, &ignore),
            Err(ListingError::ReadDir { .. })
        ));

        Ok(())
    }

    #[test]
    fn metadata_directory_always_ignored() -> anyhow::Result<()> {
        let ignore = IgnoreSet::new("/docs", Vec::<String>::new())?;
        assert!(ignore.is_ignored("/docs/.libra/meta.toml", false));
        assert!(ignore.is_ignored("/docs/~$plan.docx", false));
        assert!(!ignore.is_ignored("/docs/plan.docx", false));
        assert!(!ignore.is_ignored("/docs/archive/.libra.docx", false));

        Ok(())
    }

    #[sealed_test]
    fn list_folder_below_metadata_named_directory() -> anyhow::Result<()> {
        let folder = std::env::current_dir()?.join(META_DIR).join("docs");
        mkdirp::mkdirp(folder.join(META_DIR))?;
        write(folder.join("a_rev1.0.0_20260210.docx"), "a")?;
        write(folder.join(META_DIR).join("meta.toml"), "")?;

        let ignore = IgnoreSet::new(&folder, Vec::<String>::new())?;
        let result = safe_list_files(&folder, &ignore)?;
        assert_eq!(result, vec!["a_rev1.0.0_20260210.docx".to_string()]);
        assert!(ignore.is_ignored(folder.join(META_DIR).join("meta.toml"), false));

        Ok(())
    }
}
