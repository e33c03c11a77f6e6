// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

mod integration;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use libra::{listing::IgnoreSet, track::Provenance};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

/// Watched folder laid out on disk for a test.
pub(crate) struct FolderFixture {
    root: PathBuf,
}

impl FolderFixture {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let root = path.into();
        mkdirp::mkdirp(&root)?;

        Ok(Self { root })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.root
    }

    pub(crate) fn write(&self, name: impl AsRef<Path>, contents: impl AsRef<str>) -> Result<PathBuf> {
        let path = self.root.join(name);
        write(&path, contents.as_ref())?;

        Ok(path)
    }

    pub(crate) fn read(&self, name: impl AsRef<Path>) -> Result<String> {
        Ok(read_to_string(self.root.join(name))?)
    }

    pub(crate) fn exists(&self, name: impl AsRef<Path>) -> bool {
        self.root.join(name).exists()
    }

    /// Built-in ignore rules of the folder.
    pub(crate) fn ignore(&self) -> Result<IgnoreSet> {
        Ok(IgnoreSet::new(&self.root, Vec::<String>::new())?)
    }
}

/// Provenance of an edit by alice on given day of February 2026.
pub(crate) fn edit_on(day: u32, memo: &str) -> Provenance {
    Provenance::new("alice", memo, at(2026, 2, day))
}

fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(9, 30, 0))
        .unwrap()
}
