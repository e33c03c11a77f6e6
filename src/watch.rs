// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Folder watching.
//!
//! Saving a document in an office suite fires a burst of file events: lock
//! files appear, temporary copies get renamed, the lock disappears again.
//! The watcher debounces such bursts, drops events for ignored files, and
//! reports each affected folder once per burst.
//!
//! Reported folders arrive through a single channel. Consuming that channel
//! from one task is what keeps rescans of a folder from overlapping.

use crate::listing::IgnoreSet;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Folder under watch.
#[derive(Clone, Debug)]
pub struct WatchedFolder {
    folder: PathBuf,
    canonical: PathBuf,
    ignore: IgnoreSet,
}

impl WatchedFolder {
    /// Construct new watched folder.
    ///
    /// Symlinks are resolved, because some platforms only report events
    /// against the resolved path.
    pub fn new(folder: impl Into<PathBuf>, ignore: IgnoreSet) -> Self {
        let folder = folder.into();
        let canonical = folder.canonicalize().unwrap_or_else(|_| folder.clone());
        Self {
            folder,
            canonical,
            ignore,
        }
    }

    /// Folder as it was registered.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn is_affected_by(&self, path: &Path) -> bool {
        if path == self.canonical || path == self.folder {
            return true;
        }

        let parent = path.parent();
        let inside = parent == Some(self.canonical.as_path()) || parent == Some(self.folder.as_path());
        let Some(name) = path.file_name().filter(|_| inside) else {
            return false;
        };

        // INVARIANT: Match against the registered folder, whichever form the
        // event path arrived in.
        !self.ignore.is_ignored(self.folder.join(name), path.is_dir())
    }
}

/// Determine folders affected by a burst of changed paths.
///
/// Each affected folder is reported once, in order of first appearance.
pub fn affected_folders<'a>(
    watched: &'a [WatchedFolder],
    paths: impl IntoIterator<Item = &'a Path>,
) -> Vec<PathBuf> {
    let mut affected: Vec<PathBuf> = Vec::new();
    for path in paths {
        for entry in watched.iter().filter(|entry| entry.is_affected_by(path)) {
            if !affected.iter().any(|folder| folder == entry.folder()) {
                affected.push(entry.folder.clone());
            }
        }
    }

    affected
}

/// Debounced watcher over a set of folders.
pub struct FolderWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    event_rx: mpsc::UnboundedReceiver<PathBuf>,
}

impl FolderWatcher {
    /// Start watching folders.
    ///
    /// Folders that do not exist cannot be watched, and are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// - Return [`WatchError::Notify`] if the platform watcher fails.
    pub fn new(watched: Vec<WatchedFolder>, debounce: Duration) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let targets = watched.clone();

        let mut debouncer = new_debouncer(
            debounce,
            move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    let paths = events.iter().map(|event| event.path.as_path());
                    for folder in affected_folders(&targets, paths) {
                        debug!("change in {:?}", folder.display());
                        if event_tx.send(folder).is_err() {
                            return;
                        }
                    }
                }
                Err(error) => error!("file watcher error: {error}"),
            },
        )?;

        for entry in &watched {
            if !entry.folder.is_dir() {
                warn!("cannot watch missing folder {:?}", entry.folder.display());
                continue;
            }

            debouncer
                .watcher()
                .watch(&entry.canonical, RecursiveMode::NonRecursive)?;
        }

        Ok(Self {
            _debouncer: debouncer,
            event_rx,
        })
    }

    /// Wait for next changed folder.
    ///
    /// Returns `None` once the watcher has shut down.
    pub async fn changed(&mut self) -> Option<PathBuf> {
        self.event_rx.recv().await
    }
}

/// Folder watching error types.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Platform file watcher fails.
    #[error(transparent)]
    Notify(#[from] notify::Error),
}

/// Friendly result alias :3
pub type Result<T, E = WatchError> = std::result::Result<T, E>;
