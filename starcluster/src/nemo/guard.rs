//! Scoped intermediate files
//!
//! Every NEMO call leaves a text file next to the snapshot. An
//! [`ArtifactGuard`] owns such a path for the duration of one operation: any
//! stale file is removed when the guard is acquired and the file is removed
//! again when the guard goes out of scope, whichever way the operation ends.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

#[derive(Debug)]
pub struct ArtifactGuard {
    path: PathBuf,
    keep: bool, // leave the file on disk when the guard is dropped
}

impl ArtifactGuard {
    pub fn acquire(path: impl Into<PathBuf>, keep: bool) -> Result<Self> {
        let path = path.into();
        if remove_if_exists(&path)? {
            debug!("removed stale artifact {}", path.display());
        }
        Ok(Self { path, keep })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keeps_file(&self) -> bool {
        self.keep
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match remove_if_exists(&self.path) {
            Ok(true) => debug!("removed artifact {}", self.path.display()),
            Ok(false) => {}
            Err(e) => warn!("could not remove {}: {e}", self.path.display()),
        }
    }
}

/// `Ok(true)` when a file was actually deleted
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// `<dir>/<stem><suffix>` for an input snapshot, with `.nemo` dropped from the stem
pub fn artifact_path(snapshot: &Path, suffix: &str) -> PathBuf {
    let name = snapshot
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".nemo").unwrap_or(&name);
    snapshot.with_file_name(format!("{stem}{suffix}"))
}
