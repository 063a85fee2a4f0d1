//! Throwaway copy of the contract project that migrations run against
//!
//! Patching happens on the copy, so the installed source tree stays pristine
//! and every deploy starts from the same templates.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{Error, Result};

/// Entries never copied into the staging dir
const SKIPPED: &[&str] = &["node_modules", "build", ".git"];

/// A staged copy of a contract project, removed on drop
#[derive(Debug)]
pub struct StagedProject {
    dir: TempDir,
}

impl StagedProject {
    /// Copy `source` into a fresh temporary directory
    pub fn stage(source: &Path) -> Result<Self> {
        if !source.is_dir() {
            return Err(Error::missing(
                format!("contract source directory {}", source.display()),
                "Re-run the node setup step of the installer.",
            ));
        }

        let dir = tempfile::Builder::new()
            .prefix("nodekit-client-")
            .tempdir()?;
        let copied = copy_tree(source, dir.path())?;

        debug!(
            source = %source.display(),
            staging = %dir.path().display(),
            files = copied,
            "staged contract project"
        );
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.dir.path().join(path)
    }

    /// Keep the directory on disk and return its path
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

impl AsRef<Path> for StagedProject {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

/// Recursively copy `from` into `to`, returning the number of files copied
fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    std::fs::create_dir_all(to)?;
    let mut copied = 0;

    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let name = entry.file_name();
        if SKIPPED.iter().any(|s| name == *s) {
            continue;
        }

        let path = entry.path();
        let target = to.join(&name);
        if path.is_dir() {
            copied += copy_tree(&path, &target)?;
        } else {
            std::fs::copy(&path, &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}
