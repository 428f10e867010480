//! Local cache store: mirror directories and the output dataset.
//!
//! The store root is injected (never a hardcoded global path) so tests can
//! substitute a temporary directory. Layout:
//!
//! ```text
//! <root>/mirrors/<org>/<name>/   bare mirror per tracked repository
//! <root>/pulse.db                SQLite dataset (commits, pull_requests, checkpoints)
//! ```

pub mod schema;

use crate::domain::TrackedRepo;
use crate::persist::Dataset;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CacheStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mirror_path(&self, repo: &TrackedRepo) -> PathBuf {
        self.root.join("mirrors").join(&repo.org).join(&repo.name)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.root.join("pulse.db")
    }

    /// Open (creating if needed) the output dataset under the store root.
    pub fn open_dataset(&self) -> Result<Dataset> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed creating cache root: {}", self.root.display()))?;
        Dataset::open(&self.dataset_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mirror_path_layout() {
        let tmp = TempDir::new().expect("tmp");
        let store = CacheStore::new(tmp.path());
        let repo = TrackedRepo::new("acme", "widgets");
        assert_eq!(store.mirror_path(&repo), tmp.path().join("mirrors/acme/widgets"));
    }

    #[test]
    fn test_open_dataset_creates_root() {
        let tmp = TempDir::new().expect("tmp");
        let store = CacheStore::new(tmp.path().join("nested/cache"));
        store.open_dataset().expect("dataset");
        assert!(store.dataset_path().exists());
    }
}
