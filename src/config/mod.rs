//! Configuration loading
//!
//! Handles loading from config files and CLI arguments with proper
//! precedence (CLI > File > Defaults).

pub mod loader;

pub use loader::load_config;

use crate::domain::{PersistMode, TrackedRepo};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_TRACKED_BRANCHES: [&str; 4] = ["main", "master", "dev", "develop"];

/// A config entry for one repository: either an `org/name` slug string or a
/// table with an explicit clone URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepoEntry {
    Slug(String),
    Full { slug: String, url: Option<String> },
}

impl RepoEntry {
    pub fn resolve(&self) -> Result<TrackedRepo> {
        match self {
            RepoEntry::Slug(slug) => TrackedRepo::parse(slug),
            RepoEntry::Full { slug, url } => {
                let mut repo = TrackedRepo::parse(slug)?;
                repo.url = url.clone();
                Ok(repo)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Repositories to track, as `org/name` slugs (optionally with a URL).
    pub repos: Vec<RepoEntry>,

    /// Root of the local cache (mirrors + dataset). Defaults to `.repo-pulse`
    /// under the current directory when unset.
    pub cache_dir: Option<PathBuf>,

    /// Branches whose membership marks a commit as on a main line.
    pub tracked_branches: Vec<String>,

    /// Extraction window in days for repositories with no checkpoint.
    pub since_days: u32,

    /// Worker pool width for cross-repository parallelism. 1 = sequential.
    pub jobs: usize,

    /// Optional clone depth bound for very large repositories.
    pub depth: Option<u32>,

    pub mode: PersistMode,

    /// Environment variable holding the remote API token.
    pub token_env: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            repos: Vec::new(),
            cache_dir: None,
            tracked_branches: DEFAULT_TRACKED_BRANCHES.iter().map(|s| s.to_string()).collect(),
            since_days: 7,
            jobs: 1,
            depth: None,
            mode: PersistMode::Incremental,
            token_env: "GITHUB_TOKEN".to_string(),
        }
    }
}

impl Config {
    /// Resolve repo entries into tracked repositories, rejecting bad slugs.
    pub fn tracked_repos(&self) -> Result<Vec<TrackedRepo>> {
        self.repos.iter().map(RepoEntry::resolve).collect()
    }

    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| PathBuf::from(".repo-pulse"))
    }

    /// Token read from the configured environment variable, if present.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }
}
