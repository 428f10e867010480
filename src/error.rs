//! Engine error taxonomy.
//!
//! Repository-scoped errors (`Sync`, `Integrity`, `Correlation`) are caught at
//! the orchestrator boundary and recorded in the run summary. `Config` and
//! `Persistence` abort the whole run: one means nothing can be attempted, the
//! other that silently dropping already-extracted data is worse than failing
//! loudly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid run configuration. Nothing is attempted.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// Clone/fetch/auth failure for one repository.
    #[error("sync failed for {repo}: {reason}")]
    Sync { repo: String, reason: String },

    /// Local mirror failed its integrity check and the forced re-clone also failed.
    #[error("mirror integrity unrecoverable for {repo}: {reason}")]
    Integrity { repo: String, reason: String },

    /// Remote PR lookup failure. Recovered by downgrading the affected record.
    #[error("PR lookup failed for {repo}#{number}: {reason}")]
    Correlation { repo: String, number: u64, reason: String },

    /// Output dataset write failure. Fatal for the run.
    #[error("dataset write failed: {0}")]
    Persistence(#[from] rusqlite::Error),
}

impl EngineError {
    pub fn sync(repo: impl Into<String>, err: impl std::fmt::Display) -> Self {
        EngineError::Sync { repo: repo.into(), reason: err.to_string() }
    }

    /// True when the orchestrator must abort the run instead of isolating
    /// the failure to one repository.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Persistence(_) | EngineError::Config { .. })
    }
}
