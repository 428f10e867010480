//! Core data model for the extraction engine.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One remote repository tracked by the engine.
///
/// `url` overrides the derived GitHub clone URL; used for mirrors of
/// repositories hosted elsewhere (and by tests, which clone from local paths).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackedRepo {
    pub org: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl TrackedRepo {
    pub fn new(org: impl Into<String>, name: impl Into<String>) -> Self {
        TrackedRepo { org: org.into(), name: name.into(), url: None }
    }

    /// Parse an `org/name` slug.
    pub fn parse(slug: &str) -> Result<Self> {
        let trimmed = slug.trim();
        match trimmed.split_once('/') {
            Some((org, name)) if !org.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(TrackedRepo::new(org, name))
            }
            _ => bail!("Invalid repository slug '{slug}'; expected org/name"),
        }
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.org, self.name)
    }

    /// Clone URL: explicit override, or canonical GitHub HTTPS `.git` form.
    pub fn clone_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("https://github.com/{}/{}.git", self.org, self.name),
        }
    }
}

/// Marker of the last successfully persisted commit for one repository.
/// Advanced only inside the same transaction that persists the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub last_sha: String,
    pub last_commit_at: DateTime<Utc>,
}

/// One extracted commit row. `sha` is unique per repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub sha: String,
    pub repo: String,
    pub author: String,
    pub committed_at: DateTime<Utc>,
    pub additions: u64,
    pub deletions: u64,
    /// Branches containing this commit at extraction time.
    pub branches: Vec<String>,
    pub on_main_branch: bool,
}

/// One merged pull request row. `(number, repo)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestRecord {
    pub number: u64,
    pub repo: String,
    pub author: String,
    pub merged_at: Option<DateTime<Utc>>,
    pub base_branch: String,
    pub additions: u64,
    pub deletions: u64,
}

impl PullRequestRecord {
    /// Total line churn, the size measure used by downstream reports.
    pub fn size(&self) -> u64 {
        self.additions + self.deletions
    }
}

/// Classification of one commit by the correlator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeClass {
    NotAMerge,
    MergeNoPr,
    MergeWithPr(u64),
}

/// How a batch is merged into the persisted dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    /// Merge the batch into existing rows, first-seen wins on key conflict.
    Incremental,
    /// Discard the repository's existing rows, keep only the new batch.
    Replace,
}

impl Default for PersistMode {
    fn default() -> Self {
        PersistMode::Incremental
    }
}

/// Everything extracted from one repository in one run, persisted atomically.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub repo: TrackedRepo,
    pub commits: Vec<CommitRecord>,
    pub pulls: Vec<PullRequestRecord>,
    /// Candidate checkpoint: the newest commit in the batch, if any.
    pub checkpoint: Option<Checkpoint>,
}

impl RecordBatch {
    pub fn empty(repo: TrackedRepo) -> Self {
        RecordBatch { repo, commits: Vec::new(), pulls: Vec::new(), checkpoint: None }
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty() && self.pulls.is_empty()
    }
}

/// Per-repository outcome reported in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoOutcome {
    Success,
    /// Extraction persisted, but some PR correlations were downgraded.
    Partial,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoReport {
    pub repo: String,
    pub outcome: RepoOutcome,
    pub commits_added: usize,
    pub pulls_added: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RepoReport {
    pub fn failed(repo: impl Into<String>, error: impl Into<String>) -> Self {
        RepoReport {
            repo: repo.into(),
            outcome: RepoOutcome::Failed,
            commits_added: 0,
            pulls_added: 0,
            error: Some(error.into()),
        }
    }
}

/// Always emitted, even when some repositories fail.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub repos: Vec<RepoReport>,
}

impl RunSummary {
    pub fn commits_added(&self) -> usize {
        self.repos.iter().map(|r| r.commits_added).sum()
    }

    pub fn pulls_added(&self) -> usize {
        self.repos.iter().map(|r| r.pulls_added).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.repos.iter().filter(|r| r.outcome == RepoOutcome::Failed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slug() {
        let repo = TrackedRepo::parse("acme/widgets").unwrap();
        assert_eq!(repo.org, "acme");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.slug(), "acme/widgets");
    }

    #[test]
    fn test_parse_slug_rejects_malformed() {
        assert!(TrackedRepo::parse("acme").is_err());
        assert!(TrackedRepo::parse("/widgets").is_err());
        assert!(TrackedRepo::parse("acme/").is_err());
        assert!(TrackedRepo::parse("a/b/c").is_err());
    }

    #[test]
    fn test_clone_url_defaults_to_github() {
        let repo = TrackedRepo::parse("acme/widgets").unwrap();
        assert_eq!(repo.clone_url(), "https://github.com/acme/widgets.git");
    }

    #[test]
    fn test_clone_url_honors_override() {
        let mut repo = TrackedRepo::parse("acme/widgets").unwrap();
        repo.url = Some("file:///tmp/widgets".to_string());
        assert_eq!(repo.clone_url(), "file:///tmp/widgets");
    }

    #[test]
    fn test_summary_totals() {
        let summary = RunSummary {
            repos: vec![
                RepoReport {
                    repo: "a/x".into(),
                    outcome: RepoOutcome::Success,
                    commits_added: 3,
                    pulls_added: 1,
                    error: None,
                },
                RepoReport::failed("a/y", "boom"),
            ],
        };
        assert_eq!(summary.commits_added(), 3);
        assert_eq!(summary.pulls_added(), 1);
        assert_eq!(summary.failed_count(), 1);
    }
}
