//! Merge/PR correlation.
//!
//! Classification is a pure function over parent count and commit message,
//! unit-testable without any git plumbing. Remote lookups are memoized per
//! distinct PR number for the run, so API call volume scales with discovered
//! PRs rather than with commit count. A lookup failure downgrades the record
//! (the commit row is kept, the PR row is skipped); it never aborts the
//! repository's extraction.

pub mod github;

use crate::domain::{MergeClass, PullRequestRecord, TrackedRepo};
use crate::error::EngineError;
use crate::extract::ExtractedCommit;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// `Merge pull request #123 from ...` (GitHub merge-commit subject).
static MERGE_SUBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Merge pull request #(\d+)\b").expect("valid regex"));

/// `Some change (#123)` squash-merge suffix on the subject line.
static SQUASH_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(#(\d+)\)\s*$").expect("valid regex"));

/// Classify one commit: not a merge, a merge with no PR reference, or a
/// merge tied to a PR number found in the message.
pub fn classify_merge(parent_count: usize, message: &str) -> MergeClass {
    let subject = message.lines().next().unwrap_or("");

    if let Some(caps) = MERGE_SUBJECT_RE.captures(subject) {
        if let Ok(number) = caps[1].parse() {
            return MergeClass::MergeWithPr(number);
        }
    }
    if let Some(caps) = SQUASH_SUFFIX_RE.captures(subject) {
        if let Ok(number) = caps[1].parse() {
            return MergeClass::MergeWithPr(number);
        }
    }
    if parent_count > 1 {
        return MergeClass::MergeNoPr;
    }
    MergeClass::NotAMerge
}

/// Remote PR metadata as returned by the lookup source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrInfo {
    pub author: String,
    pub merged_at: Option<DateTime<Utc>>,
    pub base_branch: String,
    pub additions: u64,
    pub deletions: u64,
}

/// PR metadata source. The production implementation is
/// [`github::GithubPrLookup`]; tests substitute counting mocks.
pub trait PrLookup: Sync {
    /// Fetch one PR. `Ok(None)` means the number does not exist remotely.
    fn lookup(&self, repo: &TrackedRepo, number: u64) -> Result<Option<PrInfo>, EngineError>;
}

#[derive(Debug, Default)]
pub struct CorrelationResult {
    pub pulls: Vec<PullRequestRecord>,
    /// Distinct PR numbers whose lookup failed and was downgraded.
    pub lookup_failures: usize,
}

/// Correlate a batch of extracted commits with remote PR metadata.
///
/// Issues exactly one lookup per distinct PR number discovered in the batch;
/// repeats (several commits referencing the same PR) and failed numbers are
/// served from the per-run memo.
pub fn correlate(
    repo: &TrackedRepo,
    commits: &[ExtractedCommit],
    lookup: &dyn PrLookup,
) -> CorrelationResult {
    let slug = repo.slug();
    let mut memo: HashMap<u64, Option<PrInfo>> = HashMap::new();
    let mut failures = 0usize;

    for commit in commits {
        let MergeClass::MergeWithPr(number) = classify_merge(commit.parent_count, &commit.message)
        else {
            continue;
        };
        if memo.contains_key(&number) {
            continue;
        }
        match lookup.lookup(repo, number) {
            Ok(info) => {
                memo.insert(number, info);
            }
            Err(e) => {
                tracing::warn!("downgrading {slug}#{number}: {e}");
                failures += 1;
                memo.insert(number, None);
            }
        }
    }

    let mut pulls: Vec<PullRequestRecord> = memo
        .into_iter()
        .filter_map(|(number, info)| {
            info.map(|info| PullRequestRecord {
                number,
                repo: slug.clone(),
                author: info.author,
                merged_at: info.merged_at,
                base_branch: info.base_branch,
                additions: info.additions,
                deletions: info.deletions,
            })
        })
        .collect();
    pulls.sort_by_key(|p| p.number);

    CorrelationResult { pulls, lookup_failures: failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CommitRecord;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn extracted(parent_count: usize, message: &str) -> ExtractedCommit {
        ExtractedCommit {
            record: CommitRecord {
                sha: format!("sha-{}", message.len()),
                repo: "acme/widgets".to_string(),
                author: "Jane <jane@example.com>".to_string(),
                committed_at: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
                additions: 1,
                deletions: 0,
                branches: vec!["main".to_string()],
                on_main_branch: true,
            },
            parent_count,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classify_plain_commit() {
        assert_eq!(classify_merge(1, "Fix typo in parser"), MergeClass::NotAMerge);
    }

    #[test]
    fn test_classify_merge_without_pr() {
        assert_eq!(classify_merge(2, "Merge branch 'hotfix' into main"), MergeClass::MergeNoPr);
    }

    #[test]
    fn test_classify_github_merge_commit() {
        assert_eq!(
            classify_merge(2, "Merge pull request #42 from acme/feature\n\ndetails"),
            MergeClass::MergeWithPr(42)
        );
    }

    #[test]
    fn test_classify_squash_merge_single_parent() {
        assert_eq!(
            classify_merge(1, "Add retry logic to sync (#117)"),
            MergeClass::MergeWithPr(117)
        );
    }

    #[test]
    fn test_classify_pr_reference_not_at_subject_end() {
        // The suffix pattern only matches at the end of the subject line.
        assert_eq!(classify_merge(1, "Revert (#9) because of regressions"), MergeClass::NotAMerge);
    }

    #[test]
    fn test_classify_pr_reference_in_body_ignored() {
        assert_eq!(classify_merge(1, "Fix crash\n\nFollows up on (#12)"), MergeClass::NotAMerge);
    }

    struct CountingLookup {
        calls: AtomicUsize,
        fail_on: Option<u64>,
    }

    impl PrLookup for CountingLookup {
        fn lookup(&self, _repo: &TrackedRepo, number: u64) -> Result<Option<PrInfo>, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(number) {
                return Err(EngineError::Correlation {
                    repo: "acme/widgets".to_string(),
                    number,
                    reason: "remote unavailable".to_string(),
                });
            }
            Ok(Some(PrInfo {
                author: "jane".to_string(),
                merged_at: None,
                base_branch: "main".to_string(),
                additions: 5,
                deletions: 1,
            }))
        }
    }

    #[test]
    fn test_one_lookup_per_distinct_pr_number() {
        let repo = TrackedRepo::new("acme", "widgets");
        let lookup = CountingLookup { calls: AtomicUsize::new(0), fail_on: None };

        // Five merge commits, two distinct PR numbers.
        let commits = vec![
            extracted(2, "Merge pull request #1 from acme/a"),
            extracted(2, "Merge pull request #1 from acme/a-retry"),
            extracted(1, "Squash work (#2)"),
            extracted(1, "More squash work (#2)"),
            extracted(2, "Merge pull request #1 from acme/a-again"),
        ];

        let result = correlate(&repo, &commits, &lookup);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2, "K distinct PRs -> K lookups");
        assert_eq!(result.pulls.len(), 2);
        assert_eq!(result.lookup_failures, 0);
    }

    #[test]
    fn test_non_merges_issue_no_lookups() {
        let repo = TrackedRepo::new("acme", "widgets");
        let lookup = CountingLookup { calls: AtomicUsize::new(0), fail_on: None };

        let commits =
            vec![extracted(1, "Fix typo"), extracted(2, "Merge branch 'dev' into main")];
        let result = correlate(&repo, &commits, &lookup);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert!(result.pulls.is_empty());
    }

    #[test]
    fn test_lookup_failure_downgrades_without_retry() {
        let repo = TrackedRepo::new("acme", "widgets");
        let lookup = CountingLookup { calls: AtomicUsize::new(0), fail_on: Some(7) };

        let commits = vec![
            extracted(2, "Merge pull request #7 from acme/x"),
            extracted(2, "Merge pull request #7 from acme/x-again"),
            extracted(2, "Merge pull request #8 from acme/y"),
        ];
        let result = correlate(&repo, &commits, &lookup);

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2, "failed number is not retried");
        assert_eq!(result.lookup_failures, 1);
        assert_eq!(result.pulls.len(), 1);
        assert_eq!(result.pulls[0].number, 8);
    }

    #[test]
    fn test_unknown_pr_number_is_silently_skipped() {
        struct NoneLookup;
        impl PrLookup for NoneLookup {
            fn lookup(
                &self,
                _repo: &TrackedRepo,
                _number: u64,
            ) -> Result<Option<PrInfo>, EngineError> {
                Ok(None)
            }
        }

        let repo = TrackedRepo::new("acme", "widgets");
        let commits = vec![extracted(2, "Merge pull request #99 from acme/z")];
        let result = correlate(&repo, &commits, &NoneLookup);
        assert!(result.pulls.is_empty());
        assert_eq!(result.lookup_failures, 0);
    }
}
