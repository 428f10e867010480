//! Run summary rendering and JSONL export of the dataset.

use crate::domain::{CommitRecord, PullRequestRecord, RepoOutcome, RunSummary};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

pub fn render_summary(summary: &RunSummary) -> String {
    let mut lines = Vec::with_capacity(summary.repos.len() + 1);
    for report in &summary.repos {
        let status = match report.outcome {
            RepoOutcome::Success => "success",
            RepoOutcome::Partial => "partial",
            RepoOutcome::Failed => "failed",
        };
        let detail = match &report.error {
            Some(error) => error.clone(),
            None => format!("{} commits, {} PRs", report.commits_added, report.pulls_added),
        };
        lines.push(format!("{:<40} {:<8} {}", report.repo, status, detail));
    }

    let successes = summary
        .repos
        .iter()
        .filter(|r| r.outcome == RepoOutcome::Success)
        .count();
    let partials = summary
        .repos
        .iter()
        .filter(|r| r.outcome == RepoOutcome::Partial)
        .count();
    lines.push(format!(
        "{} repositories: {} success, {} partial, {} failed; {} commits, {} PRs added",
        summary.repos.len(),
        successes,
        partials,
        summary.failed_count(),
        summary.commits_added(),
        summary.pulls_added(),
    ));
    format!("{}\n", lines.join("\n"))
}

/// One JSON object per commit row, keys in alphabetical order for stable diffs.
pub fn render_commits_jsonl(commits: &[CommitRecord]) -> String {
    let mut lines = Vec::with_capacity(commits.len());
    for commit in commits {
        let mut branches: Vec<&str> = commit.branches.iter().map(String::as_str).collect();
        branches.sort_unstable();

        let mut entry: BTreeMap<&str, Value> = BTreeMap::new();
        entry.insert("additions", Value::Number(commit.additions.into()));
        entry.insert(
            "branches",
            Value::Array(branches.iter().map(|b| Value::String((*b).to_string())).collect()),
        );
        entry.insert("author", Value::String(commit.author.clone()));
        entry.insert("committed_at", Value::String(fmt_ts(commit.committed_at)));
        entry.insert("deletions", Value::Number(commit.deletions.into()));
        entry.insert("on_main_branch", Value::Bool(commit.on_main_branch));
        entry.insert("repo", Value::String(commit.repo.clone()));
        entry.insert("sha", Value::String(commit.sha.clone()));

        if let Ok(line) = serde_json::to_string(&entry) {
            lines.push(line);
        }
    }
    join_jsonl(lines)
}

/// One JSON object per pull request row.
pub fn render_pulls_jsonl(pulls: &[PullRequestRecord]) -> String {
    let mut lines = Vec::with_capacity(pulls.len());
    for pull in pulls {
        let mut entry: BTreeMap<&str, Value> = BTreeMap::new();
        entry.insert("additions", Value::Number(pull.additions.into()));
        entry.insert("author", Value::String(pull.author.clone()));
        entry.insert("base_branch", Value::String(pull.base_branch.clone()));
        entry.insert(
            "merged_at",
            match pull.merged_at {
                Some(ts) => Value::String(fmt_ts(ts)),
                None => Value::Null,
            },
        );
        entry.insert("number", Value::Number(pull.number.into()));
        entry.insert("repo", Value::String(pull.repo.clone()));
        entry.insert("size", Value::Number(pull.size().into()));

        if let Ok(line) = serde_json::to_string(&entry) {
            lines.push(line);
        }
    }
    join_jsonl(lines)
}

fn join_jsonl(lines: Vec<String>) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n"))
    }
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RepoReport;
    use chrono::TimeZone;

    #[test]
    fn test_render_summary_includes_failures() {
        let summary = RunSummary {
            repos: vec![
                RepoReport {
                    repo: "acme/widgets".into(),
                    outcome: RepoOutcome::Success,
                    commits_added: 5,
                    pulls_added: 2,
                    error: None,
                },
                RepoReport::failed("acme/bad-creds", "sync failed: authentication required"),
            ],
        };

        let rendered = render_summary(&summary);
        assert!(rendered.contains("acme/widgets"));
        assert!(rendered.contains("success"));
        assert!(rendered.contains("acme/bad-creds"));
        assert!(rendered.contains("failed"));
        assert!(rendered.contains("1 failed"));
    }

    #[test]
    fn test_commits_jsonl_is_sorted_and_terminated() {
        let commits = vec![CommitRecord {
            sha: "abc".into(),
            repo: "acme/widgets".into(),
            author: "jane".into(),
            committed_at: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
            additions: 1,
            deletions: 2,
            branches: vec!["main".into(), "dev".into()],
            on_main_branch: true,
        }];

        let jsonl = render_commits_jsonl(&commits);
        assert!(jsonl.ends_with('\n'));
        let parsed: serde_json::Value =
            serde_json::from_str(jsonl.trim_end()).expect("valid json");
        assert_eq!(parsed["sha"], "abc");
        assert_eq!(parsed["branches"][0], "dev", "branches are sorted");
    }

    #[test]
    fn test_pulls_jsonl_null_merged_at() {
        let pulls = vec![PullRequestRecord {
            number: 3,
            repo: "acme/widgets".into(),
            author: "jane".into(),
            merged_at: None,
            base_branch: "main".into(),
            additions: 10,
            deletions: 5,
        }];

        let jsonl = render_pulls_jsonl(&pulls);
        let parsed: serde_json::Value =
            serde_json::from_str(jsonl.trim_end()).expect("valid json");
        assert!(parsed["merged_at"].is_null());
        assert_eq!(parsed["size"], 15);
    }

    #[test]
    fn test_empty_rows_render_empty_string() {
        assert_eq!(render_commits_jsonl(&[]), "");
        assert_eq!(render_pulls_jsonl(&[]), "");
    }
}
