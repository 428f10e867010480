//! Dedup and persistence for extracted record batches.
//!
//! Rows and the checkpoint advance are written in a single transaction, with
//! the checkpoint update last. A batch therefore lands whole or not at all,
//! and a checkpoint never exists without the rows it covers.

use crate::domain::{Checkpoint, CommitRecord, PersistMode, PullRequestRecord, RecordBatch};
use crate::error::EngineError;
use crate::store::schema;
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Rows actually added by one batch (conflicting keys are ignored).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub commits_added: usize,
    pub pulls_added: usize,
}

/// Handle to the output dataset. Single-writer: the connection is serialized
/// behind a mutex so the cross-repository worker pool shares one handle.
pub struct Dataset {
    conn: Mutex<Connection>,
}

impl Dataset {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = schema::open_or_create(path)?;
        Ok(Dataset { conn: Mutex::new(conn) })
    }

    /// Merge a batch into the dataset.
    ///
    /// Dedup rule: first-seen row wins on identity-key conflict
    /// (`(repo, sha)` for commits, `(repo, number)` for pull requests).
    /// The checkpoint only ever moves forward.
    pub fn apply_batch(
        &self,
        batch: &RecordBatch,
        mode: PersistMode,
    ) -> Result<BatchOutcome, EngineError> {
        let slug = batch.repo.slug();
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        if mode == PersistMode::Replace {
            tx.execute("DELETE FROM commits WHERE repo = ?1", [&slug])?;
            tx.execute("DELETE FROM pull_requests WHERE repo = ?1", [&slug])?;
            tx.execute("DELETE FROM checkpoints WHERE repo = ?1", [&slug])?;
        }

        let mut outcome = BatchOutcome::default();
        for commit in &batch.commits {
            let branches =
                serde_json::to_string(&commit.branches).unwrap_or_else(|_| "[]".to_string());
            outcome.commits_added += tx.execute(
                "INSERT OR IGNORE INTO commits
                    (repo, sha, author, committed_at, additions, deletions, branches, on_main_branch)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    slug,
                    commit.sha,
                    commit.author,
                    fmt_ts(commit.committed_at),
                    commit.additions as i64,
                    commit.deletions as i64,
                    branches,
                    commit.on_main_branch as i64,
                ],
            )?;
        }

        for pull in &batch.pulls {
            outcome.pulls_added += tx.execute(
                "INSERT OR IGNORE INTO pull_requests
                    (repo, number, author, merged_at, base_branch, additions, deletions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    slug,
                    pull.number as i64,
                    pull.author,
                    pull.merged_at.map(fmt_ts),
                    pull.base_branch,
                    pull.additions as i64,
                    pull.deletions as i64,
                ],
            )?;
        }

        // Checkpoint last, in the same transaction. The WHERE guard keeps the
        // stored checkpoint monotonic across overlapping re-extractions.
        if let Some(checkpoint) = &batch.checkpoint {
            tx.execute(
                "INSERT INTO checkpoints (repo, last_sha, last_commit_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(repo) DO UPDATE SET
                    last_sha = excluded.last_sha,
                    last_commit_at = excluded.last_commit_at
                 WHERE excluded.last_commit_at >= checkpoints.last_commit_at",
                params![slug, checkpoint.last_sha, fmt_ts(checkpoint.last_commit_at)],
            )?;
        }

        tx.commit()?;
        Ok(outcome)
    }

    pub fn checkpoint(&self, slug: &str) -> Result<Option<Checkpoint>, EngineError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT last_sha, last_commit_at FROM checkpoints WHERE repo = ?1",
                [slug],
                |row| {
                    let sha: String = row.get(0)?;
                    let ts: String = row.get(1)?;
                    Ok((sha, ts))
                },
            )
            .optional()?;

        Ok(row.and_then(|(last_sha, ts)| {
            parse_ts(&ts).map(|last_commit_at| Checkpoint { last_sha, last_commit_at })
        }))
    }

    /// All checkpoints, ordered by repository slug.
    pub fn checkpoints(&self) -> Result<Vec<(String, Checkpoint)>, EngineError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT repo, last_sha, last_commit_at FROM checkpoints ORDER BY repo",
        )?;
        let rows = stmt.query_map([], |row| {
            let repo: String = row.get(0)?;
            let sha: String = row.get(1)?;
            let ts: String = row.get(2)?;
            Ok((repo, sha, ts))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (repo, last_sha, ts) = row?;
            if let Some(last_commit_at) = parse_ts(&ts) {
                out.push((repo, Checkpoint { last_sha, last_commit_at }));
            }
        }
        Ok(out)
    }

    pub fn commit_count(&self, slug: &str) -> Result<usize, EngineError> {
        let conn = self.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM commits WHERE repo = ?1", [slug], |r| r.get(0))?;
        Ok(count as usize)
    }

    pub fn pull_count(&self, slug: &str) -> Result<usize, EngineError> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pull_requests WHERE repo = ?1",
            [slug],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    /// All commit rows, ordered by (repo, committed_at, sha) for stable export.
    pub fn commits(&self) -> Result<Vec<CommitRecord>, EngineError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT repo, sha, author, committed_at, additions, deletions, branches, on_main_branch
             FROM commits ORDER BY repo, committed_at, sha",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (repo, sha, author, ts, additions, deletions, branches, on_main) = row?;
            let Some(committed_at) = parse_ts(&ts) else { continue };
            out.push(CommitRecord {
                sha,
                repo,
                author,
                committed_at,
                additions: additions.max(0) as u64,
                deletions: deletions.max(0) as u64,
                branches: serde_json::from_str(&branches).unwrap_or_default(),
                on_main_branch: on_main != 0,
            });
        }
        Ok(out)
    }

    /// All pull request rows, ordered by (repo, number).
    pub fn pulls(&self) -> Result<Vec<PullRequestRecord>, EngineError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT repo, number, author, merged_at, base_branch, additions, deletions
             FROM pull_requests ORDER BY repo, number",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (repo, number, author, merged_at, base_branch, additions, deletions) = row?;
            out.push(PullRequestRecord {
                number: number.max(0) as u64,
                repo,
                author,
                merged_at: merged_at.as_deref().and_then(parse_ts),
                base_branch,
                additions: additions.max(0) as u64,
                deletions: deletions.max(0) as u64,
            });
        }
        Ok(out)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// RFC 3339 with UTC `Z` suffix and second precision; lexicographic order
/// matches chronological order, which the checkpoint guard relies on.
fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}
