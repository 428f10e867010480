//! SQLite schema for the output dataset.

use anyhow::{bail, Result};
use rusqlite::Connection;
use std::path::Path;

pub const SCHEMA_VERSION: i64 = 1;

pub fn open_or_create(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS commits (
            repo TEXT NOT NULL,
            sha TEXT NOT NULL,
            author TEXT NOT NULL,
            committed_at TEXT NOT NULL,
            additions INTEGER NOT NULL,
            deletions INTEGER NOT NULL,
            branches TEXT NOT NULL,
            on_main_branch INTEGER NOT NULL,
            PRIMARY KEY (repo, sha)
        );

        CREATE TABLE IF NOT EXISTS pull_requests (
            repo TEXT NOT NULL,
            number INTEGER NOT NULL,
            author TEXT NOT NULL,
            merged_at TEXT,
            base_branch TEXT NOT NULL,
            additions INTEGER NOT NULL,
            deletions INTEGER NOT NULL,
            PRIMARY KEY (repo, number)
        );

        CREATE TABLE IF NOT EXISTS checkpoints (
            repo TEXT PRIMARY KEY,
            last_sha TEXT NOT NULL,
            last_commit_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_commits_committed_at
            ON commits(repo, committed_at);
        ",
    )?;

    let current: Option<i64> =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0)).ok();
    match current {
        None => {
            conn.execute("INSERT INTO schema_version(version) VALUES(?1)", [SCHEMA_VERSION])?;
        }
        Some(version) if version == SCHEMA_VERSION => {}
        Some(version) => {
            bail!("Unsupported dataset schema version {version}; expected {SCHEMA_VERSION}");
        }
    }

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_or_create_initializes_version() {
        let tmp = TempDir::new().expect("tmp");
        let conn = open_or_create(&tmp.path().join("pulse.db")).expect("open");
        let version: i64 =
            conn.query_row("SELECT version FROM schema_version", [], |r| r.get(0)).expect("row");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("pulse.db");
        drop(open_or_create(&path).expect("first open"));
        drop(open_or_create(&path).expect("second open"));
    }

    #[test]
    fn test_future_schema_version_rejected() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("pulse.db");
        {
            let conn = open_or_create(&path).expect("open");
            conn.execute("UPDATE schema_version SET version = 99", []).expect("bump");
        }
        assert!(open_or_create(&path).is_err());
    }
}
