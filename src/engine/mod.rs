//! Orchestrator: drives sync → extract → correlate → persist per repository.
//!
//! Repositories are independent units: one failing at any stage never stops
//! the others (bulkhead policy). Only a dataset write failure aborts the run.
//! Cross-repository work may run on a bounded rayon pool; the stages within
//! one repository are strictly sequential.

use crate::config::Config;
use crate::correlate::{correlate, PrLookup};
use crate::domain::{PersistMode, RecordBatch, RepoOutcome, RepoReport, RunSummary, TrackedRepo};
use crate::error::EngineError;
use crate::extract::{checkpoint_candidate, extract_commits, ExtractOptions};
use crate::identity::Canonicalizer;
use crate::persist::Dataset;
use crate::store::CacheStore;
use crate::sync::{sync_mirror, SyncAuth};
use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;

/// Run one extraction pass over every configured repository.
///
/// The returned summary covers every repository that was attempted. An `Err`
/// means the run was aborted by a persistence failure.
pub fn run(
    config: &Config,
    store: &CacheStore,
    dataset: &Dataset,
    lookup: &dyn PrLookup,
    canonicalize: &Canonicalizer,
) -> Result<RunSummary, EngineError> {
    // Config-level problem, not repository-scoped: abort before attempting
    // anything rather than report an empty run.
    let repos = config
        .tracked_repos()
        .map_err(|e| EngineError::Config { reason: e.to_string() })?;
    let since = Utc::now() - Duration::days(i64::from(config.since_days));
    let auth = SyncAuth { token: config.token() };

    let results: Vec<Result<RepoReport, EngineError>> = if config.jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .build()
            .map_err(|e| EngineError::Sync {
                repo: "<pool>".to_string(),
                reason: format!("cannot build worker pool: {e}"),
            })?;
        pool.install(|| {
            repos
                .par_iter()
                .map(|repo| process_repo(config, store, dataset, lookup, canonicalize, repo, since, &auth))
                .collect()
        })
    } else {
        repos
            .iter()
            .map(|repo| process_repo(config, store, dataset, lookup, canonicalize, repo, since, &auth))
            .collect()
    };

    let mut summary = RunSummary::default();
    for result in results {
        summary.repos.push(result?);
    }
    Ok(summary)
}

/// Sync → extract → correlate → persist for one repository.
///
/// Returns `Err` only for fatal (run-aborting) failures; repository-scoped
/// failures come back as a `Failed` report.
#[allow(clippy::too_many_arguments)]
fn process_repo(
    config: &Config,
    store: &CacheStore,
    dataset: &Dataset,
    lookup: &dyn PrLookup,
    canonicalize: &Canonicalizer,
    repo: &TrackedRepo,
    since: DateTime<Utc>,
    auth: &SyncAuth,
) -> Result<RepoReport, EngineError> {
    let slug = repo.slug();

    let mirror = match sync_mirror(store, repo, auth, config.depth) {
        Ok(path) => path,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::warn!("skipping {slug}: {e}");
            return Ok(RepoReport::failed(slug, e.to_string()));
        }
    };

    // A replace pass rebuilds the whole window; the stored checkpoint only
    // bounds incremental runs.
    let checkpoint = if config.mode == PersistMode::Replace {
        None
    } else {
        dataset.checkpoint(&slug)?
    };
    let options = ExtractOptions {
        since,
        checkpoint,
        tracked_branches: config.tracked_branches.clone(),
    };

    let commits = match extract_commits(&mirror, &slug, &options) {
        Ok(commits) => commits,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::warn!("extraction failed for {slug}: {e}");
            return Ok(RepoReport::failed(slug, e.to_string()));
        }
    };
    tracing::debug!("extracted {} commits from {slug}", commits.len());

    let correlation = correlate(repo, &commits, lookup);

    let mut batch = RecordBatch {
        repo: repo.clone(),
        checkpoint: checkpoint_candidate(&commits),
        commits: commits.into_iter().map(|c| c.record).collect(),
        pulls: correlation.pulls,
    };
    let canonicalize = canonicalize.as_ref();
    for commit in &mut batch.commits {
        commit.author = canonicalize(&commit.author);
    }
    for pull in &mut batch.pulls {
        pull.author = canonicalize(&pull.author);
    }

    // Persistence failures are fatal for the whole run: propagate.
    let outcome = dataset.apply_batch(&batch, config.mode)?;

    let status = if correlation.lookup_failures > 0 {
        RepoOutcome::Partial
    } else {
        RepoOutcome::Success
    };
    Ok(RepoReport {
        repo: slug,
        outcome: status,
        commits_added: outcome.commits_added,
        pulls_added: outcome.pulls_added,
        error: None,
    })
}
