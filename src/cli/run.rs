//! Run command implementation

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::{load_config, Config, RepoEntry};
use crate::correlate::github::GithubPrLookup;
use crate::domain::PersistMode;
use crate::engine;
use crate::identity;
use crate::report::render_summary;
use crate::store::CacheStore;

#[derive(Args)]
pub struct RunArgs {
    /// Path to config file (repo-pulse.toml or .repo-pulse.yml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Repositories to extract (org/name), overriding the config list
    #[arg(short = 'r', long = "repo", value_name = "SLUG")]
    pub repos: Vec<String>,

    /// Local cache root (mirrors + dataset)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Extraction window in days for repositories with no checkpoint
    #[arg(long, value_name = "DAYS")]
    pub since_days: Option<u32>,

    /// Worker pool width for cross-repository parallelism
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Discard existing rows and re-extract from scratch
    #[arg(long)]
    pub full: bool,
}

pub fn run(args: RunArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed resolving current directory")?;
    let mut config = load_config(&cwd, args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    if config.repos.is_empty() {
        bail!("No repositories configured; pass --repo org/name or add repos to repo-pulse.toml");
    }

    let store = CacheStore::new(config.cache_root());
    let dataset = store.open_dataset()?;
    let lookup = GithubPrLookup::new(config.token());
    let canonicalize = identity::passthrough();

    let summary = engine::run(&config, &store, &dataset, &lookup, &canonicalize)
        .context("Extraction run aborted")?;

    print!("{}", render_summary(&summary));
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if !args.repos.is_empty() {
        config.repos = args.repos.iter().cloned().map(RepoEntry::Slug).collect();
    }
    if let Some(cache_dir) = &args.cache_dir {
        config.cache_dir = Some(cache_dir.clone());
    }
    if let Some(since_days) = args.since_days {
        config.since_days = since_days;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs.max(1);
    }
    if args.full {
        config.mode = PersistMode::Replace;
    }
}
