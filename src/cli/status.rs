//! Status command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::load_config;
use crate::store::CacheStore;

#[derive(Args)]
pub struct StatusArgs {
    /// Path to config file (repo-pulse.toml or .repo-pulse.yml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local cache root (mirrors + dataset)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed resolving current directory")?;
    let mut config = load_config(&cwd, args.config.as_deref())?;
    if let Some(cache_dir) = args.cache_dir {
        config.cache_dir = Some(cache_dir);
    }

    let store = CacheStore::new(config.cache_root());
    let dataset = store.open_dataset()?;

    let checkpoints = dataset.checkpoints()?;
    if checkpoints.is_empty() {
        println!("No checkpoints; nothing extracted yet.");
        return Ok(());
    }

    println!("{:<40} {:<12} {:<10} {}", "repository", "commits", "PRs", "checkpoint");
    for (slug, checkpoint) in checkpoints {
        let commits = dataset.commit_count(&slug)?;
        let pulls = dataset.pull_count(&slug)?;
        println!(
            "{:<40} {:<12} {:<10} {} @ {}",
            slug,
            commits,
            pulls,
            &checkpoint.last_sha[..checkpoint.last_sha.len().min(12)],
            checkpoint.last_commit_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}
