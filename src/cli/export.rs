//! Export command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use crate::config::load_config;
use crate::report::{render_commits_jsonl, render_pulls_jsonl};
use crate::store::CacheStore;

#[derive(Args)]
pub struct ExportArgs {
    /// Path to config file (repo-pulse.toml or .repo-pulse.yml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local cache root (mirrors + dataset)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory for commits.jsonl and pulls.jsonl (stdout when omitted)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

pub fn run(args: ExportArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed resolving current directory")?;
    let mut config = load_config(&cwd, args.config.as_deref())?;
    if let Some(cache_dir) = args.cache_dir {
        config.cache_dir = Some(cache_dir);
    }

    let store = CacheStore::new(config.cache_root());
    let dataset = store.open_dataset()?;

    let commits = render_commits_jsonl(&dataset.commits()?);
    let pulls = render_pulls_jsonl(&dataset.pulls()?);

    match args.output_dir {
        Some(dir) => {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed creating output dir: {}", dir.display()))?;
            fs::write(dir.join("commits.jsonl"), &commits)?;
            fs::write(dir.join("pulls.jsonl"), &pulls)?;
            println!("Wrote commits.jsonl and pulls.jsonl to {}", dir.display());
        }
        None => {
            print!("{commits}");
            print!("{pulls}");
        }
    }
    Ok(())
}
