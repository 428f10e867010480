//! repo-pulse: incremental git history extraction for contribution analytics
//!
//! This tool mirrors tracked repositories, extracts commit and pull request
//! activity since the last checkpoint, and persists a deduplicated dataset
//! for downstream charting and reporting.

use anyhow::Result;

fn main() -> Result<()> {
    repo_pulse::cli::run()
}
