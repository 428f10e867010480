//! repo-pulse: incremental git history extraction for contribution analytics
//!
//! Maintains bare local mirrors of tracked repositories, incrementally walks
//! commit history since the last checkpoint, classifies commits by branch
//! reachability, correlates merge commits with remote PR metadata (one API
//! call per distinct PR number), and merges the results into a deduplicated
//! SQLite dataset consumed by downstream reporting.

pub mod cli;
pub mod config;
pub mod correlate;
pub mod domain;
pub mod engine;
pub mod error;
pub mod extract;
pub mod identity;
pub mod persist;
pub mod report;
pub mod store;
pub mod sync;
