//! GitHub PR lookup over the REST API.

use super::{PrInfo, PrLookup};
use crate::domain::TrackedRepo;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_API_ROOT: &str = "https://api.github.com";

pub struct GithubPrLookup {
    agent: ureq::Agent,
    token: Option<String>,
    api_root: String,
}

impl GithubPrLookup {
    pub fn new(token: Option<String>) -> Self {
        Self::with_api_root(token, DEFAULT_API_ROOT)
    }

    /// Point the client at a different API root (test servers).
    pub fn with_api_root(token: Option<String>, api_root: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .build();
        GithubPrLookup { agent, token, api_root: api_root.into() }
    }
}

/// Shape of the `GET /repos/{org}/{name}/pulls/{number}` response, reduced
/// to the fields the dataset keeps.
#[derive(Debug, Deserialize)]
struct ApiPull {
    user: Option<ApiUser>,
    merged_at: Option<String>,
    base: ApiBase,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiBase {
    #[serde(rename = "ref")]
    base_ref: String,
}

impl PrLookup for GithubPrLookup {
    fn lookup(&self, repo: &TrackedRepo, number: u64) -> Result<Option<PrInfo>, EngineError> {
        let url = format!("{}/repos/{}/{}/pulls/{}", self.api_root, repo.org, repo.name, number);
        let mut request = self
            .agent
            .get(&url)
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", "repo-pulse");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = match request.call() {
            Ok(response) => response,
            // A merge message can reference a number that is an issue or was
            // never a PR; that is a clean miss, not a failure.
            Err(ureq::Error::Status(404, _)) => return Ok(None),
            Err(e) => {
                return Err(EngineError::Correlation {
                    repo: repo.slug(),
                    number,
                    reason: e.to_string(),
                })
            }
        };

        let pull: ApiPull = response.into_json().map_err(|e| EngineError::Correlation {
            repo: repo.slug(),
            number,
            reason: format!("malformed response: {e}"),
        })?;

        Ok(Some(PrInfo {
            author: pull.user.map(|u| u.login).unwrap_or_else(|| "unknown".to_string()),
            merged_at: pull.merged_at.as_deref().and_then(parse_api_ts),
            base_branch: pull.base.base_ref,
            additions: pull.additions,
            deletions: pull.deletions,
        }))
    }
}

fn parse_api_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}
