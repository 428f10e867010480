//! Config file loading

use crate::config::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn load_config(search_root: &Path, config_path: Option<&Path>) -> Result<Config> {
    let config_path_provided = config_path.is_some();

    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(search_root),
    };

    let Some(config_file) = discovered else {
        return Ok(Config::default());
    };

    let content = fs::read_to_string(&config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))?;

    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

    // Explicitly provided configs fail hard; auto-discovered ones soft-fail
    // back to defaults with a warning.
    let parsed = match ext.as_str() {
        "toml" => match parse_toml_config(&content, &config_file) {
            Ok(cfg) => cfg,
            Err(e) => {
                if config_path_provided {
                    return Err(e);
                }
                tracing::warn!(
                    "Failed to parse auto-discovered config {}: {}",
                    config_file.display(),
                    e
                );
                return Ok(Config::default());
            }
        },
        "yaml" | "yml" => match parse_yaml_config(&content, &config_file) {
            Ok(cfg) => cfg,
            Err(e) => {
                if config_path_provided {
                    return Err(e);
                }
                tracing::warn!(
                    "Failed to parse auto-discovered config {}: {}",
                    config_file.display(),
                    e
                );
                return Ok(Config::default());
            }
        },
        other => {
            let err = anyhow::anyhow!(
                "Unsupported config extension '.{}' for file {}",
                other,
                config_file.display()
            );
            if config_path_provided {
                return Err(err);
            }
            tracing::warn!("{}", err);
            return Ok(Config::default());
        }
    };

    Ok(parsed)
}

/// Parse TOML config, supporting a nested [repo-pulse] section.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;

    let config_val = if let Some(nested) = raw.get("repo-pulse") { nested.clone() } else { raw };

    config_val.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

/// Parse YAML config, supporting a nested repo-pulse section.
fn parse_yaml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;

    let config_val = if let Some(nested) = raw.get("repo-pulse") { nested.clone() } else { raw };

    serde_yaml::from_value(config_val)
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

fn discover_config(search_root: &Path) -> Option<std::path::PathBuf> {
    let candidates = [
        "repo-pulse.toml",
        ".repo-pulse.toml",
        "repo-pulse.yml",
        ".repo-pulse.yml",
        "repo-pulse.yaml",
        ".repo-pulse.yaml",
    ];

    for candidate in candidates {
        let path = search_root.join(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PersistMode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_defaults_when_missing() {
        let tmp = TempDir::new().expect("tmp");
        let cfg = load_config(tmp.path(), None).expect("config");
        assert!(cfg.repos.is_empty());
        assert_eq!(cfg.since_days, 7);
        assert_eq!(cfg.jobs, 1);
        assert_eq!(cfg.mode, PersistMode::Incremental);
    }

    #[test]
    fn test_load_toml_config() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("repo-pulse.toml");
        fs::write(
            &path,
            "repos = ['acme/widgets', 'acme/gadgets']\nsince_days = 14\nmode = 'replace'\n",
        )
        .expect("write");

        let cfg = load_config(tmp.path(), None).expect("config");
        assert_eq!(cfg.repos.len(), 2);
        assert_eq!(cfg.since_days, 14);
        assert_eq!(cfg.mode, PersistMode::Replace);
    }

    #[test]
    fn test_load_toml_config_nested_section() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("repo-pulse.toml");
        fs::write(&path, "[repo-pulse]\nrepos = ['acme/widgets']\njobs = 4\n").expect("write");

        let cfg = load_config(tmp.path(), Some(&path)).expect("config");
        assert_eq!(cfg.repos.len(), 1);
        assert_eq!(cfg.jobs, 4);
    }

    #[test]
    fn test_load_yaml_config() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("repo-pulse.yml");
        fs::write(&path, "repos:\n  - acme/widgets\ntracked_branches:\n  - trunk\n")
            .expect("write");

        let cfg = load_config(tmp.path(), None).expect("config");
        assert_eq!(cfg.tracked_branches, vec!["trunk".to_string()]);
    }

    #[test]
    fn test_repo_entry_with_url() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("repo-pulse.toml");
        fs::write(&path, "[[repos]]\nslug = 'acme/widgets'\nurl = 'file:///srv/widgets'\n")
            .expect("write");

        let cfg = load_config(tmp.path(), Some(&path)).expect("config");
        let repos = cfg.tracked_repos().expect("resolve");
        assert_eq!(repos[0].clone_url(), "file:///srv/widgets");
    }

    #[test]
    fn test_explicit_config_invalid_type_returns_err() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("bad.toml");
        // since_days expects an integer, not a list
        fs::write(&path, "since_days = ['x']\n").expect("write");

        let result = load_config(tmp.path(), Some(&path));
        assert!(result.is_err(), "explicit config with invalid type should return Err");
    }

    #[test]
    fn test_auto_discovered_invalid_type_returns_default() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("repo-pulse.toml"), "since_days = ['x']\n").expect("write");

        // Auto-discover: no explicit path provided — should soft-warn and return default
        let cfg = load_config(tmp.path(), None).expect("should not error on auto-discovery");
        assert_eq!(cfg.since_days, Config::default().since_days);
    }

    #[test]
    fn test_bad_slug_rejected_on_resolve() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("repo-pulse.toml");
        fs::write(&path, "repos = ['not-a-slug']\n").expect("write");

        let cfg = load_config(tmp.path(), Some(&path)).expect("config parses");
        assert!(cfg.tracked_repos().is_err(), "slug without org should fail resolution");
    }
}
