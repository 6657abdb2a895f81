use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub github: GithubConfig,
    pub snapshots: SnapshotsConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    /// REST API host used for the org repository listing.
    #[serde(default = "default_apihost")]
    pub apihost: String,

    /// Host serving repository tarballs.
    #[serde(default = "default_tarball_host")]
    pub tarball_host: String,

    /// Organization whose repositories are ingested.
    pub orgname: String,

    /// Git ref the tarball is fetched at.
    #[serde(default = "default_git_ref")]
    pub git_ref: String,
}

fn default_apihost() -> String {
    "https://api.github.com".to_string()
}
fn default_tarball_host() -> String {
    "https://github.com".to_string()
}
fn default_git_ref() -> String {
    "master".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotsConfig {
    /// Root directory holding `<repo>/<version>/` extraction trees.
    pub root: PathBuf,
}

/// Naming conventions for the files recognized inside a snapshot.
/// Everything else on disk is ignored by the pipeline (but kept for
/// static serving by the outer layer).
#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    #[serde(default = "default_meta_glob")]
    pub meta_glob: String,
    #[serde(default = "default_markup_glob")]
    pub markup_glob: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            meta_glob: default_meta_glob(),
            markup_glob: default_markup_glob(),
        }
    }
}

fn default_meta_glob() -> String {
    "**/article.json".to_string()
}
fn default_markup_glob() -> String {
    "**/article.md".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Deadline applied to each listing/tarball fetch.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.github.orgname.is_empty() {
        anyhow::bail!("github.orgname must not be empty");
    }

    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_applies_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [github]
            orgname = "hubbleio"

            [snapshots]
            root = "/tmp/snapshots"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.github.apihost, "https://api.github.com");
        assert_eq!(cfg.github.git_ref, "master");
        assert_eq!(cfg.content.meta_glob, "**/article.json");
        assert_eq!(cfg.content.markup_glob, "**/article.md");
        assert_eq!(cfg.fetch.timeout_secs, 30);
    }
}
