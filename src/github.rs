//! GitHub org listing and tarball fetch.
//!
//! The listing seeds/refreshes each record's opaque `github` facts
//! (last write wins); the tarball fetch hands a byte stream to the
//! snapshot store. Both are bounded by the configured deadline and fail
//! with `Error::Timeout` rather than hanging.

use std::future::Future;
use std::time::Duration;
use tracing::info;

use crate::config::{FetchConfig, GithubConfig};
use crate::error::{Error, Result};
use crate::registry::RepoRegistry;

pub struct GithubClient {
    http: reqwest::Client,
    apihost: String,
    tarball_host: String,
    orgname: String,
    git_ref: String,
    timeout: Duration,
}

impl GithubClient {
    pub fn new(github: &GithubConfig, fetch: &FetchConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("orrery/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        GithubClient {
            http,
            apihost: github.apihost.clone(),
            tarball_host: github.tarball_host.clone(),
            orgname: github.orgname.clone(),
            git_ref: github.git_ref.clone(),
            timeout: Duration::from_secs(fetch.timeout_secs),
        }
    }

    fn listing_url(&self) -> String {
        format!("{}/orgs/{}/repos", self.apihost, self.orgname)
    }

    fn tarball_url(&self, repo: &str) -> String {
        format!(
            "{}/{}/{}/tarball/{}",
            self.tarball_host, self.orgname, repo, self.git_ref
        )
    }

    /// Fetch the org repository listing and seed/refresh registry records.
    /// Returns the number of repositories listed.
    pub async fn fetch_org_repos(&self, registry: &RepoRegistry) -> Result<usize> {
        let url = self.listing_url();
        info!(%url, "fetching org repository listing");

        let listing: Vec<serde_json::Value> = self
            .bounded(async {
                let response = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(Error::Network)?;
                response.json().await.map_err(Error::Network)
            })
            .await?;

        let mut seeded = 0;
        for repo_facts in listing {
            let Some(name) = repo_facts.get("name").and_then(|v| v.as_str()) else {
                continue;
            };
            let name = name.to_string();
            registry
                .update(&name, |record| {
                    record.github = Some(repo_facts.clone());
                })
                .await;
            seeded += 1;
        }

        Ok(seeded)
    }

    /// Download one repository's tarball as bytes.
    pub async fn fetch_tarball(&self, repo: &str) -> Result<Vec<u8>> {
        let url = self.tarball_url(repo);
        info!(%url, "downloading snapshot tarball");

        self.bounded(async {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(Error::Network)?;
            let bytes = response.bytes().await.map_err(Error::Network)?;
            Ok(bytes.to_vec())
        })
        .await
    }

    /// Apply the configured deadline to a fetch future.
    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GithubClient {
        GithubClient::new(
            &GithubConfig {
                apihost: "https://api.github.com".to_string(),
                tarball_host: "https://github.com".to_string(),
                orgname: "hubbleio".to_string(),
                git_ref: "master".to_string(),
            },
            &FetchConfig { timeout_secs: 5 },
        )
    }

    #[test]
    fn test_listing_url() {
        assert_eq!(
            client().listing_url(),
            "https://api.github.com/orgs/hubbleio/repos"
        );
    }

    #[test]
    fn test_tarball_url() {
        assert_eq!(
            client().tarball_url("streams"),
            "https://github.com/hubbleio/streams/tarball/master"
        );
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let c = GithubClient {
            timeout: Duration::from_millis(10),
            ..client()
        };
        let err = c
            .bounded(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}
