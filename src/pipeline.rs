//! Pipeline orchestration.
//!
//! Coordinates the full ingestion cycle: org listing → per-repository
//! snapshot download and extraction → current-version resolution → metadata
//! and markup loading → aggregation → composition.
//!
//! Per-repository tasks are fanned out and settled to completion
//! regardless of individual failure; the batch never fails fast. Outcomes
//! are collected and returned so a single bad repository cannot block the
//! others. Aggregation runs strictly after all loading tasks have settled,
//! so its full-registry scans never interleave with record creation.

use anyhow::Context;
use futures::future::join_all;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;
use walkdir::WalkDir;

use crate::aggregate::{aggregate, Aggregates};
use crate::compose::{compose_article, compose_index};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::github::GithubClient;
use crate::loader;
use crate::registry::{RepoRegistry, REPOSITORY_INDEX};
use crate::store::SnapshotStore;
use crate::version::current_version;

/// Result of one repository's ingestion or load cycle.
#[derive(Debug)]
pub struct RepoOutcome {
    pub name: String,
    pub result: Result<()>,
}

pub struct Pipeline {
    registry: RepoRegistry,
    store: Arc<SnapshotStore>,
    github: GithubClient,
    aggregates: Mutex<Aggregates>,
    meta_files: GlobSet,
    markup_files: GlobSet,
    task_timeout: Duration,
}

impl Pipeline {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let meta_files = single_glob(&config.content.meta_glob)
            .with_context(|| "Invalid content.meta_glob pattern")?;
        let markup_files = single_glob(&config.content.markup_glob)
            .with_context(|| "Invalid content.markup_glob pattern")?;

        Ok(Pipeline {
            registry: RepoRegistry::new(),
            store: Arc::new(SnapshotStore::new(config.snapshots.root.clone())),
            github: GithubClient::new(&config.github, &config.fetch),
            aggregates: Mutex::new(Aggregates::default()),
            meta_files,
            markup_files,
            task_timeout: Duration::from_secs(config.fetch.timeout_secs),
        })
    }

    pub fn registry(&self) -> &RepoRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Fetch the org listing, then download and extract every listed
    /// repository's snapshot. All per-repository tasks settle; individual
    /// failures land in the returned outcomes. Only a listing failure
    /// aborts the cycle as a whole.
    pub async fn ingest_all(&self) -> Result<Vec<RepoOutcome>> {
        self.store.ensure_root()?;
        let listed = self.github.fetch_org_repos(&self.registry).await?;
        tracing::info!(repos = listed, "org listing loaded, scanning repositories");

        let names = self.registry.names().await;
        let tasks = names.into_iter().map(|name| async move {
            let result = self.ingest_one(&name).await;
            if let Err(err) = &result {
                warn!(repo = %name, error = %err, "snapshot ingestion failed");
            }
            RepoOutcome { name, result }
        });

        Ok(join_all(tasks).await)
    }

    /// Download and extract one repository's snapshot.
    async fn ingest_one(&self, name: &str) -> Result<()> {
        let bytes = self.github.fetch_tarball(name).await?;
        self.extract_snapshot(name, bytes).await
    }

    /// Unpack downloaded snapshot bytes on the blocking pool, under the
    /// same deadline as the fetches. The store stages the extraction and
    /// publishes by rename, so a timed out task that keeps running past
    /// the deadline never becomes a selectable version.
    pub async fn extract_snapshot(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let store = Arc::clone(&self.store);
        let repo = name.to_string();
        let task = tokio::task::spawn_blocking(move || store.extract(&repo, &bytes));

        match tokio::time::timeout(self.task_timeout, task).await {
            Ok(joined) => joined.map_err(|e| {
                Error::extraction(name, std::io::Error::other(e))
            })?,
            Err(_) => Err(Error::Timeout(self.task_timeout)),
        }
    }

    /// Load metadata and markup for every repository with a snapshot
    /// directory, strays included (their records are created here).
    /// Per-file errors are file-scoped: they are logged, surface in the
    /// repository's outcome, and never stop other files or repositories.
    pub async fn load_repos(&self) -> Result<Vec<RepoOutcome>> {
        self.store.ensure_root()?;
        let names = self.store.list_repos()?;

        let tasks = names.into_iter().map(|name| async move {
            self.registry.ensure(&name).await;
            let result = self.load_one(&name).await;
            if let Err(err) = &result {
                warn!(repo = %name, error = %err, "repository load failed");
            }
            RepoOutcome { name, result }
        });

        Ok(join_all(tasks).await)
    }

    async fn load_one(&self, name: &str) -> Result<()> {
        let versions = self.store.list_versions(name)?;
        let Some(current) = current_version(&versions) else {
            // Zero versions: not yet ingested, not a failure.
            return Ok(());
        };

        // Lexicographic path order makes the "last file loaded wins"
        // rule for meta/markup deterministic.
        let mut files = Vec::new();
        for entry in WalkDir::new(&current.path) {
            let entry = entry.map_err(|e| Error::fs(current.path.clone(), e.into()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();

        let mut first_error = None;
        for path in files {
            let relative = path.strip_prefix(&current.path).unwrap_or(&path);

            let result = if self.meta_files.is_match(relative) {
                loader::load_meta(&self.registry, name, &path).await
            } else if self.markup_files.is_match(relative) {
                loader::load_markup(&self.registry, name, &path).await
            } else {
                continue;
            };

            // File-scoped: keep loading the remaining files.
            if let Err(err) = result {
                warn!(repo = %name, path = %path.display(), error = %err, "file load failed");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Rebuild all four aggregate indices from the current registry
    /// contents. The registry lock is held for the full scan, and the new
    /// indices replace the previous ones wholesale.
    pub async fn aggregate(&self) -> Aggregates {
        let rebuilt = self.registry.scan_mut(|repos| aggregate(repos)).await;
        let mut current = self.aggregates.lock().await;
        *current = rebuilt.clone();
        rebuilt
    }

    /// Compose every repository page and the site index from the current
    /// records and aggregate indices.
    pub async fn compose_all(&self) {
        let aggregates = self.aggregates.lock().await.clone();
        self.registry
            .scan_mut(|repos| {
                for (name, record) in repos.iter_mut() {
                    if name == REPOSITORY_INDEX {
                        continue;
                    }
                    record.composed = Some(compose_article(record, &aggregates.categories));
                }

                let index_html = compose_index(repos, &aggregates);
                if let Some(index) = repos.get_mut(REPOSITORY_INDEX) {
                    index.composed = Some(index_html);
                }
            })
            .await;
    }

    /// Full cycle: ingest, load, aggregate, compose. Returns the merged
    /// per-repository outcomes (a repository that failed ingestion keeps
    /// that failure even if a stale snapshot loaded afterwards).
    pub async fn run(&self) -> Result<Vec<RepoOutcome>> {
        let ingested = self.ingest_all().await?;
        let loaded = self.load_repos().await?;

        self.aggregate().await;
        self.compose_all().await;

        let mut outcomes: std::collections::BTreeMap<String, RepoOutcome> = ingested
            .into_iter()
            .map(|outcome| (outcome.name.clone(), outcome))
            .collect();
        for outcome in loaded {
            match outcomes.get_mut(&outcome.name) {
                Some(existing) if existing.result.is_err() => {}
                _ => {
                    outcomes.insert(outcome.name.clone(), outcome);
                }
            }
        }

        Ok(outcomes.into_values().collect())
    }

    /// Offline cycle: load from existing snapshots, aggregate, compose.
    pub async fn refresh(&self) -> Result<Vec<RepoOutcome>> {
        let outcomes = self.load_repos().await?;
        self.aggregate().await;
        self.compose_all().await;
        Ok(outcomes)
    }

    /// Last composed page for a repository. `None` for unknown or
    /// not-yet-composed names, never an error.
    pub async fn get_article(&self, name: &str) -> Option<String> {
        self.registry.composed(name).await
    }

    /// Last composed site index.
    pub async fn get_index(&self) -> Option<String> {
        self.registry.composed(REPOSITORY_INDEX).await
    }

    /// Snapshot of the current aggregate indices, for external rendering
    /// of contributor, tag, or category pages.
    pub async fn aggregates(&self) -> Aggregates {
        self.aggregates.lock().await.clone()
    }
}

fn single_glob(pattern: &str) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    builder.add(Glob::new(pattern)?);
    Ok(builder.build()?)
}
