//! Aggregate index construction.
//!
//! Four independent reduction passes over the full registry produce the
//! contributor index, tag index, category forest, and difficulty buckets.
//! Each pass rebuilds its target from scratch, so aggregation is a pure
//! function of the current registry contents: running it twice without
//! registry changes yields structurally identical indices. A repository
//! missing the relevant metadata field is skipped by that pass only.
//!
//! Buckets hold repository names; the registry stays authoritative for the
//! records themselves.

use std::collections::BTreeMap;

use crate::difficulty;
use crate::models::{CategoryNode, RepoRecord};

/// The derived cross-repository indices, rebuilt wholesale on each run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub contributors: BTreeMap<String, Contributor>,
    pub tags: BTreeMap<String, Vec<String>>,
    pub categories: BTreeMap<String, CategoryNode>,
    pub difficulties: BTreeMap<String, Vec<String>>,
}

/// A contributor identity, created on first sighting and reused (same name
/// = same identity) across every repository that lists them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contributor {
    pub name: String,
    /// Extra author fields from the first sighting (email, url, ...).
    pub extra: serde_json::Map<String, serde_json::Value>,
    /// Names of repositories listing this contributor, in registry
    /// iteration order.
    pub repos: Vec<String>,
}

/// Run all four reduction passes. The difficulty pass writes derived
/// labels back onto each record's meta, which is why the scan is mutable.
pub fn aggregate(repos: &mut BTreeMap<String, RepoRecord>) -> Aggregates {
    Aggregates {
        contributors: reduce_contributors(repos),
        tags: reduce_tags(repos),
        categories: reduce_categories(repos),
        difficulties: reduce_difficulties(repos),
    }
}

fn reduce_contributors(repos: &BTreeMap<String, RepoRecord>) -> BTreeMap<String, Contributor> {
    let mut contributors = BTreeMap::new();

    for (name, repo) in repos {
        let Some(meta) = &repo.meta else { continue };
        for author in &meta.authors {
            let contributor = contributors
                .entry(author.name.clone())
                .or_insert_with(|| Contributor {
                    name: author.name.clone(),
                    extra: author.extra.clone(),
                    repos: Vec::new(),
                });
            contributor.repos.push(name.clone());
        }
    }

    contributors
}

fn reduce_tags(repos: &BTreeMap<String, RepoRecord>) -> BTreeMap<String, Vec<String>> {
    let mut tags: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (name, repo) in repos {
        let Some(meta) = &repo.meta else { continue };
        for tag in &meta.tags {
            tags.entry(tag.clone()).or_default().push(name.clone());
        }
    }

    tags
}

fn reduce_categories(repos: &BTreeMap<String, RepoRecord>) -> BTreeMap<String, CategoryNode> {
    let mut forest = BTreeMap::new();

    for repo in repos.values() {
        let Some(meta) = &repo.meta else { continue };
        for chain in &meta.categories {
            insert_chain(&mut forest, chain);
        }
    }

    forest
}

/// Walk one chain left-to-right, creating a node per prefix if absent and
/// descending into its children. Repositories are not stored on nodes;
/// only the taxonomy shape is built.
fn insert_chain(forest: &mut BTreeMap<String, CategoryNode>, chain: &[String]) {
    let mut children = forest;
    let mut id = String::new();

    for name in chain {
        if !id.is_empty() {
            id.push('-');
        }
        id.push_str(name);

        let node = children
            .entry(name.clone())
            .or_insert_with(|| CategoryNode {
                id: id.clone(),
                name: name.clone(),
                children: BTreeMap::new(),
            });
        children = &mut node.children;
    }
}

fn reduce_difficulties(repos: &mut BTreeMap<String, RepoRecord>) -> BTreeMap<String, Vec<String>> {
    let mut difficulties: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (name, repo) in repos.iter_mut() {
        let Some(meta) = &mut repo.meta else { continue };
        let Some(value) = meta.difficulty else { continue };
        let Some(label) = difficulty::label(value) else {
            continue;
        };

        meta.difficulty_label = Some(label.to_string());
        difficulties
            .entry(label.to_string())
            .or_default()
            .push(name.clone());
    }

    difficulties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, Meta};

    fn repo(name: &str, meta: Option<Meta>) -> (String, RepoRecord) {
        let mut record = RepoRecord::new(name);
        record.meta = meta;
        (name.to_string(), record)
    }

    fn author(name: &str) -> Author {
        Author {
            name: name.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    fn sample_registry() -> BTreeMap<String, RepoRecord> {
        let mut repos = BTreeMap::new();

        let (name, record) = repo(
            "repo-a",
            Some(Meta {
                tags: vec!["systems".to_string()],
                authors: vec![author("Ada")],
                difficulty: Some(2.0),
                ..Default::default()
            }),
        );
        repos.insert(name, record);

        let (name, record) = repo(
            "repo-b",
            Some(Meta {
                tags: vec!["systems".to_string()],
                difficulty: Some(2.0),
                ..Default::default()
            }),
        );
        repos.insert(name, record);

        // No meta at all; must be skipped by every pass.
        let (name, record) = repo("repo-c", None);
        repos.insert(name, record);

        repos
    }

    #[test]
    fn test_shared_tag_bucket_in_processing_order() {
        let mut repos = sample_registry();
        let agg = aggregate(&mut repos);
        assert_eq!(agg.tags["systems"], vec!["repo-a", "repo-b"]);
    }

    #[test]
    fn test_contributor_identity_and_repo_list() {
        let mut repos = sample_registry();
        let agg = aggregate(&mut repos);
        assert_eq!(agg.contributors["Ada"].repos, vec!["repo-a"]);
        assert_eq!(agg.contributors.len(), 1);
    }

    #[test]
    fn test_shared_difficulty_bucket_and_label_writeback() {
        let mut repos = sample_registry();
        let agg = aggregate(&mut repos);

        assert_eq!(agg.difficulties.len(), 1);
        assert_eq!(agg.difficulties["beginner"], vec!["repo-a", "repo-b"]);
        assert_eq!(
            repos["repo-a"].meta.as_ref().unwrap().difficulty_label.as_deref(),
            Some("beginner")
        );
    }

    #[test]
    fn test_repo_without_meta_skipped_everywhere() {
        let mut repos = BTreeMap::new();
        let (name, record) = repo("bare", None);
        repos.insert(name, record);

        let agg = aggregate(&mut repos);
        assert!(agg.contributors.is_empty());
        assert!(agg.tags.is_empty());
        assert!(agg.categories.is_empty());
        assert!(agg.difficulties.is_empty());
    }

    #[test]
    fn test_category_forest_merges_on_common_prefix() {
        let mut repos = BTreeMap::new();
        let (name, record) = repo(
            "go-repo",
            Some(Meta {
                categories: vec![vec!["Languages".to_string(), "Go".to_string()]],
                ..Default::default()
            }),
        );
        repos.insert(name, record);
        let (name, record) = repo(
            "rust-repo",
            Some(Meta {
                categories: vec![vec!["Languages".to_string(), "Rust".to_string()]],
                ..Default::default()
            }),
        );
        repos.insert(name, record);

        let agg = aggregate(&mut repos);

        assert_eq!(agg.categories.len(), 1);
        let root = &agg.categories["Languages"];
        assert_eq!(root.id, "Languages");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children["Go"].id, "Languages-Go");
        assert_eq!(root.children["Rust"].id, "Languages-Rust");
        assert!(root.children["Go"].children.is_empty());
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let mut repos = sample_registry();
        let first = aggregate(&mut repos);
        let second = aggregate(&mut repos);
        assert_eq!(first, second);
    }
}
