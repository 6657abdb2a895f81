//! Core data models for the ingestion and aggregation pipeline.
//!
//! A [`RepoRecord`] is the in-memory aggregate of GitHub facts, parsed
//! metadata, and rendered content for one ingested repository. Metadata is
//! externally authored, so its deserialization is defensive: loosely shaped
//! fields (category chains, difficulty) are normalized into one canonical
//! shape at the parse boundary before any other component sees them.

use serde::de::Deserializer;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// In-memory record for one repository, keyed by name in the registry.
///
/// Created the moment the name is first seen (org listing or stray snapshot
/// directory), populated incrementally by the loaders, never destroyed:
/// re-ingestion overwrites fields in place.
#[derive(Debug, Clone, Default)]
pub struct RepoRecord {
    pub name: String,

    /// Externally sourced GitHub facts, opaque pass-through.
    /// Last write wins on refresh.
    pub github: Option<serde_json::Value>,

    /// Parsed article metadata; last metadata file loaded wins.
    pub meta: Option<Meta>,

    /// Per-file cache; an entry is only ever written by its own file's load.
    pub files: BTreeMap<PathBuf, FileEntry>,

    /// Canonical raw markdown of the primary article.
    pub markup: Option<String>,

    /// HTML form of the canonical markup, produced once at load time.
    pub rendered: Option<String>,

    /// Last-rendered HTML for this repository's page.
    pub composed: Option<String>,
}

impl RepoRecord {
    pub fn new(name: impl Into<String>) -> Self {
        RepoRecord {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Per-file cache entry for repositories shipping multiple content files.
#[derive(Debug, Clone, Default)]
pub struct FileEntry {
    pub meta: Option<Meta>,
    /// Raw markup text as read from this file.
    pub markup: Option<String>,
}

/// Structured metadata parsed from a repository's `article.json`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Meta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Always a list of chains, each chain broad-to-narrow. Authors may
    /// write a bare string, a list of names, or a list of chains; all
    /// shapes normalize here.
    #[serde(default, deserialize_with = "deserialize_categories")]
    pub categories: Vec<Vec<String>>,
    /// Numeric or numeric-string difficulty value.
    #[serde(default, deserialize_with = "deserialize_difficulty")]
    pub difficulty: Option<f64>,
    /// Derived label, set by the difficulty aggregation pass.
    #[serde(skip)]
    pub difficulty_label: Option<String>,
}

/// One author entry from `meta.authors`. Unknown fields (email, url, ...)
/// are preserved for the contributor index.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Author {
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One node of the category forest. `id` is the chain up to and including
/// this node joined by `-`; children are keyed by immediate child name.
/// Chains are linear descents merged on common prefixes, so the structure
/// is a forest, never cyclic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryNode {
    pub id: String,
    pub name: String,
    pub children: BTreeMap<String, CategoryNode>,
}

fn deserialize_categories<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(normalize_categories(&value))
}

/// Normalize a loosely shaped category field into a list of chains.
/// Entries that are neither strings nor string arrays are dropped.
pub fn normalize_categories(value: &serde_json::Value) -> Vec<Vec<String>> {
    match value {
        serde_json::Value::String(s) => vec![vec![s.clone()]],
        serde_json::Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| match entry {
                serde_json::Value::String(s) => Some(vec![s.clone()]),
                serde_json::Value::Array(chain) => {
                    let names: Vec<String> = chain
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect();
                    if names.is_empty() {
                        None
                    } else {
                        Some(names)
                    }
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn deserialize_difficulty<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
