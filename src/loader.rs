//! Metadata and markup loaders.
//!
//! Each loader reads one file from a repository's current snapshot and
//! merges the result into the owning record: parsed metadata into `meta`
//! plus the per-file cache, markdown as the canonical `markup` with its
//! HTML form in `rendered`. Loader failures are scoped to the offending
//! file and leave previously loaded fields untouched.

use pulldown_cmark::{html, Parser};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Meta;
use crate::registry::RepoRegistry;

/// Parse a JSON metadata file into the repository record. The record is
/// created if the file is discovered before the org listing names it.
pub async fn load_meta(registry: &RepoRegistry, name: &str, path: &Path) -> Result<()> {
    let data = std::fs::read_to_string(path).map_err(|e| Error::fs(path, e))?;
    let meta: Meta = serde_json::from_str(&data).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    debug!(repo = name, path = %path.display(), "caching metadata");

    registry
        .update(name, |record| {
            let entry = record.files.entry(path.to_path_buf()).or_default();
            entry.meta = Some(meta.clone());
            // Canonical meta: last metadata file loaded wins. The pipeline
            // walks files in lexicographic order, making the winner
            // deterministic.
            record.meta = Some(meta);
        })
        .await;

    Ok(())
}

/// Read a markdown file, render it to HTML, and merge both forms into the
/// repository record. Composition consumes the rendered form as-is, so
/// rendering happens exactly once per load.
pub async fn load_markup(registry: &RepoRegistry, name: &str, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::fs(path, e))?;

    debug!(repo = name, path = %path.display(), "transforming markdown");

    // Rendering is infallible for valid UTF-8, but a renderer panic must
    // stay scoped to this file rather than take down the batch.
    let rendered = std::panic::catch_unwind(|| render_markdown(&text)).map_err(|_| {
        Error::Render(format!("markdown renderer panicked on {}", path.display()))
    })?;
    registry
        .update(name, |record| {
            let entry = record.files.entry(path.to_path_buf()).or_default();
            entry.markup = Some(text.clone());
            record.markup = Some(text);
            record.rendered = Some(rendered);
        })
        .await;

    Ok(())
}

/// Pure markdown-to-HTML transform. No external fetches; infallible for
/// any UTF-8 input.
pub fn render_markdown(text: &str) -> String {
    let parser = Parser::new(text);
    let mut out = String::with_capacity(text.len() * 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_meta_merges_record_and_file_cache() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("article.json");
        std::fs::write(&path, r#"{"title": "Streams", "tags": ["io"]}"#).unwrap();

        let registry = RepoRegistry::new();
        load_meta(&registry, "streams", &path).await.unwrap();

        let record = registry.get("streams").await.unwrap();
        let meta = record.meta.unwrap();
        assert_eq!(meta.title.as_deref(), Some("Streams"));
        assert_eq!(record.files[&path].meta.as_ref().unwrap().tags, vec!["io"]);
    }

    #[tokio::test]
    async fn test_malformed_meta_is_parse_error_and_preserves_previous() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("article.json");
        std::fs::write(&good, r#"{"title": "Good"}"#).unwrap();
        let bad = tmp.path().join("broken.json");
        std::fs::write(&bad, "{not json").unwrap();

        let registry = RepoRegistry::new();
        load_meta(&registry, "repo", &good).await.unwrap();

        let err = load_meta(&registry, "repo", &bad).await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));

        let record = registry.get("repo").await.unwrap();
        assert_eq!(record.meta.unwrap().title.as_deref(), Some("Good"));
        assert!(!record.files.contains_key(&bad));
    }

    #[tokio::test]
    async fn test_missing_file_is_fs_error() {
        let tmp = TempDir::new().unwrap();
        let registry = RepoRegistry::new();
        let err = load_meta(&registry, "repo", &tmp.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }));
    }

    #[tokio::test]
    async fn test_load_markup_stores_raw_and_rendered() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("article.md");
        std::fs::write(&path, "# Title\n\nBody text.").unwrap();

        let registry = RepoRegistry::new();
        load_markup(&registry, "repo", &path).await.unwrap();

        let record = registry.get("repo").await.unwrap();
        assert_eq!(record.markup.as_deref(), Some("# Title\n\nBody text."));
        assert_eq!(
            record.files[&path].markup.as_deref(),
            Some("# Title\n\nBody text.")
        );
        let rendered = record.rendered.unwrap();
        assert!(rendered.contains("<h1>"));
        assert!(rendered.contains("Title"));
    }

    #[test]
    fn test_render_markdown_basic() {
        let out = render_markdown("*hi*");
        assert!(out.contains("<em>hi</em>"));
    }
}
