//! View composition.
//!
//! Combines a repository record and the current aggregate indices into the
//! render-ready HTML handed to the external template binder: one page per
//! repository plus the site index. Pure functions of their inputs, with no
//! network or filesystem access. Malformed view data here is a programmer
//! error for that render only, never a pipeline failure.

use std::collections::BTreeMap;

use crate::aggregate::Aggregates;
use crate::models::{CategoryNode, RepoRecord};
use crate::registry::REPOSITORY_INDEX;

/// Compose one repository's page from its record and the category forest.
pub fn compose_article(record: &RepoRecord, categories: &BTreeMap<String, CategoryNode>) -> String {
    let mut out = String::new();

    let title = record
        .meta
        .as_ref()
        .and_then(|m| m.title.as_deref())
        .unwrap_or(&record.name);
    out.push_str(&format!("<article data-repo=\"{}\">\n", escape(&record.name)));
    out.push_str(&format!("<h1>{}</h1>\n", escape(title)));

    if let Some(meta) = &record.meta {
        if let Some(description) = &meta.description {
            out.push_str(&format!("<p class=\"description\">{}</p>\n", escape(description)));
        }
        if let Some(label) = &meta.difficulty_label {
            out.push_str(&format!("<span class=\"difficulty\">{}</span>\n", escape(label)));
        }
        if !meta.authors.is_empty() {
            out.push_str("<ul class=\"authors\">\n");
            for author in &meta.authors {
                out.push_str(&format!("<li>{}</li>\n", escape(&author.name)));
            }
            out.push_str("</ul>\n");
        }
        if !meta.tags.is_empty() {
            out.push_str("<ul class=\"tags\">\n");
            for tag in &meta.tags {
                out.push_str(&format!("<li>{}</li>\n", escape(tag)));
            }
            out.push_str("</ul>\n");
        }
        for chain in &meta.categories {
            push_category_trail(&mut out, chain, categories);
        }
    }

    // The body HTML was rendered once at load time.
    if let Some(body) = &record.rendered {
        out.push_str("<section class=\"body\">\n");
        out.push_str(body);
        out.push_str("</section>\n");
    }

    out.push_str("</article>\n");
    out
}

/// Breadcrumb for one category chain, carrying the node ids from the
/// shared forest so the outer layer can link category pages.
fn push_category_trail(
    out: &mut String,
    chain: &[String],
    categories: &BTreeMap<String, CategoryNode>,
) {
    out.push_str("<nav class=\"categories\">");
    let mut children = categories;
    for (i, name) in chain.iter().enumerate() {
        if i > 0 {
            out.push_str(" / ");
        }
        match children.get(name) {
            Some(node) => {
                out.push_str(&format!(
                    "<a data-category=\"{}\">{}</a>",
                    escape(&node.id),
                    escape(name)
                ));
                children = &node.children;
            }
            None => {
                // Chain not present in the forest (compose ran before
                // aggregation); degrade to plain text.
                out.push_str(&escape(name));
            }
        }
    }
    out.push_str("</nav>\n");
}

/// Compose the site index from the full registry and aggregate indices.
pub fn compose_index(repos: &BTreeMap<String, RepoRecord>, aggregates: &Aggregates) -> String {
    let mut out = String::new();
    out.push_str("<section class=\"index\">\n");

    out.push_str("<ul class=\"articles\">\n");
    for (name, record) in repos {
        if name == REPOSITORY_INDEX {
            continue;
        }
        let title = record
            .meta
            .as_ref()
            .and_then(|m| m.title.as_deref())
            .unwrap_or(name);
        out.push_str(&format!(
            "<li><a href=\"/{}\">{}</a></li>\n",
            escape(name),
            escape(title)
        ));
    }
    out.push_str("</ul>\n");

    out.push_str("<ul class=\"tags\">\n");
    for (tag, bucket) in &aggregates.tags {
        out.push_str(&format!(
            "<li data-count=\"{}\">{}</li>\n",
            bucket.len(),
            escape(tag)
        ));
    }
    out.push_str("</ul>\n");

    out.push_str("<ul class=\"contributors\">\n");
    for contributor in aggregates.contributors.values() {
        out.push_str(&format!(
            "<li data-count=\"{}\">{}</li>\n",
            contributor.repos.len(),
            escape(&contributor.name)
        ));
    }
    out.push_str("</ul>\n");

    push_category_tree(&mut out, &aggregates.categories);

    out.push_str("</section>\n");
    out
}

fn push_category_tree(out: &mut String, forest: &BTreeMap<String, CategoryNode>) {
    if forest.is_empty() {
        return;
    }
    out.push_str("<ul class=\"categories\">\n");
    for node in forest.values() {
        out.push_str(&format!(
            "<li data-category=\"{}\">{}",
            escape(&node.id),
            escape(&node.name)
        ));
        push_category_tree(out, &node.children);
        out.push_str("</li>\n");
    }
    out.push_str("</ul>\n");
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
