//! Link graph extraction from stored HTML pages.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use retrieval::authority::LinkGraph;
use retrieval::{DocId, DocMeta};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use url::Url;
use walkdir::WalkDir;

lazy_static! {
    static ref HREF: Regex = Regex::new(r#"<a href="([^"]*)""#).expect("valid regex");
    static ref DOC_NUMBER: Regex = Regex::new(r"\d+").expect("valid regex");
}

/// `url` without its fragment, so `page#section` anchors still reach `page`.
fn normalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// Documents referenced by `<a href>` anchors in `html`. Relative hrefs are
/// resolved against `base`, the referring page's own URL; without a base
/// only absolute hrefs can match.
pub fn linked_documents(html: &str, base: Option<&Url>, by_url: &HashMap<Url, DocId>) -> Vec<DocId> {
    HREF.captures_iter(html)
        .filter_map(|caps| match base {
            Some(base) => base.join(&caps[1]).ok(),
            None => Url::parse(&caps[1]).ok(),
        })
        .filter_map(|url| by_url.get(&normalize(url)).copied())
        .collect()
}

/// Scan every page once and connect it to the documents it links to.
/// A page's document id is the first number in its file name.
pub fn build_link_graph(pages: &Path, docs: &[DocMeta]) -> Result<LinkGraph> {
    let mut by_url: HashMap<Url, DocId> = HashMap::new();
    let mut page_urls: HashMap<DocId, Url> = HashMap::new();
    let mut graph = LinkGraph::new();
    for doc in docs {
        graph.add_node(doc.doc_id);
        match Url::parse(&doc.url) {
            Ok(url) => {
                let url = normalize(url);
                by_url.insert(url.clone(), doc.doc_id);
                page_urls.insert(doc.doc_id, url);
            }
            Err(e) => tracing::warn!(doc_id = doc.doc_id, url = %doc.url, error = %e, "unparseable document url"),
        }
    }

    for entry in WalkDir::new(pages).max_depth(1).into_iter().filter_map(|e| e.ok()) {
        if !entry.path().is_file() { continue; }
        let name = entry.file_name().to_string_lossy();
        let Some(source) = DOC_NUMBER.find(&name).and_then(|m| m.as_str().parse::<DocId>().ok()) else {
            tracing::warn!(file = %name, "page without a document number");
            continue;
        };
        let bytes = fs::read(entry.path()).with_context(|| format!("reading {}", entry.path().display()))?;
        let html = String::from_utf8_lossy(&bytes);
        for target in linked_documents(&html, page_urls.get(&source), &by_url) {
            graph.add_link(source, target);
        }
    }
    tracing::info!(nodes = graph.num_nodes(), "built link graph");
    Ok(graph)
}
