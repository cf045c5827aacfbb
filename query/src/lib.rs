use anyhow::{Context, Result};
use clap::ValueEnum;
use retrieval::authority::AuthorityScores;
use retrieval::boolean::BooleanEvaluator;
use retrieval::config::AuthorityConfig;
use retrieval::index::IndexStore;
use retrieval::persist::{load_index, load_link_graph, load_meta, load_model, IndexPaths};
use retrieval::ranking::{RankingEngine, ScoredResult};
use retrieval::Space;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

const BOOLEAN_EXIT: &str = "exit";
const RANKED_EXIT: &str = "q";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchSpace {
    Token,
    Lemma,
    /// Equal-weight fusion of token and lemma scores
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthorityMode {
    Pagerank,
    Links,
    None,
}

pub fn load_boolean_index(data_dir: &Path) -> Result<IndexStore> {
    let paths = IndexPaths::new(data_dir);
    load_index(&paths).with_context(|| format!("loading inverted index from {}", data_dir.display()))
}

pub fn load_authority(paths: &IndexPaths, mode: AuthorityMode) -> Result<Option<AuthorityScores>> {
    if mode == AuthorityMode::None {
        return Ok(None);
    }
    let Some(graph) = load_link_graph(paths)? else { return Ok(None) };
    Ok(Some(match mode {
        AuthorityMode::Links => AuthorityScores::from_link_counts(&graph),
        _ => AuthorityScores::pagerank(&graph, &AuthorityConfig::default()),
    }))
}

/// Load the vector model and, unless disabled, the authority scores.
pub fn build_engine(data_dir: &Path, mode: AuthorityMode) -> Result<RankingEngine> {
    let paths = IndexPaths::new(data_dir);
    if let Some(meta) = load_meta(&paths)? {
        tracing::info!(num_docs = meta.num_docs, created_at = %meta.created_at, version = meta.version, "snapshot manifest");
    }
    let model = load_model(&paths).with_context(|| format!("loading term vectors from {}", data_dir.display()))?;
    let engine = RankingEngine::new(Arc::new(model));
    Ok(match load_authority(&paths, mode)? {
        Some(authority) => engine.with_authority(Arc::new(authority)),
        None => engine,
    })
}

/// Prompt and read one line; `None` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<Option<String>> {
    write!(out, "Query> ")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(out)?;
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub fn run_boolean_session<R: BufRead, W: Write>(index: &IndexStore, mut input: R, mut out: W) -> io::Result<()> {
    let evaluator = BooleanEvaluator::new(index);
    writeln!(out, "Boolean Search (AND/OR/NOT, use parentheses)")?;
    while let Some(query) = prompt(&mut input, &mut out)? {
        if query.eq_ignore_ascii_case(BOOLEAN_EXIT) {
            break;
        }
        match evaluator.evaluate(&query) {
            Ok(docs) => {
                let ids: Vec<String> = docs.iter().map(|d| d.to_string()).collect();
                writeln!(out, "Results: {}", ids.join(", "))?;
            }
            Err(e) => writeln!(out, "Error: {e}")?,
        }
    }
    Ok(())
}

pub fn ranked_search(engine: &RankingEngine, space: SearchSpace, query: &str, top_k: usize) -> Vec<ScoredResult> {
    match space {
        SearchSpace::Token => engine.search(query, Space::Token, top_k),
        SearchSpace::Lemma => engine.search(query, Space::Lemma, top_k),
        SearchSpace::Both => engine.search_fused(query, top_k),
    }
}

pub fn run_ranked_session<R: BufRead, W: Write>(
    engine: &RankingEngine,
    space: SearchSpace,
    top_k: usize,
    mut input: R,
    mut out: W,
) -> io::Result<()> {
    writeln!(out, "Enter a query ({RANKED_EXIT} to quit)")?;
    while let Some(query) = prompt(&mut input, &mut out)? {
        if query == RANKED_EXIT {
            break;
        }
        writeln!(out, "Results for '{query}':")?;
        for hit in ranked_search(engine, space, &query, top_k) {
            writeln!(out, "{} ({:.4})", hit.doc_id, hit.score)?;
        }
    }
    Ok(())
}
