use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use retrieval::persist::{load_documents_from, save_index, save_lemma_table, save_link_graph, save_meta, save_weights, IndexPaths, MetaFile};
use retrieval::Space;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

mod corpus;
mod links;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build search snapshots from a tokenized corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the lemma inverted index used by boolean search
    BuildIndex {
        /// Directory with lemmas{id}.txt files
        #[arg(long)]
        corpus: PathBuf,
        /// Output snapshot directory
        #[arg(long)]
        output: PathBuf,
    },
    /// Write per-document TF-IDF weights, the lemma table and the manifest
    Tfidf {
        /// Directory with tokens{id}.txt and lemmas{id}.txt files
        #[arg(long)]
        corpus: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Write the link graph used for authority scores
    Links {
        /// Directory of downloaded pages, one file per document
        #[arg(long)]
        pages: PathBuf,
        /// `id url` document list
        #[arg(long)]
        metadata: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::BuildIndex { corpus, output } => build_index(&corpus, &output),
        Commands::Tfidf { corpus, output } => write_weights(&corpus, &output),
        Commands::Links { pages, metadata, output } => write_links(&pages, &metadata, &output),
    }
}

fn build_index(input: &Path, output: &Path) -> Result<()> {
    let corpus = corpus::read_corpus(input)?;
    let index = corpus::build_inverted_index(&corpus);
    save_index(&IndexPaths::new(output), &index)?;
    tracing::info!(terms = index.num_terms(), docs = index.document_universe().len(), "inverted index written");
    Ok(())
}

fn write_weights(input: &Path, output: &Path) -> Result<()> {
    let paths = IndexPaths::new(output);
    let corpus = corpus::read_corpus(input)?;
    let weights = corpus::compute_weights(&corpus);
    for doc in &weights {
        save_weights(&paths, Space::Token, doc.doc_id, &doc.tokens)?;
        if let Some(lemmas) = &doc.lemmas {
            save_weights(&paths, Space::Lemma, doc.doc_id, lemmas)?;
        }
    }
    save_lemma_table(&paths, &corpus::build_lemma_table(&corpus))?;

    let meta = MetaFile {
        num_docs: weights.len() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        version: SNAPSHOT_VERSION,
    };
    save_meta(&paths, &meta)?;
    tracing::info!(docs = weights.len(), output = %output.display(), "weights written");
    Ok(())
}

fn write_links(pages: &Path, metadata: &Path, output: &Path) -> Result<()> {
    let docs = load_documents_from(metadata).with_context(|| format!("reading document list {}", metadata.display()))?;
    let graph = links::build_link_graph(pages, &docs)?;
    let paths = IndexPaths::new(output);
    save_link_graph(&paths, &graph)?;
    // queries read the document list from the snapshot itself
    if fs::canonicalize(metadata).ok() != fs::canonicalize(paths.documents()).ok() {
        fs::copy(metadata, paths.documents()).with_context(|| format!("copying {}", metadata.display()))?;
    }
    Ok(())
}
