//! Offline weight computation over a tokenized corpus.
//!
//! A corpus directory holds, per document `id`, `tokens{id}.txt` (one token
//! per line) and `lemmas{id}.txt` (`lemma token token ...`).

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use retrieval::index::IndexStore;
use retrieval::vector::{LemmaTable, WeightRecord};
use retrieval::DocId;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

lazy_static! {
    static ref CORPUS_FILE: Regex = Regex::new(r"^(tokens|lemmas)(\d+)\.txt$").expect("valid regex");
}

#[derive(Debug, Default, Clone)]
pub struct CorpusDoc {
    /// Token occurrences in file order; `None` when the document has no tokens file.
    pub tokens: Option<Vec<String>>,
    /// Lemma to the surface tokens it was produced from.
    pub lemmas: Option<Vec<(String, Vec<String>)>>,
}

pub type Corpus = BTreeMap<DocId, CorpusDoc>;

pub fn read_corpus(dir: &Path) -> Result<Corpus> {
    let mut corpus = Corpus::new();
    for entry in WalkDir::new(dir).max_depth(1).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() { continue; }
        let name = entry.file_name().to_string_lossy();
        let Some(caps) = CORPUS_FILE.captures(&name) else { continue };
        let Ok(doc_id) = caps[2].parse::<DocId>() else {
            tracing::warn!(file = %name, "document id out of range");
            continue;
        };
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let doc = corpus.entry(doc_id).or_default();
        if &caps[1] == "tokens" {
            doc.tokens = Some(parse_tokens(&text));
        } else {
            doc.lemmas = Some(parse_lemmas(&text));
        }
    }
    tracing::info!(docs = corpus.len(), dir = %dir.display(), "read corpus");
    Ok(corpus)
}

fn parse_tokens(text: &str) -> Vec<String> {
    text.lines().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}

fn parse_lemmas(text: &str) -> Vec<(String, Vec<String>)> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let lemma = parts.next()?.to_string();
            Some((lemma, parts.map(str::to_string).collect()))
        })
        .collect()
}

/// Lowercased lemma to the documents whose lemma file lists it.
pub fn build_inverted_index(corpus: &Corpus) -> IndexStore {
    let mut postings: BTreeMap<String, BTreeSet<DocId>> = BTreeMap::new();
    for (doc_id, doc) in corpus {
        for (lemma, _) in doc.lemmas.iter().flatten() {
            postings.entry(lemma.to_lowercase()).or_default().insert(*doc_id);
        }
    }
    let mut index = IndexStore::new();
    for (lemma, docs) in postings {
        index.insert(lemma, docs);
    }
    index
}

/// Surface token to every lemma produced from it, sorted.
pub fn build_lemma_table(corpus: &Corpus) -> LemmaTable {
    let mut table: HashMap<String, BTreeSet<String>> = HashMap::new();
    for doc in corpus.values() {
        for (lemma, tokens) in doc.lemmas.iter().flatten() {
            for token in tokens {
                table.entry(token.to_lowercase()).or_default().insert(lemma.to_lowercase());
            }
        }
    }
    table.into_iter().map(|(token, lemmas)| (token, lemmas.into_iter().collect())).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocWeights {
    pub doc_id: DocId,
    pub tokens: Vec<WeightRecord>,
    pub lemmas: Option<Vec<WeightRecord>>,
}

fn idf(total_docs: usize, df: Option<&usize>) -> f64 {
    (total_docs as f64 / *df.unwrap_or(&1) as f64).ln()
}

/// `tf = count / total tokens`, `idf = ln(N / df)` with `N` the number of
/// tokenized documents. A lemma's count is the summed count of its tokens.
pub fn compute_weights(corpus: &Corpus) -> Vec<DocWeights> {
    let total_docs = corpus.values().filter(|d| d.tokens.is_some()).count();
    let mut token_df: HashMap<&str, usize> = HashMap::new();
    let mut lemma_df: HashMap<&str, usize> = HashMap::new();
    for doc in corpus.values() {
        let unique: BTreeSet<&str> = doc.tokens.iter().flatten().map(String::as_str).collect();
        for token in unique {
            *token_df.entry(token).or_insert(0) += 1;
        }
        let unique: BTreeSet<&str> = doc.lemmas.iter().flatten().map(|(l, _)| l.as_str()).collect();
        for lemma in unique {
            *lemma_df.entry(lemma).or_insert(0) += 1;
        }
    }

    let mut out = Vec::new();
    for (doc_id, doc) in corpus {
        let Some(tokens) = &doc.tokens else { continue };
        if tokens.is_empty() {
            tracing::warn!(doc_id, "skipping document without tokens");
            continue;
        }
        let total = tokens.len() as f64;
        let mut freq: BTreeMap<&str, usize> = BTreeMap::new();
        for token in tokens {
            *freq.entry(token.as_str()).or_insert(0) += 1;
        }
        let token_records = freq
            .iter()
            .map(|(token, count)| {
                let idf = idf(total_docs, token_df.get(token));
                WeightRecord { term: token.to_string(), idf, tfidf: *count as f64 / total * idf }
            })
            .collect();
        let lemma_records = doc.lemmas.as_ref().map(|lemmas| {
            let mut tf: BTreeMap<&str, f64> = BTreeMap::new();
            for (lemma, sources) in lemmas {
                let count: usize = sources.iter().map(|t| freq.get(t.as_str()).copied().unwrap_or(0)).sum();
                tf.insert(lemma.as_str(), count as f64 / total);
            }
            tf.into_iter()
                .map(|(lemma, tf)| {
                    let idf = idf(total_docs, lemma_df.get(lemma));
                    WeightRecord { term: lemma.to_string(), idf, tfidf: tf * idf }
                })
                .collect()
        });
        out.push(DocWeights { doc_id: *doc_id, tokens: token_records, lemmas: lemma_records });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn corpus() -> Corpus {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("tokens1.txt"), "cats\nrunning\ncats\n").unwrap();
        fs::write(dir.path().join("lemmas1.txt"), "cat cats\nrun running\n").unwrap();
        fs::write(dir.path().join("tokens2.txt"), "cat\ndog\n").unwrap();
        fs::write(dir.path().join("lemmas2.txt"), "cat cat\ndog dog\n").unwrap();
        fs::write(dir.path().join("page1.html"), "<html></html>").unwrap();
        read_corpus(dir.path()).unwrap()
    }

    #[test]
    fn reads_both_file_kinds() {
        let c = corpus();
        assert_eq!(c.len(), 2);
        assert_eq!(c[&1].tokens.as_ref().unwrap().len(), 3);
        assert_eq!(c[&2].lemmas.as_ref().unwrap()[1], ("dog".to_string(), vec!["dog".to_string()]));
    }

    #[test]
    fn inverted_index_maps_lemmas_to_documents() {
        let index = build_inverted_index(&corpus());
        assert_eq!(index.postings_for("cat"), BTreeSet::from([1, 2]));
        assert_eq!(index.postings_for("run"), BTreeSet::from([1]));
        assert!(index.postings_for("cats").is_empty());
    }

    #[test]
    fn inverted_index_lowercases_lemmas() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lemmas4.txt"), "Paris Paris\nCAT cats\n").unwrap();
        fs::write(dir.path().join("lemmas5.txt"), "cat cat\n").unwrap();
        let index = build_inverted_index(&read_corpus(dir.path()).unwrap());
        assert_eq!(index.postings_for("paris"), BTreeSet::from([4]));
        assert_eq!(index.postings_for("cat"), BTreeSet::from([4, 5]));
        assert!(index.postings("CAT").is_none());
    }

    #[test]
    fn lemma_table_inverts_lemma_files() {
        let table = build_lemma_table(&corpus());
        assert_eq!(table["cats"], vec!["cat"]);
        assert_eq!(table["running"], vec!["run"]);
    }

    #[test]
    fn weights_follow_relative_tf_and_log_idf() {
        let weights = compute_weights(&corpus());
        let doc1 = &weights[0];
        assert_eq!(doc1.doc_id, 1);
        let cats = doc1.tokens.iter().find(|r| r.term == "cats").unwrap();
        assert!((cats.idf - 2f64.ln()).abs() < 1e-12);
        assert!((cats.tfidf - 2.0 / 3.0 * 2f64.ln()).abs() < 1e-12);
        // "cat" is a lemma of both documents
        let lemmas = doc1.lemmas.as_ref().unwrap();
        let cat = lemmas.iter().find(|r| r.term == "cat").unwrap();
        assert_eq!(cat.idf, 0.0);
        let run = lemmas.iter().find(|r| r.term == "run").unwrap();
        assert!((run.tfidf - 1.0 / 3.0 * 2f64.ln()).abs() < 1e-12);
    }
}
