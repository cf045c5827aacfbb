//! Plain-text snapshot files: locating, reading and writing them.
//!
//! Readers skip malformed lines with a warning. Failing to open a required
//! file is a [`LoadError`].

use crate::authority::LinkGraph;
use crate::index::IndexStore;
use crate::vector::{LemmaTable, SpaceAccumulator, SpaceIndex, VectorSpaceModel, WeightRecord};
use crate::{DocId, DocMeta, LoadError, Space};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, create_dir_all, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn inverted_index(&self) -> PathBuf { self.root.join("inverted_index.txt") }
    pub fn documents(&self) -> PathBuf { self.root.join("index.txt") }
    pub fn links(&self) -> PathBuf { self.root.join("links.txt") }
    pub fn lemma_map(&self) -> PathBuf { self.root.join("lemma_map.txt") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn weights_dir(&self) -> PathBuf { self.root.join("weights") }
    pub fn weights_file(&self, space: Space, doc_id: DocId) -> PathBuf {
        self.weights_dir().join(format!("{}{}.txt", space.weights_prefix(), doc_id))
    }
}

fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path).map(BufReader::new).map_err(|e| LoadError::io(path, e))
}

fn create(path: &Path) -> Result<BufWriter<File>, LoadError> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir).map_err(|e| LoadError::io(dir, e))?;
    }
    File::create(path).map(BufWriter::new).map_err(|e| LoadError::io(path, e))
}

pub fn load_index(paths: &IndexPaths) -> Result<IndexStore, LoadError> {
    let path = paths.inverted_index();
    IndexStore::from_reader(open(&path)?).map_err(|e| LoadError::io(&path, e))
}

pub fn save_index(paths: &IndexPaths, index: &IndexStore) -> Result<(), LoadError> {
    let path = paths.inverted_index();
    index.write_snapshot(create(&path)?).map_err(|e| LoadError::io(&path, e))
}

/// `token lemma lemma ...`; a later line for the same token replaces the earlier one.
pub fn parse_lemma_table<R: BufRead>(reader: R) -> io::Result<LemmaTable> {
    let mut table = LemmaTable::new();
    for line in reader.lines() {
        let line = line?;
        let mut parts = line.split_whitespace().map(str::to_lowercase);
        let Some(token) = parts.next() else { continue };
        let lemmas: Vec<String> = parts.collect();
        if lemmas.is_empty() {
            tracing::warn!(record = %line, "skipping lemma record without lemmas");
            continue;
        }
        table.insert(token, lemmas);
    }
    Ok(table)
}

pub fn load_lemma_table(paths: &IndexPaths) -> Result<LemmaTable, LoadError> {
    let path = paths.lemma_map();
    let table = parse_lemma_table(open(&path)?).map_err(|e| LoadError::io(&path, e))?;
    tracing::info!(tokens = table.len(), "loaded lemma table");
    Ok(table)
}

pub fn save_lemma_table(paths: &IndexPaths, table: &LemmaTable) -> Result<(), LoadError> {
    let path = paths.lemma_map();
    let sorted: BTreeMap<&String, &Vec<String>> = table.iter().collect();
    let mut out = create(&path)?;
    let written: io::Result<()> = sorted
        .into_iter()
        .try_for_each(|(token, lemmas)| writeln!(out, "{} {}", token, lemmas.join(" ")))
        .and_then(|_| out.flush());
    written.map_err(|e| LoadError::io(&path, e))
}

/// `term idf tfidf` records of one weight file. Extra fields are ignored.
pub fn parse_weight_records<R: BufRead>(reader: R) -> io::Result<Vec<WeightRecord>> {
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() { continue; }
        let parsed = match parts.as_slice() {
            [term, idf, tfidf, ..] => match (idf.parse::<f64>(), tfidf.parse::<f64>()) {
                (Ok(idf), Ok(tfidf)) if idf.is_finite() && tfidf.is_finite() => {
                    Some(WeightRecord { term: term.to_lowercase(), idf, tfidf })
                }
                _ => None,
            },
            _ => None,
        };
        match parsed {
            Some(record) => records.push(record),
            None => tracing::warn!(record = %line, "skipping malformed weight record"),
        }
    }
    Ok(records)
}

/// `term idf tfidf` with four fractional digits.
pub fn format_weight_record(term: &str, idf: f64, tfidf: f64) -> String {
    format!("{term} {idf:.4} {tfidf:.4}")
}

pub fn save_weights(paths: &IndexPaths, space: Space, doc_id: DocId, records: &[WeightRecord]) -> Result<(), LoadError> {
    let path = paths.weights_file(space, doc_id);
    let mut out = create(&path)?;
    let written: io::Result<()> = records
        .iter()
        .try_for_each(|r| writeln!(out, "{}", format_weight_record(&r.term, r.idf, r.tfidf)))
        .and_then(|_| out.flush());
    written.map_err(|e| LoadError::io(&path, e))
}

fn weight_files(paths: &IndexPaths, space: Space) -> Result<Vec<(DocId, PathBuf)>, LoadError> {
    let dir = paths.weights_dir();
    let prefix = space.weights_prefix();
    let mut files = Vec::new();
    for entry in fs::read_dir(&dir).map_err(|e| LoadError::io(&dir, e))? {
        let entry = entry.map_err(|e| LoadError::io(&dir, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(id) = name.strip_prefix(prefix).and_then(|rest| rest.strip_suffix(".txt")) else { continue };
        match id.parse::<DocId>() {
            Ok(doc_id) => files.push((doc_id, entry.path())),
            Err(_) => tracing::warn!(file = %name, "skipping weight file without a numeric document id"),
        }
    }
    files.sort_by_key(|(doc_id, _)| *doc_id);
    Ok(files)
}

/// Parse weight files on a pool of scoped workers. Results come back sorted by document id.
fn read_weight_files(files: &[(DocId, PathBuf)]) -> Result<Vec<(DocId, Vec<WeightRecord>)>, LoadError> {
    let workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(files.len()).max(1);
    let next = AtomicUsize::new(0);
    let parsed: Mutex<Vec<(DocId, Vec<WeightRecord>)>> = Mutex::new(Vec::with_capacity(files.len()));
    let failure: Mutex<Option<LoadError>> = Mutex::new(None);

    thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                let Some((doc_id, path)) = files.get(next.fetch_add(1, Ordering::Relaxed)) else { break };
                let records = open(path).and_then(|r| parse_weight_records(r).map_err(|e| LoadError::io(path, e)));
                match records {
                    Ok(records) => parsed.lock().push((*doc_id, records)),
                    Err(e) => {
                        failure.lock().get_or_insert(e);
                        break;
                    }
                }
            });
        }
    });

    if let Some(e) = failure.into_inner() {
        return Err(e);
    }
    let mut parsed = parsed.into_inner();
    parsed.sort_by_key(|(doc_id, _)| *doc_id);
    Ok(parsed)
}

pub fn load_space(paths: &IndexPaths, space: Space) -> Result<SpaceIndex, LoadError> {
    let files = weight_files(paths, space)?;
    let mut acc = SpaceAccumulator::new();
    for (doc_id, records) in read_weight_files(&files)? {
        acc.add_document(doc_id, records);
    }
    let index = acc.freeze();
    tracing::info!(?space, docs = index.num_docs(), "loaded term space");
    Ok(index)
}

pub fn load_model(paths: &IndexPaths) -> Result<VectorSpaceModel, LoadError> {
    let lemma_table = load_lemma_table(paths)?;
    let tokens = load_space(paths, Space::Token)?;
    let lemmas = load_space(paths, Space::Lemma)?;
    Ok(VectorSpaceModel::new(tokens, lemmas, lemma_table))
}

/// `id url` records, one per document.
pub fn parse_documents<R: BufRead>(reader: R) -> io::Result<Vec<DocMeta>> {
    let mut docs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        match (parts.next().map(str::parse::<DocId>), parts.next()) {
            (Some(Ok(doc_id)), Some(url)) => docs.push(DocMeta { doc_id, url: url.to_string() }),
            (None, _) => {}
            _ => tracing::warn!(record = %line, "skipping malformed document record"),
        }
    }
    Ok(docs)
}

pub fn load_documents_from(path: &Path) -> Result<Vec<DocMeta>, LoadError> {
    parse_documents(open(path)?).map_err(|e| LoadError::io(path, e))
}

/// The link graph with every document of `index.txt` as a node, or `None`
/// when the snapshot has no `links.txt`.
pub fn load_link_graph(paths: &IndexPaths) -> Result<Option<LinkGraph>, LoadError> {
    let path = paths.links();
    if !path.exists() {
        tracing::warn!(path = %path.display(), "no link graph, authority disabled");
        return Ok(None);
    }
    let mut graph = LinkGraph::from_reader(open(&path)?).map_err(|e| LoadError::io(&path, e))?;
    let docs_path = paths.documents();
    if docs_path.exists() {
        for doc in load_documents_from(&docs_path)? {
            graph.add_node(doc.doc_id);
        }
    }
    Ok(Some(graph))
}

pub fn save_link_graph(paths: &IndexPaths, graph: &LinkGraph) -> Result<(), LoadError> {
    let path = paths.links();
    let mut out = create(&path)?;
    let written: io::Result<()> = graph
        .nodes()
        .try_for_each(|doc| {
            let refs: Vec<String> = graph.referrers(doc).map(|r| r.to_string()).collect();
            writeln!(out, "{}:{}", doc, refs.join(","))
        })
        .and_then(|_| out.flush());
    written.map_err(|e| LoadError::io(&path, e))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<(), LoadError> {
    let path = paths.meta();
    let mut out = create(&path)?;
    serde_json::to_writer_pretty(&mut out, meta)?;
    out.flush().map_err(|e| LoadError::io(&path, e))
}

/// The manifest, if the snapshot has one.
pub fn load_meta(paths: &IndexPaths) -> Result<Option<MetaFile>, LoadError> {
    let path = paths.meta();
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_reader(open(&path)?)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_records_skip_short_and_non_numeric_lines() {
        let text = "Cat 0.6931 0.1386\ndog 1.0\nbird x 0.2\n\nfish 0.1 0.2 extra\n";
        let records = parse_weight_records(text.as_bytes()).unwrap();
        let terms: Vec<&str> = records.iter().map(|r| r.term.as_str()).collect();
        assert_eq!(terms, vec!["cat", "fish"]);
        assert_eq!(records[0].idf, 0.6931);
    }

    #[test]
    fn weight_record_format_has_four_digits() {
        assert_eq!(format_weight_record("cat", 0.693147, 0.1), "cat 0.6931 0.1000");
    }

    #[test]
    fn lemma_table_lowercases_and_keeps_order() {
        let table = parse_lemma_table("Running run running\nmice mouse\nlonely\n".as_bytes()).unwrap();
        assert_eq!(table["running"], vec!["run", "running"]);
        assert_eq!(table["mice"], vec!["mouse"]);
        assert!(!table.contains_key("lonely"));
    }

    #[test]
    fn documents_parse_id_and_url() {
        let docs = parse_documents("1 http://a/x\nbad http://b\n\n2 http://a/y\n".as_bytes()).unwrap();
        assert_eq!(docs, vec![
            DocMeta { doc_id: 1, url: "http://a/x".into() },
            DocMeta { doc_id: 2, url: "http://a/y".into() },
        ]);
    }
}
