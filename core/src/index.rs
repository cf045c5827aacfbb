use crate::DocId;
use std::collections::{BTreeSet, HashMap};
use std::io::{self, BufRead, Write};

/// Term to posting list, plus the universe of every identifier seen.
///
/// Built once from an `inverted_index.txt` snapshot and read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct IndexStore {
    postings: HashMap<String, BTreeSet<DocId>>,
    universe: BTreeSet<DocId>,
}

impl IndexStore {
    pub fn new() -> Self { Self::default() }

    /// Read `term:id,id,...` records. Malformed lines are logged and skipped;
    /// a repeated term replaces the earlier posting list.
    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut store = Self::new();
        let mut skipped = 0usize;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            match parse_record(&line) {
                Some((term, docs)) => store.insert(term, docs),
                None => {
                    skipped += 1;
                    tracing::warn!(line = lineno + 1, record = %line, "skipping malformed index record");
                }
            }
        }
        tracing::info!(terms = store.postings.len(), docs = store.universe.len(), skipped, "loaded inverted index");
        Ok(store)
    }

    pub fn insert(&mut self, term: String, docs: BTreeSet<DocId>) {
        self.universe.extend(docs.iter().copied());
        self.postings.insert(term, docs);
    }

    /// Posting list of `term`; unknown terms yield the empty set.
    pub fn postings_for(&self, term: &str) -> BTreeSet<DocId> {
        self.postings.get(term).cloned().unwrap_or_default()
    }

    pub fn postings(&self, term: &str) -> Option<&BTreeSet<DocId>> {
        self.postings.get(term)
    }

    pub fn document_universe(&self) -> &BTreeSet<DocId> { &self.universe }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    /// Write the store in snapshot format, terms sorted so output is stable.
    pub fn write_snapshot<W: Write>(&self, mut out: W) -> io::Result<()> {
        let mut terms: Vec<&String> = self.postings.keys().collect();
        terms.sort();
        for term in terms {
            let ids: Vec<String> = self.postings[term].iter().map(|d| d.to_string()).collect();
            writeln!(out, "{}:{}", term, ids.join(","))?;
        }
        out.flush()
    }
}

fn parse_record(line: &str) -> Option<(String, BTreeSet<DocId>)> {
    let (term, ids) = line.split_once(':')?;
    if term.is_empty() || ids.contains(':') { return None; }
    let docs = ids
        .split(',')
        .map(|id| id.trim().parse::<DocId>().ok())
        .collect::<Option<BTreeSet<DocId>>>()?;
    Some((term.to_string(), docs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(text: &str) -> IndexStore {
        IndexStore::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn unknown_term_is_empty() {
        let s = store("cat:1,2,3\n");
        assert!(s.postings_for("dog").is_empty());
        assert!(s.postings("dog").is_none());
    }

    #[test]
    fn universe_is_union_of_postings() {
        let s = store("cat:1,2,3\ndog:2,4\n");
        assert_eq!(s.document_universe().iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(s.postings_for("dog"), BTreeSet::from([2, 4]));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let s = store("cat:1,2\nno colon here\nbad:1,x\ntoo:many:fields\n:5\ndog:4\n");
        assert_eq!(s.num_terms(), 2);
        assert_eq!(s.postings_for("cat"), BTreeSet::from([1, 2]));
        assert!(!s.document_universe().contains(&5));
    }

    #[test]
    fn repeated_term_overwrites() {
        let s = store("cat:1,2\ncat:3\n");
        assert_eq!(s.postings_for("cat"), BTreeSet::from([3]));
    }

    #[test]
    fn snapshot_is_sorted() {
        let s = store("zebra:9,1\napple:3\n");
        let mut out = Vec::new();
        s.write_snapshot(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "apple:3\nzebra:1,9\n");
    }
}
