//! Static, query-independent authority scores used to break ranking ties.

use crate::config::AuthorityConfig;
use crate::DocId;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{self, BufRead};

/// Document to the set of documents that link to it.
#[derive(Debug, Default, Clone)]
pub struct LinkGraph {
    referrers: BTreeMap<DocId, BTreeSet<DocId>>,
}

impl LinkGraph {
    pub fn new() -> Self { Self::default() }

    /// Read `id:ref,ref,...` records; `id:` declares a node nobody links to.
    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut graph = Self::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() { continue; }
            match parse_links(line) {
                Some((doc, refs)) => {
                    for r in refs {
                        graph.add_link(r, doc);
                    }
                    graph.add_node(doc);
                }
                None => tracing::warn!(line = lineno + 1, record = %line, "skipping malformed link record"),
            }
        }
        tracing::info!(nodes = graph.num_nodes(), "loaded link graph");
        Ok(graph)
    }

    pub fn add_node(&mut self, doc: DocId) {
        self.referrers.entry(doc).or_default();
    }

    /// Record that `from` links to `to`. Self links are ignored.
    pub fn add_link(&mut self, from: DocId, to: DocId) {
        self.add_node(from);
        if from != to {
            self.referrers.entry(to).or_default().insert(from);
        }
    }

    pub fn referrers(&self, doc: DocId) -> impl Iterator<Item = DocId> + '_ {
        self.referrers.get(&doc).into_iter().flatten().copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = DocId> + '_ { self.referrers.keys().copied() }

    pub fn num_nodes(&self) -> usize { self.referrers.len() }

    /// Number of documents each document links to.
    pub fn out_degrees(&self) -> HashMap<DocId, usize> {
        let mut out: HashMap<DocId, usize> = HashMap::new();
        for refs in self.referrers.values() {
            for r in refs {
                *out.entry(*r).or_insert(0) += 1;
            }
        }
        out
    }
}

fn parse_links(line: &str) -> Option<(DocId, Vec<DocId>)> {
    let (doc, refs) = line.split_once(':')?;
    let doc = doc.trim().parse().ok()?;
    let refs = refs
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| r.parse().ok())
        .collect::<Option<Vec<DocId>>>()?;
    Some((doc, refs))
}

#[derive(Debug, Default, Clone)]
pub struct AuthorityScores {
    scores: HashMap<DocId, f64>,
}

impl AuthorityScores {
    pub fn from_scores(scores: HashMap<DocId, f64>) -> Self { Self { scores } }

    /// Number of inbound links per document.
    pub fn from_link_counts(graph: &LinkGraph) -> Self {
        let scores = graph.nodes().map(|d| (d, graph.referrers(d).count() as f64)).collect();
        Self { scores }
    }

    /// Fixed-iteration PageRank without a convergence test.
    ///
    /// Every iteration reads only the previous iteration's scores. Documents
    /// not yet scored read as `initial_score`; referrers with no outbound
    /// links are skipped.
    pub fn pagerank(graph: &LinkGraph, config: &AuthorityConfig) -> Self {
        let n = graph.num_nodes().max(1) as f64;
        let out = graph.out_degrees();
        let teleport = (1.0 - config.damping) / n;
        let mut scores: HashMap<DocId, f64> = HashMap::new();
        for _ in 0..config.iterations {
            let next: HashMap<DocId, f64> = graph
                .nodes()
                .map(|doc| {
                    let inbound: f64 = graph
                        .referrers(doc)
                        .filter_map(|r| match out.get(&r) {
                            Some(&deg) if deg > 0 => {
                                Some(scores.get(&r).copied().unwrap_or(config.initial_score) / deg as f64)
                            }
                            _ => None,
                        })
                        .sum();
                    (doc, teleport + config.damping * inbound)
                })
                .collect();
            scores = next;
        }
        tracing::info!(nodes = graph.num_nodes(), iterations = config.iterations, "computed pagerank");
        Self { scores }
    }

    /// Authority of `doc`, 0 for unknown documents.
    pub fn authority_of(&self, doc: DocId) -> f64 {
        self.scores.get(&doc).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize { self.scores.len() }

    pub fn is_empty(&self) -> bool { self.scores.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(text: &str) -> LinkGraph {
        LinkGraph::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn parses_referrers_and_out_degrees() {
        let g = graph("1:2,3\n2:3\n3:\nbroken\n");
        assert_eq!(g.referrers(1).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(g.referrers(3).count(), 0);
        let out = g.out_degrees();
        assert_eq!(out[&3], 2);
        assert_eq!(out[&2], 1);
        assert!(!out.contains_key(&1));
    }

    #[test]
    fn self_links_are_ignored() {
        let g = graph("1:1,2\n");
        assert_eq!(g.referrers(1).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn link_counts() {
        let a = AuthorityScores::from_link_counts(&graph("1:2,3\n2:3\n3:\n"));
        assert_eq!(a.authority_of(1), 2.0);
        assert_eq!(a.authority_of(2), 1.0);
        assert_eq!(a.authority_of(3), 0.0);
        assert_eq!(a.authority_of(42), 0.0);
    }

    #[test]
    fn undamped_first_iteration_reads_initial_scores() {
        let config = AuthorityConfig { damping: 1.0, iterations: 1, initial_score: 0.01 };
        let a = AuthorityScores::pagerank(&graph("1:2,3\n2:3\n3:\n"), &config);
        // 3 links to 1 and 2, 2 links to 1
        assert!((a.authority_of(1) - (0.01 / 1.0 + 0.01 / 2.0)).abs() < 1e-12);
        assert!((a.authority_of(2) - 0.01 / 2.0).abs() < 1e-12);
        assert_eq!(a.authority_of(3), 0.0);
    }

    #[test]
    fn pagerank_favours_well_linked_documents() {
        let a = AuthorityScores::pagerank(&graph("1:2,3,4\n2:1\n3:1\n4:\n"), &AuthorityConfig::default());
        assert_eq!(a.len(), 4);
        assert!(a.authority_of(1) > a.authority_of(2));
        assert!(a.authority_of(2) > a.authority_of(4));
        assert!((0..=4).all(|d| a.authority_of(d) >= 0.0));
    }
}
