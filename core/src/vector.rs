//! Sparse TF-IDF vectors for the token and lemma term spaces.

use crate::tokenizer::tokenize;
use crate::{DocId, Space};
use std::collections::{BTreeMap, HashMap};

/// Sparse term to weight map; absent terms weigh 0.
///
/// Terms are kept ordered so two vectors with the same entries always sum
/// their products in the same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    weights: BTreeMap<String, f64>,
}

impl TermVector {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, term: impl Into<String>, weight: f64) {
        self.weights.insert(term.into(), weight);
    }

    pub fn weight(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize { self.weights.len() }

    pub fn is_empty(&self) -> bool { self.weights.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(t, w)| (t.as_str(), *w))
    }

    pub fn norm(&self) -> f64 {
        self.weights.values().map(|w| w * w).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &TermVector) -> f64 {
        let (small, large) = if self.len() <= other.len() { (self, other) } else { (other, self) };
        small.iter().map(|(t, w)| w * large.weight(t)).sum()
    }
}

impl FromIterator<(String, f64)> for TermVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self { weights: iter.into_iter().collect() }
    }
}

/// `dot(a, b) / (|a| * |b| + epsilon)`; 0 when either side is empty.
pub fn cosine_similarity(a: &TermVector, b: &TermVector, epsilon: f64) -> f64 {
    a.dot(b) / (a.norm() * b.norm() + epsilon)
}

/// Frozen document vectors and global IDF table of one term space.
#[derive(Debug, Default, Clone)]
pub struct SpaceIndex {
    vectors: HashMap<DocId, TermVector>,
    idf: HashMap<String, f64>,
}

impl SpaceIndex {
    pub fn num_docs(&self) -> usize { self.vectors.len() }
}

/// One parsed `term idf tfidf` record.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightRecord {
    pub term: String,
    pub idf: f64,
    pub tfidf: f64,
}

/// Collects documents of one space during load, then freezes into a [`SpaceIndex`].
#[derive(Debug, Default)]
pub struct SpaceAccumulator {
    vectors: HashMap<DocId, TermVector>,
    idf: HashMap<String, f64>,
}

impl SpaceAccumulator {
    pub fn new() -> Self { Self::default() }

    /// The first IDF seen for a term is kept; IDF is corpus-global.
    pub fn add_document(&mut self, doc_id: DocId, records: Vec<WeightRecord>) {
        let mut vector = TermVector::new();
        for record in records {
            self.idf.entry(record.term.clone()).or_insert(record.idf);
            vector.insert(record.term, record.tfidf);
        }
        self.vectors.insert(doc_id, vector);
    }

    pub fn freeze(self) -> SpaceIndex {
        SpaceIndex { vectors: self.vectors, idf: self.idf }
    }
}

/// Surface token to the lemmas it expands to, in file order.
pub type LemmaTable = HashMap<String, Vec<String>>;

/// What the ranking engine needs from a term space.
pub trait TermSpace {
    fn vectorize(&self, query: &str) -> TermVector;
    fn document_vectors(&self) -> &HashMap<DocId, TermVector>;
    fn idf_table(&self) -> &HashMap<String, f64>;
}

/// Both term spaces plus the lemma expansion table.
#[derive(Debug, Default, Clone)]
pub struct VectorSpaceModel {
    tokens: SpaceIndex,
    lemmas: SpaceIndex,
    lemma_table: LemmaTable,
    total_docs: usize,
}

impl VectorSpaceModel {
    /// `total_docs` is taken from the token space.
    pub fn new(tokens: SpaceIndex, lemmas: SpaceIndex, lemma_table: LemmaTable) -> Self {
        let total_docs = tokens.num_docs();
        Self { tokens, lemmas, lemma_table, total_docs }
    }

    pub fn total_docs(&self) -> usize { self.total_docs }

    pub fn index(&self, space: Space) -> &SpaceIndex {
        match space {
            Space::Token => &self.tokens,
            Space::Lemma => &self.lemmas,
        }
    }

    pub fn token_space(&self) -> TokenSpace<'_> { TokenSpace { model: self } }

    pub fn lemma_space(&self) -> LemmaSpace<'_> { LemmaSpace { model: self } }

    pub fn vectorize_query(&self, text: &str, space: Space) -> TermVector {
        match space {
            Space::Token => self.token_space().vectorize(text),
            Space::Lemma => self.lemma_space().vectorize(text),
        }
    }

    /// IDF used for terms missing from a space's table; larger than any seen IDF.
    fn unseen_idf(&self) -> f64 {
        ((self.total_docs + 1) as f64).ln() + 1.0
    }

    fn weigh(&self, counts: HashMap<String, u32>, idf: &HashMap<String, f64>) -> TermVector {
        counts
            .into_iter()
            .map(|(term, count)| {
                let tf = 1.0 + (count as f64).ln();
                let idf = idf.get(&term).copied().unwrap_or_else(|| self.unseen_idf());
                (term, tf * idf)
            })
            .collect()
    }
}

pub struct TokenSpace<'a> {
    model: &'a VectorSpaceModel,
}

impl TermSpace for TokenSpace<'_> {
    fn vectorize(&self, query: &str) -> TermVector {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in tokenize(query) {
            *counts.entry(token).or_insert(0) += 1;
        }
        self.model.weigh(counts, self.idf_table())
    }

    fn document_vectors(&self) -> &HashMap<DocId, TermVector> { &self.model.tokens.vectors }

    fn idf_table(&self) -> &HashMap<String, f64> { &self.model.tokens.idf }
}

pub struct LemmaSpace<'a> {
    model: &'a VectorSpaceModel,
}

impl TermSpace for LemmaSpace<'_> {
    fn vectorize(&self, query: &str) -> TermVector {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in tokenize(query) {
            match self.model.lemma_table.get(&token) {
                Some(lemmas) => {
                    for lemma in lemmas {
                        *counts.entry(lemma.clone()).or_insert(0) += 1;
                    }
                }
                None => *counts.entry(token).or_insert(0) += 1,
            }
        }
        self.model.weigh(counts, self.idf_table())
    }

    fn document_vectors(&self) -> &HashMap<DocId, TermVector> { &self.model.lemmas.vectors }

    fn idf_table(&self) -> &HashMap<String, f64> { &self.model.lemmas.idf }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(entries: &[(&str, f64)]) -> TermVector {
        entries.iter().map(|(t, w)| (t.to_string(), *w)).collect()
    }

    fn record(term: &str, idf: f64, tfidf: f64) -> WeightRecord {
        WeightRecord { term: term.into(), idf, tfidf }
    }

    fn model() -> VectorSpaceModel {
        let mut tokens = SpaceAccumulator::new();
        tokens.add_document(1, vec![record("cats", 0.7, 0.2), record("run", 0.1, 0.05)]);
        tokens.add_document(2, vec![record("cat", 0.7, 0.3), record("run", 0.4, 0.01)]);
        tokens.add_document(3, vec![record("dog", 1.1, 0.4)]);
        let mut lemmas = SpaceAccumulator::new();
        lemmas.add_document(1, vec![record("cat", 0.4, 0.2)]);
        let table = LemmaTable::from([("cats".to_string(), vec!["cat".to_string()])]);
        VectorSpaceModel::new(tokens.freeze(), lemmas.freeze(), table)
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = vector(&[("x", 1.0), ("y", 2.0)]);
        let b = vector(&[("y", 0.5), ("z", 3.0)]);
        assert_eq!(cosine_similarity(&a, &b, 1e-10), cosine_similarity(&b, &a, 1e-10));
    }

    #[test]
    fn cosine_with_self_is_one() {
        let a = vector(&[("x", 0.3), ("y", 1.7)]);
        assert!((cosine_similarity(&a, &a, 1e-10) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_with_empty_is_zero() {
        let a = vector(&[("x", 0.3)]);
        assert_eq!(cosine_similarity(&a, &TermVector::new(), 1e-10), 0.0);
        assert_eq!(cosine_similarity(&TermVector::new(), &TermVector::new(), 1e-10), 0.0);
    }

    #[test]
    fn first_idf_wins() {
        let m = model();
        assert_eq!(m.token_space().idf_table()["run"], 0.1);
        assert_eq!(m.total_docs(), 3);
    }

    #[test]
    fn token_query_weights() {
        let m = model();
        let q = m.vectorize_query("Run, run RUN dog", Space::Token);
        assert!((q.weight("run") - (1.0 + 3f64.ln()) * 0.1).abs() < 1e-12);
        assert!((q.weight("dog") - 1.1).abs() < 1e-12);
    }

    #[test]
    fn unseen_terms_use_smoothed_idf() {
        let m = model();
        let q = m.vectorize_query("zebra", Space::Token);
        let expected = 4f64.ln() + 1.0;
        assert!((q.weight("zebra") - expected).abs() < 1e-12);
        assert!(m.token_space().idf_table().values().all(|idf| *idf < expected));
    }

    #[test]
    fn lemma_query_expands_tokens() {
        let m = model();
        let q = m.vectorize_query("cats cat", Space::Lemma);
        assert_eq!(q.len(), 1);
        assert!((q.weight("cat") - (1.0 + 2f64.ln()) * 0.4).abs() < 1e-12);
        // no mapping: the token stands for itself
        let q = m.vectorize_query("dog", Space::Lemma);
        assert!(q.weight("dog") > 0.0);
    }

    #[test]
    fn empty_query_is_empty_vector() {
        assert!(model().vectorize_query(" ?! ", Space::Token).is_empty());
    }
}
