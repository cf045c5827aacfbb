//! Ranked retrieval: cosine scoring, top-K selection, fusion across spaces.

use crate::authority::AuthorityScores;
use crate::config::RankingConfig;
use crate::vector::{cosine_similarity, TermSpace, VectorSpaceModel};
use crate::{DocId, Space};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub doc_id: DocId,
    pub score: f64,
    pub authority: Option<f64>,
}

/// Score descending, then authority descending, then document id ascending.
pub fn result_order(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.authority.unwrap_or(0.0).total_cmp(&a.authority.unwrap_or(0.0)))
        .then_with(|| a.doc_id.cmp(&b.doc_id))
}

/// Combine two result lists as `weight * token + (1 - weight) * lemma`.
/// A document missing from one list contributes 0 for that side. The
/// combined list is sorted by [`result_order`] but not truncated.
pub fn fuse(token: &[ScoredResult], lemma: &[ScoredResult], weight: f64) -> Vec<ScoredResult> {
    let mut merged: HashMap<DocId, ScoredResult> = HashMap::new();
    for r in token {
        merged.insert(r.doc_id, ScoredResult { score: weight * r.score, ..r.clone() });
    }
    for r in lemma {
        let part = (1.0 - weight) * r.score;
        merged
            .entry(r.doc_id)
            .and_modify(|m| m.score += part)
            .or_insert_with(|| ScoredResult { score: part, ..r.clone() });
    }
    let mut fused: Vec<ScoredResult> = merged.into_values().collect();
    fused.sort_by(result_order);
    fused
}

/// Read-only ranking over a loaded model; cheap to clone and share between threads.
#[derive(Clone)]
pub struct RankingEngine {
    model: Arc<VectorSpaceModel>,
    authority: Option<Arc<AuthorityScores>>,
    config: RankingConfig,
}

impl RankingEngine {
    pub fn new(model: Arc<VectorSpaceModel>) -> Self {
        Self { model, authority: None, config: RankingConfig::default() }
    }

    pub fn with_authority(mut self, authority: Arc<AuthorityScores>) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn with_config(mut self, config: RankingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn model(&self) -> &VectorSpaceModel { &self.model }

    pub fn search(&self, query: &str, space: Space, top_k: usize) -> Vec<ScoredResult> {
        match space {
            Space::Token => self.search_space(&self.model.token_space(), query, top_k),
            Space::Lemma => self.search_space(&self.model.lemma_space(), query, top_k),
        }
    }

    /// Score every document of `space` against `query` and keep the best `top_k`.
    pub fn search_space<S: TermSpace>(&self, space: &S, query: &str, top_k: usize) -> Vec<ScoredResult> {
        if top_k == 0 {
            return Vec::new();
        }
        let query_vector = space.vectorize(query);
        let mut results: Vec<ScoredResult> = space
            .document_vectors()
            .iter()
            .map(|(&doc_id, vector)| ScoredResult {
                doc_id,
                score: cosine_similarity(vector, &query_vector, self.config.epsilon),
                authority: self.authority.as_ref().map(|a| a.authority_of(doc_id)),
            })
            .collect();
        if results.len() > top_k {
            results.select_nth_unstable_by(top_k - 1, result_order);
            results.truncate(top_k);
        }
        results.sort_by(result_order);
        tracing::debug!(query, terms = query_vector.len(), hits = results.len(), "ranked query");
        results
    }

    /// Search both spaces and rank the union by the weighted sum of scores.
    pub fn search_fused(&self, query: &str, top_k: usize) -> Vec<ScoredResult> {
        if top_k == 0 {
            return Vec::new();
        }
        let width = top_k.saturating_mul(self.config.fusion_candidate_factor).max(top_k);
        let token = self.search(query, Space::Token, width);
        let lemma = self.search(query, Space::Lemma, width);
        let mut fused = fuse(&token, &lemma, self.config.fusion_weight);
        fused.truncate(top_k);
        fused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{LemmaTable, SpaceAccumulator, WeightRecord};

    fn record(term: &str, tfidf: f64) -> WeightRecord {
        WeightRecord { term: term.into(), idf: 1.0, tfidf }
    }

    fn model() -> Arc<VectorSpaceModel> {
        let mut tokens = SpaceAccumulator::new();
        tokens.add_document(1, vec![record("rust", 0.5), record("fast", 0.5)]);
        tokens.add_document(2, vec![record("rust", 0.5), record("fast", 0.5)]);
        tokens.add_document(3, vec![record("python", 0.9)]);
        tokens.add_document(4, vec![record("rust", 0.1), record("python", 0.9)]);
        tokens.add_document(5, vec![]);
        let mut lemmas = SpaceAccumulator::new();
        lemmas.add_document(1, vec![record("rust", 0.4)]);
        lemmas.add_document(3, vec![record("python", 0.4)]);
        Arc::new(VectorSpaceModel::new(tokens.freeze(), lemmas.freeze(), LemmaTable::new()))
    }

    fn scored(doc_id: DocId, score: f64) -> ScoredResult {
        ScoredResult { doc_id, score, authority: None }
    }

    #[test]
    fn identical_vectors_are_ordered_by_authority() {
        let authority = AuthorityScores::from_scores(HashMap::from([(1, 0.5), (2, 0.9)]));
        let engine = RankingEngine::new(model()).with_authority(Arc::new(authority));
        let results = engine.search("rust fast", Space::Token, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].score, results[1].score);
        assert!((results[0].score - 1.0).abs() < 1e-9);
        assert_eq!(results[0].doc_id, 2);
        assert_eq!(results[0].authority, Some(0.9));
        assert_eq!(results[1].doc_id, 1);
    }

    #[test]
    fn ties_without_authority_fall_back_to_doc_id() {
        let results = RankingEngine::new(model()).search("rust fast", Space::Token, 3);
        assert_eq!(results.iter().map(|r| r.doc_id).collect::<Vec<_>>(), vec![1, 2, 4]);
        assert!(results.iter().all(|r| r.authority.is_none()));
    }

    #[test]
    fn result_length_is_min_of_k_and_corpus() {
        let engine = RankingEngine::new(model());
        assert!(engine.search("rust", Space::Token, 0).is_empty());
        assert_eq!(engine.search("rust", Space::Token, 3).len(), 3);
        assert_eq!(engine.search("rust", Space::Token, 50).len(), 5);
        assert_eq!(engine.search("rust", Space::Lemma, 50).len(), 2);
    }

    #[test]
    fn scores_are_non_increasing() {
        let results = RankingEngine::new(model()).search("rust python", Space::Token, 10);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        // the empty document scores zero and sinks to the bottom
        assert_eq!(results.last().map(|r| (r.doc_id, r.score)), Some((5, 0.0)));
    }

    #[test]
    fn fusion_counts_missing_space_as_zero() {
        let fused = fuse(&[scored(7, 0.8), scored(8, 0.2)], &[scored(8, 0.4), scored(9, 0.1)], 0.5);
        assert_eq!(fused.iter().map(|r| r.doc_id).collect::<Vec<_>>(), vec![7, 8, 9]);
        assert!((fused[0].score - 0.4).abs() < 1e-12);
        assert!((fused[1].score - 0.3).abs() < 1e-12);
        assert!((fused[2].score - 0.05).abs() < 1e-12);
    }

    #[test]
    fn fused_search_truncates_to_k() {
        let engine = RankingEngine::new(model());
        assert!(engine.search_fused("rust", 0).is_empty());
        let results = engine.search_fused("rust", 2);
        assert_eq!(results.len(), 2);
        // doc 1 matches in both spaces
        assert_eq!(results[0].doc_id, 1);
    }
}
