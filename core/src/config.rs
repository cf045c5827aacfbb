//! Ranking and authority constants, plus the config structs built from them.

/// Added to the norm product in cosine similarity so empty vectors score 0.
pub const COSINE_EPSILON: f64 = 1e-10;
/// Share of each term space in a fused score.
pub const FUSION_WEIGHT: f64 = 0.5;
/// Fused search asks each space for `top_k * FUSION_CANDIDATE_FACTOR` candidates.
pub const FUSION_CANDIDATE_FACTOR: usize = 4;
pub const DEFAULT_TOP_K: usize = 10;

pub const PAGERANK_DAMPING: f64 = 0.85;
pub const PAGERANK_ITERATIONS: usize = 100;
/// Score read for a document that has not been scored yet.
pub const PAGERANK_INITIAL_SCORE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingConfig {
    pub epsilon: f64,
    pub fusion_weight: f64,
    pub fusion_candidate_factor: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            epsilon: COSINE_EPSILON,
            fusion_weight: FUSION_WEIGHT,
            fusion_candidate_factor: FUSION_CANDIDATE_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthorityConfig {
    pub damping: f64,
    pub iterations: usize,
    pub initial_score: f64,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            damping: PAGERANK_DAMPING,
            iterations: PAGERANK_ITERATIONS,
            initial_score: PAGERANK_INITIAL_SCORE,
        }
    }
}
