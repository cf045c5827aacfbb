//! Query and ranking layer of a small document-retrieval engine.
//!
//! Two independent query paths share the notion of a document universe:
//! boolean set queries over the [`index::IndexStore`] and ranked free-text
//! queries over the [`vector::VectorSpaceModel`], with
//! [`authority::AuthorityScores`] breaking ties between equal scores.

use serde::{Deserialize, Serialize};

pub mod authority;
pub mod boolean;
pub mod config;
pub mod error;
pub mod index;
pub mod persist;
pub mod ranking;
pub mod tokenizer;
pub mod vector;

pub use error::{LoadError, ParseError};

pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub doc_id: DocId,
    pub url: String,
}

/// Granularity a ranked query is scored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Space {
    Token,
    Lemma,
}

impl Space {
    /// File name prefix of the per-document weight files of this space.
    pub fn weights_prefix(self) -> &'static str {
        match self {
            Space::Token => "tfidf_tokens",
            Space::Lemma => "tfidf_lemmas",
        }
    }
}
