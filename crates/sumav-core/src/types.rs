//! Semantic entities shared by the Builder, Searcher, and the stores behind them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::hash::{Md5Hash, Sha256Hash};
use crate::ids::DetectionId;

/// A single scanned-file row as produced by (out-of-scope) ingestion.
///
/// `tokens` preserves multiplicity and order; `unique_tokens` is the sorted
/// distinct set used to enumerate co-occurrence edges during the build.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Detection {
    pub id: DetectionId,
    pub md5: Md5Hash,
    pub sha256: Sha256Hash,
    pub submission_date: DateTime<Utc>,
    pub verdicts: BTreeMap<String, Option<String>>,
    pub tokens: Option<Vec<String>>,
    pub unique_tokens: Option<Vec<String>>,
    pub ground_truth: Option<String>,
    pub predicted_label: Option<String>,
}

/// A token and its corpus-wide statistics, as stored by the Graph Store.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TokenNode {
    pub id: u64,
    pub token: String,
    pub alias: Option<String>,
    pub parents: Vec<String>,
    pub token_count: u64,
    pub row_count: u64,
    pub token_ratio: f64,
    pub num_subsets: u64,
}

/// An edge between two tokens, canonically keyed by `(token_a, token_b)` with
/// `token_a < token_b`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TokenEdge {
    pub id: u64,
    pub token_a: String,
    pub token_b: String,
    /// p(token_b | token_a)
    pub p_b_given_a: f64,
    /// p(token_a | token_b)
    pub p_a_given_b: f64,
    pub intersection_row_count: u64,
}

impl TokenEdge {
    /// Canonicalize a pair of tokens into `(min, max)` lexicographic order.
    pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// Set-theoretic relation between two tokens, derived from their conditional
/// probabilities against the intersection ratio threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `a = b`: the two tokens co-occur almost whenever either appears.
    Equal,
    /// `a ⊂ b`: `a` is a subset of `b` (b is the more general token).
    Subset,
    /// `a ⊃ b`: `a` is a superset of `b`.
    Superset,
    /// `a ! b`: the tokens are essentially disjoint.
    Disjoint,
    /// `a $ b`: neither clearly a subset, superset, nor disjoint.
    Partial,
}

impl Relation {
    pub fn symbol(self) -> char {
        match self {
            Relation::Equal => '=',
            Relation::Subset => '⊂',
            Relation::Superset => '⊃',
            Relation::Disjoint => '!',
            Relation::Partial => '$',
        }
    }
}
