//! Similarity Ranker
//!
//! Exact brute-force ranking of stored embeddings against a query vector.

use std::cmp::Ordering;

use tracing::{trace, warn};

use super::codec;
use super::similarity::cosine_similarity;
use crate::storage::TextEmbedding;

/// A stored record paired with its decoded vector
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: TextEmbedding,
    pub vector: Vec<f32>,
}

impl Candidate {
    pub fn new(record: TextEmbedding, vector: Vec<f32>) -> Self {
        Self { record, vector }
    }
}

/// A record scored against a query
#[derive(Debug, Clone)]
pub struct RankedMatch {
    pub record: TextEmbedding,
    pub score: f32,
}

/// Decode stored records into ranking candidates.
///
/// Records whose vector bytes cannot be decoded are skipped.
pub fn decode_candidates(records: Vec<TextEmbedding>) -> Vec<Candidate> {
    records
        .into_iter()
        .filter_map(|record| match codec::decode(&record.vector) {
            Ok(vector) => Some(Candidate::new(record, vector)),
            Err(e) => {
                warn!(id = record.id, error = %e, "Skipping record with undecodable vector");
                None
            }
        })
        .collect()
}

/// Rank candidates by cosine similarity to `query`, best first.
///
/// The sort is stable, so equal scores keep the candidates' input order.
/// `top_k` of `None` keeps every match. Candidates that cannot be scored
/// (dimension mismatch, zero norm, non-finite score) are skipped.
pub fn rank<I>(query: &[f32], candidates: I, top_k: Option<usize>) -> Vec<RankedMatch>
where
    I: IntoIterator<Item = Candidate>,
{
    if top_k == Some(0) {
        return Vec::new();
    }

    let mut results: Vec<RankedMatch> = candidates
        .into_iter()
        .filter_map(|candidate| match cosine_similarity(query, &candidate.vector) {
            Ok(score) if score.is_finite() => Some(RankedMatch {
                record: candidate.record,
                score,
            }),
            Ok(score) => {
                warn!(id = candidate.record.id, score, "Skipping record with non-finite score");
                None
            }
            Err(e) => {
                warn!(id = candidate.record.id, error = %e, "Skipping unrankable record");
                None
            }
        })
        .collect();

    // Sort by similarity (descending), stable on ties
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    if let Some(k) = top_k {
        results.truncate(k);
    }

    trace!(
        matches = ?results.iter().map(|m| (m.record.id, m.score)).collect::<Vec<_>>(),
        "Ranked candidates"
    );
    results
}
