//! Vector Module
//!
//! Byte encoding, similarity scoring, and exact ranking of embeddings.

pub mod codec;
mod ranker;
mod similarity;

pub use ranker::{decode_candidates, rank, Candidate, RankedMatch};
pub use similarity::{cosine_similarity, dot_product, magnitude};
