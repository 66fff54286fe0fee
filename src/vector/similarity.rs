//! Vector Similarity Functions
//!
//! Checked similarity computations. Mismatched lengths and zero vectors are
//! reported as errors instead of producing garbage scores.

use crate::error::{RagError, Result};

/// Compute dot product of two vectors
///
/// Uses unrolled loop for better CPU performance.
/// Callers must pass equal-length slices.
#[inline]
fn dot_unchecked(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len();
    let mut sum = 0.0f32;

    // Process 4 elements at a time (manual unrolling)
    let chunks = len / 4;
    let remainder = len % 4;

    for i in 0..chunks {
        let idx = i * 4;
        sum += a[idx] * b[idx];
        sum += a[idx + 1] * b[idx + 1];
        sum += a[idx + 2] * b[idx + 2];
        sum += a[idx + 3] * b[idx + 3];
    }

    for i in (len - remainder)..len {
        sum += a[i] * b[i];
    }

    sum
}

fn check_dimensions(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Dot product of two equal-length vectors
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimensions(a, b)?;
    Ok(dot_unchecked(a, b))
}

/// Euclidean norm
#[inline]
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Compute cosine similarity between two vectors
///
/// Returns a value in roughly [-1, 1] where 1 means identical direction.
/// Fails with [`RagError::DimensionMismatch`] on unequal lengths and
/// [`RagError::ZeroNorm`] when either vector has zero magnitude.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimensions(a, b)?;

    let mag_a = magnitude(a);
    let mag_b = magnitude(b);
    if mag_a == 0.0 || mag_b == 0.0 {
        return Err(RagError::ZeroNorm);
    }

    Ok(dot_unchecked(a, b) / (mag_a * mag_b))
}
