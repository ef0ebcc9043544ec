//! Embedding vector math shared by identity matching.
//!
//! Stored embeddings are L2-normalized, so cosine similarity reduces to a
//! dot product.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("degenerate embedding: zero norm over {dim} dimensions")]
pub struct DegenerateEmbedding {
    pub dim: usize,
}

/// Returns a unit-length copy of `v`, or an error if `v` has zero norm.
pub fn normalized(v: &[f32]) -> Result<Vec<f32>, DegenerateEmbedding> {
    let norm = l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return Err(DegenerateEmbedding { dim: v.len() });
    }
    Ok(v.iter().map(|x| x / norm).collect())
}

/// Euclidean norm, scaled by the largest component so that large but
/// finite vectors do not overflow when squared.
pub fn l2_norm(v: &[f32]) -> f32 {
    let scale = v.iter().fold(0.0f32, |m, x| m.max(x.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return scale;
    }
    scale * v.iter().map(|x| (x / scale).powi(2)).sum::<f32>().sqrt()
}

/// Dot product of L2-normalized vectors equals cosine similarity.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
