//! Embedder port (spec.md §6, §4.3, §4.6).
//!
//! The embedder is treated as an explicit collaborator of the validation
//! engine and the archive manager, resolving the Open Question in spec.md
//! §9 about where it is obtained (see DESIGN.md).

use async_trait::async_trait;

use crate::domain::errors::GoalResult;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> GoalResult<Vec<f32>>;
}

/// Cosine similarity of two equal-length vectors. Returns 0.0 for mismatched
/// or zero-length inputs rather than panicking or dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_are_maximally_similar() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_are_dissimilar() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn mismatched_lengths_return_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
