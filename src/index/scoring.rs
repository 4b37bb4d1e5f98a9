//! Score primitives for hybrid retrieval.
//!
//! Dense and lexical rankings live on incompatible scales, so each ranking
//! is min-max rescaled to [0, 1] before the weighted combination.

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Min-max rescale a ranking to [0, 1].
///
/// A constant ranking maps to all ones so it neither dominates nor vanishes
/// in the fusion; non-finite inputs score zero.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }

    let mut min = f32::MAX;
    let mut max = f32::MIN;

    for s in scores {
        if !s.is_finite() {
            continue;
        }
        if *s < min {
            min = *s;
        }
        if *s > max {
            max = *s;
        }
    }

    if !min.is_finite() || !max.is_finite() {
        return scores.iter().map(|_| 0.0).collect();
    }

    if (max - min).abs() < f32::EPSILON {
        return vec![1.0; scores.len()];
    }

    scores
        .iter()
        .map(|score| {
            if score.is_finite() {
                ((score - min) / (max - min)).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Linear fusion of one chunk's normalized dense and lexical scores.
///
/// `weight` is the dense share; the lexical ranking gets the rest.
pub fn fuse(dense_norm: f32, lexical_norm: f32, weight: f32) -> f32 {
    let w = weight.clamp(0.0, 1.0);
    w * dense_norm + (1.0 - w) * lexical_norm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_mismatched_or_zero_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_min_max_normalize_spreads_to_unit_range() {
        let normalized = min_max_normalize(&[2.0, 4.0, 6.0]);
        assert_eq!(normalized, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_min_max_normalize_constant_ranking() {
        let normalized = min_max_normalize(&[3.0, 3.0, 3.0]);
        assert_eq!(normalized, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_min_max_normalize_handles_non_finite() {
        let normalized = min_max_normalize(&[1.0, f32::NAN, 3.0]);
        assert_eq!(normalized[0], 0.0);
        assert_eq!(normalized[1], 0.0);
        assert_eq!(normalized[2], 1.0);
    }

    #[test]
    fn test_fuse_weighting() {
        assert!((fuse(1.0, 0.0, 0.5) - 0.5).abs() < f32::EPSILON);
        assert!((fuse(1.0, 0.0, 1.0) - 1.0).abs() < f32::EPSILON);
        assert!((fuse(1.0, 0.0, 0.0)).abs() < f32::EPSILON);
        // out-of-range weights are clamped
        assert!((fuse(1.0, 0.0, 2.0) - 1.0).abs() < f32::EPSILON);
    }
}
