//! Dynamic time warping distance and similarity between two MFCC
//! sequences.
//!
//! Grounded almost line-for-line on `DTWProcessor::calculateDistance`: a
//! two-row rolling cumulative cost matrix instead of a full `n x m`
//! allocation, squared Euclidean cell cost, and length-normalized output.

use callcoach_core::mfcc::MfccVector;

use crate::error::{Result, SimilarityError};

/// Sum of squared differences between two equal-length feature vectors.
fn euclidean_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Length-normalized DTW distance between two MFCC sequences:
/// `sqrt(D[n, m]) / sqrt(n * m)`, where `D` is the cumulative cost
/// matrix under squared Euclidean cell cost. Lower is more similar; 0
/// only for identical sequences.
pub fn dtw_distance(seq1: &[MfccVector], seq2: &[MfccVector]) -> Result<f32> {
    if seq1.is_empty() || seq2.is_empty() {
        return Err(SimilarityError::EmptySequence);
    }
    let dim = seq1[0].len();
    if seq2[0].len() != dim {
        return Err(SimilarityError::DimensionMismatch {
            lhs: dim,
            rhs: seq2[0].len(),
        });
    }

    let n = seq1.len();
    let m = seq2.len();

    let mut prev_row = vec![f32::INFINITY; m + 1];
    let mut curr_row = vec![f32::INFINITY; m + 1];
    prev_row[0] = 0.0;

    for i in 1..=n {
        curr_row[0] = f32::INFINITY;
        for j in 1..=m {
            let cost = euclidean_distance_squared(&seq1[i - 1], &seq2[j - 1]);
            let min_prev_cost = prev_row[j].min(prev_row[j - 1]).min(curr_row[j - 1]);
            curr_row[j] = cost + min_prev_cost;
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    let total_cost = prev_row[m];
    Ok(total_cost.sqrt() / ((n * m) as f32).sqrt())
}

/// Converts a DTW distance into a bounded `(0, 1]` similarity score,
/// where `1.0` means identical sequences and the score approaches `0`
/// as distance grows unbounded.
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// Convenience wrapper: DTW distance between two sequences converted
/// directly to a similarity score.
pub fn similarity(seq1: &[MfccVector], seq2: &[MfccVector]) -> Result<f32> {
    dtw_distance(seq1, seq2).map(distance_to_similarity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(vectors: &[[f32; 2]]) -> Vec<MfccVector> {
        vectors.iter().map(|v| v.to_vec()).collect()
    }

    #[test]
    fn identical_sequences_have_zero_distance() {
        let a = seq(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let distance = dtw_distance(&a, &a).unwrap();
        assert!(distance.abs() < 1e-6, "got {distance}");
        assert!((similarity(&a, &a).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = seq(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let b = seq(&[[1.5, 2.5], [2.5, 3.5], [6.0, 7.0], [9.0, 9.0]]);
        let ab = dtw_distance(&a, &b).unwrap();
        let ba = dtw_distance(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-4, "ab={ab} ba={ba}");
    }

    #[test]
    fn more_divergent_sequences_score_lower_similarity() {
        let a = seq(&[[0.0, 0.0], [0.0, 0.0], [0.0, 0.0]]);
        let close = seq(&[[0.1, 0.1], [0.1, 0.1], [0.1, 0.1]]);
        let far = seq(&[[10.0, 10.0], [10.0, 10.0], [10.0, 10.0]]);
        let sim_close = similarity(&a, &close).unwrap();
        let sim_far = similarity(&a, &far).unwrap();
        assert!(sim_close > sim_far);
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let a: Vec<MfccVector> = Vec::new();
        let b = seq(&[[1.0, 2.0]]);
        assert!(matches!(
            dtw_distance(&a, &b),
            Err(SimilarityError::EmptySequence)
        ));
        assert!(matches!(
            dtw_distance(&b, &a),
            Err(SimilarityError::EmptySequence)
        ));
    }

    #[test]
    fn mismatched_dimensionality_is_rejected() {
        let a = seq(&[[1.0, 2.0]]);
        let b: Vec<MfccVector> = vec![vec![1.0, 2.0, 3.0]];
        assert!(matches!(
            dtw_distance(&a, &b),
            Err(SimilarityError::DimensionMismatch { lhs: 2, rhs: 3 })
        ));
    }

    #[test]
    fn similarity_score_is_bounded() {
        let a = seq(&[[1.0, 2.0], [3.0, 4.0]]);
        let b = seq(&[[100.0, -50.0], [7.0, 8.0], [1.0, 1.0]]);
        let s = similarity(&a, &b).unwrap();
        assert!(s > 0.0 && s <= 1.0, "got {s}");
    }
}
