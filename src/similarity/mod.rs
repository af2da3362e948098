// src/similarity/mod.rs
// Similarity Kernel — pure numeric functions, no I/O.

use thiserror::Error;

use crate::config::routing::{ASSISTANT_CENTROID_WEIGHT, USER_CENTROID_WEIGHT};
use crate::store::models::Role;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SimilarityError {
    #[error("dimension mismatch: {0} vs {1}")]
    DimensionMismatch(usize, usize),
}

/// Qualitative bucket a similarity score falls into against the two
/// drift thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftAction {
    Stay,
    BranchSameCluster,
    BranchNewCluster,
}

/// Cosine similarity in [-1, 1]. Zero magnitude on either side yields 0.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch(a.len(), b.len()));
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a * norm_b))
}

/// Bucket a similarity score into STAY / BRANCH_SAME_CLUSTER / BRANCH_NEW_CLUSTER.
/// Boundaries are strict `>`; equality falls into the lower bucket.
pub fn drift_action(sim: f32, stay_threshold: f32, new_cluster_threshold: f32) -> DriftAction {
    if sim > stay_threshold {
        DriftAction::Stay
    } else if sim > new_cluster_threshold {
        DriftAction::BranchSameCluster
    } else {
        DriftAction::BranchNewCluster
    }
}

/// Role-weighted running average centroid update. If `old` is empty, `new` is
/// returned verbatim (first message in the branch).
pub fn update_centroid(old: &[f32], new: &[f32], message_count: u32, role: Role) -> Vec<f32> {
    if old.is_empty() {
        return new.to_vec();
    }

    let weight = match role {
        Role::User => USER_CENTROID_WEIGHT,
        Role::Assistant => ASSISTANT_CENTROID_WEIGHT,
    };

    let denom = message_count as f32 + weight - 1.0;

    old.iter()
        .zip(new.iter())
        .map(|(o, n)| o + weight * (n - o) / denom)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine(&v, &v).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors_is_negative_one() {
        let v = vec![1.0, 2.0, 3.0];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        assert!((cosine(&v, &neg).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = vec![1.0, 0.0, 0.5];
        let b = vec![0.2, 0.9, -0.3];
        assert_eq!(cosine(&a, &b).unwrap(), cosine(&b, &a).unwrap());
    }

    #[test]
    fn cosine_zero_magnitude_is_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn cosine_dimension_mismatch_errors() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(
            cosine(&a, &b),
            Err(SimilarityError::DimensionMismatch(2, 3))
        );
    }

    #[test]
    fn drift_action_boundaries_are_strict() {
        assert_eq!(drift_action(0.47, 0.47, 0.20), DriftAction::BranchSameCluster);
        assert_eq!(drift_action(0.4701, 0.47, 0.20), DriftAction::Stay);
        assert_eq!(drift_action(0.20, 0.47, 0.20), DriftAction::BranchNewCluster);
        assert_eq!(drift_action(0.2001, 0.47, 0.20), DriftAction::BranchSameCluster);
    }

    #[test]
    fn update_centroid_on_empty_old_returns_new() {
        let new = vec![0.1, 0.2, 0.3];
        let result = update_centroid(&[], &new, 0, Role::User);
        assert_eq!(result, new);
    }

    #[test]
    fn update_centroid_weights_user_turns_more() {
        let old = vec![0.0, 0.0];
        let new = vec![1.0, 1.0];

        let user_updated = update_centroid(&old, &new, 1, Role::User);
        let assistant_updated = update_centroid(&old, &new, 1, Role::Assistant);

        // user weight 3.0 / (1+3-1) = 1.0 -> fully adopts new
        assert!((user_updated[0] - 1.0).abs() < 1e-6);
        // assistant weight 1.0 / (1+1-1) = 1.0 -> also fully adopts at count 1,
        // but at higher counts the user weighting dominates more strongly.
        let old2 = vec![0.0, 0.0];
        let user_updated2 = update_centroid(&old2, &new, 5, Role::User);
        let assistant_updated2 = update_centroid(&old2, &new, 5, Role::Assistant);
        assert!(user_updated2[0] > assistant_updated2[0]);
        assert!(assistant_updated[0] >= 0.0);
    }
}
