//! Score normalization and fusion math for hybrid search.
//!
//! Kept as free functions over plain scores rather than tied to any store,
//! so the authority-monotonicity and fusion-bounds properties can be
//! exercised directly.

/// Min-max normalize a list of raw scores to `[0, 1]`, guarding against zero
/// range.
pub fn normalize_min_max(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 {
        // All scores equal (including the single-element case): every
        // candidate is equally relevant by this signal, so give them all
        // full weight rather than dividing by zero.
        return scores.iter().map(|_| 1.0).collect();
    }
    scores.iter().map(|s| (s - min) / range).collect()
}

/// Blend a normalized semantic score and a normalized lexical score:
/// `base = w_s * norm_s + w_l * norm_l`, treating a missing side as 0.
///
/// `w_semantic`/`w_lexical` are normalized to sum to 1 first (clamped to
/// non-negative), so `base` stays in `[0, 1]` for any non-negative weight
/// pair a caller supplies. The weights are not required to already sum to 1
/// on the way in.
pub fn blend(norm_semantic: Option<f64>, norm_lexical: Option<f64>, w_semantic: f64, w_lexical: f64) -> f64 {
    let w_semantic = w_semantic.max(0.0);
    let w_lexical = w_lexical.max(0.0);
    let total = w_semantic + w_lexical;
    if total <= 0.0 {
        return 0.0;
    }
    let (w_s, w_l) = (w_semantic / total, w_lexical / total);
    w_s * norm_semantic.unwrap_or(0.0) + w_l * norm_lexical.unwrap_or(0.0)
}

/// Authority weighting. `base` is expected to already be in `[0, 1]`.
pub fn apply_authority(base: f64, authority_score: f64) -> f64 {
    base * authority_score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_min_max_maps_extremes_to_zero_and_one() {
        let normalized = normalize_min_max(&[10.0, 20.0, 30.0]);
        assert!((normalized[0] - 0.0).abs() < 1e-9);
        assert!((normalized[1] - 0.5).abs() < 1e-9);
        assert!((normalized[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_min_max_handles_uniform_scores() {
        let normalized = normalize_min_max(&[5.0, 5.0, 5.0]);
        assert_eq!(normalized, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn normalize_min_max_handles_empty_input() {
        assert!(normalize_min_max(&[]).is_empty());
    }

    #[test]
    fn blend_treats_missing_side_as_zero() {
        assert!((blend(Some(0.8), None, 0.7, 0.3) - 0.56).abs() < 1e-9);
        assert!((blend(None, Some(0.5), 0.7, 0.3) - 0.15).abs() < 1e-9);
    }

    #[test]
    fn blend_equals_semantic_only_when_lexical_weight_is_zero() {
        let hybrid = blend(Some(0.9), Some(0.4), 1.0, 0.0);
        assert!((hybrid - 0.9).abs() < 1e-9);
    }

    #[test]
    fn apply_authority_scales_linearly() {
        assert!((apply_authority(0.5, 0.95) - 0.475).abs() < 1e-9);
        assert!((apply_authority(1.0, 0.0) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn fusion_result_stays_within_unit_bounds() {
        for base in [0.0, 0.25, 0.5, 0.75, 1.0] {
            for authority in [0.0, 0.1, 0.5, 0.95, 1.0] {
                let final_score = apply_authority(base, authority);
                assert!((0.0..=1.0).contains(&final_score));
            }
        }
    }

    #[test]
    fn blend_normalizes_weights_that_do_not_sum_to_one() {
        // 0.9/0.9 would overshoot 1.0 if applied un-normalized (1.62 for two
        // full-strength signals); blend must renormalize to sum to 1 first.
        let hybrid = blend(Some(1.0), Some(1.0), 0.9, 0.9);
        assert!((hybrid - 1.0).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&hybrid));
    }

    #[test]
    fn blend_stays_within_unit_bounds_for_any_non_negative_weight_pair() {
        for (w_s, w_l) in [(0.9, 0.9), (5.0, 0.0), (0.0, 3.0), (2.0, 1.0), (0.0, 0.0), (0.1, 0.1)] {
            for (norm_s, norm_l) in [(Some(1.0), Some(1.0)), (Some(1.0), None), (None, Some(1.0)), (None, None)] {
                let base = blend(norm_s, norm_l, w_s, w_l);
                assert!((0.0..=1.0).contains(&base), "base={base} for w=({w_s},{w_l})");
            }
        }
    }

    #[test]
    fn blend_clamps_negative_weights_to_zero() {
        let hybrid = blend(Some(0.8), Some(0.2), -0.5, 1.0);
        assert!((hybrid - 0.2).abs() < 1e-9);
    }
}
