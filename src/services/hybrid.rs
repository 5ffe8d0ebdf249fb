use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::RecommendError;
use crate::models::{ItemId, ScoreVector, ScoredItem};

/// Allowed distance of a weight triple's sum from 1
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Blend weights for the three recommenders
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub collaborative: f64,
    pub content: f64,
    pub context: f64,
}

impl Default for Weights {
    /// Equal thirds
    fn default() -> Self {
        Self {
            collaborative: 1.0 / 3.0,
            content: 1.0 / 3.0,
            context: 1.0 / 3.0,
        }
    }
}

impl Weights {
    /// Creates a validated weight triple
    pub fn new(collaborative: f64, content: f64, context: f64) -> Result<Self, RecommendError> {
        let weights = Self {
            collaborative,
            content,
            context,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Checks that every weight is finite and non-negative and that they sum to 1
    pub fn validate(&self) -> Result<(), RecommendError> {
        let parts = self.as_array();
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RecommendError::InvalidConfig(format!(
                "weights must be finite and non-negative, got {:?}",
                parts
            )));
        }

        let sum: f64 = parts.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(RecommendError::InvalidConfig(format!(
                "weights must sum to 1, got {}",
                sum
            )));
        }

        Ok(())
    }

    fn as_array(&self) -> [f64; 3] {
        [self.collaborative, self.content, self.context]
    }

    fn from_array([collaborative, content, context]: [f64; 3]) -> Self {
        Self {
            collaborative,
            content,
            context,
        }
    }

    /// Moves the weight of unavailable recommenders onto the available ones
    ///
    /// `available` follows the (collaborative, content, context) order. Each
    /// available weight is divided by the total weight of the available
    /// recommenders, so the result sums to 1. Returns `None` when that total
    /// is zero and nothing can be blended.
    pub fn redistribute(&self, available: [bool; 3]) -> Option<Weights> {
        let parts = self.as_array();
        let total: f64 = parts
            .iter()
            .zip(available)
            .filter(|(_, on)| *on)
            .map(|(w, _)| *w)
            .sum();

        if total <= 0.0 {
            return None;
        }

        let mut out = [0.0; 3];
        for (i, (w, on)) in parts.iter().zip(available).enumerate() {
            if on {
                out[i] = w / total;
            }
        }
        Some(Weights::from_array(out))
    }
}

/// Score vectors from the three recommenders for one request
///
/// An empty vector, or `None` for context, means that recommender had
/// nothing to say and its weight is redistributed.
#[derive(Debug, Clone, Default)]
pub struct Signals {
    pub collaborative: ScoreVector,
    pub content: ScoreVector,
    pub context: Option<ScoreVector>,
}

impl Signals {
    fn available(&self) -> [bool; 3] {
        [
            !self.collaborative.is_empty(),
            !self.content.is_empty(),
            self.context.as_ref().is_some_and(|v| !v.is_empty()),
        ]
    }
}

/// Ranked output of the combiner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blend {
    pub ranked: Vec<ScoredItem>,
    /// Weights actually applied after redistribution, `None` if nothing blended
    pub applied_weights: Option<Weights>,
}

/// Blends score vectors into one ranked list
///
/// Each candidate's score is the weighted sum of its scores in the three
/// vectors (missing entries count as 0). Candidates are the union of the
/// items of vectors that carry weight after redistribution. The list is sorted by score descending, then by
/// item id ascending, so equal inputs always produce the same order.
pub fn combine(signals: &Signals, weights: &Weights) -> Blend {
    let available = signals.available();
    let Some(applied) = weights.redistribute(available) else {
        return Blend {
            ranked: Vec::new(),
            applied_weights: None,
        };
    };

    let empty = ScoreVector::new();
    let context = signals.context.as_ref().unwrap_or(&empty);
    let vectors = [
        (&signals.collaborative, applied.collaborative),
        (&signals.content, applied.content),
        (context, applied.context),
    ];

    let candidates: BTreeSet<&ItemId> = vectors
        .iter()
        .filter(|(_, weight)| *weight > 0.0)
        .flat_map(|(vector, _)| vector.item_ids())
        .collect();

    let mut ranked: Vec<ScoredItem> = candidates
        .into_iter()
        .map(|item_id| {
            let score: f64 = vectors
                .iter()
                .map(|(vector, weight)| weight * vector.get(item_id))
                .sum();
            ScoredItem {
                item_id: item_id.clone(),
                score: score.clamp(0.0, 1.0),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });

    Blend {
        ranked,
        applied_weights: Some(applied),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(entries: &[(&str, f64)]) -> ScoreVector {
        entries.iter().map(|(id, s)| (*id, *s)).collect()
    }

    #[test]
    fn test_weights_validation() {
        assert!(Weights::new(0.4, 0.3, 0.3).is_ok());
        assert!(Weights::default().validate().is_ok());
        assert!(Weights::new(0.5, 0.5, 0.5).is_err());
        assert!(Weights::new(1.2, -0.1, -0.1).is_err());
        assert!(Weights::new(f64::NAN, 0.5, 0.5).is_err());
        assert!(Weights::new(0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_two_empty_recommenders_give_third_full_weight() {
        let weights = Weights::default();
        let redistributed = weights.redistribute([false, false, true]).unwrap();
        assert_eq!(redistributed.collaborative, 0.0);
        assert_eq!(redistributed.content, 0.0);
        assert!((redistributed.context - 1.0).abs() < 1e-12);

        let signals = Signals {
            collaborative: ScoreVector::new(),
            content: ScoreVector::new(),
            context: Some(vector(&[("a", 0.3), ("b", 0.9)])),
        };
        let blend = combine(&signals, &weights);
        assert!((blend.applied_weights.unwrap().context - 1.0).abs() < 1e-12);
        assert_eq!(blend.ranked[0].item_id, "b");
        assert!((blend.ranked[0].score - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_redistribution_is_proportional() {
        let weights = Weights::new(0.5, 0.3, 0.2).unwrap();
        let redistributed = weights.redistribute([true, true, false]).unwrap();
        assert!((redistributed.collaborative - 0.625).abs() < 1e-12);
        assert!((redistributed.content - 0.375).abs() < 1e-12);
        assert_eq!(redistributed.context, 0.0);
    }

    #[test]
    fn test_redistribution_with_no_remaining_weight() {
        let weights = Weights::new(1.0, 0.0, 0.0).unwrap();
        assert_eq!(weights.redistribute([false, true, true]), None);

        let signals = Signals {
            collaborative: ScoreVector::new(),
            content: vector(&[("a", 1.0)]),
            context: Some(vector(&[("a", 0.5)])),
        };
        let blend = combine(&signals, &weights);
        assert!(blend.ranked.is_empty());
        assert_eq!(blend.applied_weights, None);
    }

    #[test]
    fn test_zero_weight_vectors_add_no_candidates() {
        let signals = Signals {
            collaborative: vector(&[("lasagna", 1.0), ("risotto", 0.8)]),
            content: vector(&[("lasagna", 1.0), ("pho", 0.4), ("tacos", 0.2)]),
            context: Some(vector(&[("pho", 0.9), ("tacos", 0.5)])),
        };
        let blend = combine(&signals, &Weights::new(1.0, 0.0, 0.0).unwrap());

        let ids: Vec<&str> = blend.ranked.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(ids, vec!["lasagna", "risotto"]);
        assert!((blend.ranked[1].score - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_missing_entries_count_as_zero() {
        let signals = Signals {
            collaborative: vector(&[("a", 1.0)]),
            content: vector(&[("a", 0.5), ("b", 1.0)]),
            context: None,
        };
        let blend = combine(&signals, &Weights::new(0.5, 0.5, 0.0).unwrap());

        assert_eq!(blend.ranked.len(), 2);
        assert_eq!(blend.ranked[0].item_id, "a");
        assert!((blend.ranked[0].score - 0.75).abs() < 1e-12);
        assert!((blend.ranked[1].score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ties_break_by_item_id() {
        let signals = Signals {
            collaborative: ScoreVector::new(),
            content: vector(&[("delta", 0.5), ("alpha", 0.5), ("charlie", 0.9), ("bravo", 0.5)]),
            context: None,
        };
        let blend = combine(&signals, &Weights::default());
        let order: Vec<&str> = blend.ranked.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(order, vec!["charlie", "alpha", "bravo", "delta"]);

        // same inputs, same order
        assert_eq!(combine(&signals, &Weights::default()), blend);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let signals = Signals {
            collaborative: vector(&[("a", 1.0), ("b", 0.0), ("c", 0.7)]),
            content: vector(&[("a", 1.0), ("b", 0.2), ("d", 1.0)]),
            context: Some(vector(&[("a", 1.0), ("c", 0.1), ("d", 0.5)])),
        };

        let triples = [
            (1.0, 0.0, 0.0),
            (0.0, 1.0, 0.0),
            (0.0, 0.0, 1.0),
            (0.2, 0.3, 0.5),
            (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0),
            (0.9, 0.05, 0.05),
        ];
        for (c, t, x) in triples {
            let blend = combine(&signals, &Weights::new(c, t, x).unwrap());
            for entry in &blend.ranked {
                assert!((0.0..=1.0).contains(&entry.score), "{:?}", entry);
            }
            for pair in blend.ranked.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
