use serde::Serialize;
use std::collections::HashMap;

use super::ItemId;

/// Per-item relevance scores produced by one recommender
///
/// Every stored score lies in [0, 1]. Items without an entry score 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreVector(HashMap<ItemId, f64>);

impl ScoreVector {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Stores a score, clamping it into [0, 1]. Non-finite values become 0.
    pub fn insert(&mut self, item_id: impl Into<ItemId>, score: f64) {
        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.0.insert(item_id.into(), score);
    }

    /// Score for an item, 0 when absent
    pub fn get(&self, item_id: &str) -> f64 {
        self.0.get(item_id).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.0.contains_key(item_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &ItemId> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, f64)> {
        self.0.iter().map(|(id, score)| (id, *score))
    }
}

impl<S: Into<ItemId>> FromIterator<(S, f64)> for ScoreVector {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        let mut vector = ScoreVector::new();
        for (id, score) in iter {
            vector.insert(id, score);
        }
        vector
    }
}

/// One entry of a ranked recommendation list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_clamps_scores() {
        let mut vector = ScoreVector::new();
        vector.insert("a", 1.7);
        vector.insert("b", -0.2);
        vector.insert("c", f64::NAN);
        vector.insert("d", 0.4);

        assert_eq!(vector.get("a"), 1.0);
        assert_eq!(vector.get("b"), 0.0);
        assert_eq!(vector.get("c"), 0.0);
        assert_eq!(vector.get("d"), 0.4);
    }

    #[test]
    fn test_missing_entry_scores_zero() {
        let vector: ScoreVector = [("a", 0.5)].into_iter().collect();
        assert_eq!(vector.get("zzz"), 0.0);
        assert!(!vector.contains("zzz"));
        assert_eq!(vector.len(), 1);
    }
}
