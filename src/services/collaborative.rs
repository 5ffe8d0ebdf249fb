use std::collections::HashMap;

use super::RecommendError;
use crate::db::Snapshot;
use crate::models::{ItemId, ScoreVector, UserId};

/// Tuning for user-based collaborative filtering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollaborativeParams {
    /// Number of most similar users whose ratings are blended
    pub neighbors: usize,
    /// Neighbors at or below this cosine similarity are ignored
    pub min_similarity: f64,
}

impl Default for CollaborativeParams {
    fn default() -> Self {
        Self {
            neighbors: 20,
            min_similarity: 0.0,
        }
    }
}

impl CollaborativeParams {
    /// Rejects settings that would let users with no shared items count as neighbors
    pub fn validate(&self) -> Result<(), RecommendError> {
        if self.neighbors == 0 {
            return Err(RecommendError::InvalidConfig(
                "collaborative neighbors must be at least 1".to_string(),
            ));
        }
        if !self.min_similarity.is_finite() || !(0.0..1.0).contains(&self.min_similarity) {
            return Err(RecommendError::InvalidConfig(format!(
                "collaborative min_similarity must be within [0, 1), got {}",
                self.min_similarity
            )));
        }
        Ok(())
    }
}

/// A user similar to the target, with their cosine similarity
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub user_id: UserId,
    pub similarity: f64,
}

/// Scores items from the ratings of users with similar order histories
pub struct CollaborativeRecommender<'a> {
    snapshot: &'a Snapshot,
    params: &'a CollaborativeParams,
}

impl<'a> CollaborativeRecommender<'a> {
    pub fn new(snapshot: &'a Snapshot, params: &'a CollaborativeParams) -> Self {
        Self { snapshot, params }
    }

    /// Finds the most similar users, strongest first (ties by user id)
    pub fn neighbors(&self, user_id: &str) -> Vec<Neighbor> {
        let Some(target) = self.snapshot.ratings_for(user_id) else {
            return Vec::new();
        };

        let mut neighbors: Vec<Neighbor> = self
            .snapshot
            .rating_matrix()
            .iter()
            .filter(|(other_id, _)| other_id.as_str() != user_id)
            .map(|(other_id, other)| Neighbor {
                user_id: other_id.clone(),
                similarity: cosine_similarity(target, other),
            })
            .filter(|n| n.similarity > self.params.min_similarity)
            .collect();

        neighbors.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        neighbors.truncate(self.params.neighbors);
        neighbors
    }

    /// Similarity-weighted mean of neighbor ratings for every item they rated
    ///
    /// Returns an empty vector when the user has no history or shares no
    /// items with anyone.
    pub fn score(&self, user_id: &str) -> ScoreVector {
        let neighbors = self.neighbors(user_id);
        if neighbors.is_empty() {
            tracing::debug!(user_id = %user_id, "No collaborative neighbors");
            return ScoreVector::new();
        }

        let mut weighted: HashMap<&ItemId, (f64, f64)> = HashMap::new();
        for neighbor in &neighbors {
            let Some(ratings) = self.snapshot.ratings_for(&neighbor.user_id) else {
                continue;
            };
            for (item_id, rating) in ratings {
                let entry = weighted.entry(item_id).or_insert((0.0, 0.0));
                entry.0 += neighbor.similarity * rating;
                entry.1 += neighbor.similarity;
            }
        }

        tracing::debug!(
            user_id = %user_id,
            neighbors = neighbors.len(),
            items = weighted.len(),
            "Collaborative scores computed"
        );

        weighted
            .into_iter()
            .map(|(item_id, (sum, total_similarity))| (item_id.clone(), sum / total_similarity))
            .collect()
    }
}

/// Cosine similarity of two sparse rating vectors (missing ratings count as 0)
pub fn cosine_similarity(a: &HashMap<ItemId, f64>, b: &HashMap<ItemId, f64>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(item, x)| large.get(item).map(|y| x * y))
        .sum();
    if dot == 0.0 {
        return 0.0;
    }

    let norm = |v: &HashMap<ItemId, f64>| v.values().map(|x| x * x).sum::<f64>().sqrt();
    let denominator = norm(a) * norm(b);
    if denominator == 0.0 {
        0.0
    } else {
        (dot / denominator).clamp(-1.0, 1.0)
    }
}
