use super::RecommendError;
use crate::db::Snapshot;
use crate::models::{FoodItem, PriceTier, ScoreVector, User};

/// Relative weight of each preference component in the content score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentParams {
    pub cuisine_weight: f64,
    pub dietary_weight: f64,
    pub price_weight: f64,
}

impl Default for ContentParams {
    fn default() -> Self {
        Self {
            cuisine_weight: 0.5,
            dietary_weight: 0.3,
            price_weight: 0.2,
        }
    }
}

impl ContentParams {
    /// Component weights must be finite, non-negative and not all zero
    pub fn validate(&self) -> Result<(), RecommendError> {
        let weights = [self.cuisine_weight, self.dietary_weight, self.price_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RecommendError::InvalidConfig(format!(
                "content weights must be finite and non-negative, got {:?}",
                weights
            )));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(RecommendError::InvalidConfig(
                "content weights must not all be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// The preferences actually used for scoring, after population fallback
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceProfile<'a> {
    pub cuisines: &'a [String],
    pub dietary_restrictions: &'a [String],
    pub price_tier: Option<PriceTier>,
    /// True when `cuisines` came from the population defaults
    pub uses_population_cuisines: bool,
}

impl<'a> PreferenceProfile<'a> {
    /// Takes the user's own preferences, falling back to the population's
    /// most common cuisines when the user listed none
    pub fn for_user(user: &'a User, snapshot: &'a Snapshot) -> Self {
        let (cuisines, uses_population_cuisines) = if user.cuisine_preferences.is_empty() {
            (snapshot.population_cuisines(), true)
        } else {
            (user.cuisine_preferences.as_slice(), false)
        };

        Self {
            cuisines,
            dietary_restrictions: &user.dietary_restrictions,
            price_tier: user.preferred_price_tier,
            uses_population_cuisines,
        }
    }

    fn is_empty(&self) -> bool {
        self.cuisines.is_empty() && self.dietary_restrictions.is_empty() && self.price_tier.is_none()
    }
}

/// Scores items by how well their features match a user's stated preferences
pub struct ContentRecommender<'a> {
    snapshot: &'a Snapshot,
    params: &'a ContentParams,
}

impl<'a> ContentRecommender<'a> {
    pub fn new(snapshot: &'a Snapshot, params: &'a ContentParams) -> Self {
        Self { snapshot, params }
    }

    /// Scores every item in the snapshot for `user`
    ///
    /// Returns an empty vector when there is no preference to compare against.
    pub fn score(&self, user: &User) -> ScoreVector {
        let profile = PreferenceProfile::for_user(user, self.snapshot);
        if profile.is_empty() || self.expressed_weight(&profile) <= 0.0 {
            tracing::debug!(user_id = %user.id, "No content preferences to match");
            return ScoreVector::new();
        }

        if profile.uses_population_cuisines {
            tracing::debug!(
                user_id = %user.id,
                cuisines = ?profile.cuisines,
                "Using population cuisine defaults"
            );
        }

        self.snapshot
            .items()
            .map(|item| (item.id.clone(), self.item_score(&profile, item)))
            .collect()
    }

    /// Total weight of the components the profile expresses
    fn expressed_weight(&self, profile: &PreferenceProfile<'_>) -> f64 {
        let mut weight = 0.0;
        if !profile.cuisines.is_empty() {
            weight += self.params.cuisine_weight;
        }
        if !profile.dietary_restrictions.is_empty() {
            weight += self.params.dietary_weight;
        }
        if profile.price_tier.is_some() {
            weight += self.params.price_weight;
        }
        weight
    }

    /// Weighted overlap between one item and a profile, in [0, 1]
    ///
    /// Only components the profile expresses take part in the average.
    pub fn item_score(&self, profile: &PreferenceProfile<'_>, item: &FoodItem) -> f64 {
        let mut total = 0.0;

        if !profile.cuisines.is_empty() {
            let matched = profile
                .cuisines
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&item.cuisine));
            total += self.params.cuisine_weight * if matched { 1.0 } else { 0.0 };
        }

        if !profile.dietary_restrictions.is_empty() {
            let satisfied = profile
                .dietary_restrictions
                .iter()
                .filter(|r| item.satisfies(r))
                .count();
            let fraction = satisfied as f64 / profile.dietary_restrictions.len() as f64;
            total += self.params.dietary_weight * fraction;
        }

        if let Some(tier) = profile.price_tier {
            let closeness = match tier.distance(item.price_tier) {
                0 => 1.0,
                1 => 0.5,
                _ => 0.0,
            };
            total += self.params.price_weight * closeness;
        }

        let weight = self.expressed_weight(profile);
        if weight > 0.0 {
            total / weight
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SnapshotOptions;
    use crate::models::PriceBands;

    fn catalog() -> Vec<FoodItem> {
        let bands = PriceBands::default();
        vec![
            FoodItem::new("pizza", "Margherita Pizza", "Italian", "Main Course", 8.0, &bands)
                .with_dietary(["Vegetarian"]),
            FoodItem::new("sushi", "Sushi Roll", "Japanese", "Main Course", 26.0, &bands),
            FoodItem::new("curry", "Green Curry", "Thai", "Dinner", 15.0, &bands)
                .with_dietary(["Vegan", "Vegetarian", "Gluten-Free"]),
        ]
    }

    fn italian_low_user() -> User {
        let mut user = User::new("u1", "Ada");
        user.add_cuisine("italian");
        user.preferred_price_tier = Some(PriceTier::Low);
        user
    }

    #[test]
    fn test_italian_low_price_user_prefers_pizza() {
        let user = italian_low_user();
        let snapshot = Snapshot::build(vec![user.clone()], catalog(), vec![], SnapshotOptions::default());
        let params = ContentParams::default();
        let scores = ContentRecommender::new(&snapshot, &params).score(&user);

        assert_eq!(scores.get("pizza"), 1.0);
        assert_eq!(scores.get("sushi"), 0.0);
        // medium tier is one step from low
        assert!((scores.get("curry") - (0.2 * 0.5) / 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_dietary_fraction() {
        let mut user = User::new("u1", "Ada");
        user.add_restriction("Vegan");
        user.add_restriction("Gluten-Free");
        let snapshot = Snapshot::build(vec![user.clone()], catalog(), vec![], SnapshotOptions::default());
        let params = ContentParams::default();
        let recommender = ContentRecommender::new(&snapshot, &params);
        let profile = PreferenceProfile {
            cuisines: &[],
            dietary_restrictions: &user.dietary_restrictions,
            price_tier: None,
            uses_population_cuisines: false,
        };

        let items = catalog();
        assert_eq!(recommender.item_score(&profile, &items[2]), 1.0);
        assert_eq!(recommender.item_score(&profile, &items[0]), 0.0);
    }

    #[test]
    fn test_population_fallback_for_empty_preferences() {
        let mut fan = User::new("fan", "Fan");
        fan.add_cuisine("Thai");
        let newcomer = User::new("new", "Newcomer");
        let snapshot = Snapshot::build(
            vec![fan, newcomer.clone()],
            catalog(),
            vec![],
            SnapshotOptions::default(),
        );
        let params = ContentParams::default();
        let scores = ContentRecommender::new(&snapshot, &params).score(&newcomer);

        assert_eq!(scores.get("curry"), 1.0);
        assert_eq!(scores.get("pizza"), 0.0);
    }

    #[test]
    fn test_no_preferences_anywhere_is_empty() {
        let user = User::new("u1", "Ada");
        let snapshot = Snapshot::build(vec![user.clone()], catalog(), vec![], SnapshotOptions::default());
        let params = ContentParams::default();
        assert!(ContentRecommender::new(&snapshot, &params).score(&user).is_empty());
    }

    #[test]
    fn test_zero_weight_components_give_no_signal() {
        // the user only expresses a cuisine, and cuisine carries no weight
        let mut user = User::new("u1", "Ada");
        user.add_cuisine("Italian");
        let snapshot = Snapshot::build(vec![user.clone()], catalog(), vec![], SnapshotOptions::default());
        let params = ContentParams {
            cuisine_weight: 0.0,
            dietary_weight: 0.5,
            price_weight: 0.5,
        };
        assert!(ContentRecommender::new(&snapshot, &params).score(&user).is_empty());
    }

    #[test]
    fn test_params_validation() {
        assert!(ContentParams::default().validate().is_ok());
        let zeros = ContentParams {
            cuisine_weight: 0.0,
            dietary_weight: 0.0,
            price_weight: 0.0,
        };
        assert!(matches!(zeros.validate(), Err(RecommendError::InvalidConfig(_))));
        let negative = ContentParams {
            cuisine_weight: 0.8,
            dietary_weight: -0.1,
            price_weight: 0.3,
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_scores_cover_every_item() {
        let user = italian_low_user();
        let snapshot = Snapshot::build(vec![user.clone()], catalog(), vec![], SnapshotOptions::default());
        let params = ContentParams::default();
        let scores = ContentRecommender::new(&snapshot, &params).score(&user);
        assert_eq!(scores.len(), 3);
    }
}
