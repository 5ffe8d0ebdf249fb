use serde::Deserialize;

use crate::db::SnapshotOptions;
use crate::models::PriceBands;
use crate::services::{
    BoostTable, CollaborativeParams, ContentParams, FeatureRules, RecommendError,
    RecommenderConfig, Weights,
};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// SQLite database connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Default blend weights
    #[serde(default = "default_weight")]
    pub weight_collaborative: f64,
    #[serde(default = "default_weight")]
    pub weight_content: f64,
    #[serde(default = "default_weight")]
    pub weight_context: f64,

    /// List length when a request names none
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default = "default_collab_neighbors")]
    pub collab_neighbors: usize,
    #[serde(default)]
    pub collab_min_similarity: f64,

    #[serde(default = "default_cuisine_weight")]
    pub content_cuisine_weight: f64,
    #[serde(default = "default_dietary_weight")]
    pub content_dietary_weight: f64,
    #[serde(default = "default_price_weight")]
    pub content_price_weight: f64,

    /// Top of the rating scale stored in `orders.rating`
    #[serde(default = "default_rating_scale_max")]
    pub rating_scale_max: f64,

    /// Rating assumed for orders without one
    #[serde(default = "default_implicit_rating")]
    pub implicit_rating: f64,

    /// Upper bound (inclusive) of the low price tier
    #[serde(default = "default_price_low_max")]
    pub price_low_max: f64,

    /// Upper bound (inclusive) of the medium price tier
    #[serde(default = "default_price_medium_max")]
    pub price_medium_max: f64,

    #[serde(default = "default_population_cuisines")]
    pub population_cuisines: usize,

    /// Optional JSON file replacing the built-in boost table
    #[serde(default)]
    pub boost_table_path: Option<String>,

    /// How far a full meal-type and flavor match lifts the context score
    #[serde(default = "default_context_feature_weight")]
    pub context_feature_weight: f64,

    /// Optional JSON file replacing the built-in meal-type and flavor rules
    #[serde(default)]
    pub feature_rules_path: Option<String>,
}

fn default_database_url() -> String {
    "sqlite://database/database.db".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_weight() -> f64 {
    1.0 / 3.0
}

fn default_limit() -> usize {
    10
}

fn default_collab_neighbors() -> usize {
    20
}

fn default_cuisine_weight() -> f64 {
    0.5
}

fn default_dietary_weight() -> f64 {
    0.3
}

fn default_price_weight() -> f64 {
    0.2
}

fn default_rating_scale_max() -> f64 {
    5.0
}

fn default_implicit_rating() -> f64 {
    1.0
}

fn default_price_low_max() -> f64 {
    10.0
}

fn default_price_medium_max() -> f64 {
    20.0
}

fn default_population_cuisines() -> usize {
    3
}

fn default_context_feature_weight() -> f64 {
    crate::services::context::DEFAULT_FEATURE_WEIGHT
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn price_bands(&self) -> PriceBands {
        PriceBands {
            low_max: self.price_low_max,
            medium_max: self.price_medium_max,
        }
    }

    pub fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            rating_scale_max: self.rating_scale_max,
            implicit_rating: self.implicit_rating,
            population_cuisines: self.population_cuisines,
        }
    }

    /// Checks the data-shaping settings that feed the snapshot
    pub fn validate(&self) -> Result<(), RecommendError> {
        if !self.rating_scale_max.is_finite() || self.rating_scale_max <= 0.0 {
            return Err(RecommendError::InvalidConfig(format!(
                "RATING_SCALE_MAX must be positive, got {}",
                self.rating_scale_max
            )));
        }
        if !self.implicit_rating.is_finite()
            || !(0.0..=self.rating_scale_max).contains(&self.implicit_rating)
        {
            return Err(RecommendError::InvalidConfig(format!(
                "IMPLICIT_RATING must lie within [0, {}], got {}",
                self.rating_scale_max, self.implicit_rating
            )));
        }
        let bands_ok = self.price_low_max.is_finite()
            && self.price_medium_max.is_finite()
            && self.price_low_max >= 0.0
            && self.price_low_max <= self.price_medium_max;
        if !bands_ok {
            return Err(RecommendError::InvalidConfig(format!(
                "price bands must satisfy 0 <= PRICE_LOW_MAX <= PRICE_MEDIUM_MAX, got {} and {}",
                self.price_low_max, self.price_medium_max
            )));
        }
        if self.default_limit == 0 {
            return Err(RecommendError::InvalidConfig(
                "DEFAULT_LIMIT must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the recommender configuration
    ///
    /// Every setting is validated and the boost table file, if any, is
    /// loaded. Any problem is an `InvalidConfig` error.
    pub fn recommender(&self) -> Result<RecommenderConfig, RecommendError> {
        self.validate()?;

        let default_weights = Weights::new(
            self.weight_collaborative,
            self.weight_content,
            self.weight_context,
        )?;

        let collaborative = CollaborativeParams {
            neighbors: self.collab_neighbors,
            min_similarity: self.collab_min_similarity,
        };
        collaborative.validate()?;

        let content = ContentParams {
            cuisine_weight: self.content_cuisine_weight,
            dietary_weight: self.content_dietary_weight,
            price_weight: self.content_price_weight,
        };
        content.validate()?;

        let boost_table = match &self.boost_table_path {
            Some(path) => {
                tracing::info!(path = %path, "Loading boost table");
                BoostTable::load(path)?
            }
            None => BoostTable::default(),
        };

        let feature_rules = match &self.feature_rules_path {
            Some(path) => {
                tracing::info!(path = %path, "Loading feature rules");
                FeatureRules::load(path)?
            }
            None => FeatureRules::default(),
        }
        .with_weight(self.context_feature_weight)?;

        Ok(RecommenderConfig {
            default_weights,
            default_limit: self.default_limit,
            collaborative,
            content,
            boost_table,
            feature_rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(Vec::new()).unwrap();
        assert_eq!(config.database_url, "sqlite://database/database.db");
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.snapshot_options(), SnapshotOptions::default());
        assert_eq!(config.price_bands(), PriceBands::default());

        let recommender = config.recommender().unwrap();
        assert_eq!(recommender, RecommenderConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("PORT", "8080"),
            ("WEIGHT_COLLABORATIVE", "0.5"),
            ("WEIGHT_CONTENT", "0.3"),
            ("WEIGHT_CONTEXT", "0.2"),
            ("COLLAB_NEIGHBORS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        let recommender = config.recommender().unwrap();
        assert_eq!(recommender.default_weights.collaborative, 0.5);
        assert_eq!(recommender.collaborative.neighbors, 5);
    }

    #[test]
    fn test_bad_weights_are_invalid_config() {
        let config = Config::from_vars(vars(&[("WEIGHT_COLLABORATIVE", "0.9")])).unwrap();
        assert!(matches!(
            config.recommender(),
            Err(RecommendError::InvalidConfig(_))
        ));
    }

    fn rejected(pairs: &[(&str, &str)]) -> bool {
        let config = Config::from_vars(vars(pairs)).unwrap();
        matches!(config.recommender(), Err(RecommendError::InvalidConfig(_)))
    }

    #[test]
    fn test_negative_min_similarity_is_rejected() {
        assert!(rejected(&[("COLLAB_MIN_SIMILARITY", "-0.5")]));
        assert!(rejected(&[("COLLAB_NEIGHBORS", "0")]));
        assert!(!rejected(&[("COLLAB_MIN_SIMILARITY", "0.2")]));
    }

    #[test]
    fn test_content_weights_are_checked() {
        assert!(rejected(&[
            ("CONTENT_CUISINE_WEIGHT", "0"),
            ("CONTENT_DIETARY_WEIGHT", "0"),
            ("CONTENT_PRICE_WEIGHT", "0"),
        ]));
        assert!(rejected(&[("CONTENT_DIETARY_WEIGHT", "-0.3")]));
    }

    #[test]
    fn test_rating_scale_and_price_bands_are_checked() {
        assert!(rejected(&[("RATING_SCALE_MAX", "0")]));
        assert!(rejected(&[("RATING_SCALE_MAX", "-5")]));
        assert!(rejected(&[("IMPLICIT_RATING", "7")]));
        assert!(rejected(&[("PRICE_LOW_MAX", "25"), ("PRICE_MEDIUM_MAX", "20")]));
        assert!(rejected(&[("DEFAULT_LIMIT", "0")]));
        assert!(!rejected(&[("PRICE_LOW_MAX", "8"), ("PRICE_MEDIUM_MAX", "15")]));
    }

    #[test]
    fn test_feature_rule_settings() {
        let config = Config::from_vars(vars(&[("CONTEXT_FEATURE_WEIGHT", "0")])).unwrap();
        assert_eq!(config.recommender().unwrap().feature_rules.weight(), 0.0);

        assert!(rejected(&[("CONTEXT_FEATURE_WEIGHT", "1.2")]));
        assert!(rejected(&[("FEATURE_RULES_PATH", "/nope/rules.json")]));
    }

    #[test]
    fn test_unparseable_value() {
        assert!(Config::from_vars(vars(&[("PORT", "not-a-port")])).is_err());
    }

    #[test]
    fn test_missing_boost_table_file() {
        let config =
            Config::from_vars(vars(&[("BOOST_TABLE_PATH", "/nope/boosts.json")])).unwrap();
        assert!(config.recommender().is_err());
    }
}
