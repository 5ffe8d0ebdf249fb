use serde::Serialize;
use thiserror::Error;

use super::collaborative::{CollaborativeParams, CollaborativeRecommender};
use super::content::{ContentParams, ContentRecommender};
use super::context::{BoostTable, ContextRecommender, FeatureRules};
use super::hybrid::{combine, Signals, Weights};
use crate::db::Snapshot;
use crate::models::{Context, ScoredItem, UserId};

/// Errors raised by the recommendation core
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("User {0} has no profile")]
    UserNotFound(UserId),
    #[error("{0}")]
    InvalidConfig(String),
}

/// Everything the recommenders need besides the snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderConfig {
    pub default_weights: Weights,
    pub default_limit: usize,
    pub collaborative: CollaborativeParams,
    pub content: ContentParams,
    pub boost_table: BoostTable,
    pub feature_rules: FeatureRules,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            default_weights: Weights::default(),
            default_limit: 10,
            collaborative: CollaborativeParams::default(),
            content: ContentParams::default(),
            boost_table: BoostTable::default(),
            feature_rules: FeatureRules::default(),
        }
    }
}

/// One call to [`recommend`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendRequest {
    pub user_id: UserId,
    /// Absent context disables the context recommender
    pub context: Option<Context>,
    /// Overrides the configured default blend
    pub weights: Option<Weights>,
    /// Maximum list length; the configured default when `None`
    pub limit: Option<usize>,
    /// Drop items the user has already ordered
    pub exclude_ordered: bool,
}

impl RecommendRequest {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            context: None,
            weights: None,
            limit: None,
            exclude_ordered: false,
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Ranked recommendations for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub user_id: UserId,
    pub context: Option<Context>,
    /// Blend weights after redistribution, `None` when nothing could be scored
    pub applied_weights: Option<Weights>,
    pub items: Vec<ScoredItem>,
}

/// Produces a ranked list of items for a user
///
/// Weights are validated before any scoring. An empty list is a valid
/// outcome (for example, no items, or all weight on a recommender with no
/// signal for this user).
pub fn recommend(
    snapshot: &Snapshot,
    config: &RecommenderConfig,
    request: &RecommendRequest,
) -> Result<Recommendations, RecommendError> {
    let weights = request.weights.unwrap_or(config.default_weights);
    weights.validate()?;

    let user = snapshot
        .user(&request.user_id)
        .ok_or_else(|| RecommendError::UserNotFound(request.user_id.clone()))?;

    let signals = Signals {
        collaborative: CollaborativeRecommender::new(snapshot, &config.collaborative)
            .score(&user.id),
        content: ContentRecommender::new(snapshot, &config.content).score(user),
        context: request.context.map(|ctx| {
            ContextRecommender::new(snapshot, &config.boost_table, &config.feature_rules)
                .score(&ctx)
        }),
    };

    let blend = combine(&signals, &weights);
    let limit = request.limit.unwrap_or(config.default_limit);

    let items: Vec<ScoredItem> = blend
        .ranked
        .into_iter()
        .filter(|s| !request.exclude_ordered || !snapshot.has_ordered(&user.id, &s.item_id))
        .take(limit)
        .collect();

    tracing::info!(
        user_id = %user.id,
        collaborative = signals.collaborative.len(),
        content = signals.content.len(),
        context = signals.context.as_ref().map(|v| v.len()).unwrap_or(0),
        returned = items.len(),
        "Recommendations computed"
    );

    Ok(Recommendations {
        user_id: user.id.clone(),
        context: request.context,
        applied_weights: blend.applied_weights,
        items,
    })
}
