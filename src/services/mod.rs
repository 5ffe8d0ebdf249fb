pub mod analytics;
pub mod collaborative;
pub mod content;
pub mod context;
pub mod evaluation;
pub mod hybrid;
pub mod recommendations;

pub use analytics::{summarize, AnalyticsReport, CountEntry};
pub use collaborative::{CollaborativeParams, CollaborativeRecommender};
pub use content::{ContentParams, ContentRecommender};
pub use context::{BoostTable, ContextRecommender, FeatureRules};
pub use evaluation::{evaluate, EvaluationOptions, EvaluationReport};
pub use hybrid::{combine, Weights};
pub use recommendations::{
    recommend, RecommendError, RecommendRequest, Recommendations, RecommenderConfig,
};
