use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::AppState;
use crate::db::{Snapshot, SnapshotStats};
use crate::error::{AppError, AppResult};
use crate::models::{Context, FoodItem, PriceTier, ScoredItem, User};
use crate::services::{
    evaluate, recommend, summarize, AnalyticsReport, EvaluationOptions, EvaluationReport,
    RecommendRequest, Weights,
};

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: String,
    /// Weather label, either a category name or an OpenWeather condition
    pub weather: Option<String>,
    pub mood: Option<String>,
    /// Free chat text the mood is read from when `mood` is absent
    pub mood_text: Option<String>,
    pub weights: Option<Weights>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub exclude_ordered: bool,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: String,
    pub name: String,
    pub cuisine_preferences: Vec<String>,
    pub dietary_restrictions: Vec<String>,
    pub preferred_price_tier: Option<PriceTier>,
    pub location: Option<String>,
    pub order_count: usize,
}

impl UserResponse {
    fn new(user: &User, snapshot: &Snapshot) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            cuisine_preferences: user.cuisine_preferences.clone(),
            dietary_restrictions: user.dietary_restrictions.clone(),
            preferred_price_tier: user.preferred_price_tier,
            location: user.location.clone(),
            order_count: snapshot
                .orders()
                .iter()
                .filter(|o| o.user_id == user.id)
                .count(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub food_id: String,
    pub name: String,
    pub cuisine: String,
    pub category: String,
    pub price: f64,
    pub price_tier: PriceTier,
    pub dietary: Vec<String>,
    pub flavor: Option<String>,
}

impl From<&FoodItem> for ItemResponse {
    fn from(item: &FoodItem) -> Self {
        Self {
            food_id: item.id.clone(),
            name: item.name.clone(),
            cuisine: item.cuisine.clone(),
            category: item.category.clone(),
            price: item.price,
            price_tier: item.price_tier,
            dietary: item.dietary.iter().cloned().collect(),
            flavor: item.flavor.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendedItem {
    pub food_id: String,
    pub score: f64,
    pub name: Option<String>,
    pub cuisine: Option<String>,
    pub price: Option<f64>,
}

impl RecommendedItem {
    fn new(scored: ScoredItem, snapshot: &Snapshot) -> Self {
        let item = snapshot.item(&scored.item_id);
        Self {
            score: scored.score,
            name: item.map(|i| i.name.clone()),
            cuisine: item.map(|i| i.cuisine.clone()),
            price: item.map(|i| i.price),
            food_id: scored.item_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub user_id: String,
    pub context: Option<Context>,
    pub applied_weights: Option<Weights>,
    pub recommendations: Vec<RecommendedItem>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluationQuery {
    pub k: Option<usize>,
    pub train_fraction: Option<f64>,
}

impl EvaluationQuery {
    fn options(&self) -> AppResult<EvaluationOptions> {
        let defaults = EvaluationOptions::default();
        let options = EvaluationOptions {
            k: self.k.unwrap_or(defaults.k),
            train_fraction: self.train_fraction.unwrap_or(defaults.train_fraction),
        };
        options
            .validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        Ok(options)
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    /// Length of the top-item and per-user lists
    pub top: Option<usize>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Get one user's profile
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let snapshot = state.current().await;
    let user = snapshot
        .user(&user_id)
        .ok_or_else(|| AppError::NotFound(format!("User {} has no profile", user_id)))?;
    Ok(Json(UserResponse::new(user, &snapshot)))
}

/// Get the item catalog, sorted by id
pub async fn list_items(State(state): State<AppState>) -> Json<Vec<ItemResponse>> {
    let snapshot = state.current().await;
    Json(snapshot.items().map(ItemResponse::from).collect())
}

/// Rank items for a user under an optional weather/mood context
pub async fn get_recommendations(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    if request.limit == Some(0) {
        return Err(AppError::InvalidInput("limit must be at least 1".to_string()));
    }

    let context = Context::resolve(
        request.weather.as_deref(),
        request.mood.as_deref(),
        request.mood_text.as_deref(),
    )?;
    if context.is_none() && (request.weather.is_some() || request.mood.is_some()) {
        tracing::debug!(user_id = %request.user_id, "Partial context ignored");
    }

    let snapshot = state.current().await;
    let result = recommend(
        &snapshot,
        &state.config,
        &RecommendRequest {
            user_id: request.user_id,
            context,
            weights: request.weights,
            limit: request.limit,
            exclude_ordered: request.exclude_ordered,
        },
    )?;

    Ok(Json(RecommendationResponse {
        recommendations: result
            .items
            .into_iter()
            .map(|scored| RecommendedItem::new(scored, &snapshot))
            .collect(),
        user_id: result.user_id,
        context: result.context,
        applied_weights: result.applied_weights,
    }))
}

/// Replay order history and report precision/recall per recommender
pub async fn get_evaluation(
    State(state): State<AppState>,
    Query(query): Query<EvaluationQuery>,
) -> AppResult<Json<EvaluationReport>> {
    let options = query.options()?;
    let snapshot = state.current().await;
    let config = state.config.clone();

    let report = tokio::task::spawn_blocking(move || evaluate(&snapshot, &config, &options))
        .await
        .map_err(|e| AppError::Internal(format!("evaluation task failed: {}", e)))??;

    Ok(Json(report))
}

/// Order and preference aggregates over the current snapshot
pub async fn get_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<AnalyticsReport>> {
    let top = query.top.unwrap_or(10);
    if top == 0 {
        return Err(AppError::InvalidInput("top must be at least 1".to_string()));
    }
    let snapshot = state.current().await;
    Ok(Json(summarize(&snapshot, top)))
}

/// Rebuild the snapshot from storage
pub async fn reload_snapshot(State(state): State<AppState>) -> AppResult<Json<SnapshotStats>> {
    Ok(Json(state.reload().await?))
}
