use sqlx::SqlitePool;

use super::{Snapshot, SnapshotOptions};
use crate::{
    error::AppResult,
    models::{parse_tag_list, parse_timestamp, Context, FoodItem, Order, PriceBands, User},
};

/// Source of recommendation snapshots
///
/// The service only ever reads through this trait, so a snapshot can be
/// rebuilt from any backing storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Loads users, items and orders and builds a fresh snapshot
    async fn load_snapshot(&self, options: SnapshotOptions) -> AppResult<Snapshot>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

/// Snapshot store backed by the SQLite tables `users`, `food_items` and `orders`
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    price_bands: PriceBands,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    name: Option<String>,
    cuisine_preferences: Option<String>,
    dietary_restrictions: Option<String>,
    preferred_price_tier: Option<String>,
    location: Option<String>,
}

#[derive(sqlx::FromRow)]
struct FoodItemRow {
    food_id: String,
    name: String,
    cuisine: String,
    category: String,
    price: f64,
    tags: Option<String>,
    attributes: Option<String>,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    order_id: String,
    user_id: String,
    food_id: String,
    timestamp: String,
    mood: Option<String>,
    weather: Option<String>,
    rating: Option<f64>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, price_bands: PriceBands) -> Self {
        Self { pool, price_bands }
    }

    async fn load_users(&self) -> AppResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT user_id, name, cuisine_preferences, dietary_restrictions,
                   preferred_price_tier, location
            FROM users
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(user_from_row).collect())
    }

    async fn load_items(&self) -> AppResult<Vec<FoodItem>> {
        let rows: Vec<FoodItemRow> = sqlx::query_as(
            r#"
            SELECT food_id, name, cuisine, category, price, tags, attributes
            FROM food_items
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let item = FoodItem::new(
                    row.food_id,
                    row.name,
                    row.cuisine,
                    row.category,
                    row.price,
                    &self.price_bands,
                )
                .with_dietary(parse_tag_list(row.tags.as_deref().unwrap_or_default()));
                match row.attributes.as_deref().map(str::trim) {
                    Some(flavor) if !flavor.is_empty() => item.with_flavor(flavor),
                    _ => item,
                }
            })
            .collect())
    }

    async fn load_orders(&self) -> AppResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT order_id, user_id, food_id, timestamp, mood, weather, rating
            FROM orders
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(timestamp) = parse_timestamp(&row.timestamp) else {
                tracing::warn!(
                    order_id = %row.order_id,
                    timestamp = %row.timestamp,
                    "Skipping order with unreadable timestamp"
                );
                continue;
            };

            // Recorded labels that no longer parse are treated as unknown context
            let context = Context::resolve(row.weather.as_deref(), row.mood.as_deref(), None)
                .ok()
                .flatten();

            let order = Order::new(row.order_id, row.user_id, row.food_id, timestamp, row.rating);
            orders.push(match context {
                Some(context) => order.with_context(context),
                None => order,
            });
        }

        Ok(orders)
    }
}

fn user_from_row(row: UserRow) -> User {
    let mut user = User::new(row.user_id, row.name.unwrap_or_default());
    for cuisine in parse_tag_list(row.cuisine_preferences.as_deref().unwrap_or_default()) {
        user.add_cuisine(cuisine);
    }
    for restriction in parse_tag_list(row.dietary_restrictions.as_deref().unwrap_or_default()) {
        user.add_restriction(restriction);
    }
    user.preferred_price_tier = row
        .preferred_price_tier
        .as_deref()
        .filter(|tier| !tier.trim().is_empty())
        .and_then(|tier| match tier.parse() {
            Ok(tier) => Some(tier),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Ignoring price preference");
                None
            }
        });
    user.location = row.location;
    user
}

#[async_trait::async_trait]
impl SnapshotStore for SqliteStore {
    async fn load_snapshot(&self, options: SnapshotOptions) -> AppResult<Snapshot> {
        let users = self.load_users().await?;
        let items = self.load_items().await?;
        let orders = self.load_orders().await?;

        tracing::info!(
            store = self.name(),
            users = users.len(),
            items = items.len(),
            orders = orders.len(),
            "Loaded recommendation data"
        );

        Ok(Snapshot::build(users, items, orders, options))
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
