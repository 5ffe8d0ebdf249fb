use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::db::{Snapshot, SnapshotStats};
use crate::models::{Mood, Weather};

/// One label and how often it occurs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub label: String,
    pub count: usize,
}

/// An item and how many orders it received
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemCount {
    pub food_id: String,
    pub name: String,
    pub orders: usize,
}

/// Aggregate view of the order history and user profiles in a snapshot
///
/// Every count list is sorted by count, highest first, with ties broken by
/// label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub totals: SnapshotStats,
    pub snapshot_built_at: DateTime<Utc>,
    pub orders_with_context: usize,
    /// Every weather category, including those with no orders
    pub orders_by_weather: Vec<CountEntry>,
    /// Every mood, including those with no orders
    pub orders_by_mood: Vec<CountEntry>,
    pub cuisine_popularity: Vec<CountEntry>,
    pub category_popularity: Vec<CountEntry>,
    pub top_items: Vec<ItemCount>,
    pub orders_per_user: Vec<CountEntry>,
    pub cuisine_preferences: Vec<CountEntry>,
    pub dietary_preferences: Vec<CountEntry>,
}

fn ranked(counts: BTreeMap<String, usize>) -> Vec<CountEntry> {
    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(label, count)| CountEntry { label, count })
        .collect();
    // stable sort keeps the BTreeMap's label order among equal counts
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

/// Summarizes a snapshot; `top` caps the item and per-user lists
pub fn summarize(snapshot: &Snapshot, top: usize) -> AnalyticsReport {
    let mut by_weather: BTreeMap<String, usize> =
        Weather::ALL.iter().map(|w| (w.to_string(), 0)).collect();
    let mut by_mood: BTreeMap<String, usize> =
        Mood::ALL.iter().map(|m| (m.to_string(), 0)).collect();
    let mut cuisines: BTreeMap<String, usize> = BTreeMap::new();
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    let mut per_item: HashMap<&str, usize> = HashMap::new();
    let mut per_user: BTreeMap<String, usize> = BTreeMap::new();
    let mut with_context = 0;

    for order in snapshot.orders() {
        if let Some(ctx) = order.context {
            with_context += 1;
            *by_weather.entry(ctx.weather.to_string()).or_default() += 1;
            *by_mood.entry(ctx.mood.to_string()).or_default() += 1;
        }
        if let Some(item) = snapshot.item(&order.item_id) {
            *cuisines.entry(item.cuisine.clone()).or_default() += 1;
            *categories.entry(item.category.clone()).or_default() += 1;
        }
        *per_item.entry(order.item_id.as_str()).or_default() += 1;
        *per_user.entry(order.user_id.clone()).or_default() += 1;
    }

    let mut top_items: Vec<ItemCount> = snapshot
        .items()
        .filter_map(|item| {
            per_item.get(item.id.as_str()).map(|&orders| ItemCount {
                food_id: item.id.clone(),
                name: item.name.clone(),
                orders,
            })
        })
        .collect();
    top_items.sort_by(|a, b| b.orders.cmp(&a.orders));
    top_items.truncate(top);

    let mut orders_per_user = ranked(per_user);
    orders_per_user.truncate(top);

    let mut cuisine_preferences: BTreeMap<String, usize> = BTreeMap::new();
    let mut dietary_preferences: BTreeMap<String, usize> = BTreeMap::new();
    for user in snapshot.users() {
        for cuisine in &user.cuisine_preferences {
            *cuisine_preferences.entry(cuisine.clone()).or_default() += 1;
        }
        for restriction in &user.dietary_restrictions {
            *dietary_preferences.entry(restriction.clone()).or_default() += 1;
        }
    }

    AnalyticsReport {
        totals: snapshot.stats(),
        snapshot_built_at: snapshot.built_at(),
        orders_with_context: with_context,
        orders_by_weather: ranked(by_weather),
        orders_by_mood: ranked(by_mood),
        cuisine_popularity: ranked(cuisines),
        category_popularity: ranked(categories),
        top_items,
        orders_per_user,
        cuisine_preferences: ranked(cuisine_preferences),
        dietary_preferences: ranked(dietary_preferences),
    }
}
