use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::{FoodItem, ItemId, Order, User, UserId};

/// Knobs that shape how raw orders become the rating matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotOptions {
    /// Top of the rating scale; ratings are divided by it to land in [0, 1]
    pub rating_scale_max: f64,
    /// Rating assumed for orders that carry none
    pub implicit_rating: f64,
    /// How many of the most common cuisines make up the population default
    pub population_cuisines: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            rating_scale_max: 5.0,
            implicit_rating: 1.0,
            population_cuisines: 3,
        }
    }
}

/// Row counts of a snapshot, reported after loads and reloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub users: usize,
    pub items: usize,
    pub orders: usize,
}

/// Read-only view of users, items and orders shared by all recommenders
///
/// A snapshot is built once and never mutated. Derived data (the normalized
/// rating matrix and the population cuisine defaults) is computed at build
/// time. To pick up new data, build a new snapshot and swap it in.
#[derive(Debug, Clone)]
pub struct Snapshot {
    users: HashMap<UserId, User>,
    items: BTreeMap<ItemId, FoodItem>,
    orders: Vec<Order>,
    /// user -> item -> mean rating normalized into [0, 1]
    ratings: HashMap<UserId, HashMap<ItemId, f64>>,
    population_cuisines: Vec<String>,
    options: SnapshotOptions,
    built_at: DateTime<Utc>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::build(Vec::new(), Vec::new(), Vec::new(), SnapshotOptions::default())
    }
}

impl Snapshot {
    /// Builds a snapshot, dropping orders that reference unknown users or items
    pub fn build(
        users: Vec<User>,
        items: Vec<FoodItem>,
        orders: Vec<Order>,
        options: SnapshotOptions,
    ) -> Self {
        let users: HashMap<UserId, User> = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        let items: BTreeMap<ItemId, FoodItem> =
            items.into_iter().map(|i| (i.id.clone(), i)).collect();

        let total_orders = orders.len();
        let orders: Vec<Order> = orders
            .into_iter()
            .filter(|o| users.contains_key(&o.user_id) && items.contains_key(&o.item_id))
            .collect();

        let dropped = total_orders - orders.len();
        if dropped > 0 {
            tracing::warn!(
                dropped,
                kept = orders.len(),
                "Dropped orders referencing unknown users or items"
            );
        }

        let ratings = build_rating_matrix(&orders, &options);
        let population_cuisines = most_common_cuisines(users.values(), options.population_cuisines);

        Self {
            users,
            items,
            orders,
            ratings,
            population_cuisines,
            options,
            built_at: Utc::now(),
        }
    }

    /// Rebuilds this snapshot over a different order history
    ///
    /// Users, items and options are kept. Used to train on a subset of orders.
    pub fn with_orders(&self, orders: Vec<Order>) -> Self {
        Self::build(
            self.users.values().cloned().collect(),
            self.items.values().cloned().collect(),
            orders,
            self.options,
        )
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.get(user_id)
    }

    /// All users, in no particular order
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn item(&self, item_id: &str) -> Option<&FoodItem> {
        self.items.get(item_id)
    }

    /// All items, sorted by id
    pub fn items(&self) -> impl Iterator<Item = &FoodItem> {
        self.items.values()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Normalized ratings of one user, `None` if the user never ordered
    pub fn ratings_for(&self, user_id: &str) -> Option<&HashMap<ItemId, f64>> {
        self.ratings.get(user_id)
    }

    /// The full user-item rating matrix
    pub fn rating_matrix(&self) -> &HashMap<UserId, HashMap<ItemId, f64>> {
        &self.ratings
    }

    /// Whether the user has ever ordered the item
    pub fn has_ordered(&self, user_id: &str, item_id: &str) -> bool {
        self.ratings
            .get(user_id)
            .is_some_and(|rated| rated.contains_key(item_id))
    }

    /// Most common cuisine preferences across all users
    pub fn population_cuisines(&self) -> &[String] {
        &self.population_cuisines
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            users: self.users.len(),
            items: self.items.len(),
            orders: self.orders.len(),
        }
    }
}

fn build_rating_matrix(
    orders: &[Order],
    options: &SnapshotOptions,
) -> HashMap<UserId, HashMap<ItemId, f64>> {
    let mut sums: HashMap<(&str, &str), (f64, u32)> = HashMap::new();
    for order in orders {
        let rating = order.rating.unwrap_or(options.implicit_rating);
        let entry = sums
            .entry((order.user_id.as_str(), order.item_id.as_str()))
            .or_insert((0.0, 0));
        entry.0 += rating;
        entry.1 += 1;
    }

    let scale = if options.rating_scale_max > 0.0 {
        options.rating_scale_max
    } else {
        tracing::warn!(
            rating_scale_max = options.rating_scale_max,
            "Non-positive rating scale, using raw ratings"
        );
        1.0
    };

    let mut matrix: HashMap<UserId, HashMap<ItemId, f64>> = HashMap::new();
    for ((user_id, item_id), (sum, count)) in sums {
        let normalized = (sum / count as f64 / scale).clamp(0.0, 1.0);
        matrix
            .entry(user_id.to_string())
            .or_default()
            .insert(item_id.to_string(), normalized);
    }
    matrix
}

/// Counts cuisine preferences case-insensitively, keeping the first spelling
/// seen. Ties are broken alphabetically so the result is stable.
fn most_common_cuisines<'a>(users: impl Iterator<Item = &'a User>, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (String, usize)> = HashMap::new();
    for user in users {
        for cuisine in &user.cuisine_preferences {
            counts
                .entry(cuisine.to_lowercase())
                .or_insert_with(|| (cuisine.clone(), 0))
                .1 += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_values().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.to_lowercase().cmp(&b.0.to_lowercase())));
    ranked.into_iter().take(limit).map(|(name, _)| name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceBands;
    use chrono::TimeZone;

    fn user(id: &str, cuisines: &[&str]) -> User {
        let mut user = User::new(id, id.to_uppercase());
        for cuisine in cuisines {
            user.add_cuisine(*cuisine);
        }
        user
    }

    fn item(id: &str) -> FoodItem {
        FoodItem::new(id, id, "Italian", "Main Course", 12.0, &PriceBands::default())
    }

    fn order(id: &str, user_id: &str, item_id: &str, rating: Option<f64>) -> Order {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Order::new(id, user_id, item_id, ts, rating)
    }

    #[test]
    fn test_ratings_are_averaged_and_normalized() {
        let snapshot = Snapshot::build(
            vec![user("u1", &[])],
            vec![item("a"), item("b")],
            vec![
                order("o1", "u1", "a", Some(5.0)),
                order("o2", "u1", "a", Some(3.0)),
                order("o3", "u1", "b", None),
            ],
            SnapshotOptions::default(),
        );

        let ratings = snapshot.ratings_for("u1").unwrap();
        assert!((ratings["a"] - 0.8).abs() < 1e-9);
        assert!((ratings["b"] - 0.2).abs() < 1e-9);
        assert!(snapshot.has_ordered("u1", "a"));
        assert!(!snapshot.has_ordered("u1", "zzz"));
    }

    #[test]
    fn test_dangling_orders_are_dropped() {
        let snapshot = Snapshot::build(
            vec![user("u1", &[])],
            vec![item("a")],
            vec![
                order("o1", "u1", "a", Some(4.0)),
                order("o2", "u1", "ghost", Some(4.0)),
                order("o3", "nobody", "a", Some(4.0)),
            ],
            SnapshotOptions::default(),
        );

        assert_eq!(
            snapshot.stats(),
            SnapshotStats {
                users: 1,
                items: 1,
                orders: 1
            }
        );
    }

    #[test]
    fn test_population_cuisines() {
        let snapshot = Snapshot::build(
            vec![
                user("u1", &["Thai", "Italian"]),
                user("u2", &["italian", "Mexican"]),
                user("u3", &["Thai", "Italian", "Indian"]),
            ],
            vec![],
            vec![],
            SnapshotOptions {
                population_cuisines: 2,
                ..SnapshotOptions::default()
            },
        );

        // Italian x3 beats Thai x2; Mexican and Indian are cut
        assert_eq!(snapshot.population_cuisines(), ["Italian", "Thai"]);
    }

    #[test]
    fn test_with_orders_keeps_catalog() {
        let snapshot = Snapshot::build(
            vec![user("u1", &[])],
            vec![item("a"), item("b")],
            vec![order("o1", "u1", "a", Some(4.0))],
            SnapshotOptions::default(),
        );

        let trimmed = snapshot.with_orders(Vec::new());
        assert_eq!(trimmed.stats().items, 2);
        assert_eq!(trimmed.stats().orders, 0);
        assert!(trimmed.ratings_for("u1").is_none());
    }

    #[test]
    fn test_items_are_sorted_by_id() {
        let snapshot = Snapshot::build(
            vec![],
            vec![item("c"), item("a"), item("b")],
            vec![],
            SnapshotOptions::default(),
        );
        let ids: Vec<&str> = snapshot.items().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
