use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::hybrid::Weights;
use super::recommendations::{recommend, RecommendError, RecommendRequest, RecommenderConfig};
use crate::db::Snapshot;
use crate::models::{Context, ItemId, Order, UserId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationOptions {
    /// Length of each recommendation list
    pub k: usize,
    /// Share of orders, oldest first, used for training
    pub train_fraction: f64,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            k: 10,
            train_fraction: 0.8,
        }
    }
}

impl EvaluationOptions {
    pub fn validate(&self) -> Result<(), RecommendError> {
        if self.k == 0 {
            return Err(RecommendError::InvalidConfig("k must be at least 1".to_string()));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(RecommendError::InvalidConfig(format!(
                "train_fraction must be strictly between 0 and 1, got {}",
                self.train_fraction
            )));
        }
        Ok(())
    }
}

/// Micro-averaged precision/recall for one weight preset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmMetrics {
    pub algorithm: String,
    pub weights: Weights,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl AlgorithmMetrics {
    fn from_counts(algorithm: &str, weights: Weights, tp: usize, fp: usize, fn_: usize) -> Self {
        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            algorithm: algorithm.to_string(),
            weights,
            precision,
            recall,
            f1,
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub k: usize,
    pub train_orders: usize,
    pub test_orders: usize,
    pub users_evaluated: usize,
    pub metrics: Vec<AlgorithmMetrics>,
}

/// What one user actually ordered in the held-out split
struct HeldOut {
    items: BTreeSet<ItemId>,
    /// Context of the user's most recent held-out order
    context: Option<Context>,
}

/// Replays the order history to measure each recommender
///
/// Orders are sorted by timestamp (then id) and split at `train_fraction`.
/// Recommenders see a snapshot built from the older orders only, and their
/// top-k lists are compared with what each user ordered afterwards.
pub fn evaluate(
    snapshot: &Snapshot,
    config: &RecommenderConfig,
    options: &EvaluationOptions,
) -> Result<EvaluationReport, RecommendError> {
    options.validate()?;

    let mut orders: Vec<Order> = snapshot.orders().to_vec();
    orders.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let train_size = (orders.len() as f64 * options.train_fraction) as usize;
    let test = orders.split_off(train_size);
    let train_orders = orders.len();
    let training = snapshot.with_orders(orders);

    let mut held_out: BTreeMap<UserId, HeldOut> = BTreeMap::new();
    for order in &test {
        let entry = held_out.entry(order.user_id.clone()).or_insert_with(|| HeldOut {
            items: BTreeSet::new(),
            context: None,
        });
        entry.items.insert(order.item_id.clone());
        entry.context = order.context;
    }

    let presets = [
        ("collaborative", Weights::new(1.0, 0.0, 0.0)?),
        ("content", Weights::new(0.0, 1.0, 0.0)?),
        ("context", Weights::new(0.0, 0.0, 1.0)?),
        ("hybrid", config.default_weights),
    ];

    let mut metrics = Vec::with_capacity(presets.len());
    for (name, weights) in presets {
        let (mut tp, mut fp, mut fn_) = (0, 0, 0);

        for (user_id, actual) in &held_out {
            let mut request = RecommendRequest::new(user_id.clone())
                .with_weights(weights)
                .with_limit(options.k);
            request.context = actual.context;

            let recommended: BTreeSet<ItemId> = recommend(&training, config, &request)?
                .items
                .into_iter()
                .map(|s| s.item_id)
                .collect();

            let hits = recommended.intersection(&actual.items).count();
            tp += hits;
            fp += recommended.len() - hits;
            fn_ += actual.items.len() - hits;
        }

        let result = AlgorithmMetrics::from_counts(name, weights, tp, fp, fn_);
        tracing::info!(
            algorithm = name,
            precision = result.precision,
            recall = result.recall,
            f1 = result.f1,
            "Evaluated recommender"
        );
        metrics.push(result);
    }

    Ok(EvaluationReport {
        k: options.k,
        train_orders,
        test_orders: test.len(),
        users_evaluated: held_out.len(),
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SnapshotOptions;
    use crate::models::{FoodItem, PriceBands, User};
    use chrono::{Duration, TimeZone, Utc};

    fn history() -> Snapshot {
        let bands = PriceBands::default();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
        let at = |hours: i64| start + Duration::hours(hours);

        Snapshot::build(
            vec![User::new("a", "A"), User::new("b", "B")],
            vec![
                FoodItem::new("x", "Ramen", "Japanese", "Dinner", 12.0, &bands),
                FoodItem::new("y", "Pho", "Vietnamese", "Dinner", 11.0, &bands),
            ],
            vec![
                // inserted out of order on purpose
                Order::new("o4", "a", "y", at(4), Some(5.0)),
                Order::new("o1", "a", "x", at(1), Some(4.0)),
                Order::new("o2", "b", "x", at(2), Some(2.0)),
                Order::new("o3", "b", "y", at(3), Some(5.0)),
            ],
            SnapshotOptions::default(),
        )
    }

    fn metric<'a>(report: &'a EvaluationReport, name: &str) -> &'a AlgorithmMetrics {
        report
            .metrics
            .iter()
            .find(|m| m.algorithm == name)
            .unwrap()
    }

    #[test]
    fn test_chronological_split() {
        let options = EvaluationOptions {
            k: 1,
            train_fraction: 0.75,
        };
        let report = evaluate(&history(), &RecommenderConfig::default(), &options).unwrap();

        assert_eq!(report.train_orders, 3);
        assert_eq!(report.test_orders, 1);
        assert_eq!(report.users_evaluated, 1);
        assert_eq!(report.metrics.len(), 4);
    }

    #[test]
    fn test_collaborative_hit() {
        let options = EvaluationOptions {
            k: 1,
            train_fraction: 0.75,
        };
        let report = evaluate(&history(), &RecommenderConfig::default(), &options).unwrap();

        // b rated y above x, and a's held-out order is y
        let collaborative = metric(&report, "collaborative");
        assert_eq!(collaborative.true_positives, 1);
        assert_eq!(collaborative.precision, 1.0);
        assert_eq!(collaborative.recall, 1.0);
        assert_eq!(collaborative.f1, 1.0);

        // nobody stated preferences, so content has nothing to offer
        let content = metric(&report, "content");
        assert_eq!(content.true_positives, 0);
        assert_eq!(content.false_negatives, 1);
        assert_eq!(content.f1, 0.0);

        let hybrid = metric(&report, "hybrid");
        assert_eq!(hybrid.precision, 1.0);
    }

    #[test]
    fn test_rejects_bad_options() {
        let snapshot = history();
        let config = RecommenderConfig::default();
        for options in [
            EvaluationOptions { k: 0, train_fraction: 0.8 },
            EvaluationOptions { k: 5, train_fraction: 1.0 },
            EvaluationOptions { k: 5, train_fraction: f64::NAN },
        ] {
            assert!(matches!(
                evaluate(&snapshot, &config, &options),
                Err(RecommendError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_metrics_from_counts() {
        let m = AlgorithmMetrics::from_counts("x", Weights::default(), 2, 2, 6);
        assert_eq!(m.precision, 0.5);
        assert_eq!(m.recall, 0.25);
        assert!((m.f1 - 1.0 / 3.0).abs() < 1e-12);

        let empty = AlgorithmMetrics::from_counts("x", Weights::default(), 0, 0, 0);
        assert_eq!(empty.f1, 0.0);
    }
}
