use std::sync::Arc;

use tokio::sync::RwLock;

use crate::db::{Snapshot, SnapshotOptions, SnapshotStats, SnapshotStore};
use crate::error::AppResult;
use crate::services::RecommenderConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Current snapshot; requests clone the `Arc` and drop the lock
    snapshot: Arc<RwLock<Arc<Snapshot>>>,
    store: Arc<dyn SnapshotStore>,
    pub config: Arc<RecommenderConfig>,
    snapshot_options: SnapshotOptions,
}

impl AppState {
    /// Loads the first snapshot from `store`
    pub async fn load(
        store: Arc<dyn SnapshotStore>,
        config: RecommenderConfig,
        snapshot_options: SnapshotOptions,
    ) -> AppResult<Self> {
        let snapshot = store.load_snapshot(snapshot_options).await?;
        tracing::info!(
            store = store.name(),
            users = snapshot.stats().users,
            items = snapshot.stats().items,
            orders = snapshot.stats().orders,
            "Snapshot loaded"
        );

        Ok(Self {
            snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
            store,
            config: Arc::new(config),
            snapshot_options,
        })
    }

    /// The snapshot requests should read from right now
    pub async fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    /// Rebuilds the snapshot from the store and swaps it in
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn reload(&self) -> AppResult<SnapshotStats> {
        let fresh = match self.store.load_snapshot(self.snapshot_options).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot reload failed, keeping previous snapshot");
                return Err(e);
            }
        };

        let stats = fresh.stats();
        *self.snapshot.write().await = Arc::new(fresh);
        tracing::info!(
            users = stats.users,
            items = stats.items,
            orders = stats.orders,
            "Snapshot reloaded"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockSnapshotStore;
    use crate::error::AppError;
    use crate::models::{FoodItem, PriceBands, User};

    fn one_of_each() -> Snapshot {
        Snapshot::build(
            vec![User::new("u1", "Ada")],
            vec![FoodItem::new("f1", "Dal", "Indian", "Dinner", 9.0, &PriceBands::default())],
            vec![],
            SnapshotOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot() {
        let mut store = MockSnapshotStore::new();
        let mut calls = 0;
        store.expect_load_snapshot().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(Snapshot::default())
            } else {
                Ok(one_of_each())
            }
        });
        store.expect_name().return_const("mock");

        let state = AppState::load(
            Arc::new(store),
            RecommenderConfig::default(),
            SnapshotOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(state.current().await.stats().items, 0);

        let stats = state.reload().await.unwrap();
        assert_eq!(stats.items, 1);
        assert_eq!(state.current().await.stats().users, 1);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let mut store = MockSnapshotStore::new();
        let mut calls = 0;
        store.expect_load_snapshot().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(one_of_each())
            } else {
                Err(AppError::Internal("database went away".to_string()))
            }
        });
        store.expect_name().return_const("mock");

        let state = AppState::load(
            Arc::new(store),
            RecommenderConfig::default(),
            SnapshotOptions::default(),
        )
        .await
        .unwrap();

        let held = state.current().await;
        assert!(state.reload().await.is_err());

        let after = state.current().await;
        assert!(Arc::ptr_eq(&held, &after));
        assert_eq!(after.stats().items, 1);
    }
}
