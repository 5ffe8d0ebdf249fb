pub mod snapshot;
pub mod sqlite;
pub mod store;

pub use snapshot::{Snapshot, SnapshotOptions, SnapshotStats};
pub use sqlite::create_pool;
pub use store::{SnapshotStore, SqliteStore};
