// Record storage: the store contract plus its adapters

pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::RecordStore;

use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Build the store named by the configuration: SQLite when a path is set,
/// in-memory otherwise.
pub fn open_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match &config.sqlite_path {
        Some(path) => Ok(Arc::new(SqliteStore::open(path, &config.table_name)?)),
        None => {
            info!("Using in-memory storage (data will not persist)");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
