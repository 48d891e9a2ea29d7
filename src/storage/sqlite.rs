use super::traits::RecordStore;
use crate::config::is_valid_table_name;
use crate::error::{Result, RollupError};
use crate::types::{FieldMap, ItemKey, StoreItem};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// SQLite-backed record store. One table, primary key `(pk, sk)`,
/// field maps stored as JSON text.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P, table: &str) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!("Opened SQLite store at {} (table {})", path.display(), table);
        Self::with_connection(conn, table)
    }

    pub fn open_in_memory(table: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        // The table name is interpolated into SQL, so only plain identifiers get through.
        if !is_valid_table_name(table) {
            return Err(RollupError::Config(format!(
                "table name '{table}' is not a plain SQL identifier"
            )));
        }
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                pk    TEXT    NOT NULL,
                sk    INTEGER NOT NULL,
                data  TEXT    NOT NULL,
                PRIMARY KEY (pk, sk)
            );
            "#
        ))?;
        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RollupError::Store {
            message: "SQLite connection lock poisoned".to_string(),
        })
    }
}

fn decode_data(raw: &str) -> Result<FieldMap> {
    Ok(serde_json::from_str(raw)?)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn put_item(&self, item: &StoreItem) -> Result<()> {
        let data = serde_json::to_string(&item.data)?;
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (pk, sk, data) VALUES (?1, ?2, ?3)",
                self.table
            ),
            params![item.pk, item.sk, data],
        )?;
        debug!("Stored item {} / {}", item.pk, item.sk);
        Ok(())
    }

    async fn query_range(&self, pk: &str, sk_from: i64, sk_to: i64) -> Result<Vec<StoreItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT sk, data FROM {} WHERE pk = ?1 AND sk BETWEEN ?2 AND ?3 ORDER BY sk",
            self.table
        ))?;
        let rows = stmt.query_map(params![pk, sk_from, sk_to], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (sk, data) = row?;
            items.push(StoreItem {
                pk: pk.to_string(),
                sk,
                data: decode_data(&data)?,
            });
        }
        debug!("Range query on {} returned {} items", pk, items.len());
        Ok(items)
    }

    async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<StoreItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT data FROM {} WHERE pk = ?1 AND sk = ?2",
            self.table
        ))?;

        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            let data: Option<String> = stmt
                .query_row(params![key.pk, key.sk], |row| row.get(0))
                .optional()?;
            if let Some(data) = data {
                items.push(StoreItem {
                    pk: key.pk.clone(),
                    sk: key.sk,
                    data: decode_data(&data)?,
                });
            }
        }
        Ok(items)
    }
}
