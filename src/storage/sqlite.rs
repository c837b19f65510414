//! SQLite-backed statistics table. Each save rewrites all rows in one transaction.

use super::{StatsBackend, StatsTable};
use crate::error::StoreError;
use crate::features::FeatureStatistics;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open or create DB at path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS feature_stats (
                feature TEXT PRIMARY KEY,
                count REAL NOT NULL,
                mean REAL NOT NULL,
                sum_sq_dev REAL NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl StatsBackend for SqliteBackend {
    fn load(&self) -> Result<StatsTable, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT feature, count, mean, sum_sq_dev FROM feature_stats")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                FeatureStatistics {
                    count: row.get(1)?,
                    mean: row.get(2)?,
                    sum_squared_deviation: row.get(3)?,
                },
            ))
        })?;
        let mut table = StatsTable::new();
        for row in rows {
            let (k, s) = row?;
            table.insert(k, s);
        }
        Ok(table)
    }

    fn save(&self, table: &StatsTable) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM feature_stats", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO feature_stats (feature, count, mean, sum_sq_dev) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (k, s) in table {
                stmt.execute(params![k, s.count, s.mean, s.sum_squared_deviation])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
