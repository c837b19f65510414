//! Durable storage for per-feature calibration statistics.

mod json_file;
mod sqlite;

pub use json_file::JsonFileBackend;
pub use sqlite::SqliteBackend;

use crate::config::{ScoringConfig, StatsBackendKind};
use crate::error::StoreError;
use crate::features::FeatureStatistics;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Feature key → statistics, the whole persisted state.
pub type StatsTable = BTreeMap<String, FeatureStatistics>;

/// Persistence seam for the normalizer. `save` always receives the full table.
pub trait StatsBackend: Send + Sync {
    fn load(&self) -> Result<StatsTable, StoreError>;
    fn save(&self, table: &StatsTable) -> Result<(), StoreError>;
}

/// Open the backend selected in config.
pub fn open_backend(config: &ScoringConfig) -> Result<Box<dyn StatsBackend>, StoreError> {
    let backend: Box<dyn StatsBackend> = match config.backend {
        StatsBackendKind::Json => Box::new(JsonFileBackend::new(&config.state_path)),
        StatsBackendKind::Sqlite => Box::new(SqliteBackend::open(&config.state_path)?),
    };
    Ok(backend)
}

/// Non-durable backend; keeps the last saved table.
#[derive(Default)]
pub struct MemoryBackend {
    saved: Mutex<StatsTable>,
}

impl MemoryBackend {
    pub fn saved(&self) -> StatsTable {
        self.saved.lock().clone()
    }
}

impl StatsBackend for MemoryBackend {
    fn load(&self) -> Result<StatsTable, StoreError> {
        Ok(self.saved.lock().clone())
    }

    fn save(&self, table: &StatsTable) -> Result<(), StoreError> {
        *self.saved.lock() = table.clone();
        Ok(())
    }
}
