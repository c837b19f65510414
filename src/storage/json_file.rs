//! Flat JSON statistics file: `{feature: {count, mean, sumSquaredDeviation}}`.
//! Writes go to a sibling temp file that is renamed over the target.

use super::{StatsBackend, StatsTable};
use crate::error::StoreError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatsBackend for JsonFileBackend {
    /// A missing file is created empty.
    fn load(&self) -> Result<StatsTable, StoreError> {
        if !self.path.exists() {
            let empty = StatsTable::new();
            self.save(&empty)?;
            return Ok(empty);
        }
        let data = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn save(&self, table: &StatsTable) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.tmp_path();
        let body = serde_json::to_vec(table)?;
        let mut f = fs::File::create(&tmp)?;
        f.write_all(&body)?;
        f.sync_all()?;
        drop(f);
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
