//! Analysis record persistence.
//!
//! Records live one-per-file as pretty JSON under `<data_dir>/analyses/`. The directory
//! plays the role of the hosted entity store: list/create/update/delete by id.

use crate::model::{AnalysisRecord, RecordUpdate};
use anyhow::Context;
use rand::RngCore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Default number of records the history list loads.
pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("analysis not found: {0}")]
    NotFound(String),

    #[error("analysis already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid record {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// List/get/create/update/delete over analysis records.
pub trait RecordStore: Send + Sync {
    /// Most recently created first.
    fn list(&self, limit: usize) -> Result<Vec<AnalysisRecord>, StoreError>;
    fn get(&self, id: &str) -> Result<AnalysisRecord, StoreError>;
    fn create(&self, record: &AnalysisRecord) -> Result<AnalysisRecord, StoreError>;
    fn update(&self, id: &str, update: RecordUpdate) -> Result<AnalysisRecord, StoreError>;
    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let dir = data_dir.join("analyses");
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        // Ids are generated hex, but never let one escape the directory.
        let safe: String = id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    fn read(&self, path: &Path) -> Result<AnalysisRecord, StoreError> {
        let data = std::fs::read(path)?;
        serde_json::from_slice(&data).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write(&self, record: &AnalysisRecord) -> Result<(), StoreError> {
        let path = self.path_for(&record.id);
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(record)?;
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl RecordStore for JsonDirStore {
    fn list(&self, limit: usize) -> Result<Vec<AnalysisRecord>, StoreError> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read(&path) {
                Ok(r) => out.push(r),
                Err(e) => warn!("skipping unreadable record: {e}"),
            }
        }
        // RFC3339 UTC timestamps sort lexically.
        out.sort_by(|a, b| {
            b.created_date
                .cmp(&a.created_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        out.truncate(limit);
        Ok(out)
    }

    fn get(&self, id: &str) -> Result<AnalysisRecord, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.read(&path)
    }

    fn create(&self, record: &AnalysisRecord) -> Result<AnalysisRecord, StoreError> {
        if self.path_for(&record.id).exists() {
            return Err(StoreError::AlreadyExists(record.id.clone()));
        }
        self.write(record)?;
        debug!(id = %record.id, "created analysis record");
        Ok(record.clone())
    }

    fn update(&self, id: &str, update: RecordUpdate) -> Result<AnalysisRecord, StoreError> {
        let mut record = self.get(id)?;
        record.apply(update);
        self.write(&record)?;
        debug!(id = %id, status = %record.status, "updated analysis record");
        Ok(record)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Default data directory (`<platform data dir>/script-breakdown`).
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("script-breakdown")
}

/// Generate a random record id.
pub fn gen_record_id() -> String {
    let mut b = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut b);
    b.iter().map(|x| format!("{x:02x}")).collect()
}

/// Write any serializable value as pretty JSON to `path`, creating parent directories.
pub fn export_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let data = serde_json::to_vec_pretty(value).context("serialize export")?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
