//! Persisted JSON files: the export map and the upload state.
//!
//! Both are loaded once per run, mutated in memory and written back once.
//! Writes go through a temp file in the target directory and a rename, so a
//! reader never sees a half-written file.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::group::GroupKey;

/// `identity|date` → ids of the records that produced that key's file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl ExportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &GroupKey, record_ids: Vec<String>) {
        self.entries.insert(key.to_string(), record_ids);
    }

    /// Record ids stored for `identity` on `date`. Empty when unknown.
    pub fn record_ids(&self, identity: &str, date: NaiveDate) -> &[String] {
        let key = GroupKey::new(identity, date).to_string();
        self.entries.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads the map; a missing file is an empty map.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "No export map yet, starting empty");
            return Ok(Self::default());
        }
        read_json(path)
    }

    /// Overwrites the map file with this map.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        write_json_atomic(path, self)?;
        info!(path = %path.display(), keys = self.len(), "Map saved");
        Ok(())
    }
}

/// Last successful upload of one local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStateEntry {
    pub hash: String,
    pub at: DateTime<Utc>,
}

/// Local file path → last uploaded fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadState {
    #[serde(default)]
    pub files: BTreeMap<String, UploadStateEntry>,
}

impl UploadState {
    /// Loads the state file. Missing or unreadable state counts as empty, which
    /// only means every file is uploaded again.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match read_json::<Self>(path) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable upload state");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        write_json_atomic(path, self)?;
        debug!(path = %path.display(), files = self.files.len(), "Upload state saved");
        Ok(())
    }

    pub fn fingerprint(&self, file: &str) -> Option<&str> {
        self.files.get(file).map(|e| e.hash.as_str())
    }

    pub fn record(&mut self, file: impl Into<String>, hash: impl Into<String>, at: DateTime<Utc>) {
        self.files.insert(
            file.into(),
            UploadStateEntry {
                hash: hash.into(),
                at,
            },
        );
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let raw = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(json.as_bytes())
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}
