//! The flat JSON notice store: one array of raw notices, replaced whole on every fetch.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use std::{fs, io};
use tracing::{debug, warn};

use crate::api_types::RawNotice;
use crate::models::Opportunity;
use crate::normalize::normalize_notices;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} must hold a JSON array of notices")]
    NotAnArray { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct NoticeStore {
    path: PathBuf,
}

impl NoticeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means "not populated yet" and reads as an empty list.
    pub fn load_raw(&self) -> Result<Vec<RawNotice>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Notice store not populated yet - path={}", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => return Err(StoreError::Io { path: self.path.clone(), source }),
        };

        let doc: Value = serde_json::from_slice(&bytes)
            .map_err(|source| StoreError::Json { path: self.path.clone(), source })?;
        let Value::Array(items) = doc else {
            return Err(StoreError::NotAnArray { path: self.path.clone() });
        };

        let total = items.len();
        let mut out = Vec::with_capacity(total);
        for (idx, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<RawNotice>(item) {
                Ok(n) => out.push(n),
                Err(e) => warn!("Skipping non-object store entry - index={}, error={}", idx, e),
            }
        }
        debug!("Notice store read - path={}, records={}/{}", self.path.display(), out.len(), total);
        Ok(out)
    }

    pub fn load_opportunities(&self) -> Result<Vec<Opportunity>, StoreError> {
        Ok(normalize_notices(self.load_raw()?))
    }

    /// Replace the store contents. Readers see either the old file or the new one, never a mix.
    pub fn replace<T: Serialize>(&self, items: &[T]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let bytes = serde_json::to_vec_pretty(items)
            .map_err(|source| StoreError::Json { path: self.path.clone(), source })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!("Notice store replaced - path={}, records={}", self.path.display(), items.len());
        Ok(())
    }

    /// Time since the last completed write, if the store exists.
    pub fn age(&self) -> Option<Duration> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok()?;
        SystemTime::now().duration_since(modified).ok()
    }
}

/// Read an optional JSON content file; a missing file yields the type's default.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|source| StoreError::Json { path: path.to_path_buf(), source }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(StoreError::Io { path: path.to_path_buf(), source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoticeStore::new(dir.path().join("notices.json"));
        assert!(store.load_raw().unwrap().is_empty());
        assert!(store.load_opportunities().unwrap().is_empty());
        assert!(store.age().is_none());
    }

    #[test]
    fn replace_then_load_keeps_order_and_skips_non_objects() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoticeStore::new(dir.path().join("out").join("notices.json"));
        store
            .replace(&[
                json!({ "id": "b", "title": "Second" }),
                json!("stray string"),
                json!({ "id": "a", "title": "First" }),
            ])
            .unwrap();

        let opps = store.load_opportunities().unwrap();
        let ids: Vec<_> = opps.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(!dir.path().join("out").join("notices.json.tmp").exists());
        assert!(store.age().is_some());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notices.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(NoticeStore::new(&path).load_raw(), Err(StoreError::Json { .. })));

        fs::write(&path, br#"{ "items": [] }"#).unwrap();
        assert!(matches!(NoticeStore::new(&path).load_raw(), Err(StoreError::NotAnArray { .. })));
    }
}
