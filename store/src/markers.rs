//! Idempotency markers behind a key-value interface.
//!
//! The report files remain the compatibility source of truth; the
//! marker store is the narrow interface the daemon consults so the
//! on-disk layout stays an implementation detail.

use {
    crate::error::Result,
    payout_model::EntryType,
    std::{fs, path::PathBuf},
};

/// Identity of a single payment: one cycle, one destination, one entry
/// kind. Paying the same key twice is the failure the store exists to
/// prevent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerKey {
    pub cycle: u64,
    pub address: String,
    pub kind: EntryType,
}

impl MarkerKey {
    fn file_name(&self) -> String {
        format!("{}_{}_{}", self.cycle, self.kind.code(), self.address)
    }
}

pub trait MarkerStore: Send + Sync {
    fn mark(&self, key: &MarkerKey) -> Result<()>;
    fn exists(&self, key: &MarkerKey) -> Result<bool>;
}

/// File-per-key backend under a flat directory.
#[derive(Debug, Clone)]
pub struct DirMarkerStore {
    root: PathBuf,
}

impl DirMarkerStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path(&self, key: &MarkerKey) -> PathBuf {
        self.root.join(key.file_name())
    }
}

impl MarkerStore for DirMarkerStore {
    fn mark(&self, key: &MarkerKey) -> Result<()> {
        fs::write(self.path(key), [])?;
        Ok(())
    }

    fn exists(&self, key: &MarkerKey) -> Result<bool> {
        Ok(self.path(key).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(cycle: u64, address: &str) -> MarkerKey {
        MarkerKey {
            cycle,
            address: address.to_string(),
            kind: EntryType::Delegator,
        }
    }

    #[test]
    fn test_mark_then_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirMarkerStore::new(dir.path().join("markers")).unwrap();

        assert!(!store.exists(&key(800, "tz1abc")).unwrap());
        store.mark(&key(800, "tz1abc")).unwrap();
        assert!(store.exists(&key(800, "tz1abc")).unwrap());
        // Same address, different cycle: distinct key.
        assert!(!store.exists(&key(801, "tz1abc")).unwrap());
    }

    #[test]
    fn test_mark_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirMarkerStore::new(dir.path()).unwrap();
        store.mark(&key(1, "tz1a")).unwrap();
        store.mark(&key(1, "tz1a")).unwrap();
        assert!(store.exists(&key(1, "tz1a")).unwrap());
    }
}
