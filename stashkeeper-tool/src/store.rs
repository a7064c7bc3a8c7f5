use std::path::{Path, PathBuf};

use serde::Deserialize;
use stashkeeper_core::{DataStore, MemoryStore, Store};
use stashkeeper_rocks::{RocksError, RocksStore};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::StkError;

#[derive(Debug, Error)]
pub enum AnyStoreError {
    #[error("rocks error: {0}")]
    Rocks(#[from] RocksError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    #[default]
    Rocks,
    Memory,
}

impl std::str::FromStr for StoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rocks" | "rocksdb" => Ok(StoreType::Rocks),
            "memory" | "mem" => Ok(StoreType::Memory),
            _ => Err(format!("unknown store type: {}", s)),
        }
    }
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreType::Rocks => write!(f, "rocks"),
            StoreType::Memory => write!(f, "memory"),
        }
    }
}

pub enum AnyStore {
    Memory(MemoryStore),
    Rocks(RocksStore),
}

impl AnyStore {
    pub fn open(store_type: StoreType, path: impl AsRef<Path>) -> Result<Self, AnyStoreError> {
        match store_type {
            StoreType::Memory => Ok(Self::Memory(MemoryStore::new())),
            StoreType::Rocks => Ok(Self::Rocks(RocksStore::open(path)?)),
        }
    }

    /// Like [`AnyStore::open`], but an unavailable durable store degrades to
    /// an in-memory one for this session.
    pub fn open_with_fallback(
        store_type: StoreType,
        path: impl AsRef<Path>,
    ) -> Result<Self, AnyStoreError> {
        match Self::open(store_type, path) {
            Err(AnyStoreError::Rocks(RocksError::StorageUnavailable { path, source })) => {
                warn!(
                    path = %path.display(),
                    error = %source,
                    "store unavailable, changes will not be saved this session"
                );
                Ok(Self::Memory(MemoryStore::new()))
            }
            other => other,
        }
    }

    pub fn store_type(&self) -> StoreType {
        match self {
            AnyStore::Memory(_) => StoreType::Memory,
            AnyStore::Rocks(_) => StoreType::Rocks,
        }
    }
}

impl Store for AnyStore {
    type Error = AnyStoreError;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        match self {
            AnyStore::Memory(s) => s.get(key).map_err(|e| match e {}),
            AnyStore::Rocks(s) => s.get(key).map_err(Into::into),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        match self {
            AnyStore::Memory(s) => s.put(key, value).map_err(|e| match e {}),
            AnyStore::Rocks(s) => s.put(key, value).map_err(Into::into),
        }
    }

    fn delete(&self, key: &[u8]) -> Result<(), Self::Error> {
        match self {
            AnyStore::Memory(s) => s.delete(key).map_err(|e| match e {}),
            AnyStore::Rocks(s) => s.delete(key).map_err(Into::into),
        }
    }

    fn has(&self, key: &[u8]) -> Result<bool, Self::Error> {
        match self {
            AnyStore::Memory(s) => s.has(key).map_err(|e| match e {}),
            AnyStore::Rocks(s) => s.has(key).map_err(Into::into),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Self::Error> {
        match self {
            AnyStore::Memory(s) => s.scan_prefix(prefix).map_err(|e| match e {}),
            AnyStore::Rocks(s) => s.scan_prefix(prefix).map_err(Into::into),
        }
    }

    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<(), Self::Error> {
        match self {
            AnyStore::Memory(s) => s.put_batch(entries).map_err(|e| match e {}),
            AnyStore::Rocks(s) => s.put_batch(entries).map_err(Into::into),
        }
    }
}

pub struct AppContext {
    pub store: DataStore<AnyStore>,
    pub league: String,
    pub realm: String,
}

impl AppContext {
    pub fn open(
        store_type: StoreType,
        store_path: PathBuf,
        league: String,
        realm: String,
    ) -> Result<Self, StkError> {
        let store = AnyStore::open_with_fallback(store_type, &store_path)?;
        debug!(store = %store.store_type(), path = %store_path.display(), "store ready");
        Ok(Self {
            store: DataStore::new(store),
            league,
            realm,
        })
    }
}

pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stashkeeper")
        .join("store")
}
