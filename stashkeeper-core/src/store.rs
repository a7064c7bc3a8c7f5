use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::RwLock;

/// A raw key-value store for persisted bytes.
///
/// Stores operate on raw bytes: typing, namespacing and coercion are handled
/// by [`DataStore`](crate::DataStore). Both backends go through that layer, so
/// callers observe identical behavior regardless of which one is active.
///
/// All methods take `&self` to support stores with internal locking (e.g., RocksDB).
pub trait Store {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Retrieves the bytes associated with a key, or None if not present.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Stores bytes at the given key.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), Self::Error>;

    /// Removes a key. Removing a missing key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), Self::Error>;

    /// Checks whether a key exists in the store.
    fn has(&self, key: &[u8]) -> Result<bool, Self::Error>;

    /// Returns every entry whose key starts with `prefix`, in byte order of the keys.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Self::Error>;

    /// Writes several entries as one unit.
    ///
    /// The default impl calls `put` in sequence; backends with native batches
    /// override it to commit once.
    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<(), Self::Error> {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }
}

/// An in-memory store backed by an ordered map.
///
/// Lives for the process lifetime only. Useful for tests, ephemeral caches,
/// and as the session fallback when the durable store cannot be opened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>> {
        // A poisoned map is still structurally valid: every write is a single insert.
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Store for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), Self::Error> {
        self.write().remove(key);
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool, Self::Error> {
        Ok(self.read().contains_key(key))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Self::Error> {
        let data = self.read();
        Ok(data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<(), Self::Error> {
        let mut data = self.write();
        for (key, value) in entries {
            data.insert(key.to_vec(), value.to_vec());
        }
        Ok(())
    }
}
