//! RocksDB-backed store for Stashkeeper.

use std::path::{Path, PathBuf};

use rocksdb::{DB, Direction, IteratorMode, Options, WriteBatch, WriteOptions};
use stashkeeper_core::Store;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RocksError {
    /// The directory could not be created, or another process holds its lock.
    #[error("storage at {} is unavailable: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: rocksdb::Error,
    },
    #[error("RocksDB error: {0}")]
    Db(#[from] rocksdb::Error),
}

/// A persistent store backed by RocksDB.
///
/// Every write is synced, so it is durable once the call returns.
pub struct RocksStore {
    db: DB,
    path: PathBuf,
}

impl RocksStore {
    /// Opens a RocksDB store at the given path.
    ///
    /// Creates the database if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RocksError> {
        let path = path.as_ref().to_path_buf();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, &path).map_err(|source| {
            warn!(path = %path.display(), error = %source, "cannot open store");
            RocksError::StorageUnavailable {
                path: path.clone(),
                source,
            }
        })?;
        debug!(path = %path.display(), "store opened");
        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_options() -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(true);
        opts
    }
}

impl Store for RocksStore {
    type Error = RocksError;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.db.get(key)?)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.db.put_opt(key, value, &Self::write_options())?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), Self::Error> {
        self.db.delete_opt(key, &Self::write_options())?;
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool, Self::Error> {
        Ok(self.db.get_pinned(key)?.is_some())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Self::Error> {
        let mut out = Vec::new();
        for entry in self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = entry?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.into_vec(), value.into_vec()));
        }
        Ok(out)
    }

    /// Commits all pairs in one atomic, synced write.
    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<(), Self::Error> {
        let mut batch = WriteBatch::default();
        for (key, value) in entries {
            batch.put(key, value);
        }
        self.db.write_opt(batch, &Self::write_options())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn put_get() {
        let (store, _dir) = temp_store();
        let value = b"hello world";

        store.put(b"test", value).unwrap();
        let retrieved = store.get(b"test").unwrap();

        assert_eq!(retrieved, Some(value.to_vec()));
    }

    #[test]
    fn get_missing() {
        let (store, _dir) = temp_store();

        let retrieved = store.get(b"nonexistent").unwrap();

        assert_eq!(retrieved, None);
    }

    #[test]
    fn has_and_delete() {
        let (store, _dir) = temp_store();

        assert!(!store.has(b"test").unwrap());
        store.put(b"test", b"value").unwrap();
        assert!(store.has(b"test").unwrap());

        store.delete(b"test").unwrap();
        assert!(!store.has(b"test").unwrap());
    }

    #[test]
    fn scan_prefix_stops_at_boundary() {
        let (store, _dir) = temp_store();
        store.put(b"a/1", b"x").unwrap();
        store.put(b"b/1", b"y").unwrap();
        store.put(b"b/2", b"z").unwrap();
        store.put(b"c/1", b"w").unwrap();

        let entries = store.scan_prefix(b"b/").unwrap();
        assert_eq!(
            entries,
            vec![
                (b"b/1".to_vec(), b"y".to_vec()),
                (b"b/2".to_vec(), b"z".to_vec()),
            ]
        );
    }

    #[test]
    fn batch_is_visible() {
        let (store, _dir) = temp_store();
        store
            .put_batch(&[
                (b"k1".as_slice(), b"v1".as_slice()),
                (b"k2".as_slice(), b"v2".as_slice()),
            ])
            .unwrap();
        assert_eq!(store.get(b"k2").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn persistence() {
        let dir = TempDir::new().unwrap();
        let value = b"data survives restart";

        {
            let store = RocksStore::open(dir.path()).unwrap();
            store.put(b"persistent", value).unwrap();
        }

        {
            let store = RocksStore::open(dir.path()).unwrap();
            let retrieved = store.get(b"persistent").unwrap();
            assert_eq!(retrieved, Some(value.to_vec()));
        }
    }

    #[test]
    fn locked_directory_is_unavailable() {
        let (_store, dir) = temp_store();

        let err = RocksStore::open(dir.path()).err().unwrap();
        assert!(matches!(err, RocksError::StorageUnavailable { .. }));
    }
}
