use std::future::Future;

use crate::Store;

/// Async key-value store for persisted bytes.
///
/// Mirrors the `Store` trait with async methods so callers on a
/// latency-sensitive path can await store I/O instead of blocking on it.
/// Methods are prefixed with `async_` to avoid name collisions when a type
/// implements both `Store` and `AsyncStore`.
pub trait AsyncStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn async_get(
        &self,
        key: &[u8],
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;
    fn async_put(
        &self,
        key: &[u8],
        value: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
    fn async_delete(&self, key: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Batch get - default impl calls async_get() in sequence.
    fn async_get_many(
        &self,
        keys: &[Vec<u8>],
    ) -> impl Future<Output = Result<Vec<Option<Vec<u8>>>, Self::Error>> + Send {
        let keys = keys.to_vec();
        async move {
            let mut results = Vec::with_capacity(keys.len());
            for key in &keys {
                results.push(self.async_get(key).await?);
            }
            Ok(results)
        }
    }
}

/// Blanket impl: any sync `Store` is also an `AsyncStore`.
impl<S: Store + Send + Sync> AsyncStore for S {
    type Error = S::Error;

    async fn async_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        self.get(key)
    }

    async fn async_put(&self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.put(key, value)
    }

    async fn async_delete(&self, key: &[u8]) -> Result<(), Self::Error> {
        self.delete(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn store_as_async_store_basic() {
        let store = MemoryStore::new();
        let value = b"hello world";

        store.async_put(b"test", value).await.unwrap();
        let retrieved = store.async_get(b"test").await.unwrap();
        assert_eq!(retrieved, Some(value.to_vec()));

        store.async_delete(b"test").await.unwrap();
        assert_eq!(store.async_get(b"test").await.unwrap(), None);
    }

    #[tokio::test]
    async fn store_as_async_store_batch() {
        let store = MemoryStore::new();
        store.put(b"a", b"1").unwrap();
        store.put(b"c", b"3").unwrap();

        let keys = vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];
        let results = store.async_get_many(&keys).await.unwrap();
        assert_eq!(results, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
    }
}
