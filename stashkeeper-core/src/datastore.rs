//! Typed, namespaced access to a raw [`Store`].
//!
//! Values are written as a tagged CBOR [`Value`]. Reading a key with an
//! accessor that does not match the stored tag coerces deterministically
//! (see [`Value::as_bool`], [`Value::as_int`], [`Value::as_bytes`]). The
//! coercion lives here, above the backend, so every backend behaves the same.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::Store;

/// Separator between a namespace and the key inside it.
const NAMESPACE_SEPARATOR: char = '/';

/// Error type for typed store access.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("value for key {key} is {found} and cannot be read as {expected}")]
    TypeMismatch {
        key: String,
        found: &'static str,
        expected: &'static str,
    },
    #[error("failed to decode value for key {key}: {reason}")]
    Decode { key: String, reason: String },
    #[error("failed to encode value for key {key}: {reason}")]
    Encode { key: String, reason: String },
    #[error("invalid key {0:?}")]
    InvalidKey(String),
}

impl StoreError {
    fn backend<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// A stored value, tagged by the accessor that wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    #[serde(with = "serde_bytes_compat")]
    Bytes(Vec<u8>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Bool as is, ints by `!= 0`, text `true`/`1` and `false`/`0`/empty.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Bytes(bytes) => match bytes.as_slice() {
                b"true" | b"1" => Some(true),
                b"false" | b"0" | b"" => Some(false),
                _ => None,
            },
        }
    }

    /// Int as is, bools as 0/1, text parsed as a decimal integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(i) => Some(*i),
            Value::Bytes(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
        }
    }

    /// Bytes as is, bools as `true`/`false`, ints as decimal text.
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            Value::Bool(b) => b.to_string().into_bytes(),
            Value::Int(i) => i.to_string().into_bytes(),
            Value::Bytes(bytes) => bytes.clone(),
        }
    }

    fn encode(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        encode_cbor(key, self)
    }

    fn decode(key: &str, bytes: &[u8]) -> Result<Self, StoreError> {
        decode_cbor(key, bytes)
    }
}

// CBOR byte strings instead of integer arrays for `Bytes`.
mod serde_bytes_compat {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let buf = ciborium::value::Value::deserialize(deserializer)?;
        match buf {
            ciborium::value::Value::Bytes(b) => Ok(b),
            ciborium::value::Value::Text(t) => Ok(t.into_bytes()),
            other => Err(serde::de::Error::custom(format!(
                "expected byte string, found {:?}",
                other
            ))),
        }
    }
}

pub(crate) fn encode_cbor<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(buf)
}

pub(crate) fn decode_cbor<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// One recorded snapshot of the user's currency holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyUpdate {
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    /// Serialized holdings, opaque to the store.
    pub value: String,
}

/// Writes collected for one [`DataStore::write_batch`] call.
///
/// Nothing reaches the backend until the batch is written; then every entry
/// is committed together.
#[derive(Debug, Default)]
pub struct Batch {
    entries: Vec<(String, Value)>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.entries
            .push((key.to_string(), Value::Bytes(value.as_bytes().to_vec())));
        self
    }

    pub fn set_bool(mut self, key: &str, value: bool) -> Self {
        self.entries.push((key.to_string(), Value::Bool(value)));
        self
    }

    pub fn set_int(mut self, key: &str, value: i64) -> Self {
        self.entries.push((key.to_string(), Value::Int(value)));
        self
    }

    pub fn set_record<T: Serialize>(mut self, key: &str, record: &T) -> Result<Self, StoreError> {
        let bytes = encode_cbor(key, record)?;
        self.entries.push((key.to_string(), Value::Bytes(bytes)));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Well-known namespaces. Distinct features never share one.
pub mod namespaces {
    pub const SETTINGS: &str = "settings";
    pub const ITEM_BUYOUTS: &str = "buyouts.items";
    pub const TAB_BUYOUTS: &str = "buyouts.tabs";
    pub const SHOP: &str = "shop";
    pub const REFRESH: &str = "refresh";
    pub const TABS: &str = "tabs";
    pub const CURRENCY: &str = "currency";
    pub const SEARCHES: &str = "searches";
}

/// Typed key-value access under a single logical namespace.
///
/// Cloning is cheap: clones share the backend. Use [`DataStore::namespace`]
/// to get a view over a different namespace of the same backend.
pub struct DataStore<S> {
    store: Arc<S>,
    namespace: String,
}

impl<S> Clone for DataStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: self.namespace.clone(),
        }
    }
}

impl<S> fmt::Debug for DataStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl<S: Store> DataStore<S> {
    /// Wraps a backend, starting in the [`namespaces::SETTINGS`] namespace.
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self {
            store,
            namespace: namespaces::SETTINGS.to_string(),
        }
    }

    /// Returns a view over another namespace of the same backend.
    pub fn namespace(&self, namespace: &str) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: namespace.to_string(),
        }
    }

    pub fn current_namespace(&self) -> &str {
        &self.namespace
    }

    pub fn backend(&self) -> &Arc<S> {
        &self.store
    }

    fn prefix(&self) -> String {
        format!("{}{}", self.namespace, NAMESPACE_SEPARATOR)
    }

    fn full_key(&self, key: &str) -> Result<String, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(format!("{}{}", self.prefix(), key))
    }

    fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let full = self.full_key(key)?;
        trace!(key = %full, "store read");
        match self.store.get(full.as_bytes()).map_err(StoreError::backend)? {
            Some(bytes) => Ok(Some(Value::decode(&full, &bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let full = self.full_key(key)?;
        trace!(key = %full, "store write");
        let bytes = value.encode(&full)?;
        self.store
            .put(full.as_bytes(), &bytes)
            .map_err(StoreError::backend)
    }

    /// Reads a key as text, returning `default` when it is missing.
    pub fn get(&self, key: &str, default: &str) -> Result<String, StoreError> {
        match self.load(key)? {
            Some(value) => {
                String::from_utf8(value.as_bytes()).map_err(|_| StoreError::TypeMismatch {
                    key: key.to_string(),
                    found: value.type_name(),
                    expected: "string",
                })
            }
            None => Ok(default.to_string()),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.save(key, Value::Bytes(value.as_bytes().to_vec()))
    }

    /// Reads a key as raw bytes, returning `default` when it is missing.
    pub fn get_bytes(&self, key: &str, default: &[u8]) -> Result<Vec<u8>, StoreError> {
        Ok(self
            .load(key)?
            .map(|v| v.as_bytes())
            .unwrap_or_else(|| default.to_vec()))
    }

    pub fn set_bytes(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.save(key, Value::Bytes(value.to_vec()))
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, StoreError> {
        match self.load(key)? {
            Some(value) => value.as_bool().ok_or(StoreError::TypeMismatch {
                key: key.to_string(),
                found: value.type_name(),
                expected: "bool",
            }),
            None => Ok(default),
        }
    }

    pub fn set_bool(&self, key: &str, value: bool) -> Result<(), StoreError> {
        self.save(key, Value::Bool(value))
    }

    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, StoreError> {
        match self.load(key)? {
            Some(value) => value.as_int().ok_or(StoreError::TypeMismatch {
                key: key.to_string(),
                found: value.type_name(),
                expected: "int",
            }),
            None => Ok(default),
        }
    }

    pub fn set_int(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.save(key, Value::Int(value))
    }

    /// Serializes a structured value into the bytes slot of `key`.
    pub fn set_record<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StoreError> {
        let full = self.full_key(key)?;
        self.save(key, Value::Bytes(encode_cbor(&full, record)?))
    }

    /// Reads a value written by [`DataStore::set_record`].
    pub fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.load(key)? {
            Some(Value::Bytes(bytes)) => Ok(Some(decode_cbor(key, &bytes)?)),
            Some(other) => Err(StoreError::TypeMismatch {
                key: key.to_string(),
                found: other.type_name(),
                expected: "record",
            }),
            None => Ok(None),
        }
    }

    /// Commits every write in `batch` to this namespace as one backend batch.
    pub fn write_batch(&self, batch: Batch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut encoded = Vec::with_capacity(batch.len());
        for (key, value) in &batch.entries {
            let full = self.full_key(key)?;
            let bytes = value.encode(&full)?;
            encoded.push((full, bytes));
        }
        trace!(namespace = %self.namespace, entries = encoded.len(), "store batch write");
        let entries: Vec<(&[u8], &[u8])> = encoded
            .iter()
            .map(|(k, v)| (k.as_bytes(), v.as_slice()))
            .collect();
        self.store.put_batch(&entries).map_err(StoreError::backend)
    }

    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        let full = self.full_key(key)?;
        self.store.delete(full.as_bytes()).map_err(StoreError::backend)
    }

    pub fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let full = self.full_key(key)?;
        self.store.has(full.as_bytes()).map_err(StoreError::backend)
    }

    /// Lists every key in this namespace, in byte order.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let prefix = self.prefix();
        let entries = self
            .store
            .scan_prefix(prefix.as_bytes())
            .map_err(StoreError::backend)?;
        Ok(entries
            .into_iter()
            .filter_map(|(k, _)| {
                String::from_utf8(k)
                    .ok()
                    .map(|k| k[prefix.len()..].to_string())
            })
            .collect())
    }

    /// Reads every record in this namespace, keyed by the unprefixed key.
    pub fn records<T: DeserializeOwned>(&self) -> Result<Vec<(String, T)>, StoreError> {
        let prefix = self.prefix();
        let entries = self
            .store
            .scan_prefix(prefix.as_bytes())
            .map_err(StoreError::backend)?;
        let mut out = Vec::with_capacity(entries.len());
        for (raw_key, raw_value) in entries {
            let key = String::from_utf8_lossy(&raw_key[prefix.len()..]).into_owned();
            match Value::decode(&key, &raw_value)? {
                Value::Bytes(bytes) => out.push((key.clone(), decode_cbor(&key, &bytes)?)),
                other => {
                    return Err(StoreError::TypeMismatch {
                        key,
                        found: other.type_name(),
                        expected: "record",
                    });
                }
            }
        }
        Ok(out)
    }

    /// Appends a currency snapshot to the `currency` namespace.
    pub fn insert_currency(&self, update: &CurrencyUpdate) -> Result<(), StoreError> {
        let currency = self.namespace(namespaces::CURRENCY);
        // Zero padding keeps byte order equal to time order.
        currency.set_record(&format!("{:020}", update.timestamp), update)
    }

    /// Returns every currency snapshot, oldest first.
    pub fn get_all_currency(&self) -> Result<Vec<CurrencyUpdate>, StoreError> {
        let currency = self.namespace(namespaces::CURRENCY);
        Ok(currency
            .records::<CurrencyUpdate>()?
            .into_iter()
            .map(|(_, update)| update)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn store() -> DataStore<MemoryStore> {
        DataStore::new(MemoryStore::new())
    }

    #[test]
    fn missing_keys_return_default() {
        let ds = store();
        assert_eq!(ds.get("missing", "fallback").unwrap(), "fallback");
        assert!(ds.get_bool("missing", true).unwrap());
        assert_eq!(ds.get_int("missing", -7).unwrap(), -7);
        assert_eq!(ds.get_bytes("missing", b"raw").unwrap(), b"raw".to_vec());
    }

    #[test]
    fn read_your_writes() {
        let ds = store();
        ds.set("league", "Standard").unwrap();
        ds.set_bool("tray", true).unwrap();
        ds.set_int("interval", 30).unwrap();
        ds.set_bytes("blob", &[0, 159, 146, 150]).unwrap();

        assert_eq!(ds.get("league", "").unwrap(), "Standard");
        assert!(ds.get_bool("tray", false).unwrap());
        assert_eq!(ds.get_int("interval", 0).unwrap(), 30);
        assert_eq!(ds.get_bytes("blob", b"").unwrap(), vec![0, 159, 146, 150]);
    }

    #[test]
    fn mismatched_accessors_coerce() {
        let ds = store();
        ds.set_bool("flag", true).unwrap();
        ds.set_int("count", 0).unwrap();
        ds.set("numeric", "42").unwrap();

        assert_eq!(ds.get_int("flag", 9).unwrap(), 1);
        assert_eq!(ds.get("flag", "").unwrap(), "true");
        assert!(!ds.get_bool("count", true).unwrap());
        assert_eq!(ds.get("count", "").unwrap(), "0");
        assert_eq!(ds.get_int("numeric", 0).unwrap(), 42);
    }

    #[test]
    fn mismatched_accessor_fails_when_not_coercible() {
        let ds = store();
        ds.set("name", "Mirror of Kalandra").unwrap();

        assert!(matches!(
            ds.get_int("name", 0),
            Err(StoreError::TypeMismatch { expected: "int", .. })
        ));
        assert!(matches!(
            ds.get_bool("name", false),
            Err(StoreError::TypeMismatch { expected: "bool", .. })
        ));
    }

    #[test]
    fn namespaces_do_not_collide() {
        let settings = store();
        let buyouts = settings.namespace(namespaces::ITEM_BUYOUTS);

        settings.set("abc", "setting").unwrap();
        buyouts.set("abc", "buyout").unwrap();

        assert_eq!(settings.get("abc", "").unwrap(), "setting");
        assert_eq!(buyouts.get("abc", "").unwrap(), "buyout");
        assert_eq!(settings.keys().unwrap(), vec!["abc".to_string()]);
    }

    #[test]
    fn empty_key_is_rejected() {
        let ds = store();
        assert!(matches!(ds.set("", "x"), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn delete_removes_only_that_key() {
        let ds = store();
        ds.set_int("a", 1).unwrap();
        ds.set_int("b", 2).unwrap();
        ds.delete("a").unwrap();

        assert!(!ds.contains("a").unwrap());
        assert_eq!(ds.get_int("b", 0).unwrap(), 2);
    }

    #[test]
    fn currency_history_is_time_ordered() {
        let ds = store();
        for ts in [1_700_000_900u64, 99, 1_700_000_000] {
            ds.insert_currency(&CurrencyUpdate {
                timestamp: ts,
                value: format!("snapshot-{}", ts),
            })
            .unwrap();
        }

        let stamps: Vec<u64> = ds
            .get_all_currency()
            .unwrap()
            .iter()
            .map(|u| u.timestamp)
            .collect();
        assert_eq!(stamps, vec![99, 1_700_000_000, 1_700_000_900]);
    }

    #[test]
    fn batch_writes_land_together() {
        let ds = store();
        ds.write_batch(
            Batch::new()
                .set("league", "Standard")
                .set_bool("tray", true)
                .set_int("interval", 30)
                .set_record("tabs", &vec![1u32, 2])
                .unwrap(),
        )
        .unwrap();

        assert_eq!(ds.get("league", "").unwrap(), "Standard");
        assert!(ds.get_bool("tray", false).unwrap());
        assert_eq!(ds.get_int("interval", 0).unwrap(), 30);
        assert_eq!(ds.get_record::<Vec<u32>>("tabs").unwrap(), Some(vec![1, 2]));
        assert_eq!(ds.keys().unwrap().len(), 4);
    }

    #[test]
    fn batch_with_bad_key_writes_nothing() {
        let ds = store();
        let batch = Batch::new().set("ok", "1").set("", "2");
        assert!(matches!(ds.write_batch(batch), Err(StoreError::InvalidKey(_))));
        assert!(!ds.contains("ok").unwrap());
    }

    #[test]
    fn records_round_trip() {
        let ds = store().namespace(namespaces::TABS);
        ds.set_record("one", &vec![1u32, 2, 3]).unwrap();
        ds.set_record("two", &vec![4u32]).unwrap();

        assert_eq!(ds.get_record::<Vec<u32>>("one").unwrap(), Some(vec![1, 2, 3]));
        let all = ds.records::<Vec<u32>>().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1], ("two".to_string(), vec![4]));
    }
}
