use stashkeeper_core::{BuyoutError, FilterConfigError, SearchError, ShopError, StoreError};
use thiserror::Error;

use crate::store::AnyStoreError;

#[derive(Debug, Error)]
pub enum StkError {
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cannot open store: {0}")]
    Backend(#[from] AnyStoreError),

    #[error("Invalid item snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("No stash tab or character matches '{0}'")]
    UnknownLocation(String),

    #[error("No item with id '{0}' in the snapshot")]
    UnknownItem(String),

    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterConfigError),

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Buyout error: {0}")]
    Buyout(#[from] BuyoutError),

    #[error("Shop error: {0}")]
    Shop(#[from] ShopError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
