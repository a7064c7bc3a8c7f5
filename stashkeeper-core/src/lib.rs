//! Stashkeeper core: item search, buyouts and persistent settings for a
//! game inventory manager.
//!
//! Core concepts:
//! - **Store**: raw byte key-value backend (in memory here, RocksDB in `stashkeeper-rocks`)
//! - **DataStore**: typed, namespaced settings on top of a store
//! - **ItemLocation**: a stash tab or character slot an item lives in
//! - **Filter**: a named predicate over items, built from a serializable config
//! - **Search**: filters, sorts and groups an item snapshot
//! - **BuyoutManager**: item and tab prices, plus per-tab refresh state
//! - **Shop**: forum posts listing the priced items
//!
//! # Example
//!
//! ```
//! use stashkeeper_core::{
//!     CancelToken, Item, ItemCollection, ItemLocation, NoPrices, Search, SearchSpec,
//!     SocketsFilter,
//! };
//!
//! let items = ItemCollection::new();
//! items.replace(vec![Item::new("1", "Ring", ItemLocation::stash(0, "uid", "Trade"))]);
//!
//! let spec = SearchSpec::new().filter(SocketsFilter::new(None, Some(6.0)));
//! let mut search = Search::new("all rings", spec);
//! search.run(&items, &NoPrices, &CancelToken::new()).unwrap();
//! assert_eq!(search.caption(), "all rings (1 of 1)");
//! ```

mod async_store;
mod buyout;
mod datastore;
pub mod filter;
mod item;
mod items_model;
mod location;
mod mods;
mod search;
mod shop;
mod store;

pub use async_store::AsyncStore;
pub use buyout::{
    Buyout, BuyoutError, BuyoutManager, BuyoutSource, BuyoutType, Currency, RefreshState,
};
pub use datastore::{Batch, CurrencyUpdate, DataStore, StoreError, Value, namespaces};
pub use filter::{
    CategoryFilter, DefaultPropertyFilter, Filter, FilterConfig, FilterConfigError, FilterValue,
    ItemFilter, ItemLevelFilter, LinksFilter, MinMaxFilter, RequiredStatFilter,
    SimplePropertyFilter, SocketsFilter,
};
pub use item::{Item, ItemId, PropertyValue, Socket, SocketColour};
pub use items_model::{Column, ItemsModel};
pub use location::{ItemLocation, LocationKind, Rect};
pub use mods::{
    ItemMod, ModGenerator, ModTable, SumModGenerator, aggregate_all, standard_generators,
};
pub use search::{
    CancelToken, ItemCollection, LocationGroup, NoPrices, PriceLookup, SavedSearch, Search,
    SearchError, SearchSpec, Snapshot, SortKey, SortOrder, SortSpec, ViewMode,
};
pub use shop::{ITEMS_MARKER, MAX_POST_CHARS, Publish, Shop, ShopError};
pub use store::{MemoryStore, Store};
