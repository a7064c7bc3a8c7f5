//! Buyout prices per item and per stash tab, plus per-tab refresh state.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::datastore::{Batch, DataStore, StoreError, namespaces};
use crate::item::Item;
use crate::location::ItemLocation;
use crate::search::PriceLookup;
use crate::store::Store;

const TAB_LAYOUT_KEY: &str = "stash";

#[derive(Debug, Error)]
pub enum BuyoutError {
    #[error("buyout '{kind}' needs a positive price, got {value}")]
    InvalidPrice { kind: BuyoutType, value: f64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyoutType {
    /// Use whatever the containing tab says.
    #[default]
    Inherit,
    /// `~b/o`
    Buyout,
    /// `~price`
    Fixed,
    /// `~c/o`
    CurrentOffer,
    NoPrice,
    Ignore,
}

impl BuyoutType {
    /// Forum tag prefix, for the types that carry a price.
    pub fn forum_prefix(self) -> Option<&'static str> {
        match self {
            BuyoutType::Buyout => Some("~b/o"),
            BuyoutType::Fixed => Some("~price"),
            BuyoutType::CurrentOffer => Some("~c/o"),
            BuyoutType::Inherit | BuyoutType::NoPrice | BuyoutType::Ignore => None,
        }
    }

    pub fn is_priced(self) -> bool {
        self.forum_prefix().is_some()
    }
}

impl fmt::Display for BuyoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuyoutType::Inherit => "inherit",
            BuyoutType::Buyout => "b/o",
            BuyoutType::Fixed => "price",
            BuyoutType::CurrentOffer => "c/o",
            BuyoutType::NoPrice => "no price",
            BuyoutType::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

impl FromStr for BuyoutType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('~').to_lowercase().as_str() {
            "inherit" => Ok(BuyoutType::Inherit),
            "b/o" | "bo" | "buyout" => Ok(BuyoutType::Buyout),
            "price" | "fixed" => Ok(BuyoutType::Fixed),
            "c/o" | "co" => Ok(BuyoutType::CurrentOffer),
            "none" | "no price" | "no_price" => Ok(BuyoutType::NoPrice),
            "ignore" => Ok(BuyoutType::Ignore),
            other => Err(format!("unknown buyout type: {}", other)),
        }
    }
}

/// Where a buyout came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyoutSource {
    #[default]
    Manual,
    /// Read from a listing the game already has.
    Game,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    #[default]
    Chaos,
    Divine,
    Exalted,
    Alchemy,
    Fusing,
    Chromatic,
    Jewellers,
    Alteration,
    Chance,
    Regal,
    Vaal,
    Gemcutters,
    Chisel,
    Mirror,
}

impl Currency {
    const ALL: [Currency; 14] = [
        Currency::Chaos,
        Currency::Divine,
        Currency::Exalted,
        Currency::Alchemy,
        Currency::Fusing,
        Currency::Chromatic,
        Currency::Jewellers,
        Currency::Alteration,
        Currency::Chance,
        Currency::Regal,
        Currency::Vaal,
        Currency::Gemcutters,
        Currency::Chisel,
        Currency::Mirror,
    ];

    /// Short tag used in forum notes.
    pub fn tag(self) -> &'static str {
        match self {
            Currency::Chaos => "chaos",
            Currency::Divine => "divine",
            Currency::Exalted => "exa",
            Currency::Alchemy => "alch",
            Currency::Fusing => "fuse",
            Currency::Chromatic => "chrom",
            Currency::Jewellers => "jew",
            Currency::Alteration => "alt",
            Currency::Chance => "chance",
            Currency::Regal => "regal",
            Currency::Vaal => "vaal",
            Currency::Gemcutters => "gcp",
            Currency::Chisel => "chisel",
            Currency::Mirror => "mirror",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.tag() == s || format!("{:?}", c).to_lowercase() == s)
            .ok_or_else(|| format!("unknown currency: {}", s))
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buyout {
    pub kind: BuyoutType,
    pub value: f64,
    pub currency: Currency,
    #[serde(default)]
    pub source: BuyoutSource,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub last_update: u64,
}

impl Buyout {
    /// A manual buyout stamped with the current time.
    pub fn new(kind: BuyoutType, value: f64, currency: Currency) -> Self {
        Self {
            kind,
            value,
            currency,
            source: BuyoutSource::Manual,
            last_update: now(),
        }
    }

    pub fn price(value: f64, currency: Currency) -> Self {
        Self::new(BuyoutType::Buyout, value, currency)
    }

    /// A record that defers to the tab.
    pub fn inherit() -> Self {
        Self::new(BuyoutType::Inherit, 0.0, Currency::default())
    }

    pub fn from_game(mut self) -> Self {
        self.source = BuyoutSource::Game;
        self
    }

    pub fn validate(&self) -> Result<(), BuyoutError> {
        if self.kind.is_priced() && !(self.value.is_finite() && self.value > 0.0) {
            return Err(BuyoutError::InvalidPrice {
                kind: self.kind,
                value: self.value,
            });
        }
        Ok(())
    }

    pub fn is_inherited(&self) -> bool {
        self.kind == BuyoutType::Inherit
    }

    pub fn forum_prefix(&self) -> Option<&'static str> {
        self.kind.forum_prefix()
    }

    /// Forum note text, e.g. `~b/o 5 chaos`. Empty for unpriced types.
    pub fn as_tag(&self) -> String {
        match self.forum_prefix() {
            Some(prefix) if self.value.fract() == 0.0 => {
                format!("{} {} {}", prefix, self.value as i64, self.currency.tag())
            }
            Some(prefix) => format!("{} {} {}", prefix, self.value, self.currency.tag()),
            None => String::new(),
        }
    }
}

/// Per-tab refresh flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshState {
    pub checked: bool,
    pub locked: bool,
}

impl Default for RefreshState {
    fn default() -> Self {
        Self {
            checked: true,
            locked: false,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    items: HashMap<String, Buyout>,
    tabs: HashMap<String, Buyout>,
    refresh: HashMap<String, RefreshState>,
    tab_locations: Vec<ItemLocation>,
}

/// Holds buyouts and refresh state, writing every change through to the
/// store.
///
/// Item buyouts are keyed by item id, tab buyouts and refresh state by the
/// container's [`ItemLocation::unique_hash`], so renaming a tab keeps them.
/// Lookups of an item fall back to its tab on every call.
pub struct BuyoutManager<S> {
    item_store: DataStore<S>,
    tab_store: DataStore<S>,
    refresh_store: DataStore<S>,
    layout_store: DataStore<S>,
    state: Mutex<State>,
}

impl<S: Store> BuyoutManager<S> {
    /// Loads everything previously persisted in `store`'s backend.
    #[instrument(skip_all)]
    pub fn new(store: &DataStore<S>) -> Result<Self, BuyoutError> {
        let item_store = store.namespace(namespaces::ITEM_BUYOUTS);
        let tab_store = store.namespace(namespaces::TAB_BUYOUTS);
        let refresh_store = store.namespace(namespaces::REFRESH);
        let layout_store = store.namespace(namespaces::TABS);

        let state = State {
            items: item_store.records()?.into_iter().collect(),
            tabs: tab_store.records()?.into_iter().collect(),
            refresh: refresh_store.records()?.into_iter().collect(),
            tab_locations: layout_store.get_record(TAB_LAYOUT_KEY)?.unwrap_or_default(),
        };
        debug!(
            items = state.items.len(),
            tabs = state.tabs.len(),
            "buyouts loaded"
        );

        Ok(Self {
            item_store,
            tab_store,
            refresh_store,
            layout_store,
            state: Mutex::new(state),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The effective buyout of an item: its own unless missing or
    /// inherited, otherwise its tab's.
    pub fn get(&self, item: &Item) -> Option<Buyout> {
        let state = self.lock();
        match state.items.get(item.id()) {
            Some(buyout) if !buyout.is_inherited() => Some(buyout.clone()),
            _ => state
                .tabs
                .get(&item.location().unique_hash())
                .filter(|b| !b.is_inherited())
                .cloned(),
        }
    }

    /// The item's own record, without tab fallback.
    pub fn get_own(&self, item: &Item) -> Option<Buyout> {
        self.lock().items.get(item.id()).cloned()
    }

    pub fn set(&self, item: &Item, buyout: Buyout) -> Result<(), BuyoutError> {
        buyout.validate()?;
        let mut state = self.lock();
        self.item_store.set_record(item.id(), &buyout)?;
        debug!(item = item.id(), tag = %buyout.as_tag(), "item buyout set");
        state.items.insert(item.id().to_string(), buyout);
        Ok(())
    }

    /// Gives every item in `items` the same buyout, written as one batch.
    pub fn set_many(&self, items: &[&Item], buyout: Buyout) -> Result<(), BuyoutError> {
        buyout.validate()?;
        let mut batch = Batch::new();
        for item in items {
            batch = batch.set_record(item.id(), &buyout)?;
        }
        let mut state = self.lock();
        self.item_store.write_batch(batch)?;
        debug!(items = items.len(), tag = %buyout.as_tag(), "item buyouts set");
        for item in items {
            state.items.insert(item.id().to_string(), buyout.clone());
        }
        Ok(())
    }

    pub fn delete(&self, item: &Item) -> Result<(), BuyoutError> {
        let mut state = self.lock();
        self.item_store.delete(item.id())?;
        state.items.remove(item.id());
        Ok(())
    }

    pub fn get_tab(&self, location: &ItemLocation) -> Option<Buyout> {
        self.lock().tabs.get(&location.unique_hash()).cloned()
    }

    pub fn set_tab(&self, location: &ItemLocation, buyout: Buyout) -> Result<(), BuyoutError> {
        buyout.validate()?;
        let key = location.unique_hash();
        let mut state = self.lock();
        self.tab_store.set_record(&key, &buyout)?;
        debug!(tab = %location, tag = %buyout.as_tag(), "tab buyout set");
        state.tabs.insert(key, buyout);
        Ok(())
    }

    pub fn delete_tab(&self, location: &ItemLocation) -> Result<(), BuyoutError> {
        let key = location.unique_hash();
        let mut state = self.lock();
        self.tab_store.delete(&key)?;
        state.tabs.remove(&key);
        Ok(())
    }

    /// Known stash tabs, in the order last reported.
    pub fn get_stash_tab_locations(&self) -> Vec<ItemLocation> {
        self.lock().tab_locations.clone()
    }

    pub fn set_stash_tab_locations(&self, tabs: Vec<ItemLocation>) -> Result<(), BuyoutError> {
        let tabs: Vec<ItemLocation> = tabs.iter().map(ItemLocation::container).collect();
        let mut state = self.lock();
        self.layout_store.set_record(TAB_LAYOUT_KEY, &tabs)?;
        state.tab_locations = tabs;
        Ok(())
    }

    pub fn refresh_state(&self, location: &ItemLocation) -> RefreshState {
        self.lock()
            .refresh
            .get(&location.unique_hash())
            .copied()
            .unwrap_or_default()
    }

    pub fn get_refresh_checked(&self, location: &ItemLocation) -> bool {
        self.refresh_state(location).checked
    }

    pub fn get_refresh_locked(&self, location: &ItemLocation) -> bool {
        self.refresh_state(location).locked
    }

    pub fn set_refresh_checked(
        &self,
        location: &ItemLocation,
        checked: bool,
    ) -> Result<(), BuyoutError> {
        self.update_refresh(location, |state| state.checked = checked)
    }

    pub fn set_refresh_locked(
        &self,
        location: &ItemLocation,
        locked: bool,
    ) -> Result<(), BuyoutError> {
        self.update_refresh(location, |state| state.locked = locked)
    }

    fn update_refresh(
        &self,
        location: &ItemLocation,
        update: impl FnOnce(&mut RefreshState),
    ) -> Result<(), BuyoutError> {
        let key = location.unique_hash();
        let mut state = self.lock();
        let mut refresh = state.refresh.get(&key).copied().unwrap_or_default();
        update(&mut refresh);
        self.refresh_store.set_record(&key, &refresh)?;
        state.refresh.insert(key, refresh);
        Ok(())
    }

    /// Known tabs that are checked for refresh.
    pub fn checked_locations(&self) -> Vec<ItemLocation> {
        let state = self.lock();
        state
            .tab_locations
            .iter()
            .filter(|loc| {
                state
                    .refresh
                    .get(&loc.unique_hash())
                    .copied()
                    .unwrap_or_default()
                    .checked
            })
            .cloned()
            .collect()
    }
}

impl<S: Store> PriceLookup for BuyoutManager<S> {
    fn price(&self, item: &Item) -> Option<f64> {
        self.get(item)
            .filter(|b| b.kind.is_priced())
            .map(|b| b.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::sync::Arc;

    fn tab() -> ItemLocation {
        ItemLocation::stash(0, "tab-uid", "Trade")
    }

    fn item_in_tab() -> Item {
        Item::new("item-1", "Ring", tab().at(1, 2, 1, 1))
    }

    fn manager() -> BuyoutManager<MemoryStore> {
        BuyoutManager::new(&DataStore::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn item_overrides_tab() {
        let buyouts = manager();
        buyouts
            .set_tab(&tab(), Buyout::price(10.0, Currency::Chaos))
            .unwrap();
        assert_eq!(buyouts.get(&item_in_tab()).unwrap().value, 10.0);

        buyouts
            .set(&item_in_tab(), Buyout::price(5.0, Currency::Chaos))
            .unwrap();
        assert_eq!(buyouts.get(&item_in_tab()).unwrap().value, 5.0);
        assert_eq!(buyouts.get_tab(&tab()).unwrap().value, 10.0);

        buyouts.delete(&item_in_tab()).unwrap();
        assert_eq!(buyouts.get(&item_in_tab()).unwrap().value, 10.0);
    }

    #[test]
    fn inherit_defers_to_tab_every_time() {
        let buyouts = manager();
        buyouts.set(&item_in_tab(), Buyout::inherit()).unwrap();
        assert!(buyouts.get(&item_in_tab()).is_none());

        buyouts
            .set_tab(&tab(), Buyout::price(3.0, Currency::Divine))
            .unwrap();
        assert_eq!(buyouts.get(&item_in_tab()).unwrap().currency, Currency::Divine);

        buyouts
            .set_tab(&tab(), Buyout::price(4.0, Currency::Divine))
            .unwrap();
        assert_eq!(buyouts.price(&item_in_tab()), Some(4.0));
    }

    #[test]
    fn set_many_prices_every_item_and_persists() {
        let store = DataStore::from_shared(Arc::new(MemoryStore::new()));
        let first = item_in_tab();
        let second = Item::new("item-2", "Amulet", tab().at(2, 2, 1, 1));
        {
            let buyouts = BuyoutManager::new(&store).unwrap();
            buyouts
                .set_many(&[&first, &second], Buyout::price(7.0, Currency::Chaos))
                .unwrap();
            assert_eq!(buyouts.price(&second), Some(7.0));
        }

        let reloaded = BuyoutManager::new(&store).unwrap();
        assert_eq!(reloaded.price(&first), Some(7.0));
        assert_eq!(reloaded.price(&second), Some(7.0));

        let err = reloaded
            .set_many(&[&first], Buyout::price(-1.0, Currency::Chaos))
            .unwrap_err();
        assert!(matches!(err, BuyoutError::InvalidPrice { .. }));
        assert_eq!(reloaded.price(&first), Some(7.0));
    }

    #[test]
    fn renaming_tab_keeps_buyout() {
        let buyouts = manager();
        buyouts
            .set_tab(&tab(), Buyout::price(10.0, Currency::Chaos))
            .unwrap();
        let mut renamed = tab();
        renamed.set_label("Dump");
        assert_eq!(buyouts.get_tab(&renamed).unwrap().value, 10.0);
    }

    #[test]
    fn rejects_unpriced_buyout() {
        let buyouts = manager();
        let err = buyouts
            .set(&item_in_tab(), Buyout::price(0.0, Currency::Chaos))
            .unwrap_err();
        assert!(matches!(err, BuyoutError::InvalidPrice { .. }));
        assert!(buyouts.get(&item_in_tab()).is_none());

        buyouts
            .set(&item_in_tab(), Buyout::new(BuyoutType::NoPrice, 0.0, Currency::Chaos))
            .unwrap();
        assert_eq!(buyouts.price(&item_in_tab()), None);
    }

    #[test]
    fn forum_tags() {
        assert_eq!(Buyout::price(5.0, Currency::Chaos).as_tag(), "~b/o 5 chaos");
        assert_eq!(
            Buyout::new(BuyoutType::Fixed, 1.5, Currency::Divine).as_tag(),
            "~price 1.5 divine"
        );
        assert_eq!(Buyout::inherit().as_tag(), "");
        assert_eq!("~c/o".parse::<BuyoutType>(), Ok(BuyoutType::CurrentOffer));
        assert_eq!("exa".parse::<Currency>(), Ok(Currency::Exalted));
        assert_eq!("Exalted".parse::<Currency>(), Ok(Currency::Exalted));
    }

    #[test]
    fn refresh_defaults_and_updates() {
        let buyouts = manager();
        let other = ItemLocation::stash(1, "other", "Other");
        buyouts
            .set_stash_tab_locations(vec![tab(), other.clone()])
            .unwrap();

        assert!(buyouts.get_refresh_checked(&tab()));
        assert!(!buyouts.get_refresh_locked(&tab()));

        buyouts.set_refresh_checked(&other, false).unwrap();
        buyouts.set_refresh_locked(&tab(), true).unwrap();

        assert_eq!(buyouts.checked_locations(), vec![tab()]);
        assert!(buyouts.get_refresh_locked(&tab()));
        assert!(buyouts.get_refresh_checked(&tab()));
    }

    #[test]
    fn reloads_from_store() {
        let store = DataStore::from_shared(Arc::new(MemoryStore::new()));
        {
            let buyouts = BuyoutManager::new(&store).unwrap();
            buyouts
                .set_tab(&tab(), Buyout::price(10.0, Currency::Chaos))
                .unwrap();
            buyouts
                .set(&item_in_tab(), Buyout::price(5.0, Currency::Chaos).from_game())
                .unwrap();
            buyouts.set_stash_tab_locations(vec![tab()]).unwrap();
            buyouts.set_refresh_locked(&tab(), true).unwrap();
        }

        let reloaded = BuyoutManager::new(&store).unwrap();
        let own = reloaded.get_own(&item_in_tab()).unwrap();
        assert_eq!(own.value, 5.0);
        assert_eq!(own.source, BuyoutSource::Game);
        assert_eq!(reloaded.get_tab(&tab()).unwrap().value, 10.0);
        assert_eq!(reloaded.get_stash_tab_locations(), vec![tab()]);
        assert!(reloaded.get_refresh_locked(&tab()));
    }
}
