//! Typed settings and buyouts on the durable backend.

use stashkeeper_core::{
    Batch, Buyout, BuyoutManager, Currency, CurrencyUpdate, DataStore, Item, ItemLocation,
};
use stashkeeper_rocks::RocksStore;
use tempfile::TempDir;

#[test]
fn typed_values_round_trip_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = DataStore::new(RocksStore::open(dir.path()).unwrap());
        store.set("league", "Standard").unwrap();
        store.set_bool("auto_refresh", true).unwrap();
        store.set_int("refresh_minutes", 30).unwrap();
        store.set_bytes("blob", &[0, 159, 146, 150]).unwrap();
    }

    let store = DataStore::new(RocksStore::open(dir.path()).unwrap());
    assert_eq!(store.get("league", "").unwrap(), "Standard");
    assert!(store.get_bool("auto_refresh", false).unwrap());
    assert_eq!(store.get_int("refresh_minutes", 0).unwrap(), 30);
    assert_eq!(store.get_bytes("blob", &[]).unwrap(), vec![0, 159, 146, 150]);
    assert_eq!(store.get("missing", "fallback").unwrap(), "fallback");
    // Coercion matches the memory backend.
    assert_eq!(store.get_int("auto_refresh", 0).unwrap(), 1);
    assert_eq!(store.get("refresh_minutes", "").unwrap(), "30");
}

#[test]
fn currency_history_is_time_ordered() {
    let dir = TempDir::new().unwrap();
    let store = DataStore::new(RocksStore::open(dir.path()).unwrap());
    for timestamp in [300, 20, 1_000] {
        store
            .insert_currency(&CurrencyUpdate {
                timestamp,
                value: format!("chaos={}", timestamp),
            })
            .unwrap();
    }

    let stamps: Vec<u64> = store
        .get_all_currency()
        .unwrap()
        .into_iter()
        .map(|u| u.timestamp)
        .collect();
    assert_eq!(stamps, vec![20, 300, 1_000]);
}

#[test]
fn buyouts_persist_across_restart() {
    let dir = TempDir::new().unwrap();
    let tab = ItemLocation::stash(0, "trade", "Trade");
    let item = Item::new("ring", "Ring", tab.clone().at(0, 0, 1, 1));
    {
        let store = DataStore::new(RocksStore::open(dir.path()).unwrap());
        let buyouts = BuyoutManager::new(&store).unwrap();
        buyouts
            .set_tab(&tab, Buyout::price(10.0, Currency::Chaos))
            .unwrap();
        buyouts
            .set(&item, Buyout::price(5.0, Currency::Chaos))
            .unwrap();
        buyouts.set_refresh_checked(&tab, false).unwrap();
    }

    let store = DataStore::new(RocksStore::open(dir.path()).unwrap());
    let buyouts = BuyoutManager::new(&store).unwrap();
    assert_eq!(buyouts.get(&item).unwrap().value, 5.0);
    assert_eq!(buyouts.get_tab(&tab).unwrap().value, 10.0);
    assert!(!buyouts.get_refresh_checked(&tab));
}

#[test]
fn batched_buyouts_persist_across_restart() {
    let dir = TempDir::new().unwrap();
    let tab = ItemLocation::stash(0, "trade", "Trade");
    let rings: Vec<Item> = (0..3)
        .map(|i| Item::new(format!("ring-{}", i), "Ring", tab.clone().at(i, 0, 1, 1)))
        .collect();
    {
        let store = DataStore::new(RocksStore::open(dir.path()).unwrap());
        let buyouts = BuyoutManager::new(&store).unwrap();
        let refs: Vec<&Item> = rings.iter().collect();
        buyouts
            .set_many(&refs, Buyout::price(2.0, Currency::Divine))
            .unwrap();
        store
            .write_batch(Batch::new().set("league", "Standard").set_int("tabs", 1))
            .unwrap();
    }

    let store = DataStore::new(RocksStore::open(dir.path()).unwrap());
    let buyouts = BuyoutManager::new(&store).unwrap();
    for ring in &rings {
        assert_eq!(buyouts.get(ring).unwrap().currency, Currency::Divine);
    }
    assert_eq!(store.get("league", "").unwrap(), "Standard");
    assert_eq!(store.get_int("tabs", 0).unwrap(), 1);
}
