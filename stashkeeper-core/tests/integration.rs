//! Integration tests wiring searches, buyouts and settings over one store.

use std::sync::Arc;
use std::thread;

use stashkeeper_core::{
    AsyncStore, Buyout, BuyoutManager, CancelToken, CategoryFilter, Currency, DataStore,
    DefaultPropertyFilter, Item, ItemCollection, ItemLocation, ItemMod, MemoryStore, MinMaxFilter,
    NoPrices, PropertyValue, Publish, RequiredStatFilter, SavedSearch, Search, SearchSpec, Shop,
    SimplePropertyFilter, SortKey, SortOrder, ViewMode, namespaces,
};

fn trade_tab() -> ItemLocation {
    ItemLocation::stash(0, "trade", "Trade")
}

fn dump_tab() -> ItemLocation {
    ItemLocation::stash(1, "dump", "Dump")
}

fn inventory() -> Vec<Item> {
    vec![
        Item::new("ring-a", "Storm Loop", trade_tab().at(0, 0, 1, 1))
            .with_category("rings")
            .with_mod(ItemMod::new("fire_resist", 10.0))
            .with_mod(ItemMod::new("fire_resist", 15.0))
            .with_mod(ItemMod::new("cold_resist", 5.0)),
        Item::new("ring-b", "Doom Band", trade_tab().at(1, 0, 1, 1))
            .with_category("rings")
            .with_mod(ItemMod::new("cold_resist", 30.0)),
        Item::new("helm", "Crown", dump_tab().at(0, 0, 2, 2))
            .with_category("helmets")
            .with_property("Quality", PropertyValue::Number(20.0)),
        Item::new("boots", "Treads", dump_tab().at(2, 0, 2, 2)).with_category("boots"),
    ]
}

fn ids(search: &Search) -> Vec<String> {
    search.items().iter().map(|i| i.id().to_string()).collect()
}

#[test]
fn price_sort_uses_effective_buyouts() {
    let store = DataStore::new(MemoryStore::new());
    let buyouts = BuyoutManager::new(&store).unwrap();
    let collection = ItemCollection::new();
    collection.replace(inventory());
    let snapshot = collection.snapshot();

    buyouts
        .set_tab(&trade_tab(), Buyout::price(10.0, Currency::Chaos))
        .unwrap();
    buyouts
        .set(&snapshot.items()[0], Buyout::price(5.0, Currency::Chaos))
        .unwrap();

    let spec = SearchSpec::new().sorted_by(SortKey::Price, SortOrder::Ascending);
    let mut search = Search::new("priced", spec);
    search.filter(&snapshot, &buyouts, &CancelToken::new()).unwrap();

    // Unpriced items go last, in snapshot order.
    assert_eq!(ids(&search), vec!["ring-a", "ring-b", "helm", "boots"]);
}

#[test]
fn gem_levels_with_text_values_sort_after_numbers() {
    let gem = |id: &str, level: PropertyValue| {
        Item::new(id, id, trade_tab()).with_property("Level", level)
    };
    let collection = ItemCollection::new();
    collection.replace(vec![
        gem("five", PropertyValue::Number(5.0)),
        gem("maxed", PropertyValue::Text("20 (Max)".into())),
        gem("one", PropertyValue::Number(1.0)),
        gem("none", PropertyValue::Text("n/a".into())),
        gem("three", PropertyValue::Number(3.0)),
        Item::new("plain", "plain", trade_tab()),
    ]);

    let spec =
        SearchSpec::new().sorted_by(SortKey::Property("Level".into()), SortOrder::Ascending);
    let mut search = Search::new("gems", spec);
    search.run(&collection, &NoPrices, &CancelToken::new()).unwrap();

    assert_eq!(
        ids(&search),
        vec!["one", "three", "five", "maxed", "none", "plain"]
    );
}

#[test]
fn shop_lists_batch_priced_items_once() {
    let store = DataStore::new(MemoryStore::new());
    let buyouts = BuyoutManager::new(&store).unwrap();
    buyouts
        .set_stash_tab_locations(vec![trade_tab(), dump_tab()])
        .unwrap();
    let collection = ItemCollection::new();
    collection.replace(inventory());
    let snapshot = collection.snapshot();

    let rings: Vec<&Item> = snapshot.items()[..2].iter().map(|i| i.as_ref()).collect();
    buyouts
        .set_many(&rings, Buyout::price(4.0, Currency::Chaos))
        .unwrap();

    let mut shop = Shop::new(&store).unwrap();
    shop.set_threads(vec!["42".into()]).unwrap();
    shop.update(snapshot.items(), &buyouts, "pc", "Standard");
    assert_eq!(shop.posts().len(), 1);
    assert_eq!(shop.posts()[0].matches("[linkItem").count(), 2);
    assert_eq!(
        shop.publish(false).unwrap(),
        Publish::Updated {
            posts: 1,
            missing_threads: 0
        }
    );

    let reopened = Shop::new(&store).unwrap();
    assert_eq!(reopened.published_posts().unwrap(), shop.posts());
}

#[test]
fn default_property_versus_simple_property() {
    let collection = ItemCollection::new();
    collection.replace(inventory());

    let mut simple = Search::new(
        "simple",
        SearchSpec::new().filter(SimplePropertyFilter::new("Quality", "0")),
    );
    let mut defaulted = Search::new(
        "defaulted",
        SearchSpec::new()
            .filter(CategoryFilter::new(["boots"]))
            .filter(DefaultPropertyFilter::new("Quality", Some(0.0), Some(10.0), 0.0)),
    );
    let none = stashkeeper_core::NoPrices;
    simple.run(&collection, &none, &CancelToken::new()).unwrap();
    defaulted.run(&collection, &none, &CancelToken::new()).unwrap();

    assert!(simple.items().is_empty());
    assert_eq!(ids(&defaulted), vec!["boots"]);
}

#[test]
fn removing_a_property_flips_min_max() {
    let filter_spec = SearchSpec::new().filter(MinMaxFilter::new("Quality", Some(0.0), None));
    let collection = ItemCollection::new();
    collection.replace(inventory());

    let mut search = Search::new("quality", filter_spec);
    search
        .run(&collection, &stashkeeper_core::NoPrices, &CancelToken::new())
        .unwrap();
    assert_eq!(ids(&search), vec!["helm"]);

    collection.replace(vec![Item::new("helm", "Crown", dump_tab()).with_category("helmets")]);
    search
        .run(&collection, &stashkeeper_core::NoPrices, &CancelToken::new())
        .unwrap();
    assert!(search.items().is_empty());
    assert_eq!(search.caption(), "quality (0 of 1)");
}

#[test]
fn saved_search_survives_store() {
    let store = DataStore::new(MemoryStore::new());
    let searches = store.namespace(namespaces::SEARCHES);
    let spec = SearchSpec::new()
        .filter(RequiredStatFilter::new("fire_resist", 20.0))
        .sorted_by(SortKey::Location, SortOrder::Ascending)
        .view(ViewMode::ByLocation);
    searches.set_record("fire", &spec.to_saved()).unwrap();

    let saved: SavedSearch = searches.get_record("fire").unwrap().unwrap();
    let mut search = Search::new("fire", saved.into_spec().unwrap());
    let collection = ItemCollection::new();
    collection.replace(inventory());
    search
        .run(&collection, &stashkeeper_core::NoPrices, &CancelToken::new())
        .unwrap();

    assert_eq!(ids(&search), vec!["ring-a"]);
    let groups = search.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].location, trade_tab());
}

#[test]
fn concurrent_sets_keep_unrelated_keys() {
    let store = DataStore::from_shared(Arc::new(MemoryStore::new()));
    store.set("league", "Standard").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    store.set_int(&format!("t{}-{}", t, i), i).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get("league", "").unwrap(), "Standard");
    assert_eq!(store.get_int("t3-42", -1).unwrap(), 42);
    assert_eq!(store.keys().unwrap().len(), 801);
}

#[tokio::test]
async fn async_boundary_sees_typed_writes() {
    let backend = Arc::new(MemoryStore::new());
    let store = DataStore::from_shared(Arc::clone(&backend));
    store.set_bool("auto_refresh", true).unwrap();

    let raw = backend.async_get(b"settings/auto_refresh").await.unwrap();
    assert!(raw.is_some());
    backend.async_delete(b"settings/auto_refresh").await.unwrap();
    assert!(!store.get_bool("auto_refresh", false).unwrap());
}
