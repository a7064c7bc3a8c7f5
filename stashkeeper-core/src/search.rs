//! Search: filtering, sorting and grouping over an item snapshot.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::filter::{Filter, FilterConfig, FilterConfigError, ItemFilter};
use crate::item::Item;
use crate::location::ItemLocation;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("search was cancelled")]
    Cancelled,
}

/// An immutable view of the item collection at one refresh.
#[derive(Debug, Default)]
pub struct Snapshot {
    generation: u64,
    items: Vec<Arc<Item>>,
}

impl Snapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn items(&self) -> &[Arc<Item>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The shared item collection.
///
/// Refreshes replace the whole snapshot; readers keep whichever snapshot
/// they grabbed until they ask for a new one.
#[derive(Debug, Default)]
pub struct ItemCollection {
    current: RwLock<Arc<Snapshot>>,
    generation: AtomicU64,
}

impl ItemCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Publishes a fully built item set, returning its generation.
    pub fn replace(&self, items: Vec<Item>) -> u64 {
        let generation = self
            .generation
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        let snapshot = Arc::new(Snapshot {
            generation,
            items: items.into_iter().map(Arc::new).collect(),
        });
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
        debug!(generation, "item collection replaced");
        generation
    }
}

/// Cooperative cancellation, checked between items.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Source of buyout prices for sorting.
pub trait PriceLookup {
    fn price(&self, item: &Item) -> Option<f64>;
}

/// No prices at all.
pub struct NoPrices;

impl PriceLookup for NoPrices {
    fn price(&self, _item: &Item) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "key", content = "name", rename_all = "snake_case")]
pub enum SortKey {
    /// Keep snapshot order.
    #[default]
    None,
    Name,
    Category,
    Property(String),
    Location,
    Price,
    ItemLevel,
    Sockets,
    Links,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Flat,
    ByLocation,
}

/// What to search for: active filters (all must pass), sort, view mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSpec {
    pub filters: Vec<Filter>,
    pub sort: SortSpec,
    pub view_mode: ViewMode,
}

impl SearchSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn sorted_by(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort = SortSpec { key, order };
        self
    }

    pub fn view(mut self, view_mode: ViewMode) -> Self {
        self.view_mode = view_mode;
        self
    }

    /// Serializable form, for saved searches.
    pub fn to_saved(&self) -> SavedSearch {
        SavedSearch {
            filters: self.filters.iter().map(Filter::config).collect(),
            sort: self.sort.clone(),
            view_mode: self.view_mode,
        }
    }
}

/// A stored search. Filters are rebuilt strictly on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub filters: Vec<FilterConfig>,
    #[serde(default)]
    pub sort: SortSpec,
    #[serde(default)]
    pub view_mode: ViewMode,
}

impl SavedSearch {
    pub fn into_spec(self) -> Result<SearchSpec, FilterConfigError> {
        let filters = self
            .filters
            .into_iter()
            .map(Filter::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SearchSpec {
            filters,
            sort: self.sort,
            view_mode: self.view_mode,
        })
    }
}

/// Items from one container, in search order.
#[derive(Debug, Clone)]
pub struct LocationGroup {
    pub location: ItemLocation,
    pub items: Vec<Arc<Item>>,
}

#[derive(Debug, Default)]
struct Evaluation {
    generation: u64,
    total: usize,
    items: Vec<Arc<Item>>,
}

#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Text(String),
    Number(f64),
    Location(ItemLocation),
}

impl SortValue {
    /// Numbers sort before text, text before locations.
    fn rank(&self) -> u8 {
        match self {
            SortValue::Number(_) => 0,
            SortValue::Text(_) => 1,
            SortValue::Location(_) => 2,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Location(a), SortValue::Location(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn sort_value(key: &SortKey, item: &Item, prices: &dyn PriceLookup) -> Option<SortValue> {
    match key {
        SortKey::None => None,
        SortKey::Name => Some(SortValue::Text(item.pretty_name().to_lowercase())),
        SortKey::Category => Some(item.category())
            .filter(|c| !c.is_empty())
            .map(|c| SortValue::Text(c.to_lowercase())),
        SortKey::Property(name) => item
            .numeric_property(name)
            .map(SortValue::Number)
            .or_else(|| {
                item.property(name)
                    .map(|p| SortValue::Text(p.text().to_lowercase()))
            }),
        SortKey::Location => Some(SortValue::Location(item.location().container())),
        SortKey::Price => prices.price(item).map(SortValue::Number),
        SortKey::ItemLevel => item.item_level().map(|l| SortValue::Number(f64::from(l))),
        SortKey::Sockets => Some(SortValue::Number(item.sockets_count() as f64)),
        SortKey::Links => Some(SortValue::Number(item.links_count() as f64)),
    }
}

/// Orders present keys by `order` and puts absent keys last either way.
fn compare_keys(a: &Option<SortValue>, b: &Option<SortValue>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Ascending => a.compare(b),
            SortOrder::Descending => b.compare(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A named search and the result of its last completed evaluation.
#[derive(Debug)]
pub struct Search {
    name: String,
    spec: SearchSpec,
    last: Evaluation,
}

impl Search {
    pub fn new(name: impl Into<String>, spec: SearchSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            last: Evaluation::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &SearchSpec {
        &self.spec
    }

    /// Replaces the spec. The published result stays until the next
    /// evaluation.
    pub fn set_spec(&mut self, spec: SearchSpec) {
        self.spec = spec;
    }

    /// Evaluates the spec against `snapshot` and publishes the result.
    ///
    /// On cancellation nothing is published and the previous result stays.
    #[instrument(skip_all, fields(search = %self.name, generation = snapshot.generation()))]
    pub fn filter(
        &mut self,
        snapshot: &Snapshot,
        prices: &dyn PriceLookup,
        cancel: &CancelToken,
    ) -> Result<usize, SearchError> {
        let mut matched: Vec<(Option<SortValue>, Arc<Item>)> = Vec::new();
        for item in snapshot.items() {
            if cancel.is_cancelled() {
                debug!("cancelled");
                return Err(SearchError::Cancelled);
            }
            if self.spec.filters.iter().all(|f| f.matches(item)) {
                let key = sort_value(&self.spec.sort.key, item, prices);
                matched.push((key, Arc::clone(item)));
            }
        }

        let order = self.spec.sort.order;
        // Stable: equal keys keep snapshot order.
        matched.sort_by(|(a, _), (b, _)| compare_keys(a, b, order));

        self.last = Evaluation {
            generation: snapshot.generation(),
            total: snapshot.len(),
            items: matched.into_iter().map(|(_, item)| item).collect(),
        };
        debug!(matched = self.last.items.len(), total = self.last.total, "search evaluated");
        Ok(self.last.items.len())
    }

    /// Convenience: evaluates against the collection's current snapshot.
    pub fn run(
        &mut self,
        collection: &ItemCollection,
        prices: &dyn PriceLookup,
        cancel: &CancelToken,
    ) -> Result<usize, SearchError> {
        let snapshot = collection.snapshot();
        self.filter(&snapshot, prices, cancel)
    }

    /// Matching items, in sorted order.
    pub fn items(&self) -> &[Arc<Item>] {
        &self.last.items
    }

    pub fn items_count(&self) -> usize {
        self.last.items.len()
    }

    /// Size of the snapshot the last evaluation ran over.
    pub fn total_count(&self) -> usize {
        self.last.total
    }

    pub fn generation(&self) -> u64 {
        self.last.generation
    }

    pub fn view_mode(&self) -> ViewMode {
        self.spec.view_mode
    }

    /// Partition of the matching items by container, keeping search order
    /// inside each group.
    pub fn groups(&self) -> Vec<LocationGroup> {
        let mut by_location: BTreeMap<ItemLocation, Vec<Arc<Item>>> = BTreeMap::new();
        for item in &self.last.items {
            by_location
                .entry(item.location().container())
                .or_default()
                .push(Arc::clone(item));
        }
        let mut groups: Vec<LocationGroup> = by_location
            .into_iter()
            .map(|(location, items)| LocationGroup { location, items })
            .collect();
        // Stash tabs in tab order, characters by name.
        groups.sort_by_key(|g| (g.location.kind(), g.location.tab_index()));
        groups
    }

    pub fn caption(&self) -> String {
        format!(
            "{} ({} of {})",
            self.name,
            self.last.items.len(),
            self.last.total
        )
    }
}
