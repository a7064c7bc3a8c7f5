//! Command implementations for `stk`.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use stashkeeper_core::{
    Buyout, BuyoutManager, BuyoutType, CancelToken, CategoryFilter, Currency, CurrencyUpdate,
    DefaultPropertyFilter, Filter, Item, ItemCollection, ItemLevelFilter, ItemsModel, LinksFilter,
    MinMaxFilter, Publish, RequiredStatFilter, SavedSearch, Search, SearchSpec, Shop,
    SimplePropertyFilter, SocketsFilter, SortKey, SortOrder, ViewMode, namespaces,
};
use tracing::{debug, info};

use crate::error::StkError;
use crate::snapshot::ItemSnapshotFile;
use crate::store::{AnyStore, AppContext};

/// Filter and sort options of `stk search`.
#[derive(Debug, Default, clap::Args)]
pub struct SearchArgs {
    /// Name shown in the caption; also the key for --save
    #[arg(long, default_value = "search")]
    pub name: String,

    /// Allowed category (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    #[arg(long)]
    pub min_sockets: Option<f64>,
    #[arg(long)]
    pub max_sockets: Option<f64>,

    #[arg(long)]
    pub min_links: Option<f64>,
    #[arg(long)]
    pub max_links: Option<f64>,

    /// Required character level range
    #[arg(long)]
    pub min_level: Option<f64>,
    #[arg(long)]
    pub max_level: Option<f64>,

    /// Item level range
    #[arg(long)]
    pub min_ilvl: Option<f64>,
    #[arg(long)]
    pub max_ilvl: Option<f64>,

    /// Aggregated stat threshold, STAT=MIN (repeatable)
    #[arg(long = "stat", value_name = "STAT=MIN")]
    pub stats: Vec<String>,

    /// Numeric property range, NAME=MIN:MAX; either side may be empty
    #[arg(long = "property", value_name = "NAME=MIN:MAX")]
    pub properties: Vec<String>,

    /// Numeric property range with a value for items lacking it
    #[arg(long = "property-or", value_name = "NAME=MIN:MAX:DEFAULT")]
    pub defaulted_properties: Vec<String>,

    /// Exact property text, NAME=VALUE
    #[arg(long = "text", value_name = "NAME=VALUE")]
    pub texts: Vec<String>,

    /// Sort key: name, category, location, price, ilvl, sockets, links or prop:NAME
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long)]
    pub desc: bool,

    /// Group results by stash tab
    #[arg(long)]
    pub group: bool,
}

fn split_pair<'a>(arg: &'a str, what: &str) -> Result<(&'a str, &'a str), StkError> {
    arg.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .ok_or_else(|| {
            StkError::InvalidArgument(format!("expected {} as NAME=VALUE: {}", what, arg))
        })
}

fn parse_bound(raw: &str) -> Result<Option<f64>, StkError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| StkError::InvalidArgument(format!("not a number: {}", raw)))
}

fn parse_sort(raw: &str) -> Result<SortKey, StkError> {
    if let Some(property) = raw.strip_prefix("prop:") {
        return Ok(SortKey::Property(property.to_string()));
    }
    match raw.to_lowercase().as_str() {
        "name" => Ok(SortKey::Name),
        "category" => Ok(SortKey::Category),
        "location" | "tab" => Ok(SortKey::Location),
        "price" => Ok(SortKey::Price),
        "ilvl" | "item_level" => Ok(SortKey::ItemLevel),
        "sockets" => Ok(SortKey::Sockets),
        "links" => Ok(SortKey::Links),
        "none" => Ok(SortKey::None),
        other => Err(StkError::InvalidArgument(format!("unknown sort key: {}", other))),
    }
}

/// Builds a spec from command-line options. Every filter is checked strictly.
pub fn build_spec(args: &SearchArgs) -> Result<SearchSpec, StkError> {
    let mut filters: Vec<Filter> = Vec::new();

    if !args.categories.is_empty() {
        filters.push(CategoryFilter::new(args.categories.iter().cloned()).into());
    }
    if args.min_sockets.is_some() || args.max_sockets.is_some() {
        filters.push(SocketsFilter::new(args.min_sockets, args.max_sockets).into());
    }
    if args.min_links.is_some() || args.max_links.is_some() {
        filters.push(LinksFilter::new(args.min_links, args.max_links).into());
    }
    if args.min_level.is_some() || args.max_level.is_some() {
        filters.push(ItemLevelFilter::new(args.min_level, args.max_level).into());
    }
    if args.min_ilvl.is_some() || args.max_ilvl.is_some() {
        filters.push(ItemLevelFilter::item_level(args.min_ilvl, args.max_ilvl).into());
    }
    for stat in &args.stats {
        let (name, min) = split_pair(stat, "stat")?;
        let min = parse_bound(min)?
            .ok_or_else(|| StkError::InvalidArgument(format!("missing threshold: {}", stat)))?;
        filters.push(RequiredStatFilter::new(name, min).into());
    }
    for property in &args.properties {
        let (name, range) = split_pair(property, "property")?;
        let (min, max) = range.split_once(':').unwrap_or((range, ""));
        filters.push(MinMaxFilter::new(name, parse_bound(min)?, parse_bound(max)?).into());
    }
    for property in &args.defaulted_properties {
        let (name, spec) = split_pair(property, "property")?;
        let parts: Vec<&str> = spec.split(':').collect();
        let [min, max, default] = parts.as_slice() else {
            return Err(StkError::InvalidArgument(format!(
                "expected NAME=MIN:MAX:DEFAULT: {}",
                property
            )));
        };
        let default = parse_bound(default)?
            .ok_or_else(|| StkError::InvalidArgument(format!("missing default: {}", property)))?;
        filters.push(
            DefaultPropertyFilter::new(name, parse_bound(min)?, parse_bound(max)?, default).into(),
        );
    }
    for text in &args.texts {
        let (name, value) = split_pair(text, "text")?;
        filters.push(SimplePropertyFilter::new(name, value).into());
    }

    let mut spec = SearchSpec::new();
    for filter in filters {
        // Round-trip through the config form to reject malformed settings.
        spec = spec.filter(Filter::from_config(filter.config())?);
    }
    if let Some(sort) = &args.sort {
        let order = if args.desc {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        };
        spec = spec.sorted_by(parse_sort(sort)?, order);
    }
    if args.group {
        spec = spec.view(ViewMode::ByLocation);
    }
    Ok(spec)
}

fn load_snapshot(path: &Path) -> Result<ItemSnapshotFile, StkError> {
    let snapshot = ItemSnapshotFile::load(path)?;
    debug!(items = snapshot.items.len(), tabs = snapshot.tabs.len(), "snapshot loaded");
    Ok(snapshot)
}

fn buyouts_for(
    ctx: &AppContext,
    snapshot: &ItemSnapshotFile,
) -> Result<BuyoutManager<AnyStore>, StkError> {
    let buyouts = BuyoutManager::new(&ctx.store)?;
    if !snapshot.tabs.is_empty() {
        buyouts.set_stash_tab_locations(snapshot.stash_tabs())?;
    }
    Ok(buyouts)
}

pub fn search(
    ctx: &AppContext,
    snapshot_path: &Path,
    args: &SearchArgs,
    save: bool,
    load: Option<&str>,
) -> Result<Vec<String>, StkError> {
    let snapshot = load_snapshot(snapshot_path)?;
    let buyouts = buyouts_for(ctx, &snapshot)?;
    let searches = ctx.store.namespace(namespaces::SEARCHES);

    let (name, spec) = match load {
        Some(name) => {
            let saved: SavedSearch = searches
                .get_record(name)?
                .ok_or_else(|| StkError::InvalidArgument(format!("no saved search '{}'", name)))?;
            (name.to_string(), saved.into_spec()?)
        }
        None => (args.name.clone(), build_spec(args)?),
    };
    if save {
        searches.set_record(&name, &spec.to_saved())?;
        info!(search = %name, "search saved");
    }

    let collection = ItemCollection::new();
    collection.replace(snapshot.items);

    let mut search = Search::new(name, spec);
    // Nothing cancels a one-shot run.
    search.run(&collection, &buyouts, &CancelToken::new())?;

    Ok(render(&search, &buyouts))
}

fn render(search: &Search, buyouts: &BuyoutManager<AnyStore>) -> Vec<String> {
    let model = ItemsModel::new(search, buyouts);
    let mut lines = vec![model.caption()];
    match search.view_mode() {
        ViewMode::Flat => {
            for row in 0..model.row_count() {
                let cells: Vec<String> = model
                    .columns()
                    .iter()
                    .map(|column| model.cell(row, *column).unwrap_or_default())
                    .collect();
                lines.push(cells.join("\t"));
            }
        }
        ViewMode::ByLocation => {
            for group in search.groups() {
                lines.push(format!("== {} ==", group.location.header()));
                for item in &group.items {
                    let tag = buyouts.get(item).map(|b| b.as_tag()).unwrap_or_default();
                    lines.push(format!("{}\t{}\t{}", item.pretty_name(), item.category(), tag));
                }
            }
        }
    }
    lines
}

#[derive(Debug, Clone, clap::Args)]
pub struct PriceArgs {
    /// Buyout type: b/o, price, c/o, none, ignore or inherit
    #[arg(long = "type", default_value = "b/o")]
    pub kind: BuyoutType,
    pub value: Option<f64>,
    pub currency: Option<Currency>,
}

impl PriceArgs {
    fn buyout(&self) -> Buyout {
        Buyout::new(
            self.kind,
            self.value.unwrap_or(0.0),
            self.currency.unwrap_or_default(),
        )
    }
}

/// Prices every listed item the same, in one write.
pub fn set_item_buyouts(
    ctx: &AppContext,
    snapshot_path: &Path,
    item_ids: &[String],
    price: &PriceArgs,
) -> Result<Vec<String>, StkError> {
    let snapshot = load_snapshot(snapshot_path)?;
    let buyouts = buyouts_for(ctx, &snapshot)?;
    let items = item_ids
        .iter()
        .map(|id| snapshot.find_item(id))
        .collect::<Result<Vec<&Item>, _>>()?;
    let buyout = price.buyout();
    let tag = buyout.as_tag();
    buyouts.set_many(&items, buyout)?;
    Ok(items
        .iter()
        .map(|item| format!("{}: {}", item.pretty_name(), tag))
        .collect())
}

pub fn set_tab_buyout(
    ctx: &AppContext,
    snapshot_path: &Path,
    tab: &str,
    price: &PriceArgs,
) -> Result<String, StkError> {
    let snapshot = load_snapshot(snapshot_path)?;
    let buyouts = buyouts_for(ctx, &snapshot)?;
    let location = snapshot.find_location(tab)?;
    let buyout = price.buyout();
    let tag = buyout.as_tag();
    buyouts.set_tab(&location, buyout)?;
    Ok(format!("{}: {}", location.header(), tag))
}

pub fn clear_buyout(
    ctx: &AppContext,
    snapshot_path: &Path,
    item_id: Option<&str>,
    tab: Option<&str>,
) -> Result<(), StkError> {
    let snapshot = load_snapshot(snapshot_path)?;
    let buyouts = buyouts_for(ctx, &snapshot)?;
    if let Some(id) = item_id {
        buyouts.delete(snapshot.find_item(id)?)?;
    }
    if let Some(tab) = tab {
        buyouts.delete_tab(&snapshot.find_location(tab)?)?;
    }
    Ok(())
}

/// Rebuilds the forum shop posts and stores them unless nothing changed.
pub fn shop_update(
    ctx: &AppContext,
    snapshot_path: &Path,
    force: bool,
) -> Result<Vec<String>, StkError> {
    let snapshot = load_snapshot(snapshot_path)?;
    let buyouts = buyouts_for(ctx, &snapshot)?;
    let items: Vec<Arc<Item>> = snapshot.items.into_iter().map(Arc::new).collect();

    let mut shop = Shop::new(&ctx.store)?;
    shop.update(&items, &buyouts, &ctx.realm, &ctx.league);
    let status = match shop.publish(force)? {
        Publish::Unchanged => "shop unchanged".to_string(),
        Publish::Updated {
            posts,
            missing_threads: 0,
        } => format!("shop updated: {} post(s)", posts),
        Publish::Updated {
            posts,
            missing_threads,
        } => format!(
            "shop updated: {} post(s), {} more thread(s) needed",
            posts, missing_threads
        ),
    };
    let mut lines = shop.posts().to_vec();
    lines.push(status);
    Ok(lines)
}

pub fn shop_set_threads(ctx: &AppContext, threads: Vec<String>) -> Result<(), StkError> {
    Shop::new(&ctx.store)?.set_threads(threads)?;
    Ok(())
}

pub fn shop_set_template(ctx: &AppContext, template: &str) -> Result<(), StkError> {
    Shop::new(&ctx.store)?.set_template(template)?;
    Ok(())
}

/// Posts stored by the last shop update.
pub fn shop_show(ctx: &AppContext) -> Result<Vec<String>, StkError> {
    Ok(Shop::new(&ctx.store)?.published_posts()?)
}

pub fn refresh_list(ctx: &AppContext, snapshot_path: &Path) -> Result<Vec<String>, StkError> {
    let snapshot = load_snapshot(snapshot_path)?;
    let buyouts = buyouts_for(ctx, &snapshot)?;
    Ok(buyouts
        .get_stash_tab_locations()
        .iter()
        .map(|tab| {
            let state = buyouts.refresh_state(tab);
            format!(
                "[{}] {}{}",
                if state.checked { "x" } else { " " },
                tab.header(),
                if state.locked { " (locked)" } else { "" }
            )
        })
        .collect())
}

pub fn refresh_set(
    ctx: &AppContext,
    snapshot_path: &Path,
    tab: &str,
    checked: Option<bool>,
    locked: Option<bool>,
) -> Result<(), StkError> {
    let snapshot = load_snapshot(snapshot_path)?;
    let buyouts = buyouts_for(ctx, &snapshot)?;
    let location = snapshot.find_location(tab)?;
    if let Some(checked) = checked {
        buyouts.set_refresh_checked(&location, checked)?;
    }
    if let Some(locked) = locked {
        buyouts.set_refresh_locked(&location, locked)?;
    }
    Ok(())
}

pub fn currency_add(
    ctx: &AppContext,
    value: String,
    timestamp: Option<u64>,
) -> Result<u64, StkError> {
    let timestamp = match timestamp {
        Some(t) => t,
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    };
    ctx.store.insert_currency(&CurrencyUpdate { timestamp, value })?;
    Ok(timestamp)
}

pub fn currency_list(ctx: &AppContext) -> Result<Vec<String>, StkError> {
    Ok(ctx
        .store
        .get_all_currency()?
        .into_iter()
        .map(|u| format!("{}\t{}", u.timestamp, u.value))
        .collect())
}
