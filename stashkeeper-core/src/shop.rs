//! Forum shop posts built from priced items.
//!
//! Priced items are grouped by buyout into `[spoiler="~b/o 5 chaos"]`
//! blocks, split into posts that fit the forum's size limit and wrapped in
//! the shop template. The last published posts and their hash are kept in
//! the `shop` namespace so an unchanged shop is not published twice.

use std::cmp::Ordering;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::buyout::{Buyout, BuyoutManager};
use crate::datastore::{Batch, DataStore, StoreError, namespaces};
use crate::item::Item;
use crate::location::LocationKind;
use crate::store::Store;

/// Marker in the template replaced by the item list.
pub const ITEMS_MARKER: &str = "[items]";
/// Largest post the forum accepts, in characters.
pub const MAX_POST_CHARS: usize = 50_000;

const SPOILER_OVERHEAD: usize = "[spoiler][/spoiler]".len();
const SPOILER_CLOSE: &str = "[/spoiler]";

const THREADS_KEY: &str = "threads";
const TEMPLATE_KEY: &str = "template";
const HASH_KEY: &str = "hash";
const POSTS_KEY: &str = "posts";

#[derive(Debug, Error)]
pub enum ShopError {
    #[error("no shop threads are set")]
    NoThreads,
    #[error("shop posts are out of date, update them first")]
    Outdated,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of [`Shop::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publish {
    /// Same posts as last time; nothing written.
    Unchanged,
    Updated {
        posts: usize,
        /// Posts that have no thread to go to.
        missing_threads: usize,
    },
}

/// Forum shop state: threads, template and the generated posts.
pub struct Shop<S> {
    store: DataStore<S>,
    threads: Vec<String>,
    template: String,
    posts: Vec<String>,
    hash: String,
    outdated: bool,
}

fn spoiler_open(buyout: &Buyout) -> String {
    format!("[spoiler=\"{}\"]", buyout.as_tag())
}

fn same_group(a: &Buyout, b: &Buyout) -> bool {
    a.kind == b.kind && a.currency == b.currency && a.value == b.value
}

fn compare_entries(a: &(Buyout, Arc<Item>), b: &(Buyout, Arc<Item>)) -> Ordering {
    a.0.kind
        .cmp(&b.0.kind)
        .then_with(|| a.0.currency.cmp(&b.0.currency))
        .then_with(|| a.0.value.total_cmp(&b.0.value))
        .then_with(|| a.1.pretty_name().cmp(&b.1.pretty_name()))
}

impl<S: Store> Shop<S> {
    /// Loads threads and template from the `shop` namespace of `store`.
    pub fn new(store: &DataStore<S>) -> Result<Self, StoreError> {
        let store = store.namespace(namespaces::SHOP);
        let threads = store
            .get(THREADS_KEY, "")?
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        let template = match store.get(TEMPLATE_KEY, "")? {
            t if t.is_empty() => ITEMS_MARKER.to_string(),
            t => t,
        };
        Ok(Self {
            store,
            threads,
            template,
            posts: Vec::new(),
            hash: String::new(),
            outdated: true,
        })
    }

    pub fn threads(&self) -> &[String] {
        &self.threads
    }

    /// Replaces the thread list and forgets what was last published there.
    pub fn set_threads(&mut self, threads: Vec<String>) -> Result<(), StoreError> {
        debug!(threads = %threads.join(";"), "setting shop threads");
        self.store.write_batch(
            Batch::new()
                .set(THREADS_KEY, &threads.join(";"))
                .set(HASH_KEY, ""),
        )?;
        self.threads = threads;
        self.expire();
        Ok(())
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Sets the post template. `[items]` marks where the items go.
    pub fn set_template(&mut self, template: &str) -> Result<(), StoreError> {
        self.store.set(TEMPLATE_KEY, template)?;
        self.template = if template.is_empty() {
            ITEMS_MARKER.to_string()
        } else {
            template.to_string()
        };
        self.expire();
        Ok(())
    }

    /// Marks the generated posts stale, e.g. after buyouts changed.
    pub fn expire(&mut self) {
        self.outdated = true;
    }

    pub fn is_outdated(&self) -> bool {
        self.outdated
    }

    /// Posts from the last [`Shop::update`].
    pub fn posts(&self) -> &[String] {
        &self.posts
    }

    /// Digest of the current posts.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Rebuilds the posts from `items`.
    ///
    /// Only items with a priced buyout are listed. Items socketed into
    /// another item are skipped, since the forum links their host instead.
    /// Stash items are linked by their tab's position among the known tabs;
    /// items in tabs the manager does not know are skipped.
    #[instrument(skip_all, fields(items = items.len()))]
    pub fn update(
        &mut self,
        items: &[Arc<Item>],
        buyouts: &BuyoutManager<S>,
        realm: &str,
        league: &str,
    ) {
        let tabs = buyouts.get_stash_tab_locations();
        let mut priced: Vec<(Buyout, Arc<Item>)> = items
            .iter()
            .filter(|item| !item.location().is_socketed())
            .filter_map(|item| {
                buyouts
                    .get(item)
                    .filter(|b| b.kind.is_priced())
                    .map(|b| (b, Arc::clone(item)))
            })
            .collect();
        priced.sort_by(compare_entries);

        let mut posts = Vec::new();
        if let Some((first, _)) = priced.first() {
            let mut current = first.clone();
            let mut data = spoiler_open(&current);
            for (buyout, item) in &priced {
                if !same_group(buyout, &current) {
                    current = buyout.clone();
                    data.push_str(SPOILER_CLOSE);
                    data.push_str(&spoiler_open(&current));
                }
                let location = item.location();
                let link = match location.kind() {
                    LocationKind::Character => location.forum_code(realm, league, 0),
                    LocationKind::Stash => {
                        let container = location.container();
                        match tabs.iter().find(|tab| **tab == container) {
                            Some(tab) => location.forum_code(realm, league, tab.tab_index()),
                            None => {
                                warn!(
                                    item = %item.pretty_name(),
                                    tab = %location.header(),
                                    "cannot determine tab index"
                                );
                                continue;
                            }
                        }
                    }
                };
                let size = data.len()
                    + link.len()
                    + self.template.len()
                    + SPOILER_OVERHEAD
                    + SPOILER_CLOSE.len();
                if size > MAX_POST_CHARS {
                    data.push_str(SPOILER_CLOSE);
                    posts.push(data);
                    data = spoiler_open(&current);
                }
                data.push_str(&link);
            }
            data.push_str(SPOILER_CLOSE);
            posts.push(data);
        }

        self.posts = posts
            .into_iter()
            .map(|data| {
                self.template
                    .replace(ITEMS_MARKER, &format!("[spoiler]{}{}", data, SPOILER_CLOSE))
            })
            .collect();
        self.hash = blake3::hash(self.posts.join(";").as_bytes())
            .to_hex()
            .to_string();
        self.outdated = false;
        debug!(posts = self.posts.len(), listed = priced.len(), "shop updated");
    }

    /// Stores the current posts unless they match the last published ones.
    pub fn publish(&self, force: bool) -> Result<Publish, ShopError> {
        if self.threads.is_empty() {
            return Err(ShopError::NoThreads);
        }
        if self.outdated {
            return Err(ShopError::Outdated);
        }
        if !force && self.store.get(HASH_KEY, "")? == self.hash {
            debug!("shop unchanged, skipping");
            return Ok(Publish::Unchanged);
        }

        let missing_threads = self.posts.len().saturating_sub(self.threads.len());
        if missing_threads > 0 {
            warn!(missing_threads, "more shop posts than threads");
        }
        self.store.write_batch(
            Batch::new()
                .set_record(POSTS_KEY, &self.posts)?
                .set(HASH_KEY, &self.hash),
        )?;
        info!(posts = self.posts.len(), threads = self.threads.len(), "shop published");
        Ok(Publish::Updated {
            posts: self.posts.len(),
            missing_threads,
        })
    }

    /// Posts stored by the last [`Shop::publish`].
    pub fn published_posts(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.store.get_record(POSTS_KEY)?.unwrap_or_default())
    }
}
