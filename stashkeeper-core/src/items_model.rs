//! Table view over a [`Search`].

use std::fmt;

use crate::item::Item;
use crate::search::{PriceLookup, Search, SearchSpec, SortKey, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    Category,
    Location,
    Price,
    ItemLevel,
    Sockets,
    Links,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Name,
        Column::Category,
        Column::Location,
        Column::Price,
        Column::ItemLevel,
        Column::Sockets,
        Column::Links,
    ];

    pub fn sort_key(self) -> SortKey {
        match self {
            Column::Name => SortKey::Name,
            Column::Category => SortKey::Category,
            Column::Location => SortKey::Location,
            Column::Price => SortKey::Price,
            Column::ItemLevel => SortKey::ItemLevel,
            Column::Sockets => SortKey::Sockets,
            Column::Links => SortKey::Links,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            Column::Name => "Name",
            Column::Category => "Category",
            Column::Location => "Location",
            Column::Price => "Price",
            Column::ItemLevel => "iLvl",
            Column::Sockets => "Sockets",
            Column::Links => "Links",
        };
        f.write_str(title)
    }
}

/// Rows and cell text for a search result. Holds no state of its own;
/// sort changes come back as a new [`SearchSpec`].
pub struct ItemsModel<'a> {
    search: &'a Search,
    prices: &'a dyn PriceLookup,
}

impl<'a> ItemsModel<'a> {
    pub fn new(search: &'a Search, prices: &'a dyn PriceLookup) -> Self {
        Self { search, prices }
    }

    pub fn columns(&self) -> &'static [Column] {
        &Column::ALL
    }

    pub fn row_count(&self) -> usize {
        self.search.items_count()
    }

    pub fn row(&self, row: usize) -> Option<&'a Item> {
        self.search.items().get(row).map(|item| item.as_ref())
    }

    pub fn cell(&self, row: usize, column: Column) -> Option<String> {
        let item = self.row(row)?;
        Some(match column {
            Column::Name => item.pretty_name(),
            Column::Category => item.category().to_string(),
            Column::Location => item.location().header(),
            Column::Price => self
                .prices
                .price(item)
                .map(|p| p.to_string())
                .unwrap_or_default(),
            Column::ItemLevel => item.item_level().map(|l| l.to_string()).unwrap_or_default(),
            Column::Sockets => item.sockets_count().to_string(),
            Column::Links => item.links_count().to_string(),
        })
    }

    pub fn caption(&self) -> String {
        self.search.caption()
    }

    /// The spec a click on `column`'s header asks for.
    pub fn sort_spec(&self, column: Column, order: SortOrder) -> SearchSpec {
        self.search
            .spec()
            .clone()
            .sorted_by(column.sort_key(), order)
    }
}
