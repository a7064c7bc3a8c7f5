//! Item snapshot files: the tabs and items of one inventory refresh.

use std::path::Path;

use serde::Deserialize;
use stashkeeper_core::{Item, ItemLocation, LocationKind};

use crate::error::StkError;

#[derive(Debug, Default, Deserialize)]
pub struct ItemSnapshotFile {
    #[serde(default)]
    pub tabs: Vec<ItemLocation>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl ItemSnapshotFile {
    pub fn load(path: &Path) -> Result<Self, StkError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, StkError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Stash tabs, in tab order.
    pub fn stash_tabs(&self) -> Vec<ItemLocation> {
        let mut tabs: Vec<ItemLocation> = self
            .tabs
            .iter()
            .filter(|t| t.kind() == LocationKind::Stash)
            .map(ItemLocation::container)
            .collect();
        tabs.sort_by_key(ItemLocation::tab_index);
        tabs
    }

    /// Finds a tab or character by `#<n>` (1-based tab number), label, or
    /// character name.
    pub fn find_location(&self, query: &str) -> Result<ItemLocation, StkError> {
        let query = query.trim();
        let by_number = query
            .trim_start_matches('#')
            .parse::<u32>()
            .ok()
            .and_then(|n| n.checked_sub(1));
        self.tabs
            .iter()
            .find(|t| {
                (t.kind() == LocationKind::Stash && Some(t.tab_index()) == by_number)
                    || t.label().eq_ignore_ascii_case(query)
            })
            .map(ItemLocation::container)
            .ok_or_else(|| StkError::UnknownLocation(query.to_string()))
    }

    pub fn find_item(&self, id: &str) -> Result<&Item, StkError> {
        self.items
            .iter()
            .find(|i| i.id() == id)
            .ok_or_else(|| StkError::UnknownItem(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "tabs": [
            {"kind": "stash", "tab_index": 1, "unique_id": "b", "label": "Dump"},
            {"kind": "stash", "tab_index": 0, "unique_id": "a", "label": "Trade"},
            {"kind": "character", "tab_index": 0, "unique_id": "Hero", "label": "Hero"}
        ],
        "items": [
            {
                "id": "ring-1",
                "name": "Storm Loop",
                "type_line": "Ruby Ring",
                "category": "rings",
                "location": {"kind": "stash", "tab_index": 0, "unique_id": "a", "label": "Trade",
                             "rect": {"x": 0, "y": 0, "w": 1, "h": 1}},
                "mods": [{"stat": "fire_resist", "magnitude": 30.0}]
            }
        ]
    }"#;

    #[test]
    fn parses_tabs_and_items() {
        let snapshot = ItemSnapshotFile::parse(SNAPSHOT).unwrap();
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].pretty_name(), "Storm Loop Ruby Ring");

        let tabs = snapshot.stash_tabs();
        let labels: Vec<&str> = tabs.iter().map(|t| t.label()).collect();
        assert_eq!(labels, vec!["Trade", "Dump"]);
    }

    #[test]
    fn finds_locations() {
        let snapshot = ItemSnapshotFile::parse(SNAPSHOT).unwrap();
        assert_eq!(snapshot.find_location("#2").unwrap().label(), "Dump");
        assert_eq!(snapshot.find_location("trade").unwrap().unique_id(), "a");
        assert_eq!(snapshot.find_location("hero").unwrap().kind(), LocationKind::Character);
        assert!(matches!(
            snapshot.find_location("Maps"),
            Err(StkError::UnknownLocation(_))
        ));
        assert!(snapshot.find_item("ring-1").is_ok());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            ItemSnapshotFile::parse("{\"items\": 3}"),
            Err(StkError::Snapshot(_))
        ));
    }
}
