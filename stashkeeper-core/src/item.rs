use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::location::ItemLocation;
use crate::mods::{ItemMod, ModTable, aggregate_all, standard_generators};

/// Stable identifier for items across refreshes.
pub type ItemId = String;

/// A property value as reported by the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyValue {
    Number(f64),
    /// A numeric span such as physical damage `10-20`.
    Range { min: f64, max: f64 },
    Text(String),
}

impl PropertyValue {
    /// Numeric reading of the value. Ranges read as their average; text is
    /// parsed leniently (`+20%` reads as 20, `10-20` as 15).
    pub fn numeric(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Range { min, max } => Some((min + max) / 2.0),
            PropertyValue::Text(text) => parse_numeric(text),
        }
    }

    pub fn text(&self) -> String {
        match self {
            PropertyValue::Number(n) => format!("{}", n),
            PropertyValue::Range { min, max } => format!("{}-{}", min, max),
            PropertyValue::Text(text) => text.clone(),
        }
    }
}

fn parse_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim().trim_start_matches('+').trim_end_matches('%');
    if let Some((low, high)) = trimmed.split_once('-') {
        if !low.is_empty() {
            let low: f64 = low.trim().parse().ok()?;
            let high: f64 = high.trim().parse().ok()?;
            return Some((low + high) / 2.0);
        }
    }
    trimmed.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketColour {
    #[serde(rename = "R")]
    Red,
    #[serde(rename = "G")]
    Green,
    #[serde(rename = "B")]
    Blue,
    #[serde(rename = "W")]
    White,
    #[serde(rename = "A")]
    Abyss,
}

/// A socket; sockets sharing a group are linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socket {
    pub group: u8,
    pub colour: SocketColour,
}

/// An item snapshot.
///
/// Items are produced by the retrieval side and never mutated during a
/// search pass; a refresh replaces the whole collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    name: String,
    #[serde(default)]
    type_line: String,
    #[serde(default)]
    category: String,
    location: ItemLocation,
    #[serde(default)]
    properties: IndexMap<String, PropertyValue>,
    #[serde(default)]
    mods: Vec<ItemMod>,
    #[serde(default)]
    sockets: Vec<Socket>,
    #[serde(default)]
    requirements: IndexMap<String, i64>,
    #[serde(default)]
    item_level: Option<u32>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    corrupted: bool,
    #[serde(skip)]
    mod_table: OnceLock<ModTable>,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, location: ItemLocation) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            type_line: String::new(),
            category: String::new(),
            location,
            properties: IndexMap::new(),
            mods: Vec::new(),
            sockets: Vec::new(),
            requirements: IndexMap::new(),
            item_level: None,
            note: None,
            corrupted: false,
            mod_table: OnceLock::new(),
        }
    }

    pub fn with_type_line(mut self, type_line: impl Into<String>) -> Self {
        self.type_line = type_line.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_mod(mut self, item_mod: ItemMod) -> Self {
        self.mods.push(item_mod);
        self.mod_table = OnceLock::new();
        self
    }

    pub fn with_sockets(mut self, sockets: Vec<Socket>) -> Self {
        self.sockets = sockets;
        self
    }

    pub fn with_requirement(mut self, name: impl Into<String>, value: i64) -> Self {
        self.requirements.insert(name.into(), value);
        self
    }

    pub fn with_item_level(mut self, level: u32) -> Self {
        self.item_level = Some(level);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn corrupted(mut self, corrupted: bool) -> Self {
        self.corrupted = corrupted;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_line(&self) -> &str {
        &self.type_line
    }

    /// Name and type line, the way the game displays them.
    pub fn pretty_name(&self) -> String {
        match (self.name.is_empty(), self.type_line.is_empty()) {
            (false, false) => format!("{} {}", self.name, self.type_line),
            (true, _) => self.type_line.clone(),
            (false, true) => self.name.clone(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn location(&self) -> &ItemLocation {
        &self.location
    }

    pub fn properties(&self) -> &IndexMap<String, PropertyValue> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn numeric_property(&self, name: &str) -> Option<f64> {
        self.property(name).and_then(PropertyValue::numeric)
    }

    pub fn mods(&self) -> &[ItemMod] {
        &self.mods
    }

    /// Aggregated mod totals from the standard generators, computed once.
    pub fn mod_table(&self) -> &ModTable {
        self.mod_table
            .get_or_init(|| aggregate_all(&standard_generators(), &self.mods))
    }

    pub fn sockets(&self) -> &[Socket] {
        &self.sockets
    }

    pub fn sockets_count(&self) -> usize {
        self.sockets.len()
    }

    /// Size of the largest linked socket group.
    pub fn links_count(&self) -> usize {
        let mut best = 0;
        let mut run = 0;
        let mut group = None;
        // The game lists sockets grouped, so links are consecutive runs.
        for socket in &self.sockets {
            if group == Some(socket.group) {
                run += 1;
            } else {
                group = Some(socket.group);
                run = 1;
            }
            best = best.max(run);
        }
        best
    }

    pub fn requirement(&self, name: &str) -> Option<i64> {
        self.requirements.get(name).copied()
    }

    /// Character level needed to equip the item.
    pub fn required_level(&self) -> Option<i64> {
        self.requirement("Level")
    }

    pub fn item_level(&self) -> Option<u32> {
        self.item_level
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sockets(groups: &[u8]) -> Vec<Socket> {
        groups
            .iter()
            .map(|&group| Socket {
                group,
                colour: SocketColour::Red,
            })
            .collect()
    }

    fn item() -> Item {
        Item::new("id-1", "Doom Visor", ItemLocation::stash(0, "t", "Tab"))
    }

    #[test]
    fn links_are_largest_group() {
        let item = item().with_sockets(sockets(&[0, 0, 1, 1, 1, 2]));
        assert_eq!(item.sockets_count(), 6);
        assert_eq!(item.links_count(), 3);
        assert_eq!(self::item().links_count(), 0);
    }

    #[test]
    fn numeric_readings() {
        assert_eq!(PropertyValue::Text("+20%".into()).numeric(), Some(20.0));
        assert_eq!(PropertyValue::Text("10-20".into()).numeric(), Some(15.0));
        assert_eq!(PropertyValue::Text("-5".into()).numeric(), Some(-5.0));
        assert_eq!(PropertyValue::Text("Fire".into()).numeric(), None);
        assert_eq!(PropertyValue::Range { min: 4.0, max: 8.0 }.numeric(), Some(6.0));
    }

    #[test]
    fn mod_table_is_cached_and_complete() {
        let item = item()
            .with_mod(ItemMod::new("fire_resist", 30.0))
            .with_mod(ItemMod::new("cold_resist", 12.0));
        let first = item.mod_table() as *const ModTable;
        assert_eq!(item.mod_table()["total_elemental_resist"], 42.0);
        assert_eq!(first, item.mod_table() as *const ModTable);
    }

    #[test]
    fn pretty_name_joins_parts() {
        assert_eq!(
            item().with_type_line("Hubris Circlet").pretty_name(),
            "Doom Visor Hubris Circlet"
        );
        assert_eq!(item().pretty_name(), "Doom Visor");
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "id": "abc",
            "name": "Chaos Orb",
            "location": { "kind": "stash", "tab_index": 1, "unique_id": "c1", "label": "Currency" },
            "properties": { "Stack Size": { "text": "12/20" } },
            "sockets": [ { "group": 0, "colour": "R" } ]
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.location().header(), "#2, Currency");
        assert_eq!(item.sockets_count(), 1);
        assert!(item.item_level().is_none());
    }
}
