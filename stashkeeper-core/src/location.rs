use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Which kind of container holds an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Stash,
    Character,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationKind::Stash => write!(f, "stash"),
            LocationKind::Character => write!(f, "character"),
        }
    }
}

/// Position and size of an item inside its container, in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Identifies a storage container (stash tab or character) and, optionally,
/// a slot inside it.
///
/// Equality, hashing and ordering use the container identity plus the slot.
/// The display label is excluded, so a renamed tab is still the same
/// location; anything keyed by the old label has to be rebuilt by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemLocation {
    kind: LocationKind,
    /// Zero-based stash index. Unused for characters.
    #[serde(default)]
    tab_index: u32,
    /// Tab id assigned by the game for stashes, character name otherwise.
    unique_id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    tab_type: String,
    #[serde(default)]
    inventory_id: Option<String>,
    #[serde(default)]
    colour: Option<(u8, u8, u8)>,
    #[serde(default)]
    rect: Option<Rect>,
    #[serde(default)]
    socketed: bool,
}

impl ItemLocation {
    /// A stash tab, identified by the game's tab id.
    pub fn stash(tab_index: u32, unique_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: LocationKind::Stash,
            tab_index,
            unique_id: unique_id.into(),
            label: label.into(),
            tab_type: String::new(),
            inventory_id: None,
            colour: None,
            rect: None,
            socketed: false,
        }
    }

    /// A character's inventory.
    pub fn character(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: LocationKind::Character,
            tab_index: 0,
            label: name.clone(),
            unique_id: name,
            tab_type: String::new(),
            inventory_id: None,
            colour: None,
            rect: None,
            socketed: false,
        }
    }

    /// Places the location at a slot inside the container.
    pub fn at(mut self, x: u32, y: u32, w: u32, h: u32) -> Self {
        self.rect = Some(Rect { x, y, w, h });
        self
    }

    pub fn with_tab_type(mut self, tab_type: impl Into<String>) -> Self {
        self.tab_type = tab_type.into();
        self
    }

    pub fn with_inventory(mut self, inventory_id: impl Into<String>) -> Self {
        self.inventory_id = Some(inventory_id.into());
        self
    }

    pub fn with_colour(mut self, r: u8, g: u8, b: u8) -> Self {
        self.colour = Some((r, g, b));
        self
    }

    pub fn socketed(mut self, socketed: bool) -> Self {
        self.socketed = socketed;
        self
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    pub fn tab_index(&self) -> u32 {
        self.tab_index
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Renames the container. Identity is unaffected.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn tab_type(&self) -> &str {
        &self.tab_type
    }

    pub fn colour(&self) -> Option<(u8, u8, u8)> {
        self.colour
    }

    pub fn is_socketed(&self) -> bool {
        self.socketed
    }

    /// Bounding rectangle of the slot, if this location carries coordinates.
    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    /// The container itself, without slot coordinates.
    pub fn container(&self) -> Self {
        Self {
            rect: None,
            socketed: false,
            ..self.clone()
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.unique_id.is_empty()
    }

    /// Stable digest of the container identity, used for persistence keys.
    ///
    /// Independent of the label and of slot coordinates.
    pub fn unique_hash(&self) -> String {
        let identity = format!("{}:{}", self.kind, self.unique_id);
        blake3::hash(identity.as_bytes()).to_hex().to_string()
    }

    /// Header shown above a group of items from this container.
    pub fn header(&self) -> String {
        match self.kind {
            LocationKind::Stash => format!("#{}, {}", self.tab_index + 1, self.label),
            LocationKind::Character => self.unique_id.clone(),
        }
    }

    /// Forum `[linkItem]` reference to the slot.
    pub fn forum_code(&self, realm: &str, league: &str, stash_index: u32) -> String {
        let (x, y) = self.rect.map(|r| (r.x, r.y)).unwrap_or((0, 0));
        match self.kind {
            LocationKind::Stash => format!(
                "[linkItem location=\"Stash{}\" league=\"{}\" x=\"{}\" y=\"{}\" realm=\"{}\"]",
                stash_index + 1,
                league,
                x,
                y,
                realm
            ),
            LocationKind::Character => format!(
                "[linkItem location=\"{}\" character=\"{}\" x=\"{}\" y=\"{}\" realm=\"{}\"]",
                self.inventory_id.as_deref().unwrap_or("MainInventory"),
                self.unique_id,
                x,
                y,
                realm
            ),
        }
    }
}

impl PartialEq for ItemLocation {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.unique_id == other.unique_id && self.rect == other.rect
    }
}

impl Eq for ItemLocation {}

impl Hash for ItemLocation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.unique_id.hash(state);
        self.rect.hash(state);
    }
}

impl PartialOrd for ItemLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ItemLocation {
    /// Same fields as equality: kind, container id, then slot.
    fn cmp(&self, other: &Self) -> Ordering {
        let slot = |r: Option<Rect>| r.map(|r| (r.y, r.x, r.w, r.h));
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.unique_id.cmp(&other.unique_id))
            .then_with(|| slot(self.rect).cmp(&slot(other.rect)))
    }
}

impl fmt::Display for ItemLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header())
    }
}
