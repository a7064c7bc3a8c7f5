//! Numeric-range filters.
//!
//! Every variant here reads one number from the item and checks it against
//! an inclusive window through [`Bounds::contains`]. They differ only in
//! where the number comes from and in what happens when it is absent.

use serde::{Deserialize, Serialize};

use super::{FilterConfigError, FilterValue, ItemFilter};
use crate::item::Item;

/// An inclusive `[min, max]` window. An unset side is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self, FilterConfigError> {
        for bound in [min, max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(FilterConfigError::InvalidBound(bound));
            }
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(FilterConfigError::InvertedBounds { min: lo, max: hi });
            }
        }
        Ok(Self { min, max })
    }

    /// Shared numeric check. An absent value never passes.
    pub fn contains(&self, value: Option<f64>) -> bool {
        let Some(value) = value else {
            return false;
        };
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Range configuration as entered, with its validation outcome.
///
/// A rejected configuration is kept so it can be shown back to the user,
/// but the filter fails every item until it is corrected.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSetting {
    min: Option<f64>,
    max: Option<f64>,
    checked: Result<Bounds, FilterConfigError>,
}

impl RangeSetting {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min,
            max,
            checked: Bounds::new(min, max),
        }
    }

    pub fn contains(&self, value: Option<f64>) -> bool {
        match &self.checked {
            Ok(bounds) => bounds.contains(value),
            Err(_) => false,
        }
    }

    pub fn error(&self) -> Option<&FilterConfigError> {
        self.checked.as_ref().err()
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    fn value(&self) -> FilterValue {
        FilterValue::Range {
            min: self.min,
            max: self.max,
        }
    }

    fn reconfigure(&mut self, value: FilterValue) -> Result<(), FilterConfigError> {
        match value {
            FilterValue::Range { min, max } => *self = RangeSetting::new(min, max),
            other => self.checked = Err(FilterConfigError::wrong_kind("range", &other)),
        }
        match &self.checked {
            Ok(_) => Ok(()),
            Err(e) => Err(e.clone()),
        }
    }
}

impl From<Bounds> for RangeSetting {
    fn from(bounds: Bounds) -> Self {
        Self::new(bounds.min, bounds.max)
    }
}

/// Passes when a numeric property lies inside the window. Items without the
/// property fail.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxFilter {
    property: String,
    range: RangeSetting,
    missing_property: bool,
}

impl MinMaxFilter {
    pub fn new(property: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        let property = property.into();
        Self {
            missing_property: property.trim().is_empty(),
            property,
            range: RangeSetting::new(min, max),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn range(&self) -> &RangeSetting {
        &self.range
    }
}

impl ItemFilter for MinMaxFilter {
    fn name(&self) -> &str {
        &self.property
    }

    fn matches(&self, item: &Item) -> bool {
        !self.missing_property && self.range.contains(item.numeric_property(&self.property))
    }

    fn value(&self) -> FilterValue {
        self.range.value()
    }

    fn reconfigure(&mut self, value: FilterValue) -> Result<(), FilterConfigError> {
        self.range.reconfigure(value)
    }

    fn config_error(&self) -> Option<FilterConfigError> {
        if self.missing_property {
            return Some(FilterConfigError::MissingField("property"));
        }
        self.range.error().cloned()
    }
}

/// Like [`MinMaxFilter`], but an item without the property is checked as if
/// it had `default`, so it is not excluded outright.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultPropertyFilter {
    property: String,
    range: RangeSetting,
    default: f64,
}

impl DefaultPropertyFilter {
    pub fn new(
        property: impl Into<String>,
        min: Option<f64>,
        max: Option<f64>,
        default: f64,
    ) -> Self {
        Self {
            property: property.into(),
            range: RangeSetting::new(min, max),
            default,
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }
}

impl ItemFilter for DefaultPropertyFilter {
    fn name(&self) -> &str {
        &self.property
    }

    fn matches(&self, item: &Item) -> bool {
        if self.property.trim().is_empty() || !self.default.is_finite() {
            return false;
        }
        // Present but unreadable is not the same as absent.
        let value = match item.property(&self.property) {
            Some(value) => value.numeric(),
            None => Some(self.default),
        };
        self.range.contains(value)
    }

    fn value(&self) -> FilterValue {
        FilterValue::RangeWithDefault {
            min: self.range.min(),
            max: self.range.max(),
            default: self.default,
        }
    }

    fn reconfigure(&mut self, value: FilterValue) -> Result<(), FilterConfigError> {
        match value {
            FilterValue::RangeWithDefault { min, max, default } => {
                self.default = default;
                self.range.reconfigure(FilterValue::Range { min, max })?;
                match self.config_error() {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            }
            other => self.range.reconfigure(other),
        }
    }

    fn config_error(&self) -> Option<FilterConfigError> {
        if self.property.trim().is_empty() {
            return Some(FilterConfigError::MissingField("property"));
        }
        if !self.default.is_finite() {
            return Some(FilterConfigError::InvalidBound(self.default));
        }
        self.range.error().cloned()
    }
}

/// Passes when the total socket count is inside the window.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketsFilter {
    range: RangeSetting,
}

impl SocketsFilter {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            range: RangeSetting::new(min, max),
        }
    }
}

impl ItemFilter for SocketsFilter {
    fn name(&self) -> &str {
        "sockets"
    }

    fn matches(&self, item: &Item) -> bool {
        self.range.contains(Some(item.sockets_count() as f64))
    }

    fn value(&self) -> FilterValue {
        self.range.value()
    }

    fn reconfigure(&mut self, value: FilterValue) -> Result<(), FilterConfigError> {
        self.range.reconfigure(value)
    }

    fn config_error(&self) -> Option<FilterConfigError> {
        self.range.error().cloned()
    }
}

/// Passes when the largest linked socket group is inside the window.
#[derive(Debug, Clone, PartialEq)]
pub struct LinksFilter {
    range: RangeSetting,
}

impl LinksFilter {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            range: RangeSetting::new(min, max),
        }
    }
}

impl ItemFilter for LinksFilter {
    fn name(&self) -> &str {
        "links"
    }

    fn matches(&self, item: &Item) -> bool {
        self.range.contains(Some(item.links_count() as f64))
    }

    fn value(&self) -> FilterValue {
        self.range.value()
    }

    fn reconfigure(&mut self, value: FilterValue) -> Result<(), FilterConfigError> {
        self.range.reconfigure(value)
    }

    fn config_error(&self) -> Option<FilterConfigError> {
        self.range.error().cloned()
    }
}

/// Which level an [`ItemLevelFilter`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    /// Character level needed to equip the item.
    #[default]
    Required,
    /// The level the item dropped at.
    Item,
}

/// Range filter over a level. Items without that level fail.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemLevelFilter {
    source: LevelSource,
    range: RangeSetting,
}

impl ItemLevelFilter {
    /// Filters on the required character level.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self::with_source(LevelSource::Required, min, max)
    }

    /// Filters on the item's own level.
    pub fn item_level(min: Option<f64>, max: Option<f64>) -> Self {
        Self::with_source(LevelSource::Item, min, max)
    }

    pub fn with_source(source: LevelSource, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            source,
            range: RangeSetting::new(min, max),
        }
    }

    pub fn source(&self) -> LevelSource {
        self.source
    }
}

impl ItemFilter for ItemLevelFilter {
    fn name(&self) -> &str {
        match self.source {
            LevelSource::Required => "required_level",
            LevelSource::Item => "item_level",
        }
    }

    fn matches(&self, item: &Item) -> bool {
        let level = match self.source {
            LevelSource::Required => item.required_level().map(|l| l as f64),
            LevelSource::Item => item.item_level().map(f64::from),
        };
        self.range.contains(level)
    }

    fn value(&self) -> FilterValue {
        self.range.value()
    }

    fn reconfigure(&mut self, value: FilterValue) -> Result<(), FilterConfigError> {
        self.range.reconfigure(value)
    }

    fn config_error(&self) -> Option<FilterConfigError> {
        self.range.error().cloned()
    }
}
