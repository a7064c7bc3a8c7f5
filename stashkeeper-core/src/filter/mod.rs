//! Item filters.
//!
//! Every filter kind is a sibling implementing [`ItemFilter`]. [`Filter`] is
//! the tagged union a search holds, and [`FilterConfig`] is its serializable
//! description for saved searches.
//!
//! Evaluation is pure and never fails: a filter whose configuration was
//! rejected simply matches nothing until it is reconfigured.

mod range;
mod stat;
mod text;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use range::{
    Bounds, DefaultPropertyFilter, ItemLevelFilter, LevelSource, LinksFilter, MinMaxFilter,
    RangeSetting, SocketsFilter,
};
pub use stat::RequiredStatFilter;
pub use text::{CategoryFilter, SimplePropertyFilter, matches_any};

use crate::item::Item;

/// A filter configuration that cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterConfigError {
    #[error("minimum {min} is greater than maximum {max}")]
    InvertedBounds { min: f64, max: f64 },
    #[error("bound {0} is not a finite number")]
    InvalidBound(f64),
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),
    #[error("category filter needs at least one category")]
    EmptyAllowSet,
    #[error("expected a {expected} value, got {found}")]
    WrongValueKind {
        expected: &'static str,
        found: &'static str,
    },
}

impl FilterConfigError {
    fn wrong_kind(expected: &'static str, found: &FilterValue) -> Self {
        FilterConfigError::WrongValueKind {
            expected,
            found: found.kind(),
        }
    }
}

/// The user-settable part of a filter, as shown in and read back from a UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterValue {
    Range {
        min: Option<f64>,
        max: Option<f64>,
    },
    RangeWithDefault {
        min: Option<f64>,
        max: Option<f64>,
        default: f64,
    },
    Text {
        value: String,
    },
    Threshold {
        min: Option<f64>,
    },
    Categories {
        allowed: Vec<String>,
    },
}

impl FilterValue {
    fn kind(&self) -> &'static str {
        match self {
            FilterValue::Range { .. } => "range",
            FilterValue::RangeWithDefault { .. } => "range with default",
            FilterValue::Text { .. } => "text",
            FilterValue::Threshold { .. } => "threshold",
            FilterValue::Categories { .. } => "categories",
        }
    }
}

/// Evaluation contract shared by every filter kind.
pub trait ItemFilter {
    /// The attribute the filter reads, e.g. a property name or `sockets`.
    fn name(&self) -> &str;

    /// Whether `item` passes. Pure; never panics.
    fn matches(&self, item: &Item) -> bool;

    /// Current configuration.
    fn value(&self) -> FilterValue;

    /// Replaces the configuration. A rejected value leaves the filter
    /// matching nothing until a valid one is applied.
    fn reconfigure(&mut self, value: FilterValue) -> Result<(), FilterConfigError>;

    /// Why the current configuration is rejected, if it is.
    fn config_error(&self) -> Option<FilterConfigError>;
}

/// One active filter of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    MinMax(MinMaxFilter),
    SimpleProperty(SimplePropertyFilter),
    DefaultProperty(DefaultPropertyFilter),
    RequiredStat(RequiredStatFilter),
    Category(CategoryFilter),
    Sockets(SocketsFilter),
    Links(LinksFilter),
    ItemLevel(ItemLevelFilter),
}

macro_rules! dispatch {
    ($self:expr, $f:ident => $body:expr) => {
        match $self {
            Filter::MinMax($f) => $body,
            Filter::SimpleProperty($f) => $body,
            Filter::DefaultProperty($f) => $body,
            Filter::RequiredStat($f) => $body,
            Filter::Category($f) => $body,
            Filter::Sockets($f) => $body,
            Filter::Links($f) => $body,
            Filter::ItemLevel($f) => $body,
        }
    };
}

impl ItemFilter for Filter {
    fn name(&self) -> &str {
        dispatch!(self, f => f.name())
    }

    fn matches(&self, item: &Item) -> bool {
        dispatch!(self, f => f.matches(item))
    }

    fn value(&self) -> FilterValue {
        dispatch!(self, f => f.value())
    }

    fn reconfigure(&mut self, value: FilterValue) -> Result<(), FilterConfigError> {
        dispatch!(self, f => f.reconfigure(value))
    }

    fn config_error(&self) -> Option<FilterConfigError> {
        dispatch!(self, f => f.config_error())
    }
}

/// Complete, serializable description of a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterConfig {
    MinMax {
        property: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    SimpleProperty {
        property: String,
        value: String,
    },
    DefaultProperty {
        property: String,
        min: Option<f64>,
        max: Option<f64>,
        default: f64,
    },
    RequiredStat {
        stat: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
    },
    Category {
        allowed: Vec<String>,
    },
    Sockets {
        min: Option<f64>,
        max: Option<f64>,
    },
    Links {
        min: Option<f64>,
        max: Option<f64>,
    },
    ItemLevel {
        #[serde(default)]
        source: LevelSource,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl Filter {
    /// Builds a filter, keeping a rejected configuration in place (the filter
    /// then matches nothing). Use [`Filter::from_config`] to reject instead.
    pub fn build(config: FilterConfig) -> Self {
        match config {
            FilterConfig::MinMax { property, min, max } => {
                Filter::MinMax(MinMaxFilter::new(property, min, max))
            }
            FilterConfig::SimpleProperty { property, value } => {
                Filter::SimpleProperty(SimplePropertyFilter::new(property, value))
            }
            FilterConfig::DefaultProperty {
                property,
                min,
                max,
                default,
            } => Filter::DefaultProperty(DefaultPropertyFilter::new(property, min, max, default)),
            FilterConfig::RequiredStat { stat, min } => {
                Filter::RequiredStat(RequiredStatFilter::with_threshold(stat, min))
            }
            FilterConfig::Category { allowed } => Filter::Category(CategoryFilter::new(allowed)),
            FilterConfig::Sockets { min, max } => Filter::Sockets(SocketsFilter::new(min, max)),
            FilterConfig::Links { min, max } => Filter::Links(LinksFilter::new(min, max)),
            FilterConfig::ItemLevel { source, min, max } => {
                Filter::ItemLevel(ItemLevelFilter::with_source(source, min, max))
            }
        }
    }

    /// Builds a filter, rejecting a malformed configuration.
    pub fn from_config(config: FilterConfig) -> Result<Self, FilterConfigError> {
        let filter = Self::build(config);
        match filter.config_error() {
            Some(e) => Err(e),
            None => Ok(filter),
        }
    }

    /// Describes this filter so it can be stored and rebuilt.
    pub fn config(&self) -> FilterConfig {
        let range = |value: FilterValue| match value {
            FilterValue::Range { min, max } => (min, max),
            _ => (None, None),
        };
        match self {
            Filter::MinMax(f) => {
                let (min, max) = range(f.value());
                FilterConfig::MinMax {
                    property: f.property().to_string(),
                    min,
                    max,
                }
            }
            Filter::SimpleProperty(f) => FilterConfig::SimpleProperty {
                property: f.property().to_string(),
                value: f.expected().to_string(),
            },
            Filter::DefaultProperty(f) => match f.value() {
                FilterValue::RangeWithDefault { min, max, default } => {
                    FilterConfig::DefaultProperty {
                        property: f.property().to_string(),
                        min,
                        max,
                        default,
                    }
                }
                _ => FilterConfig::DefaultProperty {
                    property: f.property().to_string(),
                    min: None,
                    max: None,
                    default: f.default_value(),
                },
            },
            Filter::RequiredStat(f) => FilterConfig::RequiredStat {
                stat: f.stat().to_string(),
                min: f.threshold().filter(|min| min.is_finite()),
            },
            Filter::Category(f) => FilterConfig::Category {
                allowed: f.allowed().iter().cloned().collect(),
            },
            Filter::Sockets(f) => {
                let (min, max) = range(f.value());
                FilterConfig::Sockets { min, max }
            }
            Filter::Links(f) => {
                let (min, max) = range(f.value());
                FilterConfig::Links { min, max }
            }
            Filter::ItemLevel(f) => {
                let (min, max) = range(f.value());
                FilterConfig::ItemLevel {
                    source: f.source(),
                    min,
                    max,
                }
            }
        }
    }
}

impl From<MinMaxFilter> for Filter {
    fn from(f: MinMaxFilter) -> Self {
        Filter::MinMax(f)
    }
}

impl From<SimplePropertyFilter> for Filter {
    fn from(f: SimplePropertyFilter) -> Self {
        Filter::SimpleProperty(f)
    }
}

impl From<DefaultPropertyFilter> for Filter {
    fn from(f: DefaultPropertyFilter) -> Self {
        Filter::DefaultProperty(f)
    }
}

impl From<RequiredStatFilter> for Filter {
    fn from(f: RequiredStatFilter) -> Self {
        Filter::RequiredStat(f)
    }
}

impl From<CategoryFilter> for Filter {
    fn from(f: CategoryFilter) -> Self {
        Filter::Category(f)
    }
}

impl From<SocketsFilter> for Filter {
    fn from(f: SocketsFilter) -> Self {
        Filter::Sockets(f)
    }
}

impl From<LinksFilter> for Filter {
    fn from(f: LinksFilter) -> Self {
        Filter::Links(f)
    }
}

impl From<ItemLevelFilter> for Filter {
    fn from(f: ItemLevelFilter) -> Self {
        Filter::ItemLevel(f)
    }
}
