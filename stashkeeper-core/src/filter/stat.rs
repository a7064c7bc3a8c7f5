use super::{FilterConfigError, FilterValue, ItemFilter};
use crate::item::Item;

/// Passes when the item's aggregated total for a stat reaches a threshold.
///
/// Totals come from [`Item::mod_table`], so pseudo stats such as
/// `total_elemental_resist` can be filtered on too. An item with no mod for
/// the stat fails, whatever the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredStatFilter {
    stat: String,
    min: Option<f64>,
}

impl RequiredStatFilter {
    pub fn new(stat: impl Into<String>, min: f64) -> Self {
        Self::with_threshold(stat, Some(min))
    }

    /// A filter whose threshold may still be unset; it matches nothing until
    /// one is given.
    pub fn with_threshold(stat: impl Into<String>, min: Option<f64>) -> Self {
        Self {
            stat: stat.into(),
            min,
        }
    }

    pub fn stat(&self) -> &str {
        &self.stat
    }

    pub fn threshold(&self) -> Option<f64> {
        self.min
    }
}

impl ItemFilter for RequiredStatFilter {
    fn name(&self) -> &str {
        &self.stat
    }

    fn matches(&self, item: &Item) -> bool {
        if self.config_error().is_some() {
            return false;
        }
        let Some(min) = self.min else {
            return false;
        };
        item.mod_table()
            .get(&self.stat)
            .is_some_and(|total| *total >= min)
    }

    fn value(&self) -> FilterValue {
        FilterValue::Threshold { min: self.min }
    }

    fn reconfigure(&mut self, value: FilterValue) -> Result<(), FilterConfigError> {
        match value {
            FilterValue::Threshold { min } => self.min = min,
            other => {
                self.min = None;
                return Err(FilterConfigError::wrong_kind("threshold", &other));
            }
        }
        match self.config_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn config_error(&self) -> Option<FilterConfigError> {
        if self.stat.trim().is_empty() {
            return Some(FilterConfigError::MissingField("stat"));
        }
        match self.min {
            None => Some(FilterConfigError::MissingField("min")),
            Some(min) if !min.is_finite() => Some(FilterConfigError::InvalidBound(min)),
            Some(_) => None,
        }
    }
}
