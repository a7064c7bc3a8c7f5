//! Text and category filters, sharing [`matches_any`].

use std::collections::BTreeSet;

use super::{FilterConfigError, FilterValue, ItemFilter};
use crate::item::Item;

/// Shared text check: `actual` equals one of `candidates`. Absent text never
/// passes.
pub fn matches_any<'a, I>(actual: Option<&str>, candidates: I, fold_case: bool) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let Some(actual) = actual.map(str::trim).filter(|a| !a.is_empty()) else {
        return false;
    };
    candidates.into_iter().any(|candidate| {
        if fold_case {
            candidate.eq_ignore_ascii_case(actual)
        } else {
            candidate == actual
        }
    })
}

/// Exact match of a property's text. Items without the property fail.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplePropertyFilter {
    property: String,
    expected: String,
    error: Option<FilterConfigError>,
}

impl SimplePropertyFilter {
    pub fn new(property: impl Into<String>, expected: impl Into<String>) -> Self {
        let mut filter = Self {
            property: property.into(),
            expected: String::new(),
            error: None,
        };
        let _ = filter.reconfigure(FilterValue::Text {
            value: expected.into(),
        });
        filter
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }
}

impl ItemFilter for SimplePropertyFilter {
    fn name(&self) -> &str {
        &self.property
    }

    fn matches(&self, item: &Item) -> bool {
        if self.error.is_some() {
            return false;
        }
        let actual = item.property(&self.property).map(|p| p.text());
        matches_any(actual.as_deref(), [self.expected.as_str()], false)
    }

    fn value(&self) -> FilterValue {
        FilterValue::Text {
            value: self.expected.clone(),
        }
    }

    fn reconfigure(&mut self, value: FilterValue) -> Result<(), FilterConfigError> {
        let result = match value {
            FilterValue::Text { value } => {
                self.expected = value.trim().to_string();
                if self.property.trim().is_empty() {
                    Err(FilterConfigError::MissingField("property"))
                } else if self.expected.is_empty() {
                    Err(FilterConfigError::MissingField("value"))
                } else {
                    Ok(())
                }
            }
            other => Err(FilterConfigError::wrong_kind("text", &other)),
        };
        self.error = result.as_ref().err().cloned();
        result
    }

    fn config_error(&self) -> Option<FilterConfigError> {
        self.error.clone()
    }
}

/// Passes when the item's category is in the allow-set (case-insensitive).
/// Items without a category fail.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFilter {
    allowed: BTreeSet<String>,
    error: Option<FilterConfigError>,
}

impl CategoryFilter {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self {
            allowed: BTreeSet::new(),
            error: None,
        };
        let _ = filter.reconfigure(FilterValue::Categories {
            allowed: allowed.into_iter().map(Into::into).collect(),
        });
        filter
    }

    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allowed
    }
}

impl ItemFilter for CategoryFilter {
    fn name(&self) -> &str {
        "category"
    }

    fn matches(&self, item: &Item) -> bool {
        self.error.is_none()
            && matches_any(
                Some(item.category()),
                self.allowed.iter().map(String::as_str),
                true,
            )
    }

    fn value(&self) -> FilterValue {
        FilterValue::Categories {
            allowed: self.allowed.iter().cloned().collect(),
        }
    }

    fn reconfigure(&mut self, value: FilterValue) -> Result<(), FilterConfigError> {
        let result = match value {
            FilterValue::Categories { allowed } => {
                self.allowed = allowed
                    .iter()
                    .map(|c| c.trim().to_lowercase())
                    .filter(|c| !c.is_empty())
                    .collect();
                if self.allowed.is_empty() {
                    Err(FilterConfigError::EmptyAllowSet)
                } else {
                    Ok(())
                }
            }
            other => Err(FilterConfigError::wrong_kind("categories", &other)),
        };
        self.error = result.as_ref().err().cloned();
        result
    }

    fn config_error(&self) -> Option<FilterConfigError> {
        self.error.clone()
    }
}
