//! Mod aggregation.
//!
//! A [`ModGenerator`] folds an item's raw mod list into per-stat totals.
//! Aggregation is pure and order-independent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An affix on an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMod {
    /// Stat id, e.g. `fire_resist`.
    pub stat: String,
    /// Numeric contribution, if the mod has one.
    #[serde(default)]
    pub magnitude: Option<f64>,
    /// Display text as shown in game.
    #[serde(default)]
    pub text: String,
}

impl ItemMod {
    pub fn new(stat: impl Into<String>, magnitude: f64) -> Self {
        Self {
            stat: stat.into(),
            magnitude: Some(magnitude),
            text: String::new(),
        }
    }

    /// A mod with no numeric part.
    pub fn flag(stat: impl Into<String>) -> Self {
        Self {
            stat: stat.into(),
            magnitude: None,
            text: String::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// Stat id to aggregated total. Ordered so summaries are deterministic.
pub type ModTable = BTreeMap<String, f64>;

/// Aggregation strategy over an item's mods.
pub trait ModGenerator: Send + Sync {
    /// Folds `mods` into per-stat totals.
    fn aggregate(&self, mods: &[ItemMod]) -> ModTable;

    /// One line per logical stat group, in stat order.
    fn summarize(&self, mods: &[ItemMod]) -> Vec<String> {
        self.aggregate(mods)
            .into_iter()
            .map(|(stat, total)| format!("{}: {}", stat, format_total(total)))
            .collect()
    }
}

fn format_total(total: f64) -> String {
    if total.fract() == 0.0 {
        format!("{}", total as i64)
    } else {
        format!("{:.2}", total)
    }
}

/// Sums magnitudes of mods sharing a stat id.
///
/// Without a target, every stat gets its own total. With
/// [`SumModGenerator::pseudo`] the listed stats are summed into one named
/// pseudo stat instead.
#[derive(Debug, Clone, Default)]
pub struct SumModGenerator {
    target: Option<(String, Vec<String>)>,
}

impl SumModGenerator {
    /// Per-stat totals over every mod.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single pseudo stat `name` totalling all mods whose stat is in `stats`.
    pub fn pseudo<I, S>(name: impl Into<String>, stats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: Some((name.into(), stats.into_iter().map(Into::into).collect())),
        }
    }
}

impl ModGenerator for SumModGenerator {
    fn aggregate(&self, mods: &[ItemMod]) -> ModTable {
        let mut table = ModTable::new();
        match &self.target {
            None => {
                for m in mods {
                    // Flag mods still register the stat, contributing nothing.
                    *table.entry(m.stat.clone()).or_insert(0.0) += m.magnitude.unwrap_or(0.0);
                }
            }
            Some((name, stats)) => {
                let matching: Vec<&ItemMod> =
                    mods.iter().filter(|m| stats.contains(&m.stat)).collect();
                if !matching.is_empty() {
                    let total: f64 = matching.iter().filter_map(|m| m.magnitude).sum();
                    table.insert(name.clone(), total);
                }
            }
        }
        table
    }
}

/// The generators applied to every item: per-stat sums plus the pseudo
/// totals used for trading searches.
pub fn standard_generators() -> Vec<Box<dyn ModGenerator>> {
    vec![
        Box::new(SumModGenerator::new()) as Box<dyn ModGenerator>,
        Box::new(SumModGenerator::pseudo(
            "total_elemental_resist",
            ["fire_resist", "cold_resist", "lightning_resist"],
        )),
        Box::new(SumModGenerator::pseudo(
            "total_resist",
            ["fire_resist", "cold_resist", "lightning_resist", "chaos_resist"],
        )),
        Box::new(SumModGenerator::pseudo(
            "total_attributes",
            ["strength", "dexterity", "intelligence"],
        )),
    ]
}

/// Runs each generator and merges the results. Later generators win on a
/// shared stat id.
pub fn aggregate_all(generators: &[Box<dyn ModGenerator>], mods: &[ItemMod]) -> ModTable {
    let mut table = ModTable::new();
    for generator in generators {
        table.extend(generator.aggregate(mods));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resist_mods() -> Vec<ItemMod> {
        vec![
            ItemMod::new("fire_resist", 10.0),
            ItemMod::new("fire_resist", 15.0),
            ItemMod::new("cold_resist", 5.0),
        ]
    }

    #[test]
    fn sums_per_stat() {
        let table = SumModGenerator::new().aggregate(&resist_mods());
        assert_eq!(table.len(), 2);
        assert_eq!(table["fire_resist"], 25.0);
        assert_eq!(table["cold_resist"], 5.0);
    }

    #[test]
    fn order_does_not_matter() {
        let mut mods = resist_mods();
        let forward = SumModGenerator::new().aggregate(&mods);
        mods.reverse();
        assert_eq!(forward, SumModGenerator::new().aggregate(&mods));
    }

    #[test]
    fn pseudo_stat_totals_listed_stats() {
        let mut mods = resist_mods();
        mods.push(ItemMod::new("life", 70.0));
        let generator =
            SumModGenerator::pseudo("total_elemental_resist", ["fire_resist", "cold_resist"]);

        let table = generator.aggregate(&mods);
        assert_eq!(table.len(), 1);
        assert_eq!(table["total_elemental_resist"], 30.0);

        assert!(generator.aggregate(&[ItemMod::new("life", 1.0)]).is_empty());
    }

    #[test]
    fn flag_mods_register_with_zero() {
        let table = SumModGenerator::new().aggregate(&[ItemMod::flag("corrupted_blood_immune")]);
        assert_eq!(table["corrupted_blood_immune"], 0.0);
    }

    #[test]
    fn summary_lines() {
        let lines = SumModGenerator::new().summarize(&[
            ItemMod::new("fire_resist", 12.0),
            ItemMod::new("attack_speed", 7.5),
        ]);
        assert_eq!(lines, vec!["attack_speed: 7.50", "fire_resist: 12"]);
    }

    #[test]
    fn standard_generators_merge() {
        let table = aggregate_all(&standard_generators(), &resist_mods());
        assert_eq!(table["fire_resist"], 25.0);
        assert_eq!(table["total_elemental_resist"], 30.0);
        assert_eq!(table["total_resist"], 30.0);
        assert!(!table.contains_key("total_attributes"));
    }
}
