//! Configuration grid enumeration.
//!
//! The grid is produced lazily in a fixed order, ascending PV then ascending
//! battery, so that first-encountered tie-breaks are reproducible.

use serde::{Deserialize, Serialize};

use crate::types::SystemConfiguration;

/// Inclusive numeric range `[min, max]` walked in `step` increments.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RangeSpec {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl RangeSpec {
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    /// A single value.
    pub fn fixed(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            step: 1.0,
        }
    }

    /// Whether the range yields at least one value.
    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.step.is_finite()
            && self.step > 0.0
            && self.min <= self.max
    }

    /// Number of values: `round((max - min) / step) + 1`, or 0 when malformed.
    pub fn len(&self) -> usize {
        if !self.is_well_formed() {
            return 0;
        }
        ((self.max - self.min) / self.step).round() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values `min + i * step`, each rounded to 0.01.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |i| round_centi(self.min + self.step * i as f64))
    }
}

fn round_centi(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Source of battery capacities for the grid.
#[derive(Debug, Clone, PartialEq)]
pub enum BatteryAxis {
    /// Evenly stepped capacities.
    Stepped(RangeSpec),
    /// Discrete product sizes, e.g. from the reference catalog.
    Catalog(Vec<f64>),
}

impl BatteryAxis {
    /// Non-negative capacities in ascending order, without duplicates.
    pub fn values(&self) -> Vec<f64> {
        let mut values: Vec<f64> = match self {
            Self::Stepped(range) => range.values().collect(),
            Self::Catalog(sizes) => sizes.clone(),
        };
        values.retain(|v| v.is_finite() && *v >= 0.0);
        values.sort_by(f64::total_cmp);
        values.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        values
    }
}

/// Which dimensions of the grid are searched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchMode {
    /// PV range only; no storage.
    PvOnly,
    /// PV range crossed with the battery axis.
    PvAndBattery,
    /// PV fixed at an existing installation; only storage is added.
    BatteryRetrofit { existing_pv_kw: f64 },
}

impl SearchMode {
    pub fn has_existing_pv(&self) -> bool {
        matches!(self, Self::BatteryRetrofit { existing_pv_kw } if *existing_pv_kw > 0.0)
    }

    pub fn includes_battery(&self) -> bool {
        !matches!(self, Self::PvOnly)
    }
}

/// A bare battery is never offered to a household without PV.
pub fn is_feasible(config: &SystemConfiguration, has_existing_pv: bool) -> bool {
    !(config.pv_kw <= 0.0 && config.has_battery()) || has_existing_pv
}

/// The enumerated search space.
///
/// # Examples
///
/// ```
/// use solar_quote::optimizer::grid::{BatteryAxis, Grid, RangeSpec, SearchMode};
///
/// let grid = Grid::new(
///     RangeSpec::new(1.0, 2.0, 0.5),
///     BatteryAxis::Catalog(vec![0.0, 5.0]),
///     SearchMode::PvAndBattery,
/// );
/// let keys: Vec<String> = grid.configurations().map(|c| c.key().to_string()).collect();
/// assert_eq!(keys, ["1.00|0.0", "1.00|5.0", "1.50|0.0", "1.50|5.0", "2.00|0.0", "2.00|5.0"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pv: RangeSpec,
    battery: BatteryAxis,
    mode: SearchMode,
}

impl Grid {
    pub fn new(pv: RangeSpec, battery: BatteryAxis, mode: SearchMode) -> Self {
        Self { pv, battery, mode }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    fn pv_values(&self) -> Vec<f64> {
        match self.mode {
            SearchMode::BatteryRetrofit { existing_pv_kw } => vec![round_centi(existing_pv_kw)],
            _ => self.pv.values().collect(),
        }
    }

    fn battery_values(&self) -> Vec<f64> {
        match self.mode {
            SearchMode::PvOnly => vec![0.0],
            SearchMode::PvAndBattery => {
                let mut values = self.battery.values();
                if values.first() != Some(&0.0) {
                    values.insert(0, 0.0);
                }
                values
            }
            SearchMode::BatteryRetrofit { .. } => {
                self.battery.values().into_iter().filter(|v| *v > 0.0).collect()
            }
        }
    }

    /// Feasible configurations in enumeration order.
    pub fn configurations(&self) -> impl Iterator<Item = SystemConfiguration> + '_ {
        let batteries = self.battery_values();
        let existing = self.mode.has_existing_pv();
        self.pv_values()
            .into_iter()
            .filter(|pv| *pv >= 0.0)
            .flat_map(move |pv| {
                batteries
                    .clone()
                    .into_iter()
                    .map(move |bat| SystemConfiguration::new(pv, bat))
            })
            .filter(move |c| is_feasible(c, existing))
    }
}
