//! Core data model: design points, simulated totals, prices, and evaluated candidates.

use std::fmt;

use serde::Serialize;

/// One candidate design point.
///
/// Both capacities are non-negative. A zero battery means a PV-only system;
/// a zero PV capacity only makes sense when the household already owns PV.
///
/// # Examples
///
/// ```
/// use solar_quote::types::SystemConfiguration;
///
/// let cfg = SystemConfiguration::new(4.5, 6.5);
/// assert!(cfg.has_battery());
/// assert_eq!(cfg.key().to_string(), "4.50|6.5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemConfiguration {
    /// PV array capacity (kW).
    pub pv_kw: f64,
    /// Battery nameplate capacity (kWh).
    pub battery_kwh: f64,
}

impl SystemConfiguration {
    /// Creates a design point.
    ///
    /// # Panics
    ///
    /// Panics if either capacity is negative or not finite.
    pub fn new(pv_kw: f64, battery_kwh: f64) -> Self {
        assert!(pv_kw.is_finite() && pv_kw >= 0.0, "pv_kw must be >= 0");
        assert!(
            battery_kwh.is_finite() && battery_kwh >= 0.0,
            "battery_kwh must be >= 0"
        );
        Self { pv_kw, battery_kwh }
    }

    /// Like [`SystemConfiguration::new`], but returns `None` for a negative or
    /// non-finite capacity.
    pub fn try_new(pv_kw: f64, battery_kwh: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        (valid(pv_kw) && valid(battery_kwh)).then_some(Self { pv_kw, battery_kwh })
    }

    /// A PV-only design point.
    pub fn pv_only(pv_kw: f64) -> Self {
        Self::new(pv_kw, 0.0)
    }

    /// Whether the design includes storage.
    pub fn has_battery(&self) -> bool {
        self.battery_kwh > 0.0
    }

    /// Dedup key: PV rounded to 0.01 kW, battery rounded to 0.1 kWh.
    pub fn key(&self) -> ConfigKey {
        ConfigKey {
            pv_centi_kw: (self.pv_kw * 100.0).round() as i64,
            battery_deci_kwh: (self.battery_kwh * 10.0).round() as i64,
        }
    }
}

/// Structural equality key for a [`SystemConfiguration`].
///
/// Stored as integer hundredths of a kW and tenths of a kWh so that two
/// configurations produced by different float paths compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConfigKey {
    pv_centi_kw: i64,
    battery_deci_kwh: i64,
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}|{:.1}",
            self.pv_centi_kw as f64 / 100.0,
            self.battery_deci_kwh as f64 / 10.0
        )
    }
}

/// Annual energy and bill totals for one simulated representative year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    /// Household consumption over the year (kWh).
    pub annual_load_kwh: f64,
    /// PV generation over the year (kWh).
    pub annual_generation_kwh: f64,
    /// Load met by PV directly or via the battery (kWh).
    pub annual_self_consumption_kwh: f64,
    /// PV energy exported to the grid (kWh).
    pub annual_sold_kwh: f64,
    /// Residual load still purchased from the grid (kWh).
    pub annual_grid_kwh: f64,
    /// Annual bill without the installation.
    pub cost_before: f64,
    /// Annual bill on the residual grid load.
    pub cost_after: f64,
    /// `cost_before - cost_after`.
    pub annual_savings: f64,
}

/// Median-and-range quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRange {
    /// Price from the bivariate cost curve, before markup.
    pub base_median: f64,
    /// Quoted median after markup.
    pub median: f64,
    /// Half-width of the quoted range.
    pub range_width: f64,
    /// `median - range_width`, floored at zero.
    pub range_min: f64,
    /// `median + range_width`.
    pub range_max: f64,
}

/// Component costs with a bundling discount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleCost {
    pub pv_cost: f64,
    pub battery_cost: f64,
    /// Discount granted when PV and battery are bought together.
    pub bundle_discount: f64,
    /// `pv_cost + battery_cost - bundle_discount`.
    pub total: f64,
}

/// Installed price of one configuration under the active pricing strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PriceBreakdown {
    Range(QuoteRange),
    Bundle(BundleCost),
}

impl PriceBreakdown {
    /// The single price used for profit, ROI, and payback.
    pub fn quoted(&self) -> f64 {
        match self {
            Self::Range(q) => q.median,
            Self::Bundle(b) => b.total,
        }
    }

    /// Lowest price the customer could be quoted; compared against the budget.
    pub fn lower_bound(&self) -> f64 {
        match self {
            Self::Range(q) => q.range_min,
            Self::Bundle(b) => b.total,
        }
    }

    /// Highest price the customer could be quoted.
    pub fn upper_bound(&self) -> f64 {
        match self {
            Self::Range(q) => q.range_max,
            Self::Bundle(b) => b.total,
        }
    }

    /// Copy with every amount rounded to the nearest `unit`.
    ///
    /// A non-positive unit returns the breakdown unchanged.
    pub fn rounded(&self, unit: f64) -> Self {
        if unit <= 0.0 || !unit.is_finite() {
            return self.clone();
        }
        let r = |v: f64| (v / unit).round() * unit;
        match self {
            Self::Range(q) => Self::Range(QuoteRange {
                base_median: r(q.base_median),
                median: r(q.median),
                range_width: r(q.range_width),
                range_min: r(q.range_min),
                range_max: r(q.range_max),
            }),
            Self::Bundle(b) => Self::Bundle(BundleCost {
                pv_cost: r(b.pv_cost),
                battery_cost: r(b.battery_cost),
                bundle_discount: r(b.bundle_discount),
                total: r(b.total),
            }),
        }
    }
}

/// Years until cumulative benefit covers the price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payback {
    /// Fractional years, interpolated within the crossing year.
    Years(f64),
    /// Never reached within the evaluation horizon.
    Unresolved,
}

impl Payback {
    pub fn years(&self) -> Option<f64> {
        match self {
            Self::Years(y) => Some(*y),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Years(_))
    }
}

/// One fully evaluated grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedCandidate {
    /// Installed state after the purchase.
    pub config: SystemConfiguration,
    pub price: PriceBreakdown,
    pub simulation: SimulationResult,
    /// Bill savings accumulated over the horizon.
    pub savings_benefit: f64,
    /// Feed-in revenue accumulated over the horizon.
    pub fit_revenue: f64,
    /// `savings_benefit + fit_revenue`.
    pub total_benefit: f64,
    /// `total_benefit - price`.
    pub net_profit: f64,
    /// `net_profit / price`; `None` when the price is not positive.
    pub roi: Option<f64>,
    pub payback: Payback,
}

impl EvaluatedCandidate {
    pub fn key(&self) -> ConfigKey {
        self.config.key()
    }
}

impl fmt::Display for EvaluatedCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roi = self
            .roi
            .map_or_else(|| "n/a".to_string(), |r| format!("{:.2}%", r * 100.0));
        let payback = self
            .payback
            .years()
            .map_or_else(|| "unresolved".to_string(), |y| format!("{y:.2}y"));
        write!(
            f,
            "pv={:>5.2} kW  bat={:>4.1} kWh | price={:>10.0} | profit={:>10.0}  roi={roi}  payback={payback}",
            self.config.pv_kw,
            self.config.battery_kwh,
            self.price.quoted(),
            self.net_profit,
        )
    }
}

/// Rounds to a whole amount and groups digits in thousands.
///
/// # Examples
///
/// ```
/// use solar_quote::types::format_amount;
///
/// assert_eq!(format_amount(2_200_000.4), "2,200,000");
/// assert_eq!(format_amount(-12_345.0), "-12,345");
/// assert_eq!(format_amount(999.0), "999");
/// ```
pub fn format_amount(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
