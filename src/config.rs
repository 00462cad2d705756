//! TOML-based estimator configuration and preset definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::billing::{BillingPlan, DayWindow, FixedFee, PlanKind, RatePlan, Tier, TieredPlan, TimeOfUsePlan};
use crate::catalog::ReferenceCatalog;
use crate::dispatch::DispatchParams;
use crate::dispatch::simulator::DAYS_PER_YEAR;
use crate::optimizer::grid::{BatteryAxis, RangeSpec};
use crate::optimizer::ranking::RankTolerances;
use crate::pricing::{
    BundleDiscount, MedianCoefficients, MedianRangePricing, PolynomialTotalPricing,
    PricingStrategy, QuadraticCurve,
};
use crate::tariff::{CalendarTariff, FeedInTariff, PhasedRule, TariffPhase, TariffSchedule};

/// Top-level estimator configuration parsed from TOML.
///
/// All fields have defaults matching the `ibaraki` preset. Load from TOML
/// with [`EstimatorConfig::from_toml_file`] or use
/// [`EstimatorConfig::from_preset`] for a built-in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Household rate plans.
    #[serde(default)]
    pub billing: BillingConfig,
    /// Feed-in tariff keying and calendar rules.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// PV yield and battery assumptions.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Pricing strategy and coefficients.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Search ranges.
    #[serde(default)]
    pub search: SearchConfig,
    /// Ranking tolerances and table size.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Reference data files.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Optional calculation request; command-line values take precedence.
    #[serde(default)]
    pub request: RequestConfig,
}

/// Household rate plans.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BillingConfig {
    /// Plan used when the request does not choose one: `"flat"`, `"tiered"` or `"time_of_use"`.
    pub plan: String,
    /// Flat plan unit price per kWh.
    pub unit_price: f64,
    /// Flat plan monthly standing charge.
    pub fixed_fee: f64,
    /// Per-kWh surcharge for tiered and time-of-use plans.
    pub surcharge_per_kwh: f64,
    /// Standing charge for tiered and time-of-use plans.
    pub fee: FixedFee,
    /// Tiered plan bands, lowest first.
    pub tiers: Vec<Tier>,
    /// Time-of-use rates.
    pub time_of_use: TimeOfUsePlan,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            plan: "flat".to_string(),
            unit_price: 34.0,
            fixed_fee: 1_500.0,
            surcharge_per_kwh: 3.0,
            fee: FixedFee {
                threshold: 5_000.0,
                below: 1_000.0,
                above: 1_500.0,
            },
            tiers: vec![
                Tier {
                    upto_kwh: Some(120.0),
                    rate_per_kwh: 29.8,
                },
                Tier {
                    upto_kwh: Some(300.0),
                    rate_per_kwh: 36.4,
                },
                Tier {
                    upto_kwh: None,
                    rate_per_kwh: 40.49,
                },
            ],
            time_of_use: TimeOfUsePlan {
                day_rate: 40.0,
                night_rate: 20.0,
                day_window: DayWindow {
                    start_hour: 7,
                    end_hour: 23,
                },
            },
        }
    }
}

/// One entry of the calendar-year tariff table.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarRate {
    pub year: i32,
    pub rate_per_kwh: f64,
}

/// Feed-in tariff keying.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// `"project_years"` (catalog table) or `"calendar"` (historical table plus phased rule).
    pub keying: String,
    /// Rate for years no table entry covers.
    pub post_incentive_rate: Option<f64>,
    /// Calendar-year rates before the pivot.
    pub historical: Vec<CalendarRate>,
    /// Phased rule taking over at its pivot year.
    pub phased: Option<PhasedRule>,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            keying: "project_years".to_string(),
            post_incentive_rate: None,
            historical: Vec::new(),
            phased: None,
        }
    }
}

/// PV yield and battery assumptions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Daily PV yield per installed kW (kWh/kW/day).
    pub pv_yield_per_kw_day: f64,
    /// Battery round-trip efficiency (0 < x <= 1.0).
    pub round_trip_efficiency: f64,
    /// Share of battery nameplate capacity that may be cycled (0.0-1.0).
    pub usable_fraction: f64,
    /// Share of consumption in daylight hours when the request gives none.
    pub day_fraction: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pv_yield_per_kw_day: 3.1,
            round_trip_efficiency: 0.9,
            usable_fraction: 0.9,
            day_fraction: 0.3,
        }
    }
}

/// Pricing strategy and coefficients.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingConfig {
    /// `"median_range"` or `"polynomial_total"`.
    pub strategy: String,
    /// Median-and-range base curve.
    pub median: MedianCoefficients,
    /// Markup on the base median (percent).
    pub markup_pct: f64,
    /// Half-width of the quoted range per kW plus kWh.
    pub range_per_unit: f64,
    /// PV cost curve for the polynomial-total strategy.
    pub pv_curve: QuadraticCurve,
    /// Battery cost curve for the polynomial-total strategy.
    pub battery_curve: QuadraticCurve,
    /// Bundle discount for the polynomial-total strategy.
    pub bundle_discount: BundleDiscount,
    /// Presentation rounding unit for prices; 0 disables rounding.
    pub rounding_unit: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            strategy: "median_range".to_string(),
            median: MedianCoefficients {
                intercept: 287_000.0,
                pv_linear: 175_500.0,
                pv_quadratic: -1_200.0,
                battery_linear: 200_000.0,
                battery_quadratic: -3_000.0,
            },
            markup_pct: 20.0,
            range_per_unit: 25_000.0,
            pv_curve: QuadraticCurve {
                intercept: 300_000.0,
                linear: 160_000.0,
                quadratic: -1_000.0,
            },
            battery_curve: QuadraticCurve {
                intercept: 400_000.0,
                linear: 120_000.0,
                quadratic: -2_000.0,
            },
            bundle_discount: BundleDiscount {
                fixed: 50_000.0,
                pct: 5.0,
            },
            rounding_unit: 10_000.0,
        }
    }
}

/// Search ranges.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// PV capacity range (kW).
    pub pv: RangeSpec,
    /// `"catalog"` (reference battery sizes) or `"stepped"` (the `battery` range).
    pub battery_axis: String,
    /// Battery capacity range (kWh) for the stepped axis.
    pub battery: RangeSpec,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pv: RangeSpec::new(1.0, 13.5, 0.01),
            battery_axis: "catalog".to_string(),
            battery: RangeSpec::new(0.0, 16.0, 1.0),
        }
    }
}

/// Ranking tolerances and table size.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    /// Balanced-distance scales.
    pub tolerances: RankTolerances,
    /// Rows per top table (must be > 0).
    pub top_n: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            tolerances: RankTolerances::default(),
            top_n: 10,
        }
    }
}

/// Reference data files; unset paths use the built-in data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// JSON array of `{startYear, endYear, yenPerKwh}`.
    pub tariffs_path: Option<PathBuf>,
    /// JSON array of battery sizes (kWh).
    pub battery_sizes_path: Option<PathBuf>,
}

/// Calculation request given in a scenario file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestConfig {
    pub annual_kwh: Option<f64>,
    pub monthly_bill: Option<f64>,
    pub unit_price: Option<f64>,
    pub plan: Option<String>,
    pub day_fraction: Option<f64>,
    pub existing_pv_kw: Option<f64>,
    pub fit_start_year: Option<i32>,
    pub fit_years_remaining: Option<u32>,
    pub evaluation_years: Option<u32>,
    pub budget: Option<f64>,
    pub include_battery: Option<bool>,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"dispatch.round_trip_efficiency"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

const TARIFF_KEYINGS: &[&str] = &["project_years", "calendar"];
const PRICING_STRATEGIES: &[&str] = &["median_range", "polynomial_total"];
const BATTERY_AXES: &[&str] = &["catalog", "stepped"];

fn one_of(errors: &mut Vec<ConfigError>, field: &str, value: &str, allowed: &[&str]) {
    if !allowed.contains(&value) {
        let quoted: Vec<String> = allowed.iter().map(|a| format!("\"{a}\"")).collect();
        errors.push(ConfigError::new(
            field,
            format!("must be one of {}, got \"{value}\"", quoted.join(", ")),
        ));
    }
}

fn check_range(errors: &mut Vec<ConfigError>, field: &str, range: &RangeSpec) {
    if !range.is_well_formed() {
        errors.push(ConfigError::new(
            field,
            "must have finite min <= max and step > 0",
        ));
    } else if range.min < 0.0 {
        errors.push(ConfigError::new(field, "min must be >= 0"));
    }
}

impl EstimatorConfig {
    /// Returns the `ibaraki` preset: flat plan, median-and-range pricing,
    /// project-year tariff table, catalog battery sizes.
    pub fn ibaraki() -> Self {
        Self::default()
    }

    /// Returns the `tiered` preset: three-tier plan and polynomial-total pricing.
    pub fn tiered() -> Self {
        Self {
            billing: BillingConfig {
                plan: "tiered".to_string(),
                ..BillingConfig::default()
            },
            pricing: PricingConfig {
                strategy: "polynomial_total".to_string(),
                ..PricingConfig::default()
            },
            search: SearchConfig {
                pv: RangeSpec::new(1.0, 12.0, 0.1),
                ..SearchConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the `time_of_use` preset: day/night rates, a calendar tariff
    /// switching to a phased rule in 2025, and a stepped battery axis.
    pub fn time_of_use() -> Self {
        Self {
            billing: BillingConfig {
                plan: "time_of_use".to_string(),
                fee: FixedFee::flat(1_200.0),
                surcharge_per_kwh: 0.0,
                ..BillingConfig::default()
            },
            tariff: TariffConfig {
                keying: "calendar".to_string(),
                post_incentive_rate: Some(8.5),
                historical: vec![
                    CalendarRate {
                        year: 2021,
                        rate_per_kwh: 19.0,
                    },
                    CalendarRate {
                        year: 2022,
                        rate_per_kwh: 17.0,
                    },
                    CalendarRate {
                        year: 2023,
                        rate_per_kwh: 16.0,
                    },
                    CalendarRate {
                        year: 2024,
                        rate_per_kwh: 16.0,
                    },
                ],
                phased: Some(PhasedRule {
                    pivot_year: 2025,
                    phases: vec![
                        TariffPhase {
                            years: 4,
                            rate_per_kwh: 24.0,
                        },
                        TariffPhase {
                            years: 6,
                            rate_per_kwh: 8.3,
                        },
                    ],
                }),
            },
            search: SearchConfig {
                pv: RangeSpec::new(1.0, 12.0, 0.1),
                battery_axis: "stepped".to_string(),
                battery: RangeSpec::new(0.0, 16.0, 2.0),
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["ibaraki", "tiered", "time_of_use"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "ibaraki" => Ok(Self::ibaraki()),
            "tiered" => Ok(Self::tiered()),
            "time_of_use" => Ok(Self::time_of_use()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let b = &self.billing;
        one_of(&mut errors, "billing.plan", &b.plan.replace('-', "_"), PlanKind::NAMES);
        if !(b.unit_price > 0.0) {
            errors.push(ConfigError::new("billing.unit_price", "must be > 0"));
        }
        if b.fixed_fee < 0.0 {
            errors.push(ConfigError::new("billing.fixed_fee", "must be >= 0"));
        }
        if b.surcharge_per_kwh < 0.0 {
            errors.push(ConfigError::new("billing.surcharge_per_kwh", "must be >= 0"));
        }
        if b.fee.below < 0.0 || b.fee.above < b.fee.below {
            errors.push(ConfigError::new(
                "billing.fee",
                "must satisfy 0 <= below <= above",
            ));
        }
        if b.tiers.is_empty() {
            errors.push(ConfigError::new("billing.tiers", "must not be empty"));
        }
        let mut floor = 0.0;
        for (i, tier) in b.tiers.iter().enumerate() {
            if tier.rate_per_kwh < 0.0 {
                errors.push(ConfigError::new(
                    &format!("billing.tiers[{i}].rate_per_kwh"),
                    "must be >= 0",
                ));
            }
            match tier.upto_kwh {
                Some(upto) if upto <= floor => errors.push(ConfigError::new(
                    &format!("billing.tiers[{i}].upto_kwh"),
                    format!("must be > {floor}"),
                )),
                Some(upto) => floor = upto,
                None if i + 1 < b.tiers.len() => errors.push(ConfigError::new(
                    &format!("billing.tiers[{i}].upto_kwh"),
                    "only the last tier may be unbounded",
                )),
                None => {}
            }
        }
        let tou = &b.time_of_use;
        if tou.day_rate < 0.0 || tou.night_rate < 0.0 {
            errors.push(ConfigError::new("billing.time_of_use", "rates must be >= 0"));
        }
        if tou.day_window.start_hour >= tou.day_window.end_hour || tou.day_window.end_hour > 24 {
            errors.push(ConfigError::new(
                "billing.time_of_use.day_window",
                "must satisfy start_hour < end_hour <= 24",
            ));
        }

        let t = &self.tariff;
        one_of(&mut errors, "tariff.keying", &t.keying, TARIFF_KEYINGS);
        if t.post_incentive_rate.is_some_and(|r| r < 0.0) {
            errors.push(ConfigError::new("tariff.post_incentive_rate", "must be >= 0"));
        }
        if t.keying == "calendar" && t.post_incentive_rate.is_none() {
            errors.push(ConfigError::new(
                "tariff.post_incentive_rate",
                "is required for calendar keying",
            ));
        }
        if let Some(rule) = &t.phased {
            if rule.phases.iter().any(|p| p.years == 0 || p.rate_per_kwh < 0.0) {
                errors.push(ConfigError::new(
                    "tariff.phased.phases",
                    "every phase needs years > 0 and rate_per_kwh >= 0",
                ));
            }
        }

        let d = &self.dispatch;
        if !(d.pv_yield_per_kw_day > 0.0) {
            errors.push(ConfigError::new("dispatch.pv_yield_per_kw_day", "must be > 0"));
        }
        if !(d.round_trip_efficiency > 0.0 && d.round_trip_efficiency <= 1.0) {
            errors.push(ConfigError::new(
                "dispatch.round_trip_efficiency",
                "must be in (0.0, 1.0]",
            ));
        }
        if !(0.0..=1.0).contains(&d.usable_fraction) {
            errors.push(ConfigError::new("dispatch.usable_fraction", "must be in [0.0, 1.0]"));
        }
        if !(0.0..=1.0).contains(&d.day_fraction) {
            errors.push(ConfigError::new("dispatch.day_fraction", "must be in [0.0, 1.0]"));
        }

        let p = &self.pricing;
        one_of(&mut errors, "pricing.strategy", &p.strategy, PRICING_STRATEGIES);
        if p.markup_pct < 0.0 {
            errors.push(ConfigError::new("pricing.markup_pct", "must be >= 0"));
        }
        if p.range_per_unit < 0.0 {
            errors.push(ConfigError::new("pricing.range_per_unit", "must be >= 0"));
        }
        if p.rounding_unit < 0.0 {
            errors.push(ConfigError::new("pricing.rounding_unit", "must be >= 0"));
        }

        let s = &self.search;
        check_range(&mut errors, "search.pv", &s.pv);
        one_of(&mut errors, "search.battery_axis", &s.battery_axis, BATTERY_AXES);
        if s.battery_axis == "stepped" {
            check_range(&mut errors, "search.battery", &s.battery);
        }

        let sel = &self.selection;
        if sel.top_n == 0 {
            errors.push(ConfigError::new("selection.top_n", "must be > 0"));
        }
        let tol = &sel.tolerances;
        if tol.profit < 0.0 || tol.roi_pt < 0.0 || tol.payback_years < 0.0 {
            errors.push(ConfigError::new("selection.tolerances", "must be >= 0"));
        }

        errors
    }

    /// The configured default plan family, if the name is valid.
    pub fn default_plan(&self) -> Option<PlanKind> {
        PlanKind::from_name(&self.billing.plan)
    }

    /// Builds a billing plan of the given family.
    ///
    /// `unit_price` overrides the configured flat unit price.
    pub fn billing_plan(&self, kind: PlanKind, unit_price: Option<f64>) -> BillingPlan {
        let b = &self.billing;
        match kind {
            PlanKind::Flat => BillingPlan::flat(unit_price.unwrap_or(b.unit_price), b.fixed_fee),
            PlanKind::Tiered => BillingPlan {
                rate: RatePlan::Tiered(TieredPlan {
                    tiers: b.tiers.clone(),
                }),
                surcharge_per_kwh: b.surcharge_per_kwh,
                fixed_fee: b.fee,
            },
            PlanKind::TimeOfUse => BillingPlan {
                rate: RatePlan::TimeOfUse(b.time_of_use.clone()),
                surcharge_per_kwh: b.surcharge_per_kwh,
                fixed_fee: b.fee,
            },
        }
    }

    pub fn dispatch_params(&self) -> DispatchParams {
        let d = &self.dispatch;
        DispatchParams {
            pv_yield_per_kw_year: d.pv_yield_per_kw_day * DAYS_PER_YEAR as f64,
            round_trip_efficiency: d.round_trip_efficiency,
            usable_fraction: d.usable_fraction,
        }
    }

    pub fn pricing_strategy(&self) -> PricingStrategy {
        let p = &self.pricing;
        match p.strategy.as_str() {
            "polynomial_total" => PricingStrategy::PolynomialTotal(PolynomialTotalPricing::new(
                p.pv_curve,
                p.battery_curve,
                p.bundle_discount,
            )),
            _ => PricingStrategy::MedianRange(MedianRangePricing::new(
                p.median,
                p.markup_pct,
                p.range_per_unit,
            )),
        }
    }

    /// Builds the feed-in tariff; project-year tables come from the catalog.
    pub fn feed_in_tariff(&self, catalog: &ReferenceCatalog) -> FeedInTariff {
        let t = &self.tariff;
        match t.keying.as_str() {
            "calendar" => {
                let historical: BTreeMap<i32, f64> = t
                    .historical
                    .iter()
                    .map(|r| (r.year, r.rate_per_kwh))
                    .collect();
                FeedInTariff::Calendar(CalendarTariff::new(
                    historical,
                    t.phased.clone(),
                    t.post_incentive_rate.unwrap_or(0.0),
                ))
            }
            _ => FeedInTariff::ProjectYears(TariffSchedule::new(
                catalog.tariffs.clone(),
                t.post_incentive_rate,
            )),
        }
    }

    pub fn battery_axis(&self, catalog: &ReferenceCatalog) -> BatteryAxis {
        match self.search.battery_axis.as_str() {
            "stepped" => BatteryAxis::Stepped(self.search.battery),
            _ => BatteryAxis::Catalog(catalog.battery_sizes.clone()),
        }
    }

    /// Loads the configured reference files, falling back to built-in data.
    pub fn load_catalog(&self) -> ReferenceCatalog {
        ReferenceCatalog::load_or_default(
            self.catalog.tariffs_path.as_deref(),
            self.catalog.battery_sizes_path.as_deref(),
        )
    }
}
