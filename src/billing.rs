//! Household electricity billing.
//!
//! Converts a monthly consumption into an annual bill under a tiered or
//! time-of-use plan, and inverts a bill back into consumption by bisection.

use serde::{Deserialize, Serialize};

/// Upper end of the consumption search domain for [`BillingPlan::usage_for_cost`] (kWh/month).
pub const USAGE_SEARCH_MAX_KWH: f64 = 20_000.0;

/// Bisection steps; 20 000 / 2^40 is far below the 0.1 kWh output precision.
const USAGE_SEARCH_ITERATIONS: usize = 40;

/// One band of a tiered plan.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Tier {
    /// Cumulative monthly kWh at which this band ends; `None` for unbounded.
    #[serde(default)]
    pub upto_kwh: Option<f64>,
    pub rate_per_kwh: f64,
}

/// Progressive block pricing; lower bands fill first.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TieredPlan {
    pub tiers: Vec<Tier>,
}

impl TieredPlan {
    /// Energy charge for `kwh` in one month. The last band is treated as unbounded.
    pub fn energy_charge(&self, kwh: f64) -> f64 {
        let mut remaining = kwh.max(0.0);
        let mut floor = 0.0;
        let mut charge = 0.0;
        let last = self.tiers.len().saturating_sub(1);

        for (i, tier) in self.tiers.iter().enumerate() {
            if remaining <= 0.0 {
                break;
            }
            let width = match tier.upto_kwh {
                Some(upto) if i < last => (upto - floor).max(0.0),
                _ => f64::INFINITY,
            };
            let billed = remaining.min(width);
            charge += billed * tier.rate_per_kwh;
            remaining -= billed;
            if let Some(upto) = tier.upto_kwh {
                floor = upto;
            }
        }
        charge
    }
}

/// Daytime window of a time-of-use plan, in whole hours `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DayWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

/// Separate day and night rates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeOfUsePlan {
    pub day_rate: f64,
    pub night_rate: f64,
    pub day_window: DayWindow,
}

impl TimeOfUsePlan {
    /// Energy charge with `day_fraction` of `kwh` billed at the day rate.
    pub fn energy_charge(&self, kwh: f64, day_fraction: f64) -> f64 {
        let kwh = kwh.max(0.0);
        let day = kwh * day_fraction.clamp(0.0, 1.0);
        let night = kwh - day;
        day * self.day_rate + night * self.night_rate
    }
}

/// Plan families a request may choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// One unit price; usage may be derived from a bill.
    Flat,
    Tiered,
    TimeOfUse,
}

impl PlanKind {
    /// Accepted names, as written in configuration.
    pub const NAMES: &[&str] = &["flat", "tiered", "time_of_use"];

    /// Parses a configuration name; `-` and `_` are interchangeable.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.replace('-', "_").as_str() {
            "flat" => Some(Self::Flat),
            "tiered" => Some(Self::Tiered),
            "time_of_use" => Some(Self::TimeOfUse),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Tiered => "tiered",
            Self::TimeOfUse => "time_of_use",
        }
    }
}

/// Energy-rate structure of a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum RatePlan {
    Tiered(TieredPlan),
    TimeOfUse(TimeOfUsePlan),
}

/// Monthly standing charge, chosen by the pre-fee monthly amount.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FixedFee {
    /// Pre-fee monthly amount above which `above` applies.
    pub threshold: f64,
    pub below: f64,
    pub above: f64,
}

impl FixedFee {
    /// The same fee on both sides of the threshold.
    pub fn flat(amount: f64) -> Self {
        Self {
            threshold: 0.0,
            below: amount,
            above: amount,
        }
    }

    pub fn for_amount(&self, pre_fee: f64) -> f64 {
        if pre_fee > self.threshold {
            self.above
        } else {
            self.below
        }
    }
}

/// A complete rate plan: energy rates, per-kWh surcharge, and fixed fee.
///
/// # Examples
///
/// ```
/// use solar_quote::billing::BillingPlan;
///
/// // 34 per kWh, 1500 per month standing charge.
/// let plan = BillingPlan::flat(34.0, 1500.0);
/// assert_eq!(plan.cost_for_usage(300.0, 0.3), (300.0 * 34.0 + 1500.0) * 12.0);
/// assert_eq!(plan.usage_for_cost(140_400.0, 0.3), Some(300.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BillingPlan {
    pub rate: RatePlan,
    /// Flat per-kWh surcharge added to every kWh.
    pub surcharge_per_kwh: f64,
    pub fixed_fee: FixedFee,
}

impl BillingPlan {
    /// Single unbounded tier at `unit_price`, no surcharge, constant fixed fee.
    pub fn flat(unit_price: f64, fixed_fee: f64) -> Self {
        Self {
            rate: RatePlan::Tiered(TieredPlan {
                tiers: vec![Tier {
                    upto_kwh: None,
                    rate_per_kwh: unit_price,
                }],
            }),
            surcharge_per_kwh: 0.0,
            fixed_fee: FixedFee::flat(fixed_fee),
        }
    }

    /// Bill for one month of `monthly_kwh`, fixed fee included.
    pub fn monthly_cost(&self, monthly_kwh: f64, day_fraction: f64) -> f64 {
        let kwh = monthly_kwh.max(0.0);
        let energy = match &self.rate {
            RatePlan::Tiered(plan) => plan.energy_charge(kwh),
            RatePlan::TimeOfUse(plan) => plan.energy_charge(kwh, day_fraction),
        };
        let pre_fee = energy + kwh * self.surcharge_per_kwh;
        pre_fee + self.fixed_fee.for_amount(pre_fee)
    }

    /// Annual bill for a household using `monthly_kwh` every month.
    ///
    /// Non-decreasing in usage as long as rates are non-negative and the
    /// higher fee is not below the lower one.
    pub fn cost_for_usage(&self, monthly_kwh: f64, day_fraction: f64) -> f64 {
        self.monthly_cost(monthly_kwh, day_fraction) * 12.0
    }

    /// Monthly usage whose annual bill matches `annual_cost`, to 0.1 kWh.
    ///
    /// Bisects over `[0, USAGE_SEARCH_MAX_KWH]`. Returns `None` for a negative
    /// or non-finite cost, or one above the bill at the top of the domain.
    pub fn usage_for_cost(&self, annual_cost: f64, day_fraction: f64) -> Option<f64> {
        if !annual_cost.is_finite() || annual_cost < 0.0 {
            return None;
        }
        if annual_cost > self.cost_for_usage(USAGE_SEARCH_MAX_KWH, day_fraction) {
            return None;
        }

        let (mut lo, mut hi) = (0.0_f64, USAGE_SEARCH_MAX_KWH);
        for _ in 0..USAGE_SEARCH_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if self.cost_for_usage(mid, day_fraction) < annual_cost {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some((0.5 * (lo + hi) * 10.0).round() / 10.0)
    }
}

/// Monthly usage implied by a flat-rate bill: `max(0, bill - fixed_fee) / unit_price`.
pub fn usage_from_bill(monthly_bill: f64, unit_price: f64, fixed_fee: f64) -> f64 {
    if unit_price <= 0.0 {
        return 0.0;
    }
    (monthly_bill - fixed_fee).max(0.0) / unit_price
}
