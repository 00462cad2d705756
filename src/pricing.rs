//! Installed-price models.
//!
//! Two strategies share the [`PricingModel`] interface:
//! - [`MedianRangePricing`]: one bivariate quadratic gives a base price, a
//!   markup gives the quoted median, and a per-unit width gives the range.
//! - [`PolynomialTotalPricing`]: independent PV and battery cost curves with
//!   a discount when both are bought together.

use serde::{Deserialize, Serialize};

use crate::types::{BundleCost, PriceBreakdown, QuoteRange, SystemConfiguration};

/// Trait implemented by every pricing strategy.
pub trait PricingModel {
    /// Price of one configuration. Never negative; zero capacities are valid.
    fn price(&self, config: SystemConfiguration) -> PriceBreakdown;

    /// Short strategy name for reports and logs.
    fn strategy_name(&self) -> &'static str;
}

/// `intercept + linear * x + quadratic * x^2`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuadraticCurve {
    pub intercept: f64,
    pub linear: f64,
    pub quadratic: f64,
}

impl QuadraticCurve {
    pub fn eval(&self, x: f64) -> f64 {
        self.intercept + self.linear * x + self.quadratic * x * x
    }

    /// Cost of `capacity` units: zero when nothing is bought, never negative.
    fn cost_of(&self, capacity: f64) -> f64 {
        if capacity <= 0.0 {
            0.0
        } else {
            self.eval(capacity).max(0.0)
        }
    }
}

/// Coefficients of the bivariate base price
/// `intercept + pv_linear*x + battery_linear*z + pv_quadratic*x^2 + battery_quadratic*z^2`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MedianCoefficients {
    pub intercept: f64,
    pub pv_linear: f64,
    pub pv_quadratic: f64,
    pub battery_linear: f64,
    pub battery_quadratic: f64,
}

/// Median-and-range strategy.
///
/// # Examples
///
/// ```
/// use solar_quote::pricing::{MedianCoefficients, MedianRangePricing, PricingModel};
/// use solar_quote::types::{PriceBreakdown, SystemConfiguration};
///
/// let pricing = MedianRangePricing::new(
///     MedianCoefficients {
///         intercept: 287_000.0,
///         pv_linear: 175_500.0,
///         pv_quadratic: -1_200.0,
///         battery_linear: 200_000.0,
///         battery_quadratic: -3_000.0,
///     },
///     20.0,
///     25_000.0,
/// );
/// let PriceBreakdown::Range(q) = pricing.price(SystemConfiguration::pv_only(5.0)) else {
///     unreachable!()
/// };
/// assert_eq!(q.base_median, 1_134_500.0);
/// assert_eq!(q.range_width, 125_000.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MedianRangePricing {
    coefficients: MedianCoefficients,
    markup_pct: f64,
    range_per_unit: f64,
}

impl MedianRangePricing {
    /// # Arguments
    ///
    /// * `coefficients` - Base price curve
    /// * `markup_pct` - Markup applied to the base price (percent)
    /// * `range_per_unit` - Half-width of the quoted range per kW plus kWh
    pub fn new(coefficients: MedianCoefficients, markup_pct: f64, range_per_unit: f64) -> Self {
        Self {
            coefficients,
            markup_pct,
            range_per_unit,
        }
    }

    fn base_median(&self, x: f64, z: f64) -> f64 {
        let c = &self.coefficients;
        let base = c.intercept
            + c.pv_linear * x
            + c.battery_linear * z
            + c.pv_quadratic * x * x
            + c.battery_quadratic * z * z;
        base.max(0.0)
    }
}

impl PricingModel for MedianRangePricing {
    fn price(&self, config: SystemConfiguration) -> PriceBreakdown {
        let (x, z) = (config.pv_kw, config.battery_kwh);
        let base_median = self.base_median(x, z);
        let median = base_median * (1.0 + self.markup_pct / 100.0);
        let range_width = (x + z) * self.range_per_unit;
        PriceBreakdown::Range(QuoteRange {
            base_median,
            median,
            range_width,
            range_min: (median - range_width).max(0.0),
            range_max: median + range_width,
        })
    }

    fn strategy_name(&self) -> &'static str {
        "median_range"
    }
}

/// Bundle discount: `fixed + pct% * max(0, pv + battery - baselines)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BundleDiscount {
    pub fixed: f64,
    pub pct: f64,
}

/// Polynomial-total strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialTotalPricing {
    pv: QuadraticCurve,
    battery: QuadraticCurve,
    discount: BundleDiscount,
}

impl PolynomialTotalPricing {
    pub fn new(pv: QuadraticCurve, battery: QuadraticCurve, discount: BundleDiscount) -> Self {
        Self {
            pv,
            battery,
            discount,
        }
    }

    /// Discount for a bundle with the given component costs.
    ///
    /// Only the part of the summed cost above both curves' intercepts is
    /// discounted by percentage. The discount never exceeds the sum.
    fn bundle_discount(&self, pv_cost: f64, battery_cost: f64) -> f64 {
        let sum = pv_cost + battery_cost;
        let variable = (sum - (self.pv.intercept + self.battery.intercept)).max(0.0);
        let discount = self.discount.fixed + self.discount.pct / 100.0 * variable;
        discount.clamp(0.0, sum)
    }
}

impl PricingModel for PolynomialTotalPricing {
    fn price(&self, config: SystemConfiguration) -> PriceBreakdown {
        let pv_cost = self.pv.cost_of(config.pv_kw);
        let battery_cost = self.battery.cost_of(config.battery_kwh);
        let bundle_discount = if pv_cost > 0.0 && battery_cost > 0.0 {
            self.bundle_discount(pv_cost, battery_cost)
        } else {
            0.0
        };
        PriceBreakdown::Bundle(BundleCost {
            pv_cost,
            battery_cost,
            bundle_discount,
            total: pv_cost + battery_cost - bundle_discount,
        })
    }

    fn strategy_name(&self) -> &'static str {
        "polynomial_total"
    }
}

/// The pricing strategy selected by configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum PricingStrategy {
    MedianRange(MedianRangePricing),
    PolynomialTotal(PolynomialTotalPricing),
}

impl PricingModel for PricingStrategy {
    fn price(&self, config: SystemConfiguration) -> PriceBreakdown {
        match self {
            Self::MedianRange(p) => p.price(config),
            Self::PolynomialTotal(p) => p.price(config),
        }
    }

    fn strategy_name(&self) -> &'static str {
        match self {
            Self::MedianRange(p) => p.strategy_name(),
            Self::PolynomialTotal(p) => p.strategy_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn median_range() -> MedianRangePricing {
        MedianRangePricing::new(
            MedianCoefficients {
                intercept: 287_000.0,
                pv_linear: 175_500.0,
                pv_quadratic: -1_200.0,
                battery_linear: 200_000.0,
                battery_quadratic: -3_000.0,
            },
            20.0,
            25_000.0,
        )
    }

    fn polynomial() -> PolynomialTotalPricing {
        PolynomialTotalPricing::new(
            QuadraticCurve {
                intercept: 300_000.0,
                linear: 160_000.0,
                quadratic: -1_000.0,
            },
            QuadraticCurve {
                intercept: 400_000.0,
                linear: 120_000.0,
                quadratic: -2_000.0,
            },
            BundleDiscount {
                fixed: 50_000.0,
                pct: 5.0,
            },
        )
    }

    fn range(p: PriceBreakdown) -> QuoteRange {
        match p {
            PriceBreakdown::Range(q) => q,
            other => panic!("expected a range quote, got {other:?}"),
        }
    }

    fn bundle(p: PriceBreakdown) -> BundleCost {
        match p {
            PriceBreakdown::Bundle(b) => b,
            other => panic!("expected a bundle cost, got {other:?}"),
        }
    }

    #[test]
    fn median_applies_markup_and_range() {
        let q = range(median_range().price(SystemConfiguration::new(5.0, 6.5)));
        let base = 287_000.0 + 175_500.0 * 5.0 + 200_000.0 * 6.5 - 1_200.0 * 25.0 - 3_000.0 * 42.25;
        assert_relative_eq!(q.base_median, base, epsilon = 1e-6);
        assert_relative_eq!(q.median, base * 1.2, epsilon = 1e-6);
        assert_relative_eq!(q.range_width, 11.5 * 25_000.0);
        assert_relative_eq!(q.range_min, q.median - q.range_width, epsilon = 1e-6);
        assert_relative_eq!(q.range_max, q.median + q.range_width, epsilon = 1e-6);
    }

    #[test]
    fn median_of_empty_system_is_intercept_only() {
        let q = range(median_range().price(SystemConfiguration::new(0.0, 0.0)));
        assert_relative_eq!(q.median, 287_000.0 * 1.2);
        assert_eq!(q.range_width, 0.0);
    }

    #[test]
    fn median_never_goes_negative() {
        let pricing = MedianRangePricing::new(
            MedianCoefficients {
                intercept: 0.0,
                pv_linear: 1_000.0,
                pv_quadratic: -10_000.0,
                battery_linear: 0.0,
                battery_quadratic: 0.0,
            },
            20.0,
            25_000.0,
        );
        let q = range(pricing.price(SystemConfiguration::pv_only(10.0)));
        assert_eq!(q.base_median, 0.0);
        assert_eq!(q.range_min, 0.0);
    }

    #[test]
    fn pv_only_bundle_has_no_discount() {
        let b = bundle(polynomial().price(SystemConfiguration::pv_only(4.0)));
        assert_relative_eq!(b.pv_cost, 300_000.0 + 640_000.0 - 16_000.0);
        assert_eq!(b.battery_cost, 0.0);
        assert_eq!(b.bundle_discount, 0.0);
        assert_relative_eq!(b.total, b.pv_cost);
    }

    #[test]
    fn battery_only_costs_battery_curve() {
        let b = bundle(polynomial().price(SystemConfiguration::new(0.0, 5.0)));
        assert_eq!(b.pv_cost, 0.0);
        assert_relative_eq!(b.battery_cost, 400_000.0 + 600_000.0 - 50_000.0);
        assert_eq!(b.bundle_discount, 0.0);
    }

    #[test]
    fn bundle_discounts_only_the_variable_part() {
        let b = bundle(polynomial().price(SystemConfiguration::new(4.0, 5.0)));
        let sum = 924_000.0 + 950_000.0;
        let expected_discount = 50_000.0 + 0.05 * (sum - 700_000.0);
        assert_relative_eq!(b.bundle_discount, expected_discount, epsilon = 1e-6);
        assert_relative_eq!(b.total, sum - expected_discount, epsilon = 1e-6);
    }

    #[test]
    fn empty_bundle_is_free() {
        let b = bundle(polynomial().price(SystemConfiguration::new(0.0, 0.0)));
        assert_eq!(b.total, 0.0);
    }

    #[test]
    fn strategy_dispatches_to_inner_model() {
        let s = PricingStrategy::PolynomialTotal(polynomial());
        assert_eq!(s.strategy_name(), "polynomial_total");
        let direct = polynomial().price(SystemConfiguration::new(3.0, 2.0));
        assert_eq!(s.price(SystemConfiguration::new(3.0, 2.0)), direct);
    }
}
