//! Horizon economics: benefit, net profit, ROI and payback of one configuration.
//!
//! Every year of the horizon replays the same simulated year. Year `y` earns
//! the annual bill savings plus the sold energy at that year's feed-in rate.

use tracing::debug;

use crate::billing::BillingPlan;
use crate::dispatch::{DispatchParams, LoadProfile, simulate_year};
use crate::pricing::{PricingModel, PricingStrategy};
use crate::types::{EvaluatedCandidate, Payback, PriceBreakdown, SimulationResult, SystemConfiguration};

/// The part of a simulated year that turns into money.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnualBenefit {
    /// Bill savings per year.
    pub savings: f64,
    /// Energy sold per year (kWh), paid at the year's feed-in rate.
    pub sold_kwh: f64,
}

impl AnnualBenefit {
    pub fn from_simulation(sim: &SimulationResult) -> Self {
        Self {
            savings: sim.annual_savings,
            sold_kwh: sim.annual_sold_kwh,
        }
    }

    /// Benefit added on top of an existing installation.
    ///
    /// Sold energy may go down (storage absorbs what used to be exported), so
    /// the incremental feed-in revenue can be negative.
    pub fn relative_to(sim: &SimulationResult, baseline: &SimulationResult) -> Self {
        Self {
            savings: sim.annual_savings - baseline.annual_savings,
            sold_kwh: sim.annual_sold_kwh - baseline.annual_sold_kwh,
        }
    }

    /// Benefit earned in a year paying `fit_rate` per sold kWh.
    pub fn for_rate(&self, fit_rate: f64) -> f64 {
        self.savings + self.sold_kwh * fit_rate
    }
}

/// Benefit per year, one entry per feed-in rate.
pub fn yearly_benefits(benefit: AnnualBenefit, fit_rates: &[f64]) -> Vec<f64> {
    fit_rates.iter().map(|&r| benefit.for_rate(r)).collect()
}

/// Years until cumulative benefit reaches `price`.
///
/// The crossing year is interpolated assuming benefit accrues evenly within
/// it: `(y - 1) + remaining / annual`. Unresolved when the first year earns
/// nothing or the horizon ends first.
///
/// # Examples
///
/// ```
/// use solar_quote::economics::payback_years;
/// use solar_quote::types::Payback;
///
/// assert_eq!(payback_years(250.0, &[100.0, 100.0, 100.0]), Payback::Years(2.5));
/// assert_eq!(payback_years(400.0, &[100.0, 100.0, 100.0]), Payback::Unresolved);
/// ```
pub fn payback_years(price: f64, yearly: &[f64]) -> Payback {
    match yearly.first() {
        Some(&first) if first > 0.0 => {}
        _ => return Payback::Unresolved,
    }

    let mut cumulative = 0.0;
    for (i, &annual) in yearly.iter().enumerate() {
        let previous = cumulative;
        cumulative += annual;
        if cumulative >= price {
            let fraction = if annual > 0.0 {
                (price - previous) / annual
            } else {
                1.0
            };
            return Payback::Years(i as f64 + fraction.clamp(0.0, 1.0));
        }
    }
    Payback::Unresolved
}

/// Combines a simulation and a price into an [`EvaluatedCandidate`].
///
/// # Arguments
///
/// * `config` - Configuration the simulation was run for
/// * `simulation` - Simulated representative year
/// * `price` - Price of the configuration
/// * `fit_rates` - Feed-in rate for each year of the horizon
pub fn evaluate(
    config: SystemConfiguration,
    simulation: SimulationResult,
    price: PriceBreakdown,
    fit_rates: &[f64],
) -> EvaluatedCandidate {
    let benefit = AnnualBenefit::from_simulation(&simulation);
    evaluate_with_benefit(config, simulation, price, benefit, fit_rates)
}

/// Like [`evaluate`], with the benefit basis supplied explicitly.
pub fn evaluate_with_benefit(
    config: SystemConfiguration,
    simulation: SimulationResult,
    price: PriceBreakdown,
    benefit: AnnualBenefit,
    fit_rates: &[f64],
) -> EvaluatedCandidate {
    let horizon = fit_rates.len() as f64;
    let savings_benefit = benefit.savings * horizon;
    let fit_revenue: f64 = fit_rates.iter().map(|r| benefit.sold_kwh * r).sum();
    let total_benefit = savings_benefit + fit_revenue;

    let quoted = price.quoted();
    let net_profit = total_benefit - quoted;
    let roi = (quoted > 0.0).then(|| net_profit / quoted);
    let payback = payback_years(quoted, &yearly_benefits(benefit, fit_rates));

    EvaluatedCandidate {
        config,
        price,
        simulation,
        savings_benefit,
        fit_revenue,
        total_benefit,
        net_profit,
        roi,
        payback,
    }
}

#[derive(Debug, Clone)]
struct ExistingPv {
    pv_kw: f64,
    baseline: SimulationResult,
}

/// Evaluates configurations for one household.
///
/// Holds everything that stays fixed across a grid search: the load, the
/// billing plan, dispatch assumptions, pricing strategy and the resolved
/// feed-in series.
#[derive(Debug, Clone)]
pub struct Evaluator {
    load: LoadProfile,
    plan: BillingPlan,
    params: DispatchParams,
    pricing: PricingStrategy,
    fit_rates: Vec<f64>,
    existing: Option<ExistingPv>,
}

impl Evaluator {
    /// # Arguments
    ///
    /// * `load` - Household consumption
    /// * `plan` - Billing plan for the before and after bills
    /// * `params` - Dispatch assumptions
    /// * `pricing` - Pricing strategy
    /// * `fit_rates` - One feed-in rate per evaluated year; its length is the horizon
    pub fn new(
        load: LoadProfile,
        plan: BillingPlan,
        params: DispatchParams,
        pricing: PricingStrategy,
        fit_rates: Vec<f64>,
    ) -> Self {
        Self {
            load,
            plan,
            params,
            pricing,
            fit_rates,
            existing: None,
        }
    }

    /// Treats `pv_kw` as already installed.
    ///
    /// Prices then cover only the capacity added on top of it, and benefits
    /// are measured against the existing PV-only installation. Fixed terms of
    /// the price curve, such as an installation base, still apply.
    pub fn with_existing_pv(mut self, pv_kw: f64) -> Self {
        let baseline = self.simulate(SystemConfiguration::pv_only(pv_kw));
        debug!(
            existing_pv_kw = pv_kw,
            baseline_savings = baseline.annual_savings,
            baseline_sold_kwh = baseline.annual_sold_kwh,
            "existing PV baseline simulated"
        );
        self.existing = Some(ExistingPv { pv_kw, baseline });
        self
    }

    pub fn load(&self) -> &LoadProfile {
        &self.load
    }

    pub fn params(&self) -> &DispatchParams {
        &self.params
    }

    pub fn pricing(&self) -> &PricingStrategy {
        &self.pricing
    }

    pub fn fit_rates(&self) -> &[f64] {
        &self.fit_rates
    }

    pub fn horizon_years(&self) -> u32 {
        self.fit_rates.len() as u32
    }

    pub fn existing_pv_kw(&self) -> Option<f64> {
        self.existing.as_ref().map(|e| e.pv_kw)
    }

    pub fn simulate(&self, config: SystemConfiguration) -> SimulationResult {
        simulate_year(&self.load, config, &self.params, &self.plan)
    }

    /// The capacity a customer pays for to reach `config`.
    pub fn purchased(&self, config: SystemConfiguration) -> SystemConfiguration {
        match &self.existing {
            Some(e) => SystemConfiguration::new(
                (config.pv_kw - e.pv_kw).max(0.0),
                config.battery_kwh,
            ),
            None => config,
        }
    }

    /// Simulates, prices and evaluates one configuration.
    pub fn evaluate(&self, config: SystemConfiguration) -> EvaluatedCandidate {
        let simulation = self.simulate(config);
        let price = self.pricing.price(self.purchased(config));
        let benefit = match &self.existing {
            Some(e) => AnnualBenefit::relative_to(&simulation, &e.baseline),
            None => AnnualBenefit::from_simulation(&simulation),
        };
        evaluate_with_benefit(config, simulation, price, benefit, &self.fit_rates)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::pricing::{MedianCoefficients, MedianRangePricing};
    use crate::types::BundleCost;

    fn flat_price(total: f64) -> PriceBreakdown {
        PriceBreakdown::Bundle(BundleCost {
            pv_cost: total,
            battery_cost: 0.0,
            bundle_discount: 0.0,
            total,
        })
    }

    fn simulation(savings: f64, sold: f64) -> SimulationResult {
        SimulationResult {
            annual_load_kwh: 4_000.0,
            annual_generation_kwh: 5_000.0,
            annual_self_consumption_kwh: 1_000.0,
            annual_sold_kwh: sold,
            annual_grid_kwh: 3_000.0,
            cost_before: 150_000.0,
            cost_after: 150_000.0 - savings,
            annual_savings: savings,
        }
    }

    fn evaluator() -> Evaluator {
        Evaluator::new(
            LoadProfile::new(4_380.0, 0.3),
            BillingPlan::flat(34.0, 1_500.0),
            DispatchParams {
                pv_yield_per_kw_year: 1_131.5,
                round_trip_efficiency: 0.9,
                usable_fraction: 0.9,
            },
            PricingStrategy::MedianRange(MedianRangePricing::new(
                MedianCoefficients {
                    intercept: 287_000.0,
                    pv_linear: 175_500.0,
                    pv_quadratic: -1_200.0,
                    battery_linear: 200_000.0,
                    battery_quadratic: -3_000.0,
                },
                20.0,
                25_000.0,
            )),
            [vec![24.0; 4], vec![8.3; 6], vec![8.5; 5]].concat(),
        )
    }

    #[test]
    fn payback_interpolates_within_crossing_year() {
        // 100 per year, price 350: crosses a half-way through year 4.
        assert_eq!(payback_years(350.0, &[100.0; 10]), Payback::Years(3.5));
    }

    #[test]
    fn payback_exactly_on_year_boundary() {
        assert_eq!(payback_years(300.0, &[100.0; 10]), Payback::Years(3.0));
    }

    #[test]
    fn payback_is_unresolved_without_first_year_benefit() {
        assert_eq!(payback_years(100.0, &[0.0, 500.0]), Payback::Unresolved);
        assert_eq!(payback_years(100.0, &[-5.0, 500.0]), Payback::Unresolved);
        assert_eq!(payback_years(100.0, &[]), Payback::Unresolved);
    }

    #[test]
    fn payback_follows_varying_rates() {
        // 200, 200, then 50 per year: 500 is reached half-way through year 5.
        let yearly = [200.0, 200.0, 50.0, 25.0, 50.0];
        assert_eq!(payback_years(500.0, &yearly), Payback::Years(4.5));
    }

    #[test]
    fn totals_accumulate_over_horizon() {
        let rates = [24.0, 24.0, 8.0];
        let c = evaluate(
            SystemConfiguration::pv_only(4.0),
            simulation(50_000.0, 2_000.0),
            flat_price(1_000_000.0),
            &rates,
        );
        assert_relative_eq!(c.savings_benefit, 150_000.0);
        assert_relative_eq!(c.fit_revenue, 2_000.0 * 56.0);
        assert_relative_eq!(c.total_benefit, 262_000.0);
        assert_relative_eq!(c.net_profit, -738_000.0);
        assert_relative_eq!(c.roi.unwrap_or(f64::NAN), -0.738);
        assert_eq!(c.payback, Payback::Unresolved);
    }

    #[test]
    fn roi_is_undefined_for_free_systems() {
        let c = evaluate(
            SystemConfiguration::pv_only(0.0),
            simulation(0.0, 0.0),
            flat_price(0.0),
            &[24.0; 15],
        );
        assert_eq!(c.roi, None);
        assert_eq!(c.payback, Payback::Unresolved);
        assert_eq!(c.net_profit, 0.0);
    }

    #[test]
    fn evaluator_horizon_follows_rate_series() {
        let e = evaluator();
        assert_eq!(e.horizon_years(), 15);
        assert_eq!(e.existing_pv_kw(), None);
    }

    #[test]
    fn evaluator_prices_the_full_configuration() {
        let e = evaluator();
        let config = SystemConfiguration::new(5.0, 6.5);
        let c = e.evaluate(config);
        assert_eq!(c.price, e.pricing().price(config));
        assert_eq!(c.simulation, e.simulate(config));
        assert_relative_eq!(c.net_profit, c.total_benefit - c.price.quoted());
    }

    #[test]
    fn retrofit_prices_only_added_capacity() {
        let e = evaluator().with_existing_pv(4.0);
        let config = SystemConfiguration::new(4.0, 5.0);
        assert_eq!(e.purchased(config), SystemConfiguration::new(0.0, 5.0));

        let c = e.evaluate(config);
        assert_eq!(c.price, e.pricing().price(SystemConfiguration::new(0.0, 5.0)));
        assert_eq!(c.config, config);
    }

    #[test]
    fn retrofit_quote_keeps_installation_base() {
        let e = evaluator().with_existing_pv(4.0);
        let c = e.evaluate(SystemConfiguration::new(4.0, 5.0));
        let PriceBreakdown::Range(q) = c.price else {
            panic!("median pricing quotes a range");
        };
        // 287000 + 200000*5 - 3000*25; no PV terms
        assert_relative_eq!(q.base_median, 1_212_000.0);
        assert_relative_eq!(q.range_width, 125_000.0);
    }

    #[test]
    fn retrofit_benefit_is_incremental() {
        let plain = evaluator();
        let retrofit = evaluator().with_existing_pv(4.0);
        let config = SystemConfiguration::new(4.0, 5.0);

        let with_battery = plain.simulate(config);
        let pv_only = plain.simulate(SystemConfiguration::pv_only(4.0));
        let c = retrofit.evaluate(config);

        let rates = plain.fit_rates();
        let expected: f64 = rates
            .iter()
            .map(|r| {
                (with_battery.annual_savings - pv_only.annual_savings)
                    + (with_battery.annual_sold_kwh - pv_only.annual_sold_kwh) * r
            })
            .sum();
        assert_relative_eq!(c.total_benefit, expected, epsilon = 1e-6);
        assert!(c.fit_revenue < 0.0, "storage reduces export");
    }
}
