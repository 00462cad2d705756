//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use solar_quote::billing::BillingPlan;
use solar_quote::catalog::ReferenceCatalog;
use solar_quote::config::EstimatorConfig;
use solar_quote::dispatch::{DispatchParams, LoadProfile};
use solar_quote::economics::Evaluator;
use solar_quote::estimate::{Consumption, EstimateOutput, EstimateRequest, run_estimate};
use solar_quote::optimizer::RangeSpec;
use solar_quote::tariff::FitContract;

/// `ibaraki` preset with a coarse PV axis (1.0-8.0 kW, step 0.5).
pub fn small_config() -> EstimatorConfig {
    let mut cfg = EstimatorConfig::ibaraki();
    cfg.search.pv = RangeSpec::new(1.0, 8.0, 0.5);
    cfg
}

/// Yield 3.1 kWh/kW/day, 90% round trip, 90% usable.
pub fn default_params() -> DispatchParams {
    EstimatorConfig::ibaraki().dispatch_params()
}

/// 4800 kWh/yr, 30% in daylight.
pub fn default_load() -> LoadProfile {
    LoadProfile::new(4_800.0, 0.3)
}

/// Evaluator for the default household on the `ibaraki` flat plan.
pub fn default_evaluator() -> Evaluator {
    let cfg = EstimatorConfig::ibaraki();
    let fit_rates = cfg
        .feed_in_tariff(&ReferenceCatalog::default())
        .rates_for_horizon(
            FitContract {
                start_year: 2025,
                years_remaining: 10,
            },
            15,
        );
    Evaluator::new(
        default_load(),
        BillingPlan::flat(34.0, 1_500.0),
        default_params(),
        cfg.pricing_strategy(),
        fit_rates,
    )
}

pub fn annual(kwh: f64) -> Consumption {
    Consumption::AnnualKwh { kwh }
}

/// Runs an estimate on [`small_config`] with the built-in catalog.
pub fn estimate(request: &EstimateRequest) -> EstimateOutput {
    run_estimate(&small_config(), &ReferenceCatalog::default(), request)
        .expect("estimate should succeed")
}
