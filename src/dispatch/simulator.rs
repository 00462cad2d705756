//! Representative-year energy dispatch.
//!
//! A year is 365 identical average days. Each day PV serves the daytime load
//! first, tops up the battery with what is left, and exports the rest; at
//! night the battery serves what it can and the grid covers the remainder.
//! The battery's state of charge carries over from one day to the next.

use serde::{Deserialize, Serialize};

use super::storage::Storage;
use crate::billing::BillingPlan;
use crate::types::{SimulationResult, SystemConfiguration};

/// Days in the representative year.
pub const DAYS_PER_YEAR: usize = 365;

/// Physical assumptions shared by every simulated configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DispatchParams {
    /// Annual PV yield per installed kW (kWh/kW/year).
    pub pv_yield_per_kw_year: f64,
    /// Battery round-trip efficiency (0 < x <= 1.0).
    pub round_trip_efficiency: f64,
    /// Share of battery nameplate capacity that may be cycled (0..=1.0).
    pub usable_fraction: f64,
}

/// Household consumption and its day/night split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadProfile {
    /// Consumption over a year (kWh).
    pub annual_kwh: f64,
    /// Share of consumption falling in daylight hours (0..=1.0).
    pub day_fraction: f64,
}

impl LoadProfile {
    pub fn new(annual_kwh: f64, day_fraction: f64) -> Self {
        Self {
            annual_kwh: annual_kwh.max(0.0),
            day_fraction: day_fraction.clamp(0.0, 1.0),
        }
    }

    pub fn monthly_kwh(&self) -> f64 {
        self.annual_kwh / 12.0
    }
}

/// Energy flows of one simulated day (kWh).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayFlow {
    /// Day index within the year (0-based).
    pub day: usize,
    pub generation_kwh: f64,
    /// PV consumed directly by the daytime load.
    pub direct_use_kwh: f64,
    /// PV surplus absorbed by the battery, before charging losses.
    pub charge_input_kwh: f64,
    /// Energy added to the SoC (`charge_input_kwh * eta`).
    pub charge_stored_kwh: f64,
    pub sold_kwh: f64,
    /// Battery energy delivered to the night load.
    pub discharged_kwh: f64,
    /// Day and night load still drawn from the grid.
    pub grid_import_kwh: f64,
    /// SoC at the end of the day.
    pub soc_kwh: f64,
}

impl DayFlow {
    /// Load met on site: direct PV plus battery discharge.
    pub fn self_consumed_kwh(&self) -> f64 {
        self.direct_use_kwh + self.discharged_kwh
    }
}

/// Day-by-day dispatch over one representative year.
///
/// Yields exactly [`DAYS_PER_YEAR`] [`DayFlow`] records.
#[derive(Debug, Clone)]
pub struct DailyDispatch {
    storage: Storage,
    generation_per_day: f64,
    day_load: f64,
    night_load: f64,
    day: usize,
}

impl DailyDispatch {
    pub fn new(load: &LoadProfile, config: SystemConfiguration, params: &DispatchParams) -> Self {
        let load_per_day = load.annual_kwh / DAYS_PER_YEAR as f64;
        let day_load = load_per_day * load.day_fraction;
        Self {
            storage: Storage::new(
                config.battery_kwh,
                params.usable_fraction,
                params.round_trip_efficiency,
            ),
            generation_per_day: config.pv_kw * params.pv_yield_per_kw_year / DAYS_PER_YEAR as f64,
            day_load,
            night_load: load_per_day - day_load,
            day: 0,
        }
    }

    pub fn usable_capacity_kwh(&self) -> f64 {
        self.storage.usable_capacity_kwh()
    }
}

impl Iterator for DailyDispatch {
    type Item = DayFlow;

    fn next(&mut self) -> Option<DayFlow> {
        if self.day >= DAYS_PER_YEAR {
            return None;
        }

        let generation = self.generation_per_day;
        let direct_use = generation.min(self.day_load);
        let surplus = generation - direct_use;

        let soc_before = self.storage.soc_kwh();
        let charge_input = self.storage.charge(surplus);
        let charge_stored = self.storage.soc_kwh() - soc_before;
        let sold = (surplus - charge_input).max(0.0);

        let discharged = self.storage.discharge(self.night_load);
        let grid_import =
            (self.day_load - direct_use).max(0.0) + (self.night_load - discharged).max(0.0);

        let flow = DayFlow {
            day: self.day,
            generation_kwh: generation,
            direct_use_kwh: direct_use,
            charge_input_kwh: charge_input,
            charge_stored_kwh: charge_stored,
            sold_kwh: sold,
            discharged_kwh: discharged,
            grid_import_kwh: grid_import,
            soc_kwh: self.storage.soc_kwh(),
        };
        self.day += 1;
        Some(flow)
    }
}

/// Simulates one representative year and bills it before and after installation.
///
/// # Arguments
///
/// * `load` - Annual consumption and day share
/// * `config` - Installed PV and battery capacity
/// * `params` - Yield and battery assumptions
/// * `plan` - Rate plan used for both bills
///
/// # Returns
///
/// Annual totals. Residual grid energy is `load - self consumption` and is
/// billed with the same day/night split as the original load.
pub fn simulate_year(
    load: &LoadProfile,
    config: SystemConfiguration,
    params: &DispatchParams,
    plan: &BillingPlan,
) -> SimulationResult {
    let mut generation = 0.0;
    let mut self_consumption = 0.0;
    let mut sold = 0.0;

    for flow in DailyDispatch::new(load, config, params) {
        generation += flow.generation_kwh;
        self_consumption += flow.self_consumed_kwh();
        sold += flow.sold_kwh;
    }

    let grid = (load.annual_kwh - self_consumption).max(0.0);
    let cost_before = plan.cost_for_usage(load.monthly_kwh(), load.day_fraction);
    let cost_after = plan.cost_for_usage(grid / 12.0, load.day_fraction);

    SimulationResult {
        annual_load_kwh: load.annual_kwh,
        annual_generation_kwh: generation,
        annual_self_consumption_kwh: self_consumption,
        annual_sold_kwh: sold,
        annual_grid_kwh: grid,
        cost_before,
        cost_after,
        annual_savings: cost_before - cost_after,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn params(round_trip_efficiency: f64) -> DispatchParams {
        DispatchParams {
            pv_yield_per_kw_year: 3.1 * 365.0,
            round_trip_efficiency,
            usable_fraction: 0.9,
        }
    }

    fn flat_plan() -> BillingPlan {
        BillingPlan::flat(34.0, 1_500.0)
    }

    #[test]
    fn yields_one_flow_per_day() {
        let load = LoadProfile::new(4_000.0, 0.3);
        let days = DailyDispatch::new(&load, SystemConfiguration::new(5.0, 5.0), &params(0.9));
        assert_eq!(days.count(), DAYS_PER_YEAR);
    }

    #[test]
    fn lossless_pv_only_exports_exact_surplus() {
        // 5 kW * 3.1 = 15.5 kWh/day against 3.0 kWh of daytime load.
        let load = LoadProfile::new(3_650.0, 0.3);
        let config = SystemConfiguration::pv_only(5.0);
        for flow in DailyDispatch::new(&load, config, &params(1.0)) {
            assert_relative_eq!(flow.sold_kwh, 15.5 - 3.0, epsilon = 1e-9);
            assert_eq!(flow.charge_input_kwh, 0.0);
            assert_eq!(flow.discharged_kwh, 0.0);
        }
    }

    #[test]
    fn zero_battery_sells_everything_beyond_daytime_use() {
        let load = LoadProfile::new(5_000.0, 0.4);
        let p = params(0.9);
        let r = simulate_year(&load, SystemConfiguration::pv_only(3.0), &p, &flat_plan());

        let generation = 3.0 * p.pv_yield_per_kw_year;
        let day_use = (generation.min(load.annual_kwh * load.day_fraction)).max(0.0);
        assert_relative_eq!(r.annual_generation_kwh, generation, epsilon = 1e-6);
        assert_relative_eq!(r.annual_sold_kwh, (generation - day_use).max(0.0), epsilon = 1e-6);
        assert_relative_eq!(r.annual_self_consumption_kwh, day_use, epsilon = 1e-6);
    }

    #[test]
    fn zero_pv_generates_and_sells_nothing() {
        let load = LoadProfile::new(4_000.0, 0.3);
        let r = simulate_year(&load, SystemConfiguration::new(0.0, 10.0), &params(0.9), &flat_plan());
        assert_eq!(r.annual_generation_kwh, 0.0);
        assert_eq!(r.annual_sold_kwh, 0.0);
        assert_eq!(r.annual_self_consumption_kwh, 0.0);
        assert_relative_eq!(r.annual_savings, 0.0);
    }

    #[test]
    fn every_day_conserves_pv_and_bounds_soc() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let load = LoadProfile::new(rng.random_range(500.0..12_000.0), rng.random_range(0.0..=1.0));
            let config = SystemConfiguration::new(
                rng.random_range(0.0..15.0),
                rng.random_range(0.0..20.0),
            );
            let p = params(rng.random_range(0.5..=1.0));
            let dispatch = DailyDispatch::new(&load, config, &p);
            let capacity = dispatch.usable_capacity_kwh();

            for flow in dispatch {
                let accounted = flow.direct_use_kwh + flow.charge_input_kwh + flow.sold_kwh;
                assert_relative_eq!(flow.generation_kwh, accounted, epsilon = 1e-9);
                assert!(flow.soc_kwh >= 0.0);
                assert!(flow.soc_kwh <= capacity + 1e-12);
            }
        }
    }

    #[test]
    fn battery_moves_surplus_to_night() {
        let load = LoadProfile::new(3_650.0, 0.3); // 3 kWh day, 7 kWh night
        let p = params(1.0);
        let without = simulate_year(&load, SystemConfiguration::pv_only(4.0), &p, &flat_plan());
        let with = simulate_year(&load, SystemConfiguration::new(4.0, 10.0), &p, &flat_plan());

        assert!(with.annual_self_consumption_kwh > without.annual_self_consumption_kwh);
        assert!(with.annual_sold_kwh < without.annual_sold_kwh);
        assert!(with.annual_savings > without.annual_savings);
    }

    #[test]
    fn soc_carries_over_between_days() {
        // Surplus 6.3 kWh/day, night 0.5 kWh/day: the battery fills over several days.
        let load = LoadProfile::new(365.0 * 3.5, 6.0 / 7.0);
        let mut days = DailyDispatch::new(&load, SystemConfiguration::new(3.0, 40.0), &params(1.0));
        let first = days.next().map(|f| f.soc_kwh).unwrap_or_default();
        let second = days.next().map(|f| f.soc_kwh).unwrap_or_default();
        assert!(second > first, "SoC should accumulate: {first} -> {second}");
    }

    #[test]
    fn losses_reduce_delivered_energy() {
        // 3.2 kWh/day surplus never covers the 7 kWh night load.
        let load = LoadProfile::new(3_650.0, 0.3);
        let config = SystemConfiguration::new(2.0, 10.0);
        let lossless = simulate_year(&load, config, &params(1.0), &flat_plan());
        let lossy = simulate_year(&load, config, &params(0.8), &flat_plan());
        assert!(lossy.annual_self_consumption_kwh < lossless.annual_self_consumption_kwh);
    }

    #[test]
    fn savings_match_flat_unit_price() {
        let load = LoadProfile::new(4_380.0, 0.3);
        let r = simulate_year(&load, SystemConfiguration::new(4.0, 5.0), &params(0.9), &flat_plan());
        assert_relative_eq!(r.annual_savings, r.annual_self_consumption_kwh * 34.0, epsilon = 1e-6);
        assert_relative_eq!(
            r.annual_grid_kwh,
            load.annual_kwh - r.annual_self_consumption_kwh,
            epsilon = 1e-9
        );
    }
}
