//! API response and query types.
//!
//! Grid records use the same field names as the grid CSV export.

use serde::{Deserialize, Serialize};

use crate::billing::PlanKind;
use crate::estimate::{EstimateOutput, EstimateRequest};
use crate::optimizer::{CandidateLabel, LabeledCandidate, SummaryStats};
use crate::types::{EvaluatedCandidate, PriceBreakdown};

/// Request echo, summary statistics and diagnostics.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub request: EstimateRequest,
    pub plan: PlanKind,
    pub annual_load_kwh: f64,
    pub day_fraction: f64,
    pub pricing_strategy: &'static str,
    pub horizon_years: u32,
    pub fit_rates: Vec<f64>,
    pub grid_size: usize,
    pub stats: SummaryStats,
    /// Diagnostics for selection slots that could not be filled.
    pub messages: Vec<String>,
}

impl From<&EstimateOutput> for SummaryResponse {
    fn from(out: &EstimateOutput) -> Self {
        Self {
            request: out.request.clone(),
            plan: out.plan,
            annual_load_kwh: out.annual_load_kwh,
            day_fraction: out.day_fraction,
            pricing_strategy: out.pricing_strategy,
            horizon_years: out.horizon_years(),
            fit_rates: out.fit_rates.clone(),
            grid_size: out.grid.len(),
            stats: out.stats,
            messages: out.messages().to_vec(),
        }
    }
}

/// One recommended configuration with its presentation price.
#[derive(Debug, Serialize)]
pub struct CandidateRecord {
    pub label: CandidateLabel,
    /// Human-readable label.
    pub title: String,
    pub pv_kw: f64,
    pub battery_kwh: f64,
    /// Price rounded for presentation.
    pub price: PriceBreakdown,
    pub net_profit: f64,
    /// `None` when the price is not positive.
    pub roi_pct: Option<f64>,
    /// `None` when payback is not reached within the horizon.
    pub payback_years: Option<f64>,
}

impl CandidateRecord {
    pub fn new(pick: &LabeledCandidate, output: &EstimateOutput) -> Self {
        let c = &pick.candidate;
        Self {
            label: pick.label,
            title: pick.label.to_string(),
            pv_kw: c.config.pv_kw,
            battery_kwh: c.config.battery_kwh,
            price: output.presented_price(c),
            net_profit: c.net_profit,
            roi_pct: c.roi.map(|r| r * 100.0),
            payback_years: c.payback.years(),
        }
    }
}

/// One evaluated grid point, flattened.
#[derive(Debug, Serialize)]
pub struct GridRecord {
    pub pv_kw: f64,
    pub battery_kwh: f64,
    pub price_quoted: f64,
    pub price_low: f64,
    pub price_high: f64,
    pub generation_kwh: f64,
    pub self_consumption_kwh: f64,
    pub sold_kwh: f64,
    pub annual_savings: f64,
    pub total_benefit: f64,
    pub net_profit: f64,
    pub roi: Option<f64>,
    pub payback_years: Option<f64>,
}

impl From<&EvaluatedCandidate> for GridRecord {
    fn from(c: &EvaluatedCandidate) -> Self {
        let s = &c.simulation;
        Self {
            pv_kw: c.config.pv_kw,
            battery_kwh: c.config.battery_kwh,
            price_quoted: c.price.quoted(),
            price_low: c.price.lower_bound(),
            price_high: c.price.upper_bound(),
            generation_kwh: s.annual_generation_kwh,
            self_consumption_kwh: s.annual_self_consumption_kwh,
            sold_kwh: s.annual_sold_kwh,
            annual_savings: s.annual_savings,
            total_benefit: c.total_benefit,
            net_profit: c.net_profit,
            roi: c.roi,
            payback_years: c.payback.years(),
        }
    }
}

/// Optional PV range filter for the grid endpoint.
#[derive(Debug, Deserialize)]
pub struct GridQuery {
    /// Lowest PV capacity (inclusive, kW).
    pub pv_min: Option<f64>,
    /// Highest PV capacity (inclusive, kW).
    pub pv_max: Option<f64>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BundleCost, Payback, SimulationResult, SystemConfiguration};

    #[test]
    fn grid_record_flattens_candidate() {
        let c = EvaluatedCandidate {
            config: SystemConfiguration::new(4.5, 5.6),
            price: PriceBreakdown::Bundle(BundleCost {
                pv_cost: 1_000_000.0,
                battery_cost: 800_000.0,
                bundle_discount: 60_000.0,
                total: 1_740_000.0,
            }),
            simulation: SimulationResult {
                annual_load_kwh: 4_800.0,
                annual_generation_kwh: 5_091.75,
                annual_self_consumption_kwh: 2_700.0,
                annual_sold_kwh: 2_300.0,
                annual_grid_kwh: 2_100.0,
                cost_before: 181_200.0,
                cost_after: 89_400.0,
                annual_savings: 91_800.0,
            },
            savings_benefit: 1_377_000.0,
            fit_revenue: 350_000.0,
            total_benefit: 1_727_000.0,
            net_profit: -13_000.0,
            roi: Some(-13_000.0 / 1_740_000.0),
            payback: Payback::Unresolved,
        };
        let record = GridRecord::from(&c);

        assert_eq!(record.pv_kw, 4.5);
        assert_eq!(record.battery_kwh, 5.6);
        assert_eq!(record.price_quoted, 1_740_000.0);
        assert_eq!(record.price_low, 1_740_000.0);
        assert_eq!(record.sold_kwh, 2_300.0);
        assert_eq!(record.net_profit, -13_000.0);
        assert_eq!(record.payback_years, None);
    }
}
