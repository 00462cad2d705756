//! Exhaustive grid search.

use tracing::{debug, info};

use super::grid::Grid;
use crate::economics::Evaluator;
use crate::types::EvaluatedCandidate;

/// First element for which no later element is strictly better.
///
/// `better(candidate, incumbent)` must return `true` only for a strict
/// improvement, so ties keep the earliest element.
pub fn first_best<'a, I, F>(items: I, better: F) -> Option<&'a EvaluatedCandidate>
where
    I: IntoIterator<Item = &'a EvaluatedCandidate>,
    F: Fn(&EvaluatedCandidate, &EvaluatedCandidate) -> bool,
{
    items
        .into_iter()
        .reduce(|best, c| if better(c, best) { c } else { best })
}

/// Every feasible configuration of a grid, evaluated, in enumeration order.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub evaluated: Vec<EvaluatedCandidate>,
}

impl SearchOutcome {
    pub fn len(&self) -> usize {
        self.evaluated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluated.is_empty()
    }

    /// Highest net profit; ties go to the first configuration enumerated.
    pub fn best(&self) -> Option<&EvaluatedCandidate> {
        first_best(&self.evaluated, |c, best| c.net_profit > best.net_profit)
    }
}

/// Evaluates every configuration the grid produces.
///
/// # Arguments
///
/// * `grid` - Search space, already restricted to feasible configurations
/// * `evaluator` - Household-specific evaluator
///
/// # Returns
///
/// The full evaluated set. An empty grid yields an empty outcome.
pub fn search(grid: &Grid, evaluator: &Evaluator) -> SearchOutcome {
    let evaluated: Vec<EvaluatedCandidate> = grid
        .configurations()
        .map(|config| evaluator.evaluate(config))
        .collect();

    let outcome = SearchOutcome { evaluated };
    info!(
        configurations = outcome.len(),
        mode = ?grid.mode(),
        "grid search complete"
    );
    if let Some(best) = outcome.best() {
        debug!(
            pv_kw = best.config.pv_kw,
            battery_kwh = best.config.battery_kwh,
            net_profit = best.net_profit,
            "best net profit"
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::BillingPlan;
    use crate::dispatch::{DispatchParams, LoadProfile};
    use crate::optimizer::grid::{BatteryAxis, RangeSpec, SearchMode};
    use crate::pricing::{MedianCoefficients, MedianRangePricing, PricingStrategy};

    fn evaluator() -> Evaluator {
        Evaluator::new(
            LoadProfile::new(5_000.0, 0.3),
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
    fn pv_only_search_returns_no_storage() {
        let grid = Grid::new(
            RangeSpec::new(0.0, 10.0, 0.5),
            BatteryAxis::Catalog(vec![0.0, 5.0, 9.8]),
            SearchMode::PvOnly,
        );
        let outcome = search(&grid, &evaluator());
        assert_eq!(outcome.len(), 21);
        assert!(outcome.evaluated.iter().all(|c| c.config.battery_kwh == 0.0));
    }

    #[test]
    fn search_never_offers_bare_battery() {
        let grid = Grid::new(
            RangeSpec::new(0.0, 4.0, 1.0),
            BatteryAxis::Catalog(vec![0.0, 5.0]),
            SearchMode::PvAndBattery,
        );
        let outcome = search(&grid, &evaluator());
        assert!(
            outcome
                .evaluated
                .iter()
                .all(|c| c.config.pv_kw > 0.0 || !c.config.has_battery())
        );
    }

    #[test]
    fn best_is_maximum_net_profit() {
        let grid = Grid::new(
            RangeSpec::new(1.0, 10.0, 0.5),
            BatteryAxis::Catalog(vec![0.0]),
            SearchMode::PvOnly,
        );
        let outcome = search(&grid, &evaluator());
        let best = outcome.best().map(|c| c.net_profit);
        let max = outcome
            .evaluated
            .iter()
            .map(|c| c.net_profit)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best, Some(max));
    }

    #[test]
    fn ties_keep_first_enumerated() {
        let outcome = search(
            &Grid::new(
                RangeSpec::new(2.0, 4.0, 1.0),
                BatteryAxis::Catalog(vec![0.0]),
                SearchMode::PvOnly,
            ),
            &evaluator(),
        );
        let mut tied = outcome.clone();
        for c in &mut tied.evaluated {
            c.net_profit = 1.0;
        }
        let first = tied.best().map(|c| c.key());
        assert_eq!(first, tied.evaluated.first().map(|c| c.key()));
    }

    #[test]
    fn empty_grid_has_no_best() {
        let grid = Grid::new(
            RangeSpec::new(5.0, 1.0, 1.0),
            BatteryAxis::Catalog(vec![0.0]),
            SearchMode::PvOnly,
        );
        let outcome = search(&grid, &evaluator());
        assert!(outcome.is_empty());
        assert!(outcome.best().is_none());
    }
}
