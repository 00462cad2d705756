//! End-to-end estimate: request in, labelled candidates and rankings out.
//!
//! [`run_estimate`] validates the configuration and the request, resolves the
//! household load and billing plan, evaluates every feasible configuration of
//! the grid, and hands the result set to the selector and the rankings.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::billing::{BillingPlan, PlanKind, USAGE_SEARCH_MAX_KWH, usage_from_bill};
use crate::catalog::ReferenceCatalog;
use crate::config::{ConfigError, EstimatorConfig, RequestConfig};
use crate::dispatch::LoadProfile;
use crate::economics::Evaluator;
use crate::optimizer::{
    Grid, Rankings, SearchMode, Selection, SelectionCriteria, SummaryStats, search, select,
};
use crate::pricing::PricingModel;
use crate::tariff::FitContract;
use crate::types::{EvaluatedCandidate, PriceBreakdown};

/// Evaluation horizon when the request does not set one.
pub const DEFAULT_EVALUATION_YEARS: u32 = 15;
/// First paid calendar year when the request does not set one.
pub const DEFAULT_FIT_START_YEAR: i32 = 2025;
/// Contract length when the request does not set one.
pub const DEFAULT_FIT_YEARS_REMAINING: u32 = 10;

/// Why an estimate could not be produced.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("invalid input: {field}: {message}")]
    InvalidInput { field: String, message: String },
    #[error("invalid configuration ({} error(s)): {}", .0.len(), join_errors(.0))]
    Config(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn invalid(field: &str, message: impl Into<String>) -> EstimateError {
    EstimateError::InvalidInput {
        field: field.to_string(),
        message: message.into(),
    }
}

/// How the household states its consumption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Consumption {
    /// Annual consumption in kWh.
    AnnualKwh { kwh: f64 },
    /// Monthly bill, optionally with the flat unit price it was charged at.
    MonthlyBill { bill: f64, unit_price: Option<f64> },
}

/// One calculation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateRequest {
    pub consumption: Consumption,
    /// Plan family; `None` uses the configured default.
    pub plan: Option<PlanKind>,
    /// Daytime share of consumption; `None` uses the configured default.
    pub day_fraction: Option<f64>,
    /// Already-installed PV (kW). Switches the search to a battery retrofit.
    pub existing_pv_kw: Option<f64>,
    pub fit_start_year: i32,
    pub fit_years_remaining: u32,
    pub evaluation_years: u32,
    /// Ceiling on the quoted price lower bound.
    pub budget: Option<f64>,
    pub include_battery: bool,
}

impl EstimateRequest {
    /// A request for `consumption` with every other field at its default.
    pub fn new(consumption: Consumption) -> Self {
        Self {
            consumption,
            plan: None,
            day_fraction: None,
            existing_pv_kw: None,
            fit_start_year: DEFAULT_FIT_START_YEAR,
            fit_years_remaining: DEFAULT_FIT_YEARS_REMAINING,
            evaluation_years: DEFAULT_EVALUATION_YEARS,
            budget: None,
            include_battery: false,
        }
    }

    /// Builds a request from the `[request]` table of a scenario.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if neither `annual_kwh` nor `monthly_bill` is
    /// given, or if `plan` names an unknown plan family.
    pub fn from_config(cfg: &RequestConfig) -> Result<Self, EstimateError> {
        let consumption = match (cfg.annual_kwh, cfg.monthly_bill) {
            (Some(kwh), _) => Consumption::AnnualKwh { kwh },
            (None, Some(bill)) => Consumption::MonthlyBill {
                bill,
                unit_price: cfg.unit_price,
            },
            (None, None) => {
                return Err(invalid(
                    "request",
                    "either annual_kwh or monthly_bill is required",
                ));
            }
        };

        let plan = match cfg.plan.as_deref() {
            Some(name) => Some(PlanKind::from_name(name).ok_or_else(|| {
                invalid(
                    "request.plan",
                    format!(
                        "must be one of {}, got \"{name}\"",
                        PlanKind::NAMES.join(", ")
                    ),
                )
            })?),
            None => None,
        };

        Ok(Self {
            consumption,
            plan,
            day_fraction: cfg.day_fraction,
            existing_pv_kw: cfg.existing_pv_kw,
            fit_start_year: cfg.fit_start_year.unwrap_or(DEFAULT_FIT_START_YEAR),
            fit_years_remaining: cfg
                .fit_years_remaining
                .unwrap_or(DEFAULT_FIT_YEARS_REMAINING),
            evaluation_years: cfg.evaluation_years.unwrap_or(DEFAULT_EVALUATION_YEARS),
            budget: cfg.budget,
            include_battery: cfg.include_battery.unwrap_or(false),
        })
    }

    /// Checks scalar inputs before any calculation runs.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint as `InvalidInput`.
    pub fn validate(&self) -> Result<(), EstimateError> {
        match self.consumption {
            Consumption::AnnualKwh { kwh } => {
                if !(kwh.is_finite() && kwh > 0.0) {
                    return Err(invalid("annual_kwh", "must be > 0"));
                }
            }
            Consumption::MonthlyBill { bill, unit_price } => {
                if !(bill.is_finite() && bill > 0.0) {
                    return Err(invalid("monthly_bill", "must be > 0"));
                }
                if unit_price.is_some_and(|p| !(p.is_finite() && p > 0.0)) {
                    return Err(invalid("unit_price", "must be > 0"));
                }
            }
        }
        if self
            .day_fraction
            .is_some_and(|f| !(0.0..=1.0).contains(&f))
        {
            return Err(invalid("day_fraction", "must be in [0.0, 1.0]"));
        }
        if self
            .existing_pv_kw
            .is_some_and(|kw| !(kw.is_finite() && kw >= 0.0))
        {
            return Err(invalid("existing_pv_kw", "must be >= 0"));
        }
        if self.evaluation_years == 0 {
            return Err(invalid("evaluation_years", "must be > 0"));
        }
        if self.budget.is_some_and(|b| !(b.is_finite() && b >= 0.0)) {
            return Err(invalid("budget", "must be >= 0"));
        }
        Ok(())
    }

    pub fn fit_contract(&self) -> FitContract {
        FitContract {
            start_year: self.fit_start_year,
            years_remaining: self.fit_years_remaining,
        }
    }

    /// Existing PV capacity, if any is installed.
    pub fn existing_pv(&self) -> Option<f64> {
        self.existing_pv_kw.filter(|kw| *kw > 0.0)
    }

    fn search_mode(&self) -> SearchMode {
        match self.existing_pv() {
            Some(existing_pv_kw) => SearchMode::BatteryRetrofit { existing_pv_kw },
            None if self.include_battery => SearchMode::PvAndBattery,
            None => SearchMode::PvOnly,
        }
    }
}

/// Everything one calculation produces.
#[derive(Debug, Clone, Serialize)]
pub struct EstimateOutput {
    pub request: EstimateRequest,
    /// Plan family the bills were computed with.
    pub plan: PlanKind,
    pub annual_load_kwh: f64,
    pub day_fraction: f64,
    /// Feed-in rate for each evaluated year.
    pub fit_rates: Vec<f64>,
    pub pricing_strategy: &'static str,
    /// Presentation rounding unit for prices.
    pub rounding_unit: f64,
    pub selection: Selection,
    pub stats: SummaryStats,
    pub rankings: Rankings,
    /// Every evaluated configuration, in enumeration order.
    #[serde(skip)]
    pub grid: Vec<EvaluatedCandidate>,
}

impl EstimateOutput {
    pub fn horizon_years(&self) -> u32 {
        self.fit_rates.len() as u32
    }

    /// Price rounded for presentation; economics always use the exact price.
    pub fn presented_price(&self, candidate: &EvaluatedCandidate) -> PriceBreakdown {
        candidate.price.rounded(self.rounding_unit)
    }

    pub fn messages(&self) -> &[String] {
        &self.selection.messages
    }
}

struct ResolvedLoad {
    plan_kind: PlanKind,
    plan: BillingPlan,
    monthly_kwh: f64,
}

fn resolve_load(
    config: &EstimatorConfig,
    request: &EstimateRequest,
    day_fraction: f64,
) -> Result<ResolvedLoad, EstimateError> {
    let kind = request
        .plan
        .or_else(|| config.default_plan())
        .unwrap_or(PlanKind::Flat);

    match request.consumption {
        Consumption::AnnualKwh { kwh } => Ok(ResolvedLoad {
            plan_kind: kind,
            plan: config.billing_plan(kind, None),
            monthly_kwh: kwh / 12.0,
        }),
        Consumption::MonthlyBill {
            bill,
            unit_price: Some(unit_price),
        } => {
            let fee = config.billing.fixed_fee;
            let monthly_kwh = usage_from_bill(bill, unit_price, fee);
            if monthly_kwh <= 0.0 {
                return Err(invalid(
                    "monthly_bill",
                    format!("must exceed the fixed fee of {fee}"),
                ));
            }
            Ok(ResolvedLoad {
                plan_kind: PlanKind::Flat,
                plan: BillingPlan::flat(unit_price, fee),
                monthly_kwh,
            })
        }
        Consumption::MonthlyBill {
            bill,
            unit_price: None,
        } => {
            let plan = config.billing_plan(kind, None);
            let monthly_kwh = plan
                .usage_for_cost(bill * 12.0, day_fraction)
                .filter(|kwh| *kwh > 0.0)
                .ok_or_else(|| {
                    invalid(
                        "monthly_bill",
                        format!(
                            "no monthly usage between 0 and {USAGE_SEARCH_MAX_KWH} kWh matches this bill under the {} plan",
                            kind.name()
                        ),
                    )
                })?;
            Ok(ResolvedLoad {
                plan_kind: kind,
                plan,
                monthly_kwh,
            })
        }
    }
}

/// Runs one calculation.
///
/// # Arguments
///
/// * `config` - Estimator configuration
/// * `catalog` - Reference tariff table and battery sizes
/// * `request` - Household inputs
///
/// # Errors
///
/// Returns `Config` if the configuration fails validation, or
/// `InvalidInput` if the request is rejected. Empty grids and empty
/// selection slots are not errors.
pub fn run_estimate(
    config: &EstimatorConfig,
    catalog: &ReferenceCatalog,
    request: &EstimateRequest,
) -> Result<EstimateOutput, EstimateError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(EstimateError::Config(errors));
    }
    request.validate()?;

    let day_fraction = request.day_fraction.unwrap_or(config.dispatch.day_fraction);
    let resolved = resolve_load(config, request, day_fraction)?;
    let load = LoadProfile::new(resolved.monthly_kwh * 12.0, day_fraction);
    info!(
        plan = resolved.plan_kind.name(),
        annual_load_kwh = load.annual_kwh,
        day_fraction,
        "household load resolved"
    );

    let fit_rates = config
        .feed_in_tariff(catalog)
        .rates_for_horizon(request.fit_contract(), request.evaluation_years);
    debug!(?fit_rates, "feed-in series");

    let pricing = config.pricing_strategy();
    let pricing_strategy = pricing.strategy_name();
    let mut evaluator = Evaluator::new(
        load,
        resolved.plan,
        config.dispatch_params(),
        pricing,
        fit_rates.clone(),
    );
    if let Some(kw) = request.existing_pv() {
        evaluator = evaluator.with_existing_pv(kw);
    }

    let mode = request.search_mode();
    let grid = Grid::new(config.search.pv, config.battery_axis(catalog), mode);
    let outcome = search(&grid, &evaluator);

    let criteria = SelectionCriteria {
        budget: request.budget,
        include_battery: mode.includes_battery(),
    };
    let selection = select(&outcome.evaluated, &criteria);
    info!(
        candidates = selection.candidates.len(),
        diagnostics = selection.messages.len(),
        "candidates selected"
    );
    for message in &selection.messages {
        info!("{message}");
    }

    let stats = SummaryStats::from_candidates(&outcome.evaluated);
    let rankings = Rankings::compute(
        &outcome.evaluated,
        &config.selection.tolerances,
        request.evaluation_years,
        config.selection.top_n,
    );
    debug!("\n{rankings}");

    Ok(EstimateOutput {
        request: request.clone(),
        plan: resolved.plan_kind,
        annual_load_kwh: load.annual_kwh,
        day_fraction,
        fit_rates,
        pricing_strategy,
        rounding_unit: config.pricing.rounding_unit,
        selection,
        stats,
        rankings,
        grid: outcome.evaluated,
    })
}
