//! Command-line arguments.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::{ConfigError, EstimatorConfig, RequestConfig};
use crate::types::SystemConfiguration;

#[derive(Debug, Parser)]
#[command(name = "solar-quote", author, version)]
#[command(about = "Sizes, prices and ranks residential PV and battery systems")]
#[command(
    long_about = "Estimates the PV and battery systems worth offering a household.\n\
    \nEvery configuration of the search grid is simulated over a representative year,\n\
    priced, and evaluated over the horizon; up to six labelled candidates are printed.\n\
    \nExamples:\n  \
    solar-quote --annual-kwh 4800\n  \
    solar-quote --monthly-bill 12000 --unit-price 34 --battery --budget 2500000\n  \
    solar-quote --preset time_of_use --annual-kwh 5200 --grid-out grid.csv"
)]
pub struct Args {
    /// Load the configuration from a TOML scenario file.
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (ibaraki, tiered, time_of_use).
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Annual consumption in kWh.
    #[arg(long, value_name = "KWH", conflicts_with = "monthly_bill")]
    pub annual_kwh: Option<f64>,

    /// Typical monthly electricity bill.
    #[arg(long, value_name = "AMOUNT")]
    pub monthly_bill: Option<f64>,

    /// Flat unit price the bill was charged at.
    #[arg(long, value_name = "PRICE", requires = "monthly_bill")]
    pub unit_price: Option<f64>,

    /// Rate plan: flat, tiered or time-of-use.
    #[arg(long, value_name = "PLAN")]
    pub plan: Option<String>,

    /// Share of consumption during daylight hours (0.0-1.0).
    #[arg(long, value_name = "FRACTION")]
    pub day_fraction: Option<f64>,

    /// Ceiling on the lowest quoted price.
    #[arg(long, value_name = "AMOUNT")]
    pub budget: Option<f64>,

    /// Evaluation horizon in years.
    #[arg(long, value_name = "N")]
    pub years: Option<u32>,

    /// Consider configurations with a battery.
    #[arg(long)]
    pub battery: bool,

    /// PV already installed; only a battery is added.
    #[arg(long, value_name = "KW")]
    pub existing_pv_kw: Option<f64>,

    /// Write every evaluated configuration to a CSV file.
    #[arg(long, value_name = "PATH")]
    pub grid_out: Option<PathBuf>,

    /// Write the daily dispatch of one configuration to a CSV file.
    #[arg(long, value_name = "PATH", requires = "trace_pv")]
    pub trace_out: Option<PathBuf>,

    /// PV capacity of the traced configuration (kW).
    #[arg(long, value_name = "KW", requires = "trace_out")]
    pub trace_pv: Option<f64>,

    /// Battery capacity of the traced configuration (kWh).
    #[arg(long, value_name = "KWH", default_value_t = 0.0)]
    pub trace_battery: f64,

    /// Print the contractor report after the summary.
    #[arg(long)]
    pub debug: bool,

    /// Serve the result over HTTP after the calculation.
    #[cfg(feature = "api")]
    #[arg(long)]
    pub serve: bool,

    /// API server port.
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000)]
    pub port: u16,
}

impl Args {
    /// Loads the configuration: `--scenario`, then `--preset`, then `ibaraki`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the scenario cannot be read or the preset is unknown.
    pub fn load_config(&self) -> Result<EstimatorConfig, ConfigError> {
        match (&self.scenario, &self.preset) {
            (Some(path), _) => EstimatorConfig::from_toml_file(Path::new(path)),
            (None, Some(name)) => EstimatorConfig::from_preset(name),
            (None, None) => Ok(EstimatorConfig::ibaraki()),
        }
    }

    /// The configuration named by `--trace-pv` and `--trace-battery`, if a
    /// trace was requested.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if either capacity is negative or not finite.
    pub fn trace_configuration(&self) -> Result<Option<SystemConfiguration>, ConfigError> {
        let Some(pv) = self.trace_pv else {
            return Ok(None);
        };
        SystemConfiguration::try_new(pv, self.trace_battery)
            .map(Some)
            .ok_or_else(|| ConfigError {
                field: "trace".to_string(),
                message: "--trace-pv and --trace-battery must be finite and >= 0".to_string(),
            })
    }

    /// Overlays command-line values on the scenario's request table.
    pub fn apply_to(&self, request: &mut RequestConfig) {
        if let Some(kwh) = self.annual_kwh {
            request.annual_kwh = Some(kwh);
            request.monthly_bill = None;
            request.unit_price = None;
        }
        if let Some(bill) = self.monthly_bill {
            request.monthly_bill = Some(bill);
            request.annual_kwh = None;
            request.unit_price = self.unit_price;
        }
        if let Some(plan) = &self.plan {
            request.plan = Some(plan.clone());
        }
        if let Some(f) = self.day_fraction {
            request.day_fraction = Some(f);
        }
        if let Some(b) = self.budget {
            request.budget = Some(b);
        }
        if let Some(y) = self.years {
            request.evaluation_years = Some(y);
        }
        if self.battery {
            request.include_battery = Some(true);
        }
        if let Some(kw) = self.existing_pv_kw {
            request.existing_pv_kw = Some(kw);
        }
    }
}
