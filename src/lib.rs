//! Residential solar PV and battery sales estimator.
//!
//! Simulates candidate systems over a representative year, prices them,
//! projects benefits over a multi-year horizon, and selects and ranks the
//! configurations worth quoting.

/// REST API over one estimate.
#[cfg(feature = "api")]
pub mod api;
/// Billing plans and cost/usage conversion.
pub mod billing;
/// Reference tariff and battery catalogs.
pub mod catalog;
/// Command-line arguments.
pub mod cli;
/// TOML configuration and presets.
pub mod config;
/// Battery model and daily dispatch.
pub mod dispatch;
/// Horizon benefits, payback and evaluation.
pub mod economics;
/// End-to-end estimate pipeline.
pub mod estimate;
/// CSV export.
pub mod io;
/// Tracing subscriber setup.
pub mod logging;
/// Grid search, selection and rankings.
pub mod optimizer;
/// Pricing strategies.
pub mod pricing;
/// Customer and contractor reports.
pub mod report;
/// Feed-in tariff schedules.
pub mod tariff;
/// Shared data model.
pub mod types;
