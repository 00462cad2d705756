//! solar-quote entry point: CLI wiring and report output.

use std::process;

use clap::Parser;
use tracing::info;

use solar_quote::cli::Args;
use solar_quote::dispatch::{DailyDispatch, LoadProfile};
use solar_quote::estimate::{EstimateRequest, run_estimate};
use solar_quote::io::export::{export_grid_csv, export_trace_csv};
use solar_quote::report::{CustomerSummary, DebugReport};

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

fn main() {
    solar_quote::logging::init();
    let args = Args::parse();

    let mut config = args.load_config().unwrap_or_else(|e| fail(e));

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    args.apply_to(&mut config.request);
    let request = EstimateRequest::from_config(&config.request).unwrap_or_else(|e| fail(e));
    let trace = args.trace_configuration().unwrap_or_else(|e| fail(e));

    let catalog = config.load_catalog();
    let output = run_estimate(&config, &catalog, &request).unwrap_or_else(|e| fail(e));

    print!("{}", CustomerSummary::new(&output));
    if args.debug {
        println!();
        print!("{}", DebugReport::new(&output, &catalog));
    }

    if let Some(path) = &args.grid_out {
        if let Err(e) = export_grid_csv(&output.grid, path) {
            fail(format!("failed to write grid CSV: {e}"));
        }
        info!(path = %path.display(), rows = output.grid.len(), "grid written");
    }

    if let (Some(path), Some(traced)) = (&args.trace_out, trace) {
        let load = LoadProfile::new(output.annual_load_kwh, output.day_fraction);
        let days: Vec<_> =
            DailyDispatch::new(&load, traced, &config.dispatch_params()).collect();
        if let Err(e) = export_trace_csv(&days, path) {
            fail(format!("failed to write trace CSV: {e}"));
        }
        info!(path = %path.display(), "dispatch trace written");
    }

    #[cfg(feature = "api")]
    if args.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(solar_quote::api::AppState { output });
        let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
        let rt = tokio::runtime::Runtime::new()
            .unwrap_or_else(|e| fail(format!("failed to create tokio runtime: {e}")));
        if let Err(e) = rt.block_on(solar_quote::api::serve(state, addr)) {
            fail(format!("server error: {e}"));
        }
    }
}
