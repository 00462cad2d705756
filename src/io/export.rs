//! CSV export for the evaluated grid and the daily dispatch trace.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::dispatch::DayFlow;
use crate::types::EvaluatedCandidate;

/// Column header for the evaluated grid.
const GRID_HEADER: &str = "pv_kw,battery_kwh,price_quoted,price_low,price_high,\
                           generation_kwh,self_consumption_kwh,sold_kwh,annual_savings,\
                           total_benefit,net_profit,roi,payback_years";

/// Column header for the daily dispatch trace.
const TRACE_HEADER: &str = "day,generation_kwh,self_consumed_kwh,charge_input_kwh,\
                            charge_stored_kwh,sold_kwh,discharged_kwh,grid_import_kwh,soc_kwh";

fn header(columns: &str) -> impl Iterator<Item = &str> {
    columns.split(',').map(str::trim)
}

/// Exports the evaluated grid to a CSV file at the given path.
///
/// One row per configuration, in enumeration order. Output is deterministic
/// for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_grid_csv(grid: &[EvaluatedCandidate], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_grid_csv(grid, io::BufWriter::new(file))
}

/// Writes the evaluated grid as CSV to any writer.
///
/// `roi` is empty when the price is not positive; `payback_years` is empty
/// when payback is not reached within the horizon.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_grid_csv(grid: &[EvaluatedCandidate], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(GRID_HEADER))?;

    for c in grid {
        let s = &c.simulation;
        wtr.write_record(&[
            format!("{:.2}", c.config.pv_kw),
            format!("{:.1}", c.config.battery_kwh),
            format!("{:.0}", c.price.quoted()),
            format!("{:.0}", c.price.lower_bound()),
            format!("{:.0}", c.price.upper_bound()),
            format!("{:.2}", s.annual_generation_kwh),
            format!("{:.2}", s.annual_self_consumption_kwh),
            format!("{:.2}", s.annual_sold_kwh),
            format!("{:.0}", s.annual_savings),
            format!("{:.0}", c.total_benefit),
            format!("{:.0}", c.net_profit),
            c.roi.map(|r| format!("{r:.4}")).unwrap_or_default(),
            c.payback
                .years()
                .map(|y| format!("{y:.2}"))
                .unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports a daily dispatch trace to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_trace_csv(days: &[DayFlow], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_trace_csv(days, io::BufWriter::new(file))
}

/// Writes a daily dispatch trace as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_trace_csv(days: &[DayFlow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(TRACE_HEADER))?;

    for d in days {
        wtr.write_record(&[
            d.day.to_string(),
            format!("{:.4}", d.generation_kwh),
            format!("{:.4}", d.self_consumed_kwh()),
            format!("{:.4}", d.charge_input_kwh),
            format!("{:.4}", d.charge_stored_kwh),
            format!("{:.4}", d.sold_kwh),
            format!("{:.4}", d.discharged_kwh),
            format!("{:.4}", d.grid_import_kwh),
            format!("{:.4}", d.soc_kwh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DailyDispatch, DispatchParams, LoadProfile};
    use crate::types::{BundleCost, Payback, PriceBreakdown, SimulationResult, SystemConfiguration};

    fn make_candidate(pv: f64, payback: Payback) -> EvaluatedCandidate {
        EvaluatedCandidate {
            config: SystemConfiguration::new(pv, 5.6),
            price: PriceBreakdown::Bundle(BundleCost {
                pv_cost: 900_000.0,
                battery_cost: 1_000_000.0,
                bundle_discount: 100_000.0,
                total: 1_800_000.0,
            }),
            simulation: SimulationResult {
                annual_load_kwh: 4_800.0,
                annual_generation_kwh: 5_657.5,
                annual_self_consumption_kwh: 2_900.0,
                annual_sold_kwh: 2_500.0,
                annual_grid_kwh: 1_900.0,
                cost_before: 181_200.0,
                cost_after: 82_600.0,
                annual_savings: 98_600.0,
            },
            savings_benefit: 1_479_000.0,
            fit_revenue: 400_000.0,
            total_benefit: 1_879_000.0,
            net_profit: 79_000.0,
            roi: Some(79_000.0 / 1_800_000.0),
            payback,
        }
    }

    fn trace() -> Vec<DayFlow> {
        let params = DispatchParams {
            pv_yield_per_kw_year: 1_131.5,
            round_trip_efficiency: 0.9,
            usable_fraction: 0.9,
        };
        DailyDispatch::new(
            &LoadProfile::new(4_800.0, 0.3),
            SystemConfiguration::new(5.0, 9.8),
            &params,
        )
        .collect()
    }

    fn lines(buf: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(buf).lines().map(str::to_string).collect()
    }

    #[test]
    fn grid_header_matches_columns() {
        let mut buf = Vec::new();
        write_grid_csv(&[make_candidate(5.0, Payback::Years(9.5))], &mut buf).ok();
        assert_eq!(
            lines(&buf).first().map(String::as_str),
            Some(
                "pv_kw,battery_kwh,price_quoted,price_low,price_high,\
                 generation_kwh,self_consumption_kwh,sold_kwh,annual_savings,\
                 total_benefit,net_profit,roi,payback_years"
            )
        );
    }

    #[test]
    fn unresolved_payback_is_empty() {
        let mut buf = Vec::new();
        write_grid_csv(&[make_candidate(5.0, Payback::Unresolved)], &mut buf).ok();
        let row = lines(&buf).get(1).cloned().unwrap_or_default();
        assert!(row.ends_with(','), "row should end with an empty payback: {row}");
        assert!(row.starts_with("5.00,5.6,1800000,"));
    }

    #[test]
    fn grid_rows_match_candidates() {
        let grid: Vec<_> = (1..=8)
            .map(|i| make_candidate(f64::from(i), Payback::Years(10.0)))
            .collect();
        let mut buf = Vec::new();
        write_grid_csv(&grid, &mut buf).ok();
        // 1 header + 8 data rows
        assert_eq!(lines(&buf).len(), 9);
    }

    #[test]
    fn trace_has_one_row_per_day() {
        let mut buf = Vec::new();
        write_trace_csv(&trace(), &mut buf).ok();
        let out = lines(&buf);
        assert_eq!(out.len(), 366);
        assert_eq!(
            out.first().map(String::as_str),
            Some(
                "day,generation_kwh,self_consumed_kwh,charge_input_kwh,\
                 charge_stored_kwh,sold_kwh,discharged_kwh,grid_import_kwh,soc_kwh"
            )
        );
    }

    #[test]
    fn deterministic_output() {
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_trace_csv(&trace(), &mut buf1).ok();
        write_trace_csv(&trace(), &mut buf2).ok();
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn trace_is_parseable() {
        let mut buf = Vec::new();
        write_trace_csv(&trace(), &mut buf).ok();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let headers = rdr.headers().cloned().ok();
        assert_eq!(headers.as_ref().map(csv::StringRecord::len), Some(9));

        let mut row_count = 0;
        for record in rdr.records() {
            let Ok(rec) = record else {
                panic!("every row should parse");
            };
            for i in 1..9 {
                let val: Result<f64, _> = rec[i].parse();
                assert!(val.is_ok(), "column {i} should parse as f64");
            }
            row_count += 1;
        }
        assert_eq!(row_count, 365);
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().ok();
        let Some(path) = dir.as_ref().map(|d| d.path().join("grid.csv")) else {
            panic!("temp dir should be created");
        };
        let grid = vec![make_candidate(3.0, Payback::Years(8.0))];
        assert!(export_grid_csv(&grid, &path).is_ok());
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        assert_eq!(content.lines().count(), 2);
    }
}
