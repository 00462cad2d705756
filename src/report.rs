//! Human-readable reports: the customer summary and the contractor debug report.

use std::fmt;

use crate::catalog::ReferenceCatalog;
use crate::estimate::EstimateOutput;
use crate::optimizer::LabeledCandidate;
use crate::types::{EvaluatedCandidate, Payback, PriceBreakdown, format_amount};

fn battery_label(kwh: f64) -> String {
    if kwh > 0.0 {
        format!("{kwh:.1} kWh")
    } else {
        "none".to_string()
    }
}

fn payback_label(payback: Payback, horizon_years: u32) -> String {
    match payback {
        Payback::Years(y) => format!("{y:.1} years"),
        Payback::Unresolved => format!("> {horizon_years} years"),
    }
}

fn roi_label(roi: Option<f64>) -> String {
    roi.map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0))
}

fn price_label(price: &PriceBreakdown) -> String {
    match price {
        PriceBreakdown::Range(q) => format!(
            "{} - {} (median {})",
            format_amount(q.range_min),
            format_amount(q.range_max),
            format_amount(q.median)
        ),
        PriceBreakdown::Bundle(b) => format_amount(b.total),
    }
}

/// Customer-facing summary of the recommended systems.
pub struct CustomerSummary<'a> {
    output: &'a EstimateOutput,
}

impl<'a> CustomerSummary<'a> {
    pub fn new(output: &'a EstimateOutput) -> Self {
        Self { output }
    }

    fn write_candidate(
        &self,
        f: &mut fmt::Formatter<'_>,
        n: usize,
        pick: &LabeledCandidate,
    ) -> fmt::Result {
        let c = &pick.candidate;
        let horizon = self.output.horizon_years();
        writeln!(f, "{n}. {}", pick.label)?;
        writeln!(
            f,
            "   PV {:.2} kW | battery {}",
            c.config.pv_kw,
            battery_label(c.config.battery_kwh)
        )?;
        writeln!(
            f,
            "   Quoted price: {}",
            price_label(&self.output.presented_price(c))
        )?;
        writeln!(
            f,
            "   Net profit over {horizon} years: {}",
            format_amount(c.net_profit)
        )?;
        writeln!(f, "   ROI: {}", roi_label(c.roi))?;
        writeln!(f, "   Payback: {}", payback_label(c.payback, horizon))
    }
}

impl fmt::Display for CustomerSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = self.output;
        writeln!(f, "--- Recommended Systems ---")?;
        writeln!(
            f,
            "Annual consumption: {} kWh ({:.0}% daytime), {} plan",
            format_amount(out.annual_load_kwh),
            out.day_fraction * 100.0,
            out.plan.name()
        )?;
        if out.selection.candidates.is_empty() {
            writeln!(f, "No system could be recommended.")?;
        }
        for (i, pick) in out.selection.candidates.iter().enumerate() {
            self.write_candidate(f, i + 1, pick)?;
        }
        if !out.messages().is_empty() {
            writeln!(f, "Notes:")?;
            for m in out.messages() {
                writeln!(f, "  - {m}")?;
            }
        }
        Ok(())
    }
}

/// Contractor report: settings, catalogs, rankings and per-candidate detail.
pub struct DebugReport<'a> {
    output: &'a EstimateOutput,
    catalog: &'a ReferenceCatalog,
}

impl<'a> DebugReport<'a> {
    pub fn new(output: &'a EstimateOutput, catalog: &'a ReferenceCatalog) -> Self {
        Self { output, catalog }
    }

    fn write_price(f: &mut fmt::Formatter<'_>, price: &PriceBreakdown) -> fmt::Result {
        match price {
            PriceBreakdown::Range(q) => writeln!(
                f,
                "    price: base {:.0} | median {:.0} | range +/-{:.0} | {:.0} - {:.0}",
                q.base_median, q.median, q.range_width, q.range_min, q.range_max
            ),
            PriceBreakdown::Bundle(b) => writeln!(
                f,
                "    price: pv {:.0} + battery {:.0} - discount {:.0} = {:.0}",
                b.pv_cost, b.battery_cost, b.bundle_discount, b.total
            ),
        }
    }

    fn write_candidate(
        &self,
        f: &mut fmt::Formatter<'_>,
        label: &str,
        c: &EvaluatedCandidate,
    ) -> fmt::Result {
        let s = &c.simulation;
        writeln!(f, "[{label}] {}", c.key())?;
        Self::write_price(f, &c.price)?;
        writeln!(
            f,
            "    flows: gen {:.1} | self {:.1} | sold {:.1} | grid {:.1} kWh/yr",
            s.annual_generation_kwh,
            s.annual_self_consumption_kwh,
            s.annual_sold_kwh,
            s.annual_grid_kwh
        )?;
        writeln!(
            f,
            "    bills: before {:.0} | after {:.0} | savings {:.0} /yr",
            s.cost_before, s.cost_after, s.annual_savings
        )?;
        writeln!(
            f,
            "    economics: savings {:.0} + fit {:.0} = {:.0} | net {:.0} | roi {} | payback {}",
            c.savings_benefit,
            c.fit_revenue,
            c.total_benefit,
            c.net_profit,
            roi_label(c.roi),
            payback_label(c.payback, self.output.horizon_years())
        )?;
        match self.output.rankings.ranks_for(&c.key()) {
            Some(r) => writeln!(
                f,
                "    ranks: profit #{} | roi #{} | payback #{} | balanced #{}",
                r.profit, r.roi, r.payback, r.balanced
            ),
            None => writeln!(f, "    ranks: n/a"),
        }
    }
}

impl fmt::Display for DebugReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = self.output;
        let req = &out.request;
        writeln!(f, "--- Settings ---")?;
        writeln!(f, "Plan:              {}", out.plan.name())?;
        writeln!(f, "Annual load:       {:.1} kWh", out.annual_load_kwh)?;
        writeln!(f, "Day fraction:      {:.2}", out.day_fraction)?;
        writeln!(f, "Pricing strategy:  {}", out.pricing_strategy)?;
        writeln!(f, "Rounding unit:     {:.0}", out.rounding_unit)?;
        writeln!(f, "Horizon:           {} years", out.horizon_years())?;
        writeln!(
            f,
            "FIT contract:      from {} for {} years",
            req.fit_start_year, req.fit_years_remaining
        )?;
        let rates: Vec<String> = out.fit_rates.iter().map(|r| format!("{r:.2}")).collect();
        writeln!(f, "FIT rates:         [{}]", rates.join(", "))?;
        writeln!(
            f,
            "Budget:            {}",
            req.budget
                .map_or_else(|| "none".to_string(), format_amount)
        )?;
        writeln!(f, "Include battery:   {}", req.include_battery)?;
        writeln!(
            f,
            "Existing PV:       {}",
            req.existing_pv()
                .map_or_else(|| "none".to_string(), |kw| format!("{kw:.2} kW"))
        )?;
        writeln!(f, "Grid size:         {}", out.grid.len())?;

        writeln!(f, "--- Catalogs ---")?;
        for seg in &self.catalog.tariffs {
            writeln!(
                f,
                "Tariff years {:>2}-{:<2}  {:.2}/kWh",
                seg.start_year, seg.end_year, seg.rate_per_kwh
            )?;
        }
        let sizes: Vec<String> = self
            .catalog
            .battery_sizes
            .iter()
            .map(|s| format!("{s}"))
            .collect();
        writeln!(f, "Battery sizes: [{}]", sizes.join(", "))?;

        writeln!(f, "{}", out.stats)?;
        write!(f, "{}", out.rankings)?;

        writeln!(f, "--- Candidate Detail ---")?;
        for pick in &out.selection.candidates {
            self.write_candidate(f, &pick.label.to_string(), &pick.candidate)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EstimatorConfig;
    use crate::estimate::{Consumption, EstimateRequest, run_estimate};
    use crate::optimizer::RangeSpec;

    fn output() -> Option<EstimateOutput> {
        let mut cfg = EstimatorConfig::ibaraki();
        cfg.search.pv = RangeSpec::new(2.0, 6.0, 1.0);
        let mut req = EstimateRequest::new(Consumption::AnnualKwh { kwh: 4_800.0 });
        req.include_battery = true;
        run_estimate(&cfg, &ReferenceCatalog::default(), &req).ok()
    }

    #[test]
    fn unresolved_payback_shows_horizon() {
        assert_eq!(payback_label(Payback::Unresolved, 15), "> 15 years");
        assert_eq!(payback_label(Payback::Years(9.04), 15), "9.0 years");
    }

    #[test]
    fn battery_shows_none_when_absent() {
        assert_eq!(battery_label(0.0), "none");
        assert_eq!(battery_label(9.8), "9.8 kWh");
    }

    #[test]
    fn summary_lists_every_candidate() {
        let Some(out) = output() else {
            panic!("estimate should succeed");
        };
        let text = CustomerSummary::new(&out).to_string();
        assert!(text.starts_with("--- Recommended Systems ---"));
        for pick in &out.selection.candidates {
            assert!(text.contains(&pick.label.to_string()));
        }
        assert!(text.contains("Net profit over 15 years"));
    }

    #[test]
    fn summary_prints_unresolved_payback() {
        let Some(mut out) = output() else {
            panic!("estimate should succeed");
        };
        if let Some(first) = out.selection.candidates.first_mut() {
            first.candidate.payback = Payback::Unresolved;
        }
        let text = CustomerSummary::new(&out).to_string();
        assert!(text.contains("Payback: > 15 years"));
    }

    #[test]
    fn debug_report_includes_ranks_and_catalogs() {
        let Some(out) = output() else {
            panic!("estimate should succeed");
        };
        let catalog = ReferenceCatalog::default();
        let text = DebugReport::new(&out, &catalog).to_string();
        assert!(text.contains("--- Settings ---"));
        assert!(text.contains("Battery sizes: [0, 4.2, 5.6, 7.04, 9.8, 12.7, 16.4]"));
        assert!(text.contains("--- Summary ---"));
        assert!(text.contains("by net profit ---"));
        assert!(text.contains("ranks: profit #"));
    }
}
