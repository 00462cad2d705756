//! Rankings and summary statistics over the unfiltered evaluated grid.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ConfigKey, EvaluatedCandidate};

/// Best values across every evaluated configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SummaryStats {
    /// Highest net profit.
    pub best_profit: Option<f64>,
    /// Highest ROI (fraction).
    pub best_roi: Option<f64>,
    /// Shortest resolvable payback (years).
    pub best_payback: Option<f64>,
}

impl SummaryStats {
    /// Computes the summary from the full grid.
    ///
    /// Every field is `None` for an empty grid; `best_payback` is also `None`
    /// when no payback resolves within the horizon.
    pub fn from_candidates(all: &[EvaluatedCandidate]) -> Self {
        let mut stats = Self::default();
        for c in all {
            stats.best_profit = Some(stats.best_profit.map_or(c.net_profit, |b| b.max(c.net_profit)));
            if let Some(roi) = c.roi {
                stats.best_roi = Some(stats.best_roi.map_or(roi, |b| b.max(roi)));
            }
            if let Some(years) = c.payback.years() {
                stats.best_payback = Some(stats.best_payback.map_or(years, |b| b.min(years)));
            }
        }
        stats
    }
}

impl fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_na = |v: Option<String>| v.unwrap_or_else(|| "n/a".to_string());
        writeln!(f, "--- Summary ---")?;
        writeln!(
            f,
            "Best net profit:  {}",
            or_na(self.best_profit.map(|v| format!("{v:.0}")))
        )?;
        writeln!(
            f,
            "Best ROI:         {}",
            or_na(self.best_roi.map(|v| format!("{:.2}%", v * 100.0)))
        )?;
        write!(
            f,
            "Best payback:     {}",
            or_na(self.best_payback.map(|v| format!("{v:.2} years")))
        )
    }
}

/// Scale of each axis of the balanced distance.
///
/// A zero tolerance removes that axis from the distance.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankTolerances {
    /// Net profit difference counted as one unit.
    pub profit: f64,
    /// ROI difference in percentage points counted as one unit.
    pub roi_pt: f64,
    /// Payback difference in years counted as one unit.
    pub payback_years: f64,
}

impl Default for RankTolerances {
    fn default() -> Self {
        Self {
            profit: 100_000.0,
            roi_pt: 2.0,
            payback_years: 1.5,
        }
    }
}

/// 1-based positions of one configuration in each ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Ranks {
    pub profit: usize,
    pub roi: usize,
    pub payback: usize,
    pub balanced: usize,
}

/// One row of a top-N table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub key: String,
    pub pv_kw: f64,
    pub battery_kwh: f64,
    pub net_profit: f64,
    pub roi_pct: Option<f64>,
    pub payback_years: Option<f64>,
    pub balanced_distance: f64,
}

/// Rankings by profit, ROI, payback and balanced distance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Rankings {
    #[serde(skip)]
    ranks: HashMap<ConfigKey, Ranks>,
    pub top_profit: Vec<RankEntry>,
    pub top_roi: Vec<RankEntry>,
    pub top_payback: Vec<RankEntry>,
    pub top_balanced: Vec<RankEntry>,
}

fn balanced_distance(
    c: &EvaluatedCandidate,
    best: &SummaryStats,
    tol: &RankTolerances,
    horizon_years: f64,
) -> f64 {
    let axis = |gap: f64, tolerance: f64| {
        if tolerance > 0.0 {
            (gap / tolerance).powi(2)
        } else {
            0.0
        }
    };

    let profit_gap = best.best_profit.map_or(0.0, |b| b - c.net_profit);
    let roi_gap = match (best.best_roi, c.roi) {
        (Some(b), Some(r)) => (b - r) * 100.0,
        (Some(_), None) if tol.roi_pt > 0.0 => return f64::INFINITY,
        _ => 0.0,
    };
    let best_payback = best.best_payback.unwrap_or(horizon_years);
    let payback_gap = c.payback.years().unwrap_or(horizon_years) - best_payback;

    (axis(profit_gap, tol.profit) + axis(roi_gap, tol.roi_pt) + axis(payback_gap, tol.payback_years))
        .sqrt()
}

fn entry(c: &EvaluatedCandidate, distance: f64) -> RankEntry {
    RankEntry {
        key: c.key().to_string(),
        pv_kw: c.config.pv_kw,
        battery_kwh: c.config.battery_kwh,
        net_profit: c.net_profit,
        roi_pct: c.roi.map(|r| r * 100.0),
        payback_years: c.payback.years(),
        balanced_distance: distance,
    }
}

/// Descending order with `None` last.
fn desc_none_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Ascending order with `None` last.
fn asc_none_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Indices `0..n` in stable order under `cmp`.
fn sorted_indices(n: usize, cmp: impl Fn(usize, usize) -> Ordering) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| cmp(a, b));
    order
}

impl Rankings {
    /// Ranks every configuration.
    ///
    /// # Arguments
    ///
    /// * `all` - The full evaluated grid, in enumeration order
    /// * `tolerances` - Balanced-distance scales
    /// * `horizon_years` - Payback assumed for unresolved configurations
    /// * `top_n` - Length of each top table
    ///
    /// Sorts are stable, so ties keep enumeration order.
    pub fn compute(
        all: &[EvaluatedCandidate],
        tolerances: &RankTolerances,
        horizon_years: u32,
        top_n: usize,
    ) -> Self {
        let best = SummaryStats::from_candidates(all);
        let distances: Vec<f64> = all
            .iter()
            .map(|c| balanced_distance(c, &best, tolerances, f64::from(horizon_years)))
            .collect();

        let n = all.len();
        let by_profit = sorted_indices(n, |a, b| all[b].net_profit.total_cmp(&all[a].net_profit));
        let by_roi = sorted_indices(n, |a, b| desc_none_last(all[a].roi, all[b].roi));
        let by_payback = sorted_indices(n, |a, b| {
            asc_none_last(all[a].payback.years(), all[b].payback.years())
        });
        let by_balanced = sorted_indices(n, |a, b| distances[a].total_cmp(&distances[b]));

        let mut ranks: HashMap<ConfigKey, Ranks> = HashMap::new();
        for (pos, &i) in by_profit.iter().enumerate() {
            ranks.entry(all[i].key()).or_default().profit = pos + 1;
        }
        for (pos, &i) in by_roi.iter().enumerate() {
            ranks.entry(all[i].key()).or_default().roi = pos + 1;
        }
        for (pos, &i) in by_payback.iter().enumerate() {
            ranks.entry(all[i].key()).or_default().payback = pos + 1;
        }
        for (pos, &i) in by_balanced.iter().enumerate() {
            ranks.entry(all[i].key()).or_default().balanced = pos + 1;
        }

        let top = |order: &[usize]| -> Vec<RankEntry> {
            order
                .iter()
                .take(top_n)
                .map(|&i| entry(&all[i], distances[i]))
                .collect()
        };

        Self {
            top_profit: top(&by_profit),
            top_roi: top(&by_roi),
            top_payback: top(&by_payback),
            top_balanced: top(&by_balanced),
            ranks,
        }
    }

    pub fn ranks_for(&self, key: &ConfigKey) -> Option<&Ranks> {
        self.ranks.get(key)
    }
}

fn write_table(f: &mut fmt::Formatter<'_>, title: &str, rows: &[RankEntry]) -> fmt::Result {
    writeln!(f, "--- Top {} by {title} ---", rows.len())?;
    for (i, r) in rows.iter().enumerate() {
        let roi = r
            .roi_pct
            .map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}%"));
        let payback = r
            .payback_years
            .map_or_else(|| "-".to_string(), |v| format!("{v:.2}y"));
        writeln!(
            f,
            "{:>3}. {:<10} profit={:>10.0}  roi={roi:>8}  payback={payback:>7}  dist={:.6}",
            i + 1,
            r.key,
            r.net_profit,
            r.balanced_distance
        )?;
    }
    Ok(())
}

impl fmt::Display for Rankings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_table(f, "net profit", &self.top_profit)?;
        write_table(f, "ROI", &self.top_roi)?;
        write_table(f, "payback", &self.top_payback)?;
        write_table(f, "balance", &self.top_balanced)
    }
}
