//! Feed-in tariff resolution.
//!
//! Two shapes of schedule are supported:
//! - [`TariffSchedule`]: rates keyed by project year (year 1 = first year of
//!   operation), as published for a single installation cohort.
//! - [`CalendarTariff`]: rates keyed by calendar year, with a pivot year at
//!   which the historical table gives way to a phased rule.
//!
//! Both resolve every year; an unmatched year falls back to a flat
//! post-incentive rate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A run of project years paid at one rate.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TariffSegment {
    /// First project year covered (inclusive, >= 1).
    #[serde(alias = "startYear")]
    pub start_year: u32,
    /// Last project year covered (inclusive).
    #[serde(alias = "endYear")]
    pub end_year: u32,
    /// Feed-in rate (currency per kWh).
    #[serde(alias = "yenPerKwh", alias = "ratePerKWh")]
    pub rate_per_kwh: f64,
}

impl TariffSegment {
    pub fn new(start_year: u32, end_year: u32, rate_per_kwh: f64) -> Self {
        Self {
            start_year,
            end_year,
            rate_per_kwh,
        }
    }

    fn covers(&self, year: u32) -> bool {
        year >= self.start_year && year <= self.end_year
    }
}

/// Project-year keyed feed-in schedule.
///
/// # Examples
///
/// ```
/// use solar_quote::tariff::{TariffSchedule, TariffSegment};
///
/// let schedule = TariffSchedule::new(
///     vec![TariffSegment::new(1, 4, 24.0), TariffSegment::new(5, 10, 8.3)],
///     Some(8.5),
/// );
/// assert_eq!(schedule.rate_for_year(3), 24.0);
/// assert_eq!(schedule.rate_for_year(7), 8.3);
/// assert_eq!(schedule.rate_for_year(11), 8.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TariffSchedule {
    segments: Vec<TariffSegment>,
    post_incentive_rate: Option<f64>,
}

impl TariffSchedule {
    /// Creates a schedule from ordered, non-overlapping segments.
    ///
    /// `post_incentive_rate` applies to years no segment covers. Without it the
    /// last segment's rate is carried forward.
    pub fn new(segments: Vec<TariffSegment>, post_incentive_rate: Option<f64>) -> Self {
        Self {
            segments,
            post_incentive_rate,
        }
    }

    pub fn segments(&self) -> &[TariffSegment] {
        &self.segments
    }

    /// Rate paid in project year `year`.
    ///
    /// Never fails: an uncovered year resolves to the post-incentive rate, then
    /// to the last segment's rate, then to zero for an empty table.
    pub fn rate_for_year(&self, year: u32) -> f64 {
        if let Some(seg) = self.segments.iter().find(|s| s.covers(year)) {
            return seg.rate_per_kwh;
        }
        self.fallback_rate()
    }

    fn fallback_rate(&self) -> f64 {
        self.post_incentive_rate
            .or_else(|| self.segments.last().map(|s| s.rate_per_kwh))
            .unwrap_or(0.0)
    }

    /// Rates for project years `1..=horizon`.
    pub fn rates_for_horizon(&self, horizon: u32) -> Vec<f64> {
        (1..=horizon).map(|y| self.rate_for_year(y)).collect()
    }
}

/// One phase of a [`PhasedRule`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TariffPhase {
    /// Number of calendar years this phase lasts.
    pub years: u32,
    pub rate_per_kwh: f64,
}

/// Fixed schedule taking over from the historical table at `pivot_year`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PhasedRule {
    /// First calendar year governed by the phases.
    pub pivot_year: i32,
    /// Consecutive phases starting at `pivot_year`.
    pub phases: Vec<TariffPhase>,
}

impl PhasedRule {
    /// Rate for a calendar year at or after the pivot, if a phase covers it.
    fn rate_for(&self, year: i32) -> Option<f64> {
        let mut offset = u32::try_from(year - self.pivot_year).ok()?;
        for phase in &self.phases {
            if offset < phase.years {
                return Some(phase.rate_per_kwh);
            }
            offset -= phase.years;
        }
        None
    }
}

/// Calendar-year keyed feed-in schedule with a rate-change rule.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarTariff {
    historical: BTreeMap<i32, f64>,
    phased: Option<PhasedRule>,
    post_incentive_rate: f64,
}

impl CalendarTariff {
    pub fn new(
        historical: BTreeMap<i32, f64>,
        phased: Option<PhasedRule>,
        post_incentive_rate: f64,
    ) -> Self {
        Self {
            historical,
            phased,
            post_incentive_rate,
        }
    }

    pub fn post_incentive_rate(&self) -> f64 {
        self.post_incentive_rate
    }

    /// Rate for one calendar year.
    ///
    /// Years before the pivot read the historical table; years from the pivot
    /// on read the phased rule. Anything unresolved gets the post-incentive rate.
    pub fn rate_for_calendar_year(&self, year: i32) -> f64 {
        let resolved = match &self.phased {
            Some(rule) if year >= rule.pivot_year => rule.rate_for(year),
            _ => self.historical.get(&year).copied(),
        };
        resolved.unwrap_or(self.post_incentive_rate)
    }

    /// Exactly `years_remaining` rates, one per calendar year from `start_year`.
    pub fn build_series(&self, start_year: i32, years_remaining: u32) -> Vec<f64> {
        (0..years_remaining)
            .map(|i| self.rate_for_calendar_year(start_year.saturating_add_unsigned(i)))
            .collect()
    }
}

/// Start of the feed-in contract for calendar-keyed tariffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitContract {
    /// Calendar year of the first paid year.
    pub start_year: i32,
    /// Years left on the contract.
    pub years_remaining: u32,
}

/// The feed-in tariff the evaluator consumes, in either keying.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedInTariff {
    ProjectYears(TariffSchedule),
    Calendar(CalendarTariff),
}

impl FeedInTariff {
    /// One rate per evaluated year, `horizon` entries long.
    ///
    /// Calendar tariffs pay the contract series first, then the post-incentive
    /// rate for the rest of the horizon.
    pub fn rates_for_horizon(&self, contract: FitContract, horizon: u32) -> Vec<f64> {
        match self {
            Self::ProjectYears(schedule) => schedule.rates_for_horizon(horizon),
            Self::Calendar(tariff) => {
                let series = tariff.build_series(contract.start_year, contract.years_remaining);
                (0..horizon as usize)
                    .map(|i| {
                        series
                            .get(i)
                            .copied()
                            .unwrap_or(tariff.post_incentive_rate)
                    })
                    .collect()
            }
        }
    }
}
