//! Recommended-candidate selection.
//!
//! From the full evaluated grid, picks at most [`MAX_CANDIDATES`] labelled,
//! deduplicated configurations across several objectives. Empty slots produce
//! a diagnostic message instead of a candidate.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::search::first_best;
use crate::types::{ConfigKey, EvaluatedCandidate, format_amount};

/// Upper bound on the number of recommended candidates.
pub const MAX_CANDIDATES: usize = 6;

/// Why a candidate was recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateLabel {
    PvOnlyMaxProfit,
    PvOnlyMinPayback,
    BatteryMaxProfit,
    BatteryMinPayback,
    FullBudget,
    OverallMinPayback,
}

impl fmt::Display for CandidateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PvOnlyMaxProfit => "PV only: max net profit",
            Self::PvOnlyMinPayback => "PV only: min payback",
            Self::BatteryMaxProfit => "With battery: max net profit",
            Self::BatteryMinPayback => "With battery: min payback",
            Self::FullBudget => "Full budget: max investment",
            Self::OverallMinPayback => "Overall: min payback",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
enum Group {
    PvOnly,
    WithBattery,
}

impl Group {
    fn prefix(self) -> &'static str {
        match self {
            Self::PvOnly => "PV only",
            Self::WithBattery => "With battery",
        }
    }

    fn labels(self) -> (CandidateLabel, CandidateLabel) {
        match self {
            Self::PvOnly => (CandidateLabel::PvOnlyMaxProfit, CandidateLabel::PvOnlyMinPayback),
            Self::WithBattery => (
                CandidateLabel::BatteryMaxProfit,
                CandidateLabel::BatteryMinPayback,
            ),
        }
    }

    fn contains(self, c: &EvaluatedCandidate) -> bool {
        match self {
            Self::PvOnly => !c.config.has_battery(),
            Self::WithBattery => c.config.has_battery(),
        }
    }
}

/// Constraints on which configurations may be recommended.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionCriteria {
    /// Ceiling on the price lower bound. `None` or non-positive means unconstrained.
    pub budget: Option<f64>,
    /// Whether configurations with storage are considered at all.
    pub include_battery: bool,
}

impl SelectionCriteria {
    fn effective_budget(&self) -> Option<f64> {
        self.budget.filter(|b| b.is_finite() && *b > 0.0)
    }

    /// Whether the lowest quotable price fits the budget.
    pub fn within_budget(&self, c: &EvaluatedCandidate) -> bool {
        self.effective_budget()
            .is_none_or(|budget| c.price.lower_bound() <= budget)
    }
}

/// A recommended configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledCandidate {
    pub label: CandidateLabel,
    pub candidate: EvaluatedCandidate,
}

/// Selected candidates plus diagnostics for slots that could not be filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    pub candidates: Vec<LabeledCandidate>,
    pub messages: Vec<String>,
}

fn min_payback<'a, I>(items: I) -> Option<&'a EvaluatedCandidate>
where
    I: IntoIterator<Item = &'a EvaluatedCandidate>,
{
    let resolved = items.into_iter().filter(|c| c.payback.is_resolved());
    first_best(resolved, |c, best| {
        c.payback.years().unwrap_or(f64::INFINITY) < best.payback.years().unwrap_or(f64::INFINITY)
    })
}

fn max_profit<'a, I>(items: I) -> Option<&'a EvaluatedCandidate>
where
    I: IntoIterator<Item = &'a EvaluatedCandidate>,
{
    first_best(items, |c, best| c.net_profit > best.net_profit)
}

/// Profit winner and payback winner of one group, at most two distinct picks.
fn pick_two<'a>(
    all: &[&'a EvaluatedCandidate],
    group: Group,
    criteria: &SelectionCriteria,
    messages: &mut Vec<String>,
) -> Vec<(CandidateLabel, &'a EvaluatedCandidate)> {
    let prefix = group.prefix();
    let within: Vec<&EvaluatedCandidate> = all
        .iter()
        .copied()
        .filter(|c| criteria.within_budget(c))
        .collect();

    let Some(profit_winner) = max_profit(within.iter().copied()) else {
        let cheapest = all
            .iter()
            .map(|c| c.price.lower_bound())
            .fold(f64::INFINITY, f64::min);
        if criteria.effective_budget().is_some() && cheapest.is_finite() {
            messages.push(format!(
                "{prefix}: no candidates within budget (cheapest range lower bound: {})",
                format_amount(cheapest)
            ));
        } else {
            messages.push(format!("{prefix}: no candidates"));
        }
        return Vec::new();
    };

    let (profit_label, payback_label) = group.labels();
    let winner_key = profit_winner.key();
    let mut picks = vec![(profit_label, profit_winner)];

    let payback_pick = match min_payback(within.iter().copied()) {
        Some(c) if c.key() != winner_key => Some(c),
        _ => {
            let mut by_payback: Vec<&EvaluatedCandidate> = within
                .iter()
                .copied()
                .filter(|c| c.payback.is_resolved())
                .collect();
            by_payback.sort_by(|a, b| {
                let (a, b) = (a.payback.years(), b.payback.years());
                a.unwrap_or(f64::INFINITY).total_cmp(&b.unwrap_or(f64::INFINITY))
            });
            by_payback
                .into_iter()
                .find(|c| c.key() != winner_key)
                .or_else(|| {
                    let mut by_profit = within.clone();
                    by_profit.sort_by(|a, b| b.net_profit.total_cmp(&a.net_profit));
                    by_profit.into_iter().find(|c| c.key() != winner_key)
                })
        }
    };
    if let Some(c) = payback_pick {
        picks.push((payback_label, c));
    }
    picks
}

/// Picks the recommended candidates.
///
/// Slots, in order: the profit and payback winners among PV-only
/// configurations, the same two among battery configurations (when storage
/// is included), the most expensive configuration within budget, and the
/// best payback over all eligible configurations. Later duplicates of an
/// earlier configuration are dropped.
///
/// # Arguments
///
/// * `all` - The full evaluated grid
/// * `criteria` - Budget and storage toggle
pub fn select(all: &[EvaluatedCandidate], criteria: &SelectionCriteria) -> Selection {
    let mut messages = Vec::new();
    let mut slots: Vec<(CandidateLabel, &EvaluatedCandidate)> = Vec::new();

    let pv_only: Vec<&EvaluatedCandidate> =
        all.iter().filter(|c| Group::PvOnly.contains(c)).collect();
    slots.extend(pick_two(&pv_only, Group::PvOnly, criteria, &mut messages));

    if criteria.include_battery {
        let with_battery: Vec<&EvaluatedCandidate> =
            all.iter().filter(|c| Group::WithBattery.contains(c)).collect();
        slots.extend(pick_two(
            &with_battery,
            Group::WithBattery,
            criteria,
            &mut messages,
        ));
    }

    let eligible_within: Vec<&EvaluatedCandidate> = all
        .iter()
        .filter(|c| criteria.include_battery || !c.config.has_battery())
        .filter(|c| criteria.within_budget(c))
        .collect();

    match first_best(eligible_within.iter().copied(), |c, best| {
        c.price.quoted() > best.price.quoted()
    }) {
        Some(c) => slots.push((CandidateLabel::FullBudget, c)),
        None => messages.push(
            "Overall: no candidates within budget (cannot pick maximum investment)".to_string(),
        ),
    }

    match min_payback(eligible_within.iter().copied()) {
        Some(c) => slots.push((CandidateLabel::OverallMinPayback, c)),
        None if !eligible_within.is_empty() => {
            messages.push("Overall: no candidate with a resolvable payback".to_string());
        }
        None => {}
    }

    let mut seen: HashSet<ConfigKey> = HashSet::new();
    let candidates = slots
        .into_iter()
        .filter(|(_, c)| seen.insert(c.key()))
        .take(MAX_CANDIDATES)
        .map(|(label, c)| LabeledCandidate {
            label,
            candidate: c.clone(),
        })
        .collect();

    Selection {
        candidates,
        messages,
    }
}
