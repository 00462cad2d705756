//! Grid search, candidate selection and rankings.

/// Configuration grid enumeration and feasibility.
pub mod grid;
/// Rankings and summary statistics.
pub mod ranking;
/// Exhaustive evaluation of a grid.
pub mod search;
/// Labelled candidate selection.
pub mod selector;

pub use grid::{BatteryAxis, Grid, RangeSpec, SearchMode, is_feasible};
pub use ranking::{RankTolerances, Rankings, SummaryStats};
pub use search::{SearchOutcome, search};
pub use selector::{CandidateLabel, LabeledCandidate, MAX_CANDIDATES, Selection, SelectionCriteria, select};
