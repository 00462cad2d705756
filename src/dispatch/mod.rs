//! Battery model and representative-year dispatch.

pub mod simulator;
pub mod storage;

pub use simulator::{DailyDispatch, DayFlow, DispatchParams, LoadProfile, simulate_year};
pub use storage::Storage;
