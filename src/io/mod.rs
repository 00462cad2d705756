//! File output.

pub mod export;
