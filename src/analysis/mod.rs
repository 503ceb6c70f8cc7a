//! Aggregation of per-paper analysis records.

pub mod aggregator;

pub use aggregator::*;
