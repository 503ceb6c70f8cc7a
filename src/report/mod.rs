//! Report emitters.

pub mod generator;

pub use generator::*;
