//! Tax rates, rounding rules, and document totals

pub mod calculation;

pub use calculation::*;
