//! Element-set driven telemetry
//!
//! Parses TLE catalogs and propagates them with SGP4 (via satkit) to produce
//! geodetic, risk-assessed telemetry records at the requested time. Useful
//! as a self-contained source when no live feed is available.

mod elements;
mod propagator;

pub use elements::*;
pub use propagator::*;
