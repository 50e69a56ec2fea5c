//! Telemetry data model, catalog loading, risk scoring and filtering

mod filter;
mod loader;
mod risk;
mod telemetry;

pub use filter::*;
pub use loader::*;
pub use risk::*;
pub use telemetry::*;
