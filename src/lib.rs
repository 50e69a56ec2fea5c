//! OrbitGlobe - telemetry-to-render engine for globe-based space object tracking
//!
//! Turns periodically fetched satellite telemetry into smoothly interpolated,
//! risk-colored marker buffers for a 3D globe, with filtering and selection.

pub mod config;
pub mod data;
pub mod engine;
pub mod propagation;
pub mod renderer;
pub mod replay;
pub mod session;
pub mod telemetry;

pub use config::Settings;
pub use engine::{FrameStats, GlobeEngine, ObjectDetail};
pub use session::GlobeSession;
