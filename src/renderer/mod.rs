//! Render-side data preparation
//!
//! Projection, coloring, snapshot building, interpolation and the flat
//! buffers handed to the GPU, plus index-to-identity selection.

mod buffers;
mod colors;
mod interpolation;
mod projection;
mod selection;
mod snapshot;

pub use buffers::*;
pub use colors::*;
pub use interpolation::*;
pub use projection::*;
pub use selection::*;
pub use snapshot::*;
