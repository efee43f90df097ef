//! Terrain generation utilities.

mod elevation;

pub use elevation::ElevationGenerator;
