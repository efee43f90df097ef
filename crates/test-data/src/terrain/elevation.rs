//! Perlin noise-based elevation generation.

use noise::{NoiseFn, Perlin};

const METERS_PER_DEGREE: f64 = 111_000.0;

/// Generates smooth terrain heights from layered Perlin noise.
///
/// Coordinates are scaled to meters before sampling, so `wavelength_m` is the
/// rough distance between hilltops regardless of latitude.
#[derive(Debug, Clone)]
pub struct ElevationGenerator {
    perlin: Perlin,
    base_elevation: f64,
    /// Maximum deviation from the base, in meters.
    relief: f64,
    wavelength_m: f64,
    octaves: u32,
}

impl ElevationGenerator {
    /// Rolling forest terrain around 300 m.
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_elevation: 300.0,
            relief: 80.0,
            wavelength_m: 2_000.0,
            octaves: 4,
        }
    }

    pub fn with_base_elevation(mut self, elevation: f64) -> Self {
        self.base_elevation = elevation;
        self
    }

    pub fn with_relief(mut self, relief: f64) -> Self {
        self.relief = relief;
        self
    }

    pub fn with_wavelength(mut self, meters: f64) -> Self {
        self.wavelength_m = meters;
        self
    }

    pub fn base_elevation(&self) -> f64 {
        self.base_elevation
    }

    pub fn relief(&self) -> f64 {
        self.relief
    }

    /// Terrain height at a coordinate, within `base ± relief`.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> f64 {
        let x = lon * METERS_PER_DEGREE * lat.to_radians().cos() / self.wavelength_m;
        let y = lat * METERS_PER_DEGREE / self.wavelength_m;

        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..self.octaves {
            total += self.perlin.get([x * frequency, y * frequency]) * amplitude;
            max_amplitude += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        self.base_elevation + (total / max_amplitude).clamp(-1.0, 1.0) * self.relief
    }
}
