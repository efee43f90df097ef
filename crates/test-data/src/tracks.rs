//! Procedural hunter and dog track generation.
//!
//! Tracks are a random walk with momentum over generated terrain, sampled at a
//! fixed interval like a GPS collar. Dogs range wide and fast around the start
//! and sometimes stop to hold game at bay (a "stand"); hunters walk slowly and
//! stop to listen. Signal loss ends the current segment and starts a new one
//! after a gap.

use geo::{Distance, Haversine, Point};
use huntlog::track::{Track, TrackPoint, TrackSegment};
use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};
use time::{Duration, OffsetDateTime};

use crate::{areas::HuntingArea, terrain::ElevationGenerator};

const METERS_PER_DEGREE: f64 = 111_000.0;

/// Movement profile for a tracked participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mover {
    Hunter,
    Dog,
}

impl Mover {
    /// Mean and standard deviation of moving speed in km/h.
    fn speed_kmh(self) -> (f64, f64) {
        match self {
            Mover::Hunter => (3.2, 0.8),
            Mover::Dog => (11.0, 4.0),
        }
    }

    /// Maximum heading change per sample in radians.
    fn turn_rate(self) -> f64 {
        match self {
            Mover::Hunter => 0.25,
            Mover::Dog => 0.7,
        }
    }

    /// Distance from the start beyond which the mover heads back.
    fn range_m(self) -> f64 {
        match self {
            Mover::Hunter => 1_500.0,
            Mover::Dog => 3_000.0,
        }
    }
}

/// Configuration for procedural track generation.
#[derive(Debug, Clone)]
pub struct TrackConfig {
    pub start_point: (f64, f64),
    pub duration_minutes: f64,
    /// Seconds between fixes.
    pub sample_interval_s: f64,
    /// GPS position jitter standard deviation in meters.
    pub gps_jitter_m: f64,
    pub elevation_jitter_m: f64,
    /// Chance per sample of starting a stop.
    pub stop_probability: f64,
    pub stop_duration_range_s: (f64, f64),
    /// Chance per sample of losing the signal.
    pub signal_loss_probability: f64,
    pub signal_loss_range_s: (f64, f64),
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            start_point: HuntingArea::FINNSKOGEN.center,
            duration_minutes: 90.0,
            sample_interval_s: 10.0,
            gps_jitter_m: 2.0,
            elevation_jitter_m: 1.5,
            stop_probability: 0.01,
            stop_duration_range_s: (60.0, 600.0),
            signal_loss_probability: 0.002,
            signal_loss_range_s: (120.0, 900.0),
        }
    }
}

/// Generates synthetic GPS tracks with realistic characteristics.
pub struct TrackGenerator {
    config: TrackConfig,
    terrain: ElevationGenerator,
}

impl TrackGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            config: TrackConfig::default(),
            terrain: HuntingArea::FINNSKOGEN.terrain(seed),
        }
    }

    /// Generator starting at the center of an area, over its terrain.
    pub fn for_area(area: &HuntingArea, seed: u32) -> Self {
        Self {
            config: TrackConfig {
                start_point: area.center,
                ..Default::default()
            },
            terrain: area.terrain(seed),
        }
    }

    pub fn with_start(mut self, lat: f64, lon: f64) -> Self {
        self.config.start_point = (lat, lon);
        self
    }

    pub fn with_duration_minutes(mut self, minutes: f64) -> Self {
        self.config.duration_minutes = minutes;
        self
    }

    pub fn with_sample_interval(mut self, seconds: f64) -> Self {
        self.config.sample_interval_s = seconds;
        self
    }

    pub fn with_gps_jitter(mut self, meters: f64) -> Self {
        self.config.gps_jitter_m = meters;
        self
    }

    pub fn with_stops(mut self, probability: f64, min_s: f64, max_s: f64) -> Self {
        self.config.stop_probability = probability;
        self.config.stop_duration_range_s = (min_s, max_s);
        self
    }

    pub fn with_signal_loss(mut self, probability: f64, min_s: f64, max_s: f64) -> Self {
        self.config.signal_loss_probability = probability;
        self.config.signal_loss_range_s = (min_s, max_s);
        self
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    /// Generates one track starting at `start_time`.
    ///
    /// Fails only when a configured jitter is negative or not finite.
    pub fn generate(
        &self,
        mover: Mover,
        start_time: OffsetDateTime,
        rng: &mut impl Rng,
    ) -> Result<Track, NormalError> {
        let cfg = &self.config;
        let (mean_kmh, sd_kmh) = mover.speed_kmh();
        let speed = Normal::new(mean_kmh, sd_kmh)?;
        let jitter = Normal::new(0.0, cfg.gps_jitter_m)?;
        let elev_jitter = Normal::new(0.0, cfg.elevation_jitter_m)?;

        let end_time = start_time + Duration::seconds_f64(cfg.duration_minutes * 60.0);
        let interval = Duration::seconds_f64(cfg.sample_interval_s);
        let origin = cfg.start_point;

        let mut segments = Vec::new();
        let mut points = Vec::new();
        let mut position = origin;
        let mut heading = rng.gen_range(0.0..std::f64::consts::TAU);
        let mut stopped_until: Option<OffsetDateTime> = None;
        let mut now = start_time;

        while now <= end_time {
            let moving = match stopped_until {
                Some(until) if now < until => false,
                _ => {
                    stopped_until = None;
                    true
                }
            };

            if moving {
                heading += rng.gen_range(-mover.turn_rate()..mover.turn_rate());
                if distance_m(origin, position) > mover.range_m() {
                    heading = bearing(position, origin) + rng.gen_range(-0.4..0.4);
                }
                let kmh = speed.sample(rng).max(1.5);
                let step = kmh / 3.6 * cfg.sample_interval_s;
                position = offset(position, step, heading);
            }

            let fix = if moving {
                let direction = rng.gen_range(0.0..std::f64::consts::TAU);
                offset(position, jitter.sample(rng).abs(), direction)
            } else {
                position
            };
            let elevation = self.terrain.elevation_at(fix.0, fix.1)
                + if moving { elev_jitter.sample(rng) } else { 0.0 };
            points.push(
                TrackPoint::new(fix.0, fix.1)
                    .with_elevation(round_to(elevation, 1))
                    .with_time(now),
            );

            if moving && rng.r#gen::<f64>() < cfg.stop_probability {
                let secs = sample_range(rng, cfg.stop_duration_range_s);
                stopped_until = Some(now + Duration::seconds_f64(secs));
            }

            now += interval;

            if rng.r#gen::<f64>() < cfg.signal_loss_probability && !points.is_empty() {
                segments.push(TrackSegment::new(std::mem::take(&mut points)));
                now += Duration::seconds_f64(sample_range(rng, cfg.signal_loss_range_s));
            }
        }

        if !points.is_empty() {
            segments.push(TrackSegment::new(points));
        }
        Ok(Track::new(segments))
    }
}

fn sample_range(rng: &mut impl Rng, (min, max): (f64, f64)) -> f64 {
    if max > min { rng.gen_range(min..max) } else { min }
}

fn distance_m(a: (f64, f64), b: (f64, f64)) -> f64 {
    Haversine.distance(Point::new(a.1, a.0), Point::new(b.1, b.0))
}

/// Heading from `from` to `to`, in radians clockwise from north.
fn bearing(from: (f64, f64), to: (f64, f64)) -> f64 {
    let dy = to.0 - from.0;
    let dx = (to.1 - from.1) * from.0.to_radians().cos();
    dx.atan2(dy)
}

fn offset((lat, lon): (f64, f64), meters: f64, heading: f64) -> (f64, f64) {
    let lat_delta = meters * heading.cos() / METERS_PER_DEGREE;
    let lon_delta = meters * heading.sin() / (METERS_PER_DEGREE * lat.to_radians().cos());
    (lat + lat_delta, lon + lon_delta)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
