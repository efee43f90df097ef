//! Derived track statistics: moving distance and time, speeds, elevation and bounds.
//!
//! Statistics are accumulated in one pass by a set of [`TrackMetric`]s. Any
//! malformed input (non-finite values, coordinates out of range) fails the whole
//! computation; [`statistics_or_zero`] turns such failures into the all-zero
//! record so renderers always receive every field.

use geo::{Distance as _, Haversine};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::track::{Track, TrackPoint};

/// Intervals at or below this speed count as standing still.
pub const DEFAULT_STOPPED_SPEED_KMH: f64 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("Point {index} has an invalid latitude/longitude ({lat}, {lon})")]
    InvalidCoordinate { index: usize, lat: f64, lon: f64 },
    #[error("Point {index} has a non-finite elevation")]
    InvalidElevation { index: usize },
    #[error("Statistic {0} is not a finite number")]
    NonFinite(&'static str),
}

/// `[[min_lat, min_lon], [max_lat, max_lon]]` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl From<[[f64; 2]; 2]> for BoundingBox {
    fn from([[min_lat, min_lon], [max_lat, max_lon]]: [[f64; 2]; 2]) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }
}

impl From<BoundingBox> for [[f64; 2]; 2] {
    fn from(b: BoundingBox) -> Self {
        [[b.min_lat, b.min_lon], [b.max_lat, b.max_lon]]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrackStatistics {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub min_elevation_m: f64,
    pub max_elevation_m: f64,
    #[schema(value_type = Vec<Vec<f64>>)]
    pub bounding_box: BoundingBox,
}

impl TrackStatistics {
    /// The record returned when a track cannot be evaluated.
    pub fn zeroed() -> Self {
        Self::default()
    }
}

/// Stationary-detection policy for the moving pass.
#[derive(Debug, Clone, Copy)]
pub struct MovingPolicy {
    pub stopped_speed_kmh: f64,
}

impl Default for MovingPolicy {
    fn default() -> Self {
        Self {
            stopped_speed_kmh: DEFAULT_STOPPED_SPEED_KMH,
        }
    }
}

pub trait TrackMetric {
    type Score;
    /// Called before the first point of every segment.
    fn start_segment(&mut self) {}
    fn next_point(&mut self, point: &TrackPoint);
    fn finish(&mut self) -> Self::Score;
}

/// Computes statistics with the default moving policy.
pub fn compute_statistics(track: &Track) -> Result<TrackStatistics, StatsError> {
    compute_statistics_with(track, MovingPolicy::default())
}

pub fn compute_statistics_with(
    track: &Track,
    policy: MovingPolicy,
) -> Result<TrackStatistics, StatsError> {
    validate(track)?;

    let mut moving = MovingMetric::new(policy);
    let mut elevation = ElevationMetric::default();
    let mut bounds = BoundsMetric::default();

    for seg in &track.segments {
        moving.start_segment();
        elevation.start_segment();
        for point in &seg.points {
            moving.next_point(point);
            elevation.next_point(point);
            bounds.next_point(point);
        }
    }

    let moving = moving.finish();
    let elevation = elevation.finish();
    let bounding_box = bounds.finish();

    let distance_km = moving.distance_m / 1000.0;
    let duration_hours = moving.time_s / 3600.0;
    let avg_speed_kmh = if moving.time_s > 0.0 {
        distance_km / duration_hours
    } else {
        0.0
    };

    let stats = TrackStatistics {
        distance_km: round_to(distance_km, 2),
        duration_minutes: round_to(moving.time_s / 60.0, 1),
        avg_speed_kmh: round_to(avg_speed_kmh, 2),
        max_speed_kmh: round_to(moving.max_speed_mps * 3.6, 2),
        elevation_gain_m: round_to(elevation.gain, 2),
        elevation_loss_m: round_to(elevation.loss, 2),
        min_elevation_m: round_to(elevation.min.unwrap_or(0.0), 1),
        max_elevation_m: round_to(elevation.max.unwrap_or(0.0), 1),
        bounding_box,
    };
    ensure_finite(&stats)?;
    Ok(stats)
}

/// Computes statistics, falling back to [`TrackStatistics::zeroed`] on any fault.
pub fn statistics_or_zero(track: &Track) -> TrackStatistics {
    compute_statistics(track).unwrap_or_else(|e| {
        tracing::warn!("Track statistics unavailable, using zero record: {e}");
        TrackStatistics::zeroed()
    })
}

fn validate(track: &Track) -> Result<(), StatsError> {
    for (index, pt) in track.points().enumerate() {
        let lat_ok = pt.lat.is_finite() && (-90.0..=90.0).contains(&pt.lat);
        let lon_ok = pt.lon.is_finite() && (-180.0..=180.0).contains(&pt.lon);
        if !lat_ok || !lon_ok {
            return Err(StatsError::InvalidCoordinate {
                index,
                lat: pt.lat,
                lon: pt.lon,
            });
        }
        if pt.elevation.is_some_and(|e| !e.is_finite()) {
            return Err(StatsError::InvalidElevation { index });
        }
    }
    Ok(())
}

fn ensure_finite(stats: &TrackStatistics) -> Result<(), StatsError> {
    let fields = [
        ("distance_km", stats.distance_km),
        ("duration_minutes", stats.duration_minutes),
        ("avg_speed_kmh", stats.avg_speed_kmh),
        ("max_speed_kmh", stats.max_speed_kmh),
        ("elevation_gain_m", stats.elevation_gain_m),
        ("elevation_loss_m", stats.elevation_loss_m),
        ("min_elevation_m", stats.min_elevation_m),
        ("max_elevation_m", stats.max_elevation_m),
    ];
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, _)) => Err(StatsError::NonFinite(*name)),
        None => Ok(()),
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Distance between two fixes in meters, including the vertical component when
/// both carry an elevation.
fn interval_distance(prev: &TrackPoint, curr: &TrackPoint) -> f64 {
    let flat = Haversine.distance(prev.point(), curr.point());
    match (prev.elevation, curr.elevation) {
        (Some(a), Some(b)) => flat.hypot(b - a),
        _ => flat,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct MovingData {
    distance_m: f64,
    time_s: f64,
    max_speed_mps: f64,
}

#[derive(Debug, Clone)]
struct MovingMetric {
    policy: MovingPolicy,
    data: MovingData,
    last_point: Option<TrackPoint>,
}

impl MovingMetric {
    fn new(policy: MovingPolicy) -> Self {
        Self {
            policy,
            data: MovingData::default(),
            last_point: None,
        }
    }
}

impl TrackMetric for MovingMetric {
    type Score = MovingData;

    fn start_segment(&mut self) {
        self.last_point = None;
    }

    fn next_point(&mut self, point: &TrackPoint) {
        if let Some(prev) = self.last_point
            && let (Some(t0), Some(t1)) = (prev.time, point.time)
        {
            let seconds = (t1 - t0).as_seconds_f64();
            if seconds > 0.0 {
                let distance = interval_distance(&prev, point);
                let speed_kmh = distance / 1000.0 / (seconds / 3600.0);
                if speed_kmh > self.policy.stopped_speed_kmh {
                    self.data.distance_m += distance;
                    self.data.time_s += seconds;
                    self.data.max_speed_mps = self.data.max_speed_mps.max(distance / seconds);
                }
            }
        }
        self.last_point = Some(*point);
    }

    fn finish(&mut self) -> MovingData {
        self.data
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ElevationSummary {
    gain: f64,
    loss: f64,
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Clone, Default)]
struct ElevationMetric {
    summary: ElevationSummary,
    last_elevation: Option<f64>,
}

impl TrackMetric for ElevationMetric {
    type Score = ElevationSummary;

    fn start_segment(&mut self) {
        self.last_elevation = None;
    }

    fn next_point(&mut self, point: &TrackPoint) {
        let Some(elevation) = point.elevation else {
            return;
        };
        if let Some(last) = self.last_elevation {
            let delta = elevation - last;
            if delta > 0.0 {
                self.summary.gain += delta;
            } else {
                self.summary.loss -= delta;
            }
        }
        self.last_elevation = Some(elevation);
        self.summary.min = Some(self.summary.min.map_or(elevation, |m| m.min(elevation)));
        self.summary.max = Some(self.summary.max.map_or(elevation, |m| m.max(elevation)));
    }

    fn finish(&mut self) -> ElevationSummary {
        self.summary
    }
}

#[derive(Debug, Clone, Default)]
struct BoundsMetric {
    bounds: Option<BoundingBox>,
}

impl TrackMetric for BoundsMetric {
    type Score = BoundingBox;

    fn next_point(&mut self, point: &TrackPoint) {
        self.bounds = Some(match self.bounds {
            None => BoundingBox {
                min_lat: point.lat,
                min_lon: point.lon,
                max_lat: point.lat,
                max_lon: point.lon,
            },
            Some(b) => BoundingBox {
                min_lat: b.min_lat.min(point.lat),
                min_lon: b.min_lon.min(point.lon),
                max_lat: b.max_lat.max(point.lat),
                max_lon: b.max_lon.max(point.lon),
            },
        });
    }

    fn finish(&mut self) -> BoundingBox {
        self.bounds.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackSegment;
    use time::{Duration, OffsetDateTime};

    fn start() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    fn single_segment(points: Vec<TrackPoint>) -> Track {
        Track::new(vec![TrackSegment::new(points)])
    }

    /// Longitude offset that is `meters` east of `lon` along the equator.
    fn lon_offset(meters: f64) -> f64 {
        (meters / 6_371_008.8).to_degrees()
    }

    #[test]
    fn test_empty_track_is_all_zero() {
        let stats = compute_statistics(&Track::default()).unwrap();
        assert_eq!(stats, TrackStatistics::zeroed());

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["bounding_box"], serde_json::json!([[0.0, 0.0], [0.0, 0.0]]));
        assert_eq!(json["distance_km"], 0.0);
    }

    #[test]
    fn test_single_point_track() {
        let track = single_segment(vec![TrackPoint::new(60.5, 10.25).with_time(start())]);
        let stats = compute_statistics(&track).unwrap();

        assert_eq!(stats.distance_km, 0.0);
        assert_eq!(stats.duration_minutes, 0.0);
        assert_eq!(stats.avg_speed_kmh, 0.0);
        assert_eq!(stats.max_speed_kmh, 0.0);
        assert_eq!(
            stats.bounding_box,
            BoundingBox {
                min_lat: 60.5,
                min_lon: 10.25,
                max_lat: 60.5,
                max_lon: 10.25,
            }
        );
    }

    #[test]
    fn test_one_kilometer_in_one_hour() {
        let track = single_segment(vec![
            TrackPoint::new(0.0, 0.0).with_time(start()),
            TrackPoint::new(0.0, lon_offset(1000.0)).with_time(start() + Duration::hours(1)),
        ]);
        let stats = compute_statistics(&track).unwrap();

        assert!((stats.distance_km - 1.0).abs() < 0.01, "{stats:?}");
        assert!((stats.avg_speed_kmh - 1.0).abs() < 0.01, "{stats:?}");
        assert!((stats.max_speed_kmh - 1.0).abs() < 0.01, "{stats:?}");
        assert_eq!(stats.duration_minutes, 60.0);
    }

    #[test]
    fn test_elevation_loss() {
        let track = single_segment(vec![
            TrackPoint::new(60.0, 10.0).with_elevation(250.0),
            TrackPoint::new(60.001, 10.0).with_elevation(200.0),
        ]);
        let stats = compute_statistics(&track).unwrap();

        assert_eq!(stats.elevation_loss_m, 50.0);
        assert_eq!(stats.elevation_gain_m, 0.0);
        assert_eq!(stats.min_elevation_m, 200.0);
        assert_eq!(stats.max_elevation_m, 250.0);
    }

    #[test]
    fn test_elevation_skips_points_without_elevation() {
        let track = single_segment(vec![
            TrackPoint::new(60.0, 10.0).with_elevation(100.0),
            TrackPoint::new(60.001, 10.0),
            TrackPoint::new(60.002, 10.0).with_elevation(130.0),
            TrackPoint::new(60.003, 10.0).with_elevation(120.0),
        ]);
        let stats = compute_statistics(&track).unwrap();

        assert_eq!(stats.elevation_gain_m, 30.0);
        assert_eq!(stats.elevation_loss_m, 10.0);
    }

    #[test]
    fn test_elevation_does_not_bridge_segments() {
        let track = Track::new(vec![
            TrackSegment::new(vec![TrackPoint::new(60.0, 10.0).with_elevation(100.0)]),
            TrackSegment::new(vec![TrackPoint::new(61.0, 10.0).with_elevation(400.0)]),
        ]);
        let stats = compute_statistics(&track).unwrap();

        assert_eq!(stats.elevation_gain_m, 0.0);
        assert_eq!(stats.max_elevation_m, 400.0);
    }

    #[test]
    fn test_zero_elevation_counts_as_present() {
        let track = single_segment(vec![
            TrackPoint::new(60.0, 10.0).with_elevation(0.0),
            TrackPoint::new(60.001, 10.0).with_elevation(12.0),
        ]);
        let stats = compute_statistics(&track).unwrap();

        assert_eq!(stats.elevation_gain_m, 12.0);
        assert_eq!(stats.min_elevation_m, 0.0);
    }

    #[test]
    fn test_stationary_intervals_are_excluded() {
        let t = start();
        let track = single_segment(vec![
            TrackPoint::new(0.0, 0.0).with_time(t),
            // ~1 m in ten minutes: standing still
            TrackPoint::new(0.0, lon_offset(1.0)).with_time(t + Duration::minutes(10)),
            // 1 km in ten minutes: 6 km/h
            TrackPoint::new(0.0, lon_offset(1001.0)).with_time(t + Duration::minutes(20)),
        ]);
        let stats = compute_statistics(&track).unwrap();

        assert_eq!(stats.duration_minutes, 10.0);
        assert!((stats.distance_km - 1.0).abs() < 0.01);
        assert!((stats.avg_speed_kmh - 6.0).abs() < 0.05);
    }

    #[test]
    fn test_slow_walk_counts_as_moving() {
        let t = start();
        let track = single_segment(vec![
            TrackPoint::new(0.0, 0.0).with_time(t),
            // 0.6 km/h
            TrackPoint::new(0.0, lon_offset(600.0)).with_time(t + Duration::hours(1)),
            // 0.4 km/h
            TrackPoint::new(0.0, lon_offset(1000.0)).with_time(t + Duration::hours(2)),
        ]);
        let stats = compute_statistics(&track).unwrap();

        assert_eq!(stats.duration_minutes, 60.0);
        assert!((stats.distance_km - 0.6).abs() < 0.01, "{stats:?}");
        assert!((stats.max_speed_kmh - 0.6).abs() < 0.01, "{stats:?}");
    }

    #[test]
    fn test_points_without_time_do_not_move() {
        let track = single_segment(vec![
            TrackPoint::new(60.0, 10.0),
            TrackPoint::new(60.1, 10.0),
        ]);
        let stats = compute_statistics(&track).unwrap();

        assert_eq!(stats.distance_km, 0.0);
        assert_eq!(stats.avg_speed_kmh, 0.0);
        assert_eq!(stats.bounding_box.max_lat, 60.1);
    }

    #[test]
    fn test_statistics_are_idempotent() {
        let t = start();
        let track = single_segment(vec![
            TrackPoint::new(60.0, 10.0).with_elevation(210.0).with_time(t),
            TrackPoint::new(60.01, 10.02)
                .with_elevation(232.4)
                .with_time(t + Duration::minutes(7)),
            TrackPoint::new(60.02, 10.01)
                .with_elevation(221.9)
                .with_time(t + Duration::minutes(15)),
        ]);

        let first = serde_json::to_vec(&compute_statistics(&track).unwrap()).unwrap();
        let second = serde_json::to_vec(&compute_statistics(&track).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_nan_elevation_falls_back_to_zero_record() {
        let track = single_segment(vec![
            TrackPoint::new(60.0, 10.0).with_elevation(100.0).with_time(start()),
            TrackPoint::new(60.01, 10.0)
                .with_elevation(f64::NAN)
                .with_time(start() + Duration::minutes(5)),
        ]);

        assert_eq!(
            compute_statistics(&track),
            Err(StatsError::InvalidElevation { index: 1 })
        );
        assert_eq!(statistics_or_zero(&track), TrackStatistics::zeroed());
    }

    #[test]
    fn test_out_of_range_latitude_falls_back() {
        let track = single_segment(vec![TrackPoint::new(91.0, 10.0)]);
        assert!(matches!(
            compute_statistics(&track),
            Err(StatsError::InvalidCoordinate { index: 0, .. })
        ));
        assert_eq!(statistics_or_zero(&track), TrackStatistics::zeroed());
    }

    #[test]
    fn test_bounding_box_round_trips_through_json() {
        let bbox = BoundingBox {
            min_lat: 59.9,
            min_lon: 10.6,
            max_lat: 60.1,
            max_lon: 10.9,
        };
        let json = serde_json::to_string(&bbox).unwrap();
        assert_eq!(json, "[[59.9,10.6],[60.1,10.9]]");
        assert_eq!(serde_json::from_str::<BoundingBox>(&json).unwrap(), bbox);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(59.96, 1), 60.0);
    }
}
