//! GeoJSON LineString extraction for map rendering.
//!
//! Each point becomes a position `[lon, lat]`, followed by the elevation when the
//! point carries one, followed by the UTC epoch-seconds timestamp when the point
//! carries one. The trailing fields are positional: a point with a timestamp but
//! no elevation yields `[lon, lat, time]`. Stored tracks and map clients rely on
//! this shape, so it is kept as-is rather than padded to a fixed arity. The
//! decoder tells the two 3-value shapes apart by magnitude, see
//! [`MAX_ELEVATION_M`].

use geojson::{Geometry, Value};
use thiserror::Error;
use time::OffsetDateTime;

use crate::track::{Track, TrackPoint};

/// Largest third value of a 3-value position that is read as an elevation.
/// Anything above is epoch seconds.
pub const MAX_ELEVATION_M: f64 = 100_000.0;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("Expected a LineString geometry")]
    NotALineString,
    #[error("Position {index} has {len} values, expected 2 to 4")]
    InvalidPosition { index: usize, len: usize },
    #[error("Position {index} has an invalid timestamp")]
    InvalidTimestamp { index: usize },
}

/// Encodes one point as a GeoJSON position.
pub fn position(point: &TrackPoint) -> Vec<f64> {
    let mut coord = Vec::with_capacity(4);
    coord.push(point.lon);
    coord.push(point.lat);
    if let Some(ele) = point.elevation {
        coord.push(ele);
    }
    if let Some(time) = point.time {
        coord.push(epoch_seconds(time));
    }
    coord
}

/// Positions of every point in document order, produced lazily.
pub fn coordinates(track: &Track) -> impl Iterator<Item = Vec<f64>> + '_ {
    track.points().map(position)
}

/// Builds the `LineString` geometry for a track.
pub fn to_geojson(track: &Track) -> Geometry {
    Geometry::new(Value::LineString(coordinates(track).collect()))
}

/// A position read back from stored GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedPosition {
    pub lon: f64,
    pub lat: f64,
    pub elevation: Option<f64>,
    pub time: Option<OffsetDateTime>,
}

/// Decodes one position.
///
/// A three-value position is `[lon, lat, ele]` unless its third value exceeds
/// [`MAX_ELEVATION_M`], in which case it is `[lon, lat, time]`.
pub fn decode_position(index: usize, coord: &[f64]) -> Result<DecodedPosition, GeometryError> {
    match *coord {
        [lon, lat] => Ok(DecodedPosition {
            lon,
            lat,
            elevation: None,
            time: None,
        }),
        [lon, lat, secs] if secs > MAX_ELEVATION_M => Ok(DecodedPosition {
            lon,
            lat,
            elevation: None,
            time: Some(from_epoch_seconds(secs).ok_or(GeometryError::InvalidTimestamp { index })?),
        }),
        [lon, lat, ele] => Ok(DecodedPosition {
            lon,
            lat,
            elevation: Some(ele),
            time: None,
        }),
        [lon, lat, ele, secs] => Ok(DecodedPosition {
            lon,
            lat,
            elevation: Some(ele),
            time: Some(from_epoch_seconds(secs).ok_or(GeometryError::InvalidTimestamp { index })?),
        }),
        _ => Err(GeometryError::InvalidPosition {
            index,
            len: coord.len(),
        }),
    }
}

/// Reads the points back out of a stored `LineString`.
pub fn points_from_geojson(geometry: &Geometry) -> Result<Vec<TrackPoint>, GeometryError> {
    let Value::LineString(coords) = &geometry.value else {
        return Err(GeometryError::NotALineString);
    };

    coords
        .iter()
        .enumerate()
        .map(|(i, coord)| {
            decode_position(i, coord).map(|pos| TrackPoint {
                lat: pos.lat,
                lon: pos.lon,
                elevation: pos.elevation,
                time: pos.time,
            })
        })
        .collect()
}

fn epoch_seconds(time: OffsetDateTime) -> f64 {
    time.unix_timestamp() as f64 + f64::from(time.nanosecond()) / 1e9
}

fn from_epoch_seconds(secs: f64) -> Option<OffsetDateTime> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as i64;
    let base = OffsetDateTime::from_unix_timestamp(whole as i64).ok()?;
    Some(base + time::Duration::nanoseconds(nanos))
}
