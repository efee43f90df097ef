//! In-memory GPS track model shared by geometry extraction and statistics.
//!
//! A [`Track`] is a list of segments, each an ordered list of [`TrackPoint`]s in
//! acquisition order. Tracks are built once from a decoded GPX document and never
//! mutated afterwards.

use geo::geometry::Point;
use time::OffsetDateTime;

/// One GPS fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    /// Elevation in meters. `Some(0.0)` is a real reading, not a missing one.
    pub elevation: Option<f64>,
    pub time: Option<OffsetDateTime>,
}

impl TrackPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
            time: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_time(mut self, time: OffsetDateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Position as a geo point (x = longitude, y = latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

impl From<&gpx::Waypoint> for TrackPoint {
    fn from(wpt: &gpx::Waypoint) -> Self {
        let point = wpt.point();
        Self {
            lat: point.y(),
            lon: point.x(),
            elevation: wpt.elevation,
            time: wpt.time.map(OffsetDateTime::from),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSegment {
    pub points: Vec<TrackPoint>,
}

impl TrackSegment {
    pub fn new(points: Vec<TrackPoint>) -> Self {
        Self { points }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: Option<String>,
    pub segments: Vec<TrackSegment>,
}

impl Track {
    pub fn new(segments: Vec<TrackSegment>) -> Self {
        Self {
            name: None,
            segments,
        }
    }

    /// Every point of every segment, in document order.
    pub fn points(&self) -> impl Iterator<Item = &TrackPoint> + '_ {
        self.segments.iter().flat_map(|seg| seg.points.iter())
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|seg| seg.points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }

    /// First and last timestamp carried by any point.
    pub fn time_bounds(&self) -> Option<(OffsetDateTime, OffsetDateTime)> {
        let mut times = self.points().filter_map(|pt| pt.time);
        let first = times.next()?;
        let (start, end) = times.fold((first, first), |(start, end), t| {
            (start.min(t), end.max(t))
        });
        Some((start, end))
    }
}

impl From<&gpx::Gpx> for Track {
    /// Flattens all `<trk>` elements into one track, keeping their segments in
    /// document order. Empty segments are dropped.
    fn from(doc: &gpx::Gpx) -> Self {
        let name = doc
            .tracks
            .iter()
            .find_map(|trk| trk.name.clone())
            .or_else(|| doc.metadata.as_ref().and_then(|m| m.name.clone()));

        let segments = doc
            .tracks
            .iter()
            .flat_map(|trk| trk.segments.iter())
            .filter(|seg| !seg.points.is_empty())
            .map(|seg| TrackSegment::new(seg.points.iter().map(TrackPoint::from).collect()))
            .collect();

        Self { name, segments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_points_follow_segment_order() {
        let track = Track::new(vec![
            TrackSegment::new(vec![TrackPoint::new(60.0, 10.0), TrackPoint::new(60.1, 10.1)]),
            TrackSegment::new(vec![TrackPoint::new(61.0, 11.0)]),
        ]);

        let lats: Vec<f64> = track.points().map(|p| p.lat).collect();
        assert_eq!(lats, vec![60.0, 60.1, 61.0]);
        assert_eq!(track.point_count(), 3);
    }

    #[test]
    fn test_time_bounds() {
        let start = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let track = Track::new(vec![TrackSegment::new(vec![
            TrackPoint::new(60.0, 10.0),
            TrackPoint::new(60.0, 10.0).with_time(start),
            TrackPoint::new(60.0, 10.0).with_time(start + Duration::minutes(30)),
        ])]);

        assert_eq!(
            track.time_bounds(),
            Some((start, start + Duration::minutes(30)))
        );
        assert_eq!(Track::default().time_bounds(), None);
    }
}
