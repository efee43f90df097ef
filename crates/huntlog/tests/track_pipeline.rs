//! GPX to GeoJSON and statistics, end to end through the public API.

use geojson::Value;
use huntlog::{
    geometry::points_from_geojson,
    gpx_processor::GpxProcessor,
    statistics::compute_statistics,
    track::{Track, TrackSegment},
};

const TWO_SEGMENTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Los med Bamse</name>
    <trkseg>
      <trkpt lat="61.000" lon="11.0"><ele>100</ele><time>2024-10-05T06:00:00Z</time></trkpt>
      <trkpt lat="61.001" lon="11.0"><ele>105</ele><time>2024-10-05T06:01:00Z</time></trkpt>
      <trkpt lat="61.002" lon="11.0"><ele>103</ele><time>2024-10-05T06:02:00Z</time></trkpt>
      <trkpt lat="61.003" lon="11.0"><ele>103</ele><time>2024-10-05T06:03:00Z</time></trkpt>
      <trkpt lat="61.003" lon="11.0"><ele>103</ele><time>2024-10-05T06:08:00Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="62.000" lon="11.0"><time>2024-10-05T07:00:00Z</time></trkpt>
      <trkpt lat="62.001" lon="11.0"><time>2024-10-05T07:01:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

const SINGLE_SEGMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="60.500" lon="12.30"><ele>210</ele><time>2024-10-06T08:00:00Z</time></trkpt>
      <trkpt lat="60.502" lon="12.31"><ele>230</ele><time>2024-10-06T08:05:00Z</time></trkpt>
      <trkpt lat="60.505" lon="12.31"><ele>225</ele><time>2024-10-06T08:12:00Z</time></trkpt>
      <trkpt lat="60.507" lon="12.32"><ele>240</ele><time>2024-10-06T08:20:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

#[test]
fn test_positions_carry_optional_elevation_and_time() {
    let processed = GpxProcessor::process(TWO_SEGMENTS.as_bytes()).unwrap();

    assert_eq!(processed.name.as_deref(), Some("Los med Bamse"));
    assert_eq!(processed.point_count, 7);

    let Value::LineString(coords) = &processed.geometry.value else {
        panic!("expected a LineString");
    };
    assert_eq!(coords.len(), 7);
    assert_eq!(coords[0], vec![11.0, 61.0, 100.0, 1_728_108_000.0]);
    // No elevation in the second segment: [lon, lat, time].
    assert_eq!(coords[5], vec![11.0, 62.0, 1_728_111_600.0]);
}

#[test]
fn test_statistics_skip_stops_and_segment_gaps() {
    let processed = GpxProcessor::process(TWO_SEGMENTS.as_bytes()).unwrap();
    let stats = processed.statistics;

    // Three moving minutes in the first segment, one in the second. The five
    // minute stop and the hour between segments are not counted.
    assert_eq!(stats.duration_minutes, 4.0);
    assert!((stats.distance_km - 0.44).abs() < 0.01, "{}", stats.distance_km);
    assert!(stats.max_speed_kmh < 10.0, "{}", stats.max_speed_kmh);
    assert!(stats.avg_speed_kmh > 6.0 && stats.avg_speed_kmh < 7.0);

    assert_eq!(stats.elevation_gain_m, 5.0);
    assert_eq!(stats.elevation_loss_m, 2.0);
    assert_eq!(stats.min_elevation_m, 100.0);
    assert_eq!(stats.max_elevation_m, 105.0);

    assert_eq!(stats.bounding_box.min_lat, 61.0);
    assert_eq!(stats.bounding_box.max_lat, 62.001);
    assert_eq!(stats.bounding_box.min_lon, 11.0);
    assert_eq!(stats.bounding_box.max_lon, 11.0);
}

#[test]
fn test_time_range_prefers_document_times() {
    let processed = GpxProcessor::process(TWO_SEGMENTS.as_bytes()).unwrap();
    let (start, end) = processed.time_range(None);

    assert_eq!(start.unwrap().unix_timestamp(), 1_728_108_000);
    assert_eq!(end.unwrap().unix_timestamp(), 1_728_111_660);
}

#[test]
fn test_stored_geometry_gives_same_statistics() {
    let processed = GpxProcessor::process(SINGLE_SEGMENT.as_bytes()).unwrap();

    let points = points_from_geojson(&processed.geometry).unwrap();
    assert_eq!(points.len(), 4);
    assert_eq!(points[1].elevation, Some(230.0));
    assert!(points.iter().all(|p| p.time.is_some()));

    let restored = Track::new(vec![TrackSegment::new(points)]);
    let stats = compute_statistics(&restored).unwrap();
    assert_eq!(stats, processed.statistics);
    assert_eq!(stats.elevation_gain_m, 35.0);
    assert_eq!(stats.elevation_loss_m, 5.0);
    assert_eq!(stats.duration_minutes, 20.0);
}

#[test]
fn test_stored_geometry_without_elevation_keeps_times() {
    let phone = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="phone" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="60.00" lon="10.70"><time>2024-09-25T07:00:00Z</time></trkpt>
      <trkpt lat="60.01" lon="10.70"><time>2024-09-25T07:10:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
    let processed = GpxProcessor::process(phone.as_bytes()).unwrap();

    let points = points_from_geojson(&processed.geometry).unwrap();
    assert!(points.iter().all(|p| p.elevation.is_none()));
    assert_eq!(points[0].time.unwrap().unix_timestamp(), 1_727_247_600);

    let restored = Track::new(vec![TrackSegment::new(points)]);
    let stats = compute_statistics(&restored).unwrap();
    assert_eq!(stats, processed.statistics);
    assert_eq!(stats.duration_minutes, 10.0);
    assert_eq!(stats.min_elevation_m, 0.0);
}

#[test]
fn test_document_without_tracks_is_empty() {
    let waypoints_only = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <wpt lat="61.0" lon="11.0"><name>Post 1</name></wpt>
</gpx>"#;

    let processed = GpxProcessor::process(waypoints_only.as_bytes()).unwrap();
    assert_eq!(processed.point_count, 0);
    assert_eq!(processed.geometry.value, Value::LineString(vec![]));
    assert_eq!(processed.statistics.distance_km, 0.0);
    assert_eq!(processed.statistics.duration_minutes, 0.0);
    assert!(processed.start_time.is_none());
}

#[test]
fn test_text_that_is_not_gpx_is_rejected() {
    assert!(GpxProcessor::process(b"lat,lon\n61.0,11.0\n").is_err());
    assert!(GpxProcessor::to_text(&[0xff, 0xfe, 0x00]).is_err());
}
