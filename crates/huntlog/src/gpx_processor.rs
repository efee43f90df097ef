use bytes::Buf as _;
use geojson::Geometry;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::{
    geometry,
    statistics::{self, TrackStatistics},
    track::Track,
};

#[derive(Debug, Error)]
pub enum TrackDecodeError {
    #[error("Failed to parse GPX: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("GPX document is not valid UTF-8")]
    Encoding,
}

pub struct GpxProcessor;

/// Geometry and statistics derived from one GPX document.
#[derive(Debug, Clone)]
pub struct ProcessedTrack {
    pub name: Option<String>,
    pub geometry: Geometry,
    pub statistics: TrackStatistics,
    pub start_time: Option<OffsetDateTime>,
    pub end_time: Option<OffsetDateTime>,
    pub point_count: usize,
}

impl ProcessedTrack {
    /// Start and end time of the track.
    ///
    /// Timestamps in the document win. Without them the start falls back to
    /// `fallback_start` and the end is estimated as start plus the computed
    /// duration.
    pub fn time_range(
        &self,
        fallback_start: Option<OffsetDateTime>,
    ) -> (Option<OffsetDateTime>, Option<OffsetDateTime>) {
        let start = self.start_time.or(fallback_start);
        let end = self.end_time.or_else(|| {
            start.map(|s| s + Duration::seconds_f64(self.statistics.duration_minutes * 60.0))
        });
        (start, end)
    }
}

impl GpxProcessor {
    /// Decodes a GPX document into a [`Track`].
    pub fn decode(content: &[u8]) -> Result<Track, TrackDecodeError> {
        let doc = gpx::read(content.reader())?;
        Ok(Track::from(&doc))
    }

    /// Decodes the document and derives its geometry and statistics.
    ///
    /// Decoding failures are returned; statistics failures are not, the
    /// statistics fall back to the zero record instead.
    pub fn process(content: &[u8]) -> Result<ProcessedTrack, TrackDecodeError> {
        let track = Self::decode(content)?;
        Ok(Self::process_track(&track))
    }

    pub fn process_track(track: &Track) -> ProcessedTrack {
        let bounds = track.time_bounds();
        ProcessedTrack {
            name: track.name.clone(),
            geometry: geometry::to_geojson(track),
            statistics: statistics::statistics_or_zero(track),
            start_time: bounds.map(|(start, _)| start),
            end_time: bounds.map(|(_, end)| end),
            point_count: track.point_count(),
        }
    }

    /// Returns the document as text for storage alongside the parsed track.
    pub fn to_text(content: &[u8]) -> Result<String, TrackDecodeError> {
        std::str::from_utf8(content)
            .map(str::to_owned)
            .map_err(|_| TrackDecodeError::Encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="huntlog-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Elgjakt Nordmarka</name>
    <trkseg>
      <trkpt lat="60.0000000" lon="10.7000000">
        <ele>250.0</ele>
        <time>2024-09-25T07:00:00Z</time>
      </trkpt>
      <trkpt lat="60.0100000" lon="10.7000000">
        <ele>200.0</ele>
        <time>2024-09-25T07:15:00Z</time>
      </trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

    #[test]
    fn test_process_sample_document() {
        let processed = GpxProcessor::process(SAMPLE.as_bytes()).unwrap();

        assert_eq!(processed.name.as_deref(), Some("Elgjakt Nordmarka"));
        assert_eq!(processed.point_count, 2);
        assert_eq!(processed.statistics.elevation_loss_m, 50.0);
        assert_eq!(processed.statistics.duration_minutes, 15.0);
        assert!(processed.statistics.distance_km > 1.0);

        let start = processed.start_time.unwrap();
        let end = processed.end_time.unwrap();
        assert_eq!((end - start).whole_minutes(), 15);

        let json = serde_json::to_value(&processed.geometry).unwrap();
        assert_eq!(json["type"], "LineString");
        assert_eq!(json["coordinates"][0].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_time_range_falls_back_to_start_plus_duration() {
        let processed = GpxProcessor::process(SAMPLE.as_bytes()).unwrap();
        let fallback = OffsetDateTime::from_unix_timestamp(0).unwrap();
        assert_eq!(
            processed.time_range(Some(fallback)),
            (processed.start_time, processed.end_time)
        );

        let untimed = GpxProcessor::process(
            br#"<?xml version="1.0"?>
<gpx version="1.1" creator="t" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg>
    <trkpt lat="60.0" lon="10.7"/>
    <trkpt lat="60.01" lon="10.7"/>
  </trkseg></trk>
</gpx>"#,
        )
        .unwrap();
        assert_eq!(untimed.time_range(None), (None, None));
        assert_eq!(
            untimed.time_range(Some(fallback)),
            (Some(fallback), Some(fallback))
        );
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(GpxProcessor::process(b"<gpx><trk>").is_err());
        assert!(GpxProcessor::process(b"not xml at all").is_err());
    }

    #[test]
    fn test_to_text_rejects_invalid_utf8() {
        assert!(matches!(
            GpxProcessor::to_text(&[0xff, 0xfe, 0x00]),
            Err(TrackDecodeError::Encoding)
        ));
        assert_eq!(GpxProcessor::to_text(b"<gpx/>").unwrap(), "<gpx/>");
    }
}
