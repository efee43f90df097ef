//! GPX file generation from tracks.
//!
//! Writes GPX 1.1 XML the way a handheld or dog collar export looks: one
//! `<trk>` with a `<trkseg>` per recorded segment.

use std::fmt::Write as _;

use huntlog::track::{Track, TrackPoint};
use time::format_description::well_known::Rfc3339;

/// Generates a GPX 1.1 document for a track.
pub fn generate_gpx(track: &Track, name: &str) -> Vec<u8> {
    let mut gpx = String::new();

    gpx.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    gpx.push('\n');
    gpx.push_str(r#"<gpx version="1.1" creator="huntlog-test-data""#);
    gpx.push_str(r#" xmlns="http://www.topografix.com/GPX/1/1""#);
    gpx.push_str(r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#);
    gpx.push_str(r#" xsi:schemaLocation="http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd">"#);
    gpx.push('\n');

    let name = escape_xml(name);
    let _ = writeln!(gpx, "  <metadata>\n    <name>{name}</name>\n  </metadata>");
    let _ = writeln!(gpx, "  <trk>\n    <name>{name}</name>");

    for segment in &track.segments {
        gpx.push_str("    <trkseg>\n");
        for point in &segment.points {
            write_point(&mut gpx, point);
        }
        gpx.push_str("    </trkseg>\n");
    }

    gpx.push_str("  </trk>\n</gpx>\n");
    gpx.into_bytes()
}

fn write_point(gpx: &mut String, point: &TrackPoint) {
    let _ = writeln!(
        gpx,
        r#"      <trkpt lat="{:.7}" lon="{:.7}">"#,
        point.lat, point.lon
    );
    if let Some(ele) = point.elevation {
        let _ = writeln!(gpx, "        <ele>{ele:.2}</ele>");
    }
    if let Some(time) = point.time.and_then(|t| t.format(&Rfc3339).ok()) {
        let _ = writeln!(gpx, "        <time>{time}</time>");
    }
    gpx.push_str("      </trkpt>\n");
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
