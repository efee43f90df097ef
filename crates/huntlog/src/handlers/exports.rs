//! Hunt export as a JSON bundle or a combined GPX document.

use axum::{
    Extension,
    extract::Query,
    http::header,
    response::{IntoResponse, Response},
};
use geo::Point;
use gpx::{Gpx, GpxVersion, Waypoint};
use time::OffsetDateTime;

use crate::{
    auth::AuthUser,
    database::Database,
    errors::AppError,
    geometry,
    handlers::hunts::load_details,
    models::TrackRecord,
    object_store_service::FileType,
    types::{ExportBundle, ExportFormat, ExportQuery, HuntDetail},
};

const GPX_CREATOR: &str = "huntlog";

fn gpx_track(name: String, record: &TrackRecord) -> Result<gpx::Track, AppError> {
    let points = geometry::points_from_geojson(&record.geojson)?;

    let waypoints = points
        .iter()
        .map(|p| {
            let mut wp = Waypoint::new(Point::new(p.lon, p.lat));
            wp.elevation = p.elevation;
            wp.time = p.time.map(gpx::Time::from);
            wp
        })
        .collect();

    let mut track = gpx::Track::new();
    track.name = Some(name);
    track.segments = vec![gpx::TrackSegment { points: waypoints }];
    Ok(track)
}

fn write_gpx(tracks: Vec<gpx::Track>) -> Result<Vec<u8>, AppError> {
    let doc = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(GPX_CREATOR.to_string()),
        tracks,
        ..Default::default()
    };

    let mut out = Vec::new();
    gpx::write(&doc, &mut out).map_err(|e| {
        tracing::error!("Failed to write GPX export: {e}");
        AppError::Internal
    })?;
    Ok(out)
}

/// One `<trk>` per stored track, named "{hunt title} - {track name}".
pub fn build_gpx(hunts: &[HuntDetail]) -> Result<Vec<u8>, AppError> {
    let tracks = hunts
        .iter()
        .flat_map(|detail| {
            detail.tracks.iter().map(move |track| {
                gpx_track(format!("{} - {}", detail.hunt.title, track.name), track)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    write_gpx(tracks)
}

/// A single stored track as a GPX document.
pub fn track_gpx(record: &TrackRecord) -> Result<Vec<u8>, AppError> {
    write_gpx(vec![gpx_track(record.name.clone(), record)?])
}

fn export_filename(extension: &str) -> String {
    format!(
        "jaktlogg-{}.{extension}",
        chrono::Utc::now().format("%Y%m%d-%H%M%S")
    )
}

/// Export hunts.
///
/// `format=json` (default) returns every hunt with its dogs, tracks and photos.
/// `format=gpx` returns one GPX document holding every stored track.
#[utoipa::path(
    get,
    path = "/exports",
    tag = "exports",
    params(ExportQuery),
    responses(
        (status = 200, description = "Export file", body = ExportBundle),
        (status = 400, description = "Unknown format or invalid hunt id"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn export_hunts(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let format = query.format()?;
    let hunt_ids = query.hunt_ids()?;

    let hunts = db.hunts_by_ids(claims.sub, hunt_ids.as_deref()).await?;
    let details = load_details(&db, hunts).await?;
    tracing::info!(hunts = details.len(), ?format, "Exporting hunts");

    let (content_type, extension, body) = match format {
        ExportFormat::Json => {
            let bundle = ExportBundle {
                exported_at: OffsetDateTime::now_utc(),
                hunts: details,
            };
            ("application/json", "json", serde_json::to_vec_pretty(&bundle)?)
        }
        ExportFormat::Gpx => (FileType::Gpx.as_mime_str(), "gpx", build_gpx(&details)?),
    };

    let disposition = format!("attachment; filename=\"{}\"", export_filename(extension));
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
