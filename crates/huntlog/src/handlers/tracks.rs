//! Track import, preview and retrieval handlers.

use axum::{
    Extension,
    extract::{Multipart, Path},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use geojson::Geometry;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    database::Database,
    errors::{AppError, validate_request},
    geometry,
    gpx_processor::{GpxProcessor, ProcessedTrack},
    handlers::{exports, uploads::read_upload},
    models::{DEFAULT_TRACK_COLOR, TrackRecord, TrackSource},
    object_store_service::{FileType, ObjectStoreService},
    statistics::{self, TrackStatistics},
    track::{Track, TrackSegment},
    types::{CreateTrackRequest, ParsedGpxResponse, validate_color},
};

/// Decodes an uploaded document, rejecting anything that is not GPX text.
fn process_upload(content: &[u8]) -> Result<(String, ProcessedTrack), AppError> {
    let text = GpxProcessor::to_text(content)?;
    let processed = GpxProcessor::process(content)?;
    Ok((text, processed))
}

/// Statistics for a submitted geometry, derived from its positions.
fn statistics_for_geometry(geometry: &Geometry) -> Result<TrackStatistics, AppError> {
    let points = geometry::points_from_geojson(geometry)
        .map_err(|e| AppError::InvalidInput(format!("Invalid track geometry: {e}")))?;
    let track = Track::new(vec![TrackSegment::new(points)]);
    Ok(statistics::statistics_or_zero(&track))
}

async fn check_dog(db: &Database, user_id: Uuid, dog_id: Option<Uuid>) -> Result<(), AppError> {
    if let Some(dog_id) = dog_id
        && db.owned_dog_ids(user_id, &[dog_id]).await?.is_empty()
    {
        return Err(AppError::InvalidInput(format!("Unknown dog: {dog_id}")));
    }
    Ok(())
}

/// Parse a GPX file without saving it.
///
/// Returns the track geometry and statistics so the client can preview the
/// track and submit it later with `POST /hunts/{id}/tracks`.
#[utoipa::path(
    post,
    path = "/tracks/parse-gpx",
    tag = "tracks",
    request_body(content_type = "multipart/form-data", description = "GPX file in the `file` field"),
    responses(
        (status = 200, description = "Parsed track", body = ParsedGpxResponse),
        (status = 400, description = "Missing or invalid GPX file"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn parse_gpx(
    AuthUser(_claims): AuthUser,
    multipart: Multipart,
) -> Result<Json<ParsedGpxResponse>, AppError> {
    let mut form = read_upload(multipart).await?;
    let file = form.require_file()?;

    let (gpx_data, processed) = process_upload(&file.bytes)?;
    let name = processed
        .name
        .clone()
        .unwrap_or_else(|| file.display_name("Imported track"));

    tracing::debug!(points = processed.point_count, "Parsed GPX upload");

    Ok(Json(ParsedGpxResponse {
        name,
        source: TrackSource::GpxImport,
        gpx_data,
        geojson: processed.geometry,
        statistics: processed.statistics,
        start_time: processed.start_time,
        end_time: processed.end_time,
        point_count: processed.point_count,
    }))
}

/// Add a track to a hunt from GPX text or a GeoJSON line.
#[utoipa::path(
    post,
    path = "/hunts/{hunt_id}/tracks",
    tag = "tracks",
    params(("hunt_id" = Uuid, Path, description = "Hunt ID")),
    request_body = CreateTrackRequest,
    responses(
        (status = 201, description = "Track created", body = TrackRecord),
        (status = 400, description = "Invalid track data"),
        (status = 404, description = "Hunt not found"),
        (status = 409, description = "Activity already imported on this hunt")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_track(
    Extension(db): Extension<Database>,
    Extension(storage): Extension<ObjectStoreService>,
    AuthUser(claims): AuthUser,
    Path(hunt_id): Path<Uuid>,
    Json(req): Json<CreateTrackRequest>,
) -> Result<(StatusCode, Json<TrackRecord>), AppError> {
    validate_request(&req)?;

    if !db.hunt_exists(claims.sub, hunt_id).await? {
        return Err(AppError::NotFound);
    }
    check_dog(&db, claims.sub, req.dog_id).await?;

    let id = Uuid::new_v4();
    let (geojson, statistics, start_time, end_time, gpx_object_path) =
        match (req.gpx_data, req.geojson) {
            (Some(gpx_data), _) => {
                let processed = GpxProcessor::process(gpx_data.as_bytes())?;
                let (start, end) = processed.time_range(req.start_time);
                let path = storage
                    .store_gpx(claims.sub, id, Bytes::from(gpx_data))
                    .await?;
                (
                    processed.geometry,
                    req.statistics.unwrap_or(processed.statistics),
                    start,
                    req.end_time.or(end),
                    Some(path),
                )
            }
            (None, Some(geojson)) => {
                let statistics = match req.statistics {
                    Some(stats) => stats,
                    None => statistics_for_geometry(&geojson)?,
                };
                (geojson, statistics, req.start_time, req.end_time, None)
            }
            (None, None) => {
                return Err(AppError::InvalidInput(
                    "Either gpx_data or geojson is required".to_string(),
                ));
            }
        };

    let track = TrackRecord {
        id,
        hunt_id,
        dog_id: req.dog_id,
        name: req.name,
        source: req.source.unwrap_or(TrackSource::Manual),
        garmin_activity_id: req.garmin_activity_id,
        gpx_object_path,
        geojson,
        statistics,
        color: req.color.unwrap_or_else(|| DEFAULT_TRACK_COLOR.to_string()),
        start_time,
        end_time,
        created_at: OffsetDateTime::now_utc(),
    };

    if let Err(e) = db.create_track(&track).await {
        if let Some(path) = &track.gpx_object_path
            && let Err(cleanup) = storage.delete_file(path).await
        {
            tracing::warn!("Failed to remove GPX file {path}: {cleanup}");
        }
        return Err(e);
    }

    tracing::info!(track_id = %track.id, %hunt_id, "Created track");
    Ok((StatusCode::CREATED, Json(track)))
}

/// Upload a GPX file as a new track on a hunt.
///
/// Optional form fields: `name`, `dog_id`, `color`.
#[utoipa::path(
    post,
    path = "/hunts/{hunt_id}/tracks/gpx",
    tag = "tracks",
    params(("hunt_id" = Uuid, Path, description = "Hunt ID")),
    request_body(content_type = "multipart/form-data", description = "GPX file in the `file` field"),
    responses(
        (status = 201, description = "Track created", body = TrackRecord),
        (status = 400, description = "Missing or invalid GPX file"),
        (status = 404, description = "Hunt not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_track_gpx(
    Extension(db): Extension<Database>,
    Extension(storage): Extension<ObjectStoreService>,
    AuthUser(claims): AuthUser,
    Path(hunt_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<TrackRecord>), AppError> {
    let mut form = read_upload(multipart).await?;
    let file = form.require_file()?;

    if !matches!(file.file_type(), FileType::Gpx | FileType::Other) {
        return Err(AppError::InvalidInput(
            "Only GPX files are accepted".to_string(),
        ));
    }

    if !db.hunt_exists(claims.sub, hunt_id).await? {
        return Err(AppError::NotFound);
    }

    let dog_id = form
        .field("dog_id")
        .map(|s| {
            s.parse::<Uuid>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid dog id: {s}")))
        })
        .transpose()?;
    check_dog(&db, claims.sub, dog_id).await?;

    let color = match form.field("color") {
        Some(c) => {
            validate_color(c).map_err(|_| {
                AppError::InvalidInput("Color must be a hex value like #FF6B6B".to_string())
            })?;
            c.to_string()
        }
        None => DEFAULT_TRACK_COLOR.to_string(),
    };

    let (_, processed) = process_upload(&file.bytes)?;
    if processed.point_count == 0 {
        return Err(AppError::InvalidInput(
            "GPX file contains no track points".to_string(),
        ));
    }

    let name = form
        .field("name")
        .map(str::to_string)
        .or_else(|| processed.name.clone())
        .unwrap_or_else(|| file.display_name("Imported track"));

    let id = Uuid::new_v4();
    let gpx_object_path = storage.store_gpx(claims.sub, id, file.bytes).await?;

    let (start_time, end_time) = processed.time_range(None);
    let track = TrackRecord {
        id,
        hunt_id,
        dog_id,
        name,
        source: TrackSource::GpxImport,
        garmin_activity_id: None,
        gpx_object_path: Some(gpx_object_path.clone()),
        geojson: processed.geometry,
        statistics: processed.statistics,
        color,
        start_time,
        end_time,
        created_at: OffsetDateTime::now_utc(),
    };

    if let Err(e) = db.create_track(&track).await {
        if let Err(cleanup) = storage.delete_file(&gpx_object_path).await {
            tracing::warn!("Failed to remove GPX file {gpx_object_path}: {cleanup}");
        }
        return Err(e);
    }

    tracing::info!(
        track_id = %track.id,
        points = processed.point_count,
        "Imported GPX track"
    );
    Ok((StatusCode::CREATED, Json(track)))
}

/// Tracks of one hunt.
#[utoipa::path(
    get,
    path = "/hunts/{hunt_id}/tracks",
    tag = "tracks",
    params(("hunt_id" = Uuid, Path, description = "Hunt ID")),
    responses(
        (status = 200, description = "Tracks ordered by start time", body = Vec<TrackRecord>),
        (status = 404, description = "Hunt not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_hunt_tracks(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(hunt_id): Path<Uuid>,
) -> Result<Json<Vec<TrackRecord>>, AppError> {
    if !db.hunt_exists(claims.sub, hunt_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(db.list_tracks(claims.sub, hunt_id).await?))
}

#[utoipa::path(
    get,
    path = "/tracks/{id}",
    tag = "tracks",
    params(("id" = Uuid, Path, description = "Track ID")),
    responses(
        (status = 200, description = "Track", body = TrackRecord),
        (status = 404, description = "Track not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_track(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackRecord>, AppError> {
    let track = db.get_track(claims.sub, id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(track))
}

/// Delete a track and its stored GPX file.
#[utoipa::path(
    delete,
    path = "/tracks/{id}",
    tag = "tracks",
    params(("id" = Uuid, Path, description = "Track ID")),
    responses(
        (status = 204, description = "Track deleted"),
        (status = 404, description = "Track not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_track(
    Extension(db): Extension<Database>,
    Extension(storage): Extension<ObjectStoreService>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let track = db
        .delete_track(claims.sub, id)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(path) = track.gpx_object_path
        && let Err(e) = storage.delete_file(&path).await
    {
        tracing::warn!("Failed to remove GPX file {path}: {e}");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Download a track as GPX.
///
/// Returns the uploaded document when one was stored, otherwise a document
/// rebuilt from the track geometry.
#[utoipa::path(
    get,
    path = "/tracks/{id}/gpx",
    tag = "tracks",
    params(("id" = Uuid, Path, description = "Track ID")),
    responses(
        (status = 200, description = "GPX document", content_type = "application/gpx+xml"),
        (status = 404, description = "Track not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_track_gpx(
    Extension(db): Extension<Database>,
    Extension(storage): Extension<ObjectStoreService>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let track = db.get_track(claims.sub, id).await?.ok_or(AppError::NotFound)?;

    let stored = match &track.gpx_object_path {
        Some(path) => match storage.get_file(path).await {
            Ok(bytes) => Some(bytes),
            Err(AppError::NotFound) => {
                tracing::warn!("GPX file {path} missing for track {id}, rebuilding");
                None
            }
            Err(e) => return Err(e),
        },
        None => None,
    };
    let body = match stored {
        Some(bytes) => bytes,
        None => Bytes::from(exports::track_gpx(&track)?),
    };

    let disposition = format!("attachment; filename=\"track-{id}.gpx\"");
    Ok((
        [
            (header::CONTENT_TYPE, FileType::Gpx.as_mime_str().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
