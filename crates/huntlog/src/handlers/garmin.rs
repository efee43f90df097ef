//! Garmin Connect login, activity listing and sync handlers.

use std::collections::HashSet;

use async_trait::async_trait;
use axum::{Extension, extract::Query, response::Json};
use bytes::Bytes;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    database::Database,
    errors::{AppError, validate_request},
    garmin::{ActivityRange, ActivitySummary, GarminCredentials},
    garmin_sync::{GarminSyncService, ImportedTrack, SyncOutcome},
    models::{DEFAULT_TRACK_COLOR, GarminSyncLog, SyncStatus, TrackRecord, TrackSource},
    object_store_service::ObjectStoreService,
    types::{
        GarminActivitiesRequest, GarminLoginResponse, GarminSyncRequest, GarminSyncResponse,
        SyncLogQuery,
    },
};

const DEFAULT_ACTIVITY_LIMIT: u32 = 20;

/// Resolves the listing range of an activities request.
pub fn activity_range(
    start_date: Option<Date>,
    end_date: Option<Date>,
    limit: Option<u32>,
    today: Date,
) -> Result<ActivityRange, AppError> {
    match (start_date, end_date) {
        (None, None) => Ok(ActivityRange::Recent {
            limit: limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT),
        }),
        (None, Some(_)) => Err(AppError::InvalidInput(
            "start_date is required when end_date is given".to_string(),
        )),
        (Some(start), end) => {
            let end = end.unwrap_or(today);
            if start > end {
                return Err(AppError::InvalidInput(
                    "start_date must not be after end_date".to_string(),
                ));
            }
            Ok(ActivityRange::Between { start, end })
        }
    }
}

/// Check Garmin Connect credentials.
#[utoipa::path(
    post,
    path = "/garmin/login",
    tag = "garmin",
    request_body = GarminCredentials,
    responses(
        (status = 200, description = "Credentials accepted", body = GarminLoginResponse),
        (status = 401, description = "Garmin rejected the credentials"),
        (status = 502, description = "Garmin Connect unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn garmin_login(
    Extension(garmin): Extension<GarminSyncService>,
    AuthUser(_claims): AuthUser,
    Json(credentials): Json<GarminCredentials>,
) -> Result<Json<GarminLoginResponse>, AppError> {
    validate_request(&credentials)?;

    let session = garmin.authenticate(&credentials).await?;
    Ok(Json(GarminLoginResponse {
        success: true,
        display_name: session.display_name,
    }))
}

/// List Garmin activities, by date range or the most recent ones.
#[utoipa::path(
    post,
    path = "/garmin/activities",
    tag = "garmin",
    request_body = GarminActivitiesRequest,
    responses(
        (status = 200, description = "Activity metadata", body = Vec<ActivitySummary>),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Garmin rejected the credentials"),
        (status = 502, description = "Garmin Connect unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn garmin_activities(
    Extension(garmin): Extension<GarminSyncService>,
    AuthUser(_claims): AuthUser,
    Json(req): Json<GarminActivitiesRequest>,
) -> Result<Json<Vec<ActivitySummary>>, AppError> {
    validate_request(&req)?;

    let range = activity_range(
        req.start_date,
        req.end_date,
        req.limit,
        OffsetDateTime::now_utc().date(),
    )?;
    let session = garmin.authenticate(&req.credentials).await?;
    let activities = garmin.provider().list_activities(&session, range).await?;

    Ok(Json(activities))
}

/// Import recent Garmin activities as tracks.
///
/// Without `hunt_id` the processed tracks are only returned. With it they are
/// stored on the hunt, skipping activities the hunt already has.
#[utoipa::path(
    post,
    path = "/garmin/sync",
    tag = "garmin",
    request_body = GarminSyncRequest,
    responses(
        (status = 200, description = "Sync result", body = GarminSyncResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Garmin rejected the credentials"),
        (status = 404, description = "Hunt not found"),
        (status = 502, description = "Garmin Connect unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn garmin_sync(
    Extension(db): Extension<Database>,
    Extension(storage): Extension<ObjectStoreService>,
    Extension(garmin): Extension<GarminSyncService>,
    AuthUser(claims): AuthUser,
    Json(req): Json<GarminSyncRequest>,
) -> Result<Json<GarminSyncResponse>, AppError> {
    validate_request(&req)?;

    if let Some(hunt_id) = req.hunt_id
        && !db.hunt_exists(claims.sub, hunt_id).await?
    {
        return Err(AppError::NotFound);
    }
    if let Some(dog_id) = req.dog_id
        && db.owned_dog_ids(claims.sub, &[dog_id]).await?.is_empty()
    {
        return Err(AppError::InvalidInput(format!("Unknown dog: {dog_id}")));
    }

    let log = db.start_sync_log(claims.sub).await?;
    tracing::info!(sync_log_id = %log.id, days_back = req.days_back, "Garmin sync started");

    match run_sync(&db, &storage, &garmin, claims.sub, &req).await {
        Ok((tracks_imported, outcome)) => {
            db.finish_sync_log(log.id, SyncStatus::Completed, tracks_imported, None)
                .await?;
            Ok(Json(GarminSyncResponse {
                sync_log_id: log.id,
                tracks_imported,
                tracks: outcome.tracks,
                skipped: outcome.skipped,
            }))
        }
        Err(SyncFailure { persisted, error }) => {
            tracing::warn!(sync_log_id = %log.id, persisted, "Garmin sync failed: {error}");
            db.finish_sync_log(log.id, SyncStatus::Failed, persisted, Some(&error.to_string()))
                .await?;
            Err(error)
        }
    }
}

/// A sync that stopped early, with the number of tracks already committed.
#[derive(Debug)]
struct SyncFailure {
    persisted: i32,
    error: AppError,
}

impl From<AppError> for SyncFailure {
    fn from(error: AppError) -> Self {
        Self {
            persisted: 0,
            error,
        }
    }
}

async fn run_sync(
    db: &Database,
    storage: &ObjectStoreService,
    garmin: &GarminSyncService,
    user_id: Uuid,
    req: &GarminSyncRequest,
) -> Result<(i32, SyncOutcome), SyncFailure> {
    let session = garmin.authenticate(&req.credentials).await.map_err(AppError::from)?;
    let activities = garmin.recent_activities(&session, req.days_back).await.map_err(AppError::from)?;
    let outcome = garmin.import(&session, activities).await;

    let Some(hunt_id) = req.hunt_id else {
        return Ok((outcome.tracks.len() as i32, outcome));
    };

    let existing = db.garmin_activity_ids(hunt_id).await?;
    let sink = HuntTracks {
        db,
        storage,
        user_id,
        hunt_id,
        dog_id: req.dog_id,
    };
    let persisted = persist_new_tracks(&outcome.tracks, &existing, &sink).await?;

    Ok((persisted, outcome))
}

/// Persists tracks whose activity is not in `existing`, in order.
///
/// Duplicates rejected by the database are skipped. Any other error stops the
/// run and reports how many tracks were stored before it.
async fn persist_new_tracks(
    tracks: &[ImportedTrack],
    existing: &HashSet<String>,
    sink: &impl TrackSink,
) -> Result<i32, SyncFailure> {
    let mut persisted = 0;
    for imported in tracks {
        let activity_id = imported.activity_id.to_string();
        if existing.contains(&activity_id) {
            tracing::debug!("Garmin activity {activity_id} already stored");
            continue;
        }
        match sink.persist(imported).await {
            Ok(()) => persisted += 1,
            Err(AppError::Conflict(_)) => {}
            Err(error) => return Err(SyncFailure { persisted, error }),
        }
    }
    Ok(persisted)
}

/// Where synced tracks are stored.
#[async_trait]
trait TrackSink: Sync {
    async fn persist(&self, imported: &ImportedTrack) -> Result<(), AppError>;
}

/// Stores tracks on a hunt, with the original GPX in the object store.
struct HuntTracks<'a> {
    db: &'a Database,
    storage: &'a ObjectStoreService,
    user_id: Uuid,
    hunt_id: Uuid,
    dog_id: Option<Uuid>,
}

#[async_trait]
impl TrackSink for HuntTracks<'_> {
    async fn persist(&self, imported: &ImportedTrack) -> Result<(), AppError> {
        let id = Uuid::new_v4();
        let path = self
            .storage
            .store_gpx(self.user_id, id, Bytes::from(imported.gpx_data.clone()))
            .await?;

        let track = TrackRecord {
            id,
            hunt_id: self.hunt_id,
            dog_id: self.dog_id,
            name: imported.name.clone(),
            source: TrackSource::Garmin,
            garmin_activity_id: Some(imported.activity_id.to_string()),
            gpx_object_path: Some(path.clone()),
            geojson: imported.geojson.clone(),
            statistics: imported.statistics,
            color: DEFAULT_TRACK_COLOR.to_string(),
            start_time: imported.start_time,
            end_time: imported.end_time,
            created_at: OffsetDateTime::now_utc(),
        };

        if let Err(e) = self.db.create_track(&track).await {
            if let Err(cleanup) = self.storage.delete_file(&path).await {
                tracing::warn!("Failed to remove GPX file {path}: {cleanup}");
            }
            return Err(e);
        }
        Ok(())
    }
}

/// Recent Garmin sync runs, newest first.
#[utoipa::path(
    get,
    path = "/garmin/sync-logs",
    tag = "garmin",
    params(SyncLogQuery),
    responses(
        (status = 200, description = "Sync log entries", body = Vec<GarminSyncLog>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_sync_logs(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Query(query): Query<SyncLogQuery>,
) -> Result<Json<Vec<GarminSyncLog>>, AppError> {
    let limit = query.limit.clamp(1, 100);
    Ok(Json(db.list_sync_logs(claims.sub, limit).await?))
}
