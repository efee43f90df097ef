//! Response types for API endpoints.

use geojson::Geometry;
use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    garmin_sync::{ImportedTrack, SkippedActivity},
    models::{Dog, Hunt, Photo, TrackRecord, TrackSource},
    statistics::TrackStatistics,
};

/// Dog reference embedded in hunt responses.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct DogSummary {
    pub id: Uuid,
    pub name: String,
    pub breed: String,
    pub color: String,
}

impl From<&Dog> for DogSummary {
    fn from(dog: &Dog) -> Self {
        Self {
            id: dog.id,
            name: dog.name.clone(),
            breed: dog.breed.clone(),
            color: dog.color.clone(),
        }
    }
}

/// A hunt with its dogs, tracks and photos.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HuntDetail {
    #[serde(flatten)]
    pub hunt: Hunt,
    pub dogs: Vec<DogSummary>,
    pub tracks: Vec<TrackRecord>,
    pub photos: Vec<Photo>,
}

/// Preview of an uploaded GPX document. Nothing is persisted.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParsedGpxResponse {
    pub name: String,
    pub source: TrackSource,
    pub gpx_data: String,
    #[schema(value_type = Object)]
    pub geojson: Geometry,
    pub statistics: TrackStatistics,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub point_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GarminLoginResponse {
    pub success: bool,
    pub display_name: Option<String>,
}

/// Result of a Garmin sync run.
#[derive(Debug, Serialize, ToSchema)]
pub struct GarminSyncResponse {
    pub sync_log_id: Uuid,
    /// Number of tracks persisted on the target hunt.
    pub tracks_imported: i32,
    /// Every successfully processed activity.
    pub tracks: Vec<ImportedTrack>,
    pub skipped: Vec<SkippedActivity>,
}

/// JSON export bundle.
#[derive(Debug, Serialize, ToSchema)]
pub struct ExportBundle {
    #[serde(with = "time::serde::rfc3339")]
    pub exported_at: OffsetDateTime,
    pub hunts: Vec<HuntDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub status: String,
}
