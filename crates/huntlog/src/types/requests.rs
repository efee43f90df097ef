//! Request body types for API endpoints.

use geojson::Geometry;
use serde::Deserialize;
use time::{Date, OffsetDateTime, Time};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    garmin::GarminCredentials,
    models::{GameObservation, HarvestedGame, HuntLocation, TrackSource, WeatherConditions, clock_time},
    statistics::TrackStatistics,
};

/// Accepts `#RRGGBB` hex colors.
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let hex = color.strip_prefix('#').unwrap_or("");
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("color");
        err.message = Some("Color must be a hex value like #FF6B6B".into());
        Err(err)
    }
}

/// Dog creation request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDogRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Breed must be between 1 and 100 characters"))]
    pub breed: String,
    pub birth_date: Option<Date>,
    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
    pub garmin_collar_id: Option<String>,
    pub photo_url: Option<String>,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Dog update request. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDogRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Breed must be between 1 and 100 characters"))]
    pub breed: Option<String>,
    pub birth_date: Option<Date>,
    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
    pub garmin_collar_id: Option<String>,
    pub photo_url: Option<String>,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

fn default_true() -> bool {
    true
}

/// Hunt creation request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateHuntRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    pub date: Date,
    #[serde(default, with = "clock_time")]
    #[schema(value_type = Option<String>, example = "07:30")]
    pub start_time: Option<Time>,
    #[serde(default, with = "clock_time")]
    #[schema(value_type = Option<String>, example = "15:00")]
    pub end_time: Option<Time>,
    pub location: HuntLocation,
    #[serde(default)]
    pub weather: Option<WeatherConditions>,
    #[serde(default)]
    pub game_type: Vec<String>,
    #[serde(default)]
    pub game_seen: Vec<GameObservation>,
    #[serde(default)]
    pub game_harvested: Vec<HarvestedGame>,
    /// Dogs that took part. Ids of dogs owned by someone else are ignored.
    #[serde(default)]
    pub dog_ids: Vec<Uuid>,
    pub notes: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

/// Hunt update request. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateHuntRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    pub date: Option<Date>,
    #[serde(default, with = "clock_time")]
    #[schema(value_type = Option<String>)]
    pub start_time: Option<Time>,
    #[serde(default, with = "clock_time")]
    #[schema(value_type = Option<String>)]
    pub end_time: Option<Time>,
    pub location: Option<HuntLocation>,
    pub weather: Option<WeatherConditions>,
    pub game_type: Option<Vec<String>>,
    pub game_seen: Option<Vec<GameObservation>>,
    pub game_harvested: Option<Vec<HarvestedGame>>,
    pub dog_ids: Option<Vec<Uuid>>,
    pub notes: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
}

/// Track creation request for tracks that were not uploaded as a file.
///
/// Either `gpx_data` or `geojson` must be present. When `gpx_data` is given the
/// geometry, statistics and time bounds are derived from it.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTrackRequest {
    #[validate(length(min = 1, max = 200, message = "Track name must be between 1 and 200 characters"))]
    pub name: String,
    pub dog_id: Option<Uuid>,
    pub source: Option<TrackSource>,
    pub garmin_activity_id: Option<String>,
    pub gpx_data: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub geojson: Option<Geometry>,
    pub statistics: Option<TrackStatistics>,
    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
}

/// Photo metadata update.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePhotoRequest {
    #[validate(length(max = 500, message = "Caption must be at most 500 characters"))]
    pub caption: Option<String>,
}

/// Partial update of user settings.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub theme: Option<String>,
    pub language: Option<String>,
    pub units: Option<String>,
    pub map_style: Option<String>,
    pub auto_sync_garmin: Option<bool>,
    pub notification_preferences: Option<NotificationPreferencesUpdate>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NotificationPreferencesUpdate {
    pub email_summary: Option<bool>,
    pub new_track_imported: Option<bool>,
    pub backup_reminder: Option<bool>,
}

/// Garmin activity listing request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GarminActivitiesRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub credentials: GarminCredentials,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

pub fn default_days_back() -> u32 {
    7
}

/// Garmin sync request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GarminSyncRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub credentials: GarminCredentials,
    #[serde(default = "default_days_back")]
    #[validate(range(min = 1, max = 365, message = "days_back must be between 1 and 365"))]
    pub days_back: u32,
    /// Persist imported tracks on this hunt.
    pub hunt_id: Option<Uuid>,
    /// Attribute imported tracks to this dog.
    pub dog_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::validate_request;

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#FF6B6B").is_ok());
        assert!(validate_color("#4ecdc4").is_ok());
        assert!(validate_color("FF6B6B").is_err());
        assert!(validate_color("#FF6B6").is_err());
        assert!(validate_color("#GG6B6B").is_err());
    }

    #[test]
    fn test_create_dog_request_validation() {
        let req: CreateDogRequest = serde_json::from_str(
            r#"{"name": "Bamse", "breed": "Norsk elghund grå", "birth_date": "2019-05-14"}"#,
        )
        .unwrap();
        assert!(req.is_active);
        assert!(validate_request(&req).is_ok());

        let req: CreateDogRequest =
            serde_json::from_str(r#"{"name": "", "breed": "Laika", "color": "red"}"#).unwrap();
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_sync_request_defaults_and_bounds() {
        let req: GarminSyncRequest =
            serde_json::from_str(r#"{"email": "jeger@example.no", "password": "hemmelig"}"#)
                .unwrap();
        assert_eq!(req.days_back, 7);
        assert!(validate_request(&req).is_ok());

        let req: GarminSyncRequest = serde_json::from_str(
            r#"{"email": "jeger@example.no", "password": "hemmelig", "days_back": 400}"#,
        )
        .unwrap();
        assert!(validate_request(&req).is_err());

        let req: GarminSyncRequest =
            serde_json::from_str(r#"{"email": "", "password": "hemmelig"}"#).unwrap();
        let err = validate_request(&req).unwrap_err().to_string();
        assert!(err.contains("Garmin email is required"));
    }

    #[test]
    fn test_create_hunt_request_minimal() {
        let req: CreateHuntRequest = serde_json::from_str(
            r#"{"title": "Elgjakt", "date": "2024-10-01", "location": {"name": "Finnskogen"}}"#,
        )
        .unwrap();
        assert_eq!(req.location.country, "Norge");
        assert!(req.dog_ids.is_empty());
        assert!(req.start_time.is_none());
    }
}
