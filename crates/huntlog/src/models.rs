use geojson::Geometry;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime, Time};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::statistics::TrackStatistics;

pub const DEFAULT_DOG_COLOR: &str = "#FF6B6B";
pub const DEFAULT_TRACK_COLOR: &str = "#4ECDC4";
pub const DEFAULT_COUNTRY: &str = "Norge";

/// `HH:MM` wall-clock times. `HH:MM:SS` is accepted on input.
pub mod clock_time {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
    use time::{Time, macros::format_description};

    pub fn serialize<S: Serializer>(value: &Option<Time>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => {
                let text = t
                    .format(format_description!("[hour]:[minute]"))
                    .map_err(S::Error::custom)?;
                s.serialize_some(&text)
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Time>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        parse(&raw).map(Some).map_err(D::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<Time, time::error::Parse> {
        Time::parse(raw, format_description!("[hour]:[minute]:[second]"))
            .or_else(|_| Time::parse(raw, format_description!("[hour]:[minute]")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[sqlx(json)]
    pub settings: UserSettings,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn new(email: String, name: String) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            settings: UserSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct UserSettings {
    pub theme: String,
    pub language: String,
    pub units: String,
    pub map_style: String,
    pub auto_sync_garmin: bool,
    pub notification_preferences: NotificationPreferences,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            language: "no".to_string(),
            units: "metric".to_string(),
            map_style: "terrain".to_string(),
            auto_sync_garmin: false,
            notification_preferences: NotificationPreferences::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct NotificationPreferences {
    pub email_summary: bool,
    pub new_track_imported: bool,
    pub backup_reminder: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_summary: true,
            new_track_imported: true,
            backup_reminder: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Dog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub breed: String,
    pub birth_date: Option<Date>,
    pub color: String,
    pub garmin_collar_id: Option<String>,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Where a hunt took place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HuntLocation {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
    /// `[lat, lng]`
    #[serde(default)]
    #[schema(value_type = Option<Vec<f64>>)]
    pub coordinates: Option<[f64; 2]>,
    /// `[[south, west], [north, east]]`
    #[serde(default)]
    #[schema(value_type = Option<Vec<Vec<f64>>>)]
    pub bounds: Option<[[f64; 2]; 2]>,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeatherConditions {
    /// Celsius.
    pub temperature: Option<f64>,
    /// Percent.
    pub humidity: Option<f64>,
    /// Meters per second.
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<String>,
    pub precipitation: Option<String>,
    pub conditions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GameObservation {
    #[serde(rename = "type")]
    pub game_type: String,
    #[serde(default = "default_count")]
    pub count: i32,
    #[serde(default, with = "clock_time")]
    #[schema(value_type = Option<String>)]
    pub time: Option<Time>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<f64>>)]
    pub location: Option<[f64; 2]>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HarvestedGame {
    #[serde(rename = "type")]
    pub game_type: String,
    #[serde(default = "default_count")]
    pub count: i32,
    /// Kilograms.
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default, with = "clock_time")]
    #[schema(value_type = Option<String>)]
    pub time: Option<Time>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<f64>>)]
    pub location: Option<[f64; 2]>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_count() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Hunt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub date: Date,
    #[serde(default, with = "clock_time")]
    #[schema(value_type = Option<String>)]
    pub start_time: Option<Time>,
    #[serde(default, with = "clock_time")]
    #[schema(value_type = Option<String>)]
    pub end_time: Option<Time>,
    #[sqlx(json)]
    pub location: HuntLocation,
    #[sqlx(json)]
    pub weather: Option<WeatherConditions>,
    pub game_type: Vec<String>,
    #[sqlx(json)]
    pub game_seen: Vec<GameObservation>,
    #[sqlx(json)]
    pub game_harvested: Vec<HarvestedGame>,
    pub notes: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "track_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    Garmin,
    GpxImport,
    Manual,
}

/// A stored track belonging to a hunt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TrackRecord {
    pub id: Uuid,
    pub hunt_id: Uuid,
    pub dog_id: Option<Uuid>,
    pub name: String,
    pub source: TrackSource,
    pub garmin_activity_id: Option<String>,
    #[serde(skip_serializing)]
    pub gpx_object_path: Option<String>,
    #[sqlx(json)]
    #[schema(value_type = Object)]
    pub geojson: Geometry,
    #[sqlx(json)]
    pub statistics: TrackStatistics,
    pub color: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Photo {
    pub id: Uuid,
    pub hunt_id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub file_size: i64,
    pub mime_type: String,
    #[serde(skip_serializing, default)]
    pub object_path: String,
    pub url: String,
    pub caption: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub taken_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sync_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GarminSyncLog {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub sync_started_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub sync_completed_at: Option<OffsetDateTime>,
    pub status: SyncStatus,
    pub tracks_imported: i32,
    pub error_message: Option<String>,
}

/// Totals across all of a user's hunts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HuntingStatistics {
    pub total_hunts: i64,
    pub total_distance_km: f64,
    pub total_duration_hours: f64,
    pub total_photos: i64,
    pub active_dogs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DogStatistics {
    pub dog_id: Uuid,
    pub total_hunts: i64,
    pub total_tracks: i64,
    pub total_distance_km: f64,
    pub total_duration_hours: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::time;

    #[test]
    fn test_default_settings() {
        let json = serde_json::to_value(UserSettings::default()).unwrap();
        assert_eq!(json["theme"], "dark");
        assert_eq!(json["language"], "no");
        assert_eq!(json["notification_preferences"]["backup_reminder"], true);

        let partial: UserSettings = serde_json::from_str(r#"{"theme": "light"}"#).unwrap();
        assert_eq!(partial.theme, "light");
        assert_eq!(partial.units, "metric");
    }

    #[test]
    fn test_location_defaults_country() {
        let location: HuntLocation =
            serde_json::from_str(r#"{"name": "Nordmarka", "coordinates": [60.05, 10.65]}"#)
                .unwrap();
        assert_eq!(location.country, "Norge");
        assert_eq!(location.coordinates, Some([60.05, 10.65]));
        assert!(location.bounds.is_none());
    }

    #[test]
    fn test_game_observation_wire_format() {
        let seen: GameObservation =
            serde_json::from_str(r#"{"type": "elg", "count": 2, "time": "07:45"}"#).unwrap();
        assert_eq!(seen.game_type, "elg");
        assert_eq!(seen.time, Some(time!(7:45)));

        let json = serde_json::to_value(&seen).unwrap();
        assert_eq!(json["type"], "elg");
        assert_eq!(json["time"], "07:45");
    }

    #[test]
    fn test_clock_time_accepts_seconds() {
        assert_eq!(clock_time::parse("18:05:30").unwrap(), time!(18:05:30));
        assert_eq!(clock_time::parse("06:00").unwrap(), time!(6:00));
        assert!(clock_time::parse("25:00").is_err());
    }

    #[test]
    fn test_track_source_names() {
        assert_eq!(
            serde_json::to_value(TrackSource::GpxImport).unwrap(),
            "gpx_import"
        );
        assert_eq!(
            serde_json::to_value(SyncStatus::InProgress).unwrap(),
            "in_progress"
        );
    }
}
