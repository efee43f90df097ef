//! HTTP request handlers for the hunting log API.
//!
//! This module re-exports handlers from focused submodules organized by domain.

// Utility submodules
pub mod pagination;
pub mod uploads;

// Handler modules
pub mod dogs;
pub mod exports;
pub mod garmin;
pub mod hunts;
pub mod photos;
pub mod stats;
pub mod tracks;

// Re-export handlers from submodules (including utoipa __path types for OpenAPI)
pub use dogs::{
    __path_create_dog, __path_delete_dog, __path_get_dog, __path_get_dog_statistics,
    __path_list_dogs, __path_update_dog, create_dog, delete_dog, get_dog, get_dog_statistics,
    list_dogs, update_dog,
};
pub use exports::{__path_export_hunts, build_gpx, export_hunts, track_gpx};
pub use garmin::{
    __path_garmin_activities, __path_garmin_login, __path_garmin_sync, __path_list_sync_logs,
    garmin_activities, garmin_login, garmin_sync, list_sync_logs,
};
pub use hunts::{
    __path_create_hunt, __path_delete_hunt, __path_get_hunt, __path_list_hunts,
    __path_toggle_favorite, __path_update_hunt, FavoriteResponse, create_hunt, delete_hunt,
    get_hunt, list_hunts, toggle_favorite, update_hunt,
};
pub use pagination::PaginatedResponse;
pub use photos::{
    __path_delete_photo, __path_get_photo_file, __path_list_photos, __path_update_photo,
    __path_upload_photo, MAX_PHOTO_BYTES, delete_photo, get_photo_file, list_photos,
    update_photo, upload_photo,
};
pub use stats::{
    __path_get_statistics, __path_health_check, __path_service_info, get_statistics,
    health_check, service_info,
};
pub use tracks::{
    __path_create_track, __path_delete_track, __path_download_track_gpx, __path_get_track,
    __path_list_hunt_tracks, __path_parse_gpx, __path_upload_track_gpx, create_track,
    delete_track, download_track_gpx, get_track, list_hunt_tracks, parse_gpx, upload_track_gpx,
};
