//! OpenAPI document served through Swagger UI.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{auth, handlers};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Huntlog API",
        description = "Hunting log with dogs, GPS tracks, photos and Garmin Connect import"
    ),
    paths(
        handlers::service_info,
        handlers::health_check,
        handlers::get_statistics,
        auth::register,
        auth::login,
        auth::me,
        auth::update_settings,
        handlers::list_dogs,
        handlers::create_dog,
        handlers::get_dog,
        handlers::update_dog,
        handlers::delete_dog,
        handlers::get_dog_statistics,
        handlers::create_hunt,
        handlers::list_hunts,
        handlers::get_hunt,
        handlers::update_hunt,
        handlers::delete_hunt,
        handlers::toggle_favorite,
        handlers::parse_gpx,
        handlers::create_track,
        handlers::upload_track_gpx,
        handlers::list_hunt_tracks,
        handlers::get_track,
        handlers::delete_track,
        handlers::download_track_gpx,
        handlers::upload_photo,
        handlers::list_photos,
        handlers::get_photo_file,
        handlers::update_photo,
        handlers::delete_photo,
        handlers::garmin_login,
        handlers::garmin_activities,
        handlers::garmin_sync,
        handlers::list_sync_logs,
        handlers::export_hunts,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and user settings"),
        (name = "dogs", description = "Hunting dogs"),
        (name = "hunts", description = "Hunt log entries"),
        (name = "tracks", description = "GPS tracks and GPX import"),
        (name = "photos", description = "Hunt photos"),
        (name = "garmin", description = "Garmin Connect import"),
        (name = "exports", description = "JSON and GPX export"),
        (name = "stats", description = "Service status and statistics")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
