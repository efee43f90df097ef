pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod garmin;
pub mod garmin_sync;
pub mod geometry;
pub mod gpx_processor;
pub mod handlers;
pub mod models;
pub mod object_store_service;
pub mod openapi;
pub mod query_builder;
pub mod request_id;
pub mod statistics;
pub mod track;
pub mod types;

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, patch, post, put},
};
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{AuthConfig, login, me, register, update_settings},
    config::{AppConfig, CorsOrigins},
    database::Database,
    garmin::{ActivityProvider, GarminClientConfig, GarminConnectClient},
    garmin_sync::GarminSyncService,
    handlers::{
        MAX_PHOTO_BYTES, create_dog, create_hunt, create_track, delete_dog, delete_hunt,
        delete_photo, delete_track, download_track_gpx, export_hunts, garmin_activities,
        garmin_login, garmin_sync, get_dog, get_dog_statistics, get_hunt, get_photo_file,
        get_statistics, get_track, health_check, list_dogs, list_hunt_tracks, list_hunts,
        list_photos, list_sync_logs, parse_gpx, service_info, toggle_favorite, update_dog,
        update_hunt, update_photo, upload_photo, upload_track_gpx,
    },
    object_store_service::ObjectStoreService,
    openapi::ApiDoc,
    request_id::request_id_middleware,
};

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::from(Any),
        CorsOrigins::List(list) => AllowOrigin::list(
            list.iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin {origin:?}");
                        None
                    }
                }),
        ),
    };

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
        .allow_origin(allow_origin)
}

pub fn create_router(
    pool: PgPool,
    config: &AppConfig,
    storage: ObjectStoreService,
    provider: Arc<dyn ActivityProvider>,
) -> Router {
    let db = Database::new(pool);
    let auth = AuthConfig::new(&config.jwt_secret, config.jwt_expiry_minutes);
    let garmin = GarminSyncService::new(provider, config.garmin_sync_limit);

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/statistics", get(get_statistics))
        // Auth routes
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/settings", put(update_settings))
        // Dog routes
        .route("/dogs", get(list_dogs).post(create_dog))
        .route(
            "/dogs/{id}",
            get(get_dog).put(update_dog).delete(delete_dog),
        )
        .route("/dogs/{id}/statistics", get(get_dog_statistics))
        // Hunt routes
        .route("/hunts", get(list_hunts).post(create_hunt))
        .route(
            "/hunts/{id}",
            get(get_hunt).put(update_hunt).delete(delete_hunt),
        )
        .route("/hunts/{id}/favorite", post(toggle_favorite))
        // Track routes
        .route("/tracks/parse-gpx", post(parse_gpx))
        .route(
            "/hunts/{id}/tracks",
            get(list_hunt_tracks).post(create_track),
        )
        .route("/hunts/{id}/tracks/gpx", post(upload_track_gpx))
        .route("/tracks/{id}", get(get_track).delete(delete_track))
        .route("/tracks/{id}/gpx", get(download_track_gpx))
        // Photo routes
        .route("/hunts/{id}/photos", get(list_photos).post(upload_photo))
        .route("/photos/{id}", patch(update_photo).delete(delete_photo))
        .route("/photos/{id}/file", get(get_photo_file))
        // Garmin routes
        .route("/garmin/login", post(garmin_login))
        .route("/garmin/activities", post(garmin_activities))
        .route("/garmin/sync", post(garmin_sync))
        .route("/garmin/sync-logs", get(list_sync_logs))
        // Exports
        .route("/exports", get(export_hunts))
        .nest_service("/uploads", ServeDir::new(&config.object_store_path))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES + 1024 * 1024))
        .layer(Extension(db))
        .layer(Extension(storage))
        .layer(Extension(auth))
        .layer(Extension(garmin))
        .layer(cors_layer(&config.cors_origins))
        .layer(CompressionLayer::new())
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(middleware::from_fn(request_id_middleware))
}

pub async fn run_server(pool: PgPool, config: AppConfig) -> anyhow::Result<()> {
    let storage = ObjectStoreService::new_local(&config.object_store_path)?;
    let provider = GarminConnectClient::new(GarminClientConfig {
        sso_url: config.garmin_sso_url.clone(),
        api_url: config.garmin_api_url.clone(),
        timeout: config.garmin_timeout,
    })?;

    let app = create_router(pool, &config, storage, Arc::new(provider));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!("Server running on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
