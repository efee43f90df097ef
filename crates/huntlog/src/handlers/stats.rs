//! Service info, health check and hunting statistics handlers.

use axum::{Extension, http::StatusCode, response::Json};

use crate::{
    auth::AuthUser, database::Database, errors::AppError, models::HuntingStatistics,
    types::ServiceInfo,
};

/// Service banner.
#[utoipa::path(
    get,
    path = "/",
    tag = "stats",
    responses(
        (status = 200, description = "Service name and version", body = ServiceInfo)
    )
)]
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "stats",
    responses(
        (status = 200, description = "Health check passed")
    )
)]
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Totals across the user's hunts (distance in km, duration in hours).
#[utoipa::path(
    get,
    path = "/statistics",
    tag = "stats",
    responses(
        (status = 200, description = "Hunting statistics", body = HuntingStatistics),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_statistics(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
) -> Result<Json<HuntingStatistics>, AppError> {
    let stats = db.hunting_statistics(claims.sub).await?;
    Ok(Json(stats))
}
