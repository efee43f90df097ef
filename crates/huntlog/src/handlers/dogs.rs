//! Dog management handlers.

use axum::{
    Extension,
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    database::Database,
    errors::{AppError, validate_request},
    models::{DEFAULT_DOG_COLOR, Dog, DogStatistics},
    types::{CreateDogRequest, DogListQuery, UpdateDogRequest},
};

/// Applies the fields present in `req` to `dog`.
pub fn apply_dog_update(dog: &mut Dog, req: UpdateDogRequest) {
    if let Some(name) = req.name {
        dog.name = name;
    }
    if let Some(breed) = req.breed {
        dog.breed = breed;
    }
    if req.birth_date.is_some() {
        dog.birth_date = req.birth_date;
    }
    if let Some(color) = req.color {
        dog.color = color;
    }
    if req.garmin_collar_id.is_some() {
        dog.garmin_collar_id = req.garmin_collar_id;
    }
    if req.photo_url.is_some() {
        dog.photo_url = req.photo_url;
    }
    if req.notes.is_some() {
        dog.notes = req.notes;
    }
    if let Some(is_active) = req.is_active {
        dog.is_active = is_active;
    }
    dog.updated_at = OffsetDateTime::now_utc();
}

/// List the user's dogs.
#[utoipa::path(
    get,
    path = "/dogs",
    tag = "dogs",
    params(DogListQuery),
    responses(
        (status = 200, description = "Dogs ordered by name", body = Vec<Dog>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_dogs(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Query(query): Query<DogListQuery>,
) -> Result<Json<Vec<Dog>>, AppError> {
    let dogs = db.list_dogs(claims.sub, query.active_only).await?;
    Ok(Json(dogs))
}

/// Register a dog.
#[utoipa::path(
    post,
    path = "/dogs",
    tag = "dogs",
    request_body = CreateDogRequest,
    responses(
        (status = 201, description = "Dog created", body = Dog),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_dog(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Json(req): Json<CreateDogRequest>,
) -> Result<(StatusCode, Json<Dog>), AppError> {
    validate_request(&req)?;

    let now = OffsetDateTime::now_utc();
    let dog = Dog {
        id: Uuid::new_v4(),
        user_id: claims.sub,
        name: req.name,
        breed: req.breed,
        birth_date: req.birth_date,
        color: req.color.unwrap_or_else(|| DEFAULT_DOG_COLOR.to_string()),
        garmin_collar_id: req.garmin_collar_id,
        photo_url: req.photo_url,
        notes: req.notes,
        is_active: req.is_active,
        created_at: now,
        updated_at: now,
    };

    db.create_dog(&dog).await?;
    tracing::info!("Created dog {} for user {}", dog.id, claims.sub);
    Ok((StatusCode::CREATED, Json(dog)))
}

/// Get one dog.
#[utoipa::path(
    get,
    path = "/dogs/{id}",
    tag = "dogs",
    params(("id" = Uuid, Path, description = "Dog ID")),
    responses(
        (status = 200, description = "Dog", body = Dog),
        (status = 404, description = "Dog not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_dog(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Dog>, AppError> {
    let dog = db.get_dog(claims.sub, id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(dog))
}

/// Update a dog.
#[utoipa::path(
    put,
    path = "/dogs/{id}",
    tag = "dogs",
    params(("id" = Uuid, Path, description = "Dog ID")),
    request_body = UpdateDogRequest,
    responses(
        (status = 200, description = "Updated dog", body = Dog),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Dog not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_dog(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDogRequest>,
) -> Result<Json<Dog>, AppError> {
    validate_request(&req)?;

    let mut dog = db.get_dog(claims.sub, id).await?.ok_or(AppError::NotFound)?;
    apply_dog_update(&mut dog, req);
    db.update_dog(&dog).await?;

    Ok(Json(dog))
}

/// Delete a dog. Its tracks are kept without a dog.
#[utoipa::path(
    delete,
    path = "/dogs/{id}",
    tag = "dogs",
    params(("id" = Uuid, Path, description = "Dog ID")),
    responses(
        (status = 204, description = "Dog deleted"),
        (status = 404, description = "Dog not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_dog(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !db.delete_dog(claims.sub, id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!("Deleted dog {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// Hunt and track totals for one dog.
#[utoipa::path(
    get,
    path = "/dogs/{id}/statistics",
    tag = "dogs",
    params(("id" = Uuid, Path, description = "Dog ID")),
    responses(
        (status = 200, description = "Dog statistics", body = DogStatistics),
        (status = 404, description = "Dog not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_dog_statistics(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DogStatistics>, AppError> {
    db.get_dog(claims.sub, id).await?.ok_or(AppError::NotFound)?;
    let stats = db.dog_statistics(claims.sub, id).await?;
    Ok(Json(stats))
}
