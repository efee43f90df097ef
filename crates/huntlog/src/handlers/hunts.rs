//! Hunt CRUD handlers.

use std::collections::HashMap;

use axum::{
    Extension,
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    database::Database,
    errors::{AppError, validate_request},
    handlers::pagination::{PaginatedResponse, page_offset},
    models::Hunt,
    object_store_service::ObjectStoreService,
    query_builder::HuntFilter,
    types::{CreateHuntRequest, HuntDetail, HuntListQuery, UpdateHuntRequest},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteResponse {
    pub is_favorite: bool,
}

/// Attaches dogs, tracks and photos to each hunt with one query per kind.
pub(crate) async fn load_details(
    db: &Database,
    hunts: Vec<Hunt>,
) -> Result<Vec<HuntDetail>, AppError> {
    if hunts.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = hunts.iter().map(|h| h.id).collect();

    let mut dogs: HashMap<Uuid, Vec<_>> = HashMap::new();
    for (hunt_id, dog) in db.dogs_for_hunts(&ids).await? {
        dogs.entry(hunt_id).or_default().push(dog);
    }
    let mut tracks: HashMap<Uuid, Vec<_>> = HashMap::new();
    for track in db.tracks_for_hunts(&ids).await? {
        tracks.entry(track.hunt_id).or_default().push(track);
    }
    let mut photos: HashMap<Uuid, Vec<_>> = HashMap::new();
    for photo in db.photos_for_hunts(&ids).await? {
        photos.entry(photo.hunt_id).or_default().push(photo);
    }

    Ok(hunts
        .into_iter()
        .map(|hunt| HuntDetail {
            dogs: dogs.remove(&hunt.id).unwrap_or_default(),
            tracks: tracks.remove(&hunt.id).unwrap_or_default(),
            photos: photos.remove(&hunt.id).unwrap_or_default(),
            hunt,
        })
        .collect())
}

async fn load_detail(db: &Database, hunt: Hunt) -> Result<HuntDetail, AppError> {
    load_details(db, vec![hunt])
        .await?
        .pop()
        .ok_or(AppError::Internal)
}

/// Applies the fields present in `req` to `hunt`.
pub fn apply_hunt_update(hunt: &mut Hunt, req: UpdateHuntRequest) {
    if let Some(title) = req.title {
        hunt.title = title;
    }
    if let Some(date) = req.date {
        hunt.date = date;
    }
    if req.start_time.is_some() {
        hunt.start_time = req.start_time;
    }
    if req.end_time.is_some() {
        hunt.end_time = req.end_time;
    }
    if let Some(location) = req.location {
        hunt.location = location;
    }
    if req.weather.is_some() {
        hunt.weather = req.weather;
    }
    if let Some(game_type) = req.game_type {
        hunt.game_type = game_type;
    }
    if let Some(game_seen) = req.game_seen {
        hunt.game_seen = game_seen;
    }
    if let Some(game_harvested) = req.game_harvested {
        hunt.game_harvested = game_harvested;
    }
    if req.notes.is_some() {
        hunt.notes = req.notes;
    }
    if req.summary.is_some() {
        hunt.summary = req.summary;
    }
    if let Some(tags) = req.tags {
        hunt.tags = tags;
    }
    if let Some(is_favorite) = req.is_favorite {
        hunt.is_favorite = is_favorite;
    }
    hunt.updated_at = OffsetDateTime::now_utc();
}

/// Create a hunt.
#[utoipa::path(
    post,
    path = "/hunts",
    tag = "hunts",
    request_body = CreateHuntRequest,
    responses(
        (status = 201, description = "Hunt created", body = HuntDetail),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_hunt(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Json(req): Json<CreateHuntRequest>,
) -> Result<(StatusCode, Json<HuntDetail>), AppError> {
    validate_request(&req)?;

    let dog_ids = db.owned_dog_ids(claims.sub, &req.dog_ids).await?;
    let now = OffsetDateTime::now_utc();
    let hunt = Hunt {
        id: Uuid::new_v4(),
        user_id: claims.sub,
        title: req.title,
        date: req.date,
        start_time: req.start_time,
        end_time: req.end_time,
        location: req.location,
        weather: req.weather,
        game_type: req.game_type,
        game_seen: req.game_seen,
        game_harvested: req.game_harvested,
        notes: req.notes,
        summary: req.summary,
        tags: req.tags,
        is_favorite: req.is_favorite,
        created_at: now,
        updated_at: now,
    };

    db.create_hunt(&hunt, &dog_ids).await?;
    tracing::info!(hunt_id = %hunt.id, dogs = dog_ids.len(), "Created hunt");

    let detail = load_detail(&db, hunt).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// List hunts, newest first.
#[utoipa::path(
    get,
    path = "/hunts",
    tag = "hunts",
    params(HuntListQuery),
    responses(
        (status = 200, description = "One page of hunts", body = PaginatedResponse<HuntDetail>),
        (status = 400, description = "Invalid query"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_hunts(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Query(query): Query<HuntListQuery>,
) -> Result<Json<PaginatedResponse<HuntDetail>>, AppError> {
    validate_request(&query)?;

    let filter = HuntFilter::from(&query);
    let offset = page_offset(query.page, query.page_size);
    let (hunts, total) = db
        .list_hunts(claims.sub, &filter, query.page_size, offset)
        .await?;
    let items = load_details(&db, hunts).await?;

    Ok(Json(PaginatedResponse::new(
        items,
        total,
        query.page,
        query.page_size,
    )))
}

/// Get one hunt with its dogs, tracks and photos.
#[utoipa::path(
    get,
    path = "/hunts/{id}",
    tag = "hunts",
    params(("id" = Uuid, Path, description = "Hunt ID")),
    responses(
        (status = 200, description = "Hunt", body = HuntDetail),
        (status = 404, description = "Hunt not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_hunt(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<HuntDetail>, AppError> {
    let hunt = db.get_hunt(claims.sub, id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(load_detail(&db, hunt).await?))
}

/// Update a hunt. `dog_ids`, when present, replaces the dog list.
#[utoipa::path(
    put,
    path = "/hunts/{id}",
    tag = "hunts",
    params(("id" = Uuid, Path, description = "Hunt ID")),
    request_body = UpdateHuntRequest,
    responses(
        (status = 200, description = "Updated hunt", body = HuntDetail),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Hunt not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_hunt(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(mut req): Json<UpdateHuntRequest>,
) -> Result<Json<HuntDetail>, AppError> {
    validate_request(&req)?;

    let mut hunt = db.get_hunt(claims.sub, id).await?.ok_or(AppError::NotFound)?;

    let dog_ids = match req.dog_ids.take() {
        Some(ids) => Some(db.owned_dog_ids(claims.sub, &ids).await?),
        None => None,
    };

    apply_hunt_update(&mut hunt, req);
    db.update_hunt(&hunt, dog_ids.as_deref()).await?;

    Ok(Json(load_detail(&db, hunt).await?))
}

/// Delete a hunt with its tracks and photos.
#[utoipa::path(
    delete,
    path = "/hunts/{id}",
    tag = "hunts",
    params(("id" = Uuid, Path, description = "Hunt ID")),
    responses(
        (status = 204, description = "Hunt deleted"),
        (status = 404, description = "Hunt not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_hunt(
    Extension(db): Extension<Database>,
    Extension(storage): Extension<ObjectStoreService>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let tracks = db.list_tracks(claims.sub, id).await?;
    let photos = db.list_photos(claims.sub, id).await?;

    if !db.delete_hunt(claims.sub, id).await? {
        return Err(AppError::NotFound);
    }

    let paths = tracks
        .into_iter()
        .filter_map(|t| t.gpx_object_path)
        .chain(photos.into_iter().map(|p| p.object_path));
    for path in paths {
        if let Err(e) = storage.delete_file(&path).await {
            tracing::warn!("Failed to remove stored file {path}: {e}");
        }
    }

    tracing::info!("Deleted hunt {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// Flip the favorite flag.
#[utoipa::path(
    post,
    path = "/hunts/{id}/favorite",
    tag = "hunts",
    params(("id" = Uuid, Path, description = "Hunt ID")),
    responses(
        (status = 200, description = "New favorite flag", body = FavoriteResponse),
        (status = 404, description = "Hunt not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn toggle_favorite(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FavoriteResponse>, AppError> {
    let is_favorite = db
        .toggle_favorite(claims.sub, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(FavoriteResponse { is_favorite }))
}

#[cfg(test)]
mod tests {
    use time::macros::{date, time};

    use super::*;
    use crate::models::{GameObservation, HuntLocation};

    fn hunt() -> Hunt {
        let created = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        Hunt {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Elgjakt Finnskogen".into(),
            date: date!(2024 - 10 - 01),
            start_time: Some(time!(7:00)),
            end_time: None,
            location: HuntLocation {
                name: "Finnskogen".into(),
                region: Some("Innlandet".into()),
                country: "Norge".into(),
                coordinates: None,
                bounds: None,
            },
            weather: None,
            game_type: vec!["elg".into()],
            game_seen: vec![],
            game_harvested: vec![],
            notes: Some("Kald morgen".into()),
            summary: None,
            tags: vec!["elg".into()],
            is_favorite: false,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_apply_hunt_update_is_partial() {
        let mut h = hunt();
        apply_hunt_update(
            &mut h,
            UpdateHuntRequest {
                end_time: Some(time!(16:30)),
                game_seen: Some(vec![GameObservation {
                    game_type: "elg".into(),
                    count: 2,
                    time: Some(time!(9:15)),
                    location: None,
                    notes: None,
                }]),
                ..Default::default()
            },
        );

        assert_eq!(h.title, "Elgjakt Finnskogen");
        assert_eq!(h.start_time, Some(time!(7:00)));
        assert_eq!(h.end_time, Some(time!(16:30)));
        assert_eq!(h.game_seen.len(), 1);
        assert_eq!(h.notes.as_deref(), Some("Kald morgen"));
    }

    #[test]
    fn test_hunt_detail_is_flattened() {
        let detail = HuntDetail {
            hunt: hunt(),
            dogs: vec![],
            tracks: vec![],
            photos: vec![],
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["title"], "Elgjakt Finnskogen");
        assert_eq!(json["date"], "2024-10-01");
        assert_eq!(json["start_time"], "07:00");
        assert!(json["dogs"].as_array().unwrap().is_empty());
    }
}
