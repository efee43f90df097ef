//! Hunt photo handlers.

use axum::{
    Extension,
    extract::{Multipart, Path},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    database::Database,
    errors::{AppError, validate_request},
    handlers::uploads::read_upload,
    models::Photo,
    object_store_service::ObjectStoreService,
    types::UpdatePhotoRequest,
};

/// Largest accepted photo upload.
pub const MAX_PHOTO_BYTES: usize = 20 * 1024 * 1024;

const MAX_CAPTION_LEN: usize = 500;

/// Public URL of a stored object, served by the `/uploads` route.
pub fn public_url(object_path: &str) -> String {
    format!("/uploads/{object_path}")
}

fn parse_taken_at(raw: Option<&str>) -> Result<Option<OffsetDateTime>, AppError> {
    raw.map(|s| {
        OffsetDateTime::parse(s, &Rfc3339)
            .map_err(|_| AppError::InvalidInput(format!("Invalid taken_at timestamp: {s}")))
    })
    .transpose()
}

/// Upload a photo to a hunt.
///
/// Optional form fields: `caption`, `taken_at` (RFC 3339).
#[utoipa::path(
    post,
    path = "/hunts/{hunt_id}/photos",
    tag = "photos",
    params(("hunt_id" = Uuid, Path, description = "Hunt ID")),
    request_body(content_type = "multipart/form-data", description = "Image in the `file` field"),
    responses(
        (status = 201, description = "Photo stored", body = Photo),
        (status = 400, description = "Missing file or unsupported image type"),
        (status = 404, description = "Hunt not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_photo(
    Extension(db): Extension<Database>,
    Extension(storage): Extension<ObjectStoreService>,
    AuthUser(claims): AuthUser,
    Path(hunt_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Photo>), AppError> {
    if !db.hunt_exists(claims.sub, hunt_id).await? {
        return Err(AppError::NotFound);
    }

    let mut form = read_upload(multipart).await?;
    let file = form.require_file()?;

    if file.bytes.len() > MAX_PHOTO_BYTES {
        return Err(AppError::InvalidInput(format!(
            "Photo exceeds {} MB",
            MAX_PHOTO_BYTES / (1024 * 1024)
        )));
    }

    let caption = form.field("caption").map(str::to_string);
    if caption.as_ref().is_some_and(|c| c.chars().count() > MAX_CAPTION_LEN) {
        return Err(AppError::InvalidInput(
            "Caption must be at most 500 characters".to_string(),
        ));
    }
    let taken_at = parse_taken_at(form.field("taken_at"))?;

    let file_type = file.file_type();
    let id = Uuid::new_v4();
    let file_size = file.bytes.len() as i64;
    let original_filename = file.display_name("photo");
    let object_path = storage
        .store_photo(hunt_id, id, file_type, file.bytes)
        .await?;

    let photo = Photo {
        id,
        hunt_id,
        user_id: claims.sub,
        filename: format!("{id}.{}", file_type.extension()),
        original_filename,
        file_size,
        mime_type: file_type.as_mime_str().to_string(),
        url: public_url(&object_path),
        object_path,
        caption,
        taken_at,
        created_at: OffsetDateTime::now_utc(),
    };

    if let Err(e) = db.create_photo(&photo).await {
        let _ = storage.delete_file(&photo.object_path).await;
        return Err(e);
    }

    tracing::info!(photo_id = %photo.id, %hunt_id, bytes = file_size, "Stored photo");
    Ok((StatusCode::CREATED, Json(photo)))
}

/// Photos of one hunt.
#[utoipa::path(
    get,
    path = "/hunts/{hunt_id}/photos",
    tag = "photos",
    params(("hunt_id" = Uuid, Path, description = "Hunt ID")),
    responses(
        (status = 200, description = "Photos", body = Vec<Photo>),
        (status = 404, description = "Hunt not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_photos(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(hunt_id): Path<Uuid>,
) -> Result<Json<Vec<Photo>>, AppError> {
    if !db.hunt_exists(claims.sub, hunt_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(db.list_photos(claims.sub, hunt_id).await?))
}

/// The image bytes of a photo.
#[utoipa::path(
    get,
    path = "/photos/{id}/file",
    tag = "photos",
    params(("id" = Uuid, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Image data"),
        (status = 404, description = "Photo not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_photo_file(
    Extension(db): Extension<Database>,
    Extension(storage): Extension<ObjectStoreService>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let photo = db.get_photo(claims.sub, id).await?.ok_or(AppError::NotFound)?;
    let bytes = storage.get_file(&photo.object_path).await?;

    Ok(([(header::CONTENT_TYPE, photo.mime_type)], bytes).into_response())
}

/// Change a photo's caption.
#[utoipa::path(
    patch,
    path = "/photos/{id}",
    tag = "photos",
    params(("id" = Uuid, Path, description = "Photo ID")),
    request_body = UpdatePhotoRequest,
    responses(
        (status = 200, description = "Updated photo", body = Photo),
        (status = 404, description = "Photo not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_photo(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePhotoRequest>,
) -> Result<Json<Photo>, AppError> {
    validate_request(&req)?;

    let photo = db
        .update_photo_caption(claims.sub, id, req.caption.as_deref())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(photo))
}

#[utoipa::path(
    delete,
    path = "/photos/{id}",
    tag = "photos",
    params(("id" = Uuid, Path, description = "Photo ID")),
    responses(
        (status = 204, description = "Photo deleted"),
        (status = 404, description = "Photo not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_photo(
    Extension(db): Extension<Database>,
    Extension(storage): Extension<ObjectStoreService>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let photo = db
        .delete_photo(claims.sub, id)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Err(e) = storage.delete_file(&photo.object_path).await {
        tracing::warn!("Failed to remove photo file {}: {e}", photo.object_path);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url() {
        assert_eq!(
            public_url("photos/abc/def.jpg"),
            "/uploads/photos/abc/def.jpg"
        );
    }

    #[test]
    fn test_parse_taken_at() {
        assert!(parse_taken_at(None).unwrap().is_none());

        let taken = parse_taken_at(Some("2024-10-01T08:15:00+02:00"))
            .unwrap()
            .unwrap();
        assert_eq!(taken.unix_timestamp(), 1_727_763_300);

        assert!(matches!(
            parse_taken_at(Some("yesterday")),
            Err(AppError::InvalidInput(_))
        ));
    }
}
