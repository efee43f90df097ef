use axum_extra::headers::Mime;
use bytes::Bytes;
use object_store::{ObjectStore, PutPayload, local::LocalFileSystem, path::Path};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::AppError;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Gpx,
    Jpeg,
    Png,
    Webp,
    Heic,
    Other,
}

impl From<Mime> for FileType {
    fn from(mime: Mime) -> Self {
        match (mime.type_().as_str(), mime.subtype().as_str()) {
            ("application", "gpx") | ("application", "gpx+xml") => FileType::Gpx,
            ("image", "jpeg") | ("image", "jpg") => FileType::Jpeg,
            ("image", "png") => FileType::Png,
            ("image", "webp") => FileType::Webp,
            ("image", "heic") | ("image", "heif") => FileType::Heic,
            (t, s) => {
                tracing::warn!("Unknown mime type: {t}/{s}");
                FileType::Other
            }
        }
    }
}

impl FileType {
    /// Guesses the type from a file name, for clients that send no content type.
    pub fn from_filename(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "gpx" => FileType::Gpx,
            "jpg" | "jpeg" => FileType::Jpeg,
            "png" => FileType::Png,
            "webp" => FileType::Webp,
            "heic" | "heif" => FileType::Heic,
            _ => FileType::Other,
        }
    }

    pub fn as_mime_str(self) -> &'static str {
        match self {
            FileType::Gpx => "application/gpx+xml",
            FileType::Jpeg => "image/jpeg",
            FileType::Png => "image/png",
            FileType::Webp => "image/webp",
            FileType::Heic => "image/heic",
            FileType::Other => "application/octet-stream",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileType::Gpx => "gpx",
            FileType::Jpeg => "jpg",
            FileType::Png => "png",
            FileType::Webp => "webp",
            FileType::Heic => "heic",
            FileType::Other => "bin",
        }
    }

    pub fn is_image(self) -> bool {
        matches!(
            self,
            FileType::Jpeg | FileType::Png | FileType::Webp | FileType::Heic
        )
    }
}

#[derive(Clone, Debug)]
pub struct ObjectStoreService {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreService {
    pub fn new_local(base_path: &str) -> Result<Self, AppError> {
        std::fs::create_dir_all(base_path).map_err(|e| {
            tracing::error!("Failed to create object store directory {base_path}: {e}");
            AppError::Internal
        })?;
        let store = LocalFileSystem::new_with_prefix(base_path).map_err(|e| {
            tracing::error!("Invalid object store path {base_path}: {e}");
            AppError::Internal
        })?;
        Ok(Self {
            store: Arc::new(store),
        })
    }

    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Stores the original GPX document of a track.
    pub async fn store_gpx(
        &self,
        user_id: Uuid,
        track_id: Uuid,
        content: Bytes,
    ) -> Result<String, AppError> {
        let object_path = format!("tracks/{user_id}/{track_id}.gpx");
        self.put(&object_path, content).await?;
        Ok(object_path)
    }

    pub async fn store_photo(
        &self,
        hunt_id: Uuid,
        photo_id: Uuid,
        file_type: FileType,
        content: Bytes,
    ) -> Result<String, AppError> {
        if !file_type.is_image() {
            return Err(AppError::InvalidInput(
                "Only JPEG, PNG, WebP and HEIC images are accepted".to_string(),
            ));
        }

        let object_path = format!(
            "photos/{hunt_id}/{photo_id}.{}",
            file_type.extension()
        );
        self.put(&object_path, content).await?;
        Ok(object_path)
    }

    async fn put(&self, object_path: &str, content: Bytes) -> Result<(), AppError> {
        let path = Path::from(object_path);
        self.store
            .put(&path, PutPayload::from(content))
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to store file: {e}")))?;
        tracing::debug!("Stored object {object_path}");
        Ok(())
    }

    pub async fn get_file(&self, object_path: &str) -> Result<Bytes, AppError> {
        let path = Path::from(object_path);

        let result = self
            .store
            .get(&path)
            .await
            .map_err(|_| AppError::NotFound)?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file: {e}")))?;

        Ok(bytes)
    }

    /// Deletes a stored object. A missing object is not an error.
    pub async fn delete_file(&self, object_path: &str) -> Result<(), AppError> {
        let path = Path::from(object_path);

        match self.store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(AppError::InvalidInput(format!("Failed to delete file: {e}"))),
        }
    }
}
