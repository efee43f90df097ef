//! Multipart form reading shared by the upload handlers.

use std::collections::HashMap;

use axum::extract::Multipart;
use axum_extra::headers::{ContentType, HeaderMapExt, Mime};
use bytes::Bytes;

use crate::{errors::AppError, object_store_service::FileType};

pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<Mime>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Type from the part's content type, falling back to the file extension.
    pub fn file_type(&self) -> FileType {
        let from_mime = self
            .content_type
            .clone()
            .map_or(FileType::Other, FileType::from);
        match (from_mime, self.filename.as_deref()) {
            (FileType::Other, Some(name)) => FileType::from_filename(name),
            (file_type, _) => file_type,
        }
    }

    pub fn display_name(&self, fallback: &str) -> String {
        self.filename
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// A multipart form with one `file` part and any number of text fields.
#[derive(Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn require_file(&mut self) -> Result<UploadedFile, AppError> {
        self.file
            .take()
            .filter(|f| !f.bytes.is_empty())
            .ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

pub async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::InvalidInput("Failed to process multipart data".to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "file" {
            let filename = field.file_name().map(str::to_string);
            let content_type = field.headers().typed_get::<ContentType>().map(Mime::from);
            let bytes = field
                .bytes()
                .await
                .map_err(|_| AppError::InvalidInput("Failed to read file data".to_string()))?;

            form.file = Some(UploadedFile {
                filename,
                content_type,
                bytes,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|_| AppError::InvalidInput(format!("Failed to read field {name}")))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
