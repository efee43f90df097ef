//! Query parameter types for API endpoints.

use std::str::FromStr;

use serde::Deserialize;
use time::Date;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;

pub fn default_page() -> i64 {
    1
}

pub fn default_page_size() -> i64 {
    10
}

/// Hunt listing query parameters.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema, IntoParams)]
pub struct HuntListQuery {
    /// 1-based page number.
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: i64,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100, message = "page_size must be between 1 and 100"))]
    pub page_size: i64,
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
    /// Comma-separated; matches hunts with any of the listed game types.
    pub game_types: Option<String>,
    /// Comma-separated; matches hunts with any of the listed tags.
    pub tags: Option<String>,
    pub is_favorite: Option<bool>,
    /// Case-insensitive match on title and notes.
    pub search: Option<String>,
}

impl Default for HuntListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            date_from: None,
            date_to: None,
            game_types: None,
            tags: None,
            is_favorite: None,
            search: None,
        }
    }
}

/// Dog listing query parameters.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct DogListQuery {
    /// Only return dogs marked active.
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Gpx,
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "gpx" => Ok(ExportFormat::Gpx),
            other => Err(AppError::InvalidInput(format!(
                "Unsupported export format: {other}. Use json or gpx"
            ))),
        }
    }
}

/// Export query parameters.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct ExportQuery {
    /// `json` (default) or `gpx`.
    pub format: Option<String>,
    /// Comma-separated hunt ids. All hunts when omitted.
    pub hunt_ids: Option<String>,
}

impl ExportQuery {
    pub fn format(&self) -> Result<ExportFormat, AppError> {
        self.format
            .as_deref()
            .map_or(Ok(ExportFormat::Json), ExportFormat::from_str)
    }

    pub fn hunt_ids(&self) -> Result<Option<Vec<Uuid>>, AppError> {
        let Some(raw) = self.hunt_ids.as_deref() else {
            return Ok(None);
        };
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse()
                    .map_err(|_| AppError::InvalidInput(format!("Invalid hunt id: {s}")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

pub fn default_sync_log_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct SyncLogQuery {
    #[serde(default = "default_sync_log_limit")]
    pub limit: i64,
}

/// Splits a comma-separated query value, dropping blanks.
pub fn split_list(raw: Option<&str>) -> Option<Vec<String>> {
    let items: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}
