//! Garmin Connect activity provider.
//!
//! Authentication produces an explicit [`GarminSession`] which is handed to every
//! later call; the client itself holds no login state. Network calls carry a
//! timeout and are never retried here.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, OffsetDateTime};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Error)]
pub enum GarminError {
    #[error("Garmin authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Could not reach Garmin Connect: {0}")]
    ConnectionFailed(String),
    #[error("Unexpected response from Garmin Connect: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GarminError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GarminError::InvalidResponse(e.to_string())
        } else {
            GarminError::ConnectionFailed(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GarminCredentials {
    #[validate(length(min = 1, max = 255, message = "Garmin email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Garmin password is required"))]
    pub password: String,
}

/// An authenticated Garmin Connect session.
#[derive(Debug, Clone)]
pub struct GarminSession {
    pub(crate) access_token: String,
    pub display_name: Option<String>,
    pub authenticated_at: OffsetDateTime,
}

impl GarminSession {
    pub fn new(access_token: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            display_name,
            authenticated_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Which activities to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityRange {
    /// Activities started between the two dates, inclusive.
    Between { start: Date, end: Date },
    /// The most recent activities.
    Recent { limit: u32 },
}

/// Activity metadata as returned by the activity list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub activity_id: i64,
    #[serde(default)]
    pub activity_name: Option<String>,
    /// Local start time, `YYYY-MM-DD HH:MM:SS`.
    #[serde(default)]
    pub start_time_local: Option<String>,
    /// Meters.
    #[serde(default)]
    pub distance: Option<f64>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Meters per second.
    #[serde(default)]
    pub average_speed: Option<f64>,
    /// Meters per second.
    #[serde(default)]
    pub max_speed: Option<f64>,
}

impl ActivitySummary {
    pub fn display_name(&self) -> String {
        self.activity_name
            .clone()
            .unwrap_or_else(|| format!("Activity {}", self.activity_id))
    }

    pub fn start_time(&self) -> Option<chrono::NaiveDateTime> {
        let raw = self.start_time_local.as_deref()?;
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
    }
}

#[async_trait]
pub trait ActivityProvider: Send + Sync {
    async fn authenticate(&self, credentials: &GarminCredentials) -> Result<GarminSession, GarminError>;

    async fn list_activities(
        &self,
        session: &GarminSession,
        range: ActivityRange,
    ) -> Result<Vec<ActivitySummary>, GarminError>;

    /// Downloads the GPX export of one activity.
    async fn download_activity_gpx(
        &self,
        session: &GarminSession,
        activity_id: i64,
    ) -> Result<Bytes, GarminError>;
}

#[derive(Debug, Clone)]
pub struct GarminClientConfig {
    pub sso_url: String,
    pub api_url: String,
    pub timeout: Duration,
}

/// HTTP implementation of [`ActivityProvider`] against Garmin Connect.
#[derive(Debug, Clone)]
pub struct GarminConnectClient {
    http: Client,
    sso_url: String,
    api_url: String,
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SignInResponse {
    access_token: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl GarminConnectClient {
    pub fn new(config: GarminClientConfig) -> Result<Self, GarminError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("huntlog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GarminError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            http,
            sso_url: config.sso_url.trim_end_matches('/').to_string(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn check_status(status: StatusCode, what: &str) -> Result<(), GarminError> {
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                GarminError::AuthenticationFailed(format!("{what} was rejected ({status})")),
            ),
            StatusCode::TOO_MANY_REQUESTS => Err(GarminError::ConnectionFailed(format!(
                "{what} was rate limited by Garmin Connect"
            ))),
            s => Err(GarminError::ConnectionFailed(format!("{what} failed with {s}"))),
        }
    }
}

#[async_trait]
impl ActivityProvider for GarminConnectClient {
    async fn authenticate(&self, credentials: &GarminCredentials) -> Result<GarminSession, GarminError> {
        tracing::info!("Authenticating against Garmin Connect as {}", credentials.email);

        let response = self
            .http
            .post(format!("{}/sso/signin", self.sso_url))
            .json(&SignInRequest {
                username: &credentials.email,
                password: &credentials.password,
            })
            .send()
            .await?;

        if let Err(e) = Self::check_status(response.status(), "Sign-in") {
            tracing::error!("Garmin sign-in for {} failed: {e}", credentials.email);
            return Err(e);
        }

        let body: SignInResponse = response.json().await?;
        tracing::info!("Authenticated against Garmin Connect as {}", credentials.email);
        Ok(GarminSession::new(body.access_token, body.display_name))
    }

    async fn list_activities(
        &self,
        session: &GarminSession,
        range: ActivityRange,
    ) -> Result<Vec<ActivitySummary>, GarminError> {
        let query: Vec<(&str, String)> = match range {
            ActivityRange::Between { start, end } => vec![
                ("startDate", start.to_string()),
                ("endDate", end.to_string()),
            ],
            ActivityRange::Recent { limit } => {
                vec![("start", "0".to_string()), ("limit", limit.to_string())]
            }
        };

        let response = self
            .http
            .get(format!(
                "{}/activitylist-service/activities/search/activities",
                self.api_url
            ))
            .bearer_auth(&session.access_token)
            .query(&query)
            .send()
            .await?;
        Self::check_status(response.status(), "Activity list")?;

        let activities: Vec<ActivitySummary> = response.json().await?;
        tracing::info!("Fetched {} Garmin activities", activities.len());
        Ok(activities)
    }

    async fn download_activity_gpx(
        &self,
        session: &GarminSession,
        activity_id: i64,
    ) -> Result<Bytes, GarminError> {
        let response = self
            .http
            .get(format!(
                "{}/download-service/export/gpx/activity/{activity_id}",
                self.api_url
            ))
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        Self::check_status(response.status(), "GPX download")?;

        let bytes = response.bytes().await?;
        tracing::debug!("Downloaded GPX for activity {activity_id} ({} bytes)", bytes.len());
        Ok(bytes)
    }
}
