//! Batch import of Garmin activities into tracks.
//!
//! Downloads run one after another against the provider; decoding and
//! statistics for the downloaded documents run in parallel on the rayon pool.
//! A failing activity is skipped with a reason and never aborts the batch.

use std::sync::Arc;

use bytes::Bytes;
use geojson::Geometry;
use rayon::prelude::*;
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use utoipa::ToSchema;

use crate::{
    garmin::{
        ActivityProvider, ActivityRange, ActivitySummary, GarminCredentials, GarminError,
        GarminSession,
    },
    gpx_processor::{GpxProcessor, ProcessedTrack},
    statistics::TrackStatistics,
};

/// A successfully processed activity.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportedTrack {
    pub activity_id: i64,
    pub name: String,
    #[schema(value_type = Object)]
    pub geojson: Geometry,
    pub statistics: TrackStatistics,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    #[serde(skip)]
    pub gpx_data: String,
}

/// An activity left out of the import.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SkippedActivity {
    pub activity_id: i64,
    pub name: String,
    pub reason: String,
}

impl SkippedActivity {
    fn new(summary: &ActivitySummary, reason: impl Into<String>) -> Self {
        Self {
            activity_id: summary.activity_id,
            name: summary.display_name(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// In the order the provider listed the activities.
    pub tracks: Vec<ImportedTrack>,
    pub skipped: Vec<SkippedActivity>,
}

#[derive(Clone)]
pub struct GarminSyncService {
    provider: Arc<dyn ActivityProvider>,
    limit: u32,
}

impl GarminSyncService {
    pub fn new(provider: Arc<dyn ActivityProvider>, limit: u32) -> Self {
        Self { provider, limit }
    }

    pub fn provider(&self) -> &dyn ActivityProvider {
        self.provider.as_ref()
    }

    pub async fn authenticate(
        &self,
        credentials: &GarminCredentials,
    ) -> Result<GarminSession, GarminError> {
        self.provider.authenticate(credentials).await
    }

    /// Activities started within the last `days_back` days, capped at the sync limit.
    pub async fn recent_activities(
        &self,
        session: &GarminSession,
        days_back: u32,
    ) -> Result<Vec<ActivitySummary>, GarminError> {
        let end = OffsetDateTime::now_utc().date();
        let start = end - Duration::days(i64::from(days_back));

        let mut activities = self
            .provider
            .list_activities(session, ActivityRange::Between { start, end })
            .await?;
        activities.truncate(self.limit as usize);
        Ok(activities)
    }

    /// Downloads and processes each activity.
    pub async fn import(
        &self,
        session: &GarminSession,
        activities: Vec<ActivitySummary>,
    ) -> SyncOutcome {
        let mut skipped = Vec::new();
        let mut downloads = Vec::with_capacity(activities.len());

        for summary in activities {
            match self
                .provider
                .download_activity_gpx(session, summary.activity_id)
                .await
            {
                Ok(bytes) => downloads.push((summary, bytes)),
                Err(e) => {
                    tracing::warn!(
                        "Skipping Garmin activity {}: download failed: {e}",
                        summary.activity_id
                    );
                    skipped.push(SkippedActivity::new(&summary, e.to_string()));
                }
            }
        }

        let processed = match tokio::task::spawn_blocking(move || process_downloads(downloads)).await
        {
            Ok(results) => results,
            Err(e) => {
                tracing::error!("Garmin track processing task failed: {e}");
                return SyncOutcome {
                    tracks: Vec::new(),
                    skipped,
                };
            }
        };

        let mut tracks = Vec::with_capacity(processed.len());
        for result in processed {
            match result {
                Ok(track) => tracks.push(track),
                Err(skip) => skipped.push(skip),
            }
        }

        tracing::info!(
            "Garmin import finished: {} tracks, {} skipped",
            tracks.len(),
            skipped.len()
        );
        SyncOutcome { tracks, skipped }
    }
}

fn process_downloads(
    downloads: Vec<(ActivitySummary, Bytes)>,
) -> Vec<Result<ImportedTrack, SkippedActivity>> {
    downloads
        .par_iter()
        .map(|(summary, bytes)| process_download(summary, bytes))
        .collect()
}

/// Decodes one downloaded GPX document into an [`ImportedTrack`].
pub fn process_download(
    summary: &ActivitySummary,
    content: &[u8],
) -> Result<ImportedTrack, SkippedActivity> {
    let gpx_data = GpxProcessor::to_text(content)
        .map_err(|e| SkippedActivity::new(summary, e.to_string()))?;
    let processed = GpxProcessor::process(content).map_err(|e| {
        tracing::warn!("Skipping Garmin activity {}: {e}", summary.activity_id);
        SkippedActivity::new(summary, e.to_string())
    })?;

    if processed.point_count == 0 {
        return Err(SkippedActivity::new(summary, "Activity has no track points"));
    }

    let (start_time, end_time) = resolve_times(&processed, summary);

    Ok(ImportedTrack {
        activity_id: summary.activity_id,
        name: summary.display_name(),
        geojson: processed.geometry,
        statistics: processed.statistics,
        start_time,
        end_time,
        gpx_data,
    })
}

fn resolve_times(
    processed: &ProcessedTrack,
    summary: &ActivitySummary,
) -> (Option<OffsetDateTime>, Option<OffsetDateTime>) {
    let listed_start = summary
        .start_time()
        .and_then(|naive| OffsetDateTime::from_unix_timestamp(naive.and_utc().timestamp()).ok());

    let (start, end) = processed.time_range(listed_start);
    let end = match (start, end) {
        (Some(start), Some(end)) if end == start => summary
            .duration
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| start + Duration::seconds_f64(secs))
            .or(Some(end)),
        (_, end) => end,
    };
    (start, end)
}
