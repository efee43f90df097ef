//! Garmin Connect client tests against an in-process mock server.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use huntlog::{
    garmin::{
        ActivityProvider, ActivityRange, GarminClientConfig, GarminConnectClient,
        GarminCredentials, GarminError,
    },
    garmin_sync::GarminSyncService,
};
use serde_json::{Value, json};
use time::macros::date;

const TOKEN: &str = "mock-token";

const ACTIVITY_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="Garmin Connect" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Harejakt</name>
    <trkseg>
      <trkpt lat="61.0000000" lon="11.0000000"><ele>420.0</ele><time>2024-10-05T06:30:00Z</time></trkpt>
      <trkpt lat="61.0050000" lon="11.0000000"><ele>432.0</ele><time>2024-10-05T06:40:00Z</time></trkpt>
      <trkpt lat="61.0100000" lon="11.0000000"><ele>425.0</ele><time>2024-10-05T06:50:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn signin(Json(body): Json<Value>) -> impl IntoResponse {
    if body["username"] == "jeger@example.no" && body["password"] == "riktig" {
        (
            StatusCode::OK,
            Json(json!({"access_token": TOKEN, "display_name": "Jeger"})),
        )
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad credentials"})))
    }
}

async fn activities(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let all = json!([
        {"activityId": 1, "activityName": "Harejakt", "startTimeLocal": "2024-10-05 08:30:00", "duration": 1200.0},
        {"activityId": 2, "activityName": "Elgjakt", "startTimeLocal": "2024-10-06 07:00:00"},
        {"activityId": 3, "startTimeLocal": "2024-10-07 07:00:00"}
    ]);
    let items = match query.get("limit").and_then(|l| l.parse::<usize>().ok()) {
        Some(limit) => Value::Array(all.as_array().unwrap().iter().take(limit).cloned().collect()),
        None => {
            assert!(query.contains_key("startDate"));
            assert!(query.contains_key("endDate"));
            all
        }
    };
    Json(items).into_response()
}

async fn download(headers: HeaderMap, Path(id): Path<i64>) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match id {
        1 => ACTIVITY_GPX.into_response(),
        2 => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => "<html>not gpx</html>".into_response(),
    }
}

async fn start_mock() -> String {
    let app = Router::new()
        .route("/sso/signin", post(signin))
        .route(
            "/activitylist-service/activities/search/activities",
            get(activities),
        )
        .route(
            "/download-service/export/gpx/activity/{id}",
            get(download),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn client() -> GarminConnectClient {
    let base = start_mock().await;
    GarminConnectClient::new(GarminClientConfig {
        sso_url: base.clone(),
        api_url: base,
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn credentials(password: &str) -> GarminCredentials {
    GarminCredentials {
        email: "jeger@example.no".to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_authenticate() {
    let client = client().await;

    let session = client.authenticate(&credentials("riktig")).await.unwrap();
    assert_eq!(session.display_name.as_deref(), Some("Jeger"));

    let err = client.authenticate(&credentials("feil")).await.unwrap_err();
    assert!(matches!(err, GarminError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn test_list_activities_by_range_and_limit() {
    let client = client().await;
    let session = client.authenticate(&credentials("riktig")).await.unwrap();

    let all = client
        .list_activities(
            &session,
            ActivityRange::Between {
                start: date!(2024 - 10 - 01),
                end: date!(2024 - 10 - 08),
            },
        )
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].display_name(), "Harejakt");
    assert_eq!(all[2].display_name(), "Activity 3");

    let recent = client
        .list_activities(&session, ActivityRange::Recent { limit: 2 })
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);
}

#[tokio::test]
async fn test_unreachable_server_is_connection_failure() {
    let client = GarminConnectClient::new(GarminClientConfig {
        sso_url: "http://127.0.0.1:9".to_string(),
        api_url: "http://127.0.0.1:9".to_string(),
        timeout: Duration::from_secs(2),
    })
    .unwrap();

    let err = client.authenticate(&credentials("riktig")).await.unwrap_err();
    assert!(matches!(err, GarminError::ConnectionFailed(_)));
}

#[tokio::test]
async fn test_sync_imports_good_activities_and_skips_failures() {
    let provider: Arc<dyn ActivityProvider> = Arc::new(client().await);
    let service = GarminSyncService::new(provider, 10);

    let session = service.authenticate(&credentials("riktig")).await.unwrap();
    let activities = service.recent_activities(&session, 30).await.unwrap();
    assert_eq!(activities.len(), 3);

    let outcome = service.import(&session, activities).await;

    assert_eq!(outcome.tracks.len(), 1);
    let track = &outcome.tracks[0];
    assert_eq!(track.activity_id, 1);
    assert_eq!(track.name, "Harejakt");
    assert_eq!(track.statistics.duration_minutes, 20.0);
    assert_eq!(track.statistics.elevation_gain_m, 12.0);
    assert_eq!(track.statistics.elevation_loss_m, 7.0);
    assert_eq!(
        track.start_time.unwrap().unix_timestamp(),
        1_728_109_800
    );

    let mut skipped: Vec<i64> = outcome.skipped.iter().map(|s| s.activity_id).collect();
    skipped.sort();
    assert_eq!(skipped, vec![2, 3]);
    assert!(outcome.skipped.iter().all(|s| !s.reason.is_empty()));
}

#[tokio::test]
async fn test_sync_limit_caps_activities() {
    let provider: Arc<dyn ActivityProvider> = Arc::new(client().await);
    let service = GarminSyncService::new(provider, 1);

    let session = service.authenticate(&credentials("riktig")).await.unwrap();
    let activities = service.recent_activities(&session, 7).await.unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].activity_id, 1);
}
