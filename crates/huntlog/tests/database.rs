//! Database integration tests for hunts, dogs, tracks and sync logs.
//!
//! To run these tests, you need:
//! 1. A PostgreSQL database with migrations applied
//! 2. DATABASE_URL environment variable set
//!
//! Run with: `DATABASE_URL=postgres://... cargo test -p huntlog --test database`
//!
//! Each test creates its own user and removes it afterwards, so the tests can
//! safely run against a development database.

use std::env;

use geojson::{Geometry, Value};
use huntlog::{
    database::Database,
    errors::AppError,
    models::{
        DEFAULT_DOG_COLOR, DEFAULT_TRACK_COLOR, Dog, Hunt, HuntLocation, SyncStatus, TrackRecord,
        TrackSource, User,
    },
    query_builder::HuntFilter,
    statistics::TrackStatistics,
    types::HuntListQuery,
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use time::{Date, Month, OffsetDateTime};
use uuid::Uuid;

/// Get database pool, skipping tests if DATABASE_URL is not set.
async fn get_test_pool() -> Option<PgPool> {
    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: DATABASE_URL not set");
            return None;
        }
    };

    match PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            eprintln!("Skipping test: Failed to connect to database: {e}");
            None
        }
    }
}

async fn create_test_user(db: &Database) -> User {
    let user = User::new(
        format!("jeger-{}@example.no", Uuid::new_v4()),
        "Test Jeger".to_string(),
    );
    db.create_user_with_password(&user, "hash")
        .await
        .expect("Failed to create test user");
    user
}

/// Removes the user; hunts, dogs, tracks, photos and sync logs cascade.
async fn cleanup(pool: &PgPool, user_id: Uuid) {
    let _ = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await;
}

fn dog(user_id: Uuid, name: &str, is_active: bool) -> Dog {
    let now = OffsetDateTime::now_utc();
    Dog {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        breed: "Norsk elghund grå".to_string(),
        birth_date: None,
        color: DEFAULT_DOG_COLOR.to_string(),
        garmin_collar_id: None,
        photo_url: None,
        notes: None,
        is_active,
        created_at: now,
        updated_at: now,
    }
}

fn hunt(user_id: Uuid, title: &str, day: u8, tags: &[&str]) -> Hunt {
    let now = OffsetDateTime::now_utc();
    Hunt {
        id: Uuid::new_v4(),
        user_id,
        title: title.to_string(),
        date: Date::from_calendar_date(2024, Month::October, day).unwrap(),
        start_time: None,
        end_time: None,
        location: HuntLocation {
            name: "Finnskogen".to_string(),
            region: Some("Innlandet".to_string()),
            country: "Norge".to_string(),
            coordinates: Some([60.6, 12.4]),
            bounds: None,
        },
        weather: None,
        game_type: vec!["elg".to_string()],
        game_seen: vec![],
        game_harvested: vec![],
        notes: Some("Test".to_string()),
        summary: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        is_favorite: false,
        created_at: now,
        updated_at: now,
    }
}

fn track(hunt_id: Uuid, dog_id: Option<Uuid>, activity: Option<&str>) -> TrackRecord {
    TrackRecord {
        id: Uuid::new_v4(),
        hunt_id,
        dog_id,
        name: "Los".to_string(),
        source: if activity.is_some() {
            TrackSource::Garmin
        } else {
            TrackSource::Manual
        },
        garmin_activity_id: activity.map(str::to_string),
        gpx_object_path: None,
        geojson: Geometry::new(Value::LineString(vec![
            vec![12.40, 60.60],
            vec![12.41, 60.61],
        ])),
        statistics: TrackStatistics {
            distance_km: 4.25,
            duration_minutes: 90.0,
            ..TrackStatistics::zeroed()
        },
        color: DEFAULT_TRACK_COLOR.to_string(),
        start_time: None,
        end_time: None,
        created_at: OffsetDateTime::now_utc(),
    }
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let user = create_test_user(&db).await;

    let twin = User::new(user.email.to_uppercase(), "Tvilling".to_string());
    let result = db.create_user_with_password(&twin, "hash").await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let (found, hash) = db
        .get_user_with_password(&user.email.to_uppercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);
    assert_eq!(hash.as_deref(), Some("hash"));

    cleanup(&pool, user.id).await;
}

#[tokio::test]
async fn test_dogs_are_scoped_to_owner() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let owner = create_test_user(&db).await;
    let other = create_test_user(&db).await;

    let bamse = dog(owner.id, "Bamse", true);
    let tass = dog(owner.id, "Tass", false);
    db.create_dog(&bamse).await.unwrap();
    db.create_dog(&tass).await.unwrap();

    assert_eq!(db.list_dogs(owner.id, false).await.unwrap().len(), 2);
    let active = db.list_dogs(owner.id, true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "Bamse");

    assert!(db.get_dog(other.id, bamse.id).await.unwrap().is_none());
    assert!(
        db.owned_dog_ids(other.id, &[bamse.id])
            .await
            .unwrap()
            .is_empty()
    );
    assert!(!db.delete_dog(other.id, bamse.id).await.unwrap());
    assert!(db.delete_dog(owner.id, bamse.id).await.unwrap());

    cleanup(&pool, owner.id).await;
    cleanup(&pool, other.id).await;
}

#[tokio::test]
async fn test_hunt_filters_and_pagination() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let user = create_test_user(&db).await;

    for (title, day, tags) in [
        ("Elgjakt dag 1", 1, vec!["elg", "lag"]),
        ("Elgjakt dag 2", 2, vec!["elg"]),
        ("Rypejakt Fjellet", 5, vec!["rype"]),
    ] {
        db.create_hunt(&hunt(user.id, title, day, &tags), &[])
            .await
            .unwrap();
    }

    let all = HuntFilter::from(&HuntListQuery::default());
    let (page, total) = db.list_hunts(user.id, &all, 2, 0).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].title, "Rypejakt Fjellet");

    let tagged = HuntFilter::from(&HuntListQuery {
        tags: Some("lag,rype".to_string()),
        ..Default::default()
    });
    let (_, total) = db.list_hunts(user.id, &tagged, 10, 0).await.unwrap();
    assert_eq!(total, 2);

    let search = HuntFilter::from(&HuntListQuery {
        search: Some("ELGJAKT".to_string()),
        date_from: Some(Date::from_calendar_date(2024, Month::October, 2).unwrap()),
        ..Default::default()
    });
    let (hunts, total) = db.list_hunts(user.id, &search, 10, 0).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(hunts[0].title, "Elgjakt dag 2");

    cleanup(&pool, user.id).await;
}

#[tokio::test]
async fn test_hunt_dogs_tracks_and_statistics() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let user = create_test_user(&db).await;

    let bamse = dog(user.id, "Bamse", true);
    db.create_dog(&bamse).await.unwrap();

    let h = hunt(user.id, "Elgjakt", 3, &[]);
    db.create_hunt(&h, &[bamse.id]).await.unwrap();

    let dogs = db.dogs_for_hunts(&[h.id]).await.unwrap();
    assert_eq!(dogs.len(), 1);
    assert_eq!(dogs[0].1.name, "Bamse");

    db.create_track(&track(h.id, Some(bamse.id), Some("1001")))
        .await
        .unwrap();
    db.create_track(&track(h.id, None, None)).await.unwrap();

    let duplicate = db.create_track(&track(h.id, None, Some("1001"))).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let ids = db.garmin_activity_ids(h.id).await.unwrap();
    assert!(ids.contains("1001"));
    assert_eq!(ids.len(), 1);

    let stats = db.hunting_statistics(user.id).await.unwrap();
    assert_eq!(stats.total_hunts, 1);
    assert_eq!(stats.total_distance_km, 8.5);
    assert_eq!(stats.total_duration_hours, 3.0);
    assert_eq!(stats.active_dogs, 1);

    let dog_stats = db.dog_statistics(user.id, bamse.id).await.unwrap();
    assert_eq!(dog_stats.total_tracks, 1);
    assert_eq!(dog_stats.total_hunts, 1);
    assert_eq!(dog_stats.total_distance_km, 4.25);

    assert_eq!(db.toggle_favorite(user.id, h.id).await.unwrap(), Some(true));
    assert_eq!(db.toggle_favorite(user.id, h.id).await.unwrap(), Some(false));

    assert!(db.delete_hunt(user.id, h.id).await.unwrap());
    assert!(db.tracks_for_hunts(&[h.id]).await.unwrap().is_empty());

    cleanup(&pool, user.id).await;
}

#[tokio::test]
async fn test_sync_log_lifecycle() {
    let Some(pool) = get_test_pool().await else {
        return;
    };
    let db = Database::new(pool.clone());
    let user = create_test_user(&db).await;

    let log = db.start_sync_log(user.id).await.unwrap();
    assert_eq!(log.status, SyncStatus::InProgress);
    assert!(log.sync_completed_at.is_none());

    db.finish_sync_log(log.id, SyncStatus::Completed, 3, None)
        .await
        .unwrap();

    let logs = db.list_sync_logs(user.id, 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, SyncStatus::Completed);
    assert_eq!(logs[0].tracks_imported, 3);
    assert!(logs[0].sync_completed_at.is_some());

    cleanup(&pool, user.id).await;
}
