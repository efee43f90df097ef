use std::collections::HashSet;

use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    Dog, DogStatistics, GarminSyncLog, Hunt, HuntingStatistics, Photo, SyncStatus, TrackRecord,
    User, UserSettings,
};
use crate::query_builder::HuntFilter;
use crate::statistics::round_to;
use crate::types::DogSummary;

const USER_COLUMNS: &str = "id, email, name, settings, created_at, updated_at";

const DOG_COLUMNS: &str = "id, user_id, name, breed, birth_date, color, garmin_collar_id, \
                           photo_url, notes, is_active, created_at, updated_at";

const HUNT_COLUMNS: &str = "id, user_id, title, date, start_time, end_time, location, weather, \
                            game_type, game_seen, game_harvested, notes, summary, tags, \
                            is_favorite, created_at, updated_at";

const TRACK_COLUMNS: &str = "t.id, t.hunt_id, t.dog_id, t.name, t.source, t.garmin_activity_id, \
                             t.gpx_object_path, t.geojson, t.statistics, t.color, t.start_time, \
                             t.end_time, t.created_at";

const PHOTO_COLUMNS: &str = "p.id, p.hunt_id, p.user_id, p.filename, p.original_filename, \
                             p.file_size, p.mime_type, p.object_path, p.url, p.caption, \
                             p.taken_at, p.created_at";

const SYNC_LOG_COLUMNS: &str =
    "id, user_id, sync_started_at, sync_completed_at, status, tracks_imported, error_message";

#[derive(FromRow)]
struct UserWithPassword {
    #[sqlx(flatten)]
    user: User,
    password_hash: Option<String>,
}

#[derive(FromRow)]
struct HuntDogRow {
    hunt_id: Uuid,
    #[sqlx(flatten)]
    dog: DogSummary,
}

/// Binds the values for [`HuntFilter::where_clause`] in placeholder order.
macro_rules! bind_hunt_filter {
    ($query:expr, $user_id:expr, $filter:expr) => {{
        let mut query = $query.bind($user_id);
        if let Some(date_from) = $filter.date_from {
            query = query.bind(date_from);
        }
        if let Some(date_to) = $filter.date_to {
            query = query.bind(date_to);
        }
        if let Some(game_types) = &$filter.game_types {
            query = query.bind(game_types);
        }
        if let Some(tags) = &$filter.tags {
            query = query.bind(tags);
        }
        if let Some(is_favorite) = $filter.is_favorite {
            query = query.bind(is_favorite);
        }
        if let Some(search) = &$filter.search {
            query = query.bind(search);
        }
        query
    }};
}

fn map_unique_violation(e: sqlx::Error, message: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(e),
    }
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---------------------------------------------------------------- users

    pub async fn create_user_with_password(
        &self,
        user: &User,
        password_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, settings, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(password_hash)
        .bind(Json(&user.settings))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Email already registered"))?;

        Ok(())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_user_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, Option<String>)>, AppError> {
        let row: Option<UserWithPassword> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    pub async fn update_user_settings(
        &self,
        id: Uuid,
        settings: &UserSettings,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as(&format!(
            r#"
            UPDATE users SET settings = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Json(settings))
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // ----------------------------------------------------------------- dogs

    pub async fn list_dogs(&self, user_id: Uuid, active_only: bool) -> Result<Vec<Dog>, AppError> {
        let dogs = sqlx::query_as(&format!(
            r#"
            SELECT {DOG_COLUMNS} FROM dogs
            WHERE user_id = $1 AND (NOT $2 OR is_active)
            ORDER BY name
            "#
        ))
        .bind(user_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(dogs)
    }

    pub async fn create_dog(&self, dog: &Dog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO dogs (id, user_id, name, breed, birth_date, color, garmin_collar_id,
                              photo_url, notes, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(dog.id)
        .bind(dog.user_id)
        .bind(&dog.name)
        .bind(&dog.breed)
        .bind(dog.birth_date)
        .bind(&dog.color)
        .bind(&dog.garmin_collar_id)
        .bind(&dog.photo_url)
        .bind(&dog.notes)
        .bind(dog.is_active)
        .bind(dog.created_at)
        .bind(dog.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_dog(&self, user_id: Uuid, id: Uuid) -> Result<Option<Dog>, AppError> {
        let dog = sqlx::query_as(&format!(
            "SELECT {DOG_COLUMNS} FROM dogs WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dog)
    }

    pub async fn update_dog(&self, dog: &Dog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE dogs
            SET name = $3, breed = $4, birth_date = $5, color = $6, garmin_collar_id = $7,
                photo_url = $8, notes = $9, is_active = $10, updated_at = $11
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(dog.id)
        .bind(dog.user_id)
        .bind(&dog.name)
        .bind(&dog.breed)
        .bind(dog.birth_date)
        .bind(&dog.color)
        .bind(&dog.garmin_collar_id)
        .bind(&dog.photo_url)
        .bind(&dog.notes)
        .bind(dog.is_active)
        .bind(dog.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_dog(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM dogs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The subset of `ids` that belongs to the user.
    pub async fn owned_dog_ids(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let owned = sqlx::query_scalar("SELECT id FROM dogs WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(owned)
    }

    pub async fn dog_statistics(
        &self,
        user_id: Uuid,
        dog_id: Uuid,
    ) -> Result<DogStatistics, AppError> {
        let (total_hunts, total_tracks, distance_km, duration_minutes): (i64, i64, f64, f64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*)
                     FROM hunt_dogs hd JOIN hunts h ON h.id = hd.hunt_id
                     WHERE hd.dog_id = $1 AND h.user_id = $2),
                    COUNT(t.id),
                    COALESCE(SUM((t.statistics->>'distance_km')::float8), 0)::float8,
                    COALESCE(SUM((t.statistics->>'duration_minutes')::float8), 0)::float8
                FROM tracks t JOIN hunts h ON h.id = t.hunt_id
                WHERE t.dog_id = $1 AND h.user_id = $2
                "#,
            )
            .bind(dog_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(DogStatistics {
            dog_id,
            total_hunts,
            total_tracks,
            total_distance_km: round_to(distance_km, 2),
            total_duration_hours: round_to(duration_minutes / 60.0, 1),
        })
    }

    // ---------------------------------------------------------------- hunts

    pub async fn create_hunt(&self, hunt: &Hunt, dog_ids: &[Uuid]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO hunts (id, user_id, title, date, start_time, end_time, location, weather,
                               game_type, game_seen, game_harvested, notes, summary, tags,
                               is_favorite, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(hunt.id)
        .bind(hunt.user_id)
        .bind(&hunt.title)
        .bind(hunt.date)
        .bind(hunt.start_time)
        .bind(hunt.end_time)
        .bind(Json(&hunt.location))
        .bind(Json(&hunt.weather))
        .bind(&hunt.game_type)
        .bind(Json(&hunt.game_seen))
        .bind(Json(&hunt.game_harvested))
        .bind(&hunt.notes)
        .bind(&hunt.summary)
        .bind(&hunt.tags)
        .bind(hunt.is_favorite)
        .bind(hunt.created_at)
        .bind(hunt.updated_at)
        .execute(&mut *tx)
        .await?;

        Self::replace_hunt_dogs(&mut tx, hunt.id, dog_ids).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn replace_hunt_dogs(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        hunt_id: Uuid,
        dog_ids: &[Uuid],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM hunt_dogs WHERE hunt_id = $1")
            .bind(hunt_id)
            .execute(&mut **tx)
            .await?;

        if !dog_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO hunt_dogs (hunt_id, dog_id)
                SELECT $1, UNNEST($2::uuid[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(hunt_id)
            .bind(dog_ids)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    pub async fn get_hunt(&self, user_id: Uuid, id: Uuid) -> Result<Option<Hunt>, AppError> {
        let hunt = sqlx::query_as(&format!(
            "SELECT {HUNT_COLUMNS} FROM hunts WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hunt)
    }

    pub async fn hunt_exists(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM hunts WHERE id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Writes every column of the hunt. `dog_ids`, when given, replaces the dog list.
    pub async fn update_hunt(&self, hunt: &Hunt, dog_ids: Option<&[Uuid]>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE hunts
            SET title = $3, date = $4, start_time = $5, end_time = $6, location = $7,
                weather = $8, game_type = $9, game_seen = $10, game_harvested = $11,
                notes = $12, summary = $13, tags = $14, is_favorite = $15, updated_at = $16
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(hunt.id)
        .bind(hunt.user_id)
        .bind(&hunt.title)
        .bind(hunt.date)
        .bind(hunt.start_time)
        .bind(hunt.end_time)
        .bind(Json(&hunt.location))
        .bind(Json(&hunt.weather))
        .bind(&hunt.game_type)
        .bind(Json(&hunt.game_seen))
        .bind(Json(&hunt.game_harvested))
        .bind(&hunt.notes)
        .bind(&hunt.summary)
        .bind(&hunt.tags)
        .bind(hunt.is_favorite)
        .bind(hunt.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(dog_ids) = dog_ids {
            Self::replace_hunt_dogs(&mut tx, hunt.id, dog_ids).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_hunt(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM hunts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of the user's hunts, newest first, plus the total match count.
    pub async fn list_hunts(
        &self,
        user_id: Uuid,
        filter: &HuntFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Hunt>, i64), AppError> {
        let (where_clause, next) = filter.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM hunts WHERE {where_clause}");
        let total: i64 = bind_hunt_filter!(sqlx::query_scalar(&count_sql), user_id, filter)
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            "SELECT {HUNT_COLUMNS} FROM hunts WHERE {where_clause} \
             ORDER BY date DESC, created_at DESC LIMIT ${next} OFFSET ${}",
            next + 1
        );
        let hunts: Vec<Hunt> = bind_hunt_filter!(sqlx::query_as(&list_sql), user_id, filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((hunts, total))
    }

    /// Flips the favorite flag and returns the new value.
    pub async fn toggle_favorite(&self, user_id: Uuid, id: Uuid) -> Result<Option<bool>, AppError> {
        let flag = sqlx::query_scalar(
            r#"
            UPDATE hunts SET is_favorite = NOT is_favorite, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING is_favorite
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(flag)
    }

    /// The user's hunts, restricted to `ids` when given, newest first.
    pub async fn hunts_by_ids(
        &self,
        user_id: Uuid,
        ids: Option<&[Uuid]>,
    ) -> Result<Vec<Hunt>, AppError> {
        let hunts = sqlx::query_as(&format!(
            r#"
            SELECT {HUNT_COLUMNS} FROM hunts
            WHERE user_id = $1 AND ($2::uuid[] IS NULL OR id = ANY($2))
            ORDER BY date DESC, created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(hunts)
    }

    pub async fn dogs_for_hunts(
        &self,
        hunt_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, DogSummary)>, AppError> {
        let rows: Vec<HuntDogRow> = sqlx::query_as(
            r#"
            SELECT hd.hunt_id, d.id, d.name, d.breed, d.color
            FROM hunt_dogs hd JOIN dogs d ON d.id = hd.dog_id
            WHERE hd.hunt_id = ANY($1)
            ORDER BY d.name
            "#,
        )
        .bind(hunt_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.hunt_id, r.dog)).collect())
    }

    pub async fn tracks_for_hunts(&self, hunt_ids: &[Uuid]) -> Result<Vec<TrackRecord>, AppError> {
        let tracks = sqlx::query_as(&format!(
            r#"
            SELECT {TRACK_COLUMNS} FROM tracks t
            WHERE t.hunt_id = ANY($1)
            ORDER BY t.start_time NULLS LAST, t.created_at
            "#
        ))
        .bind(hunt_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(tracks)
    }

    pub async fn photos_for_hunts(&self, hunt_ids: &[Uuid]) -> Result<Vec<Photo>, AppError> {
        let photos = sqlx::query_as(&format!(
            r#"
            SELECT {PHOTO_COLUMNS} FROM photos p
            WHERE p.hunt_id = ANY($1)
            ORDER BY p.taken_at NULLS LAST, p.created_at
            "#
        ))
        .bind(hunt_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }

    // --------------------------------------------------------------- tracks

    pub async fn create_track(&self, track: &TrackRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO tracks (id, hunt_id, dog_id, name, source, garmin_activity_id,
                                gpx_object_path, geojson, statistics, color, start_time,
                                end_time, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(track.id)
        .bind(track.hunt_id)
        .bind(track.dog_id)
        .bind(&track.name)
        .bind(track.source)
        .bind(&track.garmin_activity_id)
        .bind(&track.gpx_object_path)
        .bind(Json(&track.geojson))
        .bind(Json(&track.statistics))
        .bind(&track.color)
        .bind(track.start_time)
        .bind(track.end_time)
        .bind(track.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Activity already imported on this hunt"))?;
        Ok(())
    }

    pub async fn get_track(&self, user_id: Uuid, id: Uuid) -> Result<Option<TrackRecord>, AppError> {
        let track = sqlx::query_as(&format!(
            r#"
            SELECT {TRACK_COLUMNS} FROM tracks t
            JOIN hunts h ON h.id = t.hunt_id
            WHERE t.id = $1 AND h.user_id = $2
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(track)
    }

    pub async fn list_tracks(
        &self,
        user_id: Uuid,
        hunt_id: Uuid,
    ) -> Result<Vec<TrackRecord>, AppError> {
        let tracks = sqlx::query_as(&format!(
            r#"
            SELECT {TRACK_COLUMNS} FROM tracks t
            JOIN hunts h ON h.id = t.hunt_id
            WHERE t.hunt_id = $1 AND h.user_id = $2
            ORDER BY t.start_time NULLS LAST, t.created_at
            "#
        ))
        .bind(hunt_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tracks)
    }

    /// Deletes the track and returns it, so its stored file can be removed.
    pub async fn delete_track(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<TrackRecord>, AppError> {
        let track = sqlx::query_as(&format!(
            r#"
            DELETE FROM tracks t USING hunts h
            WHERE t.hunt_id = h.id AND t.id = $1 AND h.user_id = $2
            RETURNING {TRACK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(track)
    }

    /// Garmin activity ids already stored on a hunt.
    pub async fn garmin_activity_ids(&self, hunt_id: Uuid) -> Result<HashSet<String>, AppError> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT garmin_activity_id FROM tracks WHERE hunt_id = $1 AND garmin_activity_id IS NOT NULL",
        )
        .bind(hunt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    // --------------------------------------------------------------- photos

    pub async fn create_photo(&self, photo: &Photo) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO photos (id, hunt_id, user_id, filename, original_filename, file_size,
                                mime_type, object_path, url, caption, taken_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(photo.id)
        .bind(photo.hunt_id)
        .bind(photo.user_id)
        .bind(&photo.filename)
        .bind(&photo.original_filename)
        .bind(photo.file_size)
        .bind(&photo.mime_type)
        .bind(&photo.object_path)
        .bind(&photo.url)
        .bind(&photo.caption)
        .bind(photo.taken_at)
        .bind(photo.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_photos(&self, user_id: Uuid, hunt_id: Uuid) -> Result<Vec<Photo>, AppError> {
        let photos = sqlx::query_as(&format!(
            r#"
            SELECT {PHOTO_COLUMNS} FROM photos p
            WHERE p.hunt_id = $1 AND p.user_id = $2
            ORDER BY p.taken_at NULLS LAST, p.created_at
            "#
        ))
        .bind(hunt_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }

    pub async fn get_photo(&self, user_id: Uuid, id: Uuid) -> Result<Option<Photo>, AppError> {
        let photo = sqlx::query_as(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos p WHERE p.id = $1 AND p.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(photo)
    }

    pub async fn update_photo_caption(
        &self,
        user_id: Uuid,
        id: Uuid,
        caption: Option<&str>,
    ) -> Result<Option<Photo>, AppError> {
        let photo = sqlx::query_as(&format!(
            r#"
            UPDATE photos p SET caption = $3
            WHERE p.id = $1 AND p.user_id = $2
            RETURNING {PHOTO_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(caption)
        .fetch_optional(&self.pool)
        .await?;
        Ok(photo)
    }

    pub async fn delete_photo(&self, user_id: Uuid, id: Uuid) -> Result<Option<Photo>, AppError> {
        let photo = sqlx::query_as(&format!(
            r#"
            DELETE FROM photos p
            WHERE p.id = $1 AND p.user_id = $2
            RETURNING {PHOTO_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(photo)
    }

    // ------------------------------------------------------------ sync logs

    pub async fn start_sync_log(&self, user_id: Uuid) -> Result<GarminSyncLog, AppError> {
        let log = sqlx::query_as(&format!(
            r#"
            INSERT INTO garmin_sync_logs (id, user_id, sync_started_at, status)
            VALUES ($1, $2, NOW(), 'in_progress')
            RETURNING {SYNC_LOG_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(log)
    }

    pub async fn finish_sync_log(
        &self,
        id: Uuid,
        status: SyncStatus,
        tracks_imported: i32,
        error_message: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE garmin_sync_logs
            SET status = $2, tracks_imported = $3, error_message = $4, sync_completed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(tracks_imported)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_sync_logs(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<GarminSyncLog>, AppError> {
        let logs = sqlx::query_as(&format!(
            r#"
            SELECT {SYNC_LOG_COLUMNS} FROM garmin_sync_logs
            WHERE user_id = $1
            ORDER BY sync_started_at DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    // ----------------------------------------------------------- statistics

    pub async fn hunting_statistics(&self, user_id: Uuid) -> Result<HuntingStatistics, AppError> {
        let (total_hunts, distance_km, duration_minutes, total_photos, active_dogs): (
            i64,
            f64,
            f64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM hunts WHERE user_id = $1),
                (SELECT COALESCE(SUM((t.statistics->>'distance_km')::float8), 0)::float8
                 FROM tracks t JOIN hunts h ON h.id = t.hunt_id WHERE h.user_id = $1),
                (SELECT COALESCE(SUM((t.statistics->>'duration_minutes')::float8), 0)::float8
                 FROM tracks t JOIN hunts h ON h.id = t.hunt_id WHERE h.user_id = $1),
                (SELECT COUNT(*) FROM photos WHERE user_id = $1),
                (SELECT COUNT(*) FROM dogs WHERE user_id = $1 AND is_active)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(HuntingStatistics {
            total_hunts,
            total_distance_km: round_to(distance_km, 2),
            total_duration_hours: round_to(duration_minutes / 60.0, 1),
            total_photos,
            active_dogs,
        })
    }
}
