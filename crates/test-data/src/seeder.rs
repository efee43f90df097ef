//! Database seeding with a demo user, dogs, and hunts with tracks.
//!
//! Tracks go through the same GPX pipeline as uploads: each generated track is
//! written as GPX and processed by [`GpxProcessor`] before it is stored.

use huntlog::{
    auth::hash_password,
    database::Database,
    gpx_processor::GpxProcessor,
    models::{
        DEFAULT_COUNTRY, DEFAULT_TRACK_COLOR, Dog, GameObservation, HarvestedGame, Hunt,
        HuntLocation, TrackRecord, TrackSource, User, WeatherConditions,
    },
    track::Track,
};
use rand::{Rng, seq::SliceRandom};
use sqlx::PgPool;
use time::{Date, Duration, OffsetDateTime, Time};
use uuid::Uuid;

use crate::{
    areas::HuntingArea,
    gpx::generate_gpx,
    tracks::{Mover, TrackGenerator},
};

const DOGS: [(&str, &str, &str); 3] = [
    ("Bamse", "Norsk elghund grå", "#FF6B6B"),
    ("Tass", "Jämthund", "#FFD93D"),
    ("Frøya", "Engelsk setter", "#6BCB77"),
];

const CONDITIONS: [&str; 4] = ["Overskyet", "Klart", "Lett regn", "Tåke"];

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub email: String,
    pub password: String,
    pub name: String,
    pub hunts: usize,
    /// Hunts are spread over this many days before today.
    pub days_back: i64,
    pub terrain_seed: u32,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            email: "demo@huntlog.no".to_string(),
            password: "jaktlogg123".to_string(),
            name: "Demo Jeger".to_string(),
            hunts: 12,
            days_back: 60,
            terrain_seed: 42,
        }
    }
}

#[derive(Debug, Default)]
pub struct SeedSummary {
    pub user_id: Option<Uuid>,
    pub dogs: usize,
    pub hunts: usize,
    pub tracks: usize,
}

pub struct Seeder {
    db: Database,
}

impl Seeder {
    pub fn new(pool: PgPool) -> Self {
        Self {
            db: Database::new(pool),
        }
    }

    /// Creates the demo user and everything that belongs to it.
    ///
    /// Fails with a conflict if the demo email is already registered.
    pub async fn seed(
        &self,
        config: &SeedConfig,
        rng: &mut impl Rng,
    ) -> anyhow::Result<SeedSummary> {
        let user = User::new(config.email.clone(), config.name.clone());
        self.db
            .create_user_with_password(&user, &hash_password(&config.password)?)
            .await?;
        tracing::info!("Created user {}", user.email);

        let mut summary = SeedSummary {
            user_id: Some(user.id),
            ..Default::default()
        };

        let mut dogs = Vec::with_capacity(DOGS.len());
        for (name, breed, color) in DOGS {
            let dog = build_dog(user.id, name, breed, color, rng);
            self.db.create_dog(&dog).await?;
            dogs.push(dog);
        }
        summary.dogs = dogs.len();

        let today = OffsetDateTime::now_utc().date();
        for i in 0..config.hunts {
            let area = HuntingArea::ALL[i % HuntingArea::ALL.len()];
            let date = today - Duration::days(rng.gen_range(0..config.days_back.max(1)));
            let hunt = build_hunt(user.id, &area, date, rng);

            let dog_count = rng.gen_range(1..=2);
            let hunt_dogs: Vec<&Dog> = dogs.choose_multiple(rng, dog_count).collect();
            let dog_ids: Vec<Uuid> = hunt_dogs.iter().map(|d| d.id).collect();
            self.db.create_hunt(&hunt, &dog_ids).await?;

            let start = hunt
                .start_time
                .map(|t| date.with_time(t).assume_utc())
                .unwrap_or_else(|| date.midnight().assume_utc());
            let (lat, lon) = hunt_start(&hunt, &area);
            let generator = TrackGenerator::for_area(&area, config.terrain_seed)
                .with_start(lat, lon)
                .with_duration_minutes(rng.gen_range(90.0..300.0));

            let hunter = generator.generate(Mover::Hunter, start, rng)?;
            self.store_track(&hunt, None, "Jeger", DEFAULT_TRACK_COLOR, &hunter)
                .await?;
            summary.tracks += 1;

            for dog in hunt_dogs {
                let track = generator.generate(Mover::Dog, start, rng)?;
                self.store_track(&hunt, Some(dog.id), &dog.name, &dog.color, &track)
                    .await?;
                summary.tracks += 1;
            }

            summary.hunts += 1;
            tracing::debug!("Seeded hunt {} on {}", hunt.title, hunt.date);
        }

        Ok(summary)
    }

    async fn store_track(
        &self,
        hunt: &Hunt,
        dog_id: Option<Uuid>,
        name: &str,
        color: &str,
        track: &Track,
    ) -> anyhow::Result<()> {
        let gpx = generate_gpx(track, name);
        let processed = GpxProcessor::process(&gpx)?;
        let (start_time, end_time) = processed.time_range(None);

        let record = TrackRecord {
            id: Uuid::new_v4(),
            hunt_id: hunt.id,
            dog_id,
            name: name.to_string(),
            source: TrackSource::GpxImport,
            garmin_activity_id: None,
            gpx_object_path: None,
            geojson: processed.geometry,
            statistics: processed.statistics,
            color: color.to_string(),
            start_time,
            end_time,
            created_at: OffsetDateTime::now_utc(),
        };
        self.db.create_track(&record).await?;
        Ok(())
    }
}

fn hunt_start(hunt: &Hunt, area: &HuntingArea) -> (f64, f64) {
    hunt.location
        .coordinates
        .map(|[lat, lon]| (lat, lon))
        .unwrap_or(area.center)
}

fn build_dog(user_id: Uuid, name: &str, breed: &str, color: &str, rng: &mut impl Rng) -> Dog {
    let now = OffsetDateTime::now_utc();
    let age_days = rng.gen_range(365..365 * 9);
    Dog {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        breed: breed.to_string(),
        birth_date: Some(now.date() - Duration::days(age_days)),
        color: color.to_string(),
        garmin_collar_id: Some(format!("T5-{}", rng.gen_range(10_000..99_999))),
        photo_url: None,
        notes: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn build_hunt(user_id: Uuid, area: &HuntingArea, date: Date, rng: &mut impl Rng) -> Hunt {
    let now = OffsetDateTime::now_utc();
    let game = area.game[rng.gen_range(0..area.game.len())];
    let (lat, lon) = area.random_point(rng);
    let start_hour = rng.gen_range(6..10);
    let start_time = Time::from_hms(start_hour, 0, 0).ok();
    let end_time = Time::from_hms(start_hour + rng.gen_range(3..8), 30, 0).ok();

    let seen = rng.gen_range(0..4);
    let harvested = rng.gen_bool(0.3);

    Hunt {
        id: Uuid::new_v4(),
        user_id,
        title: format!("{} i {}", capitalize(game), area.name),
        date,
        start_time,
        end_time,
        location: HuntLocation {
            name: area.name.to_string(),
            region: Some(area.region.to_string()),
            country: DEFAULT_COUNTRY.to_string(),
            coordinates: Some([lat, lon]),
            bounds: Some(area.bounds()),
        },
        weather: Some(WeatherConditions {
            temperature: Some(rng.gen_range(-5.0..15.0_f64).round()),
            humidity: Some(rng.gen_range(50.0..100.0_f64).round()),
            wind_speed: Some(rng.gen_range(0.0..12.0_f64).round()),
            wind_direction: ["N", "NØ", "Ø", "SØ", "S", "SV", "V", "NV"]
                .choose(rng)
                .map(|d| d.to_string()),
            precipitation: None,
            conditions: CONDITIONS.choose(rng).map(|c| c.to_string()),
        }),
        game_type: vec![game.to_string()],
        game_seen: (0..seen)
            .map(|_| GameObservation {
                game_type: game.to_string(),
                count: rng.gen_range(1..4),
                time: None,
                location: Some([
                    lat + rng.gen_range(-0.01..0.01),
                    lon + rng.gen_range(-0.01..0.01),
                ]),
                notes: None,
            })
            .collect(),
        game_harvested: if harvested {
            vec![HarvestedGame {
                game_type: game.to_string(),
                count: 1,
                weight: Some(rng.gen_range(20.0..250.0_f64).round()),
                time: end_time,
                location: Some([lat, lon]),
                photos: Vec::new(),
                notes: None,
            }]
        } else {
            Vec::new()
        },
        notes: Some(format!("Generert jakt i {}", area.name)),
        summary: None,
        tags: vec![area.name.to_lowercase(), game.to_string()],
        is_favorite: rng.gen_bool(0.15),
        created_at: now,
        updated_at: now,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
