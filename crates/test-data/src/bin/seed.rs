//! Default seed script - creates a demo user with dogs, hunts, and tracks.
//!
//! Run with:
//! ```
//! cargo run -p test-data --bin seed
//! ```
//!
//! `SEED_HUNTS` overrides the number of hunts.

use huntlog::config::DEFAULT_DATABASE_URL;
use rand::{SeedableRng, rngs::StdRng};
use sqlx::postgres::PgPoolOptions;
use test_data::seeder::{SeedConfig, Seeder};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    sqlx::migrate!("../huntlog/migrations").run(&pool).await?;

    tracing::info!("Connected to database");

    let mut config = SeedConfig::default();
    if let Ok(raw) = std::env::var("SEED_HUNTS") {
        config.hunts = raw.parse()?;
    }

    // Reproducible data
    let mut rng = StdRng::seed_from_u64(12345);
    let summary = Seeder::new(pool).seed(&config, &mut rng).await?;

    tracing::info!("Seed completed!");
    tracing::info!("  Login: {} / {}", config.email, config.password);
    tracing::info!("  Dogs: {}", summary.dogs);
    tracing::info!("  Hunts: {}", summary.hunts);
    tracing::info!("  Tracks: {}", summary.tracks);

    Ok(())
}
