//! Test data generation for huntlog.
//!
//! Generates hunter and dog GPS tracks over noise-based terrain, writes them as
//! GPX, and seeds a database with a demo user, dogs, and hunts.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_data::prelude::*;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let generator = TrackGenerator::for_area(&HuntingArea::FINNSKOGEN, 42)
//!     .with_duration_minutes(120.0);
//! let track = generator.generate(Mover::Dog, start_time, &mut rng);
//! let gpx = generate_gpx(&track, "Los med Bamse");
//! ```

pub mod areas;
pub mod gpx;
pub mod seeder;
pub mod terrain;
pub mod tracks;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::areas::HuntingArea;
    pub use crate::gpx::generate_gpx;
    pub use crate::seeder::{SeedConfig, SeedSummary, Seeder};
    pub use crate::terrain::ElevationGenerator;
    pub use crate::tracks::{Mover, TrackConfig, TrackGenerator};
    pub use rand::{SeedableRng, rngs::StdRng};
}
