//! Hunting areas used for generated hunts.

use rand::Rng;

use crate::terrain::ElevationGenerator;

/// A named area with a center point and terrain character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HuntingArea {
    pub name: &'static str,
    pub region: &'static str,
    pub center: (f64, f64),
    /// Half-width of the area in degrees latitude.
    pub radius_deg: f64,
    pub base_elevation: f64,
    pub relief: f64,
    pub game: &'static [&'static str],
}

impl HuntingArea {
    pub const FINNSKOGEN: HuntingArea = HuntingArea {
        name: "Finnskogen",
        region: "Innlandet",
        center: (60.62, 12.45),
        radius_deg: 0.05,
        base_elevation: 380.0,
        relief: 90.0,
        game: &["elg", "rådyr"],
    };

    pub const TRYSIL: HuntingArea = HuntingArea {
        name: "Trysil",
        region: "Innlandet",
        center: (61.31, 12.26),
        radius_deg: 0.06,
        base_elevation: 620.0,
        relief: 180.0,
        game: &["elg", "skogsfugl"],
    };

    pub const HARDANGERVIDDA: HuntingArea = HuntingArea {
        name: "Hardangervidda",
        region: "Vestland",
        center: (60.15, 7.45),
        radius_deg: 0.08,
        base_elevation: 1150.0,
        relief: 220.0,
        game: &["rype", "villrein"],
    };

    pub const ALL: [HuntingArea; 3] = [Self::FINNSKOGEN, Self::TRYSIL, Self::HARDANGERVIDDA];

    /// Terrain for this area; the same seed always gives the same landscape.
    pub fn terrain(&self, seed: u32) -> ElevationGenerator {
        ElevationGenerator::new(seed)
            .with_base_elevation(self.base_elevation)
            .with_relief(self.relief)
    }

    /// A random point within the area.
    pub fn random_point(&self, rng: &mut impl Rng) -> (f64, f64) {
        let lon_radius = self.radius_deg / self.center.0.to_radians().cos();
        (
            self.center.0 + rng.gen_range(-self.radius_deg..self.radius_deg),
            self.center.1 + rng.gen_range(-lon_radius..lon_radius),
        )
    }

    /// `[[south, west], [north, east]]`
    pub fn bounds(&self) -> [[f64; 2]; 2] {
        let lon_radius = self.radius_deg / self.center.0.to_radians().cos();
        [
            [self.center.0 - self.radius_deg, self.center.1 - lon_radius],
            [self.center.0 + self.radius_deg, self.center.1 + lon_radius],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_random_points_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for area in HuntingArea::ALL {
            let [[south, west], [north, east]] = area.bounds();
            for _ in 0..100 {
                let (lat, lon) = area.random_point(&mut rng);
                assert!((south..=north).contains(&lat), "{} lat {lat}", area.name);
                assert!((west..=east).contains(&lon), "{} lon {lon}", area.name);
            }
        }
    }
}
