//! Offline reverse geocoding: geohash codec, gazetteer seeding and
//! nearest-city search.

pub mod distance;
pub mod geocoder;
pub mod geohash;
pub mod geonames;
pub mod seeder;

pub use geocoder::{CityGeocoder, CityMatch};
pub use seeder::{CitySeeder, SeedSource};

/// A validated WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Returns `None` unless both values are finite and in range.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn geohash(&self, precision: usize) -> String {
        geohash::encode(self.lat, self.lon, precision)
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        distance::distance_km(self.lat, self.lon, other.lat, other.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(90.0, -180.0).is_some());
        assert!(GeoPoint::new(90.1, 0.0).is_none());
        assert!(GeoPoint::new(0.0, 180.5).is_none());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_none());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_geo_point_helpers() {
        let a = GeoPoint::new(57.64911, 10.40744).unwrap();
        assert_eq!(a.geohash(6), "u4pruy");
        assert!(a.distance_km(&a).abs() < 1e-9);
    }
}
