//! Types for the offline gazetteer.

use crate::geo::geohash::{self, DEFAULT_PRECISION};

/// A seeded gazetteer entry
#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub id: i64,
    pub name_local: String,
    pub name_en: String,
    pub country_code: String,
    pub lat: f64,
    pub lon: f64,
    pub geohash: String,
}

/// A gazetteer entry waiting to be inserted.
///
/// The geohash is always derived from the coordinates, never supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCity {
    pub name_local: String,
    pub name_en: String,
    pub country_code: String,
    lat: f64,
    lon: f64,
    geohash: String,
}

impl NewCity {
    pub fn new(
        name_en: impl Into<String>,
        name_local: impl Into<String>,
        country_code: impl Into<String>,
        lat: f64,
        lon: f64,
    ) -> Self {
        Self {
            name_local: name_local.into(),
            name_en: name_en.into(),
            country_code: country_code.into(),
            lat,
            lon,
            geohash: geohash::encode(lat, lon, DEFAULT_PRECISION),
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn geohash(&self) -> &str {
        &self.geohash
    }
}
