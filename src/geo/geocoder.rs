//! Nearest-city lookup over the geohash-indexed gazetteer.
//!
//! The geohash prefix query is only a pre-filter. A point near a cell edge can
//! have its nearest city in a neighbouring cell, so the search widens from the
//! full 6-character hash to its 5- and 4-character prefixes, keeping the best
//! candidate seen across all rounds, and stops as soon as that candidate is
//! within the distance bound.

use anyhow::Result;
use tracing::debug;

use crate::config::GeocoderConfig;
use crate::db::{City, CityStore};
use crate::geo::distance::distance_km;
use crate::geo::geohash::{self, DEFAULT_PRECISION};

pub const MAX_DISTANCE_KM: f64 = 50.0;
pub const CANDIDATE_LIMIT: usize = 200;

/// How many characters the search may drop from the full hash.
const WIDENING_STEPS: usize = 2;

/// A resolved city and its great-circle distance from the query point
#[derive(Debug, Clone, PartialEq)]
pub struct CityMatch {
    pub city: City,
    pub distance_km: f64,
}

pub struct CityGeocoder<'a, S: CityStore + ?Sized> {
    store: &'a S,
    max_distance_km: f64,
    candidate_limit: usize,
}

impl<'a, S: CityStore + ?Sized> CityGeocoder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            max_distance_km: MAX_DISTANCE_KM,
            candidate_limit: CANDIDATE_LIMIT,
        }
    }

    pub fn from_config(store: &'a S, config: &GeocoderConfig) -> Self {
        Self {
            store,
            max_distance_km: config.max_distance_km,
            candidate_limit: config.candidate_limit,
        }
    }

    /// Nearest gazetteer city within the distance bound, if any.
    pub fn find_city(&self, lat: f64, lon: f64) -> Result<Option<City>> {
        Ok(self.find_nearest(lat, lon)?.map(|m| m.city))
    }

    pub fn find_nearest(&self, lat: f64, lon: f64) -> Result<Option<CityMatch>> {
        let hash = geohash::encode(lat, lon, DEFAULT_PRECISION);
        let mut best: Option<CityMatch> = None;

        for prefix in geohash::widening_prefixes(&hash, WIDENING_STEPS) {
            let candidates = self
                .store
                .find_cities_by_geohash_prefix(prefix, self.candidate_limit)?;
            debug!(prefix, candidates = candidates.len(), "Geocoder lookup");

            for city in candidates {
                let distance = distance_km(lat, lon, city.lat, city.lon);
                if best.as_ref().map_or(true, |b| distance < b.distance_km) {
                    best = Some(CityMatch { city, distance_km: distance });
                }
            }

            if self.within_bound(&best) {
                return Ok(best);
            }
        }

        Ok(best.filter(|m| m.distance_km <= self.max_distance_km))
    }

    fn within_bound(&self, best: &Option<CityMatch>) -> bool {
        best.as_ref()
            .is_some_and(|m| m.distance_km <= self.max_distance_km)
    }
}
