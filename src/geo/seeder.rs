//! First-run seeding of the gazetteer from a flat CSV dataset.
//!
//! Rows look like `name_en,name_local,country_code,latitude,longitude`. An
//! optional header row starting with `name_en` is skipped, extra trailing
//! fields are ignored and malformed rows are dropped one by one without
//! aborting the load.

use anyhow::Result;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::db::{CityStore, NewCity};
use crate::geo::GeoPoint;

/// Dataset compiled into the binary.
pub const BUNDLED_SEED: &str = include_str!("../../assets/cities_seed.csv");

pub const DEFAULT_BATCH_SIZE: usize = 500;

const HEADER_PREFIX: &str = "name_en";

/// Where the seed rows come from
#[derive(Debug, Clone, PartialEq)]
pub enum SeedSource {
    Bundled,
    File(PathBuf),
}

impl From<Option<PathBuf>> for SeedSource {
    fn from(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => SeedSource::File(path),
            None => SeedSource::Bundled,
        }
    }
}

pub struct CitySeeder<'a, S: CityStore + ?Sized> {
    store: &'a S,
    source: SeedSource,
    batch_size: usize,
}

impl<'a, S: CityStore + ?Sized> CitySeeder<'a, S> {
    pub fn new(store: &'a S, source: SeedSource) -> Self {
        Self {
            store,
            source,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Load the gazetteer unless it already holds entries.
    ///
    /// Returns 0 when nothing was done (already seeded, or the source could not
    /// be opened), otherwise the number of cities now stored.
    pub fn seed_if_needed(&self) -> Result<usize> {
        if self.store.count_cities()? > 0 {
            debug!("Gazetteer already seeded");
            return Ok(0);
        }

        let reader: Box<dyn Read> = match &self.source {
            SeedSource::Bundled => Box::new(BUNDLED_SEED.as_bytes()),
            SeedSource::File(path) => match File::open(path) {
                Ok(file) => Box::new(BufReader::new(file)),
                Err(e) => {
                    warn!(path = ?path, error = %e, "Cannot open gazetteer seed file, geocoding disabled");
                    return Ok(0);
                }
            },
        };

        self.load(reader)
    }

    fn load<R: Read>(&self, reader: R) -> Result<usize> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut batch = Vec::with_capacity(self.batch_size);
        let mut skipped = 0usize;

        for (index, record) in csv.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    debug!(row = index, error = %e, "Unreadable seed row");
                    skipped += 1;
                    continue;
                }
            };

            if index == 0 && record.get(0).is_some_and(|f| f.starts_with(HEADER_PREFIX)) {
                continue;
            }

            match parse_record(&record) {
                Some(city) => {
                    batch.push(city);
                    if batch.len() >= self.batch_size {
                        self.store.insert_cities(&batch)?;
                        batch.clear();
                    }
                }
                None => {
                    debug!(row = index, "Skipping malformed seed row");
                    skipped += 1;
                }
            }
        }

        if !batch.is_empty() {
            self.store.insert_cities(&batch)?;
        }

        let total = self.store.count_cities()? as usize;
        info!(total, skipped, "Gazetteer seeded");
        Ok(total)
    }
}

/// Parse one seed row. Blank local names fall back to the English name.
pub fn parse_record(record: &csv::StringRecord) -> Option<NewCity> {
    if record.len() < 5 {
        return None;
    }

    let name_en = &record[0];
    if name_en.is_empty() {
        return None;
    }
    let name_local = if record[1].is_empty() { name_en } else { &record[1] };

    let lat = record[3].parse::<f64>().ok()?;
    let lon = record[4].parse::<f64>().ok()?;
    let point = GeoPoint::new(lat, lon)?;

    Some(NewCity::new(name_en, name_local, &record[2], point.lat(), point.lon()))
}
