pub mod discovery;
pub mod metadata;
pub mod video;

use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{CityStore, MediaItem, MediaStore, ScanState, SCHEMA_VERSION};
use crate::geo::{CityGeocoder, GeoPoint};

pub use discovery::{discover_media, DiscoveredMedia};
pub use metadata::MediaMetadata;

/// Version stamped on every record written by this scanner.
pub const SCAN_VERSION: i32 = 1;

/// Media records are written in chunks of this size.
const UPSERT_CHUNK: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub total_found: usize,
    pub scanned: usize,
    pub with_location: usize,
    pub geocoded: usize,
    pub failed: usize,
}

pub struct MediaScanner<'a, D: MediaStore + CityStore + ?Sized> {
    store: &'a D,
    config: &'a Config,
    geocoder: CityGeocoder<'a, D>,
}

impl<'a, D: MediaStore + CityStore + ?Sized> MediaScanner<'a, D> {
    pub fn new(store: &'a D, config: &'a Config) -> Self {
        Self {
            store,
            config,
            geocoder: CityGeocoder::from_config(store, &config.geocoder),
        }
    }

    /// Index every media file under `directory` and record the scan outcome.
    ///
    /// On failure the error count is bumped, the last success time is left
    /// alone and the error is returned.
    pub fn scan_and_store(&self, directory: &Path) -> Result<ScanResult> {
        let now = Utc::now().timestamp_millis();
        let mut state = self.store.get_scan_state()?.unwrap_or_default();
        state.last_scan_epoch = now;
        state.schema_version = SCHEMA_VERSION;

        match self.scan_directory(directory, now) {
            Ok(result) => {
                state.last_success_epoch = now;
                state.error_count = 0;
                self.store.save_scan_state(&state)?;
                info!(
                    found = result.total_found,
                    scanned = result.scanned,
                    geocoded = result.geocoded,
                    "Scan finished"
                );
                Ok(result)
            }
            Err(e) => {
                state.error_count += 1;
                if let Err(save_err) = self.store.save_scan_state(&state) {
                    warn!(error = %save_err, "Failed to record scan failure");
                }
                Err(e)
            }
        }
    }

    fn scan_directory(&self, directory: &Path, now: i64) -> Result<ScanResult> {
        if !directory.is_dir() {
            anyhow::bail!("Not a directory: {}", directory.display());
        }

        let found = discover_media(directory, &self.config.scanner)?;
        let mut result = ScanResult {
            total_found: found.len(),
            ..Default::default()
        };

        let mut batch = Vec::with_capacity(UPSERT_CHUNK);
        for media in &found {
            match self.scan_single_file(media, now) {
                Ok(item) => {
                    if item.has_location {
                        result.with_location += 1;
                    }
                    if item.city_id.is_some() {
                        result.geocoded += 1;
                    }
                    result.scanned += 1;
                    batch.push(item);
                    if batch.len() >= UPSERT_CHUNK {
                        self.store.upsert_media(&batch)?;
                        batch.clear();
                    }
                }
                Err(e) => {
                    warn!(path = ?media.path, error = %e, "Skipping unreadable media file");
                    result.failed += 1;
                }
            }
        }

        if !batch.is_empty() {
            self.store.upsert_media(&batch)?;
        }

        Ok(result)
    }

    fn scan_single_file(&self, media: &DiscoveredMedia, now: i64) -> Result<MediaItem> {
        let path = &media.path;
        let modified = metadata::file_modified(path)?;

        let meta = if media.is_video {
            video::extract_video_metadata(path)
        } else {
            metadata::extract_metadata(path)
        };
        let capture = metadata::resolve_capture_time(&meta, modified);

        let point = match (meta.gps_latitude, meta.gps_longitude) {
            (Some(lat), Some(lon)) => GeoPoint::new(lat, lon),
            _ => None,
        };
        let city_id = match point {
            Some(point) => self
                .geocoder
                .find_city(point.lat(), point.lon())?
                .map(|city| city.id),
            None => None,
        };

        Ok(MediaItem {
            uri: path.to_string_lossy().into_owned(),
            mime_type: discovery::mime_type_for(path).map(str::to_string),
            is_video: media.is_video,
            date_taken_utc: capture.utc.timestamp_millis(),
            tz_offset_min: capture.tz_offset_min,
            local_date: capture.local_date,
            lat: point.map(|p| p.lat()),
            lon: point.map(|p| p.lon()),
            city_id,
            has_location: point.is_some(),
            label_json: None,
            scan_version: SCAN_VERSION,
            last_scanned_at: now,
        })
    }
}

/// Scan bookkeeping as last recorded, or defaults before the first scan.
pub fn last_scan_state<S: MediaStore + ?Sized>(store: &S) -> Result<ScanState> {
    Ok(store.get_scan_state()?.unwrap_or_default())
}
