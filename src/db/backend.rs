//! Storage contracts used by the geocoder, the seeder and the tagging pipeline.
//!
//! The core algorithms only see these traits; `Database` implements them on
//! top of SQLite. Uniqueness of tags and links is the store's job.

use anyhow::Result;

use super::cities::{City, NewCity};
use super::media::{MediaItem, ScanState};
use super::tags::{Tag, TagSource, TagType};

/// Gazetteer storage.
pub trait CityStore {
    /// Number of seeded cities
    fn count_cities(&self) -> Result<i64>;

    /// Insert a batch of cities atomically, returning how many were written
    fn insert_cities(&self, cities: &[NewCity]) -> Result<usize>;

    /// Cities whose geohash equals `geohash`
    fn find_cities_by_geohash(&self, geohash: &str) -> Result<Vec<City>>;

    /// Cities whose geohash starts with `prefix`, at most `limit` rows
    fn find_cities_by_geohash_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<City>>;

    fn find_city_by_id(&self, id: i64) -> Result<Option<City>>;
}

/// Tag and media-tag link storage.
pub trait TagStore {
    /// Insert a tag unless `(type, name)` already exists.
    ///
    /// Returns the new id, or `None` when the natural key was taken.
    fn insert_tag_or_ignore(
        &self,
        tag_type: TagType,
        name: &str,
        confidence: f64,
        source: TagSource,
    ) -> Result<Option<i64>>;

    fn find_tag_by_id(&self, id: i64) -> Result<Option<Tag>>;

    fn find_tag_by_type_and_name(&self, tag_type: TagType, name: &str) -> Result<Option<Tag>>;

    /// Link a media item to a tag; an existing link is left alone
    fn link_media_tag(&self, media_uri: &str, tag_id: i64) -> Result<()>;

    fn get_media_tags(&self, media_uri: &str) -> Result<Vec<Tag>>;
}

/// Media record storage.
pub trait MediaStore {
    /// Insert or refresh scanned items, keeping any stored label summary
    fn upsert_media(&self, items: &[MediaItem]) -> Result<()>;

    fn get_media(&self, uri: &str) -> Result<Option<MediaItem>>;

    /// Items that have not been classified yet
    fn get_unlabeled_media(&self, limit: usize) -> Result<Vec<MediaItem>>;

    fn update_label(&self, uri: &str, label_json: &str) -> Result<()>;

    fn get_scan_state(&self) -> Result<Option<ScanState>>;

    fn save_scan_state(&self, state: &ScanState) -> Result<()>;
}
