mod schema;
pub mod backend;
pub mod cities;
pub mod media;
pub mod sqlite;
pub mod tags;

use anyhow::Result;
use std::path::Path;

pub use backend::{CityStore, MediaStore, TagStore};
pub use cities::{City, NewCity};
pub use media::{DateCount, MediaItem, PlaceCount, ScanState};
pub use schema::{SCHEMA, SCHEMA_VERSION};
pub use tags::{Tag, TagCount, TagSource, TagType};

pub struct Database {
    inner: sqlite::SqliteDb,
}

impl Database {
    /// Open (creating if needed) the SQLite database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let db = sqlite::SqliteDb::open(path)?;
        Ok(Self { inner: db })
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = sqlite::SqliteDb::open_in_memory()?;
        Ok(Self { inner: db })
    }

    pub fn initialize(&self) -> Result<()> {
        self.inner.initialize()
    }

    // ========================================================================
    // Counters
    // ========================================================================

    pub fn count_media(&self) -> Result<i64> {
        self.inner.count_media()
    }

    pub fn count_tags(&self) -> Result<i64> {
        self.inner.count_tags()
    }

    pub fn count_media_tags(&self) -> Result<i64> {
        self.inner.count_media_tags()
    }

    // ========================================================================
    // Browse queries
    // ========================================================================

    pub fn get_date_counts(&self, limit: usize) -> Result<Vec<DateCount>> {
        self.inner.get_date_counts(limit)
    }

    pub fn get_unknown_date_counts(&self, limit: usize) -> Result<Vec<DateCount>> {
        self.inner.get_unknown_date_counts(limit)
    }

    pub fn get_place_counts(&self, limit: usize) -> Result<Vec<PlaceCount>> {
        self.inner.get_place_counts(limit)
    }

    pub fn count_location_unknown(&self) -> Result<i64> {
        self.inner.count_location_unknown()
    }

    pub fn get_tag_counts(&self, tag_type: TagType, limit: usize) -> Result<Vec<TagCount>> {
        self.inner.get_tag_counts(tag_type, limit)
    }

    pub fn get_media_by_city(&self, city_id: i64, limit: usize) -> Result<Vec<MediaItem>> {
        self.inner.get_media_by_city(city_id, limit)
    }

    pub fn get_media_by_date(&self, local_date: &str, limit: usize) -> Result<Vec<MediaItem>> {
        self.inner.get_media_by_date(local_date, limit)
    }

    pub fn get_unknown_media(&self, limit: usize) -> Result<Vec<MediaItem>> {
        self.inner.get_unknown_media(limit)
    }

    pub fn get_unknown_media_by_date(&self, local_date: &str, limit: usize) -> Result<Vec<MediaItem>> {
        self.inner.get_unknown_media_by_date(local_date, limit)
    }

    pub fn get_media_by_tag(&self, tag_id: i64, limit: usize) -> Result<Vec<MediaItem>> {
        self.inner.get_media_by_tag(tag_id, limit)
    }
}

impl CityStore for Database {
    fn count_cities(&self) -> Result<i64> {
        self.inner.count_cities()
    }

    fn insert_cities(&self, cities: &[NewCity]) -> Result<usize> {
        self.inner.insert_cities(cities)
    }

    fn find_cities_by_geohash(&self, geohash: &str) -> Result<Vec<City>> {
        self.inner.find_cities_by_geohash(geohash)
    }

    fn find_cities_by_geohash_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<City>> {
        self.inner.find_cities_by_geohash_prefix(prefix, limit)
    }

    fn find_city_by_id(&self, id: i64) -> Result<Option<City>> {
        self.inner.find_city_by_id(id)
    }
}

impl TagStore for Database {
    fn insert_tag_or_ignore(
        &self,
        tag_type: TagType,
        name: &str,
        confidence: f64,
        source: TagSource,
    ) -> Result<Option<i64>> {
        self.inner.insert_tag_or_ignore(tag_type, name, confidence, source)
    }

    fn find_tag_by_id(&self, id: i64) -> Result<Option<Tag>> {
        self.inner.find_tag_by_id(id)
    }

    fn find_tag_by_type_and_name(&self, tag_type: TagType, name: &str) -> Result<Option<Tag>> {
        self.inner.find_tag_by_type_and_name(tag_type, name)
    }

    fn link_media_tag(&self, media_uri: &str, tag_id: i64) -> Result<()> {
        self.inner.link_media_tag(media_uri, tag_id)
    }

    fn get_media_tags(&self, media_uri: &str) -> Result<Vec<Tag>> {
        self.inner.get_media_tags(media_uri)
    }
}

impl MediaStore for Database {
    fn upsert_media(&self, items: &[MediaItem]) -> Result<()> {
        self.inner.upsert_media(items)
    }

    fn get_media(&self, uri: &str) -> Result<Option<MediaItem>> {
        self.inner.get_media(uri)
    }

    fn get_unlabeled_media(&self, limit: usize) -> Result<Vec<MediaItem>> {
        self.inner.get_unlabeled_media(limit)
    }

    fn update_label(&self, uri: &str, label_json: &str) -> Result<()> {
        self.inner.update_label(uri, label_json)
    }

    fn get_scan_state(&self) -> Result<Option<ScanState>> {
        self.inner.get_scan_state()
    }

    fn save_scan_state(&self, state: &ScanState) -> Result<()> {
        self.inner.save_scan_state(state)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    pub(crate) fn media_item(uri: &str, local_date: &str, city_id: Option<i64>) -> MediaItem {
        MediaItem {
            uri: uri.to_string(),
            mime_type: Some("image/jpeg".to_string()),
            is_video: false,
            date_taken_utc: 1_700_000_000_000,
            tz_offset_min: 0,
            local_date: local_date.to_string(),
            lat: city_id.map(|_| 37.5665),
            lon: city_id.map(|_| 126.978),
            city_id,
            has_location: city_id.is_some(),
            label_json: None,
            scan_version: 1,
            last_scanned_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_initialize_is_repeatable() {
        let db = test_db();
        db.initialize().unwrap();
        assert_eq!(db.count_cities().unwrap(), 0);
    }

    #[test]
    fn test_prefix_lookup_respects_limit() {
        let db = test_db();
        let cities: Vec<NewCity> = (0..5)
            .map(|i| NewCity::new(format!("Town {i}"), "", "KR", 37.5665, 126.978 + i as f64 * 0.001))
            .collect();
        db.insert_cities(&cities).unwrap();

        assert_eq!(db.find_cities_by_geohash_prefix("wydm", 200).unwrap().len(), 5);
        assert_eq!(db.find_cities_by_geohash_prefix("wydm", 2).unwrap().len(), 2);
        assert_eq!(db.find_cities_by_geohash_prefix("u", 200).unwrap().len(), 0);
        let exact = cities[0].geohash().to_string();
        assert!(!db.find_cities_by_geohash(&exact).unwrap().is_empty());
    }

    #[test]
    fn test_tag_natural_key_is_unique() {
        let db = test_db();
        let first = db
            .insert_tag_or_ignore(TagType::Event, "Wedding", 0.9, TagSource::Model)
            .unwrap();
        let second = db
            .insert_tag_or_ignore(TagType::Event, "Wedding", 0.95, TagSource::Model)
            .unwrap();
        let other_type = db
            .insert_tag_or_ignore(TagType::People, "Wedding", 0.9, TagSource::Model)
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(other_type.is_some());
        assert_eq!(db.count_tags().unwrap(), 2);

        let tag = db
            .find_tag_by_type_and_name(TagType::Event, "Wedding")
            .unwrap()
            .unwrap();
        assert_eq!(Some(tag.id), first);
        assert_eq!(tag.source, TagSource::Model);
    }

    #[test]
    fn test_upsert_keeps_label_summary() {
        let db = test_db();
        db.upsert_media(&[media_item("file:///a.jpg", "2024-05-01", None)]).unwrap();
        db.update_label("file:///a.jpg", "{}").unwrap();

        db.upsert_media(&[media_item("file:///a.jpg", "2024-05-02", None)]).unwrap();

        let item = db.get_media("file:///a.jpg").unwrap().unwrap();
        assert_eq!(item.label_json.as_deref(), Some("{}"));
        assert_eq!(item.local_date, "2024-05-02");
        assert!(db.get_unlabeled_media(10).unwrap().is_empty());
    }

    #[test]
    fn test_browse_counts() {
        let db = test_db();
        db.insert_cities(&[NewCity::new("Seoul", "서울", "KR", 37.5665, 126.978)]).unwrap();
        let seoul = db.find_cities_by_geohash_prefix("wyd", 10).unwrap()[0].id;

        db.upsert_media(&[
            media_item("a", "2024-05-01", Some(seoul)),
            media_item("b", "2024-05-01", None),
            media_item("c", "2024-05-03", Some(seoul)),
        ])
        .unwrap();

        let dates = db.get_date_counts(10).unwrap();
        assert_eq!(dates[0].local_date, "2024-05-03");
        assert_eq!(dates[1].count, 2);

        let places = db.get_place_counts(10).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name_local, "서울");
        assert_eq!(places[0].count, 2);

        assert_eq!(db.count_location_unknown().unwrap(), 1);
        assert_eq!(db.get_unknown_date_counts(10).unwrap().len(), 1);
        assert_eq!(db.get_media_by_city(seoul, 10).unwrap().len(), 2);
        assert_eq!(db.get_media_by_date("2024-05-01", 10).unwrap().len(), 2);
        assert_eq!(db.get_unknown_media(10).unwrap()[0].uri, "b");
    }

    #[test]
    fn test_unknown_media_by_date() {
        let db = test_db();
        db.insert_cities(&[NewCity::new("Seoul", "서울", "KR", 37.5665, 126.978)]).unwrap();
        let seoul = db.find_cities_by_geohash_prefix("wyd", 10).unwrap()[0].id;

        let mut newer = media_item("b2", "2024-05-01", None);
        newer.date_taken_utc += 60_000;
        db.upsert_media(&[
            media_item("a", "2024-05-01", Some(seoul)),
            media_item("b1", "2024-05-01", None),
            newer,
            media_item("c", "2024-05-02", None),
        ])
        .unwrap();

        let items = db.get_unknown_media_by_date("2024-05-01", 10).unwrap();
        let uris: Vec<&str> = items.iter().map(|m| m.uri.as_str()).collect();
        assert_eq!(uris, vec!["b2", "b1"]);
        assert_eq!(db.get_unknown_media_by_date("2024-05-01", 1).unwrap().len(), 1);
        assert!(db.get_unknown_media_by_date("2024-06-01", 10).unwrap().is_empty());
    }

    #[test]
    fn test_tag_with_unknown_source_is_skipped() {
        let db = test_db();
        db.inner
            .conn
            .execute(
                "INSERT INTO tag (type, name, confidence, source) VALUES ('event', 'Wedding', 0.9, 'imported')",
                [],
            )
            .unwrap();
        let id = db.inner.conn.last_insert_rowid();
        db.link_media_tag("a", id).unwrap();

        assert!(db.find_tag_by_id(id).unwrap().is_none());
        assert!(db.find_tag_by_type_and_name(TagType::Event, "Wedding").unwrap().is_none());
        assert!(db.get_media_tags("a").unwrap().is_empty());
    }

    #[test]
    fn test_scan_state_round_trip() {
        let db = test_db();
        assert!(db.get_scan_state().unwrap().is_none());
        let state = ScanState {
            last_scan_epoch: 10,
            last_success_epoch: 10,
            schema_version: SCHEMA_VERSION,
            error_count: 0,
        };
        db.save_scan_state(&state).unwrap();
        db.save_scan_state(&ScanState { error_count: 1, ..state.clone() }).unwrap();
        assert_eq!(db.get_scan_state().unwrap().unwrap().error_count, 1);
    }
}
