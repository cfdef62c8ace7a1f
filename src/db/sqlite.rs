//! SQLite backend implementation.

use anyhow::Result;
use rusqlite::{Connection, Row};
use std::path::Path;

use super::cities::{City, NewCity};
use super::media::{DateCount, MediaItem, PlaceCount, ScanState};
use super::schema::SCHEMA;
use super::tags::{Tag, TagCount, TagSource, TagType};

const CITY_COLUMNS: &str = "id, name_local, name_en, country_code, lat, lon, geohash";

const MEDIA_COLUMNS: &str = "uri, mime_type, is_video, date_taken_utc, tz_offset_min, local_date, \
     lat, lon, city_id, has_location, label_json, scan_version, last_scanned_at";

fn city_from_row(row: &Row<'_>) -> rusqlite::Result<City> {
    Ok(City {
        id: row.get(0)?,
        name_local: row.get(1)?,
        name_en: row.get(2)?,
        country_code: row.get(3)?,
        lat: row.get(4)?,
        lon: row.get(5)?,
        geohash: row.get(6)?,
    })
}

fn media_from_row(row: &Row<'_>) -> rusqlite::Result<MediaItem> {
    Ok(MediaItem {
        uri: row.get(0)?,
        mime_type: row.get(1)?,
        is_video: row.get(2)?,
        date_taken_utc: row.get(3)?,
        tz_offset_min: row.get(4)?,
        local_date: row.get(5)?,
        lat: row.get(6)?,
        lon: row.get(7)?,
        city_id: row.get(8)?,
        has_location: row.get(9)?,
        label_json: row.get(10)?,
        scan_version: row.get(11)?,
        last_scanned_at: row.get(12)?,
    })
}

/// Tag type and source are stored as text; rows with an unknown value in
/// either column are skipped by callers.
fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Option<Tag>> {
    let tag_type: String = row.get(1)?;
    let Ok(tag_type) = tag_type.parse::<TagType>() else {
        return Ok(None);
    };
    let source: String = row.get(4)?;
    let Some(source) = TagSource::parse(&source) else {
        return Ok(None);
    };
    Ok(Some(Tag {
        id: row.get(0)?,
        tag_type,
        name: row.get(2)?,
        confidence: row.get(3)?,
        source,
    }))
}

pub struct SqliteDb {
    pub(crate) conn: Connection,
}

impl SqliteDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ========================================================================
    // City operations
    // ========================================================================

    pub fn count_cities(&self) -> Result<i64> {
        let count = self.conn.query_row("SELECT COUNT(*) FROM city", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn insert_cities(&self, cities: &[NewCity]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO city (name_local, name_en, country_code, lat, lon, geohash)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )?;
            for city in cities {
                stmt.execute(rusqlite::params![
                    city.name_local,
                    city.name_en,
                    city.country_code,
                    city.lat(),
                    city.lon(),
                    city.geohash(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(cities.len())
    }

    pub fn find_cities_by_geohash(&self, geohash: &str) -> Result<Vec<City>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CITY_COLUMNS} FROM city WHERE geohash = ? ORDER BY id"))?;
        let cities = stmt
            .query_map([geohash], city_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(cities)
    }

    pub fn find_cities_by_geohash_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<City>> {
        // The geohash alphabet has no LIKE wildcards.
        let pattern = format!("{}%", prefix);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CITY_COLUMNS} FROM city WHERE geohash LIKE ? ORDER BY id LIMIT ?"
        ))?;
        let cities = stmt
            .query_map(rusqlite::params![pattern, limit as i64], city_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(cities)
    }

    pub fn find_city_by_id(&self, id: i64) -> Result<Option<City>> {
        let result = self.conn.query_row(
            &format!("SELECT {CITY_COLUMNS} FROM city WHERE id = ?"),
            [id],
            city_from_row,
        );
        match result {
            Ok(city) => Ok(Some(city)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Tag operations
    // ========================================================================

    pub fn insert_tag_or_ignore(
        &self,
        tag_type: TagType,
        name: &str,
        confidence: f64,
        source: TagSource,
    ) -> Result<Option<i64>> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO tag (type, name, confidence, source) VALUES (?, ?, ?, ?)",
            rusqlite::params![tag_type.as_str(), name, confidence, source.as_str()],
        )?;
        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    pub fn find_tag_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let result = self.conn.query_row(
            "SELECT id, type, name, confidence, source FROM tag WHERE id = ?",
            [id],
            tag_from_row,
        );
        match result {
            Ok(tag) => Ok(tag),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_tag_by_type_and_name(&self, tag_type: TagType, name: &str) -> Result<Option<Tag>> {
        let result = self.conn.query_row(
            "SELECT id, type, name, confidence, source FROM tag WHERE type = ? AND name = ? LIMIT 1",
            rusqlite::params![tag_type.as_str(), name],
            tag_from_row,
        );
        match result {
            Ok(tag) => Ok(tag),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn link_media_tag(&self, media_uri: &str, tag_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO media_tag (media_uri, tag_id) VALUES (?, ?)",
            rusqlite::params![media_uri, tag_id],
        )?;
        Ok(())
    }

    pub fn get_media_tags(&self, media_uri: &str) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.id, t.type, t.name, t.confidence, t.source
            FROM tag t
            JOIN media_tag mt ON mt.tag_id = t.id
            WHERE mt.media_uri = ?
            ORDER BY t.type, t.name
            "#,
        )?;
        let tags = stmt
            .query_map([media_uri], tag_from_row)?
            .filter_map(|r| r.ok().flatten())
            .collect();
        Ok(tags)
    }

    pub fn count_tags(&self) -> Result<i64> {
        let count = self.conn.query_row("SELECT COUNT(*) FROM tag", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_media_tags(&self) -> Result<i64> {
        let count = self.conn.query_row("SELECT COUNT(*) FROM media_tag", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_tag_counts(&self, tag_type: TagType, limit: usize) -> Result<Vec<TagCount>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.id, t.name, COUNT(mt.media_uri) AS count
            FROM tag t
            JOIN media_tag mt ON t.id = mt.tag_id
            WHERE t.type = ?
            GROUP BY t.id
            ORDER BY count DESC
            LIMIT ?
            "#,
        )?;
        let counts = stmt
            .query_map(rusqlite::params![tag_type.as_str(), limit as i64], |row| {
                Ok(TagCount {
                    tag_id: row.get(0)?,
                    name: row.get(1)?,
                    tag_type,
                    count: row.get(2)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(counts)
    }

    // ========================================================================
    // Media operations
    // ========================================================================

    pub fn upsert_media(&self, items: &[MediaItem]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO media_item (
                    uri, mime_type, is_video, date_taken_utc, tz_offset_min, local_date,
                    lat, lon, city_id, has_location, label_json, scan_version, last_scanned_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(uri) DO UPDATE SET
                    mime_type = excluded.mime_type,
                    is_video = excluded.is_video,
                    date_taken_utc = excluded.date_taken_utc,
                    tz_offset_min = excluded.tz_offset_min,
                    local_date = excluded.local_date,
                    lat = excluded.lat,
                    lon = excluded.lon,
                    city_id = excluded.city_id,
                    has_location = excluded.has_location,
                    label_json = COALESCE(excluded.label_json, media_item.label_json),
                    scan_version = excluded.scan_version,
                    last_scanned_at = excluded.last_scanned_at
                "#,
            )?;
            for item in items {
                stmt.execute(rusqlite::params![
                    item.uri,
                    item.mime_type,
                    item.is_video,
                    item.date_taken_utc,
                    item.tz_offset_min,
                    item.local_date,
                    item.lat,
                    item.lon,
                    item.city_id,
                    item.has_location,
                    item.label_json,
                    item.scan_version,
                    item.last_scanned_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_media(&self, uri: &str) -> Result<Option<MediaItem>> {
        let result = self.conn.query_row(
            &format!("SELECT {MEDIA_COLUMNS} FROM media_item WHERE uri = ? LIMIT 1"),
            [uri],
            media_from_row,
        );
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn count_media(&self) -> Result<i64> {
        let count = self.conn.query_row("SELECT COUNT(*) FROM media_item", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_unlabeled_media(&self, limit: usize) -> Result<Vec<MediaItem>> {
        self.query_media(
            "WHERE label_json IS NULL ORDER BY date_taken_utc DESC LIMIT ?",
            rusqlite::params![limit as i64],
        )
    }

    pub fn update_label(&self, uri: &str, label_json: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE media_item SET label_json = ? WHERE uri = ?",
            rusqlite::params![label_json, uri],
        )?;
        Ok(())
    }

    pub fn get_scan_state(&self) -> Result<Option<ScanState>> {
        let result = self.conn.query_row(
            r#"
            SELECT last_scan_epoch, last_success_epoch, schema_version, error_count
            FROM scan_state WHERE id = 0
            "#,
            [],
            |row| {
                Ok(ScanState {
                    last_scan_epoch: row.get(0)?,
                    last_success_epoch: row.get(1)?,
                    schema_version: row.get(2)?,
                    error_count: row.get(3)?,
                })
            },
        );
        match result {
            Ok(state) => Ok(Some(state)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_scan_state(&self, state: &ScanState) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO scan_state
                (id, last_scan_epoch, last_success_epoch, schema_version, error_count)
            VALUES (0, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                state.last_scan_epoch,
                state.last_success_epoch,
                state.schema_version,
                state.error_count,
            ],
        )?;
        Ok(())
    }

    // ========================================================================
    // Browse queries
    // ========================================================================

    pub fn get_date_counts(&self, limit: usize) -> Result<Vec<DateCount>> {
        self.query_date_counts("", limit)
    }

    pub fn get_unknown_date_counts(&self, limit: usize) -> Result<Vec<DateCount>> {
        self.query_date_counts("WHERE has_location = 0", limit)
    }

    pub fn get_place_counts(&self, limit: usize) -> Result<Vec<PlaceCount>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.id, c.name_local, c.name_en, c.country_code, COUNT(m.uri) AS count
            FROM media_item m
            JOIN city c ON m.city_id = c.id
            GROUP BY c.id
            ORDER BY count DESC
            LIMIT ?
            "#,
        )?;
        let counts = stmt
            .query_map([limit as i64], |row| {
                Ok(PlaceCount {
                    city_id: row.get(0)?,
                    name_local: row.get(1)?,
                    name_en: row.get(2)?,
                    country_code: row.get(3)?,
                    count: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(counts)
    }

    pub fn count_location_unknown(&self) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM media_item WHERE has_location = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn get_media_by_city(&self, city_id: i64, limit: usize) -> Result<Vec<MediaItem>> {
        self.query_media(
            "WHERE city_id = ? ORDER BY date_taken_utc DESC LIMIT ?",
            rusqlite::params![city_id, limit as i64],
        )
    }

    pub fn get_media_by_date(&self, local_date: &str, limit: usize) -> Result<Vec<MediaItem>> {
        self.query_media(
            "WHERE local_date = ? ORDER BY date_taken_utc DESC LIMIT ?",
            rusqlite::params![local_date, limit as i64],
        )
    }

    pub fn get_unknown_media(&self, limit: usize) -> Result<Vec<MediaItem>> {
        self.query_media(
            "WHERE has_location = 0 ORDER BY date_taken_utc DESC LIMIT ?",
            rusqlite::params![limit as i64],
        )
    }

    pub fn get_unknown_media_by_date(&self, local_date: &str, limit: usize) -> Result<Vec<MediaItem>> {
        self.query_media(
            "WHERE has_location = 0 AND local_date = ? ORDER BY date_taken_utc DESC LIMIT ?",
            rusqlite::params![local_date, limit as i64],
        )
    }

    pub fn get_media_by_tag(&self, tag_id: i64, limit: usize) -> Result<Vec<MediaItem>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT m.uri, m.mime_type, m.is_video, m.date_taken_utc, m.tz_offset_min, m.local_date,
                   m.lat, m.lon, m.city_id, m.has_location, m.label_json, m.scan_version,
                   m.last_scanned_at
            FROM media_item m
            JOIN media_tag mt ON m.uri = mt.media_uri
            WHERE mt.tag_id = ?
            ORDER BY m.date_taken_utc DESC
            LIMIT ?
            "#,
        )?;
        let items = stmt
            .query_map(rusqlite::params![tag_id, limit as i64], media_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(items)
    }

    fn query_media(&self, clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<MediaItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {MEDIA_COLUMNS} FROM media_item {clause}"))?;
        let items = stmt
            .query_map(params, media_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(items)
    }

    fn query_date_counts(&self, filter: &str, limit: usize) -> Result<Vec<DateCount>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT local_date, COUNT(*) AS count
            FROM media_item {filter}
            GROUP BY local_date
            ORDER BY local_date DESC
            LIMIT ?
            "#
        ))?;
        let counts = stmt
            .query_map([limit as i64], |row| {
                Ok(DateCount {
                    local_date: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(counts)
    }
}
