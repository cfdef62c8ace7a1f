/// Version stamped into `scan_state.schema_version`.
pub const SCHEMA_VERSION: i64 = 1;

pub const SCHEMA: &str = r#"
-- Media items discovered by the scanner
CREATE TABLE IF NOT EXISTS media_item (
    uri TEXT PRIMARY KEY,
    mime_type TEXT,
    is_video INTEGER NOT NULL DEFAULT 0,
    date_taken_utc INTEGER NOT NULL,   -- epoch milliseconds
    tz_offset_min INTEGER NOT NULL,
    local_date TEXT NOT NULL,          -- YYYY-MM-DD in the capture offset
    lat REAL,
    lon REAL,
    city_id INTEGER,
    has_location INTEGER NOT NULL DEFAULT 0,
    label_json TEXT,                   -- label summary, NULL until classified
    scan_version INTEGER NOT NULL DEFAULT 1,
    last_scanned_at INTEGER NOT NULL,
    FOREIGN KEY (city_id) REFERENCES city(id)
);

CREATE INDEX IF NOT EXISTS idx_media_item_local_date ON media_item(local_date);
CREATE INDEX IF NOT EXISTS idx_media_item_city ON media_item(city_id);
CREATE INDEX IF NOT EXISTS idx_media_item_has_location ON media_item(has_location);

-- Offline gazetteer, seeded once
CREATE TABLE IF NOT EXISTS city (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name_local TEXT NOT NULL,
    name_en TEXT NOT NULL,
    country_code TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    geohash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_city_geohash ON city(geohash);
CREATE INDEX IF NOT EXISTS idx_city_country ON city(country_code);

-- Semantic tags, unique by natural key
CREATE TABLE IF NOT EXISTS tag (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,                -- 'event' or 'people'
    name TEXT NOT NULL,
    confidence REAL NOT NULL,
    source TEXT NOT NULL,              -- 'manual' or 'model'
    UNIQUE (type, name)
);

-- Media to tag links
CREATE TABLE IF NOT EXISTS media_tag (
    media_uri TEXT NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (media_uri, tag_id),
    FOREIGN KEY (tag_id) REFERENCES tag(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_media_tag_tag ON media_tag(tag_id);

-- Single-row scan bookkeeping
CREATE TABLE IF NOT EXISTS scan_state (
    id INTEGER PRIMARY KEY CHECK (id = 0),
    last_scan_epoch INTEGER NOT NULL,
    last_success_epoch INTEGER NOT NULL,
    schema_version INTEGER NOT NULL,
    error_count INTEGER NOT NULL DEFAULT 0
);
"#;
