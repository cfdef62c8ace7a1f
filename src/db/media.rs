//! Types for indexed media and scan bookkeeping.

/// An indexed photo or video
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub uri: String,
    pub mime_type: Option<String>,
    pub is_video: bool,
    pub date_taken_utc: i64,
    pub tz_offset_min: i32,
    pub local_date: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub city_id: Option<i64>,
    pub has_location: bool,
    pub label_json: Option<String>,
    pub scan_version: i32,
    pub last_scanned_at: i64,
}

/// Scan bookkeeping, one row per library
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanState {
    pub last_scan_epoch: i64,
    pub last_success_epoch: i64,
    pub schema_version: i64,
    pub error_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateCount {
    pub local_date: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCount {
    pub city_id: i64,
    pub name_local: String,
    pub name_en: String,
    pub country_code: String,
    pub count: i64,
}
