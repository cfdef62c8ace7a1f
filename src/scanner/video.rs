//! Creation time and location from video containers (MP4, MOV, 3GP).
//!
//! Containers record creation time in UTC and the location as an ISO 6709
//! string such as `+37.5665+126.9780+012.000/`.

use anyhow::Result;
use chrono::Utc;
use nom_exif::{EntryValue, MediaParser, MediaSource, TrackInfo, TrackInfoTag};
use std::path::Path;
use tracing::debug;

use super::metadata::MediaMetadata;

/// Read container metadata. Unparsable or track-less files give an empty result.
pub fn extract_video_metadata(path: &Path) -> MediaMetadata {
    match read_track_info(path) {
        Ok(Some(info)) => from_track_info(&info),
        Ok(None) => MediaMetadata::default(),
        Err(e) => {
            debug!(path = ?path, error = %e, "No readable video metadata");
            MediaMetadata::default()
        }
    }
}

fn read_track_info(path: &Path) -> Result<Option<TrackInfo>> {
    let source = MediaSource::file_path(path)?;
    if !source.has_track() {
        return Ok(None);
    }
    let mut parser = MediaParser::new();
    let info: TrackInfo = parser.parse(source)?;
    Ok(Some(info))
}

fn from_track_info(info: &TrackInfo) -> MediaMetadata {
    // Unset creation times come back as the 1904 container epoch
    let capture_time = match info.get(TrackInfoTag::CreateDate) {
        Some(EntryValue::Time(time)) => Some(time.with_timezone(&Utc)).filter(|t| t.timestamp() > 0),
        _ => None,
    };

    let location = match info.get(TrackInfoTag::GpsIso6709) {
        Some(EntryValue::Text(text)) => parse_iso6709(text),
        _ => None,
    };

    MediaMetadata {
        capture_time,
        tz_offset_min: capture_time.map(|_| 0),
        gps_latitude: location.map(|(lat, _)| lat),
        gps_longitude: location.map(|(_, lon)| lon),
    }
}

/// Latitude and longitude from an ISO 6709 point; a trailing altitude is ignored.
pub fn parse_iso6709(value: &str) -> Option<(f64, f64)> {
    let value = value.trim().trim_end_matches('/');
    if !value.starts_with(['+', '-']) {
        return None;
    }

    let mut parts = Vec::with_capacity(3);
    let mut start = 0;
    for (idx, c) in value.char_indices().skip(1) {
        if c == '+' || c == '-' {
            parts.push(&value[start..idx]);
            start = idx;
        }
    }
    parts.push(&value[start..]);

    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let lat = parts[0].parse::<f64>().ok()?;
    let lon = parts[1].parse::<f64>().ok()?;
    Some((lat, lon))
}
