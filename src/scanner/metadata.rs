//! Capture time and location from EXIF.
//!
//! EXIF stores a wall-clock time with the UTC offset in a separate tag. The
//! capture instant is that time read in its own offset, or in the local zone
//! when no offset tag exists. Files without usable EXIF fall back to their
//! modification time.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// What the scanner needs from a file's metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    pub capture_time: Option<DateTime<Utc>>,
    pub tz_offset_min: Option<i32>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
}

/// Resolved capture time for a media record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTime {
    pub utc: DateTime<Utc>,
    pub tz_offset_min: i32,
    /// `YYYY-MM-DD` in the capture offset
    pub local_date: String,
}

/// Read EXIF metadata. Missing or unreadable EXIF gives an empty result.
pub fn extract_metadata(path: &Path) -> MediaMetadata {
    let mut metadata = MediaMetadata::default();

    let Ok(file) = File::open(path) else {
        return metadata;
    };
    let mut bufreader = BufReader::new(file);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut bufreader) else {
        return metadata;
    };

    let offset = ascii_field(&exif, exif::Tag::OffsetTimeOriginal)
        .or_else(|| ascii_field(&exif, exif::Tag::OffsetTime));
    metadata.tz_offset_min = offset.as_deref().and_then(parse_offset_minutes);

    let taken = ascii_field(&exif, exif::Tag::DateTimeOriginal)
        .or_else(|| ascii_field(&exif, exif::Tag::DateTime));
    metadata.capture_time = taken
        .as_deref()
        .and_then(|value| parse_exif_datetime(value, metadata.tz_offset_min));

    if let Some((lat, lon)) = gps_coordinates(&exif) {
        metadata.gps_latitude = Some(lat);
        metadata.gps_longitude = Some(lon);
    }

    metadata
}

fn ascii_field(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match field.value {
        exif::Value::Ascii(ref values) => values
            .first()
            .map(|v| String::from_utf8_lossy(v).trim().to_string())
            .filter(|v| !v.is_empty()),
        _ => None,
    }
}

fn gps_coordinates(exif: &exif::Exif) -> Option<(f64, f64)> {
    let lat_field = exif.get_field(exif::Tag::GPSLatitude, exif::In::PRIMARY)?;
    let lat_ref = exif.get_field(exif::Tag::GPSLatitudeRef, exif::In::PRIMARY)?;
    let lon_field = exif.get_field(exif::Tag::GPSLongitude, exif::In::PRIMARY)?;
    let lon_ref = exif.get_field(exif::Tag::GPSLongitudeRef, exif::In::PRIMARY)?;

    let (exif::Value::Rational(lat_vals), exif::Value::Rational(lon_vals)) =
        (&lat_field.value, &lon_field.value)
    else {
        return None;
    };
    if lat_vals.len() < 3 || lon_vals.len() < 3 {
        return None;
    }

    let lat = dms_to_decimal(lat_vals[0].to_f64(), lat_vals[1].to_f64(), lat_vals[2].to_f64());
    let lon = dms_to_decimal(lon_vals[0].to_f64(), lon_vals[1].to_f64(), lon_vals[2].to_f64());

    let lat = if lat_ref.display_value().to_string().contains('S') { -lat } else { lat };
    let lon = if lon_ref.display_value().to_string().contains('W') { -lon } else { lon };

    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}

fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// Parse an EXIF offset such as `+09:00` or `-03:30` into minutes east of UTC.
pub fn parse_offset_minutes(value: &str) -> Option<i32> {
    let value = value.trim();
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    Some(sign * (hours * 60 + minutes))
}

/// Interpret an EXIF `YYYY:MM:DD HH:MM:SS` value in the given offset, or in
/// the local zone when there is none.
pub fn parse_exif_datetime(value: &str, offset_min: Option<i32>) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), EXIF_DATETIME_FORMAT).ok()?;
    match offset_min {
        Some(minutes) => {
            let offset = FixedOffset::east_opt(minutes * 60)?;
            offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        }
        None => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

/// Settle the capture instant and its offset.
///
/// EXIF values win; otherwise `fallback` (the file mtime) is used and the
/// offset is the local zone's offset at that instant.
pub fn resolve_capture_time(metadata: &MediaMetadata, fallback: DateTime<Utc>) -> CaptureTime {
    let utc = metadata.capture_time.unwrap_or(fallback);
    let tz_offset_min = metadata
        .tz_offset_min
        .unwrap_or_else(|| local_offset_minutes(utc));
    CaptureTime {
        utc,
        tz_offset_min,
        local_date: local_date(utc, tz_offset_min),
    }
}

fn local_offset_minutes(instant: DateTime<Utc>) -> i32 {
    Local
        .offset_from_utc_datetime(&instant.naive_utc())
        .fix()
        .local_minus_utc()
        / 60
}

/// Calendar date of `instant` as seen at `offset_min` minutes east of UTC.
pub fn local_date(instant: DateTime<Utc>, offset_min: i32) -> String {
    match FixedOffset::east_opt(offset_min * 60) {
        Some(offset) => instant.with_timezone(&offset).date_naive().to_string(),
        None => instant.date_naive().to_string(),
    }
}

/// File modification time, used when EXIF has no capture time.
pub fn file_modified(path: &Path) -> Result<DateTime<Utc>> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::tempdir;

    #[test]
    fn test_parse_offset_minutes() {
        assert_eq!(parse_offset_minutes("+09:00"), Some(540));
        assert_eq!(parse_offset_minutes("-03:30"), Some(-210));
        assert_eq!(parse_offset_minutes(" +00:00 "), Some(0));
        assert_eq!(parse_offset_minutes("09:00"), None);
        assert_eq!(parse_offset_minutes("+9:00"), None);
        assert_eq!(parse_offset_minutes(""), None);
    }

    #[test]
    fn test_exif_datetime_in_offset() {
        let instant = parse_exif_datetime("2024:03:01 08:30:00", Some(540)).unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-02-29T23:30:00+00:00");

        assert!(parse_exif_datetime("2024-03-01 08:30:00", Some(0)).is_none());
        assert!(parse_exif_datetime("0000:00:00 00:00:00", Some(0)).is_none());
    }

    #[test]
    fn test_local_date_uses_capture_offset() {
        let instant = parse_exif_datetime("2024:03:01 08:30:00", Some(540)).unwrap();
        assert_eq!(local_date(instant, 540), "2024-03-01");
        assert_eq!(local_date(instant, 0), "2024-02-29");
    }

    #[test]
    fn test_resolve_prefers_exif() {
        let fallback = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let metadata = MediaMetadata {
            capture_time: parse_exif_datetime("2024:03:01 08:30:00", Some(-300)),
            tz_offset_min: Some(-300),
            ..Default::default()
        };
        let resolved = resolve_capture_time(&metadata, fallback);
        assert_eq!(resolved.tz_offset_min, -300);
        assert_eq!(resolved.local_date, "2024-03-01");
        assert_eq!(resolved.utc.to_rfc3339(), "2024-03-01T13:30:00+00:00");

        let resolved = resolve_capture_time(&MediaMetadata::default(), fallback);
        assert_eq!(resolved.utc, fallback);
    }

    #[test]
    fn test_file_without_exif() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.png");
        RgbImage::new(4, 4).save(&path).unwrap();

        assert_eq!(extract_metadata(&path), MediaMetadata::default());
        assert_eq!(extract_metadata(&dir.path().join("missing.jpg")), MediaMetadata::default());
        assert!(file_modified(&path).is_ok());
    }
}
