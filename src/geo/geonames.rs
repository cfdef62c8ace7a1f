//! Convert a GeoNames `citiesNNNN.txt` dump into the gazetteer seed format.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

const NAME_IDX: usize = 1;
const LAT_IDX: usize = 4;
const LON_IDX: usize = 5;
const COUNTRY_IDX: usize = 8;

pub const SEED_HEADER: [&str; 5] = ["name_en", "name_local", "country_code", "lat", "lon"];

/// Write a seed CSV from a tab-separated GeoNames dump. Returns the row count.
pub fn import_geonames(input: &Path, output: &Path) -> Result<usize> {
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    writer.write_record(SEED_HEADER)?;

    let mut written = 0;
    for bytes in reader.split(b'\n') {
        let line = decode_line(&bytes?);
        if let Some(row) = parse_geonames_line(&line) {
            writer.write_record(row)?;
            written += 1;
        }
    }
    writer.flush()?;

    info!(rows = written, output = ?output, "GeoNames import finished");
    Ok(written)
}

/// Undecodable bytes are dropped rather than failing the import.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(line) => line.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).replace(char::REPLACEMENT_CHARACTER, ""),
    }
}

/// Seed row for one GeoNames line; the GeoNames ASCII name doubles as the local name.
fn parse_geonames_line(line: &str) -> Option<[&str; 5]> {
    if line.trim().is_empty() {
        return None;
    }
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() <= COUNTRY_IDX {
        return None;
    }

    let name = parts[NAME_IDX].trim();
    let lat = parts[LAT_IDX].trim();
    let lon = parts[LON_IDX].trim();
    let country = parts[COUNTRY_IDX].trim();
    if name.is_empty() || lat.is_empty() || lon.is_empty() || country.is_empty() {
        return None;
    }

    Some([name, name, country, lat, lon])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;
    use crate::db::CityStore;
    use crate::geo::{CitySeeder, SeedSource};
    use tempfile::tempdir;

    const DUMP: &str = "1835848\tSeoul\tSeoul\tSeul\t37.566\t126.9784\tP\tPPLC\tKR\t\t11\n\
                        1838524\tBusan\tBusan\t\t35.10168\t129.03004\tP\tPPLA\tKR\n\
                        \n\
                        999\tBroken\tBroken\t\t\t129.0\tP\tPPL\tKR\n\
                        1000\tTooShort\t1.0\n";

    #[test]
    fn test_parse_line() {
        let line = DUMP.lines().next().unwrap();
        assert_eq!(
            parse_geonames_line(line),
            Some(["Seoul", "Seoul", "KR", "37.566", "126.9784"])
        );
        assert_eq!(parse_geonames_line("1000\tTooShort\t1.0"), None);
    }

    #[test]
    fn test_invalid_utf8_does_not_abort_import() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("cities15000.txt");
        let output = dir.path().join("cities_seed.csv");

        let mut dump = b"1835848\tSeoul\tSeoul\t\t37.566\t126.9784\tP\tPPLC\tKR\r\n".to_vec();
        dump.extend_from_slice(b"2988507\tPar\xffis\tParis\t\t48.85341\t2.3488\tP\tPPLC\tFR\n");
        dump.extend_from_slice(b"1838524\tBusan\tBusan\t\t35.10168\t129.03004\tP\tPPLA\tKR\n");
        std::fs::write(&input, dump).unwrap();

        assert_eq!(import_geonames(&input, &output).unwrap(), 3);

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains("Paris,Paris,FR,48.85341,2.3488"));
        assert!(written.contains("Seoul,Seoul,KR,37.566,126.9784"));
    }

    #[test]
    fn test_import_feeds_seeder() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("cities15000.txt");
        let output = dir.path().join("out/cities_seed.csv");
        std::fs::write(&input, DUMP).unwrap();

        assert_eq!(import_geonames(&input, &output).unwrap(), 2);

        let db = test_db();
        let count = CitySeeder::new(&db, SeedSource::File(output)).seed_if_needed().unwrap();
        assert_eq!(count, 2);
        assert_eq!(db.count_cities().unwrap(), 2);
    }
}
