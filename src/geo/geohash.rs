//! Geohash encoding.
//!
//! A geohash interleaves longitude and latitude bisection bits (longitude
//! first) and packs every five bits into one base-32 character. Points that
//! share an N-character prefix lie in the same grid cell at that precision.

/// Base-32 alphabet used by geohash (no `a`, `i`, `l`, `o`).
pub const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Precision used for the gazetteer index and for reverse geocoding.
pub const DEFAULT_PRECISION: usize = 6;

/// Encode a coordinate as a geohash of `precision` characters.
///
/// Callers must pass a latitude in [-90, 90] and a longitude in [-180, 180].
pub fn encode(lat: f64, lon: f64, precision: usize) -> String {
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lon_range = (-180.0_f64, 180.0_f64);
    let mut even = true;
    let mut bit = 0;
    let mut ch = 0usize;
    let mut hash = String::with_capacity(precision);

    while hash.len() < precision {
        let (value, range) = if even {
            (lon, &mut lon_range)
        } else {
            (lat, &mut lat_range)
        };
        let mid = (range.0 + range.1) / 2.0;
        if value >= mid {
            ch |= 1 << (4 - bit);
            range.0 = mid;
        } else {
            range.1 = mid;
        }

        even = !even;
        if bit < 4 {
            bit += 1;
        } else {
            hash.push(BASE32[ch] as char);
            bit = 0;
            ch = 0;
        }
    }

    hash
}

/// Prefixes searched by the reverse geocoder, narrowest first.
///
/// Returns the hash itself followed by the hash with up to `steps` trailing
/// characters removed, one at a time. Empty prefixes are dropped.
pub fn widening_prefixes(hash: &str, steps: usize) -> Vec<&str> {
    (0..=steps)
        .filter_map(|drop| hash.len().checked_sub(drop))
        .filter(|&len| len > 0)
        .map(|len| &hash[..len])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vectors() {
        assert_eq!(encode(57.64911, 10.40744, 6), "u4pruy");
        assert_eq!(encode(57.64911, 10.40744, 11), "u4pruydqqvj");
        assert_eq!(encode(42.605, -5.603, 5), "ezs42");
        assert_eq!(encode(0.0, 0.0, 6), "s00000");
    }

    #[test]
    fn test_length_and_alphabet() {
        let points = [
            (-90.0, -180.0),
            (90.0, 180.0),
            (37.5665, 126.978),
            (-33.8688, 151.2093),
            (51.5074, -0.1278),
        ];
        for (lat, lon) in points {
            for precision in 1..=12 {
                let hash = encode(lat, lon, precision);
                assert_eq!(hash.len(), precision);
                assert!(hash.bytes().all(|b| BASE32.contains(&b)), "{hash}");
            }
        }
    }

    #[test]
    fn test_prefix_stability() {
        let points = [(37.5665, 126.978), (-22.9068, -43.1729), (64.1466, -21.9426)];
        for (lat, lon) in points {
            let full = encode(lat, lon, 6);
            for precision in 1..6 {
                assert_eq!(&full[..precision], encode(lat, lon, precision));
            }
        }
    }

    #[test]
    fn test_nearby_points_share_prefix() {
        let a = encode(48.8566, 2.3522, 6);
        let b = encode(48.8570, 2.3530, 6);
        assert_eq!(&a[..5], &b[..5]);
    }

    #[test]
    fn test_widening_prefixes() {
        assert_eq!(widening_prefixes("u4pruy", 2), vec!["u4pruy", "u4pru", "u4pr"]);
        assert_eq!(widening_prefixes("u4", 2), vec!["u4", "u"]);
        assert!(widening_prefixes("", 2).is_empty());
    }
}
