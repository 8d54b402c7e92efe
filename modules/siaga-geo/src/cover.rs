//! Geohash range cover for a radius around a center point.
//!
//! A geohash cell at a given bit depth is an axis-aligned lat/lng rectangle.
//! To answer "everything within R meters of C" with a store that only does
//! lexicographic range scans, we pick the coarsest bit depth whose cell still
//! fully contains an R-meter span at the query box's worst-case latitude,
//! encode nine probe points of the bounding box at that depth, and emit one
//! `[start, end]` string range per distinct cell. The union of those ranges is
//! an over-approximation of the disk: it may admit points outside the radius
//! (the caller re-filters by true distance) but never misses a point inside it.

use geohash::Coord;
use siaga_common::{GeoPoint, SiagaError};

const BITS_PER_CHAR: u32 = 5;
const MAX_BITS_PRECISION: u32 = 22 * BITS_PER_CHAR;
const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

const EARTH_MERIDIONAL_CIRCUMFERENCE_M: f64 = 40_007_860.0;
const EARTH_EQ_RADIUS_M: f64 = 6_378_137.0;
const METERS_PER_DEGREE_LATITUDE: f64 = 110_574.0;
/// First eccentricity squared of the WGS84 ellipsoid.
const E2: f64 = 0.006_694_478_197_99;
const EPSILON: f64 = 1e-12;

/// One inclusive lexicographic key range over the geohash field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeohashRange {
    pub start: String,
    pub end: String,
}

impl GeohashRange {
    /// Whether a full-precision geohash falls inside this range.
    pub fn contains(&self, hash: &str) -> bool {
        self.start.as_str() <= hash && hash <= self.end.as_str()
    }
}

/// Encode a point into its geohash cell at the given character precision.
pub fn encode_cell(point: GeoPoint, precision: usize) -> Result<String, SiagaError> {
    geohash::encode(
        Coord {
            x: point.lng,
            y: point.lat,
        },
        precision,
    )
    .map_err(|e| SiagaError::InvalidInput(format!("geohash encode failed: {e}")))
}

/// Compute the range cover for the disk of `radius_m` meters around `center`.
///
/// Returns between one and nine deduplicated ranges; every point within the
/// radius hashes into one of them.
pub fn query_bounds(center: GeoPoint, radius_m: f64) -> Result<Vec<GeohashRange>, SiagaError> {
    center.validate()?;
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(SiagaError::InvalidInput(format!(
            "radius must be a positive number of meters, got {radius_m}"
        )));
    }

    let query_bits = bounding_box_bits(center, radius_m).max(1);
    let precision = query_bits.div_ceil(BITS_PER_CHAR) as usize;

    let mut ranges: Vec<GeohashRange> = Vec::new();
    for point in bounding_box_points(center, radius_m) {
        let hash = encode_cell(point, precision)?;
        let range = cell_range(&hash, query_bits);
        if !ranges.contains(&range) {
            ranges.push(range);
        }
    }
    Ok(ranges)
}

/// Degrees of longitude spanned by `distance_m` meters at a given latitude,
/// on the WGS84 ellipsoid. Saturates at 360 near the poles.
fn meters_to_longitude_degrees(distance_m: f64, latitude: f64) -> f64 {
    let radians = latitude.to_radians();
    let num = radians.cos() * EARTH_EQ_RADIUS_M * std::f64::consts::PI / 180.0;
    let denom = 1.0 / (1.0 - E2 * radians.sin() * radians.sin()).sqrt();
    let delta_deg = num * denom;

    if delta_deg < EPSILON {
        if distance_m > 0.0 {
            360.0
        } else {
            0.0
        }
    } else {
        (distance_m / delta_deg).min(360.0)
    }
}

/// Latitude bits needed so one cell spans at least `resolution_m` meters.
fn latitude_bits_for_resolution(resolution_m: f64) -> f64 {
    (EARTH_MERIDIONAL_CIRCUMFERENCE_M / 2.0 / resolution_m)
        .log2()
        .min(MAX_BITS_PRECISION as f64)
}

/// Longitude bits needed so one cell spans at least `resolution_m` meters at
/// the given latitude.
fn longitude_bits_for_resolution(resolution_m: f64, latitude: f64) -> f64 {
    let degs = meters_to_longitude_degrees(resolution_m, latitude);
    if degs.abs() > 1e-6 {
        (360.0 / degs).log2().max(1.0)
    } else {
        1.0
    }
}

/// The coarsest geohash bit depth whose cell fully contains `radius_m` at the
/// bounding box's worst-case latitudes.
fn bounding_box_bits(center: GeoPoint, radius_m: f64) -> u32 {
    let lat_delta = radius_m / METERS_PER_DEGREE_LATITUDE;
    let lat_north = (center.lat + lat_delta).min(90.0);
    let lat_south = (center.lat - lat_delta).max(-90.0);

    let bits_lat = latitude_bits_for_resolution(radius_m).floor() * 2.0;
    let bits_lng_north = longitude_bits_for_resolution(radius_m, lat_north).floor() * 2.0 - 1.0;
    let bits_lng_south = longitude_bits_for_resolution(radius_m, lat_south).floor() * 2.0 - 1.0;

    bits_lat
        .min(bits_lng_north)
        .min(bits_lng_south)
        .min(MAX_BITS_PRECISION as f64)
        .max(0.0) as u32
}

/// Nine probe points: the center plus the edge midpoints and corners of the
/// bounding box. Encoding all nine catches every cell the box can touch at
/// the chosen depth.
fn bounding_box_points(center: GeoPoint, radius_m: f64) -> [GeoPoint; 9] {
    let lat_degrees = radius_m / METERS_PER_DEGREE_LATITUDE;
    let lat_north = (center.lat + lat_degrees).min(90.0);
    let lat_south = (center.lat - lat_degrees).max(-90.0);

    let lng_degs_north = meters_to_longitude_degrees(radius_m, lat_north);
    let lng_degs_south = meters_to_longitude_degrees(radius_m, lat_south);
    let lng_degs = lng_degs_north.max(lng_degs_south);

    let west = wrap_longitude(center.lng - lng_degs);
    let east = wrap_longitude(center.lng + lng_degs);

    [
        center,
        GeoPoint::new(center.lat, west),
        GeoPoint::new(center.lat, east),
        GeoPoint::new(lat_north, center.lng),
        GeoPoint::new(lat_north, west),
        GeoPoint::new(lat_north, east),
        GeoPoint::new(lat_south, center.lng),
        GeoPoint::new(lat_south, west),
        GeoPoint::new(lat_south, east),
    ]
}

fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        return longitude;
    }
    let adjusted = longitude + 180.0;
    if adjusted > 0.0 {
        (adjusted % 360.0) - 180.0
    } else {
        180.0 - (-adjusted % 360.0)
    }
}

/// Turn a probe cell into its inclusive key range at `bits` depth.
///
/// `~` sorts after every base32 geohash character, so `[prefix, prefix~]`
/// covers all full-precision hashes under `prefix`.
fn cell_range(hash: &str, bits: u32) -> GeohashRange {
    let precision = bits.div_ceil(BITS_PER_CHAR) as usize;
    if hash.len() < precision {
        return GeohashRange {
            start: hash.to_string(),
            end: format!("{hash}~"),
        };
    }

    let hash = &hash[..precision];
    let base = &hash[..hash.len() - 1];
    let last_char = hash.as_bytes()[hash.len() - 1];
    let last_value = BASE32
        .iter()
        .position(|&c| c == last_char)
        .expect("geohash output stays within the base32 alphabet") as u32;

    // The final character may carry fewer than five significant bits; mask
    // the tail off so the range spans the whole partial cell.
    let significant_bits = bits - (base.len() as u32) * BITS_PER_CHAR;
    let unused_bits = BITS_PER_CHAR - significant_bits;
    let start_value = (last_value >> unused_bits) << unused_bits;
    let end_value = start_value + (1 << unused_bits);

    if end_value > 31 {
        GeohashRange {
            start: format!("{base}{}", BASE32[start_value as usize] as char),
            end: format!("{base}~"),
        }
    } else {
        GeohashRange {
            start: format!("{base}{}", BASE32[start_value as usize] as char),
            end: format!("{base}{}", BASE32[end_value as usize] as char),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siaga_common::GEOHASH_PRECISION;

    #[test]
    fn cover_is_small_and_nonempty() {
        for radius_km in [1.0, 5.0, 10.0, 25.0, 50.0] {
            let bounds = query_bounds(GeoPoint::new(-6.2, 106.8166), radius_km * 1000.0).unwrap();
            assert!(!bounds.is_empty());
            assert!(
                bounds.len() <= 9,
                "cover for {radius_km}km has {} ranges",
                bounds.len()
            );
        }
    }

    #[test]
    fn cover_contains_center_hash() {
        let center = GeoPoint::new(-6.2, 106.8166);
        let bounds = query_bounds(center, 5_000.0).unwrap();
        let hash = encode_cell(center, GEOHASH_PRECISION).unwrap();
        assert!(
            bounds.iter().any(|b| b.contains(&hash)),
            "center hash {hash} not covered by {bounds:?}"
        );
    }

    #[test]
    fn ranges_are_ordered() {
        let bounds = query_bounds(GeoPoint::new(0.0, 0.0), 2_000.0).unwrap();
        for b in &bounds {
            assert!(b.start < b.end, "range {b:?} is not ascending");
        }
    }

    #[test]
    fn rejects_bad_radius() {
        assert!(query_bounds(GeoPoint::new(0.0, 0.0), 0.0).is_err());
        assert!(query_bounds(GeoPoint::new(0.0, 0.0), -5.0).is_err());
        assert!(query_bounds(GeoPoint::new(0.0, 0.0), f64::NAN).is_err());
    }

    #[test]
    fn rejects_bad_center() {
        assert!(query_bounds(GeoPoint::new(91.0, 0.0), 1_000.0).is_err());
    }

    #[test]
    fn longitude_wrapping() {
        assert_eq!(wrap_longitude(10.0), 10.0);
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
    }

    #[test]
    fn range_end_sorts_after_member_hashes() {
        // A hash one cell below the range end must sort inside the range even
        // at full precision.
        let r = cell_range("wx4g", 20);
        assert!(r.contains("wx4g000000"));
        assert!(r.contains("wx4gzzzzzz"));
        assert!(!r.contains("wx4fzzzzzz"));
    }
}
