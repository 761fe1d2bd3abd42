//! Spherical-earth math in aviation units (nautical miles, feet, knots).

use crate::models::Position;

/// Mean earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Nautical miles per degree of latitude on the reference sphere.
pub const NM_PER_DEG_LAT: f64 = EARTH_RADIUS_NM * std::f64::consts::PI / 180.0;

/// Knots to nautical miles per second.
pub const KT_TO_NM_PER_S: f64 = 1.0 / 3600.0;

/// Feet per minute to feet per second.
pub const FPM_TO_FT_PER_S: f64 = 1.0 / 60.0;

/// Great-circle distance between two points in nautical miles (Haversine).
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Horizontal great-circle distance between two positions in nautical miles.
pub fn horizontal_distance_nm(a: &Position, b: &Position) -> f64 {
    haversine_nm(a.lat, a.lon, b.lat, b.lon)
}

/// Longitude difference `lon1 - lon2` wrapped into [-180, 180].
///
/// Exactly antisymmetric in its arguments for |Δ| ≤ 180.
pub fn wrap_lon_delta(lon1: f64, lon2: f64) -> f64 {
    let delta = lon1 - lon2;
    if delta > 180.0 {
        delta - 360.0
    } else if delta < -180.0 {
        delta + 360.0
    } else {
        delta
    }
}

/// Offset of point 1 relative to point 2 in a local equirectangular frame.
///
/// Returns `(east_nm, north_nm)`, scaled with the cosine of `ref_lat_deg`.
/// Valid at the scale of tens of nautical miles.
pub fn local_offset_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64, ref_lat_deg: f64) -> (f64, f64) {
    let east = wrap_lon_delta(lon1, lon2) * NM_PER_DEG_LAT * ref_lat_deg.to_radians().cos();
    let north = (lat1 - lat2) * NM_PER_DEG_LAT;
    (east, north)
}

/// Normalize a heading into [0, 360).
pub fn normalize_heading(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed angle difference `to - from` in degrees, wrapped into (-180, 180].
pub fn heading_difference(from_deg: f64, to_deg: f64) -> f64 {
    let diff = (to_deg - from_deg).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Initial bearing from point 1 to point 2 in radians (0 = north, π/2 = east).
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Offset a position by distance and bearing along a great circle.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_nm` - Distance in nautical miles (negative moves backwards)
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_nm: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_nm.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_nm / EARTH_RADIUS_NM;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Great-circle midpoint of two positions, with the mean altitude.
pub fn midpoint(a: &Position, b: &Position) -> Position {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let lambda1 = a.lon.to_radians();
    let delta_lambda = (b.lon - a.lon).to_radians();

    let bx = phi2.cos() * delta_lambda.cos();
    let by = phi2.cos() * delta_lambda.sin();
    let lat = (phi1.sin() + phi2.sin()).atan2(((phi1.cos() + bx).powi(2) + by * by).sqrt());
    let lon = lambda1 + by.atan2(phi1.cos() + bx);
    let lon = (lon + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI)
        - std::f64::consts::PI;

    Position {
        lat: lat.to_degrees(),
        lon: lon.to_degrees(),
        altitude_ft: (a.altitude_ft + b.altitude_ft) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_one_degree_latitude() {
        let dist = haversine_nm(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 60.04).abs() < 0.01, "got {dist}");
    }

    #[test]
    fn haversine_same_point() {
        assert!(haversine_nm(40.7128, -74.0060, 40.7128, -74.0060) < 1e-9);
    }

    #[test]
    fn local_offset_is_latitude_corrected() {
        let (east_eq, _) = local_offset_nm(0.0, 1.0, 0.0, 0.0, 0.0);
        let (east_60, _) = local_offset_nm(60.0, 1.0, 60.0, 0.0, 60.0);
        assert!((east_60 - east_eq / 2.0).abs() < 1e-6);
    }

    #[test]
    fn wrap_lon_delta_crosses_antimeridian() {
        assert!((wrap_lon_delta(179.5, -179.5) + 1.0).abs() < 1e-9);
        assert!((wrap_lon_delta(-179.5, 179.5) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn offset_then_distance_matches() {
        let (lat, lon) = offset_by_bearing(45.0, 7.0, 12.0, 1.0);
        let dist = haversine_nm(45.0, 7.0, lat, lon);
        assert!((dist - 12.0).abs() < 1e-6);
    }

    #[test]
    fn heading_helpers_wrap() {
        assert_eq!(normalize_heading(-15.0), 345.0);
        assert_eq!(normalize_heading(375.0), 15.0);
        assert_eq!(heading_difference(350.0, 10.0), 20.0);
        assert_eq!(heading_difference(10.0, 350.0), -20.0);
    }

    #[test]
    fn midpoint_on_equator() {
        let a = Position { lat: 0.0, lon: 0.0, altitude_ft: 1000.0 };
        let b = Position { lat: 0.0, lon: 1.0, altitude_ft: 3000.0 };
        let mid = midpoint(&a, &b);
        assert!(mid.lat.abs() < 1e-9);
        assert!((mid.lon - 0.5).abs() < 1e-9);
        assert_eq!(mid.altitude_ft, 2000.0);
    }
}
