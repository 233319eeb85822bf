//! Great-circle helpers on a spherical Earth.
//!
//! Coordinates are plain decimal degrees. Nothing here validates ranges:
//! latitudes beyond ±90 or longitudes beyond ±180 still produce a finite
//! number, which keeps the helpers usable on raw pointer-derived positions.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Planar interpolation of both coordinates, `t = 0` at `self`, `t = 1` at `other`.
    ///
    /// This is not a great-circle interpolation. At typical link lengths the
    /// difference is negligible; at continental scale the sampled points drift
    /// off the true geodesic.
    pub fn lerp(self, other: LatLng, t: f64) -> LatLng {
        LatLng {
            lat: self.lat + (other.lat - self.lat) * t,
            lng: self.lng + (other.lng - self.lng) * t,
        }
    }

    /// Coordinate pair in GeoJSON order (longitude first).
    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

/// Great-circle distance between two coordinates in meters (haversine).
///
/// # Formula
///
/// ```text
/// x = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)
/// d = R · 2 · atan2(√x, √(1 − x))
/// ```
pub fn distance(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let x = (d_lat / 2.0).sin().powi(2) + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push x a hair past 1.0 for near-antipodal points
    let x = x.clamp(0.0, 1.0);
    EARTH_RADIUS_M * 2.0 * x.sqrt().atan2((1.0 - x).sqrt())
}

/// Human-readable distance: kilometers with two decimals from 1 km up, whole meters below.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        for p in [LatLng::new(0.0, 0.0), LatLng::new(47.5, 19.04), LatLng::new(-33.9, 151.2), LatLng::new(89.9, -179.9)] {
            assert_eq!(distance(p, p), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (LatLng::new(0.0, 0.0), LatLng::new(0.0, 0.1)),
            (LatLng::new(20.59, 78.96), LatLng::new(28.61, 77.20)),
            (LatLng::new(-45.0, 170.0), LatLng::new(45.0, -170.0)),
        ];
        for (a, b) in pairs {
            assert!((distance(a, b) - distance(b, a)).abs() < 1e-6);
        }
    }

    #[test]
    fn one_tenth_degree_along_equator() {
        // 0.1° × π/180 × 6 371 000 m
        let d = distance(LatLng::new(0.0, 0.0), LatLng::new(0.0, 0.1));
        assert!((d - 11_119.49).abs() < 0.5, "got {}", d);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = distance(LatLng::new(10.0, 5.0), LatLng::new(11.0, 5.0));
        assert!((d - 111_194.9).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn out_of_range_inputs_still_yield_a_number() {
        let d = distance(LatLng::new(120.0, 400.0), LatLng::new(-95.0, -200.0));
        assert!(d.is_finite());
        assert!(d >= 0.0);
    }

    #[test]
    fn antipodal_points_are_half_the_circumference() {
        let d = distance(LatLng::new(0.0, 0.0), LatLng::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1e-3);
    }

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        let a = LatLng::new(10.0, 20.0);
        let b = LatLng::new(12.0, 16.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), LatLng::new(11.0, 18.0));
    }

    #[test]
    fn format_distance_switches_units_at_one_kilometer() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(532.4), "532 m");
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(1000.0), "1.00 km");
        assert_eq!(format_distance(11_119.49), "11.12 km");
    }
}
