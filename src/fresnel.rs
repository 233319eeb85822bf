//! First Fresnel-zone envelope along a radio link.
//!
//! Contains helpers for:
//! - Uniform sampling of the path between two endpoints
//! - Wavelength and first-zone radius calculations
//! - Building the "cigar" polygon that outlines the zone on a map
//!
//! Units:
//! - Frequency: GHz at the API boundary, Hz internally
//! - Distance and radius: meters
//! - Positions: decimal degrees
//!
//! The radius is the free-space clearance radius. Ground elevations travel
//! with every sample but are not subtracted from the radius, so the envelope is
//! not a terrain obstruction analysis.

use crate::geodesy::{self, LatLng};

/// Number of path segments; the path is sampled at `DEFAULT_RESOLUTION + 1` points.
pub const DEFAULT_RESOLUTION: usize = 40;

/// Propagation speed used for the wavelength, m/s.
pub const SPEED_OF_LIGHT: f64 = 3.0e8;

/// Approximate meters spanned by one degree of latitude.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Floor for the neighbour-to-neighbour tangent length, keeps the normal finite
/// on degenerate (zero-length) paths.
const MIN_TANGENT_LENGTH: f64 = 1e-9;

/// Where the elevations attached to a zone came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationSource {
    /// Values returned by the elevation service.
    Provider,
    /// The service failed or answered with the wrong number of values.
    ZeroFallback,
}

/// Ground heights along a sampled path, one per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationProfile {
    pub elevations: Vec<f64>,
    pub source: ElevationSource,
}

impl ElevationProfile {
    pub fn from_provider(elevations: Vec<f64>) -> Self {
        Self {
            elevations,
            source: ElevationSource::Provider,
        }
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            elevations: vec![0.0; len],
            source: ElevationSource::ZeroFallback,
        }
    }
}

/// One point of the zone: position on the path plus the computed radius.
#[derive(Debug, Clone, PartialEq)]
pub struct FresnelSample {
    /// Fraction along the path, 0 at endpoint A and 1 at endpoint B.
    pub fraction: f64,
    pub position: LatLng,
    /// Great-circle distance from endpoint A, meters.
    pub d1: f64,
    /// Great-circle distance to endpoint B, meters.
    pub d2: f64,
    /// Ground elevation at the sample, meters.
    pub elevation: f64,
    /// First Fresnel-zone radius, meters.
    pub radius: f64,
}

/// Computed zone for one link.
#[derive(Debug, Clone, PartialEq)]
pub struct FresnelZone {
    pub frequency_ghz: f64,
    pub samples: Vec<FresnelSample>,
    /// Left envelope from A to B followed by the right envelope from B back to A.
    pub polygon: Vec<LatLng>,
    pub elevation_source: ElevationSource,
}

impl FresnelZone {
    pub fn max_radius(&self) -> f64 {
        self.samples.iter().map(|s| s.radius).fold(0.0, f64::max)
    }

    /// Length of the link, meters.
    pub fn path_length(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => geodesy::distance(first.position, last.position),
            _ => 0.0,
        }
    }

    pub fn wavelength(&self) -> f64 {
        wavelength(self.frequency_ghz)
    }

    /// Lowest and highest ground elevation among the samples.
    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        let mut iter = self.samples.iter().map(|s| s.elevation);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), e| (lo.min(e), hi.max(e))))
    }
}

/// Sample the straight-line (planar) interpolation between `a` and `b`.
///
/// Returns `resolution + 1` points including both endpoints. A resolution of
/// zero is treated as one segment.
pub fn sample_path(a: LatLng, b: LatLng, resolution: usize) -> Vec<LatLng> {
    let segments = resolution.max(1);
    (0..=segments).map(|i| a.lerp(b, i as f64 / segments as f64)).collect()
}

/// Wavelength in meters: λ = c / f.
pub fn wavelength(frequency_ghz: f64) -> f64 {
    SPEED_OF_LIGHT / (frequency_ghz * 1e9)
}

/// First Fresnel-zone radius at a point `d1` meters from one end and `d2` from the other.
///
/// ```text
/// r = √(λ · d1 · d2 / (d1 + d2))
/// ```
///
/// Coincident endpoints (`d1 + d2 == 0`) give a radius of zero.
pub fn first_zone_radius(wavelength: f64, d1: f64, d2: f64) -> f64 {
    let total = d1 + d2;
    if total <= 0.0 {
        return 0.0;
    }
    (wavelength * d1 * d2 / total).sqrt()
}

/// Compute the zone envelope for the path `a → b`.
///
/// `path` are the sample positions (normally from [`sample_path`]) and
/// `profile` the matching elevations. A profile whose length does not match the
/// samples is replaced by zeros so the radius computation still completes.
pub fn compute_zone(a: LatLng, b: LatLng, frequency_ghz: f64, path: &[LatLng], profile: &ElevationProfile) -> FresnelZone {
    let zeros;
    let profile = if profile.elevations.len() == path.len() {
        profile
    } else {
        log::warn!(
            "Elevation profile has {} values for {} samples, using zero elevation",
            profile.elevations.len(),
            path.len()
        );
        zeros = ElevationProfile::zeros(path.len());
        &zeros
    };

    let lambda = wavelength(frequency_ghz);
    let last = path.len().saturating_sub(1).max(1);
    let samples: Vec<FresnelSample> = path
        .iter()
        .zip(&profile.elevations)
        .enumerate()
        .map(|(i, (&position, &elevation))| {
            let d1 = geodesy::distance(a, position);
            let d2 = geodesy::distance(position, b);
            FresnelSample {
                fraction: i as f64 / last as f64,
                position,
                d1,
                d2,
                elevation,
                radius: first_zone_radius(lambda, d1, d2),
            }
        })
        .collect();

    let polygon = envelope(&samples);
    FresnelZone {
        frequency_ghz,
        samples,
        polygon,
        elevation_source: profile.source,
    }
}

/// Offset every sample by its radius on both sides of the path and join the two
/// sides into one closed outline.
fn envelope(samples: &[FresnelSample]) -> Vec<LatLng> {
    let mut left = Vec::with_capacity(samples.len());
    let mut right = Vec::with_capacity(samples.len());

    for (i, sample) in samples.iter().enumerate() {
        let p = sample.position;
        let prev = if i == 0 { p } else { samples[i - 1].position };
        let next = samples.get(i + 1).map_or(p, |s| s.position);

        let dx = next.lng - prev.lng;
        let dy = next.lat - prev.lat;
        let len = {
            let l = (dx * dx + dy * dy).sqrt();
            if l > 0.0 { l } else { MIN_TANGENT_LENGTH }
        };
        let nx = -dy / len;
        let ny = dx / len;

        let r_lat = sample.radius / METERS_PER_DEGREE_LAT;
        let r_lng = sample.radius / (METERS_PER_DEGREE_LAT * p.lat.to_radians().cos());

        left.push(LatLng::new(p.lat + ny * r_lat, p.lng + nx * r_lng));
        right.push(LatLng::new(p.lat - ny * r_lat, p.lng - nx * r_lng));
    }

    right.reverse();
    left.extend(right);
    left
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_zone(a: LatLng, b: LatLng, frequency_ghz: f64) -> FresnelZone {
        let path = sample_path(a, b, DEFAULT_RESOLUTION);
        let profile = ElevationProfile::zeros(path.len());
        compute_zone(a, b, frequency_ghz, &path, &profile)
    }

    #[test]
    fn sample_path_includes_both_endpoints() {
        let a = LatLng::new(1.0, 2.0);
        let b = LatLng::new(3.0, 6.0);
        let path = sample_path(a, b, DEFAULT_RESOLUTION);
        assert_eq!(path.len(), 41);
        assert_eq!(path[0], a);
        assert_eq!(path[40], b);
        assert_eq!(path[20], LatLng::new(2.0, 4.0));
    }

    #[test]
    fn zero_resolution_still_samples_both_ends() {
        let path = sample_path(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0), 0);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn wavelength_at_five_gigahertz() {
        assert!((wavelength(5.0) - 0.06).abs() < 1e-12);
    }

    #[test]
    fn radius_is_zero_at_the_endpoints_and_peaks_mid_path() {
        let zone = level_zone(LatLng::new(0.0, 0.0), LatLng::new(0.0, 0.1), 5.0);
        let first = zone.samples.first().unwrap();
        let last = zone.samples.last().unwrap();
        let mid = &zone.samples[20];
        assert!(first.radius.abs() < 1e-9);
        assert!(last.radius.abs() < 1e-9);
        assert!(mid.radius > first.radius);
        assert!(mid.radius > last.radius);
        assert!((zone.max_radius() - mid.radius).abs() < 1e-9);
    }

    #[test]
    fn midpoint_radius_matches_the_closed_form() {
        // λ = 0.06 m over ~11.1 km: √(0.06 · 5560 · 5560 / 11120) ≈ 12.9 m
        let zone = level_zone(LatLng::new(0.0, 0.0), LatLng::new(0.0, 0.1), 5.0);
        let mid = &zone.samples[20];
        assert!((mid.fraction - 0.5).abs() < 1e-12);
        assert!((mid.radius - 12.9).abs() < 0.1, "got {}", mid.radius);
    }

    #[test]
    fn higher_frequency_narrows_the_zone() {
        let a = LatLng::new(47.0, 19.0);
        let b = LatLng::new(47.1, 19.2);
        let low = level_zone(a, b, 2.4);
        let high = level_zone(a, b, 5.8);
        assert!(high.max_radius() < low.max_radius());
    }

    #[test]
    fn polygon_is_left_side_then_reversed_right_side() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(0.0, 0.1);
        let zone = level_zone(a, b, 5.0);
        assert_eq!(zone.polygon.len(), 82);
        // Zero radius at the ends collapses both sides onto the endpoints
        assert!((zone.polygon[0].lat - a.lat).abs() < 1e-12 && (zone.polygon[0].lng - a.lng).abs() < 1e-12);
        assert!((zone.polygon[40].lng - b.lng).abs() < 1e-12);
        assert!((zone.polygon[41].lng - b.lng).abs() < 1e-12);
        assert!((zone.polygon[81].lng - a.lng).abs() < 1e-12);
        // Eastbound path: left side lies north, right side south, mirrored
        let left_mid = zone.polygon[20];
        let right_mid = zone.polygon[81 - 20];
        assert!(left_mid.lat > 0.0);
        assert!(right_mid.lat < 0.0);
        assert!((left_mid.lat + right_mid.lat).abs() < 1e-12);
        let expected = zone.samples[20].radius / METERS_PER_DEGREE_LAT;
        assert!((left_mid.lat - expected).abs() < 1e-12);
    }

    #[test]
    fn northbound_path_offsets_in_longitude() {
        let zone = level_zone(LatLng::new(45.0, 10.0), LatLng::new(45.1, 10.0), 5.0);
        let left_mid = zone.polygon[20];
        let sample = &zone.samples[20];
        // Tangent points north, so the left normal points west
        assert!(left_mid.lng < 10.0);
        let expected = sample.radius / (METERS_PER_DEGREE_LAT * sample.position.lat.to_radians().cos());
        assert!((10.0 - left_mid.lng - expected).abs() < 1e-12);
        assert!((left_mid.lat - sample.position.lat).abs() < 1e-12);
    }

    #[test]
    fn elevations_are_carried_but_do_not_change_the_radius() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(0.0, 0.1);
        let path = sample_path(a, b, DEFAULT_RESOLUTION);
        let hilly = ElevationProfile::from_provider((0..path.len()).map(|i| 100.0 + i as f64).collect());
        let flat = ElevationProfile::zeros(path.len());
        let with_terrain = compute_zone(a, b, 5.0, &path, &hilly);
        let without = compute_zone(a, b, 5.0, &path, &flat);
        assert_eq!(with_terrain.elevation_source, ElevationSource::Provider);
        assert_eq!(with_terrain.samples[3].elevation, 103.0);
        assert_eq!(with_terrain.polygon, without.polygon);
        assert_eq!(with_terrain.elevation_range(), Some((100.0, 140.0)));
    }

    #[test]
    fn mismatched_profile_falls_back_to_zero_elevation() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(0.0, 0.1);
        let path = sample_path(a, b, DEFAULT_RESOLUTION);
        let short = ElevationProfile::from_provider(vec![250.0; 7]);
        let zone = compute_zone(a, b, 5.0, &path, &short);
        assert_eq!(zone.samples.len(), path.len());
        assert_eq!(zone.elevation_source, ElevationSource::ZeroFallback);
        assert!(zone.samples.iter().all(|s| s.elevation == 0.0));
        assert!(zone.max_radius() > 12.0);
    }

    #[test]
    fn coincident_endpoints_produce_a_degenerate_but_finite_zone() {
        let p = LatLng::new(10.0, 10.0);
        let zone = level_zone(p, p, 5.0);
        assert!(zone.samples.iter().all(|s| s.radius == 0.0));
        assert!(zone.polygon.iter().all(|v| v.lat.is_finite() && v.lng.is_finite()));
        assert_eq!(zone.path_length(), 0.0);
    }

    #[test]
    fn path_length_matches_geodesic_distance() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(0.0, 0.1);
        let zone = level_zone(a, b, 5.0);
        assert!((zone.path_length() - geodesy::distance(a, b)).abs() < 1e-9);
    }
}
