//! Geofence resolution against the set of authorized sites.
//!
//! A punch is only valid inside the circular allowed-radius zone around an
//! active site. Resolution always picks the nearest site so rejections can
//! tell the employee where the closest valid location is and how far away.

use serde::{Deserialize, Serialize};

/// Earth radius in meters used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Read-only view of an active site, as consumed by geofence resolution.
///
/// Site identity is opaque here; the caller maps it back to its own ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoSite {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Allowed punch radius around the site center. Always positive.
    pub radius_meters: f64,
}

/// Outcome of resolving a coordinate against the active sites.
///
/// `NoSites` is a hard rejection for the caller, never "resolved at
/// unlimited radius".
#[derive(Debug, Clone, PartialEq)]
pub enum GeoResolution<'a> {
    /// No active sites exist; the punch must be rejected.
    NoSites,
    /// The nearest active site, whether or not the point is inside its radius.
    Resolved {
        site: &'a GeoSite,
        distance_meters: f64,
        within_radius: bool,
    },
}

impl GeoResolution<'_> {
    /// True only when a site resolved and the point is inside its radius.
    pub fn is_within_radius(&self) -> bool {
        matches!(
            self,
            GeoResolution::Resolved {
                within_radius: true,
                ..
            }
        )
    }
}

/// Great-circle distance in meters between two WGS84 coordinates.
///
/// Double precision haversine; no special handling of antimeridian or pole
/// crossing (single-city deployment).
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lng2 - lng1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Resolve a reported coordinate to the nearest active site.
///
/// Tie-break between equidistant sites is implementation-defined: the first
/// site in input order wins.
pub fn resolve(lat: f64, lng: f64, sites: &[GeoSite]) -> GeoResolution<'_> {
    let mut nearest: Option<(&GeoSite, f64)> = None;

    for site in sites {
        let distance = haversine_distance(lat, lng, site.latitude, site.longitude);
        match nearest {
            Some((_, best)) if distance >= best => {}
            _ => nearest = Some((site, distance)),
        }
    }

    match nearest {
        None => GeoResolution::NoSites,
        Some((site, distance_meters)) => GeoResolution::Resolved {
            site,
            distance_meters,
            within_radius: distance_meters <= site.radius_meters,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: &str, name: &str, lat: f64, lng: f64, radius: f64) -> GeoSite {
        GeoSite {
            id: id.to_string(),
            name: name.to_string(),
            latitude: lat,
            longitude: lng,
            radius_meters: radius,
        }
    }

    #[test]
    fn test_distance_at_same_point_is_zero() {
        let d = haversine_distance(40.4168, -3.7038, 40.4168, -3.7038);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_distance_known_pair() {
        // Madrid Puerta del Sol -> Plaza Mayor, roughly 350m
        let d = haversine_distance(40.41694, -3.70361, 40.41555, -3.70732);
        assert!(d > 250.0 && d < 450.0, "unexpected distance: {d}");
    }

    #[test]
    fn test_resolve_at_site_center() {
        let sites = vec![site("a", "Centro", 40.4168, -3.7038, 100.0)];
        match resolve(40.4168, -3.7038, &sites) {
            GeoResolution::Resolved {
                site,
                distance_meters,
                within_radius,
            } => {
                assert_eq!(site.id, "a");
                assert!(distance_meters < 1.0);
                assert!(within_radius);
            }
            other => panic!("expected resolution, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_no_sites_is_hard_rejection() {
        let result = resolve(40.4168, -3.7038, &[]);
        assert_eq!(result, GeoResolution::NoSites);
        assert!(!result.is_within_radius());
    }

    #[test]
    fn test_resolve_picks_nearest_even_out_of_radius() {
        let sites = vec![
            site("far", "Norte", 41.0, -3.7, 100.0),
            site("near", "Sur", 40.5, -3.7, 100.0),
        ];
        match resolve(40.4, -3.7, &sites) {
            GeoResolution::Resolved {
                site,
                within_radius,
                distance_meters,
            } => {
                assert_eq!(site.id, "near");
                assert!(!within_radius);
                assert!(distance_meters > 100.0);
            }
            other => panic!("expected resolution, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_tie_break_first_in_order() {
        // Two sites at the exact same coordinates: first one wins.
        let sites = vec![
            site("first", "A", 40.0, -3.0, 50.0),
            site("second", "B", 40.0, -3.0, 50.0),
        ];
        match resolve(40.0001, -3.0, &sites) {
            GeoResolution::Resolved { site, .. } => assert_eq!(site.id, "first"),
            other => panic!("expected resolution, got {other:?}"),
        }
    }

    #[test]
    fn test_within_radius_boundary_inclusive() {
        let s = site("a", "A", 40.0, -3.0, 100.0);
        let d = haversine_distance(40.0, -3.0, 40.0008, -3.0);
        assert!(d > 80.0 && d < 100.0);
        let sites = vec![s];
        assert!(resolve(40.0008, -3.0, &sites).is_within_radius());
    }
}
