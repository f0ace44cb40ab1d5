//! Great-circle geometry on a spherical earth.
//!
//! Used both to measure route geometry and as the straight-line fallback
//! whenever the distance matrix service cannot answer.

use serde::{Deserialize, Serialize};

use crate::traits::{DistanceSource, TravelEstimate, TravelMode};

/// Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when latitude and longitude are finite and inside their ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Haversine distance between two points in meters.
pub fn distance_meters(from: Point, to: Point) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    // abs() keeps the result bit-identical when the arguments are swapped
    let delta_lat = (to.lat - from.lat).abs().to_radians();
    let delta_lng = (to.lng - from.lng).abs().to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    // rounding can push `a` just past 1.0 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Linear interpolation of latitude and longitude independently.
///
/// This is not a geodesic slerp. At the few-kilometre spans the sampler works
/// with the error is negligible, but it grows with span length and near the
/// antimeridian.
pub fn interpolate(from: Point, to: Point, fraction: f64) -> Point {
    Point {
        lat: from.lat + (to.lat - from.lat) * fraction,
        lng: from.lng + (to.lng - from.lng) * fraction,
    }
}

/// Straight-line travel estimate; duration is unknown.
pub fn estimate(from: Point, to: Point, mode: TravelMode) -> TravelEstimate {
    TravelEstimate {
        distance_meters: distance_meters(from, to).round() as i64,
        duration_seconds: None,
        mode,
        source: DistanceSource::Haversine,
    }
}
