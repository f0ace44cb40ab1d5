//! Real Seoul-area locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap.

use serde_json::{json, Value};

use route_sampler::haversine::Point;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lng)
    }

    /// Kakao local search document for this location.
    pub fn kakao_record(&self, id: &str) -> Value {
        json!({
            "id": id,
            "place_name": self.name,
            "category_name": "음식점 > 카페",
            "category_group_code": "CE7",
            "x": self.lng.to_string(),
            "y": self.lat.to_string(),
            "place_url": format!("http://place.map.kakao.com/{}", id),
        })
    }

    /// Google Places result for this location.
    pub fn google_record(&self, place_id: &str) -> Value {
        json!({
            "place_id": place_id,
            "name": self.name,
            "types": ["cafe", "food", "point_of_interest", "establishment"],
            "geometry": {"location": {"lat": self.lat, "lng": self.lng}},
            "rating": 4.4,
            "user_ratings_total": 812,
        })
    }
}

// ============================================================================
// Gangnam (good origins for walking-distance tests)
// ============================================================================

pub const GANGNAM: &[Location] = &[
    Location::new("Gangnam Station", 37.4979, 127.0276),
    Location::new("Sinnonhyeon Station", 37.5045, 127.0250),
    Location::new("Yeoksam Station", 37.5006, 127.0364),
    Location::new("Gangnam-gu Office", 37.5172, 127.0473),
    Location::new("Seolleung Station", 37.5045, 127.0490),
    Location::new("Yangjae Station", 37.4842, 127.0343),
];

// ============================================================================
// Across the city (mostly beyond walking range of Gangnam)
// ============================================================================

pub const CITYWIDE: &[Location] = &[
    Location::new("Seoul Station", 37.5547, 126.9707),
    Location::new("Gwanghwamun", 37.5759, 126.9768),
    Location::new("Hongik University Station", 37.5572, 126.9245),
    Location::new("Jamsil Station", 37.5133, 127.1001),
    Location::new("Konkuk University Station", 37.5404, 127.0692),
    Location::new("Yeouido Park", 37.5256, 126.9226),
    Location::new("Itaewon Station", 37.5345, 126.9946),
    Location::new("Dongdaemun Design Plaza", 37.5665, 127.0092),
    Location::new("Seoul Forest", 37.5444, 127.0374),
    Location::new("Gimpo Airport", 37.5586, 126.7944),
];

// ============================================================================
// Intercity endpoints
// ============================================================================

pub const SOKCHO: Location = Location::new("Sokcho Beach", 38.1905, 128.6003);
pub const SUWON: Location = Location::new("Suwon Hwaseong", 37.2871, 127.0119);
pub const BUSAN: Location = Location::new("Busan Station", 35.1151, 129.0414);

pub fn all_locations() -> Vec<Location> {
    let mut all = Vec::with_capacity(GANGNAM.len() + CITYWIDE.len());
    all.extend_from_slice(GANGNAM);
    all.extend_from_slice(CITYWIDE);
    all
}

/// Straight geometry from `from` to `to` with `count` evenly spaced vertices.
pub fn straight_geometry(from: &Location, to: &Location, count: usize) -> Vec<Point> {
    let steps = (count - 1) as f64;
    (0..count)
        .map(|i| {
            let t = i as f64 / steps;
            Point::new(
                from.lat + (to.lat - from.lat) * t,
                from.lng + (to.lng - from.lng) * t,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_in_seoul_area() {
        for loc in all_locations() {
            assert!(loc.lat > 37.4 && loc.lat < 37.7, "{} lat out of range: {}", loc.name, loc.lat);
            assert!(loc.lng > 126.7 && loc.lng < 127.2, "{} lng out of range: {}", loc.name, loc.lng);
        }
    }
}
