//! Route-to-places pipeline tests
//!
//! Route geometry degradation and thumbnail embedding with mock providers.

mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};

use route_sampler::config::ApiKey;
use route_sampler::haversine::Point;
use route_sampler::place::{attach_context, Normalizer, PlaceContext, Provider, RawPlace};
use route_sampler::polyline::Polyline;
use route_sampler::routes::{segment_route_between, GeometrySource, RouteError, RouteSummary};
use route_sampler::sampler::{search_plans, PolylineOptions, SampleLabel, StraightLineOptions};
use route_sampler::thumbnails::{embed_thumbnails, strip_api_keys};
use route_sampler::traits::{FetchedPhoto, PhotoFetcher, RouteProvider};

use fixtures::seoul_locations::{self, straight_geometry};

// ============================================================================
// Mock providers
// ============================================================================

/// Returns a fixed geometry, or fails.
struct MockRoute {
    geometry: Option<Vec<Point>>,
}

impl RouteProvider for MockRoute {
    fn route(&self, _origin: Point, _destination: Point) -> Result<RouteSummary, RouteError> {
        match &self.geometry {
            Some(points) => {
                let geometry = Polyline::new(points.clone());
                Ok(RouteSummary {
                    provider: Provider::Kakao,
                    distance_meters: geometry.length_meters().round() as i64,
                    duration_seconds: Some(7200),
                    geometry,
                    encoded_polyline: None,
                })
            }
            None => Err(RouteError::NoRoutes),
        }
    }
}

/// Serves a tiny image for every URL that doesn't mention `broken`.
#[derive(Default)]
struct MockPhotos {
    calls: AtomicUsize,
}

impl PhotoFetcher for MockPhotos {
    fn fetch(&self, url: &str) -> Option<FetchedPhoto> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("broken") {
            return None;
        }
        assert!(url.contains("maxwidth=200"), "thumbnail width not applied: {}", url);
        Some(FetchedPhoto {
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        })
    }
}

// ============================================================================
// Route segmentation
// ============================================================================

#[test]
fn real_geometry_is_sampled() {
    let suwon = seoul_locations::SUWON;
    let sokcho = seoul_locations::SOKCHO;
    let provider = MockRoute {
        geometry: Some(straight_geometry(&suwon, &sokcho, 300)),
    };

    let result = segment_route_between(
        &provider,
        suwon.point(),
        sokcho.point(),
        PolylineOptions::default(),
        StraightLineOptions::default(),
    );

    assert_eq!(
        result.source,
        GeometrySource::Polyline {
            provider: Provider::Kakao
        }
    );
    assert_eq!(result.route.search_radius, 5000);
    assert_eq!(result.route.segments.first().unwrap().label, SampleLabel::Start);
    assert_eq!(result.route.segments.last().unwrap().label, SampleLabel::End);
}

#[test]
fn failed_route_degrades_to_straight_line() {
    let provider = MockRoute { geometry: None };
    let start = seoul_locations::SUWON.point();
    let end = seoul_locations::SOKCHO.point();

    let result = segment_route_between(
        &provider,
        start,
        end,
        PolylineOptions::default(),
        StraightLineOptions::default(),
    );

    match &result.source {
        GeometrySource::StraightLine { reason } => assert!(reason.contains("no routes")),
        other => panic!("expected straight line, got {:?}", other),
    }
    assert_eq!(result.route.search_radius, 2000);
    assert_eq!(result.route.interval, 5000);
    assert_eq!(result.route.segments.first().unwrap().point, start);
    assert_eq!(result.route.segments.last().unwrap().point, end);
}

#[test]
fn degenerate_geometry_degrades_to_straight_line() {
    let provider = MockRoute {
        geometry: Some(vec![seoul_locations::SUWON.point()]),
    };

    let result = segment_route_between(
        &provider,
        seoul_locations::SUWON.point(),
        seoul_locations::SOKCHO.point(),
        PolylineOptions::default(),
        StraightLineOptions::default(),
    );

    assert!(matches!(result.source, GeometrySource::StraightLine { .. }));
}

#[test]
fn plans_carry_labels_into_place_context() {
    let provider = MockRoute {
        geometry: Some(straight_geometry(
            &seoul_locations::GANGNAM[0],
            &seoul_locations::BUSAN,
            800,
        )),
    };
    let result = segment_route_between(
        &provider,
        seoul_locations::GANGNAM[0].point(),
        seoul_locations::BUSAN.point(),
        PolylineOptions::default(),
        StraightLineOptions::default(),
    );
    let plans = search_plans(&result.route);
    let plan = &plans[2];

    let place = Normalizer::new().normalize(RawPlace::parse(
        Provider::Kakao,
        seoul_locations::CITYWIDE[0].kakao_record("9"),
    ));
    let place = attach_context(
        place,
        PlaceContext {
            route_segment: Some(plan.label.to_string()),
            distance_from_start: Some(plan.distance_from_start),
            ..PlaceContext::default()
        },
    );

    assert_eq!(place.context.route_segment.as_deref(), Some("segment_2"));
    assert!(place.context.distance_from_start.unwrap() > 0);
}

// ============================================================================
// Thumbnails
// ============================================================================

fn google_with_photo(index: usize, reference: &str) -> RawPlace {
    let loc = &seoul_locations::CITYWIDE[index];
    let mut record = loc.google_record(&format!("ChIJ{}", index));
    record["photos"] = serde_json::json!([{"photo_reference": reference}]);
    RawPlace::parse(Provider::Google, record)
}

#[test]
fn failed_photos_do_not_abort_the_rest() {
    let key = ApiKey::parse("GOOGLE_PLACES_API_KEY", Some("AIzaTest".to_string()), "placeholder").unwrap();
    let normalizer = Normalizer::with_photo_key(key);
    let mut places = normalizer.normalize_all(vec![
        google_with_photo(0, "ok0"),
        google_with_photo(1, "broken1"),
        google_with_photo(2, "ok2"),
        RawPlace::parse(Provider::Kakao, seoul_locations::CITYWIDE[3].kakao_record("3")),
    ]);
    let fetcher = MockPhotos::default();

    let embedded = embed_thumbnails(&mut places, &fetcher);

    assert_eq!(embedded, 2);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    assert!(places[0].enrichment.photo_url.as_deref().unwrap().starts_with("data:image/png;base64,"));
    assert!(places[1].enrichment.photo_url.as_deref().unwrap().contains("key=AIzaTest"));
    assert!(places[2].enrichment.photo_url.as_deref().unwrap().starts_with("data:"));
    assert!(places[3].enrichment.photo_url.is_none());

    strip_api_keys(&mut places);
    let remote = places[1].enrichment.photo_url.as_deref().unwrap();
    assert!(remote.contains("photo_reference=broken1"));
    assert!(!remote.contains("key="));

    // already embedded photos are not fetched again
    assert_eq!(embed_thumbnails(&mut places, &fetcher), 0);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);
}
