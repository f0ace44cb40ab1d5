//! Place normalization and deduplication tests
//!
//! Mixed Kakao and Google result sets built from real Seoul locations.

mod fixtures;

use serde_json::json;

use route_sampler::place::{
    attach_context, deduplicate, filter_places, sort_places, DedupKey, Normalizer, Place,
    PlaceContext, PlaceFilter, Provider, RawPlace, SortOrder,
};

use fixtures::seoul_locations::{self, Location};

fn kakao(loc: &Location, id: &str) -> RawPlace {
    RawPlace::parse(Provider::Kakao, loc.kakao_record(id))
}

fn google(loc: &Location, place_id: &str) -> RawPlace {
    RawPlace::parse(Provider::Google, loc.google_record(place_id))
}

fn names(places: &[Place]) -> Vec<&str> {
    places.iter().map(|p| p.display_name.as_str()).collect()
}

/// Kakao results around Gangnam followed by Google results for the same area.
fn mixed_results() -> Vec<Place> {
    let normalizer = Normalizer::new();
    let mut raws = Vec::new();
    for (i, loc) in seoul_locations::GANGNAM.iter().enumerate() {
        raws.push(kakao(loc, &format!("{}", 1000 + i)));
    }
    for (i, loc) in seoul_locations::GANGNAM.iter().enumerate() {
        raws.push(google(loc, &format!("ChIJ{}", i)));
    }
    normalizer.normalize_all(raws)
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn both_providers_share_one_shape() {
    let places = mixed_results();
    assert_eq!(places.len(), 12);

    for place in &places {
        assert!(!place.display_name.is_empty());
        assert!(place.location.is_some());
        assert!(!place.place_url.is_empty());
        assert!(place.travel.is_none());
    }

    let kakao = &places[0];
    assert_eq!(kakao.provider, Provider::Kakao);
    assert_eq!(kakao.category_code, "CE7");
    assert_eq!(kakao.detail_category, "카페");
    assert_eq!(kakao.location, Some(seoul_locations::GANGNAM[0].point()));

    let google = &places[6];
    assert_eq!(google.provider, Provider::Google);
    assert_eq!(google.category_code, "cafe");
    assert_eq!(google.detail_category, "establishment");
    assert_eq!(google.enrichment.rating, Some(4.4));
    assert_eq!(google.enrichment.review_count, Some(812));
    assert!(google.place_url.contains("ChIJ0"));
}

#[test]
fn raw_payload_is_retained() {
    let record = seoul_locations::CITYWIDE[0].kakao_record("77");
    let place = Normalizer::new().normalize(RawPlace::parse(Provider::Kakao, record.clone()));

    assert_eq!(place.raw, record);
}

#[test]
fn garbage_record_still_normalizes() {
    let place = Normalizer::new().normalize(RawPlace::parse(Provider::Google, json!("not a place")));

    assert_eq!(place.provider, Provider::Google);
    assert!(place.display_name.is_empty());
    assert!(place.location.is_none());
    assert_eq!(place.dedup_key(), DedupKey::Unidentified);
}

// ============================================================================
// Deduplication
// ============================================================================

#[test]
fn distinct_results_survive() {
    let places = mixed_results();
    let deduped = deduplicate(places.clone());

    assert_eq!(deduped.removed_count, 0);
    assert_eq!(deduped.places, places);
}

#[test]
fn dedup_is_idempotent() {
    let mut places = mixed_results();
    places.extend(mixed_results());

    let once = deduplicate(places);
    assert_eq!(once.removed_count, 12);

    let twice = deduplicate(once.places.clone());
    assert_eq!(twice.removed_count, 0);
    assert_eq!(twice.places, once.places);
}

#[test]
fn first_occurrence_wins_and_order_is_kept() {
    let normalizer = Normalizer::new();
    let gangnam = &seoul_locations::GANGNAM[0];
    let yeoksam = &seoul_locations::GANGNAM[2];
    let jamsil = &seoul_locations::CITYWIDE[3];

    let mut first = gangnam.kakao_record("1");
    first["place_name"] = json!("first");
    let mut repeat = gangnam.kakao_record("1");
    repeat["place_name"] = json!("repeat");

    let places = normalizer.normalize_all(vec![
        RawPlace::parse(Provider::Kakao, first),
        kakao(yeoksam, "2"),
        RawPlace::parse(Provider::Kakao, repeat),
        kakao(jamsil, "3"),
    ]);
    let deduped = deduplicate(places);

    assert_eq!(deduped.removed_count, 1);
    assert_eq!(
        names(&deduped.places),
        vec!["first", yeoksam.name, jamsil.name]
    );
}

#[test]
fn coordinates_identify_places_without_url_or_id() {
    let payload = |name: &str, lat: f64| {
        json!({"place_name": name, "x": "127.0276", "y": lat.to_string()})
    };
    let places = Normalizer::new().normalize_all(vec![
        RawPlace::parse(Provider::Kakao, payload("a", 37.4979)),
        RawPlace::parse(Provider::Kakao, payload("b", 37.49790000004)),
        RawPlace::parse(Provider::Kakao, payload("c", 37.4980)),
    ]);
    let deduped = deduplicate(places);

    assert_eq!(names(&deduped.places), vec!["a", "c"]);
}

#[test]
fn same_id_from_different_providers_is_not_a_duplicate() {
    let bare = |provider| RawPlace::parse(provider, json!({"id": "42", "place_id": "42"}));
    let places = Normalizer::new().normalize_all(vec![bare(Provider::Kakao), bare(Provider::Google)]);

    // google builds a maps url from the place id; strip it to force the id key
    let places: Vec<Place> = places
        .into_iter()
        .map(|mut p| {
            p.place_url.clear();
            p
        })
        .collect();

    assert_eq!(deduplicate(places).removed_count, 0);
}

// ============================================================================
// Sorting, filtering, context
// ============================================================================

#[test]
fn sort_then_filter_pipeline() {
    let records: Vec<RawPlace> = seoul_locations::GANGNAM
        .iter()
        .enumerate()
        .map(|(i, loc)| {
            let mut record = loc.kakao_record(&i.to_string());
            record["distance"] = json!(((6 - i) * 100).to_string());
            RawPlace::parse(Provider::Kakao, record)
        })
        .collect();
    let places = Normalizer::new().normalize_all(records);

    let sorted = sort_places(places, SortOrder::Distance);
    let distances: Vec<Option<i64>> = sorted.iter().map(|p| p.distance).collect();
    assert_eq!(
        distances,
        vec![Some(100), Some(200), Some(300), Some(400), Some(500), Some(600)]
    );

    let filter = PlaceFilter {
        max_distance: Some(300),
        keyword: Some("STATION".to_string()),
        ..PlaceFilter::default()
    };
    let filtered = filter_places(sorted, &filter);
    // Gangnam-gu Office is within 300 m but has no keyword match
    assert_eq!(
        names(&filtered),
        vec!["Yangjae Station", "Seolleung Station"]
    );
}

#[test]
fn context_survives_into_output() {
    let place = mixed_results().remove(0);
    let place = attach_context(
        place,
        PlaceContext {
            tags: vec!["rest_stop".to_string()],
            route_segment: Some("segment_3".to_string()),
            distance_from_start: Some(45_000),
        },
    );

    let output = serde_json::to_value(place.to_output()).unwrap();
    assert_eq!(output["tags"], json!(["rest_stop"]));
    assert_eq!(output["routeSegment"], "segment_3");
    assert_eq!(output["distanceFromStart"], 45_000);
    assert!(output.get("travelDistance").is_none());
}
