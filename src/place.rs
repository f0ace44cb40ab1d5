//! Canonical place records.
//!
//! Raw search results from either provider are parsed leniently into a
//! provider-tagged `RawPlace`, mapped into one `Place` shape, and then
//! deduplicated. Missing or mistyped upstream fields become empty values.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::ApiKey;
use crate::haversine::Point;
use crate::traits::{Candidate, TravelEstimate, TravelMode};

/// Separator in Kakao's hierarchical category strings ("음식점 > 한식 > 해장국").
const CATEGORY_SEPARATOR: &str = " > ";

const GOOGLE_PHOTO_URL: &str = "https://maps.googleapis.com/maps/api/place/photo";
const GOOGLE_PLACE_URL: &str = "https://www.google.com/maps/place/?q=place_id:";

/// Dedup coordinates are compared at 1e-6 degree (~0.1 m).
const COORDINATE_QUANTUM: f64 = 1e6;

/// Kakao category group codes.
const KAKAO_CATEGORY_GROUPS: &[(&str, &str)] = &[
    ("MT1", "대형마트"),
    ("CS2", "편의점"),
    ("PS3", "어린이집/유치원"),
    ("SC4", "학교"),
    ("AC5", "학원"),
    ("PK6", "주차장"),
    ("OL7", "주유소/충전소"),
    ("SW8", "지하철역"),
    ("BK9", "은행"),
    ("CT1", "문화시설"),
    ("AG2", "중개업소"),
    ("PO3", "공공기관"),
    ("AT4", "관광명소"),
    ("AD5", "숙박"),
    ("FD6", "음식점"),
    ("CE7", "카페"),
    ("HP8", "병원"),
    ("PM9", "약국"),
];

/// Google place types with a display label.
const GOOGLE_TYPE_LABELS: &[(&str, &str)] = &[
    ("restaurant", "음식점"),
    ("cafe", "카페"),
    ("bar", "술집"),
    ("lodging", "숙박"),
    ("tourist_attraction", "관광명소"),
    ("park", "공원"),
    ("hospital", "병원"),
    ("pharmacy", "약국"),
    ("convenience_store", "편의점"),
    ("subway_station", "지하철역"),
    ("shopping_mall", "쇼핑몰"),
    ("gym", "헬스장"),
    ("veterinary_care", "동물병원"),
    ("pet_store", "반려동물용품"),
    ("campground", "캠핑장"),
];

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, label)| *label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Kakao,
    Google,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::Kakao => "kakao",
            Provider::Google => "google",
        })
    }
}

// ============================================================================
// Raw upstream records
// ============================================================================

/// Kakao local search document. Kakao sends numbers as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KakaoRawPlace {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub place_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub road_address_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub road_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_group_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_group_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    /// Longitude.
    #[serde(default, deserialize_with = "lenient_string")]
    pub x: Option<String>,
    /// Latitude.
    #[serde(default, deserialize_with = "lenient_string")]
    pub y: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub place_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub distance: Option<String>,
}

/// Google Places (legacy) search or details result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleRawPlace {
    #[serde(default, deserialize_with = "lenient_string")]
    pub place_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub formatted_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub geometry: Option<GoogleGeometry>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub formatted_phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<GoogleOpeningHours>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub user_ratings_total: Option<f64>,
    #[serde(default)]
    pub photos: Vec<GooglePhoto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleGeometry {
    #[serde(default)]
    pub location: Option<GoogleLatLng>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleLatLng {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleOpeningHours {
    #[serde(default)]
    pub open_now: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GooglePhoto {
    #[serde(default, deserialize_with = "lenient_string")]
    pub photo_reference: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// An upstream record tagged with the provider it came from.
#[derive(Debug, Clone)]
pub enum RawPlace {
    Kakao { record: KakaoRawPlace, payload: Value },
    Google { record: GoogleRawPlace, payload: Value },
}

impl RawPlace {
    /// Parses an upstream JSON record. A payload that does not even look like
    /// a record yields an empty one; the payload is kept either way.
    pub fn parse(provider: Provider, payload: Value) -> Self {
        match provider {
            Provider::Kakao => RawPlace::Kakao {
                record: parse_or_empty(provider, &payload),
                payload,
            },
            Provider::Google => RawPlace::Google {
                record: parse_or_empty(provider, &payload),
                payload,
            },
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            RawPlace::Kakao { .. } => Provider::Kakao,
            RawPlace::Google { .. } => Provider::Google,
        }
    }
}

fn parse_or_empty<T>(provider: Provider, payload: &Value) -> T
where
    T: for<'de> Deserialize<'de> + Default,
{
    T::deserialize(payload).unwrap_or_else(|err| {
        warn!(%provider, error = %err, "unreadable place record");
        T::default()
    })
}

// ============================================================================
// Canonical place
// ============================================================================

/// Fields only some providers supply. Each is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub open_now: Option<bool>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub photo_reference: Option<String>,
    pub photo_url: Option<String>,
}

/// Interpretation metadata attached by downstream stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceContext {
    pub tags: Vec<String>,
    pub route_segment: Option<String>,
    pub distance_from_start: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: Option<String>,
    pub provider: Provider,
    pub display_name: String,
    pub formatted_address: String,
    pub road_address: String,
    pub location: Option<Point>,
    pub category_code: String,
    pub category_name: String,
    pub category_group_name: String,
    pub category_path: Vec<String>,
    pub detail_category: String,
    pub phone: String,
    pub place_url: String,
    /// Distance from the search center, when the provider reports one.
    pub distance: Option<i64>,
    pub enrichment: Enrichment,
    pub travel: Option<TravelEstimate>,
    pub context: PlaceContext,
    #[serde(rename = "_raw")]
    pub raw: Value,
}

impl Candidate for Place {
    fn location(&self) -> Option<Point> {
        self.location
    }

    fn attach_travel(&mut self, estimate: TravelEstimate) {
        self.travel = Some(estimate);
    }
}

/// Identity used for deduplication, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Url(String),
    ProviderId(Provider, String),
    Coordinates(i64, i64),
    /// No url, id, or coordinates; all such places collapse into one.
    Unidentified,
}

impl Place {
    pub fn dedup_key(&self) -> DedupKey {
        if !self.place_url.is_empty() {
            return DedupKey::Url(self.place_url.clone());
        }
        if let Some(id) = &self.id {
            return DedupKey::ProviderId(self.provider, id.clone());
        }
        match self.location {
            Some(point) => DedupKey::Coordinates(
                (point.lat * COORDINATE_QUANTUM).round() as i64,
                (point.lng * COORDINATE_QUANTUM).round() as i64,
            ),
            None => DedupKey::Unidentified,
        }
    }

    /// Display shape: unresolved optional fields are omitted when serialized.
    pub fn to_output(&self) -> PlaceOutput {
        PlaceOutput {
            id: self.id.clone(),
            provider: self.provider,
            display_name: self.display_name.clone(),
            formatted_address: self.formatted_address.clone(),
            road_address: self.road_address.clone(),
            location: self.location,
            category_code: self.category_code.clone(),
            category_name: self.category_name.clone(),
            category_group_name: self.category_group_name.clone(),
            detail_category: self.detail_category.clone(),
            phone: self.phone.clone(),
            place_url: self.place_url.clone(),
            distance: self.distance,
            travel_distance: self.travel.as_ref().map(|t| t.distance_meters),
            travel_duration: self.travel.as_ref().and_then(|t| t.duration_seconds),
            travel_mode: self.travel.as_ref().map(|t| t.mode),
            rating: self.enrichment.rating,
            review_count: self.enrichment.review_count,
            open_now: self.enrichment.open_now,
            photo_url: self.enrichment.photo_url.clone(),
            tags: self.context.tags.clone(),
            route_segment: self.context.route_segment.clone(),
            distance_from_start: self.context.distance_from_start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOutput {
    pub id: Option<String>,
    pub provider: Provider,
    pub display_name: String,
    pub formatted_address: String,
    pub road_address: String,
    pub location: Option<Point>,
    pub category_code: String,
    pub category_name: String,
    pub category_group_name: String,
    pub detail_category: String,
    pub phone: String,
    pub place_url: String,
    pub distance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_distance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_mode: Option<TravelMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_from_start: Option<u64>,
}

// ============================================================================
// Normalization
// ============================================================================

/// Maps raw records into `Place`s.
///
/// The optional key is only used to build Google photo URLs.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    photo_key: Option<ApiKey>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_photo_key(photo_key: ApiKey) -> Self {
        Self {
            photo_key: Some(photo_key),
        }
    }

    pub fn normalize(&self, raw: RawPlace) -> Place {
        match raw {
            RawPlace::Kakao { record, payload } => normalize_kakao(record, payload),
            RawPlace::Google { record, payload } => {
                normalize_google(record, payload, self.photo_key.as_ref())
            }
        }
    }

    pub fn normalize_all<I>(&self, raws: I) -> Vec<Place>
    where
        I: IntoIterator<Item = RawPlace>,
    {
        raws.into_iter().map(|raw| self.normalize(raw)).collect()
    }
}

fn normalize_kakao(record: KakaoRawPlace, payload: Value) -> Place {
    let lat = record.y.as_deref().and_then(|v| v.trim().parse::<f64>().ok());
    let lng = record.x.as_deref().and_then(|v| v.trim().parse::<f64>().ok());
    let location = match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Point::new(lat, lng)),
        _ => None,
    };

    let category_code = record
        .category_group_code
        .or(record.category_code)
        .unwrap_or_default();
    let category_name = record.category_name.or(record.category).unwrap_or_default();
    let category_group_name = record
        .category_group_name
        .or_else(|| lookup(KAKAO_CATEGORY_GROUPS, &category_code).map(str::to_string))
        .unwrap_or_default();

    let category_path: Vec<String> = if category_name.is_empty() {
        Vec::new()
    } else {
        category_name
            .split(CATEGORY_SEPARATOR)
            .map(str::to_string)
            .collect()
    };
    let detail_category = category_path.last().cloned().unwrap_or_default();

    Place {
        id: record.id,
        provider: Provider::Kakao,
        display_name: record.place_name.unwrap_or_default(),
        formatted_address: record.address_name.or(record.address).unwrap_or_default(),
        road_address: record
            .road_address_name
            .or(record.road_address)
            .unwrap_or_default(),
        location,
        category_code,
        category_name,
        category_group_name,
        category_path,
        detail_category,
        phone: record.phone.unwrap_or_default(),
        place_url: record.place_url.unwrap_or_default(),
        distance: record
            .distance
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .map(|d| d as i64),
        enrichment: Enrichment::default(),
        travel: None,
        context: PlaceContext::default(),
        raw: payload,
    }
}

fn normalize_google(record: GoogleRawPlace, payload: Value, photo_key: Option<&ApiKey>) -> Place {
    let location = record
        .geometry
        .and_then(|g| g.location)
        .and_then(|loc| match (loc.lat, loc.lng) {
            (Some(lat), Some(lng)) => Some(Point::new(lat, lng)),
            _ => None,
        });

    let types = record.types;
    let category_code = types.first().cloned().unwrap_or_default();
    let category_group_name = lookup(GOOGLE_TYPE_LABELS, &category_code)
        .map(str::to_string)
        .unwrap_or_else(|| category_code.clone());
    let detail_category = types.last().cloned().unwrap_or_default();

    let place_url = record.url.unwrap_or_else(|| match &record.place_id {
        Some(id) => format!("{}{}", GOOGLE_PLACE_URL, id),
        None => String::new(),
    });

    let photo_reference = record
        .photos
        .into_iter()
        .next()
        .and_then(|photo| photo.photo_reference);
    let photo_url = photo_reference
        .as_deref()
        .map(|reference| google_photo_url(reference, photo_key));

    Place {
        id: record.place_id,
        provider: Provider::Google,
        display_name: record.name.unwrap_or_default(),
        formatted_address: record
            .formatted_address
            .or(record.vicinity)
            .unwrap_or_default(),
        road_address: String::new(),
        location,
        category_code,
        category_name: types.join(CATEGORY_SEPARATOR),
        category_group_name,
        category_path: types,
        detail_category,
        phone: record.formatted_phone_number.unwrap_or_default(),
        place_url,
        distance: None,
        enrichment: Enrichment {
            open_now: record.opening_hours.and_then(|h| h.open_now),
            rating: record.rating,
            review_count: record
                .user_ratings_total
                .filter(|count| *count >= 0.0)
                .map(|count| count as u32),
            photo_reference,
            photo_url,
        },
        travel: None,
        context: PlaceContext::default(),
        raw: payload,
    }
}

fn google_photo_url(reference: &str, key: Option<&ApiKey>) -> String {
    let mut url = format!(
        "{}?maxwidth=400&photo_reference={}",
        GOOGLE_PHOTO_URL, reference
    );
    if let Some(key) = key {
        url.push_str("&key=");
        url.push_str(key.as_str());
    }
    url
}

// ============================================================================
// Set operations
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Deduplicated {
    pub places: Vec<Place>,
    pub removed_count: usize,
}

/// Keeps the first place for each dedup key, preserving order.
pub fn deduplicate(places: Vec<Place>) -> Deduplicated {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(places.len());
    let mut removed_count = 0;

    for place in places {
        if seen.insert(place.dedup_key()) {
            kept.push(place);
        } else {
            removed_count += 1;
        }
    }

    Deduplicated {
        places: kept,
        removed_count,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending search-center distance; places without one go last.
    #[default]
    Distance,
    /// Upstream order.
    Relevance,
}

pub fn sort_places(mut places: Vec<Place>, order: SortOrder) -> Vec<Place> {
    match order {
        SortOrder::Distance => {
            places.sort_by_key(|place| place.distance.unwrap_or(i64::MAX));
            places
        }
        SortOrder::Relevance => places,
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaceFilter {
    pub category_code: Option<String>,
    pub max_distance: Option<i64>,
    /// Case-insensitive match against name or category.
    pub keyword: Option<String>,
}

pub fn filter_places(places: Vec<Place>, filter: &PlaceFilter) -> Vec<Place> {
    let keyword = filter.keyword.as_ref().map(|k| k.to_lowercase());

    places
        .into_iter()
        .filter(|place| {
            if let Some(code) = &filter.category_code {
                if &place.category_code != code {
                    return false;
                }
            }
            if let (Some(max), Some(distance)) = (filter.max_distance, place.distance) {
                if distance > max {
                    return false;
                }
            }
            if let Some(keyword) = &keyword {
                let in_name = place.display_name.to_lowercase().contains(keyword.as_str());
                let in_category = place.category_name.to_lowercase().contains(keyword.as_str());
                if !in_name && !in_category {
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Merges downstream context into a place; unset fields keep their value.
pub fn attach_context(mut place: Place, context: PlaceContext) -> Place {
    if !context.tags.is_empty() {
        place.context.tags = context.tags;
    }
    if context.route_segment.is_some() {
        place.context.route_segment = context.route_segment;
    }
    if context.distance_from_start.is_some() {
        place.context.distance_from_start = context.distance_from_start;
    }
    place
}
