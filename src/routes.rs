//! Road route adapters (Google Routes, Kakao Mobility directions).
//!
//! Both return the same `RouteSummary` so the sampler never needs to know
//! which geometry format was on the wire.

use std::fmt;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::{ApiKey, ConfigError};
use crate::haversine::Point;
use crate::place::Provider;
use crate::polyline::{self, Polyline, PolylineError, VertexSection};
use crate::sampler::{
    segment_polyline, segment_straight_line, PolylineOptions, SegmentedRoute, StraightLineOptions,
};
use crate::traits::RouteProvider;

pub const DEFAULT_GOOGLE_ROUTES_URL: &str =
    "https://routes.googleapis.com/directions/v2:computeRoutes";
pub const DEFAULT_KAKAO_DIRECTIONS_URL: &str = "https://apis-navi.kakaomobility.com/v1/directions";

const GOOGLE_FIELD_MASK: &str = "routes.distanceMeters,routes.duration,routes.polyline.encodedPolyline";

#[derive(Debug, Clone)]
pub struct RouteSummary {
    pub provider: Provider,
    pub distance_meters: i64,
    pub duration_seconds: Option<i64>,
    pub geometry: Polyline,
    /// Present only for providers that send an encoded polyline.
    pub encoded_polyline: Option<String>,
}

#[derive(Debug)]
pub enum RouteError {
    Config(ConfigError),
    Network(reqwest::Error),
    Upstream { status: String, message: String },
    NoRoutes,
    RouteFailed { code: i64, message: String },
    Polyline(PolylineError),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Config(err) => write!(f, "configuration error: {}", err),
            RouteError::Network(err) => write!(f, "network error: {}", err),
            RouteError::Upstream { status, message } => write!(f, "{}: {}", status, message),
            RouteError::NoRoutes => {
                f.write_str("no routes found between the specified origin and destination")
            }
            RouteError::RouteFailed { code, message } => {
                write!(f, "route error {}: {}", code, message)
            }
            RouteError::Polyline(err) => write!(f, "bad route geometry: {}", err),
        }
    }
}

impl std::error::Error for RouteError {}

impl From<ConfigError> for RouteError {
    fn from(err: ConfigError) -> Self {
        RouteError::Config(err)
    }
}

impl From<reqwest::Error> for RouteError {
    fn from(err: reqwest::Error) -> Self {
        RouteError::Network(err.without_url())
    }
}

impl From<PolylineError> for RouteError {
    fn from(err: PolylineError) -> Self {
        RouteError::Polyline(err)
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
}

// ============================================================================
// Google Routes
// ============================================================================

#[derive(Debug, Clone)]
pub struct GoogleRoutesConfig {
    pub base_url: String,
    pub api_key: ApiKey,
    /// DRIVE, BICYCLE, WALK or TWO_WHEELER.
    pub travel_mode: String,
    pub timeout_secs: u64,
}

impl GoogleRoutesConfig {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            base_url: DEFAULT_GOOGLE_ROUTES_URL.to_string(),
            api_key,
            travel_mode: "DRIVE".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleRoutesClient {
    config: GoogleRoutesConfig,
    client: reqwest::blocking::Client,
}

impl GoogleRoutesClient {
    pub fn new(config: GoogleRoutesConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }
}

impl RouteProvider for GoogleRoutesClient {
    fn route(&self, origin: Point, destination: Point) -> Result<RouteSummary, RouteError> {
        let body = json!({
            "origin": {"location": {"latLng": {"latitude": origin.lat, "longitude": origin.lng}}},
            "destination": {"location": {"latLng": {"latitude": destination.lat, "longitude": destination.lng}}},
            "travelMode": self.config.travel_mode,
            "polylineEncoding": "ENCODED_POLYLINE",
        });

        debug!(mode = %self.config.travel_mode, "requesting google route");
        let response = self
            .client
            .post(&self.config.base_url)
            .header("X-Goog-Api-Key", self.config.api_key.as_str())
            .header("X-Goog-FieldMask", GOOGLE_FIELD_MASK)
            .json(&body)
            .send()?;

        let http_status = response.status();
        if !http_status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(google_upstream_error(http_status.as_u16(), &body));
        }

        google_summary(response.json::<GoogleRoutesResponse>()?)
    }
}

/// Builds the error for a non-success response. The body may not be JSON.
fn google_upstream_error(http_status: u16, body: &str) -> RouteError {
    let error = serde_json::from_str::<GoogleRoutesResponse>(body)
        .ok()
        .and_then(|data| data.error)
        .unwrap_or_default();

    RouteError::Upstream {
        status: error
            .status
            .unwrap_or_else(|| format!("HTTP {}", http_status)),
        message: error.message.unwrap_or_else(|| "Unknown API error".to_string()),
    }
}

fn google_summary(data: GoogleRoutesResponse) -> Result<RouteSummary, RouteError> {
    let route = data.routes.into_iter().next().ok_or(RouteError::NoRoutes)?;
    let encoded = route
        .polyline
        .and_then(|p| p.encoded_polyline)
        .unwrap_or_default();
    let geometry = polyline::decode(&encoded)?;

    Ok(RouteSummary {
        provider: Provider::Google,
        distance_meters: route.distance_meters.unwrap_or_default(),
        duration_seconds: route.duration.as_deref().and_then(parse_duration_seconds),
        geometry,
        encoded_polyline: (!encoded.is_empty()).then_some(encoded),
    })
}

/// Parses protobuf duration strings such as `"1234s"` or `"12.5s"`.
fn parse_duration_seconds(value: &str) -> Option<i64> {
    value
        .strip_suffix('s')
        .and_then(|secs| secs.parse::<f64>().ok())
        .map(|secs| secs.round() as i64)
}

#[derive(Debug, Default, Deserialize)]
struct GoogleRoutesResponse {
    #[serde(default)]
    routes: Vec<GoogleRoute>,
    #[serde(default)]
    error: Option<GoogleApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleRoute {
    #[serde(default)]
    distance_meters: Option<i64>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    polyline: Option<GooglePolyline>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GooglePolyline {
    #[serde(default)]
    encoded_polyline: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GoogleApiError {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ============================================================================
// Kakao Mobility directions
// ============================================================================

#[derive(Debug, Clone)]
pub struct KakaoDirectionsConfig {
    pub base_url: String,
    pub api_key: ApiKey,
    /// RECOMMEND, TIME or DISTANCE.
    pub priority: String,
    /// Pipe-separated: ferries|toll|motorway|schoolzone|uturn.
    pub avoid: Option<String>,
    pub timeout_secs: u64,
}

impl KakaoDirectionsConfig {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            base_url: DEFAULT_KAKAO_DIRECTIONS_URL.to_string(),
            api_key,
            priority: "RECOMMEND".to_string(),
            avoid: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KakaoDirectionsClient {
    config: KakaoDirectionsConfig,
    client: reqwest::blocking::Client,
}

impl KakaoDirectionsClient {
    pub fn new(config: KakaoDirectionsConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }
}

impl RouteProvider for KakaoDirectionsClient {
    fn route(&self, origin: Point, destination: Point) -> Result<RouteSummary, RouteError> {
        // Kakao takes "x,y", i.e. lng first
        let origin = format!("{},{}", origin.lng, origin.lat);
        let destination = format!("{},{}", destination.lng, destination.lat);
        let mut query = vec![
            ("origin", origin.as_str()),
            ("destination", destination.as_str()),
            ("priority", self.config.priority.as_str()),
        ];
        if let Some(avoid) = &self.config.avoid {
            query.push(("avoid", avoid.as_str()));
        }

        debug!(priority = %self.config.priority, "requesting kakao route");
        let response = self
            .client
            .get(&self.config.base_url)
            .header(
                "Authorization",
                format!("KakaoAK {}", self.config.api_key.as_str()),
            )
            .query(&query)
            .send()?;

        let http_status = response.status();
        if !http_status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(RouteError::Upstream {
                status: format!("HTTP {}", http_status.as_u16()),
                message,
            });
        }

        kakao_summary(response.json::<KakaoDirectionsResponse>()?)
    }
}

fn kakao_summary(data: KakaoDirectionsResponse) -> Result<RouteSummary, RouteError> {
    let route = data.routes.into_iter().next().ok_or(RouteError::NoRoutes)?;

    if route.result_code != 0 {
        return Err(RouteError::RouteFailed {
            code: route.result_code,
            message: route.result_msg.unwrap_or_default(),
        });
    }

    let summary = route.summary.unwrap_or_default();
    Ok(RouteSummary {
        provider: Provider::Kakao,
        distance_meters: summary.distance,
        duration_seconds: Some(summary.duration),
        geometry: polyline::from_vertex_sections(&route.sections),
        encoded_polyline: None,
    })
}

#[derive(Debug, Deserialize)]
struct KakaoDirectionsResponse {
    #[serde(default)]
    routes: Vec<KakaoRoute>,
}

#[derive(Debug, Deserialize)]
struct KakaoRoute {
    result_code: i64,
    #[serde(default)]
    result_msg: Option<String>,
    #[serde(default)]
    summary: Option<KakaoRouteSummary>,
    #[serde(default)]
    sections: Vec<VertexSection>,
}

#[derive(Debug, Default, Deserialize)]
struct KakaoRouteSummary {
    #[serde(default)]
    distance: i64,
    #[serde(default)]
    duration: i64,
}

// ============================================================================
// Route segmentation with degradation
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    Polyline { provider: Provider },
    /// Real geometry was unavailable; samples lie on the straight line.
    StraightLine { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSegmentation {
    pub route: SegmentedRoute,
    pub source: GeometrySource,
}

/// Samples the provider's route between two points, or the straight line
/// between them when the route cannot be obtained or sampled.
pub fn segment_route_between<R: RouteProvider>(
    provider: &R,
    origin: Point,
    destination: Point,
    polyline_options: PolylineOptions,
    straight_options: StraightLineOptions,
) -> RouteSegmentation {
    let sampled = provider
        .route(origin, destination)
        .map_err(|err| err.to_string())
        .and_then(|summary| {
            segment_polyline(&summary.geometry, polyline_options)
                .map(|route| (route, summary.provider))
                .map_err(|err| err.to_string())
        });

    match sampled {
        Ok((route, provider)) => RouteSegmentation {
            route,
            source: GeometrySource::Polyline { provider },
        },
        Err(reason) => {
            warn!(%reason, "route geometry unavailable, sampling straight line");
            RouteSegmentation {
                route: segment_straight_line(origin, destination, straight_options),
                source: GeometrySource::StraightLine { reason },
            }
        }
    }
}
