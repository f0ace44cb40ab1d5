//! Google Distance Matrix HTTP adapter.

use std::fmt;

use serde::Deserialize;

use crate::config::{ApiKey, ConfigError};
use crate::haversine::Point;
use crate::traits::{DistanceMatrixProvider, MatrixElement, TravelMode};

pub const DEFAULT_DISTANCE_MATRIX_URL: &str =
    "https://maps.googleapis.com/maps/api/distancematrix/json";

#[derive(Debug, Clone)]
pub struct DistanceMatrixConfig {
    pub base_url: String,
    pub api_key: ApiKey,
    /// Language hint for localized text in the response.
    pub language: String,
    pub timeout_secs: u64,
}

impl DistanceMatrixConfig {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            base_url: DEFAULT_DISTANCE_MATRIX_URL.to_string(),
            api_key,
            language: "ko".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug)]
pub enum MatrixError {
    Config(ConfigError),
    /// Transport failure: connect, timeout, TLS, or unreadable body.
    Network(reqwest::Error),
    /// The service answered with a non-success HTTP or top-level status.
    UpstreamStatus {
        status: String,
        message: Option<String>,
    },
    /// Top-level status was OK but no row came back.
    MissingRow,
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixError::Config(err) => write!(f, "configuration error: {}", err),
            MatrixError::Network(err) => write!(f, "network error: {}", err),
            MatrixError::UpstreamStatus { status, message } => {
                write!(f, "Distance Matrix API error: {}", status)?;
                if let Some(message) = message {
                    write!(f, " - {}", message)?;
                }
                Ok(())
            }
            MatrixError::MissingRow => f.write_str("Distance Matrix API returned no rows"),
        }
    }
}

impl std::error::Error for MatrixError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatrixError::Config(err) => Some(err),
            MatrixError::Network(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for MatrixError {
    fn from(err: ConfigError) -> Self {
        MatrixError::Config(err)
    }
}

/// The request URL carries the API key, so it is dropped from the error.
impl From<reqwest::Error> for MatrixError {
    fn from(err: reqwest::Error) -> Self {
        MatrixError::Network(err.without_url())
    }
}

#[derive(Debug, Clone)]
pub struct DistanceMatrixClient {
    config: DistanceMatrixConfig,
    client: reqwest::blocking::Client,
}

impl DistanceMatrixClient {
    pub fn new(config: DistanceMatrixConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl DistanceMatrixProvider for DistanceMatrixClient {
    fn matrix_row(
        &self,
        origin: Point,
        destinations: &[Point],
        mode: TravelMode,
    ) -> Result<Vec<MatrixElement>, MatrixError> {
        if destinations.is_empty() {
            return Ok(Vec::new());
        }

        let origins = format_coordinate(origin);
        let destinations = destinations
            .iter()
            .map(|point| format_coordinate(*point))
            .collect::<Vec<_>>()
            .join("|");

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("origins", origins.as_str()),
                ("destinations", destinations.as_str()),
                ("mode", mode.as_str()),
                ("language", self.config.language.as_str()),
                ("key", self.config.api_key.as_str()),
            ])
            .send()?;

        let http_status = response.status();
        if !http_status.is_success() {
            return Err(MatrixError::UpstreamStatus {
                status: format!("HTTP {}", http_status.as_u16()),
                message: None,
            });
        }

        let body = response.json::<DistanceMatrixResponse>()?;
        parse_response(body)
    }
}

fn format_coordinate(point: Point) -> String {
    format!("{:.6},{:.6}", point.lat, point.lng)
}

fn parse_response(body: DistanceMatrixResponse) -> Result<Vec<MatrixElement>, MatrixError> {
    if body.status != "OK" {
        return Err(MatrixError::UpstreamStatus {
            status: body.status,
            message: body.error_message,
        });
    }

    let row = body.rows.into_iter().next().ok_or(MatrixError::MissingRow)?;

    Ok(row
        .elements
        .into_iter()
        .map(|element| match (element.status.as_str(), element.distance, element.duration) {
            ("OK", Some(distance), Some(duration)) => MatrixElement::Resolved {
                distance_meters: distance.value,
                duration_seconds: duration.value,
            },
            _ => MatrixElement::Unresolved {
                status: element.status,
            },
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixRow {
    #[serde(default)]
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixElement {
    status: String,
    #[serde(default)]
    distance: Option<ValueField>,
    #[serde(default)]
    duration: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: i64,
}
