//! Core domain traits for route sampling and distance resolution.
//!
//! External services sit behind these seams so the fallback logic can be
//! driven by any implementation, including test doubles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::distance_matrix::MatrixError;
use crate::haversine::Point;
use crate::routes::{RouteError, RouteSummary};

/// Travel mode requested from the distance matrix service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
    Driving,
}

impl TravelMode {
    /// Thresholds at or below this many meters default to walking.
    pub const WALKING_THRESHOLD_METERS: i64 = 2000;

    pub fn for_threshold(threshold_meters: i64) -> Self {
        if threshold_meters <= Self::WALKING_THRESHOLD_METERS {
            TravelMode::Walking
        } else {
            TravelMode::Driving
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Driving => "driving",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a travel distance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceSource {
    Matrix,
    Haversine,
}

/// Resolved travel distance for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelEstimate {
    pub distance_meters: i64,
    /// None when `source` is `Haversine`.
    pub duration_seconds: Option<i64>,
    pub mode: TravelMode,
    pub source: DistanceSource,
}

/// One destination cell of a distance matrix row.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixElement {
    Resolved {
        distance_meters: i64,
        duration_seconds: i64,
    },
    /// The service answered but could not route to this destination.
    Unresolved { status: String },
}

impl MatrixElement {
    pub fn is_resolved(&self) -> bool {
        matches!(self, MatrixElement::Resolved { .. })
    }
}

/// Provides one row of a distance matrix: a single origin against many destinations.
///
/// Elements are returned in destination order. An `Err` means the whole
/// request failed (transport, credential, or top-level status).
pub trait DistanceMatrixProvider {
    fn matrix_row(
        &self,
        origin: Point,
        destinations: &[Point],
        mode: TravelMode,
    ) -> Result<Vec<MatrixElement>, MatrixError>;
}

/// An absent provider behaves like one without a credential.
impl<M: DistanceMatrixProvider> DistanceMatrixProvider for Option<M> {
    fn matrix_row(
        &self,
        origin: Point,
        destinations: &[Point],
        mode: TravelMode,
    ) -> Result<Vec<MatrixElement>, MatrixError> {
        match self {
            Some(provider) => provider.matrix_row(origin, destinations, mode),
            None => Err(MatrixError::Config(crate::config::ConfigError::Missing {
                var: crate::config::GOOGLE_API_KEY_ENV,
            })),
        }
    }
}

/// Computes a road route between two points.
pub trait RouteProvider {
    fn route(&self, origin: Point, destination: Point) -> Result<RouteSummary, RouteError>;
}

/// Something the distance resolver can measure and annotate.
pub trait Candidate {
    /// Coordinates, if the upstream record carried any.
    fn location(&self) -> Option<Point>;

    fn attach_travel(&mut self, estimate: TravelEstimate);
}

/// A fetched binary asset with its content type.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPhoto {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Downloads photos for thumbnail embedding. Called from worker threads.
pub trait PhotoFetcher: Sync {
    /// None on any failure; a failed photo never aborts its siblings.
    fn fetch(&self, url: &str) -> Option<FetchedPhoto>;
}
