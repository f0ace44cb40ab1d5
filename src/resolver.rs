//! Distance resolution: origin against many candidates, filtered by threshold.
//!
//! Matrix requests go out in batches, one at a time. Failures degrade in
//! three tiers:
//! - one destination unresolved: haversine for that candidate only
//! - every destination unresolved: haversine for everything
//! - any request fails outright: haversine for everything

use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::{debug, warn};

use crate::distance_matrix::MatrixError;
use crate::haversine::{self, Point};
use crate::traits::{
    Candidate, DistanceMatrixProvider, DistanceSource, MatrixElement, TravelEstimate, TravelMode,
};

/// Maximum destinations per distance matrix request.
pub const MATRIX_BATCH_SIZE: usize = 25;

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Keep candidates whose resolved distance is at most this many meters.
    pub threshold_meters: i64,
    /// Explicit mode; when None the threshold picks one.
    pub mode: Option<TravelMode>,
    /// Destinations per request, clamped to `1..=MATRIX_BATCH_SIZE`.
    pub batch_size: usize,
}

impl ResolveOptions {
    pub fn new(threshold_meters: i64) -> Self {
        Self {
            threshold_meters,
            mode: None,
            batch_size: MATRIX_BATCH_SIZE,
        }
    }

    pub fn with_mode(mut self, mode: TravelMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn travel_mode(&self) -> TravelMode {
        self.mode
            .unwrap_or_else(|| TravelMode::for_threshold(self.threshold_meters))
    }
}

/// Why the matrix attempt was abandoned.
#[derive(Debug)]
pub enum FallbackReason {
    /// Every element came back unresolved despite OK responses.
    AllElementsUnresolved { elements: usize },
    /// A request failed; nothing from the matrix was used.
    MatrixFailed(MatrixError),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::AllElementsUnresolved { elements } => write!(
                f,
                "Distance Matrix API returned no route for all {} destinations",
                elements
            ),
            FallbackReason::MatrixFailed(err) => write!(f, "{}", err),
        }
    }
}

#[derive(Debug)]
pub enum ResolutionStatus {
    /// Every distance came from the matrix.
    Resolved,
    /// Some candidates used straight-line distance.
    PartialFallback { unresolved: usize },
    /// All distances are straight-line.
    Fallback(FallbackReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveMeta {
    pub api_calls: usize,
    pub threshold: i64,
    pub mode: TravelMode,
}

#[derive(Debug)]
pub struct DistanceFilterResult<C> {
    /// Kept candidates, ascending by resolved distance.
    pub places: Vec<C>,
    pub filtered_out_count: usize,
    pub meta: ResolveMeta,
    pub status: ResolutionStatus,
}

impl<C> DistanceFilterResult<C> {
    pub fn fallback(&self) -> bool {
        matches!(self.status, ResolutionStatus::Fallback(_))
    }

    pub fn partial_fallback(&self) -> bool {
        matches!(self.status, ResolutionStatus::PartialFallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<String> {
        match &self.status {
            ResolutionStatus::Fallback(reason) => Some(reason.to_string()),
            _ => None,
        }
    }
}

impl<C: Serialize> Serialize for DistanceFilterResult<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DistanceFilterResult", 7)?;
        state.serialize_field("success", &true)?;
        state.serialize_field("places", &self.places)?;
        state.serialize_field("filteredOutCount", &self.filtered_out_count)?;
        state.serialize_field("meta", &MetaWire::from(&self.meta))?;
        match &self.status {
            ResolutionStatus::Resolved => {}
            ResolutionStatus::PartialFallback { .. } => {
                state.serialize_field("partialFallback", &true)?;
            }
            ResolutionStatus::Fallback(reason) => {
                state.serialize_field("fallback", &true)?;
                state.serialize_field("fallbackReason", &reason.to_string())?;
            }
        }
        state.end()
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct MetaWire {
    api_calls: usize,
    threshold: i64,
    mode: TravelMode,
}

impl From<&ResolveMeta> for MetaWire {
    fn from(meta: &ResolveMeta) -> Self {
        Self {
            api_calls: meta.api_calls,
            threshold: meta.threshold,
            mode: meta.mode,
        }
    }
}

/// Resolves travel distance from `origin` to each candidate and keeps those
/// within the threshold.
///
/// Never fails: every error path degrades to straight-line distance and is
/// reported through `status`.
pub fn filter_by_distance<C, M>(
    origin: Point,
    candidates: Vec<C>,
    matrix_provider: &M,
    options: &ResolveOptions,
) -> DistanceFilterResult<C>
where
    C: Candidate,
    M: DistanceMatrixProvider,
{
    let mode = options.travel_mode();
    let batch_size = options.batch_size.clamp(1, MATRIX_BATCH_SIZE);

    let mut located: Vec<(C, Point)> = Vec::with_capacity(candidates.len());
    let mut filtered_out_count = 0;
    for candidate in candidates {
        match candidate.location() {
            Some(point) => located.push((candidate, point)),
            None => filtered_out_count += 1,
        }
    }

    let destinations: Vec<Point> = located.iter().map(|(_, point)| *point).collect();
    let mut api_calls = 0;

    let (estimates, status) = match request_elements(
        origin,
        &destinations,
        matrix_provider,
        mode,
        batch_size,
        &mut api_calls,
    ) {
        Ok(elements) => resolve_elements(origin, &destinations, elements, mode),
        Err(err) => {
            warn!(error = %err, api_calls, "distance matrix failed, using straight-line distance");
            (
                haversine_estimates(origin, &destinations, mode),
                ResolutionStatus::Fallback(FallbackReason::MatrixFailed(err)),
            )
        }
    };

    let mut kept: Vec<(C, TravelEstimate)> = Vec::new();
    for ((candidate, _), estimate) in located.into_iter().zip(estimates) {
        if estimate.distance_meters <= options.threshold_meters {
            kept.push((candidate, estimate));
        } else {
            filtered_out_count += 1;
        }
    }

    kept.sort_by_key(|(_, estimate)| estimate.distance_meters);

    let places = kept
        .into_iter()
        .map(|(mut candidate, estimate)| {
            candidate.attach_travel(estimate);
            candidate
        })
        .collect();

    DistanceFilterResult {
        places,
        filtered_out_count,
        meta: ResolveMeta {
            api_calls,
            threshold: options.threshold_meters,
            mode,
        },
        status,
    }
}

/// Issues one request per batch, in order, stopping at the first failure.
fn request_elements<M: DistanceMatrixProvider>(
    origin: Point,
    destinations: &[Point],
    matrix_provider: &M,
    mode: TravelMode,
    batch_size: usize,
    api_calls: &mut usize,
) -> Result<Vec<MatrixElement>, MatrixError> {
    let mut elements = Vec::with_capacity(destinations.len());

    for (batch_index, batch) in destinations.chunks(batch_size).enumerate() {
        debug!(batch = batch_index, destinations = batch.len(), %mode, "requesting distance matrix batch");
        *api_calls += 1;

        let mut row = matrix_provider.matrix_row(origin, batch, mode)?;
        // a short row leaves the trailing destinations unresolved
        row.resize(
            batch.len(),
            MatrixElement::Unresolved {
                status: "MISSING".to_string(),
            },
        );
        elements.extend(row);
    }

    Ok(elements)
}

fn resolve_elements(
    origin: Point,
    destinations: &[Point],
    elements: Vec<MatrixElement>,
    mode: TravelMode,
) -> (Vec<TravelEstimate>, ResolutionStatus) {
    let unresolved = elements.iter().filter(|e| !e.is_resolved()).count();

    if !elements.is_empty() && unresolved == elements.len() {
        let reason = FallbackReason::AllElementsUnresolved {
            elements: elements.len(),
        };
        warn!(%reason, "using straight-line distance for every candidate");
        return (
            haversine_estimates(origin, destinations, mode),
            ResolutionStatus::Fallback(reason),
        );
    }

    let estimates = destinations
        .iter()
        .zip(elements)
        .map(|(destination, element)| match element {
            MatrixElement::Resolved {
                distance_meters,
                duration_seconds,
            } => TravelEstimate {
                distance_meters,
                duration_seconds: Some(duration_seconds),
                mode,
                source: DistanceSource::Matrix,
            },
            MatrixElement::Unresolved { status } => {
                debug!(%status, "destination unresolved, using straight-line distance");
                haversine::estimate(origin, *destination, mode)
            }
        })
        .collect();

    let status = if unresolved > 0 {
        warn!(unresolved, "some destinations fell back to straight-line distance");
        ResolutionStatus::PartialFallback { unresolved }
    } else {
        ResolutionStatus::Resolved
    };

    (estimates, status)
}

fn haversine_estimates(origin: Point, destinations: &[Point], mode: TravelMode) -> Vec<TravelEstimate> {
    destinations
        .iter()
        .map(|destination| haversine::estimate(origin, *destination, mode))
        .collect()
}
