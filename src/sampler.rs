//! Route sampling: pick a handful of search centers along a route.
//!
//! Two modes. Straight-line mode spaces points evenly between start and end.
//! Polyline mode walks real geometry and emits a vertex each time an
//! adaptive interval has been covered, keeping the sample count near 20 no
//! matter how long the route is.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::haversine::{distance_meters, interpolate, Point};
use crate::polyline::Polyline;

/// Interior samples the adaptive interval aims for on long routes.
pub const MAX_INTERIOR_SAMPLES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StraightLineOptions {
    /// Spacing between samples in meters.
    pub interval_meters: u64,
    pub search_radius_meters: u64,
}

impl Default for StraightLineOptions {
    fn default() -> Self {
        Self {
            interval_meters: 5000,
            search_radius_meters: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolylineOptions {
    pub search_radius_meters: u64,
}

impl Default for PolylineOptions {
    fn default() -> Self {
        Self {
            search_radius_meters: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplingError {
    TooFewPoints { found: usize },
}

impl fmt::Display for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingError::TooFewPoints { found } => {
                write!(f, "route geometry needs at least 2 points, got {}", found)
            }
        }
    }
}

impl std::error::Error for SamplingError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLabel {
    Start,
    /// 1-based index of an interior sample.
    Segment(usize),
    End,
}

impl fmt::Display for SampleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleLabel::Start => f.write_str("start"),
            SampleLabel::Segment(index) => write!(f, "segment_{}", index),
            SampleLabel::End => f.write_str("end"),
        }
    }
}

impl Serialize for SampleLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A sample point with its distance along the route in whole meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSample {
    pub point: Point,
    pub distance_from_start: u64,
    pub label: SampleLabel,
}

/// One search center in the wire format, where `point` is `{x: lng, y: lat}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    #[serde(serialize_with = "serialize_xy")]
    pub point: Point,
    pub search_radius: u64,
    pub distance_from_start: u64,
    pub label: SampleLabel,
}

fn serialize_xy<S: Serializer>(point: &Point, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Xy {
        x: f64,
        y: f64,
    }

    Xy {
        x: point.lng,
        y: point.lat,
    }
    .serialize(serializer)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentedRoute {
    pub total_distance: u64,
    /// Spans between consecutive samples.
    pub num_segments: usize,
    pub interval: u64,
    pub search_radius: u64,
    pub segments: Vec<RouteSegment>,
}

impl SegmentedRoute {
    fn from_samples(
        total_distance: f64,
        interval: u64,
        search_radius: u64,
        samples: Vec<RouteSample>,
    ) -> Self {
        Self {
            total_distance: total_distance.round() as u64,
            num_segments: samples.len().saturating_sub(1),
            interval,
            search_radius,
            segments: samples
                .into_iter()
                .map(|sample| RouteSegment {
                    point: sample.point,
                    search_radius,
                    distance_from_start: sample.distance_from_start,
                    label: sample.label,
                })
                .collect(),
        }
    }
}

/// Evenly spaced samples on the straight line from `start` to `end`.
pub fn segment_straight_line(start: Point, end: Point, options: StraightLineOptions) -> SegmentedRoute {
    let interval = options.interval_meters.max(1);
    let total_distance = distance_meters(start, end);
    let num_segments = ((total_distance / interval as f64).floor() as usize).max(1);

    let mut samples = Vec::with_capacity(num_segments + 1);
    samples.push(RouteSample {
        point: start,
        distance_from_start: 0,
        label: SampleLabel::Start,
    });

    for i in 1..num_segments {
        let fraction = i as f64 / num_segments as f64;
        samples.push(RouteSample {
            point: interpolate(start, end, fraction),
            distance_from_start: (total_distance * fraction).round() as u64,
            label: SampleLabel::Segment(i),
        });
    }

    samples.push(RouteSample {
        point: end,
        distance_from_start: total_distance.round() as u64,
        label: SampleLabel::End,
    });

    SegmentedRoute::from_samples(total_distance, interval, options.search_radius_meters, samples)
}

/// Sampling interval that covers the route with touching search circles,
/// widened on long routes so about `MAX_INTERIOR_SAMPLES` suffice.
pub fn optimal_interval(total_distance: f64, search_radius_meters: u64) -> u64 {
    let max_coverage = 2 * search_radius_meters;
    let capped = (total_distance / MAX_INTERIOR_SAMPLES as f64).ceil() as u64;

    if max_coverage == 0 {
        return capped.max(1);
    }

    let min_points = (total_distance / max_coverage as f64).ceil() as usize;
    if min_points <= MAX_INTERIOR_SAMPLES {
        max_coverage
    } else {
        capped.max(1)
    }
}

/// Samples vertices along real route geometry.
///
/// The accumulator restarts at each emitted sample, so spacing is roughly
/// (not exactly) `interval`. The first and last vertices are always emitted.
pub fn sample_along_polyline(
    polyline: &Polyline,
    options: PolylineOptions,
) -> Result<Vec<RouteSample>, SamplingError> {
    let points = polyline.points();
    if points.len() < 2 {
        return Err(SamplingError::TooFewPoints { found: points.len() });
    }

    let total_distance = polyline.length_meters();
    let interval = optimal_interval(total_distance, options.search_radius_meters) as f64;
    let last_index = points.len() - 1;

    let mut samples = Vec::with_capacity(MAX_INTERIOR_SAMPLES + 2);
    samples.push(RouteSample {
        point: points[0],
        distance_from_start: 0,
        label: SampleLabel::Start,
    });

    let mut accumulated = 0.0;
    let mut travelled = 0.0;
    let mut segment_index = 1;

    for i in 1..last_index {
        let step = distance_meters(points[i - 1], points[i]);
        accumulated += step;
        travelled += step;

        if accumulated >= interval && segment_index <= MAX_INTERIOR_SAMPLES {
            samples.push(RouteSample {
                point: points[i],
                distance_from_start: (travelled.round() as u64).min(total_distance.round() as u64),
                label: SampleLabel::Segment(segment_index),
            });
            segment_index += 1;
            accumulated = 0.0;
        }
    }

    samples.push(RouteSample {
        point: points[last_index],
        distance_from_start: total_distance.round() as u64,
        label: SampleLabel::End,
    });

    Ok(samples)
}

/// Polyline-aware segmentation in the same wire shape as `segment_straight_line`.
pub fn segment_polyline(
    polyline: &Polyline,
    options: PolylineOptions,
) -> Result<SegmentedRoute, SamplingError> {
    let samples = sample_along_polyline(polyline, options)?;
    let total_distance = polyline.length_meters();
    let interval = optimal_interval(total_distance, options.search_radius_meters);

    Ok(SegmentedRoute::from_samples(
        total_distance,
        interval,
        options.search_radius_meters,
        samples,
    ))
}

/// One keyword search to run at a sampled center.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPlan {
    /// 1-based.
    pub step: usize,
    pub center: Point,
    pub radius: u64,
    pub label: SampleLabel,
    pub distance_from_start: u64,
}

pub fn search_plans(route: &SegmentedRoute) -> Vec<SearchPlan> {
    route
        .segments
        .iter()
        .enumerate()
        .map(|(index, segment)| SearchPlan {
            step: index + 1,
            center: segment.point,
            radius: segment.search_radius,
            label: segment.label,
            distance_from_start: segment.distance_from_start,
        })
        .collect()
}
