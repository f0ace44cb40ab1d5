//! Route geometry and the two upstream geometry formats.
//!
//! Google returns an encoded polyline string; Kakao returns flat
//! `[lng, lat, lng, lat, ...]` vertex arrays grouped per road inside route
//! sections. Both decode into the same `Polyline`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::haversine::{distance_meters, Point};

/// Encoded polyline values are degrees scaled by 1e5.
const ENCODED_PRECISION: f64 = 1e5;

/// Vertex comparison precision (6 decimal places).
const VERTEX_PRECISION: f64 = 1e6;

/// An ordered route geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Point>,
}

impl Polyline {
    /// Creates a new Polyline from decoded coordinate points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Returns a reference to the coordinate points.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consumes the polyline and returns the owned coordinate points.
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of consecutive great-circle distances, in meters.
    pub fn length_meters(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| distance_meters(pair[0], pair[1]))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolylineError {
    /// The string ended in the middle of a value.
    Truncated { offset: usize },
    /// A byte outside the printable range the format uses.
    InvalidByte { offset: usize, byte: u8 },
    /// A single value ran on for more 5-bit groups than fit in 64 bits.
    Overflow { offset: usize },
}

impl fmt::Display for PolylineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolylineError::Truncated { offset } => {
                write!(f, "encoded polyline truncated at offset {}", offset)
            }
            PolylineError::InvalidByte { offset, byte } => {
                write!(f, "invalid byte 0x{:02x} at offset {}", byte, offset)
            }
            PolylineError::Overflow { offset } => {
                write!(f, "encoded value overflows at offset {}", offset)
            }
        }
    }
}

impl std::error::Error for PolylineError {}

/// Decodes an encoded polyline string (lat, lng pairs at 1e5 precision).
pub fn decode(encoded: &str) -> Result<Polyline, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat = accumulate(lat, bytes, &mut index)?;
        lng = accumulate(lng, bytes, &mut index)?;
        points.push(Point {
            lat: lat as f64 / ENCODED_PRECISION,
            lng: lng as f64 / ENCODED_PRECISION,
        });
    }

    Ok(Polyline::new(points))
}

fn accumulate(current: i64, bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let offset = *index;
    let delta = next_value(bytes, index)?;
    current
        .checked_add(delta)
        .ok_or(PolylineError::Overflow { offset })
}

/// Reads one zig-zag encoded delta starting at `index`.
fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: u64 = 0;
    let mut shift = 0;

    loop {
        let offset = *index;
        let byte = *bytes.get(offset).ok_or(PolylineError::Truncated { offset })?;
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidByte { offset, byte });
        }
        if shift >= 64 {
            return Err(PolylineError::Overflow { offset });
        }
        *index += 1;

        let chunk = u64::from(byte - 63);
        // only four bits fit above bit 60
        if shift == 60 && chunk & 0x1f > 0xf {
            return Err(PolylineError::Overflow { offset });
        }
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    let value = (result >> 1) as i64;
    Ok(if result & 1 == 1 { !value } else { value })
}

/// One route section of a flat-vertex directions response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VertexSection {
    #[serde(default)]
    pub roads: Vec<VertexRoad>,
}

/// One road segment with its flat `[lng, lat, ...]` vertex array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VertexRoad {
    #[serde(default)]
    pub vertexes: Vec<f64>,
}

/// Flattens every road of every section into one polyline.
///
/// A vertex equal (at 6 decimals) to the one just emitted is dropped, which
/// removes the shared endpoint between consecutive roads. Non-adjacent
/// repeats are kept. A dangling odd value is ignored.
pub fn from_vertex_sections(sections: &[VertexSection]) -> Polyline {
    let mut points: Vec<Point> = Vec::new();
    let mut last_key: Option<(i64, i64)> = None;

    let vertices = sections
        .iter()
        .flat_map(|section| section.roads.iter())
        .flat_map(|road| road.vertexes.chunks_exact(2));

    for pair in vertices {
        let point = Point::new(pair[1], pair[0]);
        let key = vertex_key(point);
        if last_key == Some(key) {
            continue;
        }
        last_key = Some(key);
        points.push(point);
    }

    Polyline::new(points)
}

fn vertex_key(point: Point) -> (i64, i64) {
    (
        (point.lat * VERTEX_PRECISION).round() as i64,
        (point.lng * VERTEX_PRECISION).round() as i64,
    )
}
