//! route-sampler core
//!
//! Samples search centers along a route, resolves travel distance from an
//! origin to candidate places with straight-line fallback, and reconciles
//! place records from Kakao and Google into one deduplicated set.

pub mod config;
pub mod traits;
pub mod haversine;
pub mod polyline;
pub mod sampler;
pub mod distance_matrix;
pub mod resolver;
pub mod place;
pub mod routes;
pub mod thumbnails;

pub use haversine::Point;
