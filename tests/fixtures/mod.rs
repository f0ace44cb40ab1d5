//! Test fixtures for route-sampler.
//!
//! Provides realistic test data including:
//! - Real Seoul-area locations (from OpenStreetMap)
//! - Raw upstream place records in Kakao and Google shapes

pub mod seoul_locations;

pub use seoul_locations::*;
