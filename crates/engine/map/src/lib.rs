//! Geospatial projection for location-based AR
//!
//! This crate converts GPS fixes into the local Cartesian scene the AR view
//! renders in, and back.
//!
//! # Modules
//!
//! - [`coords`]: Coordinate types for geographic and scene-local positions
//! - [`projector`]: Session-scoped projection origin and haversine distance

pub mod coords;
pub mod projector;

pub use coords::{
    GeoCoord, GeoFix, LocalPosition, LocalProjection, Projection, EARTH_RADIUS_M,
};
pub use projector::{GeoProjector, ProjectionError};
