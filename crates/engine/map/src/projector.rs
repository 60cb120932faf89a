//! Session-scoped projection origin
//!
//! [`GeoProjector`] owns the origin of the local scene. The first fix of a
//! session establishes it; later calls to [`GeoProjector::set_origin`] are
//! ignored until [`GeoProjector::reset`] is called.

use crate::coords::{GeoCoord, GeoFix, LocalPosition, LocalProjection, Projection};
use tracing::{debug, info};

/// Errors raised when converting coordinates
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    /// No GPS fix has established the origin yet
    #[error("no projection origin has been established")]
    NoOrigin,

    /// The coordinate is not a valid WGS84 position
    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

/// Converts GPS coordinates to local scene coordinates around a fixed origin
#[derive(Debug, Clone, Default)]
pub struct GeoProjector {
    origin: Option<GeoFix>,
    projection: Option<LocalProjection>,
}

impl GeoProjector {
    /// Create a projector without an origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Establish the origin from the session's first fix
    ///
    /// Returns true if the origin was set by this call. Once an origin exists
    /// further calls are no-ops and return false.
    pub fn set_origin(&mut self, fix: GeoFix) -> bool {
        if self.origin.is_some() {
            debug!(lat = fix.lat(), lng = fix.lng(), "origin already set, ignoring fix");
            return false;
        }
        if !fix.coord.is_valid() {
            debug!(lat = fix.lat(), lng = fix.lng(), "ignoring invalid fix as origin");
            return false;
        }

        info!(lat = fix.lat(), lng = fix.lng(), "projection origin established");
        self.projection = Some(LocalProjection::new(fix.coord, 1.0));
        self.origin = Some(fix);
        true
    }

    /// Forget the origin so the next fix establishes a new one
    pub fn reset(&mut self) {
        self.origin = None;
        self.projection = None;
    }

    /// The origin fix, if established
    pub fn origin(&self) -> Option<&GeoFix> {
        self.origin.as_ref()
    }

    pub fn has_origin(&self) -> bool {
        self.origin.is_some()
    }

    /// Project a coordinate into the local scene
    ///
    /// Deterministic for a fixed origin: identical inputs always yield the same position.
    pub fn project(&self, lat: f64, lng: f64) -> Result<LocalPosition, ProjectionError> {
        let projection = self.projection.as_ref().ok_or(ProjectionError::NoOrigin)?;
        let coord = GeoCoord::new(lat, lng);
        if !coord.is_valid() {
            return Err(ProjectionError::InvalidCoordinate { lat, lng });
        }
        Ok(projection.geo_to_local(&coord))
    }

    /// Convert a local scene position back to a geographic coordinate
    pub fn unproject(&self, local: &LocalPosition) -> Result<GeoCoord, ProjectionError> {
        let projection = self.projection.as_ref().ok_or(ProjectionError::NoOrigin)?;
        Ok(projection.local_to_geo(local))
    }

    /// Haversine distance between two coordinates in meters
    pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
        GeoCoord::new(lat1, lng1).distance_to(&GeoCoord::new(lat2, lng2))
    }

    /// Haversine distance from the origin, if established
    pub fn distance_from_origin(&self, lat: f64, lng: f64) -> Option<f64> {
        self.origin
            .map(|o| Self::distance_meters(o.lat(), o.lng(), lat, lng))
    }
}
