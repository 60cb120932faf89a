//! Coordinate types for geographic and scene-local positions
//!
//! This module provides types for representing geographic coordinates (latitude/longitude),
//! timestamped GPS fixes, and the local Cartesian coordinates the AR scene renders in.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters, shared by the haversine distance and the local projection.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geographic coordinate using WGS84 datum (latitude/longitude)
///
/// This is the standard coordinate system used by GPS and most mapping services.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoord {
    /// Latitude in degrees (-90 to 90, positive = north)
    pub lat: f64,
    /// Longitude in degrees (-180 to 180, positive = east)
    pub lng: f64,
}

impl GeoCoord {
    /// Create a new geographic coordinate
    ///
    /// # Arguments
    /// * `lat` - Latitude in degrees (-90 to 90)
    /// * `lng` - Longitude in degrees (-180 to 180)
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check if the coordinate is finite and within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance to another coordinate in meters
    /// using the Haversine formula
    pub fn distance_to(&self, other: &GeoCoord) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_M * c
    }

    /// Initial bearing toward another coordinate in degrees (0 = North, 90 = East)
    pub fn bearing_to(&self, other: &GeoCoord) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let y = dlng.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();
        y.atan2(x).to_degrees().rem_euclid(360.0)
    }
}

impl Default for GeoCoord {
    fn default() -> Self {
        // Default to null island (0, 0)
        Self { lat: 0.0, lng: 0.0 }
    }
}

/// A single sample from the location sensor
///
/// Immutable once captured. The first fix of a session becomes the projection origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    /// Position of the fix
    pub coord: GeoCoord,
    /// Capture time in milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    /// Reported horizontal accuracy in meters, if the platform provides one
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

impl GeoFix {
    /// Create a fix without an accuracy estimate
    pub fn new(lat: f64, lng: f64, timestamp_ms: u64) -> Self {
        Self {
            coord: GeoCoord::new(lat, lng),
            timestamp_ms,
            accuracy_m: None,
        }
    }

    /// Attach a horizontal accuracy estimate
    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    pub fn lat(&self) -> f64 {
        self.coord.lat
    }

    pub fn lng(&self) -> f64 {
        self.coord.lng
    }

    /// Age of this fix relative to `now_ms`, saturating at zero for fixes from the future
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp_ms)
    }
}

/// Scene-space Cartesian position
///
/// Right-handed, +Y up, +X east and -Z north, in meters relative to the
/// session origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalPosition {
    /// East offset in meters
    pub x: f32,
    /// Height in meters
    pub y: f32,
    /// South offset in meters (north is -Z)
    pub z: f32,
}

impl LocalPosition {
    /// Create a new local position
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Create from a glam Vec3
    pub fn from_vec3(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }

    /// Convert to a glam Vec3
    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Distance to another local position
    pub fn distance_to(&self, other: &LocalPosition) -> f32 {
        self.to_vec3().distance(other.to_vec3())
    }

    /// Same position raised by `height` meters
    pub fn with_height(mut self, height: f32) -> Self {
        self.y = height;
        self
    }
}

impl From<Vec3> for LocalPosition {
    fn from(v: Vec3) -> Self {
        Self::from_vec3(v)
    }
}

impl From<LocalPosition> for Vec3 {
    fn from(c: LocalPosition) -> Self {
        c.to_vec3()
    }
}

/// Projection for converting between geographic and local coordinates
pub trait Projection {
    /// Convert geographic coordinates to local scene coordinates
    fn geo_to_local(&self, geo: &GeoCoord) -> LocalPosition;

    /// Convert local scene coordinates back to geographic coordinates
    fn local_to_geo(&self, local: &LocalPosition) -> GeoCoord;
}

/// Equirectangular projection around a fixed origin
///
/// Accurate to well under a meter over the few hundred meters markers are
/// placed at. Longitude deltas are wrapped so an origin next to the
/// antimeridian has no seam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    /// Origin point in geographic coordinates
    pub origin: GeoCoord,
    /// Meters per scene unit
    pub scale: f32,
    cos_origin_lat: f64,
}

impl LocalProjection {
    /// Create a new local projection centered on the given origin
    ///
    /// # Arguments
    /// * `origin` - Center point in geographic coordinates
    /// * `scale` - Meters per scene unit (1.0 for 1 meter = 1 unit)
    pub fn new(origin: GeoCoord, scale: f32) -> Self {
        Self {
            origin,
            scale,
            cos_origin_lat: origin.lat.to_radians().cos(),
        }
    }
}

impl Default for LocalProjection {
    fn default() -> Self {
        Self::new(GeoCoord::default(), 1.0)
    }
}

/// Wrap a longitude delta into [-180, 180)
fn wrap_lng_delta(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Wrap an absolute longitude into [-180, 180]
fn wrap_lng(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        wrap_lng_delta(lng)
    }
}

impl Projection for LocalProjection {
    fn geo_to_local(&self, geo: &GeoCoord) -> LocalPosition {
        let dlat = (geo.lat - self.origin.lat).to_radians();
        let dlng = wrap_lng_delta(geo.lng - self.origin.lng).to_radians();

        let north = dlat * EARTH_RADIUS_M;
        let east = dlng * EARTH_RADIUS_M * self.cos_origin_lat;

        let scale = self.scale as f64;
        LocalPosition::new((east / scale) as f32, 0.0, (-north / scale) as f32)
    }

    fn local_to_geo(&self, local: &LocalPosition) -> GeoCoord {
        let scale = self.scale as f64;
        let east = local.x as f64 * scale;
        let north = -(local.z as f64) * scale;

        let dlat = (north / EARTH_RADIUS_M).to_degrees();
        let dlng = if self.cos_origin_lat.abs() > f64::EPSILON {
            (east / (EARTH_RADIUS_M * self.cos_origin_lat)).to_degrees()
        } else {
            0.0
        };

        GeoCoord::new(self.origin.lat + dlat, wrap_lng(self.origin.lng + dlng))
    }
}
