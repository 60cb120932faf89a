//! Orientation sensor abstractions
//!
//! This module provides the device-orientation reading delivered by the
//! platform and its conversion into a camera rotation, plus a compass
//! heading type used for direction labels.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// A device-orientation sample
///
/// Angles follow the W3C DeviceOrientation convention, in degrees:
/// - `alpha`: rotation around the Z axis (0-360, counter-clockwise from north when absolute)
/// - `beta`: front-to-back tilt around the X axis (-180 to 180)
/// - `gamma`: left-to-right tilt around the Y axis (-90 to 90)
///
/// Platforms report `None` for axes they cannot measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceOrientation {
    pub alpha: Option<f32>,
    pub beta: Option<f32>,
    pub gamma: Option<f32>,
    /// Whether alpha is referenced to magnetic north
    #[serde(default)]
    pub absolute: bool,
    /// Platform compass heading (0 = North, 90 = East), when provided separately
    #[serde(default)]
    pub compass_heading: Option<f32>,
}

impl DeviceOrientation {
    /// Create a sample from all three angles
    pub fn new(alpha: f32, beta: f32, gamma: f32) -> Self {
        Self {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
            absolute: false,
            compass_heading: None,
        }
    }

    /// Attach a platform compass heading
    pub fn with_compass_heading(mut self, heading: f32) -> Self {
        self.compass_heading = Some(heading);
        self.absolute = true;
        self
    }

    /// Alpha after applying the compass heading, if any
    ///
    /// Compass headings grow clockwise while alpha grows counter-clockwise.
    pub fn effective_alpha(&self) -> Option<f32> {
        match self.compass_heading {
            Some(heading) if heading.is_finite() => Some((360.0 - heading).rem_euclid(360.0)),
            _ => self.alpha,
        }
    }

    /// Returns true if every axis needed for a rotation is present and finite
    pub fn is_complete(&self) -> bool {
        [self.effective_alpha(), self.beta, self.gamma]
            .into_iter()
            .all(|v| v.is_some_and(f32::is_finite))
    }

    /// Convert to a camera rotation
    ///
    /// The scene is right-handed with +Y up and north along -Z. A device held
    /// upright facing north (alpha 0, beta 90, gamma 0) yields the identity.
    ///
    /// # Arguments
    /// * `screen_angle` - Screen orientation angle in degrees (0, 90, 180, 270)
    pub fn to_camera_rotation(&self, screen_angle: f32) -> Option<Quat> {
        if !self.is_complete() {
            return None;
        }
        let alpha = self.effective_alpha()?.to_radians();
        let beta = self.beta?.to_radians();
        let gamma = self.gamma?.to_radians();

        let device = Quat::from_euler(EulerRot::YXZ, alpha, beta, -gamma);
        // Camera looks out the back of the device, not out of the top
        let back_camera = Quat::from_rotation_x(-FRAC_PI_2);
        let screen = Quat::from_rotation_z(-screen_angle.to_radians());

        Some((device * back_camera * screen).normalize())
    }
}

/// Compass heading in degrees (0-360, 0 = North, 90 = East)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Heading(f32);

impl Heading {
    /// Create a heading, normalizing into [0, 360)
    pub fn new(degrees: f32) -> Self {
        Self(degrees.rem_euclid(360.0))
    }

    /// Heading of a scene-space direction, ignoring its vertical component
    pub fn from_direction(direction: Vec3) -> Self {
        Self::new(direction.x.atan2(-direction.z).to_degrees())
    }

    /// Heading the camera looks toward for the given rotation
    pub fn from_rotation(rotation: Quat) -> Self {
        Self::from_direction(rotation * Vec3::NEG_Z)
    }

    pub fn degrees(&self) -> f32 {
        self.0
    }

    /// Get the heading as a normalized direction vector (in XZ plane)
    ///
    /// Returns a vector pointing in the heading direction where:
    /// - (0, 0, -1) is North
    /// - (1, 0, 0) is East
    /// - (0, 0, 1) is South
    /// - (-1, 0, 0) is West
    pub fn direction(&self) -> Vec3 {
        let radians = self.0.to_radians();
        Vec3::new(radians.sin(), 0.0, -radians.cos())
    }

    /// Get cardinal direction as a string
    pub fn cardinal(&self) -> &'static str {
        match self.0.round() as i32 {
            338..=360 | 0..=22 => "N",
            23..=67 => "NE",
            68..=112 => "E",
            113..=157 => "SE",
            158..=202 => "S",
            203..=247 => "SW",
            248..=292 => "W",
            293..=337 => "NW",
            _ => "?",
        }
    }
}
