//! Error types for platform device access

use std::time::Duration;

/// Errors raised while acquiring the camera stream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    /// The user or platform refused camera access
    #[error("Camera permission was denied")]
    PermissionDenied,

    /// No camera matching the constraints exists
    #[error("No camera was found on this device")]
    NotFound,

    /// The camera exists but another application holds it
    #[error("Camera is in use by another application")]
    NotReadable,

    /// Media capture is unavailable (insecure context or unsupported platform)
    #[error("Camera access is not supported in this context")]
    Unsupported,

    /// Any other platform failure
    #[error("Camera error: {0}")]
    Other(String),
}

/// Errors raised by the orientation sensor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrientationError {
    /// No orientation sensor on this device
    #[error("Device orientation sensors are not available")]
    Unsupported,

    /// The user refused the orientation permission prompt
    #[error("Device orientation permission was denied")]
    PermissionDenied,

    /// Permission was granted earlier but is no longer in effect
    #[error("Device orientation permission was revoked")]
    Revoked,
}

/// Errors raised by the location sensor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// The user refused the location prompt
    #[error("Location permission was denied")]
    PermissionDenied,

    /// The platform could not determine a position
    #[error("Location is unavailable")]
    Unavailable,

    /// No fix arrived within the requested timeout
    #[error("Location request timed out after {0:?}")]
    Timeout(Duration),

    /// Geolocation is not supported on this platform
    #[error("Geolocation is not supported")]
    Unsupported,
}

impl LocationError {
    /// Returns true if asking again later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, LocationError::Unavailable | LocationError::Timeout(_))
    }
}
