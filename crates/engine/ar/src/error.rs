//! Error types for the AR session

use devices::{CameraError, LocationError, OrientationError};
use renderer::RenderError;
use std::path::PathBuf;
use std::time::Duration;

/// Errors from the pin service collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The request could not be sent
    #[error("Request failed: {0}")]
    Request(String),

    /// Could not reach the server
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request exceeded its timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The server refused the action
    #[error("{0}")]
    Rejected(String),
}

impl ServiceError {
    /// Returns true if trying again later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Connection(_) | ServiceError::Timeout(_) => true,
            ServiceError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the AR session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Orientation(#[from] OrientationError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Another initialization is in flight
    #[error("Initialization already in progress")]
    AlreadyRunning,

    /// The attempt was superseded by a retry or teardown
    #[error("Initialization was cancelled")]
    Cancelled,

    /// The session has been torn down
    #[error("The AR session has ended")]
    Disposed,

    /// AR is not running yet
    #[error("AR is not ready yet")]
    NotReady,

    /// Manual collection is disabled for this location set
    #[error("Collecting is only available automatically here")]
    CollectUnavailable,

    #[error("No coin is selected")]
    NothingSelected,

    #[error("A coin is already being collected")]
    CollectInProgress,
}

impl SessionError {
    /// Text shown on the full-screen error view
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Camera(CameraError::PermissionDenied) => {
                "Camera access was denied. Allow camera access to use AR.".to_string()
            }
            SessionError::Camera(CameraError::NotFound) => {
                "No camera was found on this device.".to_string()
            }
            SessionError::Camera(CameraError::Unsupported) => {
                "Camera access is not supported here. Open this page over HTTPS.".to_string()
            }
            SessionError::Camera(e) => format!("Could not start the camera: {e}"),
            SessionError::Orientation(OrientationError::PermissionDenied) => {
                "Device orientation permission was denied. Allow motion and orientation access to use AR."
                    .to_string()
            }
            SessionError::Orientation(e) => format!("Device orientation is unavailable: {e}"),
            SessionError::Location(e) => format!("Location is unavailable: {e}"),
            SessionError::Render(e) => format!("Could not start the AR view: {e}"),
            SessionError::Service(e) => format!("Could not reach the server: {e}"),
            other => other.to_string(),
        }
    }
}

/// Result alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
