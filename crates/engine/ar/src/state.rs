//! Session state machine
//!
//! ```text
//! requesting -> camera -> orientation -> location -> complete
//!      \___________\___________\___________\______-> error
//! ```

use renderer::MarkerId;
use std::fmt;

/// Static hint shown under every fatal error
pub const ERROR_HINT: &str = "AR needs a secure (HTTPS) connection and access to the camera, \
motion sensors, and location. Make sure you accept every prompt.";

/// Where the permission sequence currently is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PermissionStep {
    #[default]
    Requesting,
    Camera,
    Orientation,
    Location,
    Complete,
    Error,
}

impl PermissionStep {
    /// Steps that are still working toward a running session
    pub fn is_initializing(&self) -> bool {
        !matches!(self, PermissionStep::Complete | PermissionStep::Error)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_advance_to(&self, next: PermissionStep) -> bool {
        use PermissionStep::*;
        matches!(
            (self, next),
            (Requesting, Camera)
                | (Camera, Orientation)
                | (Orientation, Location)
                | (Location, Complete)
                | (Requesting | Camera | Orientation | Location | Complete, Error)
        )
    }

    /// Progress label for the loading screen
    pub fn label(&self) -> &'static str {
        match self {
            PermissionStep::Requesting => "Preparing AR...",
            PermissionStep::Camera => "Requesting camera access...",
            PermissionStep::Orientation => "Requesting motion sensor access...",
            PermissionStep::Location => "Finding your location...",
            PermissionStep::Complete => "Ready",
            PermissionStep::Error => "Something went wrong",
        }
    }
}

impl fmt::Display for PermissionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PermissionStep::Requesting => "requesting",
            PermissionStep::Camera => "camera",
            PermissionStep::Orientation => "orientation",
            PermissionStep::Location => "location",
            PermissionStep::Complete => "complete",
            PermissionStep::Error => "error",
        };
        f.write_str(name)
    }
}

/// Everything the UI renders from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub permission_step: PermissionStep,
    pub initialization_error: Option<String>,
    pub is_initializing: bool,
    pub coins_loaded: usize,
    /// Pin id of the selected marker
    pub selected_pin: Option<String>,
    pub hovered_marker: Option<MarkerId>,
    pub retry_count: u32,
}

impl SessionState {
    /// Fresh state for attempt number `retry_count`
    pub fn new(retry_count: u32) -> Self {
        Self {
            is_initializing: true,
            retry_count,
            ..Self::default()
        }
    }

    /// Move to `step`, keeping `is_initializing` in sync
    pub fn set_step(&mut self, step: PermissionStep) {
        self.permission_step = step;
        self.is_initializing = step.is_initializing();
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.initialization_error = Some(message.into());
        self.set_step(PermissionStep::Error);
    }

    pub fn is_ready(&self) -> bool {
        self.permission_step == PermissionStep::Complete
    }

    /// Contents of the full-screen error view, if the session failed
    pub fn error_view(&self) -> Option<ErrorView> {
        if self.permission_step != PermissionStep::Error {
            return None;
        }
        Some(ErrorView {
            message: self
                .initialization_error
                .clone()
                .unwrap_or_else(|| "AR could not be started.".to_string()),
            retry_label: format!("Retry (attempt {})", self.retry_count + 1),
            back_label: "Go Back",
            hint: ERROR_HINT,
        })
    }
}

/// What the error screen shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    pub message: String,
    pub retry_label: String,
    pub back_label: &'static str,
    pub hint: &'static str,
}
