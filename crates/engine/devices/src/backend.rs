//! Platform backend traits
//!
//! This module defines the traits that platform-specific implementations
//! must provide (browser APIs under WebAssembly, native sensor stacks, or the
//! simulated [`crate::mock::MockPlatform`]).
//!
//! The AR core is single-threaded and cooperative, so every async method is
//! `?Send` and backends are shared through `Rc`.

use crate::camera::{VideoConstraints, VideoStream};
use crate::display::Viewport;
use crate::error::{CameraError, LocationError, OrientationError};
use crate::location::PositionOptions;
use crate::sensors::DeviceOrientation;
use crate::subscription::Subscription;
use async_trait::async_trait;
use geoar_map::GeoFix;
use std::rc::Rc;
use std::time::Duration;

/// Camera capture (e.g. `getUserMedia`)
#[async_trait(?Send)]
pub trait CameraBackend {
    /// Open a stream matching the constraints
    ///
    /// May wait indefinitely while the platform prompt is showing.
    async fn open(&self, constraints: VideoConstraints) -> Result<Box<dyn VideoStream>, CameraError>;
}

/// Device-orientation sensors
#[async_trait(?Send)]
pub trait OrientationBackend {
    /// Whether the device has orientation sensors at all
    fn is_supported(&self) -> bool;

    /// Whether the platform gates the sensors behind an explicit permission
    /// request made from a user gesture
    fn requires_permission(&self) -> bool;

    /// Ask for sensor access
    ///
    /// Must be called from within a user-gesture handler on gated platforms.
    async fn request_permission(&self) -> Result<(), OrientationError>;

    /// Start listening for orientation events
    fn subscribe(&self) -> Result<Subscription<Option<DeviceOrientation>>, OrientationError>;

    /// Current screen orientation angle in degrees (0, 90, 180, 270)
    fn screen_angle(&self) -> f32 {
        0.0
    }
}

/// Location services (e.g. `navigator.geolocation`)
#[async_trait(?Send)]
pub trait GeolocationBackend {
    /// Request a single fix honoring the timeout and maximum age
    async fn current_position(&self, options: PositionOptions) -> Result<GeoFix, LocationError>;

    /// Start continuous tracking; the subscription holds the latest fix
    fn watch_position(
        &self,
        options: PositionOptions,
    ) -> Result<Subscription<Option<GeoFix>>, LocationError>;
}

/// Display surface the AR view draws into
pub trait DisplayBackend {
    /// Current viewport size
    fn viewport(&self) -> Viewport;

    /// Start listening for resizes
    fn subscribe_resize(&self) -> Subscription<Viewport>;
}

/// Timing services
#[async_trait(?Send)]
pub trait Timer {
    /// Resolve after `duration`
    async fn sleep(&self, duration: Duration);

    /// Wall-clock time in milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;
}

/// The set of platform services an AR session runs against
#[derive(Clone)]
pub struct Platform {
    pub camera: Rc<dyn CameraBackend>,
    pub orientation: Rc<dyn OrientationBackend>,
    pub geolocation: Rc<dyn GeolocationBackend>,
    pub display: Rc<dyn DisplayBackend>,
    pub timer: Rc<dyn Timer>,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("orientation_supported", &self.orientation.is_supported())
            .field("viewport", &self.display.viewport())
            .finish_non_exhaustive()
    }
}
