//! Platform device abstractions for location-based AR
//!
//! This crate provides platform-agnostic abstractions for the devices an AR
//! view depends on and can be compiled both natively and to WebAssembly.
//!
//! # Modules
//!
//! - [`camera`]: Rear-camera video constraints, settings, and frames
//! - [`sensors`]: Device-orientation readings and compass headings
//! - [`location`]: Geolocation request options
//! - [`display`]: Viewport size and pixel ratio
//! - [`pointer`]: Mouse and touch input reduced to hover and tap
//! - [`subscription`]: Latest-value listener handles
//! - [`backend`]: Platform backend traits
//! - [`mock`]: Simulated platform for headless runs and tests

pub mod backend;
pub mod camera;
pub mod display;
pub mod error;
pub mod location;
pub mod mock;
pub mod pointer;
pub mod sensors;
pub mod subscription;

// Re-export commonly used types at crate root
pub use backend::{
    CameraBackend, DisplayBackend, GeolocationBackend, OrientationBackend, Platform, Timer,
};
pub use camera::{FacingMode, VideoConstraints, VideoFrame, VideoSettings, VideoStream};
pub use display::Viewport;
pub use error::{CameraError, LocationError, OrientationError};
pub use location::PositionOptions;
pub use mock::{MockBehavior, MockPlatform, PlatformCall};
pub use pointer::{PickTrigger, PointerEvent, PointerKind, PointerPhase, PointerTracker};
pub use sensors::{DeviceOrientation, Heading};
pub use subscription::Subscription;
