//! Location-based AR session
//!
//! Geo-anchored coin markers rendered over live camera video, with the
//! virtual camera driven by device orientation and GPS.
//!
//! # Modules
//!
//! - [`session`]: Permission sequence, runtime construction, and the frame loop
//! - [`state`]: Permission steps and the UI-facing session state
//! - [`orientation`]: Device orientation applied to the camera
//! - [`marker`]: Coin markers and the marker side table
//! - [`picking`]: Hover and tap selection by ray casting
//! - [`guide`]: Curved path to the nearest coin
//! - [`collect`]: Collection animation
//! - [`pins`]: Pin records and the pin service trait
//! - [`http`]: HTTP pin service client
//! - [`prompt`]: Gesture-gated permission prompt
//! - [`config`]: Session and service configuration
//!
//! # Example
//!
//! ```no_run
//! use geoar::{ArConfig, ArSession, InMemoryPinService, NearbyPins};
//! use devices::MockPlatform;
//! use std::rc::Rc;
//!
//! # async fn run() -> geoar::Result<()> {
//! let mock = MockPlatform::new();
//! let service = Rc::new(InMemoryPinService::new(NearbyPins::default()));
//! let (session, mut events) =
//!     ArSession::builder(mock.platform(), service, ArConfig::default()).build();
//!
//! session.start().await?;
//! session.frame(1.0 / 60.0)?;
//! while let Ok(event) = events.try_recv() {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod collect;
pub mod config;
pub mod error;
pub mod events;
pub mod guide;
pub mod http;
pub mod marker;
pub mod orientation;
pub mod picking;
pub mod pins;
pub mod prompt;
pub mod session;
pub mod state;

pub use collect::CollectAnimation;
pub use config::{ArConfig, CoinStyle, ServiceConfig};
pub use error::{ConfigError, Result, ServiceError, SessionError};
pub use events::SessionEvent;
pub use guide::{format_distance, GuideController, GuidePath};
pub use http::HttpPinService;
pub use marker::{MarkerAssets, MarkerEntity, MarkerRegistry, MarkerSlot};
pub use orientation::OrientationController;
pub use picking::{PickEvent, PickingController};
pub use pins::{eligible_pins, ConsumedLocation, InMemoryPinService, NearbyPins, PinRecord, PinService};
pub use prompt::PermissionPrompt;
pub use session::{ArSession, ArSessionBuilder, CollectedCallback, RendererFactory};
pub use state::{ErrorView, PermissionStep, SessionState, ERROR_HINT};
