//! Simulated platform
//!
//! [`MockPlatform`] implements every backend trait in-process. It records the
//! order of platform calls, counts live media tracks and attached listeners,
//! and lets callers script grant/deny outcomes and inject sensor data. It
//! backs the headless simulator and the test suites.

use crate::backend::{
    CameraBackend, DisplayBackend, GeolocationBackend, OrientationBackend, Platform, Timer,
};
use crate::camera::{VideoConstraints, VideoFrame, VideoSettings, VideoStream};
use crate::display::Viewport;
use crate::error::{CameraError, LocationError, OrientationError};
use crate::location::PositionOptions;
use crate::sensors::DeviceOrientation;
use crate::subscription::Subscription;
use async_trait::async_trait;
use geoar_map::GeoFix;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// A platform call recorded by [`MockPlatform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformCall {
    CameraOpen,
    CameraStop,
    OrientationPermission,
    OrientationSubscribe,
    OrientationUnsubscribe,
    LocationCurrent,
    LocationWatch,
    LocationUnwatch,
    ResizeSubscribe,
    ResizeUnsubscribe,
    Sleep(Duration),
}

/// Scripted outcomes for platform requests
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// Result of opening the camera
    pub camera: Result<VideoSettings, CameraError>,
    pub orientation_supported: bool,
    pub orientation_requires_permission: bool,
    /// Result of the orientation permission request
    pub orientation_permission: Result<(), OrientationError>,
    /// Result of a one-shot position request
    pub location: Result<GeoFix, LocationError>,
    /// Result of starting continuous tracking
    pub watch_location: Result<(), LocationError>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            camera: Ok(VideoSettings {
                width: 1280,
                height: 720,
            }),
            orientation_supported: true,
            orientation_requires_permission: false,
            orientation_permission: Ok(()),
            location: Ok(GeoFix::new(51.5007, -0.1246, 0)),
            watch_location: Ok(()),
        }
    }
}

struct MockState {
    behavior: RefCell<MockBehavior>,
    calls: RefCell<Vec<PlatformCall>>,
    active_tracks: Cell<usize>,
    orientation_listeners: Cell<usize>,
    location_watchers: Cell<usize>,
    resize_listeners: Cell<usize>,
    orientation_granted: Cell<bool>,
    orientation_revoked: Cell<bool>,
    screen_angle: Cell<f32>,
    orientation_tx: watch::Sender<Option<DeviceOrientation>>,
    location_tx: watch::Sender<Option<GeoFix>>,
    viewport_tx: watch::Sender<Viewport>,
    frame: RefCell<Option<VideoFrame>>,
    frame_sequence: Cell<u64>,
    clock_ms: Cell<u64>,
}

impl MockState {
    fn record(&self, call: PlatformCall) {
        debug!(?call, "mock platform call");
        self.calls.borrow_mut().push(call);
    }
}

fn decrement(cell: &Cell<usize>) {
    cell.set(cell.get().saturating_sub(1));
}

/// In-process implementation of every platform backend
#[derive(Clone)]
pub struct MockPlatform {
    state: Rc<MockState>,
}

impl MockPlatform {
    /// Create a platform that grants everything
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::default())
    }

    /// Create a platform with scripted outcomes
    pub fn with_behavior(behavior: MockBehavior) -> Self {
        let granted = !behavior.orientation_requires_permission;
        let (orientation_tx, _) = watch::channel(None);
        let (location_tx, _) = watch::channel(None);
        let (viewport_tx, _) = watch::channel(Viewport::default());

        Self {
            state: Rc::new(MockState {
                behavior: RefCell::new(behavior),
                calls: RefCell::new(Vec::new()),
                active_tracks: Cell::new(0),
                orientation_listeners: Cell::new(0),
                location_watchers: Cell::new(0),
                resize_listeners: Cell::new(0),
                orientation_granted: Cell::new(granted),
                orientation_revoked: Cell::new(false),
                screen_angle: Cell::new(0.0),
                orientation_tx,
                location_tx,
                viewport_tx,
                frame: RefCell::new(None),
                frame_sequence: Cell::new(0),
                clock_ms: Cell::new(1_700_000_000_000),
            }),
        }
    }

    /// Bundle this mock as every service of a [`Platform`]
    pub fn platform(&self) -> Platform {
        Platform {
            camera: Rc::new(self.clone()),
            orientation: Rc::new(self.clone()),
            geolocation: Rc::new(self.clone()),
            display: Rc::new(self.clone()),
            timer: Rc::new(self.clone()),
        }
    }

    /// Change scripted outcomes for subsequent requests
    pub fn update_behavior(&self, f: impl FnOnce(&mut MockBehavior)) {
        let mut behavior = self.state.behavior.borrow_mut();
        f(&mut behavior);
        if !behavior.orientation_requires_permission {
            self.state.orientation_granted.set(true);
        }
    }

    /// All recorded calls in order
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state.calls.borrow().clone()
    }

    /// Index of the first occurrence of `call`
    pub fn position_of(&self, call: PlatformCall) -> Option<usize> {
        self.state.calls.borrow().iter().position(|c| *c == call)
    }

    /// Number of times `call` was recorded
    pub fn count_of(&self, call: PlatformCall) -> usize {
        self.state.calls.borrow().iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&self) {
        self.state.calls.borrow_mut().clear();
    }

    /// Media tracks opened and not yet stopped
    pub fn active_tracks(&self) -> usize {
        self.state.active_tracks.get()
    }

    pub fn orientation_listeners(&self) -> usize {
        self.state.orientation_listeners.get()
    }

    pub fn location_watchers(&self) -> usize {
        self.state.location_watchers.get()
    }

    pub fn resize_listeners(&self) -> usize {
        self.state.resize_listeners.get()
    }

    /// Total of live tracks and attached listeners
    pub fn active_handles(&self) -> usize {
        self.active_tracks()
            + self.orientation_listeners()
            + self.location_watchers()
            + self.resize_listeners()
    }

    /// Deliver an orientation event
    pub fn push_orientation(&self, reading: DeviceOrientation) {
        self.state.orientation_tx.send_replace(Some(reading));
    }

    /// Deliver a GPS fix to position watchers
    pub fn push_fix(&self, fix: GeoFix) {
        self.state.location_tx.send_replace(Some(fix));
    }

    /// Deliver a solid-color video frame, returning its sequence number
    pub fn push_frame(&self, width: u32, height: u32, rgba: [u8; 4]) -> u64 {
        let sequence = self.state.frame_sequence.get() + 1;
        self.state.frame_sequence.set(sequence);
        *self.state.frame.borrow_mut() = Some(VideoFrame::solid(sequence, width, height, rgba));
        sequence
    }

    /// Resize the display
    pub fn resize(&self, viewport: Viewport) {
        self.state.viewport_tx.send_replace(viewport);
    }

    /// Withdraw a previously granted orientation permission
    pub fn revoke_orientation(&self) {
        self.state.orientation_granted.set(false);
        self.state.orientation_revoked.set(true);
    }

    pub fn set_screen_angle(&self, degrees: f32) {
        self.state.screen_angle.set(degrees);
    }

    /// Move the simulated clock forward
    pub fn advance_clock(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.state.clock_ms.set(self.state.clock_ms.get() + ms);
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPlatform")
            .field("calls", &self.state.calls.borrow().len())
            .field("active_tracks", &self.active_tracks())
            .field("orientation_listeners", &self.orientation_listeners())
            .field("location_watchers", &self.location_watchers())
            .field("resize_listeners", &self.resize_listeners())
            .finish()
    }
}

struct MockVideoStream {
    state: Rc<MockState>,
    settings: VideoSettings,
    live: bool,
}

impl VideoStream for MockVideoStream {
    fn settings(&self) -> VideoSettings {
        self.settings
    }

    fn latest_frame(&self) -> Option<VideoFrame> {
        if !self.live {
            return None;
        }
        self.state.frame.borrow().clone()
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            decrement(&self.state.active_tracks);
            self.state.record(PlatformCall::CameraStop);
        }
    }
}

impl Drop for MockVideoStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait(?Send)]
impl CameraBackend for MockPlatform {
    async fn open(&self, _constraints: VideoConstraints) -> Result<Box<dyn VideoStream>, CameraError> {
        self.state.record(PlatformCall::CameraOpen);
        let settings = self.state.behavior.borrow().camera.clone()?;
        self.state.active_tracks.set(self.state.active_tracks.get() + 1);
        Ok(Box::new(MockVideoStream {
            state: self.state.clone(),
            settings,
            live: true,
        }))
    }
}

#[async_trait(?Send)]
impl OrientationBackend for MockPlatform {
    fn is_supported(&self) -> bool {
        self.state.behavior.borrow().orientation_supported
    }

    fn requires_permission(&self) -> bool {
        self.state.behavior.borrow().orientation_requires_permission
    }

    async fn request_permission(&self) -> Result<(), OrientationError> {
        self.state.record(PlatformCall::OrientationPermission);
        if !self.is_supported() {
            return Err(OrientationError::Unsupported);
        }
        let result = self.state.behavior.borrow().orientation_permission.clone();
        if result.is_ok() {
            self.state.orientation_granted.set(true);
            self.state.orientation_revoked.set(false);
        }
        result
    }

    fn subscribe(&self) -> Result<Subscription<Option<DeviceOrientation>>, OrientationError> {
        if !self.is_supported() {
            return Err(OrientationError::Unsupported);
        }
        if self.state.orientation_revoked.get() {
            return Err(OrientationError::Revoked);
        }
        if self.requires_permission() && !self.state.orientation_granted.get() {
            return Err(OrientationError::PermissionDenied);
        }

        self.state.record(PlatformCall::OrientationSubscribe);
        let state = self.state.clone();
        state
            .orientation_listeners
            .set(state.orientation_listeners.get() + 1);
        let rx = state.orientation_tx.subscribe();
        Ok(Subscription::new(rx, move || {
            decrement(&state.orientation_listeners);
            state.record(PlatformCall::OrientationUnsubscribe);
        }))
    }

    fn screen_angle(&self) -> f32 {
        self.state.screen_angle.get()
    }
}

#[async_trait(?Send)]
impl GeolocationBackend for MockPlatform {
    async fn current_position(&self, _options: PositionOptions) -> Result<GeoFix, LocationError> {
        self.state.record(PlatformCall::LocationCurrent);
        self.state.behavior.borrow().location.clone()
    }

    fn watch_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Subscription<Option<GeoFix>>, LocationError> {
        self.state.behavior.borrow().watch_location.clone()?;

        self.state.record(PlatformCall::LocationWatch);
        let state = self.state.clone();
        state.location_watchers.set(state.location_watchers.get() + 1);
        let rx = state.location_tx.subscribe();
        Ok(Subscription::new(rx, move || {
            decrement(&state.location_watchers);
            state.record(PlatformCall::LocationUnwatch);
        }))
    }
}

impl DisplayBackend for MockPlatform {
    fn viewport(&self) -> Viewport {
        *self.state.viewport_tx.borrow()
    }

    fn subscribe_resize(&self) -> Subscription<Viewport> {
        self.state.record(PlatformCall::ResizeSubscribe);
        let state = self.state.clone();
        state.resize_listeners.set(state.resize_listeners.get() + 1);
        let rx = state.viewport_tx.subscribe();
        Subscription::new(rx, move || {
            decrement(&state.resize_listeners);
            state.record(PlatformCall::ResizeUnsubscribe);
        })
    }
}

#[async_trait(?Send)]
impl Timer for MockPlatform {
    async fn sleep(&self, duration: Duration) {
        self.state.record(PlatformCall::Sleep(duration));
        self.advance_clock(duration);
    }

    fn now_ms(&self) -> u64 {
        self.state.clock_ms.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_camera_tracks_counted() {
        let mock = MockPlatform::new();
        let mut stream = mock.open(VideoConstraints::default()).await.unwrap();
        assert_eq!(mock.active_tracks(), 1);
        assert_eq!(stream.settings().width, 1280);

        stream.stop();
        stream.stop();
        assert_eq!(mock.active_tracks(), 0);
        assert_eq!(mock.count_of(PlatformCall::CameraStop), 1);
    }

    #[tokio::test]
    async fn test_dropped_stream_releases_track() {
        let mock = MockPlatform::new();
        let stream = mock.open(VideoConstraints::default()).await.unwrap();
        drop(stream);
        assert_eq!(mock.active_tracks(), 0);
    }

    #[tokio::test]
    async fn test_camera_denied() {
        let mock = MockPlatform::new();
        mock.update_behavior(|b| b.camera = Err(CameraError::PermissionDenied));
        let result = mock.open(VideoConstraints::default()).await;
        assert!(matches!(result, Err(CameraError::PermissionDenied)));
        assert_eq!(mock.active_tracks(), 0);
    }

    #[tokio::test]
    async fn test_orientation_gated_until_granted() {
        let mock = MockPlatform::with_behavior(MockBehavior {
            orientation_requires_permission: true,
            ..Default::default()
        });
        assert!(matches!(
            mock.subscribe(),
            Err(OrientationError::PermissionDenied)
        ));

        mock.request_permission().await.unwrap();
        let sub = mock.subscribe().unwrap();
        assert_eq!(mock.orientation_listeners(), 1);

        mock.push_orientation(DeviceOrientation::new(10.0, 90.0, 0.0));
        assert_eq!(sub.latest().unwrap().alpha, Some(10.0));

        drop(sub);
        assert_eq!(mock.orientation_listeners(), 0);
    }

    #[test]
    fn test_revoked_orientation() {
        let mock = MockPlatform::new();
        mock.revoke_orientation();
        assert!(matches!(mock.subscribe(), Err(OrientationError::Revoked)));
    }

    #[test]
    fn test_location_watch_delivers_fixes() {
        let mock = MockPlatform::new();
        let mut sub = mock.watch_position(PositionOptions::default()).unwrap();
        assert_eq!(sub.take_changed(), None);

        mock.push_fix(GeoFix::new(1.0, 2.0, 3));
        assert_eq!(sub.take_changed(), Some(Some(GeoFix::new(1.0, 2.0, 3))));

        drop(sub);
        assert_eq!(mock.active_handles(), 0);
        assert_eq!(
            mock.calls(),
            vec![PlatformCall::LocationWatch, PlatformCall::LocationUnwatch]
        );
    }

    #[tokio::test]
    async fn test_sleep_advances_clock() {
        let mock = MockPlatform::new();
        let before = mock.now_ms();
        mock.sleep(Duration::from_millis(300)).await;
        assert_eq!(mock.now_ms() - before, 300);
    }

    #[tokio::test]
    async fn test_frames_only_visible_while_live() {
        let mock = MockPlatform::new();
        let mut stream = mock.open(VideoConstraints::default()).await.unwrap();
        assert!(stream.latest_frame().is_none());

        let seq = mock.push_frame(4, 4, [0, 0, 0, 255]);
        assert_eq!(stream.latest_frame().unwrap().sequence, seq);

        stream.stop();
        assert!(stream.latest_frame().is_none());
    }
}
