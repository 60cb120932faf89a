//! AR session lifecycle
//!
//! [`ArSession`] runs the permission sequence (camera, then orientation, then
//! location), builds the AR runtime once it completes, and drives it one
//! frame at a time. Every resource the runtime holds is released when the
//! runtime is dropped, so retry, go-back, and dropping the last session
//! handle all take the same teardown path.
//!
//! The session is single-threaded: handles are cheap `Rc` clones and no
//! `RefCell` borrow is ever held across an `.await`.

use crate::collect::CollectAnimation;
use crate::config::ArConfig;
use crate::error::{Result, SessionError};
use crate::events::SessionEvent;
use crate::guide::GuideController;
use crate::marker::{MarkerAssets, MarkerRegistry};
use crate::orientation::OrientationController;
use crate::picking::{PickEvent, PickingController};
use crate::pins::{eligible_pins, ConsumedLocation, PinService};
use crate::prompt::PermissionPrompt;
use crate::state::{PermissionStep, SessionState};
use devices::{Heading, OrientationError, Platform, PointerEvent, Subscription, Viewport};
use futures::FutureExt;
use geoar_map::{GeoCoord, GeoFix, GeoProjector, LocalPosition};
use glam::{Vec2, Vec3};
use renderer::{
    Camera, CameraVideoCompositor, FrameRenderer, LineStrip, MarkerId, NullRenderer, RenderError,
    RenderFrame, Scene,
};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Builds the frame renderer once the viewport is known
pub type RendererFactory =
    Box<dyn Fn(&Viewport) -> std::result::Result<Box<dyn FrameRenderer>, RenderError>>;

/// Called once a collected coin's animation finishes
pub type CollectedCallback = Box<dyn Fn(&ConsumedLocation)>;

fn null_renderer(_: &Viewport) -> std::result::Result<Box<dyn FrameRenderer>, RenderError> {
    Ok(Box::new(NullRenderer::new()))
}

/// Everything that exists only while AR is running
struct ArRuntime {
    projector: GeoProjector,
    scene: Scene,
    camera: Camera,
    viewport: Viewport,
    video: CameraVideoCompositor,
    orientation: OrientationController,
    resize: Subscription<Viewport>,
    location: Option<Subscription<Option<GeoFix>>>,
    assets: MarkerAssets,
    markers: MarkerRegistry,
    picking: PickingController,
    guide: GuideController,
    collecting: Option<CollectAnimation>,
    single_ar: bool,
    pins_requested: bool,
    elapsed: f32,
    renderer: Box<dyn FrameRenderer>,
}

/// What one frame produced for the session to report
#[derive(Default)]
struct FrameOutput {
    picks: Vec<PickEvent>,
    collected: Option<ConsumedLocation>,
}

impl ArRuntime {
    fn step(&mut self, dt: f32, config: &ArConfig) -> FrameOutput {
        let mut output = FrameOutput::default();
        let style = &config.coin;
        self.elapsed += dt;

        if let Some(viewport) = self.resize.take_changed() {
            debug!(width = viewport.width, height = viewport.height, "viewport resized");
            self.viewport = viewport;
            self.camera.set_viewport(&viewport);
            self.video.resize(viewport);
            self.renderer.resize(viewport);
        }

        self.video.update();
        self.orientation.update(&mut self.camera);

        let collecting = self.collecting.as_ref().map(|c| c.marker());
        for entity in self.markers.entities() {
            if Some(entity.id()) != collecting {
                entity.animate(&mut self.scene, self.elapsed, style);
            }
            entity.update_billboard(&mut self.scene, &self.camera);
        }

        if let Some(animation) = self.collecting.as_mut() {
            let finished = match self.markers.entity(animation.marker()).copied() {
                Some(entity) => animation.step(&mut self.scene, &entity, &self.camera, dt, style),
                None => true,
            };
            if finished {
                if let Some(animation) = self.collecting.take() {
                    self.markers.remove(&mut self.scene, animation.marker());
                    self.picking.forget(animation.marker());
                    output.collected = Some(animation.location().clone());
                }
            }
        }

        self.guide.update(&self.scene, &self.markers, &self.camera);
        let lines: Vec<LineStrip> = self.guide.line_strip().into_iter().collect();

        let frame = RenderFrame {
            camera: &self.camera,
            scene: &self.scene,
            background: self.video.background(),
            cover: self.video.cover_fit(),
            lines: &lines,
        };
        if let Err(e) = self.renderer.render(&frame) {
            warn!(renderer = self.renderer.name(), error = %e, "frame render failed");
        }

        output.picks = self.picking.update(
            &mut self.scene,
            &mut self.markers,
            &self.camera,
            &self.viewport,
            style,
        );
        output
    }

    fn dispose(&mut self) {
        self.renderer.dispose();
        self.video.dispose();
        self.orientation.dispose();
        self.resize.detach();
        if let Some(mut location) = self.location.take() {
            location.detach();
        }
        self.markers.dispose_all(&mut self.scene);
        self.scene.clear();
        self.picking.clear();
        self.guide.clear();
        self.collecting = None;
    }
}

impl Drop for ArRuntime {
    fn drop(&mut self) {
        self.dispose();
        debug!("AR runtime released");
    }
}

struct SessionInner {
    platform: Platform,
    service: Rc<dyn PinService>,
    config: ArConfig,
    events: mpsc::UnboundedSender<SessionEvent>,
    prompt: PermissionPrompt,
    renderer_factory: RendererFactory,
    on_collected: Option<CollectedCallback>,
    state: RefCell<SessionState>,
    /// Attempt number of the sequence currently running
    in_flight: Cell<Option<u64>>,
    /// Bumped on every teardown; stale async work checks it after each await
    attempt: watch::Sender<u64>,
    runtime: RefCell<Option<ArRuntime>>,
    consuming: Cell<bool>,
    disposed: Cell<bool>,
}

/// Configures and creates an [`ArSession`]
pub struct ArSessionBuilder {
    platform: Platform,
    service: Rc<dyn PinService>,
    config: ArConfig,
    renderer_factory: Option<RendererFactory>,
    on_collected: Option<CollectedCallback>,
}

impl ArSessionBuilder {
    /// Use a custom renderer; the default draws nothing
    pub fn with_renderer<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Viewport) -> std::result::Result<Box<dyn FrameRenderer>, RenderError> + 'static,
    {
        self.renderer_factory = Some(Box::new(factory));
        self
    }

    /// Navigate away (or similar) once a collected coin's animation ends
    pub fn with_on_collected(mut self, callback: impl Fn(&ConsumedLocation) + 'static) -> Self {
        self.on_collected = Some(Box::new(callback));
        self
    }

    /// Create the session and the receiver for its UI events
    pub fn build(self) -> (ArSession, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (attempt, _) = watch::channel(0);
        let renderer_factory = self
            .renderer_factory
            .unwrap_or_else(|| Box::new(null_renderer));

        let inner = SessionInner {
            platform: self.platform,
            service: self.service,
            config: self.config,
            events,
            prompt: PermissionPrompt::new(),
            renderer_factory,
            on_collected: self.on_collected,
            state: RefCell::new(SessionState::new(0)),
            in_flight: Cell::new(None),
            attempt,
            runtime: RefCell::new(None),
            consuming: Cell::new(false),
            disposed: Cell::new(false),
        };
        (
            ArSession {
                inner: Rc::new(inner),
            },
            rx,
        )
    }
}

/// Handle on one AR session
#[derive(Clone)]
pub struct ArSession {
    inner: Rc<SessionInner>,
}

impl ArSession {
    pub fn builder(
        platform: Platform,
        service: Rc<dyn PinService>,
        config: ArConfig,
    ) -> ArSessionBuilder {
        ArSessionBuilder {
            platform,
            service,
            config,
            renderer_factory: None,
            on_collected: None,
        }
    }

    /// Run the permission sequence and build the AR runtime
    ///
    /// Returns [`SessionError::AlreadyRunning`] without doing anything while
    /// another attempt is in flight, and `Ok` without doing anything once the
    /// sequence has already completed or failed.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.disposed.get() {
            return Err(SessionError::Disposed);
        }
        let attempt = self.current_attempt();
        if inner.in_flight.get() == Some(attempt) {
            debug!(attempt, "initialization already in flight");
            return Err(SessionError::AlreadyRunning);
        }
        if inner.state.borrow().permission_step != PermissionStep::Requesting {
            debug!(attempt, "initialization already finished");
            return Ok(());
        }

        inner.in_flight.set(Some(attempt));
        let result = self.run_sequence(attempt).await;
        if inner.in_flight.get() == Some(attempt) {
            inner.in_flight.set(None);
        }

        match result {
            Ok(()) => Ok(()),
            Err(SessionError::Cancelled) => {
                info!(attempt, "initialization superseded");
                Err(SessionError::Cancelled)
            }
            Err(e) => {
                if self.current_attempt() == attempt {
                    self.fail(&e);
                }
                Err(e)
            }
        }
    }

    async fn run_sequence(&self, attempt: u64) -> Result<()> {
        let inner = &self.inner;
        let config = &inner.config;

        self.set_step(PermissionStep::Camera);
        CameraVideoCompositor::probe(inner.platform.camera.as_ref(), config.video_constraints())
            .await?;
        self.ensure_current(attempt)?;

        self.set_step(PermissionStep::Orientation);
        let mut orientation = OrientationController::new(
            inner.platform.orientation.clone(),
            config.orientation_smoothing,
        );
        if orientation.requires_permission() {
            let answer = inner.prompt.request();
            self.emit(SessionEvent::PromptRequested);
            let granted = answer.await.map_err(|_| SessionError::Cancelled)?;
            self.ensure_current(attempt)?;
            if !granted {
                return Err(OrientationError::PermissionDenied.into());
            }
            orientation.request_permission().await?;
            self.ensure_current(attempt)?;
        } else if !inner.platform.orientation.is_supported() {
            warn!("device orientation is not supported; the view will not follow the device");
        }

        self.set_step(PermissionStep::Location);
        let initial_fix = match inner
            .platform
            .geolocation
            .current_position(config.position_options())
            .await
        {
            Ok(fix) => Some(fix),
            Err(e) => {
                warn!(error = %e, "initial location unavailable, continuing without a fix");
                None
            }
        };
        self.ensure_current(attempt)?;

        self.set_step(PermissionStep::Complete);
        inner.platform.timer.sleep(config.settle_delay).await;
        self.ensure_current(attempt)?;

        self.construct(attempt, orientation).await?;
        if let Some(fix) = initial_fix {
            self.handle_fix(fix).await;
        }
        Ok(())
    }

    async fn construct(&self, attempt: u64, mut orientation: OrientationController) -> Result<()> {
        let inner = &self.inner;
        let config = &inner.config;
        let platform = &inner.platform;

        let viewport = platform.display.viewport();
        let video = CameraVideoCompositor::acquire(
            platform.camera.as_ref(),
            config.video_constraints(),
            viewport,
        )
        .await?;
        self.ensure_current(attempt)?;

        match orientation.init() {
            Ok(()) => {}
            Err(OrientationError::Unsupported) => {
                warn!("orientation sensors unavailable, camera will stay level");
            }
            Err(e) => return Err(e.into()),
        }

        let resize = platform.display.subscribe_resize();
        let location = match platform.geolocation.watch_position(config.position_options()) {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!(error = %e, "location tracking unavailable");
                None
            }
        };

        let mut renderer = (inner.renderer_factory)(&viewport)?;
        renderer.resize(viewport);

        let mut scene = Scene::new();
        let assets = MarkerAssets::new(&mut scene, &config.coin);
        let mut camera = Camera::new(Vec3::new(0.0, config.eye_height_m, 0.0));
        camera.set_viewport(&viewport);

        let runtime = ArRuntime {
            projector: GeoProjector::new(),
            scene,
            camera,
            viewport,
            video,
            orientation,
            resize,
            location,
            assets,
            markers: MarkerRegistry::new(),
            picking: PickingController::new(config.tap_slop_px),
            guide: GuideController::new(),
            collecting: None,
            single_ar: false,
            pins_requested: false,
            elapsed: 0.0,
            renderer,
        };
        info!(renderer = runtime.renderer.name(), "AR view constructed");
        *inner.runtime.borrow_mut() = Some(runtime);
        Ok(())
    }

    /// Apply a GPS fix
    ///
    /// The first fix establishes the projection origin and loads nearby pins.
    /// Later fixes only move the camera; placed markers keep their positions.
    pub async fn handle_fix(&self, fix: GeoFix) {
        let inner = &self.inner;
        let attempt = self.current_attempt();

        let origin = {
            let mut guard = inner.runtime.borrow_mut();
            let Some(rt) = guard.as_mut() else {
                debug!("ignoring fix before AR is running");
                return;
            };
            if rt.projector.set_origin(fix) {
                rt.scene.reproject_anchors(&rt.projector);
            }
            match rt.projector.project(fix.lat(), fix.lng()) {
                Ok(position) => {
                    rt.camera.position.x = position.x;
                    rt.camera.position.z = position.z;
                }
                Err(e) => {
                    warn!(error = %e, "ignoring unusable fix");
                    return;
                }
            }
            if rt.pins_requested {
                return;
            }
            let Some(origin) = rt.projector.origin().copied() else {
                return;
            };
            rt.pins_requested = true;
            origin
        };

        let result = inner.service.nearby_pins(origin).await;
        if self.ensure_current(attempt).is_err() {
            return;
        }

        let loaded = {
            let mut guard = inner.runtime.borrow_mut();
            let Some(rt) = guard.as_mut() else {
                return;
            };
            match result {
                Ok(nearby) => {
                    rt.single_ar = nearby.single_ar;
                    let ArRuntime {
                        scene,
                        assets,
                        markers,
                        projector,
                        ..
                    } = rt;
                    let created = markers.populate(
                        scene,
                        assets,
                        eligible_pins(&nearby.locations, &origin, inner.config.eligibility_radius_m),
                        projector,
                        &inner.config,
                    );
                    info!(
                        total = nearby.locations.len(),
                        placed = created,
                        radius_m = inner.config.eligibility_radius_m,
                        "nearby pins loaded"
                    );
                    Ok(markers.len())
                }
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, "failed to load nearby pins, will retry on next fix");
                    rt.pins_requested = false;
                    Err("Could not load nearby coins. Retrying when your location updates.")
                }
                Err(e) => {
                    error!(error = %e, "nearby pins refused");
                    Err("Could not load nearby coins.")
                }
            }
        };

        match loaded {
            Ok(count) => {
                inner.state.borrow_mut().coins_loaded = count;
                self.emit(SessionEvent::CoinsLoaded(count));
            }
            Err(message) => self.emit(SessionEvent::Alert(message.to_string())),
        }
    }

    /// Apply the latest tracked fix if it changed; returns true if one was applied
    pub async fn sync_location(&self) -> bool {
        let fix = {
            let mut guard = self.inner.runtime.borrow_mut();
            guard
                .as_mut()
                .and_then(|rt| rt.location.as_mut())
                .and_then(|location| location.take_changed())
                .flatten()
        };
        match fix {
            Some(fix) => {
                self.handle_fix(fix).await;
                true
            }
            None => false,
        }
    }

    /// Follow location updates until the session is torn down
    pub async fn run_location_updates(&self) {
        let Some(mut location) = self
            .inner
            .runtime
            .borrow()
            .as_ref()
            .and_then(|rt| rt.location.as_ref())
            .map(|s| s.receiver())
        else {
            return;
        };
        let mut attempt = self.inner.attempt.subscribe();

        loop {
            let changed = {
                let next_fix = location.changed().fuse();
                let torn_down = attempt.changed().fuse();
                futures::pin_mut!(next_fix, torn_down);
                futures::select_biased! {
                    result = next_fix => result.is_ok(),
                    _ = torn_down => false,
                }
            };
            if !changed {
                break;
            }
            let fix = *location.borrow_and_update();
            if let Some(fix) = fix {
                self.handle_fix(fix).await;
            }
        }
        debug!("location updates stopped");
    }

    /// Advance the AR view by `dt` seconds
    pub fn frame(&self, dt: f32) -> Result<()> {
        let inner = &self.inner;
        let output = {
            let mut guard = inner.runtime.borrow_mut();
            let rt = guard.as_mut().ok_or(SessionError::NotReady)?;
            let output = rt.step(dt, &inner.config);

            let mut state = inner.state.borrow_mut();
            for pick in &output.picks {
                match pick {
                    PickEvent::HoverChanged(id) => state.hovered_marker = *id,
                    PickEvent::Selected(id) => {
                        state.selected_pin = rt.markers.location(*id).map(|l| l.id().to_string());
                    }
                }
            }
            if output.collected.is_some() {
                state.coins_loaded = rt.markers.len();
                state.hovered_marker = rt.picking.hovered();
                if rt.picking.selected().is_none() {
                    state.selected_pin = None;
                }
            }
            output
        };

        for pick in output.picks {
            match pick {
                PickEvent::HoverChanged(id) => self.emit(SessionEvent::HoverChanged(id)),
                PickEvent::Selected(id) => self.emit(SessionEvent::Selected(id)),
            }
        }
        if let Some(location) = output.collected {
            info!(location = location.id(), "coin collected");
            self.emit(SessionEvent::Collected(location.id().to_string()));
            if let Some(callback) = &inner.on_collected {
                callback(&location);
            }
        }
        Ok(())
    }

    /// Feed pointer or touch input
    pub fn on_pointer(&self, event: PointerEvent) {
        if let Some(rt) = self.inner.runtime.borrow_mut().as_mut() {
            rt.picking.handle_pointer(event);
        }
    }

    /// Show or hide the path to the nearest coin; returns whether it is shown
    pub fn toggle_guide(&self) -> bool {
        self.inner
            .runtime
            .borrow_mut()
            .as_mut()
            .is_some_and(|rt| rt.guide.toggle())
    }

    pub fn clear_guide(&self) {
        if let Some(rt) = self.inner.runtime.borrow_mut().as_mut() {
            rt.guide.clear();
        }
    }

    /// Collect the selected coin
    ///
    /// On success the coin animates into the camera and is removed; the
    /// collected callback runs when the animation ends. On failure an alert
    /// is raised and the selection is kept so the user can try again.
    pub async fn collect_selected(&self) -> Result<()> {
        let inner = &self.inner;
        let (marker, location_id) = {
            let guard = inner.runtime.borrow();
            let rt = guard.as_ref().ok_or(SessionError::NotReady)?;
            if rt.single_ar {
                return Err(SessionError::CollectUnavailable);
            }
            if rt.collecting.is_some() || inner.consuming.get() {
                return Err(SessionError::CollectInProgress);
            }
            let marker = rt.picking.selected().ok_or(SessionError::NothingSelected)?;
            let location = rt
                .markers
                .location(marker)
                .ok_or(SessionError::NothingSelected)?;
            (marker, location.id().to_string())
        };

        let attempt = self.current_attempt();
        inner.consuming.set(true);
        let result = inner.service.consume(&location_id).await;
        inner.consuming.set(false);
        self.ensure_current(attempt)?;

        if let Err(e) = result {
            warn!(location = %location_id, error = %e, "collect failed");
            self.emit(SessionEvent::Alert(format!("Could not collect this coin: {e}")));
            return Err(e.into());
        }

        let mut guard = inner.runtime.borrow_mut();
        let rt = guard.as_mut().ok_or(SessionError::Disposed)?;
        let entity = rt.markers.entity(marker).copied();
        let location = rt.markers.location(marker).cloned();
        if let (Some(entity), Some(location)) = (entity, location) {
            rt.collecting = Some(CollectAnimation::new(
                &rt.scene,
                &entity,
                location,
                inner.config.collect_animation,
            ));
            info!(location = %location_id, "collect accepted");
        }
        Ok(())
    }

    /// Tear everything down and run the permission sequence again
    ///
    /// Returns [`SessionError::AlreadyRunning`] and leaves the session alone
    /// while an attempt is still in flight.
    pub async fn retry(&self) -> Result<()> {
        if self.inner.disposed.get() {
            return Err(SessionError::Disposed);
        }
        if let Some(attempt) = self.inner.in_flight.get() {
            debug!(attempt, "retry ignored, initialization in flight");
            return Err(SessionError::AlreadyRunning);
        }
        let retry_count = self.inner.state.borrow().retry_count + 1;
        info!(retry_count, "retrying AR initialization");
        self.teardown();
        *self.inner.state.borrow_mut() = SessionState::new(retry_count);
        self.start().await
    }

    /// Abandon the session
    pub fn go_back(&self) {
        info!("leaving AR view");
        self.dispose();
    }

    /// Release every resource; idempotent
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.teardown();
        info!("AR session disposed");
    }

    /// Answer the orientation permission prompt from the UI's click handler
    pub fn respond_to_prompt(&self, granted: bool) -> bool {
        self.inner.prompt.respond(granted)
    }

    pub fn is_prompt_pending(&self) -> bool {
        self.inner.prompt.is_pending()
    }

    fn teardown(&self) {
        let inner = &self.inner;
        inner.attempt.send_modify(|attempt| *attempt += 1);
        inner.prompt.cancel();
        inner.in_flight.set(None);
        inner.consuming.set(false);
        let runtime = inner.runtime.borrow_mut().take();
        if let Some(mut runtime) = runtime {
            runtime.dispose();
        }
    }

    fn current_attempt(&self) -> u64 {
        *self.inner.attempt.borrow()
    }

    fn ensure_current(&self, attempt: u64) -> Result<()> {
        if self.inner.disposed.get() || self.current_attempt() != attempt {
            Err(SessionError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_step(&self, step: PermissionStep) {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.permission_step.can_advance_to(step) {
                warn!(from = %state.permission_step, to = %step, "unexpected permission step");
            }
            state.set_step(step);
        }
        info!(step = %step, "permission step");
        self.emit(SessionEvent::StepChanged(step));
    }

    fn fail(&self, e: &SessionError) {
        let message = e.user_message();
        error!(error = %e, "AR initialization failed");
        let runtime = self.inner.runtime.borrow_mut().take();
        drop(runtime);
        {
            let mut state = self.inner.state.borrow_mut();
            state.fail(message.clone());
        }
        self.emit(SessionEvent::StepChanged(PermissionStep::Error));
        self.emit(SessionEvent::Error(message));
    }

    fn emit(&self, event: SessionEvent) {
        if self.inner.events.send(event).is_err() {
            debug!("session event dropped, no listener");
        }
    }

    pub fn config(&self) -> &ArConfig {
        &self.inner.config
    }

    /// Snapshot of the UI state
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.runtime.borrow().is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub fn marker_count(&self) -> usize {
        self.with_runtime(|rt| rt.markers.len()).unwrap_or(0)
    }

    /// Snapshot of the placed locations
    pub fn locations(&self) -> Vec<ConsumedLocation> {
        self.with_runtime(|rt| rt.markers.iter().map(|(_, s)| s.location.clone()).collect())
            .unwrap_or_default()
    }

    pub fn selected(&self) -> Option<MarkerId> {
        self.with_runtime(|rt| rt.picking.selected()).flatten()
    }

    pub fn hovered(&self) -> Option<MarkerId> {
        self.with_runtime(|rt| rt.picking.hovered()).flatten()
    }

    /// Whether the collect control should be offered
    pub fn can_collect(&self) -> bool {
        self.with_runtime(|rt| {
            !rt.single_ar && rt.collecting.is_none() && rt.picking.selected().is_some()
        })
        .unwrap_or(false)
    }

    pub fn is_collecting(&self) -> bool {
        self.with_runtime(|rt| rt.collecting.is_some()).unwrap_or(false)
    }

    pub fn origin(&self) -> Option<GeoFix> {
        self.with_runtime(|rt| rt.projector.origin().copied()).flatten()
    }

    /// Geographic position of the camera, once the origin is known
    pub fn camera_coord(&self) -> Option<GeoCoord> {
        self.with_runtime(|rt| {
            let position = LocalPosition::from_vec3(rt.camera.position);
            rt.projector.unproject(&position).ok()
        })
        .flatten()
    }

    pub fn camera(&self) -> Option<Camera> {
        self.with_runtime(|rt| rt.camera)
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.with_runtime(|rt| rt.viewport)
    }

    pub fn heading(&self) -> Option<Heading> {
        self.with_runtime(|rt| rt.orientation.heading()).flatten()
    }

    pub fn guide_label(&self) -> Option<String> {
        self.with_runtime(|rt| rt.guide.label().map(str::to_string)).flatten()
    }

    /// Scene position of the marker showing `pin_id`
    pub fn marker_position(&self, pin_id: &str) -> Option<Vec3> {
        self.with_runtime(|rt| {
            let id = rt.markers.find_by_pin(pin_id)?;
            rt.scene.world_position(rt.markers.entity(id)?.root())
        })
        .flatten()
    }

    /// Whether the info card of the marker showing `pin_id` is visible
    pub fn is_card_visible(&self, pin_id: &str) -> bool {
        self.with_runtime(|rt| {
            rt.markers
                .find_by_pin(pin_id)
                .and_then(|id| rt.markers.entity(id))
                .is_some_and(|entity| entity.is_card_visible(&rt.scene))
        })
        .unwrap_or(false)
    }

    /// Viewport pixel the marker showing `pin_id` is drawn at
    pub fn screen_position(&self, pin_id: &str) -> Option<Vec2> {
        let position = self.marker_position(pin_id)?;
        self.with_runtime(|rt| rt.camera.world_to_screen(position, &rt.viewport))
            .flatten()
    }

    fn with_runtime<T>(&self, f: impl FnOnce(&ArRuntime) -> T) -> Option<T> {
        self.inner.runtime.borrow().as_ref().map(f)
    }
}

impl fmt::Debug for ArSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArSession")
            .field("state", &*self.inner.state.borrow())
            .field("running", &self.is_running())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::{InMemoryPinService, NearbyPins};
    use devices::{MockPlatform, PlatformCall};

    fn session(mock: &MockPlatform) -> (ArSession, mpsc::UnboundedReceiver<SessionEvent>) {
        let service = Rc::new(InMemoryPinService::new(NearbyPins::default()));
        ArSession::builder(mock.platform(), service, ArConfig::default()).build()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_steps_reported_in_order() {
        let mock = MockPlatform::new();
        let (session, mut rx) = session(&mock);
        session.start().await.unwrap();

        let steps: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::StepChanged(step) => Some(step),
                _ => None,
            })
            .collect();
        assert_eq!(
            steps,
            [
                PermissionStep::Camera,
                PermissionStep::Orientation,
                PermissionStep::Location,
                PermissionStep::Complete,
            ]
        );
        assert!(session.is_running());
        assert!(!session.state().is_initializing);
        assert_eq!(
            mock.count_of(PlatformCall::Sleep(ArConfig::default().settle_delay)),
            1
        );
    }

    #[tokio::test]
    async fn test_start_after_complete_is_noop() {
        let mock = MockPlatform::new();
        let (session, _rx) = session(&mock);
        session.start().await.unwrap();
        let opens = mock.count_of(PlatformCall::CameraOpen);
        session.start().await.unwrap();
        assert_eq!(mock.count_of(PlatformCall::CameraOpen), opens);
    }

    #[tokio::test]
    async fn test_frame_before_start_is_not_ready() {
        let mock = MockPlatform::new();
        let (session, _rx) = session(&mock);
        assert!(matches!(session.frame(0.016), Err(SessionError::NotReady)));
        assert!(!session.toggle_guide());
    }

    #[tokio::test]
    async fn test_disposed_session_refuses_start() {
        let mock = MockPlatform::new();
        let (session, _rx) = session(&mock);
        session.dispose();
        session.dispose();
        assert!(matches!(session.start().await, Err(SessionError::Disposed)));
        assert!(matches!(session.retry().await, Err(SessionError::Disposed)));
    }

    #[tokio::test]
    async fn test_dropping_last_handle_releases_resources() {
        let mock = MockPlatform::new();
        let (session, _rx) = session(&mock);
        session.start().await.unwrap();
        assert!(mock.active_handles() > 0);
        drop(session);
        assert_eq!(mock.active_handles(), 0);
    }
}
