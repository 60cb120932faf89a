//! Hover and tap selection of markers by ray casting
//!
//! Pointer events are reduced to pick triggers by [`PointerTracker`] and
//! resolved once per frame against the current camera. Hover and selection
//! are independent single values: a hover miss clears the hover, a tap miss
//! leaves the selection alone.

use crate::config::CoinStyle;
use crate::marker::MarkerRegistry;
use crate::pins::ConsumedLocation;
use devices::{PickTrigger, PointerEvent, PointerTracker, Viewport};
use glam::Vec2;
use renderer::{Camera, MarkerId, Raycaster, Scene};
use tracing::debug;

/// Outcome of resolving pointer input against the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickEvent {
    HoverChanged(Option<MarkerId>),
    Selected(MarkerId),
}

#[derive(Debug, Default)]
pub struct PickingController {
    tracker: PointerTracker,
    hover_at: Option<Vec2>,
    taps: Vec<Vec2>,
    hovered: Option<MarkerId>,
    selected: Option<MarkerId>,
}

impl PickingController {
    pub fn new(tap_slop: f32) -> Self {
        Self {
            tracker: PointerTracker::new(tap_slop),
            ..Self::default()
        }
    }

    /// Cast a ray through `pixel` and return the nearest marker hit
    ///
    /// Hits on child meshes resolve to the marker that owns them.
    pub fn pick<'a>(
        scene: &Scene,
        registry: &'a MarkerRegistry,
        camera: &Camera,
        viewport: &Viewport,
        pixel: Vec2,
    ) -> Option<(MarkerId, &'a ConsumedLocation)> {
        let candidates = registry.pick_candidates();
        if candidates.is_empty() {
            return None;
        }
        let (id, hit) = Raycaster::from_camera(camera, pixel, viewport).pick(scene, &candidates)?;
        let location = registry.location(id)?;
        debug!(marker = %id, distance = hit.distance, "picked marker");
        Some((id, location))
    }

    /// Queue pointer input for the next [`PickingController::update`]
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        for trigger in self.tracker.handle(event) {
            match trigger {
                PickTrigger::Hover(position) => self.hover_at = Some(position),
                PickTrigger::Tap(position) => self.taps.push(position),
                PickTrigger::ClearHover => self.hover_at = None,
            }
        }
    }

    /// Resolve queued input against the current frame
    ///
    /// Hover is re-evaluated every frame while the pointer is over the view,
    /// since markers and the camera move under a still pointer.
    pub fn update(
        &mut self,
        scene: &mut Scene,
        registry: &mut MarkerRegistry,
        camera: &Camera,
        viewport: &Viewport,
        style: &CoinStyle,
    ) -> Vec<PickEvent> {
        let mut events = Vec::new();

        let hovered = self
            .hover_at
            .and_then(|pixel| Self::pick(scene, registry, camera, viewport, pixel))
            .map(|(id, _)| id);
        if hovered != self.hovered {
            if let Some(entity) = self.hovered.and_then(|id| registry.entity(id)) {
                entity.hide_card(scene);
            }
            if let Some(id) = hovered {
                if let Some(entity) = registry.entity(id).copied() {
                    entity.show_card(scene, camera);
                }
                registry.mark_viewed(id);
            }
            self.hovered = hovered;
            events.push(PickEvent::HoverChanged(hovered));
        }

        for pixel in std::mem::take(&mut self.taps) {
            let Some((id, _)) = Self::pick(scene, registry, camera, viewport, pixel) else {
                continue;
            };
            if self.selected != Some(id) {
                if let Some(previous) = self.selected.and_then(|p| registry.entity(p)) {
                    previous.set_selected(scene, false, style);
                }
                if let Some(entity) = registry.entity(id) {
                    entity.set_selected(scene, true, style);
                }
                self.selected = Some(id);
            }
            registry.mark_viewed(id);
            events.push(PickEvent::Selected(id));
        }

        events
    }

    pub fn hovered(&self) -> Option<MarkerId> {
        self.hovered
    }

    pub fn selected(&self) -> Option<MarkerId> {
        self.selected
    }

    /// Drop references to a marker that left the scene
    pub fn forget(&mut self, id: MarkerId) {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
    }

    /// Reset pointer, hover, and selection state
    pub fn clear(&mut self) {
        self.tracker.clear();
        self.hover_at = None;
        self.taps.clear();
        self.hovered = None;
        self.selected = None;
    }
}
