//! Geo-anchored coin markers
//!
//! Each marker is a small subtree in the scene:
//!
//! ```text
//! root (tagged with MarkerId, anchored at the pin's lat/lng)
//! ├── coin       spinning, bobbing coin mesh
//! └── billboard  group rotated to face the camera every frame
//!     └── card   info card, hidden until hovered
//! ```
//!
//! Scene nodes only carry the [`MarkerId`]; the [`MarkerRegistry`] maps that id
//! to the marker's [`ConsumedLocation`].

use crate::config::{ArConfig, CoinStyle};
use crate::pins::{ConsumedLocation, PinRecord};
use geoar_map::{GeoProjector, ProjectionError};
use glam::{Quat, Vec3};
use renderer::{Camera, MarkerId, Mesh, MeshId, Node, NodeId, RenderError, Scene};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Radial segments of the coin mesh
const COIN_SEGMENTS: u32 = 32;

/// Meshes shared by every marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerAssets {
    pub coin: MeshId,
    pub card: MeshId,
}

impl MarkerAssets {
    pub fn new(scene: &mut Scene, style: &CoinStyle) -> Self {
        Self {
            coin: scene.add_mesh(Mesh::coin(style.radius, style.thickness, COIN_SEGMENTS)),
            card: scene.add_mesh(Mesh::quad(style.card_width, style.card_height)),
        }
    }
}

/// One AR coin in the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerEntity {
    id: MarkerId,
    root: NodeId,
    coin: NodeId,
    billboard: NodeId,
    card: NodeId,
    /// Animation phase so markers do not move in lockstep
    phase: f32,
}

impl MarkerEntity {
    /// Build the marker subtree at the location's geographic position
    pub fn spawn(
        scene: &mut Scene,
        assets: &MarkerAssets,
        id: MarkerId,
        location: &ConsumedLocation,
        projector: &GeoProjector,
        style: &CoinStyle,
    ) -> Result<Self, RenderError> {
        let pin = &location.pin;
        if !pin.coord().is_valid() {
            return Err(ProjectionError::InvalidCoordinate {
                lat: pin.lat,
                lng: pin.lng,
            }
            .into());
        }

        let root = scene.spawn(Node::new(format!("marker:{}", pin.id)).with_tag(id));
        match Self::build(scene, assets, id, root, location, projector, style) {
            Ok(entity) => Ok(entity),
            Err(e) => {
                scene.remove(root);
                Err(e)
            }
        }
    }

    fn build(
        scene: &mut Scene,
        assets: &MarkerAssets,
        id: MarkerId,
        root: NodeId,
        location: &ConsumedLocation,
        projector: &GeoProjector,
        style: &CoinStyle,
    ) -> Result<Self, RenderError> {
        scene.anchor_at_geo(root, location.pin.coord(), style.hover_height, projector)?;

        let coin = scene.spawn_child(
            root,
            Node::new("coin")
                .with_mesh(assets.coin)
                .with_color(style.color),
        )?;
        let billboard = scene.spawn_child(root, Node::new("billboard"))?;
        let card = scene.spawn_child(
            billboard,
            Node::new("card")
                .with_mesh(assets.card)
                .with_color(style.card_color)
                .with_translation(Vec3::Y * style.card_offset),
        )?;
        if let Some(node) = scene.node_mut(card) {
            node.visible = false;
        }

        Ok(Self {
            id,
            root,
            coin,
            billboard,
            card,
            phase: (id.0 as f32 * 1.618).fract() * std::f32::consts::TAU,
        })
    }

    pub fn id(&self) -> MarkerId {
        self.id
    }

    /// Root node carrying the marker tag; used as the picking candidate
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node holding the coin mesh
    pub fn mesh(&self) -> NodeId {
        self.coin
    }

    pub fn billboard_group(&self) -> NodeId {
        self.billboard
    }

    pub fn card(&self) -> NodeId {
        self.card
    }

    /// Rotate the billboard group so it faces the camera
    ///
    /// The group is a sibling of the coin, so the coin's spin never reaches it.
    pub fn update_billboard(&self, scene: &mut Scene, camera: &Camera) {
        let parent_rotation = scene
            .world_matrix(self.root)
            .map(|m| m.to_scale_rotation_translation().1)
            .unwrap_or(Quat::IDENTITY);
        if let Some(node) = scene.node_mut(self.billboard) {
            node.transform.rotation = (parent_rotation.inverse() * camera.rotation).normalize();
        }
    }

    /// Spin and bob the coin
    pub fn animate(&self, scene: &mut Scene, elapsed: f32, style: &CoinStyle) {
        if let Some(node) = scene.node_mut(self.coin) {
            node.transform.rotation = Quat::from_rotation_y(elapsed * style.spin_speed + self.phase);
            node.transform.translation.y =
                (elapsed * style.bob_speed + self.phase).sin() * style.bob_amplitude;
        }
    }

    /// Show the info card facing the camera
    pub fn show_card(&self, scene: &mut Scene, camera: &Camera) {
        self.update_billboard(scene, camera);
        self.set_card_visible(scene, true);
    }

    pub fn hide_card(&self, scene: &mut Scene) {
        self.set_card_visible(scene, false);
    }

    fn set_card_visible(&self, scene: &mut Scene, visible: bool) {
        if let Some(node) = scene.node_mut(self.card) {
            node.visible = visible;
        }
    }

    pub fn is_card_visible(&self, scene: &Scene) -> bool {
        scene.node(self.card).is_some_and(|n| n.visible)
    }

    /// Highlight the coin while it is the selected marker
    pub fn set_selected(&self, scene: &mut Scene, selected: bool, style: &CoinStyle) {
        if let Some(node) = scene.node_mut(self.coin) {
            node.color = if selected {
                style.selected_color
            } else {
                style.color
            };
        }
    }

    /// Remove the whole subtree from the scene
    pub fn dispose(&self, scene: &mut Scene) -> bool {
        scene.remove(self.root)
    }
}

/// A marker and the location it represents
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSlot {
    pub entity: MarkerEntity,
    pub location: ConsumedLocation,
}

/// Side table from marker id to its entity and location
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    slots: BTreeMap<MarkerId, MarkerSlot>,
    next_id: u64,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn one marker per pin
    ///
    /// Pins that fail to build are logged and skipped. Returns how many
    /// markers were created.
    pub fn populate<'a>(
        &mut self,
        scene: &mut Scene,
        assets: &MarkerAssets,
        pins: impl IntoIterator<Item = &'a PinRecord>,
        projector: &GeoProjector,
        config: &ArConfig,
    ) -> usize {
        let mut created = 0;
        for pin in pins {
            if !pin.is_valid() {
                warn!(id = %pin.id, lat = pin.lat, lng = pin.lng, "skipping malformed pin");
                continue;
            }
            let location = ConsumedLocation::from_pin(pin.clone(), config);
            let id = MarkerId(self.next_id);
            match MarkerEntity::spawn(scene, assets, id, &location, projector, &config.coin) {
                Ok(entity) => {
                    self.next_id += 1;
                    debug!(marker = %id, pin = %pin.id, "marker placed");
                    self.slots.insert(id, MarkerSlot { entity, location });
                    created += 1;
                }
                Err(e) => warn!(pin = %pin.id, error = %e, "failed to build marker"),
            }
        }
        created
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: MarkerId) -> Option<&MarkerSlot> {
        self.slots.get(&id)
    }

    pub fn entity(&self, id: MarkerId) -> Option<&MarkerEntity> {
        self.slots.get(&id).map(|s| &s.entity)
    }

    pub fn location(&self, id: MarkerId) -> Option<&ConsumedLocation> {
        self.slots.get(&id).map(|s| &s.location)
    }

    pub fn location_mut(&mut self, id: MarkerId) -> Option<&mut ConsumedLocation> {
        self.slots.get_mut(&id).map(|s| &mut s.location)
    }

    /// Marker showing the pin with this id
    pub fn find_by_pin(&self, pin_id: &str) -> Option<MarkerId> {
        self.slots
            .iter()
            .find(|(_, slot)| slot.location.id() == pin_id)
            .map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &MarkerSlot)> + '_ {
        self.slots.iter().map(|(id, slot)| (*id, slot))
    }

    pub fn entities(&self) -> impl Iterator<Item = &MarkerEntity> + '_ {
        self.slots.values().map(|s| &s.entity)
    }

    /// Root nodes to ray cast against
    pub fn pick_candidates(&self) -> Vec<NodeId> {
        self.slots.values().map(|s| s.entity.root()).collect()
    }

    /// Mark a location as seen; returns true the first time
    pub fn mark_viewed(&mut self, id: MarkerId) -> bool {
        match self.location_mut(id) {
            Some(location) if !location.viewed => {
                location.viewed = true;
                true
            }
            _ => false,
        }
    }

    /// Marker closest to `point`, with its world position and distance
    pub fn nearest_to(&self, scene: &Scene, point: Vec3) -> Option<(MarkerId, Vec3, f32)> {
        self.slots
            .iter()
            .filter_map(|(id, slot)| {
                let position = scene.world_position(slot.entity.root())?;
                Some((*id, position, position.distance(point)))
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))
    }

    /// Remove a marker from the scene and the table
    pub fn remove(&mut self, scene: &mut Scene, id: MarkerId) -> Option<ConsumedLocation> {
        let slot = self.slots.remove(&id)?;
        slot.entity.dispose(scene);
        Some(slot.location)
    }

    /// Remove every marker
    pub fn dispose_all(&mut self, scene: &mut Scene) {
        for slot in self.slots.values() {
            if !slot.entity.dispose(scene) {
                debug!(marker = %slot.entity.id(), "marker already gone from scene");
            }
        }
        self.slots.clear();
    }
}
