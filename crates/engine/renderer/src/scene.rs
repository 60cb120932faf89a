//! Scene graph with geo anchors
//!
//! Nodes live in a generational slab and reference each other by [`NodeId`].
//! A node carries an optional [`MarkerId`] tag instead of an arbitrary
//! payload; domain data is looked up in a side table keyed by that id.
//!
//! Geo-anchored nodes remember their (lat, lng) so that
//! [`Scene::reproject_anchors`] can re-place them consistently whenever the
//! projection origin changes.

use crate::error::{RenderError, Result};
use crate::mesh::Mesh;
use geoar_map::{GeoCoord, GeoProjector, LocalPosition};
use glam::{Mat4, Quat, Vec3};
use std::fmt;
use tracing::warn;

/// Handle to a scene node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Handle to a mesh stored in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u32);

impl MeshId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Stable identifier of an AR marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker-{}", self.0)
    }
}

/// Local transform relative to the parent node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Geographic placement of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoAnchor {
    pub coord: GeoCoord,
    /// Height above the ground plane in meters
    pub height: f32,
}

/// A scene node
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<MeshId>,
    /// Flat RGBA colour
    pub color: [f32; 4],
    pub visible: bool,
    /// Marker this node belongs to, if it is the marker's root
    pub tag: Option<MarkerId>,
    pub anchor: Option<GeoAnchor>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            mesh: None,
            color: [1.0, 1.0, 1.0, 1.0],
            visible: true,
            tag: None,
            anchor: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_mesh(mut self, mesh: MeshId) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_tag(mut self, tag: MarkerId) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.transform.translation = translation;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// The AR scene
#[derive(Debug, Default)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<NodeId>,
    meshes: Vec<Mesh>,
    len: usize,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a mesh and return its handle
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId((self.meshes.len() - 1) as u32)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.index())
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Add a node at the root of the scene
    pub fn spawn(&mut self, node: Node) -> NodeId {
        let id = self.insert(node);
        self.roots.push(id);
        id
    }

    /// Add a node as the last child of `parent`
    pub fn spawn_child(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId> {
        if !self.contains(parent) {
            return Err(RenderError::UnknownNode(parent));
        }
        node.parent = Some(parent);
        let id = self.insert(node);
        if let Some(parent) = self.node_mut(parent) {
            parent.children.push(id);
        }
        Ok(id)
    }

    fn insert(&mut self, mut node: Node) -> NodeId {
        node.children.clear();
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    /// Remove a node and all of its descendants
    ///
    /// Returns false if the node was already gone.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.node(id).map(|n| n.parent) else {
            return false;
        };
        match parent {
            Some(parent) => {
                if let Some(parent) = self.node_mut(parent) {
                    parent.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
        self.remove_detached(id);
        true
    }

    /// Remove every node; meshes are kept
    pub fn clear(&mut self) {
        for root in std::mem::take(&mut self.roots) {
            self.remove_detached(root);
        }
    }

    fn remove_detached(&mut self, id: NodeId) {
        for node in self.descendants(id) {
            let slot = &mut self.slots[node.index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index);
            self.len -= 1;
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Iterate over all live nodes
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    /// The node followed by its parent chain up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.contains(id).then_some(id);
        std::iter::successors(start, move |current| {
            self.node(*current).and_then(|n| n.parent)
        })
    }

    /// The node and every node below it, depth-first
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.node(current) {
                out.push(current);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Nearest tag on the node or any of its ancestors
    pub fn find_tag(&self, id: NodeId) -> Option<MarkerId> {
        self.ancestors(id)
            .find_map(|ancestor| self.node(ancestor).and_then(|n| n.tag))
    }

    /// True if the node and all of its ancestors are visible
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut any = false;
        for ancestor in self.ancestors(id) {
            any = true;
            if !self.node(ancestor).is_some_and(|n| n.visible) {
                return false;
            }
        }
        any
    }

    /// Model matrix composed from the root down
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        if !self.contains(id) {
            return None;
        }
        let chain: Vec<NodeId> = self.ancestors(id).collect();
        Some(chain.iter().rev().fold(Mat4::IDENTITY, |acc, node| {
            let local = self
                .node(*node)
                .map(|n| n.transform.to_matrix())
                .unwrap_or(Mat4::IDENTITY);
            acc * local
        }))
    }

    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_matrix(id)
            .map(|m| m.transform_point3(Vec3::ZERO))
    }

    /// Place a node at a geographic coordinate
    ///
    /// The anchor is remembered so [`Scene::reproject_anchors`] can re-place
    /// the node if the projection origin changes.
    pub fn anchor_at_geo(
        &mut self,
        id: NodeId,
        coord: GeoCoord,
        height: f32,
        projector: &GeoProjector,
    ) -> Result<LocalPosition> {
        let position = projector.project(coord.lat, coord.lng)?.with_height(height);
        let node = self.node_mut(id).ok_or(RenderError::UnknownNode(id))?;
        node.anchor = Some(GeoAnchor { coord, height });
        node.transform.translation = position.to_vec3();
        Ok(position)
    }

    /// Re-place every geo-anchored node against the projector's origin
    ///
    /// Returns the number of nodes placed. Nodes that fail to project keep
    /// their previous position.
    pub fn reproject_anchors(&mut self, projector: &GeoProjector) -> usize {
        let mut placed = 0;
        for slot in &mut self.slots {
            let Some(node) = slot.node.as_mut() else {
                continue;
            };
            let Some(anchor) = node.anchor else {
                continue;
            };
            match projector.project(anchor.coord.lat, anchor.coord.lng) {
                Ok(position) => {
                    node.transform.translation = position.with_height(anchor.height).to_vec3();
                    placed += 1;
                }
                Err(e) => warn!(node = %node.name, error = %e, "failed to reproject anchor"),
            }
        }
        placed
    }
}
