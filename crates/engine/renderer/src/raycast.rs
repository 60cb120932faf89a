//! Ray casting against scene meshes

use crate::camera::Camera;
use crate::scene::{MarkerId, NodeId, Scene};
use devices::Viewport;
use glam::{Vec2, Vec3};

const EPSILON: f32 = 1e-6;

/// A ray with normalized direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at distance `t` along the ray
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance to the first intersection with a sphere
    ///
    /// Returns 0 when the origin is inside the sphere.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        if c <= 0.0 {
            return Some(0.0);
        }
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let t = -b - discriminant.sqrt();
        (t >= 0.0).then_some(t)
    }

    /// Double-sided ray/triangle intersection (Möller-Trumbore)
    pub fn intersect_triangle(&self, [a, b, c]: [Vec3; 3]) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        (t > EPSILON).then_some(t)
    }
}

/// An intersection with a scene node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub node: NodeId,
    pub distance: f32,
    pub point: Vec3,
}

/// Casts a ray into the scene
#[derive(Debug, Clone, Copy)]
pub struct Raycaster {
    pub ray: Ray,
    pub near: f32,
    pub far: f32,
}

impl Raycaster {
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            near: 0.0,
            far: f32::INFINITY,
        }
    }

    /// Ray from the camera through a viewport pixel, limited to the frustum depth
    pub fn from_camera(camera: &Camera, pixel: Vec2, viewport: &Viewport) -> Self {
        Self {
            ray: camera.screen_ray(pixel, viewport),
            near: camera.near,
            far: camera.far,
        }
    }

    /// Intersect a single node's mesh
    ///
    /// Nodes without a mesh, hidden nodes, and nodes whose bounding sphere
    /// the ray misses produce no hit.
    pub fn intersect_node(&self, scene: &Scene, id: NodeId) -> Option<RayHit> {
        if !scene.is_visible(id) {
            return None;
        }
        let mesh = scene.mesh(scene.node(id)?.mesh?)?;
        let world = scene.world_matrix(id)?;

        let (scale, _, translation) = world.to_scale_rotation_translation();
        let radius = mesh.bounding_radius() * scale.abs().max_element();
        let sphere_t = self.ray.intersect_sphere(translation, radius)?;
        if sphere_t > self.far {
            return None;
        }

        mesh.triangles()
            .filter_map(|tri| {
                self.ray.intersect_triangle(tri.map(|v| world.transform_point3(v)))
            })
            .filter(|t| *t >= self.near && *t <= self.far)
            .min_by(f32::total_cmp)
            .map(|distance| RayHit {
                node: id,
                distance,
                point: self.ray.at(distance),
            })
    }

    /// Intersect candidates, optionally including their descendants
    ///
    /// Hits are sorted nearest first.
    pub fn intersect_objects(
        &self,
        scene: &Scene,
        candidates: &[NodeId],
        recursive: bool,
    ) -> Vec<RayHit> {
        let mut nodes: Vec<NodeId> = Vec::new();
        for candidate in candidates {
            if recursive {
                nodes.extend(scene.descendants(*candidate));
            } else {
                nodes.push(*candidate);
            }
        }
        let mut seen = std::collections::HashSet::new();
        nodes.retain(|id| seen.insert(*id));

        let mut hits: Vec<RayHit> = nodes
            .into_iter()
            .filter_map(|id| self.intersect_node(scene, id))
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// The nearest hit that belongs to a tagged marker
    ///
    /// A hit on an untagged child resolves to the tag of its nearest tagged ancestor.
    pub fn pick(
        &self,
        scene: &Scene,
        candidates: &[NodeId],
    ) -> Option<(MarkerId, RayHit)> {
        self.intersect_objects(scene, candidates, true)
            .into_iter()
            .find_map(|hit| scene.find_tag(hit.node).map(|tag| (tag, hit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::scene::Node;

    #[test]
    fn test_triangle_hit_and_miss() {
        let tri = [
            Vec3::new(-1.0, -1.0, -5.0),
            Vec3::new(1.0, -1.0, -5.0),
            Vec3::new(0.0, 1.0, -5.0),
        ];
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!((ray.intersect_triangle(tri).unwrap() - 5.0).abs() < 1e-5);

        let away = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(away.intersect_triangle(tri).is_none());

        let beside = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_Z);
        assert!(beside.intersect_triangle(tri).is_none());
    }

    #[test]
    fn test_sphere() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!((ray.intersect_sphere(Vec3::new(0.0, 0.0, -10.0), 1.0).unwrap() - 9.0).abs() < 1e-5);
        assert_eq!(ray.intersect_sphere(Vec3::ZERO, 1.0), Some(0.0));
        assert!(ray.intersect_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0).is_none());
    }

    #[test]
    fn test_nearest_first() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(Mesh::quad(1.0, 1.0));
        let far = scene.spawn(
            Node::new("far")
                .with_mesh(mesh)
                .with_translation(Vec3::new(0.0, 0.0, -20.0)),
        );
        let near = scene.spawn(
            Node::new("near")
                .with_mesh(mesh)
                .with_translation(Vec3::new(0.0, 0.0, -5.0)),
        );

        let caster = Raycaster::new(Ray::new(Vec3::ZERO, Vec3::NEG_Z));
        let hits = caster.intersect_objects(&scene, &[far, near], false);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, near);
        assert!((hits[0].point.z + 5.0).abs() < 1e-4);

        scene.node_mut(near).unwrap().visible = false;
        let hits = caster.intersect_objects(&scene, &[far, near], false);
        assert_eq!(hits[0].node, far);
    }

    #[test]
    fn test_far_plane_limits_hits() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(Mesh::quad(1.0, 1.0));
        let node = scene.spawn(
            Node::new("quad")
                .with_mesh(mesh)
                .with_translation(Vec3::new(0.0, 0.0, -50.0)),
        );
        let mut caster = Raycaster::new(Ray::new(Vec3::ZERO, Vec3::NEG_Z));
        caster.far = 10.0;
        assert!(caster.intersect_node(&scene, node).is_none());
    }
}
