//! Perspective camera for the AR view
//!
//! # Coordinate System
//!
//! Uses OpenGL convention, matching the local scene produced by the geo
//! projection:
//! - +X is right (east when unrotated)
//! - +Y is up
//! - -Z is forward (north when unrotated)

use crate::raycast::Ray;
use devices::Viewport;
use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec3Swizzles, Vec4Swizzles};

/// Default vertical field of view: 75 degrees, close to a phone's rear camera
pub const DEFAULT_VFOV: f32 = 75.0 * std::f32::consts::PI / 180.0;

pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 1000.0;

/// Camera for 3D rendering
///
/// Position, rotation (quaternion), and a perspective frustum. The rotation is
/// driven by the orientation sensors; the position stays at the viewer's eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Camera rotation (orientation) as quaternion
    pub rotation: Quat,
    /// Vertical field of view in radians
    pub vfov: f32,
    /// Width over height of the viewport
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl Camera {
    /// Create a new camera with default settings at the given position
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            vfov: DEFAULT_VFOV,
            aspect: Viewport::default().aspect_ratio(),
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }

    /// Create camera with position looking at target
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let mut camera = Self::new(position);
        camera.set_look_at(target, up);
        camera
    }

    /// Point the camera at a target position
    pub fn set_look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize();
        let right = forward.cross(up).normalize();
        let cam_up = right.cross(forward);

        // In camera space: right=+X, up=+Y, forward=-Z (OpenGL convention)
        let rotation_matrix = Mat3::from_cols(right, cam_up, -forward);
        self.rotation = Quat::from_mat3(&rotation_matrix);
    }

    /// Match the frustum to a viewport
    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.aspect = viewport.aspect_ratio();
    }

    /// Get the forward direction vector
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Get the right direction vector
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get the up direction vector
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.vfov, self.aspect, self.near, self.far)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray from the eye through a viewport pixel (origin top-left)
    pub fn screen_ray(&self, pixel: Vec2, viewport: &Viewport) -> Ray {
        let ndc = viewport.to_ndc(pixel);
        let inv = self.view_projection().inverse();
        let through = inv.project_point3(Vec3::new(ndc.x, ndc.y, 0.5));
        Ray::new(self.position, through - self.position)
    }

    /// Pixel position of a world point, or `None` if it is behind the camera
    pub fn world_to_screen(&self, point: Vec3, viewport: &Viewport) -> Option<Vec2> {
        let clip = self.view_projection() * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(viewport.from_ndc(ndc.xy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_ray_points_forward() {
        let viewport = Viewport::new(400.0, 800.0);
        let mut camera = Camera::default();
        camera.set_viewport(&viewport);

        let ray = camera.screen_ray(viewport.center(), &viewport);
        assert_eq!(ray.origin, Vec3::ZERO);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
    }

    #[test]
    fn test_screen_ray_follows_rotation() {
        let viewport = Viewport::new(400.0, 400.0);
        let mut camera = Camera::default();
        camera.set_viewport(&viewport);
        camera.rotation = Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2);

        // Turned right, now facing east (+X)
        let ray = camera.screen_ray(viewport.center(), &viewport);
        assert!((ray.direction - Vec3::X).length() < 1e-4, "{:?}", ray.direction);
    }

    #[test]
    fn test_world_to_screen_roundtrip() {
        let viewport = Viewport::new(390.0, 844.0);
        let mut camera = Camera::default();
        camera.set_viewport(&viewport);

        let point = Vec3::new(2.0, 1.0, -10.0);
        let pixel = camera.world_to_screen(point, &viewport).unwrap();
        let ray = camera.screen_ray(pixel, &viewport);
        let t = (point - ray.origin).dot(ray.direction);
        assert!((ray.at(t) - point).length() < 1e-3);
    }

    #[test]
    fn test_point_ahead_lands_on_center() {
        let viewport = Viewport::new(800.0, 600.0);
        let mut camera = Camera::default();
        camera.set_viewport(&viewport);

        let pixel = camera
            .world_to_screen(Vec3::new(0.0, 0.0, -25.0), &viewport)
            .unwrap();
        assert!((pixel - viewport.center()).length() < 1e-3, "{pixel}");
    }

    #[test]
    fn test_point_behind_camera_not_on_screen() {
        let viewport = Viewport::default();
        let camera = Camera::default();
        assert!(camera
            .world_to_screen(Vec3::new(0.0, 0.0, 5.0), &viewport)
            .is_none());
    }

    #[test]
    fn test_look_at() {
        let camera = Camera::look_at(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::Y);
        assert!((camera.forward() - Vec3::X).length() < 1e-5);
        assert!((camera.up() - Vec3::Y).length() < 1e-5);
    }
}
