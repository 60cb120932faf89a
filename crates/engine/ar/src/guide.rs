//! Curved guide line to the nearest marker

use crate::marker::MarkerRegistry;
use devices::Heading;
use glam::Vec3;
use renderer::{Camera, LineStrip, MarkerId, Scene};

/// Points sampled along the curve
const GUIDE_SEGMENTS: usize = 32;

/// Arc apex height as a fraction of the path length
const APEX_RATIO: f32 = 0.2;

const GUIDE_COLOR: [f32; 4] = [0.2, 0.8, 1.0, 0.9];

/// Human-readable distance, e.g. "120 m" or "1.2 km"
pub fn format_distance(meters: f32) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round() as u32)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// Sample a quadratic Bezier curve
pub fn quadratic_bezier(start: Vec3, control: Vec3, end: Vec3, segments: usize) -> Vec<Vec3> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            start * (u * u) + control * (2.0 * u * t) + end * (t * t)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuidePath {
    pub target: MarkerId,
    pub points: Vec<Vec3>,
    /// Ground distance from the camera to the marker in meters
    pub distance_m: f32,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct GuideController {
    active: bool,
    path: Option<GuidePath>,
}

impl GuideController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the guide on or off; returns the new state
    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        if !self.active {
            self.path = None;
        }
        self.active
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.path = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Re-aim the guide from the camera to the nearest marker
    pub fn update(
        &mut self,
        scene: &Scene,
        registry: &MarkerRegistry,
        camera: &Camera,
    ) -> Option<&GuidePath> {
        if !self.active {
            return None;
        }
        self.path = registry
            .nearest_to(scene, camera.position)
            .map(|(target, end, _)| Self::build(target, camera, end));
        self.path.as_ref()
    }

    fn build(target: MarkerId, camera: &Camera, end: Vec3) -> GuidePath {
        let mut ahead = camera.forward().with_y(0.0).normalize_or_zero();
        if ahead == Vec3::ZERO {
            ahead = Vec3::NEG_Z;
        }
        let start = camera.position + ahead - Vec3::Y * 0.5;

        let offset = end - camera.position;
        let distance_m = offset.with_y(0.0).length();
        let control = (start + end) * 0.5 + Vec3::Y * (start.distance(end) * APEX_RATIO);

        let label = format!(
            "{} {}",
            format_distance(distance_m),
            Heading::from_direction(offset).cardinal()
        );

        GuidePath {
            target,
            points: quadratic_bezier(start, control, end, GUIDE_SEGMENTS),
            distance_m,
            label,
        }
    }

    pub fn path(&self) -> Option<&GuidePath> {
        self.path.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.path.as_ref().map(|p| p.label.as_str())
    }

    pub fn line_strip(&self) -> Option<LineStrip> {
        self.path.as_ref().map(|p| LineStrip {
            points: p.points.clone(),
            color: GUIDE_COLOR,
        })
    }
}
