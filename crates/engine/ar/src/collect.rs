//! Collection animation played after a successful consume

use crate::config::CoinStyle;
use crate::marker::MarkerEntity;
use crate::pins::ConsumedLocation;
use glam::{Quat, Vec3};
use renderer::{Camera, MarkerId, Scene};
use std::time::Duration;

/// How far in front of the camera the coin ends up
const END_DISTANCE: f32 = 1.5;

/// Spin multiplier while collecting
const SPIN_BOOST: f32 = 6.0;

/// Scale at the end of the animation
const END_SCALE: f32 = 0.1;

/// A coin flying into the camera
#[derive(Debug, Clone)]
pub struct CollectAnimation {
    marker: MarkerId,
    location: ConsumedLocation,
    start: Vec3,
    elapsed: f32,
    duration: f32,
}

impl CollectAnimation {
    pub fn new(
        scene: &Scene,
        entity: &MarkerEntity,
        location: ConsumedLocation,
        duration: Duration,
    ) -> Self {
        Self {
            marker: entity.id(),
            location,
            start: scene.world_position(entity.root()).unwrap_or(Vec3::ZERO),
            elapsed: 0.0,
            duration: duration.as_secs_f32(),
        }
    }

    pub fn marker(&self) -> MarkerId {
        self.marker
    }

    pub fn location(&self) -> &ConsumedLocation {
        &self.location
    }

    /// Completion in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }

    /// Advance by `dt` seconds and pose the marker; returns true once finished
    pub fn step(
        &mut self,
        scene: &mut Scene,
        entity: &MarkerEntity,
        camera: &Camera,
        dt: f32,
        style: &CoinStyle,
    ) -> bool {
        self.elapsed += dt.max(0.0);
        let t = self.progress();
        let eased = 1.0 - (1.0 - t).powi(3);

        let target = camera.position + camera.forward() * END_DISTANCE;
        if let Some(root) = scene.node_mut(entity.root()) {
            root.transform.translation = self.start.lerp(target, eased);
            root.transform.scale = Vec3::splat(1.0 + (END_SCALE - 1.0) * eased);
        }
        if let Some(coin) = scene.node_mut(entity.mesh()) {
            coin.transform.rotation =
                Quat::from_rotation_y(self.elapsed * style.spin_speed * SPIN_BOOST);
        }
        entity.hide_card(scene);

        self.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArConfig;
    use crate::marker::MarkerAssets;
    use crate::pins::PinRecord;
    use geoar_map::{GeoFix, GeoProjector};

    fn spawn() -> (Scene, MarkerEntity, ConsumedLocation, ArConfig) {
        let config = ArConfig::default();
        let mut scene = Scene::new();
        let assets = MarkerAssets::new(&mut scene, &config.coin);
        let mut projector = GeoProjector::new();
        projector.set_origin(GeoFix::new(0.0, 0.0, 0));
        let location = ConsumedLocation::from_pin(
            PinRecord {
                id: "c".into(),
                lat: 0.0002,
                lng: 0.0,
                brand_name: "B".into(),
                title: String::new(),
                description: String::new(),
                brand_image_url: None,
                url: None,
                collection_limit_remaining: None,
            },
            &config,
        );
        let entity = MarkerEntity::spawn(
            &mut scene,
            &assets,
            MarkerId(1),
            &location,
            &projector,
            &config.coin,
        )
        .unwrap();
        (scene, entity, location, config)
    }

    #[test]
    fn test_coin_moves_to_camera_and_shrinks() {
        let (mut scene, entity, location, config) = spawn();
        let camera = Camera::new(Vec3::new(0.0, 1.6, 0.0));
        let mut anim =
            CollectAnimation::new(&scene, &entity, location, Duration::from_millis(1000));
        let start = scene.world_position(entity.root()).unwrap();

        assert!(!anim.step(&mut scene, &entity, &camera, 0.5, &config.coin));
        let mid = scene.world_position(entity.root()).unwrap();
        assert!(mid.distance(camera.position) < start.distance(camera.position));

        assert!(anim.step(&mut scene, &entity, &camera, 0.6, &config.coin));
        let end = scene.world_position(entity.root()).unwrap();
        let target = camera.position + camera.forward() * END_DISTANCE;
        assert!(end.abs_diff_eq(target, 1e-4));
        let scale = scene.node(entity.root()).unwrap().transform.scale;
        assert!((scale.x - END_SCALE).abs() < 1e-5);
        assert_eq!(anim.marker(), MarkerId(1));
        assert_eq!(anim.location().id(), "c");
    }

    #[test]
    fn test_zero_duration_finishes_immediately() {
        let (mut scene, entity, location, config) = spawn();
        let mut anim = CollectAnimation::new(&scene, &entity, location, Duration::ZERO);
        assert!(anim.is_finished());
        assert!(anim.step(&mut scene, &entity, &Camera::default(), 0.0, &config.coin));
    }
}
