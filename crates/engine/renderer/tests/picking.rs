//! Screen-space picking through the camera

use devices::Viewport;
use glam::{Quat, Vec3};
use renderer::{Camera, MarkerId, Mesh, Node, Raycaster, Scene};

fn setup() -> (Scene, Camera, Viewport) {
    let viewport = Viewport::new(400.0, 800.0);
    let mut camera = Camera::default();
    camera.set_viewport(&viewport);
    (Scene::new(), camera, viewport)
}

#[test]
fn test_center_tap_hits_marker_ahead() {
    let (mut scene, camera, viewport) = setup();
    let coin = scene.add_mesh(Mesh::coin(0.5, 0.1, 24));
    let marker = scene.spawn(
        Node::new("coin")
            .with_mesh(coin)
            .with_tag(MarkerId(1))
            .with_translation(Vec3::new(0.0, 0.0, -10.0)),
    );

    let caster = Raycaster::from_camera(&camera, viewport.center(), &viewport);
    let (tag, hit) = caster.pick(&scene, &[marker]).unwrap();
    assert_eq!(tag, MarkerId(1));
    assert_eq!(hit.node, marker);
    assert!((hit.distance - 9.95).abs() < 1e-3, "{}", hit.distance);
}

#[test]
fn test_child_hit_resolves_to_parent_tag() {
    let (mut scene, camera, viewport) = setup();
    let quad = scene.add_mesh(Mesh::quad(1.0, 1.0));
    // Group carries the tag, the child carries the geometry
    let group = scene.spawn(
        Node::new("marker")
            .with_tag(MarkerId(42))
            .with_translation(Vec3::new(0.0, 0.0, -5.0)),
    );
    let child = scene.spawn_child(group, Node::new("face").with_mesh(quad)).unwrap();

    let caster = Raycaster::from_camera(&camera, viewport.center(), &viewport);
    let (tag, hit) = caster.pick(&scene, &[group]).unwrap();
    assert_eq!(tag, MarkerId(42));
    assert_eq!(hit.node, child);
}

#[test]
fn test_no_hit_when_looking_away() {
    let (mut scene, mut camera, viewport) = setup();
    let coin = scene.add_mesh(Mesh::coin(0.5, 0.1, 24));
    let marker = scene.spawn(
        Node::new("coin")
            .with_mesh(coin)
            .with_tag(MarkerId(1))
            .with_translation(Vec3::new(0.0, 0.0, -10.0)),
    );
    camera.rotation = Quat::from_rotation_y(std::f32::consts::PI);

    let caster = Raycaster::from_camera(&camera, viewport.center(), &viewport);
    assert!(caster.pick(&scene, &[marker]).is_none());
}

#[test]
fn test_nearest_marker_wins_when_overlapping() {
    let (mut scene, camera, viewport) = setup();
    let coin = scene.add_mesh(Mesh::coin(0.5, 0.1, 24));
    let far = scene.spawn(
        Node::new("far")
            .with_mesh(coin)
            .with_tag(MarkerId(2))
            .with_translation(Vec3::new(0.0, 0.0, -30.0)),
    );
    let near = scene.spawn(
        Node::new("near")
            .with_mesh(coin)
            .with_tag(MarkerId(3))
            .with_translation(Vec3::new(0.0, 0.0, -8.0)),
    );

    let caster = Raycaster::from_camera(&camera, viewport.center(), &viewport);
    let (tag, _) = caster.pick(&scene, &[far, near]).unwrap();
    assert_eq!(tag, MarkerId(3));
}

#[test]
fn test_pixel_offset_picks_side_marker() {
    let (mut scene, camera, viewport) = setup();
    let coin = scene.add_mesh(Mesh::coin(0.5, 0.1, 24));
    let right = scene.spawn(
        Node::new("right")
            .with_mesh(coin)
            .with_tag(MarkerId(5))
            .with_translation(Vec3::new(2.0, 0.0, -10.0)),
    );
    let pixel = camera
        .world_to_screen(Vec3::new(2.0, 0.0, -10.0), &viewport)
        .unwrap();
    assert!(pixel.x > viewport.center().x);

    let caster = Raycaster::from_camera(&camera, pixel, &viewport);
    assert_eq!(caster.pick(&scene, &[right]).map(|(t, _)| t), Some(MarkerId(5)));

    let miss = Raycaster::from_camera(&camera, viewport.center(), &viewport);
    assert!(miss.pick(&scene, &[right]).is_none());
}
