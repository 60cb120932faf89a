//! Camera video compositor against the simulated platform

use devices::{CameraError, MockPlatform, PlatformCall, VideoConstraints, Viewport};
use renderer::{CameraVideoCompositor, CoverFit};

#[tokio::test]
async fn test_probe_releases_stream_immediately() {
    let mock = MockPlatform::new();
    let settings = CameraVideoCompositor::probe(&mock, VideoConstraints::default())
        .await
        .unwrap();

    assert_eq!((settings.width, settings.height), (1280, 720));
    assert_eq!(mock.active_tracks(), 0);
    assert_eq!(
        mock.calls(),
        vec![PlatformCall::CameraOpen, PlatformCall::CameraStop]
    );
}

#[tokio::test]
async fn test_probe_surfaces_denial() {
    let mock = MockPlatform::new();
    mock.update_behavior(|b| b.camera = Err(CameraError::NotFound));
    let result = CameraVideoCompositor::probe(&mock, VideoConstraints::default()).await;
    assert_eq!(result, Err(CameraError::NotFound));
}

#[tokio::test]
async fn test_update_copies_only_new_frames() {
    let mock = MockPlatform::new();
    let viewport = Viewport::new(390.0, 844.0);
    let mut compositor =
        CameraVideoCompositor::acquire(&mock, VideoConstraints::default(), viewport)
            .await
            .unwrap();
    assert!(compositor.is_active());
    assert!(!compositor.update(), "no frame yet");

    let first = mock.push_frame(8, 4, [10, 20, 30, 255]);
    assert!(compositor.update());
    assert!(!compositor.update(), "same sequence is not copied twice");
    assert_eq!(compositor.background().sequence, first);
    assert_eq!(compositor.background().uploads(), 1);

    mock.push_frame(8, 4, [0, 0, 0, 255]);
    assert!(compositor.update());
    assert_eq!(compositor.background().uploads(), 2);
}

#[tokio::test]
async fn test_frame_size_change_refits() {
    let mock = MockPlatform::new();
    let viewport = Viewport::new(100.0, 100.0);
    let mut compositor =
        CameraVideoCompositor::acquire(&mock, VideoConstraints::default(), viewport)
            .await
            .unwrap();
    let wide = compositor.cover_fit();
    assert!(wide.scale.x < 1.0);

    // Platform rotated the stream to portrait
    mock.push_frame(4, 8, [0, 0, 0, 255]);
    compositor.update();
    let tall = compositor.cover_fit();
    assert_eq!(tall, CoverFit::compute(0.5, 1.0));
    assert_eq!(tall.scale.x, 1.0);

    compositor.resize(Viewport::new(50.0, 100.0));
    assert_eq!(compositor.cover_fit(), CoverFit::IDENTITY);
}

#[tokio::test]
async fn test_dispose_stops_tracks() {
    let mock = MockPlatform::new();
    let mut compositor =
        CameraVideoCompositor::acquire(&mock, VideoConstraints::default(), Viewport::default())
            .await
            .unwrap();
    mock.push_frame(2, 2, [1, 2, 3, 4]);
    compositor.update();
    assert_eq!(mock.active_tracks(), 1);

    compositor.dispose();
    compositor.dispose();
    assert_eq!(mock.active_tracks(), 0);
    assert!(!compositor.is_active());
    assert!(compositor.background().is_empty());
    assert!(!compositor.update());
}

#[tokio::test]
async fn test_drop_releases_camera() {
    let mock = MockPlatform::new();
    let compositor =
        CameraVideoCompositor::acquire(&mock, VideoConstraints::default(), Viewport::default())
            .await
            .unwrap();
    drop(compositor);
    assert_eq!(mock.active_tracks(), 0);
}
