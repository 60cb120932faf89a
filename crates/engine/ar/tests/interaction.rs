mod common;

use async_trait::async_trait;
use common::{fix_north, origin_fix, pin_east, pin_north, pins, Harness};
use devices::{DeviceOrientation, MockPlatform, PointerEvent, PointerPhase, Viewport};
use geoar::{
    InMemoryPinService, NearbyPins, PinService, ServiceError, SessionError, SessionEvent,
};
use geoar_map::GeoFix;
use glam::Vec2;
use std::cell::Cell;
use std::rc::Rc;

async fn running(locations: Vec<geoar::PinRecord>) -> (Harness, Rc<InMemoryPinService>) {
    let service = pins(locations);
    let h = Harness::new(MockPlatform::new(), service.clone());
    h.session.start().await.unwrap();
    (h, service)
}

fn tap(h: &Harness, at: Vec2) {
    h.session
        .on_pointer(PointerEvent::mouse(PointerPhase::Down, at.x, at.y));
    h.session
        .on_pointer(PointerEvent::mouse(PointerPhase::Up, at.x, at.y));
}

fn hover(h: &Harness, at: Vec2) {
    h.session
        .on_pointer(PointerEvent::mouse(PointerPhase::Move, at.x, at.y));
}

#[tokio::test]
async fn tap_selects_the_coin_under_the_pointer() {
    let (mut h, _) = running(vec![pin_north("a", 20.0)]).await;
    h.run_frames(1);
    h.drain();

    let at = h.session.screen_position("a").unwrap();
    tap(&h, at);
    h.run_frames(1);

    let selected = h.session.selected().unwrap();
    assert_eq!(h.session.state().selected_pin.as_deref(), Some("a"));
    assert!(h.session.can_collect());
    assert!(h.drain().contains(&SessionEvent::Selected(selected)));
    assert!(h.session.locations()[0].viewed);
}

#[tokio::test]
async fn tap_on_empty_space_keeps_selection() {
    let (h, _) = running(vec![pin_north("a", 20.0)]).await;
    h.run_frames(1);
    tap(&h, h.session.screen_position("a").unwrap());
    h.run_frames(1);
    let selected = h.session.selected();
    assert!(selected.is_some());

    tap(&h, Vec2::new(5.0, 5.0));
    h.run_frames(1);
    assert_eq!(h.session.selected(), selected);
}

#[tokio::test]
async fn hover_tracks_the_pointer() {
    let (mut h, _) = running(vec![pin_north("a", 20.0)]).await;
    h.run_frames(1);
    h.drain();

    hover(&h, h.session.screen_position("a").unwrap());
    h.run_frames(1);
    let hovered = h.session.hovered();
    assert!(hovered.is_some());
    assert_eq!(h.session.state().hovered_marker, hovered);
    assert!(h.drain().contains(&SessionEvent::HoverChanged(hovered)));
    assert!(h.session.locations()[0].viewed);
    // Hover alone does not select
    assert_eq!(h.session.selected(), None);

    hover(&h, Vec2::new(5.0, 5.0));
    h.run_frames(1);
    assert_eq!(h.session.hovered(), None);
    assert!(h.drain().contains(&SessionEvent::HoverChanged(None)));
}

#[tokio::test]
async fn touch_release_hides_the_card() {
    let (mut h, _) = running(vec![pin_north("a", 20.0)]).await;
    h.run_frames(1);
    h.drain();
    let at = h.session.screen_position("a").unwrap();

    h.session.on_pointer(PointerEvent::touch(1, PointerPhase::Down, at.x, at.y));
    h.run_frames(1);
    assert!(h.session.hovered().is_some());
    assert!(h.session.is_card_visible("a"));

    // Dragging the finger is not a hover check
    h.session
        .on_pointer(PointerEvent::touch(1, PointerPhase::Move, at.x + 4.0, at.y));
    h.run_frames(1);
    assert!(h.session.is_card_visible("a"));

    h.session
        .on_pointer(PointerEvent::touch(1, PointerPhase::Up, at.x, at.y));
    h.run_frames(1);
    assert_eq!(h.session.hovered(), None);
    assert!(!h.session.is_card_visible("a"));
    assert!(h.session.selected().is_some());
    assert!(h.drain().contains(&SessionEvent::HoverChanged(None)));
}

#[tokio::test]
async fn collect_animates_then_removes_the_coin() {
    let (mut h, service) = running(vec![pin_north("a", 20.0), pin_east("b", 60.0)]).await;
    h.run_frames(1);
    tap(&h, h.session.screen_position("a").unwrap());
    h.run_frames(1);
    h.drain();

    h.session.collect_selected().await.unwrap();
    assert_eq!(service.consumed(), ["a"]);
    assert!(h.session.is_collecting());
    assert!(!h.session.can_collect());
    assert!(matches!(
        h.session.collect_selected().await,
        Err(SessionError::CollectInProgress)
    ));

    // Still animating halfway through
    h.run_frames(30);
    assert_eq!(h.session.marker_count(), 2);
    assert!(h.collected.borrow().is_empty());

    h.run_frames(60);
    assert!(!h.session.is_collecting());
    assert_eq!(h.session.marker_count(), 1);
    assert_eq!(h.session.marker_position("a"), None);
    assert!(h.session.marker_position("b").is_some());
    assert_eq!(*h.collected.borrow(), ["a"]);

    let state = h.session.state();
    assert_eq!(state.coins_loaded, 1);
    assert_eq!(state.selected_pin, None);
    assert_eq!(h.session.selected(), None);
    assert!(h.drain().contains(&SessionEvent::Collected("a".to_string())));
}

#[tokio::test]
async fn failed_collect_keeps_the_selection() {
    let (mut h, service) = running(vec![pin_north("a", 20.0)]).await;
    h.run_frames(1);
    tap(&h, h.session.screen_position("a").unwrap());
    h.run_frames(1);
    h.drain();

    service.set_fail_consume(Some(ServiceError::Status {
        status: 409,
        message: "limit reached".to_string(),
    }));
    let result = h.session.collect_selected().await;
    assert!(matches!(result, Err(SessionError::Service(_))));

    let alert = h.drain().into_iter().find_map(|e| match e {
        SessionEvent::Alert(message) => Some(message),
        _ => None,
    });
    assert!(alert.unwrap().starts_with("Could not collect this coin"));
    assert!(h.session.selected().is_some());
    assert!(!h.session.is_collecting());
    assert_eq!(h.session.marker_count(), 1);

    // The user can try again
    service.set_fail_consume(None);
    h.session.collect_selected().await.unwrap();
    assert_eq!(service.consumed(), ["a"]);
}

#[tokio::test]
async fn collect_needs_a_selection() {
    let (h, service) = running(vec![pin_north("a", 20.0)]).await;
    assert!(matches!(
        h.session.collect_selected().await,
        Err(SessionError::NothingSelected)
    ));
    assert!(service.consumed().is_empty());
}

#[tokio::test]
async fn single_ar_disables_collecting() {
    let service = Rc::new(InMemoryPinService::new(NearbyPins {
        locations: vec![pin_north("a", 20.0)],
        single_ar: true,
    }));
    let h = Harness::new(MockPlatform::new(), service.clone());
    h.session.start().await.unwrap();
    h.run_frames(1);
    tap(&h, h.session.screen_position("a").unwrap());
    h.run_frames(1);

    assert!(h.session.selected().is_some());
    assert!(!h.session.can_collect());
    assert!(matches!(
        h.session.collect_selected().await,
        Err(SessionError::CollectUnavailable)
    ));
    assert!(service.consumed().is_empty());
}

#[tokio::test]
async fn guide_points_to_nearest_coin() {
    let (h, _) = running(vec![pin_north("near", 100.0), pin_north("far", 300.0)]).await;
    h.run_frames(1);
    assert_eq!(h.session.guide_label(), None);

    assert!(h.session.toggle_guide());
    h.run_frames(1);
    assert_eq!(h.session.guide_label().as_deref(), Some("100 m N"));
    assert_eq!(h.renderer().get().last_line_count(), 1);

    h.session.clear_guide();
    h.run_frames(1);
    assert_eq!(h.session.guide_label(), None);
    assert_eq!(h.renderer().get().last_line_count(), 0);
}

#[tokio::test]
async fn orientation_turns_the_camera() {
    let (h, _) = running(vec![]).await;
    h.mock.push_orientation(DeviceOrientation::new(90.0, 90.0, 0.0));
    h.run_frames(1);
    assert_eq!(h.session.heading().unwrap().cardinal(), "W");
}

#[tokio::test]
async fn video_frames_reach_the_renderer() {
    let (h, _) = running(vec![]).await;
    h.run_frames(1);
    assert_eq!(h.renderer().get().last_background(), None);

    let sequence = h.mock.push_frame(1280, 720, [10, 20, 30, 255]);
    h.run_frames(1);
    assert_eq!(h.renderer().get().last_background(), Some(sequence));
}

#[tokio::test]
async fn resize_reaches_camera_and_renderer() {
    let (h, _) = running(vec![]).await;
    let viewport = Viewport::new(800.0, 600.0);
    h.mock.resize(viewport);
    h.run_frames(1);

    assert_eq!(h.session.viewport(), Some(viewport));
    assert_eq!(h.renderer().get().viewport(), Some(viewport));
    let camera = h.session.camera().unwrap();
    assert!((camera.aspect - viewport.aspect_ratio()).abs() < 1e-6);
}

#[tokio::test]
async fn later_fixes_move_the_camera_not_the_markers() {
    let (h, service) = running(vec![pin_north("a", 50.0)]).await;
    let origin = h.session.origin().unwrap();
    let marker = h.session.marker_position("a").unwrap();

    h.mock.push_fix(fix_north(10.0));
    assert!(h.session.sync_location().await);
    assert!(!h.session.sync_location().await);

    assert_eq!(h.session.origin(), Some(origin));
    assert_eq!(h.session.marker_position("a"), Some(marker));
    let camera = h.session.camera().unwrap();
    assert!((camera.position.z + 10.0).abs() < 0.05, "{}", camera.position);
    assert!(camera.position.x.abs() < 0.05);
    assert_eq!(camera.position.y, h.session.config().eye_height_m);
    assert_eq!(service.fetch_count(), 1);

    let coord = h.session.camera_coord().unwrap();
    assert!(coord.distance_to(&fix_north(10.0).coord) < 0.1, "{coord:?}");
}

#[tokio::test]
async fn location_updates_follow_until_disposed() {
    let (h, _) = running(vec![pin_north("a", 50.0)]).await;

    futures::join!(h.session.run_location_updates(), async {
        h.mock.push_fix(fix_north(20.0));
        tokio::task::yield_now().await;
        let camera = h.session.camera().unwrap();
        assert!((camera.position.z + 20.0).abs() < 0.05);
        h.session.dispose();
    });

    assert!(!h.session.is_running());
    assert_eq!(h.mock.active_handles(), 0);
}

/// Pin service that fails its first `failures` fetches with `error`
struct FlakyPins {
    failures: Cell<u32>,
    error: ServiceError,
    fetches: Cell<u32>,
    inner: InMemoryPinService,
}

impl FlakyPins {
    fn new(failures: u32, error: ServiceError) -> Rc<Self> {
        Rc::new(Self {
            failures: Cell::new(failures),
            error,
            fetches: Cell::new(0),
            inner: InMemoryPinService::new(NearbyPins {
                locations: vec![pin_north("a", 40.0)],
                single_ar: false,
            }),
        })
    }
}

#[async_trait(?Send)]
impl PinService for FlakyPins {
    async fn nearby_pins(&self, origin: GeoFix) -> Result<NearbyPins, ServiceError> {
        self.fetches.set(self.fetches.get() + 1);
        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            return Err(self.error.clone());
        }
        self.inner.nearby_pins(origin).await
    }

    async fn consume(&self, location_id: &str) -> Result<(), ServiceError> {
        self.inner.consume(location_id).await
    }
}

#[tokio::test]
async fn failed_pin_load_retries_on_next_fix() {
    let service = FlakyPins::new(1, ServiceError::Connection("offline".to_string()));
    let mut h = Harness::new(MockPlatform::new(), service.clone());
    h.session.start().await.unwrap();

    assert_eq!(h.session.marker_count(), 0);
    assert!(h
        .drain()
        .iter()
        .any(|e| matches!(e, SessionEvent::Alert(_))));

    h.mock.push_fix(origin_fix());
    h.session.sync_location().await;
    assert_eq!(service.fetches.get(), 2);
    assert_eq!(h.session.marker_count(), 1);
    assert_eq!(h.session.state().coins_loaded, 1);
}

#[tokio::test]
async fn rejected_pin_load_is_not_retried() {
    let service = FlakyPins::new(
        1,
        ServiceError::Status {
            status: 403,
            message: "forbidden".to_string(),
        },
    );
    let mut h = Harness::new(MockPlatform::new(), service.clone());
    h.session.start().await.unwrap();

    let alert = h.drain().into_iter().find_map(|e| match e {
        SessionEvent::Alert(message) => Some(message),
        _ => None,
    });
    assert!(!alert.unwrap().contains("Retrying"));

    h.mock.push_fix(origin_fix());
    h.session.sync_location().await;
    assert_eq!(service.fetches.get(), 1);
    assert_eq!(h.session.marker_count(), 0);
}
