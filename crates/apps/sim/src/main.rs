//! Headless AR session simulator
//!
//! Drives an [`ArSession`] against the mock platform: permission sequence,
//! pin loading, a camera sweep, and optionally a tap-and-collect.
//!
//! # Usage
//!
//! ```bash
//! # Default pins around Westminster, two-second sweep
//! geoar-sim
//!
//! # Orientation behind a prompt, walking north, collect the first coin seen
//! geoar-sim --gated --walk 1.4 --collect
//!
//! # Failure paths
//! geoar-sim --deny-camera
//! geoar-sim --deny-orientation
//! ```

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::Args;
use devices::{DeviceOrientation, Heading, MockPlatform, PointerEvent, PointerPhase};
use futures::FutureExt;
use geoar::{
    ArConfig, ArSession, HttpPinService, InMemoryPinService, PinService, ServiceConfig,
    SessionEvent,
};
use geoar_map::{GeoFix, EARTH_RADIUS_M};
use glam::Vec2;
use std::path::PathBuf;
use std::rc::Rc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FRAME_DT: f32 = 1.0 / 60.0;

/// Frames between simulated GPS fixes while walking
const FIX_INTERVAL: u32 = 30;

/// Headings tried when looking for a coin to collect
const SEARCH_HEADINGS: [f32; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("geoar-sim v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => ArConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ArConfig::default(),
    };
    let service = pin_service(&args)?;

    let mock = MockPlatform::with_behavior(args.behavior());
    let (session, mut events) = ArSession::builder(mock.platform(), service, config)
        .with_on_collected(|location| {
            info!(
                location = location.id(),
                url = %location.modal_url,
                "collected, opening details"
            );
        })
        .build();

    if let Err(e) = start(&session, &mut events).await {
        let state = session.state();
        if let Some(view) = state.error_view() {
            warn!(hint = view.hint, "{} / {}", view.retry_label, view.back_label);
        }
        session.go_back();
        info!(handles = mock.active_handles(), "session abandoned");
        bail!("AR session failed to start: {}", e.user_message());
    }

    log_placed(&session);
    let result = run(&args, &mock, &session, &mut events).await;
    session.dispose();
    drain(&mut events);
    info!(handles = mock.active_handles(), "session disposed");
    result
}

fn pin_service(args: &Args) -> Result<Rc<dyn PinService>> {
    if args.remote {
        let config = ServiceConfig::from_env().context("Invalid service configuration")?;
        info!(url = %config.base_url, "using remote pin service");
        return Ok(Rc::new(HttpPinService::from_config(&config)));
    }

    let path = args
        .pins
        .clone()
        .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/data/pins.json")));
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read pins {}", path.display()))?;
    let service = InMemoryPinService::from_json(&source)
        .with_context(|| format!("Failed to parse pins {}", path.display()))?;
    Ok(Rc::new(service))
}

/// Run the permission sequence, answering the orientation prompt like a user would
async fn start(
    session: &ArSession,
    events: &mut UnboundedReceiver<SessionEvent>,
) -> geoar::Result<()> {
    let start = session.start().fuse();
    futures::pin_mut!(start);

    let result = loop {
        futures::select_biased! {
            result = start => break result,
            event = events.recv().fuse() => {
                if let Some(event) = event {
                    log_event(&event);
                    if event == SessionEvent::PromptRequested {
                        info!("user taps \"Enable\"");
                        session.respond_to_prompt(true);
                    }
                }
            }
        }
    };
    drain(events);
    result
}

async fn run(
    args: &Args,
    mock: &MockPlatform,
    session: &ArSession,
    events: &mut UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    let mut position = args.start_coord();
    if args.guide {
        session.toggle_guide();
    }

    for i in 0..args.frames {
        let alpha = 360.0 * i as f32 / args.frames.max(1) as f32;
        mock.push_orientation(DeviceOrientation::new(alpha, 90.0, 0.0));
        if i % 2 == 0 {
            mock.push_frame(1280, 720, [48, 52, 60, 255]);
        }

        if i % FIX_INTERVAL == 0 {
            if i > 0 {
                let meters = args.walk * f64::from(FRAME_DT) * f64::from(FIX_INTERVAL);
                position.lat += (meters / EARTH_RADIUS_M).to_degrees();
            }
            mock.push_fix(GeoFix::new(position.lat, position.lng, u64::from(i) * 16));
            session.sync_location().await;

            info!(
                frame = i,
                heading = session.heading().map(|h| h.cardinal()),
                position = ?session.camera_coord(),
                coins = session.marker_count(),
                guide = ?session.guide_label(),
                "tick"
            );
        }

        session.frame(FRAME_DT)?;
        drain(events);
    }

    if args.collect {
        collect_first_visible(mock, session, events).await?;
    }
    Ok(())
}

/// Turn until a coin is on screen, tap it, and collect it
async fn collect_first_visible(
    mock: &MockPlatform,
    session: &ArSession,
    events: &mut UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    for heading in SEARCH_HEADINGS {
        mock.push_orientation(DeviceOrientation::new(360.0 - heading, 90.0, 0.0));
        for _ in 0..20 {
            session.frame(FRAME_DT)?;
        }
        drain(events);

        let Some(target) = visible_coin(session) else {
            continue;
        };
        info!(heading, x = target.x, y = target.y, "user taps a coin");
        session.on_pointer(PointerEvent::mouse(PointerPhase::Down, target.x, target.y));
        session.on_pointer(PointerEvent::mouse(PointerPhase::Up, target.x, target.y));
        session.frame(FRAME_DT)?;
        drain(events);

        if let Err(e) = session.collect_selected().await {
            warn!(error = %e, "collect failed");
            drain(events);
            return Ok(());
        }

        let budget = session.config().collect_animation.as_secs_f32() / FRAME_DT + 10.0;
        for _ in 0..budget.ceil() as u32 {
            session.frame(FRAME_DT)?;
            let collected = drain(events)
                .iter()
                .any(|e| matches!(e, SessionEvent::Collected(_)));
            if collected {
                return Ok(());
            }
        }
        warn!("collect animation did not finish");
        return Ok(());
    }

    info!("no coin in view");
    Ok(())
}

/// Log where each placed coin lies from the user
fn log_placed(session: &ArSession) {
    let Some(origin) = session.origin() else {
        info!("no location yet, coins load on the first fix");
        return;
    };
    for location in session.locations() {
        let coord = location.pin.coord();
        let bearing = origin.coord.bearing_to(&coord);
        info!(
            location = location.id(),
            distance_m = origin.coord.distance_to(&coord).round(),
            direction = Heading::new(bearing as f32).cardinal(),
            "coin placed"
        );
    }
}

fn visible_coin(session: &ArSession) -> Option<Vec2> {
    let viewport = session.viewport()?;
    session
        .locations()
        .iter()
        .filter_map(|location| session.screen_position(location.id()))
        .find(|p| p.x >= 0.0 && p.y >= 0.0 && p.x <= viewport.width && p.y <= viewport.height)
}

fn drain(events: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        log_event(&event);
        drained.push(event);
    }
    drained
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::StepChanged(step) => info!(step = %step, "permission step"),
        SessionEvent::PromptRequested => info!("orientation prompt shown"),
        SessionEvent::CoinsLoaded(count) => info!(count, "coins placed"),
        SessionEvent::HoverChanged(marker) => info!(?marker, "hover"),
        SessionEvent::Selected(marker) => info!(?marker, "selected"),
        SessionEvent::Alert(message) => warn!("alert: {message}"),
        SessionEvent::Collected(id) => info!(location = %id, "collected"),
        SessionEvent::Error(message) => warn!("error: {message}"),
    }
}
