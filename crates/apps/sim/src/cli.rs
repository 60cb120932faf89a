//! Command line arguments for the simulator

use clap::Parser;
use devices::{MockBehavior, OrientationError};
use geoar_map::{GeoCoord, GeoFix};
use std::path::PathBuf;

/// Position used when --origin is not given
pub const DEFAULT_ORIGIN: (f64, f64) = (51.5007, -0.1246);

/// Headless AR session simulator
///
/// Runs the full permission sequence against a simulated device, places coin
/// markers around a GPS origin, sweeps the camera, and optionally collects
/// the first coin in view.
#[derive(Parser, Debug, Clone)]
#[command(name = "geoar-sim")]
#[command(about = "Simulate a location-based AR session without a device")]
pub struct Args {
    /// Session settings as TOML
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Pins as JSON (a nearby-pins response or a bare array)
    #[arg(long, value_name = "PATH", conflicts_with = "remote")]
    pub pins: Option<PathBuf>,

    /// Fetch pins from the HTTP service configured by GEOAR_API_* variables
    #[arg(long)]
    pub remote: bool,

    /// Simulated GPS position
    #[arg(long, value_name = "LAT,LNG", value_parser = parse_origin)]
    pub origin: Option<GeoCoord>,

    /// Frames to run after the session starts
    #[arg(long, default_value = "120")]
    pub frames: u32,

    /// Walking speed in meters per second, heading north
    #[arg(long, default_value = "0")]
    pub walk: f64,

    /// Deny camera access
    #[arg(long)]
    pub deny_camera: bool,

    /// Put device orientation behind a permission prompt
    #[arg(long)]
    pub gated: bool,

    /// Deny device orientation access (implies --gated)
    #[arg(long)]
    pub deny_orientation: bool,

    /// Fail the initial location request
    #[arg(long)]
    pub no_location: bool,

    /// Tap the first coin in view and collect it
    #[arg(long)]
    pub collect: bool,

    /// Show the guide path to the nearest coin
    #[arg(long)]
    pub guide: bool,
}

impl Args {
    /// Platform outcomes scripted by the flags
    pub fn behavior(&self) -> MockBehavior {
        let mut behavior = MockBehavior::default();
        let origin = self.start_coord();
        behavior.location = Ok(GeoFix::new(origin.lat, origin.lng, 0));
        if self.deny_camera {
            behavior.camera = Err(devices::CameraError::PermissionDenied);
        }
        if self.gated || self.deny_orientation {
            behavior.orientation_requires_permission = true;
        }
        if self.deny_orientation {
            behavior.orientation_permission = Err(OrientationError::PermissionDenied);
        }
        if self.no_location {
            behavior.location = Err(devices::LocationError::PermissionDenied);
        }
        behavior
    }

    /// Where the simulated user stands
    pub fn start_coord(&self) -> GeoCoord {
        self.origin
            .unwrap_or(GeoCoord::new(DEFAULT_ORIGIN.0, DEFAULT_ORIGIN.1))
    }
}

/// Parse "lat,lng"
pub fn parse_origin(value: &str) -> Result<GeoCoord, String> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got '{value}'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude '{lng}': {e}"))?;

    let coord = GeoCoord::new(lat, lng);
    if !coord.is_valid() {
        return Err(format!("coordinate out of range: {lat},{lng}"));
    }
    Ok(coord)
}
