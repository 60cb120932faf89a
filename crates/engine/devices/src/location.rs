//! Geolocation request options

use geoar_map::GeoFix;
use std::time::Duration;

/// Options for a position request, mirroring the platform geolocation API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Ask for GPS-grade accuracy at the cost of power
    pub high_accuracy: bool,
    /// Give up if no fix arrives within this time
    pub timeout: Duration,
    /// Accept a cached fix no older than this
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(60),
        }
    }
}

impl PositionOptions {
    /// Whether a cached fix may be served for a request made at `now_ms`
    pub fn accepts_cached(&self, fix: &GeoFix, now_ms: u64) -> bool {
        u128::from(fix.age_ms(now_ms)) <= self.maximum_age.as_millis()
    }
}
