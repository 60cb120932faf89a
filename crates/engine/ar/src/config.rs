//! AR session configuration
//!
//! Every field has a default, so an empty TOML file is a valid config.
//! Durations are written in milliseconds:
//!
//! ```toml
//! eligibility_radius_m = 500.0
//! location_timeout_ms = 10000
//! settle_delay_ms = 300
//!
//! [coin]
//! radius = 1.0
//! ```

use crate::error::ConfigError;
use devices::{PositionOptions, VideoConstraints};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Default API endpoint for the pin service
const DEFAULT_API_URL: &str = "http://localhost:3000/api/ar";

/// Default request timeout for the pin service
const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(15);

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Look of the coin markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinStyle {
    /// Coin radius in meters
    pub radius: f32,
    pub thickness: f32,
    /// Height of the coin center above the ground plane
    pub hover_height: f32,
    /// Spin about the vertical axis in radians per second
    pub spin_speed: f32,
    pub bob_amplitude: f32,
    /// Bob frequency in radians per second
    pub bob_speed: f32,
    pub color: [f32; 4],
    /// Color used while the marker is selected
    pub selected_color: [f32; 4],
    pub card_color: [f32; 4],
    pub card_width: f32,
    pub card_height: f32,
    /// Card offset above the coin center
    pub card_offset: f32,
}

impl Default for CoinStyle {
    fn default() -> Self {
        Self {
            radius: 1.0,
            thickness: 0.15,
            hover_height: 1.5,
            spin_speed: 1.5,
            bob_amplitude: 0.15,
            bob_speed: 2.0,
            color: [1.0, 0.8, 0.2, 1.0],
            selected_color: [0.3, 0.9, 0.5, 1.0],
            card_color: [1.0, 1.0, 1.0, 0.9],
            card_width: 3.0,
            card_height: 1.6,
            card_offset: 2.2,
        }
    }
}

/// Tunables for an AR session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArConfig {
    /// Pins farther than this from the origin are not shown
    pub eligibility_radius_m: f64,
    #[serde(rename = "location_timeout_ms", with = "duration_ms")]
    pub location_timeout: Duration,
    #[serde(rename = "location_max_age_ms", with = "duration_ms")]
    pub location_max_age: Duration,
    pub high_accuracy: bool,
    pub video_width: u32,
    pub video_height: u32,
    /// Pause between the permission sequence and AR construction
    #[serde(rename = "settle_delay_ms", with = "duration_ms")]
    pub settle_delay: Duration,
    /// Per-frame blend toward the latest orientation (1.0 = none)
    pub orientation_smoothing: f32,
    /// Camera height above the ground plane
    pub eye_height_m: f32,
    pub coin: CoinStyle,
    /// Info modal link; `{id}` is replaced with the pin id
    pub modal_url_template: String,
    #[serde(rename = "collect_animation_ms", with = "duration_ms")]
    pub collect_animation: Duration,
    /// Maximum pointer travel in pixels for a press to count as a tap
    pub tap_slop_px: f32,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            eligibility_radius_m: 500.0,
            location_timeout: Duration::from_secs(10),
            location_max_age: Duration::from_secs(60),
            high_accuracy: true,
            video_width: 1280,
            video_height: 720,
            settle_delay: Duration::from_millis(300),
            orientation_smoothing: 0.25,
            eye_height_m: 1.6,
            coin: CoinStyle::default(),
            modal_url_template: "/maps/pins/{id}".to_string(),
            collect_animation: Duration::from_millis(1200),
            tap_slop_px: 10.0,
        }
    }
}

impl ArConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: ArConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.eligibility_radius_m.is_finite() && self.eligibility_radius_m > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "eligibility_radius_m must be positive, got {}",
                self.eligibility_radius_m
            )));
        }
        if !(self.orientation_smoothing > 0.0 && self.orientation_smoothing <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "orientation_smoothing must be in (0, 1], got {}",
                self.orientation_smoothing
            )));
        }
        if self.video_width == 0 || self.video_height == 0 {
            return Err(ConfigError::Invalid("video size must be non-zero".into()));
        }
        if self.coin.radius <= 0.0 || self.coin.thickness <= 0.0 {
            return Err(ConfigError::Invalid("coin dimensions must be positive".into()));
        }
        if self.tap_slop_px < 0.0 {
            return Err(ConfigError::Invalid("tap_slop_px must not be negative".into()));
        }
        Ok(())
    }

    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            high_accuracy: self.high_accuracy,
            timeout: self.location_timeout,
            maximum_age: self.location_max_age,
        }
    }

    pub fn video_constraints(&self) -> VideoConstraints {
        VideoConstraints::rear(self.video_width, self.video_height)
    }

    /// Info modal link for a pin
    pub fn modal_url(&self, pin_id: &str) -> String {
        self.modal_url_template.replace("{id}", pin_id)
    }
}

/// Connection settings for the HTTP pin service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Bearer token sent with every request
    pub token: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_API_TIMEOUT,
            token: None,
        }
    }
}

impl ServiceConfig {
    /// Load from `GEOAR_API_URL`, `GEOAR_API_TOKEN`, and `GEOAR_API_TIMEOUT_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("GEOAR_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let token = env::var("GEOAR_API_TOKEN").ok().filter(|t| !t.is_empty());
        let timeout = match env::var("GEOAR_API_TIMEOUT_MS") {
            Ok(value) => value
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigError::Invalid(format!("GEOAR_API_TIMEOUT_MS: {e}")))?,
            Err(_) => DEFAULT_API_TIMEOUT,
        };

        Ok(Self {
            base_url,
            timeout,
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ArConfig::from_toml_str("").unwrap();
        assert_eq!(config, ArConfig::default());
        assert_eq!(config.eligibility_radius_m, 500.0);
        assert_eq!(config.location_timeout, Duration::from_secs(10));
        assert_eq!(config.location_max_age, Duration::from_secs(60));
    }

    #[test]
    fn test_durations_in_milliseconds() {
        let config = ArConfig::from_toml_str(
            r#"
            location_timeout_ms = 2500
            settle_delay_ms = 0
            [coin]
            radius = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.location_timeout, Duration::from_millis(2500));
        assert_eq!(config.settle_delay, Duration::ZERO);
        assert_eq!(config.coin.radius, 0.5);
        assert_eq!(config.coin.thickness, CoinStyle::default().thickness);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ArConfig::from_toml_str("eligibility_radius_m = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ArConfig::from_toml_str("orientation_smoothing = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ArConfig::from_toml_str("eligibility_radius_m = \"far\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_modal_url() {
        let config = ArConfig::default();
        assert_eq!(config.modal_url("pin-7"), "/maps/pins/pin-7");
    }

    #[test]
    fn test_position_options_follow_config() {
        let config = ArConfig {
            high_accuracy: false,
            location_timeout: Duration::from_secs(3),
            ..ArConfig::default()
        };
        let opts = config.position_options();
        assert!(!opts.high_accuracy);
        assert_eq!(opts.timeout, Duration::from_secs(3));
        assert_eq!(opts.maximum_age, Duration::from_secs(60));
    }
}
