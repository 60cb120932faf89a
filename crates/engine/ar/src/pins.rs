//! Pin records from the nearby-pins collaborator
//!
//! A [`PinRecord`] is read-only input owned by the pin service. When a pin
//! passes the eligibility filter it becomes a [`ConsumedLocation`], which the
//! session tracks alongside its marker.

use crate::config::ArConfig;
use crate::error::ServiceError;
use async_trait::async_trait;
use geoar_map::{GeoCoord, GeoFix, GeoProjector};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use tracing::{debug, info};

/// A collectible brand pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRecord {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub brand_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand_image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub collection_limit_remaining: Option<u32>,
}

impl PinRecord {
    pub fn coord(&self) -> GeoCoord {
        GeoCoord::new(self.lat, self.lng)
    }

    /// Whether the record can be placed in the scene
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && self.coord().is_valid()
    }

    /// Great-circle distance from a fix in meters
    pub fn distance_from(&self, fix: &GeoFix) -> f64 {
        GeoProjector::distance_meters(fix.lat(), fix.lng(), self.lat, self.lng)
    }
}

/// Response of the nearby-pins query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPins {
    pub locations: Vec<PinRecord>,
    /// When set, pins are collected automatically and manual collect is hidden
    #[serde(default)]
    pub single_ar: bool,
}

/// A pin placed in the AR session
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumedLocation {
    pub pin: PinRecord,
    pub modal_url: String,
    /// Set the first time the marker is hovered or selected
    pub viewed: bool,
}

impl ConsumedLocation {
    pub fn from_pin(pin: PinRecord, config: &ArConfig) -> Self {
        Self {
            modal_url: config.modal_url(&pin.id),
            pin,
            viewed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.pin.id
    }
}

/// Pins within `radius_m` of the origin, inclusive
pub fn eligible_pins<'a>(
    pins: &'a [PinRecord],
    origin: &'a GeoFix,
    radius_m: f64,
) -> impl Iterator<Item = &'a PinRecord> + 'a {
    pins.iter()
        .filter(move |pin| pin.coord().is_valid() && pin.distance_from(origin) <= radius_m)
}

/// The external pin backend
#[async_trait(?Send)]
pub trait PinService {
    /// Pins near the user at `origin`
    async fn nearby_pins(&self, origin: GeoFix) -> Result<NearbyPins, ServiceError>;

    /// Mark a location as collected
    async fn consume(&self, location_id: &str) -> Result<(), ServiceError>;
}

/// Pin service backed by a fixed list
#[derive(Debug, Default)]
pub struct InMemoryPinService {
    pins: NearbyPins,
    consumed: RefCell<Vec<String>>,
    fail_consume: RefCell<Option<ServiceError>>,
    fetches: Cell<usize>,
}

impl InMemoryPinService {
    pub fn new(pins: NearbyPins) -> Self {
        Self {
            pins,
            ..Self::default()
        }
    }

    /// Parse either a `NearbyPins` object or a bare array of pins
    pub fn from_json(source: &str) -> Result<Self, ServiceError> {
        let pins = match serde_json::from_str::<NearbyPins>(source) {
            Ok(pins) => pins,
            Err(_) => NearbyPins {
                locations: serde_json::from_str(source)
                    .map_err(|e| ServiceError::Parse(format!("Invalid pin list: {e}")))?,
                single_ar: false,
            },
        };
        info!(count = pins.locations.len(), "loaded pin fixtures");
        Ok(Self::new(pins))
    }

    /// Ids passed to [`PinService::consume`] that succeeded
    pub fn consumed(&self) -> Vec<String> {
        self.consumed.borrow().clone()
    }

    /// Make every following consume fail with `error` (or succeed with `None`)
    pub fn set_fail_consume(&self, error: Option<ServiceError>) {
        *self.fail_consume.borrow_mut() = error;
    }

    /// Number of nearby-pins queries served
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

#[async_trait(?Send)]
impl PinService for InMemoryPinService {
    async fn nearby_pins(&self, origin: GeoFix) -> Result<NearbyPins, ServiceError> {
        self.fetches.set(self.fetches.get() + 1);
        debug!(lat = origin.lat(), lng = origin.lng(), "serving nearby pins");
        Ok(self.pins.clone())
    }

    async fn consume(&self, location_id: &str) -> Result<(), ServiceError> {
        if let Some(error) = self.fail_consume.borrow().clone() {
            return Err(error);
        }
        if !self.pins.locations.iter().any(|p| p.id == location_id) {
            return Err(ServiceError::Rejected(format!(
                "Unknown location {location_id}"
            )));
        }
        self.consumed.borrow_mut().push(location_id.to_string());
        Ok(())
    }
}
