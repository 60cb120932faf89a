#![allow(dead_code)]

use devices::{MockPlatform, Viewport};
use geoar::{
    ArConfig, ArSession, InMemoryPinService, NearbyPins, PinRecord, PinService, SessionEvent,
};
use geoar_map::{GeoFix, EARTH_RADIUS_M};
use renderer::{FrameRenderer, NullRenderer, RenderError, RenderFrame};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Where the mock platform reports the device to be
pub const ORIGIN: (f64, f64) = (51.5007, -0.1246);

pub fn origin_fix() -> GeoFix {
    GeoFix::new(ORIGIN.0, ORIGIN.1, 0)
}

/// A fix `meters` due north of the mock origin
pub fn fix_north(meters: f64) -> GeoFix {
    let pin = pin_north("fix", meters);
    GeoFix::new(pin.lat, pin.lng, 1)
}

/// A pin `meters` due north of the mock origin
pub fn pin_north(id: &str, meters: f64) -> PinRecord {
    let lat = ORIGIN.0 + (meters / EARTH_RADIUS_M).to_degrees();
    pin(id, lat, ORIGIN.1)
}

/// A pin `meters` due east of the mock origin
pub fn pin_east(id: &str, meters: f64) -> PinRecord {
    let lng = ORIGIN.1 + (meters / (EARTH_RADIUS_M * ORIGIN.0.to_radians().cos())).to_degrees();
    pin(id, ORIGIN.0, lng)
}

pub fn pin(id: &str, lat: f64, lng: f64) -> PinRecord {
    PinRecord {
        id: id.to_string(),
        lat,
        lng,
        brand_name: "Acme".to_string(),
        title: format!("Coin {id}"),
        description: "A collectible coin".to_string(),
        brand_image_url: None,
        url: None,
        collection_limit_remaining: Some(5),
    }
}

pub fn pins(locations: Vec<PinRecord>) -> Rc<InMemoryPinService> {
    Rc::new(InMemoryPinService::new(NearbyPins {
        locations,
        single_ar: false,
    }))
}

/// Null renderer that the test can still inspect after handing it to a session
#[derive(Clone, Default)]
pub struct SharedRenderer(pub Rc<RefCell<NullRenderer>>);

impl SharedRenderer {
    pub fn get(&self) -> std::cell::Ref<'_, NullRenderer> {
        self.0.borrow()
    }
}

impl FrameRenderer for SharedRenderer {
    fn resize(&mut self, viewport: Viewport) {
        self.0.borrow_mut().resize(viewport);
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> renderer::Result<()> {
        self.0.borrow_mut().render(frame)
    }

    fn dispose(&mut self) {
        self.0.borrow_mut().dispose();
    }

    fn name(&self) -> &str {
        "shared-null"
    }
}

/// Every renderer a session has created
pub type RendererLog = Rc<RefCell<Vec<SharedRenderer>>>;

pub struct Harness {
    pub mock: MockPlatform,
    pub session: ArSession,
    pub events: UnboundedReceiver<SessionEvent>,
    pub renderers: RendererLog,
    pub collected: Rc<RefCell<Vec<String>>>,
}

impl Harness {
    pub fn new(mock: MockPlatform, service: Rc<dyn PinService>) -> Self {
        Self::with_config(mock, service, ArConfig::default())
    }

    pub fn with_config(mock: MockPlatform, service: Rc<dyn PinService>, config: ArConfig) -> Self {
        let renderers: RendererLog = Rc::default();
        let collected: Rc<RefCell<Vec<String>>> = Rc::default();

        let log = renderers.clone();
        let on_collected = collected.clone();
        let (session, events) = ArSession::builder(mock.platform(), service, config)
            .with_renderer(move |_: &Viewport| -> Result<Box<dyn FrameRenderer>, RenderError> {
                let renderer = SharedRenderer::default();
                log.borrow_mut().push(renderer.clone());
                Ok(Box::new(renderer))
            })
            .with_on_collected(move |location| {
                on_collected.borrow_mut().push(location.id().to_string());
            })
            .build();

        Self {
            mock,
            session,
            events,
            renderers,
            collected,
        }
    }

    /// Events received since the last call
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn renderer(&self) -> SharedRenderer {
        self.renderers
            .borrow()
            .last()
            .cloned()
            .expect("no renderer created")
    }

    /// Run frames at 60 fps
    pub fn run_frames(&self, count: usize) {
        for _ in 0..count {
            self.session.frame(1.0 / 60.0).unwrap();
        }
    }
}
