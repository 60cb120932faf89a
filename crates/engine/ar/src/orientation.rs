//! Device orientation drives the virtual camera
//!
//! Sensor events land in a latest-value [`Subscription`]; [`OrientationController::update`]
//! reads whatever is cached once per frame and never waits for a new event.

use devices::{DeviceOrientation, Heading, OrientationBackend, OrientationError, Subscription};
use glam::Quat;
use renderer::Camera;
use std::future::Future;
use std::rc::Rc;
use tracing::{debug, info};

pub struct OrientationController {
    backend: Rc<dyn OrientationBackend>,
    subscription: Option<Subscription<Option<DeviceOrientation>>>,
    current: Option<Quat>,
    smoothing: f32,
}

impl OrientationController {
    /// Create a controller; `smoothing` is the per-frame blend toward the latest reading
    pub fn new(backend: Rc<dyn OrientationBackend>, smoothing: f32) -> Self {
        Self {
            backend,
            subscription: None,
            current: None,
            smoothing: smoothing.clamp(f32::EPSILON, 1.0),
        }
    }

    pub fn requires_permission(&self) -> bool {
        self.backend.requires_permission()
    }

    /// Ask for sensor access
    ///
    /// The returned future owns its backend handle so the caller can start
    /// it directly inside a gesture handler.
    pub fn request_permission(&self) -> impl Future<Output = Result<(), OrientationError>> + 'static {
        let backend = self.backend.clone();
        async move {
            if !backend.is_supported() {
                return Err(OrientationError::Unsupported);
            }
            backend.request_permission().await
        }
    }

    /// Start listening; a second call while listening is a no-op
    pub fn init(&mut self) -> Result<(), OrientationError> {
        if self.subscription.is_some() {
            return Ok(());
        }
        if !self.backend.is_supported() {
            return Err(OrientationError::Unsupported);
        }
        self.subscription = Some(self.backend.subscribe()?);
        info!("orientation listener attached");
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.is_attached())
    }

    /// Apply the latest reading to the camera
    ///
    /// Returns true if the camera rotation changed. Missing or incomplete
    /// readings keep the previous rotation.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let Some(subscription) = self.subscription.as_ref() else {
            return false;
        };
        let reading = *subscription.latest();
        let Some(target) = reading.and_then(|r| r.to_camera_rotation(self.backend.screen_angle()))
        else {
            return false;
        };

        let next = match self.current {
            None => target,
            Some(current) => current.slerp(target, self.smoothing).normalize(),
        };
        self.current = Some(next);
        camera.rotation = next;
        true
    }

    /// Smoothed rotation, if any reading has arrived
    pub fn rotation(&self) -> Option<Quat> {
        self.current
    }

    pub fn heading(&self) -> Option<Heading> {
        self.current.map(Heading::from_rotation)
    }

    /// Detach the listener; idempotent
    pub fn dispose(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.detach();
            debug!("orientation listener detached");
        }
        self.current = None;
    }
}

impl Drop for OrientationController {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devices::{MockBehavior, MockPlatform};

    fn controller(mock: &MockPlatform, smoothing: f32) -> OrientationController {
        OrientationController::new(mock.platform().orientation, smoothing)
    }

    #[test]
    fn test_update_holds_last_rotation() {
        let mock = MockPlatform::new();
        let mut ctrl = controller(&mock, 1.0);
        let mut camera = Camera::default();

        // Not listening yet
        assert!(!ctrl.update(&mut camera));

        ctrl.init().unwrap();
        assert!(!ctrl.update(&mut camera));
        assert_eq!(camera.rotation, Quat::IDENTITY);

        mock.push_orientation(DeviceOrientation::new(90.0, 90.0, 0.0));
        assert!(ctrl.update(&mut camera));
        let rotated = camera.rotation;
        assert_ne!(rotated, Quat::IDENTITY);

        // No new event: keep the same rotation rather than snapping back
        assert!(ctrl.update(&mut camera));
        assert!(camera.rotation.abs_diff_eq(rotated, 1e-6));
    }

    #[test]
    fn test_smoothing_blends_toward_target() {
        let mock = MockPlatform::new();
        let mut ctrl = controller(&mock, 0.5);
        let mut camera = Camera::default();
        ctrl.init().unwrap();

        mock.push_orientation(DeviceOrientation::new(0.0, 90.0, 0.0));
        ctrl.update(&mut camera);
        let start = camera.rotation;

        mock.push_orientation(DeviceOrientation::new(90.0, 90.0, 0.0));
        ctrl.update(&mut camera);
        let target = DeviceOrientation::new(90.0, 90.0, 0.0)
            .to_camera_rotation(0.0)
            .unwrap();
        let halfway = start.slerp(target, 0.5);
        assert!(camera.rotation.abs_diff_eq(halfway, 1e-4));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mock = MockPlatform::new();
        let mut ctrl = controller(&mock, 1.0);
        ctrl.dispose();

        ctrl.init().unwrap();
        ctrl.init().unwrap();
        assert_eq!(mock.orientation_listeners(), 1);
        assert!(ctrl.is_listening());

        ctrl.dispose();
        ctrl.dispose();
        assert_eq!(mock.orientation_listeners(), 0);
        assert!(!ctrl.is_listening());
    }

    #[test]
    fn test_init_fails_without_sensor() {
        let mock = MockPlatform::with_behavior(MockBehavior {
            orientation_supported: false,
            ..MockBehavior::default()
        });
        let mut ctrl = controller(&mock, 1.0);
        assert_eq!(ctrl.init(), Err(OrientationError::Unsupported));
    }

    #[test]
    fn test_init_fails_when_revoked() {
        let mock = MockPlatform::new();
        mock.revoke_orientation();
        let mut ctrl = controller(&mock, 1.0);
        assert_eq!(ctrl.init(), Err(OrientationError::Revoked));
        assert_eq!(mock.orientation_listeners(), 0);
    }

    #[tokio::test]
    async fn test_request_permission_denied() {
        let mock = MockPlatform::with_behavior(MockBehavior {
            orientation_requires_permission: true,
            orientation_permission: Err(OrientationError::PermissionDenied),
            ..MockBehavior::default()
        });
        let mut ctrl = controller(&mock, 1.0);
        assert!(ctrl.requires_permission());
        assert_eq!(
            ctrl.request_permission().await,
            Err(OrientationError::PermissionDenied)
        );
        assert_eq!(ctrl.init(), Err(OrientationError::PermissionDenied));
    }
}
