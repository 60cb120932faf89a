//! Camera capture types
//!
//! Describes what the AR view asks of the platform camera and the frames it
//! receives back. Backends implement [`crate::CameraBackend`].

use std::sync::Arc;

/// Which physical camera to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Rear-facing camera
    #[default]
    Environment,
    /// Front-facing camera
    User,
}

/// Requested capture parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub facing: FacingMode,
    /// Ideal width in pixels; the platform may deliver a different size
    pub width: u32,
    /// Ideal height in pixels; the platform may deliver a different size
    pub height: u32,
}

impl VideoConstraints {
    /// Rear camera at the given ideal resolution
    pub fn rear(width: u32, height: u32) -> Self {
        Self {
            facing: FacingMode::Environment,
            width,
            height,
        }
    }
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self::rear(1280, 720)
    }
}

/// Resolution the platform actually delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
}

impl VideoSettings {
    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0 {
            self.width as f32 / self.height as f32
        } else {
            1.0
        }
    }
}

/// A single decoded RGBA8 video frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Monotonic frame counter assigned by the stream
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 pixels, `width * height * 4` bytes
    pub pixels: Arc<[u8]>,
}

impl VideoFrame {
    /// Create a frame filled with a single color
    pub fn solid(sequence: u64, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            sequence,
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Returns true if the pixel buffer matches the declared dimensions
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize * 4
    }
}

/// A live camera stream
///
/// Dropping a stream must release its tracks; [`VideoStream::stop`] releases
/// them eagerly and is idempotent.
pub trait VideoStream {
    /// Resolution the platform settled on
    fn settings(&self) -> VideoSettings;

    /// The most recent decoded frame, if any has arrived
    fn latest_frame(&self) -> Option<VideoFrame>;

    /// Whether any media track is still live
    fn is_live(&self) -> bool;

    /// Stop all media tracks
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constraints_request_rear_720p() {
        let c = VideoConstraints::default();
        assert_eq!(c.facing, FacingMode::Environment);
        assert_eq!((c.width, c.height), (1280, 720));
    }

    #[test]
    fn test_solid_frame_is_well_formed() {
        let frame = VideoFrame::solid(3, 4, 2, [1, 2, 3, 4]);
        assert!(frame.is_well_formed());
        assert_eq!(&frame.pixels[..8], &[1, 2, 3, 4, 1, 2, 3, 4]);
    }

    #[test]
    fn test_aspect_ratio() {
        let s = VideoSettings {
            width: 1280,
            height: 720,
        };
        assert!((s.aspect_ratio() - 16.0 / 9.0).abs() < 1e-5);
        assert_eq!(VideoSettings::default().aspect_ratio(), 1.0);
    }
}
